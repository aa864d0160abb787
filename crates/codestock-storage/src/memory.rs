//! In-memory stand-in for the tabular REST store.
//!
//! Interprets the same request grammar the encoder produces (equality
//! filters, single-key order, limit, `Prefer` tokens) against rows kept in
//! a mutex. Records every request it receives and can be told to answer the
//! next request with a canned response.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};
use uuid::Uuid;

use codestock_core::columns;

use crate::error::StorageError;
use crate::execute::{RawResponse, Transport};
use crate::query::{Direction, RequestDescriptor};

type Row = Map<String, Value>;

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Vec<Row>>,
    requests: Vec<RequestDescriptor>,
    scripted: VecDeque<RawResponse>,
    clock: Option<jiff::Timestamp>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next request with `status` and `body` instead of touching
    /// the rows. Queued responses are used in order.
    pub fn respond_next(&self, status: StatusCode, body: impl Into<String>) {
        self.lock().scripted.push_back(RawResponse {
            status,
            content_range: None,
            body: body.into().into_bytes(),
        });
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.lock().requests.clone()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.lock().tables.get(table).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for MemoryStore {
    async fn send(&self, request: RequestDescriptor) -> Result<RawResponse, StorageError> {
        let mut inner = self.lock();
        inner.requests.push(request.clone());
        if let Some(scripted) = inner.scripted.pop_front() {
            return Ok(scripted);
        }
        Ok(inner.handle(&request))
    }
}

struct Parsed {
    table: String,
    filters: Vec<(String, String)>,
    order: Option<(String, Direction)>,
    limit: Option<usize>,
    representation: bool,
    count_exact: bool,
}

impl Inner {
    fn handle(&mut self, request: &RequestDescriptor) -> RawResponse {
        let parsed = match parse(request) {
            Ok(parsed) => parsed,
            Err(msg) => return json_response(StatusCode::BAD_REQUEST, &error_body(&msg), None),
        };

        match request.method {
            Method::GET => self.select(&parsed),
            Method::POST => match body_rows(request) {
                Ok(rows) => self.insert(&parsed, rows),
                Err(msg) => json_response(StatusCode::BAD_REQUEST, &error_body(&msg), None),
            },
            Method::PATCH => match body_rows(request) {
                Ok(mut rows) if rows.len() == 1 => self.update(&parsed, rows.remove(0)),
                Ok(_) => json_response(
                    StatusCode::BAD_REQUEST,
                    &error_body("update body must be one object"),
                    None,
                ),
                Err(msg) => json_response(StatusCode::BAD_REQUEST, &error_body(&msg), None),
            },
            Method::DELETE => self.delete(&parsed),
            _ => json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &error_body("unsupported method"),
                None,
            ),
        }
    }

    fn select(&self, parsed: &Parsed) -> RawResponse {
        let mut rows: Vec<Row> = self
            .tables
            .get(&parsed.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(row, &parsed.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, direction)) = &parsed.order {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(field), b.get(field));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        let total = rows.len();
        if let Some(limit) = parsed.limit {
            rows.truncate(limit);
        }

        let range = parsed.count_exact.then(|| format!("*/{total}"));
        json_response(StatusCode::OK, &rows_value(rows), range)
    }

    fn insert(&mut self, parsed: &Parsed, rows: Vec<Row>) -> RawResponse {
        let mut created = Vec::with_capacity(rows.len());
        for mut row in rows {
            let now = self.tick();
            row.entry(columns::ID)
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            row.insert(columns::CREATED_AT.to_string(), now.clone());
            row.insert(columns::UPDATED_AT.to_string(), now);
            created.push(row);
        }

        let table = self.tables.entry(parsed.table.clone()).or_default();
        table.extend(created.iter().cloned());

        let range = parsed.count_exact.then(|| format!("*/{}", created.len()));
        if parsed.representation {
            json_response(StatusCode::CREATED, &rows_value(created), range)
        } else {
            empty_response(StatusCode::CREATED, range)
        }
    }

    fn update(&mut self, parsed: &Parsed, patch: Row) -> RawResponse {
        let now = self.tick();
        let mut updated = Vec::new();
        if let Some(rows) = self.tables.get_mut(&parsed.table) {
            for row in rows.iter_mut().filter(|row| matches_all(row, &parsed.filters)) {
                for (key, value) in &patch {
                    if key != columns::ID && key != columns::CREATED_AT {
                        row.insert(key.clone(), value.clone());
                    }
                }
                row.insert(columns::UPDATED_AT.to_string(), now.clone());
                updated.push(row.clone());
            }
        }

        let range = parsed.count_exact.then(|| format!("*/{}", updated.len()));
        if parsed.representation {
            json_response(StatusCode::OK, &rows_value(updated), range)
        } else {
            empty_response(StatusCode::NO_CONTENT, range)
        }
    }

    fn delete(&mut self, parsed: &Parsed) -> RawResponse {
        let mut removed = Vec::new();
        if let Some(rows) = self.tables.get_mut(&parsed.table) {
            let (gone, kept): (Vec<Row>, Vec<Row>) = rows
                .drain(..)
                .partition(|row| matches_all(row, &parsed.filters));
            *rows = kept;
            removed = gone;
        }

        let range = parsed.count_exact.then(|| format!("*/{}", removed.len()));
        if parsed.representation {
            json_response(StatusCode::OK, &rows_value(removed), range)
        } else {
            empty_response(StatusCode::NO_CONTENT, range)
        }
    }

    /// Strictly increasing clock with microsecond steps, like a database
    /// `now()` column default under a single writer.
    fn tick(&mut self) -> Value {
        let now = jiff::Timestamp::now();
        let next = match self.clock {
            Some(last) if now <= last => last
                .checked_add(jiff::SignedDuration::from_micros(1))
                .unwrap_or(last),
            _ => now,
        };
        self.clock = Some(next);
        Value::String(next.to_string())
    }
}

fn parse(request: &RequestDescriptor) -> Result<Parsed, String> {
    let table = request
        .url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "missing table".to_string())?
        .to_string();

    let mut filters = Vec::new();
    let mut order = None;
    let mut limit = None;
    for (key, value) in request.url.query_pairs() {
        match key.as_ref() {
            "select" => {}
            "order" => {
                let (field, dir) = value
                    .rsplit_once('.')
                    .ok_or_else(|| format!("bad order: {value}"))?;
                let direction = match dir {
                    "asc" => Direction::Ascending,
                    "desc" => Direction::Descending,
                    _ => return Err(format!("bad order direction: {dir}")),
                };
                order = Some((field.to_string(), direction));
            }
            "limit" => {
                limit = Some(value.parse().map_err(|_| format!("bad limit: {value}"))?);
            }
            field => {
                let expected = value
                    .strip_prefix("eq.")
                    .ok_or_else(|| format!("unsupported operator in {field}={value}"))?;
                filters.push((field.to_string(), expected.to_string()));
            }
        }
    }

    let prefer = request
        .headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let tokens: Vec<&str> = prefer.split(',').map(str::trim).collect();

    Ok(Parsed {
        table,
        filters,
        order,
        limit,
        representation: tokens.contains(&"return=representation"),
        count_exact: tokens.contains(&"count=exact"),
    })
}

fn body_rows(request: &RequestDescriptor) -> Result<Vec<Row>, String> {
    let body = request.body.as_deref().ok_or("missing body")?;
    match serde_json::from_slice::<Value>(body).map_err(|e| e.to_string())? {
        Value::Object(row) => Ok(vec![row]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                _ => Err("array items must be objects".to_string()),
            })
            .collect(),
        _ => Err("body must be an object or array".to_string()),
    }
}

fn matches_all(row: &Row, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(field, expected)| match row.get(field) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == *expected,
    })
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (a.parse::<jiff::Timestamp>(), b.parse::<jiff::Timestamp>()) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        // Nulls sort last ascending, as in Postgres.
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

fn rows_value(rows: Vec<Row>) -> Value {
    Value::Array(rows.into_iter().map(Value::Object).collect())
}

fn error_body(message: &str) -> Value {
    serde_json::json!({ "message": message })
}

fn json_response(status: StatusCode, body: &Value, content_range: Option<String>) -> RawResponse {
    RawResponse {
        status,
        content_range,
        body: body.to_string().into_bytes(),
    }
}

fn empty_response(status: StatusCode, content_range: Option<String>) -> RawResponse {
    RawResponse {
        status,
        content_range,
        body: Vec::new(),
    }
}
