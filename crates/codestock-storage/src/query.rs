//! Request encoding for the tabular REST store.
//!
//! A [`Query`] accumulates one intended operation through chained calls and
//! is consumed by [`Query::build`], which renders an immutable
//! [`RequestDescriptor`]. Sending the descriptor is a separate step
//! ([`crate::execute::execute`]).
//!
//! # Query-string grammar
//!
//! ```text
//! select=<columns>            reads only
//! <field>=eq.<value>          one per filter, in call order, ANDed
//! order=<field>.<asc|desc>    single sort key
//! limit=<n>
//! ```
//!
//! Values are form-urlencoded. Filters also act as row predicates for
//! update and delete.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use url::Url;

use codestock_core::columns;

use crate::config::StoreConfig;
use crate::error::StorageError;

const APIKEY: HeaderName = HeaderName::from_static("apikey");
const PREFER: HeaderName = HeaderName::from_static("prefer");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operation {
    Select,
    Insert(Value),
    Update(Value),
    Delete,
}

/// Builder for a single store request.
#[derive(Debug, Clone)]
pub struct Query {
    table: String,
    columns: String,
    filters: Vec<(String, String)>,
    order: Option<(String, Direction)>,
    limit: Option<usize>,
    operation: Operation,
    count_exact: bool,
}

impl Query {
    /// Start a read of every column of `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: columns::ALL.to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
            operation: Operation::Select,
            count_exact: false,
        }
    }

    /// Set the projection and make this a read. Any pending payload is
    /// discarded.
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self.operation = Operation::Select;
        self
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push((field.into(), value.to_string()));
        self
    }

    /// Replaces any earlier sort key.
    pub fn order(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn insert(mut self, row: Value) -> Self {
        self.operation = Operation::Insert(row);
        self
    }

    pub fn update(mut self, patch: Value) -> Self {
        self.operation = Operation::Update(patch);
        self
    }

    pub fn delete(mut self) -> Self {
        self.operation = Operation::Delete;
        self
    }

    /// Ask the store to report a row count in `Content-Range`.
    pub fn count_exact(mut self) -> Self {
        self.count_exact = true;
        self
    }

    /// Render the accumulated state. Consumes the builder.
    pub fn build(self, config: &StoreConfig) -> Result<RequestDescriptor, StorageError> {
        let mut url = config.table_url(&self.table)?;
        self.write_query_string(&mut url);

        let (method, body) = match self.operation {
            Operation::Select => (Method::GET, None),
            Operation::Insert(row) => (Method::POST, Some(serde_json::to_vec(&row)?)),
            Operation::Update(patch) => (Method::PATCH, Some(serde_json::to_vec(&patch)?)),
            Operation::Delete => (Method::DELETE, None),
        };

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(config.api_key())
            .map_err(|_| StorageError::Config("store api key is not a valid header value".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key()))
            .map_err(|_| StorageError::Config("store api key is not a valid header value".into()))?;
        headers.insert(APIKEY, key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut prefer = Vec::new();
        if method == Method::POST || method == Method::PATCH {
            prefer.push("return=representation");
        }
        if self.count_exact {
            prefer.push("count=exact");
        }
        if !prefer.is_empty() {
            // Only static ASCII tokens are joined here.
            if let Ok(value) = HeaderValue::from_str(&prefer.join(", ")) {
                headers.insert(PREFER, value);
            }
        }

        Ok(RequestDescriptor {
            method,
            url,
            headers,
            body,
        })
    }

    fn write_query_string(&self, url: &mut Url) {
        {
            let mut pairs = url.query_pairs_mut();
            if self.operation == Operation::Select {
                pairs.append_pair("select", &self.columns);
            }
            for (field, value) in &self.filters {
                pairs.append_pair(field, &format!("eq.{value}"));
            }
            if let Some((field, direction)) = &self.order {
                pairs.append_pair("order", &format!("{field}.{}", direction.as_str()));
            }
            if let Some(limit) = self.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
    }
}

/// One fully rendered store request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config() -> StoreConfig {
        StoreConfig::new("https://abc.supabase.co", "anon-key").unwrap()
    }

    fn header<'a>(req: &'a RequestDescriptor, name: &str) -> Option<&'a str> {
        req.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn read_renders_select_filters_order_limit() {
        let req = Query::table("snippets")
            .select("*")
            .eq("section", "footer")
            .eq("company_name", "Acme")
            .order("created_at", Direction::Descending)
            .limit(20)
            .build(&config())
            .unwrap();

        assert_eq!(req.method, Method::GET);
        assert_eq!(
            req.url.as_str(),
            "https://abc.supabase.co/rest/v1/snippets?select=*&section=eq.footer\
             &company_name=eq.Acme&order=created_at.desc&limit=20"
        );
        assert!(req.body.is_none());
        assert_eq!(header(&req, "prefer"), None);
    }

    #[test]
    fn default_read_selects_all_columns() {
        let req = Query::table("snippets").build(&config()).unwrap();
        assert_eq!(req.url.query(), Some("select=*"));
    }

    #[test]
    fn last_order_wins_and_default_is_ascending() {
        let req = Query::table("snippets")
            .order("created_at", Direction::Descending)
            .order("title", Direction::default())
            .build(&config())
            .unwrap();
        assert_eq!(req.url.query(), Some("select=*&order=title.asc"));
    }

    #[test]
    fn filter_values_are_form_encoded() {
        let req = Query::table("snippets")
            .eq("section", "お客様の声 セクション")
            .build(&config())
            .unwrap();
        let pairs: Vec<(String, String)> = req.url.query_pairs().into_owned().collect();
        assert_eq!(pairs[1], ("section".into(), "eq.お客様の声 セクション".into()));
        assert!(req.url.query().unwrap().contains("section=eq.%E3%81%8A"));
        assert!(req.url.query().unwrap().contains('+'));
    }

    #[test]
    fn every_request_carries_credentials() {
        let req = Query::table("snippets").delete().eq("id", 7).build(&config()).unwrap();
        assert_eq!(header(&req, "apikey"), Some("anon-key"));
        assert_eq!(header(&req, "authorization"), Some("Bearer anon-key"));
        assert_eq!(header(&req, "content-type"), Some("application/json"));
    }

    #[test]
    fn insert_posts_body_and_requests_representation() {
        let row = json!({"title": "Hero A", "section": "ヒーローセクション"});
        let req = Query::table("snippets")
            .insert(row.clone())
            .build(&config())
            .unwrap();

        assert_eq!(req.method, Method::POST);
        assert_eq!(req.url.query(), None);
        assert_eq!(header(&req, "prefer"), Some("return=representation"));
        let sent: Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(sent, row);
    }

    #[test]
    fn update_keeps_filters_as_row_predicates() {
        let req = Query::table("snippets")
            .update(json!({"memo": "m"}))
            .eq("id", "abc")
            .build(&config())
            .unwrap();
        assert_eq!(req.method, Method::PATCH);
        assert_eq!(req.url.query(), Some("id=eq.abc"));
        assert_eq!(header(&req, "prefer"), Some("return=representation"));
        assert!(req.body.is_some());
    }

    #[test]
    fn delete_has_no_body_and_can_ask_for_count() {
        let req = Query::table("snippets")
            .delete()
            .eq("id", "abc")
            .count_exact()
            .build(&config())
            .unwrap();
        assert_eq!(req.method, Method::DELETE);
        assert!(req.body.is_none());
        assert_eq!(header(&req, "prefer"), Some("count=exact"));
    }

    #[test]
    fn select_after_insert_turns_back_into_a_read() {
        let req = Query::table("snippets")
            .insert(json!({"title": "x"}))
            .select("id,title")
            .build(&config())
            .unwrap();
        assert_eq!(req.method, Method::GET);
        assert!(req.body.is_none());
        assert_eq!(req.url.query(), Some("select=id%2Ctitle"));
    }
}
