//! Snippet CRUD gateway.
//!
//! Each operation builds its own [`Query`], issues exactly one store request,
//! and normalizes the outcome into a [`StorageError`] variant the HTTP layer
//! can map onto a status code.

use std::sync::Arc;

use uuid::Uuid;

use codestock_core::columns;
use codestock_core::models::section::section_filter;
use codestock_core::models::snippet::{NewSnippet, Snippet, SnippetPatch};
use codestock_core::payload;

use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::execute::{QueryOutput, Transport, execute};
use crate::http::HttpTransport;
use crate::query::{Direction, Query};

/// Markers that a store or proxy rejected the body for its size.
const TOO_LARGE_MARKERS: [&str; 2] = ["Request Entity Too Large", "FUNCTION_PAYLOAD_TOO_LARGE"];

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Section label; absent, blank, or `all` lists every section.
    pub section: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Clone)]
pub struct SnippetGateway {
    config: Arc<StoreConfig>,
    transport: Arc<dyn Transport>,
}

impl SnippetGateway {
    pub fn new(config: Arc<StoreConfig>, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Gateway over HTTP, honoring the configured request timeout.
    pub fn connect(config: StoreConfig) -> Result<Self, StorageError> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::new(Arc::new(config), Arc::new(transport)))
    }

    /// All snippets, newest first.
    pub async fn list(&self, filter: &ListFilter) -> Result<Vec<Snippet>, StorageError> {
        let mut query = self
            .query()
            .select(columns::ALL)
            .order(columns::CREATED_AT, Direction::Descending);
        if let Some(section) = section_filter(filter.section.as_deref()) {
            query = query.eq(columns::SECTION, section);
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let snippets: Vec<Snippet> = self.run(query).await?.rows()?;
        tracing::debug!(count = snippets.len(), section = ?filter.section, "listed snippets");
        Ok(snippets)
    }

    /// Zero matching rows is [`StorageError::NotFound`], never an empty record.
    pub async fn get(&self, id: Uuid) -> Result<Snippet, StorageError> {
        let query = self.query().select(columns::ALL).eq(columns::ID, id);
        self.run(query)
            .await?
            .rows()?
            .into_iter()
            .next()
            .ok_or(StorageError::NotFound { id })
    }

    /// Validate, check the size cap, then insert. Oversized bodies are
    /// rejected without contacting the store.
    pub async fn create(&self, snippet: NewSnippet) -> Result<Snippet, StorageError> {
        let snippet = snippet.into_validated()?;
        let row = serde_json::to_value(&snippet)?;
        check_size(&row)?;

        let output = self
            .run(self.query().insert(row))
            .await
            .map_err(remap_too_large)?;
        let created = output.rows::<Snippet>()?.into_iter().next().ok_or_else(|| {
            StorageError::MalformedResponse("insert returned no rows".to_string())
        })?;

        tracing::info!(id = %created.id, section = %created.section, "snippet created");
        Ok(created)
    }

    /// Partial update by id. `None` means no row matched.
    pub async fn update(
        &self,
        id: Uuid,
        patch: SnippetPatch,
    ) -> Result<Option<Snippet>, StorageError> {
        let patch = patch.into_validated()?;
        let body = serde_json::to_value(&patch)?;
        check_size(&body)?;

        let output = self
            .run(self.query().update(body).eq(columns::ID, id))
            .await
            .map_err(remap_too_large)?;
        let updated = output.rows::<Snippet>()?.into_iter().next();

        match &updated {
            Some(snippet) => tracing::info!(id = %snippet.id, "snippet updated"),
            None => tracing::debug!(%id, "update matched no rows"),
        }
        Ok(updated)
    }

    /// Hard delete by id. Returns `false` when the store reports that no row
    /// was deleted; a store that omits the count is taken at its word.
    pub async fn remove(&self, id: Uuid) -> Result<bool, StorageError> {
        let query = self.query().delete().eq(columns::ID, id).count_exact();
        let output = self.run(query).await?;
        let deleted = output.count.is_none_or(|n| n > 0);
        tracing::info!(%id, deleted, "snippet delete");
        Ok(deleted)
    }

    fn query(&self) -> Query {
        Query::table(self.config.table.as_str())
    }

    async fn run(&self, query: Query) -> Result<QueryOutput, StorageError> {
        let request = query.build(&self.config)?;
        execute(self.transport.as_ref(), request).await
    }
}

fn check_size(body: &serde_json::Value) -> Result<(), StorageError> {
    let size = payload::encoded_len(body)?;
    if payload::exceeds_limit(size) {
        tracing::warn!(size, limit = payload::MAX_WRITE_PAYLOAD_BYTES, "write payload too large");
        return Err(StorageError::PayloadTooLarge { size: Some(size) });
    }
    Ok(())
}

/// A 413 from the store, or a body naming a size rejection from a proxy in
/// front of it, is the same condition as the pre-flight size check.
fn remap_too_large(err: StorageError) -> StorageError {
    match err {
        StorageError::Upstream { status, ref body }
            if status == 413 || TOO_LARGE_MARKERS.iter().any(|m| body.contains(m)) =>
        {
            StorageError::PayloadTooLarge { size: None }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use reqwest::{Method, StatusCode};

    use super::*;
    use crate::memory::MemoryStore;
    use codestock_core::error::CoreError;
    use codestock_core::models::section::ALL_SECTIONS;

    const HERO: &str = "ヒーローセクション";
    const FOOTER: &str = "フッター";

    fn gateway() -> (SnippetGateway, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config = StoreConfig::new("http://store.test", "service-key").unwrap();
        let gateway = SnippetGateway::new(Arc::new(config), store.clone());
        (gateway, store)
    }

    fn new_snippet(title: &str, section: &str) -> NewSnippet {
        NewSnippet {
            title: title.to_string(),
            section: section.to_string(),
            company_name: "Acme".to_string(),
            tags: vec!["スライダー".to_string()],
            code: Some("<div class=\"hero\"></div>".to_string()),
            preview_image_url: Some("https://example.com/hero.png".to_string()),
            github_url: None,
            gist_url: None,
            public_url: None,
            memo: Some("first draft".to_string()),
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_timestamps() {
        let (gateway, _) = gateway();
        let created = gateway.create(new_snippet("Hero A", HERO)).await.unwrap();
        assert!(!created.id.is_nil());
        assert_eq!(created.created_at, created.updated_at);
    }

    #[tokio::test]
    async fn create_then_get_round_trips_submitted_fields() {
        let (gateway, _) = gateway();
        let input = new_snippet("Hero A", HERO);
        let created = gateway.create(input.clone()).await.unwrap();
        let fetched = gateway.get(created.id).await.unwrap();

        assert_eq!(fetched.title, input.title);
        assert_eq!(fetched.section, input.section);
        assert_eq!(fetched.company_name, input.company_name);
        assert_eq!(fetched.tags, input.tags);
        assert_eq!(fetched.code, input.code);
        assert_eq!(fetched.preview_image_url, input.preview_image_url);
        assert_eq!(fetched.memo, input.memo);
        assert_eq!(fetched.github_url, None);
    }

    #[tokio::test]
    async fn create_keeps_padding_and_repeated_tags() {
        let (gateway, _) = gateway();
        let mut input = new_snippet(" Hero A ", HERO);
        input.tags = vec!["b".to_string(), "b".to_string()];
        let created = gateway.create(input.clone()).await.unwrap();
        let fetched = gateway.get(created.id).await.unwrap();

        assert_eq!(fetched.title, " Hero A ");
        assert_eq!(fetched.tags, vec!["b", "b"]);
    }

    #[tokio::test]
    async fn update_with_null_clears_optional_column() {
        let (gateway, store) = gateway();
        let mut input = new_snippet("a", HERO);
        input.github_url = Some("https://github.com/acme/hero".to_string());
        let created = gateway.create(input).await.unwrap();
        assert!(created.github_url.is_some());

        let patch: SnippetPatch = serde_json::from_str(r#"{"github_url": null}"#).unwrap();
        let updated = gateway.update(created.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.github_url, None);
        assert_eq!(updated.memo, created.memo);

        let sent = store.requests().pop().unwrap();
        assert_eq!(sent.body.as_deref(), Some(br#"{"github_url":null}"#.as_slice()));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let (gateway, _) = gateway();
        for title in ["one", "two", "three"] {
            gateway.create(new_snippet(title, HERO)).await.unwrap();
        }
        let listed = gateway.list(&ListFilter::default()).await.unwrap();
        let titles: Vec<&str> = listed.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["three", "two", "one"]);
        assert!(listed.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn list_filters_by_section_and_ignores_all_sentinel() {
        let (gateway, _) = gateway();
        gateway.create(new_snippet("hero", HERO)).await.unwrap();
        gateway.create(new_snippet("footer", FOOTER)).await.unwrap();

        let heroes = gateway
            .list(&ListFilter {
                section: Some(HERO.to_string()),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(heroes.len(), 1);
        assert!(heroes.iter().all(|s| s.section == HERO));

        let everything = gateway
            .list(&ListFilter {
                section: Some(ALL_SECTIONS.to_string()),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[tokio::test]
    async fn list_honors_limit() {
        let (gateway, store) = gateway();
        for title in ["a", "b", "c"] {
            gateway.create(new_snippet(title, HERO)).await.unwrap();
        }
        let listed = gateway
            .list(&ListFilter {
                section: None,
                limit: Some(2),
            })
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        let last = store.requests().pop().unwrap();
        assert_eq!(
            last.url.query(),
            Some("select=*&order=created_at.desc&limit=2")
        );
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (gateway, _) = gateway();
        let id = Uuid::new_v4();
        let err = gateway.get(id).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { id: missing } if missing == id));
    }

    #[tokio::test]
    async fn oversized_create_never_reaches_the_store() {
        let (gateway, store) = gateway();
        let mut snippet = new_snippet("huge", HERO);
        snippet.code = Some("x".repeat(2 * 1024 * 1024));

        let err = gateway.create(snippet).await.unwrap_err();
        assert!(matches!(err, StorageError::PayloadTooLarge { size: Some(n) } if n > 2 * 1024 * 1024));
        assert_eq!(store.request_count(), 0);
        assert_eq!(store.row_count("snippets"), 0);
    }

    #[tokio::test]
    async fn oversized_update_never_reaches_the_store() {
        let (gateway, store) = gateway();
        let created = gateway.create(new_snippet("a", HERO)).await.unwrap();
        let patch = SnippetPatch {
            code: Some(Some("y".repeat(1024 * 1024 + 1))),
            ..Default::default()
        };
        let err = gateway.update(created.id, patch).await.unwrap_err();
        assert!(matches!(err, StorageError::PayloadTooLarge { .. }));
        assert_eq!(store.request_count(), 1);
    }

    #[tokio::test]
    async fn remote_size_rejections_become_payload_too_large() {
        let (gateway, store) = gateway();
        store.respond_next(StatusCode::PAYLOAD_TOO_LARGE, "");
        let err = gateway.create(new_snippet("a", HERO)).await.unwrap_err();
        assert!(matches!(err, StorageError::PayloadTooLarge { size: None }));

        store.respond_next(
            StatusCode::BAD_GATEWAY,
            "An error occurred: FUNCTION_PAYLOAD_TOO_LARGE",
        );
        let err = gateway.create(new_snippet("a", HERO)).await.unwrap_err();
        assert!(matches!(err, StorageError::PayloadTooLarge { size: None }));
    }

    #[tokio::test]
    async fn other_store_failures_keep_status() {
        let (gateway, store) = gateway();
        store.respond_next(StatusCode::UNAUTHORIZED, r#"{"message":"Invalid API key"}"#);
        let err = gateway.list(&ListFilter::default()).await.unwrap_err();
        assert!(matches!(err, StorageError::Upstream { status: 401, .. }));
    }

    #[tokio::test]
    async fn non_json_success_is_malformed() {
        let (gateway, store) = gateway();
        store.respond_next(StatusCode::OK, "<html>maintenance</html>");
        let err = gateway.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StorageError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn invalid_create_is_rejected_before_sending() {
        let (gateway, store) = gateway();
        let mut snippet = new_snippet("a", HERO);
        snippet.title = "  ".to_string();
        let err = gateway.create(snippet).await.unwrap_err();
        assert!(matches!(err, StorageError::Invalid(CoreError::MissingField(_))));
        assert_eq!(store.request_count(), 0);
    }

    #[tokio::test]
    async fn update_advances_updated_at_and_keeps_created_at() {
        let (gateway, store) = gateway();
        let created = gateway.create(new_snippet("a", HERO)).await.unwrap();
        let patch = SnippetPatch {
            title: Some("renamed".to_string()),
            ..Default::default()
        };
        let updated = gateway.update(created.id, patch).await.unwrap().unwrap();

        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.company_name, created.company_name);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);

        let sent = store.requests().pop().unwrap();
        assert_eq!(sent.method, Method::PATCH);
        assert_eq!(sent.url.query(), Some(format!("id=eq.{}", created.id).as_str()));
    }

    #[tokio::test]
    async fn update_of_missing_row_is_none() {
        let (gateway, _) = gateway();
        let patch = SnippetPatch {
            memo: Some(Some("m".to_string())),
            ..Default::default()
        };
        assert!(gateway.update(Uuid::new_v4(), patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn hero_scenario_create_list_remove_get() {
        let (gateway, _) = gateway();
        let input = NewSnippet {
            title: "Hero A".to_string(),
            section: HERO.to_string(),
            company_name: "Acme".to_string(),
            tags: vec!["スライダー".to_string()],
            code: None,
            preview_image_url: None,
            github_url: None,
            gist_url: None,
            public_url: None,
            memo: None,
        };
        let created = gateway.create(input).await.unwrap();

        let heroes = gateway
            .list(&ListFilter {
                section: Some(HERO.to_string()),
                limit: None,
            })
            .await
            .unwrap();
        assert!(heroes.iter().any(|s| s.id == created.id));

        assert!(gateway.remove(created.id).await.unwrap());
        assert!(matches!(
            gateway.get(created.id).await,
            Err(StorageError::NotFound { .. })
        ));
        assert!(!gateway.remove(created.id).await.unwrap());
    }
}
