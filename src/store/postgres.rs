//! PostgreSQL document store for production use.
//!
//! Documents are kept normalized as JSONB in a single table keyed by
//! `(collection, id)`. Reads fetch the root documents, then load the
//! referenced documents in batches (`id = ANY($1)`) and populate them to the
//! requested depth.
//!
//! ## Configuration
//!
//! All settings can be configured via environment variables:
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 10)
//! - `DB_MIN_CONNECTIONS`: Minimum idle connections (default: 2)
//! - `DB_CONNECT_TIMEOUT_SECS`: Connection timeout (default: 10)
//! - `DB_IDLE_TIMEOUT_SECS`: Idle connection timeout (default: 300)
//! - `DB_MAX_LIFETIME_SECS`: Max connection lifetime (default: 1800)

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Executor, Row};
use std::collections::BTreeSet;
use std::time::Duration;

use super::populate::{referenced_block_ids, strip_event, strip_experiment, strip_page, strip_variant, Library};
use super::{DocumentStore, ExperimentFilter};
use crate::hooks::{
    fill_page_block_ids, fill_reusable_block_ids, fill_variant_block_ids, stamp_event, stamp_lead,
    validate_experiment, validate_page_sections, ExperimentValidationError, SectionError,
};
use crate::types::{
    AnalyticsEvent, Document, DocumentId, Experiment, Lead, Page, PageVariant, ReusableBlockDocument,
};

/// Collection names.
pub mod collections {
    /// Pages.
    pub const PAGES: &str = "pages";
    /// Page variants.
    pub const PAGE_VARIANTS: &str = "page-variants";
    /// Reusable blocks.
    pub const REUSABLE_BLOCKS: &str = "reusable-blocks";
    /// Experiments.
    pub const EXPERIMENTS: &str = "experiments";
    /// Analytics events.
    pub const ANALYTICS_EVENTS: &str = "analytics-events";
    /// Leads.
    pub const LEADS: &str = "leads";
}

/// Unique index holding page slugs.
pub const PAGE_SLUG_INDEX: &str = "cms_documents_page_slug_key";

/// DDL for the document table.
pub const DOCUMENTS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cms_documents (
    collection  TEXT        NOT NULL,
    id          TEXT        NOT NULL,
    doc         JSONB       NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (collection, id)
);
DROP INDEX IF EXISTS cms_documents_slug_idx;
CREATE UNIQUE INDEX IF NOT EXISTS cms_documents_page_slug_key
    ON cms_documents ((doc->>'slug')) WHERE collection = 'pages';
CREATE INDEX IF NOT EXISTS cms_documents_experiment_idx
    ON cms_documents ((doc->>'experiment')) WHERE collection = 'analytics-events';
"#;

/// Configuration for PostgreSQL connection pool.
///
/// Production defaults:
/// - Pool size balances concurrency with connection limits
/// - Timeouts are aggressive to fail fast
/// - Max lifetime forces periodic reconnection
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum connections in pool (default: 10).
    pub max_connections: u32,
    /// Minimum idle connections to keep warm (default: 2).
    pub min_connections: u32,
    /// Connection acquire timeout in seconds (default: 10).
    pub connect_timeout_secs: u64,
    /// Idle connection timeout in seconds (default: 300 = 5 min).
    pub idle_timeout_secs: u64,
    /// Maximum connection lifetime in seconds (default: 1800 = 30 min).
    pub max_lifetime_secs: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Load configuration from environment variables with production defaults.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/cms".to_string()),
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: env_or("DB_MIN_CONNECTIONS", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 300),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Error type for PostgreSQL store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored document does not match its type.
    #[error("Document decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Another page already uses the slug.
    #[error("Slug already in use: {0}")]
    DuplicateSlug(String),

    /// Page sections rejected by the block registry.
    #[error(transparent)]
    InvalidPage(#[from] SectionError),

    /// Experiment rejected by validation.
    #[error(transparent)]
    InvalidExperiment(#[from] ExperimentValidationError),
}

/// Whether a database error is a violation of `constraint`.
fn violates(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation() && db.constraint() == Some(constraint),
        _ => false,
    }
}

/// Pool statistics for monitoring.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolStats {
    /// Current pool size.
    pub size: u32,
    /// Number of idle connections.
    pub idle: usize,
    /// Maximum pool size.
    pub max: u32,
}

/// PostgreSQL document store.
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Create a new store with the given configuration.
    pub async fn new(config: PostgresConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            connect_timeout_secs = config.connect_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_lifetime_secs = config.max_lifetime_secs,
            "Initializing PostgreSQL connection pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a store from environment variables.
    pub async fn from_env() -> Result<Self, sqlx::Error> {
        Self::new(PostgresConfig::from_env()).await
    }

    /// Create the document table if it does not exist.
    pub async fn migrate(&self) -> Result<(), PostgresError> {
        // Multiple statements need the simple query protocol
        self.pool.execute(DOCUMENTS_TABLE_SCHEMA).await?;
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get pool statistics for monitoring.
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.pool.options().get_max_connections(),
        }
    }

    fn decode<T: DeserializeOwned>(row: &PgRow) -> Result<T, PostgresError> {
        let Json(value): Json<serde_json::Value> = row.try_get("doc")?;
        Ok(serde_json::from_value(value)?)
    }

    async fn fetch_by_ids<T: DeserializeOwned>(
        &self,
        collection: &str,
        ids: &BTreeSet<DocumentId>,
    ) -> Result<Vec<T>, PostgresError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let rows = sqlx::query(
            r#"
            SELECT doc
            FROM cms_documents
            WHERE collection = $1 AND id = ANY($2)
            ORDER BY created_at, id
            "#,
        )
        .bind(collection)
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::decode).collect()
    }

    /// Load everything reachable from the given roots within two hops.
    async fn load_library(
        &self,
        variant_ids: BTreeSet<DocumentId>,
        mut page_ids: BTreeSet<DocumentId>,
        mut block_ids: BTreeSet<DocumentId>,
    ) -> Result<Library, PostgresError> {
        let mut library = Library::new();

        let variants: Vec<PageVariant> = self
            .fetch_by_ids(collections::PAGE_VARIANTS, &variant_ids)
            .await?;
        for variant in &variants {
            page_ids.insert(variant.page_id().clone());
            let overrides = [&variant.hero_override, &variant.content_override, &variant.footer_override];
            for blocks in overrides.into_iter().flatten() {
                block_ids.extend(referenced_block_ids(blocks));
            }
        }
        library.extend_variants(variants);

        let pages: Vec<Page> = self.fetch_by_ids(collections::PAGES, &page_ids).await?;
        for page in &pages {
            for section in [&page.hero, &page.content, &page.footer] {
                block_ids.extend(referenced_block_ids(section));
            }
        }
        library.extend_pages(pages);

        let blocks: Vec<ReusableBlockDocument> = self
            .fetch_by_ids(collections::REUSABLE_BLOCKS, &block_ids)
            .await?;
        library.extend_reusable_blocks(blocks);

        tracing::trace!(
            variants = library.variants.len(),
            pages = library.pages.len(),
            reusable_blocks = library.reusable_blocks.len(),
            "Loaded population library"
        );
        Ok(library)
    }

    async fn upsert<T: Serialize>(&self, collection: &str, id: &DocumentId, doc: &T) -> Result<(), PostgresError> {
        let value = serde_json::to_value(doc)?;
        sqlx::query(
            r#"
            INSERT INTO cms_documents (collection, id, doc)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET doc = EXCLUDED.doc, updated_at = now()
            "#,
        )
        .bind(collection)
        .bind(id.as_str())
        .bind(Json(value))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The stored version of a document, if any.
    async fn stored<T: DeserializeOwned>(&self, collection: &str, id: &DocumentId) -> Result<Option<T>, PostgresError> {
        let mut found = self
            .fetch_by_ids(collection, &BTreeSet::from([id.clone()]))
            .await?;
        Ok(found.pop())
    }

    /// Insert or replace a page.
    ///
    /// Block ids are generated when the page is created and carried over from
    /// the stored version when it is replaced. A slug owned by another page is
    /// refused with [`PostgresError::DuplicateSlug`].
    pub async fn put_page(&self, mut page: Page) -> Result<(), PostgresError> {
        validate_page_sections(&page)?;
        strip_page(&mut page);
        let stored: Option<Page> = self.stored(collections::PAGES, &page.id).await?;
        fill_page_block_ids(&mut page, stored.as_ref());

        match self.upsert(collections::PAGES, &page.id, &page).await {
            Err(PostgresError::Database(err)) if violates(&err, PAGE_SLUG_INDEX) => {
                tracing::warn!(slug = %page.slug, page = %page.id, "Rejected duplicate page slug");
                Err(PostgresError::DuplicateSlug(page.slug))
            }
            other => other,
        }
    }

    /// Insert or replace a page variant.
    pub async fn put_variant(&self, mut variant: PageVariant) -> Result<(), PostgresError> {
        strip_variant(&mut variant);
        let stored: Option<PageVariant> = self.stored(collections::PAGE_VARIANTS, &variant.id).await?;
        fill_variant_block_ids(&mut variant, stored.as_ref());
        self.upsert(collections::PAGE_VARIANTS, &variant.id, &variant).await
    }

    /// Insert or replace a reusable block.
    pub async fn put_reusable_block(&self, mut block: ReusableBlockDocument) -> Result<(), PostgresError> {
        let stored: Option<ReusableBlockDocument> = self.stored(collections::REUSABLE_BLOCKS, &block.id).await?;
        fill_reusable_block_ids(&mut block, stored.as_ref());
        self.upsert(collections::REUSABLE_BLOCKS, &block.id, &block).await
    }

    /// Insert or replace an experiment after validating it.
    pub async fn put_experiment(&self, mut experiment: Experiment) -> Result<(), PostgresError> {
        let unpopulated: BTreeSet<DocumentId> = experiment
            .variants
            .iter()
            .filter(|e| !e.variant.is_populated())
            .map(|e| e.variant.id().clone())
            .collect();
        let mut library = Library::new();
        library.extend_variants(
            self.fetch_by_ids::<PageVariant>(collections::PAGE_VARIANTS, &unpopulated)
                .await?,
        );

        validate_experiment(&experiment, |id| library.variant_page(id))?;
        strip_experiment(&mut experiment);
        self.upsert(collections::EXPERIMENTS, &experiment.id, &experiment).await
    }

    /// Record an analytics event. Returns its id.
    pub async fn put_event(&self, mut event: AnalyticsEvent) -> Result<DocumentId, PostgresError> {
        stamp_event(&mut event);
        strip_event(&mut event);
        let id = event
            .id
            .get_or_insert_with(|| DocumentId::new(uuid::Uuid::new_v4().to_string()))
            .clone();
        self.upsert(collections::ANALYTICS_EVENTS, &id, &event).await?;
        Ok(id)
    }

    /// Record a captured lead. Returns its id.
    pub async fn put_lead(&self, mut lead: Lead) -> Result<DocumentId, PostgresError> {
        stamp_lead(&mut lead);
        let id = lead
            .id
            .get_or_insert_with(|| DocumentId::new(uuid::Uuid::new_v4().to_string()))
            .clone();
        self.upsert(collections::LEADS, &id, &lead).await?;
        Ok(id)
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    type Error = PostgresError;

    async fn find_page_by_slug(&self, slug: &str, depth: u8) -> Result<Option<Page>, Self::Error> {
        let row = sqlx::query(
            r#"
            SELECT doc
            FROM cms_documents
            WHERE collection = $1 AND doc->>'slug' = $2
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .bind(collections::PAGES)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let page: Page = Self::decode(&row)?;
        if depth == 0 {
            return Ok(Some(page));
        }

        let mut block_ids = BTreeSet::new();
        for section in [&page.hero, &page.content, &page.footer] {
            block_ids.extend(referenced_block_ids(section));
        }
        let library = self
            .load_library(BTreeSet::new(), BTreeSet::new(), block_ids)
            .await?;
        Ok(Some(library.page_at_depth(&page, depth)))
    }

    async fn find_variant(&self, id: &DocumentId, depth: u8) -> Result<Option<PageVariant>, Self::Error> {
        let mut found: Vec<PageVariant> = self
            .fetch_by_ids(collections::PAGE_VARIANTS, &BTreeSet::from([id.clone()]))
            .await?;
        let Some(variant) = found.pop() else {
            return Ok(None);
        };
        if depth == 0 {
            return Ok(Some(variant));
        }

        let library = self
            .load_library(BTreeSet::from([variant.id().clone()]), BTreeSet::new(), BTreeSet::new())
            .await?;
        Ok(Some(library.variant_at_depth(&variant, depth)))
    }

    async fn find_experiments(
        &self,
        filter: &ExperimentFilter,
        depth: u8,
    ) -> Result<Vec<Experiment>, Self::Error> {
        let statuses: Vec<String> = filter.statuses.iter().map(ToString::to_string).collect();
        let rows = sqlx::query(
            r#"
            SELECT doc
            FROM cms_documents
            WHERE collection = $1
              AND ($2::text IS NULL OR doc->>'page' = $2)
              AND (cardinality($3::text[]) = 0 OR doc->>'status' = ANY($3))
            ORDER BY created_at, id
            "#,
        )
        .bind(collections::EXPERIMENTS)
        .bind(filter.page.as_ref().map(DocumentId::as_str))
        .bind(&statuses)
        .fetch_all(&self.pool)
        .await?;

        let experiments: Vec<Experiment> = rows.iter().map(Self::decode).collect::<Result<_, _>>()?;
        if depth == 0 || experiments.is_empty() {
            return Ok(experiments);
        }

        let variant_ids = experiments
            .iter()
            .flat_map(|e| e.variants.iter().map(|v| v.variant.id().clone()))
            .collect();
        let page_ids = experiments.iter().map(|e| e.page_id().clone()).collect();
        let library = self.load_library(variant_ids, page_ids, BTreeSet::new()).await?;

        Ok(experiments
            .iter()
            .map(|e| library.experiment_at_depth(e, depth))
            .collect())
    }

    async fn find_events(
        &self,
        experiment: &DocumentId,
        limit: usize,
    ) -> Result<Vec<AnalyticsEvent>, Self::Error> {
        let rows = sqlx::query(
            r#"
            SELECT doc
            FROM cms_documents
            WHERE collection = $1 AND doc->>'experiment' = $2
            ORDER BY created_at, id
            LIMIT $3
            "#,
        )
        .bind(collections::ANALYTICS_EVENTS)
        .bind(experiment.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::decode).collect()
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        std::env::remove_var("DB_MAX_CONNECTIONS");
        let config = PostgresConfig::from_env();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.max_lifetime_secs, 1800);
    }

    #[test]
    fn test_schema_mentions_every_index() {
        assert!(DOCUMENTS_TABLE_SCHEMA.contains("PRIMARY KEY (collection, id)"));
        assert!(DOCUMENTS_TABLE_SCHEMA.contains(collections::ANALYTICS_EVENTS));
    }

    #[test]
    fn test_page_slugs_are_unique() {
        let unique = format!("CREATE UNIQUE INDEX IF NOT EXISTS {}", PAGE_SLUG_INDEX);
        assert!(DOCUMENTS_TABLE_SCHEMA.contains(&unique));
        assert!(DOCUMENTS_TABLE_SCHEMA.contains("WHERE collection = 'pages'"));
        // The old non-unique index would otherwise linger next to it
        assert!(DOCUMENTS_TABLE_SCHEMA.contains("DROP INDEX IF EXISTS cms_documents_slug_idx"));
    }

    #[test]
    fn test_only_database_errors_violate_constraints() {
        assert!(!violates(&sqlx::Error::RowNotFound, PAGE_SLUG_INDEX));
        assert!(!violates(&sqlx::Error::PoolTimedOut, PAGE_SLUG_INDEX));
    }

    #[test]
    fn test_duplicate_slug_message() {
        let err = PostgresError::DuplicateSlug("home".to_string());
        assert_eq!(err.to_string(), "Slug already in use: home");
    }
}
