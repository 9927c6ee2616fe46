//! SQLite store adapter
//!
//! One database file holds the `products` table (origin), the
//! `product_cache` table (database tier) and the style profile tables.
//! Timestamps are stored as Unix milliseconds so expiry predicates compare
//! integers.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;

use crate::domain::model::{FilterCriteria, Product};
use crate::domain::ports::{
    CacheRow, CacheStore, LocalProfileStore, ProductStore, RemoteProfileStore,
};
use crate::domain::profile::{LocalProfile, QuizAnswerRow, StyleProfile, SyncState, SyncStatus};
use crate::error::{Error, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    brand TEXT,
    price REAL NOT NULL DEFAULT 0,
    image_url TEXT,
    category TEXT NOT NULL DEFAULT '',
    type TEXT,
    gender TEXT,
    colors TEXT NOT NULL DEFAULT '[]',
    sizes TEXT NOT NULL DEFAULT '[]',
    tags TEXT NOT NULL DEFAULT '[]',
    retailer TEXT,
    affiliate_url TEXT,
    product_url TEXT,
    description TEXT,
    in_stock INTEGER NOT NULL DEFAULT 1,
    rating REAL,
    review_count INTEGER
);

CREATE INDEX IF NOT EXISTS idx_products_stock_category
    ON products(in_stock, category);

CREATE TABLE IF NOT EXISTS product_cache (
    cache_key TEXT PRIMARY KEY,
    products TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_product_cache_expires
    ON product_cache(expires_at);

CREATE TABLE IF NOT EXISTS style_profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT,
    session_id TEXT,
    profile TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_style_profiles_user
    ON style_profiles(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_style_profiles_session
    ON style_profiles(session_id, created_at);

CREATE TABLE IF NOT EXISTS quiz_answers (
    user_id TEXT NOT NULL,
    question_id TEXT NOT NULL,
    answer TEXT NOT NULL,
    PRIMARY KEY (user_id, question_id)
);

CREATE TABLE IF NOT EXISTS local_profile (
    slot INTEGER PRIMARY KEY CHECK (slot = 1),
    profile TEXT,
    sync_status TEXT NOT NULL DEFAULT 'unknown',
    last_sync INTEGER,
    session_id TEXT
);
"#;

const PRODUCT_COLUMNS: &str = "id, name, brand, price, image_url, category, type, gender, \
     colors, sizes, tags, retailer, affiliate_url, product_url, description, in_stock, \
     rating, review_count";

/// SQLite-backed product and cache store.
///
/// Thread-safe via a mutex on the connection; every call runs on the
/// blocking thread pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a database file and initialise the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::from_connection(conn)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            f(&mut conn)
        })
        .await
        .map_err(|e| Error::Internal(format!("SQLite task failed: {}", e)))?
    }

    /// Insert or replace products in the origin table.
    pub async fn insert_products(&self, products: Vec<Product>) -> Result<usize> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(&format!(
                    "INSERT OR REPLACE INTO products ({}) VALUES \
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                    PRODUCT_COLUMNS
                ))?;

                for p in &products {
                    stmt.execute(params![
                        p.id,
                        p.name,
                        p.brand,
                        p.price,
                        p.image_url,
                        p.category,
                        p.product_type,
                        p.gender,
                        serde_json::to_string(&p.colors)?,
                        serde_json::to_string(&p.sizes)?,
                        serde_json::to_string(&p.tags)?,
                        p.retailer,
                        p.affiliate_url,
                        p.product_url,
                        p.description,
                        p.in_stock,
                        p.rating,
                        p.review_count,
                    ])?;
                }
            }
            tx.commit()?;
            debug!(count = products.len(), "Inserted products");
            Ok(products.len())
        })
        .await
    }

    /// Save an individually answered question for `user_id`.
    pub async fn insert_quiz_answer(
        &self,
        user_id: &str,
        question_id: &str,
        answer: &serde_json::Value,
    ) -> Result<()> {
        let (user_id, question_id) = (user_id.to_string(), question_id.to_string());
        let answer = serde_json::to_string(answer)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO quiz_answers (user_id, question_id, answer) \
                 VALUES (?1, ?2, ?3)",
                params![user_id, question_id, answer],
            )?;
            Ok(())
        })
        .await
    }

    /// Number of rows in `product_cache`, live or expired.
    pub async fn cache_row_count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM product_cache", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }
}

/// Translate criteria into a WHERE clause and its positional parameters.
fn product_query(criteria: &FilterCriteria) -> (String, Vec<Value>) {
    let mut sql = format!("SELECT {} FROM products WHERE in_stock = 1", PRODUCT_COLUMNS);
    let mut args: Vec<Value> = Vec::new();

    if let Some(gender) = criteria.gender_restriction() {
        sql.push_str(" AND (gender = ? OR gender = 'unisex' OR gender IS NULL)");
        args.push(Value::Text(gender.as_str().to_string()));
    }

    let budget = criteria.budget.unwrap_or_default();
    if let Some(max) = budget.effective_max() {
        sql.push_str(" AND price <= ?");
        args.push(Value::Real(max));
    }
    if let Some(min) = budget.effective_min() {
        sql.push_str(" AND price >= ?");
        args.push(Value::Real(min));
    }

    for (column, values) in [("category", &criteria.categories), ("brand", &criteria.brands)] {
        if values.is_empty() {
            continue;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        sql.push_str(&format!(" AND {} IN ({})", column, placeholders));
        args.extend(values.iter().map(|v| Value::Text(v.clone())));
    }

    if let Some(rating) = criteria.effective_min_rating() {
        sql.push_str(" AND rating >= ?");
        args.push(Value::Real(rating));
    }

    sql.push_str(" ORDER BY rowid");
    (sql, args)
}

fn string_list(json: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(json)?)
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| Error::Internal(format!("timestamp out of range: {}", ms)))
}

#[async_trait]
impl ProductStore for SqliteStore {
    async fn query(&self, criteria: &FilterCriteria) -> Result<Vec<Product>> {
        let (sql, args) = product_query(criteria);

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args), |row| {
                let product = Product {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    brand: row.get("brand")?,
                    price: row.get("price")?,
                    image_url: row.get("image_url")?,
                    category: row.get("category")?,
                    product_type: row.get("type")?,
                    gender: row.get("gender")?,
                    colors: Vec::new(),
                    sizes: Vec::new(),
                    tags: Vec::new(),
                    retailer: row.get("retailer")?,
                    affiliate_url: row.get("affiliate_url")?,
                    product_url: row.get("product_url")?,
                    description: row.get("description")?,
                    in_stock: row.get("in_stock")?,
                    rating: row.get("rating")?,
                    review_count: row.get("review_count")?,
                };
                let lists: (String, String, String) =
                    (row.get("colors")?, row.get("sizes")?, row.get("tags")?);
                Ok((product, lists))
            })?;

            let mut products = Vec::new();
            for row in rows {
                let (mut product, (colors, sizes, tags)) = row?;
                product.colors = string_list(&colors)?;
                product.sizes = string_list(&sizes)?;
                product.tags = string_list(&tags)?;
                products.push(product);
            }
            Ok(products)
        })
        .await
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheRow>> {
        let key = key.to_string();

        self.with_conn(move |conn| {
            let found: Option<(String, i64, i64)> = conn
                .query_row(
                    "SELECT products, created_at, expires_at FROM product_cache \
                     WHERE cache_key = ?1 AND expires_at > ?2",
                    params![key, now.timestamp_millis()],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            match found {
                Some((products, created_at, expires_at)) => Ok(Some(CacheRow {
                    cache_key: key,
                    products: serde_json::from_str(&products)?,
                    created_at: from_millis(created_at)?,
                    expires_at: from_millis(expires_at)?,
                })),
                None => Ok(None),
            }
        })
        .await
    }

    async fn upsert(&self, row: CacheRow) -> Result<()> {
        let products = serde_json::to_string(&row.products)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO product_cache (cache_key, products, created_at, expires_at) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(cache_key) DO UPDATE SET \
                     products = excluded.products, \
                     created_at = excluded.created_at, \
                     expires_at = excluded.expires_at",
                params![
                    row.cache_key,
                    products,
                    row.created_at.timestamp_millis(),
                    row.expires_at.timestamp_millis()
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM product_cache WHERE cache_key = ?1", params![key])?;
            Ok(removed > 0)
        })
        .await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM product_cache WHERE expires_at < ?1",
                params![now.timestamp_millis()],
            )?;
            Ok(removed as u64)
        })
        .await
    }

    async fn clear(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM product_cache", [])?;
            Ok(removed as u64)
        })
        .await
    }
}

// =============================================================================
// Profile tables
// =============================================================================

/// Most recent `style_profiles` row whose `column` equals `owner`.
fn latest_profile(conn: &Connection, column: &str, owner: &str) -> Result<Option<StyleProfile>> {
    let found: Option<(i64, String, i64)> = conn
        .query_row(
            &format!(
                "SELECT id, profile, created_at FROM style_profiles WHERE {} = ?1 \
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                column
            ),
            params![owner],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    match found {
        Some((id, profile, created_at)) => {
            let mut profile: StyleProfile = serde_json::from_str(&profile)?;
            profile.id = Some(id);
            profile.created_at = Some(from_millis(created_at)?);
            Ok(Some(profile))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl RemoteProfileStore for SqliteStore {
    async fn latest_for_user(&self, user_id: &str) -> Result<Option<StyleProfile>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| latest_profile(conn, "user_id", &user_id))
            .await
    }

    async fn latest_for_session(&self, session_id: &str) -> Result<Option<StyleProfile>> {
        let session_id = session_id.to_string();
        self.with_conn(move |conn| latest_profile(conn, "session_id", &session_id))
            .await
    }

    async fn answers_for_user(&self, user_id: &str) -> Result<Vec<QuizAnswerRow>> {
        let user_id = user_id.to_string();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT question_id, answer FROM quiz_answers WHERE user_id = ?1 \
                 ORDER BY question_id",
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut answers = Vec::new();
            for row in rows {
                let (question_id, answer) = row?;
                answers.push(QuizAnswerRow {
                    question_id,
                    answer: serde_json::from_str(&answer)?,
                });
            }
            Ok(answers)
        })
        .await
    }

    async fn insert_profile(&self, profile: &StyleProfile) -> Result<i64> {
        let now = Utc::now();
        let created_at = profile.created_at.unwrap_or(now);
        let updated_at = profile.updated_at.unwrap_or(now);
        let (user_id, session_id) = (profile.user_id.clone(), profile.session_id.clone());
        let body = serde_json::to_string(profile)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO style_profiles (user_id, session_id, profile, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user_id,
                    session_id,
                    body,
                    created_at.timestamp_millis(),
                    updated_at.timestamp_millis()
                ],
            )?;
            let id = conn.last_insert_rowid();
            debug!(id, "Inserted style profile");
            Ok(id)
        })
        .await
    }

    async fn update_profile(&self, id: i64, profile: &StyleProfile) -> Result<()> {
        let updated_at = profile.updated_at.unwrap_or_else(Utc::now);
        let (user_id, session_id) = (profile.user_id.clone(), profile.session_id.clone());
        let body = serde_json::to_string(profile)?;

        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE style_profiles SET user_id = ?2, session_id = ?3, profile = ?4, \
                 updated_at = ?5 WHERE id = ?1",
                params![id, user_id, session_id, body, updated_at.timestamp_millis()],
            )?;
            if changed == 0 {
                return Err(Error::Internal(format!("no style profile with id {}", id)));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl LocalProfileStore for SqliteStore {
    async fn load(&self) -> Result<Option<LocalProfile>> {
        self.with_conn(|conn| {
            let profile: Option<Option<String>> = conn
                .query_row("SELECT profile FROM local_profile WHERE slot = 1", [], |row| {
                    row.get(0)
                })
                .optional()?;

            match profile.flatten() {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn save(&self, profile: &LocalProfile) -> Result<()> {
        let body = serde_json::to_string(profile)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO local_profile (slot, profile) VALUES (1, ?1) \
                 ON CONFLICT(slot) DO UPDATE SET profile = excluded.profile",
                params![body],
            )?;
            Ok(())
        })
        .await
    }

    async fn sync_state(&self) -> Result<SyncState> {
        self.with_conn(|conn| {
            let found: Option<(String, Option<i64>)> = conn
                .query_row(
                    "SELECT sync_status, last_sync FROM local_profile WHERE slot = 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((status, last_sync)) = found else {
                return Ok(SyncState::default());
            };
            let status = status.parse::<SyncStatus>().unwrap_or_default();
            Ok(SyncState {
                status,
                last_sync: last_sync.map(from_millis).transpose()?,
            })
        })
        .await
    }

    async fn set_sync_state(&self, state: SyncState) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO local_profile (slot, sync_status, last_sync) VALUES (1, ?1, ?2) \
                 ON CONFLICT(slot) DO UPDATE SET \
                     sync_status = excluded.sync_status, \
                     last_sync = excluded.last_sync",
                params![
                    state.status.as_str(),
                    state.last_sync.map(|at| at.timestamp_millis())
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn session_id(&self) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let session: Option<Option<String>> = conn
                .query_row("SELECT session_id FROM local_profile WHERE slot = 1", [], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(session.flatten())
        })
        .await
    }

    async fn set_session_id(&self, session_id: &str) -> Result<()> {
        let session_id = session_id.to_string();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO local_profile (slot, session_id) VALUES (1, ?1) \
                 ON CONFLICT(slot) DO UPDATE SET session_id = excluded.session_id",
                params![session_id],
            )?;
            Ok(())
        })
        .await
    }

    async fn clear_profile(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE local_profile SET profile = NULL, sync_status = 'unknown', \
                 last_sync = NULL WHERE slot = 1",
                [],
            )?;
            Ok(())
        })
        .await
    }
}
