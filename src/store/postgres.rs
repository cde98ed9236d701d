//! PostgreSQL form store
//!
//! Rows live in the `forms` table. Tags are kept as a comma-separated TEXT
//! column. Older `forms` tables (plain `TIMESTAMP` columns, nullable
//! `tags`/`xml_data`, no unique constraint on `name`) are read as well: timestamps are cast to `TIMESTAMPTZ` in SQL and saves
//! serialize on a per-name advisory lock instead of relying on the index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{info, warn};

use super::{FormId, FormRef, FormStore, FormSummary, NewForm, StoredForm};
use crate::error::{FormError, Result};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost:5432/soar_forms".to_string()),
            max_connections: std::env::var("DATABASE_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

impl DatabaseConfig {
    pub async fn connect(&self) -> Result<PgPool> {
        info!(
            "Connecting to database: {}",
            mask_database_url(&self.database_url)
        );

        let mut options = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.connection_timeout);
        if let Some(idle_timeout) = self.idle_timeout {
            options = options.idle_timeout(idle_timeout);
        }

        let pool = options.connect(&self.database_url).await.map_err(|e| {
            warn!("Failed to connect to database: {}", e);
            FormError::from(e)
        })?;
        Ok(pool)
    }
}

pub struct PgFormStore {
    pool: PgPool,
}

impl PgFormStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `forms` table if it does not exist.
    pub async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS forms (
                id SERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                label TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '',
                xml_data TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

const FORM_COLUMNS: &str = "id, name, label, tags, xml_data, \
    created_at::timestamptz AS created_at, updated_at::timestamptz AS updated_at";

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn row_to_form(row: &PgRow) -> Result<StoredForm> {
    let id: i32 = row.try_get("id")?;
    let tags: Option<String> = row.try_get("tags")?;
    let xml_data: Option<String> = row.try_get("xml_data")?;
    let created_at: Option<DateTime<Utc>> = row.try_get("created_at")?;
    let updated_at: Option<DateTime<Utc>> = row.try_get("updated_at")?;
    let created_at = created_at.unwrap_or_else(Utc::now);
    Ok(StoredForm {
        id: FormId::from(id),
        name: row.try_get("name")?,
        label: row.try_get("label")?,
        tags: split_tags(tags.as_deref().unwrap_or_default()),
        xml_data: xml_data.unwrap_or_default(),
        created_at,
        updated_at: updated_at.unwrap_or(created_at),
    })
}

/// A concurrent insert that lost the race on a unique `name` index.
fn save_error(error: sqlx::Error, name: &str) -> FormError {
    let code = error
        .as_database_error()
        .and_then(|db| db.code())
        .map(|code| code.into_owned());
    if is_unique_violation(code.as_deref()) {
        FormError::Conflict {
            name: name.to_string(),
        }
    } else {
        FormError::from(error)
    }
}

fn is_unique_violation(code: Option<&str>) -> bool {
    code == Some(UNIQUE_VIOLATION)
}

fn row_id(id: FormId) -> Result<i32> {
    i32::try_from(id).map_err(|_| FormError::NotFound {
        reference: FormRef::Id(id).to_string(),
    })
}

#[async_trait]
impl FormStore for PgFormStore {
    async fn save(&self, form: &NewForm, overwrite: bool) -> Result<StoredForm> {
        let mut tx = self.pool.begin().await?;

        // Held until commit/rollback. Covers the case where no row exists yet
        // and `FOR UPDATE` has nothing to lock.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&form.name)
            .execute(&mut *tx)
            .await?;

        let existing: Option<i32> =
            sqlx::query_scalar("SELECT id FROM forms WHERE name = $1 ORDER BY id LIMIT 1 FOR UPDATE")
                .bind(&form.name)
                .fetch_optional(&mut *tx)
                .await?;

        let row = match existing {
            Some(_) if !overwrite => {
                return Err(FormError::Conflict {
                    name: form.name.clone(),
                })
            }
            Some(id) => {
                sqlx::query(&format!(
                    "UPDATE forms SET label = $2, tags = $3, xml_data = $4, updated_at = NOW() \
                     WHERE id = $1 RETURNING {}",
                    FORM_COLUMNS
                ))
                .bind(id)
                .bind(&form.label)
                .bind(join_tags(&form.tags))
                .bind(&form.xml_data)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| save_error(e, &form.name))?
            }
            None => {
                sqlx::query(&format!(
                    "INSERT INTO forms (name, label, tags, xml_data) VALUES ($1, $2, $3, $4) \
                     RETURNING {}",
                    FORM_COLUMNS
                ))
                .bind(&form.name)
                .bind(&form.label)
                .bind(join_tags(&form.tags))
                .bind(&form.xml_data)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| save_error(e, &form.name))?
            }
        };

        tx.commit().await.map_err(|e| save_error(e, &form.name))?;
        let stored = row_to_form(&row)?;
        info!(id = stored.id, name = %stored.name, overwrite, "saved form");
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<FormSummary>> {
        let rows = sqlx::query("SELECT id, name, label FROM forms ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| -> Result<FormSummary> {
                let id: i32 = row.try_get("id")?;
                Ok(FormSummary {
                    id: FormId::from(id),
                    name: row.try_get("name")?,
                    label: row.try_get("label")?,
                })
            })
            .collect()
    }

    async fn get(&self, reference: &FormRef) -> Result<StoredForm> {
        let query = match reference {
            FormRef::Id(id) => {
                sqlx::query(&format!("SELECT {} FROM forms WHERE id = $1", FORM_COLUMNS))
                    .bind(row_id(*id)?)
                    .fetch_optional(&self.pool)
                    .await?
            }
            FormRef::Name(name) => {
                sqlx::query(&format!(
                    "SELECT {} FROM forms WHERE name = $1 ORDER BY id LIMIT 1",
                    FORM_COLUMNS
                ))
                    .bind(name)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        let row = query.ok_or_else(|| FormError::NotFound {
            reference: reference.to_string(),
        })?;
        row_to_form(&row)
    }

    async fn delete(&self, id: FormId) -> Result<StoredForm> {
        let row = sqlx::query(&format!(
            "DELETE FROM forms WHERE id = $1 RETURNING {}",
            FORM_COLUMNS
        ))
        .bind(row_id(id)?)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| FormError::NotFound {
            reference: FormRef::Id(id).to_string(),
        })?;
        let removed = row_to_form(&row)?;
        info!(id, name = %removed.name, "deleted form");
        Ok(removed)
    }
}

/// Mask sensitive information in database URL for logging
pub fn mask_database_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_password() {
        assert_eq!(
            mask_database_url("postgresql://forms:s3cret@db:5432/soar"),
            "postgresql://forms:***@db:5432/soar"
        );
        assert_eq!(mask_database_url("not a url"), "***");
    }

    #[test]
    fn tags_column_round_trip() {
        let tags = vec!["soc".to_string(), "phishing".to_string()];
        assert_eq!(split_tags(&join_tags(&tags)), tags);
        assert!(split_tags("").is_empty());
        assert_eq!(split_tags(" a , ,b"), vec!["a", "b"]);
    }

    #[test]
    fn unique_violation_code() {
        assert!(is_unique_violation(Some("23505")));
        assert!(!is_unique_violation(Some("23503")));
        assert!(!is_unique_violation(None));
        let err = save_error(sqlx::Error::RowNotFound, "x");
        assert!(matches!(err, FormError::Storage(_)));
    }

    #[test]
    fn timestamps_are_read_as_timestamptz() {
        assert!(FORM_COLUMNS.contains("created_at::timestamptz AS created_at"));
        assert!(FORM_COLUMNS.contains("updated_at::timestamptz AS updated_at"));
    }

    #[test]
    fn default_config_reads_pool_size() {
        let config = DatabaseConfig::default();
        assert!(config.max_connections > 0);
    }
}
