// SQLite host registry. One row per (address, port); `id` is a surrogate key that
// survives address/port edits. Every operation is a single statement, so readers
// never observe a half-written row.

use crate::error::RegistryError;
use crate::models::{HostRecord, SystemFields, Target, now_ms};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

const HOST_COLUMNS: &str =
    "id, address, port, sysDescr, sysName, sysUpTime, sysLocation, customData, lastUpdated";

pub struct HostRepo {
    pool: SqlitePool,
}

impl HostRepo {
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hosts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                address TEXT NOT NULL,
                port INTEGER NOT NULL,
                sysDescr TEXT,
                sysName TEXT,
                sysUpTime TEXT,
                sysLocation TEXT,
                customData TEXT NOT NULL DEFAULT '',
                lastUpdated INTEGER NOT NULL,
                UNIQUE(address, port)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or refresh the row for `target`. Fields that are `None` keep their stored
    /// value; `customData` is never touched.
    #[instrument(skip(self, target, fields), fields(repo = "hosts", operation = "upsert", host = %target))]
    pub async fn upsert(
        &self,
        target: &Target,
        fields: &SystemFields,
    ) -> Result<HostRecord, RegistryError> {
        let sql = format!(
            r#"
            INSERT INTO hosts (address, port, sysDescr, sysName, sysUpTime, sysLocation, lastUpdated)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT(address, port) DO UPDATE SET
                sysDescr = COALESCE(excluded.sysDescr, hosts.sysDescr),
                sysName = COALESCE(excluded.sysName, hosts.sysName),
                sysUpTime = COALESCE(excluded.sysUpTime, hosts.sysUpTime),
                sysLocation = COALESCE(excluded.sysLocation, hosts.sysLocation),
                lastUpdated = excluded.lastUpdated
            RETURNING {HOST_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&target.address)
            .bind(i64::from(target.port))
            .bind(non_empty(&fields.sys_descr))
            .bind(non_empty(&fields.sys_name))
            .bind(non_empty(&fields.sys_up_time))
            .bind(non_empty(&fields.sys_location))
            .bind(now_ms())
            .fetch_one(&self.pool)
            .await?;
        Self::parse_host_row(&row)
    }

    /// All hosts in insertion (id) order.
    pub async fn list(&self) -> Result<Vec<HostRecord>, RegistryError> {
        let rows = sqlx::query(&format!("SELECT {HOST_COLUMNS} FROM hosts ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::parse_host_row).collect()
    }

    pub async fn get(&self, id: i64) -> Result<Option<HostRecord>, RegistryError> {
        let row = sqlx::query(&format!("SELECT {HOST_COLUMNS} FROM hosts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::parse_host_row).transpose()
    }

    pub async fn find(&self, target: &Target) -> Result<Option<HostRecord>, RegistryError> {
        let row = sqlx::query(&format!(
            "SELECT {HOST_COLUMNS} FROM hosts WHERE address = $1 AND port = $2"
        ))
        .bind(&target.address)
        .bind(i64::from(target.port))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::parse_host_row).transpose()
    }

    /// Targets of every stored host, in id order.
    pub async fn known_targets(&self) -> Result<Vec<Target>, RegistryError> {
        let rows = sqlx::query("SELECT address, port FROM hosts ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| -> Result<Target, RegistryError> {
                let address: String = row.try_get("address")?;
                let port: i64 = row.try_get("port")?;
                Ok(Target::new(address, decode_port(port)?))
            })
            .collect()
    }

    #[instrument(skip(self, text), fields(repo = "hosts", operation = "set_custom_data"))]
    pub async fn set_custom_data(&self, id: i64, text: &str) -> Result<(), RegistryError> {
        let r = sqlx::query("UPDATE hosts SET customData = $1 WHERE id = $2")
            .bind(text)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if r.rows_affected() == 0 {
            return Err(RegistryError::NotFound(id));
        }
        Ok(())
    }

    /// Move a row to a new address/port, keeping its id and every other column.
    #[instrument(skip(self, target), fields(repo = "hosts", operation = "relocate", host = %target))]
    pub async fn relocate(&self, id: i64, target: &Target) -> Result<HostRecord, RegistryError> {
        let row = sqlx::query(&format!(
            "UPDATE hosts SET address = $1, port = $2 WHERE id = $3 RETURNING {HOST_COLUMNS}"
        ))
        .bind(&target.address)
        .bind(i64::from(target.port))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RegistryError::Conflict(target.to_string())
            }
            other => RegistryError::Database(other),
        })?;
        match row {
            Some(row) => Self::parse_host_row(&row),
            None => Err(RegistryError::NotFound(id)),
        }
    }

    /// Remove by id. Returns whether a row existed; a missing id is not an error.
    #[instrument(skip(self), fields(repo = "hosts", operation = "delete"))]
    pub async fn delete(&self, id: i64) -> Result<bool, RegistryError> {
        let r = sqlx::query("DELETE FROM hosts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected() > 0)
    }

    #[instrument(skip(self, target), fields(repo = "hosts", operation = "delete_target", host = %target))]
    pub async fn delete_target(&self, target: &Target) -> Result<bool, RegistryError> {
        let r = sqlx::query("DELETE FROM hosts WHERE address = $1 AND port = $2")
            .bind(&target.address)
            .bind(i64::from(target.port))
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected() > 0)
    }

    fn parse_host_row(row: &SqliteRow) -> Result<HostRecord, RegistryError> {
        let port: i64 = row.try_get("port")?;
        Ok(HostRecord {
            id: row.try_get("id")?,
            address: row.try_get("address")?,
            port: decode_port(port)?,
            sys_descr: row.try_get("sysDescr")?,
            sys_name: row.try_get("sysName")?,
            sys_up_time: row.try_get("sysUpTime")?,
            sys_location: row.try_get("sysLocation")?,
            custom_data: row.try_get("customData")?,
            last_updated: row.try_get("lastUpdated")?,
        })
    }
}

fn decode_port(port: i64) -> Result<u16, RegistryError> {
    u16::try_from(port).map_err(|_| RegistryError::Invalid(format!("stored port {} out of range", port)))
}

/// Empty strings are stored as NULL so they never overwrite a known value.
fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
