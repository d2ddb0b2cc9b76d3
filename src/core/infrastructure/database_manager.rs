use crate::interface::repository::backup_job::BackupJobRepository;
use crate::interface::repository::destination::DestinationRepository;
use crate::interface::repository::recurrence_rule::RecurrenceRuleRepository;
use crate::interface::repository::schedule::ScheduleRepository;
use crate::model::error::Error;
use crate::model::error::database::DatabaseError;
use crate::model::log::database::DatabaseLog;
use macros::log;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(database_url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(DatabaseError::DatabaseConnectFailed)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(DatabaseError::DatabaseConnectFailed)?;
        log!(DatabaseLog::DatabaseConnectSuccess);
        Self::with_pool(pool).await
    }

    /// Private in-memory database, one connection so every query sees it.
    pub async fn in_memory() -> Result<Self, Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(DatabaseError::DatabaseConnectFailed)?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, Error> {
        let database_manager = Self { pool };
        if !database_manager.exist_table("RecurrenceRules").await {
            database_manager.create_recurrence_rule_table().await?;
            log!(DatabaseLog::TableCreated {
                table: "RecurrenceRules".to_string()
            });
        }
        if !database_manager.exist_table("Destinations").await {
            database_manager.create_destination_table().await?;
            log!(DatabaseLog::TableCreated {
                table: "Destinations".to_string()
            });
        }
        if !database_manager.exist_table("Schedules").await {
            database_manager.create_schedule_table().await?;
            log!(DatabaseLog::TableCreated {
                table: "Schedules".to_string()
            });
        }
        if !database_manager.exist_table("BackupJobs").await {
            database_manager.create_backup_job_table().await?;
            log!(DatabaseLog::TableCreated {
                table: "BackupJobs".to_string()
            });
        }
        if !database_manager.exist_table("BackupJobTransitions").await {
            database_manager.create_backup_job_transition_table().await?;
            log!(DatabaseLog::TableCreated {
                table: "BackupJobTransitions".to_string()
            });
        }
        Ok(database_manager)
    }

    pub fn get_pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub async fn close_connection(&self) {
        self.pool.close().await;
        log!(DatabaseLog::ConnectionClosed);
    }

    pub async fn exist_table(&self, table_name: &str) -> bool {
        let pool = self.get_pool();
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
        )
        .bind(table_name)
        .fetch_one(&pool)
        .await
        .unwrap_or(false)
    }
}

pub fn uuid_column(row: &SqliteRow, column: &str) -> Result<Uuid, DatabaseError> {
    let bytes: Vec<u8> = row
        .try_get(column)
        .map_err(|_| DatabaseError::DataCorrupted(column))?;
    Uuid::from_slice(&bytes).map_err(|_| DatabaseError::DataCorrupted(column))
}

pub fn optional_uuid_column(row: &SqliteRow, column: &str) -> Result<Option<Uuid>, DatabaseError> {
    let bytes: Option<Vec<u8>> = row
        .try_get(column)
        .map_err(|_| DatabaseError::DataCorrupted(column))?;
    bytes
        .map(|bytes| Uuid::from_slice(&bytes).map_err(|_| DatabaseError::DataCorrupted(column)))
        .transpose()
}
