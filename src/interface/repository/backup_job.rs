use crate::core::infrastructure::database_manager::{DatabaseManager, uuid_column};
use crate::model::backup::backup_job::{BackupJob, JobKind};
use crate::model::backup::job_state::{BackupState, Transition};
use crate::model::error::Error;
use crate::model::error::database::DatabaseError;
use crate::model::error::misc::MiscError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use std::path::PathBuf;
use uuid::Uuid;

const SELECT_JOBS: &str = r#"
    SELECT
        uuid,
        schedule_uuid,
        time,
        local_file,
        size,
        destination_name,
        kind,
        state,
        last_error,
        remote_id
    FROM BackupJobs
"#;

pub trait BackupJobRepository {
    async fn create_backup_job_table(&self) -> Result<(), Error>;
    async fn create_backup_job_transition_table(&self) -> Result<(), Error>;
    /// Inserts a fresh job. A scheduled job for an occurrence that already
    /// has one is ignored; returns whether the row was inserted.
    async fn insert_backup_job(&self, job: &BackupJob) -> Result<bool, Error>;
    /// Writes the job row and appends `transitions` in one transaction.
    async fn save_backup_job(&self, job: &BackupJob, transitions: &[Transition])
    -> Result<(), Error>;
    async fn get_backup_job(&self, uuid: Uuid) -> Result<Option<BackupJob>, Error>;
    async fn get_backup_jobs_in(&self, states: &[BackupState]) -> Result<Vec<BackupJob>, Error>;
    async fn get_backup_jobs_of(&self, schedule_uuid: Uuid) -> Result<Vec<BackupJob>, Error>;
    /// States the job has been in, oldest first, starting with its creation.
    async fn get_state_history(&self, uuid: Uuid) -> Result<Vec<BackupState>, Error>;
}

impl BackupJobRepository for DatabaseManager {
    async fn create_backup_job_table(&self) -> Result<(), Error> {
        let pool = self.get_pool();
        sqlx::query(
            r#"
            CREATE TABLE BackupJobs (
                uuid BLOB PRIMARY KEY,
                schedule_uuid BLOB NOT NULL,
                time TEXT NOT NULL,
                local_file TEXT,
                size INTEGER,
                destination_name TEXT NOT NULL,
                kind TEXT NOT NULL,
                state TEXT NOT NULL,
                last_error TEXT,
                remote_id INTEGER
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX BackupJobsOccurrence
            ON BackupJobs (schedule_uuid, time)
            WHERE kind = 'SCHEDULED'
            "#,
        )
        .execute(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(())
    }

    async fn create_backup_job_transition_table(&self) -> Result<(), Error> {
        let pool = self.get_pool();
        sqlx::query(
            r#"
            CREATE TABLE BackupJobTransitions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_uuid BLOB NOT NULL,
                from_state TEXT,
                to_state TEXT NOT NULL,
                at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(())
    }

    async fn insert_backup_job(&self, job: &BackupJob) -> Result<bool, Error> {
        let pool = self.get_pool();
        let mut tx = pool.begin().await.map_err(DatabaseError::TransactionFailed)?;
        let last_error = encode_error(job)?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO BackupJobs (
                uuid,
                schedule_uuid,
                time,
                local_file,
                size,
                destination_name,
                kind,
                state,
                last_error,
                remote_id
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.uuid.as_bytes().as_slice())
        .bind(job.schedule_uuid.as_bytes().as_slice())
        .bind(job.time)
        .bind(local_file(job))
        .bind(size(job))
        .bind(&job.destination_name)
        .bind(job.kind.as_str())
        .bind(job.state.as_str())
        .bind(last_error)
        .bind(job.remote_id)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;

        let inserted = result.rows_affected() == 1;
        if inserted {
            append_transition(&mut tx, job.uuid, None, job.state).await?;
        }
        tx.commit().await.map_err(DatabaseError::TransactionFailed)?;
        Ok(inserted)
    }

    async fn save_backup_job(
        &self,
        job: &BackupJob,
        transitions: &[Transition],
    ) -> Result<(), Error> {
        let pool = self.get_pool();
        let mut tx = pool.begin().await.map_err(DatabaseError::TransactionFailed)?;
        let last_error = encode_error(job)?;

        sqlx::query(
            r#"
            UPDATE BackupJobs
            SET
                local_file = ?,
                size = ?,
                destination_name = ?,
                state = ?,
                last_error = ?,
                remote_id = ?
            WHERE uuid = ?
            "#,
        )
        .bind(local_file(job))
        .bind(size(job))
        .bind(&job.destination_name)
        .bind(job.state.as_str())
        .bind(last_error)
        .bind(job.remote_id)
        .bind(job.uuid.as_bytes().as_slice())
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;

        for transition in transitions {
            append_transition(&mut tx, job.uuid, Some(transition.from), transition.to).await?;
        }
        tx.commit().await.map_err(DatabaseError::TransactionFailed)?;
        Ok(())
    }

    async fn get_backup_job(&self, uuid: Uuid) -> Result<Option<BackupJob>, Error> {
        let pool = self.get_pool();
        let row = sqlx::query(&format!("{SELECT_JOBS} WHERE uuid = ?"))
            .bind(uuid.as_bytes().as_slice())
            .fetch_optional(&pool)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        row.map(|row| job_from_row(&row)).transpose()
    }

    async fn get_backup_jobs_in(&self, states: &[BackupState]) -> Result<Vec<BackupJob>, Error> {
        if states.is_empty() {
            return Ok(Vec::new());
        }
        let pool = self.get_pool();
        let placeholders = vec!["?"; states.len()].join(", ");
        let sql = format!("{SELECT_JOBS} WHERE state IN ({placeholders}) ORDER BY time");
        let mut query = sqlx::query(&sql);
        for state in states {
            query = query.bind(state.as_str());
        }
        let rows = query
            .fetch_all(&pool)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        rows.iter().map(job_from_row).collect()
    }

    async fn get_backup_jobs_of(&self, schedule_uuid: Uuid) -> Result<Vec<BackupJob>, Error> {
        let pool = self.get_pool();
        let rows = sqlx::query(&format!("{SELECT_JOBS} WHERE schedule_uuid = ? ORDER BY time"))
            .bind(schedule_uuid.as_bytes().as_slice())
            .fetch_all(&pool)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        rows.iter().map(job_from_row).collect()
    }

    async fn get_state_history(&self, uuid: Uuid) -> Result<Vec<BackupState>, Error> {
        let pool = self.get_pool();
        let states = sqlx::query_scalar::<_, String>(
            "SELECT to_state FROM BackupJobTransitions WHERE job_uuid = ? ORDER BY id",
        )
        .bind(uuid.as_bytes().as_slice())
        .fetch_all(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        states
            .iter()
            .map(|state| state.parse::<BackupState>().map_err(Error::from))
            .collect()
    }
}

async fn append_transition(
    tx: &mut Transaction<'_, Sqlite>,
    job_uuid: Uuid,
    from: Option<BackupState>,
    to: BackupState,
) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO BackupJobTransitions (job_uuid, from_state, to_state, at) VALUES (?, ?, ?, ?)",
    )
    .bind(job_uuid.as_bytes().as_slice())
    .bind(from.map(|state| state.as_str()))
    .bind(to.as_str())
    .bind(Utc::now())
    .execute(&mut **tx)
    .await
    .map_err(DatabaseError::StatementExecutionFailed)?;
    Ok(())
}

fn encode_error(job: &BackupJob) -> Result<Option<String>, Error> {
    job.last_error
        .as_ref()
        .map(|error| {
            serde_json::to_string(error).map_err(|err| Error::from(MiscError::SerializeError(err)))
        })
        .transpose()
}

fn local_file(job: &BackupJob) -> Option<String> {
    job.local_file
        .as_ref()
        .map(|path| path.to_string_lossy().to_string())
}

fn size(job: &BackupJob) -> Option<i64> {
    job.size.and_then(|size| i64::try_from(size).ok())
}

fn job_from_row(row: &SqliteRow) -> Result<BackupJob, Error> {
    let time: DateTime<Utc> = row
        .try_get("time")
        .map_err(|_| DatabaseError::DataCorrupted("time"))?;
    let kind: String = row.get("kind");
    let state: String = row.get("state");
    let last_error: Option<String> = row.get("last_error");
    let last_error = last_error
        .map(|error| serde_json::from_str(&error).map_err(MiscError::DeserializeError))
        .transpose()?;
    let size: Option<i64> = row.get("size");

    Ok(BackupJob {
        uuid: uuid_column(row, "uuid")?,
        schedule_uuid: uuid_column(row, "schedule_uuid")?,
        time,
        local_file: row.get::<Option<String>, _>("local_file").map(PathBuf::from),
        size: size.and_then(|size| u64::try_from(size).ok()),
        destination_name: row.get("destination_name"),
        kind: kind.parse::<JobKind>()?,
        state: state.parse::<BackupState>()?,
        last_error,
        remote_id: row.get("remote_id"),
    })
}
