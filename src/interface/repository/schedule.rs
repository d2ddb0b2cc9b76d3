use crate::core::infrastructure::database_manager::{
    DatabaseManager, optional_uuid_column, uuid_column,
};
use crate::model::backup::job_state::BackupState;
use crate::model::error::Error;
use crate::model::error::database::DatabaseError;
use crate::model::log::schedule::ScheduleLog;
use crate::model::schedule::recurrence_rule::RecurrenceRule;
use crate::model::schedule::schedule::Schedule;
use crate::utils::time::normalize_time;
use chrono::{DateTime, Utc};
use macros::log;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

const SELECT_SCHEDULES: &str = r#"
    SELECT
        s.uuid,
        s.destination,
        s.schedule_time,
        s.active,
        s.rule_uuid,
        r.name AS rule_name,
        r.description AS rule_description,
        r.frequency AS rule_frequency,
        r.params AS rule_params
    FROM Schedules s
    LEFT JOIN RecurrenceRules r ON r.uuid = s.rule_uuid
"#;

pub trait ScheduleRepository {
    async fn create_schedule_table(&self) -> Result<(), Error>;
    async fn save_schedule(&self, schedule: &Schedule) -> Result<(), Error>;
    async fn remove_schedule(&self, uuid: Uuid) -> Result<(), Error>;
    async fn get_schedule(&self, uuid: Uuid) -> Result<Option<Schedule>, Error>;
    async fn get_all_schedules(&self) -> Result<Vec<Schedule>, Error>;
    async fn get_active_schedules(&self) -> Result<Vec<Schedule>, Error>;
}

impl ScheduleRepository for DatabaseManager {
    async fn create_schedule_table(&self) -> Result<(), Error> {
        let pool = self.get_pool();
        sqlx::query(
            r#"
            CREATE TABLE Schedules (
                uuid BLOB PRIMARY KEY,
                destination TEXT,
                schedule_time TEXT NOT NULL,
                rule_uuid BLOB,
                active INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(())
    }

    /// Upserts the schedule together with its rule. The schedule time is
    /// normalized again on every write.
    async fn save_schedule(&self, schedule: &Schedule) -> Result<(), Error> {
        let pool = self.get_pool();
        let mut tx = pool.begin().await.map_err(DatabaseError::TransactionFailed)?;

        if let Some(rule) = &schedule.rule {
            let params = (!rule.params().is_empty()).then(|| rule.params().to_string());
            sqlx::query(
                r#"
                INSERT INTO RecurrenceRules (uuid, name, description, frequency, params)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(uuid) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    frequency = excluded.frequency,
                    params = excluded.params
                "#,
            )
            .bind(rule.uuid.as_bytes().as_slice())
            .bind(&rule.name)
            .bind(&rule.description)
            .bind(rule.frequency.as_str())
            .bind(params)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        }

        sqlx::query(
            r#"
            INSERT INTO Schedules (uuid, destination, schedule_time, rule_uuid, active)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(uuid) DO UPDATE SET
                destination = excluded.destination,
                schedule_time = excluded.schedule_time,
                rule_uuid = excluded.rule_uuid,
                active = excluded.active
            "#,
        )
        .bind(schedule.uuid.as_bytes().as_slice())
        .bind(schedule.destination.as_deref())
        .bind(normalize_time(schedule.schedule_time()))
        .bind(schedule.rule.as_ref().map(|rule| rule.uuid.as_bytes().to_vec()))
        .bind(schedule.active)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;

        tx.commit().await.map_err(DatabaseError::TransactionFailed)?;
        Ok(())
    }

    /// Deletes the schedule and the IDLE jobs still waiting on it. Jobs past
    /// IDLE are kept.
    async fn remove_schedule(&self, uuid: Uuid) -> Result<(), Error> {
        let pool = self.get_pool();
        let mut tx = pool.begin().await.map_err(DatabaseError::TransactionFailed)?;

        sqlx::query(
            r#"
            DELETE FROM BackupJobTransitions
            WHERE job_uuid IN (
                SELECT uuid FROM BackupJobs WHERE schedule_uuid = ? AND state = ?
            )
            "#,
        )
        .bind(uuid.as_bytes().as_slice())
        .bind(BackupState::Idle.as_str())
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;

        sqlx::query("DELETE FROM BackupJobs WHERE schedule_uuid = ? AND state = ?")
            .bind(uuid.as_bytes().as_slice())
            .bind(BackupState::Idle.as_str())
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;

        sqlx::query("DELETE FROM Schedules WHERE uuid = ?")
            .bind(uuid.as_bytes().as_slice())
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;

        tx.commit().await.map_err(DatabaseError::TransactionFailed)?;
        Ok(())
    }

    async fn get_schedule(&self, uuid: Uuid) -> Result<Option<Schedule>, Error> {
        let pool = self.get_pool();
        let row = sqlx::query(&format!("{SELECT_SCHEDULES} WHERE s.uuid = ?"))
            .bind(uuid.as_bytes().as_slice())
            .fetch_optional(&pool)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        row.map(|row| schedule_from_row(&row)).transpose()
    }

    async fn get_all_schedules(&self) -> Result<Vec<Schedule>, Error> {
        let pool = self.get_pool();
        let rows = sqlx::query(SELECT_SCHEDULES)
            .fetch_all(&pool)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(usable_schedules(&rows))
    }

    async fn get_active_schedules(&self) -> Result<Vec<Schedule>, Error> {
        let pool = self.get_pool();
        let rows = sqlx::query(&format!("{SELECT_SCHEDULES} WHERE s.active = 1"))
            .fetch_all(&pool)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(usable_schedules(&rows))
    }
}

// A broken rule must not stop the others from running.
fn usable_schedules(rows: &[SqliteRow]) -> Vec<Schedule> {
    let mut schedules = Vec::with_capacity(rows.len());
    for row in rows {
        match schedule_from_row(row) {
            Ok(schedule) => schedules.push(schedule),
            Err(err) => {
                let uuid = uuid_column(row, "uuid").unwrap_or_default();
                log!(ScheduleLog::UnusableRule { uuid });
                log!(err);
            }
        }
    }
    schedules
}

fn schedule_from_row(row: &SqliteRow) -> Result<Schedule, Error> {
    let uuid = uuid_column(row, "uuid")?;
    let schedule_time: DateTime<Utc> = row
        .try_get("schedule_time")
        .map_err(|_| DatabaseError::DataCorrupted("schedule_time"))?;

    let rule = match optional_uuid_column(row, "rule_uuid")? {
        Some(rule_uuid) => {
            let frequency: Option<String> = row.get("rule_frequency");
            let frequency = frequency.ok_or_else(|| DatabaseError::DataCorrupted("rule_uuid"))?;
            let params: Option<String> = row.get("rule_params");
            Some(RecurrenceRule::from_record(
                rule_uuid,
                row.get::<Option<String>, _>("rule_name").unwrap_or_default(),
                row.get::<Option<String>, _>("rule_description").unwrap_or_default(),
                &frequency,
                params.as_deref(),
            )?)
        }
        None => None,
    };

    Ok(Schedule::restore(
        uuid,
        row.get("destination"),
        schedule_time,
        rule,
        row.get("active"),
    ))
}
