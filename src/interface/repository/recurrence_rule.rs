use crate::core::infrastructure::database_manager::DatabaseManager;
use crate::model::error::Error;
use crate::model::error::database::DatabaseError;

/// Rules are written together with their schedule, see `save_schedule`.
pub trait RecurrenceRuleRepository {
    async fn create_recurrence_rule_table(&self) -> Result<(), Error>;
    async fn remove_unreferenced_rules(&self) -> Result<u64, Error>;
}

impl RecurrenceRuleRepository for DatabaseManager {
    async fn create_recurrence_rule_table(&self) -> Result<(), Error> {
        let pool = self.get_pool();
        sqlx::query(
            r#"
            CREATE TABLE RecurrenceRules (
                uuid BLOB PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                frequency TEXT NOT NULL,
                params TEXT
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(())
    }

    async fn remove_unreferenced_rules(&self) -> Result<u64, Error> {
        let pool = self.get_pool();
        let result = sqlx::query(
            r#"
            DELETE FROM RecurrenceRules
            WHERE uuid NOT IN (
                SELECT rule_uuid FROM Schedules WHERE rule_uuid IS NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(result.rows_affected())
    }
}
