use crate::core::infrastructure::database_manager::DatabaseManager;
use crate::model::destination::Destination;
use crate::model::error::Error;
use crate::model::error::database::DatabaseError;
use std::collections::{BTreeSet, HashSet};

pub trait DestinationRepository {
    async fn create_destination_table(&self) -> Result<(), Error>;
    async fn add_destination(&self, name: &str) -> Result<(), Error>;
    /// Deletes `destination` unless a schedule still points at it.
    /// Returns whether a row was removed.
    async fn remove_destination(&self, destination: &Destination) -> Result<bool, Error>;
    async fn get_all_destinations(&self) -> Result<BTreeSet<Destination>, Error>;
    async fn get_referenced_destinations(&self) -> Result<HashSet<String>, Error>;
}

impl DestinationRepository for DatabaseManager {
    async fn create_destination_table(&self) -> Result<(), Error> {
        let pool = self.get_pool();
        sqlx::query("CREATE TABLE Destinations (name TEXT PRIMARY KEY)")
            .execute(&pool)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(())
    }

    async fn add_destination(&self, name: &str) -> Result<(), Error> {
        let pool = self.get_pool();
        sqlx::query("INSERT OR IGNORE INTO Destinations (name) VALUES (?)")
            .bind(name)
            .execute(&pool)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(())
    }

    async fn remove_destination(&self, destination: &Destination) -> Result<bool, Error> {
        let pool = self.get_pool();
        let result = sqlx::query(
            r#"
            DELETE FROM Destinations
            WHERE name = ?
              AND NOT EXISTS (SELECT 1 FROM Schedules WHERE destination = ?)
            "#,
        )
        .bind(&destination.name)
        .bind(&destination.name)
        .execute(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_all_destinations(&self) -> Result<BTreeSet<Destination>, Error> {
        let pool = self.get_pool();
        let names = sqlx::query_scalar::<_, String>("SELECT name FROM Destinations")
            .fetch_all(&pool)
            .await
            .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(names.into_iter().map(Destination::new).collect())
    }

    async fn get_referenced_destinations(&self) -> Result<HashSet<String>, Error> {
        let pool = self.get_pool();
        let names = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT destination FROM Schedules WHERE destination IS NOT NULL",
        )
        .fetch_all(&pool)
        .await
        .map_err(DatabaseError::StatementExecutionFailed)?;
        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::repository::schedule::ScheduleRepository;
    use crate::model::schedule::schedule::Schedule;
    use chrono::Utc;

    #[tokio::test]
    async fn add_is_idempotent() {
        let database_manager = DatabaseManager::in_memory().await.unwrap();
        database_manager.add_destination("nas").await.unwrap();
        database_manager.add_destination("nas").await.unwrap();
        database_manager.add_destination("cloud").await.unwrap();

        let destinations = database_manager.get_all_destinations().await.unwrap();
        let expected: BTreeSet<Destination> =
            [Destination::new("cloud"), Destination::new("nas")].into();
        assert_eq!(destinations, expected);
    }

    #[tokio::test]
    async fn referenced_destination_survives_removal() {
        let database_manager = DatabaseManager::in_memory().await.unwrap();
        database_manager.add_destination("nas").await.unwrap();
        database_manager.add_destination("cloud").await.unwrap();
        let schedule = Schedule::new(Some("nas".to_string()), Utc::now(), None);
        database_manager.save_schedule(&schedule).await.unwrap();

        assert!(!database_manager.remove_destination(&Destination::new("nas")).await.unwrap());
        assert!(database_manager.remove_destination(&Destination::new("cloud")).await.unwrap());

        let remaining = database_manager.get_all_destinations().await.unwrap();
        assert_eq!(remaining, [Destination::new("nas")].into());
        assert_eq!(
            database_manager.get_referenced_destinations().await.unwrap(),
            ["nas".to_string()].into()
        );
    }
}
