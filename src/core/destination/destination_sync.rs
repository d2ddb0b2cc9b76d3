use crate::core::infrastructure::database_manager::DatabaseManager;
use crate::interface::core::runnable::Runnable;
use crate::interface::remote_backup_service::RemoteBackupService;
use crate::interface::repository::destination::DestinationRepository;
use crate::model::destination::Destination;
use crate::model::error::Error;
use crate::model::log::destination::DestinationLog;
use async_trait::async_trait;
use macros::log;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::oneshot::Receiver;
use tokio::time::sleep;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub to_add: BTreeSet<String>,
    pub to_remove: BTreeSet<Destination>,
}

/// Diffs the local destination set against the server listing. Destinations
/// still referenced by a schedule are never scheduled for removal.
pub fn reconcile(
    known: &BTreeSet<Destination>,
    remote: &BTreeSet<String>,
    referenced: &HashSet<String>,
) -> Reconciliation {
    let known_names: BTreeSet<&str> = known.iter().map(|d| d.name.as_str()).collect();
    let to_add = remote
        .iter()
        .filter(|name| !known_names.contains(name.as_str()))
        .cloned()
        .collect();
    let to_remove = known
        .iter()
        .filter(|d| !remote.contains(&d.name) && !referenced.contains(&d.name))
        .cloned()
        .collect();
    Reconciliation { to_add, to_remove }
}

pub struct DestinationSync {
    database_manager: Arc<DatabaseManager>,
    remote: Arc<dyn RemoteBackupService>,
    origin_id: i64,
    interval: Duration,
}

impl DestinationSync {
    pub fn new(
        database_manager: Arc<DatabaseManager>,
        remote: Arc<dyn RemoteBackupService>,
        origin_id: i64,
        interval: Duration,
    ) -> Self {
        Self {
            database_manager,
            remote,
            origin_id,
            interval,
        }
    }

    /// Brings the local destination table in line with the server and
    /// returns the resulting set. When the server cannot be reached the
    /// known set is returned untouched.
    pub async fn sync(&self) -> Result<BTreeSet<Destination>, Error> {
        let known = self.database_manager.get_all_destinations().await?;
        let listing = match self.remote.check_destinations(self.origin_id).await {
            Ok(listing) => listing,
            Err(err) => {
                log!(DestinationLog::RemoteUnavailable, err);
                return Ok(known);
            }
        };
        let referenced = self.database_manager.get_referenced_destinations().await?;
        let reconciliation = reconcile(&known, &listing, &referenced);

        for name in &reconciliation.to_add {
            self.database_manager.add_destination(name).await?;
        }
        let mut removed = 0;
        for destination in &reconciliation.to_remove {
            // A schedule created since the listing keeps the row alive.
            if self.database_manager.remove_destination(destination).await? {
                removed += 1;
            }
        }
        log!(DestinationLog::DestinationsSynced {
            added: reconciliation.to_add.len(),
            removed
        });

        self.database_manager.get_all_destinations().await
    }
}

#[async_trait]
impl Runnable for DestinationSync {
    async fn run_impl(self: Arc<Self>, mut shutdown_rx: Receiver<()>) {
        loop {
            if let Err(err) = self.sync().await {
                log!(err);
            }
            select! {
                biased;
                _ = &mut shutdown_rx => break,
                _ = sleep(self.interval) => {}
            }
        }
    }
}
