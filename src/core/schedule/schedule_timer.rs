use crate::core::backup::backup_driver::BackupDriver;
use crate::interface::core::runnable::Runnable;
use async_trait::async_trait;
use chrono::Utc;
use macros::log;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::oneshot::Receiver;
use tokio::time::sleep;

/// Wakes the backup driver on a fixed interval.
pub struct ScheduleTimer {
    driver: Arc<BackupDriver>,
    tick_interval: Duration,
}

impl ScheduleTimer {
    pub fn new(driver: Arc<BackupDriver>, tick_interval: Duration) -> Self {
        ScheduleTimer {
            driver,
            tick_interval,
        }
    }
}

#[async_trait]
impl Runnable for ScheduleTimer {
    async fn run_impl(self: Arc<Self>, mut shutdown_rx: Receiver<()>) {
        loop {
            if let Err(err) = self.driver.tick(Utc::now()).await {
                log!(err);
            }
            select! {
                biased;
                _ = &mut shutdown_rx => { break; }
                _ = sleep(self.tick_interval) => {}
            }
        }
    }
}
