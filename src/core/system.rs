use crate::core::backup::backup_driver::BackupDriver;
use crate::core::backup::job_runner::JobRunner;
use crate::core::backup::local_capture::LocalCapture;
use crate::core::destination::destination_sync::DestinationSync;
use crate::core::infrastructure::app_config::AppConfig;
use crate::core::infrastructure::database_manager::DatabaseManager;
use crate::core::infrastructure::logging::Logging;
use crate::core::remote::http_backup_service::HttpBackupService;
use crate::core::schedule::schedule_seed::seed_schedules;
use crate::core::schedule::schedule_timer::ScheduleTimer;
use crate::interface::core::runnable::Runnable;
use crate::model::error::Error;
use crate::model::error::system::SystemError;
use crate::model::log::system::SystemLog;
use chrono::Utc;
use macros::log;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing_appender::non_blocking::WorkerGuard;

pub struct System {
    app_config: Arc<AppConfig>,
    database_manager: Arc<DatabaseManager>,
    driver: Arc<BackupDriver>,
    shutdown_senders: Vec<oneshot::Sender<()>>,
    _log_guard: WorkerGuard,
}

impl System {
    pub async fn initialize(config_path: &Path) -> Result<Self, Error> {
        let app_config = Arc::new(AppConfig::load(config_path)?);
        let log_guard = Logging::initialize(&app_config.log_directory)?;
        log!(SystemLog::Initializing);

        let database_manager = Arc::new(DatabaseManager::new(&app_config.database_url).await?);
        seed_schedules(&database_manager, app_config.schedules()).await?;
        let remote = Arc::new(HttpBackupService::new(app_config.endpoint().clone())?);
        let local_capture = LocalCapture::new(
            app_config.source_path.clone(),
            app_config.dump_directory.clone(),
        );
        let runner = Arc::new(JobRunner::new(
            database_manager.clone(),
            remote.clone(),
            local_capture,
            app_config.origin().clone(),
            Duration::from_secs(app_config.transfer_timeout),
        ));
        runner.recover_interrupted().await?;
        let driver = Arc::new(BackupDriver::new(
            database_manager.clone(),
            runner,
            app_config.max_concurrency,
            app_config.local_retention_days,
        ));

        let destination_sync = Arc::new(DestinationSync::new(
            database_manager.clone(),
            remote,
            app_config.origin().id,
            Duration::from_secs(app_config.destination_sync_interval),
        ));
        let schedule_timer = Arc::new(ScheduleTimer::new(
            driver.clone(),
            Duration::from_secs(app_config.tick_interval),
        ));
        let shutdown_senders = vec![destination_sync.run(), schedule_timer.run()];

        log!(SystemLog::InitializeComplete);
        Ok(Self {
            app_config,
            database_manager,
            driver,
            shutdown_senders,
            _log_guard: log_guard,
        })
    }

    pub async fn run(&self, run_now: Option<&str>) -> Result<(), Error> {
        log!(SystemLog::Online);
        if let Some(name) = run_now {
            self.run_now(name).await?;
        }
        tokio::signal::ctrl_c()
            .await
            .map_err(SystemError::SignalListenFailed)?;
        log!(SystemLog::ShutdownRequested);
        Ok(())
    }

    async fn run_now(&self, name: &str) -> Result<(), Error> {
        let entry = self
            .app_config
            .find_schedule(name)
            .ok_or_else(|| SystemError::UnknownSchedule(name))?;
        let job = self
            .driver
            .request_extraordinary(entry.uuid(), Utc::now())
            .await?;
        log!(SystemLog::ExtraordinaryRequested {
            name: name.to_string(),
            uuid: job.uuid,
            state: job.state.to_string()
        });
        Ok(())
    }

    pub async fn terminate(self) {
        log!(SystemLog::Terminating);
        self.driver.shutdown();
        for shutdown_tx in self.shutdown_senders {
            if shutdown_tx.send(()).is_err() {
                log!(SystemError::ShutdownSignalFailed);
            }
        }
        self.driver
            .drain(Duration::from_secs(self.app_config.transfer_timeout))
            .await;
        self.database_manager.close_connection().await;
        log!(SystemLog::TerminateComplete);
    }
}
