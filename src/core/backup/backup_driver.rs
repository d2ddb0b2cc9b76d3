use crate::core::backup::job_runner::JobRunner;
use crate::core::infrastructure::database_manager::DatabaseManager;
use crate::interface::repository::backup_job::BackupJobRepository;
use crate::interface::repository::schedule::ScheduleRepository;
use crate::model::backup::backup_job::BackupJob;
use crate::model::backup::job_state::BackupState;
use crate::model::error::Error;
use crate::model::error::misc::MiscError;
use crate::model::error::system::SystemError;
use crate::model::error::task::TaskError;
use crate::model::log::schedule::ScheduleLog;
use crate::model::log::task::TaskLog;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use macros::log;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Exclusive hold on one job; released when dropped.
struct Claim {
    in_flight: Arc<DashMap<Uuid, ()>>,
    uuid: Uuid,
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.in_flight.remove(&self.uuid);
    }
}

/// Jobs each step of a tick moved to a new state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub admitted: usize,
    pub captured: usize,
    pub transferred: usize,
    pub removed: usize,
}

pub struct BackupDriver {
    database_manager: Arc<DatabaseManager>,
    runner: Arc<JobRunner>,
    in_flight: Arc<DashMap<Uuid, ()>>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    local_retention: Option<TimeDelta>,
}

impl BackupDriver {
    pub fn new(
        database_manager: Arc<DatabaseManager>,
        runner: Arc<JobRunner>,
        max_concurrency: usize,
        local_retention_days: u32,
    ) -> Self {
        let local_retention =
            (local_retention_days > 0).then(|| TimeDelta::days(i64::from(local_retention_days)));
        Self {
            database_manager,
            runner,
            in_flight: Arc::new(DashMap::new()),
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            cancel: CancellationToken::new(),
            local_retention,
        }
    }

    /// One pass: admit due occurrences, capture, transfer, then collect old
    /// local copies.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, Error> {
        let admitted = self.admit(now).await?;

        let capturable = self
            .database_manager
            .get_backup_jobs_in(&[BackupState::Idle, BackupState::ErrorRunning])
            .await?
            .into_iter()
            .filter(|job| job.state.is_error() || job.is_due(now))
            .collect();
        let captured = self
            .run_step(capturable, move |runner, job| async move {
                runner.run_local_capture(job, now).await
            })
            .await;

        let transferable = self
            .database_manager
            .get_backup_jobs_in(&[BackupState::Waiting, BackupState::ErrorSending])
            .await?;
        let cancel = self.cancel.clone();
        let transferred = self
            .run_step(transferable, move |runner, job| {
                let cancel = cancel.clone();
                async move { runner.run_remote_transfer(job, &cancel).await }
            })
            .await;

        let removed = match self.local_retention {
            Some(retention) => {
                let expired = self
                    .database_manager
                    .get_backup_jobs_in(&[BackupState::Finished])
                    .await?
                    .into_iter()
                    .filter(|job| job.time + retention <= now)
                    .collect();
                self.run_step(expired, |runner, job| async move {
                    runner.remove_local_copy(job).await
                })
                .await
            }
            None => 0,
        };

        Ok(TickReport {
            admitted,
            captured,
            transferred,
            removed,
        })
    }

    /// Creates the IDLE job of every active schedule whose trigger window is
    /// open. Occurrences that already have a job are left alone.
    async fn admit(&self, now: DateTime<Utc>) -> Result<usize, Error> {
        let mut admitted = 0;
        for schedule in self.database_manager.get_active_schedules().await? {
            if !schedule.trigger(now) {
                continue;
            }
            let Some(destination) = schedule.destination.clone() else {
                log!(ScheduleLog::NoDestination {
                    uuid: schedule.uuid
                });
                continue;
            };
            let Some(occurrence) = schedule.last_before(now) else {
                continue;
            };
            let job = BackupJob::scheduled(schedule.uuid, occurrence, destination);
            if self.database_manager.insert_backup_job(&job).await? {
                log!(ScheduleLog::OccurrenceAdmitted {
                    uuid: schedule.uuid,
                    time: occurrence.to_rfc3339()
                });
                admitted += 1;
            }
        }
        Ok(admitted)
    }

    /// Queues an out-of-schedule run and captures it right away.
    pub async fn request_extraordinary(
        &self,
        schedule_uuid: Uuid,
        now: DateTime<Utc>,
    ) -> Result<BackupJob, Error> {
        let job = self.runner.request_extraordinary(schedule_uuid, now).await?;
        let uuid = job.uuid;
        self.run_step(vec![job], move |runner, job| async move {
            runner.run_local_capture(job, now).await
        })
        .await;
        let job = self
            .database_manager
            .get_backup_job(uuid)
            .await?
            .ok_or_else(|| TaskError::JobNotFound(uuid))?;
        Ok(job)
    }

    /// Runs `step` for every job nobody else holds, at most
    /// `max_concurrency` at a time. Each job is re-read after it is claimed
    /// so a stale listing never repeats a step. Returns how many jobs changed
    /// state.
    async fn run_step<F, Fut>(&self, jobs: Vec<BackupJob>, step: F) -> usize
    where
        F: Fn(Arc<JobRunner>, BackupJob) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<BackupJob, Error>> + Send + 'static,
    {
        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let Some(claim) = self.claim(job.uuid) else {
                log!(TaskLog::JobBusy { uuid: job.uuid });
                continue;
            };
            let database_manager = self.database_manager.clone();
            let runner = self.runner.clone();
            let semaphore = self.semaphore.clone();
            let step = step.clone();
            handles.push(tokio::spawn(async move {
                let _claim = claim;
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| MiscError::SemaphoreClosed)?;
                let Some(current) = database_manager.get_backup_job(job.uuid).await? else {
                    return Ok(false);
                };
                let before = current.state;
                let after = step(runner, current).await?;
                Ok::<bool, Error>(after.state != before)
            }));
        }

        let mut changed = 0;
        for result in join_all(handles).await {
            match result {
                Ok(Ok(true)) => changed += 1,
                Ok(Ok(false)) => {}
                Ok(Err(err)) => log!(err),
                Err(err) => log!(SystemError::ThreadPanic(err)),
            }
        }
        changed
    }

    fn claim(&self, uuid: Uuid) -> Option<Claim> {
        match self.in_flight.entry(uuid) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                entry.insert(());
                Some(Claim {
                    in_flight: self.in_flight.clone(),
                    uuid,
                })
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Cancels in-flight transfers; they fall back to WAITING.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Waits up to `limit` for running jobs to settle.
    pub async fn drain(&self, limit: Duration) {
        let deadline = tokio::time::Instant::now() + limit;
        while !self.in_flight.is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backup::job_runner::tests::{Fixture, Script, occurrence};
    use crate::interface::repository::schedule::ScheduleRepository;
    use crate::model::backup::backup_job::JobKind;
    use crate::model::schedule::recurrence_rule::RecurrenceRule;
    use crate::model::schedule::schedule::Schedule;

    fn with_driver(fixture: Fixture, retention_days: u32) -> (Fixture, BackupDriver) {
        let driver = BackupDriver::new(
            fixture.database_manager.clone(),
            fixture.runner.clone(),
            2,
            retention_days,
        );
        (fixture, driver)
    }

    #[tokio::test]
    async fn tick_runs_due_occurrence_to_finished() {
        let (fixture, driver) = with_driver(Fixture::new(Script::Accept).await, 0);
        let schedule = fixture.daily_schedule(occurrence()).await;
        let now = occurrence() + TimeDelta::minutes(1);

        let report = driver.tick(now).await.unwrap();
        assert_eq!(report.admitted, 1);
        assert_eq!(report.captured, 1);
        assert_eq!(report.transferred, 1);
        assert_eq!(driver.in_flight(), 0);

        let jobs = fixture
            .database_manager
            .get_backup_jobs_of(schedule.uuid)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].time, occurrence());
        assert_eq!(jobs[0].state, BackupState::Finished);
        assert_eq!(jobs[1].time, occurrence() + TimeDelta::days(1));
        assert_eq!(jobs[1].state, BackupState::Idle);
    }

    #[tokio::test]
    async fn repeated_ticks_admit_an_occurrence_once() {
        let (fixture, driver) = with_driver(Fixture::new(Script::Accept).await, 0);
        let schedule = fixture.daily_schedule(occurrence()).await;

        for minutes in [0, 1, 5, 60] {
            driver.tick(occurrence() + TimeDelta::minutes(minutes)).await.unwrap();
        }

        let jobs = fixture
            .database_manager
            .get_backup_jobs_of(schedule.uuid)
            .await
            .unwrap();
        let current = jobs.iter().filter(|job| job.time == occurrence()).count();
        assert_eq!(current, 1);
        assert_eq!(fixture.remote.upload_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_ticks_do_not_double_run() {
        let (fixture, driver) = with_driver(Fixture::new(Script::Accept).await, 0);
        fixture.daily_schedule(occurrence()).await;
        let now = occurrence() + TimeDelta::minutes(1);

        let (first, second) = tokio::join!(driver.tick(now), driver.tick(now));
        first.unwrap();
        second.unwrap();

        assert_eq!(fixture.remote.upload_count(), 1);
    }

    #[tokio::test]
    async fn future_jobs_wait_for_their_slot() {
        let (fixture, driver) = with_driver(Fixture::new(Script::Accept).await, 0);
        let schedule = fixture.daily_schedule(occurrence()).await;
        let now = occurrence() + TimeDelta::minutes(1);
        driver.tick(now).await.unwrap();

        let report = driver.tick(now + TimeDelta::hours(1)).await.unwrap();
        assert_eq!(report, TickReport::default());

        let report = driver.tick(occurrence() + TimeDelta::days(1)).await.unwrap();
        assert_eq!(report.captured, 1);
        let jobs = fixture
            .database_manager
            .get_backup_jobs_of(schedule.uuid)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 3);
    }

    #[tokio::test]
    async fn inactive_or_unbound_schedules_are_not_admitted() {
        let (fixture, driver) = with_driver(Fixture::new(Script::Accept).await, 0);
        let rule = RecurrenceRule::new("daily", "", "DAILY", None).unwrap();
        let mut paused = Schedule::new(Some("nas".to_string()), occurrence(), Some(rule.clone()));
        paused.active = false;
        let unbound = Schedule::new(None, occurrence(), Some(rule));
        fixture.database_manager.save_schedule(&paused).await.unwrap();
        fixture.database_manager.save_schedule(&unbound).await.unwrap();

        let report = driver.tick(occurrence() + TimeDelta::minutes(1)).await.unwrap();
        assert_eq!(report.admitted, 0);
    }

    #[tokio::test]
    async fn failed_transfers_are_retried_next_tick() {
        let (fixture, driver) = with_driver(Fixture::new(Script::Unreachable).await, 0);
        let schedule = fixture.daily_schedule(occurrence()).await;
        let now = occurrence() + TimeDelta::minutes(1);

        driver.tick(now).await.unwrap();
        let jobs = fixture.database_manager.get_backup_jobs_of(schedule.uuid).await.unwrap();
        assert_eq!(jobs[0].state, BackupState::ErrorSending);

        fixture.remote.set_script(Script::Accept);
        let report = driver.tick(now + TimeDelta::minutes(1)).await.unwrap();
        assert_eq!(report.transferred, 1);
        let jobs = fixture.database_manager.get_backup_jobs_of(schedule.uuid).await.unwrap();
        assert_eq!(jobs[0].state, BackupState::Finished);
    }

    #[tokio::test]
    async fn finished_copies_expire_after_retention() {
        let (fixture, driver) = with_driver(Fixture::new(Script::Accept).await, 1);
        let schedule = Schedule::new(Some("nas".to_string()), occurrence(), None);
        fixture.database_manager.save_schedule(&schedule).await.unwrap();

        driver.tick(occurrence()).await.unwrap();
        let job = &fixture.database_manager.get_backup_jobs_of(schedule.uuid).await.unwrap()[0];
        assert_eq!(job.state, BackupState::Finished);
        let artifact = job.local_file.clone().unwrap();
        assert!(artifact.exists());

        let report = driver.tick(occurrence() + TimeDelta::days(1)).await.unwrap();
        assert_eq!(report.removed, 1);
        assert!(!artifact.exists());
    }

    #[tokio::test]
    async fn extraordinary_request_captures_immediately() {
        let (fixture, driver) = with_driver(Fixture::new(Script::Accept).await, 0);
        let schedule = Schedule::new(Some("nas".to_string()), occurrence(), None);
        fixture.database_manager.save_schedule(&schedule).await.unwrap();

        let job = driver
            .request_extraordinary(schedule.uuid, occurrence() + TimeDelta::hours(3))
            .await
            .unwrap();
        assert_eq!(job.kind, JobKind::Extraordinary);
        assert_eq!(job.state, BackupState::Waiting);
    }

    #[tokio::test]
    async fn shutdown_returns_transfers_to_waiting() {
        let (fixture, driver) = with_driver(Fixture::new(Script::Hang).await, 0);
        let schedule = Schedule::new(Some("nas".to_string()), occurrence(), None);
        fixture.database_manager.save_schedule(&schedule).await.unwrap();

        driver.shutdown();
        let report = driver.tick(occurrence()).await.unwrap();
        assert_eq!(report.captured, 1);

        let jobs = fixture.database_manager.get_backup_jobs_of(schedule.uuid).await.unwrap();
        assert_eq!(jobs[0].state, BackupState::Waiting);
        assert!(jobs[0].last_error.is_none());
    }
}
