use crate::core::backup::local_capture::LocalCapture;
use crate::core::infrastructure::database_manager::DatabaseManager;
use crate::interface::remote_backup_service::{RemoteBackupService, UploadReceipt, UploadRequest};
use crate::interface::repository::backup_job::BackupJobRepository;
use crate::interface::repository::schedule::ScheduleRepository;
use crate::model::backup::backup_job::BackupJob;
use crate::model::backup::job_state::{BackupState, JobEvent, Transition};
use crate::model::context::OriginContext;
use crate::model::error::Error;
use crate::model::error::integrity::IntegrityError;
use crate::model::error::io::IOError;
use crate::model::error::misc::MiscError;
use crate::model::error::task::TaskError;
use crate::model::error::transport::TransportError;
use crate::model::log::schedule::ScheduleLog;
use crate::model::log::task::TaskLog;
use crate::utils::file_hash::sha256;
use crate::utils::time::normalize_time;
use chrono::{DateTime, Utc};
use macros::log;
use std::fs::File;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Drives single jobs through the state table and persists every step.
///
/// Capture and transfer never fail the caller for job-level problems: those
/// end up in the job's error state and `last_error`. An `Err` from these
/// methods means the job could not be persisted.
pub struct JobRunner {
    database_manager: Arc<DatabaseManager>,
    remote: Arc<dyn RemoteBackupService>,
    local_capture: LocalCapture,
    origin: OriginContext,
    transfer_timeout: Duration,
}

impl JobRunner {
    pub fn new(
        database_manager: Arc<DatabaseManager>,
        remote: Arc<dyn RemoteBackupService>,
        local_capture: LocalCapture,
        origin: OriginContext,
        transfer_timeout: Duration,
    ) -> Self {
        Self {
            database_manager,
            remote,
            local_capture,
            origin,
            transfer_timeout,
        }
    }

    pub async fn run_local_capture(
        &self,
        mut job: BackupJob,
        now: DateTime<Utc>,
    ) -> Result<BackupJob, Error> {
        let mut transitions = Vec::new();
        if job.state == BackupState::ErrorRunning {
            transitions.push(job.apply(JobEvent::Retry)?);
        }
        if job.state != BackupState::Idle {
            return Ok(job);
        }

        transitions.push(job.apply(JobEvent::StartCapture)?);
        self.persist(&job, &transitions).await?;
        transitions.clear();

        match self.local_capture.capture(&job, &self.origin).await {
            Ok(artifact) => {
                log!(TaskLog::CaptureCompleted {
                    uuid: job.uuid,
                    path: artifact.path.display().to_string()
                });
                job.local_file = Some(artifact.path);
                job.size = Some(artifact.size);
                job.clear_error();
                transitions.push(job.apply(JobEvent::CaptureSucceeded)?);
            }
            Err(err) => {
                log!(TaskLog::CaptureFailed { uuid: job.uuid }, err);
                job.update_error(&err);
                transitions.push(job.apply(JobEvent::CaptureFailed)?);
            }
        }

        if let Err(err) = self.schedule_next_occurrence(&job, now).await {
            log!(err);
        }

        self.persist(&job, &transitions).await?;
        Ok(job)
    }

    /// Seeds the IDLE job for the schedule's next occurrence after `now`.
    /// Calling it again for the same occurrence creates nothing.
    pub async fn schedule_next_occurrence(
        &self,
        job: &BackupJob,
        now: DateTime<Utc>,
    ) -> Result<Option<BackupJob>, Error> {
        let Some(schedule) = self.database_manager.get_schedule(job.schedule_uuid).await? else {
            return Ok(None);
        };
        if !schedule.active {
            return Ok(None);
        }
        let Some(destination) = schedule.destination.clone() else {
            log!(ScheduleLog::NoDestination {
                uuid: schedule.uuid
            });
            return Ok(None);
        };
        let Some(next_run) = schedule.next_after(now) else {
            return Ok(None);
        };

        let next_job = BackupJob::scheduled(schedule.uuid, next_run, destination);
        if !self.database_manager.insert_backup_job(&next_job).await? {
            return Ok(None);
        }
        log!(ScheduleLog::NextOccurrenceScheduled {
            uuid: schedule.uuid,
            time: next_run.to_rfc3339()
        });
        Ok(Some(next_job))
    }

    pub async fn run_remote_transfer(
        &self,
        mut job: BackupJob,
        cancel: &CancellationToken,
    ) -> Result<BackupJob, Error> {
        let mut transitions = Vec::new();
        if job.state == BackupState::ErrorSending {
            transitions.push(job.apply(JobEvent::Retry)?);
        }
        if job.state != BackupState::Waiting {
            return Ok(job);
        }

        transitions.push(job.apply(JobEvent::StartTransfer)?);
        self.persist(&job, &transitions).await?;
        transitions.clear();

        let outcome = select! {
            biased;
            _ = cancel.cancelled() => None,
            result = tokio::time::timeout(self.transfer_timeout, self.transfer(&job)) => Some(result),
        };

        let failure = match outcome {
            None => {
                log!(TaskLog::TransferCancelled { uuid: job.uuid });
                transitions.push(job.apply(JobEvent::Interrupted)?);
                None
            }
            Some(Ok(Ok(receipt))) => {
                log!(TaskLog::TransferCompleted { uuid: job.uuid });
                job.remote_id = receipt.remote_id;
                job.clear_error();
                transitions.push(job.apply(JobEvent::TransferSucceeded)?);
                None
            }
            Some(Ok(Err(err))) => Some(err),
            Some(Err(_)) => Some(Error::from(TransportError::Timeout(
                self.transfer_timeout.as_secs(),
            ))),
        };

        if let Some(err) = failure {
            log!(TaskLog::TransferFailed { uuid: job.uuid }, err);
            job.update_error(&err);
            transitions.push(job.apply(JobEvent::TransferFailed)?);
        }

        self.persist(&job, &transitions).await?;
        Ok(job)
    }

    async fn transfer(&self, job: &BackupJob) -> Result<UploadReceipt, Error> {
        let path = job
            .local_file
            .clone()
            .ok_or_else(|| TaskError::MissingArtifact(job.uuid))?;
        let (size, checksum) = digest_file(path.clone()).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let receipt = self
            .remote
            .upload(UploadRequest {
                origin_id: self.origin.id,
                destination: job.destination_name.clone(),
                filename: filename.clone(),
                path,
                size,
                checksum: checksum.clone(),
            })
            .await?;

        if !receipt.accepted {
            return Err(IntegrityError::UploadRefused(filename).into());
        }
        if let Some(actual) = &receipt.checksum {
            if !actual.eq_ignore_ascii_case(&checksum) {
                return Err(IntegrityError::ChecksumMismatch(checksum, actual.as_str()).into());
            }
        }
        Ok(receipt)
    }

    /// Deletes the local artifact of a FINISHED job. An already missing file
    /// is fine.
    pub async fn remove_local_copy(&self, mut job: BackupJob) -> Result<BackupJob, Error> {
        if job.state != BackupState::Finished {
            return Ok(job);
        }
        if let Some(path) = &job.local_file {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(IOError::DeleteFileFailed(path.display().to_string(), err).into());
                }
            }
        }
        let transition = job.apply(JobEvent::RemoveLocal)?;
        self.persist(&job, &[transition]).await?;
        log!(TaskLog::LocalCopyRemoved { uuid: job.uuid });
        Ok(job)
    }

    /// Puts jobs a crash left mid-step back where the next tick retries them.
    pub async fn recover_interrupted(&self) -> Result<usize, Error> {
        let jobs = self
            .database_manager
            .get_backup_jobs_in(&[BackupState::Running, BackupState::Sending])
            .await?;
        let count = jobs.len();
        for mut job in jobs {
            let transition = job.apply(JobEvent::Interrupted)?;
            self.persist(&job, &[transition]).await?;
        }
        log!(TaskLog::JobsRecovered { count });
        Ok(count)
    }

    /// Queues an out-of-schedule run of `schedule_uuid` starting now.
    pub async fn request_extraordinary(
        &self,
        schedule_uuid: Uuid,
        now: DateTime<Utc>,
    ) -> Result<BackupJob, Error> {
        let schedule = self
            .database_manager
            .get_schedule(schedule_uuid)
            .await?
            .ok_or_else(|| TaskError::ScheduleNotFound(schedule_uuid))?;
        let destination = schedule
            .destination
            .ok_or_else(|| TaskError::MissingDestination(schedule_uuid))?;
        let job = BackupJob::extraordinary(schedule_uuid, normalize_time(now), destination);
        self.database_manager.insert_backup_job(&job).await?;
        Ok(job)
    }

    async fn persist(&self, job: &BackupJob, transitions: &[Transition]) -> Result<(), Error> {
        for transition in transitions {
            log!(TaskLog::Transition {
                uuid: job.uuid,
                from: transition.from.to_string(),
                to: transition.to.to_string()
            });
        }
        self.database_manager.save_backup_job(job, transitions).await
    }
}

/// Size and streamed SHA-256 of a local artifact.
async fn digest_file(path: PathBuf) -> Result<(u64, String), Error> {
    let digest = tokio::task::spawn_blocking(move || {
        let display = path.display().to_string();
        let file =
            File::open(&path).map_err(|err| IOError::ReadFileFailed(display.clone(), err))?;
        let size = file
            .metadata()
            .map_err(|err| IOError::GetMetadataFailed(display.clone(), err))?
            .len();
        let checksum = sha256(file).map_err(|err| IOError::ReadFileFailed(display, err))?;
        Ok::<(u64, String), IOError>((size, checksum))
    })
    .await
    .map_err(MiscError::JoinFailed)??;
    Ok(digest)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::backup::backup_job::{JobErrorKind, JobKind};
    use crate::model::schedule::recurrence_rule::RecurrenceRule;
    use crate::model::schedule::schedule::Schedule;
    use async_trait::async_trait;
    use chrono::{TimeDelta, TimeZone};
    use std::collections::BTreeSet;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Script {
        Accept,
        Refuse,
        WrongChecksum,
        Unreachable,
        Hang,
    }

    /// In-process server that answers every request the same scripted way.
    pub struct ScriptedRemote {
        script: Mutex<Script>,
        destinations: Mutex<Option<BTreeSet<String>>>,
        pub uploads: Mutex<Vec<UploadRequest>>,
    }

    impl ScriptedRemote {
        pub fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                destinations: Mutex::new(Some(BTreeSet::new())),
                uploads: Mutex::new(Vec::new()),
            })
        }

        pub fn set_script(&self, script: Script) {
            *self.script.lock().unwrap() = script;
        }

        /// `None` makes the listing fail like an unreachable server.
        pub fn set_destinations(&self, destinations: Option<&[&str]>) {
            *self.destinations.lock().unwrap() = destinations
                .map(|names| names.iter().map(|name| name.to_string()).collect());
        }

        pub fn upload_count(&self) -> usize {
            self.uploads.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RemoteBackupService for ScriptedRemote {
        async fn check_destinations(&self, _origin_id: i64) -> Result<BTreeSet<String>, Error> {
            let destinations = self.destinations.lock().unwrap().clone();
            destinations.ok_or_else(|| TransportError::ConnectionFailed("connection refused").into())
        }

        async fn upload(&self, request: UploadRequest) -> Result<UploadReceipt, Error> {
            let script = *self.script.lock().unwrap();
            let checksum = request.checksum.clone();
            self.uploads.lock().unwrap().push(request);
            match script {
                Script::Accept => Ok(UploadReceipt {
                    accepted: true,
                    remote_id: Some(42),
                    checksum: Some(checksum),
                }),
                Script::Refuse => Ok(UploadReceipt {
                    accepted: false,
                    remote_id: None,
                    checksum: None,
                }),
                Script::WrongChecksum => Ok(UploadReceipt {
                    accepted: true,
                    remote_id: Some(42),
                    checksum: Some("0".repeat(64)),
                }),
                Script::Unreachable => {
                    Err(TransportError::ConnectionFailed("connection refused").into())
                }
                Script::Hang => std::future::pending().await,
            }
        }
    }

    pub struct Fixture {
        pub directory: TempDir,
        pub database_manager: Arc<DatabaseManager>,
        pub remote: Arc<ScriptedRemote>,
        pub runner: Arc<JobRunner>,
    }

    impl Fixture {
        pub async fn new(script: Script) -> Self {
            Self::with_timeout(script, Duration::from_secs(5)).await
        }

        pub async fn with_timeout(script: Script, transfer_timeout: Duration) -> Self {
            let directory = tempfile::tempdir().unwrap();
            let source = directory.path().join("app.db");
            std::fs::write(&source, b"application data").unwrap();

            let database_manager = Arc::new(DatabaseManager::in_memory().await.unwrap());
            let remote = ScriptedRemote::new(script);
            let runner = Arc::new(JobRunner::new(
                database_manager.clone(),
                remote.clone(),
                LocalCapture::new(&source, directory.path().join("dumps")),
                OriginContext {
                    id: 1,
                    name: "ledger".to_string(),
                },
                transfer_timeout,
            ));
            Self {
                directory,
                database_manager,
                remote,
                runner,
            }
        }

        pub fn source(&self) -> std::path::PathBuf {
            self.directory.path().join("app.db")
        }

        pub async fn daily_schedule(&self, start: DateTime<Utc>) -> Schedule {
            let rule = RecurrenceRule::new("daily", "", "DAILY", None).unwrap();
            let schedule = Schedule::new(Some("nas".to_string()), start, Some(rule));
            self.database_manager.save_schedule(&schedule).await.unwrap();
            schedule
        }

        pub async fn job_in(&self, state: BackupState, local_file: Option<&Path>) -> BackupJob {
            let mut job = BackupJob::extraordinary(Uuid::new_v4(), occurrence(), "nas");
            job.state = state;
            job.local_file = local_file.map(Path::to_path_buf);
            self.database_manager.insert_backup_job(&job).await.unwrap();
            job
        }

        pub async fn history(&self, job: &BackupJob) -> Vec<BackupState> {
            self.database_manager.get_state_history(job.uuid).await.unwrap()
        }
    }

    pub fn occurrence() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn capture_success_waits_and_seeds_next_occurrence() {
        let fixture = Fixture::new(Script::Accept).await;
        let schedule = fixture.daily_schedule(occurrence()).await;
        let job = BackupJob::scheduled(schedule.uuid, occurrence(), "nas");
        fixture.database_manager.insert_backup_job(&job).await.unwrap();

        let now = occurrence() + TimeDelta::minutes(1);
        let job = fixture.runner.run_local_capture(job, now).await.unwrap();

        assert_eq!(job.state, BackupState::Waiting);
        assert!(job.last_error.is_none());
        assert!(job.local_file.as_ref().unwrap().exists());
        assert!(job.size.unwrap() > 0);

        let jobs = fixture
            .database_manager
            .get_backup_jobs_of(schedule.uuid)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 2);
        let sibling = jobs.iter().find(|other| other.uuid != job.uuid).unwrap();
        assert_eq!(sibling.state, BackupState::Idle);
        assert_eq!(sibling.kind, JobKind::Scheduled);
        assert_eq!(sibling.time, occurrence() + TimeDelta::days(1));
    }

    #[tokio::test]
    async fn next_occurrence_is_seeded_once() {
        let fixture = Fixture::new(Script::Accept).await;
        let schedule = fixture.daily_schedule(occurrence()).await;
        let job = BackupJob::scheduled(schedule.uuid, occurrence(), "nas");
        let now = occurrence() + TimeDelta::minutes(1);

        let first = fixture.runner.schedule_next_occurrence(&job, now).await.unwrap();
        let second = fixture.runner.schedule_next_occurrence(&job, now).await.unwrap();
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn one_shot_schedule_seeds_nothing() {
        let fixture = Fixture::new(Script::Accept).await;
        let schedule = Schedule::new(Some("nas".to_string()), occurrence(), None);
        fixture.database_manager.save_schedule(&schedule).await.unwrap();
        let job = BackupJob::scheduled(schedule.uuid, occurrence(), "nas");

        let next = fixture
            .runner
            .schedule_next_occurrence(&job, occurrence() + TimeDelta::minutes(1))
            .await
            .unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn capture_failure_then_retry() {
        let fixture = Fixture::new(Script::Accept).await;
        std::fs::remove_file(fixture.source()).unwrap();
        let job = fixture.job_in(BackupState::Idle, None).await;

        let job = fixture.runner.run_local_capture(job, occurrence()).await.unwrap();
        assert_eq!(job.state, BackupState::ErrorRunning);
        assert_eq!(job.last_error.as_ref().unwrap().kind, JobErrorKind::Unexpected);

        std::fs::write(fixture.source(), b"restored").unwrap();
        let job = fixture.runner.run_local_capture(job, occurrence()).await.unwrap();
        assert_eq!(job.state, BackupState::Waiting);
        assert!(job.last_error.is_none());

        assert_eq!(
            fixture.history(&job).await,
            vec![
                BackupState::Idle,
                BackupState::Running,
                BackupState::ErrorRunning,
                BackupState::Idle,
                BackupState::Running,
                BackupState::Waiting,
            ]
        );
    }

    #[tokio::test]
    async fn failed_capture_still_seeds_next_occurrence() {
        let fixture = Fixture::new(Script::Accept).await;
        std::fs::remove_file(fixture.source()).unwrap();
        let schedule = fixture.daily_schedule(occurrence()).await;
        let job = BackupJob::scheduled(schedule.uuid, occurrence(), "nas");
        fixture.database_manager.insert_backup_job(&job).await.unwrap();

        let now = occurrence() + TimeDelta::minutes(1);
        let job = fixture.runner.run_local_capture(job, now).await.unwrap();

        assert_eq!(job.state, BackupState::ErrorRunning);
        let jobs = fixture
            .database_manager
            .get_backup_jobs_of(schedule.uuid)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].time, occurrence() + TimeDelta::days(1));
        assert_eq!(jobs[1].state, BackupState::Idle);
    }

    #[tokio::test]
    async fn capture_ignores_jobs_past_idle() {
        let fixture = Fixture::new(Script::Accept).await;
        let job = fixture.job_in(BackupState::Waiting, None).await;
        let before = fixture.history(&job).await;

        let job = fixture.runner.run_local_capture(job, occurrence()).await.unwrap();
        assert_eq!(job.state, BackupState::Waiting);
        assert_eq!(fixture.history(&job).await, before);
    }

    #[tokio::test]
    async fn successful_job_passes_every_state_in_order() {
        let fixture = Fixture::new(Script::Accept).await;
        let job = fixture.job_in(BackupState::Idle, None).await;
        let cancel = CancellationToken::new();

        let job = fixture.runner.run_local_capture(job, occurrence()).await.unwrap();
        let job = fixture.runner.run_remote_transfer(job, &cancel).await.unwrap();

        assert_eq!(job.state, BackupState::Finished);
        assert_eq!(job.remote_id, Some(42));
        assert_eq!(
            fixture.history(&job).await,
            vec![
                BackupState::Idle,
                BackupState::Running,
                BackupState::Waiting,
                BackupState::Sending,
                BackupState::Finished,
            ]
        );

        let uploads = fixture.remote.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].destination, "nas");
        assert_eq!(uploads[0].origin_id, 1);
        assert_eq!(
            uploads[0].filename,
            job.local_file.as_ref().unwrap().file_name().unwrap().to_string_lossy()
        );
        assert!(uploads[0].filename.starts_with("ledger_202405010200_"));
        assert_eq!(uploads[0].size, job.size.unwrap());
        let file = std::fs::File::open(&uploads[0].path).unwrap();
        assert_eq!(uploads[0].checksum, sha256(file).unwrap());
    }

    #[tokio::test]
    async fn transfer_of_finished_job_is_a_noop() {
        let fixture = Fixture::new(Script::Accept).await;
        let job = fixture.job_in(BackupState::Finished, None).await;
        let before = fixture.history(&job).await;

        let after = fixture
            .runner
            .run_remote_transfer(job.clone(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(after, job);
        assert_eq!(fixture.history(&job).await, before);
        assert_eq!(fixture.remote.upload_count(), 0);
    }

    async fn failed_transfer(script: Script) -> (Fixture, BackupJob) {
        let fixture = Fixture::with_timeout(script, Duration::from_millis(100)).await;
        let job = fixture.job_in(BackupState::Idle, None).await;
        let job = fixture.runner.run_local_capture(job, occurrence()).await.unwrap();
        let job = fixture
            .runner
            .run_remote_transfer(job, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(job.state, BackupState::ErrorSending);
        (fixture, job)
    }

    #[tokio::test]
    async fn refused_upload_is_an_integrity_error() {
        let (_fixture, job) = failed_transfer(Script::Refuse).await;
        assert_eq!(job.last_error.unwrap().kind, JobErrorKind::Integrity);
    }

    #[tokio::test]
    async fn checksum_mismatch_is_an_integrity_error() {
        let (_fixture, job) = failed_transfer(Script::WrongChecksum).await;
        let error = job.last_error.unwrap();
        assert_eq!(error.kind, JobErrorKind::Integrity);
        assert!(error.message.contains("mismatch"));
    }

    #[tokio::test]
    async fn unreachable_server_is_transient() {
        let (_fixture, job) = failed_transfer(Script::Unreachable).await;
        assert_eq!(job.last_error.unwrap().kind, JobErrorKind::TransientTransport);
    }

    #[tokio::test]
    async fn timeout_is_transient_and_retry_recovers() {
        let (fixture, job) = failed_transfer(Script::Hang).await;
        let error = job.last_error.clone().unwrap();
        assert_eq!(error.kind, JobErrorKind::TransientTransport);
        assert!(error.trace.contains("Timeout"));

        fixture.remote.set_script(Script::Accept);
        let job = fixture
            .runner
            .run_remote_transfer(job, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(job.state, BackupState::Finished);
        assert!(job.last_error.is_none());
    }

    #[tokio::test]
    async fn missing_artifact_fails_transfer() {
        let fixture = Fixture::new(Script::Accept).await;
        let job = fixture.job_in(BackupState::Waiting, None).await;
        let job = fixture
            .runner
            .run_remote_transfer(job, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(job.state, BackupState::ErrorSending);
        assert_eq!(job.last_error.unwrap().kind, JobErrorKind::Unexpected);
        assert_eq!(fixture.remote.upload_count(), 0);
    }

    #[tokio::test]
    async fn cancelled_transfer_returns_to_waiting() {
        let fixture = Fixture::new(Script::Hang).await;
        let artifact = fixture.directory.path().join("artifact.db.gz");
        std::fs::write(&artifact, b"payload").unwrap();
        let job = fixture.job_in(BackupState::Waiting, Some(&artifact)).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let job = fixture.runner.run_remote_transfer(job, &cancel).await.unwrap();

        assert_eq!(job.state, BackupState::Waiting);
        assert!(job.last_error.is_none());
        let stored = fixture.database_manager.get_backup_job(job.uuid).await.unwrap().unwrap();
        assert_eq!(stored.state, BackupState::Waiting);
    }

    #[tokio::test]
    async fn remove_local_copy_deletes_artifact() {
        let fixture = Fixture::new(Script::Accept).await;
        let artifact = fixture.directory.path().join("artifact.db.gz");
        std::fs::write(&artifact, b"payload").unwrap();
        let job = fixture.job_in(BackupState::Finished, Some(&artifact)).await;

        let job = fixture.runner.remove_local_copy(job).await.unwrap();
        assert_eq!(job.state, BackupState::RemovedLocal);
        assert!(!artifact.exists());
    }

    #[tokio::test]
    async fn remove_local_copy_tolerates_missing_file() {
        let fixture = Fixture::new(Script::Accept).await;
        let artifact = fixture.directory.path().join("gone.db.gz");
        let job = fixture.job_in(BackupState::Finished, Some(&artifact)).await;

        let job = fixture.runner.remove_local_copy(job).await.unwrap();
        assert_eq!(job.state, BackupState::RemovedLocal);
    }

    #[tokio::test]
    async fn recovers_interrupted_jobs() {
        let fixture = Fixture::new(Script::Accept).await;
        let capturing = fixture.job_in(BackupState::Running, None).await;
        let sending = fixture.job_in(BackupState::Sending, None).await;
        let finished = fixture.job_in(BackupState::Finished, None).await;

        assert_eq!(fixture.runner.recover_interrupted().await.unwrap(), 2);

        for (job, expected) in [
            (capturing, BackupState::Idle),
            (sending, BackupState::Waiting),
            (finished, BackupState::Finished),
        ] {
            let stored = fixture.database_manager.get_backup_job(job.uuid).await.unwrap();
            assert_eq!(stored.unwrap().state, expected);
        }
    }

    #[tokio::test]
    async fn extraordinary_request_creates_idle_job() {
        let fixture = Fixture::new(Script::Accept).await;
        let schedule = fixture.daily_schedule(occurrence()).await;
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 15).unwrap();

        let job = fixture
            .runner
            .request_extraordinary(schedule.uuid, now)
            .await
            .unwrap();
        assert_eq!(job.kind, JobKind::Extraordinary);
        assert_eq!(job.state, BackupState::Idle);
        assert_eq!(job.time, Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap());

        let missing = fixture.runner.request_extraordinary(Uuid::new_v4(), now).await;
        assert!(matches!(
            missing,
            Err(Error::Task(TaskError::ScheduleNotFound { .. }))
        ));
    }
}
