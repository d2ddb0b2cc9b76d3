use crate::model::backup::backup_job::BackupJob;
use crate::model::context::OriginContext;
use crate::model::error::Error;
use crate::model::error::io::IOError;
use crate::model::error::misc::MiscError;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: u64,
}

/// Dumps the source data file into a gzip artifact under the dump directory.
#[derive(Debug, Clone)]
pub struct LocalCapture {
    source_path: PathBuf,
    dump_directory: PathBuf,
}

impl LocalCapture {
    pub fn new(source_path: impl Into<PathBuf>, dump_directory: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            dump_directory: dump_directory.into(),
        }
    }

    pub fn artifact_path(&self, job: &BackupJob, origin: &OriginContext) -> PathBuf {
        self.dump_directory.join(job.artifact_name(origin))
    }

    pub async fn capture(&self, job: &BackupJob, origin: &OriginContext) -> Result<Artifact, Error> {
        let source = self.source_path.clone();
        let target = self.artifact_path(job, origin);
        let artifact = tokio::task::spawn_blocking(move || compress(&source, &target))
            .await
            .map_err(MiscError::JoinFailed)??;
        Ok(artifact)
    }
}

/// Writes next to `target` and renames into place once the archive is complete.
fn compress(source: &Path, target: &Path) -> Result<Artifact, IOError> {
    let partial = partial_path(target);
    let result = write_archive(source, &partial).and_then(|size| {
        fs::rename(&partial, target)
            .map_err(|err| IOError::WriteFileFailed(target.display().to_string(), err))?;
        Ok(Artifact {
            path: target.to_path_buf(),
            size,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

fn write_archive(source: &Path, target: &Path) -> Result<u64, IOError> {
    let target_display = target.display().to_string();

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| IOError::CreateDirectoryFailed(parent.display().to_string(), err))?;
    }

    let input = File::open(source)
        .map_err(|err| IOError::ReadFileFailed(source.display().to_string(), err))?;
    let output = File::create(target)
        .map_err(|err| IOError::WriteFileFailed(target_display.clone(), err))?;

    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::best());
    io::copy(&mut BufReader::new(input), &mut encoder)
        .map_err(|err| IOError::WriteFileFailed(target_display.clone(), err))?;
    encoder
        .finish()
        .and_then(|mut writer| writer.flush())
        .map_err(|err| IOError::WriteFileFailed(target_display.clone(), err))?;

    let size = fs::metadata(target)
        .map_err(|err| IOError::GetMetadataFailed(target_display, err))?
        .len();
    Ok(size)
}
