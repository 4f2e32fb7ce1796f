use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::domain::PayoutRecordSet;

use super::{write_archive, ExportError, ExportSink};

/// Writes one directory per payout, all or nothing.
///
/// Sinks write into a hidden staging directory next to the final one. Only
/// when every sink succeeded is it renamed into place, so an interrupted or
/// failed payout never leaves a partial bundle behind. With archiving on, a
/// `<bundle>.zip` copy is published next to the directory the same way.
pub struct BundleWriter<'a> {
    output_dir: PathBuf,
    sinks: Vec<Box<dyn ExportSink + 'a>>,
    archive: bool,
}

impl<'a> BundleWriter<'a> {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            sinks: Vec::new(),
            archive: false,
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: impl ExportSink + 'a) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    #[must_use]
    pub fn with_archive(mut self, archive: bool) -> Self {
        self.archive = archive;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Final location of the bundle for `record_set`.
    pub fn bundle_path(&self, record_set: &PayoutRecordSet) -> PathBuf {
        self.output_dir.join(record_set.bundle_name())
    }

    /// Final location of the zipped bundle.
    pub fn archive_path(&self, record_set: &PayoutRecordSet) -> PathBuf {
        self.output_dir.join(format!("{}.zip", record_set.bundle_name()))
    }

    fn staging_path(&self, record_set: &PayoutRecordSet) -> PathBuf {
        self.output_dir
            .join(format!(".{}.partial", record_set.bundle_name()))
    }

    fn staging_archive_path(&self, record_set: &PayoutRecordSet) -> PathBuf {
        self.output_dir
            .join(format!(".{}.zip.partial", record_set.bundle_name()))
    }

    /// Run every sink for `record_set` and publish the bundle. Returns its path.
    pub async fn write(&self, record_set: &PayoutRecordSet) -> Result<PathBuf, ExportError> {
        let staging = self.staging_path(record_set);
        let target = self.bundle_path(record_set);

        std::fs::create_dir_all(&self.output_dir)?;
        if staging.exists() {
            // Left over from an interrupted run
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir(&staging)?;

        if let Err(err) = self.run_sinks(record_set, &staging).await {
            discard(&staging);
            return Err(err);
        }

        let staged_archive = self.staging_archive_path(record_set);
        if self.archive {
            if let Err(err) = write_archive(&staging, &staged_archive) {
                discard(&staging);
                discard_file(&staged_archive);
                return Err(err);
            }
        }

        if target.exists() {
            debug!(path = %target.display(), "replacing existing bundle");
            if let Err(err) = std::fs::remove_dir_all(&target) {
                discard(&staging);
                discard_file(&staged_archive);
                return Err(err.into());
            }
        }
        if let Err(err) = std::fs::rename(&staging, &target) {
            discard(&staging);
            discard_file(&staged_archive);
            return Err(err.into());
        }

        if self.archive {
            let archive = self.archive_path(record_set);
            if archive.exists() {
                std::fs::remove_file(&archive)?;
            }
            std::fs::rename(&staged_archive, &archive)?;
            debug!(path = %archive.display(), "archive written");
        }

        info!(
            payout_id = record_set.payout_id(),
            path = %target.display(),
            "bundle written"
        );
        Ok(target)
    }

    async fn run_sinks(&self, record_set: &PayoutRecordSet, dir: &Path) -> Result<(), ExportError> {
        for sink in &self.sinks {
            debug!(sink = sink.name(), payout_id = record_set.payout_id(), "running sink");
            sink.export(record_set, dir)
                .await
                .map_err(|err| match err {
                    ExportError::Sink { .. } => err,
                    other => ExportError::Sink {
                        sink: sink.name(),
                        message: other.to_string(),
                    },
                })?;
        }
        Ok(())
    }
}

fn discard(staging: &Path) {
    if let Err(err) = std::fs::remove_dir_all(staging) {
        warn!(path = %staging.display(), "could not remove staging directory: {}", err);
    }
}

fn discard_file(path: &Path) {
    if path.exists() {
        if let Err(err) = std::fs::remove_file(path) {
            warn!(path = %path.display(), "could not remove staged archive: {}", err);
        }
    }
}
