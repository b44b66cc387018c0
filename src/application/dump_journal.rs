//! Dump journal use case
//!
//! Turns a classified source into one or more labelled byte streams,
//! decodes each stream and forwards every record to the sink as soon as
//! it is produced. Sources are processed strictly one stream at a time.

use crate::application::dto::{DumpOptions, DumpReport};
use crate::domain::entities::{AttributeDescriptor, SourceKind};
use crate::domain::repositories::{
    AttributeSource, ByteStream, DecodeError, ImageOpener, RecordDecoder, RecordSink, SinkError,
    VolumeError, VolumeFileSystem, VolumeImage,
};
use crate::domain::services::{AttributeStream, JournalFileWalker, WalkError};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR, MAIN_SEPARATOR_STR};
use std::time::Instant;
use thiserror::Error;

/// Errors that abort a dump
#[derive(Error, Debug)]
pub enum DumpError {
    #[error(transparent)]
    DirectoryList(#[from] WalkError),

    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{locator}: {source}")]
    Volume {
        locator: String,
        #[source]
        source: VolumeError,
    },

    #[error("{locator}: no $DATA attribute named {stream} on {entry}")]
    AttributeNotFound {
        locator: String,
        entry: String,
        stream: String,
    },

    #[error("Failed to decode {label}: {source}")]
    Decode {
        label: String,
        #[source]
        source: DecodeError,
    },

    #[error("Failed to write record: {0}")]
    Sink(#[from] SinkError),
}

/// Dump journal use case
///
/// Generic over the volume reader used for volume sources and the decoder
/// applied to every stream.
pub struct DumpJournalUseCase<O: ImageOpener, D: RecordDecoder> {
    opener: O,
    decoder: D,
    options: DumpOptions,
}

impl<O: ImageOpener, D: RecordDecoder> DumpJournalUseCase<O, D> {
    pub fn new(opener: O, decoder: D, options: DumpOptions) -> Self {
        Self {
            opener,
            decoder,
            options,
        }
    }

    pub fn options(&self) -> &DumpOptions {
        &self.options
    }

    /// Dumps every record reachable from `source` into `sink`
    pub fn execute<K: RecordSink<D::Record>>(
        &self,
        source: &SourceKind,
        sink: &mut K,
    ) -> Result<DumpReport, DumpError> {
        let start_time = Instant::now();
        let mut report = DumpReport::new(source.path().display().to_string());

        tracing::info!("Dumping change journal from {}", source);

        match source {
            SourceKind::SingleFile(path) => {
                let records = self.dump_file(path, sink)?;
                report.add_stream(records);
            }
            SourceKind::DirectoryTree(root) => {
                for path in JournalFileWalker::new(root) {
                    let path = path?;
                    let records = self.dump_file(&path, sink)?;
                    report.add_stream(records);
                }
            }
            SourceKind::LogicalVolumeHandle(locator) | SourceKind::VolumeShadowHandle(locator) => {
                let records = self.dump_volume(locator, sink)?;
                report.add_stream(records);
            }
        }

        report.duration = start_time.elapsed();
        Ok(report)
    }

    fn dump_file<K: RecordSink<D::Record>>(
        &self,
        path: &Path,
        sink: &mut K,
    ) -> Result<u64, DumpError> {
        let file = File::open(path).map_err(|source| DumpError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let label = path.display().to_string();
        tracing::info!("Reading journal file {}", label);
        self.dump_stream(&label, file, sink)
    }

    fn dump_volume<K: RecordSink<D::Record>>(
        &self,
        locator: &str,
        sink: &mut K,
    ) -> Result<u64, DumpError> {
        let volume_error = |source: VolumeError| DumpError::Volume {
            locator: locator.to_string(),
            source,
        };
        let entry_path = &self.options.journal_entry_path;
        let stream_name = &self.options.journal_stream_name;

        let image = self.opener.open_image(locator).map_err(volume_error)?;
        let filesystem = image.open_filesystem().map_err(volume_error)?;
        let entry = filesystem.open_entry(entry_path).map_err(volume_error)?;

        let attributes = entry.attributes().map_err(volume_error)?;
        let Some(info) = attributes.iter().find(|a| a.is_named_data(stream_name)) else {
            return Err(DumpError::AttributeNotFound {
                locator: locator.to_string(),
                entry: entry_path.clone(),
                stream: stream_name.clone(),
            });
        };

        let descriptor = AttributeDescriptor::new(entry_path.as_str(), info);
        tracing::info!(
            "Found {} (attribute id {}, {} bytes)",
            descriptor,
            descriptor.attribute_id(),
            descriptor.size()
        );

        let label = volume_label(locator, entry_path);
        self.dump_stream(&label, AttributeStream::new(entry, descriptor), sink)
    }

    fn dump_stream<S: ByteStream, K: RecordSink<D::Record>>(
        &self,
        label: &str,
        stream: S,
        sink: &mut K,
    ) -> Result<u64, DumpError> {
        let emitted_before = sink.records_emitted();
        for record in self.decoder.decode(label, stream) {
            let record = record.map_err(|source| DumpError::Decode {
                label: label.to_string(),
                source,
            })?;
            sink.emit(&record)?;
        }

        let records = sink.records_emitted().saturating_sub(emitted_before);
        tracing::debug!("{} records from {}", records, label);
        Ok(records)
    }
}

/// Label of a journal read from a volume, e.g. `\\.\C:\$Extend\$UsnJrnl`
pub fn volume_label(locator: &str, entry_path: &str) -> String {
    let components: Vec<&str> = entry_path
        .split(['/', '\\'])
        .filter(|c| !c.is_empty())
        .collect();
    format!(
        "{}{}{}",
        locator.trim_end_matches(MAIN_SEPARATOR),
        MAIN_SEPARATOR,
        components.join(MAIN_SEPARATOR_STR)
    )
}
