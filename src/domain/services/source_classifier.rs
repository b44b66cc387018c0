//! Source classifier service
//!
//! Maps an input locator to the kind of source it names. Volume device
//! paths are recognized by pattern alone; anything else must exist on
//! the local file system.

use crate::domain::entities::SourceKind;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

/// `\\.\C:` style logical volume handle
static LOGICAL_VOLUME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\\\\.\\[A-Za-z]:").expect("Invalid regex pattern"));

/// `\\?\GLOBALROOT\Device\HarddiskVolumeShadowCopy<N>` with 1 to 3 digits
static VOLUME_SHADOW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\\\\\?\\GLOBALROOT\\Device\\HarddiskVolumeShadowCopy[0-9]{1,3}(?:[^0-9]|$)",
    )
    .expect("Invalid regex pattern")
});

/// Errors that can occur when classifying a locator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("Source is not a volume handle, a file or a directory: {0}")]
    UnresolvableSource(String),
}

/// Which volume device pattern a locator matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumePattern {
    LogicalVolume,
    VolumeShadow,
}

/// Tests a locator against the volume device patterns
///
/// The logical volume pattern is tested first and wins on a tie.
pub fn match_volume_pattern(locator: &str) -> Option<VolumePattern> {
    if LOGICAL_VOLUME_PATTERN.is_match(locator) {
        Some(VolumePattern::LogicalVolume)
    } else if VOLUME_SHADOW_PATTERN.is_match(locator) {
        Some(VolumePattern::VolumeShadow)
    } else {
        None
    }
}

/// Classifies a locator, honouring an explicit volume override
///
/// * `Some(true)` - always a volume; the shadow pattern selects the shadow
///   kind, everything else is treated as a logical volume handle.
/// * `Some(false)` - never a volume; only the file system probe runs.
/// * `None` - volume patterns first, then the file system probe.
pub fn classify_source(locator: &str, is_volume: Option<bool>) -> Result<SourceKind, ClassifyError> {
    let pattern = match is_volume {
        Some(false) => None,
        Some(true) => Some(match_volume_pattern(locator).unwrap_or(VolumePattern::LogicalVolume)),
        None => match_volume_pattern(locator),
    };

    match pattern {
        Some(VolumePattern::LogicalVolume) => {
            tracing::info!("Logical volume matched: {}", locator);
            Ok(SourceKind::LogicalVolumeHandle(locator.to_string()))
        }
        Some(VolumePattern::VolumeShadow) => {
            tracing::info!("Volume shadow matched: {}", locator);
            Ok(SourceKind::VolumeShadowHandle(locator.to_string()))
        }
        None => probe_filesystem(locator),
    }
}

fn probe_filesystem(locator: &str) -> Result<SourceKind, ClassifyError> {
    let path = Path::new(locator);

    if path.is_file() {
        Ok(SourceKind::SingleFile(path.to_path_buf()))
    } else if path.is_dir() {
        Ok(SourceKind::DirectoryTree(path.to_path_buf()))
    } else {
        Err(ClassifyError::UnresolvableSource(locator.to_string()))
    }
}
