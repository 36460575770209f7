//! Crop metadata log.
//!
//! Samples pair the crop region (in source pixels) with playback state. They
//! are appended when a drag ends and on each playback time update, never while
//! the cropper is hidden. The log is append-only; export reads a snapshot.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::coordinates::{CoordinateMapper, Rect};
use super::host::{MediaSurface, PlaybackState};

/// Default export file name
pub const EXPORT_FILE_NAME: &str = "video-cropper-metadata.json";

/// What caused a sample to be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleTrigger {
    DragEnd,
    TimeUpdate,
}

/// One observation of the crop region and playback state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetadataSample {
    /// Playback position in seconds
    #[serde(rename = "timeStamp")]
    pub timestamp: f64,
    /// Crop rectangle in source pixels, exported as `[x, y, width, height]`
    #[serde(rename = "coordinates", with = "rect_array")]
    pub source_rect: Rect,
    pub volume: f64,
    #[serde(rename = "playbackRate")]
    pub playback_rate: f64,
}

impl MetadataSample {
    pub fn new(source_rect: Rect, playback: PlaybackState) -> Self {
        let playback = playback.sanitized();
        Self {
            timestamp: playback.current_time,
            source_rect,
            volume: playback.volume,
            playback_rate: playback.playback_rate,
        }
    }
}

mod rect_array {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::core::coordinates::Rect;

    pub fn serialize<S: Serializer>(rect: &Rect, serializer: S) -> Result<S::Ok, S::Error> {
        rect.to_array().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Rect, D::Error> {
        <[f64; 4]>::deserialize(deserializer).map(Rect::from_array)
    }
}

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Append-only, creation-ordered sample log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataLog {
    samples: Vec<MetadataSample>,
}

impl MetadataLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&mut self, sample: MetadataSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[MetadataSample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&MetadataSample> {
        self.samples.last()
    }

    /// Copy of the full log in append order
    pub fn snapshot(&self) -> Vec<MetadataSample> {
        self.samples.clone()
    }

    /// Pretty JSON array (2-space indent)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.samples)
    }

    /// Parse an exported file
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            samples: serde_json::from_str(json)?,
        })
    }

    /// Write the log to `dir/file_name`, creating `dir` if needed.
    pub fn write_export(&self, dir: &Path, file_name: &str) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(file_name);
        std::fs::write(&path, self.to_json()?)?;
        log::info!("Exported {} samples to {}", self.len(), path.display());
        Ok(path)
    }
}

/// Turns crop and playback events into log samples.
#[derive(Debug, Default)]
pub struct MetadataRecorder {
    log: MetadataLog,
}

impl MetadataRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &MetadataLog {
        &self.log
    }

    /// Take one sample of `region` (display space) against the media's current
    /// geometry and playback state. `visible` is the controller's visibility;
    /// nothing is recorded while hidden.
    pub fn record(
        &mut self,
        trigger: SampleTrigger,
        visible: bool,
        region: Rect,
        media: &dyn MediaSurface,
    ) -> Option<&MetadataSample> {
        if !visible {
            return None;
        }
        let source_rect =
            CoordinateMapper::display_to_source(&region, media.display_size(), media.intrinsic_size());
        let sample = MetadataSample::new(source_rect, media.playback());
        log::debug!(
            "Sample #{} ({trigger:?}) t={:.3}s rect={:?}",
            self.log.len(),
            sample.timestamp,
            source_rect.to_array()
        );
        self.log.append(sample);
        self.log.last()
    }
}
