//! Scripted host: plays a JSON list of UI/playback steps through a crop session.
//!
//! ```json
//! [
//!   { "type": "start" },
//!   { "type": "pointerDown", "x": 40, "y": 40 },
//!   { "type": "pointerMove", "x": 140, "y": 40 },
//!   { "type": "pointerUp", "x": 140, "y": 40 },
//!   { "type": "play", "seconds": 0.25 },
//!   { "type": "tick" }
//! ]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::config::CropperConfig;
use crate::core::coordinates::{Rect, ViewportPoint};
use crate::core::crop::{AspectRatio, CropError};
use crate::core::host::StubMediaSurface;
use crate::core::preview::RasterPreview;
use crate::core::session::{CropEvent, CropSession};

/// One scripted host action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReplayStep {
    Start,
    Remove,
    Aspect { ratio: AspectRatio },
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp { x: f64, y: f64 },
    /// Advance playback by wall-clock seconds, then notify a time update
    Play { seconds: f64 },
    Volume { value: f64 },
    Rate { value: f64 },
    /// One preview refresh
    Tick,
    /// Move/resize the rendered video in the viewport
    Resize { x: f64, y: f64, width: f64, height: f64 },
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid replay script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Step {index}: {source}")]
    Step { index: usize, source: CropError },
}

pub type ReplaySession = CropSession<StubMediaSurface, RasterPreview>;

pub fn load_script(path: &Path) -> Result<Vec<ReplayStep>, ReplayError> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Run `steps` against `media`. The returned session holds the log and the
/// last preview frame.
pub fn replay(
    steps: &[ReplayStep],
    media: StubMediaSurface,
    config: CropperConfig,
) -> Result<ReplaySession, ReplayError> {
    let mut session = CropSession::new(media.clone(), RasterPreview::new(), config);

    for (index, step) in steps.iter().enumerate() {
        let event = match *step {
            ReplayStep::Start => Some(CropEvent::Start),
            ReplayStep::Remove => Some(CropEvent::Remove),
            ReplayStep::Aspect { ratio } => Some(CropEvent::AspectRatioChanged(ratio)),
            ReplayStep::PointerDown { x, y } => Some(CropEvent::PointerDown(ViewportPoint::new(x, y))),
            ReplayStep::PointerMove { x, y } => Some(CropEvent::PointerMove(ViewportPoint::new(x, y))),
            ReplayStep::PointerUp { x, y } => Some(CropEvent::PointerUp(ViewportPoint::new(x, y))),
            ReplayStep::Play { seconds } => {
                media.advance(seconds);
                Some(CropEvent::TimeUpdate)
            }
            ReplayStep::Volume { value } => {
                media.set_volume(value);
                None
            }
            ReplayStep::Rate { value } => {
                media.set_playback_rate(value);
                None
            }
            ReplayStep::Tick => Some(CropEvent::PreviewTick),
            ReplayStep::Resize { x, y, width, height } => {
                media.set_display_box(Rect::new(x, y, width, height));
                None
            }
        };
        if let Some(event) = event {
            session
                .handle(event)
                .map_err(|source| ReplayError::Step { index, source })?;
        }
    }

    log::info!(
        "Replayed {} steps: {} samples, {} preview frames",
        steps.len(),
        session.log().len(),
        session.preview().frames_drawn()
    );
    Ok(session)
}
