pub mod core;
pub mod replay;

pub use crate::core::config::CropperConfig;
pub use crate::core::coordinates::{CoordinateMapper, Rect, Size, ViewportPoint};
pub use crate::core::crop::{AspectRatio, CropError, CropPhase, CropRegionController, DragAnchor};
pub use crate::core::host::{MediaSurface, PlaybackState, PreviewSurface, StubMediaSurface};
pub use crate::core::metadata::{ExportError, MetadataLog, MetadataSample, EXPORT_FILE_NAME};
pub use crate::core::preview::{PreviewRenderer, RasterPreview};
pub use crate::core::session::{spawn_session, CropEvent, CropSession, SessionHandle};
