//! Crop session: the single owner of the crop region.
//!
//! Pointer input, aspect changes, playback time updates and preview ticks all
//! arrive as `CropEvent`s and are applied one at a time by `handle`. The
//! controller is the only writer of the region; the preview renderer and the
//! metadata recorder only read it from inside the same call.
//!
//! Threaded hosts use `spawn_session`, which runs `CropSession::run` on its own
//! thread and hands back a `SessionHandle` that sends events over a channel.

use std::thread;

use crossbeam_channel::{bounded, never, select, unbounded, Receiver, Sender};

use super::config::CropperConfig;
use super::coordinates::{CoordinateMapper, Rect, ViewportPoint};
use super::crop::{AspectRatio, CropError, CropPhase, CropRegionController};
use super::host::{MediaSurface, PreviewSurface};
use super::metadata::{MetadataLog, MetadataRecorder, MetadataSample, SampleTrigger};
use super::preview::{PreviewRenderer, TickOutcome};

/// Host-originated events
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropEvent {
    Start,
    Remove,
    AspectRatioChanged(AspectRatio),
    PointerDown(ViewportPoint),
    PointerMove(ViewportPoint),
    PointerUp(ViewportPoint),
    /// Media surface reported playback progress
    TimeUpdate,
    PreviewTick,
}

/// Crop controller, preview and recorder wired to one media surface.
pub struct CropSession<M: MediaSurface, P: PreviewSurface> {
    controller: CropRegionController,
    recorder: MetadataRecorder,
    preview: PreviewRenderer<P>,
    media: M,
    config: CropperConfig,
}

impl<M: MediaSurface, P: PreviewSurface> CropSession<M, P> {
    pub fn new(media: M, preview_surface: P, config: CropperConfig) -> Self {
        Self {
            controller: CropRegionController::new(
                config.default_aspect_ratio,
                config.drag_anchor,
                config.preview_interval(),
            ),
            recorder: MetadataRecorder::new(),
            preview: PreviewRenderer::new(preview_surface),
            media,
            config,
        }
    }

    pub fn phase(&self) -> CropPhase {
        self.controller.phase()
    }

    pub fn controller(&self) -> &CropRegionController {
        &self.controller
    }

    pub fn preview(&self) -> &PreviewRenderer<P> {
        &self.preview
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn config(&self) -> &CropperConfig {
        &self.config
    }

    pub fn log(&self) -> &MetadataLog {
        self.recorder.log()
    }

    /// Current region in source pixels (empty until the video is laid out)
    pub fn source_region(&self) -> Rect {
        CoordinateMapper::display_to_source(
            &self.controller.region(),
            self.media.display_size(),
            self.media.intrinsic_size(),
        )
    }

    /// Read-only copy of the log
    pub fn export(&self) -> Vec<MetadataSample> {
        self.recorder.log().snapshot()
    }

    /// Apply one event. Only Start and Remove can fail; pointer and playback
    /// events that don't apply to the current state are ignored.
    pub fn handle(&mut self, event: CropEvent) -> Result<(), CropError> {
        match event {
            CropEvent::Start => {
                self.controller.start(self.media.display_size())?;
                self.preview.sync_size(&self.controller.region());
            }
            CropEvent::Remove => self.controller.remove()?,
            CropEvent::AspectRatioChanged(ratio) => {
                if self.controller.set_aspect_ratio(ratio, self.media.display_size()) {
                    self.preview.sync_size(&self.controller.region());
                }
            }
            CropEvent::PointerDown(pointer) => {
                self.fit_region();
                if self.controller.pointer_down(pointer, &self.media.display_box()) {
                    log::debug!("Drag started at ({:.1}, {:.1})", pointer.x, pointer.y);
                }
            }
            CropEvent::PointerMove(pointer) => {
                self.controller.pointer_move(pointer, self.media.display_size());
            }
            CropEvent::PointerUp(_) => {
                self.fit_region();
                if let Some(region) = self.controller.pointer_up() {
                    self.record(SampleTrigger::DragEnd, region);
                }
            }
            CropEvent::TimeUpdate => {
                self.fit_region();
                let region = self.controller.region();
                self.record(SampleTrigger::TimeUpdate, region);
            }
            CropEvent::PreviewTick => {
                self.tick_preview();
            }
        }
        Ok(())
    }

    /// One preview refresh against the current region
    pub fn tick_preview(&mut self) -> TickOutcome {
        self.fit_region();
        let region = self.controller.is_visible().then(|| self.controller.region());
        self.preview.render_tick(region, &self.media)
    }

    /// The rendered video may have been resized since the last event
    fn fit_region(&mut self) {
        if self.controller.fit_to(self.media.display_size()) {
            self.preview.sync_size(&self.controller.region());
        }
    }

    fn record(&mut self, trigger: SampleTrigger, region: Rect) {
        self.recorder
            .record(trigger, self.controller.is_visible(), region, &self.media);
    }

    /// Event loop: applies commands in arrival order and refreshes the preview
    /// on the Visible state's timer. Returns when shut down or when every
    /// sender is gone.
    pub fn run(mut self, commands: Receiver<SessionCommand>) -> Self {
        loop {
            // Re-read each turn: the timer appears and disappears with visibility
            let ticks = self
                .controller
                .preview_timer()
                .map(|timer| timer.ticks().clone())
                .unwrap_or_else(never);

            select! {
                recv(commands) -> msg => match msg {
                    Ok(SessionCommand::Event(event)) => {
                        if let Err(e) = self.handle(event) {
                            log::warn!("Rejected {event:?}: {e}");
                        }
                    }
                    Ok(SessionCommand::Export(reply)) => {
                        let _ = reply.send(self.export());
                    }
                    Ok(SessionCommand::Shutdown) | Err(_) => break,
                },
                recv(ticks) -> _ => {
                    self.tick_preview();
                }
            }
        }
        if self.controller.is_visible() {
            // Teardown cancels the preview timer with the Visible state
            let _ = self.controller.remove();
        }
        log::info!("Crop session stopped ({} samples)", self.log().len());
        self
    }
}

/// Messages accepted by a running session
#[derive(Debug)]
pub enum SessionCommand {
    Event(CropEvent),
    Export(Sender<Vec<MetadataSample>>),
    Shutdown,
}

/// Session errors seen by a `SessionHandle`
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Crop session is no longer running")]
    Disconnected,
}

/// Cloneable sender side of a spawned session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn send(&self, event: CropEvent) -> Result<(), SessionError> {
        self.tx
            .send(SessionCommand::Event(event))
            .map_err(|_| SessionError::Disconnected)
    }

    /// Snapshot of the log, taken after every event sent before this call
    pub fn export(&self) -> Result<Vec<MetadataSample>, SessionError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(SessionCommand::Export(reply_tx))
            .map_err(|_| SessionError::Disconnected)?;
        reply_rx.recv().map_err(|_| SessionError::Disconnected)
    }

    pub fn shutdown(&self) -> Result<(), SessionError> {
        self.tx
            .send(SessionCommand::Shutdown)
            .map_err(|_| SessionError::Disconnected)
    }
}

/// Run `session` on a dedicated thread. Joining returns the session for inspection.
pub fn spawn_session<M, P>(session: CropSession<M, P>) -> (SessionHandle, thread::JoinHandle<CropSession<M, P>>)
where
    M: MediaSurface + Send + 'static,
    P: PreviewSurface + Send + 'static,
{
    let (tx, rx) = unbounded();
    let handle = thread::spawn(move || session.run(rx));
    (SessionHandle { tx }, handle)
}
