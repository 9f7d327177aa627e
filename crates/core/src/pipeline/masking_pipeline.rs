use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::frame_source::{CaptureStats, FrameSource};
use crate::compositing::domain::overlay_asset::{OverlayAsset, OverlayAssetError};
use crate::compositing::domain::overlay_compositor::OverlayCompositor;
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::presentation::frame_dispatcher::FrameDispatcher;
use crate::shared::asset_resolver::{self, AssetResolveError};
use crate::shared::frame::Frame;

/// Startup failures. Nothing per-frame ends up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Asset(#[from] OverlayAssetError),
    #[error(transparent)]
    Resolve(#[from] AssetResolveError),
}

/// Resolves the overlay image by name and decodes it.
pub fn load_overlay(
    name: &str,
    bundled_dir: Option<&Path>,
) -> Result<Arc<OverlayAsset>, PipelineError> {
    let path = asset_resolver::resolve(name, bundled_dir)?;
    log::info!("Using overlay {}", path.display());
    Ok(OverlayAsset::load(&path)?)
}

/// Live masking pipeline: every frame the source delivers is run through
/// detection and compositing on the source's worker, then handed to the
/// presentation side.
///
/// Frames that arrive while one is still being processed are dropped by the
/// source, so the output lags the camera by at most one frame.
pub struct MaskingPipeline {
    source: Box<dyn FrameSource>,
}

impl MaskingPipeline {
    pub fn new(
        mut source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        compositor: Box<dyn OverlayCompositor>,
        dispatcher: FrameDispatcher,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        let mut processor = FrameProcessor {
            detector,
            compositor,
            dispatcher,
            logger,
            processed: 0,
        };
        source.on_frame(Box::new(move |frame| processor.process(frame)));
        Self { source }
    }

    pub fn start(&mut self) -> Result<(), PipelineError> {
        self.source.start()?;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.source.stop();
    }

    pub fn is_running(&self) -> bool {
        self.source.is_running()
    }

    pub fn stats(&self) -> CaptureStats {
        self.source.stats()
    }
}

/// Per-frame work, owned by the source's frame handler.
struct FrameProcessor {
    detector: Box<dyn FaceDetector>,
    compositor: Box<dyn OverlayCompositor>,
    dispatcher: FrameDispatcher,
    logger: Box<dyn PipelineLogger>,
    processed: u64,
}

impl FrameProcessor {
    fn process(&mut self, frame: Frame) {
        let sequence = frame.sequence();

        let t0 = Instant::now();
        let features = match self.detector.detect(&frame) {
            Ok(features) => features,
            Err(e) => {
                log::warn!("Detection failed on frame {sequence}: {e}");
                Vec::new()
            }
        };
        self.logger
            .timing("detect", t0.elapsed().as_secs_f64() * 1000.0);
        let faces = features.iter().filter(|f| f.is_face()).count();
        self.logger.metric("faces", faces as f64);
        self.logger.metric("features", features.len() as f64);

        let t1 = Instant::now();
        let image = self.compositor.composite(frame, &features);
        self.logger
            .timing("composite", t1.elapsed().as_secs_f64() * 1000.0);

        self.dispatcher.dispatch(image);
        self.processed += 1;
        self.logger.progress(self.processed);
    }
}

impl Drop for FrameProcessor {
    fn drop(&mut self) {
        self.logger.summary();
    }
}
