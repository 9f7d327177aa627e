use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::presentation::domain::presenter::Presenter;
use crate::shared::composited_image::CompositedImage;

/// Counters for the hand-off to presentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresentationStats {
    /// Images taken out of the slot by the presentation loop.
    pub received: u64,
    /// Images handed to the presenter.
    pub presented: u64,
    /// Images evicted from the slot by a newer one before presentation.
    pub superseded: u64,
    /// Images discarded because a newer sequence number was already shown.
    pub stale: u64,
}

/// Creates a connected dispatcher and presentation loop sharing one slot.
pub fn channel() -> (FrameDispatcher, PresentationLoop) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let superseded = Arc::new(AtomicU64::new(0));
    (
        FrameDispatcher {
            tx,
            evict: rx.clone(),
            superseded: Arc::clone(&superseded),
        },
        PresentationLoop {
            rx,
            superseded,
            last_presented: None,
            received: 0,
            presented: 0,
            stale: 0,
        },
    )
}

/// Producer side of the presentation slot. Owned by the processing context.
///
/// `dispatch` never blocks: if the previous image has not been picked up yet
/// it is evicted and replaced. The dispatcher holds a receiver of its own for
/// eviction, so the slot stays open even after the presentation loop is
/// dropped; the newest image then stays parked there until the dispatcher
/// goes too.
pub struct FrameDispatcher {
    tx: Sender<CompositedImage>,
    evict: Receiver<CompositedImage>,
    superseded: Arc<AtomicU64>,
}

impl FrameDispatcher {
    pub fn dispatch(&self, image: CompositedImage) {
        let mut pending = image;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(image)) => {
                    if self.evict.try_recv().is_ok() {
                        self.superseded.fetch_add(1, Ordering::Relaxed);
                    }
                    pending = image;
                }
            }
        }
    }
}

/// Consumer side of the presentation slot. Runs on the presentation context
/// and is the only caller of its presenter.
pub struct PresentationLoop {
    rx: Receiver<CompositedImage>,
    superseded: Arc<AtomicU64>,
    last_presented: Option<u64>,
    received: u64,
    presented: u64,
    stale: u64,
}

impl PresentationLoop {
    /// Presents whatever is waiting right now. Returns true if an image was
    /// presented.
    pub fn pump(&mut self, presenter: &mut dyn Presenter) -> bool {
        match self.rx.try_recv() {
            Ok(image) => self.offer(image, presenter),
            Err(_) => false,
        }
    }

    /// Presents images as they arrive until `keep_going` returns false or
    /// the dispatcher is dropped. `poll` bounds how long a single wait lasts
    /// before `keep_going` is checked again.
    pub fn run_while(
        &mut self,
        presenter: &mut dyn Presenter,
        mut keep_going: impl FnMut() -> bool,
        poll: Duration,
    ) {
        while keep_going() {
            match self.rx.recv_timeout(poll) {
                Ok(image) => {
                    self.offer(image, presenter);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
        self.pump(presenter);
    }

    pub fn last_presented(&self) -> Option<u64> {
        self.last_presented
    }

    pub fn stats(&self) -> PresentationStats {
        PresentationStats {
            received: self.received,
            presented: self.presented,
            superseded: self.superseded.load(Ordering::Relaxed),
            stale: self.stale,
        }
    }

    fn offer(&mut self, image: CompositedImage, presenter: &mut dyn Presenter) -> bool {
        self.received += 1;
        let sequence = image.sequence();
        if self.last_presented.is_some_and(|last| sequence <= last) {
            self.stale += 1;
            log::debug!("Skipping stale frame {sequence}");
            return false;
        }
        self.last_presented = Some(sequence);
        self.presented += 1;
        presenter.present(image);
        true
    }
}
