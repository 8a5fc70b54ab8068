// Media-swap coordinator
// One swap lock is held across the backend open; the slot sits behind a second,
// short lock so close and readers never wait for a slow open. Installing re-checks
// the closed flag under the slot lock.

use crate::error::OpenError;
use crate::resource::{MediaResource, OpenedMedia, ResourceSlot};
use crate::task::CancellationToken;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What a swap request ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The new resource is installed
    Installed,
    /// Nothing to do: same payload already held, or the player is closed
    Unchanged,
    /// The open finished, but the player was closed or the request superseded
    /// meanwhile; the opened resource was released
    Discarded,
}

/// Engine-facing steps a swap drives, supplied by the player
pub trait SwapTarget<P, R> {
    /// Whether the engine currently drives the installed resource
    fn is_engine_running(&self) -> bool;

    fn stop_engine(&self);

    /// Called whenever the slot was emptied: after the previous resource was
    /// taken out, or after a freshly opened one was discarded
    fn on_cleared(&self);

    fn open(&self, payload: &Arc<P>, cancel: &CancellationToken)
        -> Result<OpenedMedia<R>, OpenError>;

    fn on_open_failed(&self, error: &OpenError);

    /// Called with the swap lock held, after `payload` was installed. A
    /// request cancelled by now must not publish anything.
    fn on_installed(&self, payload: &Arc<P>, cancel: &CancellationToken);
}

pub struct MediaSwapCoordinator<P, R> {
    swap_lock: Mutex<()>,
    slot: Mutex<ResourceSlot<P, R>>,
    closed: AtomicBool,
    root: CancellationToken,
}

impl<P, R> MediaSwapCoordinator<P, R> {
    pub fn new() -> Self {
        Self {
            swap_lock: Mutex::new(()),
            slot: Mutex::new(ResourceSlot::new()),
            closed: AtomicBool::new(false),
            root: CancellationToken::new(),
        }
    }

    /// Parent of every open token; cancelled by [`Self::close`]
    pub fn root_token(&self) -> &CancellationToken {
        &self.root
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn has_resource(&self) -> bool {
        !self.slot.lock().is_empty()
    }

    pub fn holds(&self, payload: &Arc<P>) -> bool {
        self.slot.lock().holds(payload)
    }

    /// Run `f` against the installed resource, if any
    pub fn with_current<T>(&self, f: impl FnOnce(&MediaResource<P, R>) -> T) -> Option<T> {
        self.slot.lock().current().map(f)
    }

    /// Replace the current resource with one opened from `payload`.
    ///
    /// `cancel` is handed to the backend open; if it trips before the new
    /// resource is installed, the resource is released and discarded.
    pub fn swap<T>(
        &self,
        payload: Arc<P>,
        cancel: &CancellationToken,
        target: &T,
    ) -> Result<SwapOutcome, OpenError>
    where
        T: SwapTarget<P, R>,
    {
        if self.is_unchanged(&payload) {
            return Ok(SwapOutcome::Unchanged);
        }

        let _swap = self.swap_lock.lock();

        // Another swap may have finished while we waited
        if self.is_unchanged(&payload) {
            return Ok(SwapOutcome::Unchanged);
        }
        if cancel.is_cancelled() {
            log::debug!("[swap] request superseded before it started");
            return Ok(SwapOutcome::Discarded);
        }

        if target.is_engine_running() {
            log::debug!("[swap] stopping engine before replacing media");
            target.stop_engine();
        }

        let previous = self.slot.lock().take();
        if let Some(previous) = previous {
            previous.release();
            target.on_cleared();
        }

        let opened = match target.open(&payload, cancel) {
            Ok(opened) => opened,
            Err(e) if cancel.is_cancelled() => {
                log::debug!("[swap] open gave up after cancellation: {}", e);
                return Ok(SwapOutcome::Discarded);
            }
            Err(e) => {
                log::warn!("[swap] open failed: {}", e);
                target.on_open_failed(&e);
                return Err(e);
            }
        };

        let resource = MediaResource::new(payload.clone(), opened);
        {
            let mut slot = self.slot.lock();
            if self.is_closed() || cancel.is_cancelled() {
                drop(slot);
                log::debug!("[swap] discarding media opened for a closed or superseded request");
                resource.release();
                // Drop whatever the open reported for the discarded media
                target.on_cleared();
                return Ok(SwapOutcome::Discarded);
            }
            slot.install(resource);
        }

        target.on_installed(&payload, cancel);
        Ok(SwapOutcome::Installed)
    }

    /// Release and clear the slot under the swap lock.
    ///
    /// `prepare` runs first with the lock held and may veto the clear (for
    /// example if the state changed while waiting for the lock).
    pub fn clear(&self, prepare: impl FnOnce() -> bool) -> bool {
        let _swap = self.swap_lock.lock();
        if self.is_closed() || !prepare() {
            return false;
        }
        let previous = self.slot.lock().take();
        if let Some(previous) = previous {
            previous.release();
        }
        true
    }

    /// Close exactly once. Only the first caller gets `true`; it cancels all
    /// in-flight opens and releases the held resource without waiting for a
    /// swap in progress.
    pub fn close(&self) -> bool {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.root.cancel();
        let previous = self.slot.lock().take();
        if let Some(previous) = previous {
            previous.release();
        }
        true
    }

    fn is_unchanged(&self, payload: &Arc<P>) -> bool {
        self.is_closed() || self.holds(payload)
    }
}

impl<P, R> Default for MediaSwapCoordinator<P, R> {
    fn default() -> Self {
        Self::new()
    }
}
