// Opened media resources and the slot that owns the current one

use std::fmt;
use std::sync::Arc;

/// Action that frees engine-side state tied to an opened payload
pub type ReleaseAction = Box<dyn FnOnce() + Send + 'static>;

/// Result of a successful backend open: the engine handle plus how to free it
pub struct OpenedMedia<R> {
    pub resource: R,
    release: Option<ReleaseAction>,
}

impl<R> OpenedMedia<R> {
    pub fn new<F>(resource: R, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            resource,
            release: Some(Box::new(release)),
        }
    }

    /// Opened media whose engine needs no teardown
    pub fn without_release(resource: R) -> Self {
        Self {
            resource,
            release: None,
        }
    }
}

/// One opened, playable unit: the caller's payload, the backend handle and
/// its release action.
///
/// The release action runs exactly once: on [`MediaResource::release`], or on
/// drop if it was never released explicitly.
pub struct MediaResource<P, R> {
    payload: Arc<P>,
    resource: R,
    release: Option<ReleaseAction>,
}

impl<P, R> MediaResource<P, R> {
    pub fn new(payload: Arc<P>, opened: OpenedMedia<R>) -> Self {
        Self {
            payload,
            resource: opened.resource,
            release: opened.release,
        }
    }

    pub fn payload(&self) -> &Arc<P> {
        &self.payload
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Identity comparison against another payload
    pub fn holds(&self, payload: &Arc<P>) -> bool {
        Arc::ptr_eq(&self.payload, payload)
    }

    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            log::debug!("[resource] releasing opened media");
            release();
        }
    }
}

impl<P, R> Drop for MediaResource<P, R> {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl<P, R> fmt::Debug for MediaResource<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaResource")
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// Holds the currently open media resource, if any.
///
/// Replacing or clearing the held resource releases the previous one.
pub struct ResourceSlot<P, R> {
    current: Option<MediaResource<P, R>>,
}

impl<P, R> ResourceSlot<P, R> {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn current(&self) -> Option<&MediaResource<P, R>> {
        self.current.as_ref()
    }

    pub fn payload(&self) -> Option<&Arc<P>> {
        self.current.as_ref().map(|r| r.payload())
    }

    pub fn holds(&self, payload: &Arc<P>) -> bool {
        self.current.as_ref().is_some_and(|r| r.holds(payload))
    }

    /// Move the held resource out without releasing it
    pub fn take(&mut self) -> Option<MediaResource<P, R>> {
        self.current.take()
    }

    /// Install `resource`, releasing whatever was held before
    pub fn install(&mut self, resource: MediaResource<P, R>) {
        if let Some(previous) = self.current.replace(resource) {
            previous.release();
        }
    }

    /// Release and clear. Returns whether something was held.
    pub fn clear(&mut self) -> bool {
        match self.current.take() {
            Some(previous) => {
                previous.release();
                true
            }
            None => false,
        }
    }
}

impl<P, R> Default for ResourceSlot<P, R> {
    fn default() -> Self {
        Self::new()
    }
}
