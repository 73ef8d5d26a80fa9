//! Host document abstraction for async drivers.
//!
//! A [`DocumentHost`] hands out the document scope and lets a driver
//! subscribe to structural mutations and play events. Each subscription is a
//! [`Subscription`] guard; dropping it releases the underlying observer or
//! listener, so a driver's subscriptions live exactly as long as it does.

use std::fmt;
use std::sync::Arc;

use crate::dom::{MediaElement, MediaScope};
use crate::errors::DomError;

/// Notification from the host document.
#[derive(Debug, Clone)]
pub enum HostEvent<M> {
    /// Nodes were added, removed, or moved somewhere in the document.
    Mutation,
    /// An element dispatched `play`. The element may not be media; the
    /// enforcer filters by tag.
    Play(M),
}

/// Callback the host invokes for each event. Must not block.
pub type EventSink<M> = Arc<dyn Fn(HostEvent<M>) + Send + Sync>;

/// Release guard for one host subscription.
#[must_use = "dropping a Subscription releases it immediately"]
pub struct Subscription {
    name: &'static str,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(name: &'static str, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            name,
            release: Some(Box::new(release)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Release now rather than on drop.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// A document an async driver can enforce against.
pub trait DocumentHost: Send + Sync + 'static {
    type Media: MediaElement + Send + 'static;
    type Scope: MediaScope<Media = Self::Media> + Send;

    /// Root scope for discovery.
    fn document(&self) -> Self::Scope;

    /// Watch the whole document subtree for child-list changes.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::Unavailable`] if no observer can be attached.
    fn watch_mutations(&self, sink: EventSink<Self::Media>) -> Result<Subscription, DomError>;

    /// Listen for `play` on the document in capturing mode.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::Unavailable`] if the listener cannot be added.
    fn intercept_play(&self, sink: EventSink<Self::Media>) -> Result<Subscription, DomError>;
}
