//! Document abstractions.
//!
//! A [`MediaScope`] is anything that can be queried like a document: the
//! document itself or a shadow root. Discovery walks scopes; enforcement
//! writes through [`MediaElement`].

use crate::errors::DomError;

/// Kind of playable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// Classify a tag name. Case-insensitive, since HTML documents report
    /// upper-case tag names and XHTML documents lower-case.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        if tag.eq_ignore_ascii_case("video") {
            Some(MediaKind::Video)
        } else if tag.eq_ignore_ascii_case("audio") {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

/// Handle to an element whose playback rate can be read and written.
///
/// Handles are cheap to clone and carry no identity guarantees: the host page
/// may remove the element at any time, in which case writes fail with
/// [`DomError::Detached`].
pub trait MediaElement: Clone {
    /// Element tag name as reported by the document.
    fn tag_name(&self) -> String;

    /// Current playback rate.
    fn playback_rate(&self) -> f64;

    /// Write a new playback rate.
    ///
    /// # Errors
    ///
    /// Returns [`DomError`] when the element is gone or the platform rejects
    /// the value.
    fn set_playback_rate(&self, rate: f64) -> Result<(), DomError>;

    /// Media kind derived from the tag.
    fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_tag(&self.tag_name())
    }
}

/// A queryable subtree: the document or one shadow root.
pub trait MediaScope: Sized {
    type Media: MediaElement;

    /// Video and audio elements in this scope's light DOM. Does not cross
    /// into shadow roots.
    fn media_elements(&self) -> Vec<Self::Media>;

    /// Shadow roots attached to elements of this scope.
    fn shadow_roots(&self) -> Vec<Self>;
}
