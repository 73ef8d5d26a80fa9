//! Media discovery.
//!
//! Walks the document and every reachable shadow root, collecting video and
//! audio elements. All shadow nesting levels are covered in a single pass, so
//! coverage does not depend on how often passes run.

use std::collections::VecDeque;

use crate::dom::MediaScope;

/// Collect every media element reachable from `root`.
///
/// `max_shadow_depth` bounds how many shadow boundaries are crossed: `Some(0)`
/// restricts discovery to the light DOM, `None` is unbounded. Result order is
/// not meaningful.
pub fn discover<S: MediaScope>(root: S, max_shadow_depth: Option<usize>) -> Vec<S::Media> {
    let mut found = Vec::new();
    let mut pending = VecDeque::from([(root, 0usize)]);

    while let Some((scope, depth)) = pending.pop_front() {
        found.extend(scope.media_elements());

        if max_shadow_depth.is_some_and(|max| depth >= max) {
            continue;
        }

        for shadow in scope.shadow_roots() {
            pending.push_back((shadow, depth + 1));
        }
    }

    found
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use crate::dom::MediaElement;
    use crate::errors::DomError;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Minimal in-file media element for unit tests.
    #[derive(Debug, Clone)]
    pub(crate) struct StubMedia {
        pub tag: &'static str,
        pub rate: Rc<Cell<f64>>,
        pub writes: Rc<Cell<u32>>,
        pub reject: bool,
    }

    impl StubMedia {
        pub(crate) fn new(tag: &'static str, rate: f64) -> Self {
            Self {
                tag,
                rate: Rc::new(Cell::new(rate)),
                writes: Rc::new(Cell::new(0)),
                reject: false,
            }
        }

        pub(crate) fn rejecting(tag: &'static str, rate: f64) -> Self {
            Self {
                reject: true,
                ..Self::new(tag, rate)
            }
        }
    }

    impl MediaElement for StubMedia {
        fn tag_name(&self) -> String {
            self.tag.to_uppercase()
        }

        fn playback_rate(&self) -> f64 {
            self.rate.get()
        }

        fn set_playback_rate(&self, rate: f64) -> Result<(), DomError> {
            if self.reject {
                return Err(DomError::Rejected("NotSupportedError".to_string()));
            }
            self.writes.set(self.writes.get() + 1);
            self.rate.set(rate);
            Ok(())
        }
    }

    #[derive(Debug, Clone, Default)]
    pub(crate) struct StubScope {
        pub media: Vec<StubMedia>,
        pub shadows: Rc<RefCell<Vec<StubScope>>>,
    }

    impl StubScope {
        pub(crate) fn with_media(media: Vec<StubMedia>) -> Self {
            Self {
                media,
                shadows: Rc::default(),
            }
        }

        pub(crate) fn attach(self, shadow: StubScope) -> Self {
            self.shadows.borrow_mut().push(shadow);
            self
        }
    }

    impl MediaScope for StubScope {
        type Media = StubMedia;

        fn media_elements(&self) -> Vec<StubMedia> {
            self.media.clone()
        }

        fn shadow_roots(&self) -> Vec<StubScope> {
            self.shadows.borrow().clone()
        }
    }

    #[test]
    fn test_empty_document_yields_nothing() {
        assert!(discover(StubScope::default(), None).is_empty());
    }

    #[test]
    fn test_light_dom_media() {
        let root = StubScope::with_media(vec![
            StubMedia::new("video", 1.0),
            StubMedia::new("audio", 1.0),
        ]);
        assert_eq!(discover(root, None).len(), 2);
    }

    #[test]
    fn test_shadow_root_media_included() {
        let shadow = StubScope::with_media(vec![StubMedia::new("video", 1.0)]);
        let root = StubScope::with_media(vec![StubMedia::new("audio", 1.0)]).attach(shadow);

        let found = discover(root, None);
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|m| m.tag == "video"));
    }

    #[test]
    fn test_nested_shadow_roots_in_one_pass() {
        let innermost = StubScope::with_media(vec![StubMedia::new("video", 1.0)]);
        let middle = StubScope::default().attach(innermost);
        let outer = StubScope::default().attach(middle);
        let root = StubScope::default().attach(outer);

        assert_eq!(discover(root, None).len(), 1);
    }

    #[test]
    fn test_shadow_depth_limit() {
        let deep = StubScope::with_media(vec![StubMedia::new("video", 1.0)]);
        let shallow = StubScope::with_media(vec![StubMedia::new("audio", 1.0)]).attach(deep);
        let root = StubScope::with_media(vec![StubMedia::new("video", 1.0)]).attach(shallow);

        assert_eq!(discover(root.clone(), Some(0)).len(), 1);
        assert_eq!(discover(root.clone(), Some(1)).len(), 2);
        assert_eq!(discover(root, Some(2)).len(), 3);
    }
}
