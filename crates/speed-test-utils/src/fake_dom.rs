//! In-memory document for engine tests.
//!
//! Models just enough of the DOM for AnySpeed:
//! - A node tree rooted at `#document` with a `body`
//! - Shadow roots attached to elements (not visible to light-DOM queries)
//! - Media elements with a playback rate and a write counter
//! - Mutation observers watching the document subtree
//! - Capturing `play` listeners on the document
//!
//! Like a real `MutationObserver` on the document, mutation notifications only
//! fire for changes in the light tree. Changes inside a shadow root are
//! invisible to the observer and are only picked up by the next poll.
//! `play` is not composed either, so document listeners never see it from an
//! element inside a shadow root.
//!
//! # Example
//!
//! ```rust,ignore
//! let doc = FakeDocument::new();
//! let video = doc.append(doc.body(), "video");
//! doc.set_rate_externally(video, 1.0);
//! assert_eq!(doc.rate_writes(video), 0);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use speed_core::dom::{MediaElement, MediaKind, MediaScope};
use speed_core::errors::DomError;
use speed_core::host::{DocumentHost, EventSink, HostEvent, Subscription};

/// Index of a node in a [`FakeDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

const DOCUMENT: NodeId = NodeId(0);
const BODY: NodeId = NodeId(1);

#[derive(Debug)]
struct Node {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    shadow_root: Option<NodeId>,
    is_shadow_root: bool,
    attached: bool,
    rate: f64,
    rate_writes: u32,
    rejects_writes: bool,
}

impl Node {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_string(),
            parent,
            children: Vec::new(),
            shadow_root: None,
            is_shadow_root: false,
            attached: true,
            rate: 1.0,
            rate_writes: 0,
            rejects_writes: false,
        }
    }
}

#[derive(Default)]
struct Tree {
    nodes: Vec<Node>,
    mutation_sinks: HashMap<u64, EventSink<FakeElement>>,
    play_sinks: HashMap<u64, EventSink<FakeElement>>,
    next_subscription: u64,
    fail_subscriptions: bool,
}

impl Tree {
    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Whether `id` is in the document's light tree (not inside any shadow).
    fn in_light_tree(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if node.is_shadow_root || !node.attached {
                return false;
            }
            current = node.parent;
        }
        true
    }

    /// Light-DOM descendants of `scope`, excluding `scope` itself.
    fn light_descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(scope).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    fn set_attached(&mut self, id: NodeId, attached: bool) {
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            let node = self.node_mut(node_id);
            node.attached = attached;
            stack.extend(node.children.iter().copied());
            stack.extend(node.shadow_root);
        }
    }
}

/// Shared, clonable in-memory document.
#[derive(Clone)]
pub struct FakeDocument {
    tree: Arc<Mutex<Tree>>,
}

impl Default for FakeDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FakeDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tree = self.lock();
        f.debug_struct("FakeDocument")
            .field("nodes", &tree.nodes.len())
            .field("mutation_observers", &tree.mutation_sinks.len())
            .field("play_listeners", &tree.play_sinks.len())
            .finish()
    }
}

impl FakeDocument {
    /// Empty document with a `body`.
    pub fn new() -> Self {
        let mut tree = Tree::default();
        tree.push(Node::new("#document", None));
        tree.push(Node::new("BODY", Some(DOCUMENT)));
        tree.node_mut(DOCUMENT).children.push(BODY);

        Self {
            tree: Arc::new(Mutex::new(tree)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The `body` element.
    pub fn body(&self) -> NodeId {
        BODY
    }

    /// Root scope for discovery.
    pub fn document(&self) -> FakeScope {
        FakeScope {
            doc: self.clone(),
            root: DOCUMENT,
        }
    }

    /// Append a new element under `parent` (an element or a shadow root).
    ///
    /// Tags are stored upper-case, as HTML documents report them.
    pub fn append(&self, parent: NodeId, tag: &str) -> NodeId {
        let (id, notify) = {
            let mut tree = self.lock();
            let id = tree.push(Node::new(&tag.to_ascii_uppercase(), Some(parent)));
            tree.node_mut(parent).children.push(id);
            (id, tree.in_light_tree(id))
        };

        if notify {
            self.notify_mutation();
        }
        id
    }

    /// Append a media element with an initial playback rate.
    pub fn append_media(&self, parent: NodeId, tag: &str, rate: f64) -> NodeId {
        let id = self.append(parent, tag);
        self.lock().node_mut(id).rate = rate;
        id
    }

    /// Build `depth` nested `div`s under `parent`, returning the innermost.
    pub fn append_nested(&self, parent: NodeId, depth: usize) -> NodeId {
        (0..depth).fold(parent, |current, _| self.append(current, "div"))
    }

    /// Attach an open shadow root to `host`. Does not notify observers.
    pub fn attach_shadow(&self, host: NodeId) -> NodeId {
        let mut tree = self.lock();
        let mut node = Node::new("#shadow-root", Some(host));
        node.is_shadow_root = true;
        let id = tree.push(node);
        tree.node_mut(host).shadow_root = Some(id);
        id
    }

    /// Detach `id` and its subtree from the document.
    pub fn remove(&self, id: NodeId) {
        let notify = {
            let mut tree = self.lock();
            let notify = tree.in_light_tree(id);
            if let Some(parent) = tree.node(id).parent {
                tree.node_mut(parent).children.retain(|child| *child != id);
            }
            tree.set_attached(id, false);
            notify
        };

        if notify {
            self.notify_mutation();
        }
    }

    /// Current playback rate of `id`.
    pub fn playback_rate(&self, id: NodeId) -> f64 {
        self.lock().node(id).rate
    }

    /// Number of rate writes the engine made to `id`.
    pub fn rate_writes(&self, id: NodeId) -> u32 {
        self.lock().node(id).rate_writes
    }

    /// Simulate a host page script resetting the rate. Not counted as an
    /// engine write and does not notify observers.
    pub fn set_rate_externally(&self, id: NodeId, rate: f64) {
        self.lock().node_mut(id).rate = rate;
    }

    /// Make every future rate write to `id` fail.
    pub fn reject_writes(&self, id: NodeId) {
        self.lock().node_mut(id).rejects_writes = true;
    }

    /// Make future `watch_mutations`/`intercept_play` calls fail.
    pub fn fail_subscriptions(&self) {
        self.lock().fail_subscriptions = true;
    }

    /// Handle for element `id`.
    pub fn element(&self, id: NodeId) -> FakeElement {
        FakeElement {
            doc: self.clone(),
            id,
        }
    }

    /// Dispatch `play` from `id` to capturing document listeners.
    /// Elements inside a shadow root or outside the document reach none.
    pub fn dispatch_play(&self, id: NodeId) {
        let sinks: Vec<_> = {
            let tree = self.lock();
            if !tree.in_light_tree(id) {
                return;
            }
            tree.play_sinks.values().cloned().collect()
        };
        for sink in sinks {
            sink(HostEvent::Play(self.element(id)));
        }
    }

    /// Number of live mutation observers.
    pub fn mutation_observer_count(&self) -> usize {
        self.lock().mutation_sinks.len()
    }

    /// Number of live play listeners.
    pub fn play_listener_count(&self) -> usize {
        self.lock().play_sinks.len()
    }

    fn notify_mutation(&self) {
        // Sinks are called without the lock held
        let sinks: Vec<_> = self.lock().mutation_sinks.values().cloned().collect();
        for sink in sinks {
            sink(HostEvent::Mutation);
        }
    }

    fn subscribe(
        &self,
        name: &'static str,
        sink: EventSink<FakeElement>,
        select: fn(&mut Tree) -> &mut HashMap<u64, EventSink<FakeElement>>,
    ) -> Result<Subscription, DomError> {
        let key = {
            let mut tree = self.lock();
            if tree.fail_subscriptions {
                return Err(DomError::Unavailable(format!("{name} subscription refused")));
            }
            let key = tree.next_subscription;
            tree.next_subscription += 1;
            select(&mut tree).insert(key, sink);
            key
        };

        let tree = Arc::clone(&self.tree);
        Ok(Subscription::new(name, move || {
            let mut tree = tree.lock().unwrap_or_else(PoisonError::into_inner);
            select(&mut tree).remove(&key);
        }))
    }
}

impl DocumentHost for FakeDocument {
    type Media = FakeElement;
    type Scope = FakeScope;

    fn document(&self) -> FakeScope {
        FakeDocument::document(self)
    }

    fn watch_mutations(&self, sink: EventSink<FakeElement>) -> Result<Subscription, DomError> {
        self.subscribe("mutation", sink, |tree| &mut tree.mutation_sinks)
    }

    fn intercept_play(&self, sink: EventSink<FakeElement>) -> Result<Subscription, DomError> {
        self.subscribe("play", sink, |tree| &mut tree.play_sinks)
    }
}

/// Document or shadow root of a [`FakeDocument`].
#[derive(Debug, Clone)]
pub struct FakeScope {
    doc: FakeDocument,
    root: NodeId,
}

impl MediaScope for FakeScope {
    type Media = FakeElement;

    fn media_elements(&self) -> Vec<FakeElement> {
        let tree = self.doc.lock();
        tree.light_descendants(self.root)
            .into_iter()
            .filter(|id| MediaKind::from_tag(&tree.node(*id).tag).is_some())
            .map(|id| self.doc.element(id))
            .collect()
    }

    fn shadow_roots(&self) -> Vec<FakeScope> {
        let tree = self.doc.lock();
        tree.light_descendants(self.root)
            .into_iter()
            .filter_map(|id| tree.node(id).shadow_root)
            .map(|root| FakeScope {
                doc: self.doc.clone(),
                root,
            })
            .collect()
    }
}

/// Element handle into a [`FakeDocument`].
#[derive(Debug, Clone)]
pub struct FakeElement {
    doc: FakeDocument,
    id: NodeId,
}

impl FakeElement {
    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl MediaElement for FakeElement {
    fn tag_name(&self) -> String {
        self.doc.lock().node(self.id).tag.clone()
    }

    fn playback_rate(&self) -> f64 {
        self.doc.playback_rate(self.id)
    }

    fn set_playback_rate(&self, rate: f64) -> Result<(), DomError> {
        let mut tree = self.doc.lock();
        let node = tree.node_mut(self.id);
        if !node.attached {
            return Err(DomError::Detached);
        }
        if node.rejects_writes {
            return Err(DomError::Rejected("NotSupportedError".to_string()));
        }
        node.rate = rate;
        node.rate_writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_sink(count: &Arc<AtomicU32>) -> EventSink<FakeElement> {
        let count = Arc::clone(count);
        Arc::new(move |_event| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_light_dom_query_skips_shadow_content() {
        let doc = FakeDocument::new();
        let host = doc.append(doc.body(), "div");
        let shadow = doc.attach_shadow(host);
        doc.append(shadow, "video");
        doc.append(doc.body(), "audio");

        let scope = doc.document();
        assert_eq!(scope.media_elements().len(), 1);
        assert_eq!(scope.shadow_roots().len(), 1);
    }

    #[test]
    fn test_mutation_notifications_only_for_light_tree() {
        let doc = FakeDocument::new();
        let count = Arc::new(AtomicU32::new(0));
        let _sub = doc.watch_mutations(counting_sink(&count)).unwrap();

        let host = doc.append(doc.body(), "div");
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let shadow = doc.attach_shadow(host);
        doc.append(shadow, "video");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_drop_unregisters() {
        let doc = FakeDocument::new();
        let count = Arc::new(AtomicU32::new(0));
        let sub = doc.intercept_play(counting_sink(&count)).unwrap();
        assert_eq!(doc.play_listener_count(), 1);

        drop(sub);
        assert_eq!(doc.play_listener_count(), 0);

        let video = doc.append(doc.body(), "video");
        doc.dispatch_play(video);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_play_from_shadow_root_not_delivered() {
        let doc = FakeDocument::new();
        let count = Arc::new(AtomicU32::new(0));
        let _sub = doc.intercept_play(counting_sink(&count)).unwrap();

        let host = doc.append(doc.body(), "video-player");
        let shadow = doc.attach_shadow(host);
        let hidden = doc.append(shadow, "video");
        let visible = doc.append(doc.body(), "video");

        doc.dispatch_play(hidden);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        doc.dispatch_play(visible);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_removed_element_rejects_writes() {
        let doc = FakeDocument::new();
        let video = doc.append(doc.body(), "video");
        let handle = doc.element(video);
        doc.remove(video);

        assert_eq!(handle.set_playback_rate(2.0), Err(DomError::Detached));
        assert!(doc.document().media_elements().is_empty());
    }

    #[test]
    fn test_external_reset_not_counted() {
        let doc = FakeDocument::new();
        let video = doc.append_media(doc.body(), "video", 1.5);
        doc.set_rate_externally(video, 1.0);
        assert_eq!(doc.playback_rate(video), 1.0);
        assert_eq!(doc.rate_writes(video), 0);
    }
}
