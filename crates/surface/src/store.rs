use core_types::SurfaceHandle;
use reconciler::{Mutation, Surface, SurfaceError, apply_mutation};
use std::collections::HashMap;
use std::sync::Arc;
use vdom::debug::{element_line, text_line};
use vdom::{Behavior, NODE_VALUE_KEY, NodeType, SurfaceEvent};

const CONTAINER_TAG: &str = "#container";

/// In-memory rendering surface.
///
/// Handles are never reused; arena slots of released handles are. `apply` is
/// all-or-nothing: every mutation of a batch is journaled, and on the first
/// failure the journal is unwound so the store is left exactly as it was
/// before the batch. Subtrees detached by a batch are released only once the
/// whole batch has succeeded.
pub struct SurfaceStore {
    nodes: Vec<NodeRecord>,
    live: HashMap<SurfaceHandle, usize>,
    free: Vec<usize>,
    next_handle: u64,
    journal: Option<Vec<Undo>>,
    pending_release: Vec<SurfaceHandle>,
}

impl SurfaceStore {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            live: HashMap::new(),
            free: Vec::new(),
            next_handle: 1,
            journal: None,
            pending_release: Vec::new(),
        }
    }

    /// Allocates a root that can hold children but carries no attributes.
    pub fn create_container(&mut self) -> SurfaceHandle {
        self.insert_node(NodeKind::Container)
    }

    pub fn contains(&self, handle: SurfaceHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Number of handles not yet released.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Arena slots ever allocated, live or awaiting reuse.
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn parent(&self, handle: SurfaceHandle) -> Option<SurfaceHandle> {
        self.record(handle).and_then(|r| r.parent)
    }

    pub fn children(&self, handle: SurfaceHandle) -> &[SurfaceHandle] {
        self.record(handle)
            .map(|r| r.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn tag(&self, handle: SurfaceHandle) -> Option<&str> {
        self.record(handle).map(|r| match &r.kind {
            NodeKind::Container => CONTAINER_TAG,
            NodeKind::Element { name, .. } => &**name,
            NodeKind::Text { .. } => vdom::TEXT_TAG,
        })
    }

    pub fn attribute(&self, handle: SurfaceHandle, name: &str) -> Option<&str> {
        match &self.record(handle)?.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| &**k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Attributes of an element in the order they were first set.
    pub fn attributes(&self, handle: SurfaceHandle) -> Vec<(&str, &str)> {
        match self.record(handle).map(|r| &r.kind) {
            Some(NodeKind::Element { attributes, .. }) => attributes
                .iter()
                .map(|(k, v)| (&**k, v.as_str()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Event names with at least one bound listener, in binding order.
    pub fn bound_events(&self, handle: SurfaceHandle) -> Vec<&str> {
        self.record(handle)
            .map(|r| r.listeners.iter().map(|(e, _)| &**e).collect())
            .unwrap_or_default()
    }

    pub fn text(&self, handle: SurfaceHandle) -> Option<&str> {
        match &self.record(handle)?.kind {
            NodeKind::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Listeners bound for `event` on `handle`, in binding order.
    pub fn listeners(&self, handle: SurfaceHandle, event: &str) -> Vec<&Behavior> {
        self.record(handle)
            .map(|r| {
                r.listeners
                    .iter()
                    .filter(|(e, _)| &**e == event)
                    .map(|(_, b)| b)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Invokes the listeners bound for `event` on `target`. Events do not
    /// propagate to ancestors. Returns how many listeners ran.
    pub fn dispatch(&self, target: SurfaceHandle, event: &str, value: Option<String>) -> usize {
        let listeners = self.listeners(target, event);
        if listeners.is_empty() {
            return 0;
        }
        let event = SurfaceEvent {
            target,
            name: Arc::from(event),
            value,
        };
        for behavior in &listeners {
            behavior.invoke(&event);
        }
        listeners.len()
    }

    /// Line rendering of the subtree under `root`, two spaces per level.
    ///
    /// A container contributes no line of its own; its children start at
    /// depth zero.
    pub fn snapshot_lines(&self, root: SurfaceHandle) -> Vec<String> {
        let mut out = Vec::new();
        match self.record(root).map(|r| &r.kind) {
            Some(NodeKind::Container) => {
                for child in self.children(root) {
                    self.snapshot_node(*child, 0, &mut out);
                }
            }
            Some(_) => self.snapshot_node(root, 0, &mut out),
            None => {}
        }
        out
    }

    fn snapshot_node(&self, handle: SurfaceHandle, depth: usize, out: &mut Vec<String>) {
        let Some(record) = self.record(handle) else {
            return;
        };
        let mut line = "  ".repeat(depth);
        match &record.kind {
            NodeKind::Text { text } => line.push_str(&text_line(text)),
            NodeKind::Element { name, attributes } => line.push_str(&element_line(
                name,
                attributes.iter().map(|(k, v)| (&**k, v.as_str())),
                record.listeners.iter().map(|(e, _)| &**e),
            )),
            NodeKind::Container => line.push_str(CONTAINER_TAG),
        }
        out.push(line);
        for child in &record.children {
            self.snapshot_node(*child, depth + 1, out);
        }
    }

    fn record(&self, handle: SurfaceHandle) -> Option<&NodeRecord> {
        self.live.get(&handle).map(|&index| &self.nodes[index])
    }

    fn index_of(&self, handle: SurfaceHandle) -> Result<usize, SurfaceError> {
        self.live
            .get(&handle)
            .copied()
            .ok_or(SurfaceError::UnknownHandle(handle))
    }

    fn insert_node(&mut self, kind: NodeKind) -> SurfaceHandle {
        let handle = SurfaceHandle(self.next_handle);
        self.next_handle += 1;
        let record = NodeRecord::new(kind);
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = record;
                index
            }
            None => {
                self.nodes.push(record);
                self.nodes.len() - 1
            }
        };
        self.live.insert(handle, index);
        handle
    }

    fn push_undo(&mut self, undo: Undo) {
        if let Some(journal) = &mut self.journal {
            journal.push(undo);
        }
    }

    fn is_descendant(&self, ancestor: SurfaceHandle, maybe_descendant: SurfaceHandle) -> bool {
        let mut stack: Vec<SurfaceHandle> = self.children(ancestor).to_vec();
        while let Some(current) = stack.pop() {
            if current == maybe_descendant {
                return true;
            }
            stack.extend_from_slice(self.children(current));
        }
        false
    }

    fn release_subtree(&mut self, handle: SurfaceHandle) {
        let Some(index) = self.live.remove(&handle) else {
            return;
        };
        let record = std::mem::replace(&mut self.nodes[index], NodeRecord::vacant());
        self.free.push(index);
        for child in record.children {
            self.release_subtree(child);
        }
    }

    fn undo(&mut self, undo: Undo) {
        match undo {
            Undo::Attribute { index, name, prev } => {
                if let NodeKind::Element { attributes, .. } = &mut self.nodes[index].kind {
                    let pos = attributes.iter().position(|(k, _)| *k == name);
                    match (pos, prev) {
                        (Some(pos), Some((_, value))) => attributes[pos].1 = value,
                        (None, Some((at, value))) => {
                            attributes.insert(at.min(attributes.len()), (name, value))
                        }
                        (Some(pos), None) => {
                            attributes.remove(pos);
                        }
                        (None, None) => {}
                    }
                }
            }
            Undo::Text { index, prev } => {
                if let NodeKind::Text { text } = &mut self.nodes[index].kind {
                    *text = prev;
                }
            }
            Undo::Bound { index, at } => {
                let listeners = &mut self.nodes[index].listeners;
                if at < listeners.len() {
                    listeners.remove(at);
                }
            }
            Undo::Unbound { index, at, listener } => {
                let listeners = &mut self.nodes[index].listeners;
                listeners.insert(at.min(listeners.len()), listener);
            }
            Undo::Inserted {
                parent,
                child,
                child_index,
            } => {
                self.nodes[parent].children.retain(|h| *h != child);
                self.nodes[child_index].parent = None;
            }
            Undo::Removed {
                parent,
                parent_handle,
                child,
                child_index,
                at,
            } => {
                let siblings = &mut self.nodes[parent].children;
                siblings.insert(at.min(siblings.len()), child);
                self.nodes[child_index].parent = Some(parent_handle);
            }
        }
    }
}

impl Default for SurfaceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for SurfaceStore {
    fn create_handle(&mut self, kind: &NodeType) -> Result<SurfaceHandle, SurfaceError> {
        let node = match kind {
            NodeType::Text => NodeKind::Text {
                text: String::new(),
            },
            NodeType::Element(name) => NodeKind::Element {
                name: Arc::clone(name),
                attributes: Vec::new(),
            },
        };
        let handle = self.insert_node(node);
        log::trace!(target: "surface.store", "create {kind} -> {handle}");
        Ok(handle)
    }

    fn set_property(
        &mut self,
        handle: SurfaceHandle,
        name: &str,
        value: &str,
    ) -> Result<(), SurfaceError> {
        let index = self.index_of(handle)?;
        let undo = match &mut self.nodes[index].kind {
            NodeKind::Text { text } if name == NODE_VALUE_KEY => Undo::Text {
                index,
                prev: std::mem::replace(text, value.to_string()),
            },
            NodeKind::Element { attributes, .. } => {
                let prev = match attributes.iter().position(|(k, _)| &**k == name) {
                    Some(pos) => {
                        let old = std::mem::replace(&mut attributes[pos].1, value.to_string());
                        Some((pos, old))
                    }
                    None => {
                        attributes.push((Arc::from(name), value.to_string()));
                        None
                    }
                };
                Undo::Attribute {
                    index,
                    name: Arc::from(name),
                    prev,
                }
            }
            _ => return Err(SurfaceError::WrongNodeKind(handle)),
        };
        self.push_undo(undo);
        Ok(())
    }

    fn clear_property(&mut self, handle: SurfaceHandle, name: &str) -> Result<(), SurfaceError> {
        let index = self.index_of(handle)?;
        let undo = match &mut self.nodes[index].kind {
            NodeKind::Text { text } if name == NODE_VALUE_KEY => Undo::Text {
                index,
                prev: std::mem::take(text),
            },
            NodeKind::Element { attributes, .. } => {
                let Some(pos) = attributes.iter().position(|(k, _)| &**k == name) else {
                    return Ok(());
                };
                let (name, value) = attributes.remove(pos);
                Undo::Attribute {
                    index,
                    name,
                    prev: Some((pos, value)),
                }
            }
            _ => return Err(SurfaceError::WrongNodeKind(handle)),
        };
        self.push_undo(undo);
        Ok(())
    }

    fn bind_behavior(
        &mut self,
        handle: SurfaceHandle,
        event: &str,
        behavior: &Behavior,
    ) -> Result<(), SurfaceError> {
        let index = self.index_of(handle)?;
        let record = &mut self.nodes[index];
        if !matches!(record.kind, NodeKind::Element { .. }) {
            return Err(SurfaceError::WrongNodeKind(handle));
        }
        record.listeners.push((Arc::from(event), behavior.clone()));
        let at = record.listeners.len() - 1;
        self.push_undo(Undo::Bound { index, at });
        Ok(())
    }

    fn unbind_behavior(
        &mut self,
        handle: SurfaceHandle,
        event: &str,
        behavior: &Behavior,
    ) -> Result<(), SurfaceError> {
        let index = self.index_of(handle)?;
        let listeners = &mut self.nodes[index].listeners;
        let Some(at) = listeners
            .iter()
            .position(|(e, b)| &**e == event && b == behavior)
        else {
            return Err(SurfaceError::Rejected(format!(
                "no matching {event} listener on {handle}"
            )));
        };
        let listener = listeners.remove(at);
        self.push_undo(Undo::Unbound {
            index,
            at,
            listener,
        });
        Ok(())
    }

    fn insert_child(
        &mut self,
        parent: SurfaceHandle,
        child: SurfaceHandle,
        before: Option<SurfaceHandle>,
    ) -> Result<(), SurfaceError> {
        let parent_index = self.index_of(parent)?;
        let child_index = self.index_of(child)?;
        if parent == child || self.is_descendant(child, parent) {
            debug_assert!(false, "cannot create cycle");
            return Err(SurfaceError::CycleDetected { parent, child });
        }
        if matches!(self.nodes[parent_index].kind, NodeKind::Text { .. }) {
            return Err(SurfaceError::InvalidParent(parent));
        }
        if self.nodes[child_index].parent.is_some() {
            return Err(SurfaceError::InvalidParent(child));
        }
        if matches!(self.nodes[child_index].kind, NodeKind::Container) {
            return Err(SurfaceError::WrongNodeKind(child));
        }
        let siblings = &self.nodes[parent_index].children;
        let at = match before {
            Some(anchor) => siblings
                .iter()
                .position(|h| *h == anchor)
                .ok_or(SurfaceError::NotAChild {
                    parent,
                    child: anchor,
                })?,
            None => siblings.len(),
        };
        self.nodes[parent_index].children.insert(at, child);
        self.nodes[child_index].parent = Some(parent);
        self.push_undo(Undo::Inserted {
            parent: parent_index,
            child,
            child_index,
        });
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: SurfaceHandle,
        child: SurfaceHandle,
    ) -> Result<(), SurfaceError> {
        let parent_index = self.index_of(parent)?;
        let child_index = self.index_of(child)?;
        if self.nodes[child_index].parent != Some(parent) {
            return Err(SurfaceError::NotAChild { parent, child });
        }
        let siblings = &mut self.nodes[parent_index].children;
        let Some(at) = siblings.iter().position(|h| *h == child) else {
            return Err(SurfaceError::NotAChild { parent, child });
        };
        siblings.remove(at);
        self.nodes[child_index].parent = None;
        if self.journal.is_some() {
            self.push_undo(Undo::Removed {
                parent: parent_index,
                parent_handle: parent,
                child,
                child_index,
                at,
            });
            self.pending_release.push(child);
        } else {
            self.release_subtree(child);
        }
        Ok(())
    }

    fn apply(&mut self, batch: &[Mutation]) -> Result<(), SurfaceError> {
        self.journal = Some(Vec::with_capacity(batch.len()));
        let mut failure = None;
        for (i, mutation) in batch.iter().enumerate() {
            if let Err(err) = apply_mutation(self, mutation) {
                failure = Some((i, err));
                break;
            }
        }
        let journal = self.journal.take().unwrap_or_default();
        let detached = std::mem::take(&mut self.pending_release);

        if let Some((i, err)) = failure {
            let undone = journal.len();
            for undo in journal.into_iter().rev() {
                self.undo(undo);
            }
            log::warn!(
                target: "surface.store",
                "batch rejected at mutation {i}/{}: {err}; rolled back {undone} change(s)",
                batch.len()
            );
            return Err(err);
        }

        let before = self.live.len();
        for handle in detached {
            if self.parent(handle).is_none() {
                self.release_subtree(handle);
            }
        }
        log::debug!(
            target: "surface.store",
            "applied {} mutation(s), released {} handle(s)",
            batch.len(),
            before - self.live.len()
        );
        Ok(())
    }
}

struct NodeRecord {
    kind: NodeKind,
    parent: Option<SurfaceHandle>,
    children: Vec<SurfaceHandle>,
    listeners: Vec<(Arc<str>, Behavior)>,
}

impl NodeRecord {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Placeholder for a released slot; holds no payload.
    fn vacant() -> Self {
        Self::new(NodeKind::Container)
    }
}

enum NodeKind {
    Container,
    Element {
        name: Arc<str>,
        attributes: Vec<(Arc<str>, String)>,
    },
    Text {
        text: String,
    },
}

/// Inverse of one applied mutation. Indices are arena slots, which stay
/// valid for the duration of a batch since nothing is released mid-batch.
enum Undo {
    Attribute {
        index: usize,
        name: Arc<str>,
        prev: Option<(usize, String)>,
    },
    Text {
        index: usize,
        prev: String,
    },
    Bound {
        index: usize,
        at: usize,
    },
    Unbound {
        index: usize,
        at: usize,
        listener: (Arc<str>, Behavior),
    },
    Inserted {
        parent: usize,
        child: SurfaceHandle,
        child_index: usize,
    },
    Removed {
        parent: usize,
        parent_handle: SurfaceHandle,
        child: SurfaceHandle,
        child_index: usize,
        at: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn element(store: &mut SurfaceStore, tag: &str) -> SurfaceHandle {
        match store.create_handle(&NodeType::element(tag)) {
            Ok(handle) => handle,
            Err(err) => panic!("create {tag}: {err}"),
        }
    }

    #[test]
    fn insert_before_places_child_in_front_of_anchor() {
        let mut store = SurfaceStore::new();
        let root = store.create_container();
        let a = element(&mut store, "a");
        let b = element(&mut store, "b");
        assert_eq!(store.insert_child(root, b, None), Ok(()));
        assert_eq!(store.insert_child(root, a, Some(b)), Ok(()));
        assert_eq!(store.children(root), [a, b]);
        assert_eq!(store.parent(a), Some(root));
    }

    #[test]
    fn anchor_must_be_child_of_parent() {
        let mut store = SurfaceStore::new();
        let root = store.create_container();
        let a = element(&mut store, "a");
        let stray = element(&mut store, "b");
        assert_eq!(
            store.insert_child(root, a, Some(stray)),
            Err(SurfaceError::NotAChild {
                parent: root,
                child: stray
            })
        );
    }

    #[test]
    fn text_leaves_only_take_node_value() {
        let mut store = SurfaceStore::new();
        let leaf = match store.create_handle(&NodeType::Text) {
            Ok(handle) => handle,
            Err(err) => panic!("{err}"),
        };
        assert_eq!(store.set_property(leaf, NODE_VALUE_KEY, "hi"), Ok(()));
        assert_eq!(store.text(leaf), Some("hi"));
        assert_eq!(
            store.set_property(leaf, "id", "x"),
            Err(SurfaceError::WrongNodeKind(leaf))
        );
        let child = element(&mut store, "b");
        assert_eq!(
            store.insert_child(leaf, child, None),
            Err(SurfaceError::InvalidParent(leaf))
        );
    }

    #[test]
    fn reset_attribute_moves_to_end() {
        let mut store = SurfaceStore::new();
        let div = element(&mut store, "div");
        assert_eq!(store.set_property(div, "id", "a"), Ok(()));
        assert_eq!(store.set_property(div, "title", "t"), Ok(()));
        assert_eq!(store.set_property(div, "id", "b"), Ok(()));
        assert_eq!(store.attributes(div), [("id", "b"), ("title", "t")]);
        assert_eq!(store.clear_property(div, "id"), Ok(()));
        assert_eq!(store.set_property(div, "id", "c"), Ok(()));
        assert_eq!(store.attributes(div), [("title", "t"), ("id", "c")]);
        assert!(store.bound_events(div).is_empty());
    }

    #[test]
    fn remove_releases_whole_subtree() {
        let mut store = SurfaceStore::new();
        let root = store.create_container();
        let div = element(&mut store, "div");
        let span = element(&mut store, "span");
        assert_eq!(store.insert_child(root, div, None), Ok(()));
        assert_eq!(store.insert_child(div, span, None), Ok(()));
        assert_eq!(store.live_count(), 3);
        assert_eq!(store.remove_child(root, div), Ok(()));
        assert_eq!(store.live_count(), 1);
        assert!(!store.contains(span));
    }

    #[test]
    fn released_slots_are_reused_without_stale_payload() {
        let mut store = SurfaceStore::new();
        let root = store.create_container();
        for round in 0..8 {
            let div = element(&mut store, "div");
            let span = element(&mut store, "span");
            assert_eq!(store.set_property(div, "id", &format!("r{round}")), Ok(()));
            assert_eq!(store.insert_child(root, div, None), Ok(()));
            assert_eq!(store.insert_child(div, span, None), Ok(()));
            assert_eq!(store.remove_child(root, div), Ok(()));
        }
        assert_eq!(store.slot_count(), 3);
        assert_eq!(store.live_count(), 1);

        let fresh = element(&mut store, "p");
        assert_eq!(store.tag(fresh), Some("p"));
        assert!(store.attributes(fresh).is_empty());
        assert!(store.children(fresh).is_empty());
        assert_eq!(store.parent(fresh), None);
        assert_eq!(store.slot_count(), 3);
    }

    #[test]
    fn failed_batch_leaves_store_untouched() {
        let mut store = SurfaceStore::new();
        let root = store.create_container();
        let div = element(&mut store, "div");
        let old = element(&mut store, "p");
        assert_eq!(store.insert_child(root, div, None), Ok(()));
        assert_eq!(store.insert_child(div, old, None), Ok(()));
        assert_eq!(store.set_property(div, "id", "a"), Ok(()));
        assert_eq!(store.set_property(div, "title", "t"), Ok(()));
        let fresh = element(&mut store, "span");
        let before = store.snapshot_lines(root);

        let batch = vec![
            Mutation::RemoveChild {
                parent: div,
                child: old,
            },
            Mutation::ClearProperty {
                handle: div,
                name: Arc::from("id"),
            },
            Mutation::SetProperty {
                handle: div,
                name: Arc::from("title"),
                value: "u".to_string(),
            },
            Mutation::InsertChild {
                parent: div,
                child: fresh,
                before: None,
            },
            Mutation::InsertChild {
                parent: div,
                child: SurfaceHandle(999),
                before: None,
            },
        ];
        assert_eq!(
            store.apply(&batch),
            Err(SurfaceError::UnknownHandle(SurfaceHandle(999)))
        );
        assert_eq!(store.snapshot_lines(root), before);
        assert!(store.contains(old));
        assert_eq!(store.parent(fresh), None);
        assert_eq!(store.children(div), [old]);
    }

    #[test]
    fn dispatch_reaches_bound_listener_until_unbound() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let behavior = Behavior::new(move |event| {
            assert_eq!(event.value.as_deref(), Some("x"));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mut store = SurfaceStore::new();
        let input = element(&mut store, "input");
        assert_eq!(store.bind_behavior(input, "change", &behavior), Ok(()));
        assert_eq!(store.dispatch(input, "change", Some("x".to_string())), 1);
        assert_eq!(store.dispatch(input, "click", None), 0);
        assert_eq!(store.unbind_behavior(input, "change", &behavior), Ok(()));
        assert_eq!(store.dispatch(input, "change", Some("x".to_string())), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn snapshot_skips_container_line() {
        let mut store = SurfaceStore::new();
        let root = store.create_container();
        let a = element(&mut store, "a");
        let leaf = match store.create_handle(&NodeType::Text) {
            Ok(handle) => handle,
            Err(err) => panic!("{err}"),
        };
        assert_eq!(store.set_property(a, "href", "/x"), Ok(()));
        assert_eq!(store.set_property(leaf, NODE_VALUE_KEY, "go"), Ok(()));
        assert_eq!(store.insert_child(root, a, None), Ok(()));
        assert_eq!(store.insert_child(a, leaf, None), Ok(()));
        assert_eq!(
            store.snapshot_lines(root),
            vec!["<a href=\"/x\">".to_string(), "  \"go\"".to_string()]
        );
    }
}
