use core_types::SurfaceHandle;
use std::fmt;
use std::sync::Arc;

/// Tag rendered for text leaves.
pub const TEXT_TAG: &str = "TEXT";
/// Prop key carrying the content of a text leaf.
pub const NODE_VALUE_KEY: &str = "nodeValue";
/// Reserved key; children live in [`Descriptor::children`] and never in props.
pub const CHILDREN_KEY: &str = "children";

#[derive(Clone, PartialEq, Eq, Hash)]
pub enum NodeType {
    Text,
    Element(Arc<str>),
}

impl NodeType {
    pub fn element(name: impl Into<Arc<str>>) -> Self {
        NodeType::Element(name.into())
    }

    /// Kind named by a tag string; [`TEXT_TAG`] names a text leaf.
    pub fn from_tag(tag: &str) -> Self {
        if tag == TEXT_TAG {
            NodeType::Text
        } else {
            NodeType::element(tag)
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, NodeType::Text)
    }

    pub fn tag(&self) -> &str {
        match self {
            NodeType::Text => TEXT_TAG,
            NodeType::Element(name) => name,
        }
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Event delivered by a surface to a bound [`Behavior`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceEvent {
    pub target: SurfaceHandle,
    pub name: Arc<str>,
    pub value: Option<String>,
}

pub type Listener = dyn Fn(&SurfaceEvent) + Send + Sync;

/// A listener binding.
///
/// Two behaviors are equal only when they share the same allocation, so a
/// closure rebuilt on every render is always treated as a new binding.
#[derive(Clone)]
pub struct Behavior(Arc<Listener>);

impl Behavior {
    pub fn new(f: impl Fn(&SurfaceEvent) + Send + Sync + 'static) -> Self {
        Behavior(Arc::new(f))
    }

    pub fn invoke(&self, event: &SurfaceEvent) {
        (self.0)(event)
    }

    /// Address of the shared listener, stable for the lifetime of the binding.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for Behavior {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl Eq for Behavior {}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Behavior({:#x})", self.addr())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StyleValue {
    Text(Arc<str>),
    Number(f64),
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Text(text) => f.write_str(text),
            StyleValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        StyleValue::Text(Arc::from(value))
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        StyleValue::Text(Arc::from(value))
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        StyleValue::Number(value)
    }
}

impl From<i32> for StyleValue {
    fn from(value: i32) -> Self {
        StyleValue::Number(f64::from(value))
    }
}

/// Inline style declarations in insertion order, keyed by camelCase names.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleMap {
    entries: Vec<(Arc<str>, StyleValue)>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<Arc<str>>, value: impl Into<StyleValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets `key`, keeping the original position when it already exists.
    pub fn set(&mut self, key: impl Into<Arc<str>>, value: impl Into<StyleValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&StyleValue> {
        self.entries
            .iter()
            .find(|(k, _)| &**k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.entries.iter().map(|(k, v)| (&**k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Text(Arc<str>),
    Number(f64),
    Bool(bool),
    Style(StyleMap),
    Behavior(Behavior),
}

impl PropValue {
    pub fn is_behavior(&self) -> bool {
        matches!(self, PropValue::Behavior(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(Arc::from(value))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(Arc::from(value))
    }
}

impl From<Arc<str>> for PropValue {
    fn from(value: Arc<str>) -> Self {
        PropValue::Text(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(f64::from(value))
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<StyleMap> for PropValue {
    fn from(value: StyleMap) -> Self {
        PropValue::Style(value)
    }
}

impl From<Behavior> for PropValue {
    fn from(value: Behavior) -> Self {
        PropValue::Behavior(value)
    }
}

/// Attribute and behavior bindings of one descriptor, in insertion order.
///
/// Keys are unique; setting an existing key replaces its value in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    entries: Vec<(Arc<str>, PropValue)>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<Arc<str>>, value: impl Into<PropValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<Arc<str>>, value: impl Into<PropValue>) {
        let key = key.into();
        if &*key == CHILDREN_KEY {
            log::warn!(target: "vdom", "ignoring reserved prop key {CHILDREN_KEY:?}");
            return;
        }
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        let pos = self.entries.iter().position(|(k, _)| &**k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.entries
            .iter()
            .find(|(k, _)| &**k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(k, v)| (&**k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct DescriptorData {
    kind: NodeType,
    props: Props,
    children: Arc<[Descriptor]>,
}

/// Immutable description of one tree position.
///
/// Cloning is a reference-count bump; the tree is shared, never copied.
#[derive(Clone)]
pub struct Descriptor(Arc<DescriptorData>);

impl Descriptor {
    pub fn new(kind: NodeType, props: Props, children: Vec<Descriptor>) -> Self {
        Descriptor(Arc::new(DescriptorData {
            kind,
            props,
            children: Arc::from(children),
        }))
    }

    /// Text leaf carrying `value` under [`NODE_VALUE_KEY`].
    pub fn text(value: impl Into<Arc<str>>) -> Self {
        let props = Props::new().with(NODE_VALUE_KEY, PropValue::Text(value.into()));
        Descriptor::new(NodeType::Text, props, Vec::new())
    }

    pub fn kind(&self) -> &NodeType {
        &self.0.kind
    }

    pub fn props(&self) -> &Props {
        &self.0.props
    }

    pub fn children(&self) -> &[Descriptor] {
        &self.0.children
    }

    /// Shared handle to the child sequence, for holders that outlive `self`.
    pub fn shared_children(&self) -> Arc<[Descriptor]> {
        Arc::clone(&self.0.children)
    }

    pub fn text_value(&self) -> Option<&str> {
        if !self.0.kind.is_text() {
            return None;
        }
        self.0.props.get(NODE_VALUE_KEY).and_then(PropValue::as_text)
    }

    pub fn ptr_eq(a: &Descriptor, b: &Descriptor) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        Descriptor::ptr_eq(self, other)
            || (self.0.kind == other.0.kind
                && self.0.props == other.0.props
                && self.0.children == other.0.children)
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.text_value() {
            return write!(f, "{text:?}");
        }
        let mut s = f.debug_struct("Descriptor");
        s.field("type", &self.0.kind);
        if !self.0.props.is_empty() {
            s.field("props", &self.0.props);
        }
        if !self.0.children.is_empty() {
            s.field("children", &self.0.children);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn props_keep_insertion_order_and_replace_in_place() {
        let mut props = Props::new().with("id", "a").with("title", "t");
        props.set("id", "b");
        let keys: Vec<_> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["id", "title"]);
        assert_eq!(props.get("id"), Some(&PropValue::from("b")));
    }

    #[test]
    fn children_key_is_never_stored() {
        let props = Props::new().with(CHILDREN_KEY, "x");
        assert!(props.is_empty());
    }

    #[test]
    fn behavior_equality_is_identity() {
        let a = Behavior::new(|_| {});
        let b = Behavior::new(|_| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn text_descriptor_exposes_value() {
        let leaf = Descriptor::text("bar");
        assert!(leaf.kind().is_text());
        assert_eq!(leaf.text_value(), Some("bar"));
        assert!(leaf.children().is_empty());
    }

    #[test]
    fn structural_equality_ignores_allocation() {
        let a = Descriptor::new(NodeType::element("p"), Props::new(), vec![Descriptor::text("x")]);
        let b = Descriptor::new(NodeType::element("p"), Props::new(), vec![Descriptor::text("x")]);
        assert_eq!(a, b);
        assert!(!Descriptor::ptr_eq(&a, &b));
    }
}
