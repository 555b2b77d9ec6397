//! Descriptor construction helpers.
//!
//! `build(tag, props, children)` mirrors the classic `createElement` shape;
//! [`ElementBuilder`] is the chained form used by most call sites. Bare string
//! children are wrapped into text leaves in both.

use crate::attrs::{CLASS_NAME_KEY, STYLE_KEY};
use crate::types::{Behavior, Descriptor, NodeType, PropValue, Props, StyleMap, StyleValue};
use std::sync::Arc;

/// A child position: either a descriptor or bare text.
#[derive(Clone, Debug)]
pub enum Child {
    Node(Descriptor),
    Text(Arc<str>),
}

impl Child {
    pub fn into_descriptor(self) -> Descriptor {
        match self {
            Child::Node(node) => node,
            Child::Text(text) => Descriptor::text(text),
        }
    }
}

impl From<Descriptor> for Child {
    fn from(value: Descriptor) -> Self {
        Child::Node(value)
    }
}

impl From<ElementBuilder> for Child {
    fn from(value: ElementBuilder) -> Self {
        Child::Node(value.build())
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Text(Arc::from(value))
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Text(Arc::from(value))
    }
}

/// `tag` may be [`crate::TEXT_TAG`], which builds a text leaf.
pub fn build<I>(tag: &str, props: Option<Props>, children: I) -> Descriptor
where
    I: IntoIterator,
    I::Item: Into<Child>,
{
    let children = children
        .into_iter()
        .map(|child| child.into().into_descriptor())
        .collect();
    Descriptor::new(NodeType::from_tag(tag), props.unwrap_or_default(), children)
}

pub fn element(tag: impl Into<Arc<str>>) -> ElementBuilder {
    ElementBuilder {
        kind: NodeType::Element(tag.into()),
        props: Props::new(),
        children: Vec::new(),
    }
}

pub fn text(value: impl Into<Arc<str>>) -> Descriptor {
    Descriptor::text(value)
}

#[derive(Clone, Debug)]
pub struct ElementBuilder {
    kind: NodeType,
    props: Props,
    children: Vec<Descriptor>,
}

impl ElementBuilder {
    pub fn attr(mut self, key: impl Into<Arc<str>>, value: impl Into<PropValue>) -> Self {
        self.props.set(key, value);
        self
    }

    pub fn props(mut self, props: Props) -> Self {
        for (key, value) in props.iter() {
            self.props.set(key, value.clone());
        }
        self
    }

    pub fn class(self, value: impl Into<Arc<str>>) -> Self {
        self.attr(CLASS_NAME_KEY, PropValue::Text(value.into()))
    }

    /// Adds one declaration to the `style` map, creating it on first use.
    pub fn style(mut self, key: impl Into<Arc<str>>, value: impl Into<StyleValue>) -> Self {
        let mut style = match self.props.remove(STYLE_KEY) {
            Some(PropValue::Style(style)) => style,
            _ => StyleMap::new(),
        };
        style.set(key, value);
        self.props.set(STYLE_KEY, style);
        self
    }

    /// Binds a listener under a behavior key such as `onChange`.
    pub fn on(
        self,
        key: impl Into<Arc<str>>,
        f: impl Fn(&crate::SurfaceEvent) + Send + Sync + 'static,
    ) -> Self {
        self.attr(key, Behavior::new(f))
    }

    pub fn behavior(self, key: impl Into<Arc<str>>, behavior: Behavior) -> Self {
        self.attr(key, behavior)
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into().into_descriptor());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Child>,
    {
        self.children
            .extend(children.into_iter().map(|c| c.into().into_descriptor()));
        self
    }

    pub fn text(self, value: impl Into<Arc<str>>) -> Self {
        self.child(Child::Text(value.into()))
    }

    pub fn build(self) -> Descriptor {
        Descriptor::new(self.kind, self.props, self.children)
    }
}
