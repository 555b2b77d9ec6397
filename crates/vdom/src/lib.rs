//! Declarative node descriptors.
//!
//! A [`Descriptor`] is an immutable, cheaply clonable description of one tree
//! position: a [`NodeType`], its [`Props`] and its ordered children. Props are
//! a tagged variant ([`PropValue`]) so attribute, style and listener handling
//! is decided by type, not by sniffing key names.

pub mod attrs;
pub mod builder;
pub mod debug;
pub mod traverse;

mod types;

pub use crate::builder::{Child, ElementBuilder, build, element, text};
pub use crate::types::{
    Behavior, CHILDREN_KEY, Descriptor, Listener, NODE_VALUE_KEY, NodeType, PropValue, Props,
    StyleMap, StyleValue, SurfaceEvent, TEXT_TAG,
};
