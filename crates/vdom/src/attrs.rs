//! Mapping from descriptor props to surface attributes and listeners.
//!
//! Rules:
//! - `Behavior` values are listener bindings; everything else is an attribute.
//! - `style` maps serialize to `key: value; key: value` with kebab-case keys.
//! - `className` is written under `class`; when both are present `className`
//!   wins and the literal `class` key is skipped.
//! - Behavior keys naming the same event (`onChange`, `onchange`) bind once;
//!   the last one in prop order wins.
//! - `Bool(false)` and empty style maps mean "absent"; `Bool(true)` is `"true"`.
//! - Text leaves only expose `nodeValue`.

use crate::types::{Behavior, NODE_VALUE_KEY, NodeType, PropValue, Props, StyleMap};
use std::fmt::Write;
use std::sync::Arc;

pub const STYLE_KEY: &str = "style";
pub const CLASS_NAME_KEY: &str = "className";
pub const CLASS_ATTRIBUTE: &str = "class";
pub const BEHAVIOR_PREFIX: &str = "on";

/// Converts a camelCase name to kebab-case (`marginRight` -> `margin-right`).
pub fn to_kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

pub fn serialize_style(style: &StyleMap) -> String {
    let mut out = String::new();
    for (i, (key, value)) in style.iter().enumerate() {
        if i != 0 {
            out.push_str("; ");
        }
        let _ = write!(&mut out, "{}: {value}", to_kebab_case(key));
    }
    out
}

/// Surface event name for a behavior key (`onChange` -> `change`).
pub fn event_name(key: &str) -> String {
    let name = match key.strip_prefix(BEHAVIOR_PREFIX) {
        Some(rest) if !rest.is_empty() => rest,
        _ => key,
    };
    name.to_ascii_lowercase()
}

fn attribute_value(value: &PropValue) -> Option<String> {
    match value {
        PropValue::Text(text) => Some(text.to_string()),
        PropValue::Number(n) => Some(n.to_string()),
        PropValue::Bool(true) => Some("true".to_string()),
        PropValue::Bool(false) => None,
        PropValue::Style(style) if style.is_empty() => None,
        PropValue::Style(style) => Some(serialize_style(style)),
        PropValue::Behavior(_) => None,
    }
}

/// Effective surface attributes of `props`, in prop order.
pub fn resolve_attributes(kind: &NodeType, props: &Props) -> Vec<(Arc<str>, String)> {
    if kind.is_text() {
        return props
            .get(NODE_VALUE_KEY)
            .and_then(attribute_value)
            .map(|value| vec![(Arc::from(NODE_VALUE_KEY), value)])
            .unwrap_or_default();
    }
    let has_class_name = props.contains_key(CLASS_NAME_KEY);
    let mut out = Vec::with_capacity(props.len());
    for (key, value) in props.iter() {
        if key == CLASS_ATTRIBUTE && has_class_name {
            continue;
        }
        let Some(value) = attribute_value(value) else {
            continue;
        };
        let name = if key == CLASS_NAME_KEY {
            CLASS_ATTRIBUTE
        } else {
            key
        };
        out.push((Arc::from(name), value));
    }
    out
}

/// Listener bindings of `props` as `(event name, behavior)`, one per event,
/// in order of each event's first key.
pub fn resolve_behaviors(props: &Props) -> Vec<(Arc<str>, Behavior)> {
    let mut out: Vec<(Arc<str>, Behavior)> = Vec::new();
    for (key, value) in props.iter() {
        let PropValue::Behavior(behavior) = value else {
            continue;
        };
        let event = event_name(key);
        match out.iter_mut().find(|(name, _)| **name == *event) {
            Some((_, bound)) => *bound = behavior.clone(),
            None => out.push((Arc::from(event), behavior.clone())),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Behavior, StyleMap};

    #[test]
    fn style_serializes_with_kebab_keys_and_no_trailing_separator() {
        let style = StyleMap::new().with("marginRight", "1rem").with("color", "red");
        assert_eq!(serialize_style(&style), "margin-right: 1rem; color: red");
    }

    #[test]
    fn style_numbers_use_shortest_form() {
        let style = StyleMap::new().with("zIndex", 3).with("opacity", 0.5);
        assert_eq!(serialize_style(&style), "z-index: 3; opacity: 0.5");
    }

    #[test]
    fn class_name_translates_and_wins() {
        let props = Props::new().with("class", "plain").with(CLASS_NAME_KEY, "logo");
        let attrs = resolve_attributes(&NodeType::element("a"), &props);
        assert_eq!(attrs, vec![(Arc::from("class"), "logo".to_string())]);
    }

    #[test]
    fn behaviors_are_not_attributes() {
        let props = Props::new()
            .with("value", "test")
            .with("onChange", Behavior::new(|_| {}))
            .with("hidden", false);
        let kind = NodeType::element("input");
        assert_eq!(
            resolve_attributes(&kind, &props),
            vec![(Arc::from("value"), "test".to_string())]
        );
        let behaviors = resolve_behaviors(&props);
        assert_eq!(behaviors.len(), 1);
        assert_eq!(&*behaviors[0].0, "change");
    }

    #[test]
    fn text_leaves_only_expose_node_value() {
        let props = Props::new().with(NODE_VALUE_KEY, "bar").with("id", "x");
        assert_eq!(
            resolve_attributes(&NodeType::Text, &props),
            vec![(Arc::from(NODE_VALUE_KEY), "bar".to_string())]
        );
    }

    #[test]
    fn colliding_event_keys_bind_once() {
        let first = Behavior::new(|_| {});
        let last = Behavior::new(|_| {});
        let props = Props::new()
            .with("onChange", first)
            .with("onClick", Behavior::new(|_| {}))
            .with("onchange", last.clone());
        let behaviors = resolve_behaviors(&props);
        let events: Vec<&str> = behaviors.iter().map(|(e, _)| &**e).collect();
        assert_eq!(events, ["change", "click"]);
        assert_eq!(behaviors[0].1, last);
    }

    #[test]
    fn event_names_strip_marker() {
        assert_eq!(event_name("onChange"), "change");
        assert_eq!(event_name("onclick"), "click");
        assert_eq!(event_name("on"), "on");
    }
}
