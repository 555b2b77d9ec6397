//! Property patching between two prop sets of the same node.

use crate::surface::Mutation;
use core_types::SurfaceHandle;
use std::sync::Arc;
use vdom::attrs::{resolve_attributes, resolve_behaviors};
use vdom::{Behavior, NodeType, Props};

/// Appends the mutations turning `prev` into `next` on `handle`.
///
/// Emission order per node: stale listeners are unbound, removed attributes
/// cleared, new or changed attributes set, then new or changed listeners
/// bound. Attributes and listeners equal on both sides produce nothing.
/// Returns the number of mutations appended.
pub fn diff_props(
    handle: SurfaceHandle,
    kind: &NodeType,
    prev: &Props,
    next: &Props,
    out: &mut Vec<Mutation>,
) -> usize {
    let start = out.len();
    if prev == next {
        return 0;
    }

    let prev_attrs = resolve_attributes(kind, prev);
    let next_attrs = resolve_attributes(kind, next);
    let (prev_behaviors, next_behaviors) = if kind.is_text() {
        (Vec::new(), Vec::new())
    } else {
        (resolve_behaviors(prev), resolve_behaviors(next))
    };

    for (event, behavior) in &prev_behaviors {
        if lookup_behavior(&next_behaviors, event) != Some(behavior) {
            out.push(Mutation::UnbindBehavior {
                handle,
                event: event.clone(),
                behavior: behavior.clone(),
            });
        }
    }

    for (name, _) in &prev_attrs {
        if lookup_attr(&next_attrs, name).is_none() {
            out.push(Mutation::ClearProperty {
                handle,
                name: name.clone(),
            });
        }
    }

    for (name, value) in &next_attrs {
        if lookup_attr(&prev_attrs, name) != Some(value.as_str()) {
            out.push(Mutation::SetProperty {
                handle,
                name: name.clone(),
                value: value.clone(),
            });
        }
    }

    for (event, behavior) in &next_behaviors {
        if lookup_behavior(&prev_behaviors, event) != Some(behavior) {
            out.push(Mutation::BindBehavior {
                handle,
                event: event.clone(),
                behavior: behavior.clone(),
            });
        }
    }

    let emitted = out.len() - start;
    if emitted != 0 {
        log::trace!(
            target: "reconcile.diff",
            "props {handle}: {emitted} mutation(s)"
        );
    }
    emitted
}

/// Mutations writing `props` onto a freshly created, detached handle.
pub fn initial_props(
    handle: SurfaceHandle,
    kind: &NodeType,
    props: &Props,
    out: &mut Vec<Mutation>,
) -> usize {
    diff_props(handle, kind, &Props::new(), props, out)
}

fn lookup_attr<'a>(attrs: &'a [(Arc<str>, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| &**k == name)
        .map(|(_, v)| v.as_str())
}

fn lookup_behavior<'a>(
    behaviors: &'a [(Arc<str>, Behavior)],
    event: &str,
) -> Option<&'a Behavior> {
    behaviors
        .iter()
        .find(|(k, _)| &**k == event)
        .map(|(_, b)| b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdom::{NODE_VALUE_KEY, PropValue, StyleMap};

    const H: SurfaceHandle = SurfaceHandle(7);

    fn names(batch: &[Mutation]) -> Vec<String> {
        batch
            .iter()
            .map(|m| match m {
                Mutation::SetProperty { name, value, .. } => format!("set {name}={value}"),
                Mutation::ClearProperty { name, .. } => format!("clear {name}"),
                Mutation::BindBehavior { event, .. } => format!("bind {event}"),
                Mutation::UnbindBehavior { event, .. } => format!("unbind {event}"),
                other => format!("{other:?}"),
            })
            .collect()
    }

    #[test]
    fn equal_props_emit_nothing() {
        let props = Props::new().with("id", "foo").with("hidden", true);
        let mut out = Vec::new();
        assert_eq!(diff_props(H, &NodeType::element("div"), &props, &props.clone(), &mut out), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn removed_attribute_is_cleared_alone() {
        let prev = Props::new().with("href", "https://example.com").with("id", "x");
        let next = Props::new().with("id", "x");
        let mut out = Vec::new();
        diff_props(H, &NodeType::element("a"), &prev, &next, &mut out);
        assert_eq!(names(&out), ["clear href"]);
    }

    #[test]
    fn ordering_is_unbind_clear_set_bind() {
        let old = Behavior::new(|_| {});
        let new = Behavior::new(|_| {});
        let prev = Props::new()
            .with("title", "t")
            .with("value", "a")
            .with("onChange", old);
        let next = Props::new().with("value", "b").with("onChange", new);
        let mut out = Vec::new();
        diff_props(H, &NodeType::element("input"), &prev, &next, &mut out);
        assert_eq!(
            names(&out),
            ["unbind change", "clear title", "set value=b", "bind change"]
        );
    }

    #[test]
    fn identical_behavior_is_left_bound() {
        let shared = Behavior::new(|_| {});
        let prev = Props::new().with("onClick", shared.clone()).with("id", "a");
        let next = Props::new().with("onClick", shared).with("id", "b");
        let mut out = Vec::new();
        diff_props(H, &NodeType::element("button"), &prev, &next, &mut out);
        assert_eq!(names(&out), ["set id=b"]);
    }

    #[test]
    fn colliding_event_keys_patch_without_rebinding() {
        let upper = Behavior::new(|_| {});
        let lower = Behavior::new(|_| {});
        let props = |id: &str| {
            Props::new()
                .with("id", id)
                .with("onChange", upper.clone())
                .with("onchange", lower.clone())
        };
        let mut out = Vec::new();
        diff_props(H, &NodeType::element("input"), &props("a"), &props("b"), &mut out);
        assert_eq!(names(&out), ["set id=b"]);

        let mut out = Vec::new();
        initial_props(H, &NodeType::element("input"), &props("a"), &mut out);
        assert_eq!(names(&out), ["set id=a", "bind change"]);
    }

    #[test]
    fn false_flag_clears_previous_true() {
        let prev = Props::new().with("disabled", true);
        let next = Props::new().with("disabled", false);
        let mut out = Vec::new();
        diff_props(H, &NodeType::element("button"), &prev, &next, &mut out);
        assert_eq!(names(&out), ["clear disabled"]);
    }

    #[test]
    fn style_change_rewrites_whole_attribute() {
        let prev = Props::new().with("style", StyleMap::new().with("color", "red"));
        let next = Props::new().with(
            "style",
            PropValue::Style(StyleMap::new().with("color", "red").with("marginRight", "1rem")),
        );
        let mut out = Vec::new();
        diff_props(H, &NodeType::element("p"), &prev, &next, &mut out);
        assert_eq!(names(&out), ["set style=color: red; margin-right: 1rem"]);
    }

    #[test]
    fn text_leaf_patches_node_value_only() {
        let prev = Props::new().with(NODE_VALUE_KEY, "a");
        let next = Props::new().with(NODE_VALUE_KEY, "b");
        let mut out = Vec::new();
        diff_props(H, &NodeType::Text, &prev, &next, &mut out);
        assert_eq!(names(&out), ["set nodeValue=b"]);
    }

    #[test]
    fn initial_props_set_everything() {
        let props = Props::new()
            .with("className", "logo")
            .with("onClick", Behavior::new(|_| {}));
        let mut out = Vec::new();
        assert_eq!(initial_props(H, &NodeType::element("img"), &props, &mut out), 2);
        assert_eq!(names(&out), ["set class=logo", "bind click"]);
    }
}
