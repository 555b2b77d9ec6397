use core_types::SurfaceHandle;
use surface::SurfaceStore;
use vdom::Descriptor;

pub use vdom::debug::escape_text;

pub mod fixtures;
pub mod random;
pub mod tree_text;

pub use crate::tree_text::{BehaviorRegistry, parse_tree};

pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    let max = expected.len().max(actual.len());
    let mut out = String::new();
    use std::fmt::Write;
    let mut mismatch = None;
    let missing = "<missing>";
    for i in 0..max {
        let left = expected.get(i).map(String::as_str).unwrap_or(missing);
        let right = actual.get(i).map(String::as_str).unwrap_or(missing);
        if left != right {
            mismatch = Some(i);
            break;
        }
    }
    if let Some(i) = mismatch {
        let start = i.saturating_sub(2);
        let end = (i + 3).min(max);
        let _ = writeln!(
            &mut out,
            "first mismatch at line {} (showing {}..={}):",
            i + 1,
            start + 1,
            end
        );
        for line_idx in start..end {
            let left = expected
                .get(line_idx)
                .map(String::as_str)
                .unwrap_or(missing);
            let right = actual.get(line_idx).map(String::as_str).unwrap_or(missing);
            let marker = if line_idx == i { ">" } else { " " };
            let _ = writeln!(&mut out, "{marker} {:>4}  expected: {left}", line_idx + 1);
            let _ = writeln!(&mut out, "{marker} {:>4}    actual: {right}", line_idx + 1);
        }
    }
    let _ = writeln!(
        &mut out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}

pub fn assert_lines_eq(label: &str, expected: &[String], actual: &[String]) {
    if expected != actual {
        panic!("{label}: line mismatch\n{}", diff_lines(expected, actual));
    }
}

/// Asserts the children of `container` render exactly as `expected` would.
pub fn assert_surface_matches(
    store: &SurfaceStore,
    container: SurfaceHandle,
    expected: &Descriptor,
    label: &str,
) {
    let expected = vdom::debug::snapshot_lines(expected);
    let actual = store.snapshot_lines(container);
    assert_lines_eq(label, &expected, &actual);
}

/// Like [`assert_surface_matches`] but ignores attribute and listener order,
/// which the store keeps in first-set order rather than prop order.
pub fn assert_surface_equivalent(
    store: &SurfaceStore,
    container: SurfaceHandle,
    expected: &Descriptor,
    label: &str,
) {
    let mut expected_lines = Vec::new();
    canonical_descriptor(expected, 0, &mut expected_lines);
    let mut actual_lines = Vec::new();
    for child in store.children(container) {
        canonical_store(store, *child, 0, &mut actual_lines);
    }
    assert_lines_eq(label, &expected_lines, &actual_lines);
}

fn canonical_line(
    depth: usize,
    tag: &str,
    mut attributes: Vec<(&str, &str)>,
    mut events: Vec<&str>,
) -> String {
    attributes.sort_unstable();
    events.sort_unstable();
    format!(
        "{}{}",
        "  ".repeat(depth),
        vdom::debug::element_line(tag, attributes, events)
    )
}

fn canonical_descriptor(node: &Descriptor, depth: usize, out: &mut Vec<String>) {
    if let Some(text) = node.text_value() {
        out.push(format!("{}{}", "  ".repeat(depth), vdom::debug::text_line(text)));
        return;
    }
    let attributes = vdom::attrs::resolve_attributes(node.kind(), node.props());
    let behaviors = vdom::attrs::resolve_behaviors(node.props());
    out.push(canonical_line(
        depth,
        node.kind().tag(),
        attributes.iter().map(|(k, v)| (&**k, v.as_str())).collect(),
        behaviors.iter().map(|(e, _)| &**e).collect(),
    ));
    for child in node.children() {
        canonical_descriptor(child, depth + 1, out);
    }
}

fn canonical_store(
    store: &SurfaceStore,
    handle: SurfaceHandle,
    depth: usize,
    out: &mut Vec<String>,
) {
    if let Some(text) = store.text(handle) {
        out.push(format!("{}{}", "  ".repeat(depth), vdom::debug::text_line(text)));
        return;
    }
    let tag = store.tag(handle).unwrap_or("<released>");
    out.push(canonical_line(
        depth,
        tag,
        store.attributes(handle),
        store.bound_events(handle),
    ));
    for child in store.children(handle) {
        canonical_store(store, *child, depth + 1, out);
    }
}
