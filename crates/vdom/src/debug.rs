use crate::attrs::{resolve_attributes, resolve_behaviors};
use crate::types::Descriptor;
use std::fmt::Write;

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch < ' ' => {
                let _ = write!(&mut out, "\\u{{{:02X}}}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// One-line rendering of an element: `<tag name="value" @event>`.
pub fn element_line<'a>(
    tag: &str,
    attributes: impl IntoIterator<Item = (&'a str, &'a str)>,
    events: impl IntoIterator<Item = &'a str>,
) -> String {
    let mut line = String::with_capacity(tag.len() + 16);
    line.push('<');
    line.push_str(tag);
    for (name, value) in attributes {
        let _ = write!(&mut line, " {name}=\"{}\"", escape_text(value));
    }
    for event in events {
        let _ = write!(&mut line, " @{event}");
    }
    line.push('>');
    line
}

pub fn text_line(text: &str) -> String {
    format!("\"{}\"", escape_text(text))
}

/// Exact line rendering of a descriptor tree, two spaces per level.
///
/// Uses the same attribute resolution the reconciler applies, so the output
/// is directly comparable with a committed surface snapshot.
pub fn snapshot_lines(root: &Descriptor) -> Vec<String> {
    fn walk(node: &Descriptor, depth: usize, out: &mut Vec<String>) {
        let mut line = "  ".repeat(depth);
        if let Some(text) = node.text_value() {
            line.push_str(&text_line(text));
            out.push(line);
            return;
        }
        let attrs = resolve_attributes(node.kind(), node.props());
        let behaviors = resolve_behaviors(node.props());
        line.push_str(&element_line(
            node.kind().tag(),
            attrs.iter().map(|(k, v)| (&**k, v.as_str())),
            behaviors.iter().map(|(event, _)| &**event),
        ));
        out.push(line);
        for child in node.children() {
            walk(child, depth + 1, out);
        }
    }

    let mut out = Vec::new();
    walk(root, 0, &mut out);
    out
}

/// Capped, human-oriented outline for logs; long text is truncated.
pub fn outline(root: &Descriptor, cap: usize) -> Vec<String> {
    struct IndentGuard<'a> {
        indent: &'a mut String,
        step: usize,
    }

    impl Drop for IndentGuard<'_> {
        fn drop(&mut self) {
            let new_len = self.indent.len() - self.step;
            self.indent.truncate(new_len);
        }
    }

    fn push_preview(out: &mut String, s: &str, max_chars: usize) {
        let mut truncated = false;
        for (i, ch) in s.chars().enumerate() {
            if i == max_chars {
                truncated = true;
                break;
            }
            out.push(if ch == '\n' { ' ' } else { ch });
        }
        if truncated {
            out.push('…');
        }
    }

    const INDENT_STEP: &str = "  ";
    const PREVIEW_CHARS: usize = 40;

    fn walk(node: &Descriptor, indent: &mut String, out: &mut Vec<String>, left: &mut usize) {
        if *left == 0 {
            return;
        }
        *left -= 1;
        let mut line = String::with_capacity(indent.len() + 64);
        line.push_str(indent);
        if let Some(text) = node.text_value() {
            line.push('"');
            push_preview(&mut line, text.trim(), PREVIEW_CHARS);
            line.push('"');
            out.push(line);
            return;
        }
        let attrs = resolve_attributes(node.kind(), node.props());
        let behaviors = resolve_behaviors(node.props());
        line.push_str(&element_line(
            node.kind().tag(),
            attrs.iter().map(|(k, v)| (&**k, v.as_str())),
            behaviors.iter().map(|(event, _)| &**event),
        ));
        out.push(line);
        indent.push_str(INDENT_STEP);
        let mut guard = IndentGuard {
            indent,
            step: INDENT_STEP.len(),
        };
        for child in node.children() {
            walk(child, &mut *guard.indent, out, left);
        }
    }

    let mut out = Vec::new();
    let mut indent = String::new();
    let mut left = cap;
    walk(root, &mut indent, &mut out, &mut left);
    out
}
