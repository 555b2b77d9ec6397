//! Indented text notation for descriptor trees used by fixture files.
//!
//! ```text
//! div id=foo className="a b" hidden style.marginRight=4px @onChange=typed
//!   a href=https://example.com
//!     "bar"
//! ```
//!
//! Two spaces per level. A line starting with `"` is a text leaf. On element
//! lines the first token is the tag; `key=value` sets an attribute (bare
//! `true`/`false` become booleans), a lone `key` is `true`, `style.k=v` adds a
//! style entry and `@onKey=name` binds the named behavior from a
//! [`BehaviorRegistry`]. Values may be double-quoted with `\"`, `\\` and `\n`
//! escapes.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use vdom::attrs::STYLE_KEY;
use vdom::{Behavior, Descriptor, NODE_VALUE_KEY, NodeType, PropValue, Props, StyleMap};

const INDENT: usize = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeTextError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for TreeTextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for TreeTextError {}

fn error(line: usize, message: impl Into<String>) -> TreeTextError {
    TreeTextError {
        line,
        message: message.into(),
    }
}

/// Named behaviors that stay identical across parses, so re-rendering the
/// same name keeps the listener bound. Every invocation is recorded.
#[derive(Clone, Default)]
pub struct BehaviorRegistry {
    named: Arc<Mutex<HashMap<String, Behavior>>>,
    fired: Arc<Mutex<Vec<String>>>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Behavior {
        let mut named = self.named.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = named.get(name) {
            return existing.clone();
        }
        let fired = Arc::clone(&self.fired);
        let label = name.to_string();
        let behavior = Behavior::new(move |_| {
            fired
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(label.clone());
        });
        named.insert(name.to_string(), behavior.clone());
        behavior
    }

    /// Names of behaviors invoked since the last call, in order.
    pub fn take_fired(&self) -> Vec<String> {
        std::mem::take(&mut *self.fired.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

struct Open {
    depth: usize,
    line: usize,
    kind: NodeType,
    props: Props,
    children: Vec<Descriptor>,
}

impl Open {
    fn finish(self) -> Descriptor {
        Descriptor::new(self.kind, self.props, self.children)
    }
}

/// Parses a single-rooted tree. Blank lines are ignored.
pub fn parse_tree(source: &str, behaviors: &BehaviorRegistry) -> Result<Descriptor, TreeTextError> {
    let mut stack: Vec<Open> = Vec::new();
    let mut roots: Vec<Descriptor> = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let body = raw.trim_start_matches(' ');
        let indent = raw.len() - body.len();
        if body.starts_with('\t') {
            return Err(error(line_no, "tabs are not allowed in indentation"));
        }
        if indent % INDENT != 0 {
            return Err(error(line_no, format!("odd indentation of {indent} spaces")));
        }
        let depth = indent / INDENT;
        let expected_max = stack.last().map_or(0, |open| open.depth + 1);
        if depth > expected_max {
            return Err(error(
                line_no,
                format!("indented {depth} levels, at most {expected_max} allowed"),
            ));
        }
        close_to(&mut stack, &mut roots, depth);
        if let Some(parent) = stack.last()
            && parent.kind.is_text()
        {
            return Err(error(
                line_no,
                format!("text leaf opened on line {} cannot have children", parent.line),
            ));
        }
        let (kind, props) = parse_line(body.trim_end(), line_no, behaviors)?;
        stack.push(Open {
            depth,
            line: line_no,
            kind,
            props,
            children: Vec::new(),
        });
    }
    close_to(&mut stack, &mut roots, 0);

    match roots.len() {
        1 => Ok(roots.remove(0)),
        0 => Err(error(0, "empty tree")),
        n => Err(error(0, format!("expected one root, found {n}"))),
    }
}

fn close_to(stack: &mut Vec<Open>, roots: &mut Vec<Descriptor>, depth: usize) {
    while stack.last().is_some_and(|open| open.depth >= depth) {
        let Some(open) = stack.pop() else {
            break;
        };
        let node = open.finish();
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}

fn parse_line(
    body: &str,
    line_no: usize,
    behaviors: &BehaviorRegistry,
) -> Result<(NodeType, Props), TreeTextError> {
    if body.starts_with('"') {
        let tokens = tokenize(body, line_no)?;
        if tokens.len() != 1 {
            return Err(error(line_no, "text leaf must be a single quoted string"));
        }
        let props =
            Props::new().with(NODE_VALUE_KEY, PropValue::Text(Arc::from(tokens[0].as_str())));
        return Ok((NodeType::Text, props));
    }

    let mut tokens = tokenize(body, line_no)?.into_iter();
    let Some(tag) = tokens.next() else {
        return Err(error(line_no, "missing tag"));
    };
    if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(error(line_no, format!("invalid tag {tag:?}")));
    }

    let mut props = Props::new();
    let mut style = StyleMap::new();
    for token in tokens {
        let (key, value) = match token.split_once('=') {
            Some((key, value)) => (key, Some(value)),
            None => (token.as_str(), None),
        };
        if key.is_empty() {
            return Err(error(line_no, format!("missing key in {token:?}")));
        }
        if let Some(event_key) = key.strip_prefix('@') {
            let Some(name) = value.filter(|v| !v.is_empty()) else {
                return Err(error(line_no, format!("behavior {event_key:?} needs a name")));
            };
            props.set(event_key, behaviors.get(name));
        } else if let Some(style_key) = key.strip_prefix("style.") {
            style.set(style_key, value.unwrap_or_default());
            props.set(STYLE_KEY, style.clone());
        } else {
            let value = match value {
                None | Some("true") => PropValue::Bool(true),
                Some("false") => PropValue::Bool(false),
                Some(text) => PropValue::from(text),
            };
            props.set(key, value);
        }
    }
    Ok((NodeType::from_tag(&tag), props))
}

/// Splits on unquoted whitespace, unescaping quoted sections in place.
fn tokenize(body: &str, line_no: usize) -> Result<Vec<String>, TreeTextError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => current.push('\n'),
                            Some('t') => current.push('\t'),
                            Some(other @ ('"' | '\\')) => current.push(other),
                            Some(other) => {
                                return Err(error(line_no, format!("unknown escape \\{other}")));
                            }
                            None => return Err(error(line_no, "dangling escape")),
                        },
                        Some(other) => current.push(other),
                        None => return Err(error(line_no, "unterminated quote")),
                    }
                }
            }
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                in_token = true;
                current.push(c);
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdom::element;

    #[test]
    fn parses_nested_tree_with_all_prop_forms() {
        let behaviors = BehaviorRegistry::new();
        let source = "\
div id=foo className=\"a b\" hidden style.marginRight=4px @onChange=typed
  a href=https://example.com
    \"bar \\\"baz\\\"\"
  input value=test disabled=false
";
        let tree = match parse_tree(source, &behaviors) {
            Ok(tree) => tree,
            Err(err) => panic!("{err}"),
        };
        let expected = element("div")
            .attr("id", "foo")
            .attr("className", "a b")
            .attr("hidden", true)
            .style("marginRight", "4px")
            .behavior("onChange", behaviors.get("typed"))
            .child(element("a").attr("href", "https://example.com").text("bar \"baz\""))
            .child(element("input").attr("value", "test").attr("disabled", false))
            .build();
        assert_eq!(tree, expected);
    }

    #[test]
    fn same_name_yields_same_behavior() {
        let behaviors = BehaviorRegistry::new();
        assert_eq!(behaviors.get("x"), behaviors.get("x"));
        assert_ne!(behaviors.get("x"), behaviors.get("y"));
        behaviors.get("y").invoke(&vdom::SurfaceEvent {
            target: core_types::SurfaceHandle(3),
            name: Arc::from("click"),
            value: None,
        });
        assert_eq!(behaviors.take_fired(), ["y"]);
        assert!(behaviors.take_fired().is_empty());
    }

    #[test]
    fn rejects_malformed_input() {
        let behaviors = BehaviorRegistry::new();
        let cases = [
            ("div\n    p", 2),
            ("div\n   p", 2),
            ("\"leaf\"\n  p", 2),
            ("div\np", 0),
            ("div title=\"open", 1),
            ("div @onClick", 1),
        ];
        for (source, line) in cases {
            match parse_tree(source, &behaviors) {
                Ok(tree) => panic!("accepted {source:?} as {tree:?}"),
                Err(err) => assert_eq!(err.line, line, "{source:?}: {err}"),
            }
        }
    }
}
