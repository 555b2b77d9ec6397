#![no_main]

use libfuzzer_sys::fuzz_target;
use reconciler::{Reconciler, UnitBudget, WorkStatus};
use surface::SurfaceStore;
use vdom::{Behavior, Descriptor, ElementBuilder, element, text};

const TAGS: &[&str] = &["div", "p", "span", "li"];
const KEYS: &[&str] = &["id", "title", "className", "hidden"];
const MAX_NODES: usize = 64;

struct Bytes<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Bytes<'_> {
    fn next(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }
}

fn decode_element(
    bytes: &mut Bytes<'_>,
    depth: usize,
    budget: &mut usize,
    click: &Behavior,
) -> ElementBuilder {
    let head = bytes.next().unwrap_or(0);
    let mut node = element(TAGS[usize::from(head) % TAGS.len()]);
    *budget = budget.saturating_sub(1);
    if head & 0x10 != 0 {
        let value = bytes.next().unwrap_or(0);
        node = node.attr(KEYS[usize::from(value) % KEYS.len()], format!("{}", value >> 2));
    }
    if head & 0x20 != 0 {
        node = node.behavior("onClick", click.clone());
    }
    let children = if depth >= 4 { 0 } else { usize::from(head >> 6) + 1 };
    for _ in 0..children {
        if *budget == 0 {
            break;
        }
        let kind = bytes.next().unwrap_or(0);
        node = if kind & 1 == 0 {
            *budget = budget.saturating_sub(1);
            node.child(text(format!("t{}", kind >> 1)))
        } else {
            node.child(decode_element(bytes, depth + 1, budget, click))
        };
    }
    node
}

fn decode_tree(bytes: &mut Bytes<'_>, click: &Behavior) -> Descriptor {
    let mut budget = MAX_NODES;
    decode_element(bytes, 0, &mut budget, click).build()
}

/// Indentation and text are order-independent; attribute order on a line is not.
fn shape(lines: &[String]) -> Vec<(usize, Option<&str>)> {
    lines
        .iter()
        .map(|line| {
            let body = line.trim_start();
            let text = body.starts_with('"').then_some(body);
            (line.len() - body.len(), text)
        })
        .collect()
}

fuzz_target!(|data: &[u8]| {
    let mut bytes = Bytes { data, pos: 0 };
    let click = Behavior::new(|_| {});
    let mut store = SurfaceStore::new();
    let container = store.create_container();
    let mut reconciler = Reconciler::new(store);
    let mut last = None;

    while bytes.pos < data.len() {
        let mode = bytes.next().unwrap_or(0);
        let units = usize::from(mode >> 1) + 1;
        let tree = decode_tree(&mut bytes, &click);
        reconciler.schedule_render(tree.clone(), container);
        last = Some(tree);
        if mode & 1 == 1 {
            // left partially done; the next schedule abandons it
            if let Err(err) = reconciler.resume(&mut UnitBudget::new(units)) {
                panic!("store rejected reconciler output: {err}");
            }
            continue;
        }
        loop {
            match reconciler.resume(&mut UnitBudget::new(units)) {
                Ok(WorkStatus::Suspended { .. }) => continue,
                Ok(WorkStatus::Committed(_)) => break,
                Ok(WorkStatus::Idle) => panic!("scheduled pass vanished"),
                Err(err) => panic!("store rejected reconciler output: {err}"),
            }
        }
    }

    let Some(tree) = last else {
        return;
    };
    if let Err(err) = reconciler.run_to_completion() {
        panic!("pending pass did not commit: {err}");
    }
    let actual = reconciler.surface().snapshot_lines(container);
    let expected = vdom::debug::snapshot_lines(&tree);
    assert_eq!(shape(&actual), shape(&expected));
});
