//! Deterministic pseudo-random trees for seeded parity runs.
//!
//! Fast CI mode: default seeds and budget when `CI` is set.
//! Extended local mode: set `SAPWOOD_PARITY_SEEDS` and `SAPWOOD_PARITY_BUDGET`
//! to increase coverage.

use crate::tree_text::BehaviorRegistry;
use vdom::{Descriptor, ElementBuilder, element, text};

pub const SEED_MIX: u64 = 0x9e3779b97f4a7c15;

const DEFAULT_BUDGET_CI: usize = 300;
const DEFAULT_BUDGET_LOCAL: usize = 1_500;
const DEFAULT_SEEDS_CI: usize = 50;
const DEFAULT_SEEDS_LOCAL: usize = 200;

const TAGS: &[&str] = &["div", "span", "p", "ul", "li", "section"];
const ATTRIBUTES: &[&str] = &["id", "title", "className", "data-k", "hidden"];
const VALUES: &[&str] = &["a", "b", "c", "long value", ""];
const STYLE_KEYS: &[&str] = &["color", "marginTop", "fontSize"];
const BEHAVIORS: &[(&str, &str)] = &[("onClick", "b0"), ("onClick", "b1"), ("onChange", "b2")];
const WORDS: &[&str] = &["x", "y", "z", "hello", "a \"quoted\" word"];

pub fn seed_count() -> usize {
    if let Some(parsed) = env_usize("SAPWOOD_PARITY_SEEDS") {
        return parsed;
    }
    if std::env::var("CI").is_ok() {
        DEFAULT_SEEDS_CI
    } else {
        DEFAULT_SEEDS_LOCAL
    }
}

/// Upper bound on fiber units processed across one seeded run.
pub fn run_budget() -> usize {
    if let Some(parsed) = env_usize("SAPWOOD_PARITY_BUDGET") {
        return parsed;
    }
    if std::env::var("CI").is_ok() {
        DEFAULT_BUDGET_CI
    } else {
        DEFAULT_BUDGET_LOCAL
    }
}

fn env_usize(key: &str) -> Option<usize> {
    if let Ok(value) = std::env::var(key)
        && let Ok(parsed) = value.parse::<usize>()
        && parsed > 0
    {
        return Some(parsed);
    }
    None
}

pub struct LcgRng {
    state: u64,
}

impl LcgRng {
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { SEED_MIX } else { seed };
        Self { state }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    pub fn gen_range_usize(&mut self, start: usize, end: usize) -> usize {
        assert!(start < end, "invalid range: {start}..{end}");
        let span = (end - start) as u64;
        // high bits; the low bits of a power-of-two LCG cycle quickly
        ((self.next_u64() >> 33) % span) as usize + start
    }

    /// True with probability `num / den`.
    pub fn chance(&mut self, num: usize, den: usize) -> bool {
        self.gen_range_usize(0, den) < num
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.gen_range_usize(0, items.len())]
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TreeShape {
    pub max_depth: usize,
    pub max_children: usize,
}

impl Default for TreeShape {
    fn default() -> Self {
        Self {
            max_depth: 4,
            max_children: 4,
        }
    }
}

/// Random element-rooted tree drawn from a small alphabet, so consecutive
/// trees from one stream overlap enough to exercise updates as well as
/// placements and deletions.
pub fn random_tree(rng: &mut LcgRng, shape: TreeShape, behaviors: &BehaviorRegistry) -> Descriptor {
    random_element(rng, shape, 0, behaviors).build()
}

fn random_element(
    rng: &mut LcgRng,
    shape: TreeShape,
    depth: usize,
    behaviors: &BehaviorRegistry,
) -> ElementBuilder {
    let mut node = element(*rng.pick(TAGS));
    for _ in 0..rng.gen_range_usize(0, 3) {
        let key = *rng.pick(ATTRIBUTES);
        node = if key == "hidden" {
            node.attr(key, rng.chance(1, 2))
        } else {
            node.attr(key, *rng.pick(VALUES))
        };
    }
    if rng.chance(1, 4) {
        node = node.style(*rng.pick(STYLE_KEYS), *rng.pick(VALUES));
    }
    if rng.chance(1, 3) {
        let (key, name) = *rng.pick(BEHAVIORS);
        node = node.behavior(key, behaviors.get(name));
    }
    if depth + 1 >= shape.max_depth {
        return node;
    }
    for _ in 0..rng.gen_range_usize(0, shape.max_children + 1) {
        node = if rng.chance(1, 4) {
            node.child(text(*rng.pick(WORDS)))
        } else {
            node.child(random_element(rng, shape, depth + 1, behaviors))
        };
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seed_is_remapped() {
        let mut a = LcgRng::new(0);
        let mut b = LcgRng::new(SEED_MIX);
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn trees_are_deterministic_per_seed() {
        let behaviors = BehaviorRegistry::new();
        let shape = TreeShape::default();
        let first = random_tree(&mut LcgRng::new(7), shape, &behaviors);
        let again = random_tree(&mut LcgRng::new(7), shape, &behaviors);
        assert_eq!(first, again);
        assert!(vdom::traverse::depth(&first) <= shape.max_depth);
    }
}
