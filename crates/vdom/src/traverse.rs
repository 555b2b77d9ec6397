use crate::types::Descriptor;

pub fn node_count(root: &Descriptor) -> usize {
    1 + root.children().iter().map(node_count).sum::<usize>()
}

pub fn depth(root: &Descriptor) -> usize {
    1 + root.children().iter().map(depth).max().unwrap_or(0)
}

/// Follows child indices from `root`; an empty path returns `root`.
pub fn find_by_path<'a>(root: &'a Descriptor, path: &[usize]) -> Option<&'a Descriptor> {
    let mut node = root;
    for &index in path {
        node = node.children().get(index)?;
    }
    Some(node)
}
