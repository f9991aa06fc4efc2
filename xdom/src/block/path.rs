use std::fmt;

use crate::block::Block;

/// Child-index path from the document root to a block.
///
/// Paths compare lexicographically, which is exactly pre-order document
/// order: an ancestor sorts before its descendants, and earlier siblings'
/// subtrees sort before later siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPath(Vec<usize>);

impl BlockPath {
    /// Path of the `index`th top-level block.
    pub fn top(index: usize) -> Self {
        BlockPath(vec![index])
    }

    pub fn from_indices(indices: Vec<usize>) -> Self {
        BlockPath(indices)
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        BlockPath(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn parent(&self) -> Option<BlockPath> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(BlockPath(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Nesting depth: 1 for top-level blocks.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Strict ancestry: a path is not its own ancestor.
    pub fn is_ancestor_of(&self, other: &BlockPath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }
}

impl fmt::Display for BlockPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "/{}", parts.join("/"))
    }
}

/// Whether a block sits in a block container or inside a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Block,
    Inline,
}

/// One step of a pre-order walk.
#[derive(Debug, Clone)]
pub struct Visit<'a> {
    pub path: BlockPath,
    pub block: &'a Block,
    pub placement: Placement,
}

/// Pre-order, depth-first walk over `blocks` and all their descendants.
///
/// Macro markers are transparent: their children inherit the marker's own
/// placement.
pub fn walk(blocks: &[Block]) -> Vec<Visit<'_>> {
    let mut visits = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        walk_block(block, BlockPath::top(i), Placement::Block, &mut visits);
    }
    visits
}

fn walk_block<'a>(
    block: &'a Block,
    path: BlockPath,
    placement: Placement,
    visits: &mut Vec<Visit<'a>>,
) {
    let child_placement = match block {
        Block::MacroMarker(_) => placement,
        b if b.is_inline_container() => Placement::Inline,
        _ => Placement::Block,
    };
    let children = block.children();
    visits.push(Visit {
        path: path.clone(),
        block,
        placement,
    });
    for (i, child) in children.iter().enumerate() {
        walk_block(child, path.child(i), child_placement, visits);
    }
}

pub fn get<'a>(blocks: &'a [Block], path: &BlockPath) -> Option<&'a Block> {
    let (first, rest) = path.indices().split_first()?;
    let mut current = blocks.get(*first)?;
    for &i in rest {
        current = current.children().get(i)?;
    }
    Some(current)
}

pub fn get_mut<'a>(blocks: &'a mut [Block], path: &BlockPath) -> Option<&'a mut Block> {
    let (first, rest) = path.indices().split_first()?;
    let mut current = blocks.get_mut(*first)?;
    for &i in rest {
        current = current.children_mut()?.get_mut(i)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{MacroCall, MacroInvocation, MacroMarker};
    use crate::syntax::Syntax;

    fn sample() -> Vec<Block> {
        vec![
            Block::Paragraph(vec![
                Block::Word("a".into()),
                Block::MacroInvocation(MacroInvocation::new(
                    MacroCall::new("inline"),
                    Syntax::xwiki_2_0(),
                )),
            ]),
            Block::MacroMarker(MacroMarker {
                call: MacroCall::new("outer"),
                children: vec![Block::MacroInvocation(MacroInvocation::new(
                    MacroCall::new("standalone"),
                    Syntax::xwiki_2_0(),
                ))],
            }),
        ]
    }

    #[test]
    fn walk_is_preorder_and_tracks_placement() {
        let blocks = sample();
        let visits = walk(&blocks);
        let paths: Vec<String> = visits.iter().map(|v| v.path.to_string()).collect();
        assert_eq!(paths, vec!["/0", "/0/0", "/0/1", "/1", "/1/0"]);
        assert_eq!(visits[2].placement, Placement::Inline);
        assert_eq!(visits[4].placement, Placement::Block);
    }

    #[test]
    fn path_order_is_document_order() {
        let mut paths: Vec<BlockPath> = walk(&sample()).into_iter().map(|v| v.path).collect();
        let expected = paths.clone();
        paths.reverse();
        paths.sort();
        assert_eq!(paths, expected);
    }

    #[test]
    fn get_and_get_mut_follow_the_same_path() {
        let mut blocks = sample();
        let path = BlockPath::from_indices(vec![1, 0]);
        assert!(get(&blocks, &path).and_then(Block::as_invocation).is_some());
        *get_mut(&mut blocks, &path).unwrap() = Block::Space;
        assert_eq!(get(&blocks, &path), Some(&Block::Space));
        assert!(get(&blocks, &BlockPath::from_indices(vec![0, 5])).is_none());
    }

    #[test]
    fn ancestry() {
        let parent = BlockPath::top(1);
        assert!(parent.is_ancestor_of(&parent.child(0)));
        assert!(!parent.is_ancestor_of(&parent));
        assert!(!parent.is_ancestor_of(&BlockPath::top(2).child(0)));
        assert_eq!(parent.child(3).parent(), Some(parent));
    }
}
