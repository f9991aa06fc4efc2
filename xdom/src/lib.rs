pub mod block;
pub mod events;
pub mod parser;
pub mod syntax;

use std::fmt;

use crate::block::path::{self, BlockPath, Placement, Visit};
use crate::block::{Block, MacroInvocation, MacroMarker};
use crate::events::Listener;

/// A document tree: the root owns its top-level blocks in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XDom {
    pub blocks: Vec<Block>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl XDom {
    pub fn new(blocks: Vec<Block>) -> Self {
        XDom {
            blocks,
            source_id: 0,
        }
    }

    pub fn get(&self, path: &BlockPath) -> Option<&Block> {
        path::get(&self.blocks, path)
    }

    pub fn get_mut(&mut self, path: &BlockPath) -> Option<&mut Block> {
        path::get_mut(&mut self.blocks, path)
    }

    /// Swap the block at `path` for `block`, returning the old one.
    /// The replacement keeps the exact position among its siblings.
    pub fn replace(&mut self, path: &BlockPath, block: Block) -> Option<Block> {
        let slot = self.get_mut(path)?;
        Some(std::mem::replace(slot, block))
    }

    /// Pre-order walk over the whole tree.
    pub fn walk(&self) -> Vec<Visit<'_>> {
        path::walk(&self.blocks)
    }

    /// Every unexpanded invocation, in document order.
    pub fn invocations(&self) -> Vec<(BlockPath, &MacroInvocation, Placement)> {
        self.walk()
            .into_iter()
            .filter_map(|visit| {
                visit
                    .block
                    .as_invocation()
                    .map(|invocation| (visit.path, invocation, visit.placement))
            })
            .collect()
    }

    /// Every macro marker, in document order.
    pub fn markers(&self) -> Vec<(BlockPath, &MacroMarker)> {
        self.walk()
            .into_iter()
            .filter_map(|visit| visit.block.as_marker().map(|marker| (visit.path, marker)))
            .collect()
    }

    pub fn traverse(&self, listener: &mut dyn Listener) {
        events::traverse(&self.blocks, listener);
    }

    pub fn to_events_string(&self) -> String {
        events::to_events_string(&self.blocks)
    }
}

impl fmt::Display for XDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            let text = block.to_string();
            write!(f, "{}", text)?;
            if !text.ends_with('\n') {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MacroCall;
    use crate::syntax::Syntax;

    #[test]
    fn replace_keeps_sibling_position() {
        let mut dom = XDom::new(vec![
            Block::paragraph_of("before"),
            Block::MacroInvocation(MacroInvocation::new(
                MacroCall::new("m"),
                Syntax::xwiki_2_0(),
            )),
            Block::paragraph_of("after"),
        ]);
        let (path, _, placement) = dom.invocations().remove(0);
        assert_eq!(placement, Placement::Block);

        let old = dom.replace(&path, Block::HorizontalLine);
        assert!(matches!(old, Some(Block::MacroInvocation(_))));
        assert_eq!(dom.blocks[1], Block::HorizontalLine);
        assert_eq!(dom.blocks.len(), 3);
        assert!(dom.invocations().is_empty());
    }

    #[test]
    fn display_separates_top_level_blocks() {
        let dom = XDom::new(vec![
            Block::MacroReference(MacroCall::new("toc")),
            Block::paragraph_of("text"),
        ]);
        assert_eq!(dom.to_string(), "{{toc/}}\ntext\n");
    }
}
