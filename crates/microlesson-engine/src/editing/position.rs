//! Linear content-position space.
//!
//! Every block contributes an open token, its nodes, and a close token. Text
//! nodes contribute an open token, their UTF-8 bytes and a close token; atoms
//! (images, dividers) take one position. A selection is a pair of offsets in
//! this space, never a reference into any rendering tree.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::editing::{Block, Node};

/// Selection over the document's position space. `from == to` is a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub from: usize,
    pub to: usize,
}

impl Selection {
    pub fn new(from: usize, to: usize) -> Self {
        Self {
            from: from.min(to),
            to: from.max(to),
        }
    }

    pub fn cursor(pos: usize) -> Self {
        Self { from: pos, to: pos }
    }

    pub fn is_collapsed(&self) -> bool {
        self.from == self.to
    }

    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    pub fn range(&self) -> Range<usize> {
        self.from..self.to
    }
}

/// Where a position lands inside a text node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPos {
    pub node_index: usize,
    /// Position just before the node's open token
    pub node_start: usize,
    /// Byte offset into the node's text
    pub offset: usize,
}

impl TextPos {
    /// Position of the first text byte of the node
    pub fn content_start(&self) -> usize {
        self.node_start + 1
    }
}

/// A position resolved against the block list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPos {
    pub pos: usize,
    pub block_index: usize,
    /// Position just before the block's open token
    pub block_start: usize,
    pub text: Option<TextPos>,
}

pub(crate) fn content_size(blocks: &[Block]) -> usize {
    blocks.iter().map(Block::size).sum()
}

/// Position just before block `index`; `blocks.len()` yields the document end
pub(crate) fn block_start(blocks: &[Block], index: usize) -> usize {
    blocks.iter().take(index).map(Block::size).sum()
}

/// Resolve a position to the block (and text node) that contains it.
/// Positions sitting on block boundaries are not inside any block.
pub(crate) fn resolve(blocks: &[Block], pos: usize) -> Option<ResolvedPos> {
    let mut start = 0;
    for (block_index, block) in blocks.iter().enumerate() {
        let end = start + block.size();
        if pos > start && pos < end {
            return Some(ResolvedPos {
                pos,
                block_index,
                block_start: start,
                text: resolve_in_block(block, start, pos),
            });
        }
        start = end;
    }
    None
}

fn resolve_in_block(block: &Block, block_start: usize, pos: usize) -> Option<TextPos> {
    let mut node_start = block_start + 1;
    for (node_index, node) in block.content().iter().enumerate() {
        let node_end = node_start + node.size();
        if matches!(node, Node::Text(_)) && pos > node_start && pos < node_end {
            return Some(TextPos {
                node_index,
                node_start,
                offset: pos - node_start - 1,
            });
        }
        node_start = node_end;
    }
    None
}

/// Position just before node `node_index` of the block at `block_index`
pub(crate) fn node_start(blocks: &[Block], block_index: usize, node_index: usize) -> usize {
    let mut pos = block_start(blocks, block_index) + 1;
    if let Some(block) = blocks.get(block_index) {
        pos += block
            .content()
            .iter()
            .take(node_index)
            .map(Node::size)
            .sum::<usize>();
    }
    pos
}

/// Every valid text-position range, in document order
pub(crate) fn text_ranges(blocks: &[Block]) -> Vec<(usize, Range<usize>)> {
    let mut ranges = Vec::new();
    let mut block_pos = 0;
    for (block_index, block) in blocks.iter().enumerate() {
        let mut node_pos = block_pos + 1;
        for node in block.content() {
            if let Node::Text(text) = node {
                ranges.push((block_index, node_pos + 1..node_pos + 1 + text.len()));
            }
            node_pos += node.size();
        }
        block_pos += block.size();
    }
    ranges
}

/// First text position of a block, or the inside of the block when it has no text
pub(crate) fn block_text_start(blocks: &[Block], block_index: usize) -> usize {
    text_ranges(blocks)
        .into_iter()
        .find(|(index, _)| *index == block_index)
        .map(|(_, range)| range.start)
        .unwrap_or_else(|| block_start(blocks, block_index) + 1)
}

/// Last text position of a block, or the inside of the block when it has no text
pub(crate) fn block_text_end(blocks: &[Block], block_index: usize) -> usize {
    text_ranges(blocks)
        .into_iter()
        .rev()
        .find(|(index, _)| *index == block_index)
        .map(|(_, range)| range.end)
        .unwrap_or_else(|| {
            block_start(blocks, block_index + 1).saturating_sub(1)
        })
}

/// Snap a position onto the closest valid text position
pub(crate) fn nearest_text_pos(blocks: &[Block], pos: usize) -> usize {
    let mut best: Option<(usize, usize)> = None;
    for (_, range) in text_ranges(blocks) {
        let candidate = pos.clamp(range.start, range.end);
        let distance = candidate.abs_diff(pos);
        if best.is_none_or(|(_, best_distance)| distance < best_distance) {
            best = Some((candidate, distance));
        }
    }
    match best {
        Some((candidate, _)) => candidate,
        None => pos.min(content_size(blocks)),
    }
}
