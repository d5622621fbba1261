//! Atomic transactions over the block list.
//!
//! A transaction owns a draft copy of the blocks. Steps mutate the draft and
//! record how they shift positions; the document swaps the draft in as a
//! single commit, so no observer ever sees a half-applied edit.

use std::ops::Range;

use crate::editing::position::{self, ResolvedPos};
use crate::editing::{Block, BlockId, EditError, Mark, Node, Selection, TextBlock, TextKind};

/// Which side of an insertion a mapped position sticks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Assoc {
    Before,
    After,
}

/// Position shift produced by a single step
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StepMap {
    /// `old_size` positions at `start` became `new_size` positions
    Replace {
        start: usize,
        old_size: usize,
        new_size: usize,
    },
    /// `size` positions at `from` were lifted out and re-inserted at `to`
    /// (`to` counted after the removal)
    Move { from: usize, size: usize, to: usize },
}

impl StepMap {
    pub(crate) fn map(&self, pos: usize, assoc: Assoc) -> usize {
        match *self {
            StepMap::Replace {
                start,
                old_size,
                new_size,
            } => {
                let end = start + old_size;
                if pos < start || (pos == start && old_size == 0 && assoc == Assoc::Before) {
                    pos
                } else if pos > end || (pos == end && old_size > 0) {
                    pos - old_size + new_size
                } else if assoc == Assoc::After {
                    start + new_size
                } else {
                    start
                }
            }
            StepMap::Move { from, size, to } => {
                if pos > from && pos < from + size {
                    return to + (pos - from);
                }
                let lifted = if pos >= from + size { pos - size } else { pos };
                if lifted > to { lifted + size } else { lifted }
            }
        }
    }
}

/// Ordered list of step maps; positions are pushed through each in turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub(crate) fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub(crate) fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, assoc))
    }

    pub(crate) fn map_selection(&self, selection: Selection) -> Selection {
        Selection::new(
            self.map(selection.from, Assoc::After),
            self.map(selection.to, Assoc::After),
        )
    }
}

/// Primitive mutation of the draft block list
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    ReplaceText {
        block: usize,
        node: usize,
        range: Range<usize>,
        text: String,
    },
    ReplaceNodes {
        block: usize,
        nodes: Range<usize>,
        with: Vec<Node>,
    },
    InsertBlock {
        index: usize,
        block: Block,
    },
    RemoveBlock {
        index: usize,
    },
    MoveBlock {
        from: usize,
        to: usize,
    },
    ToggleMark {
        block: usize,
        node: usize,
        range: Range<usize>,
        mark: Mark,
    },
    SetTextKind {
        block: usize,
        node: usize,
        kind: TextKind,
    },
}

/// Everything a commit needs from a finished transaction
pub(crate) struct Committed {
    pub(crate) blocks: Vec<Block>,
    pub(crate) mapping: Mapping,
    pub(crate) selection: Option<Selection>,
    pub(crate) focus: Option<BlockId>,
    pub(crate) changed: Vec<BlockId>,
    pub(crate) inserted: Vec<BlockId>,
}

pub(crate) struct Transaction {
    blocks: Vec<Block>,
    mapping: Mapping,
    selection: Option<Selection>,
    focus: Option<BlockId>,
    changed: Vec<BlockId>,
    inserted: Vec<BlockId>,
    steps: usize,
}

impl Transaction {
    pub(crate) fn new(blocks: &[Block]) -> Self {
        Self {
            blocks: blocks.to_vec(),
            mapping: Mapping::default(),
            selection: None,
            focus: None,
            changed: Vec::new(),
            inserted: Vec::new(),
            steps: 0,
        }
    }

    pub(crate) fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub(crate) fn resolve(&self, pos: usize) -> Option<ResolvedPos> {
        position::resolve(&self.blocks, pos)
    }

    pub(crate) fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| block.id() == id)
    }

    pub(crate) fn set_selection(&mut self, selection: Selection) {
        self.selection = Some(selection);
    }

    pub(crate) fn focus(&mut self, id: BlockId) {
        self.focus = Some(id);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.steps == 0
    }

    pub(crate) fn step(&mut self, step: Step) -> Result<(), EditError> {
        let map = self.apply_step(step)?;
        if let Some(map) = map {
            // Selections set earlier in the transaction must follow later steps
            if let Some(selection) = self.selection {
                let mut single = Mapping::default();
                single.push(map.clone());
                self.selection = Some(single.map_selection(selection));
            }
            self.mapping.push(map);
        }
        self.steps += 1;
        Ok(())
    }

    fn block_mut(&mut self, index: usize) -> Result<&mut Block, EditError> {
        let id = self
            .blocks
            .get(index)
            .map(Block::id)
            .ok_or(EditError::InvalidRange {
                start: index,
                end: index,
            })?;
        if !self.changed.contains(&id) {
            self.changed.push(id);
        }
        Ok(&mut self.blocks[index])
    }

    fn apply_step(&mut self, step: Step) -> Result<Option<StepMap>, EditError> {
        match step {
            Step::ReplaceText {
                block,
                node,
                range,
                text,
            } => {
                let start = position::node_start(&self.blocks, block, node) + 1 + range.start;
                let old_size = range.len();
                let new_size = text.len();
                self.text_mut(block, node)?.replace(range, &text)?;
                Ok(Some(StepMap::Replace {
                    start,
                    old_size,
                    new_size,
                }))
            }
            Step::ReplaceNodes { block, nodes, with } => {
                let start = position::node_start(&self.blocks, block, nodes.start);
                let target = self.block_mut(block)?;
                if nodes.start > nodes.end || nodes.end > target.content().len() {
                    return Err(EditError::InvalidRange {
                        start: nodes.start,
                        end: nodes.end,
                    });
                }
                let new_size = with.iter().map(Node::size).sum();
                let old_size = target
                    .content_mut()
                    .splice(nodes, with)
                    .map(|node| node.size())
                    .sum();
                Ok(Some(StepMap::Replace {
                    start,
                    old_size,
                    new_size,
                }))
            }
            Step::InsertBlock { index, block } => {
                if index > self.blocks.len() {
                    return Err(EditError::InvalidRange {
                        start: index,
                        end: index,
                    });
                }
                if self.index_of(block.id()).is_some() {
                    return Err(EditError::DuplicateBlockId(block.id()));
                }
                let start = position::block_start(&self.blocks, index);
                let new_size = block.size();
                self.changed.push(block.id());
                self.inserted.push(block.id());
                self.blocks.insert(index, block);
                Ok(Some(StepMap::Replace {
                    start,
                    old_size: 0,
                    new_size,
                }))
            }
            Step::RemoveBlock { index } => {
                if self.blocks.len() <= 1 {
                    return Err(EditError::LastBlock);
                }
                if index >= self.blocks.len() {
                    return Err(EditError::InvalidRange {
                        start: index,
                        end: index,
                    });
                }
                let start = position::block_start(&self.blocks, index);
                let removed = self.blocks.remove(index);
                self.changed.retain(|id| *id != removed.id());
                Ok(Some(StepMap::Replace {
                    start,
                    old_size: removed.size(),
                    new_size: 0,
                }))
            }
            Step::MoveBlock { from, to } => {
                if from >= self.blocks.len() || to >= self.blocks.len() {
                    return Err(EditError::InvalidRange {
                        start: from,
                        end: to,
                    });
                }
                let from_pos = position::block_start(&self.blocks, from);
                let moved = self.blocks.remove(from);
                let size = moved.size();
                let to_pos = position::block_start(&self.blocks, to);
                if !self.changed.contains(&moved.id()) {
                    self.changed.push(moved.id());
                }
                self.blocks.insert(to, moved);
                Ok(Some(StepMap::Move {
                    from: from_pos,
                    size,
                    to: to_pos,
                }))
            }
            Step::ToggleMark {
                block,
                node,
                range,
                mark,
            } => {
                self.text_mut(block, node)?.toggle_mark(mark, range)?;
                Ok(None)
            }
            Step::SetTextKind { block, node, kind } => {
                let kind = kind.validate()?;
                self.text_mut(block, node)?.set_kind(kind);
                Ok(None)
            }
        }
    }

    fn text_mut(&mut self, block: usize, node: usize) -> Result<&mut TextBlock, EditError> {
        let pos = position::node_start(&self.blocks, block, node);
        self.block_mut(block)?
            .content_mut()
            .get_mut(node)
            .and_then(Node::as_text_mut)
            .ok_or(EditError::NotInText { pos })
    }

    pub(crate) fn finish(mut self) -> Committed {
        let live: Vec<BlockId> = self.blocks.iter().map(Block::id).collect();
        self.changed.retain(|id| live.contains(id));
        Committed {
            blocks: self.blocks,
            mapping: self.mapping,
            selection: self.selection,
            focus: self.focus,
            changed: self.changed,
            inserted: self.inserted,
        }
    }
}
