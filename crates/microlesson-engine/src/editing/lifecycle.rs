//! Block lifecycle: creating, splitting off, deleting and reordering blocks.
//!
//! Every operation here compiles into steps on a [`Transaction`], so the block
//! list changes in one commit together with the selection and focus it implies.

use serde::{Deserialize, Serialize};

use crate::editing::position;
use crate::editing::transaction::{Step, Transaction};
use crate::editing::{Block, BlockId, BlockKind, Document, EditError, Node, Selection};

/// Which half of the hovered block a dragged block will land in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropSide {
    Above,
    Below,
}

/// Enter: a new empty sibling block directly after the block containing `at`
pub(crate) fn split_block(doc: &Document, tr: &mut Transaction, at: usize) -> Result<(), EditError> {
    let resolved = tr.resolve(at).ok_or(EditError::NotInBlock { pos: at })?;
    let block = doc.create_block(BlockKind::Content);
    let id = block.id();
    let index = resolved.block_index + 1;
    tr.step(Step::InsertBlock { index, block })?;
    tr.set_selection(Selection::cursor(position::block_text_start(tr.blocks(), index)));
    tr.focus(id);
    log::debug!("split block {index} off at {at}");
    Ok(())
}

/// Backspace at offset 0 of an empty paragraph.
///
/// A block that holds only that paragraph is removed and the cursor lands at
/// the end of the previous block. When the empty paragraph is one of several
/// nodes, only the paragraph goes; the first node of a block is never dropped
/// this way.
pub(crate) fn delete_block(tr: &mut Transaction, at: usize) -> Result<(), EditError> {
    let resolved = tr.resolve(at).ok_or(EditError::NotInBlock { pos: at })?;
    let text_pos = resolved.text.ok_or(EditError::NotInText { pos: at })?;
    let block_index = resolved.block_index;
    let block = &tr.blocks()[block_index];
    let block_id = block.id();
    let node_count = block.content().len();
    let empty = block.content()[text_pos.node_index]
        .as_text()
        .is_some_and(|text| text.is_empty());
    if text_pos.offset != 0 || !empty {
        return Err(EditError::NotAtEmptyParagraphStart);
    }

    if node_count > 1 {
        let node = text_pos.node_index;
        if node == 0 {
            return Err(EditError::NotAtEmptyParagraphStart);
        }
        tr.step(Step::ReplaceNodes {
            block: block_index,
            nodes: node..node + 1,
            with: Vec::new(),
        })?;
        let previous = &tr.blocks()[block_index].content()[node - 1];
        let previous_start = position::node_start(tr.blocks(), block_index, node - 1);
        let cursor = match previous {
            Node::Text(text) => previous_start + 1 + text.len(),
            _ => position::nearest_text_pos(tr.blocks(), previous_start),
        };
        tr.set_selection(Selection::cursor(cursor));
        tr.focus(block_id);
        return Ok(());
    }

    if tr.blocks().len() <= 1 {
        return Err(EditError::LastBlock);
    }
    if block_index == 0 {
        return Err(EditError::NoPreviousBlock);
    }
    let previous_id = tr.blocks()[block_index - 1].id();
    tr.step(Step::RemoveBlock { index: block_index })?;
    tr.set_selection(Selection::cursor(position::block_text_end(
        tr.blocks(),
        block_index - 1,
    )));
    tr.focus(previous_id);
    log::debug!("deleted empty block {block_id}");
    Ok(())
}

pub(crate) fn insert_block_after(
    doc: &Document,
    tr: &mut Transaction,
    after: BlockId,
    kind: BlockKind,
) -> Result<(), EditError> {
    let index = tr.index_of(after).ok_or(EditError::UnknownBlock(after))? + 1;
    let block = doc.create_block(kind);
    let id = block.id();
    tr.step(Step::InsertBlock { index, block })?;
    tr.set_selection(Selection::cursor(position::block_text_start(tr.blocks(), index)));
    tr.focus(id);
    Ok(())
}

/// Explicit delete control: removes any block except the last one
pub(crate) fn remove_block(tr: &mut Transaction, id: BlockId) -> Result<(), EditError> {
    let index = tr.index_of(id).ok_or(EditError::UnknownBlock(id))?;
    tr.step(Step::RemoveBlock { index })?;
    let (cursor, focus) = if index > 0 {
        (
            position::block_text_end(tr.blocks(), index - 1),
            tr.blocks()[index - 1].id(),
        )
    } else {
        (position::block_text_start(tr.blocks(), 0), tr.blocks()[0].id())
    };
    tr.set_selection(Selection::cursor(cursor));
    tr.focus(focus);
    log::debug!("removed block {id}");
    Ok(())
}

/// Index the moved block ends up at when dropped on `side` of the block
/// currently at `target`
pub(crate) fn drop_index(from: usize, target: usize, side: DropSide) -> usize {
    // Indices after the dragged block shift down once it is lifted out
    let anchor = if target > from { target - 1 } else { target };
    match side {
        DropSide::Above => anchor,
        DropSide::Below => anchor + 1,
    }
}

pub(crate) fn move_block(
    tr: &mut Transaction,
    id: BlockId,
    target: BlockId,
    side: DropSide,
) -> Result<(), EditError> {
    if id == target {
        return Err(EditError::MoveOntoSelf(id));
    }
    let from = tr.index_of(id).ok_or(EditError::UnknownBlock(id))?;
    let target_index = tr.index_of(target).ok_or(EditError::UnknownBlock(target))?;
    let to = drop_index(from, target_index, side);
    if to == from {
        return Err(EditError::NoMovement);
    }
    tr.step(Step::MoveBlock { from, to })?;
    tr.focus(id);
    log::debug!("moved block {id} from {from} to {to}");
    Ok(())
}

impl Document {
    /// A fresh block of `kind` carrying the document's placeholder for it
    pub fn create_block(&self, kind: BlockKind) -> Block {
        Block::new(kind, self.placeholder_for(kind))
    }
}
