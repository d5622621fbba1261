use std::ops::Range;

use crate::editing::lifecycle::{self, DropSide};
use crate::editing::position;
use crate::editing::transaction::{Step, Transaction};
use crate::editing::{BlockId, BlockKind, Document, EditError, Mark, Node, Selection, TextBlock, TextKind};

/// Edit commands understood by [`Document::apply`].
///
/// Positions are in the document's linear position space. Inside a
/// [`Cmd::Batch`] every command sees the draft left by the commands before
/// it, and the whole batch commits (or fails) as one transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertText {
        at: usize,
        text: String,
    },
    DeleteRange {
        range: Range<usize>,
    },
    ReplaceRange {
        range: Range<usize>,
        text: String,
    },
    /// Insert a new empty sibling block after the block containing `at`
    SplitBlock {
        at: usize,
    },
    /// Backspace at the start of an empty paragraph
    DeleteBlock {
        at: usize,
    },
    InsertBlockAfter {
        block: BlockId,
        kind: BlockKind,
    },
    RemoveBlock {
        block: BlockId,
    },
    MoveBlock {
        block: BlockId,
        target: BlockId,
        side: DropSide,
    },
    ToggleMark {
        range: Range<usize>,
        mark: Mark,
    },
    /// Change the kind of every text node touched by `range`
    SetTextKind {
        range: Range<usize>,
        kind: TextKind,
    },
    /// Replace a range inside one text node with whole nodes, splitting the
    /// text node around them
    ReplaceWithNodes {
        range: Range<usize>,
        nodes: Vec<Node>,
    },
    SetBlockContent {
        block: BlockId,
        content: Vec<Node>,
    },
    Batch(Vec<Cmd>),
}

impl Cmd {
    pub fn insert_text(at: usize, text: impl Into<String>) -> Self {
        Cmd::InsertText {
            at,
            text: text.into(),
        }
    }
}

pub(crate) fn compile(doc: &Document, tr: &mut Transaction, cmd: &Cmd) -> Result<(), EditError> {
    match cmd {
        Cmd::InsertText { at, text } => replace_text(tr, *at..*at, text),
        Cmd::DeleteRange { range } => replace_text(tr, range.clone(), ""),
        Cmd::ReplaceRange { range, text } => replace_text(tr, range.clone(), text),
        Cmd::SplitBlock { at } => lifecycle::split_block(doc, tr, *at),
        Cmd::DeleteBlock { at } => lifecycle::delete_block(tr, *at),
        Cmd::InsertBlockAfter { block, kind } => {
            lifecycle::insert_block_after(doc, tr, *block, *kind)
        }
        Cmd::RemoveBlock { block } => lifecycle::remove_block(tr, *block),
        Cmd::MoveBlock {
            block,
            target,
            side,
        } => lifecycle::move_block(tr, *block, *target, *side),
        Cmd::ToggleMark { range, mark } => toggle_mark(tr, range, *mark),
        Cmd::SetTextKind { range, kind } => set_text_kind(tr, range, *kind),
        Cmd::ReplaceWithNodes { range, nodes } => replace_with_nodes(tr, range, nodes),
        Cmd::SetBlockContent { block, content } => set_block_content(tr, *block, content),
        Cmd::Batch(cmds) => {
            for cmd in cmds {
                compile(doc, tr, cmd)?;
            }
            Ok(())
        }
    }
}

/// Text node location of a range that must sit inside a single text node
struct TextRange {
    block: usize,
    node: usize,
    local: Range<usize>,
}

fn resolve_text_range(tr: &Transaction, range: &Range<usize>) -> Result<TextRange, EditError> {
    if range.start > range.end {
        return Err(EditError::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }
    let resolved = tr
        .resolve(range.start)
        .ok_or(EditError::NotInBlock { pos: range.start })?;
    let text_pos = resolved
        .text
        .ok_or(EditError::NotInText { pos: range.start })?;
    let len = tr.blocks()[resolved.block_index].content()[text_pos.node_index]
        .as_text()
        .map(TextBlock::len)
        .unwrap_or_default();
    let end = range.end - text_pos.content_start();
    if end > len {
        return Err(EditError::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }
    Ok(TextRange {
        block: resolved.block_index,
        node: text_pos.node_index,
        local: text_pos.offset..end,
    })
}

fn replace_text(tr: &mut Transaction, range: Range<usize>, text: &str) -> Result<(), EditError> {
    let target = resolve_text_range(tr, &range)?;
    if target.local.is_empty() && text.is_empty() {
        return Err(EditError::Unchanged);
    }
    tr.step(Step::ReplaceText {
        block: target.block,
        node: target.node,
        range: target.local,
        text: text.to_string(),
    })
}

/// Slice of a text node touched by a document range
struct Segment {
    block: usize,
    node: usize,
    local: Range<usize>,
}

/// Every text node intersecting `range` (end-inclusive, so a cursor touches
/// the node it sits in)
fn segments(tr: &Transaction, range: &Range<usize>) -> Vec<Segment> {
    let blocks = tr.blocks();
    let mut found = Vec::new();
    let mut block_pos = 0;
    for (block_index, block) in blocks.iter().enumerate() {
        let mut node_pos = block_pos + 1;
        for (node_index, node) in block.content().iter().enumerate() {
            if let Node::Text(text) = node {
                let content = node_pos + 1..node_pos + 1 + text.len();
                if range.start <= content.end && range.end >= content.start {
                    let start = range.start.max(content.start) - content.start;
                    let end = range.end.min(content.end) - content.start;
                    found.push(Segment {
                        block: block_index,
                        node: node_index,
                        local: start..end,
                    });
                }
            }
            node_pos += node.size();
        }
        block_pos += block.size();
    }
    found
}

fn toggle_mark(tr: &mut Transaction, range: &Range<usize>, mark: Mark) -> Result<(), EditError> {
    let segments: Vec<Segment> = segments(tr, range)
        .into_iter()
        .filter(|segment| !segment.local.is_empty())
        .collect();
    if segments.is_empty() {
        return Err(EditError::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }

    let covered = |tr: &Transaction, segment: &Segment| {
        tr.blocks()[segment.block].content()[segment.node]
            .as_text()
            .is_some_and(|text| text.has_mark(mark, &segment.local))
    };
    // Across several nodes the toggle removes only when everything is marked
    let removing = segments.iter().all(|segment| covered(tr, segment));
    for segment in &segments {
        if !removing && covered(tr, segment) {
            continue;
        }
        tr.step(Step::ToggleMark {
            block: segment.block,
            node: segment.node,
            range: segment.local.clone(),
            mark,
        })?;
    }
    tr.set_selection(Selection::new(range.start, range.end));
    Ok(())
}

fn set_text_kind(tr: &mut Transaction, range: &Range<usize>, kind: TextKind) -> Result<(), EditError> {
    let kind = kind.validate()?;
    let segments = segments(tr, range);
    if segments.is_empty() {
        return Err(EditError::NotInText { pos: range.start });
    }
    for segment in segments {
        tr.step(Step::SetTextKind {
            block: segment.block,
            node: segment.node,
            kind,
        })?;
    }
    Ok(())
}

fn replace_with_nodes(tr: &mut Transaction, range: &Range<usize>, nodes: &[Node]) -> Result<(), EditError> {
    let target = resolve_text_range(tr, range)?;
    let block_id = tr.blocks()[target.block].id();
    let mut remaining = tr.blocks()[target.block].content()[target.node]
        .as_text()
        .cloned()
        .ok_or(EditError::NotInText { pos: range.start })?;
    remaining.replace(target.local.clone(), "")?;
    let (before, after) = remaining.split_at(target.local.start)?;
    let kind = before.kind();

    let mut with = Vec::with_capacity(nodes.len() + 3);
    if !before.is_empty() {
        with.push(Node::Text(before));
    }
    let first_inserted = with.len();
    with.extend(nodes.iter().cloned());
    let after_inserted = with.len();
    if !after.is_empty() {
        with.push(Node::Text(after));
    }
    // The cursor needs a text node to land in after an atom
    match with.last() {
        Some(Node::Text(_)) => {}
        Some(_) => with.push(Node::paragraph("")),
        None => with.push(Node::Text(TextBlock::new(kind))),
    }

    tr.step(Step::ReplaceNodes {
        block: target.block,
        nodes: target.node..target.node + 1,
        with: with.clone(),
    })?;

    let last_text = (first_inserted..after_inserted)
        .rev()
        .find(|index| matches!(with[*index], Node::Text(_)));
    let cursor = match last_text {
        Some(index) => {
            let start = position::node_start(tr.blocks(), target.block, target.node + index);
            start + with[index].size() - 1
        }
        None => {
            let index = (after_inserted..with.len())
                .find(|index| matches!(with[*index], Node::Text(_)))
                .unwrap_or(with.len() - 1);
            position::node_start(tr.blocks(), target.block, target.node + index) + 1
        }
    };
    tr.set_selection(Selection::cursor(cursor));
    tr.focus(block_id);
    Ok(())
}

fn set_block_content(tr: &mut Transaction, id: BlockId, content: &[Node]) -> Result<(), EditError> {
    let index = tr.index_of(id).ok_or(EditError::UnknownBlock(id))?;
    let existing = tr.blocks()[index].content().len();
    let content = if content.is_empty() {
        vec![Node::paragraph("")]
    } else {
        content.to_vec()
    };
    tr.step(Step::ReplaceNodes {
        block: index,
        nodes: 0..existing,
        with: content,
    })?;
    tr.set_selection(Selection::cursor(position::block_text_end(tr.blocks(), index)));
    tr.focus(id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::Block;
    use pretty_assertions::assert_eq;

    fn doc(texts: &[&str]) -> Document {
        let blocks = texts
            .iter()
            .map(|text| Block::with_content(BlockKind::Content, "", vec![Node::paragraph(text)]))
            .collect();
        Document::from_blocks(blocks).unwrap()
    }

    // ============ Text editing ============

    #[test]
    fn test_insert_text_moves_cursor_after_insert() {
        let mut doc = doc(&["Hello"]);
        doc.set_selection(Selection::cursor(7));
        let patch = doc.apply(Cmd::insert_text(7, " World")).unwrap();
        assert_eq!(doc.blocks()[0].plain_text(), "Hello World");
        assert_eq!(patch.new_selection, Selection::cursor(13));
    }

    #[test]
    fn test_insert_before_cursor_shifts_cursor() {
        let mut doc = doc(&["Hello"]);
        doc.set_selection(Selection::cursor(7));
        doc.apply(Cmd::insert_text(2, "Oh ")).unwrap();
        assert_eq!(doc.selection(), Selection::cursor(10));
    }

    #[test]
    fn test_delete_range_collapses_selection() {
        let mut doc = doc(&["Hello World"]);
        doc.set_selection(Selection::new(7, 13));
        doc.apply(Cmd::DeleteRange { range: 7..13 }).unwrap();
        assert_eq!(doc.blocks()[0].plain_text(), "Hello");
        assert_eq!(doc.selection(), Selection::cursor(7));
    }

    #[test]
    fn test_text_range_must_stay_in_one_node() {
        let mut doc = doc(&["ab", "cd"]);
        assert_eq!(
            doc.apply(Cmd::DeleteRange { range: 3..8 }),
            Err(EditError::InvalidRange { start: 3, end: 8 })
        );
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_insert_on_block_boundary_rejected() {
        let mut doc = doc(&["ab"]);
        assert_eq!(
            doc.apply(Cmd::insert_text(0, "x")),
            Err(EditError::NotInBlock { pos: 0 })
        );
    }

    // ============ Marks and kinds ============

    #[test]
    fn test_toggle_mark_across_blocks() {
        let mut doc = doc(&["Hello", "World"]);
        // "llo" in block 0 through "Wo" in block 1
        doc.apply(Cmd::ToggleMark {
            range: 4..13,
            mark: Mark::Bold,
        })
        .unwrap();
        let first = doc.blocks()[0].content()[0].as_text().unwrap();
        let second = doc.blocks()[1].content()[0].as_text().unwrap();
        assert!(first.has_mark(Mark::Bold, &(2..5)));
        assert!(second.has_mark(Mark::Bold, &(0..2)));

        doc.apply(Cmd::ToggleMark {
            range: 4..13,
            mark: Mark::Bold,
        })
        .unwrap();
        assert!(doc.blocks()[0].content()[0].as_text().unwrap().marks().is_empty());
        assert!(doc.blocks()[1].content()[0].as_text().unwrap().marks().is_empty());
    }

    #[test]
    fn test_toggle_mark_on_collapsed_range_rejected() {
        let mut doc = doc(&["Hello"]);
        assert!(
            doc.apply(Cmd::ToggleMark {
                range: 3..3,
                mark: Mark::Italic
            })
            .is_err()
        );
    }

    #[test]
    fn test_set_text_kind_at_cursor() {
        let mut doc = doc(&["Title"]);
        doc.apply(Cmd::SetTextKind {
            range: 2..2,
            kind: TextKind::Heading { level: 2 },
        })
        .unwrap();
        let text = doc.blocks()[0].content()[0].as_text().unwrap();
        assert_eq!(text.kind(), TextKind::Heading { level: 2 });
        assert_eq!(text.text(), "Title");
    }

    #[test]
    fn test_set_text_kind_rejects_bad_heading() {
        let mut doc = doc(&["Title"]);
        assert_eq!(
            doc.apply(Cmd::SetTextKind {
                range: 2..2,
                kind: TextKind::Heading { level: 0 },
            }),
            Err(EditError::InvalidHeadingLevel(0))
        );
    }

    // ============ Node replacement ============

    #[test]
    fn test_replace_with_divider_splits_text() {
        let mut doc = doc(&["ab/cd"]);
        // "/" sits at 4..5
        doc.apply(Cmd::ReplaceWithNodes {
            range: 4..5,
            nodes: vec![Node::Divider],
        })
        .unwrap();
        let content = doc.blocks()[0].content();
        assert_eq!(
            content,
            &[Node::paragraph("ab"), Node::Divider, Node::paragraph("cd")]
        );
        // cursor at the start of "cd": <p> 1, ab 2..4, </p> 4, hr 5, <p> 6
        assert_eq!(doc.selection(), Selection::cursor(7));
    }

    #[test]
    fn test_replace_whole_text_with_atom_adds_trailing_paragraph() {
        let mut doc = doc(&["/"]);
        doc.apply(Cmd::ReplaceWithNodes {
            range: 2..3,
            nodes: vec![Node::Divider],
        })
        .unwrap();
        assert_eq!(
            doc.blocks()[0].content(),
            &[Node::Divider, Node::paragraph("")]
        );
        assert_eq!(doc.selection(), Selection::cursor(3));
    }

    #[test]
    fn test_replace_with_text_nodes_puts_cursor_at_end_of_inserted() {
        let mut doc = doc(&["/"]);
        doc.apply(Cmd::ReplaceWithNodes {
            range: 2..3,
            nodes: vec![Node::heading(3, "Key term"), Node::paragraph("Definition")],
        })
        .unwrap();
        // [ <h3> Key term </h3> <p> Definition </p> ]: second text ends at 1 + 10 + 1 + 10
        assert_eq!(doc.selection(), Selection::cursor(22));
    }

    #[test]
    fn test_set_block_content_replaces_everything() {
        let mut doc = doc(&["old"]);
        let id = doc.blocks()[0].id();
        let patch = doc
            .apply(Cmd::SetBlockContent {
                block: id,
                content: vec![Node::paragraph("new")],
            })
            .unwrap();
        assert_eq!(doc.blocks()[0].plain_text(), "new");
        assert_eq!(patch.focus, Some(id));
        assert_eq!(patch.changed, vec![id]);
    }

    // ============ Batches ============

    #[test]
    fn test_batch_commits_once() {
        let mut doc = doc(&["Hello"]);
        let patch = doc
            .apply(Cmd::Batch(vec![
                Cmd::insert_text(7, "!"),
                Cmd::insert_text(8, "!"),
            ]))
            .unwrap();
        assert_eq!(doc.blocks()[0].plain_text(), "Hello!!");
        assert_eq!(patch.version, 1);
    }

    #[test]
    fn test_failed_batch_leaves_document_untouched() {
        let mut doc = doc(&["Hello"]);
        let before = doc.blocks().to_vec();
        let result = doc.apply(Cmd::Batch(vec![
            Cmd::insert_text(7, "!"),
            Cmd::insert_text(99, "?"),
        ]));
        assert!(result.is_err());
        assert_eq!(doc.blocks(), before.as_slice());
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_empty_batch_is_unchanged() {
        let mut doc = doc(&["Hello"]);
        assert_eq!(doc.apply(Cmd::Batch(vec![])), Err(EditError::Unchanged));
    }
}
