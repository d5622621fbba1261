use std::collections::HashSet;
use std::ops::Range;

use crate::editing::commands::{self, Cmd};
use crate::editing::position::{self, ResolvedPos};
use crate::editing::transaction::Transaction;
use crate::editing::{Block, BlockId, BlockKind, EditError, Patch, Selection};
use crate::settings::EditorSettings;

/// Placeholder text shown in empty blocks, per block kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    pub title: String,
    pub content: String,
}

impl Placeholders {
    pub fn for_kind(&self, kind: BlockKind) -> &str {
        match kind {
            BlockKind::Title => &self.title,
            BlockKind::Content => &self.content,
        }
    }
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            title: BlockKind::Title.default_placeholder().to_string(),
            content: BlockKind::Content.default_placeholder().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    blocks: Vec<Block>,
    selection: Selection,
}

/// Whole-transaction undo and redo stacks
#[derive(Debug, Clone)]
struct History {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    depth: usize,
}

impl History {
    fn new(depth: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            depth,
        }
    }

    fn record(&mut self, entry: HistoryEntry) {
        self.redo.clear();
        if self.depth == 0 {
            return;
        }
        self.undo.push(entry);
        if self.undo.len() > self.depth {
            self.undo.remove(0);
        }
    }
}

/// A lesson document: an ordered list of blocks plus the selection over them.
///
/// All mutation goes through [`Document::apply`]. A command is compiled into a
/// transaction against a draft of the blocks and swapped in as one commit;
/// a command that does not apply returns an [`EditError`] and leaves the
/// document exactly as it was.
///
/// ```rust
/// # use microlesson_engine::editing::{Cmd, Document};
/// let mut doc = Document::new();
/// let patch = doc.apply(Cmd::insert_text(2, "Hello")).unwrap();
/// assert_eq!(patch.version, doc.version());
/// assert_eq!(doc.plain_text(), "Hello");
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    blocks: Vec<Block>,
    selection: Selection,
    version: u64,
    /// Every id this document has ever held; ids are never handed out twice
    issued: HashSet<BlockId>,
    history: History,
    placeholders: Placeholders,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document holding one empty content block
    pub fn new() -> Self {
        Self::seeded(
            &[BlockKind::Content],
            Placeholders::default(),
            EditorSettings::DEFAULT_HISTORY_DEPTH,
        )
    }

    /// A document seeded with the configured initial blocks
    pub fn from_settings(settings: &EditorSettings) -> Self {
        Self::seeded(
            &settings.seed_blocks,
            settings.placeholders(),
            settings.history_depth,
        )
    }

    fn seeded(kinds: &[BlockKind], placeholders: Placeholders, history_depth: usize) -> Self {
        let kinds = if kinds.is_empty() {
            &[BlockKind::Content][..]
        } else {
            kinds
        };
        let blocks: Vec<Block> = kinds
            .iter()
            .map(|kind| Block::new(*kind, placeholders.for_kind(*kind)))
            .collect();
        let mut doc = Self {
            issued: blocks.iter().map(Block::id).collect(),
            blocks,
            selection: Selection::default(),
            version: 0,
            history: History::new(history_depth),
            placeholders,
        };
        doc.selection = Selection::cursor(position::block_text_start(&doc.blocks, 0));
        doc
    }

    /// Build a document from existing blocks, e.g. after an import.
    /// Fails on an empty list or on repeated ids.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, EditError> {
        if blocks.is_empty() {
            return Err(EditError::EmptyDocument);
        }
        let mut issued = HashSet::with_capacity(blocks.len());
        for block in &blocks {
            if !issued.insert(block.id()) {
                return Err(EditError::DuplicateBlockId(block.id()));
            }
        }
        let selection = Selection::cursor(position::block_text_start(&blocks, 0));
        Ok(Self {
            blocks,
            selection,
            version: 0,
            issued,
            history: History::new(EditorSettings::DEFAULT_HISTORY_DEPTH),
            placeholders: Placeholders::default(),
        })
    }

    pub fn with_placeholders(mut self, placeholders: Placeholders) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history = History::new(depth);
        self
    }

    pub fn placeholder_for(&self, kind: BlockKind) -> &str {
        self.placeholders.for_kind(kind)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id() == id)
    }

    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| block.id() == id)
    }

    /// `None` for an id that is not in the document
    pub fn is_block_empty(&self, id: BlockId) -> Option<bool> {
        self.block(id).map(Block::is_empty)
    }

    /// Total size of the position space
    pub fn content_size(&self) -> usize {
        position::content_size(&self.blocks)
    }

    pub fn resolve(&self, pos: usize) -> Option<ResolvedPos> {
        position::resolve(&self.blocks, pos)
    }

    /// Positions covered by a block, open and close tokens included
    pub fn block_range(&self, id: BlockId) -> Option<Range<usize>> {
        let index = self.index_of(id)?;
        let start = position::block_start(&self.blocks, index);
        Some(start..start + self.blocks[index].size())
    }

    pub fn block_text_start(&self, index: usize) -> usize {
        position::block_text_start(&self.blocks, index)
    }

    pub fn block_text_end(&self, index: usize) -> usize {
        position::block_text_end(&self.blocks, index)
    }

    /// Valid cursor ranges of every text node in order, tagged with the block index
    pub fn text_ranges(&self) -> Vec<(usize, Range<usize>)> {
        position::text_ranges(&self.blocks)
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Replace the selection; each end is snapped onto the nearest text position.
    /// Returns the selection actually stored.
    pub fn set_selection(&mut self, selection: Selection) -> Selection {
        self.selection = self.clamp_selection(selection);
        self.selection
    }

    /// Block containing the head of the selection
    pub fn focused_block(&self) -> Option<BlockId> {
        self.resolve(self.selection.from)
            .map(|resolved| self.blocks[resolved.block_index].id())
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Text of every block, blocks separated by blank lines
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::plain_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Apply a command as a single atomic transaction.
    ///
    /// On success the version is bumped, the selection is either the one the
    /// command chose or the old one mapped through the edit, and the prior
    /// state is pushed to the undo stack.
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, EditError> {
        let mut tr = Transaction::new(&self.blocks);
        commands::compile(self, &mut tr, &cmd)?;
        if tr.is_empty() {
            return Err(EditError::Unchanged);
        }
        let committed = tr.finish();

        if let Some(id) = committed.inserted.iter().find(|id| self.issued.contains(*id)) {
            log::error!("refusing to commit reused block id {id}");
            return Err(EditError::DuplicateBlockId(*id));
        }

        let selection = committed
            .selection
            .unwrap_or_else(|| committed.mapping.map_selection(self.selection));
        let previous = std::mem::replace(&mut self.blocks, committed.blocks);
        self.history.record(HistoryEntry {
            blocks: previous,
            selection: self.selection,
        });
        self.issued.extend(committed.inserted);
        self.selection = self.clamp_selection(selection);
        self.version += 1;

        log::trace!("applied {cmd:?} -> version {}", self.version);
        Ok(Patch {
            changed: committed.changed,
            new_selection: self.selection,
            version: self.version,
            focus: committed.focus.or_else(|| self.focused_block()),
        })
    }

    pub fn can_undo(&self) -> bool {
        !self.history.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.history.redo.is_empty()
    }

    /// Restore the state before the last committed transaction
    pub fn undo(&mut self) -> Option<Patch> {
        let entry = self.history.undo.pop()?;
        let current = self.swap_in(entry);
        self.history.redo.push(current);
        Some(self.restored_patch())
    }

    pub fn redo(&mut self) -> Option<Patch> {
        let entry = self.history.redo.pop()?;
        let current = self.swap_in(entry);
        self.history.undo.push(current);
        Some(self.restored_patch())
    }

    fn swap_in(&mut self, entry: HistoryEntry) -> HistoryEntry {
        let current = HistoryEntry {
            blocks: std::mem::replace(&mut self.blocks, entry.blocks),
            selection: self.selection,
        };
        self.selection = self.clamp_selection(entry.selection);
        self.version += 1;
        current
    }

    fn restored_patch(&self) -> Patch {
        Patch {
            changed: self.blocks.iter().map(Block::id).collect(),
            new_selection: self.selection,
            version: self.version,
            focus: self.focused_block(),
        }
    }

    fn clamp_selection(&self, selection: Selection) -> Selection {
        Selection::new(
            position::nearest_text_pos(&self.blocks, selection.from),
            position::nearest_text_pos(&self.blocks, selection.to),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::Node;
    use pretty_assertions::assert_eq;

    // ============ Construction ============

    #[test]
    fn test_new_document_has_one_empty_block() {
        let doc = Document::new();
        assert_eq!(doc.block_count(), 1);
        assert!(doc.blocks()[0].is_empty());
        assert_eq!(doc.selection(), Selection::cursor(2));
        assert_eq!(doc.focused_block(), Some(doc.blocks()[0].id()));
    }

    #[test]
    fn test_from_settings_seeds_blocks() {
        let settings = EditorSettings {
            seed_blocks: vec![BlockKind::Title, BlockKind::Content],
            ..EditorSettings::default()
        };
        let doc = Document::from_settings(&settings);
        let kinds: Vec<BlockKind> = doc.iter().map(Block::kind).collect();
        assert_eq!(kinds, vec![BlockKind::Title, BlockKind::Content]);
        assert_eq!(doc.blocks()[0].placeholder(), "Untitled lesson");
    }

    #[test]
    fn test_from_settings_with_no_seed_blocks_still_has_one() {
        let settings = EditorSettings {
            seed_blocks: vec![],
            ..EditorSettings::default()
        };
        assert_eq!(Document::from_settings(&settings).block_count(), 1);
    }

    #[test]
    fn test_from_blocks_rejects_empty_and_duplicates() {
        assert_eq!(
            Document::from_blocks(vec![]).unwrap_err(),
            EditError::EmptyDocument
        );
        let block = Block::new(BlockKind::Content, "");
        let id = block.id();
        assert_eq!(
            Document::from_blocks(vec![block.clone(), block]).unwrap_err(),
            EditError::DuplicateBlockId(id)
        );
    }

    #[test]
    fn test_set_selection_snaps_to_text() {
        let mut doc = Document::new();
        assert_eq!(doc.set_selection(Selection::cursor(0)), Selection::cursor(2));
        assert_eq!(doc.set_selection(Selection::cursor(50)), Selection::cursor(2));
    }

    // ============ Atomic commit ============

    #[test]
    fn test_failed_command_keeps_version_and_blocks() {
        let mut doc = Document::new();
        let before = doc.blocks().to_vec();
        assert!(doc.apply(Cmd::insert_text(0, "x")).is_err());
        assert_eq!(doc.version(), 0);
        assert_eq!(doc.blocks(), before.as_slice());
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_block_ids_are_never_reissued() {
        let mut doc = Document::new();
        let mut seen: HashSet<BlockId> = doc.iter().map(Block::id).collect();
        for _ in 0..20 {
            let at = doc.selection().from;
            doc.apply(Cmd::SplitBlock { at }).unwrap();
            let newest = doc.focused_block().unwrap();
            assert!(seen.insert(newest));
            let id = doc.blocks()[0].id();
            if doc.block_count() > 3 {
                doc.apply(Cmd::RemoveBlock { block: id }).unwrap();
            }
        }
    }

    // ============ History ============

    #[test]
    fn test_undo_restores_previous_transaction() {
        let mut doc = Document::new();
        doc.apply(Cmd::insert_text(2, "Hello")).unwrap();
        doc.apply(Cmd::SplitBlock { at: 7 }).unwrap();
        assert_eq!(doc.block_count(), 2);

        doc.undo().unwrap();
        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.plain_text(), "Hello");
        assert_eq!(doc.selection(), Selection::cursor(7));

        doc.undo().unwrap();
        assert_eq!(doc.plain_text(), "");
        assert!(doc.undo().is_none());

        doc.redo().unwrap();
        doc.redo().unwrap();
        assert_eq!(doc.block_count(), 2);
        assert!(!doc.can_redo());
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut doc = Document::new();
        doc.apply(Cmd::insert_text(2, "a")).unwrap();
        doc.undo().unwrap();
        assert!(doc.can_redo());
        doc.apply(Cmd::insert_text(2, "b")).unwrap();
        assert!(!doc.can_redo());
    }

    #[test]
    fn test_history_depth_is_bounded() {
        let mut doc = Document::new().with_history_depth(2);
        for _ in 0..5 {
            doc.apply(Cmd::insert_text(2, "x")).unwrap();
        }
        assert!(doc.undo().is_some());
        assert!(doc.undo().is_some());
        assert!(doc.undo().is_none());
        assert_eq!(doc.plain_text(), "xxx");
    }

    #[test]
    fn test_undo_bumps_version() {
        let mut doc = Document::new();
        doc.apply(Cmd::insert_text(2, "a")).unwrap();
        let patch = doc.undo().unwrap();
        assert_eq!(patch.version, 2);
        assert_eq!(doc.version(), 2);
    }

    #[test]
    fn test_block_range_covers_tokens() {
        let doc = Document::from_blocks(vec![
            Block::with_content(BlockKind::Content, "", vec![Node::paragraph("ab")]),
            Block::with_content(BlockKind::Content, "", vec![Node::Divider]),
        ])
        .unwrap();
        let second = doc.blocks()[1].id();
        assert_eq!(doc.block_range(second), Some(6..9));
    }
}
