/*!
# Editor

The facade a host UI drives. It owns the [`Document`] together with the
interaction sessions around it and routes input to whichever of them owns it:

1. **Slash menu** gets first refusal on arrows, Enter and Escape while a
   session is open.
2. **Keyboard editing** turns the remaining keys into document commands.
3. **Drag reorder** is driven by pointer events and commits through the
   document like any other command.
4. **Toolbar** only observes selection changes and produces coordinates.

After every committed change the serialized HTML is handed to the `on_change`
listener, the slash trigger is re-evaluated and the toolbar is told about the
new selection. View flags (dragging, hover, drop indicator) are merged into
the snapshot here; the document itself never stores them.
*/

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use crate::editing::{
    BlockId, BlockKind, Cmd, Document, DropSide, Mark, Node, Patch, Selection, Snapshot, TextKind,
};
use crate::interaction::{
    BlockLayout, CoordsProvider, DragCoordinator, ImageUploader, SlashCommand, SlashKey,
    SlashObserver, SlashOutcome, SlashRecognizer, ToolbarPosition, ToolbarPositioner,
    default_palette,
};
use crate::io::to_html;
use crate::settings::EditorSettings;

/// Receives the serialized document after every committed change
pub type ChangeListener = Box<dyn FnMut(&str)>;

/// Collaborators and settings injected when building an [`Editor`]
#[derive(Default)]
pub struct EditorOptions {
    pub settings: EditorSettings,
    pub on_change: Option<ChangeListener>,
    pub slash_observer: Option<SlashObserver>,
    pub image_uploader: Option<Arc<dyn ImageUploader>>,
    /// Replaces the built-in slash palette
    pub palette: Option<Vec<SlashCommand>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    Char(char),
    Enter,
    ShiftEnter,
    Backspace,
    Left,
    Right,
    Up,
    Down,
    Escape,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlashMenuItem {
    pub title: String,
    pub description: String,
}

/// What a slash menu needs to draw itself
#[derive(Debug, Clone, PartialEq)]
pub struct SlashMenuView {
    pub query: String,
    pub items: Vec<SlashMenuItem>,
    pub selected_index: usize,
    pub trigger_range: Range<usize>,
}

/// Document snapshot plus the interaction state layered over it
#[derive(Debug, Clone, PartialEq)]
pub struct EditorView {
    pub snapshot: Snapshot,
    pub slash_menu: Option<SlashMenuView>,
    pub toolbar: Option<ToolbarPosition>,
}

pub struct Editor {
    doc: Document,
    slash: SlashRecognizer,
    drag: DragCoordinator,
    toolbar: ToolbarPositioner,
    on_change: Option<ChangeListener>,
    focus: Option<BlockId>,
}

impl Editor {
    /// Start from the configured seed blocks
    pub fn new(options: EditorOptions) -> Self {
        let doc = Document::from_settings(&options.settings);
        Self::with_document(doc, options)
    }

    /// Edit an existing document, e.g. an imported lesson. The document's
    /// undo history is reset to the configured depth.
    pub fn with_document(doc: Document, options: EditorOptions) -> Self {
        let EditorOptions {
            settings,
            on_change,
            slash_observer,
            image_uploader,
            palette,
        } = options;

        let palette = palette.unwrap_or_else(|| default_palette(image_uploader));
        let mut slash = SlashRecognizer::new(palette, settings.slash_lookback);
        if let Some(observer) = slash_observer {
            slash = slash.with_observer(observer);
        }
        let doc = doc.with_history_depth(settings.history_depth);
        let focus = doc.focused_block();

        Self {
            doc,
            slash,
            drag: DragCoordinator::new(),
            toolbar: ToolbarPositioner::new(settings.toolbar.clone()),
            on_change,
            focus,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn focus(&self) -> Option<BlockId> {
        self.focus
    }

    pub fn slash(&self) -> &SlashRecognizer {
        &self.slash
    }

    pub fn drag(&self) -> &DragCoordinator {
        &self.drag
    }

    pub fn toolbar(&self) -> &ToolbarPositioner {
        &self.toolbar
    }

    /// Route a key press. Returns whether the key was used.
    pub fn handle_key(&mut self, key: EditorKey, now: Instant) -> bool {
        if let Some(slash_key) = slash_key(key) {
            match self.slash.handle_key(slash_key, &self.doc) {
                SlashOutcome::NotHandled => {}
                SlashOutcome::Consumed | SlashOutcome::Closed => return true,
                SlashOutcome::Execute(cmd) => {
                    self.apply(cmd, now);
                    return true;
                }
            }
        }

        let selection = self.doc.selection();
        match key {
            EditorKey::Char(c) => self.type_text(&c.to_string(), now),
            EditorKey::ShiftEnter => self.type_text("\n", now),
            EditorKey::Enter => self
                .apply(Cmd::SplitBlock { at: selection.from }, now)
                .is_some(),
            EditorKey::Backspace => self.backspace(now),
            EditorKey::Left => self.move_caret(selection.from, Caret::PrevChar, now),
            EditorKey::Right => self.move_caret(selection.to, Caret::NextChar, now),
            EditorKey::Up => self.move_caret(selection.from, Caret::PrevNode, now),
            EditorKey::Down => self.move_caret(selection.to, Caret::NextNode, now),
            EditorKey::Escape => {
                let was_busy = self.drag.is_active() || self.toolbar.is_open();
                self.slash.cancel();
                self.drag.on_drag_cancel();
                self.toolbar.on_escape();
                was_busy
            }
        }
    }

    fn type_text(&mut self, text: &str, now: Instant) -> bool {
        let selection = self.doc.selection();
        let cmd = if selection.is_collapsed() {
            Cmd::insert_text(selection.from, text)
        } else {
            Cmd::ReplaceRange {
                range: selection.range(),
                text: text.to_string(),
            }
        };
        self.apply(cmd, now).is_some()
    }

    fn backspace(&mut self, now: Instant) -> bool {
        let selection = self.doc.selection();
        if !selection.is_collapsed() {
            return self
                .apply(Cmd::DeleteRange { range: selection.range() }, now)
                .is_some();
        }
        let Some((text, offset)) = self.caret_text(selection.from) else {
            return false;
        };
        if text.is_empty() && offset == 0 {
            return self
                .apply(Cmd::DeleteBlock { at: selection.from }, now)
                .is_some();
        }
        match prev_boundary(&text, offset) {
            Some(prev) => {
                let at = selection.from;
                self.apply(Cmd::DeleteRange { range: at - (offset - prev)..at }, now)
                    .is_some()
            }
            None => false,
        }
    }

    fn move_caret(&mut self, from: usize, caret: Caret, now: Instant) -> bool {
        let Some(target) = self.caret_target(from, caret) else {
            return false;
        };
        let moved = self.set_selection(Selection::cursor(target), now);
        moved.from != from || !self.doc.selection().is_collapsed()
    }

    /// Shift+arrow: move the selection's end by one character, keeping its start
    pub fn extend_selection(&mut self, forward: bool, now: Instant) -> bool {
        let selection = self.doc.selection();
        let caret = if forward { Caret::NextChar } else { Caret::PrevChar };
        let Some(target) = self.caret_target(selection.to, caret) else {
            return false;
        };
        self.set_selection(Selection::new(selection.from, target), now) != selection
    }

    fn caret_target(&self, pos: usize, caret: Caret) -> Option<usize> {
        let ranges = self.doc.text_ranges();
        let current = ranges
            .iter()
            .position(|(_, range)| range.start <= pos && pos <= range.end)?;
        let (text, offset) = self.caret_text(pos)?;
        match caret {
            Caret::PrevChar => match prev_boundary(&text, offset) {
                Some(prev) => Some(pos - (offset - prev)),
                None => current.checked_sub(1).map(|index| ranges[index].1.end),
            },
            Caret::NextChar => match next_boundary(&text, offset) {
                Some(next) => Some(pos + (next - offset)),
                None => ranges.get(current + 1).map(|(_, range)| range.start),
            },
            Caret::PrevNode => current.checked_sub(1).map(|index| ranges[index].1.end),
            Caret::NextNode => ranges.get(current + 1).map(|(_, range)| range.start),
        }
    }

    /// Text of the node holding `pos` and the byte offset of `pos` in it
    fn caret_text(&self, pos: usize) -> Option<(String, usize)> {
        let resolved = self.doc.resolve(pos)?;
        let text_pos = resolved.text?;
        let node = self.doc.blocks()[resolved.block_index]
            .content()
            .get(text_pos.node_index)?
            .as_text()?;
        Some((node.text(), text_pos.offset))
    }

    /// Move the selection without editing. The stored selection is snapped
    /// onto text positions and returned.
    pub fn set_selection(&mut self, selection: Selection, now: Instant) -> Selection {
        let selection = self.doc.set_selection(selection);
        self.focus = self.doc.focused_block();
        self.slash.sync(&self.doc);
        self.toolbar.on_selection_change(selection, now);
        selection
    }

    /// Toggle a mark over the current selection
    pub fn toggle_mark(&mut self, mark: Mark, now: Instant) -> Option<Patch> {
        let range = self.doc.selection().range();
        self.apply(Cmd::ToggleMark { range, mark }, now)
    }

    pub fn set_text_kind(&mut self, kind: TextKind, now: Instant) -> Option<Patch> {
        let range = self.doc.selection().range();
        self.apply(Cmd::SetTextKind { range, kind }, now)
    }

    /// The "+" button next to a block
    pub fn add_block_after(&mut self, block: BlockId, now: Instant) -> Option<Patch> {
        self.apply(
            Cmd::InsertBlockAfter {
                block,
                kind: BlockKind::Content,
            },
            now,
        )
    }

    /// The delete button on an empty block
    pub fn delete_block(&mut self, block: BlockId, now: Instant) -> Option<Patch> {
        self.apply(Cmd::RemoveBlock { block }, now)
    }

    /// Replace a block's content with an accepted suggestion
    pub fn accept_suggestion(&mut self, block: BlockId, content: Vec<Node>, now: Instant) -> Option<Patch> {
        self.apply(Cmd::SetBlockContent { block, content }, now)
    }

    /// Starting a drag closes any open slash menu
    pub fn drag_start(&mut self, block: BlockId) -> bool {
        self.slash.cancel();
        self.drag.on_drag_start(&self.doc, block)
    }

    pub fn drag_over(&mut self, pointer_y: f32, hovered: BlockId, layout: &dyn BlockLayout) -> Option<DropSide> {
        self.drag.on_drag_over(pointer_y, hovered, layout)
    }

    pub fn drop(&mut self, now: Instant) -> Option<Patch> {
        let patch = self.drag.on_drop(&mut self.doc)?;
        self.after_commit(&patch, now);
        Some(patch)
    }

    pub fn drag_cancel(&mut self) {
        self.drag.on_drag_cancel();
    }

    /// A click outside both the editor and the toolbar. Ends any slash or
    /// drag session; the toolbar stays up while formatting is in progress.
    /// Returns whether anything closed.
    pub fn click_outside(&mut self) -> bool {
        let had_session = self.slash.is_active() || self.drag.is_active();
        self.slash.cancel();
        self.drag.on_drag_cancel();
        let toolbar_closed = self.toolbar.on_click_outside();
        had_session || toolbar_closed
    }

    pub fn poll_toolbar(&mut self, now: Instant, coords: &dyn CoordsProvider) -> Option<ToolbarPosition> {
        self.toolbar.poll(now, coords)
    }

    pub fn set_formatting_in_progress(&mut self, in_progress: bool) {
        self.toolbar.set_formatting_in_progress(in_progress);
    }

    pub fn undo(&mut self, now: Instant) -> Option<Patch> {
        let patch = self.doc.undo()?;
        self.after_commit(&patch, now);
        Some(patch)
    }

    pub fn redo(&mut self, now: Instant) -> Option<Patch> {
        let patch = self.doc.redo()?;
        self.after_commit(&patch, now);
        Some(patch)
    }

    pub fn html(&self) -> String {
        to_html(&self.doc)
    }

    pub fn snapshot(&self) -> EditorView {
        let mut snapshot = self.doc.snapshot();
        if let Some(session) = self.drag.session() {
            for block in &mut snapshot.blocks {
                block.is_dragging = block.id == session.dragged;
                block.is_hovered = session.hovered == Some(block.id);
                if block.is_hovered && !block.is_dragging {
                    block.drop_indicator = session.drop_side;
                }
            }
        }
        for block in &mut snapshot.blocks {
            block.is_focused = self.focus == Some(block.id);
        }

        let slash_menu = self.slash.session().map(|session| SlashMenuView {
            query: session.query.clone(),
            items: session
                .filtered_commands
                .iter()
                .map(|command| SlashMenuItem {
                    title: command.title.clone(),
                    description: command.description.clone(),
                })
                .collect(),
            selected_index: session.selected_index,
            trigger_range: session.trigger_range.clone(),
        });

        EditorView {
            snapshot,
            slash_menu,
            toolbar: self.toolbar.position(),
        }
    }

    fn apply(&mut self, cmd: Cmd, now: Instant) -> Option<Patch> {
        match self.doc.apply(cmd) {
            Ok(patch) => {
                self.after_commit(&patch, now);
                Some(patch)
            }
            Err(err) if err.is_invariant_violation() => {
                log::error!("edit rejected: {err}");
                None
            }
            Err(err) => {
                log::debug!("edit not applicable: {err}");
                None
            }
        }
    }

    fn after_commit(&mut self, patch: &Patch, now: Instant) {
        self.focus = patch.focus;
        if let Some(on_change) = self.on_change.as_mut() {
            on_change(&to_html(&self.doc));
        }

        let slash_was_open = self.slash.is_active();
        self.slash.sync(&self.doc);
        if !slash_was_open && self.slash.is_active() {
            self.drag.on_drag_cancel();
        }
        self.toolbar.on_selection_change(patch.new_selection, now);
    }
}

#[derive(Debug, Clone, Copy)]
enum Caret {
    PrevChar,
    NextChar,
    PrevNode,
    NextNode,
}

fn slash_key(key: EditorKey) -> Option<SlashKey> {
    match key {
        EditorKey::Up => Some(SlashKey::Up),
        EditorKey::Down => Some(SlashKey::Down),
        EditorKey::Enter => Some(SlashKey::Enter),
        EditorKey::Escape => Some(SlashKey::Escape),
        _ => None,
    }
}

fn prev_boundary(text: &str, offset: usize) -> Option<usize> {
    text.get(..offset)?.char_indices().next_back().map(|(index, _)| index)
}

fn next_boundary(text: &str, offset: usize) -> Option<usize> {
    text.get(offset..)?.chars().next().map(|c| offset + c.len_utf8())
}
