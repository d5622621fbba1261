//! Drag-to-reorder sessions.
//!
//! The coordinator only tracks the gesture. Nothing touches the document until
//! the drop, which commits a single `Cmd::MoveBlock`.

use crate::editing::{BlockId, Cmd, Document, DropSide, Patch};
use crate::interaction::Rect;

/// Block geometry as laid out by the rendering surface
pub trait BlockLayout {
    fn block_rect(&self, id: BlockId) -> Option<Rect>;
}

/// Upper half of the hovered block drops above it, lower half below
pub fn drop_side(pointer_y: f32, rect: &Rect) -> DropSide {
    if pointer_y < rect.mid_y() {
        DropSide::Above
    } else {
        DropSide::Below
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub dragged: BlockId,
    pub pointer_y: Option<f32>,
    pub hovered: Option<BlockId>,
    pub drop_side: Option<DropSide>,
}

#[derive(Debug, Default)]
pub struct DragCoordinator {
    session: Option<DragSession>,
}

impl DragCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Start dragging `id`. Unknown ids start nothing.
    pub fn on_drag_start(&mut self, doc: &Document, id: BlockId) -> bool {
        if doc.block(id).is_none() {
            log::debug!("drag start on unknown block {id}");
            self.session = None;
            return false;
        }
        log::trace!("drag start {id}");
        self.session = Some(DragSession {
            dragged: id,
            pointer_y: None,
            hovered: None,
            drop_side: None,
        });
        true
    }

    /// Track the pointer over `hovered`; returns the side the block would land on
    pub fn on_drag_over(
        &mut self,
        pointer_y: f32,
        hovered: BlockId,
        layout: &dyn BlockLayout,
    ) -> Option<DropSide> {
        let session = self.session.as_mut()?;
        session.pointer_y = Some(pointer_y);
        match layout.block_rect(hovered) {
            Some(rect) => {
                let side = drop_side(pointer_y, &rect);
                session.hovered = Some(hovered);
                session.drop_side = Some(side);
                log::trace!("drag over {hovered} at {pointer_y}: {side:?}");
                Some(side)
            }
            None => {
                session.hovered = None;
                session.drop_side = None;
                None
            }
        }
    }

    /// Commit the move. Ends the session whatever the outcome; a drop that
    /// cannot apply leaves the document untouched.
    pub fn on_drop(&mut self, doc: &mut Document) -> Option<Patch> {
        let session = self.session.take()?;
        let (target, side) = match (session.hovered, session.drop_side) {
            (Some(target), Some(side)) => (target, side),
            _ => {
                log::debug!("drop of {} without a target", session.dragged);
                return None;
            }
        };
        match doc.apply(Cmd::MoveBlock {
            block: session.dragged,
            target,
            side,
        }) {
            Ok(patch) => Some(patch),
            Err(err) => {
                log::debug!("drop of {} aborted: {err}", session.dragged);
                None
            }
        }
    }

    pub fn on_drag_cancel(&mut self) {
        if let Some(session) = self.session.take() {
            log::trace!("drag of {} cancelled", session.dragged);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{Block, BlockKind, Node};
    use std::collections::HashMap;

    struct Layout(HashMap<BlockId, Rect>);

    impl BlockLayout for Layout {
        fn block_rect(&self, id: BlockId) -> Option<Rect> {
            self.0.get(&id).copied()
        }
    }

    fn setup(texts: &[&str]) -> (Document, Layout) {
        let blocks: Vec<Block> = texts
            .iter()
            .map(|text| Block::with_content(BlockKind::Content, "", vec![Node::paragraph(text)]))
            .collect();
        let layout = blocks
            .iter()
            .enumerate()
            .map(|(index, block)| (block.id(), Rect::new(0.0, index as f32 * 50.0, 400.0, 50.0)))
            .collect();
        (Document::from_blocks(blocks).unwrap(), Layout(layout))
    }

    fn texts(doc: &Document) -> Vec<String> {
        doc.iter().map(Block::plain_text).collect()
    }

    #[test]
    fn test_drop_side_uses_midpoint() {
        let rect = Rect::new(0.0, 100.0, 10.0, 40.0);
        assert_eq!(drop_side(119.9, &rect), DropSide::Above);
        assert_eq!(drop_side(120.0, &rect), DropSide::Below);
    }

    #[test]
    fn test_drag_first_below_last() {
        let (mut doc, layout) = setup(&["A", "B", "C"]);
        let a = doc.blocks()[0].id();
        let c = doc.blocks()[2].id();
        let mut drag = DragCoordinator::new();
        assert!(drag.on_drag_start(&doc, a));
        assert_eq!(drag.on_drag_over(140.0, c, &layout), Some(DropSide::Below));
        let patch = drag.on_drop(&mut doc).unwrap();
        assert_eq!(texts(&doc), vec!["B", "C", "A"]);
        assert_eq!(doc.blocks()[2].id(), a);
        assert_eq!(patch.version, 1);
        assert!(!drag.is_active());
    }

    #[test]
    fn test_drag_over_does_not_touch_document() {
        let (doc, layout) = setup(&["A", "B"]);
        let a = doc.blocks()[0].id();
        let b = doc.blocks()[1].id();
        let mut drag = DragCoordinator::new();
        drag.on_drag_start(&doc, a);
        drag.on_drag_over(55.0, b, &layout);
        drag.on_drag_over(95.0, b, &layout);
        assert_eq!(drag.session().unwrap().drop_side, Some(DropSide::Below));
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_cancel_leaves_document_alone() {
        let (mut doc, layout) = setup(&["A", "B"]);
        let a = doc.blocks()[0].id();
        let b = doc.blocks()[1].id();
        let mut drag = DragCoordinator::new();
        drag.on_drag_start(&doc, a);
        drag.on_drag_over(90.0, b, &layout);
        drag.on_drag_cancel();
        drag.on_drag_cancel();
        assert!(drag.on_drop(&mut doc).is_none());
        assert_eq!(texts(&doc), vec!["A", "B"]);
    }

    #[test]
    fn test_drop_onto_self_is_rejected() {
        let (mut doc, layout) = setup(&["A", "B"]);
        let a = doc.blocks()[0].id();
        let mut drag = DragCoordinator::new();
        drag.on_drag_start(&doc, a);
        drag.on_drag_over(10.0, a, &layout);
        assert!(drag.on_drop(&mut doc).is_none());
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_drop_into_same_slot_is_no_transaction() {
        let (mut doc, layout) = setup(&["A", "B"]);
        let a = doc.blocks()[0].id();
        let b = doc.blocks()[1].id();
        let mut drag = DragCoordinator::new();
        drag.on_drag_start(&doc, a);
        drag.on_drag_over(60.0, b, &layout);
        assert!(drag.on_drop(&mut doc).is_none());
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_unresolvable_ids_abort_quietly() {
        let (mut doc, layout) = setup(&["A", "B"]);
        let mut drag = DragCoordinator::new();
        assert!(!drag.on_drag_start(&doc, BlockId::generate()));

        let a = doc.blocks()[0].id();
        drag.on_drag_start(&doc, a);
        assert_eq!(drag.on_drag_over(10.0, BlockId::generate(), &layout), None);
        assert!(drag.on_drop(&mut doc).is_none());
        assert_eq!(doc.version(), 0);
    }
}
