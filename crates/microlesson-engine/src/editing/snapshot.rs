use std::ops::Range;

use crate::editing::{Block, BlockId, BlockKind, Document, DropSide, Node, Run, Selection, TextKind};

/// Immutable view of a document for rendering.
///
/// Frontends draw from snapshots and never touch blocks directly. Interaction
/// state (drag highlight, hover, drop indicator) lives outside the document;
/// the editor fills those flags in before handing a snapshot out.
///
/// ```rust
/// # use microlesson_engine::editing::{Cmd, Document};
/// let mut doc = Document::new();
/// doc.apply(Cmd::insert_text(2, "Hello")).unwrap();
/// let snapshot = doc.snapshot();
/// assert_eq!(snapshot.blocks.len(), 1);
/// assert!(!snapshot.blocks[0].show_placeholder);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub version: u64,
    pub selection: Selection,
    pub blocks: Vec<RenderBlock>,
}

/// Render information for one block
#[derive(Debug, Clone, PartialEq)]
pub struct RenderBlock {
    pub id: BlockId,
    pub kind: BlockKind,
    pub placeholder: String,
    /// Positions covered by the block including its open and close tokens
    pub range: Range<usize>,
    pub is_empty: bool,
    pub show_placeholder: bool,
    /// Whether the delete control is offered: empty and not the only block
    pub can_delete: bool,
    pub is_focused: bool,
    pub is_dragging: bool,
    pub is_hovered: bool,
    pub drop_indicator: Option<DropSide>,
    pub nodes: Vec<RenderNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    Text {
        kind: TextKind,
        /// Valid cursor positions inside the node
        content_range: Range<usize>,
        runs: Vec<Run>,
    },
    Image {
        src: String,
        alt: String,
    },
    Divider,
}

/// Nodes grouped for structured output: consecutive list items of the same
/// flavour become one list
#[derive(Debug, Clone, PartialEq)]
pub enum NodeGroup<'a> {
    Single(&'a RenderNode),
    List {
        ordered: bool,
        items: Vec<&'a RenderNode>,
    },
}

impl RenderBlock {
    pub fn groups(&self) -> Vec<NodeGroup<'_>> {
        let mut groups: Vec<NodeGroup<'_>> = Vec::new();
        for node in &self.nodes {
            let list = match node {
                RenderNode::Text {
                    kind: TextKind::ListItem { ordered },
                    ..
                } => Some(*ordered),
                _ => None,
            };
            match (list, groups.last_mut()) {
                (
                    Some(ordered),
                    Some(NodeGroup::List {
                        ordered: current,
                        items,
                    }),
                ) if *current == ordered => items.push(node),
                (Some(ordered), _) => groups.push(NodeGroup::List {
                    ordered,
                    items: vec![node],
                }),
                (None, _) => groups.push(NodeGroup::Single(node)),
            }
        }
        groups
    }
}

impl Document {
    pub fn snapshot(&self) -> Snapshot {
        let focused = self.focused_block();
        let deletable = self.block_count() > 1;
        let mut start = 0;
        let blocks = self
            .blocks()
            .iter()
            .map(|block| {
                let render = render_block(block, start, focused == Some(block.id()), deletable);
                start += block.size();
                render
            })
            .collect();
        Snapshot {
            version: self.version(),
            selection: self.selection(),
            blocks,
        }
    }
}

fn render_block(block: &Block, start: usize, is_focused: bool, deletable: bool) -> RenderBlock {
    let is_empty = block.is_empty();
    let mut node_pos = start + 1;
    let nodes = block
        .content()
        .iter()
        .map(|node| {
            let render = match node {
                Node::Text(text) => RenderNode::Text {
                    kind: text.kind(),
                    content_range: node_pos + 1..node_pos + 1 + text.len(),
                    runs: text.runs(),
                },
                Node::Image { src, alt } => RenderNode::Image {
                    src: src.clone(),
                    alt: alt.clone(),
                },
                Node::Divider => RenderNode::Divider,
            };
            node_pos += node.size();
            render
        })
        .collect();
    debug_assert_eq!(node_pos + 1, start + block.size());

    RenderBlock {
        id: block.id(),
        kind: block.kind(),
        placeholder: block.placeholder().to_string(),
        range: start..start + block.size(),
        is_empty,
        show_placeholder: is_empty,
        can_delete: is_empty && deletable,
        is_focused,
        is_dragging: false,
        is_hovered: false,
        drop_indicator: None,
        nodes,
    }
}

impl Snapshot {
    pub fn block(&self, id: BlockId) -> Option<&RenderBlock> {
        self.blocks.iter().find(|block| block.id == id)
    }

    /// Block index and text node holding `pos`, for cursor rendering
    pub fn locate(&self, pos: usize) -> Option<(usize, &RenderNode)> {
        self.blocks.iter().enumerate().find_map(|(index, block)| {
            block
                .nodes
                .iter()
                .find(|node| {
                    matches!(node, RenderNode::Text { content_range, .. }
                        if content_range.contains(&pos) || content_range.end == pos)
                })
                .map(|node| (index, node))
        })
    }
}
