use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::editing::Node;

/// Unique identifier for a block.
///
/// Generated as a UUIDv7: a millisecond timestamp followed by random bits, so
/// ids are unique in practice and sort roughly by creation time.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub Uuid);

impl BlockId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a block within a lesson. Only the default placeholder depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Title,
    Content,
}

impl BlockKind {
    pub fn default_placeholder(&self) -> &'static str {
        match self {
            BlockKind::Title => "Untitled lesson",
            BlockKind::Content => "Type '/' for commands",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BlockKind::Title => "title",
            BlockKind::Content => "content",
        }
    }
}

/// Independently addressable, reorderable unit of a lesson document
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    id: BlockId,
    kind: BlockKind,
    placeholder: String,
    content: Vec<Node>,
}

impl Block {
    /// New block holding a single empty paragraph, with a fresh id
    pub fn new(kind: BlockKind, placeholder: impl Into<String>) -> Self {
        Self::with_content(kind, placeholder, vec![Node::paragraph("")])
    }

    pub fn with_content(kind: BlockKind, placeholder: impl Into<String>, content: Vec<Node>) -> Self {
        Self {
            id: BlockId::generate(),
            kind,
            placeholder: placeholder.into(),
            content,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn content(&self) -> &[Node] {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut Vec<Node> {
        &mut self.content
    }

    /// Empty means no content at all, or exactly one paragraph without text
    pub fn is_empty(&self) -> bool {
        match self.content.as_slice() {
            [] => true,
            [only] => only.is_empty_paragraph(),
            _ => false,
        }
    }

    /// Size of the content between the block's open and close tokens
    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::size).sum()
    }

    /// Size in the linear position space including the block's own tokens
    pub fn size(&self) -> usize {
        self.content_size() + 2
    }

    /// Plain text of all text nodes, one line per node
    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .filter_map(Node::as_text)
            .map(|text| text.text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
