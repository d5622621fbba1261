use crate::editing::BlockId;

/// Reasons a command leaves the document untouched.
///
/// Every variant except [`EditError::DuplicateBlockId`] is an ordinary
/// "not applicable here" outcome: the document is unchanged and the caller is
/// expected to carry on as if nothing happened.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("position {pos} is not inside a block")]
    NotInBlock { pos: usize },
    #[error("position {pos} is not inside a text node")]
    NotInText { pos: usize },
    #[error("range {start}..{end} does not lie within a single text node")]
    InvalidRange { start: usize, end: usize },
    #[error("offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },
    #[error("cannot remove the last remaining block")]
    LastBlock,
    #[error("no previous block to move focus into")]
    NoPreviousBlock,
    #[error("cursor is not at the start of an empty paragraph")]
    NotAtEmptyParagraphStart,
    #[error("unknown block {0}")]
    UnknownBlock(BlockId),
    #[error("cannot move block {0} onto itself")]
    MoveOntoSelf(BlockId),
    #[error("move leaves block order unchanged")]
    NoMovement,
    #[error("command changes nothing")]
    Unchanged,
    #[error("a document needs at least one block")]
    EmptyDocument,
    #[error("block id {0} is already in use")]
    DuplicateBlockId(BlockId),
    #[error("heading level {0} is outside 1..=6")]
    InvalidHeadingLevel(u8),
}

impl EditError {
    /// True when the error signals a broken model invariant rather than a
    /// rejected gesture.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, EditError::DuplicateBlockId(_))
    }
}
