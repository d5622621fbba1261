use crate::editing::{BlockId, Selection};

/// Result of applying a command
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Blocks whose content or position changed and still exist
    pub changed: Vec<BlockId>,
    pub new_selection: Selection,
    pub version: u64,
    /// Block that should receive focus after the edit
    pub focus: Option<BlockId>,
}
