pub mod editing;
pub mod editor;
pub mod interaction;
pub mod io;
pub mod settings;


// Re-export key types for easier usage
pub use editing::{Block, BlockId, BlockKind, Cmd, Document, EditError, Node, Patch, Selection, Snapshot};
pub use editor::{Editor, EditorKey, EditorOptions, EditorView};
pub use io::{IoError, parse_lesson, to_html};
pub use settings::{EditorSettings, ToolbarSettings};
