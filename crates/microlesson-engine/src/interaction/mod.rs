//! Interaction components that sit around the document: drag reordering,
//! slash commands and the selection toolbar. Each keeps its own session
//! state; only drag drops and slash commands ever produce document commands.

pub mod drag;
pub mod geometry;
pub mod palette;
pub mod slash;
pub mod toolbar;

pub use drag::{BlockLayout, DragCoordinator, DragSession, drop_side};
pub use geometry::{CoordsProvider, Point, Rect};
pub use palette::{ImageUploader, SlashAction, SlashCommand, UploadError, default_palette};
pub use slash::{SlashKey, SlashObserver, SlashOutcome, SlashRecognizer, SlashSession};
pub use toolbar::{ToolbarPosition, ToolbarPositioner};
