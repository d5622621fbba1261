/*!
 * # Editing Core Module
 *
 * The document model and every operation that mutates it.
 *
 * ## Architecture Overview
 *
 * ### 1. Blocks hold rich content
 * - A document is an ordered, never-empty list of **`Block`**s with stable ids
 * - Each block holds rich-text **`Node`**s: text nodes (paragraph, heading,
 *   list item, quote, code) backed by an **`xi_rope::Rope`**, plus atoms
 *   (image, divider)
 * - Inline marks are spans carried through rope deltas with xi-rope's
 *   `Transformer`, so formatting follows the text it was applied to
 *
 * ### 2. One position space
 * - Blocks and nodes are laid out in a single linear position space, one
 *   position per UTF-8 byte plus open and close tokens for every block and
 *   text node
 * - A **`Selection`** is a pair of positions, never a reference into a
 *   rendering tree
 *
 * ### 3. Command-based editing
 * - All edits are **Commands** (`Cmd`) compiled into steps on a transaction
 *   over a draft of the block list
 * - Each step records how positions shift; the selection is mapped through
 *   those maps unless the command places it explicitly
 * - The draft is swapped in as one commit, or dropped when any step fails
 * - Every commit is one undo entry
 *
 * ### 4. Read API: immutable snapshots
 * - **`Snapshot`**s contain **`RenderBlock`**s with stable ids, ranges,
 *   placeholder and delete-control flags and inline runs
 *
 * ## Module Structure
 *
 * - **`document`**: `Document`, selection handling, commit and history
 * - **`commands`**: `Cmd` enum and compilation of text and node edits
 * - **`lifecycle`**: split, delete, insert, remove and move of whole blocks
 * - **`transaction`**: draft, steps and position mapping
 * - **`position`**: resolving positions to blocks and text nodes
 * - **`snapshot`**: render view for frontends
 */

pub mod block;
pub mod commands;
pub mod document;
pub mod error;
pub mod lifecycle;
pub mod node;
pub mod patch;
pub mod position;
pub mod snapshot;
pub(crate) mod transaction;

pub use block::{Block, BlockId, BlockKind};
pub use commands::Cmd;
pub use document::{Document, Placeholders};
pub use error::EditError;
pub use lifecycle::DropSide;
pub use node::{Mark, MarkSpan, Node, Run, TextBlock, TextKind};
pub use patch::Patch;
pub use position::{ResolvedPos, Selection, TextPos};
pub use snapshot::{NodeGroup, RenderBlock, RenderNode, Snapshot};
