use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::editing::{BlockKind, Placeholders};

/// Tunables of the editor core. Every field has a default so a partial
/// `[editor]` table in a config file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Blocks a fresh document starts with
    pub seed_blocks: Vec<BlockKind>,
    pub title_placeholder: String,
    pub content_placeholder: String,
    /// How many characters before the cursor are searched for a "/" trigger
    pub slash_lookback: usize,
    pub history_depth: usize,
    pub toolbar: ToolbarSettings,
}

impl EditorSettings {
    pub const DEFAULT_HISTORY_DEPTH: usize = 100;
    pub const DEFAULT_SLASH_LOOKBACK: usize = 50;

    pub fn placeholders(&self) -> Placeholders {
        Placeholders {
            title: self.title_placeholder.clone(),
            content: self.content_placeholder.clone(),
        }
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            seed_blocks: vec![BlockKind::Title, BlockKind::Content],
            title_placeholder: BlockKind::Title.default_placeholder().to_string(),
            content_placeholder: BlockKind::Content.default_placeholder().to_string(),
            slash_lookback: Self::DEFAULT_SLASH_LOOKBACK,
            history_depth: Self::DEFAULT_HISTORY_DEPTH,
            toolbar: ToolbarSettings::default(),
        }
    }
}

/// Thresholds and geometry of the selection toolbar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarSettings {
    pub debounce_ms: u64,
    /// Endpoint movement (in positions) still considered the same selection
    pub wiggle: usize,
    /// Selections shorter than this only reposition when they move noticeably
    pub min_length: usize,
    pub width: f32,
    pub height: f32,
    /// Vertical distance between the toolbar and the selection
    pub gap: f32,
}

impl ToolbarSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for ToolbarSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 150,
            wiggle: 2,
            min_length: 5,
            width: 220.0,
            height: 36.0,
            gap: 8.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EditorSettings::default();
        assert_eq!(settings.slash_lookback, 50);
        assert_eq!(settings.history_depth, 100);
        assert_eq!(settings.toolbar.debounce(), Duration::from_millis(150));
        assert_eq!(settings.placeholders().title, "Untitled lesson");
    }
}
