//! Floating formatting toolbar placement.
//!
//! Read-only with respect to the document. Selection changes only schedule a
//! recomputation; the host calls [`ToolbarPositioner::poll`] from its event
//! loop and the position is computed once the debounce interval has passed.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::editing::Selection;
use crate::interaction::{CoordsProvider, Rect};
use crate::settings::ToolbarSettings;

/// Top-left corner of the toolbar in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolbarPosition {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone)]
pub struct ToolbarPositioner {
    settings: ToolbarSettings,
    /// Current non-collapsed selection, `None` while hidden
    selection: Option<Selection>,
    /// Selection the shown position was computed for
    computed_for: Option<Selection>,
    position: Option<ToolbarPosition>,
    pending_since: Option<Instant>,
    formatting_in_progress: bool,
}

impl ToolbarPositioner {
    pub fn new(settings: ToolbarSettings) -> Self {
        Self {
            settings,
            selection: None,
            computed_for: None,
            position: None,
            pending_since: None,
            formatting_in_progress: false,
        }
    }

    pub fn settings(&self) -> &ToolbarSettings {
        &self.settings
    }

    pub fn position(&self) -> Option<ToolbarPosition> {
        self.position
    }

    pub fn is_open(&self) -> bool {
        self.selection.is_some()
    }

    /// Record a selection change. Returns the position to show right now,
    /// which is the previous one until the debounced recomputation runs.
    pub fn on_selection_change(&mut self, selection: Selection, now: Instant) -> Option<ToolbarPosition> {
        if selection.is_collapsed() {
            self.close();
            return None;
        }
        if self.selection == Some(selection) {
            return self.position;
        }
        self.selection = Some(selection);
        let insignificant = self
            .computed_for
            .is_some_and(|last| is_insignificant(&self.settings, last, selection));
        if self.position.is_some() && insignificant {
            return self.position;
        }
        self.pending_since = Some(now);
        self.position
    }

    /// Run the debounced recomputation if it is due
    pub fn poll(&mut self, now: Instant, coords: &dyn CoordsProvider) -> Option<ToolbarPosition> {
        let Some(since) = self.pending_since else {
            return self.position;
        };
        if now.saturating_duration_since(since) < self.settings.debounce() {
            return self.position;
        }
        self.pending_since = None;
        if let Some(selection) = self.selection {
            self.position = Some(self.compute(selection, coords));
            self.computed_for = Some(selection);
        }
        self.position
    }

    fn compute(&self, selection: Selection, coords: &dyn CoordsProvider) -> ToolbarPosition {
        let viewport = coords.viewport();
        let Some(anchor) = coords.coords_at_pos(selection.from) else {
            log::debug!("no coordinates for {}, using fallback toolbar position", selection.from);
            return fallback_position(&self.settings, &viewport);
        };
        let ToolbarSettings {
            width, height, gap, ..
        } = self.settings;

        let mut y = anchor.y - gap - height;
        if y < viewport.y {
            // No room above the selection: drop below its first line
            y = anchor.y + gap;
        }
        ToolbarPosition {
            x: clamp(anchor.x, viewport.x, viewport.right() - width),
            y: clamp(y, viewport.y, viewport.bottom() - height),
        }
    }

    pub fn close(&mut self) {
        self.selection = None;
        self.computed_for = None;
        self.position = None;
        self.pending_since = None;
    }

    pub fn on_escape(&mut self) {
        self.close();
    }

    /// Click outside both the toolbar and the editor. Returns whether it closed.
    pub fn on_click_outside(&mut self) -> bool {
        if self.formatting_in_progress {
            return false;
        }
        let was_open = self.is_open();
        self.close();
        was_open
    }

    pub fn set_formatting_in_progress(&mut self, in_progress: bool) {
        self.formatting_in_progress = in_progress;
    }
}

/// Both ends barely moved and the selection is still short
fn is_insignificant(settings: &ToolbarSettings, last: Selection, next: Selection) -> bool {
    last.from.abs_diff(next.from) <= settings.wiggle
        && last.to.abs_diff(next.to) <= settings.wiggle
        && next.len() < settings.min_length
}

fn fallback_position(settings: &ToolbarSettings, viewport: &Rect) -> ToolbarPosition {
    ToolbarPosition {
        x: clamp(
            viewport.x + (viewport.width - settings.width) / 2.0,
            viewport.x,
            viewport.right() - settings.width,
        ),
        y: clamp(
            viewport.y + settings.gap,
            viewport.y,
            viewport.bottom() - settings.height,
        ),
    }
}

/// Clamp that prefers `min` when the range is inverted (viewport narrower
/// than the toolbar)
fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.min(max).max(min)
}
