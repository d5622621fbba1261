//! "/" command recognition.
//!
//! A session exists while the text just before the cursor looks like
//! `/query`, with the slash at the start of the text node or after
//! whitespace and no whitespace typed since.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::editing::{BlockId, Cmd, Document};
use crate::interaction::SlashCommand;

static TRIGGER_REGEX: OnceLock<Regex> = OnceLock::new();

/// Called whenever the session opens, changes or closes (`None`)
pub type SlashObserver = Box<dyn FnMut(Option<&SlashSession>)>;

#[derive(Debug, Clone)]
pub struct SlashSession {
    pub block: BlockId,
    /// From the "/" to the cursor
    pub trigger_range: Range<usize>,
    pub query: String,
    /// Palette entries matching the query, in palette order
    pub filtered_commands: Vec<SlashCommand>,
    pub selected_index: usize,
}

impl SlashSession {
    pub fn selected(&self) -> Option<&SlashCommand> {
        self.filtered_commands.get(self.selected_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashKey {
    Up,
    Down,
    Enter,
    Escape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlashOutcome {
    /// No session; the key belongs to the editor
    NotHandled,
    /// Key swallowed by the open session
    Consumed,
    /// The session closed without producing a command
    Closed,
    /// The chosen command, ready to apply; the session is closed
    Execute(Cmd),
}

pub struct SlashRecognizer {
    palette: Vec<SlashCommand>,
    lookback: usize,
    session: Option<SlashSession>,
    observer: Option<SlashObserver>,
}

impl SlashRecognizer {
    pub fn new(palette: Vec<SlashCommand>, lookback: usize) -> Self {
        Self {
            palette,
            lookback,
            session: None,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: SlashObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn palette(&self) -> &[SlashCommand] {
        &self.palette
    }

    pub fn session(&self) -> Option<&SlashSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Re-evaluate the trigger after an edit or cursor move.
    ///
    /// `nearby_text` is the text of the cursor's text node up to the cursor.
    pub fn on_document_change(&mut self, cursor: usize, block: BlockId, nearby_text: &str) {
        let Some((slash, query)) = find_trigger(nearby_text, self.lookback) else {
            self.cancel();
            return;
        };
        let start = cursor - (nearby_text.len() - slash);
        let trigger_range = start..cursor;

        let selected_index = match &self.session {
            Some(session)
                if session.block == block
                    && session.trigger_range.start == start
                    && session.query == query =>
            {
                session.selected_index
            }
            _ => 0,
        };
        let filtered_commands: Vec<SlashCommand> = self
            .palette
            .iter()
            .filter(|command| command.matches(query))
            .cloned()
            .collect();
        if self.session.is_none() {
            log::debug!("slash session opened at {start}");
        }
        self.session = Some(SlashSession {
            block,
            trigger_range,
            query: query.to_string(),
            filtered_commands,
            selected_index,
        });
        self.notify();
    }

    /// Convenience wrapper: derive cursor and nearby text from the document
    pub fn sync(&mut self, doc: &Document) {
        let selection = doc.selection();
        if !selection.is_collapsed() {
            self.cancel();
            return;
        }
        match text_before_cursor(doc, selection.from) {
            Some((block, text)) => self.on_document_change(selection.from, block, &text),
            None => self.cancel(),
        }
    }

    pub fn handle_key(&mut self, key: SlashKey, doc: &Document) -> SlashOutcome {
        let Some(session) = self.session.as_mut() else {
            return SlashOutcome::NotHandled;
        };
        let count = session.filtered_commands.len();
        match key {
            SlashKey::Escape => {
                self.cancel();
                SlashOutcome::Closed
            }
            SlashKey::Up | SlashKey::Down if count == 0 => SlashOutcome::Consumed,
            SlashKey::Down => {
                session.selected_index = (session.selected_index + 1) % count;
                self.notify();
                SlashOutcome::Consumed
            }
            SlashKey::Up => {
                session.selected_index = (session.selected_index + count - 1) % count;
                self.notify();
                SlashOutcome::Consumed
            }
            SlashKey::Enter if count == 0 => SlashOutcome::Consumed,
            SlashKey::Enter => self.execute(doc),
        }
    }

    fn execute(&mut self, doc: &Document) -> SlashOutcome {
        let Some(session) = self.session.take() else {
            return SlashOutcome::NotHandled;
        };
        self.notify();
        if !trigger_is_live(doc, &session) {
            log::debug!("slash session at {:?} went stale", session.trigger_range);
            return SlashOutcome::Closed;
        }
        let Some(command) = session.selected() else {
            return SlashOutcome::Closed;
        };
        log::debug!("running slash command {}", command.title);
        match (command.apply)(doc, session.trigger_range.clone()) {
            Some(cmd) => SlashOutcome::Execute(cmd),
            None => SlashOutcome::Closed,
        }
    }

    /// Close the session; safe to call when none is open
    pub fn cancel(&mut self) {
        if self.session.take().is_some() {
            log::debug!("slash session closed");
            self.notify();
        }
    }

    fn notify(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            observer(self.session.as_ref());
        }
    }
}

impl std::fmt::Debug for SlashRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlashRecognizer")
            .field("lookback", &self.lookback)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Byte offset of the triggering "/" and the query typed after it
fn find_trigger(text: &str, lookback: usize) -> Option<(usize, &str)> {
    let regex = TRIGGER_REGEX
        .get_or_init(|| Regex::new(r"(?:^|\s)/([^\s/]*)$").expect("Invalid slash trigger regex"));

    let window_start = text
        .char_indices()
        .rev()
        .nth(lookback.saturating_sub(1))
        .map(|(index, _)| index)
        .unwrap_or(0);
    // One extra character so the whitespace before a slash at the window edge is visible
    let scan_start = text[..window_start]
        .char_indices()
        .next_back()
        .map(|(index, _)| index)
        .unwrap_or(window_start);

    let captures = regex.captures(&text[scan_start..])?;
    let query = captures.get(1)?;
    let slash = scan_start + query.start() - 1;
    if slash < window_start {
        return None;
    }
    Some((slash, query.as_str()))
}

/// Block and text of the cursor's text node before the cursor
fn text_before_cursor(doc: &Document, cursor: usize) -> Option<(BlockId, String)> {
    let resolved = doc.resolve(cursor)?;
    let text_pos = resolved.text?;
    let block = &doc.blocks()[resolved.block_index];
    let text = block.content()[text_pos.node_index].as_text()?.text();
    let before = text.get(..text_pos.offset)?.to_string();
    Some((block.id(), before))
}

fn trigger_is_live(doc: &Document, session: &SlashSession) -> bool {
    let range = &session.trigger_range;
    text_before_cursor(doc, range.end).is_some_and(|(block, text)| {
        let len = range.end - range.start;
        block == session.block
            && text.len() >= len
            && text
                .get(text.len() - len..)
                .is_some_and(|tail| tail.starts_with('/'))
    })
}
