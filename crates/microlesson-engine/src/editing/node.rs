use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use xi_rope::Rope;
use xi_rope::delta::{Builder, Transformer};

use crate::editing::EditError;

/// Inline formatting that can be toggled over a text range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Highlight,
}

impl Mark {
    pub const ALL: [Mark; 6] = [
        Mark::Bold,
        Mark::Italic,
        Mark::Underline,
        Mark::Strike,
        Mark::Code,
        Mark::Highlight,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Underline => "underline",
            Mark::Strike => "strike",
            Mark::Code => "code",
            Mark::Highlight => "highlight",
        }
    }
}

/// A mark applied to a byte range of a text node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkSpan {
    pub mark: Mark,
    pub range: Range<usize>,
}

/// Flavour of a text node. Changing it never changes block structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextKind {
    Paragraph,
    Heading { level: u8 },
    ListItem { ordered: bool },
    Quote,
    Code,
}

impl TextKind {
    pub(crate) fn validate(self) -> Result<Self, EditError> {
        match self {
            TextKind::Heading { level } if !(1..=6).contains(&level) => {
                Err(EditError::InvalidHeadingLevel(level))
            }
            kind => Ok(kind),
        }
    }
}

/// A maximal stretch of text sharing the same marks
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub marks: Vec<Mark>,
}

/// Text node: rope-backed text plus mark spans that follow the text through edits
#[derive(Clone)]
pub struct TextBlock {
    kind: TextKind,
    text: Rope,
    marks: Vec<MarkSpan>,
}

impl TextBlock {
    pub fn new(kind: TextKind) -> Self {
        Self::with_text(kind, "")
    }

    pub fn paragraph(text: &str) -> Self {
        Self::with_text(TextKind::Paragraph, text)
    }

    pub fn with_text(kind: TextKind, text: &str) -> Self {
        Self {
            kind,
            text: Rope::from(text),
            marks: Vec::new(),
        }
    }

    /// Builder-style mark application, used when composing inserted content.
    /// Ranges outside the text are clamped.
    pub fn with_mark(mut self, mark: Mark, range: Range<usize>) -> Self {
        let len = self.len();
        let start = range.start.min(len);
        let end = range.end.min(len).max(start);
        self.marks.push(MarkSpan {
            mark,
            range: start..end,
        });
        self.normalize_marks();
        self
    }

    pub fn kind(&self) -> TextKind {
        self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: TextKind) {
        self.kind = kind;
    }

    /// Length of the text in bytes
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.len() == 0
    }

    pub fn text(&self) -> String {
        self.text.to_string()
    }

    pub fn marks(&self) -> &[MarkSpan] {
        &self.marks
    }

    pub(crate) fn check_boundary(&self, offset: usize) -> Result<(), EditError> {
        if offset > self.len() || !self.text().is_char_boundary(offset) {
            return Err(EditError::NotCharBoundary { offset });
        }
        Ok(())
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), EditError> {
        if range.start > range.end || range.end > self.len() {
            return Err(EditError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        self.check_boundary(range.start)?;
        self.check_boundary(range.end)
    }

    /// Replace a byte range with new text.
    ///
    /// The edit is compiled to a rope delta; mark spans are carried through the
    /// same delta so text typed at a span's end does not inherit the mark.
    pub(crate) fn replace(&mut self, range: Range<usize>, text: &str) -> Result<(), EditError> {
        self.check_range(&range)?;

        let mut builder = Builder::new(self.text.len());
        builder.replace(range, Rope::from(text));
        let delta = builder.build();
        self.text = delta.apply(&self.text);

        let mut transformer = Transformer::new(&delta);
        for span in &mut self.marks {
            let start = transformer.transform(span.range.start, true);
            let end = transformer.transform(span.range.end, false);
            span.range = start..end.max(start);
        }
        self.normalize_marks();
        Ok(())
    }

    /// True when every byte of `range` carries `mark`
    pub fn has_mark(&self, mark: Mark, range: &Range<usize>) -> bool {
        if range.start >= range.end {
            return false;
        }
        let mut covered_to = range.start;
        for span in self.marks.iter().filter(|span| span.mark == mark) {
            if span.range.start > covered_to {
                break;
            }
            covered_to = covered_to.max(span.range.end);
            if covered_to >= range.end {
                return true;
            }
        }
        false
    }

    /// Add `mark` over `range`, or remove it when the whole range already has it.
    /// Toggling the same range twice restores the original marks.
    pub(crate) fn toggle_mark(&mut self, mark: Mark, range: Range<usize>) -> Result<(), EditError> {
        self.check_range(&range)?;
        if range.is_empty() {
            return Ok(());
        }

        if self.has_mark(mark, &range) {
            let mut kept = Vec::with_capacity(self.marks.len() + 1);
            for span in self.marks.drain(..) {
                if span.mark != mark
                    || span.range.end <= range.start
                    || span.range.start >= range.end
                {
                    kept.push(span);
                    continue;
                }
                if span.range.start < range.start {
                    kept.push(MarkSpan {
                        mark,
                        range: span.range.start..range.start,
                    });
                }
                if span.range.end > range.end {
                    kept.push(MarkSpan {
                        mark,
                        range: range.end..span.range.end,
                    });
                }
            }
            self.marks = kept;
        } else {
            self.marks.push(MarkSpan { mark, range });
        }
        self.normalize_marks();
        Ok(())
    }

    /// Split into the text before and after `offset`, marks partitioned accordingly
    pub(crate) fn split_at(&self, offset: usize) -> Result<(TextBlock, TextBlock), EditError> {
        self.check_boundary(offset)?;
        let len = self.len();

        let mut before = TextBlock::with_text(self.kind, &self.text.slice_to_cow(0..offset));
        let mut after = TextBlock::with_text(self.kind, &self.text.slice_to_cow(offset..len));

        for span in &self.marks {
            if span.range.start < offset {
                before.marks.push(MarkSpan {
                    mark: span.mark,
                    range: span.range.start..span.range.end.min(offset),
                });
            }
            if span.range.end > offset {
                after.marks.push(MarkSpan {
                    mark: span.mark,
                    range: span.range.start.saturating_sub(offset)..span.range.end - offset,
                });
            }
        }
        before.normalize_marks();
        after.normalize_marks();
        Ok((before, after))
    }

    /// Flatten text and marks into runs of uniformly marked text
    pub fn runs(&self) -> Vec<Run> {
        let text = self.text();
        if text.is_empty() {
            return Vec::new();
        }

        let mut boundaries = vec![0, text.len()];
        for span in &self.marks {
            boundaries.push(span.range.start);
            boundaries.push(span.range.end);
        }
        boundaries.sort_unstable();
        boundaries.dedup();

        let mut runs: Vec<Run> = Vec::new();
        for window in boundaries.windows(2) {
            let (start, end) = (window[0], window[1]);
            if start >= end {
                continue;
            }
            let mut marks: Vec<Mark> = self
                .marks
                .iter()
                .filter(|span| span.range.start <= start && span.range.end >= end)
                .map(|span| span.mark)
                .collect();
            marks.sort();
            marks.dedup();

            match runs.last_mut() {
                Some(last) if last.marks == marks => last.text.push_str(&text[start..end]),
                _ => runs.push(Run {
                    text: text[start..end].to_string(),
                    marks,
                }),
            }
        }
        runs
    }

    /// Merge overlapping or touching spans of the same mark, drop empty ones
    fn normalize_marks(&mut self) {
        let len = self.len();
        let mut spans: Vec<MarkSpan> = self
            .marks
            .drain(..)
            .map(|span| MarkSpan {
                mark: span.mark,
                range: span.range.start.min(len)..span.range.end.min(len),
            })
            .filter(|span| span.range.start < span.range.end)
            .collect();
        spans.sort_by_key(|span| (span.mark, span.range.start, span.range.end));

        let mut merged: Vec<MarkSpan> = Vec::with_capacity(spans.len());
        for span in spans {
            match merged.last_mut() {
                Some(last) if last.mark == span.mark && last.range.end >= span.range.start => {
                    last.range.end = last.range.end.max(span.range.end);
                }
                _ => merged.push(span),
            }
        }
        merged.sort_by_key(|span| (span.range.start, span.mark));
        self.marks = merged;
    }
}

impl PartialEq for TextBlock {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.marks == other.marks && self.text() == other.text()
    }
}

impl fmt::Debug for TextBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextBlock")
            .field("kind", &self.kind)
            .field("text", &self.text())
            .field("marks", &self.marks)
            .finish()
    }
}

/// A rich-text node inside a block
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(TextBlock),
    Image { src: String, alt: String },
    Divider,
}

impl Node {
    pub fn paragraph(text: &str) -> Self {
        Node::Text(TextBlock::paragraph(text))
    }

    pub fn heading(level: u8, text: &str) -> Self {
        Node::Text(TextBlock::with_text(
            TextKind::Heading {
                level: level.clamp(1, 6),
            },
            text,
        ))
    }

    pub fn list_item(ordered: bool, text: &str) -> Self {
        Node::Text(TextBlock::with_text(TextKind::ListItem { ordered }, text))
    }

    /// Size in the linear position space: text nodes have an open and close
    /// token around their bytes, atoms take a single position.
    pub fn size(&self) -> usize {
        match self {
            Node::Text(text) => text.len() + 2,
            Node::Image { .. } | Node::Divider => 1,
        }
    }

    pub fn as_text(&self) -> Option<&TextBlock> {
        match self {
            Node::Text(text) => Some(text),
            _ => None,
        }
    }

    pub(crate) fn as_text_mut(&mut self) -> Option<&mut TextBlock> {
        match self {
            Node::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_empty_paragraph(&self) -> bool {
        matches!(self, Node::Text(text) if text.kind() == TextKind::Paragraph && text.is_empty())
    }
}
