use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::editing::{BlockKind, Cmd, Document, Mark, Node, TextBlock, TextKind};

/// Builds the command that replaces the "/query" trigger range.
/// `None` means the command decided not to act (e.g. an upload was cancelled).
pub type SlashAction = Arc<dyn Fn(&Document, Range<usize>) -> Option<Cmd> + Send + Sync>;

/// Entry of the slash-command palette
#[derive(Clone)]
pub struct SlashCommand {
    pub title: String,
    pub description: String,
    pub search_terms: Vec<String>,
    pub apply: SlashAction,
}

impl SlashCommand {
    pub fn new(
        title: &str,
        description: &str,
        search_terms: &[&str],
        apply: impl Fn(&Document, Range<usize>) -> Option<Cmd> + Send + Sync + 'static,
    ) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            search_terms: search_terms.iter().map(|term| term.to_string()).collect(),
            apply: Arc::new(apply),
        }
    }

    /// Case-insensitive substring match against title, description and search terms
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self
                .search_terms
                .iter()
                .any(|term| term.to_lowercase().contains(&query))
    }
}

impl fmt::Debug for SlashCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlashCommand")
            .field("title", &self.title)
            .field("description", &self.description)
            .field("search_terms", &self.search_terms)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UploadError {
    #[error("upload cancelled")]
    Cancelled,
    #[error("upload failed: {0}")]
    Failed(String),
}

/// Picks and uploads an image, returning the URL it can be loaded from
pub trait ImageUploader: Send + Sync {
    fn upload(&self) -> Result<String, UploadError>;
}

/// Remove the trigger text, then retype the text node it sat in
fn set_kind(kind: TextKind) -> impl Fn(&Document, Range<usize>) -> Option<Cmd> + Send + Sync {
    move |_: &Document, range: Range<usize>| {
        Some(Cmd::Batch(vec![
            Cmd::DeleteRange {
                range: range.clone(),
            },
            Cmd::SetTextKind {
                range: range.start..range.start,
                kind,
            },
        ]))
    }
}

fn insert_nodes(nodes: Vec<Node>) -> impl Fn(&Document, Range<usize>) -> Option<Cmd> + Send + Sync {
    move |_: &Document, range: Range<usize>| {
        Some(Cmd::ReplaceWithNodes {
            range,
            nodes: nodes.clone(),
        })
    }
}

fn quiz_scaffold() -> Vec<Node> {
    vec![
        Node::heading(3, "Question"),
        Node::list_item(true, "Option A"),
        Node::list_item(true, "Option B"),
        Node::list_item(true, "Option C"),
    ]
}

fn key_term_scaffold() -> Vec<Node> {
    vec![Node::Text(
        TextBlock::paragraph("Term: definition").with_mark(Mark::Bold, 0..4),
    )]
}

/// The built-in palette, in display order
pub fn default_palette(uploader: Option<Arc<dyn ImageUploader>>) -> Vec<SlashCommand> {
    vec![
        SlashCommand::new(
            "Text",
            "Plain paragraph text",
            &["paragraph", "plain", "p"],
            set_kind(TextKind::Paragraph),
        ),
        SlashCommand::new(
            "Heading 1",
            "Big section heading",
            &["h1", "title", "large"],
            set_kind(TextKind::Heading { level: 1 }),
        ),
        SlashCommand::new(
            "Heading 2",
            "Medium section heading",
            &["h2", "subtitle", "medium"],
            set_kind(TextKind::Heading { level: 2 }),
        ),
        SlashCommand::new(
            "Heading 3",
            "Small section heading",
            &["h3", "small"],
            set_kind(TextKind::Heading { level: 3 }),
        ),
        SlashCommand::new(
            "Bullet List",
            "Create a simple bulleted list",
            &["unordered", "ul", "bullets"],
            set_kind(TextKind::ListItem { ordered: false }),
        ),
        SlashCommand::new(
            "Numbered List",
            "Create a list with numbering",
            &["ordered", "ol", "numbers"],
            set_kind(TextKind::ListItem { ordered: true }),
        ),
        SlashCommand::new(
            "Quote",
            "Capture a quote",
            &["blockquote", "citation"],
            set_kind(TextKind::Quote),
        ),
        SlashCommand::new(
            "Code",
            "Capture a code snippet",
            &["snippet", "pre", "monospace"],
            set_kind(TextKind::Code),
        ),
        SlashCommand::new(
            "Divider",
            "Visually divide sections",
            &["hr", "separator", "rule", "line"],
            insert_nodes(vec![Node::Divider]),
        ),
        SlashCommand::new(
            "Image",
            "Upload an image",
            &["picture", "photo", "upload"],
            move |_, range| {
                let Some(uploader) = uploader.as_ref() else {
                    log::debug!("image command without an uploader");
                    return None;
                };
                match uploader.upload() {
                    Ok(src) => Some(Cmd::ReplaceWithNodes {
                        range,
                        nodes: vec![Node::Image {
                            src,
                            alt: String::new(),
                        }],
                    }),
                    Err(err) => {
                        log::warn!("image upload: {err}");
                        None
                    }
                }
            },
        ),
        SlashCommand::new(
            "Quiz Question",
            "Add a multiple-choice question",
            &["quiz", "mcq", "assessment", "check"],
            insert_nodes(quiz_scaffold()),
        ),
        SlashCommand::new(
            "Key Term",
            "Define an important term",
            &["definition", "glossary", "vocabulary"],
            insert_nodes(key_term_scaffold()),
        ),
        SlashCommand::new(
            "New Block",
            "Start a new block below",
            &["block", "add", "section"],
            |doc, range| {
                let resolved = doc.resolve(range.start)?;
                let block = doc.blocks()[resolved.block_index].id();
                Some(Cmd::Batch(vec![
                    Cmd::DeleteRange { range },
                    Cmd::InsertBlockAfter {
                        block,
                        kind: BlockKind::Content,
                    },
                ]))
            },
        ),
    ]
}
