//! Markdown lesson import.
//!
//! Thematic breaks (`---`) separate blocks. A first block that opens with a
//! level 1 heading becomes the lesson's title block.

use pulldown_cmark::{Event, Options, Parser, Tag};

use crate::editing::{Block, BlockKind, Document, EditError, Mark, Node, Placeholders, TextBlock, TextKind};

/// Open elements, tracked so end events need no inspection
#[derive(Debug, Clone, Copy, PartialEq)]
enum Open {
    Text,
    List,
    Item,
    Quote,
    Mark(Mark),
    Image,
    Other,
}

/// Text node under construction
struct PendingText {
    kind: TextKind,
    text: String,
    marks: Vec<(Mark, usize, usize)>,
}

#[derive(Default)]
struct Importer {
    blocks: Vec<Vec<Node>>,
    nodes: Vec<Node>,
    text: Option<PendingText>,
    stack: Vec<Open>,
    lists: Vec<bool>,
    open_marks: Vec<(Mark, usize)>,
    quote_depth: usize,
    image: Option<(String, String)>,
}

impl Importer {
    fn context_kind(&self) -> TextKind {
        if self.stack.contains(&Open::Item) {
            TextKind::ListItem {
                ordered: self.lists.last().copied().unwrap_or(false),
            }
        } else if self.quote_depth > 0 {
            TextKind::Quote
        } else {
            TextKind::Paragraph
        }
    }

    fn begin_text(&mut self, kind: TextKind) {
        if let Some(pending) = &mut self.text
            && pending.text.is_empty()
        {
            // A loose list item opens a paragraph inside the item
            if kind != TextKind::Paragraph && !matches!(kind, TextKind::ListItem { .. }) {
                pending.kind = kind;
            }
            return;
        }
        self.finish_text();
        self.text = Some(PendingText {
            kind,
            text: String::new(),
            marks: Vec::new(),
        });
    }

    fn push_str(&mut self, text: &str) {
        if let Some((_, alt)) = &mut self.image {
            alt.push_str(text);
            return;
        }
        if self.text.is_none() {
            let kind = self.context_kind();
            self.begin_text(kind);
        }
        if let Some(pending) = &mut self.text {
            pending.text.push_str(text);
        }
    }

    fn text_len(&self) -> usize {
        self.text.as_ref().map(|pending| pending.text.len()).unwrap_or(0)
    }

    fn close_mark(&mut self, mark: Mark) {
        let Some(index) = self.open_marks.iter().rposition(|(open, _)| *open == mark) else {
            return;
        };
        let (_, start) = self.open_marks.remove(index);
        let end = self.text_len();
        if let Some(pending) = &mut self.text {
            pending.marks.push((mark, start, end));
        }
    }

    fn finish_text(&mut self) {
        let Some(pending) = self.text.take() else {
            return;
        };
        let mut text = pending.text;
        if pending.kind == TextKind::Code && text.ends_with('\n') {
            text.pop();
        }
        let mut node = TextBlock::with_text(pending.kind, &text);
        for (mark, start, end) in pending.marks {
            node = node.with_mark(mark, start..end);
        }
        self.nodes.push(Node::Text(node));
    }

    fn finish_block(&mut self) {
        self.finish_text();
        if self.nodes.is_empty() {
            return;
        }
        // Blocks end in text so the caret can always leave a trailing image
        if !matches!(self.nodes.last(), Some(Node::Text(_))) {
            self.nodes.push(Node::Text(TextBlock::new(TextKind::Paragraph)));
        }
        self.blocks.push(std::mem::take(&mut self.nodes));
    }

    fn start(&mut self, tag: Tag<'_>) {
        let open = match tag {
            Tag::Paragraph => {
                let kind = self.context_kind();
                self.begin_text(kind);
                Open::Text
            }
            Tag::Heading { level, .. } => {
                self.begin_text(TextKind::Heading { level: level as u8 });
                Open::Text
            }
            Tag::CodeBlock(_) => {
                self.finish_text();
                self.begin_text(TextKind::Code);
                Open::Text
            }
            Tag::BlockQuote(..) => {
                self.finish_text();
                self.quote_depth += 1;
                Open::Quote
            }
            Tag::List(start) => {
                self.finish_text();
                self.lists.push(start.is_some());
                Open::List
            }
            Tag::Item => {
                self.finish_text();
                self.stack.push(Open::Item);
                let kind = self.context_kind();
                self.stack.pop();
                self.begin_text(kind);
                Open::Item
            }
            Tag::Emphasis => self.open_mark(Mark::Italic),
            Tag::Strong => self.open_mark(Mark::Bold),
            Tag::Strikethrough => self.open_mark(Mark::Strike),
            Tag::Image { dest_url, .. } => {
                self.image = Some((dest_url.to_string(), String::new()));
                Open::Image
            }
            _ => Open::Other,
        };
        self.stack.push(open);
    }

    fn open_mark(&mut self, mark: Mark) -> Open {
        let start = self.text_len();
        self.open_marks.push((mark, start));
        Open::Mark(mark)
    }

    fn end(&mut self) {
        match self.stack.pop() {
            Some(Open::Text) | Some(Open::Item) => self.finish_text(),
            Some(Open::List) => {
                self.finish_text();
                self.lists.pop();
            }
            Some(Open::Quote) => {
                self.finish_text();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            Some(Open::Mark(mark)) => self.close_mark(mark),
            Some(Open::Image) => {
                if let Some((src, alt)) = self.image.take() {
                    if self.text.as_ref().is_some_and(|pending| pending.text.is_empty()) {
                        self.text = None;
                    }
                    self.finish_text();
                    self.nodes.push(Node::Image { src, alt });
                }
            }
            Some(Open::Other) | None => {}
        }
    }

    fn inline_code(&mut self, code: &str) {
        let start = self.text_len();
        self.push_str(code);
        let end = self.text_len();
        if let Some(pending) = &mut self.text {
            pending.marks.push((Mark::Code, start, end));
        }
    }
}

/// Build a document from a Markdown lesson
pub fn parse_lesson(markdown: &str, placeholders: &Placeholders) -> Result<Document, EditError> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut importer = Importer::default();
    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(tag) => importer.start(tag),
            Event::End(_) => importer.end(),
            Event::Text(text) => importer.push_str(&text),
            Event::Code(code) => importer.inline_code(&code),
            Event::SoftBreak => importer.push_str(" "),
            Event::HardBreak => importer.push_str("\n"),
            Event::Rule => importer.finish_block(),
            _ => {}
        }
    }
    importer.finish_block();

    if importer.blocks.is_empty() {
        let kind = BlockKind::Content;
        return Document::from_blocks(vec![Block::new(kind, placeholders.for_kind(kind))])
            .map(|doc| doc.with_placeholders(placeholders.clone()));
    }

    let blocks = importer
        .blocks
        .into_iter()
        .enumerate()
        .map(|(index, content)| {
            let leads_with_h1 = matches!(
                content.first(),
                Some(Node::Text(text)) if text.kind() == TextKind::Heading { level: 1 }
            );
            let kind = if index == 0 && leads_with_h1 {
                BlockKind::Title
            } else {
                BlockKind::Content
            };
            Block::with_content(kind, placeholders.for_kind(kind), content)
        })
        .collect();
    log::debug!("imported lesson");
    Ok(Document::from_blocks(blocks)?.with_placeholders(placeholders.clone()))
}
