//! Terminal rendering of an editor view, and the screen geometry the engine
//! asks for (caret coordinates, block rectangles). All coordinates are in
//! terminal cells.

use microlesson_engine::EditorView;
use microlesson_engine::editing::{BlockId, DropSide, Mark, NodeGroup, RenderBlock, RenderNode, Run, Selection, TextKind};
use microlesson_engine::interaction::{BlockLayout, CoordsProvider, Point, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Drag handle shown in the gutter of every block
pub const HANDLE: &str = "⠿ ";
const HANDLE_WIDTH: u16 = 2;

/// One screen line of a text node
#[derive(Debug, Clone, PartialEq)]
struct TextRow {
    line: usize,
    col: u16,
    /// Document position of the row's first byte
    start: usize,
    text: String,
}

#[derive(Debug, Clone, PartialEq)]
struct BlockRows {
    id: BlockId,
    first_line: usize,
    line_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenLayout {
    viewport: Rect,
    scroll: usize,
    blocks: Vec<BlockRows>,
    rows: Vec<TextRow>,
}

impl ScreenLayout {
    fn screen_y(&self, line: usize) -> f32 {
        self.viewport.y + line as f32 - self.scroll as f32
    }

    fn line_at(&self, y: u16) -> Option<usize> {
        let offset = (y as f32 - self.viewport.y) as isize;
        if offset < 0 {
            return None;
        }
        Some(offset as usize + self.scroll)
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        self.viewport.contains(Point::new(column as f32, row as f32))
    }

    pub fn in_gutter(&self, column: u16) -> bool {
        (column as f32) < self.viewport.x + HANDLE_WIDTH as f32
    }

    pub fn block_at(&self, row: u16) -> Option<BlockId> {
        let line = self.line_at(row)?;
        self.blocks
            .iter()
            .find(|block| line >= block.first_line && line < block.first_line + block.line_count)
            .map(|block| block.id)
    }

    /// Document position under a screen cell, snapped to the row's text
    pub fn pos_at(&self, column: u16, row: u16) -> Option<usize> {
        let line = self.line_at(row)?;
        let text_row = self.rows.iter().find(|text_row| text_row.line == line)?;
        let wanted = column.saturating_sub(self.viewport.x as u16 + text_row.col) as usize;
        let offset = text_row
            .text
            .char_indices()
            .nth(wanted)
            .map(|(index, _)| index)
            .unwrap_or(text_row.text.len());
        Some(text_row.start + offset)
    }
}

impl CoordsProvider for ScreenLayout {
    fn coords_at_pos(&self, pos: usize) -> Option<Point> {
        let row = self
            .rows
            .iter()
            .find(|row| pos >= row.start && pos <= row.start + row.text.len())?;
        let chars = row.text.get(..pos - row.start)?.chars().count();
        Some(Point::new(
            self.viewport.x + row.col as f32 + chars as f32,
            self.screen_y(row.line),
        ))
    }

    fn viewport(&self) -> Rect {
        self.viewport
    }
}

impl BlockLayout for ScreenLayout {
    fn block_rect(&self, id: BlockId) -> Option<Rect> {
        let block = self.blocks.iter().find(|block| block.id == id)?;
        Some(Rect::new(
            self.viewport.x,
            self.screen_y(block.first_line),
            self.viewport.width,
            block.line_count as f32,
        ))
    }
}

pub struct RenderedLesson {
    pub lines: Vec<Line<'static>>,
    pub layout: ScreenLayout,
    pub scroll: u16,
}

/// Lay out every block as lines of spans, scrolled so the caret is visible
pub fn render_lesson(view: &EditorView, viewport: Rect) -> RenderedLesson {
    let mut builder = LineBuilder {
        lines: Vec::new(),
        rows: Vec::new(),
        blocks: Vec::new(),
        selection: view.snapshot.selection,
    };
    for block in &view.snapshot.blocks {
        builder.block(block);
    }

    let height = viewport.height.max(1.0) as usize;
    let caret_line = builder
        .rows
        .iter()
        .find(|row| {
            let head = view.snapshot.selection.to;
            head >= row.start && head <= row.start + row.text.len()
        })
        .map(|row| row.line)
        .unwrap_or(0);
    let scroll = (caret_line + 1).saturating_sub(height);

    RenderedLesson {
        lines: builder.lines,
        layout: ScreenLayout {
            viewport,
            scroll,
            blocks: builder.blocks,
            rows: builder.rows,
        },
        scroll: scroll as u16,
    }
}

struct LineBuilder {
    lines: Vec<Line<'static>>,
    rows: Vec<TextRow>,
    blocks: Vec<BlockRows>,
    selection: Selection,
}

impl LineBuilder {
    fn block(&mut self, block: &RenderBlock) {
        let first_line = self.lines.len();

        let mut header = vec![Span::styled(HANDLE, handle_style(block))];
        header.push(Span::styled(
            block.kind.label().to_string(),
            Style::default().fg(Color::DarkGray),
        ));
        match block.drop_indicator {
            Some(DropSide::Above) => header.push(Span::styled(" ▲ drop above", drop_style())),
            Some(DropSide::Below) => header.push(Span::styled(" ▼ drop below", drop_style())),
            None => {}
        }
        self.lines.push(Line::from(header));

        for group in block.groups() {
            match group {
                NodeGroup::Single(node) => self.node(block, node, None),
                NodeGroup::List { items, .. } => {
                    for (index, item) in items.into_iter().enumerate() {
                        self.node(block, item, Some(index + 1));
                    }
                }
            }
        }

        self.blocks.push(BlockRows {
            id: block.id,
            first_line,
            line_count: self.lines.len() - first_line,
        });
        self.lines.push(Line::default());
    }

    fn node(&mut self, block: &RenderBlock, node: &RenderNode, number: Option<usize>) {
        match node {
            RenderNode::Text {
                kind,
                content_range,
                runs,
            } => {
                let prefix = prefix(*kind, number);
                let style = kind_style(*kind);
                let col = HANDLE_WIDTH + prefix.chars().count() as u16;

                let mut pieces: Vec<Vec<Span<'static>>> = vec![Vec::new()];
                let mut row_starts = vec![content_range.start];
                let mut row_texts = vec![String::new()];
                let mut pos = content_range.start;
                for run in runs {
                    for (index, piece) in run.text.split('\n').enumerate() {
                        if index > 0 {
                            // the newline itself occupies one position
                            pos += 1;
                            pieces.push(Vec::new());
                            row_starts.push(pos);
                            row_texts.push(String::new());
                        }
                        if let Some(spans) = pieces.last_mut() {
                            push_piece(spans, piece, pos, run, style, self.selection);
                        }
                        if let Some(text) = row_texts.last_mut() {
                            text.push_str(piece);
                        }
                        pos += piece.len();
                    }
                }

                if block.show_placeholder
                    && content_range.is_empty()
                    && let Some(spans) = pieces.first_mut()
                {
                    spans.push(Span::styled(
                        block.placeholder.clone(),
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    ));
                }

                for (index, spans) in pieces.into_iter().enumerate() {
                    let lead = if index == 0 {
                        prefix.clone()
                    } else {
                        " ".repeat(prefix.chars().count())
                    };
                    let mut line = vec![Span::raw("  "), Span::styled(lead, style)];
                    line.extend(spans);
                    self.rows.push(TextRow {
                        line: self.lines.len(),
                        col,
                        start: row_starts[index],
                        text: std::mem::take(&mut row_texts[index]),
                    });
                    self.lines.push(Line::from(line));
                }
            }
            RenderNode::Image { src, alt } => {
                self.lines.push(Line::from(vec![
                    Span::raw("  "),
                    Span::styled(format!("[image: {alt}] "), Style::default().fg(Color::Magenta)),
                    Span::styled(src.clone(), Style::default().fg(Color::DarkGray)),
                ]));
            }
            RenderNode::Divider => {
                self.lines.push(Line::from(vec![
                    Span::raw("  "),
                    Span::styled("─".repeat(30), Style::default().fg(Color::DarkGray)),
                ]));
            }
        }
    }
}

/// Push `text` starting at document position `start`, splitting it where the
/// selection begins and ends so the selected part can be highlighted
fn push_piece(spans: &mut Vec<Span<'static>>, text: &str, start: usize, run: &Run, base: Style, selection: Selection) {
    if text.is_empty() {
        return;
    }
    let style = run_style(run, base);
    let end = start + text.len();
    let mut cuts = vec![0, text.len()];
    for edge in [selection.from, selection.to] {
        if edge > start && edge < end && text.is_char_boundary(edge - start) {
            cuts.push(edge - start);
        }
    }
    cuts.sort_unstable();
    cuts.dedup();
    for window in cuts.windows(2) {
        let (from, to) = (window[0], window[1]);
        let selected = !selection.is_collapsed() && start + from >= selection.from && start + to <= selection.to;
        let style = if selected {
            style.add_modifier(Modifier::REVERSED)
        } else {
            style
        };
        spans.push(Span::styled(text[from..to].to_string(), style));
    }
}

fn prefix(kind: TextKind, number: Option<usize>) -> String {
    match kind {
        TextKind::Paragraph => String::new(),
        TextKind::Heading { level } => format!("{} ", "#".repeat(level as usize)),
        TextKind::ListItem { ordered: false } => "• ".to_string(),
        TextKind::ListItem { ordered: true } => format!("{}. ", number.unwrap_or(1)),
        TextKind::Quote => "│ ".to_string(),
        TextKind::Code => "  ".to_string(),
    }
}

fn kind_style(kind: TextKind) -> Style {
    match kind {
        TextKind::Heading { .. } => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        TextKind::Quote => Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        TextKind::Code => Style::default().fg(Color::Green),
        TextKind::Paragraph | TextKind::ListItem { .. } => Style::default(),
    }
}

fn run_style(run: &Run, base: Style) -> Style {
    run.marks.iter().fold(base, |style, mark| match mark {
        Mark::Bold => style.add_modifier(Modifier::BOLD),
        Mark::Italic => style.add_modifier(Modifier::ITALIC),
        Mark::Underline => style.add_modifier(Modifier::UNDERLINED),
        Mark::Strike => style.add_modifier(Modifier::CROSSED_OUT),
        Mark::Code => style.fg(Color::Yellow),
        Mark::Highlight => style.bg(Color::Yellow).fg(Color::Black),
    })
}

fn handle_style(block: &RenderBlock) -> Style {
    if block.is_dragging {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else if block.is_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn drop_style() -> Style {
    Style::default().fg(Color::Yellow)
}
