mod view;

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use microlesson_config::Config;
use microlesson_engine::editing::{Mark, Selection};
use microlesson_engine::interaction::{CoordsProvider, Rect};
use microlesson_engine::{Editor, EditorKey, EditorOptions, EditorSettings, io};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use relative_path::RelativePathBuf;
use std::{
    env,
    fs::File,
    io::{Stdout, stdout},
    path::PathBuf,
    process,
    time::{Duration, Instant},
};
use view::{ScreenLayout, render_lesson};

const TOOLBAR_LABEL: &str = " B  I  U  S  ^B ^E ^U ^K ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Lessons,
    Editor,
}

struct App {
    lessons_path: PathBuf,
    settings: EditorSettings,
    lessons: Vec<PathBuf>,
    lesson_list_state: ListState,
    editor: Option<Editor>,
    open_lesson: Option<RelativePathBuf>,
    pane: Pane,
    layout: ScreenLayout,
    lessons_area: ratatui::layout::Rect,
    /// Where a mouse text selection started
    mouse_anchor: Option<usize>,
    status: String,
}

impl App {
    fn new(lessons_path: PathBuf, mut settings: EditorSettings) -> Result<Self> {
        let lessons = io::scan_lessons(&lessons_path)?;
        // The toolbar is one terminal row tall, directly above the selection
        settings.toolbar.width = TOOLBAR_LABEL.chars().count() as f32;
        settings.toolbar.height = 1.0;
        settings.toolbar.gap = 0.0;

        let mut app = Self {
            lessons_path,
            settings,
            lessons,
            lesson_list_state: ListState::default(),
            editor: None,
            open_lesson: None,
            pane: Pane::Lessons,
            layout: ScreenLayout::default(),
            lessons_area: ratatui::layout::Rect::default(),
            mouse_anchor: None,
            status: String::new(),
        };

        if !app.lessons.is_empty() {
            app.lesson_list_state.select(Some(0));
        }

        Ok(app)
    }

    fn next_lesson(&mut self) {
        if self.lessons.is_empty() {
            return;
        }
        let i = match self.lesson_list_state.selected() {
            Some(i) => (i + 1) % self.lessons.len(),
            None => 0,
        };
        self.lesson_list_state.select(Some(i));
    }

    fn previous_lesson(&mut self) {
        if self.lessons.is_empty() {
            return;
        }
        let i = match self.lesson_list_state.selected() {
            Some(0) | None => self.lessons.len() - 1,
            Some(i) => i - 1,
        };
        self.lesson_list_state.select(Some(i));
    }

    fn open_selected_lesson(&mut self) -> Result<()> {
        let Some(path) = self
            .lesson_list_state
            .selected()
            .and_then(|index| self.lessons.get(index))
        else {
            return Ok(());
        };
        let relative = RelativePathBuf::from_path(path.strip_prefix(&self.lessons_path)?)?;
        let doc = io::read_lesson(&relative, &self.lessons_path, &self.settings.placeholders())?;

        let html_path = relative.with_extension("html");
        let root = self.lessons_path.clone();
        let target = html_path.clone();
        let options = EditorOptions {
            settings: self.settings.clone(),
            on_change: Some(Box::new(move |html: &str| {
                if let Err(e) = io::write_file(&target, &root, html) {
                    log::warn!("Failed to write {target}: {e}");
                }
            })),
            ..EditorOptions::default()
        };

        log::info!("Opened lesson {relative}");
        self.status = format!("Editing {relative}, saving to {html_path}");
        self.editor = Some(Editor::with_document(doc, options));
        self.open_lesson = Some(relative);
        self.pane = Pane::Editor;
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('q') {
            return false;
        }
        if key.code == KeyCode::Tab {
            self.pane = match self.pane {
                Pane::Lessons if self.editor.is_some() => Pane::Editor,
                _ => Pane::Lessons,
            };
            return true;
        }

        match self.pane {
            Pane::Lessons => match key.code {
                KeyCode::Char('q') => return false,
                KeyCode::Down | KeyCode::Char('j') => self.next_lesson(),
                KeyCode::Up | KeyCode::Char('k') => self.previous_lesson(),
                KeyCode::Enter | KeyCode::Char(' ') => {
                    if let Err(e) = self.open_selected_lesson() {
                        log::warn!("Could not open lesson: {e}");
                        self.status = format!("Error opening lesson: {e}");
                    }
                }
                _ => {}
            },
            Pane::Editor => self.handle_editor_key(key),
        }
        true
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        let now = Instant::now();
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let alt = key.modifiers.contains(KeyModifiers::ALT);

        if ctrl {
            let mark = match key.code {
                KeyCode::Char('b') => Some(Mark::Bold),
                KeyCode::Char('e') => Some(Mark::Italic),
                KeyCode::Char('u') => Some(Mark::Underline),
                KeyCode::Char('k') => Some(Mark::Strike),
                _ => None,
            };
            if let Some(mark) = mark {
                editor.set_formatting_in_progress(true);
                editor.toggle_mark(mark, now);
                editor.set_formatting_in_progress(false);
                return;
            }
            match key.code {
                KeyCode::Char('z') => {
                    editor.undo(now);
                }
                KeyCode::Char('y') => {
                    editor.redo(now);
                }
                KeyCode::Char('n') => {
                    if let Some(block) = editor.focus() {
                        editor.add_block_after(block, now);
                    }
                }
                KeyCode::Char('d') => {
                    // Only empty blocks offer a delete button
                    if let Some(block) = editor.focus()
                        && editor.document().is_block_empty(block) == Some(true)
                    {
                        editor.delete_block(block, now);
                    }
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Left if shift => {
                editor.extend_selection(false, now);
            }
            KeyCode::Right if shift => {
                editor.extend_selection(true, now);
            }
            code => {
                if let Some(editor_key) = editor_key(code, shift || alt) {
                    editor.handle_key(editor_key, now);
                }
            }
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let now = Instant::now();
        let (column, row) = (mouse.column, mouse.row);
        let in_editor = self.layout.contains(column, row);
        if matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left))
            && self.lessons_area.contains(Position::new(column, row))
        {
            self.pane = Pane::Lessons;
        }
        let Some(editor) = self.editor.as_mut() else {
            return;
        };

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if !in_editor => {
                editor.click_outside();
            }
            MouseEventKind::Down(MouseButton::Left) => {
                self.pane = Pane::Editor;
                if self.layout.in_gutter(column)
                    && let Some(block) = self.layout.block_at(row)
                {
                    editor.drag_start(block);
                } else if let Some(pos) = self.layout.pos_at(column, row) {
                    let selection = editor.set_selection(Selection::cursor(pos), now);
                    self.mouse_anchor = Some(selection.from);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if editor.drag().is_active() {
                    if let Some(hovered) = self.layout.block_at(row) {
                        // middle of the cell
                        editor.drag_over(row as f32 + 0.5, hovered, &self.layout);
                    }
                } else if let Some(anchor) = self.mouse_anchor
                    && let Some(pos) = self.layout.pos_at(column, row)
                {
                    editor.set_selection(Selection::new(anchor, pos), now);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if editor.drag().is_active() && editor.drop(now).is_none() {
                    self.status = "Block not moved".to_string();
                }
                self.mouse_anchor = None;
            }
            _ => {}
        }
    }

    fn tick(&mut self) {
        if let Some(editor) = self.editor.as_mut() {
            editor.poll_toolbar(Instant::now(), &self.layout);
        }
    }
}

fn editor_key(code: KeyCode, modified: bool) -> Option<EditorKey> {
    let key = match code {
        KeyCode::Char(c) => EditorKey::Char(c),
        KeyCode::Enter if modified => EditorKey::ShiftEnter,
        KeyCode::Enter => EditorKey::Enter,
        KeyCode::Backspace => EditorKey::Backspace,
        KeyCode::Left => EditorKey::Left,
        KeyCode::Right => EditorKey::Right,
        KeyCode::Up => EditorKey::Up,
        KeyCode::Down => EditorKey::Down,
        KeyCode::Esc => EditorKey::Escape,
        _ => return None,
    };
    Some(key)
}

fn init_logging() -> Result<()> {
    let log_path = env::temp_dir().join("microlesson.log");
    let log_file = File::create(&log_path)?;
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();
    log::info!("Logging to {}", log_path.display());
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;

    // Determine lessons path from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let lessons_path;
    let settings;
    let from_config;

    if args.len() == 2 {
        // CLI argument provided - use it, still honouring editor settings from config
        lessons_path = PathBuf::from(&args[1]);
        settings = match Config::load() {
            Ok(Some(config)) => config.editor,
            _ => EditorSettings::default(),
        };
        from_config = false;
    } else if args.len() == 1 {
        // No CLI argument - try config file
        match Config::load() {
            Ok(Some(config)) => {
                lessons_path = config.lessons_path;
                settings = config.editor;
                from_config = true;
            }
            Ok(None) => {
                eprintln!("Error: No lessons path provided and no config file found");
                eprintln!("Usage: {} <lessons-folder-path>", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: Failed to load config file: {e}");
                eprintln!("Usage: {} <lessons-folder-path>", args[0]);
                process::exit(1);
            }
        }
    } else {
        eprintln!("Usage: {} [lessons-folder-path]", args[0]);
        process::exit(1);
    };

    if let Err(e) = io::validate_lessons_dir(&lessons_path) {
        let source = if from_config {
            format!(" from config file '{}'", config_path.display())
        } else {
            String::new()
        };
        eprintln!(
            "Error: Lessons path '{}'{} is invalid: {e}",
            lessons_path.display(),
            source
        );
        process::exit(1);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(lessons_path, settings)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("{err:?}");
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        // Short poll so the toolbar debounce can elapse without input
        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => {
                    if !app.handle_key(key) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }
        app.tick();
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(f.area());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)].as_ref())
        .split(rows[0]);

    // Lesson list panel
    let lesson_items: Vec<ListItem> = app
        .lessons
        .iter()
        .map(|path| {
            let name = path
                .strip_prefix(&app.lessons_path)
                .unwrap_or(path)
                .display()
                .to_string();
            ListItem::new(vec![Line::from(vec![Span::raw(format!("📄 {name}"))])])
        })
        .collect();

    let lessons_list = List::new(lesson_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Lessons")
                .border_style(pane_style(app.pane == Pane::Lessons)),
        )
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));

    app.lessons_area = chunks[0];
    f.render_stateful_widget(lessons_list, chunks[0], &mut app.lesson_list_state);

    // Editor panel
    let title = app
        .open_lesson
        .as_ref()
        .map(|lesson| lesson.to_string())
        .unwrap_or_else(|| "Editor".to_string());
    let editor_block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(pane_style(app.pane == Pane::Editor));
    let inner = editor_block.inner(chunks[1]);
    f.render_widget(editor_block, chunks[1]);

    match app.editor.as_ref() {
        Some(editor) => {
            let view = editor.snapshot();
            let viewport = Rect::new(
                inner.x as f32,
                inner.y as f32,
                inner.width as f32,
                inner.height as f32,
            );
            let rendered = render_lesson(&view, viewport);
            f.render_widget(Paragraph::new(rendered.lines).scroll((rendered.scroll, 0)), inner);
            app.layout = rendered.layout;

            let caret = app.layout.coords_at_pos(view.snapshot.selection.to);
            if app.pane == Pane::Editor
                && let Some(caret) = caret
            {
                f.set_cursor_position(Position::new(caret.x as u16, caret.y as u16));
            }

            if let Some(menu) = &view.slash_menu
                && let Some(caret) = caret
            {
                let height = (menu.items.len().max(1) as u16 + 2).min(10);
                let area = popup_area(inner, caret.x as u16, caret.y as u16 + 1, 40, height);
                let items: Vec<ListItem> = if menu.items.is_empty() {
                    vec![ListItem::new("No matching commands")]
                } else {
                    menu.items
                        .iter()
                        .map(|item| {
                            ListItem::new(Line::from(vec![
                                Span::styled(item.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                                Span::styled(format!("  {}", item.description), Style::default().fg(Color::DarkGray)),
                            ]))
                        })
                        .collect()
                };
                let mut state = ListState::default();
                if !menu.items.is_empty() {
                    state.select(Some(menu.selected_index));
                }
                let list = List::new(items)
                    .block(Block::default().borders(Borders::ALL).title(format!("/{}", menu.query)))
                    .highlight_style(Style::default().bg(Color::Cyan).fg(Color::Black));
                f.render_widget(Clear, area);
                f.render_stateful_widget(list, area, &mut state);
            }

            if let Some(position) = view.toolbar {
                let width = TOOLBAR_LABEL.chars().count() as u16;
                let area = popup_area(inner, position.x as u16, position.y as u16, width, 1);
                f.render_widget(Clear, area);
                f.render_widget(
                    Paragraph::new(TOOLBAR_LABEL).style(Style::default().bg(Color::Blue).fg(Color::White)),
                    area,
                );
            }
        }
        None => {
            app.layout = ScreenLayout::default();
            f.render_widget(Paragraph::new("Select a lesson and press Enter to edit it"), inner);
        }
    }

    // Instructions and status at the bottom
    let help_text = Line::from(vec![
        Span::raw("^Q: Quit | Tab: Switch pane | "),
        Span::raw("^Z/^Y: Undo/Redo | ^N: New block | ^D: Delete empty block | "),
        Span::raw("/: Commands | Drag ⠿ to reorder"),
    ]);
    let status = Line::from(Span::styled(app.status.clone(), Style::default().fg(Color::DarkGray)));
    f.render_widget(Paragraph::new(vec![help_text, status]), rows[1]);
}

fn pane_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

/// A popup rectangle at `x`, `y`, pulled back inside `bounds`
fn popup_area(bounds: ratatui::layout::Rect, x: u16, y: u16, width: u16, height: u16) -> ratatui::layout::Rect {
    let width = width.min(bounds.width);
    let height = height.min(bounds.height);
    let x = x.clamp(bounds.x, bounds.right().saturating_sub(width));
    let y = y.clamp(bounds.y, bounds.bottom().saturating_sub(height));
    ratatui::layout::Rect::new(x, y, width, height)
}
