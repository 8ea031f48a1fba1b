use crate::inventory::Listing;
use crate::models::{Machine, Purchase};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

const PAGE_JUMP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Machines,
    Purchases,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Machines => Page::Purchases,
            Page::Purchases => Page::Machines,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Machines => "Machines",
            Page::Purchases => "Purchases",
        }
    }
}

pub struct App {
    pub machines: Listing<Machine>,
    pub purchases: Listing<Purchase>,
    pub current_page: Page,
    pub machine_state: TableState,
    pub purchase_state: TableState,
}

fn initial_state(len: usize) -> TableState {
    let mut state = TableState::default();
    if len > 0 {
        state.select(Some(0));
    }
    state
}

impl App {
    pub fn new(machines: Listing<Machine>, purchases: Listing<Purchase>) -> Self {
        let machine_state = initial_state(machines.records.len());
        let purchase_state = initial_state(purchases.records.len());

        Self {
            machines,
            purchases,
            current_page: Page::Machines,
            machine_state,
            purchase_state,
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    fn current(&mut self) -> (usize, &mut TableState) {
        match self.current_page {
            Page::Machines => (self.machines.records.len(), &mut self.machine_state),
            Page::Purchases => (self.purchases.records.len(), &mut self.purchase_state),
        }
    }

    pub fn total_quantity(&self) -> u64 {
        match self.current_page {
            Page::Machines => self.machines.total_quantity,
            Page::Purchases => self.purchases.total_quantity,
        }
    }

    pub fn next(&mut self) {
        let (len, state) = self.current();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (len, state) = self.current();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let (len, state) = self.current();
        if len == 0 {
            return;
        }
        let i = state.selected().map_or(0, |i| (i + PAGE_JUMP).min(len - 1));
        state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let (len, state) = self.current();
        if len == 0 {
            return;
        }
        let i = state.selected().map_or(0, |i| i.saturating_sub(PAGE_JUMP));
        state.select(Some(i));
    }

    pub fn first(&mut self) {
        let (len, state) = self.current();
        if len > 0 {
            state.select(Some(0));
        }
    }

    pub fn last(&mut self) {
        let (len, state) = self.current();
        if len > 0 {
            state.select(Some(len - 1));
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(())
                }
                KeyCode::Tab | KeyCode::BackTab => app.next_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.first(),
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Table
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Machines => render_machines(f, chunks[1], app),
        Page::Purchases => render_purchases(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in [Page::Machines, Page::Purchases].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Total quantity: {}", app.total_quantity()),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn header_row(columns: &[&'static str]) -> Row<'static> {
    let cells = columns.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    Row::new(cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn table_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title)
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

fn render_machines(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.machines.records.iter().map(|m| {
        Row::new(vec![
            Cell::from(m.id.to_string()),
            Cell::from(truncate(&m.name, 40)),
            Cell::from(m.quantity.to_string()).style(Style::default().fg(Color::Green)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(42),
            Constraint::Length(10),
        ],
    )
    .header(header_row(&["ID", "Name", "Quantity"]))
    .block(table_block(" Machines "))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.machine_state);
}

fn render_purchases(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.purchases.records.iter().map(|p| {
        Row::new(vec![
            Cell::from(p.id.to_string()),
            Cell::from(truncate(&p.date, 12)),
            Cell::from(truncate(&p.product_name, 30)),
            Cell::from(p.quantity.to_string()).style(Style::default().fg(Color::Green)),
            Cell::from(p.cost.to_string()).style(Style::default().fg(Color::Red)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(14),
            Constraint::Length(32),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(header_row(&["ID", "Date", "Product", "Quantity", "Cost"]))
    .block(table_block(" Purchases "))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.purchase_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (state, total) = match app.current_page {
        Page::Machines => (&app.machine_state, app.machines.records.len()),
        Page::Purchases => (&app.purchase_state, app.purchases.records.len()),
    };
    let selected = state.selected().map(|i| i + 1).unwrap_or(0);

    let status_spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, total),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Collection | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)),
        Span::raw(" Fast | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
