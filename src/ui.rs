use anyhow::{Context, Result};
use capital_ledger::{
    entry::today, export::format_grouped, export_to_dir, expense_breakdown, ChartKind, Config,
    EntryForm, ExportFormat, FormField, GroupMode, Ledger, LedgerEntry, SummaryRow,
};
use chrono::Local;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Clear, Dataset, Gauge,
        GraphType, Paragraph, Row, Table, TableState,
    },
    Frame, Terminal,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::io;

const NET_COLOR: Color = Color::Green;
const EXPENSE_COLOR: Color = Color::Red;
const GROSS_COLOR: Color = Color::LightBlue;
const SLICE_COLORS: [Color; 4] = [Color::Red, Color::Yellow, Color::Magenta, Color::Blue];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    EntryForm,
    Records,
    Analytics,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::EntryForm => Page::Records,
            Page::Records => Page::Analytics,
            Page::Analytics => Page::EntryForm,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::EntryForm => Page::Analytics,
            Page::Records => Page::EntryForm,
            Page::Analytics => Page::Records,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::EntryForm => "Entry Form",
            Page::Records => "Records",
            Page::Analytics => "Analytics",
        }
    }
}

pub struct App {
    pub ledger: Ledger,
    pub config: Config,
    pub current_page: Page,
    pub form: EntryForm,
    pub selected_field: usize,
    /// Id of the entry loaded into the form, if editing
    pub editing_id: Option<String>,
    /// Id awaiting delete confirmation
    pub delete_confirm: Option<String>,
    pub state: TableState,
    pub view_mode: GroupMode,
    pub chart_kind: ChartKind,
    pub status: Option<String>,
}

impl App {
    pub fn new(ledger: Ledger, config: Config) -> Self {
        let mut state = TableState::default();
        if !ledger.is_empty() {
            state.select(Some(0));
        }

        let current_page = if ledger.is_empty() {
            Page::EntryForm
        } else {
            Page::Records
        };

        Self {
            view_mode: config.default_view,
            chart_kind: config.default_chart,
            ledger,
            config,
            current_page,
            form: EntryForm::new(today()),
            selected_field: 0,
            editing_id: None,
            delete_confirm: None,
            state,
            status: None,
        }
    }

    pub fn selected_entry(&self) -> Option<&LedgerEntry> {
        self.state.selected().and_then(|i| self.ledger.entries().get(i))
    }

    pub fn current_field(&self) -> FormField {
        FormField::ALL[self.selected_field]
    }

    // ------------------------------------------------------------------------
    // Form
    // ------------------------------------------------------------------------

    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % FormField::ALL.len();
    }

    pub fn previous_field(&mut self) {
        self.selected_field = if self.selected_field == 0 {
            FormField::ALL.len() - 1
        } else {
            self.selected_field - 1
        };
    }

    pub fn type_char(&mut self, c: char) {
        let field = self.current_field();
        self.form.field_mut(field).push(c);
    }

    pub fn backspace(&mut self) {
        let field = self.current_field();
        self.form.field_mut(field).pop();
    }

    fn reset_form(&mut self) {
        self.form = EntryForm::new(today());
        self.selected_field = 0;
    }

    /// Add a new entry, or replace the one being edited
    pub fn submit_form(&mut self) {
        let input = self.form.coerce(today());

        match self.editing_id.take() {
            Some(id) => match self.ledger.replace(&id, &input) {
                Ok(entry) => {
                    self.status = Some(format!("✓ Record updated ({})", entry.date));
                }
                Err(err) => {
                    self.status = Some(format!("❌ {}", err));
                }
            },
            None => {
                let date = self.ledger.add(&input).date;
                self.state.select(Some(self.ledger.len() - 1));
                self.status = Some(format!("✓ Record added ({})", date));
            }
        }

        self.reset_form();
    }

    pub fn cancel_edit(&mut self) {
        if self.editing_id.take().is_some() {
            self.status = Some("Edit cancelled".to_string());
        }
        self.reset_form();
    }

    /// Load the selected entry into the form
    pub fn start_edit_selected(&mut self) {
        if let Some(entry) = self.selected_entry() {
            let form = EntryForm::from_entry(entry);
            let id = entry.id.clone();
            self.form = form;
            self.editing_id = Some(id);
            self.selected_field = 0;
            self.current_page = Page::EntryForm;
            self.status = None;
        }
    }

    // ------------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------------

    pub fn request_delete_selected(&mut self) {
        if let Some(entry) = self.selected_entry() {
            self.delete_confirm = Some(entry.id.clone());
        }
    }

    pub fn confirm_delete(&mut self) {
        let Some(id) = self.delete_confirm.take() else {
            return;
        };

        match self.ledger.remove(&id) {
            Ok(removed) => {
                self.status = Some(format!("✓ Record deleted ({})", removed.date));
                if self.editing_id.as_deref() == Some(id.as_str()) {
                    self.editing_id = None;
                    self.reset_form();
                }
            }
            Err(err) => self.status = Some(format!("❌ {}", err)),
        }

        let len = self.ledger.len();
        let selected = match self.state.selected() {
            _ if len == 0 => None,
            Some(i) if i >= len => Some(len - 1),
            other => other,
        };
        self.state.select(selected);
    }

    pub fn cancel_delete(&mut self) {
        self.delete_confirm = None;
    }

    // ------------------------------------------------------------------------
    // Navigation / views
    // ------------------------------------------------------------------------

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.ledger.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.ledger.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn toggle_view(&mut self) {
        self.view_mode = self.view_mode.toggle();
    }

    pub fn cycle_chart(&mut self) {
        self.chart_kind = self.chart_kind.next();
    }

    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        self.ledger.summary(self.view_mode)
    }

    pub fn export(&mut self, format: ExportFormat) {
        if self.ledger.is_empty() {
            self.status = Some("Nothing to export yet".to_string());
            return;
        }

        let now = Local::now().naive_local();
        self.status = Some(match export_to_dir(format, self.ledger.entries(), &self.config, now) {
            Ok(path) => format!("✓ Exported {}", path.display()),
            Err(err) => {
                tracing::warn!(error = %err, "export failed");
                format!("❌ Export failed: {}", err)
            }
        });
    }

    // ------------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------------

    /// Apply one key press. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        if self.delete_confirm.is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.confirm_delete(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.cancel_delete(),
                _ => {}
            }
            return false;
        }

        match key.code {
            KeyCode::BackTab => {
                self.previous_page();
                return false;
            }
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.previous_page();
                } else {
                    self.next_page();
                }
                return false;
            }
            _ => {}
        }

        match self.current_page {
            Page::EntryForm => self.handle_form_key(key),
            Page::Records => self.handle_records_key(key),
            Page::Analytics => self.handle_analytics_key(key),
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                if self.editing_id.is_some() {
                    self.cancel_edit();
                } else {
                    self.current_page = Page::Records;
                }
            }
            KeyCode::Enter => self.submit_form(),
            KeyCode::Down => self.next_field(),
            KeyCode::Up => self.previous_field(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char(c) => self.type_char(c),
            _ => {}
        }
        false
    }

    fn handle_records_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::Home => {
                if !self.ledger.is_empty() {
                    self.state.select(Some(0));
                }
            }
            KeyCode::End => {
                if !self.ledger.is_empty() {
                    self.state.select(Some(self.ledger.len() - 1));
                }
            }
            KeyCode::Char('a') => self.current_page = Page::EntryForm,
            KeyCode::Char('e') => self.start_edit_selected(),
            KeyCode::Char('d') => self.request_delete_selected(),
            KeyCode::Char('x') => self.export(ExportFormat::Csv),
            KeyCode::Char('X') => self.export(ExportFormat::Spreadsheet),
            _ => {}
        }
        false
    }

    fn handle_analytics_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('v') => self.toggle_view(),
            KeyCode::Char('c') => self.cycle_chart(),
            KeyCode::Char('x') => self.export(ExportFormat::Csv),
            KeyCode::Char('X') => self.export(ExportFormat::Spreadsheet),
            _ => {}
        }
        false
    }
}

/// Raw mode and the alternate screen, undone on drop (also while unwinding)
struct TerminalGuard {
    restore: fn() -> io::Result<()>,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = TerminalGuard { restore: restore_terminal };
        execute!(io::stdout(), EnterAlternateScreen)?;

        // Leave the alternate screen before the panic message is printed
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = restore_terminal();
            default_hook(info);
        }));

        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = (self.restore)();
    }
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, cursor::Show)
}

pub fn run_ui(app: &mut App) -> Result<()> {
    let _guard = TerminalGuard::enter().context("Failed to set up the terminal")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    run_app(&mut terminal, app, event::read).context("Terminal session failed")
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut next_event: impl FnMut() -> io::Result<Event>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = next_event()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::EntryForm => render_form(f, chunks[1], app),
        Page::Records => render_records(f, chunks[1], app),
        Page::Analytics => render_analytics(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);

    if app.delete_confirm.is_some() {
        render_delete_confirm(f, app);
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn money(app: &App, value: Decimal) -> String {
    format!("{}{}", app.config.currency_symbol, format_grouped(value))
}

fn signed_color(value: Decimal) -> Color {
    if value < Decimal::ZERO {
        Color::Red
    } else {
        Color::Green
    }
}

fn key_hint<'a>(key: &'a str, label: &'a str) -> Vec<Span<'a>> {
    vec![
        Span::styled(key, Style::default().fg(Color::Yellow)),
        Span::raw(format!(" {} | ", label)),
    ]
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn render_empty_state(f: &mut Frame, area: Rect, title: &str) {
    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  No records yet",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "  Add your first entry on the Entry Form page (Tab) to see stats and charts.",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title.to_string()),
    );
    f.render_widget(paragraph, area);
}

// ============================================================================
// Header / status
// ============================================================================

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::EntryForm, Page::Records, Page::Analytics];

    let mut tab_spans = vec![Span::styled(
        format!("{} ", app.config.branding.business_name),
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    )];
    tab_spans.push(Span::raw(" "));

    for (i, page) in pages.iter().enumerate() {
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

        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Entries: {}", app.ledger.len()),
        Style::default().fg(Color::White),
    ));

    if app.editing_id.is_some() {
        tab_spans.push(Span::raw("  |  "));
        tab_spans.push(Span::styled(
            "EDITING",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Red)));

    f.render_widget(header, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();

    if let Some(status) = &app.status {
        spans.push(Span::styled(format!(" {} ", status), Style::default().fg(Color::Cyan)));
        spans.push(Span::raw(" | "));
    }

    match app.current_page {
        Page::EntryForm => {
            spans.extend(key_hint("↑/↓", "Field"));
            spans.extend(key_hint("Enter", if app.editing_id.is_some() { "Update" } else { "Add" }));
            spans.extend(key_hint("Esc", if app.editing_id.is_some() { "Cancel edit" } else { "Records" }));
        }
        Page::Records => {
            spans.extend(key_hint("a", "Add"));
            spans.extend(key_hint("e", "Edit"));
            spans.extend(key_hint("d", "Delete"));
            spans.extend(key_hint("x/X", "CSV/Excel"));
        }
        Page::Analytics => {
            spans.extend(key_hint("v", app.view_mode.title()));
            spans.extend(key_hint("c", app.chart_kind.title()));
            spans.extend(key_hint("x/X", "CSV/Excel"));
        }
    }

    spans.extend(key_hint("Tab", "Page"));
    spans.push(Span::styled(
        if app.current_page == Page::EntryForm { "Ctrl-C" } else { "q" },
        Style::default().fg(Color::Red),
    ));
    spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

// ============================================================================
// Entry form
// ============================================================================

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let editing = app.editing_id.is_some();
    let (title, border) = if editing {
        (" Edit Record ", Color::Yellow)
    } else {
        (" Add New Record ", Color::Red)
    };

    let mut lines = vec![Line::from("")];
    for (i, field) in FormField::ALL.iter().enumerate() {
        let selected = i == app.selected_field;
        let value = app.form.field(*field);
        let shown = if value.is_empty() && field.is_numeric() && !selected {
            "0.00".to_string()
        } else if selected {
            format!("{}▏", value)
        } else {
            value.to_string()
        };

        lines.push(Line::from(vec![
            Span::raw(if selected { "  → " } else { "    " }),
            Span::styled(
                format!("{:<20}", field.label()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                shown,
                if selected {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else if value.is_empty() {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default().fg(Color::White)
                },
            ),
        ]));
        lines.push(Line::from(""));
    }

    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title),
    );
    f.render_widget(form, chunks[0]);

    // Live preview of the derived figures
    let input = app.form.coerce(today());
    let derived = capital_ledger::derive(&input, app.ledger.basis());

    let preview = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Income basis: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(app.ledger.basis().to_string()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Total Expenses: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(money(app, input.total_expenses()), Style::default().fg(EXPENSE_COLOR)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Net Income: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(
                money(app, derived.net_income),
                Style::default().fg(signed_color(derived.net_income)).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Capital Remaining: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(
                money(app, derived.capital_remaining),
                Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(Span::styled(
            "  Non-numeric amounts count as 0",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    let preview_panel = Paragraph::new(preview).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(" Preview "),
    );
    f.render_widget(preview_panel, chunks[1]);
}

// ============================================================================
// Records: stats cards + table
// ============================================================================

fn render_stats_cards(f: &mut Frame, area: Rect, app: &App) {
    let totals = app.ledger.totals();
    let cards = [
        ("Total Capital", totals.total_capital, Color::Blue),
        ("Total Income", totals.total_gross_income, Color::Green),
        ("Total Expenses", totals.total_expenses(), Color::Red),
        ("Net Income", totals.total_net_income, Color::Magenta),
        ("Capital Remaining", totals.final_capital_remaining, Color::LightRed),
    ];

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(20); 5])
        .split(area);

    for (i, (label, value, color)) in cards.iter().enumerate() {
        let card = Paragraph::new(vec![Line::from(Span::styled(
            money(app, *value),
            Style::default().fg(*color).add_modifier(Modifier::BOLD),
        ))])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(*color))
                .title(format!(" {} ", label)),
        );
        f.render_widget(card, chunks[i]);
    }
}

fn render_records(f: &mut Frame, area: Rect, app: &mut App) {
    if app.ledger.is_empty() {
        render_empty_state(f, area, " Detailed Records ");
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    render_stats_cards(f, chunks[0], app);

    let header_cells = [
        "Date", "Capital", "Factory", "Personal", "Loans", "Rejects", "Production", "Gross", "Net Income",
        "Cap. Remaining",
    ]
    .iter()
    .map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.ledger.entries().iter().map(|e| {
        let cells = vec![
            Cell::from(e.date.to_string()),
            Cell::from(format_grouped(e.capital)),
            Cell::from(format_grouped(e.factory_expenses)),
            Cell::from(format_grouped(e.personal_expenses)),
            Cell::from(format_grouped(e.loans)),
            Cell::from(format_grouped(e.rejects)),
            Cell::from(format_grouped(e.production)),
            Cell::from(format_grouped(e.gross_income)).style(Style::default().fg(Color::LightBlue)),
            Cell::from(format_grouped(e.net_income)).style(Style::default().fg(signed_color(e.net_income))),
            Cell::from(format_grouped(e.capital_remaining)).style(Style::default().fg(Color::LightRed)),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(11),
            Constraint::Length(13),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(11),
            Constraint::Length(12),
            Constraint::Length(13),
            Constraint::Length(13),
            Constraint::Length(15),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Detailed Records "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, chunks[1], &mut app.state);
}

fn render_delete_confirm(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 7, f.size());
    let date = app
        .delete_confirm
        .as_deref()
        .and_then(|id| app.ledger.get(id))
        .map(|e| e.date.to_string())
        .unwrap_or_default();

    let content = vec![
        Line::from(""),
        Line::from(format!("  Delete the record dated {}?", date)),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("y", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(" delete   "),
            Span::styled("n", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(" keep"),
        ]),
    ];

    let popup = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Confirm Delete "),
    );

    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

// ============================================================================
// Analytics: charts
// ============================================================================

fn render_analytics(f: &mut Frame, area: Rect, app: &App) {
    if app.ledger.is_empty() {
        render_empty_state(f, area, " Analytics & Charts ");
        return;
    }

    let title = format!(" Analytics & Charts - {} / {} ", app.view_mode.title(), app.chart_kind.title());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title);

    match app.chart_kind {
        ChartKind::Line => render_line_chart(f, area, app, block),
        ChartKind::Bar => render_bar_chart(f, area, app, block),
        ChartKind::Pie => render_breakdown(f, area, app, block),
    }
}

fn series(rows: &[SummaryRow], value: impl Fn(&SummaryRow) -> Decimal) -> Vec<(f64, f64)> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| (i as f64, to_f64(value(row))))
        .collect()
}

fn render_line_chart(f: &mut Frame, area: Rect, app: &App, block: Block) {
    let rows = app.summary_rows();
    let net = series(&rows, |r| r.net_income);
    let expenses = series(&rows, |r| r.total_expenses);
    let gross = series(&rows, |r| r.gross_income);

    let values = net.iter().chain(&expenses).chain(&gross).map(|(_, y)| *y);
    let (mut y_min, mut y_max) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), y| (lo.min(y), hi.max(y)));
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }
    y_max *= 1.1;
    if y_min < 0.0 {
        y_min *= 1.1;
    }

    let x_max = (rows.len().saturating_sub(1)).max(1) as f64;
    let x_labels: Vec<Span> = match rows.len() {
        0 => vec![],
        1 => vec![Span::raw(rows[0].key.clone())],
        n => vec![
            Span::raw(rows[0].key.clone()),
            Span::raw(rows[n / 2].key.clone()),
            Span::raw(rows[n - 1].key.clone()),
        ],
    };

    let datasets = vec![
        Dataset::default()
            .name("Net Income")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(NET_COLOR))
            .data(&net),
        Dataset::default()
            .name("Total Expenses")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(EXPENSE_COLOR))
            .data(&expenses),
        Dataset::default()
            .name("Gross Income")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(GROSS_COLOR))
            .data(&gross),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title("Period")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title(app.config.currency_symbol.clone())
                .style(Style::default().fg(Color::Gray))
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format!("{:.0}", y_min)),
                    Span::raw(format!("{:.0}", (y_min + y_max) / 2.0)),
                    Span::raw(format!("{:.0}", y_max)),
                ]),
        );

    f.render_widget(chart, area);
}

// Capped so the bar chart's height scaling cannot overflow
fn bar_value(value: Decimal) -> u64 {
    to_f64(value).clamp(0.0, u32::MAX as f64).round() as u64
}

fn render_bar_chart(f: &mut Frame, area: Rect, app: &App, block: Block) {
    let rows = app.summary_rows();

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let legend = Line::from(vec![
        Span::styled("■ Net Income  ", Style::default().fg(NET_COLOR)),
        Span::styled("■ Total Expenses  ", Style::default().fg(EXPENSE_COLOR)),
        Span::styled("■ Gross Income", Style::default().fg(GROSS_COLOR)),
    ]);
    f.render_widget(Paragraph::new(legend), chunks[0]);

    let mut chart = BarChart::default().bar_width(3).bar_gap(0).group_gap(2);
    for row in &rows {
        let bars = [
            Bar::default().value(bar_value(row.net_income)).style(Style::default().fg(NET_COLOR)),
            Bar::default().value(bar_value(row.total_expenses)).style(Style::default().fg(EXPENSE_COLOR)),
            Bar::default().value(bar_value(row.gross_income)).style(Style::default().fg(GROSS_COLOR)),
        ];
        chart = chart.data(BarGroup::default().label(Line::from(row.key.clone())).bars(&bars));
    }

    f.render_widget(chart, chunks[1]);
}

fn render_breakdown(f: &mut Frame, area: Rect, app: &App, block: Block) {
    let totals = app.ledger.totals();
    let slices: Vec<_> = expense_breakdown(&totals)
        .into_iter()
        .enumerate()
        .filter(|(_, s)| s.value > Decimal::ZERO)
        .collect();

    let inner = block.inner(area);
    f.render_widget(block, area);

    if slices.is_empty() {
        f.render_widget(Paragraph::new("  No expenses recorded"), inner);
        return;
    }

    let mut constraints = vec![Constraint::Length(3); slices.len()];
    constraints.push(Constraint::Min(0));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (slot, (i, slice)) in slices.iter().enumerate() {
        let color = SLICE_COLORS[*i % SLICE_COLORS.len()];
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(format!(" {} ", slice.name)))
            .gauge_style(Style::default().fg(color))
            .ratio(slice.share)
            .label(format!("{} ({:.1}%)", money(app, slice.value), slice.share * 100.0));
        f.render_widget(gauge, chunks[slot]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capital_ledger::IncomeBasis;
    use ratatui::backend::TestBackend;
    use std::str::FromStr;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(press(KeyCode::Char(c)));
        }
    }

    fn fill_form(app: &mut App, date: &str, capital: &str, production: &str, factory: &str) {
        app.current_page = Page::EntryForm;
        app.form.date.clear();
        type_text(app, date);
        app.handle_key(press(KeyCode::Down));
        type_text(app, capital);
        app.handle_key(press(KeyCode::Down));
        type_text(app, factory);
        for _ in 0..4 {
            app.handle_key(press(KeyCode::Down));
        }
        type_text(app, production);
    }

    fn new_app() -> App {
        App::new(Ledger::new(IncomeBasis::Production), Config::default())
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_submit_adds_entry_and_resets_form() {
        let mut app = new_app();
        fill_form(&mut app, "2025-01-15", "1000", "500", "150");

        assert_eq!(app.current_field(), FormField::Production);
        app.handle_key(press(KeyCode::Enter));

        assert_eq!(app.ledger.len(), 1);
        let entry = &app.ledger.entries()[0];
        assert_eq!(entry.net_income, d("350"));
        assert_eq!(entry.capital_remaining, d("1350"));
        assert_eq!(app.form, EntryForm::new(today()));
        assert_eq!(app.selected_field, 0);
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_edit_preserves_id() {
        let mut app = new_app();
        fill_form(&mut app, "2025-01-15", "1000", "500", "150");
        app.handle_key(press(KeyCode::Enter));
        let id = app.ledger.entries()[0].id.clone();

        app.current_page = Page::Records;
        app.handle_key(press(KeyCode::Char('e')));
        assert_eq!(app.current_page, Page::EntryForm);
        assert_eq!(app.editing_id.as_deref(), Some(id.as_str()));
        assert_eq!(app.form.capital, "1000");

        // Change capital: 1000 -> 2000
        app.handle_key(press(KeyCode::Down));
        for _ in 0..4 {
            app.handle_key(press(KeyCode::Backspace));
        }
        type_text(&mut app, "2000");
        app.handle_key(press(KeyCode::Enter));

        assert_eq!(app.ledger.len(), 1);
        let entry = &app.ledger.entries()[0];
        assert_eq!(entry.id, id);
        assert_eq!(entry.capital_remaining, d("2350"));
        assert!(app.editing_id.is_none());
    }

    #[test]
    fn test_cancel_edit_leaves_entry_alone() {
        let mut app = new_app();
        fill_form(&mut app, "2025-01-15", "1000", "500", "150");
        app.handle_key(press(KeyCode::Enter));
        let before = app.ledger.entries()[0].clone();

        app.current_page = Page::Records;
        app.handle_key(press(KeyCode::Char('e')));
        type_text(&mut app, "junk");
        app.handle_key(press(KeyCode::Esc));

        assert!(app.editing_id.is_none());
        assert_eq!(app.ledger.entries()[0], before);
        assert_eq!(app.form, EntryForm::new(today()));
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let mut app = new_app();
        fill_form(&mut app, "2025-01-15", "1000", "500", "150");
        app.handle_key(press(KeyCode::Enter));
        fill_form(&mut app, "2025-01-16", "10", "5", "1");
        app.handle_key(press(KeyCode::Enter));

        app.current_page = Page::Records;
        app.state.select(Some(1));
        app.handle_key(press(KeyCode::Char('d')));
        assert!(app.delete_confirm.is_some());

        // Keys other than y/n are swallowed while confirming
        assert!(!app.handle_key(press(KeyCode::Char('q'))));
        app.handle_key(press(KeyCode::Char('n')));
        assert_eq!(app.ledger.len(), 2);

        app.handle_key(press(KeyCode::Char('d')));
        app.handle_key(press(KeyCode::Char('y')));
        assert_eq!(app.ledger.len(), 1);
        assert_eq!(app.ledger.entries()[0].date.to_string(), "2025-01-15");
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_analytics_toggles() {
        let mut app = new_app();
        app.current_page = Page::Analytics;

        app.handle_key(press(KeyCode::Char('v')));
        assert_eq!(app.view_mode, GroupMode::Monthly);
        app.handle_key(press(KeyCode::Char('c')));
        assert_eq!(app.chart_kind, ChartKind::Bar);
        assert!(app.handle_key(press(KeyCode::Char('q'))));
    }

    #[test]
    fn test_q_types_into_form() {
        let mut app = new_app();
        app.selected_field = 1;

        assert!(!app.handle_key(press(KeyCode::Char('q'))));
        assert_eq!(app.form.capital, "q");
        assert!(app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn test_tab_cycles_pages() {
        let mut app = new_app();
        assert_eq!(app.current_page, Page::EntryForm);

        app.handle_key(press(KeyCode::Tab));
        assert_eq!(app.current_page, Page::Records);
        app.handle_key(press(KeyCode::BackTab));
        assert_eq!(app.current_page, Page::EntryForm);
    }

    #[test]
    fn test_every_page_renders() {
        let mut app = new_app();
        let backend = TestBackend::new(140, 45);
        let mut terminal = Terminal::new(backend).unwrap();

        // Empty state first
        for page in [Page::EntryForm, Page::Records, Page::Analytics] {
            app.current_page = page;
            terminal.draw(|f| ui(f, &mut app)).unwrap();
        }

        fill_form(&mut app, "2025-01-15", "1000", "500", "150");
        app.handle_key(press(KeyCode::Enter));
        fill_form(&mut app, "2025-02-01", "1350", "50", "400");
        app.handle_key(press(KeyCode::Enter));

        app.current_page = Page::Records;
        terminal.draw(|f| ui(f, &mut app)).unwrap();
        app.handle_key(press(KeyCode::Char('d')));
        terminal.draw(|f| ui(f, &mut app)).unwrap();
        app.cancel_delete();

        app.current_page = Page::Analytics;
        for mode in [GroupMode::Daily, GroupMode::Monthly] {
            app.view_mode = mode;
            for kind in [ChartKind::Line, ChartKind::Bar, ChartKind::Pie] {
                app.chart_kind = kind;
                terminal.draw(|f| ui(f, &mut app)).unwrap();
            }
        }
    }

    #[test]
    fn test_event_errors_end_the_session() {
        let mut app = new_app();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        let res = run_app(&mut terminal, &mut app, || {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "input closed"))
        });

        assert_eq!(res.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_ctrl_c_ends_the_session() {
        let mut app = new_app();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        let res = run_app(&mut terminal, &mut app, || {
            Ok(Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)))
        });

        assert!(res.is_ok());
    }

    #[test]
    fn test_guard_restores_during_panic() {
        use std::sync::atomic::{AtomicBool, Ordering};

        static RESTORED: AtomicBool = AtomicBool::new(false);
        fn mark() -> io::Result<()> {
            RESTORED.store(true, Ordering::SeqCst);
            Ok(())
        }

        let outcome = std::panic::catch_unwind(|| {
            let _guard = TerminalGuard { restore: mark };
            panic!("render failed");
        });

        assert!(outcome.is_err());
        assert!(RESTORED.load(Ordering::SeqCst));
    }

    #[test]
    fn test_huge_amounts_render() {
        let mut app = new_app();
        let mut terminal = Terminal::new(TestBackend::new(140, 45)).unwrap();

        fill_form(&mut app, "2025-01-15", "5e28", "5e28", "0");
        terminal.draw(|f| ui(f, &mut app)).unwrap();
        app.handle_key(press(KeyCode::Enter));
        fill_form(&mut app, "2025-01-15", "5e28", "5e28", "1e30");
        app.handle_key(press(KeyCode::Enter));

        assert_eq!(app.ledger.len(), 2);
        assert_eq!(app.ledger.entries()[0].capital_remaining, Decimal::MAX);
        assert_eq!(app.ledger.totals().total_capital, Decimal::MAX);

        for page in [Page::Records, Page::Analytics] {
            app.current_page = page;
            for kind in [ChartKind::Line, ChartKind::Bar, ChartKind::Pie] {
                app.chart_kind = kind;
                terminal.draw(|f| ui(f, &mut app)).unwrap();
            }
        }
    }
}
