// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use postsheet_app::{
    AppCommand, AppMode, AppState, PostReport, ReplyReport, Row, RowField, RowId, RowStore,
    STATUS_DISPATCH_FAILED,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row as TableRow, Table};
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const HALF_PAGE_ROWS: isize = 10;
const EDIT_CURSOR: &str = "▏";

/// Network work the UI hands off; each variant owns a snapshot of the rows
/// it covers, taken when the user asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchRequest {
    PostAll(Vec<Row>),
    PostRow(Row),
    AutoReply(Vec<Row>),
}

impl DispatchRequest {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::PostAll(_) => "posting all rows",
            Self::PostRow(_) => "posting row",
            Self::AutoReply(_) => "sending auto-replies",
        }
    }

    /// The failure event for this kind of request.
    pub fn failed(&self, error: impl Into<String>) -> DispatchEvent {
        match self {
            Self::PostAll(_) | Self::PostRow(_) => DispatchEvent::PostFailed(error.into()),
            Self::AutoReply(_) => DispatchEvent::ReplyFailed(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    Posted(PostReport),
    Replied(ReplyReport),
    PostFailed(String),
    ReplyFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    Dispatch(DispatchEvent),
}

pub trait AppRuntime {
    fn export_csv(&mut self, rows: &[Row]) -> Result<PathBuf>;
    fn export_pdf(&mut self, rows: &[Row]) -> Result<PathBuf>;

    /// Starts `request` and later sends exactly one `InternalEvent::Dispatch`
    /// over `tx`, failures included. An `Err` means nothing was started and
    /// no event will follow.
    fn spawn_dispatch(
        &mut self,
        request: DispatchRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableCommand {
    MoveRow(isize),
    MoveColumn(isize),
    JumpFirstRow,
    JumpLastRow,
    JumpFirstColumn,
    JumpLastColumn,
    AddRow,
    DeleteRow,
    SortColumn,
    EditCell,
    OpenFind,
    PostRow,
    PostAll,
    AutoReply,
    ExportCsv,
    ExportPdf,
    ToggleHelp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EditBuffer {
    row_id: RowId,
    field: RowField,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct FindUiState {
    query: String,
    last_match: Option<RowId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    selected_row: usize,
    selected_col: usize,
    edit: Option<EditBuffer>,
    find: FindUiState,
    status_token: u64,
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    store: &mut RowStore,
    runtime: &mut R,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, store, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, store, runtime, &mut view_data, &internal_tx, key)
                    {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Dispatch(event) => {
                let message = dispatch_status_message(&event);
                state.dispatch(AppCommand::DispatchFinished(message));
                bump_status_token(view_data, tx);
            }
        }
    }
}

fn dispatch_status_message(event: &DispatchEvent) -> String {
    match event {
        DispatchEvent::Posted(report) => report.status_message(),
        DispatchEvent::Replied(report) => report.status_message(),
        DispatchEvent::PostFailed(error) => {
            warn!(error = %error, "post dispatch failed");
            STATUS_DISPATCH_FAILED.to_owned()
        }
        DispatchEvent::ReplyFailed(error) => {
            warn!(error = %error, "auto-reply dispatch failed");
            format!("auto-reply failed: {error}")
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn bump_status_token(view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>) {
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    bump_status_token(view_data, internal_tx);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    store: &mut RowStore,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if state.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            state.dispatch(AppCommand::ToggleHelp);
            bump_status_token(view_data, internal_tx);
        }
        return false;
    }

    match state.mode {
        AppMode::Edit => handle_edit_key(state, store, view_data, internal_tx, key),
        AppMode::Find => handle_find_key(state, store, view_data, internal_tx, key),
        AppMode::Nav => {
            if let Some(command) = table_command_for_key(key) {
                apply_table_command(state, store, runtime, view_data, internal_tx, command);
            }
        }
    }
    false
}

fn handle_edit_key(
    state: &mut AppState,
    store: &mut RowStore,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(edit) = view_data.edit.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };

    match key.code {
        KeyCode::Esc => {
            view_data.edit = None;
            state.dispatch(AppCommand::ExitToNav);
            emit_status(state, view_data, internal_tx, "edit canceled");
        }
        KeyCode::Enter => {
            let Some(edit) = view_data.edit.take() else {
                return;
            };
            state.dispatch(AppCommand::ExitToNav);
            // The row may have been deleted or moved while editing; the id
            // still names the right record, or nothing at all.
            if store.update_field(edit.row_id, edit.field, edit.value) {
                if let Some(index) = store.position(edit.row_id) {
                    view_data.selected_row = index;
                }
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("{} updated", edit.field.label()),
                );
            } else {
                emit_status(state, view_data, internal_tx, "row no longer exists");
            }
        }
        KeyCode::Backspace => {
            edit.value.pop();
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            edit.value.push(ch);
        }
        _ => {}
    }
}

fn handle_find_key(
    state: &mut AppState,
    store: &RowStore,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            state.dispatch(AppCommand::ExitToNav);
            emit_status(state, view_data, internal_tx, "find closed");
        }
        KeyCode::Enter => {
            let after = view_data
                .find
                .last_match
                .or_else(|| selected_row_id(store, view_data));
            match store.find(&view_data.find.query, after) {
                Some(id) => {
                    view_data.find.last_match = Some(id);
                    if let Some(index) = store.position(id) {
                        view_data.selected_row = index;
                    }
                    let message = format!("find: {} (enter for next)", view_data.find.query);
                    emit_status(state, view_data, internal_tx, message);
                }
                None => {
                    let message = format!("find: no rows match {:?}", view_data.find.query);
                    emit_status(state, view_data, internal_tx, message);
                }
            }
        }
        KeyCode::Backspace => {
            view_data.find.query.pop();
            view_data.find.last_match = None;
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.find.query.push(ch);
            view_data.find.last_match = None;
        }
        _ => {}
    }
}

fn table_command_for_key(key: KeyEvent) -> Option<TableCommand> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('d') => Some(TableCommand::MoveRow(HALF_PAGE_ROWS)),
            KeyCode::Char('u') => Some(TableCommand::MoveRow(-HALF_PAGE_ROWS)),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Some(TableCommand::MoveRow(1)),
        KeyCode::Char('k') | KeyCode::Up => Some(TableCommand::MoveRow(-1)),
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Tab => Some(TableCommand::MoveColumn(1)),
        KeyCode::Char('h') | KeyCode::Left | KeyCode::BackTab => {
            Some(TableCommand::MoveColumn(-1))
        }
        KeyCode::Char('g') | KeyCode::Home => Some(TableCommand::JumpFirstRow),
        KeyCode::Char('G') | KeyCode::End => Some(TableCommand::JumpLastRow),
        KeyCode::Char('^') => Some(TableCommand::JumpFirstColumn),
        KeyCode::Char('$') => Some(TableCommand::JumpLastColumn),
        KeyCode::Char('a') => Some(TableCommand::AddRow),
        KeyCode::Char('x') | KeyCode::Delete => Some(TableCommand::DeleteRow),
        KeyCode::Char('s') => Some(TableCommand::SortColumn),
        KeyCode::Char('i') | KeyCode::Enter => Some(TableCommand::EditCell),
        KeyCode::Char('/') => Some(TableCommand::OpenFind),
        KeyCode::Char('p') => Some(TableCommand::PostRow),
        KeyCode::Char('P') => Some(TableCommand::PostAll),
        KeyCode::Char('r') => Some(TableCommand::AutoReply),
        KeyCode::Char('c') => Some(TableCommand::ExportCsv),
        KeyCode::Char('e') => Some(TableCommand::ExportPdf),
        KeyCode::Char('?') => Some(TableCommand::ToggleHelp),
        _ => None,
    }
}

fn apply_table_command<R: AppRuntime>(
    state: &mut AppState,
    store: &mut RowStore,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: TableCommand,
) {
    let last_row = store.len().saturating_sub(1);
    let last_col = RowField::ALL.len() - 1;

    match command {
        TableCommand::MoveRow(delta) => {
            view_data.selected_row = view_data
                .selected_row
                .saturating_add_signed(delta)
                .min(last_row);
        }
        TableCommand::MoveColumn(delta) => {
            view_data.selected_col = view_data
                .selected_col
                .saturating_add_signed(delta)
                .min(last_col);
        }
        TableCommand::JumpFirstRow => view_data.selected_row = 0,
        TableCommand::JumpLastRow => view_data.selected_row = last_row,
        TableCommand::JumpFirstColumn => view_data.selected_col = 0,
        TableCommand::JumpLastColumn => view_data.selected_col = last_col,
        TableCommand::AddRow => {
            let id = store.add_row();
            view_data.selected_row = store.position(id).unwrap_or(last_row);
            emit_status(state, view_data, internal_tx, "row added");
        }
        TableCommand::DeleteRow => {
            let Some(id) = selected_row_id(store, view_data) else {
                emit_status(state, view_data, internal_tx, "no row selected");
                return;
            };
            store.delete_row(id);
            view_data.selected_row = view_data
                .selected_row
                .min(store.len().saturating_sub(1));
            emit_status(state, view_data, internal_tx, "row deleted");
        }
        TableCommand::SortColumn => {
            let field = selected_field(view_data);
            let keep = selected_row_id(store, view_data);
            store.sort_by(field);
            if let Some(index) = keep.and_then(|id| store.position(id)) {
                view_data.selected_row = index;
            }
            let direction = match store.sort_state().direction() {
                Some(postsheet_app::SortDirection::Desc) => "desc",
                _ => "asc",
            };
            let message = format!("sort {} {direction}", field.label());
            emit_status(state, view_data, internal_tx, message);
        }
        TableCommand::EditCell => {
            let Some(row) = store.rows().get(view_data.selected_row) else {
                emit_status(state, view_data, internal_tx, "add a row first (a)");
                return;
            };
            let field = selected_field(view_data);
            view_data.edit = Some(EditBuffer {
                row_id: row.id,
                field,
                value: row.field(field).to_owned(),
            });
            state.dispatch(AppCommand::EnterEditMode);
        }
        TableCommand::OpenFind => {
            view_data.find = FindUiState::default();
            state.dispatch(AppCommand::EnterFindMode);
        }
        TableCommand::PostRow => {
            let Some(row) = store.rows().get(view_data.selected_row).cloned() else {
                emit_status(state, view_data, internal_tx, "no row selected");
                return;
            };
            start_dispatch(
                state,
                runtime,
                view_data,
                internal_tx,
                DispatchRequest::PostRow(row),
            );
        }
        TableCommand::PostAll => {
            let request = DispatchRequest::PostAll(store.snapshot());
            start_dispatch(state, runtime, view_data, internal_tx, request);
        }
        TableCommand::AutoReply => {
            let request = DispatchRequest::AutoReply(store.snapshot());
            start_dispatch(state, runtime, view_data, internal_tx, request);
        }
        TableCommand::ExportCsv => {
            let message = match runtime.export_csv(store.rows()) {
                Ok(path) => format!("exported {}", path.display()),
                Err(error) => format!("csv export failed: {error:#}"),
            };
            emit_status(state, view_data, internal_tx, message);
        }
        TableCommand::ExportPdf => {
            let message = match runtime.export_pdf(store.rows()) {
                Ok(path) => format!("exported {}", path.display()),
                Err(error) => format!("pdf export failed: {error:#}"),
            };
            emit_status(state, view_data, internal_tx, message);
        }
        TableCommand::ToggleHelp => {
            state.dispatch(AppCommand::ToggleHelp);
            bump_status_token(view_data, internal_tx);
        }
    }
}

fn start_dispatch<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    request: DispatchRequest,
) {
    debug!(request = request.label(), "starting dispatch");
    state.dispatch(AppCommand::DispatchStarted(request.label()));
    if let Err(error) = runtime.spawn_dispatch(request, internal_tx.clone()) {
        state.dispatch(AppCommand::DispatchFinished(format!(
            "dispatch failed to start: {error:#}"
        )));
        bump_status_token(view_data, internal_tx);
    }
}

fn selected_field(view_data: &ViewData) -> RowField {
    RowField::ALL[view_data.selected_col.min(RowField::ALL.len() - 1)]
}

fn selected_row_id(store: &RowStore, view_data: &ViewData) -> Option<RowId> {
    store.rows().get(view_data.selected_row).map(|row| row.id)
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, store: &RowStore, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(frame.area());

    render_table(frame, layout[0], store, view_data);

    let status = Paragraph::new(status_text(state, store, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[1]);

    if state.help_visible {
        let area = centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, store: &RowStore, view_data: &ViewData) {
    let header = TableRow::new(RowField::ALL.iter().map(|field| {
        Cell::from(header_label(store, *field)).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows = store.rows().iter().enumerate().map(|(row_index, row)| {
        let selected_row = row_index == view_data.selected_row;
        let cells = RowField::ALL
            .iter()
            .enumerate()
            .map(|(column_index, field)| {
                let selected_cell = selected_row && column_index == view_data.selected_col;
                let text = match &view_data.edit {
                    Some(edit) if edit.row_id == row.id && edit.field == *field => {
                        format!("{}{EDIT_CURSOR}", edit.value)
                    }
                    _ => row.field(*field).to_owned(),
                };
                let mut style = Style::default();
                if selected_row {
                    style = style.bg(Color::DarkGray);
                }
                if selected_cell {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD);
                }
                Cell::from(text).style(style)
            })
            .collect::<Vec<_>>();
        TableRow::new(cells)
    });

    let widths = [
        Constraint::Percentage(14),
        Constraint::Percentage(14),
        Constraint::Percentage(10),
        Constraint::Percentage(21),
        Constraint::Percentage(21),
        Constraint::Percentage(20),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(store))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);
}

fn header_label(store: &RowStore, field: RowField) -> String {
    let indicator = store.sort_state().indicator_for(field);
    if indicator.is_empty() {
        field.label().to_owned()
    } else {
        format!("{} {indicator}", field.label())
    }
}

fn table_title(store: &RowStore) -> String {
    match (store.sort_state().field(), store.sort_state().direction()) {
        (Some(field), Some(direction)) => format!(
            "postsheet - sorted by {} {}",
            field.label(),
            direction.indicator()
        ),
        _ => "postsheet".to_owned(),
    }
}

fn status_text(state: &AppState, store: &RowStore, view_data: &ViewData) -> String {
    let mode = match state.mode {
        AppMode::Nav => "NAV",
        AppMode::Edit => "EDIT",
        AppMode::Find => "FIND",
    };
    let hints = match state.mode {
        AppMode::Nav => {
            "j/k/h/l | enter edit | a add x del | s sort | p/P post | r reply | c csv e pdf | / find | ? help | ctrl+q"
        }
        AppMode::Edit => "enter save | esc cancel",
        AppMode::Find => "enter next match | esc close",
    };

    let mut parts = vec![mode.to_owned()];
    if state.mode == AppMode::Find {
        parts.push(format!("/{}", view_data.find.query));
    }
    if let Some(status) = &state.status_line {
        parts.push(status.clone());
    }
    if state.dispatch_in_flight > 0 {
        parts.push(format!("in flight: {}", state.dispatch_in_flight));
    }
    parts.push(format!("rows: {}", store.len()));
    parts.push(hints.to_owned());
    parts.join(" | ")
}

fn help_overlay_text() -> &'static str {
    "navigation\n  j/k or arrows   move between rows\n  h/l or arrows   move between columns\n  g/G ^/$         first/last row, first/last column\n  ctrl+d/ctrl+u   half page down/up\n\nediting\n  enter or i      edit the selected cell (enter saves, esc cancels)\n  a               add a blank row\n  x               delete the selected row\n  s               sort by the selected column (again to reverse)\n  /               find text in any column\n\ndispatch\n  p               post the selected row\n  P               post every row\n  r               send auto-replies\n\nexport\n  c               write spreadsheet.csv\n  e               write spreadsheet.pdf\n\n  ?               toggle this help\n  ctrl+q          quit"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
