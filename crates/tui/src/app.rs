use std::{
    cmp,
    collections::VecDeque,
    env, io,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc};
use tracing::{error, info, warn};
use backlog_core::{
    backup::{BackupEvent, BackupJob, CloudBackup},
    config::AppConfig,
    manifest::{self, BackupManifest},
    models::{Game, GameRanking, GameStatus, Locale},
    query::{paginate, GameQuery, Page, StatusCounts},
    spreadsheet::{self, Column},
    store::{GameStore, StoreError},
    transfer,
};

use crate::form::{GameForm, LineInput};

const TICK_RATE: Duration = Duration::from_millis(250);
const CONSOLE_LIMIT: usize = 80;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

impl Theme {
    fn status_color(&self, status: GameStatus) -> Color {
        match status {
            GameStatus::Platinum => Color::LightCyan,
            GameStatus::Completed => self.success,
            GameStatus::Finished => Color::LightGreen,
            GameStatus::InProgress => self.warning,
            GameStatus::Dropped => self.danger,
            GameStatus::Tried => Color::LightBlue,
            GameStatus::NotStarted => self.muted,
            GameStatus::NotApplicable => self.muted,
        }
    }

    fn ranking_color(&self, ranking: GameRanking) -> Color {
        match ranking {
            GameRanking::SPlus | GameRanking::S => Color::LightMagenta,
            GameRanking::A | GameRanking::B => self.success,
            GameRanking::C | GameRanking::D => self.warning,
            GameRanking::E | GameRanking::F => self.danger,
            GameRanking::G => self.muted,
        }
    }
}

/// Pick the Spanish or English variant of an interface string.
fn tr(locale: Locale, es: &'static str, en: &'static str) -> &'static str {
    match locale {
        Locale::Es => es,
        Locale::En => en,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    List,
    Form,
    Legend,
    Backup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathAction {
    ExportJson,
    ImportJson,
    ExportSpreadsheet,
    ImportSpreadsheet,
}

impl PathAction {
    fn title(self, locale: Locale) -> &'static str {
        match self {
            PathAction::ExportJson => tr(locale, "Exportar JSON", "Export JSON"),
            PathAction::ImportJson => tr(locale, "Importar JSON", "Import JSON"),
            PathAction::ExportSpreadsheet => tr(locale, "Exportar Excel", "Export spreadsheet"),
            PathAction::ImportSpreadsheet => tr(locale, "Importar Excel", "Import spreadsheet"),
        }
    }

    fn default_file(self) -> &'static str {
        match self {
            PathAction::ExportJson | PathAction::ImportJson => transfer::DEFAULT_BACKUP_NAME,
            PathAction::ExportSpreadsheet | PathAction::ImportSpreadsheet => {
                spreadsheet::DEFAULT_EXPORT_NAME
            }
        }
    }
}

#[derive(Debug, Clone)]
struct PathPromptModal {
    action: PathAction,
    input: LineInput,
    default: String,
}

impl PathPromptModal {
    fn new(action: PathAction) -> Self {
        let default = env::current_dir()
            .map(|dir| dir.join(action.default_file()))
            .unwrap_or_else(|_| PathBuf::from(action.default_file()))
            .display()
            .to_string();
        Self {
            action,
            input: LineInput::with_value(default.clone()),
            default,
        }
    }

    fn path(&self) -> PathBuf {
        let trimmed = self.input.value().trim();
        if trimmed.is_empty() {
            PathBuf::from(&self.default)
        } else {
            PathBuf::from(trimmed)
        }
    }
}

#[derive(Debug, Clone)]
enum ConfirmModal {
    Delete { id: String, title: String },
    DeleteAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriveAction {
    Upload,
    Download,
}

/// Timestamped backup log, oldest entries dropped first.
#[derive(Debug, Default)]
struct BackupConsole {
    lines: VecDeque<String>,
}

impl BackupConsole {
    fn push(&mut self, message: impl AsRef<str>) {
        let entry = format!("[{}] {}", Local::now().format("%H:%M:%S"), message.as_ref());
        self.lines.push_back(entry);
        while self.lines.len() > CONSOLE_LIMIT {
            self.lines.pop_front();
        }
    }

    fn tail(&self, count: usize) -> impl Iterator<Item = &String> {
        self.lines.iter().skip(self.lines.len().saturating_sub(count))
    }
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// Terminal front end owning the game store.
pub struct BacklogApp {
    store: GameStore,
    config: AppConfig,
    state: UiState,
    screen: Screen,
    form: Option<GameForm>,
    prompt: Option<PathPromptModal>,
    confirm: Option<ConfirmModal>,
    console: BackupConsole,
    manifest: BackupManifest,
    backup_busy: bool,
    backup_tx: mpsc::Sender<BackupEvent>,
    backup_rx: Option<mpsc::Receiver<BackupEvent>>,
    theme: Theme,
}

impl BacklogApp {
    pub fn new(store: GameStore, config: AppConfig) -> Self {
        let (backup_tx, backup_rx) = mpsc::channel(16);
        let manifest = load_manifest(&config);
        let state = UiState::new(config.locale);
        Self {
            store,
            config,
            state,
            screen: Screen::List,
            form: None,
            prompt: None,
            confirm: None,
            console: BackupConsole::default(),
            manifest,
            backup_busy: false,
            backup_tx,
            backup_rx: Some(backup_rx),
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.state
            .set_status(format!("Loaded {} games", self.store.len()));
        if self.config.drive.access_token.is_none() {
            self.console.push(tr(
                self.locale(),
                "Configura BACKLOG__DRIVE__ACCESS_TOKEN para habilitar Google Drive.",
                "Set BACKLOG__DRIVE__ACCESS_TOKEN to enable the Google Drive actions.",
            ));
        }

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        let mut backup_rx = self.backup_rx.take();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }

            if let Some(rx) = backup_rx.as_mut() {
                let mut backup_closed = false;
                tokio::select! {
                    maybe_event = event_rx.recv() => {
                        if !self.process_app_event(maybe_event) {
                            break;
                        }
                    }
                    maybe_backup = rx.recv() => {
                        match maybe_backup {
                            Some(event) => self.handle_backup_event(event),
                            None => backup_closed = true,
                        }
                    }
                }
                if backup_closed {
                    backup_rx = None;
                }
            } else {
                let maybe_event = event_rx.recv().await;
                if !self.process_app_event(maybe_event) {
                    break;
                }
            }

            if self.state.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        Ok(())
    }

    fn locale(&self) -> Locale {
        self.state.locale()
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                let result = if self.confirm.is_some() {
                    self.handle_confirm_key(key)
                } else if self.prompt.is_some() {
                    self.handle_prompt_key(key)
                } else {
                    self.handle_key(key)
                };
                if let Err(err) = result {
                    error!("{err:#}");
                    self.state.set_status(format!("Error: {err:#}"));
                }
                true
            }
            Some(AppEvent::Input(_)) => true,
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            None => false,
        }
    }

    fn handle_tick(&mut self) {
        if self.state.mode == Mode::Search {
            let search = self.state.search.value().to_string();
            self.state.set_status(format!("Search: {search}"));
        }
    }

    fn handle_backup_event(&mut self, event: BackupEvent) {
        let locale = self.locale();
        match event {
            BackupEvent::FileReady { file_id } => {
                info!(file_id = %file_id, "backup file ready");
                self.console
                    .push(tr(locale, "Archivo listo en appDataFolder", "File ready in appDataFolder"));
            }
            BackupEvent::Uploaded { file_id } => {
                self.backup_busy = false;
                info!(file_id = %file_id, "backup uploaded");
                self.console.push(tr(
                    locale,
                    "Backup subido a Google Drive (appData)",
                    "Backup uploaded to Google Drive (appData)",
                ));
                self.state.set_status("Backup uploaded".to_string());
            }
            BackupEvent::Downloaded { file_id, content } => {
                self.backup_busy = false;
                let outcome = self.store.import_json(&content);
                info!(file_id = %file_id, ok = outcome.ok, "backup downloaded");
                let message = if outcome.ok {
                    format!(
                        "{} ({})",
                        tr(locale, "Importado desde Google Drive", "Imported from Google Drive"),
                        outcome.count.unwrap_or(0)
                    )
                } else {
                    outcome.summary()
                };
                self.console.push(&message);
                self.state.set_status(message);
                self.state.reset_page();
            }
            BackupEvent::Error(err) => {
                self.backup_busy = false;
                error!("backup failed: {err:#}");
                self.console.push(format!("{err:#}"));
                self.state.set_status("Backup failed".to_string());
            }
        }
        self.manifest = load_manifest(&self.config);
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return Ok(());
        }
        match self.screen {
            Screen::List => match self.state.mode {
                Mode::Search => self.handle_search_key(key),
                Mode::Browse => self.handle_list_key(key),
            },
            Screen::Form => self.handle_form_key(key),
            Screen::Legend => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
                    self.screen = Screen::List;
                }
                Ok(())
            }
            Screen::Backup => self.handle_backup_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.state.mode = Mode::Browse;
                self.state.search.clear();
                self.state.sync_search();
                self.state.set_status("Search cleared".to_string());
            }
            KeyCode::Enter => {
                self.state.mode = Mode::Browse;
                let search = self.state.search.value().to_string();
                self.state.set_status(format!("Search applied: {search}"));
            }
            KeyCode::Backspace => {
                self.state.search.backspace();
                self.state.sync_search();
            }
            KeyCode::Left => self.state.search.move_cursor(-1),
            KeyCode::Right => self.state.search.move_cursor(1),
            KeyCode::Char(c) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    self.state.search.insert(c);
                    self.state.sync_search();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> Result<()> {
        let page_len = self.current_page().items.len();
        let page_count = self.current_page().count;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.state.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.move_cursor(1, page_len),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_cursor(-1, page_len),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::PageDown => {
                self.state.move_page(1, page_count)
            }
            KeyCode::Char('h') | KeyCode::Left | KeyCode::PageUp => {
                self.state.move_page(-1, page_count)
            }
            KeyCode::Home => self.state.cursor = 0,
            KeyCode::End => self.state.cursor = page_len.saturating_sub(1),
            KeyCode::Char('/') => {
                self.state.mode = Mode::Search;
                self.state.set_status("Type to search by title".to_string());
            }
            KeyCode::Char('s') => self.state.cycle_status(true),
            KeyCode::Char('S') => self.state.cycle_status(false),
            KeyCode::Char('r') => self.state.cycle_ranking(true),
            KeyCode::Char('R') => self.state.cycle_ranking(false),
            KeyCode::Char('o') => {
                self.state.query.sort = self.state.query.sort.next();
                self.state.reset_page();
                let label = self.state.query.sort.label(self.locale());
                self.state.set_status(format!("Sorted by {label}"));
            }
            KeyCode::Char('c') => {
                self.state.clear_filters();
                self.state.set_status("Filters cleared".to_string());
            }
            KeyCode::Char('L') => {
                let locale = self.locale().toggled();
                self.state.query.locale = locale;
                self.config.locale = locale;
                self.state.set_status(format!("Language: {}", locale.code()));
            }
            KeyCode::Char('a') => {
                self.form = Some(GameForm::new());
                self.screen = Screen::Form;
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(game) = self.selected_game() {
                    self.form = Some(GameForm::edit(game));
                    self.screen = Screen::Form;
                }
            }
            KeyCode::Char('d') => {
                if let Some(game) = self.selected_game() {
                    self.confirm = Some(ConfirmModal::Delete {
                        id: game.id.clone(),
                        title: game.title.clone(),
                    });
                }
            }
            KeyCode::Char('D') => {
                if !self.store.is_empty() {
                    self.confirm = Some(ConfirmModal::DeleteAll);
                }
            }
            KeyCode::Char('?') => self.screen = Screen::Legend,
            KeyCode::Char('b') => self.screen = Screen::Backup,
            _ => {}
        }
        Ok(())
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(form) = self.form.as_mut() else {
            self.screen = Screen::List;
            return Ok(());
        };
        let save = key.code == KeyCode::Enter
            || (key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('s'));
        if save {
            return self.submit_form();
        }
        match key.code {
            KeyCode::Esc => {
                self.form = None;
                self.screen = Screen::List;
                self.state.set_status("Edit cancelled".to_string());
            }
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_previous(),
            KeyCode::Left if form.is_choice() => form.cycle(false),
            KeyCode::Right if form.is_choice() => form.cycle(true),
            KeyCode::Char(' ') if form.is_choice() => form.cycle(true),
            code => {
                if let Some(input) = form.focused_input() {
                    match code {
                        KeyCode::Left => input.move_cursor(-1),
                        KeyCode::Right => input.move_cursor(1),
                        KeyCode::Home => input.move_home(),
                        KeyCode::End => input.move_end(),
                        KeyCode::Backspace => input.backspace(),
                        KeyCode::Delete => input.delete(),
                        KeyCode::Char(c)
                            if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
                        {
                            input.insert(c)
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    fn submit_form(&mut self) -> Result<()> {
        let locale = self.locale();
        let Some(form) = self.form.as_mut() else {
            return Ok(());
        };
        let input = match form.submit() {
            Ok(input) => input,
            Err(err) => {
                self.state.set_status(err.message(locale));
                form.error = Some(err);
                return Ok(());
            }
        };

        let editing = form.editing().map(str::to_string);
        self.form = None;
        self.screen = Screen::List;

        let (id, result) = match editing {
            Some(id) => match self.store.update(&id, input) {
                Ok(true) => (id, Ok(())),
                Ok(false) => {
                    self.state
                        .set_status("The record no longer exists".to_string());
                    self.clamp_selection();
                    return Ok(());
                }
                Err(err) => (id, Err(err)),
            },
            None => match self.store.add(input) {
                Ok(game) => (game.id, Ok(())),
                Err(err) => {
                    self.report_store_result(Err(err), "Saved");
                    return Ok(());
                }
            },
        };
        self.report_store_result(result, "Saved");
        self.select_game(&id);
        Ok(())
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                let Some(confirm) = self.confirm.take() else {
                    return Ok(());
                };
                match confirm {
                    ConfirmModal::Delete { id, title } => {
                        let result = self.store.delete(&id).map(|_| ());
                        self.report_store_result(result, &format!("Deleted {title}"));
                    }
                    ConfirmModal::DeleteAll => {
                        let result = self.store.clear();
                        self.report_store_result(result, "All games deleted");
                    }
                }
                self.clamp_selection();
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm = None;
                self.state.set_status("Cancelled".to_string());
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_backup_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('b') => self.screen = Screen::List,
            KeyCode::Char('u') => self.start_drive(DriveAction::Upload),
            KeyCode::Char('d') => self.start_drive(DriveAction::Download),
            KeyCode::Char('e') => self.prompt = Some(PathPromptModal::new(PathAction::ExportJson)),
            KeyCode::Char('i') => self.prompt = Some(PathPromptModal::new(PathAction::ImportJson)),
            KeyCode::Char('x') => {
                self.prompt = Some(PathPromptModal::new(PathAction::ImportSpreadsheet))
            }
            KeyCode::Char('X') => {
                self.prompt = Some(PathPromptModal::new(PathAction::ExportSpreadsheet))
            }
            KeyCode::Char('c') => self.console.lines.clear(),
            _ => {}
        }
        Ok(())
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(prompt) = self.prompt.as_mut() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => {
                self.prompt = None;
                self.state.set_status("Cancelled".to_string());
            }
            KeyCode::Enter => {
                let action = prompt.action;
                let path = prompt.path();
                self.prompt = None;
                self.run_path_action(action, &path);
            }
            KeyCode::Left => prompt.input.move_cursor(-1),
            KeyCode::Right => prompt.input.move_cursor(1),
            KeyCode::Home => prompt.input.move_home(),
            KeyCode::End => prompt.input.move_end(),
            KeyCode::Backspace => prompt.input.backspace(),
            KeyCode::Delete => prompt.input.delete(),
            KeyCode::Char(c) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    prompt.input.insert(c);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn run_path_action(&mut self, action: PathAction, path: &Path) {
        let locale = self.locale();
        let message = match action {
            PathAction::ExportJson => match transfer::export_to_file(&self.store, path) {
                Ok(()) => format!(
                    "{} {}",
                    tr(locale, "Exportado a", "Exported to"),
                    path.display()
                ),
                Err(err) => format!("{err:#}"),
            },
            PathAction::ImportJson => match transfer::import_from_file(&mut self.store, path) {
                Ok(outcome) => {
                    self.state.reset_page();
                    outcome.summary()
                }
                Err(err) => format!("{err:#}"),
            },
            PathAction::ExportSpreadsheet => {
                match spreadsheet::export_to_file(self.store.games(), path, locale) {
                    Ok(()) => format!(
                        "{} {}",
                        tr(locale, "Excel exportado a", "Spreadsheet exported to"),
                        path.display()
                    ),
                    Err(err) => err.to_string(),
                }
            }
            PathAction::ImportSpreadsheet => match spreadsheet::read_workbook(path) {
                Ok(inputs) => {
                    let count = inputs.len();
                    let result = self.store.add_many(inputs).map(|_| ());
                    self.state.reset_page();
                    match result {
                        Ok(()) => format!(
                            "{} ({count})",
                            tr(locale, "Importado desde Excel", "Imported from spreadsheet")
                        ),
                        Err(err) => format!("{err}; {count} games kept in memory only"),
                    }
                }
                Err(err) => err.to_string(),
            },
        };
        info!(action = ?action, path = %path.display(), "{message}");
        self.console.push(&message);
        self.state.set_status(message);
    }

    fn start_drive(&mut self, action: DriveAction) {
        let locale = self.locale();
        if self.backup_busy {
            self.state
                .set_status("A Drive request is already running".to_string());
            return;
        }
        let backup = match CloudBackup::from_config(&self.config) {
            Ok(backup) => backup,
            Err(err) => {
                warn!("drive unavailable: {err:#}");
                self.console.push(format!("{err:#}"));
                return;
            }
        };
        let job = match action {
            DriveAction::Upload => match self.store.export_json() {
                Ok(payload) => {
                    self.console.push(tr(
                        locale,
                        "Subiendo a Google Drive (appData)...",
                        "Uploading to Google Drive (appData)...",
                    ));
                    BackupJob::Upload(payload)
                }
                Err(err) => {
                    self.console.push(err.to_string());
                    return;
                }
            },
            DriveAction::Download => {
                self.console.push(tr(
                    locale,
                    "Descargando de Google Drive (appData)...",
                    "Downloading from Google Drive (appData)...",
                ));
                BackupJob::Download
            }
        };

        self.backup_busy = true;
        let sender = self.backup_tx.clone();
        spawn(async move {
            if let Err(err) = backup.run(job, sender).await {
                error!("backup task error: {err:#}");
            }
        });
    }

    fn report_store_result(&mut self, result: Result<(), StoreError>, success: &str) {
        match result {
            Ok(()) => self.state.set_status(success.to_string()),
            Err(err) => {
                error!("{err}");
                self.state
                    .set_status(format!("{success}, but not saved to disk: {err}"));
            }
        }
    }

    fn current_page(&self) -> Page<'_> {
        let filtered = self.state.query.apply(self.store.games());
        paginate(&filtered, self.state.page, self.config.page_size)
    }

    fn clamp_selection(&mut self) {
        let (number, len) = {
            let page = self.current_page();
            (page.number, page.items.len())
        };
        self.state.clamp(number, len);
    }

    fn selected_game(&self) -> Option<&Game> {
        self.current_page().items.get(self.state.cursor).copied()
    }

    fn select_game(&mut self, id: &str) {
        let filtered = self.state.query.apply(self.store.games());
        let size = self.config.page_size.max(1);
        match filtered.iter().position(|game| game.id == id) {
            Some(index) => {
                self.state.page = index / size + 1;
                self.state.cursor = index % size;
            }
            None => {
                let page = paginate(&filtered, self.state.page, size);
                self.state.clamp(page.number, page.items.len());
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        match self.screen {
            Screen::List => self.draw_list(frame),
            Screen::Form => self.draw_form(frame),
            Screen::Legend => self.draw_legend(frame),
            Screen::Backup => self.draw_backup(frame),
        }
        if let Some(prompt) = &self.prompt {
            self.render_path_prompt(frame, prompt);
        }
        if let Some(confirm) = &self.confirm {
            self.render_confirm(frame, confirm);
        }
    }

    fn draw_list(&mut self, frame: &mut Frame) {
        self.clamp_selection();
        let page = self.current_page();

        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(size);

        self.render_stats(frame, chunks[0]);
        self.render_filters(frame, chunks[1], &page);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[2]);
        self.render_table(frame, body[0], &page);
        self.render_details(frame, body[1], page.items.get(self.state.cursor).copied());
        self.render_status(frame, chunks[3]);
    }

    fn render_stats(&self, frame: &mut Frame, area: Rect) {
        let locale = self.locale();
        let counts = StatusCounts::from_games(self.store.games());
        let mut spans = vec![Span::styled(
            format!("Total {}", counts.total),
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        )];
        for (status, count) in &counts.by_status {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!("{} {count}", status.label(locale)),
                Style::default().fg(self.theme.status_color(*status)),
            ));
        }
        let paragraph = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title("GameTracker"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_filters(&self, frame: &mut Frame, area: Rect, page: &Page<'_>) {
        let locale = self.locale();
        let query = &self.state.query;
        let all = tr(locale, "Todos", "All");
        let search = if self.state.mode == Mode::Search {
            format!("{}▏", self.state.search.value())
        } else if query.search.is_empty() {
            "-".to_string()
        } else {
            query.search.clone()
        };
        let label = |text: &'static str| {
            Span::styled(text, Style::default().fg(self.theme.muted))
        };
        let line = Line::from(vec![
            label(tr(locale, "Buscar: ", "Search: ")),
            Span::raw(search),
            label(tr(locale, "  Estado: ", "  Status: ")),
            Span::raw(query.status.map_or(all, |status| status.label(locale))),
            label("  Tier: "),
            Span::raw(query.ranking.map_or(all, |ranking| ranking.label())),
            label(tr(locale, "  Orden: ", "  Sort: ")),
            Span::raw(query.sort.label(locale)),
            label(tr(locale, "  Página ", "  Page ")),
            Span::raw(format!("{}/{} ({})", page.number, page.count, page.total)),
        ]);
        let paragraph = Paragraph::new(line)
            .block(Block::default().borders(Borders::ALL).title(tr(locale, "Filtros", "Filters")));
        frame.render_widget(paragraph, area);
    }

    fn render_table(&self, frame: &mut Frame, area: Rect, page: &Page<'_>) {
        let locale = self.locale();
        let header = Row::new(vec![
            Column::Title.header(locale),
            Column::Platform.header(locale),
            Column::Status.header(locale),
            Column::Ranking.header(locale),
            Column::TotalHours.header(locale),
        ])
        .style(
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        );
        let rows: Vec<Row> = page
            .items
            .iter()
            .map(|game| {
                Row::new(vec![
                    Cell::from(game.title.clone()),
                    Cell::from(game.platform.clone()),
                    Cell::from(Span::styled(
                        game.status.label(locale),
                        Style::default().fg(self.theme.status_color(game.status)),
                    )),
                    Cell::from(Span::styled(
                        game.ranking.label(),
                        Style::default()
                            .fg(self.theme.ranking_color(game.ranking))
                            .add_modifier(Modifier::BOLD),
                    )),
                    Cell::from(format_hours(game.total_hours)),
                ])
            })
            .collect();
        let widths = [
            Constraint::Percentage(40),
            Constraint::Percentage(18),
            Constraint::Percentage(18),
            Constraint::Length(5),
            Constraint::Length(8),
        ];
        let mut table_state = TableState::default();
        if !page.items.is_empty() {
            table_state.select(Some(self.state.cursor));
        }
        let title = tr(locale, "Juegos", "Games");
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(table, area, &mut table_state);
    }

    fn render_details(&self, frame: &mut Frame, area: Rect, game: Option<&Game>) {
        let locale = self.locale();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(tr(locale, "Detalle", "Details"));
        let Some(game) = game else {
            let empty = tr(
                locale,
                "No hay juegos. Pulsa 'a' para añadir uno.",
                "No games yet. Press 'a' to add one.",
            );
            frame.render_widget(Paragraph::new(empty).block(block), area);
            return;
        };

        let mut lines = vec![Line::from(Span::styled(
            game.title.clone(),
            Style::default()
                .fg(self.theme.primary_fg)
                .add_modifier(Modifier::BOLD),
        ))];
        lines.push(Line::from(vec![
            Span::styled(
                game.status.label(locale),
                Style::default().fg(self.theme.status_color(game.status)),
            ),
            Span::raw("  "),
            Span::styled(
                game.ranking.label(),
                Style::default().fg(self.theme.ranking_color(game.ranking)),
            ),
            Span::styled(
                format!("  {}", game.ranking.description(locale)),
                Style::default().fg(self.theme.muted),
            ),
        ]));
        let fields = [
            (Column::Platform, game.platform.clone()),
            (Column::Publisher, game.publisher.clone()),
            (Column::Genres, game.genres.clone()),
            (Column::ReleaseDate, game.release_date.clone()),
            (Column::FirstPlayedAt, game.first_played_at.clone()),
            (Column::StartDate, game.start_date.clone()),
            (Column::EndDate, game.end_date.clone()),
            (Column::LastSessionHours, format_hours(game.last_session_hours)),
            (Column::TotalHours, format_hours(game.total_hours)),
            (Column::YearsPlayed, game.years_played.clone()),
            (Column::Comment, game.comment.clone()),
        ];
        for (column, value) in fields {
            if value.is_empty() {
                continue;
            }
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{}: ", column.header(locale)),
                    Style::default().fg(self.theme.muted),
                ),
                Span::raw(value),
            ]));
        }
        let created = game
            .created_at_utc()
            .map(|at| at.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_else(|| game.created_at.clone());
        lines.push(Line::from(Span::styled(
            format!("{}: {created}", Column::CreatedAt.header(locale)),
            Style::default().fg(self.theme.muted),
        )));

        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let help = match self.state.mode {
            Mode::Search => "Enter apply  Esc clear",
            Mode::Browse => {
                "a add  e edit  d delete  D delete all  / search  s/r filter  o sort  c clear  \
                 h/l page  ? legend  b backup  L language  q quit"
            }
        };
        let paragraph = Paragraph::new(vec![
            Line::from(self.state.status.clone()),
            Line::from(Span::styled(help, Style::default().fg(self.theme.muted))),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_form(&mut self, frame: &mut Frame) {
        let locale = self.locale();
        let Some(form) = self.form.as_ref() else {
            return;
        };
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(4)])
            .split(size);

        let rows = form.rows(locale);
        let width = rows
            .iter()
            .map(|(_, label, _)| label.chars().count())
            .max()
            .unwrap_or(0);
        let focused = form.focused();
        let lines: Vec<Line> = rows
            .iter()
            .map(|(column, label, value)| {
                let is_focused = *column == focused;
                let marker = if is_focused { "▶ " } else { "  " };
                let label_style = if is_focused {
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.muted)
                };
                let value = match column {
                    Column::Status | Column::Ranking if is_focused => format!("◀ {value} ▶"),
                    _ => value.clone(),
                };
                Line::from(vec![
                    Span::styled(marker, Style::default().fg(self.theme.accent)),
                    Span::styled(format!("{label:<width$}  "), label_style),
                    Span::raw(value),
                ])
            })
            .collect();

        let title = match form.editing() {
            Some(_) => tr(locale, "Editar juego", "Edit game"),
            None => tr(locale, "Añadir juego", "Add game"),
        };
        let paragraph =
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
        let area = chunks[0];
        frame.render_widget(paragraph, area);

        if let (Some(cursor), Some(index)) = (
            form.cursor_in_focus(),
            rows.iter().position(|(column, _, _)| *column == focused),
        ) {
            let x = area.x + 1 + 2 + width as u16 + 2 + cursor as u16;
            let y = area.y + 1 + index as u16;
            if y < area.y + area.height.saturating_sub(1) {
                frame.set_cursor(x.min(area.x + area.width.saturating_sub(2)), y);
            }
        }

        let error_line = match &form.error {
            Some(err) => Line::from(Span::styled(
                err.message(locale),
                Style::default().fg(self.theme.danger),
            )),
            None => Line::from(""),
        };
        let help = Line::from(Span::styled(
            "Tab/↑↓ field  ←→ change status/tier  Enter save  Esc cancel",
            Style::default().fg(self.theme.muted),
        ));
        let footer = Paragraph::new(vec![error_line, help])
            .block(Block::default().borders(Borders::ALL).title("Status"));
        frame.render_widget(footer, chunks[1]);
    }

    fn draw_legend(&mut self, frame: &mut Frame) {
        let locale = self.locale();
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(size);

        let status_lines: Vec<Line> = GameStatus::ALL
            .iter()
            .map(|status| {
                Line::from(vec![
                    Span::styled(
                        format!("{:<12}", status.label(locale)),
                        Style::default()
                            .fg(self.theme.status_color(*status))
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(status.description(locale)),
                ])
            })
            .collect();
        let ranking_lines: Vec<Line> = GameRanking::ALL
            .iter()
            .map(|ranking| {
                Line::from(vec![
                    Span::styled(
                        format!("{:<4}", ranking.label()),
                        Style::default()
                            .fg(self.theme.ranking_color(*ranking))
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(ranking.description(locale)),
                ])
            })
            .collect();

        let statuses = Paragraph::new(status_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(tr(locale, "Estados", "Statuses")),
            )
            .wrap(Wrap { trim: true });
        let rankings = Paragraph::new(ranking_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(tr(locale, "Ranking (Esc para volver)", "Ranking (Esc to go back)")),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(statuses, chunks[0]);
        frame.render_widget(rankings, chunks[1]);
    }

    fn draw_backup(&mut self, frame: &mut Frame) {
        let locale = self.locale();
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(size);

        let key = |key: &'static str| {
            Span::styled(
                key,
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )
        };
        let drive_state = if self.backup_busy {
            Span::styled(
                tr(locale, "En curso...", "Working..."),
                Style::default().fg(self.theme.warning),
            )
        } else if self.config.drive.access_token.is_some() {
            Span::styled(
                tr(locale, "Sesión lista", "Signed in"),
                Style::default().fg(self.theme.success),
            )
        } else {
            Span::styled(
                tr(locale, "Sin token", "No token"),
                Style::default().fg(self.theme.danger),
            )
        };
        let stamp = |value: Option<chrono::DateTime<chrono::Utc>>| {
            value
                .map(|at| at.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string())
        };

        let lines = vec![
            Line::from(vec![Span::raw("Google Drive: "), drive_state]),
            Line::from(vec![key("u"), Span::raw(tr(locale, "  Subir a Drive", "  Upload to Drive"))]),
            Line::from(vec![
                key("d"),
                Span::raw(tr(locale, "  Descargar de Drive", "  Download from Drive")),
            ]),
            Line::from(""),
            Line::from(tr(locale, "Archivo local", "Local file")),
            Line::from(vec![key("e"), Span::raw(tr(locale, "  Exportar JSON", "  Export JSON"))]),
            Line::from(vec![key("i"), Span::raw(tr(locale, "  Importar JSON", "  Import JSON"))]),
            Line::from(vec![
                key("x"),
                Span::raw(tr(locale, "  Importar Excel", "  Import spreadsheet")),
            ]),
            Line::from(vec![
                key("X"),
                Span::raw(tr(locale, "  Exportar Excel", "  Export spreadsheet")),
            ]),
            Line::from(vec![key("c"), Span::raw(tr(locale, "  Limpiar consola", "  Clear console"))]),
            Line::from(vec![key("Esc"), Span::raw(tr(locale, "  Volver", "  Back"))]),
            Line::from(""),
            Line::from(format!(
                "{}: {}",
                tr(locale, "Último envío", "Last upload"),
                stamp(self.manifest.last_upload_at)
            )),
            Line::from(format!(
                "{}: {}",
                tr(locale, "Última descarga", "Last download"),
                stamp(self.manifest.last_download_at)
            )),
            Line::from(format!(
                "{}: {}",
                tr(locale, "Datos", "Data"),
                self.config.data_dir.display()
            )),
        ];
        let actions = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(tr(locale, "Respaldo y sincronización", "Backup and sync")),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(actions, chunks[0]);

        let visible = chunks[1].height.saturating_sub(2) as usize;
        let console_lines: Vec<Line> = if self.console.lines.is_empty() {
            vec![Line::from(Span::styled(
                tr(locale, "Sin actividad todavía.", "No activity yet."),
                Style::default().fg(self.theme.muted),
            ))]
        } else {
            self.console
                .tail(visible)
                .map(|line| Line::from(line.clone()))
                .collect()
        };
        let console = Paragraph::new(console_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(tr(locale, "Consola de respaldo", "Backup console")),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(console, chunks[1]);
    }

    fn render_path_prompt(&self, frame: &mut Frame, prompt: &PathPromptModal) {
        let locale = self.locale();
        let frame_area = frame.size();
        let width = cmp::max(cmp::min(80_u16, frame_area.width.saturating_sub(4)), 24_u16);
        let height = 7_u16.min(frame_area.height.saturating_sub(2)).max(5_u16);
        let area = centered_rect(width, height, frame_area);

        frame.render_widget(Clear, area);

        let input_line = Line::from(vec![
            Span::styled("> ", Style::default().fg(self.theme.accent)),
            Span::raw(prompt.input.value().to_string()),
        ]);
        let helper = Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(tr(locale, " aceptar  ", " confirm  ")),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(tr(locale, " cancelar", " cancel")),
        ]);
        let paragraph = Paragraph::new(vec![
            Line::from(tr(locale, "Ruta del archivo", "File path")),
            input_line,
            Line::from(""),
            helper,
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(prompt.action.title(locale)),
        );
        frame.render_widget(paragraph, area);

        let cursor_x =
            (area.x + 3 + prompt.input.cursor() as u16).min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 2);
    }

    fn render_confirm(&self, frame: &mut Frame, confirm: &ConfirmModal) {
        let locale = self.locale();
        let frame_area = frame.size();
        let area = centered_rect(60, 5, frame_area);
        frame.render_widget(Clear, area);

        let question = match confirm {
            ConfirmModal::Delete { title, .. } => {
                format!("{} \"{title}\"?", tr(locale, "¿Eliminar", "Delete"))
            }
            ConfirmModal::DeleteAll => format!(
                "{} ({})?",
                tr(locale, "¿Eliminar todos los juegos", "Delete every game"),
                self.store.len()
            ),
        };
        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(
                question,
                Style::default()
                    .fg(self.theme.danger)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(tr(locale, "y confirmar   n cancelar", "y confirm   n cancel")),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }
}

fn load_manifest(config: &AppConfig) -> BackupManifest {
    match BackupManifest::load(manifest::manifest_path(&config.data_dir)) {
        Ok(manifest) => manifest.unwrap_or_default(),
        Err(err) => {
            warn!("failed to read backup manifest: {err:#}");
            BackupManifest::default()
        }
    }
}

fn format_hours(hours: Option<f64>) -> String {
    hours.map(|value| format!("{value}")).unwrap_or_default()
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

struct UiState {
    query: GameQuery,
    search: LineInput,
    page: usize,
    cursor: usize,
    status: String,
    mode: Mode,
    should_quit: bool,
}

impl UiState {
    fn new(locale: Locale) -> Self {
        Self {
            query: GameQuery {
                locale,
                ..Default::default()
            },
            search: LineInput::default(),
            page: 1,
            cursor: 0,
            status: "Ready".to_string(),
            mode: Mode::Browse,
            should_quit: false,
        }
    }

    fn locale(&self) -> Locale {
        self.query.locale
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn reset_page(&mut self) {
        self.page = 1;
        self.cursor = 0;
    }

    fn sync_search(&mut self) {
        self.query.search = self.search.value().to_string();
        self.reset_page();
    }

    fn move_cursor(&mut self, delta: isize, page_len: usize) {
        if page_len == 0 {
            self.cursor = 0;
            return;
        }
        let last = page_len as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, last) as usize;
    }

    fn move_page(&mut self, delta: isize, page_count: usize) {
        let last = page_count.max(1) as isize;
        let next = (self.page as isize + delta).clamp(1, last) as usize;
        if next != self.page {
            self.page = next;
            self.cursor = 0;
        }
    }

    fn clamp(&mut self, page: usize, page_len: usize) {
        self.page = page;
        self.cursor = self.cursor.min(page_len.saturating_sub(1));
    }

    fn cycle_status(&mut self, forward: bool) {
        self.query.status = cycle_option(self.query.status, &GameStatus::ALL, forward);
        self.reset_page();
        let label = self
            .query
            .status
            .map_or("all", |status| status.label(self.locale()));
        self.set_status(format!("Status filter: {label}"));
    }

    fn cycle_ranking(&mut self, forward: bool) {
        self.query.ranking = cycle_option(self.query.ranking, &GameRanking::ALL, forward);
        self.reset_page();
        let label = self.query.ranking.map_or("all", |ranking| ranking.label());
        self.set_status(format!("Ranking filter: {label}"));
    }

    fn clear_filters(&mut self) {
        self.search.clear();
        self.query.search.clear();
        self.query.status = None;
        self.query.ranking = None;
        self.reset_page();
    }
}

/// Step through `None` followed by every value, wrapping around.
fn cycle_option<T: Copy + PartialEq>(current: Option<T>, all: &[T], forward: bool) -> Option<T> {
    let position = current.and_then(|value| all.iter().position(|candidate| *candidate == value));
    let slots = all.len() + 1;
    let index = position.map_or(0, |index| index + 1);
    let next = if forward {
        (index + 1) % slots
    } else {
        (index + slots - 1) % slots
    };
    next.checked_sub(1).map(|index| all[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_keeps_latest_entries() {
        let mut console = BackupConsole::default();
        for index in 0..(CONSOLE_LIMIT + 5) {
            console.push(format!("line {index}"));
        }
        assert_eq!(console.lines.len(), CONSOLE_LIMIT);
        assert!(console.lines.front().expect("entry").ends_with("line 5"));
        let tail: Vec<&String> = console.tail(2).collect();
        assert!(tail[1].ends_with(&format!("line {}", CONSOLE_LIMIT + 4)));
    }

    #[test]
    fn filters_cycle_through_all_then_none() {
        let all = [GameRanking::S, GameRanking::A];
        assert_eq!(cycle_option(None, &all, true), Some(GameRanking::S));
        assert_eq!(cycle_option(Some(GameRanking::S), &all, true), Some(GameRanking::A));
        assert_eq!(cycle_option(Some(GameRanking::A), &all, true), None);
        assert_eq!(cycle_option(None, &all, false), Some(GameRanking::A));
    }

    #[test]
    fn page_moves_are_clamped() {
        let mut state = UiState::new(Locale::Es);
        state.move_page(-1, 3);
        assert_eq!(state.page, 1);
        state.cursor = 4;
        state.move_page(5, 3);
        assert_eq!(state.page, 3);
        assert_eq!(state.cursor, 0);
        state.move_cursor(10, 2);
        assert_eq!(state.cursor, 1);
    }
}
