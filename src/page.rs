//! Page state machine.
//!
//! Every terminal event and timer tick becomes a [`Msg`]. [`update`] intercepts the
//! global keys, routes the rest to the handler of the active [`Page`], applies the page
//! change the handler asks for and returns a [`Command`] for the event loop.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::generate_password;
use crate::feedback::{copy_secret, ClearHandle, Clipboard, DecayTimer, TickOutcome};
use crate::form::{Direction, NewEntryForm, TextInput};
use crate::models::{Database, Entry};
use crate::storage::VaultStore;
use crate::table::{rebuild_rows, Selection, TableRow};

pub const COPIED_MESSAGE: &str = "Copied!";
pub const SAVED_MESSAGE: &str = "Saved!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Unlock,
    Browse,
    CreateEntry,
}

impl Page {
    pub fn title(&self) -> &'static str {
        match self {
            Page::Unlock => "Unlock",
            Page::Browse => "Entries",
            Page::CreateEntry => "New entry",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    Key(KeyEvent),
    Resize(u16, u16),
    Tick,
}

/// What the event loop must do after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    None,
    ScheduleTick,
    Quit,
}

/// Result of a page handler: an optional page change plus a loop command.
struct Step {
    goto: Option<Page>,
    command: Command,
}

impl Step {
    fn stay() -> Self {
        Self {
            goto: None,
            command: Command::None,
        }
    }

    fn goto(page: Page) -> Self {
        Self {
            goto: Some(page),
            command: Command::None,
        }
    }

    fn command(command: Command) -> Self {
        Self {
            goto: None,
            command,
        }
    }
}

/// Database plus the passphrase needed to re-encrypt it on save.
pub struct UnlockedDatabase {
    database: Database,
    passphrase: Zeroizing<String>,
}

pub struct Model {
    page: Page,
    unlock_input: TextInput,
    database: Option<UnlockedDatabase>,
    rows: Vec<TableRow>,
    selection: Selection,
    decay: DecayTimer,
    status: String,
    form: NewEntryForm,
    viewport: (u16, u16),
    store: Box<dyn VaultStore>,
    clipboard: Arc<dyn Clipboard>,
    settings: Settings,
    pending_clear: Option<ClearHandle>,
}

impl Model {
    pub fn new(
        store: Box<dyn VaultStore>,
        clipboard: Arc<dyn Clipboard>,
        settings: Settings,
        viewport: (u16, u16),
    ) -> Self {
        let mut unlock_input = TextInput::masked();
        unlock_input.focus();
        Self {
            page: Page::Unlock,
            unlock_input,
            database: None,
            rows: Vec::new(),
            selection: Selection::default(),
            decay: DecayTimer::new(settings.decay_ticks),
            status: String::new(),
            form: NewEntryForm::default(),
            viewport,
            store,
            clipboard,
            settings,
            pending_clear: None,
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn unlock_input(&self) -> &TextInput {
        &self.unlock_input
    }

    pub fn entries(&self) -> &[Entry] {
        self.database
            .as_ref()
            .map(|d| d.database.entries())
            .unwrap_or_default()
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn selected(&self) -> Option<usize> {
        self.selection.current(self.rows.len())
    }

    pub fn copy_feedback_percent(&self) -> f64 {
        self.decay.percent()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn form(&self) -> &NewEntryForm {
        &self.form
    }

    pub fn viewport(&self) -> (u16, u16) {
        self.viewport
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Clears the clipboard now if a scheduled clear has not fired yet.
    pub fn flush_pending_clear(&mut self) {
        let Some(handle) = self.pending_clear.take() else {
            return;
        };
        if handle.is_finished() {
            return;
        }
        handle.cancel();
        if let Err(e) = self.clipboard.clear() {
            tracing::warn!("clipboard clear on exit failed: {e}");
        }
    }

    /// Drops decrypted entries, the passphrase and any typed input.
    pub fn wipe(&mut self) {
        if let Some(mut unlocked) = self.database.take() {
            unlocked.database.wipe();
        }
        self.rows.clear();
        self.unlock_input.clear();
        self.form.close();
    }

    fn refresh_rows(&mut self) {
        let rows = rebuild_rows(self.entries(), self.settings.mask_len);
        self.rows = rows;
    }
}

pub fn update(model: &mut Model, msg: Msg) -> Command {
    let step = match msg {
        Msg::Key(key) => {
            if key.kind != KeyEventKind::Press {
                return Command::None;
            }
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                tracing::info!(page = ?model.page, "quit requested");
                return Command::Quit;
            }
            match model.page {
                Page::Unlock => update_unlock(model, key),
                Page::Browse => update_browse(model, key),
                Page::CreateEntry => update_create_entry(model, key),
            }
        }
        Msg::Resize(width, height) => {
            model.viewport = (width, height);
            Step::stay()
        }
        Msg::Tick => on_tick(model),
    };

    if let Some(next) = step.goto {
        tracing::info!(from = ?model.page, to = ?next, "page transition");
        model.page = next;
    }
    step.command
}

fn on_tick(model: &mut Model) -> Step {
    match model.decay.tick() {
        TickOutcome::Continue => Step::command(Command::ScheduleTick),
        TickOutcome::Stop => {
            tracing::debug!("copy feedback finished");
            model.status.clear();
            Step::stay()
        }
    }
}

fn update_unlock(model: &mut Model, key: KeyEvent) -> Step {
    model.status.clear();
    match key.code {
        KeyCode::Enter => {
            let passphrase = Zeroizing::new(model.unlock_input.value().to_string());
            model.unlock_input.clear();
            match model.store.load(&passphrase) {
                Ok(database) => {
                    tracing::info!(entries = database.entries().len(), "database unlocked");
                    model.database = Some(UnlockedDatabase {
                        database,
                        passphrase,
                    });
                    model.refresh_rows();
                    model.selection.reset();
                    Step::goto(Page::Browse)
                }
                Err(e) => {
                    tracing::warn!("unlock failed: {e}");
                    model.status = e.to_string();
                    Step::stay()
                }
            }
        }
        code => {
            model.unlock_input.handle_key(code);
            Step::stay()
        }
    }
}

fn update_browse(model: &mut Model, key: KeyEvent) -> Step {
    model.status.clear();
    match key.code {
        KeyCode::Char('y') => copy_selected_password(model),
        KeyCode::Char('o') => {
            model.form = NewEntryForm::open(generate_password(model.settings.generated_password_len));
            model.decay.reset();
            Step::goto(Page::CreateEntry)
        }
        KeyCode::Char('w') => {
            save_database(model);
            Step::stay()
        }
        KeyCode::Char('j') => {
            model.selection.next(model.rows.len());
            Step::stay()
        }
        KeyCode::Char('k') => {
            model.selection.previous();
            Step::stay()
        }
        _ => Step::stay(),
    }
}

fn copy_selected_password(model: &mut Model) -> Step {
    let Some(idx) = model.selected() else {
        return Step::stay();
    };
    let Some(entry) = model.entries().get(idx) else {
        return Step::stay();
    };
    let handle = copy_secret(
        &model.clipboard,
        entry.password(),
        model.settings.clipboard_clear_after(),
    );
    tracing::info!(row = idx, "password copied to clipboard");
    model.pending_clear = Some(handle);
    model.status = COPIED_MESSAGE.to_string();
    if model.decay.start() {
        Step::command(Command::ScheduleTick)
    } else {
        Step::stay()
    }
}

fn save_database(model: &mut Model) {
    let Some(unlocked) = model.database.as_mut() else {
        return;
    };
    unlocked.database.revision = unlocked.database.revision.saturating_add(1);
    match model.store.save(&unlocked.passphrase, &unlocked.database) {
        Ok(()) => {
            tracing::info!(revision = unlocked.database.revision, "database saved");
            model.status = SAVED_MESSAGE.to_string();
        }
        Err(e) => {
            unlocked.database.revision = unlocked.database.revision.saturating_sub(1);
            tracing::error!("save failed: {e}");
            model.status = e.to_string();
        }
    }
}

fn update_create_entry(model: &mut Model, key: KeyEvent) -> Step {
    match key.code {
        KeyCode::Esc => {
            model.form.close();
            model.decay.reset();
            Step::goto(Page::Browse)
        }
        KeyCode::Tab => {
            model.form.move_focus(Direction::Forward);
            Step::stay()
        }
        KeyCode::BackTab => {
            model.form.move_focus(Direction::Backward);
            Step::stay()
        }
        KeyCode::Enter => {
            let Some(unlocked) = model.database.as_mut() else {
                tracing::error!("entry form open without an unlocked database");
                return Step::stay();
            };
            unlocked.database.push_entry(model.form.to_entry());
            tracing::info!(entries = unlocked.database.entries().len(), "entry added");
            model.refresh_rows();
            model.form.close();
            model.decay.reset();
            Step::goto(Page::Browse)
        }
        code => {
            model.form.handle_key(code);
            Step::stay()
        }
    }
}
