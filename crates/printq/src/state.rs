use crate::config::Config;
use crate::files::{EntryKind, FileBrowser, FileEntry};
use crate::tasks::AppEvent;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use printq_core::{
    reconcile, CancelOutcome, FileFocus, LayoutMode, NavBounds, NavigationState, OperationStatus,
    OperationTracker, Pane, PrinterInfo, QueueSection, ReconciledEntry, Reconciliation, RemoveOutcome,
    ScrollableViewport, Selection, SpoolerJob, StagedFile, StagingStore, StatusOutcome,
};
use std::path::PathBuf;
use tracing::{debug, info};

/// Side effects the loop performs on the app's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Cancel(String),
    Open(PathBuf),
    OpenFolder(PathBuf),
    PollNow,
    WatchDir(PathBuf),
}

pub struct App {
    pub config: Config,
    pub tracker: OperationTracker,
    pub staging: StagingStore,
    pub nav: NavigationState,
    pub browser: FileBrowser,
    pub input: String,
    pub jobs: Vec<SpoolerJob>,
    pub printer: PrinterInfo,
    pub status_message: Option<String>,
    pub poll_error: Option<String>,
    pub show_help: bool,
    pub poll_in_flight: bool,
    pub active_view: ScrollableViewport,
    pub staged_view: ScrollableViewport,
    pub files_view: ScrollableViewport,
    queue: Reconciliation,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, tracker: OperationTracker, browser: FileBrowser) -> Self {
        let mut app = Self {
            config,
            tracker,
            staging: StagingStore::new(),
            nav: NavigationState::new(LayoutMode::Single),
            browser,
            input: String::new(),
            jobs: Vec::new(),
            printer: PrinterInfo::default(),
            status_message: None,
            poll_error: None,
            show_help: false,
            poll_in_flight: false,
            active_view: ScrollableViewport::default(),
            staged_view: ScrollableViewport::default(),
            files_view: ScrollableViewport::default(),
            queue: Reconciliation::default(),
            should_quit: false,
        };
        app.rebuild_queue();
        app
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// The one reconciled view of the queue. Rendering, cursor bounds and
    /// actions all read this snapshot.
    pub fn queue(&self) -> &Reconciliation {
        &self.queue
    }

    pub fn bounds(&self) -> NavBounds {
        NavBounds {
            active: self.queue.count(),
            staged: self.staging.len(),
            files: self.browser.len(),
        }
    }

    /// Recomputes the snapshot after jobs or operations change, then pulls
    /// every cursor back inside the new bounds.
    pub fn rebuild_queue(&mut self) {
        self.queue = reconcile(&self.jobs, self.tracker.operations());
        let bounds = self.bounds();
        self.nav.clamp(bounds);
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.nav.set_layout(LayoutMode::for_size(width, height));
    }

    /// Starts on the file pane with `pattern` typed into the input.
    pub fn prefill_pattern(&mut self, pattern: &str) {
        self.input = pattern.to_string();
        self.browser.set_pattern(pattern);
        self.nav.focus_files(FileFocus::Input);
    }

    /// Claims the single poll slot. False while a poll is outstanding.
    pub fn begin_poll(&mut self) -> bool {
        if self.poll_in_flight {
            return false;
        }
        self.poll_in_flight = true;
        true
    }

    pub fn apply_event(&mut self, event: AppEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            AppEvent::JobsPolled {
                jobs,
                printer,
                requested_at,
            } => {
                self.poll_in_flight = false;
                self.poll_error = None;
                self.jobs = jobs;
                if let Some(printer) = printer {
                    self.printer = printer;
                }
                let pruned = self.tracker.prune_delivered(&self.jobs, requested_at);
                if pruned > 0 {
                    debug!(pruned, "forgot delivered operations");
                }
            }
            AppEvent::PollFailed { reason } => {
                self.poll_in_flight = false;
                self.poll_error = Some(reason);
            }
            AppEvent::Status(event) => {
                let op_id = event.op_id.clone();
                match self.tracker.on_status_event(event) {
                    StatusOutcome::CanceledButSubmitted { system_job_id } => {
                        info!(op_id = %op_id, job_id = %system_job_id, "canceling job submitted after cancel");
                        effects.push(Effect::Cancel(system_job_id));
                    }
                    StatusOutcome::Applied => {
                        if self
                            .tracker
                            .get(&op_id)
                            .is_some_and(|op| op.status == OperationStatus::Sent)
                        {
                            effects.push(Effect::PollNow);
                        }
                    }
                    StatusOutcome::Dropped => {}
                }
            }
            AppEvent::CancelResult {
                system_job_id,
                error,
            } => match error {
                None => {
                    self.tracker.forget_path(&system_job_id);
                    self.set_status(format!("Canceled job {system_job_id}"));
                    effects.push(Effect::PollNow);
                }
                Some(err) => self.set_status(format!("Cancel failed for job {system_job_id}: {err}")),
            },
            AppEvent::DirectoryChanged(dir) => {
                if dir == self.browser.dir() {
                    self.browser.reload();
                }
            }
        }
        self.rebuild_queue();
        effects
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return effects;
        }

        if self.show_help {
            if matches!(
                key.code,
                KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')
            ) {
                self.show_help = false;
            }
            return effects;
        }

        let staged_remove = key.code == KeyCode::Char('x')
            && matches!(self.nav.selection(self.bounds()), Selection::StagedFile(_));
        if !staged_remove {
            self.staging.clear_pending_remove();
        }

        let in_input = self.nav.pane() == Pane::Files && self.nav.file_focus() == FileFocus::Input;
        if !in_input && self.handle_global_key(key) {
            self.rebuild_queue();
            return effects;
        }

        match (self.nav.pane(), self.nav.file_focus()) {
            (Pane::Queue, _) => self.handle_queue_key(key, &mut effects),
            (Pane::Files, FileFocus::Input) => self.handle_input_key(key),
            (Pane::Files, FileFocus::List) => self.handle_list_key(key, &mut effects),
        }
        self.rebuild_queue();
        effects
    }

    fn handle_global_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('P') => self.submit_all(),
            KeyCode::Char('X') => {
                let cleared = self.staging.clear_all();
                if cleared > 0 {
                    self.set_status(format!("Cleared {cleared} staged file(s)"));
                }
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.nav.switch_pane();
            }
            _ => return false,
        }
        true
    }

    fn handle_queue_key(&mut self, key: KeyEvent, effects: &mut Vec<Effect>) {
        let bounds = self.bounds();
        let section = self.nav.section();
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => self.status_message = None,
            KeyCode::Down | KeyCode::Char('j') => self.nav.move_down(bounds),
            KeyCode::Up | KeyCode::Char('k') => self.nav.move_up(bounds),
            KeyCode::PageDown => self.nav.page_down(bounds),
            KeyCode::PageUp => self.nav.page_up(bounds),
            KeyCode::Char('a') | KeyCode::Char('f') => self.nav.focus_files(FileFocus::Input),
            KeyCode::Char('x') => match self.nav.selection(bounds) {
                Selection::ActiveJob(index) => self.cancel_entry(index, effects),
                Selection::StagedFile(index) => self.remove_staged(index),
                _ => {}
            },
            KeyCode::Char('r') => {
                if let Selection::ActiveJob(index) = self.nav.selection(bounds) {
                    self.retry_entry(index, effects);
                }
            }
            KeyCode::Char('C') => {
                let cleared = self.tracker.clear_terminal(&self.jobs);
                if cleared > 0 {
                    self.set_status(format!("Cleared {cleared} finished job(s)"));
                }
            }
            KeyCode::Char('o') => effects.extend(self.selected_path().map(Effect::Open)),
            KeyCode::Char('O') => effects.extend(self.selected_path().map(Effect::OpenFolder)),
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('-')
                if section == QueueSection::Staged =>
            {
                self.adjust_copies(-1);
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('+') | KeyCode::Char('=')
                if section == QueueSection::Staged =>
            {
                self.adjust_copies(1);
            }
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        let bounds = self.bounds();
        match key.code {
            KeyCode::Esc => {
                self.nav.back();
            }
            KeyCode::Enter => {
                self.stage_matched();
                self.nav.focus_files(FileFocus::List);
                self.nav.select_file(0);
            }
            KeyCode::Down => self.nav.move_down(bounds),
            KeyCode::Up => self.nav.move_up(bounds),
            KeyCode::Tab | KeyCode::BackTab => {
                self.nav.switch_pane();
            }
            KeyCode::Backspace => {
                self.input.pop();
                self.browser.set_pattern(&self.input);
            }
            KeyCode::Char(ch) => {
                self.input.push(ch);
                self.browser.set_pattern(&self.input);
            }
            _ => {}
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent, effects: &mut Vec<Effect>) {
        let bounds = self.bounds();
        let current = match self.nav.selection(bounds) {
            Selection::FileEntry(index) => self.browser.get(index).cloned(),
            _ => None,
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.nav.back();
            }
            KeyCode::Down | KeyCode::Char('j') => self.nav.move_down(bounds),
            KeyCode::Up | KeyCode::Char('k') => self.nav.move_up(bounds),
            KeyCode::PageDown => self.nav.page_down(bounds),
            KeyCode::PageUp => self.nav.page_up(bounds),
            KeyCode::Char('i') | KeyCode::Char('/') => self.nav.focus_files(FileFocus::Input),
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
                let Some(entry) = current else { return };
                match entry.kind {
                    EntryKind::Directory => self.enter_dir(entry.path, effects),
                    EntryKind::File if key.code == KeyCode::Enter && entry.printable => {
                        self.staging.stage(staged_from_entry(&entry));
                    }
                    EntryKind::ToggleAll if key.code == KeyCode::Enter => self.toggle_all(),
                    _ => {}
                }
            }
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Backspace => {
                if self.browser.go_parent() {
                    self.nav.select_file(0);
                    effects.push(Effect::WatchDir(self.browser.dir().to_path_buf()));
                }
            }
            KeyCode::Char(' ') => {
                let Some(entry) = current else { return };
                match entry.kind {
                    EntryKind::ToggleAll => self.toggle_all(),
                    EntryKind::File if entry.printable => {
                        self.staging.toggle(staged_from_entry(&entry));
                    }
                    _ => {}
                }
            }
            KeyCode::Char('x') => {
                if let Some(entry) = current {
                    self.staging.unstage(&entry.path);
                }
            }
            KeyCode::Char('a') | KeyCode::Char('f') => self.nav.focus_files(FileFocus::Input),
            _ => {}
        }
    }

    fn enter_dir(&mut self, dir: PathBuf, effects: &mut Vec<Effect>) {
        self.browser.change_dir(dir);
        self.nav.select_file(0);
        effects.push(Effect::WatchDir(self.browser.dir().to_path_buf()));
    }

    /// Stages every printable file in the directory, or unstages them all if
    /// they already are.
    fn toggle_all(&mut self) {
        let printable: Vec<FileEntry> = self.browser.printable_files().cloned().collect();
        let all_staged = printable
            .iter()
            .all(|entry| self.staging.contains(&entry.path));
        for entry in &printable {
            if all_staged {
                self.staging.unstage(&entry.path);
            } else {
                self.staging.stage(staged_from_entry(entry));
            }
        }
    }

    fn stage_matched(&mut self) {
        let matched: Vec<FileEntry> = self.browser.matched_files().cloned().collect();
        let added = matched
            .iter()
            .filter(|entry| self.staging.stage(staged_from_entry(entry)))
            .count();
        if added > 0 {
            self.set_status(format!("Staged {added} file(s)"));
        }
    }

    fn submit_all(&mut self) {
        let staged = self.staging.take_all();
        if staged.is_empty() {
            return;
        }
        let count = staged.len();
        for file in staged {
            self.tracker.submit(file.path, file.name, file.copies);
        }
        info!(count, "submitted staged files");
        self.set_status(format!("Sending {count} file(s) to printer"));
    }

    fn cancel_entry(&mut self, index: usize, effects: &mut Vec<Effect>) {
        let Some(entry) = self.queue.get(index).cloned() else {
            return;
        };
        match entry {
            ReconciledEntry::SpoolerBacked { job, .. } | ReconciledEntry::BareSpoolerJob { job } => {
                self.set_status(format!("Canceling job {}", job.id));
                effects.push(Effect::Cancel(job.id));
            }
            ReconciledEntry::UntetheredOperation { op } => {
                match self.tracker.cancel_or_remove(&op.op_id) {
                    CancelOutcome::SoftCanceled => {
                        self.set_status(format!("Canceled {}", op.file_name))
                    }
                    CancelOutcome::Removed(_) => {
                        self.set_status(format!("Removed {}", op.file_name))
                    }
                    CancelOutcome::Unknown => {}
                }
            }
        }
    }

    fn retry_entry(&mut self, index: usize, effects: &mut Vec<Effect>) {
        let Some(entry) = self.queue.get(index) else {
            return;
        };
        match entry.op_id().map(str::to_string) {
            Some(op_id) => {
                let name = entry.display_name().to_string();
                let reached_spooler = entry.system_job_id().is_some();
                if self.tracker.retry(&op_id) {
                    self.set_status(format!("Retrying {name}"));
                } else if reached_spooler {
                    self.set_status(format!("{name} already reached the printer queue"));
                } else {
                    self.set_status(format!("{name} has not failed or been canceled"));
                }
            }
            None => effects.push(Effect::PollNow),
        }
    }

    fn remove_staged(&mut self, index: usize) {
        if let RemoveOutcome::Removed(file) = self.staging.request_remove(index) {
            self.set_status(format!("Unstaged {}", file.name));
        }
    }

    fn adjust_copies(&mut self, delta: i32) {
        if let Selection::StagedFile(index) = self.nav.selection(self.bounds()) {
            self.staging.adjust_copies(index, delta);
        }
    }

    /// File behind the cursor. Jobs from other sessions fall back to the
    /// persisted store; unknown origins yield nothing.
    fn selected_path(&self) -> Option<PathBuf> {
        match self.nav.selection(self.bounds()) {
            Selection::ActiveJob(index) => {
                let entry = self.queue.get(index)?;
                entry.file_path().map(PathBuf::from).or_else(|| {
                    entry
                        .system_job_id()
                        .and_then(|job_id| self.tracker.lookup_path(job_id))
                })
            }
            Selection::StagedFile(index) => self.staging.get(index).map(|file| file.path.clone()),
            _ => None,
        }
    }

    fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
    }
}

fn staged_from_entry(entry: &FileEntry) -> StagedFile {
    StagedFile::new(entry.path.clone(), entry.size_bytes)
}
