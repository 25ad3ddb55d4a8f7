//! Cursor and focus state across the queue pane (active jobs, staged files)
//! and the file pane (pattern input, file list).
//!
//! Every movement takes the current [`NavBounds`] and clamps before acting,
//! so a queue that shrank between a keypress and the next frame never leaves
//! a cursor pointing past the end.

pub const PAGE_STEP: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pane {
    #[default]
    Queue,
    Files,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueSection {
    #[default]
    Active,
    Staged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFocus {
    #[default]
    Input,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    #[default]
    Single,
    Horizontal,
    Vertical,
}

impl LayoutMode {
    /// Two rows are reserved for the footer.
    pub fn for_size(width: u16, height: u16) -> Self {
        let usable = height.saturating_sub(2);
        if width >= 110 && usable >= 12 {
            LayoutMode::Horizontal
        } else if width >= 60 && usable >= 24 {
            LayoutMode::Vertical
        } else {
            LayoutMode::Single
        }
    }

    pub fn is_split(&self) -> bool {
        !matches!(self, LayoutMode::Single)
    }
}

/// Item counts the cursors are bounded by. `active` must come from the
/// current reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavBounds {
    pub active: usize,
    pub staged: usize,
    pub files: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    ActiveJob(usize),
    StagedFile(usize),
    FileInput,
    FileEntry(usize),
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    pane: Pane,
    section: QueueSection,
    file_focus: FileFocus,
    layout: LayoutMode,
    active_cursor: usize,
    staged_cursor: usize,
    file_cursor: usize,
}

impl NavigationState {
    pub fn new(layout: LayoutMode) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    pub fn pane(&self) -> Pane {
        self.pane
    }

    pub fn section(&self) -> QueueSection {
        self.section
    }

    pub fn file_focus(&self) -> FileFocus {
        self.file_focus
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    pub fn active_cursor(&self) -> usize {
        self.active_cursor
    }

    pub fn staged_cursor(&self) -> usize {
        self.staged_cursor
    }

    pub fn file_cursor(&self) -> usize {
        self.file_cursor
    }

    pub fn set_layout(&mut self, layout: LayoutMode) {
        self.layout = layout;
    }

    pub fn clamp(&mut self, bounds: NavBounds) {
        self.active_cursor = self.active_cursor.min(bounds.active.saturating_sub(1));
        self.staged_cursor = self.staged_cursor.min(bounds.staged.saturating_sub(1));
        self.file_cursor = self.file_cursor.min(bounds.files.saturating_sub(1));
        if self.section == QueueSection::Staged && bounds.staged == 0 {
            self.section = QueueSection::Active;
        }
    }

    pub fn selection(&self, bounds: NavBounds) -> Selection {
        match (self.pane, self.section, self.file_focus) {
            (Pane::Queue, QueueSection::Active, _) if self.active_cursor < bounds.active => {
                Selection::ActiveJob(self.active_cursor)
            }
            (Pane::Queue, QueueSection::Staged, _) if self.staged_cursor < bounds.staged => {
                Selection::StagedFile(self.staged_cursor)
            }
            (Pane::Files, _, FileFocus::Input) => Selection::FileInput,
            (Pane::Files, _, FileFocus::List) if self.file_cursor < bounds.files => {
                Selection::FileEntry(self.file_cursor)
            }
            _ => Selection::None,
        }
    }

    pub fn move_down(&mut self, bounds: NavBounds) {
        self.step_down(bounds, 1);
    }

    pub fn move_up(&mut self, bounds: NavBounds) {
        self.step_up(bounds, 1);
    }

    pub fn page_down(&mut self, bounds: NavBounds) {
        self.step_down(bounds, PAGE_STEP);
    }

    pub fn page_up(&mut self, bounds: NavBounds) {
        self.step_up(bounds, PAGE_STEP);
    }

    /// Moves within the current section, or falls through to the next one
    /// when already on its last item.
    fn step_down(&mut self, bounds: NavBounds, step: usize) {
        self.clamp(bounds);
        match (self.pane, self.section, self.file_focus) {
            (Pane::Queue, QueueSection::Active, _) => {
                if let Some(next) = advance(self.active_cursor, bounds.active, step) {
                    self.active_cursor = next;
                } else if bounds.staged > 0 {
                    self.section = QueueSection::Staged;
                    self.staged_cursor = 0;
                } else if self.layout.is_split() {
                    self.focus_files(FileFocus::Input);
                }
            }
            (Pane::Queue, QueueSection::Staged, _) => {
                if let Some(next) = advance(self.staged_cursor, bounds.staged, step) {
                    self.staged_cursor = next;
                } else if self.layout.is_split() {
                    self.focus_files(FileFocus::Input);
                }
            }
            (Pane::Files, _, FileFocus::Input) => {
                self.file_focus = FileFocus::List;
                self.file_cursor = 0;
            }
            (Pane::Files, _, FileFocus::List) => {
                if let Some(next) = advance(self.file_cursor, bounds.files, step) {
                    self.file_cursor = next;
                }
            }
        }
    }

    fn step_up(&mut self, bounds: NavBounds, step: usize) {
        self.clamp(bounds);
        match (self.pane, self.section, self.file_focus) {
            (Pane::Queue, QueueSection::Active, _) => {
                self.active_cursor = self.active_cursor.saturating_sub(step);
            }
            (Pane::Queue, QueueSection::Staged, _) => {
                if self.staged_cursor > 0 {
                    self.staged_cursor = self.staged_cursor.saturating_sub(step);
                } else {
                    self.section = QueueSection::Active;
                    self.active_cursor = bounds.active.saturating_sub(1);
                }
            }
            (Pane::Files, _, FileFocus::Input) => {
                if self.layout.is_split() {
                    self.focus_queue_bottom(bounds);
                }
            }
            (Pane::Files, _, FileFocus::List) => {
                if self.file_cursor > 0 {
                    self.file_cursor = self.file_cursor.saturating_sub(step);
                } else {
                    self.file_focus = FileFocus::Input;
                }
            }
        }
    }

    pub fn focus_files(&mut self, focus: FileFocus) {
        self.pane = Pane::Files;
        self.file_focus = focus;
    }

    pub fn focus_queue(&mut self) {
        self.pane = Pane::Queue;
    }

    /// Enters the queue on its last item: the staged tail if any, else the
    /// last active job.
    pub fn focus_queue_bottom(&mut self, bounds: NavBounds) {
        self.pane = Pane::Queue;
        if bounds.staged > 0 {
            self.section = QueueSection::Staged;
            self.staged_cursor = bounds.staged - 1;
        } else {
            self.section = QueueSection::Active;
            self.active_cursor = bounds.active.saturating_sub(1);
        }
    }

    /// Tab between panes. Only meaningful when both are on screen.
    pub fn switch_pane(&mut self) -> bool {
        if !self.layout.is_split() {
            return false;
        }
        self.pane = match self.pane {
            Pane::Queue => Pane::Files,
            Pane::Files => Pane::Queue,
        };
        true
    }

    /// Esc / `q`: leaves the file pane. Returns false when already on the
    /// queue, where the caller quits.
    pub fn back(&mut self) -> bool {
        match self.pane {
            Pane::Files => {
                self.pane = Pane::Queue;
                true
            }
            Pane::Queue => false,
        }
    }

    pub fn select_active(&mut self, index: usize) {
        self.pane = Pane::Queue;
        self.section = QueueSection::Active;
        self.active_cursor = index;
    }

    pub fn select_staged(&mut self, index: usize) {
        self.pane = Pane::Queue;
        self.section = QueueSection::Staged;
        self.staged_cursor = index;
    }

    pub fn select_file(&mut self, index: usize) {
        self.focus_files(FileFocus::List);
        self.file_cursor = index;
    }
}

/// Next cursor position, or `None` when `cursor` is already on the last item.
fn advance(cursor: usize, len: usize, step: usize) -> Option<usize> {
    let last = len.checked_sub(1)?;
    (cursor < last).then(|| (cursor + step).min(last))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(active: usize, staged: usize, files: usize) -> NavBounds {
        NavBounds {
            active,
            staged,
            files,
        }
    }

    #[test]
    fn layout_thresholds() {
        assert_eq!(LayoutMode::for_size(110, 14), LayoutMode::Horizontal);
        assert_eq!(LayoutMode::for_size(110, 13), LayoutMode::Single);
        assert_eq!(LayoutMode::for_size(80, 26), LayoutMode::Vertical);
        assert_eq!(LayoutMode::for_size(59, 40), LayoutMode::Single);
        assert!(!LayoutMode::Single.is_split());
    }

    #[test]
    fn down_visits_every_item_once_then_stops() {
        let b = bounds(3, 2, 4);
        let mut nav = NavigationState::new(LayoutMode::Horizontal);
        let mut visited = vec![nav.selection(b)];
        for _ in 0..20 {
            nav.move_down(b);
            let current = nav.selection(b);
            if visited.last() != Some(&current) {
                visited.push(current);
            }
        }
        assert_eq!(
            visited,
            vec![
                Selection::ActiveJob(0),
                Selection::ActiveJob(1),
                Selection::ActiveJob(2),
                Selection::StagedFile(0),
                Selection::StagedFile(1),
                Selection::FileInput,
                Selection::FileEntry(0),
                Selection::FileEntry(1),
                Selection::FileEntry(2),
                Selection::FileEntry(3),
            ]
        );
        assert_eq!(nav.selection(b), Selection::FileEntry(3));
    }

    #[test]
    fn up_reverses_down() {
        let b = bounds(2, 1, 2);
        let mut nav = NavigationState::new(LayoutMode::Vertical);
        nav.select_file(1);
        let expected = [
            Selection::FileEntry(0),
            Selection::FileInput,
            Selection::StagedFile(0),
            Selection::ActiveJob(1),
            Selection::ActiveJob(0),
            Selection::ActiveJob(0),
        ];
        for want in expected {
            nav.move_up(b);
            assert_eq!(nav.selection(b), want);
        }
    }

    #[test]
    fn single_layout_never_leaves_the_queue_by_moving() {
        let b = bounds(1, 1, 3);
        let mut nav = NavigationState::new(LayoutMode::Single);
        for _ in 0..5 {
            nav.move_down(b);
        }
        assert_eq!(nav.pane(), Pane::Queue);
        assert_eq!(nav.selection(b), Selection::StagedFile(0));
        assert!(!nav.switch_pane());

        nav.focus_files(FileFocus::Input);
        nav.move_up(b);
        assert_eq!(nav.selection(b), Selection::FileInput);
    }

    #[test]
    fn empty_active_falls_through_to_staged() {
        let b = bounds(0, 2, 0);
        let mut nav = NavigationState::new(LayoutMode::Horizontal);
        assert_eq!(nav.selection(b), Selection::None);
        nav.move_down(b);
        assert_eq!(nav.selection(b), Selection::StagedFile(0));
    }

    #[test]
    fn page_steps_stop_at_section_end_then_fall_through() {
        let b = bounds(12, 3, 0);
        let mut nav = NavigationState::new(LayoutMode::Horizontal);
        nav.page_down(b);
        assert_eq!(nav.selection(b), Selection::ActiveJob(5));
        nav.page_down(b);
        assert_eq!(nav.selection(b), Selection::ActiveJob(10));
        nav.page_down(b);
        assert_eq!(nav.selection(b), Selection::ActiveJob(11));
        nav.page_down(b);
        assert_eq!(nav.selection(b), Selection::StagedFile(0));
        nav.page_down(b);
        assert_eq!(nav.selection(b), Selection::StagedFile(2));
        nav.page_down(b);
        assert_eq!(nav.selection(b), Selection::FileInput);

        nav.page_up(b);
        assert_eq!(nav.selection(b), Selection::StagedFile(2));
        nav.page_up(b);
        assert_eq!(nav.selection(b), Selection::StagedFile(0));
        nav.page_up(b);
        assert_eq!(nav.selection(b), Selection::ActiveJob(11));
        nav.page_up(b);
        assert_eq!(nav.selection(b), Selection::ActiveJob(6));
    }

    #[test]
    fn shrinking_queue_reclamps_before_moving() {
        let mut nav = NavigationState::new(LayoutMode::Horizontal);
        nav.select_active(9);
        let shrunk = bounds(4, 0, 0);
        nav.clamp(shrunk);
        assert_eq!(nav.selection(shrunk), Selection::ActiveJob(3));

        nav.select_active(9);
        nav.move_up(shrunk);
        assert_eq!(nav.selection(shrunk), Selection::ActiveJob(2));
    }

    #[test]
    fn staged_section_collapses_when_emptied() {
        let mut nav = NavigationState::new(LayoutMode::Horizontal);
        nav.select_staged(0);
        nav.clamp(bounds(2, 0, 0));
        assert_eq!(nav.section(), QueueSection::Active);
        assert_eq!(nav.selection(bounds(2, 0, 0)), Selection::ActiveJob(0));
    }

    #[test]
    fn back_leaves_files_then_reports_root() {
        let mut nav = NavigationState::new(LayoutMode::Single);
        nav.focus_files(FileFocus::List);
        assert!(nav.back());
        assert_eq!(nav.pane(), Pane::Queue);
        assert!(!nav.back());
    }
}
