use crate::files::EntryKind;
use crate::state::App;
use crate::theme::{self, icons};
use chrono::{DateTime, Utc};
use printq_core::{
    format_size, FileFocus, LayoutMode, Pane, QueueSection, ReconciledEntry, ScrollableViewport,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const FOOTER_HEIGHT: u16 = 2;

pub fn render(f: &mut Frame, app: &mut App) {
    let area = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(FOOTER_HEIGHT)])
        .split(area);

    match app.nav.layout() {
        LayoutMode::Single => match app.nav.pane() {
            Pane::Queue => render_queue(f, app, chunks[0]),
            Pane::Files => render_files(f, app, chunks[0]),
        },
        LayoutMode::Horizontal | LayoutMode::Vertical => {
            let direction = if app.nav.layout() == LayoutMode::Horizontal {
                Direction::Horizontal
            } else {
                Direction::Vertical
            };
            let panes = Layout::default()
                .direction(direction)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(chunks[0]);
            render_queue(f, app, panes[0]);
            render_files(f, app, panes[1]);
        }
    }

    render_footer(f, app, chunks[1]);

    if app.show_help {
        render_help(f, centered(area, 60, 22));
    }
}

/// Splits the rows left after both section headers between active jobs and
/// staged files. Active gets at least a third of the room when it has jobs.
fn section_heights(avail: usize, active_count: usize) -> (usize, usize) {
    let active = if active_count == 0 {
        1
    } else {
        active_count.min((avail / 2).max(3))
    };
    let active = active.min(avail);
    let staged = avail.saturating_sub(active).max(1);
    (active, staged)
}

fn render_queue(f: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.nav.pane() == Pane::Queue;
    let block = titled_block("Queue", focused);
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height < 2 || inner.width == 0 {
        return;
    }

    let width = usize::from(inner.width);
    let avail = usize::from(inner.height).saturating_sub(2);
    let (active_h, staged_h) = section_heights(avail, app.queue().count());

    let active_focus = focused && app.nav.section() == QueueSection::Active;
    let staged_focus = focused && app.nav.section() == QueueSection::Staged;
    let active_cursor = app.nav.active_cursor();
    let staged_cursor = app.nav.staged_cursor();

    let active_lines = active_lines(app, active_focus, Utc::now());
    app.active_view.resize(width, active_h);
    app.active_view.set_content(active_lines);
    app.active_view.scroll_to_line(active_cursor);

    let staged_lines = staged_lines(app, staged_focus);
    app.staged_view.resize(width, staged_h);
    app.staged_view.set_content(staged_lines);
    app.staged_view.scroll_to_line(staged_cursor);

    let mut lines = Vec::with_capacity(usize::from(inner.height));
    let printer = if app.printer.name.is_empty() {
        String::new()
    } else {
        format!("  {} ({})", app.printer.name, app.printer.status)
    };
    lines.push(Line::from(vec![
        Span::styled(
            format!("PRINTING ({})", app.queue().count()),
            theme::HEADER_STYLE,
        ),
        Span::styled(printer, theme::DIM_STYLE),
    ]));

    let queue = app.queue();
    lines.extend(viewport_lines(&app.active_view, |index| {
        match queue.get(index) {
            Some(_) if active_focus && index == active_cursor => theme::SELECTED_STYLE,
            Some(entry) => Style::default().fg(theme::status_color(entry.status())),
            None => theme::DIM_STYLE,
        }
    }));

    lines.push(Line::from(Span::styled(
        format!("STAGED ({})", app.staging.len()),
        theme::STAGED_HEADER_STYLE,
    )));
    let staging = &app.staging;
    lines.extend(viewport_lines(&app.staged_view, |index| {
        match staging.get(index) {
            Some(_) if staged_focus && index == staged_cursor => theme::SELECTED_STYLE,
            Some(file) if file.pending_remove => theme::ERROR_STYLE,
            Some(_) => Style::default(),
            None => theme::DIM_STYLE,
        }
    }));

    f.render_widget(Paragraph::new(lines), inner);
}

fn active_lines(app: &App, focused: bool, now: DateTime<Utc>) -> Vec<String> {
    if app.queue().is_empty() {
        return vec![format!("{}No active jobs", icons::NO_CURSOR)];
    }
    let cursor = app.nav.active_cursor();
    app.queue()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let marker = if focused && index == cursor {
                icons::CURSOR
            } else {
                icons::NO_CURSOR
            };
            format!(
                "{marker}{} {}{}",
                theme::status_icon(entry.status()),
                entry.display_name(),
                entry_detail(entry, now)
            )
        })
        .collect()
}

/// Operation-backed rows end with the age of their last status change.
fn entry_detail(entry: &ReconciledEntry, now: DateTime<Utc>) -> String {
    let age = match entry {
        ReconciledEntry::SpoolerBacked { op, .. } | ReconciledEntry::UntetheredOperation { op } => {
            format!("  {}", format_time_ago(op.updated_at, now))
        }
        ReconciledEntry::BareSpoolerJob { .. } => String::new(),
    };
    if let Some(error) = entry.error() {
        return format!(" - {error}{age}");
    }
    match entry {
        ReconciledEntry::SpoolerBacked { job, .. } | ReconciledEntry::BareSpoolerJob { job } => {
            format!(
                "  #{} {} {}{age}",
                job.id,
                format_size(job.size_bytes),
                job.spooler_state
            )
        }
        ReconciledEntry::UntetheredOperation { op } => {
            let copies = if op.copies > 1 {
                format!(" x{}", op.copies)
            } else {
                String::new()
            };
            format!("  {}{copies}{age}", op.status)
        }
    }
}

fn format_time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds();
    match secs {
        s if s < 1 => "now".to_string(),
        s if s < 60 => format!("{s}s ago"),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3600),
        s => format!("{}d ago", s / 86_400),
    }
}

fn staged_lines(app: &App, focused: bool) -> Vec<String> {
    if app.staging.is_empty() {
        return vec![format!("{}Nothing staged", icons::NO_CURSOR)];
    }
    let cursor = app.nav.staged_cursor();
    app.staging
        .iter()
        .enumerate()
        .map(|(index, file)| {
            let marker = if focused && index == cursor {
                icons::CURSOR
            } else {
                icons::NO_CURSOR
            };
            let pending = if file.pending_remove {
                "  [x again to remove]"
            } else {
                ""
            };
            format!(
                "{marker}{}  x{}  {}{pending}",
                file.name,
                file.copies,
                format_size(file.size_bytes)
            )
        })
        .collect()
}

fn render_files(f: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.nav.pane() == Pane::Files;
    let block = titled_block("Files", focused);
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height < 4 || inner.width == 0 {
        return;
    }

    let input_focus = focused && app.nav.file_focus() == FileFocus::Input;
    let list_focus = focused && app.nav.file_focus() == FileFocus::List;
    let cursor = app.nav.file_cursor();

    let mut lines = vec![Line::from(Span::styled(
        app.browser.dir().display().to_string(),
        theme::DIR_STYLE,
    ))];
    let input_style = if input_focus {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let caret = if input_focus { "_" } else { "" };
    lines.push(Line::from(vec![
        Span::styled("Pattern: ", theme::DIM_STYLE),
        Span::styled(format!("{}{caret}", app.input), input_style),
    ]));
    lines.push(match app.browser.error() {
        Some(error) => Line::from(Span::styled(error.to_string(), theme::ERROR_STYLE)),
        None => Line::from(Span::styled(
            format!("{} matched", app.browser.matched_files().count()),
            theme::DIM_STYLE,
        )),
    });

    let list_lines = file_lines(app, list_focus);
    app.files_view
        .resize(usize::from(inner.width), usize::from(inner.height) - 3);
    app.files_view.set_content(list_lines);
    app.files_view.scroll_to_line(cursor);

    let browser = &app.browser;
    let staging = &app.staging;
    lines.extend(viewport_lines(&app.files_view, |index| {
        match browser.get(index) {
            Some(_) if list_focus && index == cursor => theme::SELECTED_STYLE,
            Some(entry) if entry.kind == EntryKind::Directory => theme::DIR_STYLE,
            Some(entry) if staging.contains(&entry.path) && entry.kind == EntryKind::File => {
                theme::MARKED_STYLE
            }
            Some(entry) if entry.matched => theme::MATCH_STYLE,
            Some(entry) if entry.kind == EntryKind::File && !entry.printable => theme::DIM_STYLE,
            _ => Style::default(),
        }
    }));

    f.render_widget(Paragraph::new(lines), inner);
}

fn file_lines(app: &App, focused: bool) -> Vec<String> {
    let cursor = app.nav.file_cursor();
    app.browser
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let marker = if focused && index == cursor {
                icons::CURSOR
            } else {
                icons::NO_CURSOR
            };
            match entry.kind {
                EntryKind::ToggleAll => format!("{marker}{}", entry.name),
                EntryKind::Directory => {
                    format!("{marker}    {}{}", entry.name, icons::DIRECTORY)
                }
                EntryKind::File if entry.printable => {
                    let mark = if app.staging.contains(&entry.path) {
                        icons::MARKED
                    } else {
                        icons::UNMARKED
                    };
                    format!(
                        "{marker}{mark} {}  {}",
                        entry.name,
                        format_size(entry.size_bytes)
                    )
                }
                EntryKind::File => format!("{marker}    {}", entry.name),
            }
        })
        .collect()
}

/// Turns viewport rows into styled lines. `style_for` colors content rows by
/// their line index; the scrollbar column is styled by glyph.
fn viewport_lines<F>(view: &ScrollableViewport, style_for: F) -> Vec<Line<'static>>
where
    F: Fn(usize) -> Style,
{
    view.rows()
        .into_iter()
        .map(|row| {
            let style = row.line.map(&style_for).unwrap_or_default();
            let mut spans = vec![Span::styled(row.text, style)];
            if let Some(glyph) = row.scrollbar {
                spans.push(Span::styled(glyph.symbol(), theme::scrollbar_style(glyph)));
            }
            Line::from(spans)
        })
        .collect()
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let status = match (&app.poll_error, &app.status_message) {
        (Some(error), _) => Line::from(Span::styled(
            format!("Queue unavailable: {error}"),
            theme::ERROR_STYLE,
        )),
        (None, Some(message)) => Line::from(Span::raw(message.clone())),
        (None, None) => Line::from(""),
    };

    let hints: &[(&str, &str)] = match (app.nav.pane(), app.nav.file_focus()) {
        (Pane::Queue, _) => &[
            ("x", "cancel"),
            ("r", "retry"),
            ("o", "open"),
            ("C", "clear"),
            ("P", "print"),
            ("a", "add"),
            ("?", "help"),
            ("q", "quit"),
        ],
        (Pane::Files, FileFocus::Input) => &[
            ("Enter", "stage matches"),
            ("Down", "list"),
            ("Esc", "back"),
        ],
        (Pane::Files, FileFocus::List) => &[
            ("Space", "toggle"),
            ("Enter", "open dir"),
            ("h", "parent"),
            ("i", "pattern"),
            ("P", "print"),
            ("q", "back"),
        ],
    };
    let mut spans = Vec::new();
    for (key, label) in hints {
        spans.push(keycap(key));
        spans.push(Span::styled(format!(" {label}  "), theme::DIM_STYLE));
    }

    f.render_widget(Paragraph::new(vec![status, Line::from(spans)]), area);
}

fn render_help(f: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let rows = [
        ("j/k Up/Down", "Move"),
        ("PgUp/PgDn", "Move by page"),
        ("Tab", "Switch pane"),
        ("a / f", "Add files"),
        ("x", "Cancel job / remove entry"),
        ("r", "Retry failed job"),
        ("C", "Clear finished jobs"),
        ("o / O", "Open file / folder"),
        ("h/l -/+", "Change copies"),
        ("P", "Print staged files"),
        ("X", "Clear staging"),
        ("Space", "Toggle file"),
        ("Enter", "Open dir / stage"),
        ("?", "Close help"),
        ("q / Esc", "Back / quit"),
    ];
    let mut lines = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for (key, label) in rows {
        lines.push(Line::from(vec![
            Span::styled(format!("{key:<14}"), Color::Cyan),
            Span::raw(label),
        ]));
    }
    f.render_widget(Paragraph::new(lines), inner);
}

fn keycap(label: &str) -> Span<'static> {
    Span::styled(
        format!("[{label}]"),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
}

fn titled_block(title: &str, focused: bool) -> Block<'static> {
    let title_style = if focused {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Block::default()
        .title(Span::styled(format!(" {title} "), title_style))
        .borders(Borders::ALL)
        .border_style(theme::pane_border(focused))
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
