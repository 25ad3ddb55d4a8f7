use printq_core::{OperationStatus, ScrollbarGlyph};
use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const STAGED_HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(250, 189, 47))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const DIM_STYLE: Style = Style::new().fg(Color::Rgb(146, 131, 116));
pub const ERROR_STYLE: Style = Style::new().fg(Color::Rgb(251, 73, 52));
pub const MATCH_STYLE: Style = Style::new()
    .fg(Color::Rgb(184, 187, 38))
    .add_modifier(Modifier::BOLD);
pub const MARKED_STYLE: Style = Style::new().fg(Color::Rgb(250, 189, 47));
pub const DIR_STYLE: Style = Style::new().fg(Color::Rgb(131, 165, 152));

pub mod icons {
    pub const CURSOR: &str = "> ";
    pub const NO_CURSOR: &str = "  ";
    pub const SPOOLED: &str = "*";
    pub const PENDING: &str = ".";
    pub const SENDING: &str = ">";
    pub const SENT: &str = "+";
    pub const FAILED: &str = "!";
    pub const CANCELED: &str = "x";
    pub const MARKED: &str = "[x]";
    pub const UNMARKED: &str = "[ ]";
    pub const DIRECTORY: &str = "/";
}

pub fn status_icon(status: Option<OperationStatus>) -> &'static str {
    match status {
        None => icons::SPOOLED,
        Some(OperationStatus::Pending) => icons::PENDING,
        Some(OperationStatus::Sending) => icons::SENDING,
        Some(OperationStatus::Sent) => icons::SENT,
        Some(OperationStatus::Failed) => icons::FAILED,
        Some(OperationStatus::Canceled) => icons::CANCELED,
    }
}

pub fn status_color(status: Option<OperationStatus>) -> Color {
    match status {
        None => Color::Rgb(131, 165, 152),
        Some(OperationStatus::Pending) => Color::Rgb(146, 131, 116),
        Some(OperationStatus::Sending) => Color::Rgb(250, 189, 47),
        Some(OperationStatus::Sent) => Color::Rgb(184, 187, 38),
        Some(OperationStatus::Failed) => Color::Rgb(251, 73, 52),
        Some(OperationStatus::Canceled) => Color::Rgb(214, 93, 14),
    }
}

pub fn scrollbar_style(glyph: ScrollbarGlyph) -> Style {
    if glyph.is_active() {
        DIM_STYLE
    } else {
        Style::new().fg(Color::Rgb(51, 51, 51))
    }
}

pub fn pane_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}
