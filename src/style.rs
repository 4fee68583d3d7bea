//! Terminal styling for narration text.

use colored::Colorize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Style {
    /// Black bold text on a green background, used for section banners.
    Highlight,
    /// Green, the system speaking.
    Narration,
    /// Cyan, addressed to the operator.
    Prompt,
    Plain,
}

pub fn style(text: &str, style: Style) -> String {
    match style {
        Style::Highlight => text.black().bold().on_green().to_string(),
        Style::Narration => text.green().to_string(),
        Style::Prompt => text.cyan().to_string(),
        Style::Plain => text.to_string(),
    }
}

/// Forces escape sequences on or off regardless of whether stdout is a terminal.
pub fn force_colors(enabled: bool) {
    colored::control::set_override(enabled);
}
