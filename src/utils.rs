use crossterm::style::{self, Stylize};

/// Display colors handed out to containers in discovery order.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Color {
    Green,
    Magenta,
    Cyan,
    Red,
    Brown,
    Blue,
}

pub const PALETTE: [Color; 6] = [
    Color::Green,
    Color::Magenta,
    Color::Cyan,
    Color::Red,
    Color::Brown,
    Color::Blue,
];

impl Color {
    /// Color for the n-th discovered container; wraps around the palette.
    pub fn for_index(index: usize) -> Color {
        PALETTE[index % PALETTE.len()]
    }

    fn terminal(self) -> style::Color {
        match self {
            Color::Green => style::Color::Green,
            Color::Magenta => style::Color::Magenta,
            Color::Cyan => style::Color::Cyan,
            Color::Red => style::Color::Red,
            Color::Brown => style::Color::DarkYellow,
            Color::Blue => style::Color::Blue,
        }
    }
}

/// Banner text announcing a new run of lines from one container.
pub fn banner(pod_name: &str, container_name: &str) -> String {
    format!("[{} – {}]", pod_name, container_name)
}

/// Render `text` in `color`, optionally in reverse video. Returns the text
/// untouched when colors are disabled.
pub fn paint(text: &str, color: Color, reverse: bool, colored: bool) -> String {
    if !colored {
        return text.to_string();
    }
    let styled = text.with(color.terminal());
    if reverse {
        styled.reverse().to_string()
    } else {
        styled.to_string()
    }
}
