/*!
format.rs

Terminal styling for the human-facing parts of the console.

Only decoration goes through here (the startup banner). Command output is
part of the console contract and is always written plain.

Style decision:
  - NO_COLOR set            -> plain
  - stdout not a terminal   -> plain
  - otherwise               -> ANSI colors
*/

use std::io::IsTerminal;

#[derive(Debug, Clone, Copy)]
pub struct StyleOptions {
    pub use_color: bool,
}

impl StyleOptions {
    pub fn detect() -> Self {
        if std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal() {
            return Self::plain();
        }
        Self { use_color: true }
    }

    pub const fn plain() -> Self {
        Self { use_color: false }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Warning,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "1;38;5;45", // bold cyan
        Role::Warning => "38;5;214",  // orange
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

const TITLE: &str = " Virtual Mumble Server Manager ";

const WARNINGS: [&str; 3] = [
    "  !! Attention, be careful! ",
    "  !! This script can delete ALL servers, ",
    "  !! including the default server with ID 1. ",
];

/// Lines printed once before connecting.
pub fn banner(style: &StyleOptions) -> Vec<String> {
    let mut lines = Vec::with_capacity(WARNINGS.len() + 4);
    lines.push(String::new());
    lines.push(color(Role::Primary, TITLE, style));
    lines.push(String::new());
    lines.extend(WARNINGS.iter().map(|w| color(Role::Warning, w, style)));
    lines.push(String::new());
    lines
}
