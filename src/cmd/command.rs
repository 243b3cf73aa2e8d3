/*!
Command vocabulary of the console.

Variants (in prompt order):
  list, conf, default-conf, new, pw, conf-set, start, stop, delete, quit

Matching is exact: no trimming, no case folding, no abbreviations.
*/

use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Command {
    List,
    Conf,
    DefaultConf,
    New,
    Pw,
    ConfSet,
    Start,
    Stop,
    Delete,
    Quit,
}

impl Command {
    /// All commands; order matters for the prompt.
    pub const fn variants() -> &'static [Command] {
        &[
            Command::List,
            Command::Conf,
            Command::DefaultConf,
            Command::New,
            Command::Pw,
            Command::ConfSet,
            Command::Start,
            Command::Stop,
            Command::Delete,
            Command::Quit,
        ]
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Command::List => "list",
            Command::Conf => "conf",
            Command::DefaultConf => "default-conf",
            Command::New => "new",
            Command::Pw => "pw",
            Command::ConfSet => "conf-set",
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Delete => "delete",
            Command::Quit => "quit",
        }
    }

    pub fn from_exact(s: &str) -> Option<Self> {
        Self::variants().iter().copied().find(|c| c.name() == s)
    }

    /// `command (list, conf, ..., quit): `
    pub fn prompt() -> String {
        let names: Vec<&str> = Self::variants().iter().map(Command::name).collect();
        format!("command ({}): ", names.join(", "))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::Command;

    #[test]
    fn prompt_lists_vocabulary_in_order() {
        assert_eq!(
            Command::prompt(),
            "command (list, conf, default-conf, new, pw, conf-set, start, stop, delete, quit): "
        );
    }

    #[test]
    fn exact_match_only() {
        assert_eq!(Command::from_exact("conf-set"), Some(Command::ConfSet));
        assert_eq!(Command::from_exact("quit"), Some(Command::Quit));
        assert_eq!(Command::from_exact("LIST"), None);
        assert_eq!(Command::from_exact("list "), None);
        assert_eq!(Command::from_exact("del"), None);
        assert_eq!(Command::from_exact(""), None);
    }

    #[test]
    fn names_round_trip() {
        for c in Command::variants() {
            assert_eq!(Command::from_exact(&c.to_string()), Some(*c));
        }
    }
}
