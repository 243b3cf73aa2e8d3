//! The read-eval-print loop and its command table.

use anyhow::Result;
use std::collections::HashMap;

use super::command::Command;
use super::handlers;
use super::shared::INVALID_COMMAND;
use crate::console::{Console, Input};
use crate::meta::Meta;

/// What a handler asks the loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(Exit),
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    Interrupted,
    EndOfInput,
}

pub type Handler = fn(&dyn Meta, &mut dyn Console) -> Result<Flow>;

/// Command -> handler.
pub struct CommandTable {
    entries: HashMap<Command, Handler>,
}

impl CommandTable {
    pub fn standard() -> Self {
        let entries = Command::variants()
            .iter()
            .map(|c| (*c, handlers::handler_for(*c)))
            .collect();
        Self { entries }
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<Handler> {
        let command = Command::from_exact(name)?;
        self.entries.get(&command).copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct Dispatcher<'a> {
    meta: &'a dyn Meta,
    table: CommandTable,
    prompt: String,
}

impl<'a> Dispatcher<'a> {
    pub fn new(meta: &'a dyn Meta) -> Self {
        Self {
            meta,
            table: CommandTable::standard(),
            prompt: Command::prompt(),
        }
    }

    /// Run until `quit`, interrupt or end of input.
    ///
    /// A failing command is reported and the loop goes on; only console
    /// failures end the loop with an error.
    pub fn run(&self, console: &mut dyn Console) -> Result<Exit> {
        loop {
            console.write_line("")?;
            let line = match console.read_line(&self.prompt)? {
                Input::Line(line) => line,
                Input::Interrupted => return finish(console, Exit::Interrupted),
                Input::Closed => return finish(console, Exit::EndOfInput),
            };

            let Some(handler) = self.table.get(&line) else {
                console.write_line(INVALID_COMMAND)?;
                continue;
            };

            crate::log_debug!("dispatching '{line}'");
            match handler(self.meta, console) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit(exit)) => return finish(console, exit),
                Err(e) => {
                    crate::log_debug!("command '{line}' failed: {e:?}");
                    console.write_line(&format!("Error: {e:#}"))?;
                }
            }
        }
    }
}

/// Interrupts and end of input leave the cursor mid-prompt; close the line.
fn finish(console: &mut dyn Console, exit: Exit) -> Result<Exit> {
    if exit != Exit::Quit {
        console.write_line("")?;
    }
    Ok(exit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::fake::FakeMeta;
    use crate::console::scripted::ScriptedConsole;

    const PROMPT: &str =
        "command (list, conf, default-conf, new, pw, conf-set, start, stop, delete, quit): ";

    #[test]
    fn table_covers_vocabulary() {
        let table = CommandTable::standard();
        assert_eq!(table.len(), Command::variants().len());
        assert!(table.get("default-conf").is_some());
        assert!(table.get("help").is_none());
    }

    #[test]
    fn quit_makes_no_remote_call() {
        let meta = FakeMeta::default().with_server(1, true, &[]);
        let mut console = ScriptedConsole::new(["quit"]);
        let exit = Dispatcher::new(&meta).run(&mut console).unwrap();
        assert_eq!(exit, Exit::Quit);
        assert!(meta.calls().is_empty());
        assert_eq!(console.lines, vec![""]);
        assert_eq!(console.prompts, vec![PROMPT]);
    }

    #[test]
    fn interrupt_at_prompt_terminates_like_quit() {
        let meta = FakeMeta::default();
        let mut console = ScriptedConsole::default().then(Input::Interrupted);
        let exit = Dispatcher::new(&meta).run(&mut console).unwrap();
        assert_eq!(exit, Exit::Interrupted);
        assert!(meta.calls().is_empty());
        assert_eq!(console.lines, vec!["", ""]);
    }

    #[test]
    fn end_of_input_terminates() {
        let meta = FakeMeta::default();
        let mut console = ScriptedConsole::default();
        assert_eq!(
            Dispatcher::new(&meta).run(&mut console).unwrap(),
            Exit::EndOfInput
        );
    }

    #[test]
    fn unknown_command_reported_and_loop_continues() {
        let meta = FakeMeta::default();
        let mut console = ScriptedConsole::new(["lsit", "LIST", "quit"]);
        let exit = Dispatcher::new(&meta).run(&mut console).unwrap();
        assert_eq!(exit, Exit::Quit);
        assert_eq!(
            console.lines,
            vec!["", "Invalid command.", "", "Invalid command.", ""]
        );
        assert!(meta.calls().is_empty());
    }

    #[test]
    fn remote_failure_is_shown_and_session_survives() {
        let meta = FakeMeta::default()
            .with_server(2, false, &[])
            .failing_start("port 64739 already in use");
        let mut console = ScriptedConsole::new(["start", "2", "stop", "2", "quit"]);
        let exit = Dispatcher::new(&meta).run(&mut console).unwrap();
        assert_eq!(exit, Exit::Quit);
        assert!(
            console
                .lines
                .iter()
                .any(|l| l.starts_with("Error: ") && l.contains("port 64739 already in use")),
            "{:?}",
            console.lines
        );
        assert!(console.lines.contains(&"Done".to_string()));
        assert_eq!(meta.calls(), vec!["getServer(2)", "s/2.start", "getServer(2)", "s/2.stop"]);
    }

    #[test]
    fn out_of_range_default_port_fails_only_that_command() {
        let max = i64::MAX.to_string();
        let meta = FakeMeta::default()
            .with_defaults(&[("port", max.as_str())])
            .with_server(2, false, &[]);
        let mut console = ScriptedConsole::new(["list", "start", "2", "quit"]);
        let exit = Dispatcher::new(&meta).run(&mut console).unwrap();
        assert_eq!(exit, Exit::Quit);
        assert!(console.lines[1].starts_with("Error: "), "{:?}", console.lines);
        assert!(console.lines.contains(&"Done".to_string()));
    }

    #[test]
    fn interrupt_inside_command_prompt_ends_session() {
        let meta = FakeMeta::default().with_server(1, false, &[]);
        let mut console = ScriptedConsole::new(["delete"]).then(Input::Interrupted);
        let exit = Dispatcher::new(&meta).run(&mut console).unwrap();
        assert_eq!(exit, Exit::Interrupted);
        assert!(meta.calls().is_empty());
        assert_eq!(console.remaining(), 0);
    }

    #[test]
    fn list_example_end_to_end() {
        let meta = FakeMeta::default()
            .with_defaults(&[("port", "64738"), ("registerName", "Default")])
            .with_server(1, true, &[])
            .with_server(2, false, &[("port", "65000")]);
        let mut console = ScriptedConsole::new(["list", "quit"]);
        Dispatcher::new(&meta).run(&mut console).unwrap();
        assert_eq!(
            console.lines,
            vec![
                "",
                "id: 1, running: True, port: 64738, registerName: Default",
                "id: 2, running: False, port: 65000, registerName: Default",
                "",
            ]
        );
    }
}
