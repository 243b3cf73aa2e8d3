/*!
shared.rs - helpers reused by the command handlers.

Focus:
  - operator-facing message constants (part of the console contract)
  - parse_server_id / resolve_server (the "resolve or report Invalid id" step)
  - effective configuration values (own overlay, else default)
  - print_items for configuration mappings
*/

use anyhow::Result;
use std::ops::ControlFlow;

use super::dispatch::{Exit, Flow};
use crate::console::{Console, Input};
use crate::meta::{ConfMap, Meta, Server};

/* ---- Messages ---- */

pub const SERVER_ID_PROMPT: &str = "Server id: ";
pub const PASSWORD_PROMPT: &str = "Password: ";
pub const KEY_PROMPT: &str = "Key (port, registerName, welcometext, ...): ";
pub const VALUE_PROMPT: &str = "Value: ";
pub const CONFIRM_PROMPT: &str = "Are you sure? [yes/No] ";
pub const INVALID_ID: &str = "Invalid id";
pub const INVALID_COMMAND: &str = "Invalid command.";
pub const NONE: &str = "(none)";
pub const DONE: &str = "Done";

pub const PORT_KEY: &str = "port";
pub const REGISTER_NAME_KEY: &str = "registerName";

/* ---- Prompting ---- */

/// Read one answer. Interrupt or end of input breaks out with the matching exit.
pub fn ask(console: &mut dyn Console, prompt: &str) -> Result<ControlFlow<Flow, String>> {
    Ok(match console.read_line(prompt)? {
        Input::Line(line) => ControlFlow::Continue(line),
        Input::Interrupted => ControlFlow::Break(Flow::Exit(Exit::Interrupted)),
        Input::Closed => ControlFlow::Break(Flow::Exit(Exit::EndOfInput)),
    })
}

/// Unwrap a `ControlFlow`, returning the break value from the handler.
macro_rules! proceed {
    ($e:expr) => {
        match $e? {
            ::std::ops::ControlFlow::Continue(v) => v,
            ::std::ops::ControlFlow::Break(flow) => return Ok(flow),
        }
    };
}
pub(crate) use proceed;

/* ---- Server resolution ---- */

/// Integer id as typed by the operator; surrounding whitespace is ignored.
pub fn parse_server_id(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok()
}

/// Prompt for a server id and look it up.
///
/// Unknown or non-numeric ids print `Invalid id` and break with
/// `Flow::Continue`: the command ends there, the session does not.
pub fn resolve_server(
    meta: &dyn Meta,
    console: &mut dyn Console,
) -> Result<ControlFlow<Flow, Box<dyn Server>>> {
    let raw = match ask(console, SERVER_ID_PROMPT)? {
        ControlFlow::Continue(raw) => raw,
        ControlFlow::Break(flow) => return Ok(ControlFlow::Break(flow)),
    };
    let found = match parse_server_id(&raw) {
        Some(id) => meta.server(id)?,
        None => None,
    };
    match found {
        Some(server) => Ok(ControlFlow::Continue(server)),
        None => {
            console.write_line(INVALID_ID)?;
            Ok(ControlFlow::Break(Flow::Continue))
        }
    }
}

/* ---- Effective values ---- */

/// Own value when present and non-empty.
fn own(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Numeric `port` of the default configuration, if it has one.
pub fn default_port(defaults: &ConfMap) -> Option<i64> {
    defaults
        .get(PORT_KEY)
        .and_then(|p| p.trim().parse::<i64>().ok())
}

/// Own `port` verbatim, else the default port shifted by `id - 1`.
pub fn effective_port(own_port: Option<&str>, default_port: Option<i64>, id: i32) -> Result<String> {
    if let Some(port) = own(own_port) {
        return Ok(port.to_string());
    }
    let Some(base) = default_port else {
        anyhow::bail!(
            "default configuration has no numeric '{PORT_KEY}' to derive the port of server {id}"
        );
    };
    match base.checked_add(i64::from(id) - 1) {
        Some(port) => Ok(port.to_string()),
        None => anyhow::bail!("default '{PORT_KEY}' {base} is out of range for server {id}"),
    }
}

/// Own `registerName`, else the default one (empty when neither exists).
pub fn effective_register_name(own_name: Option<&str>, defaults: &ConfMap) -> String {
    own(own_name)
        .or_else(|| defaults.get(REGISTER_NAME_KEY).map(String::as_str))
        .unwrap_or_default()
        .to_string()
}

/// `True` / `False`, as operators' scripts expect.
pub fn running_label(running: bool) -> &'static str {
    if running { "True" } else { "False" }
}

/* ---- Output ---- */

pub fn print_items(console: &mut dyn Console, items: &ConfMap) -> Result<()> {
    if items.is_empty() {
        return console.write_line(NONE);
    }
    for (key, value) in items {
        console.write_line(&format!("{key}: {value}"))?;
    }
    Ok(())
}
