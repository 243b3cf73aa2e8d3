/*!
handlers.rs - one function per console command.

Every handler has the same shape: prompt for what it needs, call the meta
service, print the outcome. Commands that act on one server start with
`resolve_server`, which prints `Invalid id` and ends the command before any
further remote call when the id is unknown.

Remote failures are returned as errors; the dispatcher prints them and keeps
the session alive. Nothing here retries.
*/

use anyhow::{Context, Result};

use super::command::Command;
use super::dispatch::{Exit, Flow, Handler};
use super::shared::{
    CONFIRM_PROMPT, DONE, KEY_PROMPT, PASSWORD_PROMPT, PORT_KEY, REGISTER_NAME_KEY, VALUE_PROMPT,
    ask, default_port, effective_port, effective_register_name, print_items, proceed,
    resolve_server, running_label,
};
use crate::console::Console;
use crate::meta::Meta;

pub fn handler_for(command: Command) -> Handler {
    match command {
        Command::List => list,
        Command::Conf => conf,
        Command::DefaultConf => default_conf,
        Command::New => new,
        Command::Pw => pw,
        Command::ConfSet => conf_set,
        Command::Start => start,
        Command::Stop => stop,
        Command::Delete => delete,
        Command::Quit => quit,
    }
}

/// One line per server with its effective port and registerName.
fn list(meta: &dyn Meta, console: &mut dyn Console) -> Result<Flow> {
    let defaults = meta.default_conf()?;
    let base_port = default_port(&defaults);
    for server in meta.all_servers()? {
        let id = server.id()?;
        let running = server.is_running()?;
        let port = effective_port(server.conf(PORT_KEY)?.as_deref(), base_port, id)?;
        let register_name =
            effective_register_name(server.conf(REGISTER_NAME_KEY)?.as_deref(), &defaults);
        console.write_line(&format!(
            "id: {id}, running: {}, port: {port}, registerName: {register_name}",
            running_label(running)
        ))?;
    }
    Ok(Flow::Continue)
}

fn default_conf(meta: &dyn Meta, console: &mut dyn Console) -> Result<Flow> {
    let defaults = meta.default_conf()?;
    print_items(console, &defaults)?;
    Ok(Flow::Continue)
}

/// Own overlay only, not merged with defaults.
fn conf(meta: &dyn Meta, console: &mut dyn Console) -> Result<Flow> {
    let server = proceed!(resolve_server(meta, console));
    let items = server.all_conf()?;
    print_items(console, &items)?;
    Ok(Flow::Continue)
}

fn new(meta: &dyn Meta, console: &mut dyn Console) -> Result<Flow> {
    let server = meta.new_server()?;
    let id = server.id().context("server was created but its id is unknown")?;
    console.write_line(&format!("New id: {id}"))?;
    Ok(Flow::Continue)
}

fn pw(meta: &dyn Meta, console: &mut dyn Console) -> Result<Flow> {
    let server = proceed!(resolve_server(meta, console));
    let password = proceed!(ask(console, PASSWORD_PROMPT));
    server.set_superuser_password(&password)?;
    console.write_line(DONE)?;
    Ok(Flow::Continue)
}

/// Key and value are forwarded verbatim; the service decides what they mean.
fn conf_set(meta: &dyn Meta, console: &mut dyn Console) -> Result<Flow> {
    let server = proceed!(resolve_server(meta, console));
    let key = proceed!(ask(console, KEY_PROMPT));
    let value = proceed!(ask(console, VALUE_PROMPT));
    server.set_conf(&key, &value)?;
    console.write_line(DONE)?;
    Ok(Flow::Continue)
}

fn start(meta: &dyn Meta, console: &mut dyn Console) -> Result<Flow> {
    let server = proceed!(resolve_server(meta, console));
    server.start()?;
    console.write_line(DONE)?;
    Ok(Flow::Continue)
}

fn stop(meta: &dyn Meta, console: &mut dyn Console) -> Result<Flow> {
    let server = proceed!(resolve_server(meta, console));
    server.stop()?;
    console.write_line(DONE)?;
    Ok(Flow::Continue)
}

/// Deletes only on an answer that lowercases to exactly `yes`.
fn delete(meta: &dyn Meta, console: &mut dyn Console) -> Result<Flow> {
    let server = proceed!(resolve_server(meta, console));
    let answer = proceed!(ask(console, CONFIRM_PROMPT));
    if is_confirmed(&answer) {
        server.delete()?;
        console.write_line("Server deleted")?;
    } else {
        console.write_line("No")?;
    }
    Ok(Flow::Continue)
}

fn is_confirmed(answer: &str) -> bool {
    answer.to_lowercase() == "yes"
}

fn quit(_meta: &dyn Meta, _console: &mut dyn Console) -> Result<Flow> {
    Ok(Flow::Exit(Exit::Quit))
}
