use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

mod cmd;
mod console;
mod meta;
mod rpc;
mod session;
mod utils;

use cmd::Dispatcher;
use cmd::format::{StyleOptions, banner};
use console::{Console, TerminalConsole};
use rpc::{InterfaceDescription, RpcConnector};
use session::{Session, Settings};

/// Manage Server - interactive console for the virtual servers of a Mumble
/// meta service.
///
/// Usage:
///   manage-server <HOST> <PORT> [INTERFACE]
///
/// Commands (at the prompt):
///   list, conf, default-conf, new, pw, conf-set, start, stop, delete, quit
///
/// Interface description:
///   YAML or JSON file naming the remote module, identities and operations.
///   Defaults to ./Murmur.yaml when present, else the built-in description.
///
/// Global flags:
///   -v / -vv        Increase verbosity (logs go to stderr)
///   -q / --quiet    Errors only
///
/// Examples:
///   manage-server 127.0.0.1 6502
///   manage-server 127.0.0.1 6502 ./Murmur.yaml -v
#[derive(Parser, Debug)]
#[command(
    name = "manage-server",
    version,
    author,
    about = "Manage virtual servers of a Mumble meta service"
)]
pub struct Cli {
    /// Host of the meta service
    host: String,

    /// Port of the meta service
    port: u16,

    /// Interface description file (YAML or JSON)
    interface: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence all non-error log output
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            host: self.host.clone(),
            port: self.port,
            interface: self.interface.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    let mut console = match TerminalConsole::new() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(&cli.settings(), &mut console) {
        Ok(code) => code,
        Err(e) => {
            crate::log_error!("console failure: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Banner, connect, loop, teardown. Startup failures are printed on the
/// console and end the process with status 1.
fn run(settings: &Settings, console: &mut dyn Console) -> anyhow::Result<ExitCode> {
    let interface = match InterfaceDescription::load(settings.interface.as_deref()) {
        Ok(i) => i,
        Err(e) => {
            console.write_line(&format!("{e:#}"))?;
            return Ok(ExitCode::FAILURE);
        }
    };

    for line in banner(&StyleOptions::detect()) {
        console.write_line(&line)?;
    }

    let connector = RpcConnector::new(interface);
    let session = match Session::connect(settings, &connector, console) {
        Ok(s) => s,
        Err(e) => {
            console.write_line(&format!("{e:#}"))?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let exit = Dispatcher::new(session.meta()).run(console)?;
    crate::log_debug!("session ended: {exit:?}");

    if let Err(e) = session.destroy() {
        crate::log_error!("failed to release connection: {e:#}");
    }
    Ok(ExitCode::SUCCESS)
}
