//! Lifetime of one connection to the meta service.
//!
//! A `Session` exists only once the connection is established and cast. It
//! tears the connection down exactly once: through `destroy`, or on drop when
//! the caller bailed out early.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::console::Console;
use crate::meta::{Connection, Connector, Meta};

/// Where the meta service listens and how to talk to it.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Interface description; `None` means the default file or the built-in.
    pub interface: Option<PathBuf>,
}

pub struct Session {
    connection: Box<dyn Connection>,
    destroyed: bool,
}

impl Session {
    /// Connect, then announce `Connected to <host>:<port>`.
    pub fn connect(
        settings: &Settings,
        connector: &dyn Connector,
        console: &mut dyn Console,
    ) -> Result<Self> {
        let proxy = connector.proxy(&settings.host, settings.port).to_string();
        crate::log_debug!("connecting with proxy '{proxy}'");
        let connection = connector
            .connect(&proxy)
            .with_context(|| format!("could not reach {}:{}", settings.host, settings.port))?;
        let session = Self {
            connection,
            destroyed: false,
        };
        console.write_line(&format!("Connected to {}:{}", settings.host, settings.port))?;
        Ok(session)
    }

    pub fn meta(&self) -> &dyn Meta {
        self.connection.meta()
    }

    pub fn destroy(mut self) -> Result<()> {
        self.destroyed = true;
        self.connection.destroy()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Err(e) = self.connection.destroy() {
            crate::log_error!("failed to release connection: {e:#}");
        }
    }
}
