//! Capability interface of the remote meta service.
//!
//! The dispatcher only ever sees these traits. `rpc` provides the network
//! implementation; tests provide an in-memory one.
//!
//!   Connector  -> Connection (owns the link, torn down once)
//!   Meta       -> default conf, server enumeration / lookup / creation
//!   Server     -> one virtual server instance addressed by id

use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;

/// Configuration mapping (default configuration or one server's own overlay).
pub type ConfMap = BTreeMap<String, String>;

/// Connection string addressing the meta object, e.g.
/// `Meta -e 1.0:tcp -h 127.0.0.1 -p 6502`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySpec {
    pub identity: String,
    pub encoding: String,
    pub host: String,
    pub port: u16,
}

impl ProxySpec {
    pub fn new(
        identity: impl Into<String>,
        encoding: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            identity: identity.into(),
            encoding: encoding.into(),
            host: host.into(),
            port,
        }
    }

    /// `host:port` form used for socket resolution.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for ProxySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -e {}:tcp -h {} -p {}",
            self.identity,
            self.encoding,
            shell_words::quote(&self.host),
            self.port
        )
    }
}

/// Resolves a proxy string into a typed meta capability.
pub trait Connector {
    /// Proxy addressing the meta object at `host:port`.
    fn proxy(&self, host: &str, port: u16) -> ProxySpec {
        ProxySpec::new("Meta", "1.0", host, port)
    }

    /// Connect and cast. Fails instead of returning a half-usable handle.
    fn connect(&self, proxy: &str) -> Result<Box<dyn Connection>>;
}

/// An established link to the meta service.
pub trait Connection {
    fn meta(&self) -> &dyn Meta;

    /// Release the underlying link. Called exactly once by `Session`.
    fn destroy(&mut self) -> Result<()>;
}

/// The remote authority managing the set of virtual servers.
pub trait Meta {
    fn default_conf(&self) -> Result<ConfMap>;
    fn all_servers(&self) -> Result<Vec<Box<dyn Server>>>;
    /// `Ok(None)` when no server carries this id.
    fn server(&self, id: i32) -> Result<Option<Box<dyn Server>>>;
    fn new_server(&self) -> Result<Box<dyn Server>>;
}

/// One managed virtual server.
pub trait Server {
    fn id(&self) -> Result<i32>;
    fn is_running(&self) -> Result<bool>;
    /// Own configuration only; defaults are not merged in.
    fn conf(&self, key: &str) -> Result<Option<String>>;
    fn all_conf(&self) -> Result<ConfMap>;
    fn set_conf(&self, key: &str, value: &str) -> Result<()>;
    fn set_superuser_password(&self, password: &str) -> Result<()>;
    fn start(&self) -> Result<()>;
    fn stop(&self) -> Result<()>;
    fn delete(&self) -> Result<()>;
}
