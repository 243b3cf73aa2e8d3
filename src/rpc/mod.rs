//! RPC transport for the meta service.
//!
//! parse_proxy -> ProxySpec (`Meta -e 1.0:tcp -h HOST -p PORT`)
//! RpcConnector -> connect + checked cast -> RpcConnection (Meta capability)
//! codec: JSON-RPC envelopes, 4-byte length-prefixed frames
//! interface: optional description of remote type / operation names
//!
use shell_words::split as shell_split;
use std::io;
use std::rc::Rc;
use thiserror::Error;

pub mod client;
pub mod codec;
pub mod interface;

pub use client::RpcClient;
pub use interface::InterfaceDescription;

use crate::meta::{Connection, Connector, ProxySpec};
use client::{MetaProxy, RpcConnection};

/// Transport-level failures. Converted into `anyhow::Error` at the
/// capability boundary.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid proxy string '{proxy}': {reason}")]
    InvalidProxy { proxy: String, reason: String },

    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("connection to {address} timed out after {secs}s")]
    ConnectTimeout { address: String, secs: u64 },

    #[error("transport I/O failure: {0}")]
    Io(#[from] io::Error),

    #[error("frame of {len} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { len: usize, limit: u32 },

    #[error("malformed message: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("response id {got} does not match request id {expected}")]
    IdMismatch { expected: u64, got: String },

    #[error("remote error {code}: {message}")]
    Remote { code: i32, message: String },

    #[error("unexpected result from {operation}: {detail}")]
    UnexpectedResult { operation: String, detail: String },

    #[error("remote object '{identity}' is not a {type_id}")]
    NotA { identity: String, type_id: String },

    #[error("connection is closed")]
    Closed,
}

/// Parse a connection string into a structured `ProxySpec`.
///
/// Accepted shape: `<identity> [-e <major.minor>]:tcp -h <host> -p <port>`.
/// Tokens are split with shell rules, so quoted hosts work.
pub fn parse_proxy(raw: &str) -> Result<ProxySpec, RpcError> {
    let invalid = |reason: &str| RpcError::InvalidProxy {
        proxy: raw.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("proxy string is empty"));
    }
    let (object_part, endpoint_part) = trimmed
        .split_once(':')
        .ok_or_else(|| invalid("missing endpoint"))?;

    let object = shell_split(object_part).map_err(|e| invalid(&e.to_string()))?;
    let mut tokens = object.into_iter();
    let identity = tokens.next().ok_or_else(|| invalid("missing identity"))?;
    let mut encoding = String::from("1.0");
    while let Some(opt) = tokens.next() {
        match opt.as_str() {
            "-e" => encoding = tokens.next().ok_or_else(|| invalid("-e needs a value"))?,
            other => return Err(invalid(&format!("unsupported proxy option '{other}'"))),
        }
    }

    let endpoint = shell_split(endpoint_part).map_err(|e| invalid(&e.to_string()))?;
    let mut tokens = endpoint.into_iter();
    match tokens.next().as_deref() {
        Some("tcp") => {}
        Some(other) => return Err(invalid(&format!("unsupported transport '{other}'"))),
        None => return Err(invalid("missing transport")),
    }
    let mut host = None;
    let mut port = None;
    while let Some(opt) = tokens.next() {
        let value = tokens
            .next()
            .ok_or_else(|| invalid(&format!("{opt} needs a value")))?;
        match opt.as_str() {
            "-h" => host = Some(value),
            "-p" => {
                port = Some(
                    value
                        .parse::<u16>()
                        .map_err(|_| invalid(&format!("invalid port '{value}'")))?,
                )
            }
            other => return Err(invalid(&format!("unsupported endpoint option '{other}'"))),
        }
    }

    let host = host
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("missing -h <host>"))?;
    let port = port.ok_or_else(|| invalid("missing -p <port>"))?;
    Ok(ProxySpec::new(identity, encoding, host, port))
}

/// Connects proxies described by an [`InterfaceDescription`].
pub struct RpcConnector {
    interface: Rc<InterfaceDescription>,
}

impl RpcConnector {
    pub fn new(interface: InterfaceDescription) -> Self {
        Self {
            interface: Rc::new(interface),
        }
    }
}

impl Connector for RpcConnector {
    fn proxy(&self, host: &str, port: u16) -> ProxySpec {
        ProxySpec::new(
            self.interface.meta_identity.clone(),
            self.interface.encoding.clone(),
            host,
            port,
        )
    }

    fn connect(&self, proxy: &str) -> anyhow::Result<Box<dyn Connection>> {
        let spec = parse_proxy(proxy)?;
        let client = Rc::new(RpcClient::connect(&spec.address())?);
        let meta = MetaProxy::new(Rc::clone(&client), Rc::clone(&self.interface), spec.identity);
        if let Err(e) = meta.checked_cast() {
            let _ = client.close();
            return Err(e.into());
        }
        crate::log_debug!("connected proxy '{proxy}'");
        Ok(Box::new(RpcConnection::new(client, meta)))
    }
}
