/*!
Blocking RPC client and the Meta / Server proxies built on it.

The client owns a private current-thread tokio runtime and one TCP stream;
every call is driven to completion with `block_on`, so callers stay
synchronous. A transport failure mid-call poisons the stream: later calls
report `RpcError::Closed` instead of reading a half-consumed frame.
*/

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};

use super::codec::{self, RpcRequest};
use super::{InterfaceDescription, RpcError};
use crate::meta::{ConfMap, Connection, Meta, Server};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RpcClient {
    // dropped before the runtime that drives it
    stream: RefCell<Option<TcpStream>>,
    runtime: Runtime,
    next_id: Cell<u64>,
    address: String,
}

impl RpcClient {
    pub fn connect(address: &str) -> Result<Self, RpcError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let stream = runtime
            .block_on(async {
                tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(address)).await
            })
            .map_err(|_| RpcError::ConnectTimeout {
                address: address.to_string(),
                secs: CONNECT_TIMEOUT.as_secs(),
            })?
            .map_err(|source| RpcError::Connect {
                address: address.to_string(),
                source,
            })?;
        stream.set_nodelay(true)?;
        crate::log_debug!("tcp connection established to {address}");
        Ok(Self {
            stream: RefCell::new(Some(stream)),
            runtime,
            next_id: Cell::new(1),
            address: address.to_string(),
        })
    }

    /// Invoke `method` on the remote object `target` and wait for its result.
    pub fn call(&self, target: &str, method: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        let payload = codec::encode(&RpcRequest::new(id, target, method, args))?;

        let mut guard = self.stream.borrow_mut();
        let stream = guard.as_mut().ok_or(RpcError::Closed)?;
        crate::log_trace!("-> #{id} {target}.{method}");
        let exchanged = self.runtime.block_on(async {
            codec::write_frame(stream, &payload).await?;
            codec::read_frame(stream).await
        });
        let frame = match exchanged {
            Ok(frame) => frame,
            Err(e) => {
                crate::log_debug!("dropping connection to {} after: {e}", self.address);
                *guard = None;
                return Err(e);
            }
        };
        drop(guard);

        let result = codec::decode_response(&frame)?.into_result(id);
        crate::log_trace!("<- #{id} {}", if result.is_ok() { "ok" } else { "error" });
        result
    }

    /// Shut the stream down. Further calls fail with `RpcError::Closed`.
    pub fn close(&self) -> Result<(), RpcError> {
        let taken = self.stream.borrow_mut().take();
        if let Some(mut stream) = taken {
            self.runtime.block_on(stream.shutdown())?;
            crate::log_debug!("closed connection to {}", self.address);
        }
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(operation: &str, value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::UnexpectedResult {
        operation: operation.to_string(),
        detail: e.to_string(),
    })
}

/* ---- Meta proxy ---- */

pub struct MetaProxy {
    client: Rc<RpcClient>,
    interface: Rc<InterfaceDescription>,
    identity: String,
}

impl MetaProxy {
    pub fn new(client: Rc<RpcClient>, interface: Rc<InterfaceDescription>, identity: String) -> Self {
        Self {
            client,
            interface,
            identity,
        }
    }

    /// Confirm that the remote object implements the meta type.
    pub fn checked_cast(&self) -> Result<(), RpcError> {
        let type_id = self.interface.meta_type_id();
        let op = &self.interface.operations.is_a;
        let value = self.client.call(&self.identity, op, vec![json!(type_id)])?;
        if decode::<bool>(op, value)? {
            Ok(())
        } else {
            Err(RpcError::NotA {
                identity: self.identity.clone(),
                type_id,
            })
        }
    }

    fn invoke<T: DeserializeOwned>(&self, op: &str, args: Vec<Value>) -> Result<T, RpcError> {
        decode(op, self.client.call(&self.identity, op, args)?)
    }

    fn server_proxy(&self, id: i32) -> Box<dyn Server> {
        Box::new(ServerProxy {
            client: Rc::clone(&self.client),
            identity: self.interface.server_identity(id),
            interface: Rc::clone(&self.interface),
            id,
        })
    }
}

impl Meta for MetaProxy {
    fn default_conf(&self) -> Result<ConfMap> {
        let ops = &self.interface.operations;
        self.invoke(&ops.get_default_conf, vec![])
            .context("failed to fetch default configuration")
    }

    fn all_servers(&self) -> Result<Vec<Box<dyn Server>>> {
        let ops = &self.interface.operations;
        let ids: Vec<i32> = self
            .invoke(&ops.get_all_servers, vec![])
            .context("failed to enumerate servers")?;
        Ok(ids.into_iter().map(|id| self.server_proxy(id)).collect())
    }

    fn server(&self, id: i32) -> Result<Option<Box<dyn Server>>> {
        let ops = &self.interface.operations;
        let found: Option<i32> = self
            .invoke(&ops.get_server, vec![json!(id)])
            .with_context(|| format!("failed to look up server {id}"))?;
        Ok(found.map(|id| self.server_proxy(id)))
    }

    fn new_server(&self) -> Result<Box<dyn Server>> {
        let ops = &self.interface.operations;
        let id: i32 = self
            .invoke(&ops.new_server, vec![])
            .context("failed to create server")?;
        Ok(self.server_proxy(id))
    }
}

/* ---- Server proxy ---- */

pub struct ServerProxy {
    client: Rc<RpcClient>,
    interface: Rc<InterfaceDescription>,
    identity: String,
    id: i32,
}

impl ServerProxy {
    fn invoke<T: DeserializeOwned>(&self, op: &str, args: Vec<Value>) -> Result<T, RpcError> {
        decode(op, self.client.call(&self.identity, op, args)?)
    }

    fn invoke_unit(&self, op: &str, args: Vec<Value>) -> Result<(), RpcError> {
        self.client.call(&self.identity, op, args).map(|_| ())
    }
}

impl Server for ServerProxy {
    fn id(&self) -> Result<i32> {
        let ops = &self.interface.operations;
        self.invoke(&ops.id, vec![])
            .with_context(|| format!("failed to read id of {}", self.identity))
    }

    fn is_running(&self) -> Result<bool> {
        let ops = &self.interface.operations;
        self.invoke(&ops.is_running, vec![])
            .with_context(|| format!("failed to query state of server {}", self.id))
    }

    fn conf(&self, key: &str) -> Result<Option<String>> {
        let ops = &self.interface.operations;
        self.invoke(&ops.get_conf, vec![json!(key)])
            .with_context(|| format!("failed to read '{key}' of server {}", self.id))
    }

    fn all_conf(&self) -> Result<ConfMap> {
        let ops = &self.interface.operations;
        self.invoke(&ops.get_all_conf, vec![])
            .with_context(|| format!("failed to read configuration of server {}", self.id))
    }

    fn set_conf(&self, key: &str, value: &str) -> Result<()> {
        let ops = &self.interface.operations;
        self.invoke_unit(&ops.set_conf, vec![json!(key), json!(value)])
            .with_context(|| format!("failed to set '{key}' on server {}", self.id))
    }

    fn set_superuser_password(&self, password: &str) -> Result<()> {
        let ops = &self.interface.operations;
        self.invoke_unit(&ops.set_superuser_password, vec![json!(password)])
            .with_context(|| format!("failed to set superuser password on server {}", self.id))
    }

    fn start(&self) -> Result<()> {
        let ops = &self.interface.operations;
        self.invoke_unit(&ops.start, vec![])
            .with_context(|| format!("failed to start server {}", self.id))
    }

    fn stop(&self) -> Result<()> {
        let ops = &self.interface.operations;
        self.invoke_unit(&ops.stop, vec![])
            .with_context(|| format!("failed to stop server {}", self.id))
    }

    fn delete(&self) -> Result<()> {
        let ops = &self.interface.operations;
        self.invoke_unit(&ops.delete, vec![])
            .with_context(|| format!("failed to delete server {}", self.id))
    }
}

/* ---- Connection ---- */

pub struct RpcConnection {
    client: Rc<RpcClient>,
    meta: MetaProxy,
}

impl RpcConnection {
    pub fn new(client: Rc<RpcClient>, meta: MetaProxy) -> Self {
        Self { client, meta }
    }
}

impl Connection for RpcConnection {
    fn meta(&self) -> &dyn Meta {
        &self.meta
    }

    fn destroy(&mut self) -> Result<()> {
        self.client.close().context("failed to close connection")
    }
}
