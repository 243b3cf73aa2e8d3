//! In-memory meta service for handler, dispatcher and session tests.
//!
//! Lookups and mutations are recorded as `getServer(N)`, `s/N.start` and so
//! on. Plain reads (`id`, `isRunning`, `getConf`, `getAllConf`) are not.

use anyhow::{Result, anyhow, bail};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::meta::{ConfMap, Connection, Connector, Meta, Server};

#[derive(Debug, Default)]
struct Entry {
    running: bool,
    conf: ConfMap,
    password: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    defaults: ConfMap,
    servers: BTreeMap<i32, Entry>,
    calls: Vec<String>,
    mutations: Vec<String>,
    start_failure: Option<String>,
}

impl State {
    fn entry(&mut self, id: i32) -> Result<&mut Entry> {
        self.servers
            .get_mut(&id)
            .ok_or_else(|| anyhow!("server {id} does not exist"))
    }
}

fn to_conf(pairs: &[(&str, &str)]) -> ConfMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct FakeMeta {
    state: Rc<RefCell<State>>,
}

impl FakeMeta {
    pub fn with_defaults(self, pairs: &[(&str, &str)]) -> Self {
        self.state.borrow_mut().defaults = to_conf(pairs);
        self
    }

    pub fn with_server(self, id: i32, running: bool, conf: &[(&str, &str)]) -> Self {
        self.state.borrow_mut().servers.insert(
            id,
            Entry {
                running,
                conf: to_conf(conf),
                password: None,
            },
        );
        self
    }

    /// Every `start` fails with `message` and leaves the server stopped.
    pub fn failing_start(self, message: &str) -> Self {
        self.state.borrow_mut().start_failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.state.borrow().mutations.clone()
    }

    pub fn has_server(&self, id: i32) -> bool {
        self.state.borrow().servers.contains_key(&id)
    }

    pub fn is_running(&self, id: i32) -> bool {
        self.state
            .borrow()
            .servers
            .get(&id)
            .is_some_and(|e| e.running)
    }

    pub fn password(&self, id: i32) -> Option<String> {
        self.state
            .borrow()
            .servers
            .get(&id)
            .and_then(|e| e.password.clone())
    }

    pub fn conf_value(&self, id: i32, key: &str) -> Option<String> {
        self.state
            .borrow()
            .servers
            .get(&id)
            .and_then(|e| e.conf.get(key).cloned())
    }

    fn record(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }

    fn handle(&self, id: i32) -> Box<dyn Server> {
        Box::new(FakeServer {
            state: Rc::clone(&self.state),
            id,
        })
    }
}

impl Meta for FakeMeta {
    fn default_conf(&self) -> Result<ConfMap> {
        self.record("getDefaultConf".into());
        Ok(self.state.borrow().defaults.clone())
    }

    fn all_servers(&self) -> Result<Vec<Box<dyn Server>>> {
        self.record("getAllServers".into());
        let ids: Vec<i32> = self.state.borrow().servers.keys().copied().collect();
        Ok(ids.into_iter().map(|id| self.handle(id)).collect())
    }

    fn server(&self, id: i32) -> Result<Option<Box<dyn Server>>> {
        self.record(format!("getServer({id})"));
        Ok(self.has_server(id).then(|| self.handle(id)))
    }

    fn new_server(&self) -> Result<Box<dyn Server>> {
        let id = {
            let mut state = self.state.borrow_mut();
            state.calls.push("newServer".into());
            state.mutations.push("newServer".into());
            let id = state.servers.keys().next_back().map_or(1, |last| last + 1);
            state.servers.insert(id, Entry::default());
            id
        };
        Ok(self.handle(id))
    }
}

struct FakeServer {
    state: Rc<RefCell<State>>,
    id: i32,
}

impl FakeServer {
    fn record_call(&self, op: &str) {
        self.state
            .borrow_mut()
            .calls
            .push(format!("s/{}.{op}", self.id));
    }

    fn mutate(&self, op: &str, apply: impl FnOnce(&mut Entry)) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let call = format!("s/{}.{op}", self.id);
        state.calls.push(call.clone());
        apply(state.entry(self.id)?);
        state.mutations.push(call);
        Ok(())
    }
}

impl Server for FakeServer {
    fn id(&self) -> Result<i32> {
        Ok(self.id)
    }

    fn is_running(&self) -> Result<bool> {
        Ok(self.state.borrow_mut().entry(self.id)?.running)
    }

    fn conf(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.borrow_mut().entry(self.id)?.conf.get(key).cloned())
    }

    fn all_conf(&self) -> Result<ConfMap> {
        Ok(self.state.borrow_mut().entry(self.id)?.conf.clone())
    }

    fn set_conf(&self, key: &str, value: &str) -> Result<()> {
        self.mutate("setConf", |e| {
            e.conf.insert(key.to_string(), value.to_string());
        })
    }

    fn set_superuser_password(&self, password: &str) -> Result<()> {
        self.mutate("setSuperuserPassword", |e| {
            e.password = Some(password.to_string());
        })
    }

    fn start(&self) -> Result<()> {
        let failure = self.state.borrow().start_failure.clone();
        if let Some(message) = failure {
            self.record_call("start");
            bail!("{message}");
        }
        self.mutate("start", |e| e.running = true)
    }

    fn stop(&self) -> Result<()> {
        self.mutate("stop", |e| e.running = false)
    }

    fn delete(&self) -> Result<()> {
        self.mutate("delete", |_| {})?;
        self.state.borrow_mut().servers.remove(&self.id);
        Ok(())
    }
}

/// Connector handing out connections to one shared `FakeMeta`.
#[derive(Debug, Default)]
pub struct FakeConnector {
    pub meta: FakeMeta,
    refuse: Option<String>,
    destroys: Rc<Cell<usize>>,
    proxies: RefCell<Vec<String>>,
}

impl FakeConnector {
    pub fn new(meta: FakeMeta) -> Self {
        Self {
            meta,
            ..Self::default()
        }
    }

    pub fn refusing(message: &str) -> Self {
        Self {
            refuse: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// How many times a connection was torn down.
    pub fn destroys(&self) -> usize {
        self.destroys.get()
    }

    pub fn proxies(&self) -> Vec<String> {
        self.proxies.borrow().clone()
    }
}

impl Connector for FakeConnector {
    fn connect(&self, proxy: &str) -> Result<Box<dyn Connection>> {
        self.proxies.borrow_mut().push(proxy.to_string());
        if let Some(message) = &self.refuse {
            bail!("{message}");
        }
        Ok(Box::new(FakeConnection {
            meta: self.meta.clone(),
            destroys: Rc::clone(&self.destroys),
        }))
    }
}

struct FakeConnection {
    meta: FakeMeta,
    destroys: Rc<Cell<usize>>,
}

impl Connection for FakeConnection {
    fn meta(&self) -> &dyn Meta {
        &self.meta
    }

    fn destroy(&mut self) -> Result<()> {
        self.destroys.set(self.destroys.get() + 1);
        Ok(())
    }
}
