/*!
Interface description loading.

The description names the remote types and operations the proxies invoke:

```yaml
module: Murmur
meta_identity: Meta
server_category: s
encoding: "1.0"
operations:
  getServer: getServer
  start: start
```

Every field is optional; omitted fields keep the built-in values. Files
ending in `.yaml` / `.yml` are read as YAML, anything else as JSON.
*/

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_INTERFACE_FILE: &str = "Murmur.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterfaceDescription {
    pub module: String,
    pub meta_identity: String,
    pub server_category: String,
    pub encoding: String,
    pub operations: Operations,
}

/// Remote operation names, keyed by the capability they back.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Operations {
    pub is_a: String,
    pub get_default_conf: String,
    pub get_all_servers: String,
    pub get_server: String,
    pub new_server: String,
    pub id: String,
    pub is_running: String,
    pub get_conf: String,
    pub get_all_conf: String,
    pub set_conf: String,
    pub set_superuser_password: String,
    pub start: String,
    pub stop: String,
    pub delete: String,
}

impl Default for Operations {
    fn default() -> Self {
        Self {
            is_a: "ice_isA".into(),
            get_default_conf: "getDefaultConf".into(),
            get_all_servers: "getAllServers".into(),
            get_server: "getServer".into(),
            new_server: "newServer".into(),
            id: "id".into(),
            is_running: "isRunning".into(),
            get_conf: "getConf".into(),
            get_all_conf: "getAllConf".into(),
            set_conf: "setConf".into(),
            set_superuser_password: "setSuperuserPassword".into(),
            start: "start".into(),
            stop: "stop".into(),
            delete: "delete".into(),
        }
    }
}

impl Operations {
    fn entries(&self) -> [(&'static str, &str); 14] {
        [
            ("isA", &self.is_a),
            ("getDefaultConf", &self.get_default_conf),
            ("getAllServers", &self.get_all_servers),
            ("getServer", &self.get_server),
            ("newServer", &self.new_server),
            ("id", &self.id),
            ("isRunning", &self.is_running),
            ("getConf", &self.get_conf),
            ("getAllConf", &self.get_all_conf),
            ("setConf", &self.set_conf),
            ("setSuperuserPassword", &self.set_superuser_password),
            ("start", &self.start),
            ("stop", &self.stop),
            ("delete", &self.delete),
        ]
    }
}

impl Default for InterfaceDescription {
    fn default() -> Self {
        Self {
            module: "Murmur".into(),
            meta_identity: "Meta".into(),
            server_category: "s".into(),
            encoding: "1.0".into(),
            operations: Operations::default(),
        }
    }
}

impl InterfaceDescription {
    /// Load the description from `path`, or from [`DEFAULT_INTERFACE_FILE`] in
    /// the working directory when `path` is `None`. A missing default file is
    /// not an error; a missing explicit file is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::load_file(p);
        }
        let default = default_path()?;
        if default.is_file() {
            Self::load_file(&default)
        } else {
            crate::log_debug!(
                "no interface description at {}; using built-in",
                default.display()
            );
            Ok(Self::default())
        }
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read interface description: {}", path.display()))?;
        let desc = Self::parse(&raw, is_yaml(path))
            .with_context(|| format!("invalid interface description: {}", path.display()))?;
        crate::log_info!(
            "using interface description {} (module {})",
            path.display(),
            desc.module
        );
        Ok(desc)
    }

    fn parse(raw: &str, yaml: bool) -> Result<Self> {
        let desc: Self = if yaml {
            serde_yaml::from_str(raw).context("failed to parse YAML")?
        } else {
            serde_json::from_str(raw).context("failed to parse JSON")?
        };
        desc.validate()?;
        Ok(desc)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("module", &self.module),
            ("meta_identity", &self.meta_identity),
            ("server_category", &self.server_category),
        ] {
            if value.trim().is_empty() {
                bail!("{field} must not be empty");
            }
        }
        if self.server_category.contains('/') {
            bail!("server_category must not contain '/'");
        }
        if self
            .meta_identity
            .chars()
            .any(|c| c == ':' || c.is_whitespace())
        {
            bail!(
                "meta_identity must not contain ':' or whitespace, got '{}'",
                self.meta_identity
            );
        }
        let version_ok = self
            .encoding
            .split_once('.')
            .is_some_and(|(major, minor)| {
                !major.is_empty()
                    && !minor.is_empty()
                    && major.chars().all(|c| c.is_ascii_digit())
                    && minor.chars().all(|c| c.is_ascii_digit())
            });
        if !version_ok {
            bail!("encoding must look like <major>.<minor>, got '{}'", self.encoding);
        }
        for (name, remote) in self.operations.entries() {
            if remote.trim().is_empty() {
                bail!("operation {name} has an empty remote name");
            }
        }
        Ok(())
    }

    /// Type id checked against the meta object on connect.
    pub fn meta_type_id(&self) -> String {
        format!("::{}::Meta", self.module)
    }

    pub fn server_identity(&self, id: i32) -> String {
        format!("{}/{}", self.server_category, id)
    }
}

fn default_path() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("failed to determine working directory")?;
    Ok(cwd.join(DEFAULT_INTERFACE_FILE))
}

fn is_yaml(path: &Path) -> bool {
    let lower = path.to_string_lossy().to_ascii_lowercase();
    lower.ends_with(".yaml") || lower.ends_with(".yml")
}
