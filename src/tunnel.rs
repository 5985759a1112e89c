use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single SSH forward: local_port -> dest_host:dest_port via ssh_user@ssh_host:ssh_port.
///
/// Ports are kept as plain integers so values typed while editing (0, 70000, ...)
/// survive until validation reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tunnel {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub local_port: i64,
    #[serde(default)]
    pub dest_host: String,
    #[serde(default)]
    pub dest_port: i64,
    #[serde(default)]
    pub ssh_user: String,
    #[serde(default)]
    pub ssh_host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_port: Option<i64>,
    /// Keys this editor does not know about, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

impl Tunnel {
    /// Blank record used by "add".
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            tags: Vec::new(),
            enabled: true,
            local_port: 0,
            dest_host: String::new(),
            dest_port: 0,
            ssh_user: String::new(),
            ssh_host: String::new(),
            ssh_port: Some(22),
            extra: Map::new(),
        }
    }

    /// Display label used by pickers: `name (2222 → 10.0.0.5:80)`.
    pub fn label(&self) -> String {
        let name = if self.name.trim().is_empty() {
            "<unnamed>"
        } else {
            self.name.as_str()
        };
        format!("{} ({})", name, self.forward())
    }

    pub fn forward(&self) -> String {
        format!("{} → {}:{}", self.local_port, self.dest_host, self.dest_port)
    }

    pub fn endpoint(&self) -> String {
        match self.ssh_port {
            Some(port) => format!("{}@{}:{}", self.ssh_user, self.ssh_host, port),
            None => format!("{}@{}", self.ssh_user, self.ssh_host),
        }
    }
}

/// The whole persisted document. Saved and loaded as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub tunnels: Vec<Tunnel>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigDocument {
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.tunnels.iter().position(|t| t.name.trim() == name)
    }
}
