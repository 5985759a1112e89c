use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::tunnel::Tunnel;

/// Editable fields of a tunnel, named after their JSON keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Tags,
    Enabled,
    LocalPort,
    DestHost,
    DestPort,
    SshUser,
    SshHost,
    SshPort,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Name,
        Field::Tags,
        Field::Enabled,
        Field::LocalPort,
        Field::DestHost,
        Field::DestPort,
        Field::SshUser,
        Field::SshHost,
        Field::SshPort,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Tags => "tags",
            Field::Enabled => "enabled",
            Field::LocalPort => "local_port",
            Field::DestHost => "dest_host",
            Field::DestPort => "dest_port",
            Field::SshUser => "ssh_user",
            Field::SshHost => "ssh_host",
            Field::SshPort => "ssh_port",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Field {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Field::ALL
            .into_iter()
            .find(|f| f.key() == key)
            .ok_or_else(|| anyhow::anyhow!("unknown field '{}'", s.trim()))
    }
}

/// Port range check: 1..=65535.
pub fn is_port_valid(port: i64) -> bool {
    (1..=65535).contains(&port)
}

/// Dotted-quad IPv4: exactly four parts of 1-3 digits, each 0-255.
/// Surrounding whitespace is ignored.
pub fn is_ip_valid(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() != 4 {
        return false;
    }
    parts.iter().all(|part| {
        (1..=3).contains(&part.len())
            && part.bytes().all(|b| b.is_ascii_digit())
            && part.parse::<u16>().is_ok_and(|n| n <= 255)
    })
}

/// Lenient numeric conversion for port inputs: empty or non-numeric text is 0.
pub fn to_number(raw: &str) -> i64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }
    raw.parse::<i64>().unwrap_or(0)
}

/// Parse a port typed by the user, rejecting anything that is not an integer.
pub fn parse_port(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Per-field errors of one record. Every field is checked independently.
pub fn field_errors(tunnel: &Tunnel) -> BTreeMap<Field, String> {
    let mut errors = BTreeMap::new();

    if is_blank(&tunnel.name) {
        errors.insert(Field::Name, "name is required".to_string());
    }

    if is_blank(&tunnel.dest_host) {
        errors.insert(Field::DestHost, "destination host is required".to_string());
    } else if !is_ip_valid(&tunnel.dest_host) {
        errors.insert(
            Field::DestHost,
            "destination host must be a valid IPv4 address".to_string(),
        );
    }

    if !is_port_valid(tunnel.local_port) {
        errors.insert(Field::LocalPort, "invalid local port".to_string());
    }
    if !is_port_valid(tunnel.dest_port) {
        errors.insert(Field::DestPort, "invalid destination port".to_string());
    }

    if is_blank(&tunnel.ssh_user) {
        errors.insert(Field::SshUser, "SSH user is required".to_string());
    }

    if is_blank(&tunnel.ssh_host) {
        errors.insert(Field::SshHost, "SSH host is required".to_string());
    } else if !is_ip_valid(&tunnel.ssh_host) {
        errors.insert(
            Field::SshHost,
            "SSH host must be a valid IPv4 address".to_string(),
        );
    }

    if let Some(port) = tunnel.ssh_port {
        if !is_port_valid(port) {
            errors.insert(Field::SshPort, "invalid SSH port".to_string());
        }
    }

    errors
}

/// Values that occur more than once across a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Duplicates {
    pub ports: BTreeSet<i64>,
    pub names: BTreeSet<String>,
}

impl Duplicates {
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty() && self.names.is_empty()
    }

    pub fn has_port(&self, port: i64) -> bool {
        self.ports.contains(&port)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.contains(name.trim())
    }

    /// Human-readable summary, e.g. `duplicate local_port: 2222, 8080.`
    pub fn describe(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.ports.is_empty() {
            let ports: Vec<String> = self.ports.iter().map(|p| p.to_string()).collect();
            out.push(format!("duplicate local_port: {}.", ports.join(", ")));
        }
        if !self.names.is_empty() {
            let names: Vec<&str> = self.names.iter().map(String::as_str).collect();
            out.push(format!("duplicate name: {}.", names.join(", ")));
        }
        out
    }
}

/// Local ports (0 excluded) and trimmed names (empty excluded) seen more than once.
pub fn find_duplicates(tunnels: &[Tunnel]) -> Duplicates {
    let mut port_counts: HashMap<i64, usize> = HashMap::new();
    let mut name_counts: HashMap<&str, usize> = HashMap::new();

    for t in tunnels {
        if t.local_port != 0 {
            *port_counts.entry(t.local_port).or_default() += 1;
        }
        let name = t.name.trim();
        if !name.is_empty() {
            *name_counts.entry(name).or_default() += 1;
        }
    }

    Duplicates {
        ports: port_counts
            .into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(p, _)| p)
            .collect(),
        names: name_counts
            .into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(name, _)| name.to_string())
            .collect(),
    }
}
