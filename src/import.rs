use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

use crate::tunnel::{ConfigDocument, Tunnel};
use crate::validate::{self, find_duplicates, is_ip_valid, is_port_valid};

const REQUIRED: [&str; 6] = [
    "name",
    "local_port",
    "dest_host",
    "dest_port",
    "ssh_user",
    "ssh_host",
];

/// Integer ports, or numeric strings. Anything else is not a port.
fn port_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => validate::parse_port(s),
        _ => None,
    }
}

fn required_port(entry: &Map<String, Value>, idx: usize, key: &str) -> Result<i64> {
    match entry.get(key).and_then(port_value) {
        Some(port) if is_port_valid(port) => Ok(port),
        _ => bail!("tunnel #{} invalid {}.", idx, key),
    }
}

fn string_field<'a>(entry: &'a Map<String, Value>, idx: usize, key: &str) -> Result<&'a str> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .with_context(|| format!("tunnel #{} invalid {}.", idx, key))
}

fn host_field(entry: &Map<String, Value>, idx: usize, key: &str) -> Result<String> {
    match entry.get(key).and_then(Value::as_str) {
        Some(host) if is_ip_valid(host) => Ok(host.to_string()),
        _ => bail!("tunnel #{} invalid {} (IPv4 address required).", idx, key),
    }
}

fn parse_entry(idx: usize, value: &Value) -> Result<Tunnel> {
    let Some(entry) = value.as_object() else {
        bail!("tunnel #{} is not an object.", idx);
    };

    let missing: Vec<&str> = REQUIRED
        .iter()
        .copied()
        .filter(|key| !entry.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        bail!("tunnel #{} missing fields: {}.", idx, missing.join(", "));
    }

    let local_port = required_port(entry, idx, "local_port")?;
    let dest_port = required_port(entry, idx, "dest_port")?;

    let ssh_port = match entry.get("ssh_port") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => match port_value(v) {
            Some(port) if is_port_valid(port) => Some(port),
            _ => bail!("tunnel #{} invalid ssh_port.", idx),
        },
    };

    let dest_host = host_field(entry, idx, "dest_host")?;
    let ssh_host = host_field(entry, idx, "ssh_host")?;
    let name = string_field(entry, idx, "name")?.to_string();
    let ssh_user = string_field(entry, idx, "ssh_user")?.to_string();

    let enabled = match entry.get("enabled") {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => *b,
        Some(_) => bail!("tunnel #{} invalid enabled.", idx),
    };

    let tags = match entry.get("tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|tag| tag.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .with_context(|| format!("tunnel #{} invalid tags.", idx))?,
        Some(_) => bail!("tunnel #{} invalid tags.", idx),
    };

    let extra: Map<String, Value> = entry
        .iter()
        .filter(|(key, _)| {
            !matches!(
                key.as_str(),
                "name"
                    | "tags"
                    | "enabled"
                    | "local_port"
                    | "dest_host"
                    | "dest_port"
                    | "ssh_user"
                    | "ssh_host"
                    | "ssh_port"
            )
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(Tunnel {
        name,
        tags,
        enabled,
        local_port,
        dest_host,
        dest_port,
        ssh_user,
        ssh_host,
        ssh_port,
        extra,
    })
}

/// Parse and validate a pasted document. The first problem aborts the whole
/// import; nothing is merged with existing state.
pub fn parse_import(text: &str) -> Result<ConfigDocument> {
    let parsed: Value =
        serde_json::from_str(text).map_err(|e| anyhow::anyhow!("invalid JSON: {}", e))?;

    let Value::Object(mut root) = parsed else {
        bail!("invalid JSON: expected an object.");
    };

    let entries = match root.remove("tunnels") {
        Some(Value::Array(entries)) => entries,
        _ => bail!("field 'tunnels' must be a list."),
    };

    let tunnels = entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| parse_entry(idx, entry))
        .collect::<Result<Vec<_>>>()?;

    let dups = find_duplicates(&tunnels);
    if let Some(first) = dups.describe().into_iter().next() {
        bail!(first);
    }

    Ok(ConfigDocument {
        tunnels,
        extra: root,
    })
}
