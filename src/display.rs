use colored::Colorize;
use console::Alignment;

use crate::editor::{EditorState, PortCheck, PortStatus};
use crate::tags::format_tags;
use crate::tunnel::Tunnel;
use crate::validate::Field;

/// Text shown (and offered for editing) for one field.
pub fn field_text(t: &Tunnel, field: Field) -> String {
    match field {
        Field::Name => t.name.clone(),
        Field::Tags => format_tags(&t.tags),
        Field::Enabled => t.enabled.to_string(),
        Field::LocalPort => t.local_port.to_string(),
        Field::DestHost => t.dest_host.clone(),
        Field::DestPort => t.dest_port.to_string(),
        Field::SshUser => t.ssh_user.clone(),
        Field::SshHost => t.ssh_host.clone(),
        Field::SshPort => t.ssh_port.map(|p| p.to_string()).unwrap_or_default(),
    }
}

/// Print the visible rows of the document. `indices` come from the current
/// view and always refer to positions in the document.
pub fn print_tunnel_list(state: &EditorState, indices: &[usize]) {
    let tunnels = state.tunnels();
    if tunnels.is_empty() {
        println!("{}", "No tunnels configured.".yellow());
        println!("Run `tunconf add` or `tunconf import <file>` to get started.");
        return;
    }
    if indices.is_empty() {
        println!("{}", "No tunnels match the current filter.".yellow());
        return;
    }

    let dups = state.duplicates();
    let rows: Vec<Row> = indices
        .iter()
        .map(|&i| {
            let t = &tunnels[i];
            Row {
                index: i,
                name: if t.name.trim().is_empty() {
                    "<unnamed>".to_string()
                } else {
                    t.name.clone()
                },
                enabled: t.enabled,
                port: t.local_port.to_string(),
                dest: format!("{}:{}", t.dest_host, t.dest_port),
                via: t.endpoint(),
                tags: format_tags(&t.tags),
                dup_name: dups.has_name(&t.name),
                dup_port: dups.has_port(t.local_port),
            }
        })
        .collect();

    let w_name = column_width(rows.iter().map(|r| r.name.as_str()));
    let w_port = column_width(rows.iter().map(|r| r.port.as_str()));
    let w_dest = column_width(rows.iter().map(|r| r.dest.as_str()));

    for row in &rows {
        let cursor = if row.index == state.selected {
            "›".cyan().to_string()
        } else {
            " ".to_string()
        };
        let bullet = if row.enabled {
            "●".green().to_string()
        } else {
            "○".dimmed().to_string()
        };

        let name = if row.dup_name {
            row.name.red().bold().to_string()
        } else if row.enabled {
            row.name.bold().to_string()
        } else {
            row.name.dimmed().to_string()
        };
        let port = if row.dup_port {
            row.port.red().bold().to_string()
        } else {
            row.port.clone()
        };

        let mut suffix = String::new();
        if !row.tags.is_empty() {
            suffix.push_str(&format!("  {}", format!("[{}]", row.tags).dimmed()));
        }
        if row.dup_name || row.dup_port {
            suffix.push_str(&format!("  {}", "duplicate".red()));
        }

        println!(
            "{} {} {}  {} → {}  {}{}",
            cursor,
            bullet,
            pad(&name, w_name),
            pad(&port, w_port),
            pad(&row.dest, w_dest),
            row.via.dimmed(),
            suffix
        );
    }
}

pub fn print_summary(state: &EditorState, shown: usize) {
    println!(
        "  {} tunnels, {} active, {} inactive ({} shown)",
        state.tunnels().len(),
        state.active_count().to_string().green(),
        state.inactive_count().to_string().dimmed(),
        shown
    );
}

/// Print the selected record field by field, with errors under the field they belong to.
pub fn print_details(state: &EditorState) {
    let Some(t) = state.selected_tunnel() else {
        println!("{}", "No tunnel selected.".yellow());
        return;
    };
    let errors = state.field_errors();
    let dups = state.duplicates();

    let header = if state.pending_save {
        format!("#{} {}", state.selected, "(unsaved changes)".yellow())
    } else {
        format!("#{}", state.selected)
    };
    println!("  {}", header.bold());

    for field in Field::ALL {
        let value = field_text(t, field);
        println!("  {}  {}", pad(&field.key().dimmed().to_string(), 10), value);

        if let Some(err) = errors.get(&field) {
            println!("  {}  {} {}", pad("", 10), "✗".red(), err.red());
        }
        if field == Field::Name && dups.has_name(&t.name) {
            println!("  {}  {} {}", pad("", 10), "✗".red(), "name is used by another tunnel".red());
        }
        if field == Field::LocalPort && dups.has_port(t.local_port) {
            println!("  {}  {} {}", pad("", 10), "✗".red(), "port is used by another tunnel".red());
        }
    }
}

/// Print the message/error slots, if set.
pub fn print_status(state: &EditorState) {
    if let Some(ref msg) = state.message {
        println!("{} {}", "✓".green(), msg);
    }
    if let Some(ref err) = state.error {
        println!("{} {}", "✗".red(), err.red());
    }
}

pub fn print_port_check(result: &PortCheck) {
    let icon = match result.status {
        PortStatus::Ok => "✓".green(),
        PortStatus::Busy => "●".yellow(),
        PortStatus::Error => "✗".red(),
    };
    println!("{} {} {}", icon, format!(":{}", result.port).bold(), result.message);
}

/// Pad an ANSI-colored string to a visible width using console's awareness of escape codes.
fn pad(s: &str, width: usize) -> String {
    console::pad_str(s, width, Alignment::Left, None).to_string()
}

/// Widest visible cell, in terminal columns.
fn column_width<'a>(cells: impl Iterator<Item = &'a str>) -> usize {
    cells.map(console::measure_text_width).max().unwrap_or(0)
}

struct Row {
    index: usize,
    name: String,
    enabled: bool,
    port: String,
    dest: String,
    via: String,
    tags: String,
    dup_name: bool,
    dup_port: bool,
}
