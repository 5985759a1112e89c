use std::cmp::Ordering;

use clap::ValueEnum;

use crate::tunnel::Tunnel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    #[default]
    Name,
    NameDesc,
    LocalPort,
    LocalPortDesc,
    DestHost,
    DestHostDesc,
}

impl SortKey {
    pub fn compare(self, a: &Tunnel, b: &Tunnel) -> Ordering {
        match self {
            SortKey::Name => text_cmp(&a.name, &b.name),
            SortKey::NameDesc => text_cmp(&b.name, &a.name),
            SortKey::LocalPort => a.local_port.cmp(&b.local_port),
            SortKey::LocalPortDesc => b.local_port.cmp(&a.local_port),
            SortKey::DestHost => text_cmp(&a.dest_host, &b.dest_host),
            SortKey::DestHostDesc => text_cmp(&b.dest_host, &a.dest_host),
        }
    }
}

/// Case-insensitive order; case only breaks ties.
fn text_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewQuery {
    pub filter: StatusFilter,
    pub search: String,
    pub sort: SortKey,
}

impl ViewQuery {
    pub fn matches(&self, tunnel: &Tunnel) -> bool {
        match self.filter {
            StatusFilter::Active if !tunnel.enabled => return false,
            StatusFilter::Inactive if tunnel.enabled => return false,
            _ => {}
        }

        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        let tags = tunnel
            .tags
            .iter()
            .map(|t| t.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        [
            tunnel.name.to_lowercase(),
            tunnel.dest_host.to_lowercase(),
            tunnel.ssh_host.to_lowercase(),
            tunnel.ssh_user.to_lowercase(),
            tunnel.local_port.to_string(),
            tags,
        ]
        .iter()
        .any(|haystack| haystack.contains(&needle))
    }
}

/// Indices into `tunnels` that pass the query, in display order.
/// The slice itself is never reordered.
pub fn visible_indices(tunnels: &[Tunnel], query: &ViewQuery) -> Vec<usize> {
    let mut indices: Vec<usize> = tunnels
        .iter()
        .enumerate()
        .filter(|(_, t)| query.matches(t))
        .map(|(i, _)| i)
        .collect();
    indices.sort_by(|&a, &b| query.sort.compare(&tunnels[a], &tunnels[b]));
    indices
}

pub fn active_count(tunnels: &[Tunnel]) -> usize {
    tunnels.iter().filter(|t| t.enabled).count()
}
