use anyhow::{Context, Result};
use dialoguer::FuzzySelect;
use dialoguer::theme::ColorfulTheme;

use crate::tunnel::Tunnel;

/// Show a fuzzy picker and return the selected item's index.
pub fn pick(prompt: &str, items: &[String]) -> Result<usize> {
    if items.is_empty() {
        anyhow::bail!("no tunnels available");
    }

    FuzzySelect::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(items)
        .interact()
        .context("selection cancelled")
}

/// Pick among `indices` of `tunnels` and return the chosen document index.
pub fn pick_tunnel(prompt: &str, tunnels: &[Tunnel], indices: &[usize]) -> Result<usize> {
    let items: Vec<String> = indices.iter().map(|&i| tunnels[i].label()).collect();
    let idx = pick(prompt, &items)?;
    Ok(indices[idx])
}
