use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Select};

/// Gates in front of destructive actions. None of them default to "yes".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    RemoveTunnel,
    OverwriteImport,
    SwitchWhileDirty,
}

impl Confirmation {
    pub fn title(self) -> &'static str {
        match self {
            Confirmation::RemoveTunnel => "Remove tunnel",
            Confirmation::OverwriteImport => "Confirm import",
            Confirmation::SwitchWhileDirty => "Unsaved changes",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Confirmation::RemoveTunnel => {
                "The configuration is saved right away and this cannot be undone. Remove this tunnel?"
            }
            Confirmation::OverwriteImport => {
                "This replaces the whole current configuration. Continue?"
            }
            Confirmation::SwitchWhileDirty => {
                "There are unsaved changes. Save them before switching, or discard every unsaved edit?"
            }
        }
    }
}

/// Yes/no prompt for `gate`, defaulting to no.
pub fn ask(gate: Confirmation) -> Result<bool> {
    println!("{}", gate.title().bold());
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(gate.description())
        .default(false)
        .interact()
        .context("failed to read confirmation")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchChoice {
    Save,
    Discard,
    Stay,
}

/// Three-way prompt used when switching records with unsaved edits.
/// `blockers` are shown so the user knows why saving would be refused.
pub fn ask_switch(blockers: &[String]) -> Result<SwitchChoice> {
    let gate = Confirmation::SwitchWhileDirty;
    println!("{}", gate.title().bold());
    for reason in blockers {
        println!("  {} {}", "✗".red(), reason.red());
    }
    let items = ["Save changes and switch", "Discard all changes and switch", "Stay here"];
    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(gate.description())
        .items(&items)
        .default(2)
        .interact()
        .context("failed to read selection")?;
    Ok(match idx {
        0 => SwitchChoice::Save,
        1 => SwitchChoice::Discard,
        _ => SwitchChoice::Stay,
    })
}
