use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

use crate::api::ConfigApi;
use crate::config::Config;
use crate::confirm::{self, Confirmation, SwitchChoice};
use crate::display;
use crate::editor::{EditorState, Selection};
use crate::health;
use crate::picker;
use crate::tags::TagInput;
use crate::validate::{self, Field};
use crate::view::{SortKey, StatusFilter, ViewQuery};

// ─── Field prompts ───────────────────────────────────────────

/// Prompt for one field of the selected tunnel, prefilled with its current value.
pub fn prompt_field(state: &mut EditorState, field: Field) -> Result<()> {
    let Some(tunnel) = state.selected_tunnel() else {
        bail!("no tunnel selected");
    };
    let theme = ColorfulTheme::default();

    match field {
        Field::Enabled => {
            let enabled = Confirm::with_theme(&theme)
                .with_prompt("enabled")
                .default(tunnel.enabled)
                .interact()
                .context("failed to read input")?;
            state.set_field(field, if enabled { "true" } else { "false" })
        }
        Field::Tags => {
            let mut input = TagInput::from_tags(&tunnel.tags);
            let raw: String = Input::with_theme(&theme)
                .with_prompt("tags (comma separated)")
                .with_initial_text(input.text())
                .allow_empty(true)
                .interact_text()
                .context("failed to read input")?;
            input.input(&raw);
            input.blur();
            state.set_tags(input.tags())?;
            println!("  {} {}", "tags:".dimmed(), input.text());
            Ok(())
        }
        _ => {
            let raw: String = Input::with_theme(&theme)
                .with_prompt(field.key())
                .with_initial_text(display::field_text(tunnel, field))
                .allow_empty(true)
                .interact_text()
                .context("failed to read input")?;
            state.set_field(field, &raw)
        }
    }
}

/// Walk every field of the selected tunnel in order.
pub fn prompt_all_fields(state: &mut EditorState) -> Result<()> {
    for field in Field::ALL {
        prompt_field(state, field)?;
    }
    Ok(())
}

// ─── Interactive session ─────────────────────────────────────

#[derive(Clone, Copy)]
enum Action {
    Select,
    Edit,
    Add,
    Remove,
    Save,
    View,
    CheckPort,
    Import,
    Export,
    Reload,
    Health,
    Quit,
}

const ACTIONS: [(Action, &str); 12] = [
    (Action::Select, "Select tunnel"),
    (Action::Edit, "Edit field"),
    (Action::Add, "Add tunnel"),
    (Action::Remove, "Remove tunnel"),
    (Action::Save, "Save"),
    (Action::View, "Search / filter / sort"),
    (Action::CheckPort, "Check port"),
    (Action::Import, "Import JSON"),
    (Action::Export, "Export JSON"),
    (Action::Reload, "Reload from server"),
    (Action::Health, "Check API health"),
    (Action::Quit, "Quit"),
];

/// Run the menu-driven editor until the user quits.
pub fn run(api: &dyn ConfigApi, cfg: &Config) -> Result<()> {
    let mut state = EditorState::new();
    let mut query = ViewQuery::default();
    let mut poller = health::Poller::new(cfg.health_interval());

    poller.tick(&mut state, api, Instant::now());
    state.load(api);

    loop {
        poller.tick(&mut state, api, Instant::now());
        render(&state, &query);
        state.message = None;
        state.error = None;

        let labels: Vec<&str> = ACTIONS.iter().map(|(_, label)| *label).collect();
        let choice = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Action")
            .items(&labels)
            .default(0)
            .interact()
            .context("failed to read selection")?;

        let result = match ACTIONS[choice].0 {
            Action::Select => select_tunnel(&mut state, api, &query),
            Action::Edit => edit_field(&mut state),
            Action::Add => {
                state.add_tunnel();
                prompt_all_fields(&mut state)
            }
            Action::Remove => remove(&mut state, api),
            Action::Save => save(&mut state, api),
            Action::View => adjust_view(&mut query),
            Action::CheckPort => check_port(&mut state, api),
            Action::Import => import(&mut state),
            Action::Export => export(&mut state, cfg),
            Action::Reload => reload(&mut state, api),
            Action::Health => {
                state.check_health(api);
                Ok(())
            }
            Action::Quit => {
                if !state.pending_save || confirm_discard("Quit without saving?")? {
                    return Ok(());
                }
                Ok(())
            }
        };

        if let Err(e) = result {
            log::debug!("action failed: {:#}", e);
            state.error = Some(format!("{:#}", e));
        }
    }
}

fn render(state: &EditorState, query: &ViewQuery) {
    println!();
    let dirty = if state.pending_save {
        format!("  {}", "unsaved changes".yellow())
    } else {
        String::new()
    };
    println!("  {}  API {}{}", "tunconf".bold(), health::render(state.health), dirty);

    let indices = state.visible(query);
    display::print_tunnel_list(state, &indices);
    display::print_summary(state, indices.len());
    if !query.search.trim().is_empty() || query.filter != StatusFilter::All {
        println!(
            "  {}",
            format!("filter: {:?}, search: '{}'", query.filter, query.search.trim()).dimmed()
        );
    }
    for line in state.duplicates().describe() {
        println!("  {} {}", "⚠".yellow(), line.yellow());
    }
    println!();
    display::print_details(state);
    if let Some(ref check) = state.port_check {
        display::print_port_check(check);
    }
    println!();
    display::print_status(state);
}

fn select_tunnel(state: &mut EditorState, api: &dyn ConfigApi, query: &ViewQuery) -> Result<()> {
    let indices = state.visible(query);
    let target = picker::pick_tunnel("Select tunnel", state.tunnels(), &indices)?;
    if let Selection::Pending(pending) = state.select(target) {
        log::debug!("switch to #{} waits for unsaved changes", pending);
        resolve_switch(state, api)?;
    }
    Ok(())
}

/// Keep asking until the pending switch is saved, discarded or abandoned.
fn resolve_switch(state: &mut EditorState, api: &dyn ConfigApi) -> Result<()> {
    while state.pending_switch.is_some() {
        match confirm::ask_switch(&state.save_blockers())? {
            SwitchChoice::Save => {
                if !state.switch_saving(api) {
                    if let Some(err) = state.error.take() {
                        println!("{} {}", "✗".red(), err.red());
                    }
                }
            }
            SwitchChoice::Discard => {
                state.switch_discarding();
            }
            SwitchChoice::Stay => state.cancel_switch(),
        }
    }
    Ok(())
}

fn edit_field(state: &mut EditorState) -> Result<()> {
    let Some(tunnel) = state.selected_tunnel() else {
        bail!("no tunnel selected");
    };
    let items: Vec<String> = Field::ALL
        .iter()
        .map(|&f| format!("{:<10} {}", f.key(), display::field_text(tunnel, f)))
        .collect();
    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Field")
        .items(&items)
        .default(0)
        .interact()
        .context("failed to read selection")?;
    prompt_field(state, Field::ALL[idx])
}

fn remove(state: &mut EditorState, api: &dyn ConfigApi) -> Result<()> {
    let Some(tunnel) = state.selected_tunnel() else {
        bail!("no tunnel selected");
    };
    println!("{} {}", "Will remove:".dimmed(), tunnel.label());
    if confirm::ask(Confirmation::RemoveTunnel)? {
        state.remove_selected(api);
    }
    Ok(())
}

fn save(state: &mut EditorState, api: &dyn ConfigApi) -> Result<()> {
    if !state.pending_save {
        state.message = Some("nothing to save".to_string());
        return Ok(());
    }
    if !state.can_save() {
        bail!(state.save_blockers().join("; "));
    }
    state.save(api, None);
    Ok(())
}

fn adjust_view(query: &mut ViewQuery) -> Result<()> {
    let theme = ColorfulTheme::default();
    query.search = Input::with_theme(&theme)
        .with_prompt("search")
        .with_initial_text(query.search.clone())
        .allow_empty(true)
        .interact_text()
        .context("failed to read input")?;

    let filters = [StatusFilter::All, StatusFilter::Active, StatusFilter::Inactive];
    let idx = Select::with_theme(&theme)
        .with_prompt("show")
        .items(&["all", "active only", "inactive only"])
        .default(filters.iter().position(|f| *f == query.filter).unwrap_or(0))
        .interact()
        .context("failed to read selection")?;
    query.filter = filters[idx];

    let sorts = [
        (SortKey::Name, "name (A-Z)"),
        (SortKey::NameDesc, "name (Z-A)"),
        (SortKey::LocalPort, "local port (low-high)"),
        (SortKey::LocalPortDesc, "local port (high-low)"),
        (SortKey::DestHost, "destination (A-Z)"),
        (SortKey::DestHostDesc, "destination (Z-A)"),
    ];
    let labels: Vec<&str> = sorts.iter().map(|(_, l)| *l).collect();
    let idx = Select::with_theme(&theme)
        .with_prompt("sort by")
        .items(&labels)
        .default(sorts.iter().position(|(k, _)| *k == query.sort).unwrap_or(0))
        .interact()
        .context("failed to read selection")?;
    query.sort = sorts[idx].0;
    Ok(())
}

fn check_port(state: &mut EditorState, api: &dyn ConfigApi) -> Result<()> {
    let raw: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("port")
        .interact_text()
        .context("failed to read input")?;
    state.check_port(api, validate::to_number(&raw));
    Ok(())
}

fn import(state: &mut EditorState) -> Result<()> {
    let path: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("JSON file")
        .interact_text()
        .context("failed to read input")?;
    let text = fs::read_to_string(path.trim())
        .with_context(|| format!("failed to read {}", path.trim()))?;
    if confirm::ask(Confirmation::OverwriteImport)? {
        state.import(&text)?;
    }
    Ok(())
}

fn export(state: &mut EditorState, cfg: &Config) -> Result<()> {
    let path: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("export to")
        .with_initial_text(cfg.export_file.clone())
        .interact_text()
        .context("failed to read input")?;
    state.export(Path::new(path.trim()))
}

fn reload(state: &mut EditorState, api: &dyn ConfigApi) -> Result<()> {
    if state.pending_save && !confirm_discard("Discard unsaved changes and reload?")? {
        return Ok(());
    }
    state.load(api);
    Ok(())
}

fn confirm_discard(prompt: &str) -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("failed to read confirmation")
}
