mod api;
mod cli;
mod config;
mod confirm;
mod display;
mod editor;
mod health;
mod import;
mod picker;
mod session;
mod tags;
mod tunnel;
mod validate;
mod view;

use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::Colorize;

use api::{ApiClient, ConfigApi};
use cli::{Cli, Command};
use config::Config;
use confirm::Confirmation;
use editor::{EditorState, PortStatus};
use validate::Field;
use view::{SortKey, StatusFilter, ViewQuery};

fn main() -> Result<()> {
    clap_complete::CompleteEnv::with_factory(Cli::command).complete();

    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut cfg = Config::load();
    if let Some(server) = cli.server {
        cfg.server = server;
    }
    if let Some(api_base) = cli.api_base {
        cfg.api_base = api_base;
    }

    if cli.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Command::List {
            filter,
            search,
            sort,
        } => cmd_list(&cfg, filter, search, sort),
        Command::Show { name } => cmd_show(&cfg, name),
        Command::Add => cmd_add(&cfg),
        Command::Set { name, assignments } => cmd_set(&cfg, &name, &assignments),
        Command::Remove { name } => cmd_remove(&cfg, name),
        Command::Import { file } => cmd_import(&cfg, &file),
        Command::Export { output } => cmd_export(&cfg, output),
        Command::CheckPort { port } => cmd_check_port(&cfg, &port),
        Command::Health { watch } => cmd_health(&cfg, watch),
        Command::Edit => session::run(&connect(&cfg)?, &cfg),
        Command::Config => cmd_config(&cfg),
        Command::Completions { shell } => cmd_completions(shell, &cfg),
        Command::ListTunnelNames => cmd_list_tunnel_names(&cfg),
    }
}

fn connect(cfg: &Config) -> Result<ApiClient> {
    let url = cfg.api_url();
    log::debug!("using config API at {}", url);
    ApiClient::new(&url, cfg.request_timeout()).context("failed to build HTTP client")
}

/// Fetch the remote document into a fresh editor state.
fn load_state(api: &dyn ConfigApi) -> Result<EditorState> {
    let mut state = EditorState::new();
    if !state.load(api) {
        anyhow::bail!(
            "{}",
            state.error.unwrap_or_else(|| "failed to load configuration".to_string())
        );
    }
    Ok(state)
}

/// Turn a state operation's outcome into a printed message or an error.
fn finish(state: &EditorState, ok: bool) -> Result<()> {
    if !ok {
        anyhow::bail!(
            "{}",
            state.error.clone().unwrap_or_else(|| "operation failed".to_string())
        );
    }
    if let Some(ref msg) = state.message {
        println!("{} {}", "✓".green(), msg);
    }
    Ok(())
}

/// Resolve a tunnel by name, or let the user pick one.
fn resolve_tunnel(state: &EditorState, name: Option<&str>, prompt: &str) -> Result<usize> {
    match name {
        Some(n) => state
            .doc
            .find(n)
            .ok_or_else(|| anyhow::anyhow!("tunnel '{}' not found", n)),
        None => {
            let indices = state.visible(&ViewQuery::default());
            picker::pick_tunnel(prompt, state.tunnels(), &indices)
        }
    }
}

/// Refuse to save while anything would be rejected, listing why.
fn ensure_savable(state: &EditorState) -> Result<()> {
    let blockers = state.save_blockers();
    if blockers.is_empty() {
        return Ok(());
    }
    for line in state.duplicates().describe() {
        println!("  {} {}", "⚠".yellow(), line.yellow());
    }
    anyhow::bail!("not saved: {}", blockers.join("; "))
}

fn cmd_list(
    cfg: &Config,
    filter: StatusFilter,
    search: Option<String>,
    sort: SortKey,
) -> Result<()> {
    let api = connect(cfg)?;
    let state = load_state(&api)?;
    let query = ViewQuery {
        filter,
        search: search.unwrap_or_default(),
        sort,
    };
    let indices = state.visible(&query);
    display::print_tunnel_list(&state, &indices);
    if !state.tunnels().is_empty() {
        println!();
        display::print_summary(&state, indices.len());
        for line in state.duplicates().describe() {
            println!("  {} {}", "⚠".yellow(), line.yellow());
        }
    }
    Ok(())
}

fn cmd_show(cfg: &Config, name: Option<String>) -> Result<()> {
    let api = connect(cfg)?;
    let mut state = load_state(&api)?;
    if state.tunnels().is_empty() {
        println!("{}", "No tunnels configured.".yellow());
        return Ok(());
    }
    let idx = resolve_tunnel(&state, name.as_deref(), "Show tunnel")?;
    state.select(idx);
    display::print_details(&state);
    Ok(())
}

fn cmd_add(cfg: &Config) -> Result<()> {
    let api = connect(cfg)?;
    let mut state = load_state(&api)?;
    state.add_tunnel();

    println!("{}", "New tunnel".bold());
    session::prompt_all_fields(&mut state)?;
    loop {
        println!();
        display::print_details(&state);
        if state.save_blockers().is_empty() {
            break;
        }
        let retry = dialoguer::Confirm::new()
            .with_prompt("Fix the highlighted fields?")
            .default(true)
            .interact()
            .context("failed to read confirmation")?;
        if !retry {
            return ensure_savable(&state);
        }
        for (field, _) in state.field_errors() {
            session::prompt_field(&mut state, field)?;
        }
        if state.field_errors().is_empty() && !state.duplicates().is_empty() {
            session::prompt_field(&mut state, Field::Name)?;
            session::prompt_field(&mut state, Field::LocalPort)?;
        }
    }

    let confirmed = dialoguer::Confirm::new()
        .with_prompt("Save new tunnel?")
        .default(true)
        .interact()
        .context("failed to read confirmation")?;
    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    let ok = state.save(&api, None);
    finish(&state, ok)
}

fn cmd_set(cfg: &Config, name: &str, assignments: &[String]) -> Result<()> {
    let api = connect(cfg)?;
    let mut state = load_state(&api)?;
    let idx = resolve_tunnel(&state, Some(name), "")?;
    state.select(idx);

    for assignment in assignments {
        let (key, value) = assignment
            .split_once('=')
            .with_context(|| format!("expected FIELD=VALUE, got '{}'", assignment))?;
        let field: Field = key.parse()?;
        state
            .set_field(field, value)
            .with_context(|| format!("cannot set {}", field))?;
    }

    display::print_details(&state);
    ensure_savable(&state)?;
    let ok = state.save(&api, None);
    finish(&state, ok)
}

fn cmd_remove(cfg: &Config, name: Option<String>) -> Result<()> {
    let api = connect(cfg)?;
    let mut state = load_state(&api)?;
    if state.tunnels().is_empty() {
        println!("{}", "No tunnels configured.".yellow());
        return Ok(());
    }
    let idx = resolve_tunnel(&state, name.as_deref(), "Remove tunnel")?;
    state.select(idx);

    if let Some(t) = state.selected_tunnel() {
        println!("{}", "Will remove:".dimmed());
        println!("  {}", t.label().dimmed());
        println!();
    }

    if !confirm::ask(Confirmation::RemoveTunnel)? {
        println!("Cancelled.");
        return Ok(());
    }

    let ok = state.remove_selected(&api);
    finish(&state, ok)
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(file).with_context(|| format!("failed to read {}", file))
}

fn cmd_import(cfg: &Config, file: &str) -> Result<()> {
    let text = read_input(file)?;
    let incoming = import::parse_import(&text)?;

    let api = connect(cfg)?;
    let mut state = load_state(&api)?;
    println!(
        "Importing {} tunnels over the current {}.",
        incoming.tunnels.len().to_string().bold(),
        state.tunnels().len()
    );

    if !confirm::ask(Confirmation::OverwriteImport)? {
        println!("Cancelled.");
        return Ok(());
    }
    state.import(&text)?;
    display::print_status(&state);
    println!();
    display::print_tunnel_list(&state, &state.visible(&ViewQuery::default()));
    println!();

    ensure_savable(&state)?;
    let save_now = dialoguer::Confirm::new()
        .with_prompt("Save the imported configuration to the server now?")
        .default(false)
        .interact()
        .context("failed to read confirmation")?;
    if !save_now {
        println!("Not saved. Nothing changed on the server.");
        return Ok(());
    }
    let ok = state.save(&api, None);
    finish(&state, ok)
}

fn cmd_export(cfg: &Config, output: Option<String>) -> Result<()> {
    let api = connect(cfg)?;
    let mut state = load_state(&api)?;
    let target = output.unwrap_or_else(|| cfg.export_file.clone());

    if target == "-" {
        let json = state
            .doc
            .to_pretty_json()
            .context("failed to serialize configuration")?;
        println!("{}", json);
        return Ok(());
    }

    state.export(Path::new(&target))?;
    finish(&state, true)
}

fn cmd_check_port(cfg: &Config, raw: &str) -> Result<()> {
    let port = validate::to_number(raw);
    let api = connect(cfg)?;

    // Out-of-range ports are answered without touching the network.
    let mut state = if validate::is_port_valid(port) {
        load_state(&api)?
    } else {
        EditorState::new()
    };
    let result = state.check_port(&api, port).clone();

    if result.status == PortStatus::Error {
        anyhow::bail!("{}", result.message);
    }
    display::print_port_check(&result);
    Ok(())
}

fn cmd_health(cfg: &Config, watch: bool) -> Result<()> {
    let api = connect(cfg)?;
    let mut state = EditorState::new();

    if watch {
        println!(
            "Watching {} every {}s (Ctrl-C to stop)",
            api.base().dimmed(),
            cfg.health_interval().as_secs()
        );
        health::watch(&mut state, &api, cfg.health_interval(), None, |h| {
            println!("  API {}", health::render(h));
        });
        return Ok(());
    }

    health::print_once(&mut state, &api, api.base());
    if state.health == editor::Health::Down {
        anyhow::bail!("config API at {} is unreachable", api.base());
    }
    Ok(())
}

fn cmd_config(cfg: &Config) -> Result<()> {
    let path = Config::init()?;
    let editor = cfg.resolve_editor();

    let status = std::process::Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("failed to launch editor '{}'", editor))?;

    if !status.success() {
        anyhow::bail!("editor exited with {}", status);
    }

    Ok(())
}

fn cmd_completions(shell: Option<clap_complete::Shell>, cfg: &Config) -> Result<()> {
    let shell = match shell {
        Some(s) => s,
        None => {
            let name = cfg.shell.as_deref()
                .ok_or_else(|| anyhow::anyhow!(
                    "no shell specified, use `tunconf completions <shell>` or set `shell` in ~/.tunconf/config.toml"
                ))?;
            name.parse::<clap_complete::Shell>()
                .map_err(|_| anyhow::anyhow!("unknown shell '{}' in config", name))?
        }
    };

    let shell_name = match shell {
        clap_complete::Shell::Bash => "bash",
        clap_complete::Shell::Zsh => "zsh",
        clap_complete::Shell::Fish => "fish",
        clap_complete::Shell::Elvish => "elvish",
        clap_complete::Shell::PowerShell => "powershell",
        _ => anyhow::bail!("unsupported shell"),
    };
    unsafe { std::env::set_var("COMPLETE", shell_name) };
    clap_complete::CompleteEnv::with_factory(Cli::command).complete();
    Ok(())
}

/// Tunnel names from the server, for shell completion. Silent on any failure.
pub(crate) fn remote_tunnel_names() -> Vec<String> {
    let cfg = Config::load();
    ApiClient::new(&cfg.api_url(), Duration::from_secs(2))
        .and_then(|api| api.get_config())
        .map(|doc| doc.tunnels.into_iter().map(|t| t.name).collect())
        .unwrap_or_default()
}

fn cmd_list_tunnel_names(cfg: &Config) -> Result<()> {
    let api = connect(cfg)?;
    let doc = api.get_config()?;
    for t in &doc.tunnels {
        println!("{}", t.name);
    }
    Ok(())
}
