use clap::{Parser, Subcommand};
use clap_complete::engine::{ArgValueCompleter, CompletionCandidate};

use crate::view::{SortKey, StatusFilter};

#[derive(Parser)]
#[command(name = "tunconf", about = "Edit a remote SSH tunnel configuration", version)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Server hosting the config API (overrides config.toml)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// API path prefix on the server (overrides config.toml)
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Log requests to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

fn complete_tunnel_names(current: &std::ffi::OsStr) -> Vec<CompletionCandidate> {
    let prefix = current.to_str().unwrap_or("");
    crate::remote_tunnel_names()
        .into_iter()
        .filter(|n| n.starts_with(prefix))
        .map(CompletionCandidate::new)
        .collect()
}

#[derive(Subcommand)]
pub enum Command {
    /// List tunnels
    #[command(alias = "ls")]
    List {
        /// Show only enabled or disabled tunnels
        #[arg(long, short, value_enum, default_value_t = StatusFilter::All)]
        filter: StatusFilter,
        /// Case-insensitive text to look for in names, hosts, users, ports and tags
        #[arg(long, short)]
        search: Option<String>,
        /// Sort order
        #[arg(long, value_enum, default_value_t = SortKey::Name)]
        sort: SortKey,
    },
    /// Show one tunnel with its validation errors
    Show {
        /// Tunnel name (interactive picker if omitted)
        #[arg(add = ArgValueCompleter::new(complete_tunnel_names))]
        name: Option<String>,
    },
    /// Add a new tunnel interactively
    Add,
    /// Change fields of a tunnel and save
    Set {
        /// Tunnel name
        #[arg(add = ArgValueCompleter::new(complete_tunnel_names))]
        name: String,
        /// Assignments such as `local_port=2222` or `tags=prod,db`
        #[arg(required = true, value_name = "FIELD=VALUE")]
        assignments: Vec<String>,
    },
    /// Remove a tunnel and save
    #[command(alias = "rm")]
    Remove {
        /// Tunnel name (interactive picker if omitted)
        #[arg(add = ArgValueCompleter::new(complete_tunnel_names))]
        name: Option<String>,
    },
    /// Replace the whole configuration with a JSON file
    Import {
        /// JSON file to read, or `-` for stdin
        file: String,
    },
    /// Write the configuration as pretty-printed JSON
    Export {
        /// Output file, or `-` for stdout (defaults to export_file in config.toml)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Ask the server whether a local port is free
    CheckPort {
        /// Port number
        #[arg(allow_negative_numbers = true)]
        port: String,
    },
    /// Check that the config API is reachable
    Health {
        /// Keep polling and report every change
        #[arg(long, short)]
        watch: bool,
    },
    /// Interactive editing session
    Edit,
    /// Initialize or edit ~/.tunconf/config.toml
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (reads from config if omitted)
        shell: Option<clap_complete::Shell>,
    },
    /// List tunnel names (for shell completion scripts)
    #[command(hide = true)]
    ListTunnelNames,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_flags_parse() {
        let cli = Cli::try_parse_from([
            "tunconf", "list", "--filter", "inactive", "--sort", "local-port-desc", "-s", "db",
        ])
        .unwrap();
        match cli.command {
            Command::List { filter, search, sort } => {
                assert_eq!(filter, StatusFilter::Inactive);
                assert_eq!(sort, SortKey::LocalPortDesc);
                assert_eq!(search.as_deref(), Some("db"));
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn set_requires_assignment() {
        assert!(Cli::try_parse_from(["tunconf", "set", "db"]).is_err());
        assert!(Cli::try_parse_from(["tunconf", "set", "db", "local_port=1"]).is_ok());
    }

    #[test]
    fn global_server_override() {
        let cli = Cli::try_parse_from(["tunconf", "health", "--server", "http://h:1"]).unwrap();
        assert_eq!(cli.server.as_deref(), Some("http://h:1"));
    }
}
