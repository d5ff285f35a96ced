use clap::{Args, Parser, Subcommand};
use clap_complete::aot::Shell;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "zap", version, about = "Multi-service development orchestrator")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Use a specific config file
    #[arg(long = "config", global = true)]
    pub config_file: Option<PathBuf>,

    /// Use https remotes for git operations
    #[arg(long, global = true)]
    pub http: bool,

    /// Use ssh remotes for git operations
    #[arg(long, global = true)]
    pub ssh: bool,

    /// More log output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Only warnings and errors
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Full debug output
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start services (all, or the named ones)
    Up {
        /// Services to start (everything eligible if empty)
        services: Vec<String>,

        /// Start this service (repeatable); merged with positional names
        #[arg(short = 's', long = "service")]
        service: Vec<String>,

        /// Start everything, ignoring any named services
        #[arg(long)]
        all: bool,

        /// Start even services that look like they are already running
        #[arg(short = 'y', long)]
        force: bool,
    },

    /// Stop services (all, or the named ones)
    Down {
        /// Services to stop (everything running if empty)
        services: Vec<String>,

        #[arg(short = 's', long = "service")]
        service: Vec<String>,

        /// Stop everything, ignoring any named services
        #[arg(long)]
        all: bool,
    },

    /// Restart services
    Restart {
        /// Services to restart (everything if empty)
        services: Vec<String>,

        #[arg(short = 's', long = "service")]
        service: Vec<String>,
    },

    /// Show the merged status of supervised processes and containers
    Status,

    /// Show logs for one service
    Logs {
        /// Service name or alias
        service: String,

        /// Follow log output (live tail)
        #[arg(short = 'f', long)]
        follow: bool,

        /// Print the current log contents and exit
        #[arg(long, conflicts_with = "follow")]
        no_follow: bool,
    },

    /// Stop everything and wipe runtime state
    Reset {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        force: bool,
    },

    /// Clone service repositories
    Clone {
        /// Services to clone (everything with a repo if empty)
        services: Vec<String>,
    },

    /// Run a named task
    Task {
        /// Task name or alias
        name: String,

        /// Parameter bindings as key=value
        args: Vec<String>,
    },

    /// Check out a branch across all service repositories
    Checkout {
        branch: String,
    },

    /// Pull all service repositories
    Pull,

    /// Show git status across all service repositories
    #[command(name = "gitstatus")]
    GitStatus,

    /// Give this checkout its own wire-name namespace
    Isolate {
        /// Use a specific instance id instead of a generated one
        id: Option<String>,
    },

    /// Show or set the active profile
    Profile {
        /// Profile to activate
        name: Option<String>,

        /// Clear the active profile
        #[arg(long, conflicts_with = "name")]
        clear: bool,
    },

    /// Show or set the active environment
    Environment {
        /// Environment to activate
        name: Option<String>,

        /// Clear the active environment
        #[arg(long, conflicts_with = "name")]
        clear: bool,
    },

    /// Show resolved environment variables for a service
    Env {
        /// Service name or alias
        service: String,
    },

    /// Validate the configuration file
    Validate,

    /// Generate a starter zapper.yml
    Init,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Commands {
    /// Merge positional service names with repeated `--service` flags.
    pub fn merged_services(positional: &[String], flagged: &[String]) -> Vec<String> {
        let mut merged: Vec<String> = positional.to_vec();
        for name in flagged {
            if !merged.contains(name) {
                merged.push(name.clone());
            }
        }
        merged
    }
}

/// Parse `key=value` task arguments.
pub fn parse_task_args(args: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| anyhow::anyhow!("task argument `{arg}` is not key=value"))
        })
        .collect()
}
