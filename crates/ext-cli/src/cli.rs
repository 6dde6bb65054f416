//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Extension host - inspect, plan and synchronise installed extensions
#[derive(Parser, Debug)]
#[command(name = "exthost")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Runtime configuration file (TOML, JSON or YAML)
    #[arg(long, global = true, env = "EXTHOST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Check every installed extension's declaration
    ///
    /// Reads each extension's manifest and reports all violations at once,
    /// including graph and class visibility problems.
    Validate {
        /// Registry file (.json, .toml, .yaml)
        registry: PathBuf,
    },

    /// Show the load plan and what each extension can see
    Plan {
        /// Registry file (.json, .toml, .yaml)
        registry: PathBuf,
    },

    /// Synchronise extension content into a target directory
    ///
    /// Each extension's content lands in `<target>/<extension id>`.
    Sync {
        /// Registry file (.json, .toml, .yaml)
        registry: PathBuf,

        /// Target directory (defaults to `content_dir` from the config)
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// Update even when content reports up to date
        #[arg(long)]
        force: bool,
    },

    /// Print the installed extension tree
    List {
        /// Registry file (.json, .toml, .yaml)
        registry: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_with_global_flags() {
        let cli = Cli::parse_from([
            "exthost", "sync", "reg.json", "--target", "out", "--json", "--force",
        ]);
        assert!(cli.json);
        assert_eq!(
            cli.command,
            Commands::Sync {
                registry: PathBuf::from("reg.json"),
                target: Some(PathBuf::from("out")),
                force: true,
            }
        );
    }

    #[test]
    fn test_parse_requires_a_command() {
        assert!(Cli::try_parse_from(["exthost"]).is_err());
    }
}
