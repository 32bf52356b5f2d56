//! CLI module for Scrivener
//!
//! Provides command-line interface parsing for the `scrivener` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Scrivener - multi-agent research reports
///
/// Plans web searches for a topic, gathers attributed facts and writes a
/// cited markdown report. Given an existing document, it also looks for that
/// document's gaps and compares the new report against it.
#[derive(Parser, Debug)]
#[command(
    name = "scrivener",
    version,
    about = "Scrivener - multi-agent research reports",
    after_help = "EXAMPLES:\n    \
                  scrivener research \"grid-scale energy storage\"\n    \
                  scrivener research \"tidal power\" --document survey.pdf\n    \
                  scrivener config                       # Show the effective configuration\n\n\
                  The language model key is read from OPENAI_API_KEY (or the variable\n\
                  named by llm.api_key_env); a .env file is honoured."
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "scrivener.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a topic and write a report
    Research {
        /// The research topic
        topic: String,

        /// Existing document (PDF or text) to analyse and compare against
        #[arg(short, long)]
        document: Option<PathBuf>,

        /// Directory for the report and trace (overrides output.directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not write the trace JSON file
        #[arg(long)]
        no_trace: bool,
    },

    /// Show the effective configuration
    Config,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_research_with_document() {
        let cli = Cli::try_parse_from([
            "scrivener",
            "research",
            "tidal power",
            "--document",
            "survey.pdf",
            "--no-trace",
        ])
        .unwrap();

        match cli.command {
            Commands::Research {
                topic,
                document,
                output,
                no_trace,
            } => {
                assert_eq!(topic, "tidal power");
                assert_eq!(document, Some(PathBuf::from("survey.pdf")));
                assert_eq!(output, None);
                assert!(no_trace);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.config, PathBuf::from("scrivener.toml"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["scrivener", "config", "--verbose", "--log-json"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.log_json);
        assert!(matches!(cli.command, Commands::Config));
    }

    #[test]
    fn test_topic_is_required() {
        assert!(Cli::try_parse_from(["scrivener", "research"]).is_err());
    }
}
