//! Command-line argument parsing for the `dispatch` binary.

use bot_dispatch::config::{Config, DirectiveConfig};
use clap::Parser;
use std::path::PathBuf;

/// Output format for dispatch results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One human-readable line per input.
    #[default]
    Text,
    /// One JSON object per input.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Match bot input against configured orders.
#[derive(Parser, Debug)]
#[command(name = "dispatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Inputs to dispatch (stdin lines are read when omitted)
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// Config file path
    #[arg(short = 'c', long, value_name = "PATH", env = "BOT_DISPATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the global header prefix
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Enable fuzzy matching of CJK headers
    #[arg(long)]
    pub fuzzy: bool,

    /// Disable prompt matching of literal headers
    #[arg(long)]
    pub no_prompt: bool,

    /// Output format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub output: String,

    /// Evaluate orders concurrently
    #[arg(long)]
    pub concurrent: bool,

    /// Print help lines for every order and exit
    #[arg(long)]
    pub help_text: bool,

    /// Maximum headers shown per help line
    #[arg(long, value_name = "N")]
    pub header_limit: Option<usize>,

    /// Write logs to the state directory instead of stderr
    #[arg(long)]
    pub log_file: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Parses the output format from the --output argument.
    pub fn parse_output_format(&self) -> std::result::Result<OutputFormat, String> {
        self.output.parse()
    }

    /// Applies directive overrides given on the command line.
    pub fn apply_overrides(&self, directive: &mut DirectiveConfig) {
        if let Some(prefix) = &self.prefix {
            directive.header = prefix.clone();
        }
        if self.fuzzy {
            directive.fuzzy_match = true;
        }
        if self.no_prompt {
            directive.match_prompt = false;
        }
    }
}
