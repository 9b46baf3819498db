//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use cloudshift_core::LanguageVariant;
use std::io::IsTerminal;
use std::path::PathBuf;

/// CloudShift - rewrite cloud provider SDK usage from one provider to another
///
/// Detects AWS SDK constructs in JavaScript, TypeScript, Python and Go sources
/// and rewrites them for Azure or Google Cloud using a versioned pattern catalog.
#[derive(Parser, Debug)]
#[command(
    name = "cloudshift",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "CLOUDSHIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rewrite source files from one provider to another
    Transform(TransformArgs),

    /// Report provider constructs without rewriting anything
    Detect(DetectArgs),

    /// Inspect and validate the pattern catalog
    Catalog(CatalogArgs),

    /// Manage configuration files and settings
    Config(ConfigArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Provider pair and language shared by transform and detect
#[derive(Parser, Debug, Clone)]
pub struct RequestArgs {
    /// Provider the code is written against (defaults to the configured source)
    #[arg(long = "from", value_name = "PROVIDER")]
    pub from: Option<String>,

    /// Provider to migrate to (defaults to the configured target)
    #[arg(long = "to", value_name = "PROVIDER")]
    pub to: Option<String>,

    /// Language variant; inferred from the file extension when omitted
    #[arg(short, long, value_name = "LANGUAGE")]
    pub language: Option<LanguageVariant>,

    /// Extra catalog files or directories merged after the configured catalog
    #[arg(long = "catalog", value_name = "PATH")]
    pub catalogs: Vec<PathBuf>,
}

/// Arguments for the transform command
#[derive(Parser, Debug)]
pub struct TransformArgs {
    /// Source files to transform
    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub request: RequestArgs,

    /// Overwrite each input file with its transformed text
    #[arg(long, conflicts_with = "out_dir")]
    pub write: bool,

    /// Write transformed files into this directory
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Exit with an error when any file has unmapped constructs or failing checks
    #[arg(long)]
    pub strict: bool,

    /// Show the coverage report of each file
    #[arg(long)]
    pub show_report: bool,
}

/// Arguments for the detect command
#[derive(Parser, Debug)]
pub struct DetectArgs {
    /// Source file to scan
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub request: RequestArgs,
}

/// Arguments for the catalog command
#[derive(Parser, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub action: CatalogAction,
}

/// Catalog actions
#[derive(Subcommand, Debug)]
pub enum CatalogAction {
    /// List rules, optionally filtered
    List(CatalogListArgs),

    /// Load, validate and compile catalog files
    Validate(CatalogValidateArgs),
}

/// Arguments for catalog list
#[derive(Parser, Debug)]
pub struct CatalogListArgs {
    /// Only rules of mappings from this provider
    #[arg(long = "from", value_name = "PROVIDER")]
    pub from: Option<String>,

    /// Only rules of mappings to this provider
    #[arg(long = "to", value_name = "PROVIDER")]
    pub to: Option<String>,

    /// Only rules for this language variant
    #[arg(short, long)]
    pub language: Option<LanguageVariant>,

    /// Only rules of this service family
    #[arg(long)]
    pub family: Option<String>,

    /// Extra catalog files or directories
    #[arg(long = "catalog", value_name = "PATH")]
    pub catalogs: Vec<PathBuf>,
}

/// Arguments for catalog validate
#[derive(Parser, Debug)]
pub struct CatalogValidateArgs {
    /// Catalog files or directories merged after the configured catalog
    #[arg(value_name = "PATHS")]
    pub paths: Vec<PathBuf>,

    /// Validate only the given paths, without the bundled catalog
    #[arg(long)]
    pub no_builtin: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a configuration file with default values
    Init(ConfigInitArgs),

    /// Show the effective configuration
    Show(ConfigShowArgs),

    /// Print the configuration file locations
    Path,
}

/// Arguments for config init
#[derive(Parser, Debug)]
pub struct ConfigInitArgs {
    /// Initialize the user config instead of the project config (.cloudshift.yaml)
    #[arg(long)]
    pub user: bool,

    /// Force overwrite existing config files
    #[arg(long)]
    pub force: bool,
}

/// Arguments for config show
#[derive(Parser, Debug)]
pub struct ConfigShowArgs {
    /// Show configuration in specified format
    #[arg(short, long, value_enum, default_value = "yaml")]
    pub format: ConfigFormat,
}

/// Configuration file formats
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_transform_arguments() {
        let cli = Cli::parse_from([
            "cloudshift",
            "-vv",
            "transform",
            "a.js",
            "b.py",
            "--from",
            "aws",
            "--to",
            "azure",
            "--language",
            "typescript",
            "--strict",
        ]);
        assert_eq!(cli.verbosity_level(), 2);

        let Commands::Transform(args) = cli.command else {
            panic!("expected transform");
        };
        assert_eq!(args.files, vec![PathBuf::from("a.js"), PathBuf::from("b.py")]);
        assert_eq!(args.request.from.as_deref(), Some("aws"));
        assert_eq!(args.request.to.as_deref(), Some("azure"));
        assert_eq!(args.request.language, Some(LanguageVariant::TypeScript));
        assert!(args.strict && !args.write);
    }

    #[test]
    fn test_write_conflicts_with_out_dir() {
        let result = Cli::try_parse_from([
            "cloudshift", "transform", "a.js", "--write", "--out-dir", "out",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_overrides_verbosity() {
        let cli = Cli::parse_from(["cloudshift", "--quiet", "config", "path"]);
        assert_eq!(cli.verbosity_level(), 0);
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigArgs {
                action: ConfigAction::Path
            })
        ));
    }

    #[test]
    fn test_unknown_language_is_rejected() {
        let result = Cli::try_parse_from(["cloudshift", "detect", "a.rb", "--language", "ruby"]);
        assert!(result.is_err());
    }
}
