#![allow(
    clippy::needless_pass_by_value,    // clap requires owned values
    clippy::unnecessary_wraps,         // consistent Result return for CLI handlers
    clippy::must_use_candidate,        // CLI functions don't need must_use
)]

//! eml2pdf CLI - Batch conversion of EML messages to PDF
//!
//! A command-line interface over the eml2pdf-core batch converter.

mod config;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use colored::Colorize;
use config::{Config, DEFAULT_CONFIG_TEMPLATE};
use eml2pdf_core::{BatchConverter, LabelPreset, PageSize, PdfRenderer, ProgressEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Process exit code when the input directory holds no message files
const EXIT_NO_INPUT: i32 = 3;

/// Verbosity level for output control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Verbosity {
    /// Suppress all output except errors
    Quiet,
    /// Normal output (default)
    Normal,
    /// Verbose output with extra details
    Verbose,
}

impl Verbosity {
    /// Create from CLI flags
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Check if output should be shown (not quiet)
    const fn should_show_output(self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Default log filter for this level
    const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
        }
    }
}

/// Header label language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
enum LabelsArg {
    /// From / To / CC / Date
    En,
    /// 差出人 / 宛先 / CC / 日時
    Ja,
}

impl From<LabelsArg> for LabelPreset {
    fn from(value: LabelsArg) -> Self {
        match value {
            LabelsArg::En => Self::En,
            LabelsArg::Ja => Self::Ja,
        }
    }
}

/// Paper size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
enum PageSizeArg {
    /// ISO A4 (210 x 297 mm)
    A4,
    /// US Letter (8.5 x 11 in)
    Letter,
}

impl From<PageSizeArg> for PageSize {
    fn from(value: PageSizeArg) -> Self {
        match value {
            PageSizeArg::A4 => Self::A4,
            PageSizeArg::Letter => Self::Letter,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "eml2pdf",
    about = "Convert a directory of EML messages to PDF",
    long_about = "Convert every .eml file in a directory into a PDF document.\n\
                  \n\
                  Each PDF shows the subject, the From/To/CC/Date headers and the plain-text body.\n\
                  Encoded headers and Japanese charsets (ISO-2022-JP, Shift_JIS, EUC-JP) are decoded.",
    version
)]
struct Args {
    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show detailed processing information
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert all .eml files of a directory to PDF
    #[command(long_about = "Convert all .eml files of a directory to PDF.\n\
                      \n\
                      Files are processed in name order. A file that cannot be converted is reported\n\
                      and skipped; the exit status is 0 whenever the batch ran, 3 when the directory\n\
                      holds no .eml files.\n\
                      \n\
                      Examples:\n\
                        eml2pdf convert ~/mail                 # Writes ~/mail/pdf_output/*.pdf\n\
                        eml2pdf convert ~/mail -o ~/pdfs       # Custom output directory\n\
                        eml2pdf convert ~/mail --labels ja     # Japanese header labels")]
    Convert {
        /// Directory containing .eml files
        #[arg(value_name = "INPUT_DIR")]
        input: PathBuf,

        /// Output directory (default: INPUT_DIR/pdf_output)
        #[arg(short, long, value_name = "OUTPUT_DIR")]
        output: Option<PathBuf>,

        /// Header label language
        #[arg(long, value_enum)]
        labels: Option<LabelsArg>,

        /// Paper size
        #[arg(long, value_enum)]
        page_size: Option<PageSizeArg>,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Manage configuration settings
    #[command(long_about = "Manage eml2pdf configuration files.\n\
                      \n\
                      Configuration files are loaded in this order (later overrides earlier):\n\
                        1. User config: ~/.eml2pdf.toml\n\
                        2. Project config: ./.eml2pdf.toml\n\
                        3. Command-line arguments\n\
                      \n\
                      Examples:\n\
                        eml2pdf config init          # Create .eml2pdf.toml with defaults\n\
                        eml2pdf config show          # Display current configuration\n\
                        eml2pdf config path --all    # Show where config files live")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Create a new .eml2pdf.toml configuration file
    Init {
        /// Create in user home directory (~/.eml2pdf.toml) instead of current directory
        #[arg(long)]
        global: bool,

        /// Overwrite existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Display the current effective configuration
    Show {
        /// Output as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Show the path(s) to configuration file(s)
    Path {
        /// Show all config file paths (user and project)
        #[arg(long)]
        all: bool,
    },
}

fn init_logging(verbosity: Verbosity) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(verbosity.log_filter()))
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Extract global verbosity settings
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);
    init_logging(verbosity);

    match args.command {
        Commands::Convert {
            input,
            output,
            labels,
            page_size,
        } => {
            // Load configuration files
            let (user_config, project_config) = Config::discover_configs();
            let config = Config::merge(user_config, project_config);
            convert_command(input, output, labels, page_size, &config, verbosity)
        }
        Commands::Completion { shell } => completion_command(shell),
        Commands::Config { action } => config_command(action, verbosity),
    }
}

/// Format one per-file result line
fn progress_line(event: &ProgressEvent) -> String {
    let position = format!("[{}/{}]", event.index, event.total);
    if event.ok {
        format!("{} {} {}", position.bright_black(), "✓".green(), event.file_name)
    } else {
        format!(
            "{} {} {} ({})",
            position.bright_black(),
            "✗".red(),
            event.file_name,
            event.error.as_deref().unwrap_or("unknown error").red()
        )
    }
}

fn convert_command(
    input: PathBuf,
    output: Option<PathBuf>,
    labels: Option<LabelsArg>,
    page_size: Option<PageSizeArg>,
    config: &Config,
    verbosity: Verbosity,
) -> Result<()> {
    if !input.is_dir() {
        eprintln!(
            "{} Input directory not found: {}",
            "Error:".red().bold(),
            input.display()
        );
        anyhow::bail!("Input directory not found: {}", input.display());
    }

    // Resolve final values with precedence: CLI > config > defaults
    let output_dir = config.resolve_output_dir(&input, output);
    let labels = config.resolve_labels(labels.map(Into::into));
    let page = config.resolve_page(page_size.map(Into::into));

    if verbosity.should_show_output() {
        eprintln!("{} {}", "Input: ".blue().bold(), input.display());
        eprintln!("{} {}", "Output:".blue().bold(), output_dir.display());
    }
    log::info!(
        "page {:?} with {} mm margins, labels {:?}",
        page.size,
        page.margin_mm,
        labels.from
    );

    // Create progress bar (hidden in quiet mode)
    let progress = if verbosity.should_show_output() {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .expect("template is compile-time constant")
                .progress_chars("█▓▒░  "),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let converter = BatchConverter::with_renderer(PdfRenderer::new(page)).labels(labels);
    let summary = converter
        .run_with_progress(&input, &output_dir, |event| {
            progress.set_length(event.total as u64);
            progress.set_position(event.index as u64);
            progress.set_message(event.file_name.clone());
            if verbosity.should_show_output() || !event.ok {
                progress.suspend(|| eprintln!("{}", progress_line(event)));
            }
        })
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    progress.finish_and_clear();

    if summary.is_empty() {
        eprintln!(
            "{} {} in {}",
            "Warning:".yellow().bold(),
            summary.summary,
            input.display()
        );
        std::process::exit(EXIT_NO_INPUT);
    }

    if verbosity.should_show_output() {
        let line = if summary.failed > 0 {
            summary.summary.yellow().bold()
        } else {
            summary.summary.green().bold()
        };
        println!("{line}");
    }

    Ok(())
}

fn completion_command(shell: Shell) -> Result<()> {
    let mut cmd = Args::command();
    let bin_name = cmd.get_name().to_string();

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}

fn config_command(action: ConfigAction, verbosity: Verbosity) -> Result<()> {
    match action {
        ConfigAction::Init { global, force } => config_init(global, force, verbosity),
        ConfigAction::Show { json } => config_show(json),
        ConfigAction::Path { all } => config_path(all),
    }
}

/// Create a new configuration file with commented defaults
fn config_init(global: bool, force: bool, verbosity: Verbosity) -> Result<()> {
    let config_path = if global {
        Config::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
    } else {
        Config::project_config_path()
    };

    if config_path.exists() && !force {
        eprintln!(
            "{} Configuration file already exists: {}",
            "Error:".red().bold(),
            config_path.display()
        );
        eprintln!("{} Use --force to overwrite", "Hint:".cyan().bold());
        std::process::exit(1);
    }

    fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    if verbosity.should_show_output() {
        println!(
            "{} Created configuration file: {}",
            "Success:".green().bold(),
            config_path.display()
        );
    }

    Ok(())
}

/// Display the current effective configuration
fn config_show(json_output: bool) -> Result<()> {
    let (user_config, project_config) = Config::discover_configs();
    let merged = Config::merge(user_config, project_config);

    if json_output {
        let json = serde_json::to_string_pretty(&merged)?;
        println!("{json}");
    } else {
        let toml = toml::to_string_pretty(&merged)?;
        println!("{toml}");
    }

    Ok(())
}

fn config_path(all: bool) -> Result<()> {
    let home_config = Config::user_config_path();
    let project_config = Config::project_config_path();

    if all {
        // Show all paths with existence status
        println!("{}", "Configuration file paths:".bold());
        println!();

        if let Some(ref home) = home_config {
            let status = if home.exists() {
                "exists".green()
            } else {
                "not found".yellow()
            };
            println!(
                "  {} {} ({})",
                "User:".bright_black(),
                home.display(),
                status
            );
        }

        let status = if project_config.exists() {
            "exists".green()
        } else {
            "not found".yellow()
        };
        println!(
            "  {} {} ({})",
            "Project:".bright_black(),
            project_config.display(),
            status
        );
    } else {
        // Effective config: project if it exists, else user, else where project would go
        let effective = if project_config.exists() {
            project_config
        } else {
            home_config
                .filter(|home| home.exists())
                .unwrap_or(project_config)
        };
        println!("{}", effective.display());
    }

    Ok(())
}
