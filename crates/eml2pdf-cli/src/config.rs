//! Configuration file handling for `.eml2pdf.toml`

use anyhow::{Context, Result};
use colored::Colorize;
use eml2pdf_core::{LabelPreset, Labels, PageSetup, PageSize};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file name, in the home and the current directory
pub const CONFIG_FILE_NAME: &str = ".eml2pdf.toml";

/// Output subdirectory used when neither flag nor config names one
pub const DEFAULT_OUTPUT_DIR: &str = "pdf_output";

/// Configuration file structure for .eml2pdf.toml
///
/// Configuration files can be placed in:
/// - User home directory: ~/.eml2pdf.toml (user defaults)
/// - Project directory: ./.eml2pdf.toml (project defaults)
///
/// Precedence order (highest to lowest):
/// 1. Command-line arguments (--output, --labels, --page-size)
/// 2. Project config (./.eml2pdf.toml)
/// 3. User config (~/.eml2pdf.toml)
/// 4. Built-in defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Where converted files go
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,

    /// Page geometry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageConfig>,

    /// Header labels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<LabelsConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output subdirectory name under the input directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Paper size (a4 or letter)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<PageSize>,

    /// Margin on all sides in millimetres
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_mm: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    /// Built-in label set (en or ja)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<LabelPreset>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_subject: Option<String>,
}

/// Starting point written by `config init`
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# eml2pdf Configuration File

# Where converted PDFs are written
[output]
# Subdirectory created inside the input directory
# directory = "pdf_output"

# Page geometry
[page]
# Paper size: a4 or letter
# size = "a4"

# Margin on every side, in millimetres
# margin_mm = 20.0

# Header labels
[labels]
# Built-in label set: en or ja
# preset = "en"

# Individual overrides (ignored when --labels is given)
# from = "From"
# to = "To"
# cc = "CC"
# date = "Date"
# no_subject = "(No Subject)"
"#;

impl Config {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            // TOML errors include line/column information, preserve it
            eprintln!(
                "{} Failed to parse config file: {}",
                "Error:".red().bold(),
                path.display()
            );
            eprintln!("{} {}", "Parse error:".yellow().bold(), e);
            eprintln!();
            eprintln!("{} Configuration file syntax:", "Help:".cyan().bold());
            eprintln!("  [page]");
            eprintln!("  size = \"a4\"     # a4 or letter");
            eprintln!("  [labels]");
            eprintln!("  preset = \"ja\"   # en or ja");
            eprintln!();
            eprintln!("  Run `eml2pdf config init` for a complete example");
            anyhow::anyhow!("Failed to parse config file: {e}")
        })?;

        Ok(config)
    }

    /// Path of the user config, if a home directory is known
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    /// Path of the project config
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }

    /// Find and load configuration files
    /// Returns (`user_config`, `project_config`)
    pub fn discover_configs() -> (Option<Self>, Option<Self>) {
        let user_config = Self::user_config_path().and_then(|p| Self::load_optional(&p, "user"));
        let project_config = Self::load_optional(&Self::project_config_path(), "project");
        (user_config, project_config)
    }

    fn load_optional(config_path: &Path, kind: &str) -> Option<Self> {
        if !config_path.exists() {
            return None;
        }
        match Self::load_from_file(config_path) {
            Ok(config) => {
                log::debug!("loaded {kind} config from {}", config_path.display());
                Some(config)
            }
            Err(e) => {
                eprintln!(
                    "{} Failed to load {} config from {}: {}",
                    "Warning:".yellow().bold(),
                    kind,
                    config_path.display(),
                    e
                );
                None
            }
        }
    }

    /// Merge multiple configs with precedence
    /// CLI args > project config > user config > defaults
    pub fn merge(user_config: Option<Self>, project_config: Option<Self>) -> Self {
        let user = user_config.unwrap_or_default();
        let Some(project) = project_config else {
            return user;
        };

        let output = match (user.output, project.output) {
            (Some(u), Some(p)) => Some(OutputConfig {
                directory: p.directory.or(u.directory),
            }),
            (u, p) => p.or(u),
        };

        let page = match (user.page, project.page) {
            (Some(u), Some(p)) => Some(PageConfig {
                size: p.size.or(u.size),
                margin_mm: p.margin_mm.or(u.margin_mm),
            }),
            (u, p) => p.or(u),
        };

        let labels = match (user.labels, project.labels) {
            (Some(u), Some(p)) => Some(LabelsConfig {
                preset: p.preset.or(u.preset),
                from: p.from.or(u.from),
                to: p.to.or(u.to),
                cc: p.cc.or(u.cc),
                date: p.date.or(u.date),
                no_subject: p.no_subject.or(u.no_subject),
            }),
            (u, p) => p.or(u),
        };

        Self {
            output,
            page,
            labels,
        }
    }

    /// Resolve labels from CLI, config, or default
    ///
    /// A preset chosen on the command line replaces the configured label set
    /// entirely; otherwise the configured preset is used with any per-label
    /// overrides applied.
    pub fn resolve_labels(&self, cli_value: Option<LabelPreset>) -> Labels {
        if let Some(preset) = cli_value {
            return Labels::preset(preset);
        }

        let Some(config) = &self.labels else {
            return Labels::default();
        };

        let mut labels = Labels::preset(config.preset.unwrap_or_default());
        let overrides = [
            (&mut labels.from, &config.from),
            (&mut labels.to, &config.to),
            (&mut labels.cc, &config.cc),
            (&mut labels.date, &config.date),
            (&mut labels.no_subject, &config.no_subject),
        ];
        for (slot, value) in overrides {
            if let Some(value) = value {
                slot.clone_from(value);
            }
        }
        labels
    }

    /// Resolve page geometry from CLI, config, or default
    pub fn resolve_page(&self, cli_size: Option<PageSize>) -> PageSetup {
        let defaults = PageSetup::default();
        let page = self.page.clone().unwrap_or_default();
        let size = cli_size.or(page.size).unwrap_or(defaults.size);
        page.margin_mm
            .map(|margin_mm| PageSetup { size, margin_mm })
            .filter(PageSetup::is_usable)
            .unwrap_or(PageSetup {
                size,
                margin_mm: defaults.margin_mm,
            })
    }

    /// Resolve the output directory: explicit path, else a subdirectory of
    /// the input directory
    pub fn resolve_output_dir(&self, input: &Path, cli_value: Option<PathBuf>) -> PathBuf {
        cli_value.unwrap_or_else(|| {
            let name = self
                .output
                .as_ref()
                .and_then(|o| o.directory.as_deref())
                .unwrap_or(DEFAULT_OUTPUT_DIR);
            input.join(name)
        })
    }
}
