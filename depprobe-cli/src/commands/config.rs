//! `depprobe config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use depprobe_core::config::DepprobeConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    explicit: bool,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, explicit, writer).await,
        ConfigAction::Show { section } => {
            execute_show(config_path, explicit, section, writer).await
        }
    }
}

/// Load and validate the configuration, reporting instead of failing early.
///
/// # Errors
///
/// `CliError::Config` after rendering the report when the configuration is invalid.
async fn execute_validate(
    config_path: &Path,
    explicit: bool,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = match load_config(config_path, explicit).await {
        Ok(_) => ConfigValidationReport {
            source: source_label(config_path, explicit).await,
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }
    Ok(())
}

/// Show the effective configuration (file + env overrides + defaults).
async fn execute_show(
    config_path: &Path,
    explicit: bool,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load_config(config_path, explicit).await?;
    let config_toml = section_toml(&config, section.as_deref())?;

    writer.render(&ConfigReport {
        source: source_label(config_path, explicit).await,
        section,
        config_toml,
    })
}

/// Serialize the whole configuration or one section to TOML.
fn section_toml(config: &DepprobeConfig, section: Option<&str>) -> Result<String, CliError> {
    let rendered = match section {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("resolver") => toml::to_string_pretty(&config.resolver),
        Some("docker") => toml::to_string_pretty(&config.docker),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: general, resolver, docker)"
            )));
        }
    };
    rendered.map_err(|e| CliError::Command(format!("failed to serialize config: {e}")))
}

async fn source_label(config_path: &Path, explicit: bool) -> String {
    let exists = tokio::fs::try_exists(config_path).await.unwrap_or(false);
    if exists || explicit {
        config_path.display().to_string()
    } else {
        "defaults".to_owned()
    }
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering.
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path, or `defaults`
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{section}]");
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;
        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_toml_full_and_single() {
        let config = DepprobeConfig::default();
        let full = section_toml(&config, None).expect("serializes");
        assert!(full.contains("[general]"));
        assert!(full.contains("[resolver]"));
        assert!(full.contains("[docker]"));

        let resolver = section_toml(&config, Some("resolver")).expect("serializes");
        assert!(resolver.contains("max_workers = 4"));
        assert!(!resolver.contains("[general]"));
    }

    #[test]
    fn test_section_toml_unknown_section() {
        let err = section_toml(&DepprobeConfig::default(), Some("metrics")).unwrap_err();
        assert!(err.to_string().contains("unknown section: metrics"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_config_report_render_text_specific_section() {
        let report = ConfigReport {
            source: "/etc/depprobe.toml".to_owned(),
            section: Some("docker".to_owned()),
            config_toml: "socket = \"\"\n".to_owned(),
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render succeeds");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("[docker]"));
        assert!(output.contains("socket"));
    }

    #[test]
    fn test_config_report_json_skips_toml() {
        let report = ConfigReport {
            source: "depprobe.toml".to_owned(),
            section: None,
            config_toml: "x = 1".to_owned(),
        };
        let json = serde_json::to_value(&report).expect("serializes");
        assert_eq!(json["source"], "depprobe.toml");
        assert!(json.get("section").is_none());
        assert!(json.get("config_toml").is_none());
    }

    #[test]
    fn test_config_validation_report_invalid() {
        let report = ConfigValidationReport {
            source: "bad.toml".to_owned(),
            valid: false,
            errors: vec!["invalid config value for 'resolver.max_workers'".to_owned()],
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render succeeds");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("INVALID"));
        assert!(output.contains("resolver.max_workers"));
    }
}
