//! `depprobe detectors` command handler

use std::io::Write;

use serde::Serialize;

use depprobe_core::config::DepprobeConfig;
use depprobe_detector::Orchestrator;

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `detectors` command.
pub fn execute(config: &DepprobeConfig, writer: &OutputWriter) -> Result<(), CliError> {
    writer.render(&DetectorList::new(&config.resolver.detectors))
}

/// Detector names in priority order, with the configured selection.
#[derive(Serialize)]
pub struct DetectorList {
    pub detectors: Vec<DetectorEntry>,
}

#[derive(Serialize)]
pub struct DetectorEntry {
    pub name: &'static str,
    pub enabled: bool,
}

impl DetectorList {
    /// An empty selection enables every detector.
    pub fn new(selected: &[String]) -> Self {
        let detectors = Orchestrator::available_detectors()
            .into_iter()
            .map(|name| DetectorEntry {
                name,
                enabled: selected.is_empty() || selected.iter().any(|s| s == name),
            })
            .collect();
        Self { detectors }
    }
}

impl Render for DetectorList {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Detectors (priority order):")?;
        for (position, entry) in self.detectors.iter().enumerate() {
            let state = if entry.enabled {
                "enabled".green()
            } else {
                "disabled".dimmed()
            };
            writeln!(w, "  {:>2}. {:<14} {}", position + 1, entry.name, state)?;
        }
        Ok(())
    }
}
