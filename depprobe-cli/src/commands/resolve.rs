//! `depprobe resolve` command handler

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use depprobe_core::config::DepprobeConfig;
use depprobe_core::error::DepprobeError;
use depprobe_core::{AggregatedResult, Section, SourceInfo};
use depprobe_resolver::{DependencyResolver, DockerChannelFactory, ResolveRequest, TargetSpec};

use crate::cli::ResolveArgs;
use crate::commands::ResolverFlags;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `resolve` command.
pub async fn execute(
    args: ResolveArgs,
    config: &DepprobeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let target = parse_target(&args.target, args.container)?;
    let options = ResolverFlags {
        skip_system_scope: args.skip_system_scope,
        skip_hash_collection: args.skip_hash_collection,
        select_detectors: args.select_detectors.as_deref(),
    }
    .apply(config);

    let factory = Arc::new(DockerChannelFactory::from_config(config));
    let resolver = DependencyResolver::new(factory, options)?;

    let mut request = ResolveRequest::new(target).with_only_container_info(args.only_container_info);
    request.working_dir = args.working_dir;
    request.venv_path = args.venv_path;

    info!(target_spec = %request.target, "resolving dependencies");
    let result = resolver.try_resolve(&request).await?;

    writer.render(&DependencyReport { result })
}

/// Parse the positional target; `--container` treats it as a bare container ID.
fn parse_target(raw: &str, bare_container: bool) -> Result<TargetSpec, CliError> {
    if bare_container {
        return Ok(TargetSpec::Container(raw.to_owned()));
    }
    raw.parse::<TargetSpec>()
        .map_err(|e| CliError::from(DepprobeError::Target(e)))
}

/// Aggregated result of one resolution.
///
/// JSON output is the aggregated result itself.
#[derive(Serialize)]
#[serde(transparent)]
pub struct DependencyReport {
    pub result: AggregatedResult,
}

impl Render for DependencyReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        render_result(&self.result, "", w)
    }
}

/// Text rendering shared with the batch report. Every line starts with `indent`.
pub(crate) fn render_result(
    result: &AggregatedResult,
    indent: &str,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    use colored::Colorize;

    match &result.source {
        Some(source) => render_source(source, indent, w)?,
        None => writeln!(w, "{indent}Source: {}", "unknown".dimmed())?,
    }

    for (title, section) in [("Project", &result.project), ("System", &result.system)] {
        if let Some(section) = section {
            writeln!(w)?;
            render_section(title, section, indent, w)?;
        }
    }

    if result.project.is_none() && result.system.is_none() {
        writeln!(w, "{indent}{}", "No packages found".dimmed())?;
    }
    Ok(())
}

fn render_source(source: &SourceInfo, indent: &str, w: &mut dyn Write) -> std::io::Result<()> {
    use colored::Colorize;

    writeln!(w, "{indent}Source: {} {}", source.kind, source.name.bold())?;
    if let Some(ref image) = source.image {
        writeln!(w, "{indent}  Image: {image}")?;
    }
    if let Some(ref hash) = source.hash {
        writeln!(w, "{indent}  Hash: {hash}")?;
    }
    if let Some(ref os) = source.os {
        writeln!(w, "{indent}  OS: {os}")?;
    }
    if let Some(ref kernel) = source.kernel {
        writeln!(w, "{indent}  Kernel: {kernel}")?;
    }
    if let Some(ref services) = source.services {
        writeln!(w, "{indent}  Services:")?;
        for service in services {
            writeln!(
                w,
                "{indent}    {:<16} {:<28} {}",
                service.service, service.container, service.image
            )?;
        }
    }
    Ok(())
}

fn render_section(
    title: &str,
    section: &Section,
    indent: &str,
    w: &mut dyn Write,
) -> std::io::Result<()> {
    use colored::Colorize;

    writeln!(
        w,
        "{indent}{} ({} packages)",
        title.bold(),
        section.packages.len()
    )?;

    for (detector, location) in &section.package_management {
        let hash = location
            .hash
            .as_deref()
            .map(|h| format!("  hash {}", h.chars().take(12).collect::<String>()))
            .unwrap_or_default();
        writeln!(
            w,
            "{indent}  {:<14} {}{}",
            detector.cyan(),
            location.location,
            hash.dimmed()
        )?;
        if let Some(ref runtime) = location.runtime {
            let version = runtime.version.as_deref().unwrap_or("unknown");
            writeln!(w, "{indent}  {:<14} {} {}", "", runtime.platform, version)?;
        }
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for package in &section.packages {
        *counts.entry(package.ecosystem.as_str()).or_default() += 1;
    }
    if !counts.is_empty() {
        let summary: Vec<String> = counts
            .iter()
            .map(|(ecosystem, count)| format!("{ecosystem} {count}"))
            .collect();
        writeln!(w, "{indent}  By type: {}", summary.join(", "))?;
    }

    for package in &section.packages {
        writeln!(
            w,
            "{indent}    {:<5} {} {}",
            package.ecosystem.as_str().dimmed(),
            package.name,
            package.version
        )?;
    }
    Ok(())
}
