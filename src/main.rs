use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use vatio::cli::{Cli, Command, OutputFormat};
use vatio::config::ExperimentConfig;
use vatio::json_output::JsonExperimentOutput;
use vatio::pipeline::{self, ExperimentReport, RunParameters};
use vatio::preflight;
use vatio::process_tree::{Pid, ProcessTree};

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Per-image run counts, failures and the run-to-run view
fn print_variations(report: &ExperimentReport) {
    for variation in &report.variations {
        let runs = &variation.report;
        println!(
            "📦 {} ({}): {} run(s) analysed, {} failed",
            runs.label,
            runs.image,
            runs.runs.len(),
            runs.failures.len()
        );
        for failure in &runs.failures {
            eprintln!(
                "   ❌ run {} ({}): {}",
                failure.run,
                failure.directory.display(),
                failure.error
            );
        }
        if let Some(error) = &variation.table_error {
            eprintln!("   ⚠️  runs not comparable: {}", error);
        }
        if let Some(deltas) = &variation.run_comparison {
            for metric in &deltas.metrics {
                let changes: Vec<String> = metric
                    .deltas
                    .iter()
                    .map(|d| match d.percentage_change.computed() {
                        Some(pct) => format!("#{} {:+.2}%", d.run, pct),
                        None => format!("#{} n/a", d.run),
                    })
                    .collect();
                println!(
                    "   {} (baseline run {} = {:.4}): {}",
                    metric.metric,
                    deltas.baseline_run,
                    metric.baseline_value,
                    changes.join(", ")
                );
            }
        }
    }
}

fn run_analyze(config_path: &Path, format: OutputFormat) -> Result<()> {
    let config = ExperimentConfig::from_file(config_path)?;
    let report = pipeline::analyze_experiment(&config)?;
    pipeline::write_experiment_outputs(&config, &report)?;

    match format {
        OutputFormat::Text => {
            print_variations(&report);
            if let Some(comparison) = &report.comparison {
                println!();
                print!("{}", comparison.to_report_string());
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonExperimentOutput::from_report(&report))
                .context("Failed to serialise comparison output")?;
            println!("{}", json);
        }
    }

    let failed = report.failed_runs();
    if failed > 0 {
        anyhow::bail!("{} run(s) failed analysis", failed);
    }
    Ok(())
}

fn run_preflight(config_path: &Path) -> Result<()> {
    let config = ExperimentConfig::from_file(config_path)?;
    let params = RunParameters::from_config(&config)?;

    let mut failing = 0usize;
    for image in &config.images {
        for run in 0..config.procedure.external_repetitions {
            let dir = config.run_dir(image, run);
            match preflight::check_run_dir(&dir, &params) {
                Ok(problems) if problems.is_empty() => {
                    println!("✅ {}", dir.display());
                }
                Ok(problems) => {
                    failing += 1;
                    println!("❌ {}", dir.display());
                    for problem in problems {
                        println!("   - {}", problem);
                    }
                }
                Err(e) => {
                    failing += 1;
                    println!("❌ {}", dir.display());
                    println!("   - {:#}", e);
                }
            }
        }
    }

    if failing > 0 {
        anyhow::bail!("{} run(s) failed preflight", failing);
    }
    Ok(())
}

fn run_descendants(trace_path: &Path, root: Pid) -> Result<()> {
    let content = fs::read_to_string(trace_path)
        .with_context(|| format!("Failed to read trace file: {}", trace_path.display()))?;
    let tree = ProcessTree::from_trace(&content);
    for pid in tree.descendants(root) {
        println!("{}", pid);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    match args.command {
        Command::Analyze { config, format } => run_analyze(&config, format),
        Command::Preflight { config } => run_preflight(&config),
        Command::Descendants { trace, root } => run_descendants(&trace, root),
    }
}
