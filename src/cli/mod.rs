//! Command-line interface for interview-coder.
//!
//! Provides commands for writing a starter config, segmenting transcripts,
//! coding them with a language model and writing the evidence report.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use crate::adapters::{LlmAdapter, OpenAiAdapter};
use crate::config::{resolve_config_path, ConfigError, InterviewConfig, DEFAULT_CONFIG_FILE};
use crate::core::{Orchestrator, StageSummary, TracingProgress};
use crate::domain::Codebook;
use crate::report::EvidenceReport;
use crate::workdir::Workdir;

pub mod template;

/// interview-coder - Evidence-based coding of interview transcripts
#[derive(Parser, Debug)]
#[command(name = "interview-coder")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ./interviews.yaml)
    #[arg(short, long, global = true, env = "INTERVIEW_CODER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a template interviews.yaml config
    Template {
        /// Destination path for the template
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Allow overwriting an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Empty the configured working directory
    Clean {
        /// Do not prompt for confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Split transcripts into overlapping segments
    Segment,

    /// Code segmented transcripts with the language model
    Analyze,

    /// Write the evidence report to the configured outfile
    WriteOutput {
        /// Overwrite the output file if it already exists
        #[arg(short, long)]
        force: bool,
    },

    /// Show the normalized codebook and its hash
    Codebook {
        /// Print the full codebook as YAML
        #[arg(short, long)]
        print: bool,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Template { path, force } => template::write_template(&path, force),
            Commands::Clean { force } => clean(&load_config(self.config.as_deref())?, force),
            Commands::Segment => segment(load_config(self.config.as_deref())?),
            Commands::Analyze => analyze(load_config(self.config.as_deref())?).await,
            Commands::WriteOutput { force } => write_output(&load_config(self.config.as_deref())?, force),
            Commands::Codebook { print } => show_codebook(&load_config(self.config.as_deref())?, print),
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<InterviewConfig> {
    let path = resolve_config_path(explicit);
    let config = InterviewConfig::load(&path)?;
    debug!(config = %config.config_path.display(), "Loaded configuration");
    Ok(config)
}

/// Split transcripts into segments
fn segment(config: InterviewConfig) -> Result<()> {
    let orchestrator = Orchestrator::new(config)?.with_progress(Arc::new(TracingProgress));
    let summary = orchestrator.run_segment_stage()?;
    print_summary("Segmented", &summary, &orchestrator.workdir().segments_index());
    Ok(())
}

/// Code all segmented transcripts
async fn analyze(config: InterviewConfig) -> Result<()> {
    let mut orchestrator = Orchestrator::new(config)?.with_progress(Arc::new(TracingProgress));

    // Cached documents can be reported without an endpoint
    match OpenAiAdapter::from_env() {
        Ok(adapter) => {
            info!(model = adapter.model(), "Using OpenAI-compatible endpoint");
            let adapter: Arc<dyn LlmAdapter> = Arc::new(adapter);
            orchestrator = orchestrator.with_adapter(adapter);
        }
        Err(e) => debug!(error = %e, "No model endpoint configured"),
    }

    let summary = orchestrator.run_analyze_stage().await?;
    print_summary("Analyzed", &summary, &orchestrator.workdir().analysis_index());
    Ok(())
}

fn print_summary(verb: &str, summary: &StageSummary, index: &Path) {
    println!(
        "{} {} document(s), reused {}, failed {}",
        verb, summary.written, summary.reused, summary.failed
    );
    println!("Index: {}", index.display());
}

/// Write the evidence report
fn write_output(config: &InterviewConfig, force: bool) -> Result<()> {
    let outfile = &config.outfile;
    if outfile.exists() && !force {
        if !is_interactive() {
            return Err(ConfigError::Usage(format!(
                "Output file already exists: {}. Refusing to overwrite in non-interactive mode. Use --force to overwrite.",
                outfile.display()
            ))
            .into());
        }
        if !confirm(&format!("Output file already exists: {}. Overwrite?", outfile.display()))? {
            println!("Keeping existing file: {}", outfile.display());
            return Ok(());
        }
    }

    let report = EvidenceReport::from_workdir(&config.base_dir, &Workdir::new(&config.workdir))?;
    if report.documents.is_empty() {
        println!("No documents found in analysis index. Nothing to write.");
        return Ok(());
    }

    report.write(outfile)?;
    println!(
        "Wrote report: {} ({} document(s), {} summary row(s))",
        outfile.display(),
        report.documents.len(),
        report.summary.len()
    );
    Ok(())
}

/// Print the codebook as the model sees it
fn show_codebook(config: &InterviewConfig, print: bool) -> Result<()> {
    let codebook = Codebook::build(&config.topics);

    if print {
        let yaml = serde_yaml::to_string(&codebook).context("Failed to render codebook")?;
        print!("{}", yaml);
        return Ok(());
    }

    println!("Codebook hash: {}", codebook.hash()?);
    for topic in &codebook.topics {
        let multiple = if topic.allow_multiple_orientations { " (multiple)" } else { "" };
        println!("  {}: {}{}", topic.id, topic.topic, multiple);
        for orientation in &topic.orientations {
            println!("      - {}", orientation);
        }
    }
    Ok(())
}

/// Remove everything inside the workdir, keeping the directory itself
fn clean(config: &InterviewConfig, force: bool) -> Result<()> {
    let workdir = &config.workdir;
    if is_dangerous_workdir(workdir) {
        return Err(ConfigError::Usage(format!(
            "Refusing to clean dangerous workdir: {}",
            workdir.display()
        ))
        .into());
    }

    if !force {
        if !is_interactive() {
            return Err(ConfigError::Usage(
                "Refusing to clean without confirmation on a non-interactive TTY. Re-run with --force."
                    .to_string(),
            )
            .into());
        }
        if !confirm(&format!(
            "This will delete all contents of '{}'. Continue?",
            workdir.display()
        ))? {
            println!("Aborted.");
            return Ok(());
        }
    }

    let removed = empty_directory(workdir)?;
    println!("Cleaned {} item(s) from: {}", removed, workdir.display());
    Ok(())
}

/// The filesystem root and the home directory are never cleaned
pub fn is_dangerous_workdir(path: &Path) -> bool {
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if resolved.parent().is_none() {
        return true;
    }

    match dirs::home_dir() {
        Some(home) => home.canonicalize().unwrap_or(home) == resolved,
        None => false,
    }
}

/// Remove all entries of a directory; returns the number removed
pub fn empty_directory(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    if !dir.is_dir() {
        return Err(ConfigError::Usage(format!("workdir is not a directory: {}", dir.display())).into());
    }

    let mut removed = 0;
    let entries = std::fs::read_dir(dir).with_context(|| format!("Failed to list: {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list: {}", dir.display()))?
            .path();
        let is_real_dir = std::fs::symlink_metadata(&path)
            .map(|m| m.is_dir())
            .unwrap_or(false);

        if is_real_dir {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        }
        .with_context(|| format!("Failed to remove '{}'", path.display()))?;
        removed += 1;
    }
    Ok(removed)
}

/// Both stdin and stdout are terminals
fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout)
}

/// Ask a yes/no question; empty input means no
fn confirm(question: &str) -> Result<bool> {
    let stdin = io::stdin();
    loop {
        print!("{} [y/N] ", question);
        io::stdout().flush().context("Failed to write prompt")?;

        let mut answer = String::new();
        if stdin.lock().read_line(&mut answer).context("Failed to read answer")? == 0 {
            return Ok(false);
        }

        match answer.trim().to_lowercase().as_str() {
            "" | "n" | "no" => return Ok(false),
            "y" | "yes" => return Ok(true),
            _ => continue,
        }
    }
}
