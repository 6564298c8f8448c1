use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(author, version, about = "Project automation commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cargo nextest with default configuration
    Nextest {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        release: bool,
    },
    /// Verify that tag fixture files are sorted by name
    CheckFixtures {
        #[arg(long, default_value = "crates/tagnav/tests/fixtures")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Nextest { profile, release } => run_nextest(profile, release)?,
        Commands::CheckFixtures { dir } => check_fixtures(&dir)?,
    }
    Ok(())
}

fn run_nextest(profile: Option<String>, release: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("nextest").arg("run");
    if let Some(profile) = profile {
        cmd.arg("--profile").arg(profile);
    }
    if release {
        cmd.arg("--release");
    }
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("cargo nextest run failed");
    }
    Ok(())
}

fn check_fixtures(dir: &Path) -> Result<()> {
    let mut unsorted = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() || entry.file_name() != "tags" {
            continue;
        }
        let contents = fs::read_to_string(entry.path())
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        if let Some(line) = first_unsorted_line(&contents) {
            unsorted.push(format!("{}:{line}", entry.path().display()));
        }
    }

    if !unsorted.is_empty() {
        anyhow::bail!("unsorted tag files:\n{}", unsorted.join("\n"));
    }
    Ok(())
}

/// 1-based line number of the first name that sorts before its predecessor.
fn first_unsorted_line(contents: &str) -> Option<usize> {
    let names: Vec<&str> = contents
        .lines()
        .map(|line| line.split('\t').next().unwrap_or(line))
        .collect();
    names
        .windows(2)
        .position(|pair| pair[1] < pair[0])
        .map(|idx| idx + 2)
}
