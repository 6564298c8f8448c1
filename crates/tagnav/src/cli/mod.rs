//! Command line interface.

pub mod picker;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::navigation::{Candidate, NavigationController, TagPicker};
use crate::app::project::ProjectIndexer;
use crate::cli::picker::PromptPicker;
use crate::domain::model::TagRecord;
use crate::infra::config::Config;
use crate::infra::git;

#[derive(Debug, Parser)]
#[command(name = "tagnav", author, version, about = "Look up symbols in ctags files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the tags whose name starts with NAME
    Find {
        name: String,
        /// Active document; its directory is searched first and it is tagged on a miss
        #[arg(long)]
        file: Option<PathBuf>,
        /// Project root (defaults to the enclosing git work tree)
        #[arg(long)]
        root: Option<PathBuf>,
        /// Do not generate tags for the active document when nothing matches
        #[arg(long)]
        no_fallback: bool,
        /// Print matches as JSON
        #[arg(long)]
        json: bool,
        /// Choose one match interactively
        #[arg(long)]
        pick: bool,
    },
    /// Print the tag files a lookup would search, in order
    Sources {
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Regenerate the project's tags and api files
    Generate {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Print shell completions
    Completions { shell: Shell },
}

/// Execute a parsed command line.
pub fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Find {
            name,
            file,
            root,
            no_fallback,
            json,
            pick,
        } => {
            let root = project_root(root, file.as_deref())?;
            let config = Config::load(root.as_deref())?;
            let mut controller = NavigationController::from_config(&config);
            if no_fallback {
                controller = controller.with_fallback(None);
            }

            let mut records = controller.lookup(&name, file.as_deref(), root.as_deref());
            if records.is_empty() {
                return Ok(ExitCode::FAILURE);
            }

            if pick && records.len() > 1 {
                let candidates: Vec<Candidate> = records.iter().map(Candidate::from).collect();
                match PromptPicker::new().pick(&candidates) {
                    Some(idx) => records = vec![records.swap_remove(idx)],
                    None => return Ok(ExitCode::FAILURE),
                }
            }

            print_records(&records, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Sources { file, root } => {
            let root = project_root(root, file.as_deref())?;
            let config = Config::load(root.as_deref())?;
            let controller = NavigationController::from_config(&config);
            let sources = controller.resolver().resolve(
                file.as_deref(),
                root.as_deref(),
                &config.project_sources(),
                &config.tags.global,
            );

            let mut stdout = io::stdout().lock();
            for path in sources.iter() {
                writeln!(stdout, "{}", path.display())?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Generate { root } => {
            let root = match project_root(root, None)? {
                Some(root) => root,
                None => std::env::current_dir().context("unable to determine working directory")?,
            };
            let config = Config::load(Some(root.as_path()))?;
            let artifacts = ProjectIndexer::from_config(&config, &root).build(&root)?;

            println!("{}", artifacts.tags.display());
            match artifacts.api_entries {
                Some(count) => println!("{} ({count} entries)", artifacts.api.display()),
                None => println!("{}", artifacts.api.display()),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "tagnav", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn project_root(explicit: Option<PathBuf>, file: Option<&Path>) -> Result<Option<PathBuf>> {
    if explicit.is_some() {
        return Ok(explicit);
    }
    if let Some(root) = file.and_then(git::project_root_for) {
        return Ok(Some(root));
    }
    let cwd = std::env::current_dir().context("unable to determine working directory")?;
    Ok(git::project_root_for(&cwd))
}

fn print_records(records: &[TagRecord], json: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if json {
        let rendered =
            serde_json::to_string_pretty(records).context("failed to serialize matches")?;
        writeln!(stdout, "{rendered}")?;
        return Ok(());
    }

    for record in records {
        writeln!(
            stdout,
            "{}\t{}:{}",
            record.name,
            record.file.display(),
            record.locator
        )?;
    }
    Ok(())
}
