//! Project-wide tag and api file generation.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::app::search::parse_line;
use crate::infra::config::{CommandSource, Config};
use crate::infra::process;

/// Files produced (or expected) by [`ProjectIndexer::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectArtifacts {
    pub tags: PathBuf,
    pub api: PathBuf,
    /// Entries written by the built-in api generator; `None` when a custom command ran.
    pub api_entries: Option<usize>,
}

/// Regenerates the tags and api files at a project root.
#[derive(Debug, Clone)]
pub struct ProjectIndexer {
    program: String,
    options: CommandSource,
    api_command: Option<CommandSource>,
    tag_file_name: String,
    api_file_name: String,
}

impl ProjectIndexer {
    /// Build an indexer for `root`, applying any project-specific overrides.
    pub fn from_config(config: &Config, root: &Path) -> Self {
        let project = config.project(root);
        Self {
            program: config.generator.program.clone(),
            options: project
                .and_then(|p| p.options.clone())
                .unwrap_or_else(|| CommandSource::Fixed(config.generator.project_options.clone())),
            api_command: project.and_then(|p| p.api_command.clone()),
            tag_file_name: config.tags.file_name.clone(),
            api_file_name: config.generator.api_file_name.clone(),
        }
    }

    pub fn with_options(mut self, options: CommandSource) -> Self {
        self.options = options;
        self
    }

    pub fn with_api_command(mut self, command: Option<CommandSource>) -> Self {
        self.api_command = command;
        self
    }

    /// Run the tag generator in `root`, then produce the api file.
    ///
    /// Generator exit codes are only logged: a failed run leaves a missing or stale tag file
    /// behind, which lookups treat as having no matches.
    pub fn build(&self, root: &Path) -> Result<ProjectArtifacts> {
        let command_line = format!("{} {}", self.program, self.options.resolve());
        process::run_in(&command_line, &[], root)
            .with_context(|| format!("failed to generate tags in {}", root.display()))?;

        let tags = root.join(&self.tag_file_name);
        let api = root.join(&self.api_file_name);

        let api_entries = match &self.api_command {
            Some(command) => {
                process::run_in(&command.resolve(), &[], root)
                    .with_context(|| format!("failed to generate api file in {}", root.display()))?;
                None
            }
            None if tags.is_file() => Some(write_api_file(&tags, &api, root)?),
            None => {
                tracing::warn!(path = %tags.display(), "no tag file produced; api file not written");
                None
            }
        };

        Ok(ProjectArtifacts {
            tags,
            api,
            api_entries,
        })
    }
}

/// Convert a tag file into calltip-style api entries: `name pattern\nfile`, one per line,
/// where `\n` is the literal two-character escape. Returns the number of entries written.
pub fn write_api_file(tags: &Path, api: &Path, root: &Path) -> Result<usize> {
    let input =
        File::open(tags).with_context(|| format!("failed to open {}", tags.display()))?;
    let dir = api.parent().unwrap_or(root);
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let output =
        File::create(api).with_context(|| format!("failed to create {}", api.display()))?;
    let mut writer = BufWriter::new(output);

    let mut written = 0;
    for line in BufReader::new(input).lines() {
        let line = line.with_context(|| format!("failed to read {}", tags.display()))?;
        let Ok(record) = parse_line(&line, root) else {
            continue;
        };
        let file = record.file.strip_prefix(root).unwrap_or(&record.file);
        writeln!(
            writer,
            "{} {}\\n{}",
            record.name,
            record.locator.display_text(),
            file.display()
        )?;
        written += 1;
    }

    writer
        .flush()
        .with_context(|| format!("failed to write {}", api.display()))?;
    Ok(written)
}
