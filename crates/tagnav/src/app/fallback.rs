//! On-demand tag generation for the active document.

use std::ffi::OsString;
use std::path::{self, Path};

use anyhow::{Context, Result};

use crate::app::search::TagSearcher;
use crate::domain::model::TagRecord;
use crate::infra::process;

/// Produces a tag file for a single source file.
pub trait TagGenerator {
    /// Write tags for `source` into `output`, blocking until done.
    fn generate(&self, source: &Path, output: &Path) -> Result<()>;
}

/// Runs an external ctags-compatible program.
#[derive(Debug, Clone)]
pub struct CtagsGenerator {
    program: String,
    options: String,
}

impl CtagsGenerator {
    pub fn new(program: impl Into<String>, options: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            options: options.into(),
        }
    }
}

impl Default for CtagsGenerator {
    fn default() -> Self {
        Self::new("ctags", "--sort=yes")
    }
}

impl TagGenerator for CtagsGenerator {
    fn generate(&self, source: &Path, output: &Path) -> Result<()> {
        let command_line = format!("{} {}", self.program, self.options);
        let extra: Vec<OsString> = vec![
            "-f".into(),
            output.as_os_str().to_owned(),
            source.as_os_str().to_owned(),
        ];
        let cwd = source
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        process::run_in(&command_line, &extra, cwd)?;
        Ok(())
    }
}

/// Generates a throwaway tag file for the active document and searches it.
pub struct FallbackGenerator {
    generator: Box<dyn TagGenerator>,
    searcher: TagSearcher,
}

impl FallbackGenerator {
    pub fn new(generator: Box<dyn TagGenerator>) -> Self {
        Self {
            generator,
            // Generators are not guaranteed to sort their output.
            searcher: TagSearcher::new().assume_sorted(false),
        }
    }

    /// Generate tags for `active_file` only and return those matching `query`.
    ///
    /// Returns nothing when no document is active. The temporary tag file is removed before
    /// returning on every path.
    pub fn generate_and_search(&self, active_file: Option<&Path>, query: &str) -> Vec<TagRecord> {
        let Some(active_file) = active_file else {
            return Vec::new();
        };

        match self.try_generate_and_search(active_file, query) {
            Ok(records) => records,
            Err(err) => {
                let error = format!("{err:#}");
                tracing::warn!(
                    path = %active_file.display(),
                    %error,
                    "fallback tag generation failed"
                );
                Vec::new()
            }
        }
    }

    fn try_generate_and_search(&self, active_file: &Path, query: &str) -> Result<Vec<TagRecord>> {
        // The generator may run elsewhere, so it gets an absolute path.
        let source = path::absolute(active_file)
            .with_context(|| format!("resolving {}", active_file.display()))?;
        let source_dir = source.parent().unwrap_or_else(|| Path::new(""));

        let temp = tempfile::Builder::new()
            .prefix("tagnav-")
            .suffix(".tags")
            .tempfile()
            .context("failed to create temporary tag file")?
            .into_temp_path();

        self.generator
            .generate(&source, &temp)
            .with_context(|| format!("generating tags for {}", source.display()))?;

        let records = self
            .searcher
            .search_file_relative_to(query, &temp, source_dir);
        tracing::debug!(
            path = %source.display(),
            matches = records.len(),
            "fallback search finished"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;
    use std::rc::Rc;

    use anyhow::anyhow;

    /// Writes canned tag content and remembers what it was asked to tag, and where.
    struct CannedGenerator {
        contents: Option<String>,
        calls: Rc<RefCell<Vec<(PathBuf, PathBuf)>>>,
    }

    impl TagGenerator for CannedGenerator {
        fn generate(&self, source: &Path, output: &Path) -> Result<()> {
            self.calls
                .borrow_mut()
                .push((source.to_path_buf(), output.to_path_buf()));
            let contents = self
                .contents
                .as_ref()
                .ok_or_else(|| anyhow!("generator crashed"))?;
            fs::write(output, contents)?;
            Ok(())
        }
    }

    type Calls = Rc<RefCell<Vec<(PathBuf, PathBuf)>>>;

    fn fallback_with(contents: Option<&str>) -> (FallbackGenerator, Calls) {
        let calls = Calls::default();
        let generator = CannedGenerator {
            contents: contents.map(str::to_owned),
            calls: Rc::clone(&calls),
        };
        (FallbackGenerator::new(Box::new(generator)), calls)
    }

    #[test]
    fn generates_once_and_removes_temp_file() {
        let (fallback, calls) =
            fallback_with(Some("helper\t/src/main.rs\t/^fn helper() {$/;\"\tf\n"));

        let records = fallback.generate_and_search(Some(Path::new("/src/main.rs")), "help");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "helper");
        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].1.exists());
    }

    #[test]
    fn removes_temp_file_when_nothing_matches() {
        let (fallback, calls) = fallback_with(Some("other\t/a.rs\t1;\"\n"));

        assert!(
            fallback
                .generate_and_search(Some(Path::new("/a.rs")), "missing")
                .is_empty()
        );
        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].1.exists());
    }

    #[test]
    fn removes_temp_file_when_generator_fails() {
        let (fallback, calls) = fallback_with(None);

        assert!(
            fallback
                .generate_and_search(Some(Path::new("/a.rs")), "a")
                .is_empty()
        );
        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].1.exists());
    }

    #[test]
    fn empty_generator_output_is_a_plain_miss() {
        let (fallback, calls) = fallback_with(Some(""));

        assert!(
            fallback
                .generate_and_search(Some(Path::new("/a.rs")), "a")
                .is_empty()
        );
        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].1.exists());
    }

    #[test]
    fn skipped_without_active_file() {
        let (fallback, calls) = fallback_with(Some("a\ta.rs\t1;\"\n"));

        assert!(fallback.generate_and_search(None, "a").is_empty());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn relative_active_files_are_tagged_by_absolute_path() -> Result<()> {
        let (fallback, calls) = fallback_with(Some("helper\tmain.rs\t/^fn helper() {$/;\"\tf\n"));
        let cwd = std::env::current_dir()?;

        let records = fallback.generate_and_search(Some(Path::new("src/main.rs")), "helper");

        let calls = calls.borrow();
        assert_eq!(calls[0].0, cwd.join("src/main.rs"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file, cwd.join("src/main.rs"));
        Ok(())
    }

    #[test]
    fn bare_file_names_resolve_next_to_the_document() -> Result<()> {
        let (fallback, _calls) = fallback_with(Some("helper\tmain2.rs\t4;\"\n"));
        let cwd = std::env::current_dir()?;

        let records = fallback.generate_and_search(Some(Path::new("main2.rs")), "helper");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file, cwd.join("main2.rs"));
        Ok(())
    }
}
