//! Jump orchestration: tag lookup, disambiguation, and history recording.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::app::fallback::{CtagsGenerator, FallbackGenerator};
use crate::app::history::{HistoryOptions, HistoryStack};
use crate::app::search::TagSearcher;
use crate::app::sources::{ProjectSources, TagSourceResolver};
use crate::domain::model::{Locator, Location, TagRecord};
use crate::infra::config::Config;

/// The editor view a navigation context is attached to.
pub trait Editor {
    /// Current caret position.
    fn location(&self) -> Location;

    /// Path of the document being edited, if it has one.
    fn active_file(&self) -> Option<PathBuf>;

    /// Project root of the active document.
    fn project_root(&self) -> Option<PathBuf> {
        None
    }

    /// Text of a 0-based line in the current document.
    fn line_text(&self, line: usize) -> Option<String>;

    /// Open or focus the document identified by `id`.
    fn open(&mut self, id: &str) -> Result<()>;

    /// Move the caret to a 0-based line and column.
    fn goto(&mut self, line: usize, column: usize);
}

/// One row offered to the user when several tags match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub name: String,
    pub file_name: String,
    pub locator: String,
    pub fields: String,
}

impl From<&TagRecord> for Candidate {
    fn from(record: &TagRecord) -> Self {
        Self {
            name: record.name.clone(),
            file_name: record.file_name(),
            locator: record.locator.display_text(),
            fields: record.fields_without_kind(),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}  {}", self.name, self.file_name, self.locator)?;
        if !self.fields.is_empty() {
            write!(f, "  [{}]", self.fields)?;
        }
        Ok(())
    }
}

/// Chooses between several matching tags.
pub trait TagPicker {
    /// Index of the chosen candidate, or `None` when the user cancels.
    fn pick(&mut self, candidates: &[Candidate]) -> Option<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Back,
    Forward,
}

/// What the caller asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JumpRequest {
    pub tag: Option<String>,
    pub direction: Option<Direction>,
}

impl JumpRequest {
    pub fn tag(name: impl Into<String>) -> Self {
        Self {
            tag: Some(name.into()),
            direction: None,
        }
    }

    /// Look up the identifier under the caret.
    pub fn under_caret() -> Self {
        Self::default()
    }

    pub fn history(direction: Direction) -> Self {
        Self {
            tag: None,
            direction: Some(direction),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpOutcome {
    Jumped(Location),
    NotFound,
    Cancelled,
    NoHistory,
}

/// Per-view navigation state.
#[derive(Debug, Clone)]
pub struct NavigationContext {
    history: HistoryStack,
    recording: bool,
}

impl Default for NavigationContext {
    fn default() -> Self {
        Self::new(HistoryOptions::default())
    }
}

impl NavigationContext {
    pub fn new(options: HistoryOptions) -> Self {
        Self {
            history: HistoryStack::with_options(options),
            recording: true,
        }
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Enable or disable edit recording. Disabling drops the history.
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
        if !recording {
            self.history.clear();
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Note that the document was modified at `location`.
    pub fn record_edit(&mut self, location: Location) {
        if self.recording {
            self.history.append(location);
        }
    }
}

/// Resolves jump requests against tag files and a navigation context.
pub struct NavigationController {
    resolver: TagSourceResolver,
    searcher: TagSearcher,
    fallback: Option<FallbackGenerator>,
    project_sources: ProjectSources,
    global_sources: Vec<PathBuf>,
}

impl Default for NavigationController {
    fn default() -> Self {
        Self {
            resolver: TagSourceResolver::default(),
            searcher: TagSearcher::default(),
            fallback: None,
            project_sources: ProjectSources::new(),
            global_sources: Vec::new(),
        }
    }
}

impl NavigationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller using configured sources and a ctags fallback.
    pub fn from_config(config: &Config) -> Self {
        let generator =
            CtagsGenerator::new(&config.generator.program, &config.generator.file_options);
        Self {
            resolver: TagSourceResolver::new(&config.tags.file_name),
            searcher: TagSearcher::default(),
            fallback: Some(FallbackGenerator::new(Box::new(generator))),
            project_sources: config.project_sources(),
            global_sources: config.tags.global.clone(),
        }
    }

    pub fn with_global_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.global_sources = sources;
        self
    }

    pub fn with_project_sources(mut self, sources: ProjectSources) -> Self {
        self.project_sources = sources;
        self
    }

    pub fn with_fallback(mut self, fallback: Option<FallbackGenerator>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn resolver(&self) -> &TagSourceResolver {
        &self.resolver
    }

    /// All tags matching `query`, generating tags for `active_file` when no source answers.
    pub fn lookup(
        &self,
        query: &str,
        active_file: Option<&Path>,
        project_root: Option<&Path>,
    ) -> Vec<TagRecord> {
        if query.is_empty() {
            return Vec::new();
        }

        let sources = self.resolver.resolve(
            active_file,
            project_root,
            &self.project_sources,
            &self.global_sources,
        );
        let records = self.searcher.search(query, &sources);
        if !records.is_empty() {
            return records;
        }

        match &self.fallback {
            Some(fallback) => fallback.generate_and_search(active_file, query),
            None => records,
        }
    }

    /// Handle a jump request for the view behind `editor`.
    pub fn jump(
        &self,
        context: &mut NavigationContext,
        editor: &mut dyn Editor,
        picker: &mut dyn TagPicker,
        request: JumpRequest,
    ) -> Result<JumpOutcome> {
        let query = match (request.tag, request.direction) {
            (Some(tag), _) => tag,
            (None, Some(direction)) => return self.navigate(context, editor, direction),
            (None, None) => match identifier_under_caret(editor) {
                Some(word) => word,
                None => return Ok(JumpOutcome::NotFound),
            },
        };

        let active_file = editor.active_file();
        let project_root = editor.project_root();
        let mut records = self.lookup(&query, active_file.as_deref(), project_root.as_deref());

        let target = match records.len() {
            0 => {
                tracing::debug!(query = %query, "no tags found");
                return Ok(JumpOutcome::NotFound);
            }
            1 => records.swap_remove(0),
            _ => {
                let candidates: Vec<Candidate> = records.iter().map(Candidate::from).collect();
                match picker.pick(&candidates) {
                    Some(idx) if idx < records.len() => records.swap_remove(idx),
                    _ => return Ok(JumpOutcome::Cancelled),
                }
            }
        };

        // History changes only once the target document is open.
        let origin = editor.location();
        editor.open(&target.file.to_string_lossy())?;
        context.history.append(origin);
        place_caret(editor, &target);
        let landed = editor.location();
        context.history.append(landed.clone());

        Ok(JumpOutcome::Jumped(landed))
    }

    /// Move through the context's history without searching.
    pub fn navigate(
        &self,
        context: &mut NavigationContext,
        editor: &mut dyn Editor,
        direction: Direction,
    ) -> Result<JumpOutcome> {
        let target = match direction {
            Direction::Back => context.history.back(&editor.location()),
            Direction::Forward => context.history.forward(),
        };
        let Some(target) = target else {
            return Ok(JumpOutcome::NoHistory);
        };

        editor.open(&target.id)?;
        editor.goto(target.line, target.column);
        Ok(JumpOutcome::Jumped(target))
    }
}

fn place_caret(editor: &mut dyn Editor, tag: &TagRecord) {
    match &tag.locator {
        Locator::Line(line) => editor.goto(line.saturating_sub(1), 0),
        Locator::Pattern(pattern) => match find_line(editor, pattern) {
            Some(line) => editor.goto(line, 0),
            None => {
                tracing::debug!(
                    path = %tag.file.display(),
                    pattern = %pattern,
                    "tag pattern not found; caret left in place"
                );
            }
        },
    }
}

fn find_line(editor: &dyn Editor, pattern: &str) -> Option<usize> {
    (0..)
        .map_while(|line| editor.line_text(line).map(|text| (line, text)))
        .find(|(_, text)| text.contains(pattern))
        .map(|(line, _)| line)
}

fn identifier_under_caret(editor: &dyn Editor) -> Option<String> {
    let caret = editor.location();
    let text = editor.line_text(caret.line)?;
    identifier_at(&text, caret.column)
}

/// The identifier touching `column` (a char index) in `line`.
pub fn identifier_at(line: &str, column: usize) -> Option<String> {
    let chars: Vec<char> = line.chars().collect();
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let column = column.min(chars.len());

    let mut start = column;
    while start > 0 && is_ident(chars[start - 1]) {
        start -= 1;
    }
    let mut end = column;
    while end < chars.len() && is_ident(chars[end]) {
        end += 1;
    }

    (start < end).then(|| chars[start..end].iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use std::rc::Rc;

    use anyhow::anyhow;
    use tempfile::TempDir;

    use crate::app::fallback::TagGenerator;

    #[derive(Default)]
    struct FakeEditor {
        documents: HashMap<String, Vec<String>>,
        current: String,
        line: usize,
        column: usize,
        opened: Vec<String>,
        active: Option<PathBuf>,
    }

    impl FakeEditor {
        fn with_document(mut self, id: &str, text: &str) -> Self {
            self.documents
                .insert(id.to_owned(), text.lines().map(str::to_owned).collect());
            self
        }

        fn editing(mut self, path: &Path) -> Self {
            self.active = Some(path.to_path_buf());
            self
        }

        fn at(mut self, id: &str, line: usize, column: usize) -> Self {
            self.current = id.to_owned();
            self.line = line;
            self.column = column;
            self
        }
    }

    impl Editor for FakeEditor {
        fn location(&self) -> Location {
            Location::new(self.current.clone(), self.line, self.column)
        }

        fn active_file(&self) -> Option<PathBuf> {
            self.active.clone()
        }

        fn line_text(&self, line: usize) -> Option<String> {
            self.documents.get(&self.current)?.get(line).cloned()
        }

        fn open(&mut self, id: &str) -> Result<()> {
            if !self.documents.contains_key(id) {
                return Err(anyhow!("no such document: {id}"));
            }
            if self.current != id {
                self.current = id.to_owned();
                self.line = 0;
                self.column = 0;
            }
            self.opened.push(id.to_owned());
            Ok(())
        }

        fn goto(&mut self, line: usize, column: usize) {
            self.line = line;
            self.column = column;
        }
    }

    struct ScriptedPicker {
        choice: Option<usize>,
        offered: Vec<Candidate>,
    }

    impl ScriptedPicker {
        fn choosing(choice: Option<usize>) -> Self {
            Self {
                choice,
                offered: Vec::new(),
            }
        }
    }

    impl TagPicker for ScriptedPicker {
        fn pick(&mut self, candidates: &[Candidate]) -> Option<usize> {
            self.offered = candidates.to_vec();
            self.choice
        }
    }

    struct Fixture {
        dir: TempDir,
        controller: NavigationController,
    }

    impl Fixture {
        fn new(tags: &str) -> Result<Self> {
            let dir = tempfile::tempdir()?;
            let tags_path = dir.path().join("tags");
            fs::write(&tags_path, tags)?;
            let controller = NavigationController::new().with_global_sources(vec![tags_path]);
            Ok(Self { dir, controller })
        }

        fn doc(&self, name: &str) -> String {
            self.dir.path().join(name).to_string_lossy().into_owned()
        }
    }

    const TAGS: &str = "\
helper\tutil.rs\t/^fn helper() {$/;\"\tf
main\tmain.rs\t3;\"\tf
render\tui.rs\t/^pub fn render() {$/;\"\tf\tmodule:ui
render\tweb.rs\t/^fn render() {$/;\"\tkind:function\tmodule:web
";

    const UTIL: &str = "use std::fmt;\n\n// helper\nfn helper() {\n}\n";

    #[test]
    fn single_match_jumps_by_line_and_records_both_positions() -> Result<()> {
        let fx = Fixture::new(TAGS)?;
        let mut editor = FakeEditor::default()
            .with_document("scratch", "main();\n")
            .with_document(&fx.doc("main.rs"), "a\nb\nfn main() {}\n")
            .at("scratch", 0, 2);
        let mut context = NavigationContext::default();
        let mut picker = ScriptedPicker::choosing(None);

        let outcome = fx
            .controller
            .jump(&mut context, &mut editor, &mut picker, JumpRequest::tag("main"))?;

        let landed = Location::new(fx.doc("main.rs"), 2, 0);
        assert_eq!(outcome, JumpOutcome::Jumped(landed.clone()));
        assert!(picker.offered.is_empty());
        assert_eq!(
            context.history().records(),
            &[Location::new("scratch", 0, 2), landed]
        );
        Ok(())
    }

    #[test]
    fn pattern_locator_lands_on_first_containing_line() -> Result<()> {
        let fx = Fixture::new(TAGS)?;
        let mut editor = FakeEditor::default()
            .with_document("scratch", "")
            .with_document(&fx.doc("util.rs"), UTIL)
            .at("scratch", 0, 0);
        let mut context = NavigationContext::default();

        fx.controller.jump(
            &mut context,
            &mut editor,
            &mut ScriptedPicker::choosing(None),
            JumpRequest::tag("help"),
        )?;

        assert_eq!(editor.location(), Location::new(fx.doc("util.rs"), 3, 0));
        Ok(())
    }

    #[test]
    fn unmatched_pattern_leaves_caret_where_the_file_opened() -> Result<()> {
        let fx = Fixture::new(TAGS)?;
        let mut editor = FakeEditor::default()
            .with_document("scratch", "")
            .with_document(&fx.doc("util.rs"), "// rewritten\n")
            .at("scratch", 0, 0);
        let mut context = NavigationContext::default();

        let outcome = fx.controller.jump(
            &mut context,
            &mut editor,
            &mut ScriptedPicker::choosing(None),
            JumpRequest::tag("helper"),
        )?;

        assert_eq!(
            outcome,
            JumpOutcome::Jumped(Location::new(fx.doc("util.rs"), 0, 0))
        );
        Ok(())
    }

    #[test]
    fn no_matches_leave_history_untouched() -> Result<()> {
        let fx = Fixture::new(TAGS)?;
        let mut editor = FakeEditor::default()
            .with_document("scratch", "")
            .at("scratch", 0, 0);
        let mut context = NavigationContext::default();

        let outcome = fx.controller.jump(
            &mut context,
            &mut editor,
            &mut ScriptedPicker::choosing(Some(0)),
            JumpRequest::tag("nothing"),
        )?;

        assert_eq!(outcome, JumpOutcome::NotFound);
        assert!(context.history().is_empty());
        assert!(editor.opened.is_empty());
        Ok(())
    }

    #[test]
    fn several_matches_are_offered_and_cancel_is_a_no_op() -> Result<()> {
        let fx = Fixture::new(TAGS)?;
        let mut editor = FakeEditor::default()
            .with_document("scratch", "")
            .at("scratch", 0, 0);
        let mut context = NavigationContext::default();
        let mut picker = ScriptedPicker::choosing(None);

        let outcome = fx.controller.jump(
            &mut context,
            &mut editor,
            &mut picker,
            JumpRequest::tag("render"),
        )?;

        assert_eq!(outcome, JumpOutcome::Cancelled);
        assert!(context.history().is_empty());
        assert_eq!(
            picker.offered,
            [
                Candidate {
                    name: "render".into(),
                    file_name: "ui.rs".into(),
                    locator: "pub fn render() {".into(),
                    fields: "module:ui".into(),
                },
                Candidate {
                    name: "render".into(),
                    file_name: "web.rs".into(),
                    locator: "fn render() {".into(),
                    fields: "module:web".into(),
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn picked_candidate_is_opened() -> Result<()> {
        let fx = Fixture::new(TAGS)?;
        let mut editor = FakeEditor::default()
            .with_document("scratch", "")
            .with_document(&fx.doc("web.rs"), "\n\nfn render() {\n")
            .at("scratch", 0, 0);
        let mut context = NavigationContext::default();

        let outcome = fx.controller.jump(
            &mut context,
            &mut editor,
            &mut ScriptedPicker::choosing(Some(1)),
            JumpRequest::tag("render"),
        )?;

        assert_eq!(
            outcome,
            JumpOutcome::Jumped(Location::new(fx.doc("web.rs"), 2, 0))
        );
        assert_eq!(context.history().len(), 2);
        Ok(())
    }

    #[test]
    fn identifier_under_caret_is_the_implicit_query() -> Result<()> {
        let fx = Fixture::new(TAGS)?;
        let mut editor = FakeEditor::default()
            .with_document("scratch", "    let x = helper();\n")
            .with_document(&fx.doc("util.rs"), UTIL)
            .at("scratch", 0, 15);
        let mut context = NavigationContext::default();

        let outcome = fx.controller.jump(
            &mut context,
            &mut editor,
            &mut ScriptedPicker::choosing(None),
            JumpRequest::under_caret(),
        )?;

        assert_eq!(
            outcome,
            JumpOutcome::Jumped(Location::new(fx.doc("util.rs"), 3, 0))
        );
        Ok(())
    }

    #[test]
    fn direction_only_requests_walk_history() -> Result<()> {
        let fx = Fixture::new(TAGS)?;
        let mut editor = FakeEditor::default()
            .with_document("scratch", "")
            .with_document(&fx.doc("main.rs"), "a\nb\nfn main() {}\n")
            .at("scratch", 0, 0);
        let mut context = NavigationContext::default();
        let mut picker = ScriptedPicker::choosing(None);

        fx.controller
            .jump(&mut context, &mut editor, &mut picker, JumpRequest::tag("main"))?;

        let back = fx.controller.jump(
            &mut context,
            &mut editor,
            &mut picker,
            JumpRequest::history(Direction::Back),
        )?;
        assert_eq!(back, JumpOutcome::Jumped(Location::new("scratch", 0, 0)));
        assert_eq!(editor.location(), Location::new("scratch", 0, 0));

        let again = fx.controller.jump(
            &mut context,
            &mut editor,
            &mut picker,
            JumpRequest::history(Direction::Back),
        )?;
        assert_eq!(again, JumpOutcome::NoHistory);

        let forward = fx.controller.jump(
            &mut context,
            &mut editor,
            &mut picker,
            JumpRequest::history(Direction::Forward),
        )?;
        assert_eq!(
            forward,
            JumpOutcome::Jumped(Location::new(fx.doc("main.rs"), 2, 0))
        );
        Ok(())
    }

    #[test]
    fn failed_open_leaves_history_untouched() -> Result<()> {
        let fx = Fixture::new(TAGS)?;
        let mut editor = FakeEditor::default()
            .with_document("a.rs", "")
            .with_document("b.rs", "")
            .with_document("c.rs", "")
            .at("c.rs", 0, 0);
        let mut context = NavigationContext::default();
        for id in ["a.rs", "b.rs", "c.rs"] {
            context.record_edit(Location::new(id, 0, 0));
        }
        fx.controller.navigate(&mut context, &mut editor, Direction::Back)?;
        editor.goto(50, 0);
        let records = context.history().records().to_vec();
        let cursor = context.history().cursor();
        assert_eq!(cursor, 2);

        // main.rs is listed in the tag file but the editor cannot open it.
        let result = fx.controller.jump(
            &mut context,
            &mut editor,
            &mut ScriptedPicker::choosing(None),
            JumpRequest::tag("main"),
        );

        assert!(result.is_err());
        assert_eq!(context.history().records(), records.as_slice());
        assert_eq!(context.history().cursor(), cursor);
        Ok(())
    }

    /// Writes canned tags for whatever file it is asked to tag.
    struct CannedGenerator {
        contents: String,
        outputs: Rc<RefCell<Vec<PathBuf>>>,
    }

    impl TagGenerator for CannedGenerator {
        fn generate(&self, _source: &Path, output: &Path) -> Result<()> {
            self.outputs.borrow_mut().push(output.to_path_buf());
            fs::write(output, &self.contents)?;
            Ok(())
        }
    }

    #[test]
    fn fallback_tags_the_active_file_when_no_source_exists() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source = dir.path().join("lib.rs");
        let doc = source.to_string_lossy().into_owned();
        let outputs = Rc::new(RefCell::new(Vec::new()));
        let generator = CannedGenerator {
            contents: "helper\tlib.rs\t/^fn helper() {$/;\"\tf\n".into(),
            outputs: Rc::clone(&outputs),
        };
        let controller = NavigationController::new()
            .with_fallback(Some(FallbackGenerator::new(Box::new(generator))));
        let mut editor = FakeEditor::default()
            .with_document(&doc, "// lib\n//\n//\n//\n//\nfn helper() {\n}\n")
            .editing(&source)
            .at(&doc, 0, 0);
        let mut context = NavigationContext::default();
        let mut picker = ScriptedPicker::choosing(None);

        let outcome = controller.jump(
            &mut context,
            &mut editor,
            &mut picker,
            JumpRequest::tag("helper"),
        )?;

        let landed = Location::new(doc.clone(), 5, 0);
        assert_eq!(outcome, JumpOutcome::Jumped(landed.clone()));
        assert_eq!(
            context.history().records(),
            &[Location::new(doc.clone(), 0, 0), landed]
        );
        assert_eq!(outputs.borrow().len(), 1);
        assert!(!outputs.borrow()[0].exists());

        let mut context = NavigationContext::default();
        let missed = controller.jump(
            &mut context,
            &mut editor,
            &mut picker,
            JumpRequest::tag("absent"),
        )?;
        assert_eq!(missed, JumpOutcome::NotFound);
        assert!(context.history().is_empty());
        assert_eq!(outputs.borrow().len(), 2);
        assert!(!outputs.borrow()[1].exists());
        Ok(())
    }

    #[test]
    fn edits_are_recorded_only_while_recording() {
        let mut context = NavigationContext::default();
        context.record_edit(Location::new("a.rs", 1, 0));
        context.record_edit(Location::new("a.rs", 40, 0));
        assert_eq!(context.history().len(), 2);

        context.set_recording(false);
        assert!(context.history().is_empty());
        context.record_edit(Location::new("a.rs", 80, 0));
        assert!(context.history().is_empty());

        context.set_recording(true);
        assert!(context.is_recording());
        context.record_edit(Location::new("a.rs", 80, 0));
        assert_eq!(context.history().len(), 1);

        context.reset();
        assert!(context.history().is_empty());
        assert!(context.is_recording());
    }

    #[test]
    fn identifiers_touching_the_caret() {
        assert_eq!(identifier_at("foo.bar_baz()", 5).as_deref(), Some("bar_baz"));
        assert_eq!(identifier_at("foo.bar_baz()", 11).as_deref(), Some("bar_baz"));
        assert_eq!(identifier_at("foo", 99).as_deref(), Some("foo"));
        assert_eq!(identifier_at("a + b", 2), None);
        assert_eq!(identifier_at("", 0), None);
    }
}
