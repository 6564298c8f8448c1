//! Configuration management utilities.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::app::history::HistoryOptions;
use crate::app::sources::ProjectSources;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".tagnav/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub history: HistoryOptions,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub generator: Generator,
    /// Per-project settings keyed by project root.
    #[serde(default)]
    pub projects: BTreeMap<PathBuf, ProjectConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default = "Tags::default_file_name")]
    pub file_name: String,
    /// Tag files searched for every lookup, after project sources.
    #[serde(default)]
    pub global: Vec<PathBuf>,
}

impl Tags {
    fn default_file_name() -> String {
        "tags".into()
    }
}

impl Default for Tags {
    fn default() -> Self {
        Self {
            file_name: Self::default_file_name(),
            global: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generator {
    #[serde(default = "Generator::default_program")]
    pub program: String,
    /// Options used when tagging a single file for fallback lookups.
    #[serde(default = "Generator::default_file_options")]
    pub file_options: String,
    /// Options used when tagging a whole project.
    #[serde(default = "Generator::default_project_options")]
    pub project_options: String,
    #[serde(default = "Generator::default_api_file_name")]
    pub api_file_name: String,
}

impl Generator {
    fn default_program() -> String {
        "ctags".into()
    }

    fn default_file_options() -> String {
        "--sort=yes".into()
    }

    fn default_project_options() -> String {
        "-R --sort=yes".into()
    }

    fn default_api_file_name() -> String {
        "api".into()
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            program: Self::default_program(),
            file_options: Self::default_file_options(),
            project_options: Self::default_project_options(),
            api_file_name: Self::default_api_file_name(),
        }
    }
}

/// One tag file or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl OneOrMany {
    pub fn to_vec(&self) -> Vec<PathBuf> {
        match self {
            OneOrMany::One(path) => vec![path.clone()],
            OneOrMany::Many(paths) => paths.clone(),
        }
    }
}

/// Option string for a generator: either fixed text or computed on each use.
#[derive(Clone)]
pub enum CommandSource {
    Fixed(String),
    Dynamic(Arc<dyn Fn() -> String + Send + Sync>),
}

impl CommandSource {
    pub fn dynamic(f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        CommandSource::Dynamic(Arc::new(f))
    }

    pub fn resolve(&self) -> String {
        match self {
            CommandSource::Fixed(text) => text.clone(),
            CommandSource::Dynamic(f) => f(),
        }
    }
}

impl fmt::Debug for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandSource::Fixed(text) => f.debug_tuple("Fixed").field(text).finish(),
            CommandSource::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl PartialEq for CommandSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CommandSource::Fixed(a), CommandSource::Fixed(b)) => a == b,
            (CommandSource::Dynamic(a), CommandSource::Dynamic(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for CommandSource {
    fn from(value: &str) -> Self {
        CommandSource::Fixed(value.to_owned())
    }
}

impl Serialize for CommandSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.resolve())
    }
}

impl<'de> Deserialize<'de> for CommandSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(CommandSource::Fixed)
    }
}

/// Settings that apply to a single project root.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Extra tag files, relative to the project root unless absolute.
    #[serde(default)]
    pub tags: Option<OneOrMany>,
    /// Replaces `generator.project_options` for this project.
    #[serde(default)]
    pub options: Option<CommandSource>,
    /// Command producing the api file; the built-in generator is used when unset.
    #[serde(default)]
    pub api_command: Option<CommandSource>,
}

/// One config file as written: unset keys stay `None` so they do not mask earlier layers.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigLayer {
    #[serde(default)]
    history: HistoryLayer,
    #[serde(default)]
    tags: TagsLayer,
    #[serde(default)]
    generator: GeneratorLayer,
    #[serde(default)]
    projects: BTreeMap<PathBuf, ProjectConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct HistoryLayer {
    min_line_distance: Option<usize>,
    max_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TagsLayer {
    file_name: Option<String>,
    #[serde(default)]
    global: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GeneratorLayer {
    program: Option<String>,
    file_options: Option<String>,
    project_options: Option<String>,
    api_file_name: Option<String>,
}

impl ConfigLayer {
    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse TOML config")
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    program: Option<String>,
    tag_file: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            program: env::var("TAGNAV_CTAGS").ok(),
            tag_file: env::var("TAGNAV_TAG_FILE").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(program: &str, tag_file: &str) -> Self {
        Self {
            program: Some(program.to_owned()),
            tag_file: Some(tag_file.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env
    /// overrides. The workspace layer lives under `project_root` when one is known.
    pub fn load(project_root: Option<&Path>) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = project_root.map(|root| root.join(DEFAULT_WORKSPACE_CONFIG_PATH));
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers = vec![ConfigLayer::from_str(&DEFAULT_CONFIG)?];

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(ConfigLayer::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(ConfigLayer::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().fold(Config::default(), Config::merge);
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn merge(mut self, layer: ConfigLayer) -> Self {
        let history = layer.history;
        if let Some(value) = history.min_line_distance {
            self.history.min_line_distance = value;
        }
        if let Some(value) = history.max_size {
            self.history.max_size = value;
        }

        if let Some(file_name) = layer.tags.file_name {
            self.tags.file_name = file_name;
        }
        for path in layer.tags.global {
            if !self.tags.global.contains(&path) {
                self.tags.global.push(path);
            }
        }

        let generator = layer.generator;
        let target = &mut self.generator;
        for (slot, value) in [
            (&mut target.program, generator.program),
            (&mut target.file_options, generator.file_options),
            (&mut target.project_options, generator.project_options),
            (&mut target.api_file_name, generator.api_file_name),
        ] {
            if let Some(value) = value {
                *slot = value;
            }
        }

        self.projects.extend(layer.projects);
        self
    }

    /// Configured tag files per project root, in declaration order.
    pub fn project_sources(&self) -> ProjectSources {
        self.projects
            .iter()
            .filter_map(|(root, project)| {
                project
                    .tags
                    .as_ref()
                    .map(|tags| (root.clone(), tags.to_vec()))
            })
            .collect()
    }

    /// Project settings registered for `root`, if any.
    pub fn project(&self, root: &Path) -> Option<&ProjectConfig> {
        self.projects.get(root)
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("tagnav/config.toml"))
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(program) = env.program {
        config.generator.program = program;
    }
    if let Some(tag_file) = env.tag_file {
        config.tags.file_name = tag_file;
    }
    config
}
