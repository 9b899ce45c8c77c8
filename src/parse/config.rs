use anyhow::{bail, Context};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::PathBuf, str::FromStr};

/// Printed by webpack-dev-server once the first bundle compiled.
pub const READY_MARKER: &str = "webpack: Compiled successfully.";

/// Startup banners whose first occurrence is hidden from the console.
pub const SUPPRESSED_BANNERS: [&str; 2] = ["Project is running at ", "webpack output is served from "];

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: PartialEq> OneOrMany<T> {
    pub fn contains(&self, value: &T) -> bool {
        match self {
            OneOrMany::One(expected) => expected == value,
            OneOrMany::Many(expected_list) => expected_list.contains(value),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RestartPolicy {
    Always,
    Never,
    Unexpected,
}


#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ToolConfig {
    pub bin: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub args: Vec<String>,
    pub windows_runner: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub file: String,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file: String::from("devserver-supervisor.log"),
            level: String::from("info"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LauncherConfig {
    pub label: String,
    pub project_dir: PathBuf,
    pub tool: ToolConfig,
    pub env: HashMap<String, String>,
    pub ready_marker: String,
    pub suppress_once: Vec<String>,
    pub autorestart: RestartPolicy,
    pub exitcodes: OneOrMany<i32>,
    pub startretries: usize,
    pub restart_delay_ms: u64,
    pub stopsignal: String,
    pub stoptime: u64,
    pub log: LogConfig,
    pub shell: bool,
    pub timestamps: bool,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            label: String::from("Renderer"),
            project_dir: PathBuf::from("."),
            tool: ToolConfig::default(),
            env: HashMap::new(),
            ready_marker: READY_MARKER.to_string(),
            suppress_once: SUPPRESSED_BANNERS.iter().map(|s| s.to_string()).collect(),
            autorestart: RestartPolicy::Unexpected,
            exitcodes: OneOrMany::One(0),
            startretries: 3,
            restart_delay_ms: 500,
            stopsignal: String::from("TERM"),
            stoptime: 5,
            log: LogConfig::default(),
            shell: false,
            timestamps: true,
        }
    }
}

impl LauncherConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.label.trim().is_empty() {
            bail!("label must not be empty");
        }
        if self.ready_marker.is_empty() {
            bail!("ready_marker must not be empty");
        }
        if let Some(idx) = self.suppress_once.iter().position(|p| p.is_empty()) {
            bail!("suppress_once[{}] must not be empty", idx);
        }
        tracing::Level::from_str(&self.log.level)
            .map_err(|_| anyhow::anyhow!("unknown log level `{}`", self.log.level))?;
        Ok(())
    }
}




/*
    @@@
    @parser();
    . Reads the YAML config file into a String; I/O errors carry the path as context.
    . Hands the text to parse_str(), which deserializes and validates it.
*/
pub fn parser(path: &str) -> anyhow::Result<LauncherConfig> {
    let yaml_file = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file `{}`", path))?;
    parse_str(&yaml_file).with_context(|| format!("invalid config file `{}`", path))
}

pub fn parse_str(yaml: &str) -> anyhow::Result<LauncherConfig> {
    // an empty document means "all defaults"
    let parsed_config: LauncherConfig = if yaml.trim().is_empty() {
        LauncherConfig::default()
    } else {
        serde_yaml::from_str(yaml)?
    };
    parsed_config.validate()?;
    Ok(parsed_config)
}
