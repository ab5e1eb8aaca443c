//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/domkit/domkit.toml`
//! 3. Local config: `<project_dir>/.domkit.toml`
//! 4. Environment variables: `DOMKIT_*` prefix

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::Markers;

/// How built nodes are printed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Serialized HTML markup
    #[default]
    Html,
    /// Indented node tree
    Tree,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Html => write!(f, "html"),
            OutputFormat::Tree => write!(f, "tree"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(OutputFormat::Html),
            "tree" => Ok(OutputFormat::Tree),
            other => Err(ApplicationError::Config {
                message: format!("unknown output format '{}', expected html or tree", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Colored status messages
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Html,
            color: true,
        }
    }
}

/// Raw markers for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawMarkers {
    pub text: Option<String>,
    pub children: Option<String>,
    pub tagname: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawOutputConfig {
    pub format: Option<OutputFormat>,
    pub color: Option<bool>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub markers: RawMarkers,
    pub output: RawOutputConfig,
}

/// Unified configuration for domkit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Reserved descriptor key names
    pub markers: Markers,
    pub output: OutputConfig,
}

/// Get the XDG config directory for domkit.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "domkit").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("domkit.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".domkit.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Merge overlay config onto self (base): overlay wins if specified.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let pick = |over: &Option<String>, base: &String| over.clone().unwrap_or_else(|| base.clone());
        Self {
            markers: Markers {
                text: pick(&overlay.markers.text, &self.markers.text),
                children: pick(&overlay.markers.children, &self.markers.children),
                tagname: pick(&overlay.markers.tagname, &self.markers.tagname),
            },
            output: OutputConfig {
                format: overlay.output.format.unwrap_or(self.output.format),
                color: overlay.output.color.unwrap_or(self.output.color),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory for local config
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), project_dir)
    }

    /// Same as [`Settings::load`] with an explicit global config path.
    pub fn load_from(
        global_path: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_path {
            if global_path.exists() {
                let raw = load_raw_settings(global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Project config
        if let Some(project) = project_dir {
            let local_path = project_config_path(project);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.validate()?;
        Ok(current)
    }

    /// Apply DOMKIT_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("DOMKIT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("markers.text") {
            settings.markers.text = val;
        }
        if let Ok(val) = config.get_string("markers.children") {
            settings.markers.children = val;
        }
        if let Ok(val) = config.get_string("markers.tagname") {
            settings.markers.tagname = val;
        }
        if let Ok(val) = config.get_string("output.format") {
            settings.output.format = val.parse()?;
        }
        if let Ok(val) = config.get_bool("output.color") {
            settings.output.color = val;
        }

        Ok(settings)
    }

    /// Markers must be non-empty and pairwise distinct.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let Markers {
            text,
            children,
            tagname,
        } = &self.markers;
        if text.is_empty() || children.is_empty() || tagname.is_empty() {
            return Err(ApplicationError::Config {
                message: "markers must not be empty".into(),
            });
        }
        if text == children || text == tagname || children == tagname {
            return Err(ApplicationError::Config {
                message: format!(
                    "markers must be distinct: text={}, children={}, tagname={}",
                    text, children, tagname
                ),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r##"# domkit configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/domkit/domkit.toml
#   Local:  <project_dir>/.domkit.toml
#   Env:    DOMKIT_* environment variables, e.g. DOMKIT_OUTPUT__FORMAT=tree

[markers]
# Key (or tagname value) that produces a text node
# text = "#text"

# Key holding the child descriptors of an element with settings
# children = "children"

# Explicit tag field, required under numeric keys
# tagname = "tagname"

[output]
# Output format of `domkit build`: "html" or "tree"
# format = "html"

# Colored status messages
# color = true
"##
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
