// ==============================================================================
// send.toml Configuration
// ==============================================================================
//
// Discovers and loads `send.toml` compile settings. Every key is optional;
// command-line flags override whatever the file sets.
//
// Example send.toml:
//
// ```toml
// strategy = "closure"
// introspect_skipped = false
// combination_warning = 32
// max_combinations = 256
// ```

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use send_core::CompileOptions;
use send_ty::Strategy;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "send.toml";

/// Top-level `send.toml` configuration.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SendConfig {
    /// Default call-site strategy: `closure` or `value-object`.
    #[serde(default)]
    pub strategy: Option<String>,

    /// Whether skip-marked methods stay visible to arity/existence queries.
    #[serde(default)]
    pub introspect_skipped: Option<bool>,

    #[serde(default)]
    pub combination_warning: Option<usize>,

    #[serde(default)]
    pub max_combinations: Option<usize>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("could not read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown strategy `{0}`")]
    #[diagnostic(help("use `closure` or `value-object`"))]
    UnknownStrategy(String),
}

/// Walk up from `start_dir` looking for `send.toml`. Returns the first match.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir;
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}

/// Read and parse a `send.toml` file.
pub fn load_config(path: &Path) -> Result<SendConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_strategy(name: &str) -> Result<Strategy, ConfigError> {
    name.parse().map_err(|_| ConfigError::UnknownStrategy(name.to_string()))
}

/// Command-line overrides, applied on top of the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub strategy: Option<Strategy>,
    pub hide_skipped: bool,
    pub combination_warning: Option<usize>,
    pub max_combinations: Option<usize>,
}

impl SendConfig {
    pub fn compile_options(&self, overrides: &Overrides) -> Result<CompileOptions, ConfigError> {
        let mut options = CompileOptions::default();

        if let Some(name) = &self.strategy {
            options.default_strategy = parse_strategy(name)?;
        }
        if let Some(show) = self.introspect_skipped {
            options.introspect_skipped = show;
        }
        if let Some(warning) = self.combination_warning {
            options.combination_warning = warning;
        }
        if self.max_combinations.is_some() {
            options.max_combinations = self.max_combinations;
        }

        if let Some(strategy) = overrides.strategy {
            options.default_strategy = strategy;
        }
        if overrides.hide_skipped {
            options.introspect_skipped = false;
        }
        if let Some(warning) = overrides.combination_warning {
            options.combination_warning = warning;
        }
        if overrides.max_combinations.is_some() {
            options.max_combinations = overrides.max_combinations;
        }

        Ok(options)
    }
}

/// The configuration for `manifest`: an explicit `--config` path, or the
/// nearest `send.toml` above the manifest, or the defaults.
pub fn config_for(manifest: &Path, explicit: Option<&Path>) -> Result<SendConfig, ConfigError> {
    let found = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => manifest.parent().and_then(find_config),
    };

    match found {
        Some(path) => {
            log::debug!("using {}", path.display());
            load_config(&path)
        }
        None => Ok(SendConfig::default()),
    }
}
