//! Configuration handling for unipack
//!
//! Configuration is discovered in priority order: an explicit `--config`
//! path, the `UNIPACK_CONFIG` environment variable, `unipack.toml` in the
//! current directory, then `unipack.toml` in the user configuration
//! directory. The first source found wins; sources are not merged.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use etcetera::BaseStrategy;
use serde::Deserialize;

use crate::compiler::TargetOptions;

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV_VAR: &str = "UNIPACK_CONFIG";

/// Name of the configuration file searched for in the project and user
/// configuration directories
pub const CONFIG_FILE_NAME: &str = "unipack.toml";

/// Top-level configuration for a bundling run
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Default output path used when the CLI does not pass one.
    /// When absent the bundle is written to stdout.
    pub output: Option<PathBuf>,

    /// Project root for the import escape policy. Defaults to the entry
    /// file's directory when not set.
    pub project_root: Option<PathBuf>,

    /// Import resolution options
    pub resolve: ResolveOptions,

    /// Target environment options passed to the source compiler
    pub target: TargetOptions,
}

/// Options controlling how dependency specifiers are mapped to files
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveOptions {
    /// Extensions tried, in order, when a specifier does not name an
    /// existing file verbatim
    pub extensions: Vec<String>,

    /// Permit resolved paths outside the project root
    pub allow_outside_root: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            extensions: vec![".js".into(), ".mjs".into()],
            allow_outside_root: false,
        }
    }
}

impl Config {
    /// Load configuration, preferring an explicitly given path
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            log::debug!("using config from {CONFIG_ENV_VAR}={env_path}");
            return Self::from_file(Path::new(&env_path));
        }

        let project_config = PathBuf::from(CONFIG_FILE_NAME);
        if project_config.is_file() {
            return Self::from_file(&project_config);
        }

        if let Some(user_config) = Self::user_config_path()
            && user_config.is_file()
        {
            return Self::from_file(&user_config);
        }

        log::debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Location of the user-level configuration file, if a config directory
    /// can be determined on this platform
    fn user_config_path() -> Option<PathBuf> {
        let strategy = etcetera::choose_base_strategy().ok()?;
        Some(strategy.config_dir().join("unipack").join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_js_extensions() {
        let config = Config::default();
        assert_eq!(config.resolve.extensions, vec![".js", ".mjs"]);
        assert!(!config.resolve.allow_outside_root);
        assert!(config.output.is_none());
    }

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(
            r#"
            output = "dist/bundle.js"
            project_root = "src"

            [resolve]
            extensions = [".js"]
            allow_outside_root = true

            [target]
            use_var = true
            "#,
        )
        .unwrap();
        assert_eq!(config.output, Some(PathBuf::from("dist/bundle.js")));
        assert_eq!(config.project_root, Some(PathBuf::from("src")));
        assert_eq!(config.resolve.extensions, vec![".js"]);
        assert!(config.resolve.allow_outside_root);
        assert!(config.target.use_var);
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: std::result::Result<Config, _> = toml::from_str("unknown_key = true");
        assert!(result.is_err());
    }
}
