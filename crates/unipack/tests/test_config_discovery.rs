use std::fs;
use std::path::PathBuf;

use serial_test::serial;
use tempfile::TempDir;
use unipack::Config;
use unipack::config::CONFIG_ENV_VAR;

/// Scoped guard restoring UNIPACK_CONFIG to its original value on drop,
/// so a failing test cannot leak environment state into the next one
#[must_use = "EnvGuard must be held in scope to ensure cleanup"]
struct EnvGuard {
    original_value: Option<String>,
}

impl EnvGuard {
    fn set(new_value: &str) -> Self {
        let original_value = std::env::var(CONFIG_ENV_VAR).ok();
        // SAFETY: tests touching this variable are serialized and the guard
        // restores the original value on drop.
        unsafe {
            std::env::set_var(CONFIG_ENV_VAR, new_value);
        }
        Self { original_value }
    }

    fn unset() -> Self {
        let original_value = std::env::var(CONFIG_ENV_VAR).ok();
        // SAFETY: as above.
        unsafe {
            std::env::remove_var(CONFIG_ENV_VAR);
        }
        Self { original_value }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: restoring the environment to its pre-test state.
        unsafe {
            match self.original_value.take() {
                Some(original) => std::env::set_var(CONFIG_ENV_VAR, original),
                None => std::env::remove_var(CONFIG_ENV_VAR),
            }
        }
    }
}

#[test]
#[serial]
fn env_var_points_at_config_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("custom.toml");
    fs::write(&config_path, "output = \"from-env.js\"\n").unwrap();

    let _guard = EnvGuard::set(config_path.to_str().unwrap());
    let config = Config::load(None).unwrap();
    assert_eq!(config.output, Some(PathBuf::from("from-env.js")));
}

#[test]
#[serial]
fn explicit_path_beats_env_var() {
    let dir = TempDir::new().unwrap();
    let env_config = dir.path().join("env.toml");
    let explicit_config = dir.path().join("explicit.toml");
    fs::write(&env_config, "output = \"env.js\"\n").unwrap();
    fs::write(&explicit_config, "output = \"explicit.js\"\n").unwrap();

    let _guard = EnvGuard::set(env_config.to_str().unwrap());
    let config = Config::load(Some(&explicit_config)).unwrap();
    assert_eq!(config.output, Some(PathBuf::from("explicit.js")));
}

#[test]
#[serial]
fn missing_env_config_file_is_an_error() {
    let _guard = EnvGuard::set("/nonexistent/unipack.toml");
    assert!(Config::load(None).is_err());
}

#[test]
#[serial]
fn defaults_apply_without_any_config_source() {
    let _guard = EnvGuard::unset();
    let dir = TempDir::new().unwrap();
    let original_dir = std::env::current_dir().unwrap();
    // Run from a directory with no unipack.toml
    std::env::set_current_dir(dir.path()).unwrap();
    let config = Config::load(None);
    std::env::set_current_dir(original_dir).unwrap();
    assert_eq!(config.unwrap(), Config::default());
}
