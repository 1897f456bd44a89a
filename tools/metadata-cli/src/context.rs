//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use edge_core::ServiceConfig;

use crate::output::Output;

/// Config file names searched from the working directory upwards.
const CONFIG_NAMES: [&str; 2] = ["pkgmeta.toml", ".pkgmeta.toml"];

/// Prefix of environment variables read when no config file is found.
const ENV_PREFIX: &str = "PKGMETA_";

/// Where the effective configuration came from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    File(PathBuf),
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Environment => write!(f, "environment ({}*)", ENV_PREFIX),
        }
    }
}

/// Execution context for CLI commands.
pub struct Context {
    /// Service configuration.
    pub config: ServiceConfig,
    /// Where `config` was loaded from.
    pub source: ConfigSource,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from a config file, a discovered file, or the environment.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let path = match config_path {
            Some(path) => Some(resolve(&cwd, path)),
            None => Self::find_config(&cwd),
        };

        let (config, source) = match path {
            Some(path) => {
                let config = ServiceConfig::load(&path)
                    .with_context(|| format!("Failed to load config: {}", path.display()))?;
                (config, ConfigSource::File(path))
            }
            None => {
                let config = ServiceConfig::from_lookup(env_lookup)
                    .context("Invalid configuration in environment")?;
                (config, ConfigSource::Environment)
            }
        };
        output.debug(&format!("Config loaded from {}", source));

        Ok(Self {
            config,
            source,
            output,
            cwd,
        })
    }

    /// Find a config file in the directory tree.
    fn find_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            for name in CONFIG_NAMES {
                let candidate = current.join(name);
                if candidate.exists() {
                    return Some(candidate);
                }
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        resolve(&self.cwd, path)
    }
}

fn resolve(cwd: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

/// `list_page_size` is read from `PKGMETA_LIST_PAGE_SIZE`, and so on.
fn env_lookup(name: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, name.to_ascii_uppercase())).ok()
}
