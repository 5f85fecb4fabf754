//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.storyhost/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bridge::{BridgeConfig, OverflowPolicy};
use crate::core::profile::DisplayProfile;
use crate::storage::DEFAULT_SAVE_PREFIX;
use crate::{Backend, Profile};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StoryhostConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub bridge: BridgeSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub story_path: Option<PathBuf>,
    pub backend: Option<Backend>,
    pub profile: Option<Profile>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    pub root: Option<PathBuf>,
    pub save_prefix: Option<String>,
    pub mount: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BridgeSection {
    pub output_capacity: Option<usize>,
    pub overflow: Option<OverflowPolicy>,
    pub poll_interval_ms: Option<u64>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
pub const STORY_PATH_ENV: &str = "STORYHOST_STORY_PATH";
const DEFAULT_VOLUME_DIR: &str = "volume";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

/// Where the story image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorySource {
    /// The compiled-in demo story.
    Demo,
    /// A story file read fully into memory at startup.
    Path(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub story: StorySource,
    pub backend: Backend,
    pub profile: DisplayProfile,
    pub storage_root: PathBuf,
    pub save_prefix: String,
    pub mount_storage: bool,
    pub bridge: BridgeConfig,
    pub poll_interval: Duration,
}

/// Values given on the command line. `None`/`false` means "not specified".
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub story: Option<PathBuf>,
    pub backend: Option<Backend>,
    pub profile: Option<Profile>,
    pub no_storage: bool,
    pub demo: bool,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns `~/.storyhost`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".storyhost"))
}

/// Returns the path to `~/.storyhost/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load config from `~/.storyhost/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `StoryhostConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<StoryhostConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(StoryhostConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<StoryhostConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(StoryhostConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: StoryhostConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# Storyhost Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# story_path = "zork1.z3"            # Or set STORYHOST_STORY_PATH; omit for the demo story
# backend = "threaded"               # "threaded" or "rtos"
# profile = "desktop"                # "desktop", "rt1050", "rt1170", "rt1170-scaled"

# [storage]
# root = "/home/me/.storyhost/volume" # Directory standing in for the save volume
# save_prefix = "/saves/"
# mount = true                       # false runs without save/restore

# [bridge]
# output_capacity = 8192             # Characters; rtos backend defaults to 2048
# overflow = "evict-oldest"          # "evict-oldest" or "drop-newest"
# poll_interval_ms = 50
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &StoryhostConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, std::env::var(STORY_PATH_ENV).ok())
}

/// [`resolve`] with the story path environment variable passed in.
pub fn resolve_with_env(
    config: &StoryhostConfig,
    cli: &CliOverrides,
    env_story_path: Option<String>,
) -> ResolvedConfig {
    // Story: --demo → CLI path → env → config → compiled-in demo
    let story = if cli.demo {
        StorySource::Demo
    } else {
        cli.story
            .clone()
            .or_else(|| env_story_path.filter(|p| !p.is_empty()).map(PathBuf::from))
            .or_else(|| config.general.story_path.clone())
            .map(StorySource::Path)
            .unwrap_or(StorySource::Demo)
    };

    let backend = cli
        .backend
        .or(config.general.backend)
        .unwrap_or_default();
    let profile = cli
        .profile
        .or(config.general.profile)
        .unwrap_or_default();

    let storage_root = config.storage.root.clone().unwrap_or_else(|| {
        config_dir()
            .map(|d| d.join(DEFAULT_VOLUME_DIR))
            .unwrap_or_else(|| PathBuf::from("storyhost-volume"))
    });

    let defaults = BridgeConfig::for_backend(backend);
    let bridge = BridgeConfig {
        output_capacity: config
            .bridge
            .output_capacity
            .unwrap_or(defaults.output_capacity),
        overflow: config.bridge.overflow.unwrap_or(defaults.overflow),
    };

    ResolvedConfig {
        story,
        backend,
        profile: DisplayProfile::for_target(profile),
        storage_root,
        save_prefix: config
            .storage
            .save_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_SAVE_PREFIX.to_string()),
        mount_storage: !cli.no_storage && config.storage.mount.unwrap_or(true),
        bridge,
        poll_interval: Duration::from_millis(
            config
                .bridge
                .poll_interval_ms
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS)
                .max(1),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::DESKTOP_OUTPUT_CAPACITY;

    #[test]
    fn test_default_config_parses() {
        let config = StoryhostConfig::default();
        assert!(config.general.story_path.is_none());
        assert!(config.bridge.overflow.is_none());
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve_with_env(&StoryhostConfig::default(), &CliOverrides::default(), None);
        assert_eq!(resolved.story, StorySource::Demo);
        assert_eq!(resolved.backend, Backend::Threaded);
        assert_eq!(resolved.profile.name, Profile::Desktop);
        assert_eq!(resolved.save_prefix, DEFAULT_SAVE_PREFIX);
        assert!(resolved.mount_storage);
        assert_eq!(resolved.bridge.output_capacity, DESKTOP_OUTPUT_CAPACITY);
        assert_eq!(resolved.bridge.overflow, OverflowPolicy::EvictOldest);
        assert_eq!(resolved.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_story_path_precedence() {
        let config = StoryhostConfig {
            general: GeneralConfig {
                story_path: Some(PathBuf::from("from-config.z3")),
                ..Default::default()
            },
            ..Default::default()
        };
        let none = CliOverrides::default();

        let resolved = resolve_with_env(&config, &none, None);
        assert_eq!(resolved.story, StorySource::Path("from-config.z3".into()));

        let resolved = resolve_with_env(&config, &none, Some("from-env.z5".to_string()));
        assert_eq!(resolved.story, StorySource::Path("from-env.z5".into()));

        let cli = CliOverrides {
            story: Some(PathBuf::from("from-cli.z8")),
            ..Default::default()
        };
        let resolved = resolve_with_env(&config, &cli, Some("from-env.z5".to_string()));
        assert_eq!(resolved.story, StorySource::Path("from-cli.z8".into()));

        let demo = CliOverrides {
            demo: true,
            ..cli
        };
        let resolved = resolve_with_env(&config, &demo, None);
        assert_eq!(resolved.story, StorySource::Demo);
    }

    #[test]
    fn test_rtos_backend_gets_its_own_capacity() {
        let cli = CliOverrides {
            backend: Some(Backend::Rtos),
            profile: Some(Profile::Rt1050),
            ..Default::default()
        };
        let resolved = resolve_with_env(&StoryhostConfig::default(), &cli, None);
        assert_eq!(
            resolved.bridge.output_capacity,
            crate::bridge::EMBEDDED_OUTPUT_CAPACITY
        );
        assert_eq!(resolved.profile.scrollback_cap, 4096);
    }

    #[test]
    fn test_no_storage_flag_wins_over_config() {
        let config = StoryhostConfig {
            storage: StorageConfig {
                mount: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };
        let cli = CliOverrides {
            no_storage: true,
            ..Default::default()
        };
        assert!(!resolve_with_env(&config, &cli, None).mount_storage);
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
[general]
story_path = "games/zork1.z3"
backend = "rtos"
profile = "rt1170-scaled"

[storage]
root = "/tmp/sdcard"
save_prefix = "/games/"
mount = false

[bridge]
output_capacity = 512
overflow = "drop-newest"
poll_interval_ms = 20
"#;
        let config: StoryhostConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.backend, Some(Backend::Rtos));
        assert_eq!(config.general.profile, Some(Profile::Rt1170Scaled));
        assert_eq!(config.storage.mount, Some(false));

        let resolved = resolve_with_env(&config, &CliOverrides::default(), None);
        assert_eq!(resolved.story, StorySource::Path("games/zork1.z3".into()));
        assert_eq!(resolved.storage_root, PathBuf::from("/tmp/sdcard"));
        assert_eq!(resolved.save_prefix, "/games/");
        assert!(!resolved.mount_storage);
        assert_eq!(resolved.bridge.output_capacity, 512);
        assert_eq!(resolved.bridge.overflow, OverflowPolicy::DropNewest);
        assert_eq!(resolved.poll_interval, Duration::from_millis(20));
    }

    #[test]
    fn test_sparse_toml_parses() {
        // Only override one thing; everything else stays default
        let toml_str = r#"
[bridge]
overflow = "drop-newest"
"#;
        let config: StoryhostConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bridge.overflow, Some(OverflowPolicy::DropNewest));
        assert!(config.general.backend.is_none());
        assert!(config.storage.root.is_none());
    }

    #[test]
    fn test_missing_file_generates_commented_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = load_config_from(&path).unwrap();
        assert!(config.general.story_path.is_none());

        let generated = fs::read_to_string(&path).unwrap();
        assert!(generated.starts_with("# Storyhost Configuration"));
        let reparsed: StoryhostConfig = toml::from_str(&generated).unwrap();
        assert!(reparsed.bridge.output_capacity.is_none());
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[bridge]\noutput_capacity = \"lots\"\n").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    }
}
