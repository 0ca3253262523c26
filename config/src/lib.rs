//! Veil Configuration
//!
//! Shared configuration crate for Veil components.
//!
//! Handles loading configuration from:
//! 1. VEIL_CONFIG env var (explicit path)
//! 2. ./veil.toml (current directory)
//! 3. ~/.veil/veil.toml (user home)
//!
//! Missing files fall back to defaults; a present file only needs the keys
//! it wants to override.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::{env, fs};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<VeilConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "veil.toml";
const CONFIG_DIR_NAME: &str = ".veil";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_TREE_DEPTH: usize = 16;
const DEFAULT_DB_PATH: &str = "./veil-db";
const DEFAULT_SHIELD_BP: u64 = 25;
const DEFAULT_UNSHIELD_BP: u64 = 25;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VeilConfig {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub fees: FeesConfig,
}

/// Pool/state configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Accumulator tree depth (2^depth commitments per instance)
    #[serde(default = "default_tree_depth")]
    pub tree_depth: usize,
    /// RocksDB path for persisted pool state
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            tree_depth: DEFAULT_TREE_DEPTH,
            db_path: DEFAULT_DB_PATH.to_string(),
        }
    }
}

/// Fee configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeesConfig {
    /// Basis points charged on shields
    #[serde(default = "default_shield_bp")]
    pub shield_bp: u64,
    /// Basis points charged on unshields
    #[serde(default = "default_unshield_bp")]
    pub unshield_bp: u64,
    /// Hex-encoded 32-byte fee recipient address
    #[serde(default = "default_recipient")]
    pub recipient: String,
}

impl Default for FeesConfig {
    fn default() -> Self {
        Self {
            shield_bp: DEFAULT_SHIELD_BP,
            unshield_bp: DEFAULT_UNSHIELD_BP,
            recipient: default_recipient(),
        }
    }
}

fn default_tree_depth() -> usize {
    DEFAULT_TREE_DEPTH
}
fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}
fn default_shield_bp() -> u64 {
    DEFAULT_SHIELD_BP
}
fn default_unshield_bp() -> u64 {
    DEFAULT_UNSHIELD_BP
}
fn default_recipient() -> String {
    "00".repeat(32)
}

// ============================================================================
// Loading
// ============================================================================

impl VeilConfig {
    /// Load configuration from the first location that exists.
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::config_path() {
            log::info!("loading config from {}", path.display());
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config: Self = toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            log::info!("no config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load once and cache in GLOBAL_CONFIG.
    pub fn global() -> &'static Self {
        GLOBAL_CONFIG.get_or_init(|| Self::load().unwrap_or_default())
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(explicit) = env::var("VEIL_CONFIG") {
            let path = PathBuf::from(explicit);
            if path.exists() {
                return Some(path);
            }
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user = home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
            if user.exists() {
                return Some(user);
            }
        }

        None
    }
}
