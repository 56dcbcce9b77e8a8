//! Configuration module for the declaration reflection engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.declgraph/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DG_` and use double underscores
//! to separate nested levels:
//! - `DG_BUILD__PARALLEL_THREADS=8` sets `build.parallel_threads`
//! - `DG_LAYOUT__POINTER_SIZE=4` sets `layout.pointer_size`
//! - `DG_DEBUG=true` sets `debug`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

static GLOBAL_DEBUG: AtomicBool = AtomicBool::new(false);

/// Turn the process-wide `debug_print!` channel on or off.
pub fn set_global_debug(enabled: bool) {
    GLOBAL_DEBUG.store(enabled, Ordering::Relaxed);
}

pub fn is_global_debug_enabled() -> bool {
    GLOBAL_DEBUG.load(Ordering::Relaxed)
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Per-unit build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Target layout model
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Comment binding settings
    #[serde(default)]
    pub documentation: DocumentationConfig,

    /// Source front-end settings
    #[serde(default)]
    pub frontend: FrontendConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BuildConfig {
    /// Number of worker threads for per-unit builds
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Size of a data pointer in bytes
    #[serde(default = "default_pointer_size")]
    pub pointer_size: u64,

    /// Alignment of a data pointer in bytes
    #[serde(default = "default_pointer_size")]
    pub pointer_align: u64,

    /// Reserve a vtable pointer at offset 0 of polymorphic aggregates
    #[serde(default = "default_true")]
    pub reserve_vptr: bool,

    /// Additional or overriding builtin type layouts, keyed by type name
    #[serde(default)]
    pub types: BTreeMap<String, TypeLayoutSpec>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct TypeLayoutSpec {
    pub size: u64,
    pub align: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DocumentationConfig {
    /// Only bind doc-style comments (`///`, `//!`, `/**`, `/*!`)
    #[serde(default = "default_false")]
    pub doc_comments_only: bool,

    /// Bind same-line trailing comments when no preceding comment exists
    #[serde(default = "default_true")]
    pub attach_trailing: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FrontendConfig {
    /// File extensions handed to the C++ front-end
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_pointer_size() -> u64 {
    8
}
fn default_extensions() -> Vec<String> {
    ["c", "cc", "cpp", "cxx", "h", "hh", "hpp", "hxx"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            debug: false,
            build: BuildConfig::default(),
            layout: LayoutConfig::default(),
            documentation: DocumentationConfig::default(),
            frontend: FrontendConfig::default(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            pointer_size: default_pointer_size(),
            pointer_align: default_pointer_size(),
            reserve_vptr: true,
            types: BTreeMap::new(),
        }
    }
}

impl Default for DocumentationConfig {
    fn default() -> Self {
        Self {
            doc_comments_only: false,
            attach_trailing: true,
        }
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(".declgraph/settings.toml"));
        Self::figment(config_path).extract().map_err(Box::new)
    }

    /// Load configuration from a specific file, still honouring `DG_` overrides
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref().to_path_buf())
            .extract()
            .map_err(Box::new)
    }

    fn figment(config_path: PathBuf) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nesting levels; single underscores stay in names
            .merge(Env::prefixed("DG_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find `.declgraph/settings.toml` from the current directory up to the root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".declgraph");
            if config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Save current configuration to file
    pub fn save(
        &self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }
}
