//! Engine configuration (§10.2): drawlist builder caps, the constraint
//! resolver's LRU capacity, viewport defaults, and the `validateParams`/
//! `reuseOutputBuffer` toggles, deserialized with `serde` from a TOML file
//! via the `toml` crate. A platform-trait abstraction locates the config
//! file the way the corpus's config crate does; absence of a file is not an
//! error — the engine and its tests run on built-in defaults with no file
//! at all.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use rezi_drawlist::BuilderConfig;
use serde::Deserialize;
use tracing::{info, warn};

/// Platform facts that influence config discovery/interpretation but aren't
/// themselves read from the file. Kept separate from `EngineConfig` so a
/// caller can pass in values it already knows (e.g. from `getCaps`) instead
/// of this crate re-deriving them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlatformTraits {
    pub is_windows: bool,
    pub supports_scroll_region: bool,
}

impl PlatformTraits {
    pub const fn new(is_windows: bool, supports_scroll_region: bool) -> Self {
        Self { is_windows, supports_scroll_region }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct DrawlistLimitsFile {
    pub max_drawlist_bytes: u32,
    pub max_cmd_count: u32,
    pub max_strings: u32,
    pub encoded_string_cache_cap: usize,
    pub validate_params: bool,
    pub reuse_output_buffer: bool,
}

impl Default for DrawlistLimitsFile {
    fn default() -> Self {
        let d = BuilderConfig::default();
        Self {
            max_drawlist_bytes: d.max_drawlist_bytes,
            max_cmd_count: d.max_cmd_count,
            max_strings: d.max_strings,
            encoded_string_cache_cap: d.encoded_string_cache_cap,
            validate_params: d.validate_params,
            reuse_output_buffer: d.reuse_output_buffer,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Capacity of the whole-result-map LRU cache keyed by
    /// `(graph.fingerprint, viewport.w, viewport.h, parent.w, parent.h)`.
    pub cache_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { cache_capacity: 8 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ViewportDefaults {
    /// Used only when the backend cannot report a real terminal size at
    /// startup (e.g. not a tty).
    pub columns: u16,
    pub rows: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    pub drawlist: DrawlistLimitsFile,
    pub resolver: ResolverConfig,
    pub viewport: ViewportDefaults,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            drawlist: DrawlistLimitsFile::default(),
            resolver: ResolverConfig::default(),
            viewport: ViewportDefaults { columns: 80, rows: 24 },
        }
    }
}

/// The engine's typed, defaulted configuration. Always constructible without
/// a file (`EngineConfig::default()`); [`load_from`] is the file-backed
/// entry point a consumer's bootstrap calls instead.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub file: ConfigFile,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { file: ConfigFile::default() }
    }
}

impl EngineConfig {
    pub fn builder_config(&self) -> BuilderConfig {
        let d = self.file.drawlist;
        BuilderConfig {
            max_drawlist_bytes: d.max_drawlist_bytes,
            max_cmd_count: d.max_cmd_count,
            max_strings: d.max_strings,
            encoded_string_cache_cap: d.encoded_string_cache_cap,
            validate_params: d.validate_params,
            reuse_output_buffer: d.reuse_output_buffer,
        }
    }

    pub fn resolver_cache_capacity(&self) -> usize {
        self.file.resolver.cache_capacity
    }

    pub fn default_viewport(&self) -> (u16, u16) {
        (self.file.viewport.columns, self.file.viewport.rows)
    }
}

/// Best-effort config path following platform conventions: a local
/// `rezi.toml` in the working directory takes precedence over the
/// platform config dir, matching the corpus's config crate's discovery
/// order.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("rezi.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("rezi").join("rezi.toml");
    }
    PathBuf::from("rezi.toml")
}

/// Loads config from `path`, or from [`discover`] when `None`. A missing
/// file is not an error — defaults are returned. A malformed file is
/// reported via `anyhow::Context` and surfaces as an error rather than
/// silently falling back, since a present-but-broken file is more likely a
/// typo the user wants to see than a forward-compatible omission.
pub fn load_from(path: Option<PathBuf>) -> Result<EngineConfig> {
    let path = path.unwrap_or_else(discover);
    match fs::read_to_string(&path) {
        Ok(content) => {
            let file: ConfigFile = toml::from_str(&content)
                .with_context(|| format!("parsing config file {}", path.display()))?;
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(EngineConfig { file })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(target: "config", path = %path.display(), "config_file_absent_using_defaults");
            Ok(EngineConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("reading config file {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_builder_config_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.builder_config(), BuilderConfig::default());
        assert_eq!(cfg.resolver_cache_capacity(), 8);
        assert_eq!(cfg.default_viewport(), (80, 24));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_from(Some(PathBuf::from("__rezi_nonexistent__.toml"))).unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn parses_drawlist_limits_and_toggles() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[drawlist]\nmax_drawlist_bytes = 4096\nmax_cmd_count = 64\nmax_strings = 32\n\
             encoded_string_cache_cap = 16\nvalidate_params = false\nreuse_output_buffer = true\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        let b = cfg.builder_config();
        assert_eq!(b.max_drawlist_bytes, 4096);
        assert_eq!(b.max_cmd_count, 64);
        assert_eq!(b.max_strings, 32);
        assert_eq!(b.encoded_string_cache_cap, 16);
        assert!(!b.validate_params);
        assert!(b.reuse_output_buffer);
    }

    #[test]
    fn parses_resolver_and_viewport_sections() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[resolver]\ncache_capacity = 32\n[viewport]\ncolumns = 120\nrows = 40\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.resolver_cache_capacity(), 32);
        assert_eq!(cfg.default_viewport(), (120, 40));
    }

    #[test]
    fn unknown_fields_and_partial_sections_are_tolerated() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[drawlist]\nmax_cmd_count = 10\nfuture_field = true\n").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.builder_config().max_cmd_count, 10);
        assert_eq!(cfg.builder_config().max_strings, BuilderConfig::default().max_strings);
    }

    #[test]
    fn malformed_toml_is_an_error_not_a_silent_default() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "not valid toml [[[").unwrap();
        let err = load_from(Some(tmp.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().contains("parsing config file"));
    }
}
