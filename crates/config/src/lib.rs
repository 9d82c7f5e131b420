//! Engine tunables and their environment-variable overrides.
//!
//! The engine crate itself never touches environment variables — it only
//! accepts an [`EngineConfig`] at `open`. Parsing `LSMKV_*` variables is a
//! concern of whatever binary embeds the engine (the `cli` crate).

/// Storage engine tunables.
///
/// Defaults match the reference implementation's compile-time constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// MemTable size, in bytes, at which a flush to a new L0 SSTable is
    /// triggered. Default: 64 MiB.
    pub flush_threshold_bytes: usize,
    /// Number of files at level 0 that triggers compaction into level 1.
    /// Default: 4.
    pub l0_max_files: usize,
    /// Number of levels in the compaction hierarchy. Default: 7.
    pub max_levels: usize,
    /// If true, every WAL append is followed by `fsync`. Default: true.
    pub wal_sync: bool,
}

impl EngineConfig {
    /// Builds a config from `LSMKV_FLUSH_BYTES`, `LSMKV_L0_MAX_FILES`,
    /// `LSMKV_MAX_LEVELS`, and `LSMKV_WAL_SYNC`, falling back to
    /// [`EngineConfig::default`] for any variable that is absent or fails
    /// to parse.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            flush_threshold_bytes: env_parsed("LSMKV_FLUSH_BYTES", default.flush_threshold_bytes),
            l0_max_files: env_parsed("LSMKV_L0_MAX_FILES", default.l0_max_files),
            max_levels: env_parsed("LSMKV_MAX_LEVELS", default.max_levels),
            wal_sync: env_parsed("LSMKV_WAL_SYNC", default.wal_sync),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flush_threshold_bytes: 64 * 1024 * 1024,
            l0_max_files: 4,
            max_levels: 7,
            wal_sync: true,
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
