use anyhow::Result;
use config::EngineConfig;
use std::fs;
use std::path::Path;

use crate::Engine;

pub fn count_sst_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| ext == "sst")
                .unwrap_or(false)
        })
        .count()
}

/// Opens an engine at `dir` with the given flush threshold, `wal_sync`
/// disabled, and every other tunable at its default.
pub fn open_engine(dir: &Path, flush_threshold_bytes: usize) -> Result<Engine> {
    Engine::open(
        dir,
        EngineConfig {
            flush_threshold_bytes,
            wal_sync: false,
            ..EngineConfig::default()
        },
    )
}

/// Opens an engine at `dir` with a small `l0_max_files` so compaction tests
/// don't need dozens of flushes to reach L0 capacity.
pub fn open_engine_with_l0_cap(dir: &Path, flush_threshold_bytes: usize, l0_max_files: usize) -> Result<Engine> {
    Engine::open(
        dir,
        EngineConfig {
            flush_threshold_bytes,
            l0_max_files,
            wal_sync: false,
            ..EngineConfig::default()
        },
    )
}
