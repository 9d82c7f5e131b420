//! # CLI — interactive shell for the storage engine
//!
//! A REPL-style command-line interface. Reads commands from stdin,
//! executes them against the engine, and prints results to stdout.
//! Designed for both interactive use and scripted testing (pipe commands
//! via stdin).
//!
//! ## Commands
//!
//! ```text
//! SET key value   Insert or update a key-value pair
//! GET key         Look up a key (prints value or "(nil)")
//! DEL key         Delete a key (writes a tombstone)
//! FLUSH           Force flush memtable to SSTable
//! COMPACT         Trigger compaction on every level currently over capacity
//! STATS           Print engine debug info
//! EXIT / QUIT     Shut down gracefully
//! ```
//!
//! ## Configuration
//!
//! ```text
//! LSMKV_DATA_DIR      Data directory             (default: "data")
//! LSMKV_FLUSH_BYTES   Flush threshold in bytes   (default: 64 MiB)
//! LSMKV_L0_MAX_FILES  L0 compaction trigger      (default: 4)
//! LSMKV_MAX_LEVELS    Compaction hierarchy depth (default: 7)
//! LSMKV_WAL_SYNC      fsync every WAL append     (default: "true")
//! RUST_LOG            tracing filter directive   (default: "info")
//! ```
use anyhow::Result;
use config::EngineConfig;
use engine::Engine;
use std::io::{self, BufRead, Write};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let data_dir = env_or("LSMKV_DATA_DIR", "data");
    let config = EngineConfig::from_env();

    let mut engine = Engine::open(&data_dir, config)?;

    println!(
        "storage engine started (dir={}, flush={}B, l0_max_files={}, max_levels={}, wal_sync={})",
        data_dir,
        config.flush_threshold_bytes,
        config.l0_max_files,
        config.max_levels,
        config.wal_sync
    );
    println!("Commands: SET key value | GET key | DEL key | FLUSH | COMPACT | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "SET" => {
                    if let Some(k) = parts.next() {
                        let v: String = parts.collect::<Vec<&str>>().join(" ");
                        if v.is_empty() {
                            println!("ERR usage: SET key value");
                        } else {
                            match engine.put(k.as_bytes().to_vec(), v.as_bytes().to_vec()) {
                                Ok(()) => println!("OK"),
                                Err(e) => println!("ERR set failed: {}", e),
                            }
                        }
                    } else {
                        println!("ERR usage: SET key value");
                    }
                }
                "GET" => {
                    if let Some(k) = parts.next() {
                        match engine.get(k.as_bytes()) {
                            Ok(Some(v)) => println!("{}", String::from_utf8_lossy(&v)),
                            Ok(None) => println!("(nil)"),
                            Err(e) => println!("ERR read failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: GET key");
                    }
                }
                "DEL" => {
                    if let Some(k) = parts.next() {
                        match engine.delete(k.as_bytes().to_vec()) {
                            Ok(()) => println!("OK"),
                            Err(e) => println!("ERR del failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: DEL key");
                    }
                }
                "COMPACT" => {
                    let mut result = Ok(());
                    while let Some(level) = engine.should_compact() {
                        if level >= engine.max_levels() - 1 {
                            break;
                        }
                        if let Err(e) = engine.compact(level) {
                            result = Err(e);
                            break;
                        }
                    }
                    match result {
                        Ok(()) => println!("OK ({} sstables)", engine.sstable_count()),
                        Err(e) => println!("ERR compact failed: {}", e),
                    }
                }
                "FLUSH" => match engine.force_flush() {
                    Ok(()) => println!("OK ({} sstables)", engine.sstable_count()),
                    Err(e) => println!("ERR flush failed: {}", e),
                },
                "STATS" => {
                    println!("{:?}", engine);
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => {
                    println!("unknown command: {}", other);
                }
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    engine.close()?;
    Ok(())
}
