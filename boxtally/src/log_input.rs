use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::color_utils::symbols;
use crate::output_manager::is_generated_output;

/// File names the capture tooling writes its inference logs under
pub const KNOWN_LOG_NAMES: [&str; 2] = ["debug_inference_out.json", "sampling_inference_out.json"];

/// Configuration for log collection behavior
#[derive(Debug, Clone)]
pub struct LogInputConfig {
    pub require_glob_matches: bool,
    pub strict_mode: bool,
}

impl Default for LogInputConfig {
    fn default() -> Self {
        Self::strict()
    }
}

impl LogInputConfig {
    pub fn strict() -> Self {
        Self {
            strict_mode: true,
            require_glob_matches: true,
        }
    }

    pub fn permissive() -> Self {
        Self {
            strict_mode: false,
            require_glob_matches: false,
        }
    }

    /// If strict=true, uses strict mode; if strict=false, uses permissive mode
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            Self::strict()
        } else {
            Self::permissive()
        }
    }
}

/// Check if a file looks like a debug inference log (`.json` / `.jsonl` / `.ndjson`)
pub fn is_log_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            matches!(
                ext.to_string_lossy().to_lowercase().as_str(),
                "json" | "jsonl" | "ndjson"
            )
        })
        .unwrap_or(false)
}

/// Find the logs inside a capture directory (non-recursive).
///
/// A directory holding one of the known log names yields just those; otherwise
/// every log-like file directly inside is returned, except outputs written by
/// earlier runs.
pub fn find_logs_in_directory(dir_path: &Path) -> Result<Vec<PathBuf>> {
    let known: Vec<PathBuf> = KNOWN_LOG_NAMES
        .iter()
        .map(|name| dir_path.join(name))
        .filter(|path| path.is_file())
        .collect();
    if !known.is_empty() {
        return Ok(known);
    }

    let mut log_files = Vec::new();
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        if !path.is_file() || !is_log_file(&path) {
            continue;
        }
        if is_generated_output(&path) {
            log::debug!("Ignoring earlier output {}", path.display());
            continue;
        }
        log_files.push(path);
    }

    log_files.sort();
    Ok(log_files)
}

/// Collect debug logs from files, capture directories, or glob patterns
pub fn collect_logs_from_sources(
    sources: &[String],
    config: &LogInputConfig,
) -> Result<Vec<PathBuf>> {
    let mut all_logs = Vec::new();

    for source in sources {
        let source_path = Path::new(source);

        if source_path.is_file() {
            if is_log_file(source_path) {
                all_logs.push(source_path.to_path_buf());
            } else if config.strict_mode {
                return Err(anyhow::anyhow!(
                    "File is not a debug log (expected .json, .jsonl or .ndjson): {}",
                    source_path.display()
                ));
            }
        } else if source_path.is_dir() {
            let dir_logs = find_logs_in_directory(source_path)?;
            if dir_logs.is_empty() {
                log::warn!(
                    "{}No debug logs found in {}",
                    symbols::warning(),
                    source_path.display()
                );
            }
            all_logs.extend(dir_logs);
        } else if !source.contains('*') && !source.contains('?') && !source.contains('[') {
            if config.strict_mode {
                return Err(anyhow::anyhow!("File does not exist: {}", source));
            }
            log::warn!("{}File does not exist: {}", symbols::warning(), source);
        } else {
            match glob::glob(source) {
                Ok(paths) => {
                    let mut found_any = false;
                    for path_result in paths {
                        match path_result {
                            Ok(path) => {
                                if path.is_file() && is_log_file(&path) {
                                    all_logs.push(path);
                                    found_any = true;
                                }
                            }
                            Err(e) => {
                                log::warn!(
                                    "{}Error reading path in glob {source}: {e}",
                                    symbols::warning()
                                );
                            }
                        }
                    }
                    if !found_any && config.require_glob_matches {
                        return Err(anyhow::anyhow!(
                            "No debug logs found matching pattern: {}",
                            source
                        ));
                    }
                }
                Err(_) => {
                    if config.strict_mode {
                        return Err(anyhow::anyhow!(
                            "Source path does not exist and is not a valid glob pattern: {}",
                            source
                        ));
                    }
                    log::warn!("{}Source path does not exist: {}", symbols::warning(), source);
                }
            }
        }
    }

    all_logs.sort();
    all_logs.dedup();

    if all_logs.is_empty() && config.strict_mode {
        return Err(anyhow::anyhow!("No debug logs found in the specified sources"));
    }

    Ok(all_logs)
}
