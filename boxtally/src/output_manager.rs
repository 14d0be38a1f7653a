//! Output path management shared by all commands.
//!
//! - Outputs land next to the input log with a suffix, or under `--output-dir`
//!   with a clean name
//! - Auxiliary files always carry their suffix
//! - Basename collisions across several logs are refused unless `--force`

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::ToolConfig;

/// Suffix of the scaled NDJSON written by `parse`
pub const SCALED_SUFFIX: &str = "scaled";
/// Suffix of the statistics JSON written by `stats --save`
pub const STATS_SUFFIX: &str = "stats";

/// Whether a file name looks like something boxtally wrote next to a log
pub fn is_generated_output(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| {
            [SCALED_SUFFIX, STATS_SUFFIX]
                .iter()
                .any(|suffix| stem.ends_with(&format!("_{suffix}")))
        })
        .unwrap_or(false)
}

pub struct OutputManager<'a> {
    config: &'a dyn ToolConfig,
    input_path: &'a Path,
}

impl<'a> OutputManager<'a> {
    pub fn new(config: &'a dyn ToolConfig, input_path: &'a Path) -> Self {
        Self { config, input_path }
    }

    fn input_stem(&self) -> &str {
        self.input_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output")
    }

    fn place(&self, output_filename: &str) -> Result<PathBuf> {
        let output_path = if let Some(output_dir) = &self.config.base().output_dir {
            let output_dir = Path::new(output_dir);
            std::fs::create_dir_all(output_dir)?;
            output_dir.join(output_filename)
        } else {
            self.input_path
                .parent()
                .unwrap_or(Path::new("."))
                .join(output_filename)
        };

        if output_path == self.input_path {
            return Err(anyhow::anyhow!(
                "Refusing to overwrite input log {}",
                self.input_path.display()
            ));
        }

        Ok(output_path)
    }

    /// Primary output: `<stem>_<suffix>.<ext>` beside the log, `<stem>.<ext>` in an output dir
    pub fn generate_main_output_path(
        &self,
        default_suffix: &str,
        extension: &str,
    ) -> Result<PathBuf> {
        let input_stem = self.input_stem();
        let output_filename = if self.config.base().output_dir.is_some() {
            format!("{input_stem}.{extension}")
        } else {
            format!("{input_stem}_{default_suffix}.{extension}")
        };
        self.place(&output_filename)
    }

    /// Auxiliary output, always `<stem>_<suffix>.<ext>`
    pub fn generate_auxiliary_output(&self, suffix: &str, extension: &str) -> Result<PathBuf> {
        let input_stem = self.input_stem();
        self.place(&format!("{input_stem}_{suffix}.{extension}"))
    }

    /// Metadata sidecar for this log
    pub fn metadata_path(&self) -> Result<PathBuf> {
        crate::metadata::get_metadata_path(
            self.input_path,
            self.config.base().output_dir.as_deref(),
        )
    }
}

/// Make a file path relative to a TOML file (used for metadata)
pub fn make_path_relative_to_toml(file_path: &Path, toml_path: &Path) -> String {
    toml_path
        .parent()
        .and_then(|toml_dir| file_path.strip_prefix(toml_dir).ok())
        .map(|rel_path| rel_path.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|| file_path.to_string_lossy().to_string())
}

/// Stems shared by more than one log when all outputs go to one directory.
///
/// Logs written next to themselves never collide, so this is only relevant
/// with an output directory.
pub fn find_stem_collisions(logs: &[PathBuf]) -> BTreeMap<String, Vec<PathBuf>> {
    let mut by_stem: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for log in logs {
        let stem = log
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        by_stem.entry(stem).or_default().push(log.clone());
    }
    by_stem.retain(|_, paths| paths.len() > 1);
    by_stem
}

/// Fail on collisions unless `force` is set, in which case they are only logged.
pub fn check_output_collisions(config: &dyn ToolConfig, logs: &[PathBuf]) -> Result<()> {
    if config.base().output_dir.is_none() {
        return Ok(());
    }

    let collisions = find_stem_collisions(logs);
    if collisions.is_empty() {
        return Ok(());
    }

    let listing = collisions
        .iter()
        .map(|(stem, paths)| {
            let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
            format!("  {stem}: {}", paths.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n");

    if config.base().force {
        log::warn!(
            "{}Outputs for logs sharing a name will overwrite each other:\n{listing}",
            crate::color_utils::symbols::warning()
        );
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Several logs would write to the same output file (use --force to allow):\n{listing}"
        ))
    }
}
