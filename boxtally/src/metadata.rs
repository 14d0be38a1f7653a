use anyhow::Result;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata sidecar for one debug log; each command owns its own section
#[derive(Serialize, Deserialize, Default, Debug)]
pub struct BoxtallyMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse: Option<ToolSections>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ToolSections>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay: Option<ToolSections>,
}

impl BoxtallyMetadata {
    /// Replace the section belonging to `tool_name`
    pub fn set_section(&mut self, tool_name: &str, sections: ToolSections) -> Result<()> {
        match tool_name {
            "parse" => self.parse = Some(sections),
            "stats" => self.stats = Some(sections),
            "replay" => self.replay = Some(sections),
            _ => return Err(anyhow::anyhow!("Unknown tool name: {tool_name}")),
        }
        Ok(())
    }
}

/// All sections written by one command
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ToolSections {
    // Core results sit at the top of the section
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub core: Option<toml::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<toml::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<InputProcessing>,
}

/// Execution context for a command invocation
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ExecutionContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boxtally_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_line: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boxtally_env_vars: Option<HashMap<String, String>>,
}

/// What was read to produce the results
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct InputProcessing {
    pub log_path: String,
    pub strict_mode: bool,
    pub records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_height: Option<u32>,
}

/// Load existing metadata from a file, or create new empty metadata
pub fn load_or_create_metadata(path: &Path) -> Result<BoxtallyMetadata> {
    if !path.exists() {
        return Ok(BoxtallyMetadata::default());
    }

    let content = fs::read_to_string(path)?;
    match toml::from_str::<BoxtallyMetadata>(&content) {
        Ok(metadata) => Ok(metadata),
        Err(e) => {
            let colored_error = crate::color_utils::colors::warning_level(&e.to_string());
            warn!(
                "{}Dropping existing metadata from {}:\n{}",
                crate::color_utils::symbols::warning(),
                path.display(),
                colored_error
            );
            Ok(BoxtallyMetadata::default())
        }
    }
}

/// Save metadata to a file
pub fn save_metadata(metadata: &BoxtallyMetadata, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let toml_content = toml::to_string_pretty(metadata).map_err(|e| {
        log::debug!("Failed to serialize metadata: {metadata:#?}");
        anyhow::anyhow!("Failed to serialize metadata to TOML: {e}")
    })?;

    fs::write(path, toml_content)?;
    Ok(())
}

/// Metadata file path for a log: `<stem>.boxtally.toml`
pub fn get_metadata_path(input_path: &Path, output_dir: Option<&str>) -> Result<PathBuf> {
    let input_stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid input filename"))?;

    let metadata_filename = format!("{input_stem}.boxtally.toml");

    let metadata_path = if let Some(output_dir) = output_dir {
        Path::new(output_dir).join(metadata_filename)
    } else {
        input_path
            .parent()
            .unwrap_or(Path::new("."))
            .join(metadata_filename)
    };

    Ok(metadata_path)
}

/// Collect all BOXTALLY_* environment variables that are present and non-empty
pub fn collect_boxtally_env_vars() -> Option<HashMap<String, String>> {
    let vars: HashMap<String, String> = std::env::vars()
        .filter(|(key, value)| key.starts_with("BOXTALLY_") && !value.is_empty())
        .collect();

    if vars.is_empty() {
        None
    } else {
        Some(vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_toml_structure() {
        let mut metadata = BoxtallyMetadata::default();
        metadata
            .set_section(
                "stats",
                ToolSections {
                    core: Some(
                        toml::toml! {
                            frames = 12
                            objects = 30
                        }
                        .into(),
                    ),
                    config: Some(
                        toml::toml! {
                            format = "table"
                            per_log = false
                        }
                        .into(),
                    ),
                    execution: Some(ExecutionContext {
                        timestamp: Some(Utc::now()),
                        boxtally_version: Some("0.1.0".to_string()),
                        command_line: Some(vec!["stats".to_string(), "log.json".to_string()]),
                        exit_code: Some(0),
                        processing_time_ms: Some(12.5),
                        boxtally_env_vars: None,
                    }),
                    input: Some(InputProcessing {
                        log_path: "/captures/debug_inference_out.json".to_string(),
                        strict_mode: true,
                        records: 12,
                        image_width: Some(1920),
                        image_height: Some(1080),
                    }),
                },
            )
            .unwrap();

        let toml_output = toml::to_string_pretty(&metadata).unwrap();
        assert!(toml_output.contains("[stats.execution]"));
        assert!(toml_output.contains("frames = 12"));

        let parsed: BoxtallyMetadata = toml::from_str(&toml_output).unwrap();
        let stats = parsed.stats.unwrap();
        assert!(stats.config.is_some());
        assert_eq!(stats.input.unwrap().image_width, Some(1920));
        assert!(parsed.parse.is_none());
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        let mut metadata = BoxtallyMetadata::default();
        assert!(metadata
            .set_section("cutout", ToolSections::default())
            .is_err());
    }

    #[test]
    fn test_get_metadata_path() {
        let input_path = Path::new("/captures/run1/debug_inference_out.json");
        let metadata_path = get_metadata_path(input_path, None).unwrap();
        assert_eq!(
            metadata_path,
            Path::new("/captures/run1/debug_inference_out.boxtally.toml")
        );

        let with_output = get_metadata_path(input_path, Some("/output")).unwrap();
        assert_eq!(
            with_output,
            Path::new("/output/debug_inference_out.boxtally.toml")
        );
    }

    #[test]
    fn test_corrupt_metadata_is_replaced() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("log.boxtally.toml");
        fs::write(&path, "this is [not toml").unwrap();

        let metadata = load_or_create_metadata(&path).unwrap();
        assert!(metadata.stats.is_none());

        save_metadata(&metadata, &path).unwrap();
        assert!(load_or_create_metadata(&path).is_ok());
    }
}
