//! Configuration layer separating CLI arguments from internal command configuration.
//!
//! - `GlobalArgs`: flags shared by every command
//! - `*Command`: clap structs holding only command-specific arguments
//! - `*Config`: internal configuration built with `from_args`, which is where
//!   cross-flag validation happens

use clap::{Parser, ValueEnum};
use clap_verbosity_flag::Verbosity;
use serde::Serialize;

use crate::scaler::MismatchPolicy;

/// Parse probability value (must be between 0.0 and 1.0)
pub fn parse_probability(s: &str) -> Result<f64, String> {
    let val = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid number: '{s}'"))?;
    if !(0.0..=1.0).contains(&val) {
        return Err(format!("Must be between 0.0 and 1.0, got {val}"));
    }
    Ok(val)
}

/// Global CLI arguments that apply to all boxtally commands
#[derive(Parser, Debug, Clone)]
pub struct GlobalArgs {
    /// Global output directory (overrides default placement next to the log)
    #[arg(long, global = true)]
    pub output_dir: Option<String>,

    /// Create metadata output file(s)
    #[arg(long, global = true)]
    pub metadata: bool,

    /// Verbosity level (-q/--quiet, -v/-vv/-vvv for info/debug/trace)
    #[command(flatten)]
    pub verbosity: Verbosity,

    /// Use permissive mode for input collection (warn instead of error for missing logs)
    #[arg(long, global = true)]
    pub permissive: bool,

    /// Disable colored output (also respects NO_COLOR and BOXTALLY_NO_COLOR env vars)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Allow overwriting outputs when two logs share a file name
    #[arg(long, global = true)]
    pub force: bool,
}

/// Base configuration common to all commands
#[derive(Debug, Clone, Serialize)]
pub struct BaseConfig {
    /// Input sources (logs, capture directories or glob patterns)
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    pub skip_metadata: bool,
    /// Fail if sources are missing. Opposite of `--permissive`.
    pub strict: bool,
    pub force: bool,
}

impl From<GlobalArgs> for BaseConfig {
    fn from(global: GlobalArgs) -> Self {
        Self {
            sources: Vec::new(), // Sources come from the command
            output_dir: global.output_dir,
            skip_metadata: !global.metadata,
            strict: !global.permissive,
            force: global.force,
        }
    }
}

/// Shared access used by the generic processing loop
pub trait ToolConfig {
    fn base(&self) -> &BaseConfig;

    /// Section name in metadata files and suffix for outputs
    fn tool_name(&self) -> &'static str;
}

fn mismatch_policy(skip_mismatched: bool) -> MismatchPolicy {
    if skip_mismatched {
        MismatchPolicy::Skip
    } else {
        MismatchPolicy::Abort
    }
}

/// CLI command for scaling debug logs to pixel coordinates
#[derive(Parser, Debug, Clone)]
pub struct ParseCommand {
    /// Debug logs, capture directories, or glob patterns like */debug_inference_out.json
    #[arg(value_name = "LOGS_OR_DIRS", required = true)]
    pub sources: Vec<String>,

    /// Skip records whose labels/confidences do not line up with their boxes instead of failing
    #[arg(long)]
    pub skip_mismatched: bool,

    /// Write scaled records to stdout instead of next to the log
    #[arg(long)]
    pub stdout: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseConfig {
    #[serde(skip)]
    pub base: BaseConfig,
    pub mismatch_policy: MismatchPolicy,
    pub stdout: bool,
}

impl ParseConfig {
    pub fn from_args(global: GlobalArgs, cmd: ParseCommand) -> Result<Self, String> {
        if cmd.stdout && global.output_dir.is_some() {
            return Err("Cannot use both --stdout and --output-dir. Choose one.".to_string());
        }

        let mut base: BaseConfig = global.into();
        base.sources = cmd.sources;

        Ok(Self {
            base,
            mismatch_policy: mismatch_policy(cmd.skip_mismatched),
            stdout: cmd.stdout,
        })
    }
}

impl ToolConfig for ParseConfig {
    fn base(&self) -> &BaseConfig {
        &self.base
    }

    fn tool_name(&self) -> &'static str {
        "parse"
    }
}

/// How class statistics are printed
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsFormat {
    /// Ranked table with a text bar per class
    #[default]
    Table,
    /// `{label: count}` JSON
    Json,
}

/// CLI command for per-class occurrence statistics
#[derive(Parser, Debug, Clone)]
pub struct StatsCommand {
    /// Debug logs, capture directories, or glob patterns like */debug_inference_out.json
    #[arg(value_name = "LOGS_OR_DIRS", required = true)]
    pub sources: Vec<String>,

    /// Output format for stdout
    #[arg(long, value_enum, default_value_t = StatsFormat::Table)]
    pub format: StatsFormat,

    /// Also print statistics for every log, not only the combined tally
    #[arg(long)]
    pub per_log: bool,

    /// Write statistics JSON next to each log (or into --output-dir)
    #[arg(long)]
    pub save: bool,

    /// Skip records whose labels/confidences do not line up with their boxes instead of failing
    #[arg(long)]
    pub skip_mismatched: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsConfig {
    #[serde(skip)]
    pub base: BaseConfig,
    pub format: StatsFormat,
    pub per_log: bool,
    pub save: bool,
    pub mismatch_policy: MismatchPolicy,
}

impl StatsConfig {
    pub fn from_args(global: GlobalArgs, cmd: StatsCommand) -> Result<Self, String> {
        let mut base: BaseConfig = global.into();
        base.sources = cmd.sources;

        Ok(Self {
            base,
            format: cmd.format,
            per_log: cmd.per_log,
            save: cmd.save,
            mismatch_policy: mismatch_policy(cmd.skip_mismatched),
        })
    }
}

impl ToolConfig for StatsConfig {
    fn base(&self) -> &BaseConfig {
        &self.base
    }

    fn tool_name(&self) -> &'static str {
        "stats"
    }
}

/// CLI command for redrawing logged detections onto their frames
#[derive(Parser, Debug, Clone)]
pub struct ReplayCommand {
    /// Debug or sampling logs, capture directories, or glob patterns
    #[arg(value_name = "LOGS_OR_DIRS", required = true)]
    pub sources: Vec<String>,

    /// Directory holding the frames (defaults to each log's own directory)
    #[arg(long, value_name = "DIR")]
    pub images: Option<String>,

    /// TrueType font used to draw class labels and confidences.
    ///
    /// No font is bundled, so without this flag only the boxes are drawn
    #[arg(long, value_name = "TTF")]
    pub font: Option<String>,

    /// Box outline thickness in pixels
    #[arg(long, default_value = "2")]
    pub thickness: u32,

    /// Only draw detections at or above this confidence (0.0-1.0)
    #[arg(long, default_value = "0.0", value_parser = parse_probability)]
    pub min_confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayConfig {
    #[serde(skip)]
    pub base: BaseConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    pub thickness: u32,
    pub min_confidence: f64,
}

impl ReplayConfig {
    pub fn from_args(global: GlobalArgs, cmd: ReplayCommand) -> Result<Self, String> {
        if cmd.thickness == 0 {
            return Err("--thickness must be at least 1 pixel".to_string());
        }

        let mut base: BaseConfig = global.into();
        base.sources = cmd.sources;

        Ok(Self {
            base,
            images: cmd.images,
            font: cmd.font,
            thickness: cmd.thickness,
            min_confidence: cmd.min_confidence,
        })
    }
}

impl ToolConfig for ReplayConfig {
    fn base(&self) -> &BaseConfig {
        &self.base
    }

    fn tool_name(&self) -> &'static str {
        "replay"
    }
}
