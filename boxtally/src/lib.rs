//! Scale, tally and replay the debug inference records captured by the
//! sorting robots.
//!
//! The core pipeline is load → scale → tally:
//!
//! ```no_run
//! use boxtally::pipeline::DebugRecordLog;
//! use boxtally::scaler::MismatchPolicy;
//!
//! let log = DebugRecordLog::load("capture/debug_inference_out.json")?;
//! let batch = log.scale(MismatchPolicy::Abort)?;
//! for (class_name, count) in batch.tally().iter() {
//!     println!("{class_name}: {count}");
//! }
//! # Ok::<(), boxtally::error::DebugRecordError>(())
//! ```

pub mod color_utils;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod loader;
pub mod log_input;
pub mod metadata;
pub mod output_manager;
pub mod parse_command;
pub mod pipeline;
pub mod processing;
pub mod record;
pub mod replay;
pub mod replay_command;
pub mod report;
pub mod scaler;
pub mod stats_command;
pub mod tally;

pub use dimensions::ImageDimensions;
pub use error::DebugRecordError;
pub use pipeline::{DebugRecordLog, ScaledBatch};
pub use record::{DetectionRecord, ScaledBox, ScaledRecord};
pub use scaler::MismatchPolicy;
pub use tally::{BatchSummary, ClassTally};
