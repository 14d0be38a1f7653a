use clap::Parser;
use env_logger::{Builder, Env};
use log::{error, info, Level};
use std::io::Write;

use boxtally::color_utils::{self, colors, symbols};
use boxtally::config::{
    GlobalArgs, ParseCommand, ParseConfig, ReplayCommand, ReplayConfig, StatsCommand, StatsConfig,
};
use boxtally::parse_command::run_parse;
use boxtally::replay_command::run_replay;
use boxtally::stats_command::run_stats;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Scale normalized boxes in debug logs to pixel coordinates
    Parse(ParseCommand),

    /// Count detections per class
    Stats(StatsCommand),

    /// Redraw logged detections onto their frames
    Replay(ReplayCommand),

    /// Show version information
    Version,
}

#[derive(Parser)]
#[command(name = "boxtally")]
#[command(about = "Debug inference record toolkit for the sorting robots")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn get_log_level_from_verbosity(
    verbosity: &clap_verbosity_flag::Verbosity<clap_verbosity_flag::ErrorLevel>,
) -> log::LevelFilter {
    // -q -> ERROR; the default of ErrorLevel is shifted up one step to WARN
    if verbosity.is_silent() {
        return log::LevelFilter::Error;
    }
    match verbosity.log_level_filter() {
        log::LevelFilter::Off => log::LevelFilter::Off,
        log::LevelFilter::Error => log::LevelFilter::Warn,
        log::LevelFilter::Warn => log::LevelFilter::Info,
        log::LevelFilter::Info => log::LevelFilter::Debug,
        log::LevelFilter::Debug | log::LevelFilter::Trace => log::LevelFilter::Trace,
    }
}

fn init_logging(global: &GlobalArgs) {
    // Without -v/-q, honor RUST_LOG if set
    let use_env = !global.verbosity.is_present() && std::env::var_os("RUST_LOG").is_some();

    let mut logger = if use_env {
        Builder::from_env(Env::default())
    } else {
        let mut b = Builder::new();
        b.filter_level(get_log_level_from_verbosity(&global.verbosity));
        b
    };

    logger
        .format(|buf, record| {
            let level_str = match record.level() {
                Level::Error => colors::error_level("ERROR"),
                Level::Warn => colors::warning_level("WARN"),
                Level::Info => colors::info_level("INFO"),
                Level::Debug => colors::debug_level("DEBUG"),
                Level::Trace => colors::trace_level("TRACE"),
            };
            writeln!(buf, "[{}] {}", level_str, record.args())
        })
        .init();
}

fn fail(context: &str, e: impl std::fmt::Display) -> ! {
    error!("{}{context}: {e:#}", symbols::operation_failed());
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    color_utils::init_color_config(cli.global.no_color);
    init_logging(&cli.global);

    match cli.command {
        Some(Commands::Parse(cmd)) => {
            info!(
                "{}Parse: {} source(s)",
                symbols::parse_start(),
                cmd.sources.len()
            );
            let config = ParseConfig::from_args(cli.global, cmd)
                .unwrap_or_else(|e| fail("Invalid arguments", e));
            if let Err(e) = run_parse(config) {
                fail("Parsing failed", e);
            }
        }
        Some(Commands::Stats(cmd)) => {
            info!(
                "{}Stats: {} source(s) | format: {:?}",
                symbols::stats_start(),
                cmd.sources.len(),
                cmd.format
            );
            let config = StatsConfig::from_args(cli.global, cmd)
                .unwrap_or_else(|e| fail("Invalid arguments", e));
            if let Err(e) = run_stats(config) {
                fail("Statistics failed", e);
            }
        }
        Some(Commands::Replay(cmd)) => {
            info!(
                "{}Replay: {} source(s) | thickness: {} | min confidence: {}",
                symbols::replay_start(),
                cmd.sources.len(),
                cmd.thickness,
                cmd.min_confidence
            );
            let config = ReplayConfig::from_args(cli.global, cmd)
                .unwrap_or_else(|e| fail("Invalid arguments", e));
            match run_replay(config) {
                Ok(frames) => info!("{}Wrote {frames} frame(s)", symbols::completed_successfully()),
                Err(e) => fail("Replay failed", e),
            }
        }
        Some(Commands::Version) => {
            println!("boxtally v{}", env!("CARGO_PKG_VERSION"));
            println!("Repository: {}", env!("CARGO_PKG_REPOSITORY"));
        }
        None => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            if let Err(e) = cmd.print_help() {
                fail("Failed to print help", e);
            }
        }
    }
}
