//! ShutterScope CLI: shutter speed measurement from slow-motion recordings.
//!
//! Usage:
//!   shutterscope sample <FRAMES>    Reduce a raw GRAY8 frame dump to a brightness trace
//!   shutterscope measure <TRACE>    Replay a trace through the live detector
//!   shutterscope scan <TRACE>       Analyze a whole trace offline
//!   shutterscope info <SESSION>     Show a saved measurement session

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod report;

#[derive(Parser)]
#[command(
    name = "shutterscope",
    about = "Measure camera shutter speeds from slow-motion video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample a raw GRAY8 frame dump into a brightness trace
    Sample {
        /// Raw frame dump (width × height bytes per frame)
        frames: PathBuf,

        /// Frame width in pixels
        #[arg(long)]
        width: usize,

        /// Frame height in pixels
        #[arg(long)]
        height: usize,

        /// Real capture rate of the recording
        #[arg(long)]
        fps: f64,

        /// Timestamp of the first frame (ns)
        #[arg(long, default_value = "0")]
        start_ns: i64,

        /// Sample every Nth pixel of every Nth row
        #[arg(long)]
        stride: Option<usize>,

        /// Centered fraction of the frame to sample
        #[arg(long)]
        central_fraction: Option<f64>,

        /// Output trace file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replay a brightness trace through the live detector
    Measure {
        /// Brightness trace (JSONL)
        trace: PathBuf,

        /// Real capture rate, overriding the trace header
        #[arg(long)]
        recording_fps: Option<f64>,

        /// Closed-shutter frames used for the baseline
        #[arg(long)]
        calibration_frames: Option<usize>,

        /// Threshold position between baseline and peak (0, 1]
        #[arg(long)]
        threshold_factor: Option<f64>,

        /// Rise above baseline that starts the calibration actuation
        #[arg(long)]
        bootstrap_margin: Option<f64>,

        /// Skip the calibration actuation; threshold = baseline × X
        #[arg(long, value_name = "X")]
        fixed_margin: Option<f64>,

        /// Speeds set on the camera, e.g. "1/500, 1/250, 1/125"
        #[arg(long)]
        expected: Option<String>,

        /// Write the session to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save the session into the configured sessions directory
        #[arg(long)]
        save: bool,

        /// Write a markdown report to this file
        #[arg(long)]
        markdown: Option<PathBuf>,

        /// Write the brightness timeline (CSV) to this file
        #[arg(long)]
        timeline: Option<PathBuf>,

        /// Session name
        #[arg(short, long, default_value = "measurement")]
        name: String,
    },

    /// Analyze a whole brightness trace offline
    Scan {
        /// Brightness trace (JSONL)
        trace: PathBuf,

        /// Percentile of the trace taken as baseline
        #[arg(long, default_value = "25")]
        percentile: f64,

        /// Margin factor between baseline and median
        #[arg(long, default_value = "1.5")]
        margin: f64,

        /// Use the z-score method, aiming for this many open frames
        #[arg(long, value_name = "N")]
        zscore_events: Option<usize>,

        /// Real capture rate, overriding the trace header
        #[arg(long)]
        recording_fps: Option<f64>,

        /// Speeds set on the camera, e.g. "1/500, 1/250, 1/125"
        #[arg(long)]
        expected: Option<String>,

        /// Write the brightness timeline (CSV) to this file
        #[arg(long)]
        timeline: Option<PathBuf>,

        /// Print the full report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show a saved measurement session
    Info {
        /// Path to the session file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (mut config, config_error) = match shutterscope_common::AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (shutterscope_common::AppConfig::default(), Some(e)),
    };

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    shutterscope_common::logging::init_logging(&config.logging);
    if let Some(e) = config_error {
        tracing::warn!("{e}; using default configuration");
    }

    match cli.command {
        Commands::Sample {
            frames,
            width,
            height,
            fps,
            start_ns,
            stride,
            central_fraction,
            output,
        } => commands::sample::run(
            &config,
            frames,
            commands::sample::FrameLayout {
                width,
                height,
                fps,
                start_ns,
            },
            stride,
            central_fraction,
            output,
        ),
        Commands::Measure {
            trace,
            recording_fps,
            calibration_frames,
            threshold_factor,
            bootstrap_margin,
            fixed_margin,
            expected,
            output,
            save,
            markdown,
            timeline,
            name,
        } => {
            commands::measure::run(
                &config,
                commands::measure::MeasureArgs {
                    trace,
                    recording_fps,
                    calibration_frames,
                    threshold_factor,
                    bootstrap_margin,
                    fixed_margin,
                    expected,
                    output,
                    save,
                    markdown,
                    timeline,
                    name,
                },
            )
            .await
        }
        Commands::Scan {
            trace,
            percentile,
            margin,
            zscore_events,
            recording_fps,
            expected,
            timeline,
            json,
        } => commands::scan::run(commands::scan::ScanArgs {
            trace,
            percentile,
            margin,
            zscore_events,
            recording_fps,
            expected,
            timeline,
            json,
        }),
        Commands::Info { path } => commands::info::run(path),
    }
}
