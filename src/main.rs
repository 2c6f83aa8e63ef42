// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info};
use std::io::Write;
use std::path::{Path, PathBuf};

use quill_captions::app_config::{Config, LogLevel};
use quill_captions::app_controller::{self, Controller};
use quill_captions::engine::WhisperCppEngine;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build caption pages from an SRT file or every caption file in a directory
    Pages {
        /// SRT file or directory
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Directory for the output (defaults to the input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Convert transcription engine JSON into SRT and caption pages
    Srt {
        /// Engine output JSON file
        #[arg(value_name = "TRANSCRIPTION_JSON")]
        input_path: PathBuf,

        /// Directory for the output (defaults to the input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Transcribe an audio file with the local engine, then build SRT and pages
    Transcribe {
        /// Audio file (16 kHz WAV for whisper.cpp)
        #[arg(value_name = "AUDIO")]
        input_path: PathBuf,

        /// Directory for the output (defaults to the input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Show the active page and token progress at a playback time
    At {
        /// Page sequence JSON file
        #[arg(value_name = "PAGES_JSON")]
        pages_path: PathBuf,

        /// Playback time in milliseconds
        #[arg(value_name = "TIME_MS")]
        time_ms: u64,
    },

    /// Generate shell completions for quill
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Quill - caption pages for short-form video
///
/// Turns speech-to-text output or SRT subtitles into timed caption pages and
/// shows which words are active at a given time.
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(version)]
#[command(about = "Caption timing and page synthesis")]
#[command(long_about = "Quill turns transcripts into timed caption pages for short-form video.

EXAMPLES:
    quill pages talk.srt                        # Write talk.pages.json
    quill pages --gap-ms 200 ./captions/        # Process a directory with a wider gap
    quill srt whisper-output.json               # Write whisper-output.srt and .pages.json
    quill transcribe talk.wav                   # Run whisper.cpp, then build captions
    quill at talk.pages.json 1250               # Show what is on screen at 1.25s
    quill completions bash > quill.bash         # Generate bash completions

CONFIGURATION:
    Configuration is stored in quill.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "quill.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Silence in milliseconds that starts a new page
    #[arg(short, long, global = true)]
    gap_ms: Option<u64>,

    /// Force overwrite of existing output files
    #[arg(short, long, global = true)]
    force_overwrite: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color, now, tag, record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace lets the max level set below be the only filter
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "quill", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());
    let controller = Controller::with_config(config)?.ignoring(&cli.config_path);

    match cli.command {
        Commands::Pages { input_path, output_dir } => {
            if input_path.is_dir() {
                controller.run_folder(input_path, cli.force_overwrite).await?;
            } else {
                let output_dir = output_dir_for(&input_path, output_dir);
                controller.process_subtitle_file(&input_path, &output_dir, cli.force_overwrite)?;
            }
        }
        Commands::Srt { input_path, output_dir } => {
            let output_dir = output_dir_for(&input_path, output_dir);
            controller.process_transcription_file(&input_path, &output_dir, cli.force_overwrite)?;
        }
        Commands::Transcribe { input_path, output_dir } => {
            let output_dir = output_dir_for(&input_path, output_dir);
            let engine = WhisperCppEngine::new(controller.config().engine.clone());
            controller
                .transcribe_media(&engine, &input_path, &output_dir, cli.force_overwrite)
                .await?;
        }
        Commands::At { pages_path, time_ms } => {
            let pages = app_controller::load_pages(&pages_path)?;
            print!("{}", app_controller::describe_frame(&pages, time_ms));
        }
        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Load or create the configuration, then apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(&cli.config_path)
        .with_context(|| format!("Failed to load configuration from {}", cli.config_path))?;

    if let Some(log_level) = cli.log_level {
        config.log_level = log_level.into();
    }

    if let Some(gap_ms) = cli.gap_ms {
        info!("Using gap threshold of {}ms from the command line", gap_ms);
        config.captions.gap_threshold_ms = gap_ms;
    }

    config.validate().map_err(|e| anyhow!("Configuration validation failed: {}", e))?;
    Ok(config)
}

fn output_dir_for(input_path: &Path, output_dir: Option<PathBuf>) -> PathBuf {
    output_dir.unwrap_or_else(|| input_path.parent().unwrap_or(Path::new(".")).to_path_buf())
}
