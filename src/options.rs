//! Options for the synthesis procedure and the command line interface.

use std::fmt::{self, Display};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// The synthesis mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Basic supervisory control and observation problem, non-blocking and
    /// maximally permissive case.
    Bscopnbmax,
    /// Most permissive observer: synthesize a sensor activation policy.
    Mpo,
}

impl Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Mode::Bscopnbmax => "bscopnbmax",
                Mode::Mpo => "mpo",
            }
        )
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Bscopnbmax
    }
}

/// Whether the MPO reduction extracts a minimal or maximal activation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MpoCondition {
    Min,
    Max,
}

impl Display for MpoCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                MpoCondition::Min => "min",
                MpoCondition::Max => "max",
            }
        )
    }
}

impl Default for MpoCondition {
    fn default() -> Self {
        MpoCondition::Min
    }
}

/// The command of a binary invocation: the two synthesis modes plus the
/// file conversion utility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Command {
    Bscopnbmax,
    Mpo,
    Convert,
}

impl Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Command::Bscopnbmax => "bscopnbmax",
                Command::Mpo => "mpo",
                Command::Convert => "convert",
            }
        )
    }
}

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TraceLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for TraceLevel {
    fn default() -> Self {
        TraceLevel::Warn
    }
}

impl Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TraceLevel::Off => "off",
                TraceLevel::Error => "error",
                TraceLevel::Warn => "warn",
                TraceLevel::Info => "info",
                TraceLevel::Debug => "debug",
                TraceLevel::Trace => "trace",
            }
        )
    }
}

impl From<TraceLevel> for log::LevelFilter {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::Off => log::LevelFilter::Off,
            TraceLevel::Error => log::LevelFilter::Error,
            TraceLevel::Warn => log::LevelFilter::Warn,
            TraceLevel::Info => log::LevelFilter::Info,
            TraceLevel::Debug => log::LevelFilter::Debug,
            TraceLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Options for a synthesis run, independent of the command line.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOptions {
    pub mode: Mode,
    pub mpo_condition: MpoCondition,
}

/// Command line options.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "argus",
    version,
    about = "Supervisor synthesis for partially observed discrete-event systems"
)]
pub struct CliOptions {
    /// Mode of program execution.
    #[arg(short, long, value_enum, default_value_t = Command::Bscopnbmax)]
    pub mode: Command,

    /// Request the MPO to find a minimal or maximal activation policy.
    #[arg(short, long, value_enum, default_value_t = MpoCondition::Min)]
    pub condition: MpoCondition,

    /// Plant file to process (.fsm machine dialect or .txt pretty dialect).
    #[arg(short, long)]
    pub fsm_file: PathBuf,

    /// Information-state property file; the property kind is named on the
    /// first line of the file.
    #[arg(short, long)]
    pub isp_file: Option<PathBuf>,

    /// Write the synthesis artifacts as .fsm files into the output directory.
    #[arg(short, long)]
    pub write_files: bool,

    /// Directory for result files.
    #[arg(short, long, default_value = "results")]
    pub output_dir: PathBuf,

    /// Verbosity of diagnostic output on stderr.
    #[arg(short, long, value_enum, default_value_t = TraceLevel::Warn)]
    pub trace_level: TraceLevel,
}

impl From<&CliOptions> for SynthesisOptions {
    fn from(options: &CliOptions) -> Self {
        SynthesisOptions {
            mode: match options.mode {
                Command::Mpo => Mode::Mpo,
                _ => Mode::Bscopnbmax,
            },
            mpo_condition: options.condition,
        }
    }
}
