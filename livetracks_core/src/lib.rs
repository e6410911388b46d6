use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use log::info;
use thiserror::Error;

pub mod channels;
pub mod ffmpeg;
pub mod inputs;
pub mod layout;
pub mod plan;

pub use channels::{ChannelSpec, ListFormat, ParseError};
pub use ffmpeg::{Invocation, Manifest, ProcessRunner, ToolRunner, DEFAULT_FFMPEG};
pub use layout::{remove_active_scratch, OutputLayout, ScratchDir};
pub use plan::{build_steps, PlanContext, Step};

/// Directory created for the final tracks when none is given.
pub const DEFAULT_OUTPUT_DIR: &str = "Tracks";

/// Errors that can occur while extracting channels.
#[derive(Debug, Error)]
pub enum LiveTracksError {
    /// Neither inline channels nor a channel list file were supplied.
    #[error("You must provide a list of channels to extract! (--channels XOR --list)")]
    MissingChannelSource,

    /// Both inline channels and a channel list file were supplied.
    #[error("Cannot handle both --channels and --list. Please use just one.")]
    ConflictingChannelSources,

    /// A channel token, list line or CSV row could not be parsed.
    #[error("failed to parse channel list")]
    Parse(#[from] ParseError),

    /// The channel source resolved to zero channels.
    #[error("the channel list is empty")]
    NoChannels,

    /// An explicitly listed input file does not exist.
    #[error("input file does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    /// Scanning for WAV files found nothing.
    #[error("no WAV files found in {}", .0.display())]
    NoInputFiles(PathBuf),

    /// The output directory is already present; it is never merged into.
    #[error("Output directory already exists: {}", .0.display())]
    OutputExists(PathBuf),

    /// The external tool could not be started.
    #[error("failed to run {}", .program.display())]
    ToolSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external tool exited unsuccessfully.
    #[error("command failed with {status}: {command}")]
    ToolInvocation { command: String, status: ExitStatus },

    /// Wrapper around IO errors encountered while preparing directories.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LiveTracksError {
    /// Whether this is one of the two channel source configuration errors.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LiveTracksError::MissingChannelSource | LiveTracksError::ConflictingChannelSources
        )
    }
}

/// Validated settings for one run.
#[derive(Clone, Debug)]
pub struct Config {
    /// Channels to extract, in output order.
    pub channels: Vec<ChannelSpec>,
    /// Input recordings in chronological order.
    pub inputs: Vec<PathBuf>,
    /// Directory receiving one WAV file per channel. Must not exist yet.
    pub output_dir: PathBuf,
    /// The ffmpeg executable.
    pub ffmpeg: PathBuf,
    /// Audio codec for extracted outputs, ffmpeg's default when `None`.
    pub codec: Option<String>,
}

impl Config {
    /// Start building a [`Config`] that writes to `output_dir`.
    pub fn builder<P: AsRef<Path>>(output_dir: P) -> ConfigBuilder {
        ConfigBuilder::new(output_dir)
    }
}

/// Builder for [`Config`]; resolves the channel list and input files.
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    output_dir: PathBuf,
    inline_channels: Option<Vec<String>>,
    channel_list: Option<(PathBuf, Option<ListFormat>)>,
    input_files: Option<Vec<PathBuf>>,
    search_dir: PathBuf,
    ffmpeg: PathBuf,
    codec: Option<String>,
}

impl ConfigBuilder {
    fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            inline_channels: None,
            channel_list: None,
            input_files: None,
            search_dir: PathBuf::from("."),
            ffmpeg: PathBuf::from(DEFAULT_FFMPEG),
            codec: None,
        }
    }

    /// Inline `N:Name` tokens.
    pub fn inline_channels<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inline_channels = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// A channel list file; `format` defaults to a guess from the extension.
    pub fn channel_list<P: AsRef<Path>>(mut self, path: P, format: Option<ListFormat>) -> Self {
        self.channel_list = Some((path.as_ref().to_path_buf(), format));
        self
    }

    /// Explicit input files, in recording order. Without this the search
    /// directory is scanned for WAV files.
    pub fn input_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.input_files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    /// Directory scanned when no input files are given. Defaults to `.`.
    pub fn search_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.search_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn ffmpeg<P: AsRef<Path>>(mut self, program: P) -> Self {
        self.ffmpeg = program.as_ref().to_path_buf();
        self
    }

    pub fn codec<S: Into<String>>(mut self, codec: Option<S>) -> Self {
        self.codec = codec.map(Into::into);
        self
    }

    /// Validate the channel source, parse the channels and resolve the inputs.
    ///
    /// Only reads from the filesystem.
    pub fn build(self) -> Result<Config, LiveTracksError> {
        let channels = match (self.inline_channels, self.channel_list) {
            (None, None) => return Err(LiveTracksError::MissingChannelSource),
            (Some(_), Some(_)) => return Err(LiveTracksError::ConflictingChannelSources),
            (Some(tokens), None) => channels::parse_tokens(&tokens)?,
            (None, Some((path, format))) => {
                let format = format.unwrap_or_else(|| ListFormat::from_path(&path));
                channels::read_list_file(&path, format)?
            }
        };
        if channels.is_empty() {
            return Err(LiveTracksError::NoChannels);
        }

        let inputs = match self.input_files {
            Some(files) => {
                if let Some(missing) = files.iter().find(|file| !file.is_file()) {
                    return Err(LiveTracksError::MissingInput(missing.clone()));
                }
                files
            }
            None => {
                let files = inputs::discover_wav_files(&self.search_dir)?;
                if files.is_empty() {
                    return Err(LiveTracksError::NoInputFiles(self.search_dir));
                }
                files
            }
        };

        Ok(Config {
            channels,
            inputs,
            output_dir: self.output_dir,
            ffmpeg: self.ffmpeg,
            codec: self.codec,
        })
    }
}

/// What a completed run produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Final per-channel files, in channel order.
    pub tracks: Vec<PathBuf>,
    pub extract_calls: usize,
    pub merge_calls: usize,
}

/// Extract the configured channels by running ffmpeg as a child process.
pub fn run(config: Config) -> Result<RunReport, LiveTracksError> {
    run_with_runner(config, &mut ProcessRunner)
}

/// Extract the configured channels, sending every tool call to `runner`.
///
/// The output directory is created first. With more than one input, a scratch
/// directory holds the segments and is removed before this returns, whether
/// or not the run succeeded. The first failing call aborts the run.
pub fn run_with_runner<R: ToolRunner + ?Sized>(
    config: Config,
    runner: &mut R,
) -> Result<RunReport, LiveTracksError> {
    log_config(&config);

    let layout = OutputLayout::prepare(&config.output_dir, config.inputs.len())?;
    let steps = build_steps(
        &config.channels,
        &config.inputs,
        PlanContext {
            ffmpeg: &config.ffmpeg,
            codec: config.codec.as_deref(),
            output_dir: layout.output_dir(),
            scratch_dir: layout.scratch_dir(),
        },
    );

    let mut report = RunReport::default();
    for step in &steps {
        match step {
            Step::Extract { invocation, .. } => {
                runner.run(invocation)?;
                report.extract_calls += 1;
            }
            Step::Merge {
                manifest_path,
                manifest,
                invocation,
                ..
            } => {
                fs::write(manifest_path, manifest.render())?;
                runner.run(invocation)?;
                report.merge_calls += 1;
            }
        }
    }

    report.tracks = config
        .channels
        .iter()
        .map(|channel| layout.output_dir().join(channel.output_file_name()))
        .collect();
    Ok(report)
}

/// Plan a run without touching the filesystem, for dry runs.
///
/// Fails like [`run`] would if the output directory already exists. The
/// scratch directory is represented by a placeholder path.
pub fn plan_steps(config: &Config) -> Result<Vec<Step>, LiveTracksError> {
    layout::ensure_output_available(&config.output_dir)?;
    let placeholder = layout::placeholder_scratch_dir();
    Ok(build_steps(
        &config.channels,
        &config.inputs,
        PlanContext {
            ffmpeg: &config.ffmpeg,
            codec: config.codec.as_deref(),
            output_dir: &config.output_dir,
            scratch_dir: (config.inputs.len() > 1).then_some(placeholder.as_path()),
        },
    ))
}

fn log_config(config: &Config) {
    let inputs: Vec<_> = config
        .inputs
        .iter()
        .map(|input| input.display().to_string())
        .collect();
    info!("multichannel files: {}", inputs.join(", "));
    let channels: Vec<_> = config.channels.iter().map(ToString::to_string).collect();
    info!("channels: {}", channels.join(", "));
    info!("ffmpeg: {}", config.ffmpeg.display());
}
