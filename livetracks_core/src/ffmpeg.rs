use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::info;

use crate::channels::ChannelSpec;
use crate::LiveTracksError;

/// Default name of the external tool, resolved through `PATH`.
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

const COMMON_ARGS: [&str; 2] = ["-hide_banner", "-nostdin"];

/// A single external tool call: program plus argument vector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Invocation {
    fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            args: COMMON_ARGS.iter().map(OsString::from).collect(),
        }
    }

    fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Build the call extracting every channel of `channels` from `input`.
///
/// `outputs[i]` receives `channels[i]`. Each output gets its own mono `pan`
/// filter labelled by list position, so repeated channel indices are
/// extracted independently.
pub fn demux_invocation(
    program: &Path,
    input: &Path,
    channels: &[ChannelSpec],
    outputs: &[PathBuf],
    codec: Option<&str>,
) -> Invocation {
    debug_assert_eq!(channels.len(), outputs.len());

    let filter = channels
        .iter()
        .enumerate()
        .map(|(position, channel)| {
            format!("[0:a:0]pan=mono|c0=c{}[ch{position}]", channel.index)
        })
        .collect::<Vec<_>>()
        .join(";");

    let mut invocation = Invocation::new(program);
    invocation.arg("-i").arg(input).arg("-filter_complex").arg(filter);
    for (position, output) in outputs.iter().enumerate() {
        invocation.arg("-map").arg(format!("[ch{position}]"));
        if let Some(codec) = codec {
            invocation.arg("-c:a").arg(codec);
        }
        invocation.arg(output);
    }
    invocation
}

/// Build the call concatenating the segments listed in `manifest` into `output`
/// without re-encoding.
pub fn concat_invocation(program: &Path, manifest: &Path, output: &Path) -> Invocation {
    let mut invocation = Invocation::new(program);
    invocation
        .arg("-f")
        .arg("concat")
        .arg("-safe")
        .arg("0")
        .arg("-i")
        .arg(manifest)
        .arg("-c")
        .arg("copy")
        .arg(output);
    invocation
}

/// Ordered list of segment files for the concat demuxer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Manifest {
    pub segments: Vec<PathBuf>,
}

impl Manifest {
    pub fn new(segments: Vec<PathBuf>) -> Self {
        Self { segments }
    }

    /// Render one `file '<path>'` line per segment.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            let path = segment.to_string_lossy().replace('\'', r"'\''");
            out.push_str("file '");
            out.push_str(&path);
            out.push_str("'\n");
        }
        out
    }
}

/// Executes invocations. The pipeline only talks to the tool through this.
pub trait ToolRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<(), LiveTracksError>;
}

/// Runs the tool as a child process and waits for it.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<(), LiveTracksError> {
        info!("running: {invocation}");
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .status()
            .map_err(|source| LiveTracksError::ToolSpawn {
                program: invocation.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(LiveTracksError::ToolInvocation {
                command: invocation.to_string(),
                status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(invocation: &Invocation) -> Vec<String> {
        invocation.args_lossy()
    }

    #[test]
    fn demux_maps_every_channel_in_one_call() {
        let channels = [ChannelSpec::new(0, "Kick"), ChannelSpec::new(1, "Snare")];
        let outputs = [
            PathBuf::from("Tracks/Kick.wav"),
            PathBuf::from("Tracks/Snare.wav"),
        ];
        let invocation = demux_invocation(
            Path::new("ffmpeg"),
            Path::new("set.wav"),
            &channels,
            &outputs,
            None,
        );

        assert_eq!(invocation.program, PathBuf::from("ffmpeg"));
        assert_eq!(
            strings(&invocation),
            [
                "-hide_banner",
                "-nostdin",
                "-i",
                "set.wav",
                "-filter_complex",
                "[0:a:0]pan=mono|c0=c0[ch0];[0:a:0]pan=mono|c0=c1[ch1]",
                "-map",
                "[ch0]",
                "Tracks/Kick.wav",
                "-map",
                "[ch1]",
                "Tracks/Snare.wav",
            ]
        );
    }

    #[test]
    fn demux_labels_duplicate_indices_separately() {
        let channels = [ChannelSpec::new(4, "Vox"), ChannelSpec::new(4, "Vox Copy")];
        let outputs = [PathBuf::from("a.wav"), PathBuf::from("b.wav")];
        let invocation = demux_invocation(
            Path::new("ffmpeg"),
            Path::new("in.wav"),
            &channels,
            &outputs,
            Some("pcm_s24le"),
        );
        let args = strings(&invocation);
        assert_eq!(
            args[5],
            "[0:a:0]pan=mono|c0=c4[ch0];[0:a:0]pan=mono|c0=c4[ch1]"
        );
        assert_eq!(
            &args[6..],
            [
                "-map",
                "[ch0]",
                "-c:a",
                "pcm_s24le",
                "a.wav",
                "-map",
                "[ch1]",
                "-c:a",
                "pcm_s24le",
                "b.wav",
            ]
        );
    }

    #[test]
    fn concat_copies_streams() {
        let invocation = concat_invocation(
            Path::new("/usr/bin/ffmpeg"),
            Path::new("/tmp/scratch/files.txt"),
            Path::new("Tracks/Kick.wav"),
        );
        assert_eq!(
            strings(&invocation),
            [
                "-hide_banner",
                "-nostdin",
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                "/tmp/scratch/files.txt",
                "-c",
                "copy",
                "Tracks/Kick.wav",
            ]
        );
    }

    #[test]
    fn manifest_quotes_paths() {
        let manifest = Manifest::new(vec![
            PathBuf::from("/tmp/s/Lead Vox.0.wav"),
            PathBuf::from("/tmp/s/Bob's Amp.1.wav"),
        ]);
        assert_eq!(
            manifest.render(),
            "file '/tmp/s/Lead Vox.0.wav'\nfile '/tmp/s/Bob'\\''s Amp.1.wav'\n"
        );
    }

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let invocation = concat_invocation(
            Path::new("ffmpeg"),
            Path::new("files.txt"),
            Path::new("My Tracks/Kick.wav"),
        );
        assert_eq!(
            invocation.to_string(),
            "ffmpeg -hide_banner -nostdin -f concat -safe 0 -i files.txt -c copy \"My Tracks/Kick.wav\""
        );
    }
}
