use std::path::{Path, PathBuf};

use crate::channels::ChannelSpec;
use crate::ffmpeg::{concat_invocation, demux_invocation, Invocation, Manifest};
use crate::layout::manifest_path;

/// One unit of work, executed in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Extract every channel from one input file.
    Extract {
        input: PathBuf,
        outputs: Vec<PathBuf>,
        invocation: Invocation,
    },
    /// Write `manifest` to `manifest_path`, then concatenate it into `output`.
    Merge {
        channel: ChannelSpec,
        manifest_path: PathBuf,
        manifest: Manifest,
        output: PathBuf,
        invocation: Invocation,
    },
}

impl Step {
    pub fn invocation(&self) -> &Invocation {
        match self {
            Step::Extract { invocation, .. } | Step::Merge { invocation, .. } => invocation,
        }
    }
}

/// Everything [`build_steps`] needs to know about a run.
#[derive(Clone, Copy, Debug)]
pub struct PlanContext<'a> {
    pub ffmpeg: &'a Path,
    pub codec: Option<&'a str>,
    pub output_dir: &'a Path,
    /// Required when there is more than one input.
    pub scratch_dir: Option<&'a Path>,
}

/// Build the extraction steps, one per input in order, followed by one merge
/// step per channel when there is more than one input.
///
/// A single input is extracted straight into the output directory. With
/// several inputs, segments are written to the scratch directory as
/// `<name>.<position>.wav`, where position is the zero-based index of the
/// input in `inputs`.
///
/// # Panics
///
/// Panics if there is more than one input and `context.scratch_dir` is `None`.
pub fn build_steps(
    channels: &[ChannelSpec],
    inputs: &[PathBuf],
    context: PlanContext<'_>,
) -> Vec<Step> {
    let scratch_dir = match (inputs.len() > 1, context.scratch_dir) {
        (true, Some(scratch)) => Some(scratch),
        (true, None) => panic!("merging {} inputs requires a scratch directory", inputs.len()),
        (false, _) => None,
    };

    let mut steps = Vec::with_capacity(inputs.len() + channels.len());
    for (position, input) in inputs.iter().enumerate() {
        let outputs: Vec<PathBuf> = channels
            .iter()
            .map(|channel| match scratch_dir {
                Some(scratch) => scratch.join(channel.segment_file_name(position)),
                None => context.output_dir.join(channel.output_file_name()),
            })
            .collect();
        let invocation =
            demux_invocation(context.ffmpeg, input, channels, &outputs, context.codec);
        steps.push(Step::Extract {
            input: input.clone(),
            outputs,
            invocation,
        });
    }

    if let Some(scratch) = scratch_dir {
        let manifest_path = manifest_path(scratch);
        for channel in channels {
            let manifest = Manifest::new(
                (0..inputs.len())
                    .map(|position| scratch.join(channel.segment_file_name(position)))
                    .collect(),
            );
            let output = context.output_dir.join(channel.output_file_name());
            let invocation = concat_invocation(context.ffmpeg, &manifest_path, &output);
            steps.push(Step::Merge {
                channel: channel.clone(),
                manifest_path: manifest_path.clone(),
                manifest,
                output,
                invocation,
            });
        }
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context<'a>(scratch_dir: Option<&'a Path>) -> PlanContext<'a> {
        PlanContext {
            ffmpeg: Path::new("ffmpeg"),
            codec: None,
            output_dir: Path::new("Tracks"),
            scratch_dir,
        }
    }

    #[test]
    fn single_input_extracts_into_output_directory() {
        let channels = [ChannelSpec::new(0, "Kick"), ChannelSpec::new(1, "Snare")];
        let steps = build_steps(&channels, &[PathBuf::from("set.wav")], context(None));

        assert_eq!(steps.len(), 1);
        match &steps[0] {
            Step::Extract { input, outputs, .. } => {
                assert_eq!(input, Path::new("set.wav"));
                assert_eq!(
                    outputs,
                    &[
                        PathBuf::from("Tracks/Kick.wav"),
                        PathBuf::from("Tracks/Snare.wav"),
                    ]
                );
            }
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn single_input_ignores_scratch_directory() {
        let channels = [ChannelSpec::new(0, "Kick")];
        let steps = build_steps(
            &channels,
            &[PathBuf::from("set.wav")],
            context(Some(Path::new("/tmp/scratch"))),
        );
        assert_eq!(steps.len(), 1);
        assert!(matches!(&steps[0], Step::Extract { outputs, .. } if outputs[0] == Path::new("Tracks/Kick.wav")));
    }

    #[test]
    fn multiple_inputs_extract_segments_then_merge_per_channel() {
        let scratch = Path::new("/tmp/scratch");
        let channels = [ChannelSpec::new(0, "Kick"), ChannelSpec::new(3, "Bass")];
        let inputs = [
            PathBuf::from("a.wav"),
            PathBuf::from("b.wav"),
            PathBuf::from("c.wav"),
        ];
        let steps = build_steps(&channels, &inputs, context(Some(scratch)));

        assert_eq!(steps.len(), 5);
        for (position, step) in steps[..3].iter().enumerate() {
            match step {
                Step::Extract { input, outputs, .. } => {
                    assert_eq!(input, &inputs[position]);
                    assert_eq!(
                        outputs,
                        &[
                            scratch.join(format!("Kick.{position}.wav")),
                            scratch.join(format!("Bass.{position}.wav")),
                        ]
                    );
                }
                other => panic!("unexpected step: {other:?}"),
            }
        }

        let merged: Vec<_> = steps[3..]
            .iter()
            .map(|step| match step {
                Step::Merge {
                    channel,
                    manifest_path,
                    manifest,
                    output,
                    ..
                } => {
                    assert_eq!(manifest_path, &scratch.join("files.txt"));
                    assert_eq!(
                        manifest.segments,
                        (0..3)
                            .map(|i| scratch.join(format!("{}.{i}.wav", channel.output_name)))
                            .collect::<Vec<_>>()
                    );
                    output.clone()
                }
                other => panic!("unexpected step: {other:?}"),
            })
            .collect();
        assert_eq!(
            merged,
            [PathBuf::from("Tracks/Kick.wav"), PathBuf::from("Tracks/Bass.wav")]
        );
    }

    #[test]
    #[should_panic(expected = "requires a scratch directory")]
    fn multiple_inputs_without_scratch_panics() {
        let channels = [ChannelSpec::new(0, "Kick")];
        let inputs = [PathBuf::from("a.wav"), PathBuf::from("b.wav")];
        build_steps(&channels, &inputs, context(None));
    }
}
