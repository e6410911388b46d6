use std::path::PathBuf;

use clap::{builder::PossibleValuesParser, value_parser, Arg, ArgAction, Command};
use livetracks_core::{ListFormat, DEFAULT_FFMPEG, DEFAULT_OUTPUT_DIR};

/// Map the `--list-format` value onto a [`ListFormat`].
pub fn parse_list_format(value: &str) -> Option<ListFormat> {
    match value {
        "text" => Some(ListFormat::Text),
        "csv" => Some(ListFormat::Csv),
        _ => None,
    }
}

pub fn build_cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Extract only the channels you want from (potentially many) multichannel WAV files")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("channels")
                .short('c')
                .long("channels")
                .value_name("CHANNEL")
                .help("Channels to extract as CHANNEL_NUMBER:CHANNEL_NAME, e.g. 1:Kick 2:Snare")
                .num_args(1..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .value_name("FILE")
                .help("File listing the channels, one CHANNEL_NUMBER:CHANNEL_NAME per line, or CSV rows of channel,file number,name")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("list-format")
                .long("list-format")
                .value_name("FORMAT")
                .help("Format of the channel list [default: csv for .csv files, text otherwise]")
                .value_parser(PossibleValuesParser::new(["text", "csv"])),
        )
        .arg(
            Arg::new("files")
                .short('f')
                .long("files")
                .value_name("FILE")
                .help("Multichannel WAV files in recording order [default: every .wav file in the current directory, sorted by name]")
                .num_args(1..)
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_DIR")
                .help("Directory to create for the final tracks; must not exist")
                .default_value(DEFAULT_OUTPUT_DIR)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("ffmpeg")
                .long("ffmpeg")
                .value_name("PATH")
                .help("ffmpeg executable to run")
                .default_value(DEFAULT_FFMPEG)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("codec")
                .long("codec")
                .value_name("CODEC")
                .help("Audio codec for the extracted tracks, e.g. pcm_s24le [default: ffmpeg's choice for WAV]"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Print the ffmpeg commands without running them or creating files")
                .action(ArgAction::SetTrue),
        )
}
