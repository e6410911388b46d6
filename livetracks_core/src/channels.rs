use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use log::debug;
use thiserror::Error;

/// Errors produced while parsing channel tokens and channel list files.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The token is not of the form `<number>:<name>`.
    #[error("{location}invalid channel '{token}': expected CHANNEL_NUMBER:CHANNEL_NAME")]
    MalformedToken { location: Location, token: String },

    /// The channel number is not a positive integer.
    #[error("{location}invalid channel number '{value}': expected an integer starting at 1")]
    InvalidChannelNumber { location: Location, value: String },

    /// The channel name is empty.
    #[error("{location}channel '{token}' has an empty name")]
    EmptyName { location: Location, token: String },

    /// A CSV row does not have exactly three columns.
    #[error("row {row}: expected 3 columns (channel, file number, name), found {found}")]
    WrongColumnCount { row: u64, found: usize },

    /// The file number column of a CSV row is not a non-negative integer.
    #[error("row {row}: invalid file number '{value}'")]
    InvalidFileNumber { row: u64, value: String },

    /// The CSV reader rejected the file.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// The list file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where a token came from, used to prefix parse errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    Inline,
    Line(usize),
    Row(u64),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Inline => Ok(()),
            Location::Line(line) => write!(f, "line {line}: "),
            Location::Row(row) => write!(f, "row {row}: "),
        }
    }
}

/// A single channel to extract from every input file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Zero-based channel index inside the multichannel input.
    pub index: u32,
    /// Base file name, without extension, of the final output.
    pub output_name: String,
}

impl ChannelSpec {
    pub fn new<S: Into<String>>(index: u32, output_name: S) -> Self {
        Self {
            index,
            output_name: output_name.into(),
        }
    }

    /// Parse an inline `"N:Name"` token, where `N` is one-based.
    pub fn parse_token(token: &str) -> Result<Self, ParseError> {
        parse_token_at(token, Location::Inline)
    }

    /// File name of the final output, e.g. `Kick.wav`.
    pub fn output_file_name(&self) -> String {
        format!("{}.wav", self.output_name)
    }

    /// File name of the segment extracted from the input at `sequence_index`.
    pub fn segment_file_name(&self, sequence_index: usize) -> String {
        format!("{}.{sequence_index}.wav", self.output_name)
    }
}

impl fmt::Display for ChannelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index + 1, self.output_name)
    }
}

/// Format of a channel list file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListFormat {
    /// One `N:Name` token per line.
    Text,
    /// Rows of `channel_number,file_number,file_name`.
    Csv,
}

impl ListFormat {
    /// Pick the format from the file extension: `.csv` is CSV, anything else text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ListFormat::Csv,
            _ => ListFormat::Text,
        }
    }
}

/// Parse a list of inline tokens, keeping their order.
pub fn parse_tokens<I, S>(tokens: I) -> Result<Vec<ChannelSpec>, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|token| ChannelSpec::parse_token(token.as_ref()))
        .collect()
}

/// Read a channel list file in the given format.
pub fn read_list_file(path: &Path, format: ListFormat) -> Result<Vec<ChannelSpec>, ParseError> {
    debug!("reading {format:?} channel list from {}", path.display());
    let file = File::open(path)?;
    match format {
        ListFormat::Text => parse_text_list(BufReader::new(file)),
        ListFormat::Csv => parse_csv_list(file),
    }
}

/// Parse a plain-text list, one `N:Name` token per line. Blank lines are skipped.
pub fn parse_text_list<R: BufRead>(reader: R) -> Result<Vec<ChannelSpec>, ParseError> {
    let mut channels = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        channels.push(parse_token_at(&line, Location::Line(number + 1))?);
    }
    Ok(channels)
}

/// Parse a headerless CSV list of `channel_number,file_number,file_name` rows.
///
/// The output name becomes `"{file_number}.{file_name}"`, with single digit
/// file numbers padded to two digits so the generated names sort in recording
/// order for up to 99 files.
pub fn parse_csv_list<R: Read>(reader: R) -> Result<Vec<ChannelSpec>, ParseError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut channels = Vec::new();
    for (number, record) in csv_reader.records().enumerate() {
        let record = record?;
        let row = record
            .position()
            .map(|position| position.line())
            .unwrap_or(number as u64 + 1);
        if record.len() != 3 {
            return Err(ParseError::WrongColumnCount {
                row,
                found: record.len(),
            });
        }

        let index = parse_channel_number(&record[0], Location::Row(row))?;
        let file_number = record[1]
            .parse::<u32>()
            .map_err(|_| ParseError::InvalidFileNumber {
                row,
                value: record[1].to_owned(),
            })?;
        let name = &record[2];
        if name.is_empty() {
            return Err(ParseError::EmptyName {
                location: Location::Row(row),
                token: record.iter().collect::<Vec<_>>().join(","),
            });
        }

        channels.push(ChannelSpec::new(
            index,
            format!("{}.{name}", pad_file_number(file_number)),
        ));
    }
    Ok(channels)
}

/// Left-pad a one-digit file number with a single zero.
pub fn pad_file_number(file_number: u32) -> String {
    let digits = file_number.to_string();
    if digits.len() == 1 {
        format!("0{digits}")
    } else {
        digits
    }
}

fn parse_token_at(token: &str, location: Location) -> Result<ChannelSpec, ParseError> {
    let (number, name) = token
        .split_once(':')
        .ok_or_else(|| ParseError::MalformedToken {
            location,
            token: token.to_owned(),
        })?;
    let index = parse_channel_number(number, location)?;
    if name.is_empty() {
        return Err(ParseError::EmptyName {
            location,
            token: token.to_owned(),
        });
    }
    Ok(ChannelSpec::new(index, name))
}

fn parse_channel_number(value: &str, location: Location) -> Result<u32, ParseError> {
    let invalid = || ParseError::InvalidChannelNumber {
        location,
        value: value.to_owned(),
    };
    let number = value.trim().parse::<u32>().map_err(|_| invalid())?;
    number.checked_sub(1).ok_or_else(invalid)
}
