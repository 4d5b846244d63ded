use crate::error::{AnnotateError, Result};
use crate::signal::Signal;
use csv::{ReaderBuilder, Trim};
use std::path::Path;

/// Split comma- and newline-delimited text into non-empty tokens.
/// Lines starting with `#` are skipped.
fn tokens(text: &str) -> std::result::Result<Vec<String>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(text.as_bytes());
    let mut out = Vec::new();
    for record in reader.records() {
        let record = record?;
        out.extend(
            record
                .iter()
                .filter(|field| !field.is_empty())
                .map(str::to_owned),
        );
    }
    Ok(out)
}

/// Parse a delimited list of samples.
pub fn parse_signal(text: &str) -> Result<Signal> {
    let fields = tokens(text).map_err(|e| AnnotateError::InvalidSignal(e.to_string()))?;
    let mut samples = Vec::with_capacity(fields.len());
    for (idx, field) in fields.iter().enumerate() {
        let value: f64 = field.parse().map_err(|_| {
            AnnotateError::InvalidSignal(format!("value {} is not a number: {field:?}", idx + 1))
        })?;
        samples.push(value);
    }
    Signal::new(samples)
}

/// Parse a delimited list of 1-based sample indices. An empty text is an
/// empty list.
pub fn parse_annotations(text: &str) -> Result<Vec<usize>> {
    let fields = tokens(text).map_err(|e| AnnotateError::MalformedAnnotation {
        token: e.to_string(),
        position: 0,
    })?;
    fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            field
                .parse::<usize>()
                .map_err(|_| AnnotateError::MalformedAnnotation {
                    token: field.clone(),
                    position: idx + 1,
                })
        })
        .collect()
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| AnnotateError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_signal(path: &Path) -> Result<Signal> {
    parse_signal(&read_text(path)?)
}

/// Undecodable bytes surface as a malformed token rather than an I/O error.
pub fn read_annotations(path: &Path) -> Result<Vec<usize>> {
    let bytes = std::fs::read(path).map_err(|source| AnnotateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_annotations(&String::from_utf8_lossy(&bytes))
}
