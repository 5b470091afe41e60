//! Parsing and serializing multi-valued flags.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while handling multi-value formats.
#[derive(Debug, Error)]
pub enum MultiValueError {
    #[error("unsupported multi format '{0}', allowed formats are: comma, newline, space, json")]
    UnknownFormat(String),

    #[error("multi format 'json' cannot be combined with other formats")]
    JsonCombined,

    #[error("invalid json multi value {0} for flag {1}: {2}")]
    InvalidJson(String, String, serde_json::Error),

    #[error("failed to encode multi values as json: {0}")]
    Encode(#[from] serde_json::Error),
}

/// How several values are packed into one raw string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiFormat {
    Comma,
    Newline,
    Space,
    Json,
}

impl MultiFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MultiFormat::Comma => "comma",
            MultiFormat::Newline => "newline",
            MultiFormat::Space => "space",
            MultiFormat::Json => "json",
        }
    }

    fn separators(&self) -> &'static [char] {
        match self {
            MultiFormat::Comma => &[','],
            MultiFormat::Newline => &['\r', '\n'],
            MultiFormat::Space => &[' '],
            MultiFormat::Json => &[],
        }
    }
}

impl fmt::Display for MultiFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MultiFormat {
    type Err = MultiValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "comma" => Ok(MultiFormat::Comma),
            "newline" => Ok(MultiFormat::Newline),
            "space" => Ok(MultiFormat::Space),
            "json" => Ok(MultiFormat::Json),
            other => Err(MultiValueError::UnknownFormat(other.to_string())),
        }
    }
}

/// Parse format names as given on the command line.
///
/// Each entry may hold several comma-separated names. Duplicates are dropped
/// and `json` must stand alone.
pub fn parse_format_list(names: &[String]) -> Result<Vec<MultiFormat>, MultiValueError> {
    let mut formats = Vec::new();
    for name in names.iter().flat_map(|n| n.split(',')) {
        if name.trim().is_empty() {
            continue;
        }
        let format: MultiFormat = name.parse()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    check_json_alone(&formats)?;
    Ok(formats)
}

fn check_json_alone(formats: &[MultiFormat]) -> Result<bool, MultiValueError> {
    let has_json = formats.contains(&MultiFormat::Json);
    if has_json && formats.len() > 1 {
        return Err(MultiValueError::JsonCombined);
    }
    Ok(has_json)
}

/// Turn the raw occurrences of a flag into its logical values.
///
/// `None` stays `None`. Without formats every occurrence is one value. With
/// `json`, each occurrence is a JSON array of strings or a single JSON
/// string. Otherwise occurrences are split on the separators of every format,
/// fragments are trimmed and empty ones dropped.
pub fn parse_multi_values(
    formats: &[MultiFormat],
    raw: Option<&[String]>,
    field: &str,
) -> Result<Option<Vec<String>>, MultiValueError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(Some(Vec::new()));
    }
    if formats.is_empty() {
        return Ok(Some(raw.to_vec()));
    }

    if check_json_alone(formats)? {
        let mut values = Vec::new();
        for occurrence in raw {
            let occurrence = occurrence.trim();
            if occurrence.is_empty() {
                continue;
            }
            if let Ok(list) = serde_json::from_str::<Vec<String>>(occurrence) {
                values.extend(list);
                continue;
            }
            match serde_json::from_str::<String>(occurrence) {
                Ok(value) => values.push(value),
                Err(e) => {
                    return Err(MultiValueError::InvalidJson(
                        occurrence.to_string(),
                        field.to_string(),
                        e,
                    ))
                }
            }
        }
        return Ok(Some(values));
    }

    let separators: Vec<char> = formats
        .iter()
        .flat_map(|f| f.separators().iter().copied())
        .collect();
    let values = raw
        .iter()
        .flat_map(|occurrence| occurrence.split(separators.as_slice()))
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_string)
        .collect();
    Ok(Some(values))
}

/// Pack values into a single string for output.
///
/// Without formats values are joined with `,`. With several non-json
/// formats the separator is picked by priority comma, newline, space, so the
/// output does not depend on the order formats were declared in.
pub fn serialize_multi_values(
    formats: &[MultiFormat],
    values: &[String],
) -> Result<String, MultiValueError> {
    let is_json = check_json_alone(formats)?;
    if values.is_empty() {
        return Ok(if is_json { "[]".to_string() } else { String::new() });
    }
    if formats.is_empty() {
        return Ok(values.join(","));
    }
    if is_json {
        return Ok(serde_json::to_string(values)?);
    }

    let separator = [
        (MultiFormat::Comma, ","),
        (MultiFormat::Newline, "\n"),
        (MultiFormat::Space, " "),
    ]
    .into_iter()
    .find(|(format, _)| formats.contains(format))
    .map(|(_, sep)| sep)
    .unwrap_or(",");
    Ok(values.join(separator))
}
