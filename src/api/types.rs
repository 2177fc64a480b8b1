use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::http::RequestError;
use crate::runtime::Runtime;

/// Depth of an audio analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisLevel {
    Basic,
    #[default]
    Standard,
    Detailed,
    Professional,
}

impl fmt::Display for AnalysisLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisLevel::Basic => write!(f, "BASIC"),
            AnalysisLevel::Standard => write!(f, "STANDARD"),
            AnalysisLevel::Detailed => write!(f, "DETAILED"),
            AnalysisLevel::Professional => write!(f, "PROFESSIONAL"),
        }
    }
}

impl FromStr for AnalysisLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BASIC" => Ok(AnalysisLevel::Basic),
            "STANDARD" => Ok(AnalysisLevel::Standard),
            "DETAILED" => Ok(AnalysisLevel::Detailed),
            "PROFESSIONAL" => Ok(AnalysisLevel::Professional),
            _ => anyhow::bail!(
                "Unknown analysis level: {}. Expected basic, standard, detailed, or professional.",
                s
            ),
        }
    }
}

/// What to extract when generating MIDI from audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionType {
    #[default]
    Melody,
    Harmony,
    Drums,
    BassLine,
}

impl fmt::Display for ExtractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionType::Melody => write!(f, "melody"),
            ExtractionType::Harmony => write!(f, "harmony"),
            ExtractionType::Drums => write!(f, "drums"),
            ExtractionType::BassLine => write!(f, "bass_line"),
        }
    }
}

impl FromStr for ExtractionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "melody" => Ok(ExtractionType::Melody),
            "harmony" => Ok(ExtractionType::Harmony),
            "drums" => Ok(ExtractionType::Drums),
            "bass_line" | "bass" => Ok(ExtractionType::BassLine),
            _ => anyhow::bail!(
                "Unknown extraction type: {}. Expected melody, harmony, drums, or bass_line.",
                s
            ),
        }
    }
}

/// Backend health report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Audio file contents ready to upload.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl AudioFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime = mime_for(&file_name).to_string();
        Self {
            file_name,
            bytes,
            mime,
        }
    }

    /// Reads an audio file through the runtime, naming it after the path.
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let bytes = runtime
            .read(path)
            .with_context(|| format!("Failed to load audio file {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();
        Ok(Self::new(file_name, bytes))
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("aif") | Some("aiff") => "audio/aiff",
        Some("ogg") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

/// Pulls an array field out of a response object.
///
/// A missing or null field yields an empty list. A body that is not an
/// object, or a field that is not an array, is a decode error.
pub(crate) fn array_field(body: Value, field: &str) -> Result<Vec<Value>, RequestError> {
    let Value::Object(mut object) = body else {
        return Err(RequestError::Decode(format!(
            "expected a JSON object containing '{}'",
            field
        )));
    };

    match object.remove(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(RequestError::Decode(format!(
            "expected '{}' to be an array, got {}",
            field, other
        ))),
    }
}
