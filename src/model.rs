use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Stable identifier handed out by the media source. Survives renames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub uri: PathBuf,
    pub duration_seconds: f64,
    pub artist: String,
}

impl Track {
    /// Copy of this track pointing at a new location. `id` is kept.
    pub fn renamed(&self, title: &str, uri: PathBuf) -> Self {
        Self {
            title: title.to_string(),
            uri,
            ..self.clone()
        }
    }
}

/// Raw enumeration record as reported by a media source.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioAsset {
    pub id: TrackId,
    pub filename: String,
    pub uri: PathBuf,
    pub duration_seconds: f64,
    pub artist: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::All => "all",
            Self::One => "one",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// Strips the last extension, the way titles are derived from filenames.
pub fn title_from_filename(filename: &str) -> String {
    match filename.rfind('.') {
        Some(dot) if dot > 0 => filename[..dot].to_string(),
        _ => filename.to_string(),
    }
}

/// `m:ss`, minutes unpadded.
pub fn format_time(millis: u64) -> String {
    let total_seconds = millis / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes}:{seconds:02}")
}
