//! Media kinds accepted as workflow inputs.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Allowed video extensions (lowercase).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

/// Allowed image extensions (lowercase).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

/// Kind of media a workflow consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Video => VIDEO_EXTENSIONS,
            MediaKind::Image => IMAGE_EXTENSIONS,
        }
    }

    /// Whether a file name carries an extension allowed for this kind.
    pub fn allows(&self, file_name: &str) -> bool {
        extension_of(file_name)
            .map(|ext| self.extensions().contains(&ext.as_str()))
            .unwrap_or(false)
    }

    /// Mime type sent with uploads, e.g. `video/mp4` or `image/jpeg`.
    pub fn mime_for(&self, file_name: &str) -> String {
        let ext = extension_of(file_name).unwrap_or_default();
        match (self, ext.as_str()) {
            (MediaKind::Image, "jpg") => "image/jpeg".to_string(),
            (_, "") => format!("{}/*", self.as_str()),
            (_, ext) => format!("{}/{}", self.as_str(), ext),
        }
    }

    /// Guess the kind from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if MediaKind::Video.allows(name) {
            Some(MediaKind::Video)
        } else if MediaKind::Image.allows(name) {
            Some(MediaKind::Image)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Ok(MediaKind::Video),
            "image" => Ok(MediaKind::Image),
            other => Err(format!("unknown media kind: {}", other)),
        }
    }
}

/// Lowercased extension of a file name, if any.
pub fn extension_of(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
