//! Frame dimensions and orientation probing.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::SelectionError;

/// Frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height. Zero height counts as square.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 1.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::from_dimensions(*self)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Strictly wider than tall is landscape; square counts as portrait.
    pub fn from_dimensions(dimensions: Dimensions) -> Self {
        if dimensions.width > dimensions.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "landscape" | "horizontal" => Ok(Orientation::Landscape),
            "portrait" | "vertical" => Ok(Orientation::Portrait),
            other => Err(format!("unknown orientation: {}", other)),
        }
    }
}

/// Reads the frame size of a local media file. Blocking.
pub trait DimensionProbe: Send + Sync {
    fn dimensions(&self, path: &Path) -> Result<Dimensions, SelectionError>;
}

/// Probe backed by the `ffprobe` executable.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe_path: PathBuf,
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Parses `ffprobe -show_streams -print_format json` output.
    fn parse_output(output: &str) -> Result<Dimensions, SelectionError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            width: Option<u32>,
            height: Option<u32>,
        }

        let probe: ProbeOutput = serde_json::from_str(output)
            .map_err(|e| SelectionError::Probe(format!("failed to parse ffprobe output: {}", e)))?;

        probe
            .streams
            .iter()
            .find_map(|s| match (s.width, s.height) {
                (Some(width), Some(height)) if width > 0 && height > 0 => {
                    Some(Dimensions::new(width, height))
                }
                _ => None,
            })
            .ok_or_else(|| SelectionError::Probe("no stream with a frame size".into()))
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl DimensionProbe for FfprobeProbe {
    fn dimensions(&self, path: &Path) -> Result<Dimensions, SelectionError> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-select_streams",
                "v:0",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SelectionError::Probe(format!(
                        "ffprobe not found at {}",
                        self.ffprobe_path.display()
                    ))
                } else {
                    SelectionError::Probe(e.to_string())
                }
            })?;

        if !output.status.success() {
            return Err(SelectionError::Probe(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Self::parse_output(&String::from_utf8_lossy(&output.stdout))
    }
}
