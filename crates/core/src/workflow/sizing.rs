//! Output frame sizing for latent-size nodes.

use serde::{Deserialize, Serialize};

use crate::client::NodeOverride;

use super::{Dimensions, SelectionError};

/// Named aspect ratios accepted wherever a ratio is parsed.
pub const NAMED_RATIOS: &[(&str, f64)] = &[
    ("1:1", 1.0),
    ("4:3", 4.0 / 3.0),
    ("3:4", 3.0 / 4.0),
    ("16:9", 16.0 / 9.0),
    ("9:16", 9.0 / 16.0),
    ("3:2", 3.0 / 2.0),
    ("2:3", 2.0 / 3.0),
    ("21:9", 21.0 / 9.0),
    ("9:21", 9.0 / 21.0),
];

/// Ratio differences below this pick `Stretch` in `Auto` mode.
const AUTO_STRETCH_THRESHOLD: f64 = 0.2;

/// How a source frame is fitted into a target shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Keep the source ratio, whole frame visible.
    #[default]
    Contain,
    /// Keep the source ratio, fill the target.
    Cover,
    /// Ignore the source ratio.
    Stretch,
    /// `Stretch` for close ratios, otherwise `Contain`. Only meaningful for
    /// `OutputSizing::Resolution`; elsewhere it behaves like `Contain`.
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotateTarget {
    Portrait,
    Landscape,
    /// Swap the orientation.
    #[default]
    Auto,
}

/// Requested output size, relative to the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutputSizing {
    Original,
    Ratio {
        ratio: f64,
        #[serde(default)]
        fit: FitMode,
    },
    Resolution {
        width: u32,
        height: u32,
        #[serde(default = "auto_fit")]
        fit: FitMode,
    },
    Rotate {
        #[serde(default)]
        target: RotateTarget,
    },
}

fn auto_fit() -> FitMode {
    FitMode::Auto
}

/// Parse `16:9`, any `W:H` pair, or a plain decimal width/height ratio.
pub fn parse_ratio(s: &str) -> Result<f64, SelectionError> {
    let s = s.trim();
    if let Some((_, ratio)) = NAMED_RATIOS.iter().find(|(name, _)| *name == s) {
        return Ok(*ratio);
    }

    let ratio = match s.split_once(':') {
        Some((w, h)) => {
            let w: f64 = w.trim().parse().map_err(|_| invalid_ratio(s))?;
            let h: f64 = h.trim().parse().map_err(|_| invalid_ratio(s))?;
            w / h
        }
        None => s.parse().map_err(|_| invalid_ratio(s))?,
    };

    if ratio.is_finite() && ratio > 0.0 {
        Ok(ratio)
    } else {
        Err(invalid_ratio(s))
    }
}

fn invalid_ratio(s: &str) -> SelectionError {
    SelectionError::InvalidSizing(format!("invalid aspect ratio: {}", s))
}

fn floor8(value: f64) -> u32 {
    let value = value.max(0.0) as u32;
    (value / 8) * 8
}

fn fit_to_ratio(source: Dimensions, ratio: f64, fit: FitMode) -> Dimensions {
    let (sw, sh) = (f64::from(source.width), f64::from(source.height));
    let source_ratio = source.aspect_ratio();

    let (width, height) = match fit {
        FitMode::Stretch => (sh * ratio, sh),
        FitMode::Contain | FitMode::Auto => {
            if source_ratio > ratio {
                (sw, sw / ratio)
            } else {
                (sh * ratio, sh)
            }
        }
        FitMode::Cover => {
            if source_ratio > ratio {
                (sh * ratio, sh)
            } else {
                (sw, sw / ratio)
            }
        }
    };

    Dimensions::new(floor8(width), floor8(height))
}

fn fit_to_resolution(source: Dimensions, target: Dimensions, fit: FitMode) -> Dimensions {
    let source_ratio = source.aspect_ratio();
    let target_ratio = target.aspect_ratio();
    let (tw, th) = (f64::from(target.width), f64::from(target.height));

    let fit = match fit {
        FitMode::Auto => {
            let diff = (source_ratio - target_ratio).abs() / source_ratio.max(target_ratio);
            if diff < AUTO_STRETCH_THRESHOLD {
                FitMode::Stretch
            } else {
                FitMode::Contain
            }
        }
        other => other,
    };

    let (width, height) = match fit {
        FitMode::Stretch | FitMode::Auto => (tw, th),
        FitMode::Contain => {
            if source_ratio > target_ratio {
                (tw, tw / source_ratio)
            } else {
                (th * source_ratio, th)
            }
        }
        FitMode::Cover => {
            if source_ratio > target_ratio {
                (th * source_ratio, th)
            } else {
                (tw, tw / source_ratio)
            }
        }
    };

    Dimensions::new(floor8(width), floor8(height))
}

impl OutputSizing {
    /// Output frame size for a source frame.
    ///
    /// `Original` returns the source size unchanged; every other mode rounds
    /// both sides down to a multiple of 8.
    pub fn compute(&self, source: Dimensions) -> Result<Dimensions, SelectionError> {
        if source.width == 0 || source.height == 0 {
            return Err(SelectionError::InvalidSizing(format!(
                "source frame has no area: {}",
                source
            )));
        }

        match *self {
            OutputSizing::Original => Ok(source),
            OutputSizing::Ratio { ratio, fit } => {
                if !(ratio.is_finite() && ratio > 0.0) {
                    return Err(SelectionError::InvalidSizing(format!(
                        "invalid aspect ratio: {}",
                        ratio
                    )));
                }
                Ok(fit_to_ratio(source, ratio, fit))
            }
            OutputSizing::Resolution { width, height, fit } => {
                if width == 0 || height == 0 {
                    return Err(SelectionError::InvalidSizing(format!(
                        "target resolution has no area: {}x{}",
                        width, height
                    )));
                }
                Ok(fit_to_resolution(source, Dimensions::new(width, height), fit))
            }
            OutputSizing::Rotate { target } => {
                let source_ratio = source.aspect_ratio();
                let ratio = match target {
                    RotateTarget::Auto => 1.0 / source_ratio,
                    RotateTarget::Portrait => source_ratio.min(3.0 / 4.0),
                    RotateTarget::Landscape => source_ratio.max(4.0 / 3.0),
                };
                Ok(fit_to_ratio(source, ratio, FitMode::Contain))
            }
        }
    }
}

/// Width and height overrides for an EmptyLatentImage-style node.
pub fn latent_overrides(node_id: &str, size: Dimensions) -> Vec<NodeOverride> {
    vec![
        NodeOverride::new(node_id, "width", size.width.to_string()),
        NodeOverride::new(node_id, "height", size.height.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: Dimensions = Dimensions {
        width: 1024,
        height: 768,
    };

    #[test]
    fn test_original_keeps_source() {
        assert_eq!(OutputSizing::Original.compute(SOURCE).unwrap(), SOURCE);
    }

    #[test]
    fn test_ratio_contain() {
        let size = OutputSizing::Ratio {
            ratio: 9.0 / 16.0,
            fit: FitMode::Contain,
        }
        .compute(SOURCE)
        .unwrap();
        assert_eq!(size, Dimensions::new(1024, 1816));
    }

    #[test]
    fn test_ratio_cover_and_stretch() {
        let cover = OutputSizing::Ratio {
            ratio: 1.0,
            fit: FitMode::Cover,
        }
        .compute(SOURCE)
        .unwrap();
        assert_eq!(cover, Dimensions::new(768, 768));

        let stretch = OutputSizing::Ratio {
            ratio: 16.0 / 9.0,
            fit: FitMode::Stretch,
        }
        .compute(SOURCE)
        .unwrap();
        assert_eq!(stretch, Dimensions::new(1360, 768));
    }

    #[test]
    fn test_resolution_auto_picks_contain_for_far_ratio() {
        let size = OutputSizing::Resolution {
            width: 720,
            height: 1280,
            fit: FitMode::Auto,
        }
        .compute(SOURCE)
        .unwrap();
        assert_eq!(size, Dimensions::new(720, 536));
    }

    #[test]
    fn test_resolution_auto_picks_stretch_for_close_ratio() {
        let size = OutputSizing::Resolution {
            width: 1280,
            height: 1000,
            fit: FitMode::Auto,
        }
        .compute(SOURCE)
        .unwrap();
        assert_eq!(size, Dimensions::new(1280, 1000));
    }

    #[test]
    fn test_rotate_auto_swaps_orientation() {
        let size = OutputSizing::Rotate {
            target: RotateTarget::Auto,
        }
        .compute(SOURCE)
        .unwrap();
        assert_eq!(size, Dimensions::new(1024, 1360));
        assert!(size.height > size.width);
    }

    #[test]
    fn test_zero_source_is_rejected() {
        assert!(OutputSizing::Original.compute(Dimensions::new(0, 10)).is_err());
    }

    #[test]
    fn test_parse_ratio() {
        assert_eq!(parse_ratio("16:9").unwrap(), 16.0 / 9.0);
        assert_eq!(parse_ratio("5:4").unwrap(), 1.25);
        assert_eq!(parse_ratio("0.5").unwrap(), 0.5);
        assert!(parse_ratio("wide").is_err());
        assert!(parse_ratio("1:0").is_err());
    }

    #[test]
    fn test_sizing_serde() {
        let sizing: OutputSizing =
            serde_json::from_str(r#"{"mode": "resolution", "width": 720, "height": 1280}"#).unwrap();
        assert_eq!(
            sizing,
            OutputSizing::Resolution {
                width: 720,
                height: 1280,
                fit: FitMode::Auto
            }
        );
    }

    #[test]
    fn test_latent_overrides() {
        let overrides = latent_overrides("38", Dimensions::new(512, 768));
        assert_eq!(overrides[0], NodeOverride::new("38", "width", "512"));
        assert_eq!(overrides[1], NodeOverride::new("38", "height", "768"));
    }
}
