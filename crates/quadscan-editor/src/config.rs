//! Editor, gateway, and output configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Dimensions;

/// What happens to a dragged corner when it is released.
///
/// Snapping is only ever applied at release, never while the pointer is
/// moving, so dragging stays smooth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum SnapPolicy {
    /// Keep the exact release position.
    #[default]
    Off,
    /// Quantize both axes to multiples of `step` canvas pixels.
    Grid {
        /// Grid step in canvas pixels.
        step: f64,
    },
}

impl SnapPolicy {
    /// Grid step used by the original editor.
    pub const DEFAULT_GRID_STEP: f64 = 5.0;

    /// The grid policy with [`DEFAULT_GRID_STEP`](Self::DEFAULT_GRID_STEP).
    #[must_use]
    pub const fn grid() -> Self {
        Self::Grid {
            step: Self::DEFAULT_GRID_STEP,
        }
    }
}

/// Configuration for the selection editor and workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Largest canvas surface; bigger images are scaled down uniformly
    /// to fit inside this box.
    pub max_canvas: Dimensions,

    /// Radius in canvas pixels within which a press grabs an existing
    /// corner instead of placing a new one.
    pub hit_radius: f64,

    /// Release policy for dragged corners.
    pub snap: SnapPolicy,

    /// Window in which repeated reprocess triggers coalesce into one
    /// request carrying the latest parameters.
    #[serde(with = "millis")]
    pub reprocess_debounce: Duration,
}

impl EditorConfig {
    /// Default maximum canvas width.
    pub const DEFAULT_MAX_WIDTH: u32 = 800;
    /// Default maximum canvas height.
    pub const DEFAULT_MAX_HEIGHT: u32 = 600;
    /// Default hit radius in canvas pixels.
    pub const DEFAULT_HIT_RADIUS: f64 = 20.0;
    /// Default reprocess debounce window.
    pub const DEFAULT_REPROCESS_DEBOUNCE: Duration = Duration::from_millis(100);
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_canvas: Dimensions::new(Self::DEFAULT_MAX_WIDTH, Self::DEFAULT_MAX_HEIGHT),
            hit_radius: Self::DEFAULT_HIT_RADIUS,
            snap: SnapPolicy::Off,
            reprocess_debounce: Self::DEFAULT_REPROCESS_DEBOUNCE,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Where the processing service lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    /// Prefix for every endpoint path. Empty means same origin, root
    /// path; a value like `/scan` supports sub-path deployments.
    pub base_url: String,
}

impl GatewayConfig {
    /// Join `path` onto the base URL with exactly one `/` between them.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

/// Color treatment of the processed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// White-balanced color output.
    #[default]
    Color,
    /// High-contrast black and white output.
    Grayscale,
}

impl OutputMode {
    /// All modes in display order.
    pub const ALL: [Self; 2] = [Self::Color, Self::Grayscale];

    /// Stable identifier used on the wire and in persisted preferences.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Grayscale => "grayscale",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Color => "Color",
            Self::Grayscale => "Black & white",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = UnknownOutputMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "color" => Ok(Self::Color),
            "grayscale" => Ok(Self::Grayscale),
            other => Err(UnknownOutputMode(other.to_owned())),
        }
    }
}

/// A stored or submitted output mode string that is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown output mode: {0:?}")]
pub struct UnknownOutputMode(pub String);

/// Post-processing applied after the perspective warp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingOption {
    /// White balance plus contrast/brightness enhancement.
    #[default]
    Enhanced,
    /// Perspective warp only.
    Plain,
}

impl ProcessingOption {
    /// All options in display order.
    pub const ALL: [Self; 2] = [Self::Enhanced, Self::Plain];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Enhanced => "Enhanced",
            Self::Plain => "Plain",
        }
    }
}

/// The output parameters a user picks for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct OutputPreferences {
    /// Color treatment.
    pub mode: OutputMode,
    /// Post-processing.
    pub processing: ProcessingOption,
}
