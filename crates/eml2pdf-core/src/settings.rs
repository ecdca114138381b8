//! Header labels and page geometry

use serde::{Deserialize, Serialize};

/// Millimetres to PDF points
pub const MM: f32 = 72.0 / 25.4;

/// Built-in label sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPreset {
    /// English labels
    #[default]
    En,
    /// Japanese labels
    Ja,
}

/// Text printed in front of each header line, plus the subject placeholder
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Labels {
    /// Sender label
    pub from: String,
    /// Recipient label
    pub to: String,
    /// Carbon-copy label
    pub cc: String,
    /// Date label
    pub date: String,
    /// Subject used when a message has none
    pub no_subject: String,
}

impl Labels {
    /// English labels
    #[must_use]
    pub fn english() -> Self {
        Self {
            from: "From".to_string(),
            to: "To".to_string(),
            cc: "CC".to_string(),
            date: "Date".to_string(),
            no_subject: crate::eml::DEFAULT_NO_SUBJECT.to_string(),
        }
    }

    /// Japanese labels
    #[must_use]
    pub fn japanese() -> Self {
        Self {
            from: "差出人".to_string(),
            to: "宛先".to_string(),
            cc: "CC".to_string(),
            date: "日時".to_string(),
            no_subject: "(件名なし)".to_string(),
        }
    }

    /// Labels for a preset
    #[must_use]
    pub fn preset(preset: LabelPreset) -> Self {
        match preset {
            LabelPreset::En => Self::english(),
            LabelPreset::Ja => Self::japanese(),
        }
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::english()
    }
}

/// Supported paper sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// ISO A4, 210 x 297 mm
    #[default]
    A4,
    /// US Letter, 8.5 x 11 in
    Letter,
}

impl PageSize {
    /// Width and height in points
    #[must_use]
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0 * MM, 297.0 * MM),
            Self::Letter => (612.0, 792.0),
        }
    }
}

/// Page geometry: fixed size, uniform margins
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    /// Paper size
    pub size: PageSize,
    /// Margin on every side, in millimetres
    pub margin_mm: f32,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margin_mm: 20.0,
        }
    }
}

impl PageSetup {
    /// Margin in points
    #[must_use]
    pub fn margin(&self) -> f32 {
        self.margin_mm * MM
    }

    /// Width available to text, in points
    #[must_use]
    pub fn frame_width(&self) -> f32 {
        self.size.dimensions().0 - 2.0 * self.margin()
    }

    /// Whether the margins are non-negative and leave a text frame on the
    /// page in both directions
    #[must_use]
    pub fn is_usable(&self) -> bool {
        let (width, height) = self.size.dimensions();
        self.margin_mm.is_finite()
            && self.margin_mm >= 0.0
            && 2.0 * self.margin() < width.min(height)
    }
}
