//! Beat classes produced by the analysis process.

use core::fmt;

/// Morphological class of a single heartbeat.
///
/// The analysis process labels beats with the single-character annotation
/// codes of the MIT-BIH arrhythmia database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeartClass {
    /// Paced beat (`/`).
    #[cfg_attr(feature = "serde", serde(rename = "/"))]
    Paced,
    /// Left bundle branch block beat (`L`).
    #[cfg_attr(feature = "serde", serde(rename = "L"))]
    LeftBundleBranchBlock,
    /// Normal beat (`N`).
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "N"))]
    Normal,
    /// Right bundle branch block beat (`R`).
    #[cfg_attr(feature = "serde", serde(rename = "R"))]
    RightBundleBranchBlock,
    /// Premature ventricular contraction (`V`).
    #[cfg_attr(feature = "serde", serde(rename = "V"))]
    PrematureVentricular,
}

impl HeartClass {
    /// All classes, in annotation-code order.
    pub const ALL: [HeartClass; 5] = [
        HeartClass::Paced,
        HeartClass::LeftBundleBranchBlock,
        HeartClass::Normal,
        HeartClass::RightBundleBranchBlock,
        HeartClass::PrematureVentricular,
    ];

    /// Parse an annotation code. Surrounding whitespace is ignored.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "/" => Some(HeartClass::Paced),
            "L" => Some(HeartClass::LeftBundleBranchBlock),
            "N" => Some(HeartClass::Normal),
            "R" => Some(HeartClass::RightBundleBranchBlock),
            "V" => Some(HeartClass::PrematureVentricular),
            _ => None,
        }
    }

    /// The annotation code for this class.
    pub fn label(&self) -> &'static str {
        match self {
            HeartClass::Paced => "/",
            HeartClass::LeftBundleBranchBlock => "L",
            HeartClass::Normal => "N",
            HeartClass::RightBundleBranchBlock => "R",
            HeartClass::PrematureVentricular => "V",
        }
    }

    /// Long-form name for display.
    pub fn description(&self) -> &'static str {
        match self {
            HeartClass::Paced => "Paced beat",
            HeartClass::LeftBundleBranchBlock => "Left bundle branch block",
            HeartClass::Normal => "Normal beat",
            HeartClass::RightBundleBranchBlock => "Right bundle branch block",
            HeartClass::PrematureVentricular => "Premature ventricular contraction",
        }
    }

    /// Whether a report may carry this class.
    ///
    /// Reports record only `L`, `N`, `R` and `V`.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, HeartClass::Paced)
    }

    /// Map a classification label onto a reportable class.
    ///
    /// Unknown labels and non-reportable classes fall back to
    /// [`HeartClass::Normal`].
    pub fn for_report(label: &str) -> Self {
        match Self::from_label(label) {
            Some(class) if class.is_reportable() => class,
            _ => HeartClass::Normal,
        }
    }
}

impl fmt::Display for HeartClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
