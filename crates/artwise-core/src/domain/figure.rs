//! Figures: the visual units placed on the board grid.

use serde::{Deserialize, Serialize};

use super::build_number::BuildNumber;

/// Color classification. Warm and cold are picked from palettes by the viewer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Color {
    #[serde(rename = "WARM")]
    Warm,
    #[serde(rename = "COLD")]
    Cold,
    /// Neutral, for jobs whose last status is unknown.
    #[serde(rename = "grey")]
    Grey,
    #[serde(rename = "blue")]
    Blue,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FigureType {
    #[serde(rename = "passed")]
    Passed,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "passed_after_fail")]
    PassedAfterFail,
    #[serde(rename = "fail_repeated")]
    FailRepeated,
    #[serde(rename = "building")]
    Building,
    #[serde(rename = "great_success")]
    GreatSuccess,
    #[serde(rename = "winter/great_success")]
    WinterGreatSuccess,
}

impl FigureType {
    /// Pass/fail type of an entry, relative to whether its predecessor passed.
    pub fn for_outcome(successful: bool, previous_successful: bool) -> Self {
        match (successful, previous_successful) {
            (true, false) => FigureType::PassedAfterFail,
            (true, true) => FigureType::Passed,
            (false, false) => FigureType::FailRepeated,
            (false, true) => FigureType::Failed,
        }
    }

    /// Types that count towards a four-in-a-row.
    pub fn is_successful(&self) -> bool {
        matches!(self, FigureType::Passed | FigureType::PassedAfterFail)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Border {
    Solid,
    Dotted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Diagonal,
    Vertical,
    Horizontal,
}

/// Four-in-a-row annotation on a figure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FourMark {
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub starter: bool,
}

/// Board background hint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    /// Some job is building.
    Blue,
    /// Latest run passed.
    Green,
    /// Latest run failed.
    Orange,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Figure {
    pub color: Color,

    #[serde(rename = "type")]
    pub figure_type: FigureType,

    pub border: Border,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info2: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word1: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word2: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initials: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<BuildNumber>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub four: Option<FourMark>,
}

impl Figure {
    pub fn new(color: Color, figure_type: FigureType, border: Border) -> Self {
        Self {
            color,
            figure_type,
            border,
            info: None,
            info2: None,
            word1: None,
            word2: None,
            initials: None,
            key: None,
            four: None,
        }
    }

    pub fn is_dotted(&self) -> bool {
        self.border == Border::Dotted
    }
}

/// Fixed board dimensions, addressed row-major by linear index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
}

impl Default for Grid {
    fn default() -> Self {
        Grid { rows: 4, cols: 6 }
    }
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Grid { rows, cols }
    }

    pub fn capacity(&self) -> usize {
        self.rows * self.cols
    }

    /// `(row, col)` of linear index `i`.
    pub fn position(&self, i: usize) -> (usize, usize) {
        (i / self.cols, i % self.cols)
    }

    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }
}
