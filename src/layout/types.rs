use serde::Serialize;

use crate::color::RgbColor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelOrientation {
    /// Baseline follows the arc.
    Tangential,
    /// Baseline follows the radius.
    Radial,
}

/// Where a wedge label sits. Radius is a fraction of the chart radius and
/// rotation is in degrees, already flipped so the text is never upside-down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelAnchor {
    pub angle: f64,
    pub radius: f64,
    pub rotation: f64,
    pub orientation: LabelOrientation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubqueryWedge {
    pub label: String,
    pub start_angle: f64,
    pub end_angle: f64,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub color: RgbColor,
    pub anchor: LabelAnchor,
}

impl SubqueryWedge {
    pub fn span(&self) -> f64 {
        self.end_angle - self.start_angle
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryWedge {
    pub category: String,
    pub start_angle: f64,
    pub end_angle: f64,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub color: RgbColor,
    pub row_count: usize,
    pub anchor: LabelAnchor,
    pub children: Vec<SubqueryWedge>,
}

impl CategoryWedge {
    pub fn span(&self) -> f64 {
        self.end_angle - self.start_angle
    }
}

/// Wedge geometry in unit space. Angles are degrees clockwise from 12 o'clock;
/// radii are fractions of `min(width, height) / 2`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SunburstLayout {
    pub seed: Option<String>,
    pub total_rows: usize,
    pub center_radius: f64,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub wedges: Vec<CategoryWedge>,
}

impl SunburstLayout {
    pub fn subquery_count(&self) -> usize {
        self.wedges.iter().map(|w| w.children.len()).sum()
    }
}
