// THEORY:
// A `Feature` is the output of the spatial grouping layer: one coherent
// oceanographic structure found in the gradient field. Where a `GradientPoint`
// says "the water changes quickly here", a `Feature` says "these forty points
// form a thermal front two miles long".
//
// Key architectural principles:
// 1.  **Shared Base, Tagged Shape**: Every feature has the same geometric and
//     thermal summary (hull, area, aspect ratio, value range, confidence, score).
//     What differs per kind lives in the `FeatureShape` variant, so consumers
//     match on the shape instead of probing for optional fields.
// 2.  **Stateless Data Container**: A feature is built once by the detector and
//     never mutated afterwards. It has no memory of earlier analyses.
// 3.  **Self-Scoring**: The 0-100 quality score is a pure function of the
//     feature's own attributes and is computed in `compute_score`.

use crate::core_modules::utils::geo::geo::{LatLng, Polygon};
use serde::Serialize;

/// Eddies with a mean temperature above this are warm-core.
pub const WARM_CORE_THRESHOLD_F: f64 = 70.0;

/// The three structure kinds the detector can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Edge,
    Filament,
    Eddy,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Edge => "edge",
            FeatureType::Filament => "filament",
            FeatureType::Eddy => "eddy",
        }
    }

    /// Display colour used by map overlays.
    pub fn color(&self) -> &'static str {
        match self {
            FeatureType::Edge => "#FF0000",
            FeatureType::Filament => "#FFFF00",
            FeatureType::Eddy => "#00FF00",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EddyCore {
    Warm,
    Cold,
}

/// Kind-specific attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeatureShape {
    Edge,
    #[serde(rename_all = "camelCase")]
    Filament {
        /// Longest side of the bounding box.
        length_km: f64,
    },
    #[serde(rename_all = "camelCase")]
    Eddy {
        /// Radius of the circle with the same area as the hull.
        radius_km: f64,
        core: EddyCore,
        /// Fraction of points whose gradient runs along the rim.
        tangential_fraction: f64,
    },
}

/// A detected oceanographic structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// Deterministic identifier such as `edge-0`.
    pub id: String,
    #[serde(flatten)]
    pub shape: FeatureShape,
    /// Convex hull of the member points.
    pub boundary: Polygon,
    pub centroid: LatLng,
    pub min_temp_f: f64,
    pub max_temp_f: f64,
    pub avg_temp_f: f64,
    pub temp_diff_f: f64,
    pub temp_diff_c: f64,
    pub area_km2: f64,
    pub perimeter_km: f64,
    /// `min(width, height) / max(width, height)` of the bounding box, in (0, 1].
    pub aspect_ratio: f64,
    pub confidence: f64,
    pub score: u8,
    pub point_count: usize,
    pub color: &'static str,
    pub description: String,
}

impl Feature {
    pub fn kind(&self) -> FeatureType {
        match self.shape {
            FeatureShape::Edge => FeatureType::Edge,
            FeatureShape::Filament { .. } => FeatureType::Filament,
            FeatureShape::Eddy { .. } => FeatureType::Eddy,
        }
    }

    /// Up to 40 points for thermal contrast, 20 for size, 20 for how well the
    /// shape fits its kind and 20 for confidence.
    pub fn compute_score(&self) -> u8 {
        let contrast = (self.temp_diff_f * 10.0).min(40.0);
        let size = (self.area_km2 / 5.0).min(20.0);
        let shape = match self.shape {
            FeatureShape::Edge => (1.0 - self.aspect_ratio) * 20.0,
            FeatureShape::Filament { .. } => (1.0 - self.aspect_ratio) * 15.0,
            FeatureShape::Eddy { .. } => self.aspect_ratio * 20.0,
        };
        let confidence = self.confidence * 20.0;

        (contrast + size + shape + confidence).round().clamp(0.0, 100.0) as u8
    }
}

/// Confidence of a feature given its kind, thermal contrast and aspect ratio.
pub fn feature_confidence(kind: FeatureType, temp_diff_f: f64, aspect_ratio: f64) -> f64 {
    let raw = match kind {
        FeatureType::Edge => temp_diff_f / 5.0,
        FeatureType::Filament => (1.0 - aspect_ratio) * (temp_diff_f / 2.0),
        FeatureType::Eddy => aspect_ratio * (temp_diff_f / 3.0),
    };
    raw.clamp(0.0, 1.0)
}

pub(crate) fn describe(shape: &FeatureShape, temp_diff_f: f64) -> String {
    match shape {
        FeatureShape::Edge => format!("Temperature edge with {:.1}°F difference", temp_diff_f),
        FeatureShape::Filament { length_km } => format!("Temperature filament, {:.1}km long", length_km),
        FeatureShape::Eddy { radius_km, core, .. } => {
            let core = match core {
                EddyCore::Warm => "Warm",
                EddyCore::Cold => "Cold",
            };
            format!("{} eddy, {:.1}km radius", core, radius_km)
        }
    }
}

/// Converts a temperature difference; no 32°F offset.
pub(crate) fn temp_diff_c(temp_diff_f: f64) -> f64 {
    temp_diff_f * 5.0 / 9.0
}

/// Per-kind totals for the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCounts {
    pub edges: usize,
    pub filaments: usize,
    pub eddies: usize,
}

impl FeatureCounts {
    pub fn tally(features: &[Feature]) -> Self {
        features.iter().fold(FeatureCounts::default(), |mut counts, feature| {
            match feature.kind() {
                FeatureType::Edge => counts.edges += 1,
                FeatureType::Filament => counts.filaments += 1,
                FeatureType::Eddy => counts.eddies += 1,
            }
            counts
        })
    }

    pub fn total(&self) -> usize {
        self.edges + self.filaments + self.eddies
    }
}
