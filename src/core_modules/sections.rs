// THEORY:
// The section builders summarize one decoded layer each. They sit between the
// raw decoded values and the scoring/narrative stages: every number a reader
// sees about "the water in this polygon" comes from here.
//
// Key principles:
// 1.  **Confident samples only**: The pipeline hands over values that already
//     passed the confidence filter. Below `min_valid_samples` a section is
//     returned empty (zeroed, no break) instead of guessing from scraps.
// 2.  **Break search**: Both layers look for their strongest local contrast. For
//     temperature it is the largest |ΔT| between two samples within the search
//     radius; for chlorophyll it is the steepest per-mile gradient.
// 3.  **Display rounding**: Averages and extremes are rounded for display
//     (0.1 °F, 0.01 mg/m³); range bars keep full precision.

use crate::config::AnalysisConfig;
use crate::core_modules::colormap::colormap::fahrenheit_to_celsius;
use crate::core_modules::gradient_field::gradient_field::{
    compute_gradients, steepest, strongest_difference, GradientPoint, ValuedPoint,
};
use crate::core_modules::utils::geo::geo::LatLng;
use crate::core_modules::utils::stats::stats::{round_to, summarize};
use serde::Serialize;

const MIN_BREAK_F: f64 = 1.0;
const STRONG_BREAK_F: f64 = 4.0;
const MODERATE_BREAK_F: f64 = 2.0;
const MIN_COLOR_BREAK: f64 = 0.5;
const STRONG_COLOR_BREAK: f64 = 2.0;

/// Min/max/avg triple for a range-bar widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeBar {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub unit: &'static str,
}

impl RangeBar {
    fn zeroed(unit: &'static str) -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            avg: 0.0,
            unit,
        }
    }
}

/// Which side of the polygon a temperature break lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakSide {
    /// West of the polygon centre; shore-side on an east coast.
    Shallow,
    /// East of the polygon centre; offshore.
    Deep,
}

/// The strongest temperature contrast in the polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureBreak {
    pub location: LatLng,
    pub strength_f: f64,
    pub strength_c: f64,
    pub distance_miles: f64,
    pub description: &'static str,
    pub side: BreakSide,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureSection {
    /// False when there were too few confident samples to say anything.
    pub has_data: bool,
    pub sample_count: usize,
    pub current_avg_f: f64,
    pub current_avg_c: f64,
    pub min_f: f64,
    pub max_f: f64,
    pub range_bar: RangeBar,
    pub best_break: Option<TemperatureBreak>,
    pub gradient_map: Vec<GradientPoint>,
}

impl TemperatureSection {
    pub fn empty(sample_count: usize) -> Self {
        Self {
            has_data: false,
            sample_count,
            current_avg_f: 0.0,
            current_avg_c: 0.0,
            min_f: 0.0,
            max_f: 0.0,
            range_bar: RangeBar::zeroed("F"),
            best_break: None,
            gradient_map: Vec::new(),
        }
    }

    /// Displayed max minus displayed min.
    pub fn spread_f(&self) -> f64 {
        self.max_f - self.min_f
    }
}

/// Summarizes confident SST values.
///
/// `gradients` is the field computed over the same points; only entries above
/// the weak threshold are kept for the gradient map.
pub fn temperature_section(
    points: &[ValuedPoint],
    gradients: &[GradientPoint],
    polygon_centre: &LatLng,
    config: &AnalysisConfig,
) -> TemperatureSection {
    if points.len() < config.min_valid_samples {
        return TemperatureSection::empty(points.len());
    }
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let Some((min, max, avg)) = summarize(&values) else {
        return TemperatureSection::empty(0);
    };

    let best_break = strongest_difference(points, config.break_search_miles)
        .filter(|b| b.difference >= MIN_BREAK_F)
        .map(|b| {
            let location = b.midpoint();
            TemperatureBreak {
                location,
                strength_f: b.difference,
                strength_c: b.difference * 5.0 / 9.0,
                distance_miles: b.distance_miles,
                description: break_description(b.difference),
                side: if location.lng > polygon_centre.lng { BreakSide::Deep } else { BreakSide::Shallow },
            }
        });

    let gradient_map = gradients
        .iter()
        .filter(|g| g.magnitude > config.features.weak_threshold)
        .copied()
        .collect();

    TemperatureSection {
        has_data: true,
        sample_count: points.len(),
        current_avg_f: round_to(avg, 1),
        current_avg_c: round_to(fahrenheit_to_celsius(avg), 1),
        min_f: round_to(min, 1),
        max_f: round_to(max, 1),
        range_bar: RangeBar {
            min,
            max,
            avg,
            unit: "F",
        },
        best_break,
        gradient_map,
    }
}

pub fn break_description(difference_f: f64) -> &'static str {
    if difference_f >= STRONG_BREAK_F {
        "Strong Break"
    } else if difference_f >= MODERATE_BREAK_F {
        "Moderate Break"
    } else {
        "Weak Break"
    }
}

/// Water-clarity bucket derived from mean chlorophyll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClarityScale {
    pub value: f64,
    pub label: &'static str,
    pub color: &'static str,
}

impl ClarityScale {
    pub fn from_concentration(mg_m3: f64) -> Self {
        let (label, color) = if mg_m3 > 10.0 {
            ("Dirty", "#8B4513")
        } else if mg_m3 > 5.0 {
            ("Green", "#00FF00")
        } else if mg_m3 > 2.0 {
            ("Green-Blue", "#00CED1")
        } else if mg_m3 > 1.0 {
            ("Blue", "#0000FF")
        } else if mg_m3 > 0.5 {
            ("Clean", "#87CEEB")
        } else {
            ("Cobalt Blue", "#0047AB")
        };
        Self {
            value: mg_m3,
            label,
            color,
        }
    }

    /// Clarity that favours sight fishing.
    pub fn is_sight_fishing_water(&self) -> bool {
        matches!(self.label, "Green-Blue" | "Blue")
    }
}

/// The steepest chlorophyll gradient in the polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterQualityBreak {
    pub location: LatLng,
    /// mg/m³ per mile.
    pub strength_mg_m3: f64,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChlorophyllSection {
    pub has_data: bool,
    pub sample_count: usize,
    pub current_avg_mg_m3: f64,
    pub min_mg_m3: f64,
    pub max_mg_m3: f64,
    pub range_bar: RangeBar,
    pub clarity_scale: ClarityScale,
    pub water_quality_break: Option<WaterQualityBreak>,
}

impl ChlorophyllSection {
    pub fn empty(sample_count: usize) -> Self {
        Self {
            has_data: false,
            sample_count,
            current_avg_mg_m3: 0.0,
            min_mg_m3: 0.0,
            max_mg_m3: 0.0,
            range_bar: RangeBar::zeroed("mg/m³"),
            clarity_scale: ClarityScale {
                value: 0.0,
                label: "Blue",
                color: "#0000FF",
            },
            water_quality_break: None,
        }
    }
}

/// Summarizes confident chlorophyll values.
pub fn chlorophyll_section(points: &[ValuedPoint], config: &AnalysisConfig) -> ChlorophyllSection {
    if points.len() < config.min_valid_samples {
        return ChlorophyllSection::empty(points.len());
    }
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let Some((min, max, avg)) = summarize(&values) else {
        return ChlorophyllSection::empty(0);
    };

    let gradients = compute_gradients(
        points,
        config.break_search_miles,
        config.features.min_sample_separation_miles,
    );
    let water_quality_break = steepest(&gradients)
        .filter(|g| g.magnitude > MIN_COLOR_BREAK)
        .map(|g| WaterQualityBreak {
            location: g.position(),
            strength_mg_m3: g.magnitude,
            description: if g.magnitude > STRONG_COLOR_BREAK {
                "Strong color break"
            } else {
                "Moderate color break"
            },
        });

    ChlorophyllSection {
        has_data: true,
        sample_count: points.len(),
        current_avg_mg_m3: round_to(avg, 2),
        min_mg_m3: round_to(min, 2),
        max_mg_m3: round_to(max, 2),
        range_bar: RangeBar {
            min,
            max,
            avg,
            unit: "mg/m³",
        },
        clarity_scale: ClarityScale::from_concentration(avg),
        water_quality_break,
    }
}
