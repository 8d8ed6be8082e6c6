//! Tunable thresholds for every stage of the analysis pipeline.
//!
//! All sections default to the values the engine was calibrated with, so an
//! empty TOML document is a valid configuration. Only the fields that need to
//! change have to be written out.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Longest catch-report window the activity stage accepts.
pub const MAX_REPORT_WINDOW_DAYS: i64 = 365;

/// Top-level configuration for the `AnalysisPipeline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum number of confident samples needed before a layer section is computed.
    pub min_valid_samples: usize,
    /// Search radius (miles) used when looking for the strongest break in a layer.
    pub break_search_miles: f64,
    pub decoder: DecoderSettings,
    pub features: FeatureSettings,
    pub trend: TrendSettings,
    pub scoring: ScoringSettings,
    pub activity: ActivitySettings,
    pub fetch: FetchSettings,
}

/// Colormap decoding knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderSettings {
    /// Euclidean RGB distance under which the nearest calibration point is trusted.
    pub nearest_distance_threshold: f64,
    /// Number of sub-intervals generated between adjacent calibration points.
    pub interpolation_steps: u32,
    /// Bucket width per channel for the quantized lookup key.
    pub quantization_step: u8,
    /// Decodes at or below this confidence are excluded from statistics.
    pub min_confidence: f64,
}

/// Gradient and feature-detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    /// Gradient (units/mile) at or above which a point belongs to the edge tier.
    pub edge_threshold: f64,
    /// Gradient (units/mile) at or above which a point is a filament/eddy candidate.
    pub weak_threshold: f64,
    /// Neighbour search radius for the gradient field.
    pub max_distance_miles: f64,
    /// Cluster linkage distance, as a multiple of `max_distance_miles`.
    pub cluster_distance_factor: f64,
    pub min_edge_points: usize,
    pub min_filament_points: usize,
    pub min_eddy_points: usize,
    /// Filaments must be more elongated than this bounding-box aspect ratio.
    pub filament_max_aspect: f64,
    /// Eddies must be rounder than this bounding-box aspect ratio.
    pub eddy_min_aspect: f64,
    /// Angular tolerance (degrees) for a gradient bearing to count as tangential.
    pub eddy_tangent_tolerance_deg: f64,
    /// Fraction of eddy points that must pass the tangent test.
    pub eddy_tangent_consistency: f64,
    /// Features with a smaller hull area are discarded.
    pub min_area_km2: f64,
    /// Neighbours closer than this are ignored by the gradient search.
    pub min_sample_separation_miles: f64,
}

/// Relative-change thresholds below which a trend is "stable".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendSettings {
    pub sst_stable_fraction: f64,
    pub chl_stable_fraction: f64,
}

/// Constants for the composite 0-100 score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub ideal_chl_mg_m3: f64,
    /// Points per °F of the strongest temperature break.
    pub break_multiplier: f64,
    /// Points per °F of min-max spread when no break was found.
    pub spread_multiplier: f64,
    /// Spread (°F) that must be exceeded before it scores at all.
    pub min_spread_f: f64,
    /// Points lost per mg/m³ away from the ideal concentration.
    pub chl_penalty_per_unit: f64,
}

/// Vessel and catch-report correlation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivitySettings {
    pub report_window_days: i64,
    /// Hotspot cell size in degrees (0.001° is roughly 100 m).
    pub hotspot_grid_deg: f64,
    pub hotspot_min_catches: usize,
}

/// Settings used by the async façade when resolving external inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_valid_samples: 3,
            break_search_miles: 2.0,
            decoder: DecoderSettings::default(),
            features: FeatureSettings::default(),
            trend: TrendSettings::default(),
            scoring: ScoringSettings::default(),
            activity: ActivitySettings::default(),
            fetch: FetchSettings::default(),
        }
    }
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            nearest_distance_threshold: 50.0,
            interpolation_steps: 10,
            quantization_step: 5,
            min_confidence: 0.5,
        }
    }
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            edge_threshold: 2.0,
            weak_threshold: 0.5,
            max_distance_miles: 1.0,
            cluster_distance_factor: 2.0,
            min_edge_points: 3,
            min_filament_points: 5,
            min_eddy_points: 8,
            filament_max_aspect: 0.5,
            eddy_min_aspect: 0.8,
            eddy_tangent_tolerance_deg: 45.0,
            eddy_tangent_consistency: 0.6,
            min_area_km2: 5.0,
            min_sample_separation_miles: 0.01,
        }
    }
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            sst_stable_fraction: 0.05,
            chl_stable_fraction: 0.10,
        }
    }
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            ideal_chl_mg_m3: 2.5,
            break_multiplier: 5.0,
            spread_multiplier: 3.0,
            min_spread_f: 2.0,
            chl_penalty_per_unit: 4.0,
        }
    }
}

impl Default for ActivitySettings {
    fn default() -> Self {
        Self {
            report_window_days: 7,
            hotspot_grid_deg: 0.001,
            hotspot_min_catches: 2,
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self { timeout_ms: 5_000 }
    }
}

impl AnalysisConfig {
    /// Parses a TOML document and validates the result.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AnalysisConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Rejects combinations of thresholds the detectors cannot work with.
    pub fn validate(&self) -> Result<()> {
        let f = &self.features;
        let d = &self.decoder;

        let checks = [
            (self.min_valid_samples >= 1, "min_valid_samples must be at least 1"),
            (self.break_search_miles > 0.0, "break_search_miles must be positive"),
            (d.nearest_distance_threshold > 0.0, "decoder.nearest_distance_threshold must be positive"),
            (d.interpolation_steps >= 1, "decoder.interpolation_steps must be at least 1"),
            (d.quantization_step >= 1, "decoder.quantization_step must be at least 1"),
            ((0.0..1.0).contains(&d.min_confidence), "decoder.min_confidence must be in [0, 1)"),
            (f.weak_threshold > 0.0, "features.weak_threshold must be positive"),
            (f.weak_threshold < f.edge_threshold, "features.weak_threshold must be below features.edge_threshold"),
            (f.min_sample_separation_miles > 0.0, "features.min_sample_separation_miles must be positive"),
            (f.max_distance_miles > f.min_sample_separation_miles, "features.max_distance_miles must exceed min_sample_separation_miles"),
            (f.cluster_distance_factor > 0.0, "features.cluster_distance_factor must be positive"),
            (f.filament_max_aspect < f.eddy_min_aspect, "features.filament_max_aspect must be below features.eddy_min_aspect"),
            (
                f.eddy_tangent_consistency > 0.0 && f.eddy_tangent_consistency <= 1.0,
                "features.eddy_tangent_consistency must be in (0, 1]",
            ),
            (
                (1..=MAX_REPORT_WINDOW_DAYS).contains(&self.activity.report_window_days),
                "activity.report_window_days must be between 1 and 365",
            ),
            (self.activity.hotspot_grid_deg > 0.0, "activity.hotspot_grid_deg must be positive"),
        ];

        for (ok, message) in checks {
            if !ok {
                return Err(AnalysisError::InvalidConfig(message.to_string()));
            }
        }

        let t = &self.trend;
        for fraction in [t.sst_stable_fraction, t.chl_stable_fraction] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(AnalysisError::InvalidConfig(
                    "trend thresholds must be in (0, 1]".to_string(),
                ));
            }
        }

        Ok(())
    }
}
