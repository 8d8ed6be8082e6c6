// THEORY:
// The `pipeline` module is the top-level API of the analysis engine. It runs the
// whole stack over one request and returns one immutable `AnalysisReport`.
//
// The run is a pure function of the request: no clocks, no I/O, no state kept
// between calls. The only shared piece is the colour decoder, whose lookup
// table is built once and handed in behind an `Arc`. External data (history,
// vessels, catch reports) must already be resolved into the request; the async
// `parallel_pipeline` is the place that fetches it.

use crate::config::AnalysisConfig;
use crate::core_modules::activity::{correlate, CatchReport, VesselTrack};
use crate::core_modules::colormap::colormap::ColorValueDecoder;
use crate::core_modules::feature::{Feature, FeatureCounts};
use crate::core_modules::feature_detector::feature_detector::detect_features;
use crate::core_modules::gradient_field::gradient_field::{compute_gradients, ValuedPoint};
use crate::core_modules::narrative::{generate, Narrative, NarrativeInputs};
use crate::core_modules::pixel::pixel::{Layer, PixelSample};
use crate::core_modules::scoring::scoring::score;
use crate::core_modules::sections::{chlorophyll_section, temperature_section};
use crate::core_modules::trend::trend::trend_report;
use crate::core_modules::utils::geo::geo::{LatLng, Polygon};
use crate::core_modules::utils::stats::stats::round_to;
use crate::error::Result;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::activity::ActivitySummary;
pub use crate::core_modules::scoring::scoring::{ScoreBreakdown, ScoreCategory};
pub use crate::core_modules::sections::{ChlorophyllSection, TemperatureSection};
pub use crate::core_modules::trend::trend::{HistoricalBaselines, TrendReport};

const HIGH_QUALITY_SAMPLES: usize = 100;
const MEDIUM_QUALITY_SAMPLES: usize = 30;

/// Everything one analysis needs, already resolved to plain values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub polygon: Polygon,
    #[serde(default)]
    pub samples: Vec<PixelSample>,
    #[serde(default)]
    pub historical: HistoricalBaselines,
    #[serde(default)]
    pub vessels: Vec<VesselTrack>,
    #[serde(default)]
    pub reports: Vec<CatchReport>,
    /// Request date; defaults to now when the document leaves it out.
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
}

impl AnalysisRequest {
    pub fn from_json(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }
}

/// Coarse indicator of how much the report can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    High,
    Medium,
    Low,
}

impl DataQuality {
    pub fn from_sample_count(valid_samples: usize) -> Self {
        if valid_samples > HIGH_QUALITY_SAMPLES {
            DataQuality::High
        } else if valid_samples > MEDIUM_QUALITY_SAMPLES {
            DataQuality::Medium
        } else {
            DataQuality::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureReport {
    pub counts: FeatureCounts,
    /// Sorted by descending score.
    pub detected: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub timestamp: DateTime<Utc>,
    pub area_km2: f64,
    pub center_point: LatLng,
    pub data_quality: DataQuality,
    pub sst_samples: usize,
    pub chl_samples: usize,
}

/// The aggregate output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub temperature: TemperatureSection,
    pub chlorophyll: ChlorophyllSection,
    pub activity: ActivitySummary,
    pub trends: TrendReport,
    pub features: FeatureReport,
    pub narrative: Narrative,
    pub score: ScoreBreakdown,
    pub metadata: ReportMetadata,
}

/// The main, top-level struct for the analysis engine.
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    config: AnalysisConfig,
    decoder: Arc<ColorValueDecoder>,
}

impl AnalysisPipeline {
    pub fn new(config: AnalysisConfig, decoder: Arc<ColorValueDecoder>) -> Self {
        Self { config, decoder }
    }

    /// Builds the decoder from the config's own decoder settings.
    pub fn from_config(config: AnalysisConfig) -> Self {
        let decoder = Arc::new(ColorValueDecoder::new(&config.decoder));
        Self::new(config, decoder)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn decoder(&self) -> &Arc<ColorValueDecoder> {
        &self.decoder
    }

    pub fn analyze(&self, request: &AnalysisRequest) -> AnalysisReport {
        let config = &self.config;

        // --- 1. Input Validation ---
        let samples: Vec<&PixelSample> = request.samples.iter().filter(|s| s.is_valid()).collect();
        let dropped = request.samples.len() - samples.len();
        if dropped > 0 {
            warn!(dropped, "Dropping samples with out-of-range coordinates.");
        }

        // --- 2. Colour Decoding ---
        let (sst_points, chl_points) = self.decode(&samples);
        debug!(sst = sst_points.len(), chl = chl_points.len(), "Decoded confident samples.");

        // --- 3. Gradient Field & Features ---
        let gradients = compute_gradients(
            &sst_points,
            config.features.max_distance_miles,
            config.features.min_sample_separation_miles,
        );
        let detected = if sst_points.len() >= config.min_valid_samples {
            detect_features(&gradients, &config.features)
        } else {
            Vec::new()
        };
        let counts = FeatureCounts::tally(&detected);
        debug!(edges = counts.edges, filaments = counts.filaments, eddies = counts.eddies, "Feature detection done.");

        // --- 4. Layer Sections ---
        let centre = request.polygon.centroid();
        let temperature = temperature_section(&sst_points, &gradients, &centre, config);
        let chlorophyll = chlorophyll_section(&chl_points, config);

        // --- 5. Trends & Activity ---
        let trends = trend_report(
            temperature.has_data.then_some(temperature.range_bar.avg),
            chlorophyll.has_data.then_some(chlorophyll.range_bar.avg),
            &request.historical,
            &config.trend,
        );
        let bounds = request.polygon.bbox();
        let activity = correlate(&request.vessels, &request.reports, bounds.as_ref(), request.date, &config.activity);

        // --- 6. Scoring & Narrative ---
        let score = score(&temperature, &chlorophyll, &activity, &trends, &config.scoring);
        let narrative = generate(&NarrativeInputs {
            temperature: &temperature,
            chlorophyll: &chlorophyll,
            activity: &activity,
            trends: &trends,
            features: &counts,
            score: &score,
        });

        let metadata = ReportMetadata {
            timestamp: request.date,
            area_km2: round_to(request.polygon.area_km2(), 2),
            center_point: centre,
            data_quality: DataQuality::from_sample_count(sst_points.len() + chl_points.len()),
            sst_samples: sst_points.len(),
            chl_samples: chl_points.len(),
        };

        info!(
            total = score.total(),
            category = ?score.category(),
            features = counts.total(),
            quality = ?metadata.data_quality,
            "Analysis complete."
        );

        AnalysisReport {
            temperature,
            chlorophyll,
            activity,
            trends,
            features: FeatureReport { counts, detected },
            narrative,
            score,
            metadata,
        }
    }

    /// Decodes every sample in parallel and keeps the confident ones, split by layer.
    fn decode(&self, samples: &[&PixelSample]) -> (Vec<ValuedPoint>, Vec<ValuedPoint>) {
        let min_confidence = self.config.decoder.min_confidence;
        let decoded: Vec<(Layer, ValuedPoint)> = samples
            .par_iter()
            .filter_map(|sample| {
                let physical = self.decoder.decode_sample(sample);
                physical
                    .is_reliable(min_confidence)
                    .then(|| (sample.layer, ValuedPoint::new(sample.position(), physical.value)))
            })
            .collect();

        let mut sst = Vec::new();
        let mut chl = Vec::new();
        for (layer, point) in decoded {
            match layer {
                Layer::Sst => sst.push(point),
                Layer::Chl => chl.push(point),
            }
        }
        (sst, chl)
    }
}
