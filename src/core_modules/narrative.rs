// THEORY:
// The `narrative` module is the storytelling layer. Every other stage produces
// numbers; this one turns the finished sections into a few sentences an angler
// can act on: an overview, tactical advice keyed on where the best break lies,
// the factors that actually fired, and warnings.
//
// It is a pure formatting function. There is no hidden state and no
// randomness, so the same sections always produce the same text.

use crate::core_modules::activity::ActivitySummary;
use crate::core_modules::feature::FeatureCounts;
use crate::core_modules::scoring::scoring::ScoreBreakdown;
use crate::core_modules::sections::{BreakSide, ChlorophyllSection, TemperatureSection};
use crate::core_modules::trend::trend::TrendReport;
use serde::Serialize;

const POOR_SCORE: u8 = 40;
const POOR_VISIBILITY_MG_M3: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    pub overview: String,
    pub tactical_advice: String,
    pub key_factors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Everything the narrative is written from.
pub struct NarrativeInputs<'a> {
    pub temperature: &'a TemperatureSection,
    pub chlorophyll: &'a ChlorophyllSection,
    pub activity: &'a ActivitySummary,
    pub trends: &'a TrendReport,
    pub features: &'a FeatureCounts,
    pub score: &'a ScoreBreakdown,
}

pub fn generate(inputs: &NarrativeInputs) -> Narrative {
    Narrative {
        overview: overview(inputs),
        tactical_advice: tactical_advice(inputs),
        key_factors: key_factors(inputs),
        warnings: warnings(inputs),
    }
}

fn overview(inputs: &NarrativeInputs) -> String {
    let temperature = inputs.temperature;
    let chlorophyll = inputs.chlorophyll;

    let mut text = match (temperature.has_data, chlorophyll.has_data) {
        (true, true) => format!(
            "Area shows {}°F average SST with {} water ({} mg/m³).",
            temperature.current_avg_f,
            chlorophyll.clarity_scale.label.to_lowercase(),
            chlorophyll.current_avg_mg_m3
        ),
        (true, false) => format!(
            "Area shows {}°F average SST; chlorophyll readings are unavailable.",
            temperature.current_avg_f
        ),
        (false, true) => format!(
            "SST readings are unavailable; area shows {} water ({} mg/m³).",
            chlorophyll.clarity_scale.label.to_lowercase(),
            chlorophyll.current_avg_mg_m3
        ),
        (false, false) => "No reliable SST or chlorophyll readings in this area.".to_string(),
    };

    match inputs.activity.vessels.len() {
        0 => {}
        1 => text.push_str(" 1 vessel active in area."),
        n => text.push_str(&format!(" {} vessels active in area.", n)),
    }
    text
}

fn tactical_advice(inputs: &NarrativeInputs) -> String {
    let mut advice = match &inputs.temperature.best_break {
        Some(best) => match best.side {
            BreakSide::Shallow => "Fish the shallow (shore-side) edge of the temperature break.".to_string(),
            BreakSide::Deep => "Fish the deep (offshore) edge of the temperature break.".to_string(),
        },
        None => "Look for structure or bait concentrations in this uniform water.".to_string(),
    };

    if inputs.chlorophyll.has_data && inputs.chlorophyll.clarity_scale.is_sight_fishing_water() {
        advice.push_str(" Water clarity is ideal for sight fishing.");
    }
    advice
}

fn key_factors(inputs: &NarrativeInputs) -> Vec<String> {
    let mut factors = Vec::new();

    if let Some(best) = &inputs.temperature.best_break {
        let strength = best.description.split_whitespace().next().unwrap_or("Temperature");
        factors.push(format!("{} temperature break ({:.1}°F change)", strength, best.strength_f));
    }

    if inputs.chlorophyll.water_quality_break.is_some() {
        factors.push("Water clarity edge detected".to_string());
    }

    match inputs.features.edges {
        0 => {}
        1 => factors.push("1 thermal edge identified".to_string()),
        n => factors.push(format!("{} thermal edges identified", n)),
    }

    if inputs.trends.is_warming() {
        factors.push(format!(
            "Water warming trend (+{:.1}°F/week)",
            inputs.trends.sst.seven_day.delta
        ));
    }

    factors
}

fn warnings(inputs: &NarrativeInputs) -> Vec<String> {
    let mut warnings = Vec::new();

    if inputs.score.total() < POOR_SCORE {
        warnings.push("Conditions are below average - consider alternative locations".to_string());
    }
    if inputs.chlorophyll.has_data && inputs.chlorophyll.current_avg_mg_m3 > POOR_VISIBILITY_MG_M3 {
        warnings.push("Water quality is poor - visibility will be limited".to_string());
    }
    if !inputs.temperature.has_data {
        warnings.push("Too few SST samples for a temperature analysis".to_string());
    }

    warnings
}
