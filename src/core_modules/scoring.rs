// THEORY:
// The `scoring` module condenses the whole report into one 0-100 number.
//
// Five components, each worth up to 20 points, are computed independently:
// temperature contrast, chlorophyll closeness to the ideal, fleet presence,
// user catch rate and trend alignment. Only the components are stored. The
// total, its category and the category colour are derived from them whenever
// they are asked for (including during serialization), so they can never
// disagree with each other.

pub mod scoring {
    use crate::config::ScoringSettings;
    use crate::core_modules::activity::{ActivitySummary, FleetDensity};
    use crate::core_modules::sections::{ChlorophyllSection, TemperatureSection};
    use crate::core_modules::trend::trend::TrendReport;
    use serde::ser::{Serialize, SerializeStruct, Serializer};

    const COMPONENT_MAX: f64 = 20.0;
    const NEUTRAL_REPORT_SCORE: f64 = 10.0;
    const TREND_BONUS: f64 = 10.0;
    const STRONG_MIN: u8 = 70;
    const FAIR_MIN: u8 = 40;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
    pub enum ScoreCategory {
        Poor,
        Fair,
        Strong,
    }

    impl ScoreCategory {
        /// Pure function of the total.
        pub fn from_total(total: u8) -> Self {
            if total >= STRONG_MIN {
                ScoreCategory::Strong
            } else if total >= FAIR_MIN {
                ScoreCategory::Fair
            } else {
                ScoreCategory::Poor
            }
        }

        pub fn color(&self) -> &'static str {
            match self {
                ScoreCategory::Strong => "#00FF00",
                ScoreCategory::Fair => "#FFFF00",
                ScoreCategory::Poor => "#FF0000",
            }
        }
    }

    /// The five weighted sub-scores, each in [0, 20].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ScoreBreakdown {
        pub temperature_gradient: u8,
        pub chlorophyll: u8,
        pub fleet_activity: u8,
        pub user_reports: u8,
        pub trend_alignment: u8,
    }

    impl ScoreBreakdown {
        /// Builds a breakdown, clipping every component to [0, 20].
        pub fn new(temperature_gradient: f64, chlorophyll: f64, fleet_activity: f64, user_reports: f64, trend_alignment: f64) -> Self {
            Self {
                temperature_gradient: clip(temperature_gradient),
                chlorophyll: clip(chlorophyll),
                fleet_activity: clip(fleet_activity),
                user_reports: clip(user_reports),
                trend_alignment: clip(trend_alignment),
            }
        }

        pub fn components(&self) -> [u8; 5] {
            [
                self.temperature_gradient,
                self.chlorophyll,
                self.fleet_activity,
                self.user_reports,
                self.trend_alignment,
            ]
        }

        /// Sum of the components, clipped to [0, 100].
        pub fn total(&self) -> u8 {
            let sum: u32 = self.components().iter().map(|c| *c as u32).sum();
            sum.min(100) as u8
        }

        pub fn category(&self) -> ScoreCategory {
            ScoreCategory::from_total(self.total())
        }

        pub fn color(&self) -> &'static str {
            self.category().color()
        }
    }

    impl Serialize for ScoreBreakdown {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut state = serializer.serialize_struct("ScoreBreakdown", 8)?;
            state.serialize_field("temperatureGradient", &self.temperature_gradient)?;
            state.serialize_field("chlorophyll", &self.chlorophyll)?;
            state.serialize_field("fleetActivity", &self.fleet_activity)?;
            state.serialize_field("userReports", &self.user_reports)?;
            state.serialize_field("trendAlignment", &self.trend_alignment)?;
            state.serialize_field("total", &self.total())?;
            state.serialize_field("category", &self.category())?;
            state.serialize_field("color", self.color())?;
            state.end()
        }
    }

    fn clip(value: f64) -> u8 {
        if !value.is_finite() {
            return 0;
        }
        value.round().clamp(0.0, COMPONENT_MAX) as u8
    }

    /// Temperature contrast: the best break if there is one, else the raw spread.
    pub fn temperature_component(temperature: &TemperatureSection, settings: &ScoringSettings) -> f64 {
        if !temperature.has_data {
            return 0.0;
        }
        if let Some(best) = &temperature.best_break {
            return (best.strength_f * settings.break_multiplier).min(COMPONENT_MAX);
        }
        let spread = temperature.spread_f();
        if spread > settings.min_spread_f {
            (spread * settings.spread_multiplier).min(COMPONENT_MAX)
        } else {
            0.0
        }
    }

    /// Full marks at the ideal concentration, losing points with distance.
    pub fn chlorophyll_component(chlorophyll: &ChlorophyllSection, settings: &ScoringSettings) -> f64 {
        if !chlorophyll.has_data {
            return 0.0;
        }
        let distance = (chlorophyll.current_avg_mg_m3 - settings.ideal_chl_mg_m3).abs();
        (COMPONENT_MAX - distance * settings.chl_penalty_per_unit).max(0.0)
    }

    pub fn fleet_component(density: FleetDensity) -> f64 {
        match density {
            FleetDensity::High => 20.0,
            FleetDensity::Medium => 15.0,
            FleetDensity::Low => 10.0,
            FleetDensity::None => 0.0,
        }
    }

    /// Catch rate scaled to 20, or a neutral 10 without reports.
    pub fn report_component(activity: &ActivitySummary) -> f64 {
        activity
            .user_reports
            .catch_rate()
            .map_or(NEUTRAL_REPORT_SCORE, |rate| (rate * COMPONENT_MAX).round())
    }

    pub fn trend_component(trends: &TrendReport) -> f64 {
        let mut score = 0.0;
        if trends.is_warming() {
            score += TREND_BONUS;
        }
        if trends.is_greening() {
            score += TREND_BONUS;
        }
        score
    }

    /// Scores a finished set of sections.
    pub fn score(
        temperature: &TemperatureSection,
        chlorophyll: &ChlorophyllSection,
        activity: &ActivitySummary,
        trends: &TrendReport,
        settings: &ScoringSettings,
    ) -> ScoreBreakdown {
        ScoreBreakdown::new(
            temperature_component(temperature, settings),
            chlorophyll_component(chlorophyll, settings),
            fleet_component(activity.density),
            report_component(activity),
            trend_component(trends),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::scoring::*;
    use crate::config::{ScoringSettings, TrendSettings};
    use crate::core_modules::activity::{ActivitySummary, FleetDensity};
    use crate::core_modules::sections::{BreakSide, ChlorophyllSection, TemperatureBreak, TemperatureSection};
    use crate::core_modules::trend::trend::{trend_report, Baselines, HistoricalBaselines};
    use crate::core_modules::utils::geo::geo::LatLng;
    use proptest::prelude::*;

    fn temperature(min_f: f64, max_f: f64, break_f: Option<f64>) -> TemperatureSection {
        let mut section = TemperatureSection::empty(10);
        section.has_data = true;
        section.min_f = min_f;
        section.max_f = max_f;
        section.best_break = break_f.map(|strength_f| TemperatureBreak {
            location: LatLng::new(39.0, -71.0),
            strength_f,
            strength_c: strength_f * 5.0 / 9.0,
            distance_miles: 0.5,
            description: "Moderate Break",
            side: BreakSide::Shallow,
        });
        section
    }

    fn chlorophyll(avg: f64) -> ChlorophyllSection {
        let mut section = ChlorophyllSection::empty(10);
        section.has_data = true;
        section.current_avg_mg_m3 = avg;
        section
    }

    #[test]
    fn category_thresholds() {
        assert_eq!(ScoreCategory::from_total(85), ScoreCategory::Strong);
        assert_eq!(ScoreCategory::from_total(70), ScoreCategory::Strong);
        assert_eq!(ScoreCategory::from_total(55), ScoreCategory::Fair);
        assert_eq!(ScoreCategory::from_total(40), ScoreCategory::Fair);
        assert_eq!(ScoreCategory::from_total(10), ScoreCategory::Poor);
        assert_eq!(ScoreCategory::Strong.color(), "#00FF00");
    }

    #[test]
    fn temperature_component_prefers_break_then_spread() {
        let settings = ScoringSettings::default();
        assert_eq!(temperature_component(&temperature(68.0, 74.0, Some(3.0)), &settings), 15.0);
        assert_eq!(temperature_component(&temperature(68.0, 74.0, Some(6.0)), &settings), 20.0);
        assert_eq!(temperature_component(&temperature(70.0, 73.0, None), &settings), 9.0);
        assert_eq!(temperature_component(&temperature(70.0, 71.5, None), &settings), 0.0);
        assert_eq!(temperature_component(&TemperatureSection::empty(0), &settings), 0.0);
    }

    #[test]
    fn chlorophyll_component_peaks_at_ideal() {
        let settings = ScoringSettings::default();
        assert_eq!(chlorophyll_component(&chlorophyll(2.5), &settings), 20.0);
        assert_eq!(chlorophyll_component(&chlorophyll(4.5), &settings), 12.0);
        assert_eq!(chlorophyll_component(&chlorophyll(12.0), &settings), 0.0);
        assert_eq!(chlorophyll_component(&ChlorophyllSection::empty(0), &settings), 0.0);
    }

    #[test]
    fn empty_activity_scores_neutral_reports() {
        let activity = ActivitySummary::empty();
        assert_eq!(fleet_component(activity.density), 0.0);
        assert_eq!(report_component(&activity), 10.0);
        assert_eq!(fleet_component(FleetDensity::Medium), 15.0);
    }

    #[test]
    fn trend_bonuses_are_independent() {
        let settings = TrendSettings::default();
        let none = trend_report(Some(70.0), Some(2.0), &HistoricalBaselines::default(), &settings);
        assert_eq!(trend_component(&none), 0.0);

        let warming_only = HistoricalBaselines {
            sst: Baselines {
                seven_day: Some(60.0),
                fourteen_day: None,
            },
            chl: Baselines::default(),
        };
        let warming = trend_report(Some(70.0), Some(2.0), &warming_only, &settings);
        assert_eq!(trend_component(&warming), 10.0);
    }

    #[test]
    fn totals_and_serialization() {
        let breakdown = ScoreBreakdown::new(20.0, 20.0, 15.0, 10.0, 20.0);
        assert_eq!(breakdown.total(), 85);
        assert_eq!(breakdown.category(), ScoreCategory::Strong);

        let json = serde_json::to_value(breakdown).unwrap();
        assert_eq!(json["total"], 85);
        assert_eq!(json["category"], "Strong");
        assert_eq!(json["color"], "#00FF00");
        assert_eq!(json["fleetActivity"], 15);

        assert_eq!(ScoreBreakdown::new(10.0, 20.0, 15.0, 10.0, 0.0).category(), ScoreCategory::Fair);
        assert_eq!(ScoreBreakdown::new(0.0, 0.0, 0.0, 10.0, 0.0).category(), ScoreCategory::Poor);
    }

    #[test]
    fn components_are_clipped() {
        let breakdown = ScoreBreakdown::new(-4.0, 31.0, f64::NAN, 19.6, 20.0);
        assert_eq!(breakdown.components(), [0, 20, 0, 20, 20]);
    }

    proptest! {
        #[test]
        fn score_bounds(
            t in -50.0f64..80.0,
            c in -50.0f64..80.0,
            f in -50.0f64..80.0,
            r in -50.0f64..80.0,
            a in -50.0f64..80.0,
        ) {
            let breakdown = ScoreBreakdown::new(t, c, f, r, a);
            for component in breakdown.components() {
                prop_assert!(component <= 20);
            }
            prop_assert!(breakdown.total() <= 100);
            prop_assert_eq!(breakdown.category(), ScoreCategory::from_total(breakdown.total()));
        }
    }
}
