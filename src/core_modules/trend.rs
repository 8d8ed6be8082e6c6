// THEORY:
// The `trend` module compares the current polygon mean with historical means
// supplied by the caller. It never fabricates a trend: a missing baseline (or a
// zero one, which cannot anchor a relative change) always reads "stable" with a
// zero delta.
//
// The comparison is relative: a change smaller than the layer's stable fraction
// of the baseline is noise. Larger changes are labelled by sign with the
// layer's own vocabulary (warming/cooling, greening/clearing).

pub mod trend {
    use crate::config::TrendSettings;
    use crate::core_modules::utils::stats::stats::round_to;
    use serde::{Deserialize, Serialize};

    /// Which layer a trend describes; selects threshold and vocabulary.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TrendKind {
        Temperature,
        Chlorophyll,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum TrendLabel {
        Warming,
        Cooling,
        Greening,
        Clearing,
        Stable,
    }

    impl TrendLabel {
        fn title(&self) -> &'static str {
            match self {
                TrendLabel::Warming => "Warming",
                TrendLabel::Cooling => "Cooling",
                TrendLabel::Greening => "Greening",
                TrendLabel::Clearing => "Clearing",
                TrendLabel::Stable => "Stable",
            }
        }
    }

    /// One trend window.
    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TrendResult {
        /// Current minus historical, in the layer's unit.
        pub delta: f64,
        /// Only set for temperature trends.
        #[serde(skip_serializing_if = "Option::is_none")]
        pub delta_c: Option<f64>,
        pub trend: TrendLabel,
        pub description: String,
    }

    /// Historical baselines for one layer.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    pub struct Baselines {
        pub seven_day: Option<f64>,
        pub fourteen_day: Option<f64>,
    }

    /// Historical baselines for both layers.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    pub struct HistoricalBaselines {
        pub sst: Baselines,
        pub chl: Baselines,
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct LayerTrends {
        pub seven_day: TrendResult,
        pub fourteen_day: TrendResult,
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct TrendReport {
        pub sst: LayerTrends,
        pub chl: LayerTrends,
    }

    impl TrendReport {
        pub fn is_warming(&self) -> bool {
            self.sst.seven_day.trend == TrendLabel::Warming
        }

        pub fn is_greening(&self) -> bool {
            self.chl.seven_day.trend == TrendLabel::Greening
        }
    }

    /// Bare delta and label, without description.
    pub fn classify(current: f64, historical: Option<f64>, kind: TrendKind, settings: &TrendSettings) -> (f64, TrendLabel) {
        let Some(baseline) = historical.filter(|h| *h != 0.0 && h.is_finite()) else {
            return (0.0, TrendLabel::Stable);
        };

        let delta = current - baseline;
        let threshold = match kind {
            TrendKind::Temperature => settings.sst_stable_fraction,
            TrendKind::Chlorophyll => settings.chl_stable_fraction,
        };
        if (delta / baseline).abs() < threshold {
            return (delta, TrendLabel::Stable);
        }

        let label = match (kind, delta > 0.0) {
            (TrendKind::Temperature, true) => TrendLabel::Warming,
            (TrendKind::Temperature, false) => TrendLabel::Cooling,
            (TrendKind::Chlorophyll, true) => TrendLabel::Greening,
            (TrendKind::Chlorophyll, false) => TrendLabel::Clearing,
        };
        (delta, label)
    }

    /// Full trend for one window, with a human-readable description.
    pub fn trend(current: f64, historical: Option<f64>, window_days: u32, kind: TrendKind, settings: &TrendSettings) -> TrendResult {
        let (delta, label) = classify(current, historical, kind, settings);
        let available = historical.is_some_and(|h| h != 0.0 && h.is_finite());

        let description = if !available {
            format!("No {}-day data available", window_days)
        } else {
            let sign = if delta > 0.0 { "+" } else { "" };
            match kind {
                TrendKind::Temperature => format!("{} vs {}-day ({}{:.1}°F)", label.title(), window_days, sign, delta),
                TrendKind::Chlorophyll => format!("{} vs {}-day ({}{:.2})", label.title(), window_days, sign, delta),
            }
        };

        TrendResult {
            delta: match kind {
                TrendKind::Temperature => round_to(delta, 1),
                TrendKind::Chlorophyll => round_to(delta, 2),
            },
            delta_c: match kind {
                TrendKind::Temperature => Some(round_to(delta * 5.0 / 9.0, 1)),
                TrendKind::Chlorophyll => None,
            },
            trend: label,
            description,
        }
    }

    /// Both windows for both layers. `None` current means the layer had no data.
    pub fn trend_report(
        current_sst_f: Option<f64>,
        current_chl_mg_m3: Option<f64>,
        baselines: &HistoricalBaselines,
        settings: &TrendSettings,
    ) -> TrendReport {
        let layer = |current: Option<f64>, b: &Baselines, kind: TrendKind| {
            // Without a current reading there is nothing to compare.
            let (value, seven, fourteen) = match current {
                Some(value) => (value, b.seven_day, b.fourteen_day),
                None => (0.0, None, None),
            };
            LayerTrends {
                seven_day: trend(value, seven, 7, kind, settings),
                fourteen_day: trend(value, fourteen, 14, kind, settings),
            }
        };

        TrendReport {
            sst: layer(current_sst_f, &baselines.sst, TrendKind::Temperature),
            chl: layer(current_chl_mg_m3, &baselines.chl, TrendKind::Chlorophyll),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::trend::*;
    use crate::config::TrendSettings;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn missing_baseline_is_stable() {
        let settings = TrendSettings::default();
        let result = trend(72.0, None, 7, TrendKind::Temperature, &settings);
        assert_eq!(result.delta, 0.0);
        assert_eq!(result.trend, TrendLabel::Stable);
        assert_eq!(result.description, "No 7-day data available");
        assert_eq!(result.delta_c, Some(0.0));
    }

    #[test]
    fn zero_baseline_is_treated_as_missing() {
        let settings = TrendSettings::default();
        let result = trend(1.5, Some(0.0), 14, TrendKind::Chlorophyll, &settings);
        assert_eq!(result.trend, TrendLabel::Stable);
        assert_eq!(result.delta, 0.0);
        assert_eq!(result.description, "No 14-day data available");
        assert!(result.delta_c.is_none());
    }

    #[test]
    fn small_changes_are_stable() {
        let settings = TrendSettings::default();
        // +2°F on 70°F is under 5%.
        let (delta, label) = classify(72.0, Some(70.0), TrendKind::Temperature, &settings);
        assert_relative_eq!(delta, 2.0);
        assert_eq!(label, TrendLabel::Stable);

        let result = trend(72.0, Some(70.0), 7, TrendKind::Temperature, &settings);
        assert_eq!(result.description, "Stable vs 7-day (+2.0°F)");
    }

    #[test]
    fn temperature_directions() {
        let settings = TrendSettings::default();
        let warm = trend(75.0, Some(70.0), 7, TrendKind::Temperature, &settings);
        assert_eq!(warm.trend, TrendLabel::Warming);
        assert_eq!(warm.delta, 5.0);
        assert_eq!(warm.delta_c, Some(2.8));
        assert_eq!(warm.description, "Warming vs 7-day (+5.0°F)");

        let cool = trend(65.0, Some(70.0), 14, TrendKind::Temperature, &settings);
        assert_eq!(cool.trend, TrendLabel::Cooling);
        assert_eq!(cool.description, "Cooling vs 14-day (-5.0°F)");
    }

    #[test]
    fn chlorophyll_directions() {
        let settings = TrendSettings::default();
        let green = trend(2.5, Some(2.0), 7, TrendKind::Chlorophyll, &settings);
        assert_eq!(green.trend, TrendLabel::Greening);
        assert_eq!(green.description, "Greening vs 7-day (+0.50)");

        let clear = trend(1.5, Some(2.0), 7, TrendKind::Chlorophyll, &settings);
        assert_eq!(clear.trend, TrendLabel::Clearing);

        // 5% is below the chlorophyll threshold.
        let steady = trend(2.1, Some(2.0), 7, TrendKind::Chlorophyll, &settings);
        assert_eq!(steady.trend, TrendLabel::Stable);
    }

    #[test]
    fn report_without_current_data_is_stable() {
        let baselines = HistoricalBaselines {
            sst: Baselines {
                seven_day: Some(60.0),
                fourteen_day: Some(60.0),
            },
            chl: Baselines::default(),
        };
        let report = trend_report(None, Some(3.0), &baselines, &TrendSettings::default());
        assert_eq!(report.sst.seven_day.trend, TrendLabel::Stable);
        assert_eq!(report.sst.seven_day.delta, 0.0);
        assert!(!report.is_warming());
        assert!(!report.is_greening());
    }

    #[test]
    fn report_flags_warming_and_greening() {
        let baselines = HistoricalBaselines {
            sst: Baselines {
                seven_day: Some(68.0),
                fourteen_day: None,
            },
            chl: Baselines {
                seven_day: Some(1.0),
                fourteen_day: Some(3.0),
            },
        };
        let report = trend_report(Some(74.0), Some(2.0), &baselines, &TrendSettings::default());
        assert!(report.is_warming());
        assert!(report.is_greening());
        assert_eq!(report.sst.fourteen_day.trend, TrendLabel::Stable);
        assert_eq!(report.chl.fourteen_day.trend, TrendLabel::Clearing);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sst"]["sevenDay"]["trend"], "warming");
        assert_eq!(json["chl"]["sevenDay"]["delta"], 1.0);
        assert!(json["chl"]["sevenDay"].get("deltaC").is_none());
    }

    proptest! {
        #[test]
        fn null_baseline_is_always_stable(current in -100.0f64..200.0, window in 1u32..30) {
            let settings = TrendSettings::default();
            for kind in [TrendKind::Temperature, TrendKind::Chlorophyll] {
                let result = trend(current, None, window, kind, &settings);
                prop_assert_eq!(result.delta, 0.0);
                prop_assert_eq!(result.trend, TrendLabel::Stable);
            }
        }
    }
}
