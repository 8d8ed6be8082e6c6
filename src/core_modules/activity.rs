// THEORY:
// The `activity` module is the human layer of the report. The physical layers
// say what the water is doing; this one says who is out there and whether they
// are catching anything. It merges two externally supplied feeds: vessel
// tracks and catch reports.
//
// Key architectural principles:
// 1.  **Track Summaries, Not Tracking**: Vessel tracks arrive already associated
//     by id. Each one is reduced to a single summary (last position, dwell time,
//     activity class from its reported speeds). Nothing is remembered between
//     analyses.
// 2.  **Pure Buckets**: Fleet density is a fixed function of the vessel count.
//     Catch hotspots come from snapping confirmed catches to a fine lat/lng grid
//     and keeping the cells that saw repeat success.
// 3.  **Missing Is Empty**: An absent feed is an empty slice. Zero vessels and
//     zero reports is a valid, complete summary ("none" density, neutral catch
//     rate) rather than an error.

use crate::config::ActivitySettings;
use crate::core_modules::utils::geo::geo::{BoundingBox, LatLng};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const ANCHORED_MAX_KNOTS: f64 = 0.5;
const FISHING_MAX_KNOTS: f64 = 5.0;
const LOW_DENSITY_MAX: usize = 3;
const MEDIUM_DENSITY_MAX: usize = 10;

/// One AIS fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselPosition {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
    /// Speed over ground in knots, when the feed reports it.
    #[serde(default)]
    pub speed: Option<f64>,
}

/// A vessel and its recent positions, as delivered by the vessel feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselTrack {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub vessel_type: Option<String>,
    #[serde(default)]
    pub positions: Vec<VesselPosition>,
}

/// A user catch report, as stored by the report datastore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchReport {
    pub lat: f64,
    pub lon: f64,
    pub fish_on: bool,
    pub created_at: DateTime<Utc>,
}

impl CatchReport {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VesselActivity {
    Anchored,
    Fishing,
    Transit,
}

impl VesselActivity {
    /// Classifies a mean speed over ground. No speeds at all reads as fishing.
    pub fn from_mean_speed(knots: Option<f64>) -> Self {
        match knots {
            Some(speed) if speed < ANCHORED_MAX_KNOTS => VesselActivity::Anchored,
            Some(speed) if speed >= FISHING_MAX_KNOTS => VesselActivity::Transit,
            _ => VesselActivity::Fishing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub vessel_type: String,
    pub activity: VesselActivity,
    pub dwell_time_hours: f64,
    pub last_seen: DateTime<Utc>,
    pub position: LatLng,
}

impl VesselSummary {
    /// `None` for a track without positions.
    pub fn from_track(track: &VesselTrack) -> Option<Self> {
        let first = track.positions.iter().min_by_key(|p| p.timestamp)?;
        let last = track.positions.iter().max_by_key(|p| p.timestamp)?;

        let speeds: Vec<f64> = track.positions.iter().filter_map(|p| p.speed).filter(|s| s.is_finite()).collect();
        let mean_speed = if speeds.is_empty() {
            None
        } else {
            Some(speeds.iter().sum::<f64>() / speeds.len() as f64)
        };

        let dwell = last.timestamp - first.timestamp;
        Some(Self {
            id: track.id.clone(),
            name: track.name.clone().unwrap_or_else(|| format!("Vessel {}", track.id)),
            vessel_type: track.vessel_type.clone().unwrap_or_else(|| "Commercial".to_string()),
            activity: VesselActivity::from_mean_speed(mean_speed),
            dwell_time_hours: (dwell.num_seconds() as f64 / 3600.0).round(),
            last_seen: last.timestamp,
            position: LatLng::new(last.lat, last.lng),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FleetDensity {
    None,
    Low,
    Medium,
    High,
}

impl FleetDensity {
    pub fn from_vessel_count(count: usize) -> Self {
        if count == 0 {
            FleetDensity::None
        } else if count < LOW_DENSITY_MAX {
            FleetDensity::Low
        } else if count < MEDIUM_DENSITY_MAX {
            FleetDensity::Medium
        } else {
            FleetDensity::High
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReports {
    pub caught: usize,
    pub no_catch: usize,
    pub total_reports: usize,
    pub hot_spots: Vec<LatLng>,
}

impl UserReports {
    /// Fraction of reports with a fish on; `None` when there are no reports.
    pub fn catch_rate(&self) -> Option<f64> {
        if self.total_reports == 0 {
            return None;
        }
        Some(self.caught as f64 / self.total_reports as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub vessels: Vec<VesselSummary>,
    pub user_reports: UserReports,
    pub density: FleetDensity,
}

impl ActivitySummary {
    pub fn empty() -> Self {
        Self {
            vessels: Vec::new(),
            user_reports: UserReports::default(),
            density: FleetDensity::None,
        }
    }
}

/// Merges vessel tracks and catch reports into one summary.
///
/// Reports outside `bounds`, outside the window that ends at `date`, or with
/// unusable coordinates are ignored. Vessels are assumed to be pre-selected for the area by the feed.
pub fn correlate(
    vessels: &[VesselTrack],
    reports: &[CatchReport],
    bounds: Option<&BoundingBox>,
    date: DateTime<Utc>,
    settings: &ActivitySettings,
) -> ActivitySummary {
    let vessels: Vec<VesselSummary> = vessels.iter().filter_map(VesselSummary::from_track).collect();
    let density = FleetDensity::from_vessel_count(vessels.len());

    // A window too long to represent has no lower bound.
    let window_start = Duration::try_days(settings.report_window_days.max(0))
        .and_then(|window| date.checked_sub_signed(window));
    let recent: Vec<&CatchReport> = reports
        .iter()
        .filter(|r| r.position().is_valid())
        .filter(|r| window_start.is_none_or(|start| r.created_at >= start) && r.created_at <= date)
        .filter(|r| bounds.is_none_or(|b| b.contains(&r.position())))
        .collect();

    let caught = recent.iter().filter(|r| r.fish_on).count();
    let user_reports = UserReports {
        caught,
        no_catch: recent.len() - caught,
        total_reports: recent.len(),
        hot_spots: hot_spots(&recent, settings),
    };

    ActivitySummary {
        vessels,
        user_reports,
        density,
    }
}

/// Mean positions of grid cells holding at least `hotspot_min_catches` catches,
/// ordered by cell.
fn hot_spots(reports: &[&CatchReport], settings: &ActivitySettings) -> Vec<LatLng> {
    let mut cells: BTreeMap<(i64, i64), Vec<LatLng>> = BTreeMap::new();
    for report in reports.iter().filter(|r| r.fish_on) {
        let key = (
            (report.lat / settings.hotspot_grid_deg).round() as i64,
            (report.lon / settings.hotspot_grid_deg).round() as i64,
        );
        cells.entry(key).or_default().push(report.position());
    }

    cells
        .into_values()
        .filter(|catches| catches.len() >= settings.hotspot_min_catches)
        .map(|catches| {
            let n = catches.len() as f64;
            LatLng::new(
                catches.iter().map(|p| p.lat).sum::<f64>() / n,
                catches.iter().map(|p| p.lng).sum::<f64>() / n,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, hour, 0, 0).unwrap()
    }

    fn track(id: &str, speeds: &[Option<f64>]) -> VesselTrack {
        VesselTrack {
            id: id.to_string(),
            name: None,
            vessel_type: None,
            positions: speeds
                .iter()
                .enumerate()
                .map(|(i, speed)| VesselPosition {
                    lat: 39.0 + i as f64 * 0.01,
                    lng: -71.0,
                    timestamp: at(i as u32 * 2),
                    speed: *speed,
                })
                .collect(),
        }
    }

    fn report(lat: f64, lon: f64, fish_on: bool, created_at: DateTime<Utc>) -> CatchReport {
        CatchReport {
            lat,
            lon,
            fish_on,
            created_at,
        }
    }

    fn area() -> BoundingBox {
        BoundingBox {
            west: -71.5,
            south: 38.5,
            east: -70.5,
            north: 39.5,
        }
    }

    #[test]
    fn density_buckets() {
        assert_eq!(FleetDensity::from_vessel_count(0), FleetDensity::None);
        assert_eq!(FleetDensity::from_vessel_count(2), FleetDensity::Low);
        assert_eq!(FleetDensity::from_vessel_count(3), FleetDensity::Medium);
        assert_eq!(FleetDensity::from_vessel_count(9), FleetDensity::Medium);
        assert_eq!(FleetDensity::from_vessel_count(10), FleetDensity::High);
    }

    #[test]
    fn nothing_in_means_nothing_out() {
        let summary = correlate(&[], &[], Some(&area()), at(12), &ActivitySettings::default());
        assert_eq!(summary.density, FleetDensity::None);
        assert_eq!(summary.user_reports.total_reports, 0);
        assert!(summary.user_reports.catch_rate().is_none());
        assert_eq!(summary, ActivitySummary::empty());
    }

    #[test]
    fn vessel_summary_defaults_and_dwell() {
        let summary = VesselSummary::from_track(&track("367001", &[Some(3.0), Some(4.0), Some(2.0)])).unwrap();
        assert_eq!(summary.name, "Vessel 367001");
        assert_eq!(summary.vessel_type, "Commercial");
        assert_eq!(summary.activity, VesselActivity::Fishing);
        assert_eq!(summary.dwell_time_hours, 4.0);
        assert_eq!(summary.last_seen, at(4));
        assert_relative_eq!(summary.position.lat, 39.02);
    }

    #[test]
    fn activity_from_speed() {
        let anchored = VesselSummary::from_track(&track("a", &[Some(0.1), Some(0.2)])).unwrap();
        assert_eq!(anchored.activity, VesselActivity::Anchored);
        let transit = VesselSummary::from_track(&track("t", &[Some(9.0), Some(11.0)])).unwrap();
        assert_eq!(transit.activity, VesselActivity::Transit);
        let silent = VesselSummary::from_track(&track("s", &[None, None])).unwrap();
        assert_eq!(silent.activity, VesselActivity::Fishing);
    }

    #[test]
    fn empty_tracks_are_skipped() {
        let vessels = [track("x", &[]), track("y", &[Some(3.0)])];
        let summary = correlate(&vessels, &[], None, at(12), &ActivitySettings::default());
        assert_eq!(summary.vessels.len(), 1);
        assert_eq!(summary.density, FleetDensity::Low);
    }

    #[test]
    fn reports_are_windowed_and_bounded() {
        let date = at(12);
        let reports = [
            report(39.0, -71.0, true, date - Duration::days(1)),
            report(39.0, -71.0, false, date - Duration::days(2)),
            // Too old.
            report(39.0, -71.0, true, date - Duration::days(8)),
            // In the future.
            report(39.0, -71.0, true, date + Duration::hours(1)),
            // Outside the box.
            report(45.0, -71.0, true, date - Duration::days(1)),
        ];
        let summary = correlate(&[], &reports, Some(&area()), date, &ActivitySettings::default());
        assert_eq!(summary.user_reports.caught, 1);
        assert_eq!(summary.user_reports.no_catch, 1);
        assert_eq!(summary.user_reports.total_reports, 2);
        assert_relative_eq!(summary.user_reports.catch_rate().unwrap(), 0.5);
    }

    #[test]
    fn oversized_window_keeps_every_past_report() {
        let date = at(12);
        let reports = [
            report(39.0, -71.0, true, date - Duration::days(400)),
            report(39.0, -71.0, false, date - Duration::days(1)),
            report(39.0, -71.0, true, date + Duration::hours(1)),
        ];
        let settings = ActivitySettings {
            report_window_days: i64::MAX,
            ..ActivitySettings::default()
        };
        let summary = correlate(&[], &reports, None, date, &settings);
        assert_eq!(summary.user_reports.total_reports, 2);

        let negative = ActivitySettings {
            report_window_days: -5,
            ..ActivitySettings::default()
        };
        assert_eq!(correlate(&[], &reports, None, date, &negative).user_reports.total_reports, 0);
    }

    #[test]
    fn unbounded_reports_with_bad_coordinates_are_dropped() {
        let yesterday = at(12) - Duration::days(1);
        let settings = ActivitySettings {
            hotspot_min_catches: 1,
            ..ActivitySettings::default()
        };
        let reports = [
            report(f64::NAN, -71.0, true, yesterday),
            report(39.0, f64::INFINITY, true, yesterday),
            report(95.0, -71.0, true, yesterday),
            report(39.0, -71.0, true, yesterday),
        ];
        let summary = correlate(&[], &reports, None, at(12), &settings);
        assert_eq!(summary.user_reports.total_reports, 1);
        assert_eq!(summary.user_reports.hot_spots, vec![LatLng::new(39.0, -71.0)]);
    }

    #[test]
    fn repeated_catches_form_a_hotspot() {
        let date = at(12);
        let yesterday = date - Duration::days(1);
        let reports = [
            report(39.1001, -71.2001, true, yesterday),
            report(39.1003, -71.2003, true, yesterday),
            report(39.1002, -71.2002, false, yesterday),
            // A lone catch elsewhere.
            report(39.3, -71.1, true, yesterday),
        ];
        let summary = correlate(&[], &reports, Some(&area()), date, &ActivitySettings::default());

        let spots = &summary.user_reports.hot_spots;
        assert_eq!(spots.len(), 1);
        assert_relative_eq!(spots[0].lat, 39.1002, epsilon = 1e-9);
        assert_relative_eq!(spots[0].lng, -71.2002, epsilon = 1e-9);
    }

    #[test]
    fn report_json_uses_feed_field_names() {
        let json = r#"{"lat":39.1,"lon":-71.2,"fish_on":true,"created_at":"2024-06-14T08:30:00Z"}"#;
        let parsed: CatchReport = serde_json::from_str(json).unwrap();
        assert!(parsed.fish_on);
        assert_eq!(parsed.position(), LatLng::new(39.1, -71.2));

        let vessel = r#"{"id":"v1","type":"Longliner","positions":[{"lat":39.0,"lng":-71.0,"timestamp":"2024-06-14T08:30:00Z"}]}"#;
        let parsed: VesselTrack = serde_json::from_str(vessel).unwrap();
        assert_eq!(parsed.vessel_type.as_deref(), Some("Longliner"));
        assert!(parsed.positions[0].speed.is_none());
    }
}
