// THEORY:
// The `parallel_pipeline` is the async façade around the synchronous engine. The
// engine wants every external input resolved up front; this layer does the
// resolving. For one area it fires the four external lookups (7-day baseline,
// 14-day baseline, vessel tracks, catch reports) at once, bounds each with its
// own timeout, and degrades any failure to "no data" so a slow or broken
// collaborator can only make a report less informative, never missing.
//
// The CPU-bound analysis then runs on tokio's blocking pool so it never stalls
// the reactor. Batches share one pipeline (and so one decoder table) and are
// analyzed concurrently, bounded by the number of cores, with results returned
// in input order.

use crate::core_modules::activity::{CatchReport, VesselTrack};
use crate::core_modules::pixel::pixel::PixelSample;
use crate::core_modules::trend::trend::Baselines;
use crate::core_modules::utils::geo::geo::Polygon;
use crate::error::Result;
use crate::pipeline::{AnalysisPipeline, AnalysisReport, AnalysisRequest, HistoricalBaselines};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const SHORT_LOOKBACK_DAYS: u32 = 7;
const LONG_LOOKBACK_DAYS: u32 = 14;

/// Historical layer means over one lookback window. `None` means no data.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerMeans {
    pub sst: Option<f64>,
    pub chl: Option<f64>,
}

/// The external collaborators an analysis can draw on.
pub trait DataSource: Send + Sync {
    /// Mean layer values over the polygon, `lookback_days` before `date`.
    fn historical<'a>(&'a self, polygon: &'a Polygon, date: DateTime<Utc>, lookback_days: u32) -> BoxFuture<'a, Result<LayerMeans>>;

    fn vessels<'a>(&'a self, polygon: &'a Polygon, date: DateTime<Utc>) -> BoxFuture<'a, Result<Vec<VesselTrack>>>;

    fn catch_reports<'a>(&'a self, polygon: &'a Polygon, date: DateTime<Utc>) -> BoxFuture<'a, Result<Vec<CatchReport>>>;
}

/// A source with nothing to offer; every analysis runs on samples alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

impl DataSource for OfflineSource {
    fn historical<'a>(&'a self, _: &'a Polygon, _: DateTime<Utc>, _: u32) -> BoxFuture<'a, Result<LayerMeans>> {
        Box::pin(async { Ok(LayerMeans::default()) })
    }

    fn vessels<'a>(&'a self, _: &'a Polygon, _: DateTime<Utc>) -> BoxFuture<'a, Result<Vec<VesselTrack>>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn catch_reports<'a>(&'a self, _: &'a Polygon, _: DateTime<Utc>) -> BoxFuture<'a, Result<Vec<CatchReport>>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

/// The part of a request the caller knows before any external lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaQuery {
    pub polygon: Polygon,
    pub samples: Vec<PixelSample>,
    pub date: DateTime<Utc>,
}

pub struct ParallelPipeline {
    pipeline: Arc<AnalysisPipeline>,
    source: Arc<dyn DataSource>,
    fetch_timeout: Duration,
    max_in_flight: usize,
}

impl ParallelPipeline {
    pub fn new(pipeline: AnalysisPipeline, source: Arc<dyn DataSource>) -> Self {
        let fetch_timeout = Duration::from_millis(pipeline.config().fetch.timeout_ms);
        Self {
            pipeline: Arc::new(pipeline),
            source,
            fetch_timeout,
            max_in_flight: num_cpus::get().max(1),
        }
    }

    pub fn pipeline(&self) -> &AnalysisPipeline {
        &self.pipeline
    }

    /// Fetches the external inputs concurrently and folds them into a request.
    pub async fn resolve(&self, query: AreaQuery) -> AnalysisRequest {
        let polygon = &query.polygon;
        let (short, long, vessels, reports) = tokio::join!(
            self.fetch("7-day baseline", self.source.historical(polygon, query.date, SHORT_LOOKBACK_DAYS)),
            self.fetch("14-day baseline", self.source.historical(polygon, query.date, LONG_LOOKBACK_DAYS)),
            self.fetch("vessel tracks", self.source.vessels(polygon, query.date)),
            self.fetch("catch reports", self.source.catch_reports(polygon, query.date)),
        );

        let short = short.unwrap_or_default();
        let long = long.unwrap_or_default();
        let historical = HistoricalBaselines {
            sst: Baselines {
                seven_day: short.sst,
                fourteen_day: long.sst,
            },
            chl: Baselines {
                seven_day: short.chl,
                fourteen_day: long.chl,
            },
        };

        AnalysisRequest {
            polygon: query.polygon,
            samples: query.samples,
            historical,
            vessels: vessels.unwrap_or_default(),
            reports: reports.unwrap_or_default(),
            date: query.date,
        }
    }

    /// Resolves external inputs, then runs the engine on the blocking pool.
    pub async fn analyze(&self, query: AreaQuery) -> Result<AnalysisReport> {
        let request = self.resolve(query).await;
        let pipeline = Arc::clone(&self.pipeline);
        let report = tokio::task::spawn_blocking(move || pipeline.analyze(&request)).await?;
        Ok(report)
    }

    /// Analyzes every query concurrently. Results keep the input order.
    pub async fn analyze_batch(&self, queries: Vec<AreaQuery>) -> Vec<Result<AnalysisReport>> {
        debug!(count = queries.len(), in_flight = self.max_in_flight, "Starting batch analysis.");
        stream::iter(queries)
            .map(|query| self.analyze(query))
            .buffered(self.max_in_flight)
            .collect()
            .await
    }

    async fn fetch<T>(&self, what: &'static str, request: impl Future<Output = Result<T>>) -> Option<T> {
        match tokio::time::timeout(self.fetch_timeout, request).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(error)) => {
                warn!(source = what, %error, "External fetch failed, continuing without it.");
                None
            }
            Err(_) => {
                warn!(
                    source = what,
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "External fetch timed out, continuing without it."
                );
                None
            }
        }
    }
}
