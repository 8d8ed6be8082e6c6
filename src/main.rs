// Example runner for the `ocean_lens` engine.
//
//     ocean_lens <request.json> [config.toml]
//
// Without arguments it analyzes a built-in synthetic thermal front.

use chrono::{TimeZone, Utc};
use ocean_lens::core_modules::pixel::pixel::{Layer, PixelSample, Rgb};
use ocean_lens::core_modules::utils::geo::geo::Polygon;
use ocean_lens::{AnalysisConfig, AnalysisPipeline, AnalysisRequest, AreaQuery, OfflineSource, ParallelPipeline, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let request_path = args.next();
    let config = match args.next() {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };
    let pipeline = AnalysisPipeline::from_config(config);

    let report = match request_path {
        Some(path) => {
            info!(%path, "Analyzing request.");
            let request = AnalysisRequest::from_json(&std::fs::read_to_string(&path)?)?;
            pipeline.analyze(&request)
        }
        None => {
            info!("No request given, analyzing a synthetic front.");
            let parallel = ParallelPipeline::new(pipeline, Arc::new(OfflineSource));
            parallel.analyze(synthetic_front()?).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// A 68°F / 74°F front running east-west off the New England shelf.
fn synthetic_front() -> Result<AreaQuery> {
    let cold = Rgb::new(50, 200, 0);
    let warm = Rgb::new(200, 200, 0);
    let mut samples = Vec::new();
    for row in 0..6 {
        for col in 0..21 {
            let lat = 39.0 + row as f64 * 0.00724;
            let lng = -71.0 + col as f64 * 0.0093;
            let rgb = if row < 3 { cold } else { warm };
            samples.push(PixelSample::new(lat, lng, rgb, Layer::Sst)?);
        }
        samples.push(PixelSample::new(39.0 + row as f64 * 0.00724, -70.99, Rgb::new(0, 200, 220), Layer::Chl)?);
    }

    Ok(AreaQuery {
        polygon: Polygon::from_lng_lat(&[[-71.01, 38.99], [-70.8, 38.99], [-70.8, 39.05], [-71.01, 39.05]]),
        samples,
        date: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).single().unwrap_or_else(Utc::now),
    })
}
