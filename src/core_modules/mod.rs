pub mod activity;
pub mod colormap;
pub mod feature;
pub mod feature_detector;
pub mod gradient_field;
pub mod narrative;
pub mod pixel;
pub mod scoring;
pub mod sections;
pub mod tile_sampler;
pub mod trend;
pub mod utils;
