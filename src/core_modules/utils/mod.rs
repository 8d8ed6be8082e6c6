pub mod geo;
pub mod image_helper;
pub mod stats;
