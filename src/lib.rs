pub mod color;
pub mod error;
pub mod scheduler;
pub mod scene_graph;
pub mod wave_band;
pub mod catalog;
pub mod ensemble;

// Presentation
pub mod visibility;
pub mod ambient;
pub mod scene_binding;
pub mod controller;

// Headless runs
pub mod run_job;
pub mod cli;

pub use error::{Error, Result};
pub use ensemble::BandEnsemble;
pub use wave_band::WaveBand;
