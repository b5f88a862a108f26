//! Headless run specification, frame snapshots and run metadata.
//!
//! A run job describes one deterministic simulation pass: which catalog to
//! build, how long to run at what frame rate, and a script of timed events
//! (flashes, visibility toggles) to inject through the control handle.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ambient::AmbientSample;
use crate::color::Rgb;
use crate::ensemble::{BandEnsemble, BandStatus};

/// Default frame rate.
fn default_fps() -> f32 {
    60.0
}

/// Default run length in seconds.
fn default_duration() -> f32 {
    10.0
}

fn default_dump_every() -> usize {
    1
}

fn default_flash_duration() -> f32 {
    0.5
}

fn default_flash_brightness() -> f32 {
    3.0
}

fn default_flash_amplitude() -> f32 {
    8.0
}

/// Parameters for every scripted flash in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashSpec {
    #[serde(default = "default_flash_duration")]
    pub duration: f32,
    #[serde(default = "default_flash_brightness")]
    pub extra_brightness: f32,
    #[serde(default = "default_flash_amplitude")]
    pub extra_amplitude: f32,
}

impl Default for FlashSpec {
    fn default() -> Self {
        Self {
            duration: default_flash_duration(),
            extra_brightness: default_flash_brightness(),
            extra_amplitude: default_flash_amplitude(),
        }
    }
}

/// Specification for a single headless run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunJobSpec {
    /// Band catalog JSON. None means the built-in catalog.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Controller config JSON (ambient, visibility, segment style).
    #[serde(default)]
    pub config_path: Option<PathBuf>,

    #[serde(default = "default_fps")]
    pub fps: f32,

    /// Run length in seconds.
    #[serde(default = "default_duration")]
    pub duration: f32,

    /// Elapsed times at which to trigger a flash.
    #[serde(default)]
    pub flash_at: Vec<f32>,

    #[serde(default)]
    pub flash: FlashSpec,

    /// Elapsed times at which to toggle visibility.
    #[serde(default)]
    pub toggle_at: Vec<f32>,

    /// Particle texture to set before the first frame.
    #[serde(default)]
    pub texture: Option<String>,

    /// Global frequency override applied before the first frame.
    #[serde(default)]
    pub frequency: Option<f32>,

    /// Global amplitude override applied before the first frame.
    #[serde(default)]
    pub amplitude: Option<f32>,

    /// Where to write frame snapshots. None disables the dump.
    #[serde(default)]
    pub dump_path: Option<PathBuf>,

    /// Snapshot every Nth frame.
    #[serde(default = "default_dump_every")]
    pub dump_every: usize,
}

impl Default for RunJobSpec {
    fn default() -> Self {
        Self {
            catalog_path: None,
            config_path: None,
            fps: default_fps(),
            duration: default_duration(),
            flash_at: Vec::new(),
            flash: FlashSpec::default(),
            toggle_at: Vec::new(),
            texture: None,
            frequency: None,
            amplitude: None,
            dump_path: None,
            dump_every: default_dump_every(),
        }
    }
}

impl RunJobSpec {
    /// Load a job spec from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read job file {:?}: {}", path, e))?;
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse job file {:?}: {}", path, e))
    }

    /// Validate the job specification.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(path) = &self.catalog_path {
            if !path.exists() {
                return Err(format!("Catalog file not found: {:?}", path));
            }
        }
        if let Some(path) = &self.config_path {
            if !path.exists() {
                return Err(format!("Config file not found: {:?}", path));
            }
        }
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err("FPS must be positive".to_string());
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err("Duration must be positive".to_string());
        }
        if self.dump_every == 0 {
            return Err("dump_every must be at least 1".to_string());
        }
        if self
            .flash_at
            .iter()
            .chain(&self.toggle_at)
            .any(|t| !t.is_finite() || *t < 0.0)
        {
            return Err("Event times must be finite and non-negative".to_string());
        }
        Ok(())
    }

    pub fn total_frames(&self) -> usize {
        (self.duration * self.fps).ceil() as usize
    }
}

/// Per-segment state captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSnapshot {
    pub position: [f32; 3],
    pub color: Rgb,
    pub brightness: f32,
}

/// All segment state at one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    pub frame: usize,
    pub elapsed: f32,
    pub transparency: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambient: Option<AmbientSample>,
    pub bands: Vec<Vec<SegmentSnapshot>>,
}

impl FrameSnapshot {
    pub fn capture(
        frame: usize,
        elapsed: f32,
        transparency: f32,
        ambient: Option<AmbientSample>,
        ensemble: &BandEnsemble,
    ) -> Self {
        let bands: Vec<Vec<SegmentSnapshot>> = ensemble
            .bands()
            .iter()
            .map(|band| {
                band.segments()
                    .iter()
                    .map(|s| SegmentSnapshot {
                        position: s.position().to_array(),
                        color: s.color(),
                        brightness: s.light_brightness(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        Self {
            frame,
            elapsed,
            transparency,
            ambient,
            bands,
        }
    }
}

/// Metadata for a completed run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    /// The job specification used.
    pub job: RunJobSpec,

    /// Timestamp when the run started (ISO 8601).
    pub started_at: DateTime<Utc>,

    /// Timestamp when the run completed (ISO 8601).
    pub completed_at: DateTime<Utc>,

    /// Total frames simulated.
    pub frame_count: usize,

    /// Flashes triggered by the event script.
    pub flashes_triggered: usize,

    /// Visibility toggles issued by the event script.
    pub toggles: usize,

    /// Band status at the end of the run, before shutdown.
    pub final_status: Vec<BandStatus>,

    /// Crate version.
    pub aurora_version: String,

    /// Any warnings or issues during the run.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// What gets written to the dump file.
#[derive(Debug, Clone, Serialize)]
pub struct RunDump {
    pub metadata: RunMetadata,
    pub frames: Vec<FrameSnapshot>,
}

impl RunDump {
    /// Save the dump to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize run dump: {}", e))?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write run dump: {}", e))
    }
}
