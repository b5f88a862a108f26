//! Day/night ambient lighting sweep.
//!
//! The ambient color and brightness follow one sine cycle per `period`
//! seconds, blending from the night values (phase 0) to the day values
//! (phase 1). The result is pushed to an [`AmbientSink`] every frame and
//! never read back.

use serde::{Deserialize, Serialize};

use crate::color::Rgb;

fn default_period() -> f32 {
    120.0
}

fn default_day_color() -> Rgb {
    Rgb::new(0.55, 0.65, 0.85)
}

fn default_night_color() -> Rgb {
    Rgb::new(0.02, 0.03, 0.08)
}

fn default_min_brightness() -> f32 {
    0.1
}

fn default_max_brightness() -> f32 {
    1.0
}

/// Ambient cycle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbientConfig {
    /// Seconds per full night-day-night cycle.
    #[serde(default = "default_period")]
    pub period: f32,

    #[serde(default = "default_day_color")]
    pub day_color: Rgb,

    #[serde(default = "default_night_color")]
    pub night_color: Rgb,

    #[serde(default = "default_min_brightness")]
    pub min_brightness: f32,

    #[serde(default = "default_max_brightness")]
    pub max_brightness: f32,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            day_color: default_day_color(),
            night_color: default_night_color(),
            min_brightness: default_min_brightness(),
            max_brightness: default_max_brightness(),
        }
    }
}

impl AmbientConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.period.is_finite() && self.period > 0.0) {
            return Err("Ambient period must be positive".to_string());
        }
        if self.min_brightness < 0.0 || self.max_brightness < self.min_brightness {
            return Err("Ambient brightness range must satisfy 0 <= min <= max".to_string());
        }
        Ok(())
    }
}

/// One ambient lighting value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmbientSample {
    pub color: Rgb,
    pub brightness: f32,
}

/// Receiver for the computed ambient lighting.
pub trait AmbientSink {
    fn apply(&mut self, sample: AmbientSample);
}

/// Sink that keeps only the most recent sample.
#[derive(Debug, Default, Clone)]
pub struct LastAmbient(pub Option<AmbientSample>);

impl AmbientSink for LastAmbient {
    fn apply(&mut self, sample: AmbientSample) {
        self.0 = Some(sample);
    }
}

/// Sample the day/night blend at `elapsed` seconds.
pub fn sample(config: &AmbientConfig, elapsed: f32) -> AmbientSample {
    let phase = 0.5 + 0.5 * (std::f32::consts::TAU * elapsed / config.period).sin();
    AmbientSample {
        color: config.night_color.lerp(config.day_color, phase),
        brightness: config.min_brightness + (config.max_brightness - config.min_brightness) * phase,
    }
}
