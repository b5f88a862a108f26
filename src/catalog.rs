//! Band catalog: the parameter sets an ensemble is built from.
//!
//! The built-in catalog holds fifteen bands stacked between y = 110 and
//! y = 160. A catalog can also be loaded from JSON:
//!
//! ```json
//! {
//!   "bands": [
//!     {
//!       "origin": [-200.0, 120.0, 40.0],
//!       "length": 400.0,
//!       "segmentCount": 30,
//!       "amplitude": 12.0,
//!       "frequency": 0.8,
//!       "baseColor": { "r": 0.1, "g": 0.9, "b": 0.5 },
//!       "fadeColor": { "r": 0.4, "g": 0.2, "b": 0.9 }
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::{Error, Result};
use crate::wave_band::WaveBand;

/// Construction parameters for one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandSpec {
    /// World position of the band's first segment.
    pub origin: [f32; 3],
    pub length: f32,
    pub segment_count: usize,
    pub amplitude: f32,
    pub frequency: f32,
    pub base_color: Rgb,
    pub fade_color: Rgb,
}

impl BandSpec {
    /// Build the band this spec describes.
    pub fn build(&self) -> Result<WaveBand> {
        WaveBand::create(
            Vec3::from_array(self.origin),
            self.length,
            self.segment_count,
            self.amplitude,
            self.frequency,
            self.base_color,
            self.fade_color,
        )
    }
}

/// An ordered list of band specs. Order is ensemble iteration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSpec {
    pub bands: Vec<BandSpec>,
}

impl CatalogSpec {
    /// Parse a catalog from JSON text and validate it.
    pub fn from_json(json: &str) -> std::result::Result<Self, String> {
        let catalog: CatalogSpec =
            serde_json::from_str(json).map_err(|e| format!("Failed to parse catalog: {}", e))?;
        catalog.validate().map_err(|e| e.to_string())?;
        Ok(catalog)
    }

    /// Load a catalog from a JSON file.
    pub fn from_file(path: &Path) -> std::result::Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read catalog file {:?}: {}", path, e))?;
        Self::from_json(&content).map_err(|e| format!("{:?}: {}", path, e))
    }

    /// Check every band's parameters without keeping the built bands.
    pub fn validate(&self) -> Result<()> {
        if self.bands.is_empty() {
            return Err(Error::invalid("bands", "catalog must contain at least one band"));
        }
        for spec in &self.bands {
            spec.build()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn total_segments(&self) -> usize {
        self.bands.iter().map(|b| b.segment_count).sum()
    }
}

impl Default for CatalogSpec {
    fn default() -> Self {
        default_catalog()
    }
}

fn spec(
    origin: [f32; 3],
    length: f32,
    segment_count: usize,
    amplitude: f32,
    frequency: f32,
    base: (u8, u8, u8),
    fade: (u8, u8, u8),
) -> BandSpec {
    BandSpec {
        origin,
        length,
        segment_count,
        amplitude,
        frequency,
        base_color: Rgb::from_rgb8(base.0, base.1, base.2),
        fade_color: Rgb::from_rgb8(fade.0, fade.1, fade.2),
    }
}

/// The built-in fifteen-band sky.
pub fn default_catalog() -> CatalogSpec {
    CatalogSpec {
        bands: vec![
            spec([-250.0, 110.0, -60.0], 500.0, 40, 12.0, 0.50, (40, 255, 140), (90, 60, 220)),
            spec([-220.0, 114.0, -20.0], 440.0, 36, 10.0, 0.65, (60, 240, 180), (150, 50, 200)),
            spec([-280.0, 118.0, 30.0], 560.0, 44, 14.0, 0.40, (20, 220, 120), (60, 100, 255)),
            spec([-200.0, 121.0, 70.0], 400.0, 32, 8.0, 0.80, (120, 255, 200), (200, 80, 255)),
            spec([-300.0, 125.0, -90.0], 600.0, 48, 16.0, 0.35, (30, 200, 100), (40, 40, 180)),
            spec([-180.0, 128.0, 10.0], 360.0, 28, 6.0, 0.95, (100, 255, 160), (255, 80, 180)),
            spec([-240.0, 132.0, -45.0], 480.0, 38, 11.0, 0.55, (50, 230, 150), (120, 70, 240)),
            spec([-260.0, 135.0, 55.0], 520.0, 42, 13.0, 0.45, (70, 255, 190), (80, 120, 255)),
            spec([-210.0, 139.0, -10.0], 420.0, 34, 9.0, 0.70, (90, 245, 170), (180, 60, 230)),
            spec([-320.0, 142.0, 95.0], 640.0, 50, 18.0, 0.30, (25, 210, 110), (50, 60, 200)),
            spec([-190.0, 146.0, -70.0], 380.0, 30, 7.0, 0.85, (140, 255, 210), (230, 100, 255)),
            spec([-230.0, 149.0, 25.0], 460.0, 36, 10.0, 0.60, (45, 235, 135), (110, 90, 250)),
            spec([-270.0, 153.0, -35.0], 540.0, 44, 15.0, 0.42, (35, 225, 125), (70, 70, 230)),
            spec([-170.0, 156.0, 80.0], 340.0, 26, 5.0, 1.10, (160, 255, 220), (255, 120, 200)),
            spec([-250.0, 160.0, 0.0], 500.0, 40, 12.0, 0.52, (55, 250, 165), (140, 60, 255)),
        ],
    }
}
