//! A single aurora band: a row of segments that ripple and shift color.
//!
//! Each segment sits at a fixed normalized position `t` along the band's
//! horizontal axis. Every frame the band computes a target position from a
//! vertical sine wave plus a slower lateral sway, eases each segment toward
//! it, and blends its color between the band's two endpoint colors.
//!
//! Everything here is a pure function of band state and the frame times
//! passed in. No allocation happens in [`WaveBand::update`].

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use crate::color::Rgb;
use crate::error::{ensure_non_negative, ensure_positive, Error, Result};
use crate::scene_graph::Transform;

/// Lateral sway amplitude in world units.
pub const SWAY_AMPLITUDE: f32 = 5.0;

/// Rate of the exponential approach toward the target position (1/s).
pub const FOLLOW_RATE: f32 = 5.0;

/// Resting point-light brightness of every segment.
pub const BASE_LIGHT_BRIGHTNESS: f32 = 2.0;

/// Identifies one flash perturbation across all bands it touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlashId(pub u64);

/// Offsets contributed by one active flash.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FlashOffset {
    id: FlashId,
    amplitude: f32,
    brightness: f32,
}

/// One discrete animated element of a band.
#[derive(Debug, Clone)]
pub struct Segment {
    index: usize,
    normalized_t: f32,
    base_position: Vec3,
    transform: Transform,
    color: Rgb,
    light_color: Rgb,
    light_brightness: f32,
}

impl Segment {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Position along the band in [0, 1].
    pub fn normalized_t(&self) -> f32 {
        self.normalized_t
    }

    /// Rest position, derived from the band origin, length and `t`.
    pub fn base_position(&self) -> Vec3 {
        self.base_position
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn light_color(&self) -> Rgb {
        self.light_color
    }

    pub fn light_brightness(&self) -> f32 {
        self.light_brightness
    }
}

/// Vertical wave and lateral sway offset for a segment at `t`.
pub fn oscillation_offset(t: f32, elapsed: f32, frequency: f32, amplitude: f32) -> Vec3 {
    let wave = (elapsed * frequency + t * TAU).sin() * amplitude;
    let sway = (elapsed * frequency * 0.5 + t * PI).cos() * SWAY_AMPLITUDE;
    Vec3::new(0.0, wave, sway)
}

/// Color blend factor in [0, 1] for a segment at `t`.
pub fn color_shift(t: f32, elapsed: f32) -> f32 {
    0.5 + 0.5 * (elapsed + t * TAU).sin()
}

/// Interpolation factor for one frame of exponential approach.
///
/// Clamped so a long frame lands on the target instead of overshooting it.
/// A non-finite `dt` moves nothing.
pub fn follow_factor(dt: f32) -> f32 {
    if !dt.is_finite() {
        return 0.0;
    }
    (dt * FOLLOW_RATE).clamp(0.0, 1.0)
}

/// An independently animated wave of segments.
#[derive(Debug, Clone)]
pub struct WaveBand {
    origin: Vec3,
    length: f32,
    amplitude: f32,
    frequency: f32,
    base_color: Rgb,
    fade_color: Rgb,
    segments: Vec<Segment>,
    flashes: Vec<FlashOffset>,
    generation: u64,
}

impl WaveBand {
    /// Build a band and lay out its segments at rest.
    pub fn create(
        origin: Vec3,
        length: f32,
        segment_count: usize,
        amplitude: f32,
        frequency: f32,
        base_color: Rgb,
        fade_color: Rgb,
    ) -> Result<Self> {
        if !origin.is_finite() {
            return Err(Error::invalid("origin", format!("must be finite, got {}", origin)));
        }
        ensure_positive("length", length)?;
        if segment_count < 2 {
            return Err(Error::invalid(
                "segment_count",
                format!("must be >= 2, got {}", segment_count),
            ));
        }
        ensure_non_negative("amplitude", amplitude)?;
        ensure_positive("frequency", frequency)?;

        let last = (segment_count - 1) as f32;
        let segments = (0..segment_count)
            .map(|index| {
                let t = index as f32 / last;
                let base_position = origin + Vec3::new(length * t, 0.0, 0.0);
                let color = base_color.lerp(fade_color, t);
                Segment {
                    index,
                    normalized_t: t,
                    base_position,
                    transform: Transform::at(base_position),
                    color,
                    light_color: color,
                    light_brightness: BASE_LIGHT_BRIGHTNESS,
                }
            })
            .collect();

        Ok(Self {
            origin,
            length,
            amplitude,
            frequency,
            base_color,
            fade_color,
            segments,
            flashes: Vec::new(),
            generation: 0,
        })
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn base_color(&self) -> Rgb {
        self.base_color
    }

    pub fn fade_color(&self) -> Rgb {
        self.fade_color
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Amplitude without flash offsets.
    pub fn base_amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Amplitude used by [`update`](Self::update): base plus active flashes.
    pub fn amplitude(&self) -> f32 {
        self.amplitude + self.flashes.iter().map(|f| f.amplitude).sum::<f32>()
    }

    pub fn set_frequency(&mut self, frequency: f32) -> Result<()> {
        ensure_positive("frequency", frequency)?;
        self.frequency = frequency;
        Ok(())
    }

    pub fn set_amplitude(&mut self, amplitude: f32) -> Result<()> {
        ensure_non_negative("amplitude", amplitude)?;
        self.amplitude = amplitude;
        Ok(())
    }

    /// Number of flashes currently applied.
    pub fn active_flashes(&self) -> usize {
        self.flashes.len()
    }

    /// Teardown counter; deferred work tagged with an older value is stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Undamped target position of segment `index` at `elapsed`.
    pub fn target_position(&self, index: usize, elapsed: f32) -> Option<Vec3> {
        let segment = self.segments.get(index)?;
        Some(
            segment.base_position
                + oscillation_offset(segment.normalized_t, elapsed, self.frequency, self.amplitude()),
        )
    }

    /// Advance every segment by one frame.
    pub fn update(&mut self, dt: f32, elapsed: f32) {
        let amplitude = self.amplitude();
        let frequency = self.frequency;
        let alpha = follow_factor(dt);

        for segment in &mut self.segments {
            let t = segment.normalized_t;
            let target = Transform::at(
                segment.base_position + oscillation_offset(t, elapsed, frequency, amplitude),
            );
            segment.transform = segment.transform.lerp(&target, alpha);

            let color = self.base_color.lerp(self.fade_color, color_shift(t, elapsed));
            segment.color = color;
            segment.light_color = color;
        }
    }

    /// Snap every segment back to its rest position.
    pub fn reset(&mut self) {
        for segment in &mut self.segments {
            segment.transform = Transform::at(segment.base_position);
        }
    }

    pub(crate) fn push_flash(&mut self, id: FlashId, extra_amplitude: f32, extra_brightness: f32) {
        self.flashes.push(FlashOffset {
            id,
            amplitude: extra_amplitude,
            brightness: extra_brightness,
        });
        self.refresh_brightness();
    }

    /// Remove one flash's offsets. Returns false if it was not active.
    pub(crate) fn remove_flash(&mut self, id: FlashId) -> bool {
        let Some(pos) = self.flashes.iter().position(|f| f.id == id) else {
            return false;
        };
        self.flashes.remove(pos);
        self.refresh_brightness();
        true
    }

    /// Drop all flash offsets and invalidate outstanding deferred work.
    pub(crate) fn retire(&mut self) {
        self.flashes.clear();
        self.refresh_brightness();
        self.generation += 1;
    }

    fn refresh_brightness(&mut self) {
        let extra: f32 = self.flashes.iter().map(|f| f.brightness).sum();
        for segment in &mut self.segments {
            segment.light_brightness = BASE_LIGHT_BRIGHTNESS + extra;
        }
    }
}
