//! Mirrors ensemble state onto host primitives.
//!
//! Every segment gets a part, with a point light and a particle emitter
//! parented to it. Per frame the binding pushes transforms, colors and
//! light brightness; texture and visibility changes are pushed only when
//! they change.

use serde::{Deserialize, Serialize};

use crate::ensemble::BandEnsemble;
use crate::scene_graph::{EntityId, EntityKind, Property, SceneProvider};

fn default_light_range() -> f32 {
    12.0
}

fn default_emitter_rate() -> f32 {
    5.0
}

fn default_emitter_lifetime() -> (f32, f32) {
    (1.0, 2.5)
}

fn default_emitter_speed() -> f32 {
    0.5
}

fn default_size_curve() -> Vec<(f32, f32)> {
    vec![(0.0, 0.6), (0.5, 1.0), (1.0, 0.0)]
}

/// Static look of the per-segment light and emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentStyle {
    #[serde(default = "default_light_range")]
    pub light_range: f32,

    /// Particles per second.
    #[serde(default = "default_emitter_rate")]
    pub emitter_rate: f32,

    /// Min/max particle lifetime in seconds.
    #[serde(default = "default_emitter_lifetime")]
    pub emitter_lifetime: (f32, f32),

    #[serde(default = "default_emitter_speed")]
    pub emitter_speed: f32,

    /// (time, size) keypoints over a particle's life.
    #[serde(default = "default_size_curve")]
    pub size_curve: Vec<(f32, f32)>,
}

impl Default for SegmentStyle {
    fn default() -> Self {
        Self {
            light_range: default_light_range(),
            emitter_rate: default_emitter_rate(),
            emitter_lifetime: default_emitter_lifetime(),
            emitter_speed: default_emitter_speed(),
            size_curve: default_size_curve(),
        }
    }
}

/// Host handles owned by one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHandles {
    pub part: EntityId,
    pub light: EntityId,
    pub emitter: EntityId,
}

/// Handles for every segment of every band, in ensemble order.
#[derive(Debug)]
pub struct SceneBinding {
    bands: Vec<Vec<SegmentHandles>>,
    texture_revision: u64,
    transparency: Option<f32>,
    lights_enabled: Option<bool>,
}

impl SceneBinding {
    /// Create host primitives for every segment of `ensemble`.
    pub fn attach<P: SceneProvider + ?Sized>(
        provider: &mut P,
        ensemble: &BandEnsemble,
        style: &SegmentStyle,
    ) -> Self {
        let bands: Vec<Vec<SegmentHandles>> = ensemble
            .bands()
            .iter()
            .map(|band| {
                band.segments()
                    .iter()
                    .map(|segment| {
                        let part = provider.create(EntityKind::Part, None);
                        let light = provider.create(EntityKind::PointLight, Some(part));
                        let emitter = provider.create(EntityKind::Emitter, Some(part));

                        provider.set(part, Property::Transform(*segment.transform()));
                        provider.set(part, Property::Color(segment.color()));
                        provider.set(light, Property::LightRange(style.light_range));
                        provider.set(light, Property::LightColor(segment.light_color()));
                        provider.set(light, Property::LightBrightness(segment.light_brightness()));
                        provider.set(emitter, Property::EmitterRate(style.emitter_rate));
                        provider.set(
                            emitter,
                            Property::EmitterLifetime(style.emitter_lifetime.0, style.emitter_lifetime.1),
                        );
                        provider.set(emitter, Property::EmitterSpeed(style.emitter_speed));
                        provider.set(emitter, Property::EmitterSizeCurve(style.size_curve.clone()));

                        SegmentHandles { part, light, emitter }
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut binding = Self {
            bands,
            texture_revision: 0,
            transparency: None,
            lights_enabled: None,
        };
        binding.push_texture(provider, ensemble);
        log::debug!("Scene binding attached: {} segments", binding.segment_count());
        binding
    }

    pub fn segment_count(&self) -> usize {
        self.bands.iter().map(|b| b.len()).sum()
    }

    pub fn handles(&self, band: usize, segment: usize) -> Option<&SegmentHandles> {
        self.bands.get(band)?.get(segment)
    }

    fn all_handles(&self) -> impl Iterator<Item = &SegmentHandles> {
        self.bands.iter().flatten()
    }

    /// Push per-frame segment state.
    pub fn sync<P: SceneProvider + ?Sized>(&mut self, provider: &mut P, ensemble: &BandEnsemble) {
        for (band, handles) in ensemble.bands().iter().zip(&self.bands) {
            for (segment, h) in band.segments().iter().zip(handles) {
                provider.set(h.part, Property::Transform(*segment.transform()));
                provider.set(h.part, Property::Color(segment.color()));
                provider.set(h.light, Property::LightColor(segment.light_color()));
                provider.set(h.light, Property::LightBrightness(segment.light_brightness()));
            }
        }

        if ensemble.texture_revision() != self.texture_revision {
            self.push_texture(provider, ensemble);
        }
    }

    fn push_texture<P: SceneProvider + ?Sized>(&mut self, provider: &mut P, ensemble: &BandEnsemble) {
        self.texture_revision = ensemble.texture_revision();
        let Some(texture) = ensemble.particle_texture() else {
            return;
        };
        for h in self.all_handles() {
            provider.set(h.emitter, Property::EmitterTexture(texture.to_string()));
        }
    }

    /// Push visibility: part and emitter transparency, light enable flag.
    pub fn apply_visibility<P: SceneProvider + ?Sized>(
        &mut self,
        provider: &mut P,
        transparency: f32,
        lights_enabled: bool,
    ) {
        if self.transparency != Some(transparency) {
            for h in self.all_handles() {
                provider.set(h.part, Property::Transparency(transparency));
                provider.set(h.emitter, Property::EmitterTransparency(transparency));
            }
            self.transparency = Some(transparency);
        }

        if self.lights_enabled != Some(lights_enabled) {
            for h in self.all_handles() {
                provider.set(h.light, Property::LightEnabled(lights_enabled));
            }
            self.lights_enabled = Some(lights_enabled);
        }
    }

    /// Destroy every primitive this binding created.
    pub fn detach<P: SceneProvider + ?Sized>(&mut self, provider: &mut P) {
        for h in self.all_handles() {
            provider.destroy(h.part);
        }
        log::debug!("Scene binding detached: {} segments", self.segment_count());
        self.bands.clear();
    }
}
