//! Scene boundary for the band simulation.
//!
//! The simulation never draws anything itself. It talks to a host engine
//! through [`SceneProvider`], which only needs two operations: create a
//! primitive of some kind (optionally parented) and set one property on it.
//!
//! [`SceneGraph`] is an in-memory provider used by the headless CLI and tests.

use std::collections::HashMap;

use glam::{Quat, Vec3};

use crate::color::Rgb;

/// Opaque handle to a host primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

/// Kinds of primitive the simulation asks the host for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Renderable segment body.
    Part,
    /// Point light attached to a segment.
    PointLight,
    /// Particle emitter attached to a segment.
    Emitter,
}

/// Position + orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

impl Transform {
    /// Transform at `position` with the fixed (identity) orientation.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Interpolate toward `target`. Exact at t = 0 and t = 1.
    pub fn lerp(&self, target: &Transform, t: f32) -> Transform {
        Transform {
            position: self.position * (1.0 - t) + target.position * t,
            rotation: self.rotation.slerp(target.rotation, t),
        }
    }
}

/// A single property write on a host primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Transform(Transform),
    Color(Rgb),
    /// 0 = opaque, 1 = invisible.
    Transparency(f32),
    LightBrightness(f32),
    LightEnabled(bool),
    LightRange(f32),
    LightColor(Rgb),
    EmitterTexture(String),
    EmitterRate(f32),
    /// Min/max particle lifetime in seconds.
    EmitterLifetime(f32, f32),
    EmitterSpeed(f32),
    /// (time, size) keypoints over a particle's life.
    EmitterSizeCurve(Vec<(f32, f32)>),
    EmitterTransparency(f32),
}

/// Host engine object factory.
pub trait SceneProvider {
    /// Create a primitive, parented to `parent` when given.
    fn create(&mut self, kind: EntityKind, parent: Option<EntityId>) -> EntityId;

    /// Write one property. Fire-and-forget.
    fn set(&mut self, id: EntityId, property: Property);

    /// Destroy a primitive and anything parented to it.
    fn destroy(&mut self, id: EntityId);
}

/// Renderable segment body state.
#[derive(Debug, Clone, PartialEq)]
pub struct PartState {
    pub transform: Transform,
    pub color: Rgb,
    pub transparency: f32,
}

impl Default for PartState {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            color: Rgb::WHITE,
            transparency: 0.0,
        }
    }
}

/// Point light state.
#[derive(Debug, Clone, PartialEq)]
pub struct LightState {
    pub brightness: f32,
    pub enabled: bool,
    pub range: f32,
    pub color: Rgb,
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            enabled: true,
            range: 8.0,
            color: Rgb::WHITE,
        }
    }
}

/// Particle emitter state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmitterState {
    pub texture: String,
    pub rate: f32,
    pub lifetime: (f32, f32),
    pub speed: f32,
    pub size_curve: Vec<(f32, f32)>,
    pub transparency: f32,
}

/// An entity held by the in-memory scene.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEntity {
    Part(PartState),
    Light(LightState),
    Emitter(EmitterState),
}

impl SceneEntity {
    fn new(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Part => SceneEntity::Part(PartState::default()),
            EntityKind::PointLight => SceneEntity::Light(LightState::default()),
            EntityKind::Emitter => SceneEntity::Emitter(EmitterState::default()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            SceneEntity::Part(_) => EntityKind::Part,
            SceneEntity::Light(_) => EntityKind::PointLight,
            SceneEntity::Emitter(_) => EntityKind::Emitter,
        }
    }

    /// Apply a property write. Returns false if the property does not
    /// apply to this kind of entity.
    fn apply(&mut self, property: Property) -> bool {
        match (self, property) {
            (SceneEntity::Part(p), Property::Transform(t)) => p.transform = t,
            (SceneEntity::Part(p), Property::Color(c)) => p.color = c,
            (SceneEntity::Part(p), Property::Transparency(v)) => p.transparency = v,
            (SceneEntity::Light(l), Property::LightBrightness(v)) => l.brightness = v,
            (SceneEntity::Light(l), Property::LightEnabled(v)) => l.enabled = v,
            (SceneEntity::Light(l), Property::LightRange(v)) => l.range = v,
            (SceneEntity::Light(l), Property::LightColor(c)) => l.color = c,
            (SceneEntity::Emitter(e), Property::EmitterTexture(s)) => e.texture = s,
            (SceneEntity::Emitter(e), Property::EmitterRate(v)) => e.rate = v,
            (SceneEntity::Emitter(e), Property::EmitterLifetime(a, b)) => e.lifetime = (a, b),
            (SceneEntity::Emitter(e), Property::EmitterSpeed(v)) => e.speed = v,
            (SceneEntity::Emitter(e), Property::EmitterSizeCurve(c)) => e.size_curve = c,
            (SceneEntity::Emitter(e), Property::EmitterTransparency(v)) => e.transparency = v,
            _ => return false,
        }
        true
    }
}

/// In-memory scene provider.
#[derive(Debug)]
pub struct SceneGraph {
    entities: HashMap<EntityId, SceneEntity>,
    parents: HashMap<EntityId, EntityId>,
    next_id: u64,
    writes: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            parents: HashMap::new(),
            next_id: 1,
            writes: 0,
        }
    }

    fn new_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&SceneEntity> {
        self.entities.get(&id)
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.parents.get(&id).copied()
    }

    pub fn exists(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Total number of property writes applied so far.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    pub fn part(&self, id: EntityId) -> Option<&PartState> {
        match self.entities.get(&id) {
            Some(SceneEntity::Part(p)) => Some(p),
            _ => None,
        }
    }

    pub fn light(&self, id: EntityId) -> Option<&LightState> {
        match self.entities.get(&id) {
            Some(SceneEntity::Light(l)) => Some(l),
            _ => None,
        }
    }

    pub fn emitter(&self, id: EntityId) -> Option<&EmitterState> {
        match self.entities.get(&id) {
            Some(SceneEntity::Emitter(e)) => Some(e),
            _ => None,
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneProvider for SceneGraph {
    fn create(&mut self, kind: EntityKind, parent: Option<EntityId>) -> EntityId {
        let id = self.new_id();
        self.entities.insert(id, SceneEntity::new(kind));
        if let Some(parent) = parent {
            self.parents.insert(id, parent);
        }
        id
    }

    fn set(&mut self, id: EntityId, property: Property) {
        let Some(entity) = self.entities.get_mut(&id) else {
            log::warn!("set on unknown entity {:?}", id);
            return;
        };
        let kind = entity.kind();
        if entity.apply(property) {
            self.writes += 1;
        } else {
            log::warn!("property does not apply to {:?} entity {:?}", kind, id);
        }
    }

    fn destroy(&mut self, id: EntityId) {
        let children: Vec<EntityId> = self
            .parents
            .iter()
            .filter(|&(_, &p)| p == id)
            .map(|(&c, _)| c)
            .collect();
        for child in children {
            self.destroy(child);
        }
        self.parents.remove(&id);
        self.entities.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_parent() {
        let mut scene = SceneGraph::new();
        let part = scene.create(EntityKind::Part, None);
        let light = scene.create(EntityKind::PointLight, Some(part));

        assert!(scene.exists(part));
        assert_eq!(scene.parent(light), Some(part));
        assert_eq!(scene.parent(part), None);
        assert_eq!(scene.get(light).map(|e| e.kind()), Some(EntityKind::PointLight));
    }

    #[test]
    fn test_set_applies_matching_property() {
        let mut scene = SceneGraph::new();
        let light = scene.create(EntityKind::PointLight, None);
        scene.set(light, Property::LightBrightness(3.5));
        scene.set(light, Property::LightEnabled(false));

        let state = scene.light(light).unwrap();
        assert_eq!(state.brightness, 3.5);
        assert!(!state.enabled);
        assert_eq!(scene.write_count(), 2);
    }

    #[test]
    fn test_set_ignores_mismatched_property() {
        let mut scene = SceneGraph::new();
        let part = scene.create(EntityKind::Part, None);
        scene.set(part, Property::EmitterRate(10.0));
        assert_eq!(scene.write_count(), 0);
        assert_eq!(scene.part(part), Some(&PartState::default()));
    }

    #[test]
    fn test_destroy_removes_children() {
        let mut scene = SceneGraph::new();
        let part = scene.create(EntityKind::Part, None);
        let light = scene.create(EntityKind::PointLight, Some(part));
        let emitter = scene.create(EntityKind::Emitter, Some(part));

        scene.destroy(part);
        assert!(!scene.exists(part));
        assert!(!scene.exists(light));
        assert!(!scene.exists(emitter));
        assert!(scene.is_empty());
    }

    #[test]
    fn test_transform_lerp_endpoints() {
        let a = Transform::at(Vec3::new(1.0, 2.0, 3.0));
        let b = Transform::at(Vec3::new(-4.0, 0.5, 9.0));
        assert_eq!(a.lerp(&b, 0.0).position, a.position);
        assert_eq!(a.lerp(&b, 1.0).position, b.position);

        let mid = a.lerp(&b, 0.5);
        assert!((mid.position.x - -1.5).abs() < 1e-5);
    }
}
