use slotmap::{SlotMap, new_key_type};

use super::camera::Camera;
use super::instance::{Instance, InstanceCategory};
use super::light::{Light, LightKind};
use crate::assets::TextureHandle;

new_key_type! {
    pub struct InstanceId;
}

/// Everything the renderer reads to build one frame.
///
/// Owned by the application; animation and input update it between frames.
/// The renderer never mutates it.
#[derive(Debug, Default)]
pub struct SceneStore {
    pub camera: Camera,
    /// Environment cubemap for the skybox and reflective instances.
    pub environment: Option<TextureHandle>,
    lights: Vec<Light>,
    instances: SlotMap<InstanceId, Instance>,
    /// Live ids in insertion order; the slot map reuses freed slots.
    order: Vec<InstanceId>,
}

impl SceneStore {
    #[must_use]
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            ..Self::default()
        }
    }

    // ========================================================================
    // Instances
    // ========================================================================

    pub fn add_instance(&mut self, instance: Instance) -> InstanceId {
        let id = self.instances.insert(instance);
        self.order.push(id);
        id
    }

    pub fn remove_instance(&mut self, id: InstanceId) -> Option<Instance> {
        let removed = self.instances.remove(id)?;
        self.order.retain(|&live| live != id);
        Some(removed)
    }

    #[must_use]
    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id)
    }

    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(id)
    }

    /// All instances, in insertion order.
    pub fn instances(&self) -> impl Iterator<Item = (InstanceId, &Instance)> {
        self.order
            .iter()
            .filter_map(move |&id| self.instances.get(id).map(|instance| (id, instance)))
    }

    /// Instances of one category, in insertion order.
    pub fn instances_of(
        &self,
        category: InstanceCategory,
    ) -> impl Iterator<Item = (InstanceId, &Instance)> {
        self.instances()
            .filter(move |(_, instance)| instance.category == category)
    }

    #[must_use]
    pub fn count_of(&self, category: InstanceCategory) -> usize {
        self.instances_of(category).count()
    }

    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    // ========================================================================
    // Lights
    // ========================================================================

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    #[must_use]
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// The first directional light, if any.
    #[must_use]
    pub fn directional_light(&self) -> Option<&Light> {
        self.lights
            .iter()
            .find(|l| matches!(l.kind, LightKind::Directional { .. }))
    }

    pub fn point_lights(&self) -> impl Iterator<Item = &Light> {
        self.lights
            .iter()
            .filter(|l| matches!(l.kind, LightKind::Point { .. }))
    }
}
