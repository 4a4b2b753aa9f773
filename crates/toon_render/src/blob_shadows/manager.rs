//! Manager Registry
//!
//! A [`ShadowWorld`] holds the blob shadow state of one logical scene: one
//! Group per shadow type plus a map from caster handles to dense locations.
//! Worlds are created and torn down explicitly through
//! [`BlobShadowManagers`], which cameras resolve by scene id.
//!
//! # Usage
//!
//! ```ignore
//! let world = managers.create_world(scene)?;
//! let crate_shadow = world.on_renderer_enabled(BlobShadowCaster::circle(0.5), transform);
//! world.set_transform(crate_shadow, moved)?;
//! world.on_renderer_disabled(crate_shadow)?;
//! managers.destroy_world(scene, &mut resources)?;
//! ```

use std::collections::HashMap;

use toon_core::{HandleMap, Id};

use super::caster::{BlobShadowCaster, BlobShadowType, CasterHandle, CasterTransform};
use super::group::BlobShadowGroup;
use crate::backend::GpuResources;
use crate::camera::Camera;
use crate::command::CommandList;
use crate::error::{RenderError, RenderResult};

/// Where a caster lives
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CasterLocation {
    pub shadow_type: BlobShadowType,
    pub index: usize,
}

/// Blob shadow state of one scene
#[derive(Debug)]
pub struct ShadowWorld {
    scene: Id,
    groups: [BlobShadowGroup; BlobShadowType::COUNT],
    locations: HandleMap<BlobShadowCaster, CasterLocation>,
}

impl ShadowWorld {
    pub fn new(scene: Id) -> Self {
        Self {
            scene,
            groups: BlobShadowType::ALL.map(BlobShadowGroup::new),
            locations: HandleMap::new(),
        }
    }

    pub fn scene(&self) -> Id {
        self.scene
    }

    /// Register a caster component
    pub fn on_renderer_enabled(
        &mut self,
        caster: BlobShadowCaster,
        transform: CasterTransform,
    ) -> CasterHandle {
        let shadow_type = caster.shadow_type();
        let handle = self.locations.insert(CasterLocation { shadow_type, index: 0 });
        let index = self.groups[shadow_type.index()].add_renderer(handle, caster, transform);
        if let Some(location) = self.locations.get_mut(handle) {
            location.index = index;
        }
        handle
    }

    /// Unregister a caster component
    pub fn on_renderer_disabled(&mut self, handle: CasterHandle) -> RenderResult<()> {
        let Some(location) = self.locations.remove(handle) else {
            log::warn!("Disabling unknown blob shadow caster {:?}", handle);
            return Err(RenderError::UnknownCaster(handle));
        };
        self.remove_from_group(location);
        Ok(())
    }

    pub fn set_transform(
        &mut self,
        handle: CasterHandle,
        transform: CasterTransform,
    ) -> RenderResult<()> {
        let location = self.resolve(handle)?;
        self.groups[location.shadow_type.index()].set_transform(location.index, transform);
        Ok(())
    }

    /// Replace a caster's descriptor. Changing the shape to another shadow
    /// type moves the caster to that type's Group; the handle stays valid.
    pub fn set_caster(
        &mut self,
        handle: CasterHandle,
        caster: BlobShadowCaster,
    ) -> RenderResult<()> {
        let location = self.resolve(handle)?;
        let new_type = caster.shadow_type();

        if new_type == location.shadow_type {
            self.groups[new_type.index()].set_caster(location.index, caster);
            return Ok(());
        }

        let transform = self.groups[location.shadow_type.index()].record(location.index).transform;
        self.remove_from_group(location);
        let index = self.groups[new_type.index()].add_renderer(handle, caster, transform);
        if let Some(entry) = self.locations.get_mut(handle) {
            *entry = CasterLocation {
                shadow_type: new_type,
                index,
            };
        }
        log::debug!("Caster {:?} moved from {:?} to {:?}", handle, location.shadow_type, new_type);
        Ok(())
    }

    /// Recompute one caster on the next update, even if static
    pub fn force_recompute(&mut self, handle: CasterHandle) -> RenderResult<()> {
        let location = self.resolve(handle)?;
        self.groups[location.shadow_type.index()].force_recompute(location.index);
        Ok(())
    }

    /// Recompute every caster on the next update, statics included
    pub fn mark_all_dirty(&mut self) {
        for group in &mut self.groups {
            group.mark_all_dirty();
        }
    }

    /// Recompute changed casters and upload to the GPU. Returns bytes
    /// uploaded.
    pub fn update(&mut self, resources: &mut dyn GpuResources, commands: &mut CommandList) -> u64 {
        let mut uploaded = 0;
        for group in &mut self.groups {
            group.update_renderer_data();
            uploaded += group.push_data_to_gpu(resources, commands);
        }
        uploaded
    }

    pub fn group(&self, shadow_type: BlobShadowType) -> &BlobShadowGroup {
        &self.groups[shadow_type.index()]
    }

    /// Groups with at least one caster
    pub fn participating_groups(&self) -> impl Iterator<Item = &BlobShadowGroup> {
        self.groups.iter().filter(|group| !group.is_empty())
    }

    pub fn caster_count(&self) -> usize {
        self.locations.len()
    }

    pub fn location(&self, handle: CasterHandle) -> Option<CasterLocation> {
        self.locations.get(handle).copied()
    }

    /// Release every GPU buffer. Casters stay registered and buffers are
    /// re-created on the next update.
    pub fn release(&mut self, resources: &mut dyn GpuResources) {
        for group in &mut self.groups {
            group.release(resources);
        }
    }

    fn resolve(&self, handle: CasterHandle) -> RenderResult<CasterLocation> {
        self.location(handle).ok_or_else(|| {
            log::warn!("Stale blob shadow caster handle {:?}", handle);
            RenderError::UnknownCaster(handle)
        })
    }

    fn remove_from_group(&mut self, location: CasterLocation) {
        let group = &mut self.groups[location.shadow_type.index()];
        if let Some(moved) = group.remove_renderer(location.index) {
            if let Some(entry) = self.locations.get_mut(moved.handle) {
                entry.index = moved.new_index;
            }
        }
    }
}

/// Every live shadow world, keyed by scene
#[derive(Debug, Default)]
pub struct BlobShadowManagers {
    worlds: HashMap<Id, ShadowWorld>,
}

impl BlobShadowManagers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_world(&mut self, scene: Id) -> RenderResult<&mut ShadowWorld> {
        if self.worlds.contains_key(&scene) {
            return Err(RenderError::DuplicateScene(scene));
        }
        log::debug!("Created blob shadow world for scene {}", scene);
        Ok(self.worlds.entry(scene).or_insert_with(|| ShadowWorld::new(scene)))
    }

    /// Tear down a world and release its GPU buffers
    pub fn destroy_world(
        &mut self,
        scene: Id,
        resources: &mut dyn GpuResources,
    ) -> RenderResult<()> {
        let mut world = self.worlds.remove(&scene).ok_or(RenderError::SceneNotFound(scene))?;
        world.release(resources);
        log::debug!(
            "Destroyed blob shadow world for scene {} ({} casters)",
            scene,
            world.caster_count()
        );
        Ok(())
    }

    pub fn world(&self, scene: Id) -> Option<&ShadowWorld> {
        self.worlds.get(&scene)
    }

    pub fn world_mut(&mut self, scene: Id) -> Option<&mut ShadowWorld> {
        self.worlds.get_mut(&scene)
    }

    /// World rendered by `camera`
    pub fn world_for_camera(&mut self, camera: &Camera) -> Option<&mut ShadowWorld> {
        self.world_mut(camera.scene)
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}
