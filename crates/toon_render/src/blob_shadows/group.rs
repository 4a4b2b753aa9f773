//! Renderer Registry
//!
//! A [`BlobShadowGroup`] holds every caster of one shadow type in one scene
//! as dense parallel arrays: caster records, packed GPU elements and culling
//! records. Indices are always `0..len` with no holes; removal swap-removes
//! and reports the caster that moved.
//!
//! Static casters are computed once when added and afterwards only when
//! forced. Per-frame updates walk a list of dynamic indices and a queue of
//! forced ones, so scenes full of decorative shadows cost nothing per frame.

use std::sync::Arc;

use super::caster::{
    BlobShadowCaster, BlobShadowType, CasterHandle, CasterRecord, CasterTransform,
    GpuBlobShadowData,
};
use super::culling::CullRecord;
use super::streaming::GroupGpuBuffer;
use crate::backend::GpuResources;
use crate::command::CommandList;

/// First CPU capacity of a Group
pub const INITIAL_CAPACITY: usize = 32;

/// A caster whose dense index changed during a swap-remove
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovedRenderer {
    pub handle: CasterHandle,
    pub new_index: usize,
}

/// Dense registry of casters for one (scene, shadow type) pair
#[derive(Debug)]
pub struct BlobShadowGroup {
    shadow_type: BlobShadowType,
    records: Vec<CasterRecord>,
    packed: Vec<GpuBlobShadowData>,
    /// Shared with in-flight culling jobs; mutated copy-on-write
    culling: Arc<Vec<CullRecord>>,
    capacity: usize,
    /// Dense indices of non-static casters
    dynamic: Vec<usize>,
    /// Indices queued by forced recomputes; may hold stale entries
    forced: Vec<usize>,
    gpu: GroupGpuBuffer,
}

impl BlobShadowGroup {
    pub fn new(shadow_type: BlobShadowType) -> Self {
        Self {
            shadow_type,
            records: Vec::new(),
            packed: Vec::new(),
            culling: Arc::new(Vec::new()),
            capacity: 0,
            dynamic: Vec::new(),
            forced: Vec::new(),
            gpu: GroupGpuBuffer::new(format!("Blob Shadows ({:?})", shadow_type)),
        }
    }

    pub fn shadow_type(&self) -> BlobShadowType {
        self.shadow_type
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Dynamic casters visited by every update
    pub fn dynamic_len(&self) -> usize {
        self.dynamic.len()
    }

    /// Register a caster and return its dense index. The caster is computed
    /// immediately, static or not.
    pub fn add_renderer(
        &mut self,
        handle: CasterHandle,
        caster: BlobShadowCaster,
        transform: CasterTransform,
    ) -> usize {
        debug_assert_eq!(caster.shadow_type(), self.shadow_type);

        if self.records.len() == self.capacity {
            self.grow();
        }

        let mut record = CasterRecord::new(handle, caster, transform);
        let (data, cull) = record.compute();
        self.records.push(record);
        self.packed.push(data);
        Arc::make_mut(&mut self.culling).push(cull);

        let index = self.records.len() - 1;
        if !caster.is_static {
            self.list_dynamic(index);
        }
        self.gpu.mark_dirty(index);
        index
    }

    /// Swap-remove the caster at `index`. When another caster moved into
    /// the slot it is returned and will be recomputed on the next update.
    pub fn remove_renderer(&mut self, index: usize) -> Option<MovedRenderer> {
        debug_assert!(index < self.len(), "index {} out of range {}", index, self.len());

        self.unlist_dynamic(index);
        let last = self.records.len() - 1;
        self.records.swap_remove(index);
        self.packed.swap_remove(index);
        Arc::make_mut(&mut self.culling).swap_remove(index);

        if index == last {
            return None;
        }

        let moved = &mut self.records[index];
        if let Some(slot) = moved.dynamic_slot {
            self.dynamic[slot] = index;
        }
        moved.forced = true;
        self.forced.push(index);
        self.gpu.mark_dirty(index);
        Some(MovedRenderer {
            handle: moved.handle,
            new_index: index,
        })
    }

    /// Recompute every dynamic caster whose transform or parameters
    /// changed, and every forced one. Static casters are only visited when
    /// forced. Returns true when anything changed, in which case the whole
    /// buffer will be uploaded.
    pub fn update_renderer_data(&mut self) -> bool {
        if self.dynamic.is_empty() && self.forced.is_empty() {
            return false;
        }

        let mut changed = false;
        for slot in 0..self.dynamic.len() {
            let index = self.dynamic[slot];
            if self.records[index].needs_update() {
                self.recompute(index);
                changed = true;
            }
        }

        let mut forced = std::mem::take(&mut self.forced);
        for &index in &forced {
            // Stale entries point past the end or at a recomputed record
            if index < self.records.len() && self.records[index].needs_update() {
                self.recompute(index);
                changed = true;
            }
        }
        forced.clear();
        self.forced = forced;

        if changed {
            self.gpu.mark_all_dirty();
        }
        changed
    }

    /// Grow the GPU buffer if needed and upload dirty data. Returns bytes
    /// uploaded.
    pub fn push_data_to_gpu(
        &mut self,
        resources: &mut dyn GpuResources,
        commands: &mut CommandList,
    ) -> u64 {
        self.gpu.ensure_capacity(resources, self.capacity);
        self.gpu.push(commands, &self.packed)
    }

    /// Recompute every caster on the next update, statics included
    pub fn mark_all_dirty(&mut self) {
        for record in &mut self.records {
            record.forced = true;
        }
        self.forced.clear();
        self.forced.extend(0..self.records.len());
    }

    /// Recompute one caster on the next update, even if static
    pub fn force_recompute(&mut self, index: usize) {
        debug_assert!(index < self.len());
        let record = &mut self.records[index];
        if !record.forced {
            record.forced = true;
            self.forced.push(index);
        }
    }

    pub fn set_transform(&mut self, index: usize, transform: CasterTransform) {
        debug_assert!(index < self.len());
        let record = &mut self.records[index];
        record.transform = transform;
        record.transform_changed = true;
    }

    /// Replace the descriptor. The shadow type must not change; moving
    /// between types is handled by the world. Toggling `is_static` forces
    /// one recompute.
    pub fn set_caster(&mut self, index: usize, caster: BlobShadowCaster) {
        debug_assert!(index < self.len());
        debug_assert_eq!(caster.shadow_type(), self.shadow_type);
        let record = &mut self.records[index];
        let was_static = record.caster.is_static;
        record.caster = caster;
        record.params_dirty = true;

        if was_static != caster.is_static {
            if caster.is_static {
                self.unlist_dynamic(index);
            } else {
                self.list_dynamic(index);
            }
            self.force_recompute(index);
        }
    }

    pub fn record(&self, index: usize) -> &CasterRecord {
        &self.records[index]
    }

    pub fn records(&self) -> &[CasterRecord] {
        &self.records
    }

    pub fn packed(&self) -> &[GpuBlobShadowData] {
        &self.packed
    }

    pub fn cull_records(&self) -> &[CullRecord] {
        &self.culling
    }

    /// Shared read-only view of the culling records for jobs
    pub fn culling_snapshot(&self) -> Arc<Vec<CullRecord>> {
        Arc::clone(&self.culling)
    }

    pub fn gpu_buffer(&self) -> &GroupGpuBuffer {
        &self.gpu
    }

    pub fn release(&mut self, resources: &mut dyn GpuResources) {
        self.gpu.release(resources);
    }

    fn recompute(&mut self, index: usize) {
        let (data, cull) = self.records[index].compute();
        self.packed[index] = data;
        Arc::make_mut(&mut self.culling)[index] = cull;
    }

    fn list_dynamic(&mut self, index: usize) {
        let record = &mut self.records[index];
        if record.dynamic_slot.is_none() {
            record.dynamic_slot = Some(self.dynamic.len());
            self.dynamic.push(index);
        }
    }

    /// Drop `index` from the dynamic list, fixing up the entry swapped in
    fn unlist_dynamic(&mut self, index: usize) {
        let Some(slot) = self.records[index].dynamic_slot.take() else {
            return;
        };
        self.dynamic.swap_remove(slot);
        if let Some(&filled) = self.dynamic.get(slot) {
            self.records[filled].dynamic_slot = Some(slot);
        }
    }

    fn grow(&mut self) {
        let new_capacity = (self.capacity * 2).max(INITIAL_CAPACITY);
        let additional = new_capacity - self.records.len();
        self.records.reserve_exact(additional);
        self.packed.reserve_exact(additional);
        Arc::make_mut(&mut self.culling).reserve_exact(additional);
        log::debug!(
            "{:?} blob shadow group grew {} -> {}",
            self.shadow_type,
            self.capacity,
            new_capacity
        );
        self.capacity = new_capacity;
    }
}
