//! Batching Engine
//!
//! Turns a frame's culling results into draw-ready batches. Every
//! participating Group is culled by one job; once joined, its visible dense
//! indices are packed per GPU resource key into batches of at most
//! [`MAX_BATCH_SIZE`] members. A batch binds the Group buffer from the
//! window holding its first member up to the window holding its last, and
//! uploads its members as indices relative to that base.
//!
//! Batches and their index vectors live across frames and are reset in
//! place by [`BlobShadowBatching::clear`].
//!
//! # Usage
//!
//! ```ignore
//! batching.batch(&world, &jobs, receiver);
//! let draws = batching.draw(&world, &pipelines, settings.mode, &mut commands);
//! batching.clear();
//! ```

use super::caster::BlobShadowType;
use super::culling::{Bounds2D, CullingJob};
use super::manager::ShadowWorld;
use super::pass::BlobShadowPipelines;
use super::{
    BlobShadowsMode, BLOB_SHADOW_BAKED_TEXTURE, BLOB_SHADOW_DATA, BLOB_SHADOW_INDICES,
    MAX_BATCH_SIZE,
};
use crate::command::CommandList;
use crate::jobs::JobPool;
use crate::resource::TextureHandle;

/// GPU resources a batch binds besides the Group buffer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub texture: Option<TextureHandle>,
}

impl BatchKey {
    pub fn new(texture: Option<TextureHandle>) -> Self {
        Self { texture }
    }
}

/// Up to `MAX_BATCH_SIZE` visible casters of one shadow type sharing a key
#[derive(Debug, Default)]
pub struct BlobShadowBatch {
    pub key: BatchKey,
    /// First dense index of the bound range, a multiple of `MAX_BATCH_SIZE`
    pub base_index: usize,
    /// One past the highest member's dense index
    pub end_index: usize,
    /// Members relative to `base_index`
    indices: Vec<u32>,
}

impl BlobShadowBatch {
    fn reset(&mut self, key: BatchKey, base_index: usize) {
        self.key = key;
        self.base_index = base_index;
        self.end_index = base_index;
        self.indices.clear();
    }

    fn push(&mut self, index: usize) {
        debug_assert!(index >= self.base_index);
        debug_assert!(!self.is_full());
        self.indices.push((index - self.base_index) as u32);
        self.end_index = self.end_index.max(index + 1);
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.indices.len() >= MAX_BATCH_SIZE
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

/// Every batch of one shadow type in the current frame
#[derive(Debug, Default)]
pub struct BatchSet {
    batches: Vec<BlobShadowBatch>,
    len: usize,
}

impl BatchSet {
    const INITIAL_BATCHES: usize = 4;

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated batch slots, including ones unused this frame
    pub fn allocated(&self) -> usize {
        self.batches.len()
    }

    pub fn active(&self) -> &[BlobShadowBatch] {
        &self.batches[..self.len]
    }

    /// Linear scan for a batch with room and a matching key
    fn find(&self, key: BatchKey) -> Option<usize> {
        (0..self.len).find(|&slot| {
            let batch = &self.batches[slot];
            batch.key == key && !batch.is_full()
        })
    }

    fn allocate(&mut self, key: BatchKey, base_index: usize) -> usize {
        if self.len == self.batches.len() {
            let new_len = (self.batches.len() * 2).max(Self::INITIAL_BATCHES);
            self.batches.resize_with(new_len, BlobShadowBatch::default);
            log::debug!("Blob shadow batch set grew to {} batches", new_len);
        }
        let slot = self.len;
        self.batches[slot].reset(key, base_index);
        self.len += 1;
        slot
    }

    fn clear(&mut self) {
        for batch in &mut self.batches[..self.len] {
            batch.indices.clear();
        }
        self.len = 0;
    }
}

/// Frame statistics of the last `batch`/`draw` pair
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchingStats {
    pub batches: u32,
    pub visible: u32,
    pub draws: u32,
}

/// Batches casters per shadow type and issues their draws
#[derive(Debug, Default)]
pub struct BlobShadowBatching {
    sets: [BatchSet; BlobShadowType::COUNT],
    /// Pooled visible-index lists, one per Group
    visible: [Vec<u32>; BlobShadowType::COUNT],
    /// Shared per-draw index upload
    scratch: Vec<f32>,
    stats: BatchingStats,
}

impl BlobShadowBatching {
    pub fn new() -> Self {
        Self {
            scratch: Vec::with_capacity(MAX_BATCH_SIZE),
            ..Default::default()
        }
    }

    pub fn batch_set(&self, shadow_type: BlobShadowType) -> &BatchSet {
        &self.sets[shadow_type.index()]
    }

    pub fn stats(&self) -> BatchingStats {
        self.stats
    }

    /// Cull every participating Group against `receiver` and pack the
    /// survivors into batches
    pub fn batch(&mut self, world: &ShadowWorld, jobs: &JobPool, receiver: Bounds2D) {
        let mut pending: [Option<CullingJob>; BlobShadowType::COUNT] = Default::default();
        for group in world.participating_groups() {
            let slot = group.shadow_type().index();
            let out = std::mem::take(&mut self.visible[slot]);
            pending[slot] = Some(CullingJob::schedule(
                jobs,
                group.culling_snapshot(),
                receiver,
                out,
            ));
        }

        let mut visible_total = 0;
        for group in world.participating_groups() {
            let slot = group.shadow_type().index();
            let Some(job) = pending[slot].take() else {
                continue;
            };
            let visible = job.complete();
            let records = group.cull_records();
            let set = &mut self.sets[slot];
            let first = set.len;

            // Ascending indices keep every member at or above its batch base
            for &index in &visible {
                let index = index as usize;
                let key = records[index].key;
                let batch = match set.find(key) {
                    Some(batch) => batch,
                    None => set.allocate(key, index / MAX_BATCH_SIZE * MAX_BATCH_SIZE),
                };
                set.batches[batch].push(index);
            }

            log::trace!(
                "{:?}: {} of {} casters visible in {} batches",
                group.shadow_type(),
                visible.len(),
                group.len(),
                set.len - first
            );
            visible_total += visible.len() as u32;
            self.visible[slot] = visible;
        }

        self.stats = BatchingStats {
            batches: self.sets.iter().map(|set| set.len as u32).sum(),
            visible: visible_total,
            draws: 0,
        };
    }

    /// Draw every batch built by the last `batch`. Returns the number of
    /// draws issued.
    pub fn draw(
        &mut self,
        world: &ShadowWorld,
        pipelines: &BlobShadowPipelines,
        mode: BlobShadowsMode,
        commands: &mut CommandList,
    ) -> u32 {
        let pipeline = pipelines.for_mode(mode);
        let mut draws = 0;

        for shadow_type in BlobShadowType::ALL {
            let gpu = world.group(shadow_type).gpu_buffer();

            for batch in self.sets[shadow_type.index()].active() {
                if batch.is_empty() {
                    continue;
                }
                let window = gpu.window(batch.base_index, batch.end_index);
                let (Some(buffer), Some(window)) = (gpu.handle(), window) else {
                    log::warn!(
                        "{:?}: batch at {} has no uploaded buffer",
                        shadow_type,
                        batch.base_index
                    );
                    continue;
                };

                commands.bind_constant_buffer(BLOB_SHADOW_DATA, buffer, window.offset, window.size);

                self.scratch.clear();
                self.scratch.extend(batch.indices.iter().map(|&local| local as f32));
                commands.set_float_array(BLOB_SHADOW_INDICES, &self.scratch);

                if let Some(texture) = batch.key.texture {
                    commands.set_global_texture(BLOB_SHADOW_BAKED_TEXTURE, texture);
                }

                let vertex_count = 4 * batch.len() as u32;
                commands.draw_procedural(pipeline, shadow_type.index() as u32, vertex_count);
                draws += 1;
            }
        }

        self.stats.draws = draws;
        draws
    }

    /// Reset every batch set for the next frame, keeping allocations
    pub fn clear(&mut self) {
        for set in &mut self.sets {
            set.clear();
        }
        for visible in &mut self.visible {
            visible.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessResources;
    use crate::blob_shadows::{BlobShadowCaster, CasterTransform};
    use crate::command::RenderCommand;
    use glam::{Vec2, Vec3};
    use toon_core::Id;

    fn pipelines() -> (HeadlessResources, BlobShadowPipelines) {
        let resources = HeadlessResources::with_pipelines(&["Default", "Metaballs"]);
        let pipelines = BlobShadowPipelines::resolve(&resources).unwrap();
        (resources, pipelines)
    }

    fn everything() -> Bounds2D {
        Bounds2D::new(Vec2::splat(-1000.0), Vec2::splat(1000.0))
    }

    fn populate(world: &mut ShadowWorld, n: usize, caster: BlobShadowCaster, spacing: f32) {
        for i in 0..n {
            let position = Vec3::new(i as f32 * spacing, 0.0, 0.0);
            world.on_renderer_enabled(caster, CasterTransform::from_position(position));
        }
    }

    fn float_arrays(commands: &CommandList) -> Vec<Vec<f32>> {
        commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::SetFloatArray { values, .. } => Some(values.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_one_batch_for_one_window() {
        let jobs = JobPool::with_threads(2).unwrap();
        let (mut resources, pipelines) = pipelines();
        let mut commands = CommandList::new();
        let mut world = ShadowWorld::new(Id::from_name("scene"));
        populate(&mut world, 100, BlobShadowCaster::circle(0.5), 1.0);
        world.update(&mut resources, &mut commands);

        let mut batching = BlobShadowBatching::new();
        batching.batch(&world, &jobs, everything());
        assert_eq!(batching.batch_set(BlobShadowType::Circle).len(), 1);
        assert_eq!(batching.batch_set(BlobShadowType::Circle).active()[0].len(), 100);

        let draws = batching.draw(&world, &pipelines, BlobShadowsMode::Default, &mut commands);
        assert_eq!(draws, 1);
        assert!(commands.iter().any(|c| matches!(
            c,
            RenderCommand::DrawProcedural { vertex_count: 400, pass: 0, .. }
        )));
        batching.clear();
        assert!(batching.batch_set(BlobShadowType::Circle).is_empty());
    }

    #[test]
    fn test_batches_never_exceed_capacity() {
        let jobs = JobPool::with_threads(2).unwrap();
        let (mut resources, pipelines) = pipelines();
        let mut commands = CommandList::new();
        let mut world = ShadowWorld::new(Id::from_name("scene"));
        let square = BlobShadowCaster::square(0.5, 1.0, 1.0, 0.0, 0.0);
        populate(&mut world, 300, square, 1.0);
        world.update(&mut resources, &mut commands);

        let mut batching = BlobShadowBatching::new();
        batching.batch(&world, &jobs, everything());
        let set = batching.batch_set(BlobShadowType::Square);
        assert_eq!(set.len(), 3);
        assert!(set.active().iter().all(|b| b.len() <= MAX_BATCH_SIZE));
        assert_eq!(set.active().iter().map(|b| b.len()).sum::<usize>(), 300);
        assert_eq!(
            set.active().iter().map(|b| b.base_index).collect::<Vec<_>>(),
            vec![0, 128, 256]
        );

        let draws = batching.draw(&world, &pipelines, BlobShadowsMode::Metaballs, &mut commands);
        assert_eq!(draws, 3);
        let metaballs = pipelines.for_mode(BlobShadowsMode::Metaballs);
        for command in commands.iter() {
            if let RenderCommand::DrawProcedural { pipeline, pass, .. } = command {
                assert_eq!(*pipeline, metaballs);
                assert_eq!(*pass, BlobShadowType::Square.index() as u32);
            }
        }
        batching.clear();
    }

    #[test]
    fn test_sparse_visible_casters_share_one_batch() {
        let jobs = JobPool::with_threads(2).unwrap();
        let (mut resources, pipelines) = pipelines();
        let mut commands = CommandList::new();
        let mut world = ShadowWorld::new(Id::from_name("scene"));
        // Only dense indices 0 and 128 fall in the receiver
        for i in 0..129 {
            let x = match i {
                0 => 0.0,
                128 => 2.0,
                _ => 10.0 * i as f32,
            };
            world.on_renderer_enabled(
                BlobShadowCaster::circle(0.5),
                CasterTransform::from_position(Vec3::new(x, 0.0, 0.0)),
            );
        }
        world.update(&mut resources, &mut commands);

        let receiver = Bounds2D::new(Vec2::splat(-5.0), Vec2::splat(5.0));
        let mut batching = BlobShadowBatching::new();
        batching.batch(&world, &jobs, receiver);
        assert_eq!(batching.stats().visible, 2);
        assert_eq!(batching.stats().batches, 1);

        let batch = &batching.batch_set(BlobShadowType::Circle).active()[0];
        assert_eq!((batch.base_index, batch.end_index), (0, 129));
        assert_eq!(batch.indices(), &[0, 128]);

        commands.clear();
        assert_eq!(batching.draw(&world, &pipelines, BlobShadowsMode::Default, &mut commands), 1);
        assert!(commands.iter().any(|c| matches!(
            c,
            RenderCommand::BindConstantBuffer { offset: 0, size: 8192, .. }
        )));
        assert_eq!(float_arrays(&commands), vec![vec![0.0, 128.0]]);
        batching.clear();
    }

    #[test]
    fn test_baked_textures_split_batches() {
        let jobs = JobPool::with_threads(1).unwrap();
        let (mut resources, pipelines) = pipelines();
        let mut commands = CommandList::new();
        let mut world = ShadowWorld::new(Id::from_name("scene"));
        let a = TextureHandle::new(1, 0);
        let b = TextureHandle::new(2, 0);
        for i in 0..10 {
            let texture = if i % 2 == 0 { a } else { b };
            world.on_renderer_enabled(
                BlobShadowCaster::baked(0.5, texture, 0, 0.0),
                CasterTransform::from_position(Vec3::new(i as f32, 0.0, 0.0)),
            );
        }
        world.update(&mut resources, &mut commands);

        let mut batching = BlobShadowBatching::new();
        batching.batch(&world, &jobs, everything());
        let set = batching.batch_set(BlobShadowType::Baked);
        assert_eq!(set.len(), 2);
        assert_eq!(set.active()[0].key.texture, Some(a));
        assert_eq!(set.active()[1].key.texture, Some(b));

        commands.clear();
        assert_eq!(batching.draw(&world, &pipelines, BlobShadowsMode::Default, &mut commands), 2);
        let bound: Vec<_> = commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::SetGlobalTexture { texture, .. } => Some(*texture),
                _ => None,
            })
            .collect();
        assert_eq!(bound, vec![a, b]);
        let indices = float_arrays(&commands);
        assert_eq!(indices[0], vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert_eq!(indices[1], vec![1.0, 3.0, 5.0, 7.0, 9.0]);
        batching.clear();
    }

    #[test]
    fn test_nothing_visible_builds_no_batches() {
        let jobs = JobPool::with_threads(1).unwrap();
        let (mut resources, pipelines) = pipelines();
        let mut commands = CommandList::new();
        let mut world = ShadowWorld::new(Id::from_name("scene"));
        populate(&mut world, 10, BlobShadowCaster::circle(0.5), 1.0);
        world.update(&mut resources, &mut commands);

        let far_away = Bounds2D::new(Vec2::splat(500.0), Vec2::splat(600.0));
        let mut batching = BlobShadowBatching::new();
        batching.batch(&world, &jobs, far_away);
        assert_eq!(batching.stats().batches, 0);
        assert_eq!(batching.draw(&world, &pipelines, BlobShadowsMode::Default, &mut commands), 0);
        batching.clear();
        assert_eq!(batching.batch_set(BlobShadowType::Circle).allocated(), 0);
        assert_eq!(commands.draw_count(), 0);
    }

    #[test]
    fn test_batches_are_reused_across_frames() {
        let jobs = JobPool::with_threads(1).unwrap();
        let (mut resources, pipelines) = pipelines();
        let mut commands = CommandList::new();
        let mut world = ShadowWorld::new(Id::from_name("scene"));
        populate(&mut world, 5, BlobShadowCaster::circle(0.5), 1.0);
        world.update(&mut resources, &mut commands);

        let mut batching = BlobShadowBatching::new();
        for _ in 0..3 {
            batching.batch(&world, &jobs, everything());
            let draws = batching.draw(&world, &pipelines, BlobShadowsMode::Default, &mut commands);
            assert_eq!(draws, 1);
            batching.clear();
            assert!(batching.batch_set(BlobShadowType::Circle).is_empty());
        }
        assert_eq!(batching.batch_set(BlobShadowType::Circle).allocated(), 4);
        assert_eq!(commands.draw_count(), 3);
    }
}
