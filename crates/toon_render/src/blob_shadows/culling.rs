//! Spatial Culling
//!
//! Casters are culled in 2D against the receiver rectangle on the ground
//! plane. Jobs run on the [`JobPool`] over an `Arc` snapshot of a Group's
//! culling records, so the Group can never be observed mid-mutation: any
//! mutation while a snapshot is alive copies the records first.
//!
//! # Usage
//!
//! ```ignore
//! let job = CullingJob::schedule(&jobs, group.culling_snapshot(), receiver, pooled);
//! // ... cull the other Groups ...
//! let visible = job.complete();
//! ```

use std::sync::Arc;

use crossbeam_channel::Receiver;
use glam::Vec2;
use rayon::prelude::*;

use super::batching::BatchKey;
use super::group::BlobShadowGroup;
use crate::jobs::JobPool;

/// Axis-aligned rectangle on the ground plane (x, z)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds2D {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds2D {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec2, half_extent: Vec2) -> Self {
        Self::new(center - half_extent, center + half_extent)
    }

    /// Closed-interval overlap on both axes
    #[inline]
    pub fn overlaps(&self, other: &Bounds2D) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// Grow by `amount` on each side of each axis
    pub fn inflate(&self, amount: Vec2) -> Self {
        Self::new(self.min - amount, self.max + amount)
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// What culling needs to know about a caster
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CullRecord {
    pub bounds: Bounds2D,
    pub key: BatchKey,
}

/// Collect the dense indices whose bounds overlap `receiver`, ascending.
/// Runs data-parallel on the current rayon pool.
pub fn cull_into(records: &[CullRecord], receiver: Bounds2D, out: &mut Vec<u32>) {
    out.clear();
    out.par_extend(
        records
            .par_iter()
            .enumerate()
            .filter(|(_, record)| record.bounds.overlaps(&receiver))
            .map(|(index, _)| index as u32),
    );
}

/// Handle to a scheduled culling job
///
/// Must be joined with [`complete`](Self::complete) before its results are
/// read. Dropping it without joining discards the results; the job itself
/// still runs to completion.
#[derive(Debug)]
pub struct CullingJob {
    result: Receiver<Vec<u32>>,
}

impl CullingJob {
    /// Schedule culling of a whole Group snapshot on the pool. `out` is a
    /// pooled vector that comes back from `complete`.
    pub fn schedule(
        jobs: &JobPool,
        snapshot: Arc<Vec<CullRecord>>,
        receiver: Bounds2D,
        mut out: Vec<u32>,
    ) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        jobs.spawn(move || {
            cull_into(&snapshot, receiver, &mut out);
            // Release the snapshot before signaling so a joined job never
            // keeps the Group's records shared
            drop(snapshot);
            let _ = tx.send(out);
        });
        Self { result: rx }
    }

    /// Block until the job finishes and take its visible indices
    pub fn complete(self) -> Vec<u32> {
        match self.result.recv() {
            Ok(visible) => visible,
            Err(_) => {
                log::error!("Culling job terminated without a result");
                Vec::new()
            }
        }
    }
}

/// Cull a whole Group in parallel and wait for the result
pub fn cull_group(jobs: &JobPool, group: &BlobShadowGroup, receiver: Bounds2D) -> Vec<u32> {
    let mut visible = Vec::new();
    jobs.install(|| cull_into(group.cull_records(), receiver, &mut visible));
    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::TextureHandle;

    fn record(x: f32, z: f32, half: f32, key: BatchKey) -> CullRecord {
        CullRecord {
            bounds: Bounds2D::from_center(Vec2::new(x, z), Vec2::splat(half)),
            key,
        }
    }

    #[test]
    fn test_overlap_is_closed_interval() {
        let a = Bounds2D::new(Vec2::ZERO, Vec2::ONE);
        let touching = Bounds2D::new(Vec2::new(1.0, 0.5), Vec2::new(2.0, 2.0));
        let apart = Bounds2D::new(Vec2::new(1.001, 0.0), Vec2::new(2.0, 1.0));
        let above = Bounds2D::new(Vec2::new(0.0, 1.5), Vec2::new(1.0, 2.0));
        assert!(a.overlaps(&touching));
        assert!(touching.overlaps(&a));
        assert!(!a.overlaps(&apart));
        assert!(!a.overlaps(&above));
    }

    #[test]
    fn test_cull_into_keeps_dense_order() {
        let jobs = JobPool::with_threads(2).unwrap();
        let baked = BatchKey::new(Some(TextureHandle::new(1, 0)));
        let records = vec![
            record(100.0, 0.0, 1.0, BatchKey::default()),
            record(0.0, 0.0, 1.0, BatchKey::default()),
            record(0.0, 0.0, 1.0, baked),
            record(2.0, 2.0, 1.0, BatchKey::default()),
            record(-6.0, 0.0, 1.0, BatchKey::default()),
            record(-6.5, 0.0, 1.0, BatchKey::default()),
        ];
        let receiver = Bounds2D::new(Vec2::splat(-5.0), Vec2::splat(5.0));

        let mut out = vec![99];
        jobs.install(|| cull_into(&records, receiver, &mut out));
        // Keys do not filter, touching bounds count
        assert_eq!(out, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_culling_job_matches_sequential() {
        let jobs = JobPool::with_threads(2).unwrap();
        let records: Vec<_> = (0..3000)
            .map(|i| record(i as f32 * 0.1 - 150.0, 0.0, 0.5, BatchKey::default()))
            .collect();
        let receiver = Bounds2D::new(Vec2::new(-20.0, -1.0), Vec2::new(20.0, 1.0));

        let expected: Vec<u32> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.bounds.overlaps(&receiver))
            .map(|(i, _)| i as u32)
            .collect();

        let snapshot = Arc::new(records);
        let job = CullingJob::schedule(&jobs, Arc::clone(&snapshot), receiver, Vec::new());
        let visible = job.complete();
        assert_eq!(visible, expected);
        assert_eq!(Arc::strong_count(&snapshot), 1);
    }
}
