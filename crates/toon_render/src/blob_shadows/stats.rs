//! Blob shadow statistics

use serde::{Deserialize, Serialize};

use super::batching::BatchingStats;

/// Statistics of the blob shadow pass
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobShadowStats {
    // === Last frame ===
    /// Registered casters in the rendered world
    pub casters: u32,

    /// Casters that passed culling
    pub visible: u32,

    /// Batches built
    pub batches: u32,

    /// Draw calls issued
    pub draws: u32,

    /// Bytes uploaded to caster buffers
    pub uploaded_bytes: u64,

    // === Totals ===
    /// Frames rendered
    pub frames: u64,

    /// Frames skipped because the receiver plane was out of view
    pub degenerate_frames: u64,
}

impl BlobShadowStats {
    /// Reset per-frame counters, keep totals
    pub fn begin_frame(&mut self) {
        self.casters = 0;
        self.visible = 0;
        self.batches = 0;
        self.draws = 0;
        self.uploaded_bytes = 0;
        self.frames += 1;
    }

    pub fn record_batching(&mut self, batching: BatchingStats) {
        self.batches = batching.batches;
        self.visible = batching.visible;
        self.draws = batching.draws;
    }

    /// Fraction of casters that survived culling
    pub fn visible_ratio(&self) -> f32 {
        if self.casters == 0 {
            0.0
        } else {
            self.visible as f32 / self.casters as f32
        }
    }

    /// Average visible casters per draw
    pub fn casters_per_draw(&self) -> f32 {
        if self.draws == 0 {
            0.0
        } else {
            self.visible as f32 / self.draws as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_frame_keeps_totals() {
        let mut stats = BlobShadowStats {
            casters: 10,
            draws: 2,
            degenerate_frames: 3,
            frames: 5,
            ..Default::default()
        };
        stats.begin_frame();
        assert_eq!(stats.casters, 0);
        assert_eq!(stats.draws, 0);
        assert_eq!(stats.degenerate_frames, 3);
        assert_eq!(stats.frames, 6);
    }

    #[test]
    fn test_ratios() {
        let mut stats = BlobShadowStats {
            casters: 200,
            ..Default::default()
        };
        stats.record_batching(BatchingStats {
            batches: 2,
            visible: 50,
            draws: 2,
        });
        assert_eq!(stats.visible_ratio(), 0.25);
        assert_eq!(stats.casters_per_draw(), 25.0);
        assert_eq!(BlobShadowStats::default().casters_per_draw(), 0.0);
    }

    #[test]
    fn test_stats_serde() {
        let stats = BlobShadowStats {
            draws: 4,
            uploaded_bytes: 4096,
            ..Default::default()
        };
        let json = serde_json::to_string(&stats).unwrap();
        let back: BlobShadowStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
