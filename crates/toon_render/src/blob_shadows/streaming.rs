//! GPU Streaming Layer
//!
//! Each Group owns one persistent constant buffer holding its packed caster
//! data. The buffer is sized in whole 128-element windows so every batch can
//! bind the windows spanning its members by byte offset without further
//! alignment work. Uploads
//! follow the Group's dirty tracking: the whole live range after bulk
//! changes, otherwise only the merged range of touched slots.

use super::caster::GpuBlobShadowData;
use super::MAX_BATCH_SIZE;
use crate::backend::GpuResources;
use crate::command::CommandList;
use crate::resource::{BufferDesc, BufferHandle};

/// Bytes in one batch window
pub const WINDOW_BYTES: u64 = (MAX_BATCH_SIZE * GpuBlobShadowData::SIZE) as u64;

/// Round a caster capacity up to whole batch windows
#[inline]
pub fn aligned_capacity(capacity: usize) -> usize {
    (capacity + MAX_BATCH_SIZE - 1) / MAX_BATCH_SIZE * MAX_BATCH_SIZE
}

/// Slots that differ between CPU and GPU
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DirtyRange {
    #[default]
    Clean,
    /// Half-open slot range
    Range { start: usize, end: usize },
    All,
}

impl DirtyRange {
    /// Merge one slot into the range
    pub fn mark(&mut self, index: usize) {
        *self = match *self {
            Self::Clean => Self::Range {
                start: index,
                end: index + 1,
            },
            Self::Range { start, end } => Self::Range {
                start: start.min(index),
                end: end.max(index + 1),
            },
            Self::All => Self::All,
        };
    }

    pub fn mark_all(&mut self) {
        *self = Self::All;
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }

    /// Take the current range, leaving `Clean`
    pub fn take(&mut self) -> Self {
        core::mem::take(self)
    }
}

/// Byte range bound for one batch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferWindow {
    pub offset: u64,
    pub size: u64,
}

/// Persistent constant buffer of one Group
#[derive(Debug)]
pub struct GroupGpuBuffer {
    label: String,
    buffer: Option<BufferHandle>,
    /// Capacity in elements, always a multiple of `MAX_BATCH_SIZE`
    capacity: usize,
    dirty: DirtyRange,
    /// Constant buffer offset alignment of the host
    offset_alignment: u64,
}

impl GroupGpuBuffer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            buffer: None,
            capacity: 0,
            dirty: DirtyRange::Clean,
            offset_alignment: 1,
        }
    }

    pub fn handle(&self) -> Option<BufferHandle> {
        self.buffer
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dirty(&self) -> DirtyRange {
        self.dirty
    }

    pub fn mark_dirty(&mut self, index: usize) {
        self.dirty.mark(index);
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty.mark_all();
    }

    /// Make room for `cpu_capacity` elements, re-creating the buffer when it
    /// is too small. Returns true when a new buffer was created.
    pub fn ensure_capacity(
        &mut self,
        resources: &mut dyn GpuResources,
        cpu_capacity: usize,
    ) -> bool {
        let required = aligned_capacity(cpu_capacity);
        if required == 0 || (self.buffer.is_some() && self.capacity >= required) {
            return false;
        }

        self.offset_alignment = resources.constant_buffer_offset_alignment().max(1);
        if WINDOW_BYTES % self.offset_alignment != 0 {
            log::warn!(
                "{}: {} byte windows do not meet the host's {} byte offset alignment",
                self.label,
                WINDOW_BYTES,
                self.offset_alignment
            );
        }

        if let Some(old) = self.buffer.take() {
            resources.release_buffer(old);
        }

        let size = (required * GpuBlobShadowData::SIZE) as u64;
        self.buffer = Some(resources.create_buffer(&BufferDesc::constant(&self.label, size)));
        log::debug!(
            "{}: constant buffer re-created for {} elements ({} -> {} bytes)",
            self.label,
            required,
            self.capacity * GpuBlobShadowData::SIZE,
            size
        );
        self.capacity = required;
        self.dirty.mark_all();
        true
    }

    /// Upload whatever is dirty. Returns the number of bytes written.
    pub fn push(&mut self, commands: &mut CommandList, packed: &[GpuBlobShadowData]) -> u64 {
        let Some(buffer) = self.buffer else {
            if !self.dirty.is_clean() && !packed.is_empty() {
                log::warn!("{}: upload skipped, no buffer allocated", self.label);
            }
            return 0;
        };

        let (start, end) = match self.dirty.take() {
            DirtyRange::Clean => return 0,
            DirtyRange::All => (0, packed.len()),
            DirtyRange::Range { start, end } => (start, end.min(packed.len())),
        };
        if start >= end {
            return 0;
        }
        debug_assert!(end <= self.capacity);

        let bytes: &[u8] = bytemuck::cast_slice(&packed[start..end]);
        commands.write_buffer(buffer, (start * GpuBlobShadowData::SIZE) as u64, bytes);
        log::trace!("{}: uploaded slots {}..{}", self.label, start, end);
        bytes.len() as u64
    }

    /// Byte range covering the windows from `base_index` up to the window
    /// holding `end_index - 1`
    pub fn window(&self, base_index: usize, end_index: usize) -> Option<BufferWindow> {
        debug_assert!(base_index % MAX_BATCH_SIZE == 0);
        debug_assert!(base_index < end_index);
        if self.buffer.is_none() || end_index > self.capacity {
            return None;
        }

        let offset = (base_index * GpuBlobShadowData::SIZE) as u64;
        debug_assert!(
            offset % self.offset_alignment == 0,
            "window offset {} breaks {} byte alignment",
            offset,
            self.offset_alignment
        );
        let end = aligned_capacity(end_index);
        Some(BufferWindow {
            offset,
            size: ((end - base_index) * GpuBlobShadowData::SIZE) as u64,
        })
    }

    pub fn release(&mut self, resources: &mut dyn GpuResources) {
        if let Some(buffer) = self.buffer.take() {
            resources.release_buffer(buffer);
        }
        self.capacity = 0;
        self.dirty = DirtyRange::Clean;
    }
}
