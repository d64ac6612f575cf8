//! Display surface collaborator.

use super::buffers::{BufferSlot, ColorBuffer};

/// Something that shows the front buffer.
///
/// Surfaces only ever receive shared references: they can read a buffer
/// but never write it. A binding names a slot, so rebinding after a swap
/// reassigns the reference rather than copying pixels.
pub trait DisplaySurface {
    /// Binds the surface to the buffer in `slot`.
    fn bind(&mut self, slot: BufferSlot, buffer: &ColorBuffer);

    /// Requests a redraw of `slot` after its contents were rewritten.
    fn invalidate(&mut self, slot: BufferSlot, buffer: &ColorBuffer);
}

/// A surface with no output that records what it was asked to do.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    bound: Option<BufferSlot>,
    binds: u64,
    invalidations: u64,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot the surface is currently bound to.
    pub fn bound_slot(&self) -> Option<BufferSlot> {
        self.bound
    }

    pub fn bind_count(&self) -> u64 {
        self.binds
    }

    pub fn invalidation_count(&self) -> u64 {
        self.invalidations
    }
}

impl DisplaySurface for HeadlessSurface {
    fn bind(&mut self, slot: BufferSlot, buffer: &ColorBuffer) {
        self.bound = Some(slot);
        self.binds += 1;
        tracing::trace!(?slot, width = buffer.width(), height = buffer.height(), "Surface bound");
    }

    fn invalidate(&mut self, slot: BufferSlot, _buffer: &ColorBuffer) {
        self.invalidations += 1;
        tracing::trace!(?slot, "Surface invalidated");
    }
}
