//! Frame geometry constants and presentation types.

/// Frame width in pixels.
pub const FRAME_WIDTH: usize = 320;
/// Frame height in pixels.
pub const FRAME_HEIGHT: usize = 240;
/// One byte per 8-bit palette-indexed pixel.
pub const FRAMEBUFFER_SIZE_BYTES: usize = FRAME_WIDTH * FRAME_HEIGHT;
/// 256 RGB entries, 3 bytes each.
pub const PALETTE_SIZE_BYTES: usize = 256 * 3;

/// Identity tag of one of the two frame slots.
///
/// Slot roles (client-owned vs. in flight to hardware) swap at vblank edges;
/// the tag travels with the buffers so ownership can be tracked without
/// comparing pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// The slot playing the opposite role.
    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

/// Policy applied when a present request finds an earlier one outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VsyncMode {
    /// Drop any unconsumed pending request and install this one.
    OverwritePrevious,
    /// Block (spin-yield) until the previous request has been consumed.
    WaitIfPending,
}
