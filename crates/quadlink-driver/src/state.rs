//! The single guarded driver context shared by all threads.

use std::sync::atomic::AtomicBool;
use std::sync::Mutex;

use quadlink_core::audio::StagingBuffer;
use quadlink_core::frame::{Slot, FRAMEBUFFER_SIZE_BYTES, PALETTE_SIZE_BYTES};
use quadlink_core::hid::{HidEvent, HidStatus};

use crate::signal::Signal;

/// Caller-supplied audio generator. Invoked with a 256-frame scratch buffer;
/// returns how many interleaved stereo frames it produced (0 = nothing now).
pub type AudioGenerator = Box<dyn FnMut(&mut [u32]) -> usize + Send>;

/// Caller-supplied HID event sink.
pub type HidEventSink = Box<dyn FnMut(HidEvent) + Send>;

/// One of the two statically-sized framebuffer/palette pairs.
///
/// Exactly two frames exist for the driver's lifetime; they circulate between
/// the drawing client and the driver by move, so at most one present request
/// can ever be outstanding and slot mix-ups are unrepresentable.
pub struct Frame {
    slot: Slot,
    pub palette: Box<[u8; PALETTE_SIZE_BYTES]>,
    pub pixels: Box<[u8; FRAMEBUFFER_SIZE_BYTES]>,
}

impl Frame {
    pub(crate) fn new(slot: Slot) -> Self {
        Self {
            slot,
            palette: Box::new([0; PALETTE_SIZE_BYTES]),
            pixels: Box::new([0; FRAMEBUFFER_SIZE_BYTES]),
        }
    }

    /// Which of the two slots this frame occupies.
    pub fn slot(&self) -> Slot {
        self.slot
    }
}

/// Everything touched by more than one thread, behind one mutex.
///
/// The lock is short-held: no bus transaction and no callback runs under it.
/// Threads copy out what they need, release, then do the slow work.
pub(crate) struct DriverState {
    /// Frame handed to the drawing client at startup; `None` once taken.
    pub client: Option<Frame>,
    /// Frame awaiting the next vblank edge.
    pub pending: Option<Frame>,
    /// Set while the poll loop is pushing the pending frame over the bus.
    pub presenting: bool,
    /// Frame most recently transferred to the hardware.
    pub displayed: Option<Frame>,

    pub staging: StagingBuffer,
    pub fifo_fill: u16,
    pub audio_generator: Option<AudioGenerator>,
    /// Bumped on every (un)registration so a worker holding the generator
    /// outside the lock can tell whether to hand it back.
    pub audio_generator_epoch: u64,

    pub hid_current: HidStatus,
    pub hid_previous: HidStatus,
    pub hid_sink: Option<HidEventSink>,
    pub hid_sink_epoch: u64,
}

impl DriverState {
    fn new() -> Self {
        Self {
            client: Some(Frame::new(Slot::A)),
            pending: None,
            presenting: false,
            displayed: Some(Frame::new(Slot::B)),
            staging: StagingBuffer::new(),
            fifo_fill: 0,
            audio_generator: None,
            audio_generator_epoch: 0,
            hid_current: HidStatus::default(),
            hid_previous: HidStatus::default(),
            hid_sink: None,
            hid_sink_epoch: 0,
        }
    }
}

/// Shared driver context: the guarded state plus the wake signals.
pub(crate) struct Shared {
    pub state: Mutex<DriverState>,
    /// Set once by the poll loop after the magic-number handshake succeeds;
    /// never cleared.
    pub connected: AtomicBool,
    pub tick_wake: Signal,
    pub audio_wake: Signal,
    pub hid_wake: Signal,
}

impl Shared {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DriverState::new()),
            connected: AtomicBool::new(false),
            tick_wake: Signal::new(),
            audio_wake: Signal::new(),
            hid_wake: Signal::new(),
        }
    }
}
