//! Threaded driver runtime for the FPGA display/audio/HID subsystem.
//!
//! Owns the quad-wire bus and multiplexes three real-time flows across it:
//! vblank-synchronized framebuffer/palette presentation, a continuous audio
//! sample stream bounded by the hardware FIFO, and inbound HID status. Client
//! code never touches the bus; it draws into a [`Frame`], exchanges it
//! through [`Driver::present_frame`], and registers callbacks for audio
//! demand and HID events.
//!
//! Thread layout: a timer thread raises a one-shot tick wake; the poll thread
//! services one bus tick per wake; the audio producer and HID synthesizer
//! threads each sleep on their own wake signal. All threads share one
//! short-held mutex and run for the process lifetime.

mod audio_producer;
mod hid_synth;
mod orchestrator;
mod signal;
mod state;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use quadlink_hal::QspiBus;

use orchestrator::Orchestrator;
use state::Shared;

pub use quadlink_core::audio::{MAX_WRITE_SAMPLES, SAMPLE_RATE_HZ};
pub use quadlink_core::frame::{
    Slot, VsyncMode, FRAMEBUFFER_SIZE_BYTES, FRAME_HEIGHT, FRAME_WIDTH, PALETTE_SIZE_BYTES,
};
pub use quadlink_core::hid::{HidEvent, HidStatus};
pub use state::Frame;

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Period of the poll timer. One tick services link checking, frame
    /// presentation, audio FIFO upkeep, and (every other tick) HID polling.
    pub tick_period: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { tick_period: Duration::from_micros(500) }
    }
}

/// Handle to the running driver. Clone-free; share via `Arc` if needed.
pub struct Driver {
    shared: Arc<Shared>,
}

impl Driver {
    /// Take ownership of the bus and spawn the driver threads.
    pub fn start<B>(bus: B, config: DriverConfig) -> std::io::Result<Driver>
    where
        B: QspiBus + Send + 'static,
    {
        let shared = Arc::new(Shared::new());

        let orchestrator = Orchestrator::new(bus, shared.clone());
        thread::Builder::new()
            .name("quadlink-poll".into())
            .spawn(move || orchestrator.run())?;

        let s = shared.clone();
        thread::Builder::new()
            .name("quadlink-audio".into())
            .spawn(move || audio_producer::run(s))?;

        let s = shared.clone();
        thread::Builder::new()
            .name("quadlink-hid".into())
            .spawn(move || hid_synth::run(s))?;

        let s = shared.clone();
        let period = config.tick_period;
        thread::Builder::new()
            .name("quadlink-timer".into())
            .spawn(move || loop {
                thread::sleep(period);
                s.tick_wake.raise();
            })?;

        log::info!("driver started, tick period {:?}", period);
        Ok(Driver { shared })
    }

    /// Whether the magic-number handshake has succeeded.
    ///
    /// The flag is set once and never cleared: a peripheral reset mid-session
    /// goes undetected at this layer (known limitation of the protocol, which
    /// has no liveness probe beyond the initial handshake).
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// Hand out the drawable frame. Returns `None` after the first call; from
    /// then on frames circulate exclusively through [`Self::present_frame`].
    pub fn take_frame(&self) -> Option<Frame> {
        self.shared.state.lock().unwrap().client.take()
    }

    /// Queue `frame` for presentation at the next vblank edge and return the
    /// other slot for the caller to draw into.
    ///
    /// [`VsyncMode::OverwritePrevious`] replaces any unconsumed pending frame
    /// immediately; [`VsyncMode::WaitIfPending`] waits until the previous
    /// request has been consumed. Either way the call can block (spin-yield)
    /// for up to one frame interval while a presentation is in flight, so
    /// keep it off time-critical paths.
    pub fn present_frame(&self, frame: Frame, mode: VsyncMode) -> Frame {
        loop {
            {
                let mut st = self.shared.state.lock().unwrap();
                match mode {
                    VsyncMode::OverwritePrevious => {
                        if !st.presenting {
                            if let Some(freed) = st.pending.take().or_else(|| st.displayed.take())
                            {
                                st.pending = Some(frame);
                                return freed;
                            }
                        }
                    }
                    VsyncMode::WaitIfPending => {
                        if !st.presenting && st.pending.is_none() {
                            if let Some(freed) = st.displayed.take() {
                                st.pending = Some(frame);
                                return freed;
                            }
                        }
                    }
                }
            }
            thread::yield_now();
        }
    }

    /// Register the audio generator. It is invoked on the producer thread
    /// (never under the driver lock) with a 256-frame buffer whenever the
    /// hardware FIFO drops below the refill watermark, and returns how many
    /// frames it filled in. Replaces any previous generator.
    pub fn register_audio_callback<F>(&self, generator: F)
    where
        F: FnMut(&mut [u32]) -> usize + Send + 'static,
    {
        let mut st = self.shared.state.lock().unwrap();
        st.audio_generator = Some(Box::new(generator));
        st.audio_generator_epoch += 1;
    }

    /// Drop the registered audio generator. At most one in-flight batch may
    /// still be produced by a generator that was already running.
    pub fn unregister_audio_callback(&self) {
        let mut st = self.shared.state.lock().unwrap();
        st.audio_generator = None;
        st.audio_generator_epoch += 1;
    }

    /// Register the HID event sink, invoked on the synthesizer thread (never
    /// under the driver lock). Replaces any previous sink.
    pub fn register_hid_callback<F>(&self, sink: F)
    where
        F: FnMut(HidEvent) + Send + 'static,
    {
        let mut st = self.shared.state.lock().unwrap();
        st.hid_sink = Some(Box::new(sink));
        st.hid_sink_epoch += 1;
    }

    /// Drop the registered HID event sink.
    pub fn unregister_hid_callback(&self) {
        let mut st = self.shared.state.lock().unwrap();
        st.hid_sink = None;
        st.hid_sink_epoch += 1;
    }

    /// A copy of the most recent HID status snapshot, for clients that poll
    /// absolute state instead of subscribing to events.
    pub fn hid_status(&self) -> HidStatus {
        self.shared.state.lock().unwrap().hid_current
    }
}
