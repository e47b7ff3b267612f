//! Demand-driven audio sample producer.
//!
//! Woken by the poll loop when the hardware FIFO has room for another batch.
//! Pulls samples from the registered generator and stages them for the next
//! tick's bus write; the generator runs with no lock held.

use std::sync::Arc;

use quadlink_core::audio::MAX_WRITE_SAMPLES;

use crate::state::Shared;

pub(crate) fn run(shared: Arc<Shared>) {
    loop {
        shared.audio_wake.wait();
        produce(&shared);
    }
}

/// Generate and stage one batch, if the staging slot is free and a generator
/// is registered.
pub(crate) fn produce(shared: &Shared) {
    let (mut generator, epoch) = {
        let mut st = shared.state.lock().unwrap();
        if !st.staging.is_empty() {
            // Previous batch not yet drained; the next watermark wake will
            // land after it is.
            return;
        }
        match st.audio_generator.take() {
            Some(generator) => (generator, st.audio_generator_epoch),
            None => return,
        }
    };

    let mut buffer = [0u32; MAX_WRITE_SAMPLES];
    let count = generator(&mut buffer);

    let mut st = shared.state.lock().unwrap();

    // Hand the generator back unless it was swapped or cleared while we ran.
    if st.audio_generator_epoch == epoch {
        st.audio_generator = Some(generator);
    }

    if count == 0 {
        return;
    }
    if count > MAX_WRITE_SAMPLES {
        log::error!("audio generator returned {count} samples, max is {MAX_WRITE_SAMPLES}; discarding");
        return;
    }

    if !st.staging.publish(&buffer[..count]) {
        // publish() refuses while a batch is pending; with staging checked
        // empty above this only trips if the drain raced us, and the samples
        // of this batch are dropped rather than reordered.
        log::warn!("audio staging occupied, dropping {count} samples");
    }
}
