//! HID event synthesizer worker.
//!
//! Woken by the poll loop whenever the current HID snapshot changes. Diffs it
//! against the previous one into discrete events, delivers them to the
//! registered sink with no lock held, then commits the snapshot it diffed as
//! the new baseline.

use std::sync::Arc;

use quadlink_core::hid::{self, EventBatch};

use crate::state::Shared;

pub(crate) fn run(shared: Arc<Shared>) {
    loop {
        shared.hid_wake.wait();
        synthesize(&shared);
    }
}

/// Diff the snapshots once and deliver the resulting events.
pub(crate) fn synthesize(shared: &Shared) {
    let (previous, current, sink) = {
        let mut st = shared.state.lock().unwrap();
        let sink = st.hid_sink.take().map(|s| (s, st.hid_sink_epoch));
        (st.hid_previous, st.hid_current, sink)
    };

    let mut events = EventBatch::new();
    hid::diff(&previous, &current, &mut events);

    let sink = sink.map(|(mut sink, epoch)| {
        for &event in &events {
            sink(event);
        }
        (sink, epoch)
    });

    let mut st = shared.state.lock().unwrap();
    // The snapshot may have advanced again while we diffed; another wake is
    // already pending in that case and will pick it up from this baseline.
    st.hid_previous = current;
    if let Some((sink, epoch)) = sink {
        if st.hid_sink_epoch == epoch {
            st.hid_sink = Some(sink);
        }
    }
}
