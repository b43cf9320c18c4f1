#![no_main]

use libfuzzer_sys::fuzz_target;
use uvc_host::{
    best_candidate, stream_candidates, ClassDescriptors, Configuration, Selection, UvcConfig,
};

fuzz_target!(|data: &[u8]| {
    let Some(config) = Configuration::new(data) else {
        return;
    };
    let s = format!("{config:?}");
    std::hint::black_box(s);

    let tables = ClassDescriptors::parse(&config);
    for frame in tables.mjpeg_frames().iter().chain(tables.uncompressed_frames()) {
        std::hint::black_box((frame.width(), frame.height()));
        std::hint::black_box(frame.discrete_frame_intervals().count());
        std::hint::black_box(frame.continuous_frame_interval());
    }
    for unit in tables.selector_units() {
        std::hint::black_box(unit.source_ids());
    }
    if let Some(header) = tables.header() {
        std::hint::black_box(header.streaming_interfaces());
    }
    std::hint::black_box(Selection::select(&tables, &UvcConfig::default()));

    let candidates = stream_candidates(&config);
    std::hint::black_box(best_candidate(&candidates));
});
