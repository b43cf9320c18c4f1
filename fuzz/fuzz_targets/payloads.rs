#![no_main]

use libfuzzer_sys::fuzz_target;
use uvc_host::{Reassembler, VideoFormat, RX_FIFO_SIZE};

fuzz_target!(|data: &[u8]| {
    let Some((&control, mut data)) = data.split_first() else {
        return;
    };
    let format = if control & 1 == 0 {
        VideoFormat::Mjpeg
    } else {
        VideoFormat::Yuy2
    };
    let frame_size = (control >> 1) as usize * 8;

    let mut buf0 = [0u8; 1024];
    let mut buf1 = [0u8; 1024];
    let mut r = Reassembler::new(format, frame_size);
    r.init(&mut buf0, &mut buf1);

    // each packet is prefixed by its length and a flag to rearm before it
    while let [len_lo, len_hi, rest @ ..] = data {
        let len = (u16::from_le_bytes([*len_lo, *len_hi]) as usize & 0x7fff).min(RX_FIFO_SIZE);
        if len_hi & 0x80 != 0 {
            r.rearm();
        }
        let (packet, next) = rest.split_at(len.min(rest.len()));
        r.process_packet(packet);
        assert!(r.frame_len() <= frame_size);
        assert_eq!(r.filled_frame().len(), r.frame_len());
        data = next;
    }
});
