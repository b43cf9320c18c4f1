/// Length of the video probe and commit control payload.
pub const PROBE_COMMIT_LEN: usize = 26;

/// Video probe and commit control payload.
///
/// Sent with `SET_CUR` to propose stream parameters and read back with
/// `GET_CUR` to learn what the device accepted. Serialized packed and
/// little-endian. Requests carry the 26-byte UVC 1.0 prefix, so the fields
/// from `clock_frequency` on are never transferred and stay zero after
/// [`from_bytes`][Self::from_bytes].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ProbeCommit {
    #[doc(alias = "bmHint")]
    pub hint: u16,

    #[doc(alias = "bFormatIndex")]
    pub format_index: u8,

    #[doc(alias = "bFrameIndex")]
    pub frame_index: u8,

    /// Frame interval in 100 ns units.
    #[doc(alias = "dwFrameInterval")]
    pub frame_interval: u32,

    #[doc(alias = "wKeyFrameRate")]
    pub key_frame_rate: u16,

    #[doc(alias = "wPFrameRate")]
    pub p_frame_rate: u16,

    #[doc(alias = "wCompQuality")]
    pub comp_quality: u16,

    #[doc(alias = "wCompWindowSize")]
    pub comp_window_size: u16,

    #[doc(alias = "wDelay")]
    pub delay: u16,

    #[doc(alias = "dwMaxVideoFrameSize")]
    pub max_video_frame_size: u32,

    #[doc(alias = "dwMaxPayloadTransferSize")]
    pub max_payload_transfer_size: u32,

    #[doc(alias = "dwClockFrequency")]
    pub clock_frequency: u32,

    #[doc(alias = "bmFramingInfo")]
    pub framing_info: u8,

    #[doc(alias = "bPreferedVersion")]
    pub preferred_version: u8,

    #[doc(alias = "bMinVersion")]
    pub min_version: u8,

    #[doc(alias = "bMaxVersion")]
    pub max_version: u8,
}

/// `bmHint` bit asking the device to keep `dwFrameInterval` fixed.
pub const HINT_FRAME_INTERVAL: u16 = 0x0001;

impl ProbeCommit {
    /// Probe proposing a format, frame and frame interval, leaving every
    /// other field for the device to fill in.
    pub fn probe(format_index: u8, frame_index: u8, frame_interval: u32) -> Self {
        ProbeCommit {
            hint: HINT_FRAME_INTERVAL,
            format_index,
            frame_index,
            frame_interval,
            ..Default::default()
        }
    }

    pub fn to_bytes(&self) -> [u8; PROBE_COMMIT_LEN] {
        let mut buf = [0; PROBE_COMMIT_LEN];
        buf[0..2].copy_from_slice(&self.hint.to_le_bytes());
        buf[2] = self.format_index;
        buf[3] = self.frame_index;
        buf[4..8].copy_from_slice(&self.frame_interval.to_le_bytes());
        buf[8..10].copy_from_slice(&self.key_frame_rate.to_le_bytes());
        buf[10..12].copy_from_slice(&self.p_frame_rate.to_le_bytes());
        buf[12..14].copy_from_slice(&self.comp_quality.to_le_bytes());
        buf[14..16].copy_from_slice(&self.comp_window_size.to_le_bytes());
        buf[16..18].copy_from_slice(&self.delay.to_le_bytes());
        buf[18..22].copy_from_slice(&self.max_video_frame_size.to_le_bytes());
        buf[22..26].copy_from_slice(&self.max_payload_transfer_size.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; PROBE_COMMIT_LEN]) -> Self {
        let u16_at = |pos: usize| u16::from_le_bytes([buf[pos], buf[pos + 1]]);
        let u32_at =
            |pos: usize| u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]]);
        ProbeCommit {
            hint: u16_at(0),
            format_index: buf[2],
            frame_index: buf[3],
            frame_interval: u32_at(4),
            key_frame_rate: u16_at(8),
            p_frame_rate: u16_at(10),
            comp_quality: u16_at(12),
            comp_window_size: u16_at(14),
            delay: u16_at(16),
            max_video_frame_size: u32_at(18),
            max_payload_transfer_size: u32_at(22),
            ..Default::default()
        }
    }
}

#[test]
fn test_probe_layout() {
    let probe = ProbeCommit::probe(1, 2, 333333);
    assert_eq!(
        probe.to_bytes(),
        [
            0x01, 0x00, 0x01, 0x02, 0x15, 0x16, 0x05, 0x00, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0, 0
        ]
    );
}

#[test]
#[rustfmt::skip]
fn test_parse_get_cur_response() {
    let p = ProbeCommit::from_bytes(&[
        0x00, 0x00, 0x01, 0x02, 0x15, 0x16, 0x05, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x10, 0x27, 0x00, 0x00,
        0x20, 0x00, 0x00, 0xa0, 0x00, 0x00, 0x00, 0x0c,
        0x00, 0x00,
    ]);
    assert_eq!(p.hint, 0);
    assert_eq!(p.format_index, 1);
    assert_eq!(p.frame_index, 2);
    assert_eq!(p.frame_interval, 333333);
    assert_eq!(p.comp_quality, 10000);
    assert_eq!(p.delay, 32);
    assert_eq!(p.max_video_frame_size, 40960);
    assert_eq!(p.max_payload_transfer_size, 3072);
    assert_eq!(p.clock_frequency, 0);
    assert_eq!(ProbeCommit::from_bytes(&p.to_bytes()), p);
}
