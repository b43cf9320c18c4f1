//! Class-specific video descriptors.
//!
//! [`ClassDescriptors::parse`] walks a configuration blob and sorts every
//! class-specific interface descriptor into a fixed-capacity table according
//! to the subclass of the interface it belongs to. Table entries are views
//! into the blob, not copies.

use heapless::Vec;
use log::{debug, warn};

use crate::{
    class::{subclass, vc, vs, DESCRIPTOR_TYPE_CS_INTERFACE},
    descriptors::{descriptor_fields, Configuration, Descriptor, DESCRIPTOR_TYPE_INTERFACE},
};

pub const MAX_INPUT_TERMINALS: usize = 10;
pub const MAX_OUTPUT_TERMINALS: usize = 4;
pub const MAX_FEATURE_UNITS: usize = 2;
pub const MAX_SELECTOR_UNITS: usize = 2;
pub const MAX_INPUT_HEADERS: usize = 3;
pub const MAX_MJPEG_FORMATS: usize = 3;
pub const MAX_MJPEG_FRAMES: usize = 10;
pub const MAX_UNCOMPRESSED_FORMATS: usize = 3;
pub const MAX_UNCOMPRESSED_FRAMES: usize = 10;

/// Declare a view over a class-specific descriptor that is at least
/// `$min_len` bytes long.
macro_rules! class_descriptor {
    ($(#[$attr:meta])* $name:ident, $min_len:literal) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $name<'a>(&'a [u8]);

        impl<'a> $name<'a> {
            pub(crate) const MIN_LEN: usize = $min_len;

            /// Wrap the bytes of a descriptor, or `None` if it is too short
            /// for the fields of this descriptor type.
            pub fn new(buf: &'a [u8]) -> Option<Self> {
                if buf.len() >= Self::MIN_LEN {
                    Some($name(buf))
                } else {
                    None
                }
            }

            /// Get the bytes of the descriptor.
            pub fn as_bytes(&self) -> &'a [u8] {
                self.0
            }
        }
    };
}

class_descriptor!(
    /// Video control interface header (`VC_HEADER`).
    VcHeader, 12
);

descriptor_fields! {
    impl<'a> VcHeader<'a> {
        /// `bcdUVC` field: class specification release, as BCD.
        #[doc(alias = "bcdUVC")]
        pub fn uvc_version at 3 -> u16;

        /// `wTotalLength` field: length of all video control descriptors.
        #[doc(alias = "wTotalLength")]
        pub fn total_length at 5 -> u16;

        /// `dwClockFrequency` field: device clock in Hz (deprecated by UVC 1.5).
        #[doc(alias = "dwClockFrequency")]
        pub fn clock_frequency at 7 -> u32;

        /// `bInCollection` field: number of streaming interfaces.
        #[doc(alias = "bInCollection")]
        pub fn in_collection at 11 -> u8;
    }
}

impl<'a> VcHeader<'a> {
    /// `baInterfaceNr` field: streaming interface numbers of the collection.
    pub fn streaming_interfaces(&self) -> &'a [u8] {
        let buf: &'a [u8] = self.0;
        let end = (12 + self.in_collection() as usize).min(buf.len());
        &buf[12..end]
    }
}

class_descriptor!(
    /// Input terminal (`VC_INPUT_TERMINAL`).
    InputTerminal, 8
);

descriptor_fields! {
    impl<'a> InputTerminal<'a> {
        #[doc(alias = "bTerminalID")]
        pub fn terminal_id at 3 -> u8;

        /// `wTerminalType` field, see [`crate::class::terminal`].
        #[doc(alias = "wTerminalType")]
        pub fn terminal_type at 4 -> u16;

        #[doc(alias = "bAssocTerminal")]
        pub fn assoc_terminal at 6 -> u8;
    }
}

class_descriptor!(
    /// Output terminal (`VC_OUTPUT_TERMINAL`).
    OutputTerminal, 9
);

descriptor_fields! {
    impl<'a> OutputTerminal<'a> {
        #[doc(alias = "bTerminalID")]
        pub fn terminal_id at 3 -> u8;

        #[doc(alias = "wTerminalType")]
        pub fn terminal_type at 4 -> u16;

        #[doc(alias = "bAssocTerminal")]
        pub fn assoc_terminal at 6 -> u8;

        /// `bSourceID` field: unit or terminal feeding this terminal.
        #[doc(alias = "bSourceID")]
        pub fn source_id at 7 -> u8;
    }
}

class_descriptor!(
    /// Selector unit (`VC_SELECTOR_UNIT`).
    SelectorUnit, 5
);

descriptor_fields! {
    impl<'a> SelectorUnit<'a> {
        #[doc(alias = "bUnitID")]
        pub fn unit_id at 3 -> u8;

        #[doc(alias = "bNrInPins")]
        pub fn num_in_pins at 4 -> u8;
    }
}

impl<'a> SelectorUnit<'a> {
    /// `baSourceID` field: the selectable inputs.
    pub fn source_ids(&self) -> &'a [u8] {
        let buf: &'a [u8] = self.0;
        let end = (5 + self.num_in_pins() as usize).min(buf.len());
        &buf[5..end]
    }
}

class_descriptor!(
    /// Feature unit.
    ///
    /// The parser never fills the feature unit table; it is reserved for
    /// unit controls such as exposure or gain.
    FeatureUnit, 6
);

descriptor_fields! {
    impl<'a> FeatureUnit<'a> {
        #[doc(alias = "bUnitID")]
        pub fn unit_id at 3 -> u8;

        #[doc(alias = "bSourceID")]
        pub fn source_id at 4 -> u8;

        #[doc(alias = "bControlSize")]
        pub fn control_size at 5 -> u8;
    }
}

class_descriptor!(
    /// Video streaming input header (`VS_INPUT_HEADER`).
    InputHeader, 13
);

descriptor_fields! {
    impl<'a> InputHeader<'a> {
        #[doc(alias = "bNumFormats")]
        pub fn num_formats at 3 -> u8;

        #[doc(alias = "wTotalLength")]
        pub fn total_length at 4 -> u16;

        /// `bEndpointAddress` field: the endpoint carrying video data.
        #[doc(alias = "bEndpointAddress")]
        pub fn endpoint_address at 6 -> u8;

        #[doc(alias = "bmInfo")]
        pub fn info at 7 -> u8;

        /// `bTerminalLink` field: output terminal this interface is connected to.
        #[doc(alias = "bTerminalLink")]
        pub fn terminal_link at 8 -> u8;

        #[doc(alias = "bStillCaptureMethod")]
        pub fn still_capture_method at 9 -> u8;
    }
}

class_descriptor!(
    /// Motion-JPEG format (`VS_FORMAT_MJPEG`).
    MjpegFormat, 11
);

descriptor_fields! {
    impl<'a> MjpegFormat<'a> {
        /// `bFormatIndex` field: 1-based index used in probe/commit.
        #[doc(alias = "bFormatIndex")]
        pub fn format_index at 3 -> u8;

        #[doc(alias = "bNumFrameDescriptors")]
        pub fn num_frame_descriptors at 4 -> u8;

        #[doc(alias = "bmFlags")]
        pub fn flags at 5 -> u8;

        #[doc(alias = "bDefaultFrameIndex")]
        pub fn default_frame_index at 6 -> u8;
    }
}

class_descriptor!(
    /// Uncompressed format (`VS_FORMAT_UNCOMPRESSED`).
    UncompressedFormat, 27
);

descriptor_fields! {
    impl<'a> UncompressedFormat<'a> {
        /// `bFormatIndex` field: 1-based index used in probe/commit.
        #[doc(alias = "bFormatIndex")]
        pub fn format_index at 3 -> u8;

        #[doc(alias = "bNumFrameDescriptors")]
        pub fn num_frame_descriptors at 4 -> u8;

        #[doc(alias = "bBitsPerPixel")]
        pub fn bits_per_pixel at 21 -> u8;

        #[doc(alias = "bDefaultFrameIndex")]
        pub fn default_frame_index at 22 -> u8;
    }
}

impl<'a> UncompressedFormat<'a> {
    /// `guidFormat` field. The first four bytes hold the FourCC, e.g. `YUY2`.
    #[doc(alias = "guidFormat")]
    pub fn guid(&self) -> &'a [u8; 16] {
        let buf: &'a [u8] = self.0;
        buf[5..21].try_into().unwrap()
    }

    /// The FourCC leading the format GUID.
    pub fn fourcc(&self) -> [u8; 4] {
        self.0[5..9].try_into().unwrap()
    }
}

class_descriptor!(
    /// Frame size of a Motion-JPEG or uncompressed format
    /// (`VS_FRAME_MJPEG` / `VS_FRAME_UNCOMPRESSED`); both share this layout.
    FrameDescriptor, 26
);

descriptor_fields! {
    impl<'a> FrameDescriptor<'a> {
        /// `bFrameIndex` field: 1-based index used in probe/commit.
        #[doc(alias = "bFrameIndex")]
        pub fn frame_index at 3 -> u8;

        #[doc(alias = "bmCapabilities")]
        pub fn capabilities at 4 -> u8;

        #[doc(alias = "wWidth")]
        pub fn width at 5 -> u16;

        #[doc(alias = "wHeight")]
        pub fn height at 7 -> u16;

        #[doc(alias = "dwMinBitRate")]
        pub fn min_bit_rate at 9 -> u32;

        #[doc(alias = "dwMaxBitRate")]
        pub fn max_bit_rate at 13 -> u32;

        #[doc(alias = "dwMaxVideoFrameBufferSize")]
        pub fn max_video_frame_buffer_size at 17 -> u32;

        /// `dwDefaultFrameInterval` field, in 100 ns units.
        #[doc(alias = "dwDefaultFrameInterval")]
        pub fn default_frame_interval at 21 -> u32;

        /// `bFrameIntervalType` field: 0 for a continuous range, otherwise the
        /// number of discrete intervals that follow.
        #[doc(alias = "bFrameIntervalType")]
        pub fn frame_interval_type at 25 -> u8;
    }
}

impl<'a> FrameDescriptor<'a> {
    /// Discrete frame intervals in 100 ns units. Empty for continuous ranges.
    pub fn discrete_frame_intervals(&self) -> impl Iterator<Item = u32> + 'a {
        let count = self.frame_interval_type() as usize;
        let buf: &'a [u8] = self.0;
        buf[26..]
            .chunks_exact(4)
            .take(count)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
    }

    /// `(min, max, step)` of a continuous frame interval range.
    pub fn continuous_frame_interval(&self) -> Option<(u32, u32, u32)> {
        if self.frame_interval_type() != 0 || self.0.len() < 38 {
            return None;
        }
        let field = |pos: usize| u32::from_le_bytes(self.0[pos..pos + 4].try_into().unwrap());
        Some((field(26), field(30), field(34)))
    }
}

/// Append to a bounded table, dropping the entry if the table is full or the
/// descriptor is too short.
fn push_bounded<T, const N: usize>(table: &mut Vec<T, N>, entry: Option<T>, what: &str) {
    let Some(entry) = entry else {
        warn!("ignoring {what} descriptor shorter than its fixed fields");
        return;
    };
    if table.push(entry).is_err() {
        warn!("{what} table full ({N} entries), dropping descriptor");
    }
}

/// Class-specific descriptors of the video control and video streaming
/// interfaces, in configuration order.
#[derive(Clone, Debug, Default)]
pub struct ClassDescriptors<'a> {
    header: Option<VcHeader<'a>>,
    input_terminals: Vec<InputTerminal<'a>, MAX_INPUT_TERMINALS>,
    output_terminals: Vec<OutputTerminal<'a>, MAX_OUTPUT_TERMINALS>,
    feature_units: Vec<FeatureUnit<'a>, MAX_FEATURE_UNITS>,
    selector_units: Vec<SelectorUnit<'a>, MAX_SELECTOR_UNITS>,
    input_headers: Vec<InputHeader<'a>, MAX_INPUT_HEADERS>,
    mjpeg_formats: Vec<MjpegFormat<'a>, MAX_MJPEG_FORMATS>,
    mjpeg_frames: Vec<FrameDescriptor<'a>, MAX_MJPEG_FRAMES>,
    uncompressed_formats: Vec<UncompressedFormat<'a>, MAX_UNCOMPRESSED_FORMATS>,
    uncompressed_frames: Vec<FrameDescriptor<'a>, MAX_UNCOMPRESSED_FRAMES>,
}

impl<'a> ClassDescriptors<'a> {
    /// Classify all class-specific interface descriptors of `config`.
    ///
    /// Descriptors are attributed to the subclass of the most recent
    /// interface descriptor before them. Unknown subtypes, descriptors
    /// outside a known interface, and entries past a table's capacity are
    /// skipped.
    pub fn parse(config: &Configuration<'a>) -> ClassDescriptors<'a> {
        let mut tables = ClassDescriptors::default();
        let mut interface_number = 0;
        let mut interface_subclass = None;

        for desc in config.trailing_descriptors() {
            match desc.descriptor_type() {
                DESCRIPTOR_TYPE_INTERFACE if desc.len() >= 4 => {
                    interface_number = desc[2];
                    let alt_setting = desc[3];
                    interface_subclass = config
                        .interface_alt_settings()
                        .find(|alt| {
                            alt.interface_number() == interface_number
                                && alt.alternate_setting() == alt_setting
                        })
                        .map(|alt| alt.subclass());
                }
                DESCRIPTOR_TYPE_CS_INTERFACE => {
                    if interface_number > config.num_interfaces() {
                        continue;
                    }
                    if let Some(subclass) = interface_subclass {
                        tables.classify(subclass, desc);
                    }
                }
                _ => {}
            }
        }

        tables
    }

    fn classify(&mut self, interface_subclass: u8, desc: Descriptor<'a>) {
        if desc.len() < 3 {
            return;
        }
        let buf = desc.as_bytes();

        match (interface_subclass, desc[2]) {
            (subclass::VIDEO_CONTROL, vc::HEADER) => {
                if let Some(header) = VcHeader::new(buf) {
                    self.header = Some(header);
                }
            }
            (subclass::VIDEO_CONTROL, vc::INPUT_TERMINAL) => {
                push_bounded(&mut self.input_terminals, InputTerminal::new(buf), "input terminal");
            }
            (subclass::VIDEO_CONTROL, vc::OUTPUT_TERMINAL) => {
                push_bounded(
                    &mut self.output_terminals,
                    OutputTerminal::new(buf),
                    "output terminal",
                );
            }
            (subclass::VIDEO_CONTROL, vc::SELECTOR_UNIT) => {
                push_bounded(&mut self.selector_units, SelectorUnit::new(buf), "selector unit");
            }
            (subclass::VIDEO_STREAMING, vs::INPUT_HEADER) => {
                push_bounded(&mut self.input_headers, InputHeader::new(buf), "input header");
            }
            (subclass::VIDEO_STREAMING, vs::FORMAT_MJPEG) => {
                push_bounded(&mut self.mjpeg_formats, MjpegFormat::new(buf), "mjpeg format");
            }
            (subclass::VIDEO_STREAMING, vs::FRAME_MJPEG) => {
                let frame = FrameDescriptor::new(buf);
                if let (Some(frame), false) = (frame, self.mjpeg_frames.is_full()) {
                    debug!("mjpeg frame detected: {} x {}", frame.width(), frame.height());
                }
                push_bounded(&mut self.mjpeg_frames, frame, "mjpeg frame");
            }
            (subclass::VIDEO_STREAMING, vs::FORMAT_UNCOMPRESSED) => {
                push_bounded(
                    &mut self.uncompressed_formats,
                    UncompressedFormat::new(buf),
                    "uncompressed format",
                );
            }
            (subclass::VIDEO_STREAMING, vs::FRAME_UNCOMPRESSED) => {
                let frame = FrameDescriptor::new(buf);
                if let (Some(frame), false) = (frame, self.uncompressed_frames.is_full()) {
                    debug!("uncompressed frame detected: {} x {}", frame.width(), frame.height());
                }
                push_bounded(&mut self.uncompressed_frames, frame, "uncompressed frame");
            }
            _ => {}
        }
    }

    /// The video control header. If the device sends several, the last one wins.
    pub fn header(&self) -> Option<VcHeader<'a>> {
        self.header
    }

    pub fn input_terminals(&self) -> &[InputTerminal<'a>] {
        &self.input_terminals
    }

    pub fn output_terminals(&self) -> &[OutputTerminal<'a>] {
        &self.output_terminals
    }

    /// Always empty: feature units are not collected by [`parse`][Self::parse].
    pub fn feature_units(&self) -> &[FeatureUnit<'a>] {
        &self.feature_units
    }

    pub fn selector_units(&self) -> &[SelectorUnit<'a>] {
        &self.selector_units
    }

    pub fn input_headers(&self) -> &[InputHeader<'a>] {
        &self.input_headers
    }

    pub fn mjpeg_formats(&self) -> &[MjpegFormat<'a>] {
        &self.mjpeg_formats
    }

    pub fn mjpeg_frames(&self) -> &[FrameDescriptor<'a>] {
        &self.mjpeg_frames
    }

    pub fn uncompressed_formats(&self) -> &[UncompressedFormat<'a>] {
        &self.uncompressed_formats
    }

    pub fn uncompressed_frames(&self) -> &[FrameDescriptor<'a>] {
        &self.uncompressed_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{self, ConfigBuilder};

    #[test]
    fn test_camera_tables() {
        let blob = testutil::camera_config(&[64, 512, 1023, 2000]);
        let config = Configuration::new(&blob).unwrap();
        let tables = ClassDescriptors::parse(&config);

        let header = tables.header().unwrap();
        assert_eq!(header.uvc_version(), 0x0110);
        assert_eq!(header.clock_frequency(), 48_000_000);
        assert_eq!(header.streaming_interfaces(), &[1]);

        assert_eq!(tables.input_terminals().len(), 1);
        assert_eq!(tables.input_terminals()[0].terminal_id(), 1);
        assert_eq!(tables.input_terminals()[0].terminal_type(), crate::class::terminal::CAMERA);
        assert_eq!(tables.output_terminals().len(), 1);
        assert_eq!(tables.output_terminals()[0].source_id(), 1);
        assert_eq!(tables.selector_units().len(), 0);
        assert_eq!(tables.feature_units().len(), 0);

        assert_eq!(tables.input_headers().len(), 1);
        assert_eq!(tables.input_headers()[0].endpoint_address(), 0x81);
        assert_eq!(tables.input_headers()[0].num_formats(), 2);

        assert_eq!(tables.mjpeg_formats().len(), 1);
        assert_eq!(tables.mjpeg_formats()[0].format_index(), 1);
        assert_eq!(tables.mjpeg_frames().len(), 2);
        assert_eq!(tables.mjpeg_frames()[0].width(), 640);
        assert_eq!(tables.mjpeg_frames()[1].height(), 160);
        assert_eq!(
            tables.mjpeg_frames()[0].discrete_frame_intervals().collect::<std::vec::Vec<_>>(),
            vec![333333, 666666]
        );

        assert_eq!(tables.uncompressed_formats().len(), 1);
        assert_eq!(&tables.uncompressed_formats()[0].fourcc(), b"YUY2");
        assert_eq!(tables.uncompressed_formats()[0].bits_per_pixel(), 16);
        assert_eq!(tables.uncompressed_frames().len(), 1);
        assert_eq!(tables.uncompressed_frames()[0].frame_index(), 1);
    }

    #[test]
    fn test_counts_partitioned_by_subtype() {
        let mut b = ConfigBuilder::new();
        b.interface(0, 0, 1, 0);
        b.vc_input_terminal(1);
        b.vc_input_terminal(2);
        b.vc_output_terminal(3, 1);
        b.vc_selector_unit(4, &[1, 2]);
        b.interface(1, 0, 2, 0);
        b.mjpeg_format(1, 1);
        b.mjpeg_frame(1, 320, 240);
        let blob = b.finish(2);

        let config = Configuration::new(&blob).unwrap();
        let tables = ClassDescriptors::parse(&config);
        assert!(tables.header().is_none());
        assert_eq!(tables.input_terminals().len(), 2);
        assert_eq!(tables.output_terminals().len(), 1);
        assert_eq!(tables.selector_units().len(), 1);
        assert_eq!(tables.selector_units()[0].source_ids(), &[1, 2]);
        assert_eq!(tables.input_headers().len(), 0);
        assert_eq!(tables.mjpeg_formats().len(), 1);
        assert_eq!(tables.mjpeg_frames().len(), 1);
        assert_eq!(tables.uncompressed_formats().len(), 0);
        assert_eq!(tables.uncompressed_frames().len(), 0);
    }

    #[test]
    fn test_overflow_keeps_first_entries() {
        let mut b = ConfigBuilder::new();
        b.interface(0, 0, 1, 0);
        for id in 0..(MAX_OUTPUT_TERMINALS as u8 + 3) {
            b.vc_output_terminal(10 + id, 1);
        }
        b.vc_input_terminal(1);
        b.interface(1, 0, 2, 0);
        b.mjpeg_format(1, 12);
        for index in 1..=12 {
            b.mjpeg_frame(index, 100 + index as u16, 100);
        }
        let blob = b.finish(2);

        let config = Configuration::new(&blob).unwrap();
        let tables = ClassDescriptors::parse(&config);

        let ids: std::vec::Vec<u8> =
            tables.output_terminals().iter().map(|t| t.terminal_id()).collect();
        assert_eq!(ids, vec![10, 11, 12, 13]);
        assert_eq!(tables.input_terminals().len(), 1);

        assert_eq!(tables.mjpeg_frames().len(), MAX_MJPEG_FRAMES);
        assert_eq!(tables.mjpeg_frames()[0].frame_index(), 1);
        assert_eq!(tables.mjpeg_frames()[MAX_MJPEG_FRAMES - 1].frame_index(), 10);
        assert_eq!(tables.mjpeg_formats().len(), 1);
    }

    #[test]
    fn test_subtype_is_read_per_interface_subclass() {
        let mut b = ConfigBuilder::new();
        // subtype 0x06 is VS_FORMAT_MJPEG but VC_EXTENSION_UNIT on a control interface
        b.interface(0, 0, 1, 0);
        b.mjpeg_format(1, 1);
        // subtype 0x02 is VC_INPUT_TERMINAL but VS_OUTPUT_HEADER on a streaming interface
        b.interface(1, 0, 2, 0);
        b.vc_input_terminal(1);
        let blob = b.finish(2);

        let config = Configuration::new(&blob).unwrap();
        let tables = ClassDescriptors::parse(&config);
        assert_eq!(tables.mjpeg_formats().len(), 0);
        assert_eq!(tables.input_terminals().len(), 0);
    }

    #[test]
    fn test_last_header_wins() {
        let mut b = ConfigBuilder::new();
        b.interface(0, 0, 1, 0);
        b.vc_header(0x0100, 1);
        b.vc_header(0x0150, 1);
        let blob = b.finish(1);

        let config = Configuration::new(&blob).unwrap();
        let tables = ClassDescriptors::parse(&config);
        assert_eq!(tables.header().unwrap().uvc_version(), 0x0150);
    }

    #[test]
    #[rustfmt::skip]
    fn test_short_and_orphan_descriptors_ignored() {
        let blob = [
            0x09, 0x02, 0x26, 0x00, 0x01, 0x01, 0x00, 0x80, 0xfa,
            // class-specific descriptor before any interface
            0x0b, 0x24, 0x06, 0x01, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
            // interface 0: video streaming
            0x09, 0x04, 0x00, 0x00, 0x00, 0x0e, 0x02, 0x00, 0x00,
            // truncated mjpeg frame
            0x09, 0x24, 0x07, 0x01, 0x00, 0x80, 0x00, 0x60, 0x00,
        ];
        let config = Configuration::new(&blob).unwrap();
        let tables = ClassDescriptors::parse(&config);
        assert_eq!(tables.mjpeg_formats().len(), 0);
        assert_eq!(tables.mjpeg_frames().len(), 0);
    }
}
