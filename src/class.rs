//! Codes defined by the USB Video Class specification.

/// `bInterfaceClass` of video interfaces.
pub const CLASS_VIDEO: u8 = 0x0E;

/// Class-specific interface descriptor type.
pub const DESCRIPTOR_TYPE_CS_INTERFACE: u8 = 0x24;

/// Class-specific endpoint descriptor type.
pub const DESCRIPTOR_TYPE_CS_ENDPOINT: u8 = 0x25;

/// `bInterfaceSubClass` values of video interfaces.
pub mod subclass {
    pub const VIDEO_CONTROL: u8 = 0x01;
    pub const VIDEO_STREAMING: u8 = 0x02;
    pub const VIDEO_INTERFACE_COLLECTION: u8 = 0x03;
}

/// `bDescriptorSubtype` values of video control interface descriptors.
pub mod vc {
    pub const HEADER: u8 = 0x01;
    pub const INPUT_TERMINAL: u8 = 0x02;
    pub const OUTPUT_TERMINAL: u8 = 0x03;
    pub const SELECTOR_UNIT: u8 = 0x04;
    pub const PROCESSING_UNIT: u8 = 0x05;
    pub const EXTENSION_UNIT: u8 = 0x06;
}

/// `bDescriptorSubtype` values of video streaming interface descriptors.
pub mod vs {
    pub const INPUT_HEADER: u8 = 0x01;
    pub const OUTPUT_HEADER: u8 = 0x02;
    pub const STILL_IMAGE_FRAME: u8 = 0x03;
    pub const FORMAT_UNCOMPRESSED: u8 = 0x04;
    pub const FRAME_UNCOMPRESSED: u8 = 0x05;
    pub const FORMAT_MJPEG: u8 = 0x06;
    pub const FRAME_MJPEG: u8 = 0x07;
    pub const FORMAT_MPEG2TS: u8 = 0x0A;
    pub const FORMAT_DV: u8 = 0x0C;
    pub const COLORFORMAT: u8 = 0x0D;
    pub const FORMAT_FRAME_BASED: u8 = 0x10;
    pub const FRAME_FRAME_BASED: u8 = 0x11;
    pub const FORMAT_STREAM_BASED: u8 = 0x12;
}

/// Class-specific request codes (`bRequest`).
pub mod request {
    pub const SET_CUR: u8 = 0x01;
    pub const GET_CUR: u8 = 0x81;
    pub const GET_MIN: u8 = 0x82;
    pub const GET_MAX: u8 = 0x83;
    pub const GET_RES: u8 = 0x84;
    pub const GET_LEN: u8 = 0x85;
    pub const GET_INFO: u8 = 0x86;
    pub const GET_DEF: u8 = 0x87;
}

/// Video streaming interface control selectors, sent in the high byte of `wValue`.
pub mod vs_control {
    pub const PROBE: u8 = 0x01;
    pub const COMMIT: u8 = 0x02;
}

/// Terminal types (`wTerminalType`).
pub mod terminal {
    pub const UNDEFINED: u16 = 0x0100;
    pub const STREAMING: u16 = 0x0101;
    pub const VENDOR_SPECIFIC: u16 = 0x01FF;
    pub const CAMERA: u16 = 0x0201;
}
