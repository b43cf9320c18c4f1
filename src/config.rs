/// Capacity of the isochronous receive scratch buffer. Stream endpoints
/// must have a max packet size strictly below this.
pub const RX_FIFO_SIZE: usize = 1023;

/// Default frame interval in 100 ns units (30 frames per second).
pub const DEFAULT_FRAME_INTERVAL: u32 = 333333;

/// Video format to request from the camera.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VideoFormat {
    /// Motion-JPEG: one compressed image per frame, delimited by the
    /// end-of-frame bit.
    Mjpeg,

    /// Uncompressed YUY2 (4:2:2, 16 bits per pixel). A frame is complete
    /// once `frame_size` bytes were received.
    Yuy2,
}

/// Stream parameters the driver negotiates with the camera.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UvcConfig {
    pub format: VideoFormat,
    pub width: u16,
    pub height: u16,

    /// Frame interval proposed in the probe, in 100 ns units.
    pub frame_interval: u32,

    /// Maximum number of payload bytes accumulated for one frame, and the
    /// completion size of uncompressed frames.
    pub frame_size: usize,
}

impl UvcConfig {
    /// Request `format` at `width` x `height`, with a frame size of one byte
    /// per pixel.
    pub fn new(format: VideoFormat, width: u16, height: u16) -> Self {
        UvcConfig {
            format,
            width,
            height,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            frame_size: width as usize * height as usize,
        }
    }

    pub fn with_frame_interval(mut self, frame_interval: u32) -> Self {
        self.frame_interval = frame_interval;
        self
    }

    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }
}

impl Default for UvcConfig {
    fn default() -> Self {
        UvcConfig::new(VideoFormat::Mjpeg, 128, 160)
    }
}

#[test]
fn test_default_config() {
    let config = UvcConfig::default();
    assert_eq!(config.format, VideoFormat::Mjpeg);
    assert_eq!((config.width, config.height), (128, 160));
    assert_eq!(config.frame_interval, 333333);
    assert_eq!(config.frame_size, 128 * 160);

    let config = UvcConfig::new(VideoFormat::Yuy2, 160, 120)
        .with_frame_size(160 * 120 * 2)
        .with_frame_interval(666666);
    assert_eq!(config.frame_size, 38400);
    assert_eq!(config.frame_interval, 666666);
}
