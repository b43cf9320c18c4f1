//! Choosing the format and frame descriptors that match the configured target.

use crate::{
    class_descriptors::{ClassDescriptors, FrameDescriptor},
    config::{UvcConfig, VideoFormat},
};

/// Format and frame indices chosen for probe/commit.
///
/// `None` means no descriptor matched; streaming can't be negotiated unless
/// both are set.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    #[doc(alias = "bFormatIndex")]
    pub format_index: Option<u8>,

    #[doc(alias = "bFrameIndex")]
    pub frame_index: Option<u8>,
}

impl Selection {
    /// Select from parsed `tables` for `config`.
    pub fn select(tables: &ClassDescriptors<'_>, config: &UvcConfig) -> Selection {
        Selection {
            format_index: select_format(tables, config.format),
            frame_index: select_frame(tables, config),
        }
    }

    /// Both indices, if both were resolved.
    pub fn indices(&self) -> Option<(u8, u8)> {
        Some((self.format_index?, self.frame_index?))
    }
}

/// The device must offer exactly one format of the requested kind.
pub fn select_format(tables: &ClassDescriptors<'_>, format: VideoFormat) -> Option<u8> {
    match format {
        VideoFormat::Mjpeg => match tables.mjpeg_formats() {
            [only] => Some(only.format_index()),
            _ => None,
        },
        VideoFormat::Yuy2 => match tables.uncompressed_formats() {
            [only] if &only.fourcc() == b"YUY2" => Some(only.format_index()),
            _ => None,
        },
    }
}

/// Index of the frame descriptor with exactly the configured size. If the
/// size is listed more than once, the last listing wins.
pub fn select_frame(tables: &ClassDescriptors<'_>, config: &UvcConfig) -> Option<u8> {
    let frames: &[FrameDescriptor<'_>] = match config.format {
        VideoFormat::Mjpeg => tables.mjpeg_frames(),
        VideoFormat::Yuy2 => tables.uncompressed_frames(),
    };

    frames
        .iter()
        .rev()
        .find(|f| f.width() == config.width && f.height() == config.height)
        .map(|f| f.frame_index())
}
