//! Walking the standard descriptors of a configuration descriptor blob.
//!
//! The blob is owned by the host stack. Every type here borrows from it, so
//! nothing parsed out of it can outlive the enumeration that produced it.

use std::{fmt::Debug, iter, ops::Deref};

use log::warn;

use crate::transfer::{Direction, EndpointType};

pub(crate) const DESCRIPTOR_TYPE_CONFIGURATION: u8 = 0x02;
pub(crate) const DESCRIPTOR_LEN_CONFIGURATION: u8 = 9;

pub(crate) const DESCRIPTOR_TYPE_INTERFACE: u8 = 0x04;
pub(crate) const DESCRIPTOR_LEN_INTERFACE: u8 = 9;

pub(crate) const DESCRIPTOR_TYPE_ENDPOINT: u8 = 0x05;
pub(crate) const DESCRIPTOR_LEN_ENDPOINT: u8 = 7;

/// A raw USB descriptor.
///
/// Derefs to the bytes of the descriptor, starting with `bLength`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Descriptor<'a>(&'a [u8]);

impl<'a> Descriptor<'a> {
    /// Get the type field of the descriptor.
    #[doc(alias = "bDescriptorType")]
    pub fn descriptor_type(&self) -> u8 {
        self.0[1]
    }

    /// Get the bytes of the descriptor with the blob's lifetime.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }
}

impl<'a> Deref for Descriptor<'a> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.0
    }
}

/// An iterator over a sequence of USB descriptors.
///
/// Iteration stops at the first descriptor whose `bLength` is too small to
/// advance or runs past the end of the buffer.
#[derive(Clone)]
pub struct Descriptors<'a>(&'a [u8]);

impl<'a> Descriptors<'a> {
    /// Get the concatenated bytes of the remaining descriptors.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    fn split_first(&self) -> Option<(&'a [u8], &'a [u8])> {
        if self.0.len() < 2 {
            return None;
        }

        if self.0[0] < 2 {
            warn!(
                "descriptor with bLength {} can't point to next descriptor",
                self.0[0]
            );
            return None;
        }

        if self.0[0] as usize > self.0.len() {
            warn!(
                "descriptor with bLength {} exceeds remaining buffer length {}",
                self.0[0],
                self.0.len()
            );
            return None;
        }

        Some(self.0.split_at(self.0[0] as usize))
    }

    /// Split into groups that each start with a descriptor of `descriptor_type`
    /// and extend up to the next one.
    fn split_by_type(mut self, descriptor_type: u8, min_len: u8) -> impl Iterator<Item = &'a [u8]> {
        iter::from_fn(move || {
            loop {
                let (_, next) = self.split_first()?;

                if self.0[1] == descriptor_type {
                    if self.0[0] >= min_len {
                        break;
                    } else {
                        warn!("ignoring descriptor of type {} and length {} because the minimum length is {}", self.0[1], self.0[0], min_len);
                    }
                }

                self.0 = next;
            }

            let mut end = self.0[0] as usize;

            while self.0.len() >= end + 2
                && self.0[end] > 2
                && self.0[end + 1] != descriptor_type
                && self.0.len() >= end + self.0[end] as usize
            {
                end += self.0[end] as usize;
            }

            let (r, next) = self.0.split_at(end);
            self.0 = next;
            Some(r)
        })
    }
}

impl<'a> Iterator for Descriptors<'a> {
    type Item = Descriptor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((cur, next)) = self.split_first() {
            self.0 = next;
            Some(Descriptor(cur))
        } else {
            None
        }
    }
}

/// Generate little-endian field accessors at fixed byte offsets of a
/// `struct Name<'a>(&'a [u8])` view. The constructor of the view must check
/// that the slice covers every offset declared here.
macro_rules! descriptor_fields {
    (impl $(<$( $i_lt:lifetime ),+>)? $tname:ident $(<$( $t_lt:lifetime ),+>)? {
        $(
            $(#[$attr:meta])*
            $vis:vis fn $name:ident at $pos:literal -> $ty:ty;
        )*
    }) => {
        impl $(<$( $i_lt ),+>)? $tname $(<$( $t_lt ),+>)? {
            $(
                $(#[$attr])*
                #[inline]
                $vis fn $name(&self) -> $ty { <$ty>::from_le_bytes(self.0[$pos..$pos + std::mem::size_of::<$ty>()].try_into().unwrap()) }
            )*
        }
    }
}

pub(crate) use descriptor_fields;

/// Check whether the buffer starts with a valid configuration descriptor.
///
/// Returns its `wTotalLength` on success.
pub(crate) fn validate_config_descriptor(buf: &[u8]) -> Option<usize> {
    if buf.len() < DESCRIPTOR_LEN_CONFIGURATION as usize {
        warn!(
            "config descriptor buffer is {} bytes, need {}",
            buf.len(),
            DESCRIPTOR_LEN_CONFIGURATION
        );
        return None;
    }

    if buf[0] < DESCRIPTOR_LEN_CONFIGURATION {
        warn!("invalid config descriptor bLength");
        return None;
    }

    if buf[1] != DESCRIPTOR_TYPE_CONFIGURATION {
        warn!(
            "config bDescriptorType is {}, not a configuration descriptor",
            buf[1]
        );
        return None;
    }

    let total_len = u16::from_le_bytes([buf[2], buf[3]]) as usize;
    if total_len < buf[0] as usize || total_len > buf.len() {
        warn!(
            "invalid config descriptor wTotalLength of {total_len} (buffer size is {bufsize})",
            bufsize = buf.len()
        );
        return None;
    }

    Some(total_len)
}

/// A configuration descriptor followed by all of its interface, endpoint and
/// class-specific descriptors.
#[derive(Clone, Copy)]
pub struct Configuration<'a>(&'a [u8]);

impl<'a> Configuration<'a> {
    /// Wrap the blob read from the device during enumeration.
    ///
    /// Returns `None` when the buffer does not start with a configuration
    /// descriptor or is shorter than its `wTotalLength`. Bytes past
    /// `wTotalLength` are ignored.
    pub fn new(buf: &'a [u8]) -> Option<Configuration<'a>> {
        let total_len = validate_config_descriptor(buf)?;
        Some(Configuration(&buf[..total_len]))
    }

    /// Get the configuration descriptor followed by all trailing descriptors.
    pub fn descriptors(&self) -> Descriptors<'a> {
        Descriptors(self.0)
    }

    /// Get the descriptors following the 9-byte configuration header.
    pub fn trailing_descriptors(&self) -> Descriptors<'a> {
        Descriptors(&self.0[DESCRIPTOR_LEN_CONFIGURATION as usize..])
    }

    /// Iterate every interface descriptor (one per alternate setting) in blob order.
    pub fn interface_alt_settings(&self) -> impl Iterator<Item = InterfaceAltSetting<'a>> {
        self.descriptors()
            .split_by_type(DESCRIPTOR_TYPE_INTERFACE, DESCRIPTOR_LEN_INTERFACE)
            .map(InterfaceAltSetting)
    }
}

descriptor_fields! {
    impl<'a> Configuration<'a> {
        /// `wTotalLength` descriptor field: length of the whole blob.
        #[doc(alias = "wTotalLength")]
        pub fn total_length at 2 -> u16;

        /// `bNumInterfaces` descriptor field: Number of interfaces.
        #[doc(alias = "bNumInterfaces")]
        pub fn num_interfaces at 4 -> u8;

        /// `bConfigurationValue` descriptor field: Identifier for the configuration.
        #[doc(alias = "bConfigurationValue")]
        pub fn configuration_value at 5 -> u8;
    }
}

impl<'a> Debug for Configuration<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("configuration_value", &self.configuration_value())
            .field("num_interfaces", &self.num_interfaces())
            .field("total_length", &self.total_length())
            .finish()
    }
}

/// An interface descriptor for one alternate setting, with access to its
/// endpoints and the other descriptors that follow it.
#[derive(Clone, Copy)]
pub struct InterfaceAltSetting<'a>(&'a [u8]);

impl<'a> InterfaceAltSetting<'a> {
    /// Get the interface descriptor followed by all trailing endpoint and other
    /// descriptors up to the next interface descriptor.
    pub fn descriptors(&self) -> Descriptors<'a> {
        Descriptors(self.0)
    }

    /// Get the endpoints of this alternate setting.
    pub fn endpoints(&self) -> impl Iterator<Item = Endpoint<'a>> {
        self.descriptors()
            .split_by_type(DESCRIPTOR_TYPE_ENDPOINT, DESCRIPTOR_LEN_ENDPOINT)
            .map(Endpoint)
    }
}

descriptor_fields! {
    impl<'a> InterfaceAltSetting<'a> {
        /// `bInterfaceNumber` descriptor field: Identifier for the interface.
        #[doc(alias="bInterfaceNumber")]
        pub fn interface_number at 2 -> u8;

        /// `bAlternateSetting` descriptor field: Identifier for this alternate setting.
        #[doc(alias="bAlternateSetting")]
        pub fn alternate_setting at 3 -> u8;

        /// `bNumEndpoints` descriptor field: Number of endpoints in this alternate setting.
        #[doc(alias="bNumEndpoints")]
        pub fn num_endpoints at 4 -> u8;

        /// `bInterfaceClass` descriptor field: Standard interface class.
        #[doc(alias="bInterfaceClass")]
        pub fn class at 5 -> u8;

        /// `bInterfaceSubClass` descriptor field: Standard interface subclass.
        #[doc(alias="bInterfaceSubClass")]
        pub fn subclass at 6 -> u8;
    }
}

impl<'a> Debug for InterfaceAltSetting<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceAltSetting")
            .field("interface_number", &self.interface_number())
            .field("alternate_setting", &self.alternate_setting())
            .field("num_endpoints", &self.num_endpoints())
            .field("class", &self.class())
            .field("subclass", &self.subclass())
            .finish()
    }
}

/// An endpoint descriptor.
#[derive(Clone, Copy)]
pub struct Endpoint<'a>(&'a [u8]);

impl<'a> Endpoint<'a> {
    /// Get the endpoint's direction.
    pub fn direction(&self) -> Direction {
        match self.address() & 0x80 {
            0 => Direction::Out,
            _ => Direction::In,
        }
    }

    /// Get the endpoint's transfer type.
    pub fn transfer_type(&self) -> EndpointType {
        match self.attributes() & 0x03 {
            0 => EndpointType::Control,
            1 => EndpointType::Isochronous,
            2 => EndpointType::Bulk,
            3 => EndpointType::Interrupt,
            _ => unreachable!(),
        }
    }
}

descriptor_fields! {
    impl<'a> Endpoint<'a> {
        /// Get the `bEndpointAddress` descriptor field: Endpoint address.
        #[doc(alias = "bEndpointAddress")]
        pub fn address at 2 -> u8;

        /// Get the raw value of the `bmAttributes` descriptor field.
        #[doc(alias = "bmAttributes")]
        pub fn attributes at 3 -> u8;

        /// Get the raw value of the `wMaxPacketSize` descriptor field,
        /// including the high-bandwidth transaction bits.
        #[doc(alias = "wMaxPacketSize")]
        pub fn max_packet_size_raw at 4 -> u16;

        /// Get the `bInterval` field: Polling interval in frames.
        #[doc(alias = "bInterval")]
        pub fn interval at 6 -> u8;
    }
}

impl<'a> Debug for Endpoint<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("address", &format_args!("0x{:02X}", self.address()))
            .field("direction", &self.direction())
            .field("transfer_type", &self.transfer_type())
            .field("max_packet_size_raw", &self.max_packet_size_raw())
            .field("interval", &self.interval())
            .finish()
    }
}

#[test]
fn test_rejects_bad_config() {
    assert!(Configuration::new(&[]).is_none());
    assert!(Configuration::new(&[9, 4, 9, 0, 0, 0, 0, 0, 0]).is_none());
    // wTotalLength larger than the buffer
    assert!(Configuration::new(&[9, 2, 20, 0, 0, 0, 0, 0, 0]).is_none());
}

#[test]
fn test_truncates_to_total_length() {
    let c = Configuration::new(&[9, 2, 9, 0, 0, 1, 0, 0, 250, 0xAA, 0xBB]).unwrap();
    assert_eq!(c.num_interfaces(), 0);
    assert_eq!(c.configuration_value(), 1);
    assert_eq!(c.descriptors().count(), 1);
    assert_eq!(c.trailing_descriptors().count(), 0);
}

#[test]
fn test_malformed() {
    let c = Configuration(&[9, 2, 0, 0, 0, 1, 0, 0, 2, 5, 250, 0, 0, 0]);
    assert!(c.interface_alt_settings().next().is_none());
}

#[test]
#[rustfmt::skip]
fn test_webcam_alt_settings() {
    let c = Configuration::new(&[
        0x09, 0x02, 0x5c, 0x00, 0x02, 0x01, 0x00, 0x80, 0xfa,

        // interface association
        0x08, 0x0b, 0x00, 0x02, 0x0e, 0x03, 0x00, 0x05,

        // interface 0: video control
        0x09, 0x04, 0x00, 0x00, 0x01, 0x0e, 0x01, 0x00, 0x05,

        // VC header
        0x0d, 0x24, 0x01, 0x00, 0x01, 0x67, 0x00, 0xc0, 0xe1, 0xe4, 0x00, 0x01, 0x01,

        // interrupt endpoint
        0x07, 0x05, 0x83, 0x03, 0x10, 0x00, 0x06,

        // class-specific endpoint
        0x05, 0x25, 0x03, 0x80, 0x00,

        // interface 1 alt 0: video streaming, zero bandwidth
        0x09, 0x04, 0x01, 0x00, 0x00, 0x0e, 0x02, 0x00, 0x00,

        // interface 1 alt 1
        0x09, 0x04, 0x01, 0x01, 0x01, 0x0e, 0x02, 0x00, 0x00,
        0x07, 0x05, 0x81, 0x05, 0x80, 0x00, 0x01,

        // interface 1 alt 2: high-bandwidth
        0x09, 0x04, 0x01, 0x02, 0x01, 0x0e, 0x02, 0x00, 0x00,
        0x07, 0x05, 0x81, 0x05, 0x20, 0x0b, 0x01,
    ]).unwrap();

    assert_eq!(c.num_interfaces(), 2);

    let alts: Vec<_> = c.interface_alt_settings().collect();
    assert_eq!(alts.len(), 4);

    assert_eq!(alts[0].interface_number(), 0);
    assert_eq!(alts[0].class(), 0x0e);
    assert_eq!(alts[0].subclass(), 1);

    let mut descriptors = alts[0].descriptors();
    assert_eq!(descriptors.next().unwrap().descriptor_type(), DESCRIPTOR_TYPE_INTERFACE);
    assert_eq!(descriptors.next().unwrap().descriptor_type(), 0x24);
    assert_eq!(descriptors.next().unwrap().descriptor_type(), DESCRIPTOR_TYPE_ENDPOINT);
    assert_eq!(descriptors.next().unwrap().descriptor_type(), 0x25);
    assert!(descriptors.next().is_none());

    let ep = alts[0].endpoints().next().unwrap();
    assert_eq!(ep.address(), 0x83);
    assert_eq!(ep.transfer_type(), EndpointType::Interrupt);

    assert_eq!(alts[1].alternate_setting(), 0);
    assert!(alts[1].endpoints().next().is_none());

    let ep = alts[2].endpoints().next().unwrap();
    assert_eq!(alts[2].alternate_setting(), 1);
    assert_eq!(ep.direction(), Direction::In);
    assert_eq!(ep.transfer_type(), EndpointType::Isochronous);
    assert_eq!(ep.max_packet_size_raw(), 128);
    assert_eq!(ep.interval(), 1);

    let ep = alts[3].endpoints().next().unwrap();
    assert_eq!(ep.max_packet_size_raw(), 0x0b20);
}
