use super::Direction;

/// Type field of `bmRequestType`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum ControlType {
    Standard = 0,
    Class = 1,
    Vendor = 2,
}

/// Recipient field of `bmRequestType`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Recipient {
    Device = 0,
    Interface = 1,
    Endpoint = 2,
    Other = 3,
}

/// Standard request codes used by this crate.
pub mod request {
    /// `SET_INTERFACE` standard request.
    pub const SET_INTERFACE: u8 = 0x0B;
}

pub const SETUP_PACKET_SIZE: usize = 8;

/// SETUP stage of a control transfer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SetupPacket {
    pub direction: Direction,

    #[doc(alias = "bmRequestType")]
    pub control_type: ControlType,

    #[doc(alias = "bmRequestType")]
    pub recipient: Recipient,

    #[doc(alias = "bRequest")]
    pub request: u8,

    #[doc(alias = "wValue")]
    pub value: u16,

    #[doc(alias = "wIndex")]
    pub index: u16,

    #[doc(alias = "wLength")]
    pub length: u16,
}

impl SetupPacket {
    /// Class request addressed to an interface.
    pub fn class_interface(
        direction: Direction,
        request: u8,
        value: u16,
        interface: u8,
        length: u16,
    ) -> Self {
        SetupPacket {
            direction,
            control_type: ControlType::Class,
            recipient: Recipient::Interface,
            request,
            value,
            index: interface as u16,
            length,
        }
    }

    /// Standard `SET_INTERFACE` request selecting `alt_setting` of `interface`.
    pub fn set_interface(interface: u8, alt_setting: u8) -> Self {
        SetupPacket {
            direction: Direction::Out,
            control_type: ControlType::Standard,
            recipient: Recipient::Interface,
            request: request::SET_INTERFACE,
            value: alt_setting as u16,
            index: interface as u16,
            length: 0,
        }
    }

    #[doc(alias = "bmRequestType")]
    pub fn request_type(&self) -> u8 {
        ((self.direction as u8) << 7) | ((self.control_type as u8) << 5) | (self.recipient as u8)
    }

    /// Serialize to the 8 bytes sent on the wire.
    pub fn to_bytes(&self) -> [u8; SETUP_PACKET_SIZE] {
        [
            self.request_type(),
            self.request,
            (self.value & 0xFF) as u8,
            (self.value >> 8) as u8,
            (self.index & 0xFF) as u8,
            (self.index >> 8) as u8,
            (self.length & 0xFF) as u8,
            (self.length >> 8) as u8,
        ]
    }
}

#[test]
fn test_class_interface_setup() {
    let get_cur = SetupPacket::class_interface(Direction::In, 0x81, 0x0100, 1, 26);
    assert_eq!(get_cur.request_type(), 0xA1);
    assert_eq!(get_cur.to_bytes(), [0xA1, 0x81, 0x00, 0x01, 0x01, 0x00, 26, 0]);

    let set_cur = SetupPacket::class_interface(Direction::Out, 0x01, 0x0200, 3, 26);
    assert_eq!(set_cur.request_type(), 0x21);
    assert_eq!(set_cur.to_bytes(), [0x21, 0x01, 0x00, 0x02, 0x03, 0x00, 26, 0]);
}

#[test]
fn test_set_interface_setup() {
    let setup = SetupPacket::set_interface(1, 4);
    assert_eq!(setup.to_bytes(), [0x01, 0x0B, 0x04, 0x00, 0x01, 0x00, 0x00, 0x00]);
}
