// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! SDPCM framing: the length-tagged, channel-multiplexed envelope wrapped
//! around every frame exchanged with the WLAN chip, plus the secondary
//! headers carried inside it (BDC for data frames, CDC for control frames,
//! the vendor event envelope for event frames).

use crate::pool::Packet;
use crate::utils::{
    BDC_PADDING_SIZE, BRCM_OUI, ETHERTYPE_IPV4, ETHER_TYPE_BRCM, EVT_SUBTYPE, EVT_USER_SUBTYPE,
    TOS_PRIORITY_MAP,
};

use enum_primitive::cast::FromPrimitive;
use enum_primitive::enum_from_primitive;

use wlan_hil::ErrorCode;

/// Largest frame the link carries, bus framing included.
pub const LINK_MTU: usize = 1600;

/// Headroom a data packet needs in front of its Ethernet payload.
pub const DATA_HEADROOM: usize = SdpcmHeader::SIZE + BDC_PADDING_SIZE + BdcHeader::SIZE;

/// Headroom a control packet needs in front of its IOCTL payload.
pub const CONTROL_HEADROOM: usize = SdpcmHeader::SIZE + CdcHeader::SIZE;

/// Byte offset of the sequence number within an encoded frame. The live
/// sequence is stamped here as the frame leaves the send queue.
pub(crate) const SEQUENCE_OFFSET: usize = 4;

macro_rules! parse {
    (
        $(#[$attr_struct:meta])* $vis_struct:vis struct $name:ident { $($(#[$attr_field:meta])* $vis_field:vis $field:ident : $field_ty:tt),* $(,)? }
        ) => {
        $(#[$attr_struct])*
        $vis_struct struct $name {
            $($(#[$attr_field])* $vis_field $field : parse!(@ty $field_ty)),*,
        }
        impl $name {
            #![allow(unused)]
            pub const SIZE: usize = 0 $(+ parse!(@size $field_ty))*;
            pub const fn into_bytes(self) -> [u8; Self::SIZE] {
                let mut __bytes = [0u8; Self::SIZE];
                let mut __len = 0;
                $(
                    parse!(@f __len, __bytes, self.$field, $field_ty);
                )*
                __bytes
            }
            pub const fn from_bytes(__bytes: &[u8]) -> Self {
                let mut __len = 0;
                $(
                    parse!(@from_f __len, __bytes, $field, $field_ty);
                )*
                Self {
                    $($field),*
                }
            }
        }
    };

    // Rust-side type and wire size of each field kind.
    (@ty u8) => { u8 };
    (@ty u16) => { u16 };
    (@ty u16be) => { u16 };
    (@ty u32) => { u32 };
    (@ty u32be) => { u32 };
    (@ty [u8; $N:literal]) => { [u8; $N] };
    (@size u8) => { 1 };
    (@size u16) => { 2 };
    (@size u16be) => { 2 };
    (@size u32) => { 4 };
    (@size u32be) => { 4 };
    (@size [u8; $N:literal]) => { $N };

    // Inner macros for copying the bytes from the buffer into a field.
    (@from_f $len: ident, $bytes:ident, $field:ident, u8) => {
        let $field = $bytes[$len];
        $len += 1;
    };
    (@from_f $len: ident, $bytes:ident, $field:ident, u16) => {
        let $field = u16::from_le_bytes([$bytes[$len], $bytes[$len + 1]]);
        $len += 2;
    };
    (@from_f $len: ident, $bytes:ident, $field:ident, u16be) => {
        let $field = u16::from_be_bytes([$bytes[$len], $bytes[$len + 1]]);
        $len += 2;
    };
    (@from_f $len: ident, $bytes:ident, $field:ident, u32) => {
        let $field = u32::from_le_bytes([$bytes[$len], $bytes[$len + 1], $bytes[$len + 2], $bytes[$len + 3]]);
        $len += 4;
    };
    (@from_f $len: ident, $bytes:ident, $field:ident, u32be) => {
        let $field = u32::from_be_bytes([$bytes[$len], $bytes[$len + 1], $bytes[$len + 2], $bytes[$len + 3]]);
        $len += 4;
    };
    (@from_f $len: ident, $bytes:ident, $field:ident, [u8; $N:literal]) => {
        let mut $field = [0u8; $N];
        let mut __idx = 0;
        while __idx < $N {
            $field[__idx] = $bytes[$len];
            __idx += 1;
            $len += 1;
        }
    };

    // Inner macros for copying the field value to the bytes buffer.
    (@f $len:ident, $bytes:ident, $field:expr, u8) => {
        $bytes[$len] = $field;
        $len += 1;
    };
    (@f $len:ident, $bytes: ident, $field: expr, u16) => {
        let __field_bytes = $field.to_le_bytes();
        $bytes[$len] = __field_bytes[0];
        $bytes[$len + 1] = __field_bytes[1];
        $len += 2;
    };
    (@f $len:ident, $bytes: ident, $field: expr, u16be) => {
        let __field_bytes = $field.to_be_bytes();
        $bytes[$len] = __field_bytes[0];
        $bytes[$len + 1] = __field_bytes[1];
        $len += 2;
    };
    (@f $len:ident, $bytes: ident, $field: expr, u32) => {
        let __field_bytes = $field.to_le_bytes();
        $bytes[$len] = __field_bytes[0];
        $bytes[$len + 1] = __field_bytes[1];
        $bytes[$len + 2] = __field_bytes[2];
        $bytes[$len + 3] = __field_bytes[3];
        $len += 4;
    };
    (@f $len:ident, $bytes: ident, $field: expr, u32be) => {
        let __field_bytes = $field.to_be_bytes();
        $bytes[$len] = __field_bytes[0];
        $bytes[$len + 1] = __field_bytes[1];
        $bytes[$len + 2] = __field_bytes[2];
        $bytes[$len + 3] = __field_bytes[3];
        $len += 4;
    };
    (@f $len:ident, $bytes:ident, $field:expr, [u8; $N:literal]) => {
        let mut __idx = 0;
        while __idx < $N {
            $bytes[$len] = $field[__idx];
            $len += 1;
            __idx += 1;
        }
    };
}

enum_from_primitive! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ChannelType {
        Control = 0,
        Event = 1,
        Data = 2,
    }
}

/// Network interfaces multiplexed over the one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    Station = 0,
    Ap = 1,
}

pub const INTERFACE_COUNT: usize = 2;

impl Interface {
    /// Resolve the interface carried in the low 4 bits of
    /// `BdcHeader::flags2`. Indexes above the supported interface count fall
    /// back to the station interface.
    pub fn from_index_bits(bits: u8) -> Interface {
        match bits & crate::utils::BDC_FLAG2_IF_MASK {
            1 => Interface::Ap,
            _ => Interface::Station,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

parse!(
    /// SDPCM software header
    #[derive(Clone, Debug)]
    pub struct SdpcmHeader {
        pub len: u16,
        pub len_inv: u16,
        pub sequence: u8,
        pub channel_and_flags: u8,
        pub next_length: u8,
        pub header_length: u8,
        pub wireless_flow_control: u8,
        pub bus_data_credit: u8,
        pub reserved: [u8; 2],
    }
);

parse!(
    /// BDC (bulk data communication) header, carried on data frames
    #[derive(Clone, Debug)]
    pub struct BdcHeader {
        pub flags: u8,
        pub priority: u8,
        pub flags2: u8,
        pub data_offset: u8,
    }
);

parse!(
    /// CDC (control data communication) header, carried on IOCTL frames.
    /// `flags` packs the Set/Get action (bit 1), the target interface
    /// (bits 12..16) and the correlation id (bits 16..32).
    #[derive(Clone, Debug)]
    pub struct CdcHeader {
        pub cmd: u32,
        pub len: u32,
        pub flags: u32,
        pub status: u32,
    }
);

parse!(
    #[derive(Clone, Debug)]
    pub struct EthernetHeader {
        pub destination_address: [u8; 6],
        pub source_address: [u8; 6],
        pub ethertype: u16be,
    }
);

parse!(
    /// Vendor sub-envelope tag in front of every event message.
    #[derive(Clone, Debug)]
    pub struct EventHeader {
        pub subtype: u16be,
        pub length: u16be,
        pub version: u8,
        pub oui: [u8; 3],
        pub user_subtype: u16be,
    }
);

parse!(
    /// Decoded event message. All numeric fields are big-endian on the wire.
    #[derive(Clone, Debug)]
    pub struct EventMessage {
        pub version: u16be,
        pub flags: u16be,
        pub event_type: u32be,
        pub status: u32be,
        pub reason: u32be,
        pub auth_type: u32be,
        pub datalen: u32be,
        pub addr: [u8; 6],
        pub ifname: [u8; 16],
        pub ifidx: u8,
        pub bsscfgidx: u8,
    }
);

parse!(
    /// Classic compact subscription mask payload for `bsscfg:event_msgs`.
    #[derive(Clone, Debug)]
    pub struct EventMask {
        pub iface: u32,
        pub events: [u8; 16],
    }
);

parse!(
    /// Leading fields of the extended `event_msgs_ext` payload; the
    /// variable-length mask follows.
    #[derive(Clone, Debug)]
    pub struct EventMaskExtHeader {
        pub version: u8,
        pub command: u8,
        pub length: u8,
        pub max_get_size: u8,
    }
);

enum_from_primitive! {
    /// Firmware event codes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Event {
        SetSsid = 0,
        Join = 1,
        Start = 2,
        Auth = 3,
        Deauth = 5,
        DeauthInd = 6,
        Assoc = 7,
        AssocInd = 8,
        Disassoc = 11,
        DisassocInd = 12,
        Link = 16,
        Roam = 19,
        Prune = 23,
        Radio = 40,
        PskSup = 46,
        If = 54,
        EscanResult = 69,
        TwtSetup = 134,
    }
}

/// Two types of IOCTL operations: get and set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum IoctlType {
    Get = 0,
    Set = 2,
}

/// IOCTL commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum IoctlCommand {
    Up = 2,
    Down = 3,
    SetInfra = 20,
    SetAuth = 22,
    SetSsid = 26,
    SetChannel = 30,
    Disassoc = 52,
    SetAntdiv = 64,
    SetGmode = 110,
    SetAp = 118,
    SetWsec = 134,
    SetBand = 142,
    SetWpaAuth = 165,
    GetVar = 262,
    SetVar = 263,
    SetWsecPmk = 268,
}

/// Validate and decode the software header at the front of a received
/// frame. Returns `None` for anything malformed: a length tag that does not
/// match its bitwise inverse, a frame shorter than the header, or a frame
/// longer than the link MTU or the bytes actually received. Has no side
/// effects; the caller releases the buffer on failure.
pub(crate) fn decode_header(data: &[u8]) -> Option<SdpcmHeader> {
    if data.len() < SdpcmHeader::SIZE {
        return None;
    }
    let header = SdpcmHeader::from_bytes(data);
    if header.len != !header.len_inv {
        return None;
    }
    let frame_len = header.len as usize;
    if frame_len < SdpcmHeader::SIZE || frame_len > LINK_MTU || frame_len > data.len() {
        return None;
    }
    Some(header)
}

/// Write the software header (and, for data frames, the two pad bytes that
/// precede the BDC header) over the packet's headroom. The sequence number
/// is left zero; the send queue stamps the live value at transmit time so
/// encoding can happen before the frame's position in line is known.
pub(crate) fn encode(packet: &mut Packet, channel: ChannelType) -> Result<(), ErrorCode> {
    let header_length = match channel {
        ChannelType::Data => SdpcmHeader::SIZE + BDC_PADDING_SIZE,
        _ => SdpcmHeader::SIZE,
    };
    packet.adjust_front(-(header_length as isize))?;
    let total = packet.len();
    let header = SdpcmHeader {
        len: total as u16,
        len_inv: !(total as u16),
        sequence: 0,
        channel_and_flags: channel as u8,
        next_length: 0,
        header_length: header_length as u8,
        wireless_flow_control: 0,
        bus_data_credit: 0,
        reserved: [0; 2],
    };
    let data = packet.data_mut();
    data[..SdpcmHeader::SIZE].copy_from_slice(&header.into_bytes());
    if let ChannelType::Data = channel {
        data[SdpcmHeader::SIZE] = 0;
        data[SdpcmHeader::SIZE + 1] = 0;
    }
    Ok(())
}

/// 802.1D priority for an outgoing Ethernet frame: the IP precedence bits of
/// an IPv4 payload remapped through the 8-entry priority table.
/// Non-IPv4 frames go out at best effort.
pub(crate) fn frame_priority(frame: &[u8]) -> u8 {
    const ETHERTYPE_OFFSET: usize = 12;
    const TOS_OFFSET: usize = EthernetHeader::SIZE + 1;
    if frame.len() <= TOS_OFFSET {
        return 0;
    }
    let ethertype = u16::from_be_bytes([frame[ETHERTYPE_OFFSET], frame[ETHERTYPE_OFFSET + 1]]);
    if ethertype != ETHERTYPE_IPV4 {
        return 0;
    }
    TOS_PRIORITY_MAP[(frame[TOS_OFFSET] >> 5) as usize]
}

/// A validated event frame: the converted message plus the location of the
/// event payload within the decoded area.
pub(crate) struct EventFrame {
    pub message: EventMessage,
    pub payload_offset: usize,
    pub payload_len: usize,
}

/// Decode the vendor event envelope. `area` starts at the embedded Ethernet
/// header and ends at the frame's declared length. Returns `None` if the
/// vendor marker, OUI or subtype do not match, or if the declared inner data
/// length overruns the received bytes.
pub(crate) fn decode_event(area: &[u8]) -> Option<EventFrame> {
    const HEADERS: usize = EthernetHeader::SIZE + EventHeader::SIZE + EventMessage::SIZE;
    if area.len() < HEADERS {
        return None;
    }
    let eth = EthernetHeader::from_bytes(area);
    if eth.ethertype != ETHER_TYPE_BRCM {
        return None;
    }
    let vendor = EventHeader::from_bytes(&area[EthernetHeader::SIZE..]);
    if vendor.subtype != EVT_SUBTYPE
        || vendor.oui != BRCM_OUI
        || vendor.user_subtype != EVT_USER_SUBTYPE
    {
        return None;
    }
    let mut message =
        EventMessage::from_bytes(&area[EthernetHeader::SIZE + EventHeader::SIZE..]);
    let payload_len = message.datalen as usize;
    if payload_len > area.len() - HEADERS {
        return None;
    }
    apply_enumeration_offsets(&mut message);
    Some(EventFrame {
        message,
        payload_offset: HEADERS,
        payload_len,
    })
}

// The firmware reuses status/reason numbering across event classes; bias
// the affected classes into disjoint ranges before anyone looks at them.
fn apply_enumeration_offsets(message: &mut EventMessage) {
    use crate::utils::{
        DOT11_RC_REASON_OFFSET, DOT11_SC_STATUS_OFFSET, PRUNE_REASON_OFFSET, SUP_REASON_OFFSET,
        SUP_STATUS_OFFSET,
    };
    match Event::from_u32(message.event_type) {
        Some(Event::PskSup) => {
            message.status = message.status.wrapping_add(SUP_STATUS_OFFSET);
            message.reason = message.reason.wrapping_add(SUP_REASON_OFFSET);
        }
        Some(Event::Prune) => {
            message.reason = message.reason.wrapping_add(PRUNE_REASON_OFFSET);
        }
        Some(Event::Deauth) | Some(Event::DeauthInd) => {
            message.status = message.status.wrapping_add(DOT11_SC_STATUS_OFFSET);
            message.reason = message.reason.wrapping_add(DOT11_RC_REASON_OFFSET);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::pool::{BufferPool, Direction};
    use std::boxed::Box;

    fn test_pool() -> &'static BufferPool<'static> {
        let pool = Box::leak(Box::new(BufferPool::new()));
        let _ = pool.give_tx_buffer(Box::leak(Box::new([0u8; 256])));
        pool
    }

    #[test]
    fn sdpcm_header_round_trip() {
        let header = SdpcmHeader {
            len: 0x0140,
            len_inv: !0x0140,
            sequence: 7,
            channel_and_flags: ChannelType::Data as u8,
            next_length: 0,
            header_length: 14,
            wireless_flow_control: 0,
            bus_data_credit: 12,
            reserved: [0; 2],
        };
        let bytes = header.into_bytes();
        assert_eq!(bytes.len(), 12);
        let parsed = SdpcmHeader::from_bytes(&bytes);
        assert_eq!(parsed.len, 0x0140);
        assert_eq!(parsed.sequence, 7);
        assert_eq!(parsed.bus_data_credit, 12);
    }

    #[test]
    fn decode_header_rejects_bad_inverse_length() {
        let mut header = SdpcmHeader {
            len: 64,
            len_inv: !64,
            sequence: 0,
            channel_and_flags: 0,
            next_length: 0,
            header_length: 12,
            wireless_flow_control: 0,
            bus_data_credit: 0,
            reserved: [0; 2],
        };
        let mut frame = [0u8; 64];
        frame[..12].copy_from_slice(&header.clone().into_bytes());
        assert!(decode_header(&frame).is_some());

        header.len_inv = !65;
        frame[..12].copy_from_slice(&header.into_bytes());
        assert!(decode_header(&frame).is_none());
    }

    #[test]
    fn decode_header_bounds_frame_length() {
        let mut frame = [0u8; 64];
        // Shorter than the header itself.
        let runt = SdpcmHeader {
            len: 4,
            len_inv: !4,
            sequence: 0,
            channel_and_flags: 0,
            next_length: 0,
            header_length: 12,
            wireless_flow_control: 0,
            bus_data_credit: 0,
            reserved: [0; 2],
        };
        frame[..12].copy_from_slice(&runt.clone().into_bytes());
        assert!(decode_header(&frame).is_none());

        // Longer than the bytes that actually arrived.
        let overrun = SdpcmHeader {
            len: 128,
            len_inv: !128,
            ..runt
        };
        frame[..12].copy_from_slice(&overrun.into_bytes());
        assert!(decode_header(&frame).is_none());

        assert!(decode_header(&frame[..4]).is_none());
    }

    #[test]
    fn encode_data_frame_layout() {
        let pool = test_pool();
        let mut packet = pool
            .allocate(Direction::Tx, DATA_HEADROOM + 4, 0)
            .unwrap();
        packet.adjust_front(DATA_HEADROOM as isize).unwrap();
        packet.data_mut().copy_from_slice(&[0xaa; 4]);
        // The BDC header sits directly in front of the payload.
        packet.adjust_front(-(BdcHeader::SIZE as isize)).unwrap();
        let bdc = BdcHeader {
            flags: 0x20,
            priority: 5,
            flags2: 0,
            data_offset: 0,
        };
        packet.data_mut()[..BdcHeader::SIZE].copy_from_slice(&bdc.into_bytes());

        encode(&mut packet, ChannelType::Data).unwrap();
        let data = packet.data();
        let header = SdpcmHeader::from_bytes(data);
        assert_eq!(header.len as usize, DATA_HEADROOM + 4);
        assert_eq!(header.len, !header.len_inv);
        assert_eq!(header.sequence, 0);
        assert_eq!(header.channel_and_flags, ChannelType::Data as u8);
        assert_eq!(header.header_length as usize, SdpcmHeader::SIZE + 2);
        // Pad bytes are zeroed, BDC follows them.
        assert_eq!(&data[12..14], &[0, 0]);
        assert_eq!(data[15], 5);
        pool.release(packet);
    }

    #[test]
    fn encode_control_frame_layout() {
        let pool = test_pool();
        let mut packet = pool
            .allocate(Direction::Tx, CONTROL_HEADROOM + 8, 0)
            .unwrap();
        packet.adjust_front(CONTROL_HEADROOM as isize).unwrap();
        packet.adjust_front(-(CdcHeader::SIZE as isize)).unwrap();
        encode(&mut packet, ChannelType::Control).unwrap();
        let header = SdpcmHeader::from_bytes(packet.data());
        assert_eq!(header.header_length as usize, SdpcmHeader::SIZE);
        assert_eq!(header.channel_and_flags, ChannelType::Control as u8);
        assert_eq!(header.len as usize, CONTROL_HEADROOM + 8);
        pool.release(packet);
    }

    #[test]
    fn priority_follows_ip_precedence() {
        let mut frame = [0u8; 64];
        frame[12] = 0x08;
        frame[13] = 0x00;
        // DSCP 0x28 (CS5): TOS 0xa0, precedence 5.
        frame[15] = 0xa0;
        assert_eq!(frame_priority(&frame), 5);

        // Precedence 3 remaps to best effort.
        frame[15] = 0x60;
        assert_eq!(frame_priority(&frame), 0);

        // Not IPv4.
        frame[12] = 0x86;
        frame[13] = 0xdd;
        assert_eq!(frame_priority(&frame), 0);
    }

    fn event_area(event_type: u32, status: u32, reason: u32, datalen: u32) -> std::vec::Vec<u8> {
        let mut area = std::vec::Vec::new();
        let eth = EthernetHeader {
            destination_address: [0xff; 6],
            source_address: [2; 6],
            ethertype: ETHER_TYPE_BRCM,
        };
        let vendor = EventHeader {
            subtype: EVT_SUBTYPE,
            length: 0,
            version: 0,
            oui: BRCM_OUI,
            user_subtype: EVT_USER_SUBTYPE,
        };
        let message = EventMessage {
            version: 1,
            flags: 0,
            event_type,
            status,
            reason,
            auth_type: 0,
            datalen,
            addr: [0; 6],
            ifname: [0; 16],
            ifidx: 0,
            bsscfgidx: 0,
        };
        area.extend_from_slice(&eth.into_bytes());
        area.extend_from_slice(&vendor.into_bytes());
        area.extend_from_slice(&message.into_bytes());
        area
    }

    #[test]
    fn event_numeric_fields_are_big_endian() {
        let area = event_area(Event::Link as u32, 0x0102, 0, 0);
        // event_type starts after the two u16 fields of the message.
        let message_start = EthernetHeader::SIZE + EventHeader::SIZE;
        assert_eq!(
            &area[message_start + 4..message_start + 8],
            &[0, 0, 0, 16]
        );
        let frame = decode_event(&area).unwrap();
        assert_eq!(frame.message.event_type, Event::Link as u32);
        assert_eq!(frame.message.status, 0x0102);
    }

    #[test]
    fn event_vendor_mismatch_is_dropped() {
        let mut area = event_area(Event::Link as u32, 0, 0, 0);
        // Corrupt the OUI.
        let oui_at = EthernetHeader::SIZE + 5;
        area[oui_at] ^= 0xff;
        assert!(decode_event(&area).is_none());

        let mut area = event_area(Event::Link as u32, 0, 0, 0);
        area[12] = 0x08;
        area[13] = 0x00;
        assert!(decode_event(&area).is_none());
    }

    #[test]
    fn event_inner_length_is_bounds_checked() {
        let mut area = event_area(Event::Link as u32, 0, 0, 4);
        assert!(decode_event(&area).is_none());
        area.extend_from_slice(&[1, 2, 3, 4]);
        let frame = decode_event(&area).unwrap();
        assert_eq!(frame.payload_len, 4);
        assert_eq!(&area[frame.payload_offset..][..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn enumeration_offsets_are_applied() {
        let area = event_area(Event::PskSup as u32, 2, 3, 0);
        let frame = decode_event(&area).unwrap();
        assert_eq!(frame.message.status, 2 + 256);
        assert_eq!(frame.message.reason, 3 + 256);

        let area = event_area(Event::Prune as u32, 2, 3, 0);
        let frame = decode_event(&area).unwrap();
        assert_eq!(frame.message.status, 2);
        assert_eq!(frame.message.reason, 3 + 256);

        let area = event_area(Event::DeauthInd as u32, 2, 3, 0);
        let frame = decode_event(&area).unwrap();
        assert_eq!(frame.message.status, 2 + 512);
        assert_eq!(frame.message.reason, 3 + 768);

        let area = event_area(Event::Link as u32, 2, 3, 0);
        let frame = decode_event(&area).unwrap();
        assert_eq!(frame.message.status, 2);
        assert_eq!(frame.message.reason, 3);
    }
}
