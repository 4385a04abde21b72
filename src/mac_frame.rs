//! MAC-layer frame shapes: blink, short, and long addressed frames, plus the
//! POLL/RANGE/RANGE_REPORT payload codecs that ride inside them.
//!
//! The frame-control byte is modeled as a bitfield rather than treated as
//! an opaque magic byte, since only two of its subfields vary for this
//! protocol.

use modular_bitfield::prelude::*;

use crate::address::{LongAddress, ShortAddress};
use crate::error::DecodeError;
use crate::timestamp::Timestamp;

/// PAN ID shared by every node in the ranging network.
pub const PAN_ID: u16 = 0xDECA;

/// First frame-control byte shared by short and long MAC frames.
pub const FC_1: u8 = 0x41;
/// Second frame-control byte for the 9-byte short MAC header.
pub const FC_2_SHORT: u8 = 0x88;
/// Second frame-control byte for the 15-byte long MAC header.
pub const FC_2_LONG: u8 = 0x8C;
/// Sole frame-control byte for the 4-byte blink frame.
pub const FC_1_BLINK: u8 = 0xC5;

pub const BLINK_LEN: usize = 4;
pub const SHORT_MAC_LEN: usize = 9;
pub const LONG_MAC_LEN: usize = 15;

/// Maximum frame length, header plus payload.
pub const LEN_DATA: usize = 90;

/// Fixed 4-byte entry size within a POLL payload.
pub const POLL_DEVICE_SIZE: usize = 4;
/// Fixed 12-byte entry size within a RANGE payload.
pub const RANGE_DEVICE_SIZE: usize = 12;
/// Fixed size of a RANGE_REPORT payload: `[range f32][rx_power f32]`.
pub const RANGE_REPORT_LEN: usize = 8;

/// Frame-control bitfield shared by short/long MAC headers. Every frame
/// this protocol emits is an unacknowledged, non-pending data frame with
/// PAN ID compression on — the subfields exist because the byte has them,
/// not because this protocol varies them.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameControl1 {
    pub frame_type: B3,
    pub security_enabled: bool,
    pub frame_pending: bool,
    pub ack_request: bool,
    pub pan_id_compress: bool,
    pub reserved: B1,
}

/// IEEE 802.15.4 frame type "Data", the only type this protocol ever sends.
const FRAME_TYPE_DATA: u8 = 1;

/// The canonical `FC_1` byte, built from [`FrameControl1`] rather than
/// hand-assembled, so the meaning of each bit stays documented at its
/// source.
fn build_fc1() -> u8 {
    FrameControl1::new()
        .with_frame_type(FRAME_TYPE_DATA)
        .with_pan_id_compress(true)
        .into_bytes()[0]
}

/// One of the four or five ranging exchange stages, or the two sentinel
/// values used when a frame cannot be classified.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Poll = 0,
    PollAck = 1,
    Range = 2,
    RangeReport = 3,
    Blink = 4,
    RangingInit = 5,
    TypeError = 254,
    RangeFailed = 255,
}

impl MessageType {
    pub fn from_byte(byte: u8) -> Option<MessageType> {
        Some(match byte {
            0 => MessageType::Poll,
            1 => MessageType::PollAck,
            2 => MessageType::Range,
            3 => MessageType::RangeReport,
            4 => MessageType::Blink,
            5 => MessageType::RangingInit,
            254 => MessageType::TypeError,
            255 => MessageType::RangeFailed,
            _ => return None,
        })
    }
}

/// Like [`MessageType::from_byte`], but reports which byte failed to
/// classify rather than discarding it.
pub fn decode_type_byte(byte: u8) -> Result<MessageType, DecodeError> {
    MessageType::from_byte(byte).ok_or(DecodeError::TypeByteUnknown { byte })
}

/// The three frame shapes a decoded buffer can take, each carrying the
/// offset at which its type byte (and therefore its payload) begins.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameShape {
    Blink,
    Short,
    Long,
}

/// Classify a received buffer by its leading frame-control bytes. Does not
/// look past the header; callers still need to check buffer length before
/// reading the payload.
pub fn detect_type(buf: &[u8]) -> Result<FrameShape, DecodeError> {
    if buf.len() < 2 {
        return Err(DecodeError::TooShort { have: buf.len(), need: 2 });
    }
    if buf[0] == FC_1_BLINK {
        return Ok(FrameShape::Blink);
    }
    if buf[0] == FC_1 && buf[1] == FC_2_LONG {
        return Ok(FrameShape::Long);
    }
    if buf[0] == FC_1 && buf[1] == FC_2_SHORT {
        return Ok(FrameShape::Short);
    }
    Err(DecodeError::UnknownFrameControl)
}

/// The type byte that follows whichever header `detect_type` found.
pub fn type_byte_offset(shape: FrameShape) -> usize {
    match shape {
        FrameShape::Blink => BLINK_LEN,
        FrameShape::Short => SHORT_MAC_LEN,
        FrameShape::Long => LONG_MAC_LEN,
    }
}

/// Stateful frame builder: owns the monotonic 8-bit sequence number stamped
/// into every outgoing frame.
#[derive(Debug, Clone)]
pub struct MacCodec {
    seq: u8,
}

impl MacCodec {
    pub fn new() -> Self {
        MacCodec { seq: 0 }
    }

    fn next_seq(&mut self) -> u8 {
        let s = self.seq;
        self.seq = self.seq.wrapping_add(1);
        s
    }

    /// `[FC_1_BLINK][seq][src_hi][src_lo]`, header only. Payload (the known-
    /// peers list) is appended by the caller.
    pub fn build_blink(&mut self, src: ShortAddress, out: &mut [u8]) -> usize {
        let seq = self.next_seq();
        let src_bytes = src.0.to_be_bytes();
        out[0] = FC_1_BLINK;
        out[1] = seq;
        out[2] = src_bytes[0];
        out[3] = src_bytes[1];
        BLINK_LEN
    }

    pub fn decode_blink_src(buf: &[u8]) -> Result<ShortAddress, DecodeError> {
        if buf.len() < BLINK_LEN {
            return Err(DecodeError::TooShort { have: buf.len(), need: BLINK_LEN });
        }
        Ok(ShortAddress(u16::from_be_bytes([buf[2], buf[3]])))
    }

    /// `[FC_1][FC_2_SHORT][seq][PAN_lo][PAN_hi][dst_lo][dst_hi][src_lo][src_hi]`.
    pub fn build_short(&mut self, src: ShortAddress, dst: ShortAddress, out: &mut [u8]) -> usize {
        let seq = self.next_seq();
        let pan = PAN_ID.to_le_bytes();
        let dst_bytes = dst.0.to_le_bytes();
        let src_bytes = src.0.to_le_bytes();
        out[0] = build_fc1();
        out[1] = FC_2_SHORT;
        out[2] = seq;
        out[3] = pan[0];
        out[4] = pan[1];
        out[5] = dst_bytes[0];
        out[6] = dst_bytes[1];
        out[7] = src_bytes[0];
        out[8] = src_bytes[1];
        SHORT_MAC_LEN
    }

    pub fn decode_short_src(buf: &[u8]) -> Result<ShortAddress, DecodeError> {
        if buf.len() < SHORT_MAC_LEN {
            return Err(DecodeError::TooShort { have: buf.len(), need: SHORT_MAC_LEN });
        }
        Ok(ShortAddress(u16::from_le_bytes([buf[7], buf[8]])))
    }

    pub fn decode_short_dst(buf: &[u8]) -> Result<ShortAddress, DecodeError> {
        if buf.len() < SHORT_MAC_LEN {
            return Err(DecodeError::TooShort { have: buf.len(), need: SHORT_MAC_LEN });
        }
        Ok(ShortAddress(u16::from_le_bytes([buf[5], buf[6]])))
    }

    /// `[FC_1][FC_2_LONG][seq][PAN_lo][PAN_hi][dst_eui reversed (8B)][src_lo][src_hi]`.
    /// The destination EUI-64 is written most-significant-byte-first at
    /// offset 5, the reverse of its little-endian in-memory storage — the
    /// byte reversal happens exactly once, here, and nowhere above this layer.
    pub fn build_long(&mut self, src: ShortAddress, dst_eui: LongAddress, out: &mut [u8]) -> usize {
        let seq = self.next_seq();
        let pan = PAN_ID.to_le_bytes();
        out[0] = build_fc1();
        out[1] = FC_2_LONG;
        out[2] = seq;
        out[3] = pan[0];
        out[4] = pan[1];
        for i in 0..8 {
            out[5 + i] = dst_eui.0[7 - i];
        }
        let src_bytes = src.0.to_le_bytes();
        out[13] = src_bytes[0];
        out[14] = src_bytes[1];
        LONG_MAC_LEN
    }

    pub fn decode_long_src(buf: &[u8]) -> Result<ShortAddress, DecodeError> {
        if buf.len() < LONG_MAC_LEN {
            return Err(DecodeError::TooShort { have: buf.len(), need: LONG_MAC_LEN });
        }
        Ok(ShortAddress(u16::from_le_bytes([buf[13], buf[14]])))
    }

    pub fn decode_long_dst_eui(buf: &[u8]) -> Result<LongAddress, DecodeError> {
        if buf.len() < LONG_MAC_LEN {
            return Err(DecodeError::TooShort { have: buf.len(), need: LONG_MAC_LEN });
        }
        let mut eui = [0u8; 8];
        for i in 0..8 {
            eui[7 - i] = buf[5 + i];
        }
        Ok(LongAddress(eui))
    }
}

impl Default for MacCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a blink's trailing known-peers list: `[N][addr...]`, each address
/// 2 bytes little-endian. Lets an anchor skip a redundant
/// RANGING_INIT when the blinking tag already lists it.
pub fn encode_known_peers_payload(addrs: &[ShortAddress], out: &mut [u8]) -> usize {
    out[0] = addrs.len() as u8;
    let mut offset = 1;
    for a in addrs {
        let bytes = a.0.to_le_bytes();
        out[offset] = bytes[0];
        out[offset + 1] = bytes[1];
        offset += 2;
    }
    offset
}

pub fn known_peers_count(buf: &[u8]) -> Result<usize, DecodeError> {
    if buf.is_empty() {
        return Err(DecodeError::PayloadTruncated);
    }
    Ok(buf[0] as usize)
}

pub fn decode_known_peer(buf: &[u8], index: usize) -> Result<ShortAddress, DecodeError> {
    if buf.is_empty() {
        return Err(DecodeError::PayloadTruncated);
    }
    let n = buf[0] as usize;
    if index >= n {
        return Err(DecodeError::PayloadTruncated);
    }
    let offset = 1 + index * 2;
    if buf.len() < offset + 2 {
        return Err(DecodeError::PayloadTruncated);
    }
    Ok(ShortAddress(u16::from_le_bytes([buf[offset], buf[offset + 1]])))
}

/// One slot entry inside a POLL payload: a peer's short address and the
/// reply-delay slot assigned to it.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollEntry {
    pub short_address: ShortAddress,
    pub reply_time_us: u16,
}

/// Encode a POLL payload: `[N][entries...]`, each entry 4 bytes
/// (`POLL_DEVICE_SIZE`). Returns the number of bytes written.
pub fn encode_poll_payload(entries: &[PollEntry], out: &mut [u8]) -> usize {
    out[0] = entries.len() as u8;
    let mut offset = 1;
    for e in entries {
        let addr = e.short_address.0.to_le_bytes();
        let reply = e.reply_time_us.to_le_bytes();
        out[offset] = addr[0];
        out[offset + 1] = addr[1];
        out[offset + 2] = reply[0];
        out[offset + 3] = reply[1];
        offset += POLL_DEVICE_SIZE;
    }
    offset
}

/// Decode a POLL payload into an iterator-friendly accessor. `buf` must
/// start at the `N` byte (i.e. right after the frame's type byte).
pub fn decode_poll_entry(buf: &[u8], index: usize) -> Result<PollEntry, DecodeError> {
    if buf.is_empty() {
        return Err(DecodeError::PayloadTruncated);
    }
    let n = buf[0] as usize;
    if index >= n {
        return Err(DecodeError::PayloadTruncated);
    }
    let offset = 1 + index * POLL_DEVICE_SIZE;
    if buf.len() < offset + POLL_DEVICE_SIZE {
        return Err(DecodeError::PayloadTruncated);
    }
    Ok(PollEntry {
        short_address: ShortAddress(u16::from_le_bytes([buf[offset], buf[offset + 1]])),
        reply_time_us: u16::from_le_bytes([buf[offset + 2], buf[offset + 3]]),
    })
}

pub fn poll_device_count(buf: &[u8]) -> Result<usize, DecodeError> {
    if buf.is_empty() {
        return Err(DecodeError::PayloadTruncated);
    }
    Ok(buf[0] as usize)
}

/// One slot entry inside a RANGE payload: a peer's short address plus the
/// two pre-computed tag-side deltas.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeEntry {
    pub short_address: ShortAddress,
    pub delta1: Timestamp,
    pub delta2: Timestamp,
}

/// Encode a RANGE payload: `[N][entries...]`, each entry 12 bytes
/// (`RANGE_DEVICE_SIZE`: addr 2B, reserved 2B, delta1 5B, delta2 5B).
pub fn encode_range_payload(entries: &[RangeEntry], out: &mut [u8]) -> usize {
    out[0] = entries.len() as u8;
    let mut offset = 1;
    for e in entries {
        let addr = e.short_address.0.to_le_bytes();
        out[offset] = addr[0];
        out[offset + 1] = addr[1];
        out[offset + 2] = 0;
        out[offset + 3] = 0;
        out[offset + 4..offset + 9].copy_from_slice(&e.delta1.to_le_bytes5());
        out[offset + 9..offset + 14].copy_from_slice(&e.delta2.to_le_bytes5());
        offset += RANGE_DEVICE_SIZE;
    }
    offset
}

pub fn decode_range_entry(buf: &[u8], index: usize) -> Result<RangeEntry, DecodeError> {
    if buf.is_empty() {
        return Err(DecodeError::PayloadTruncated);
    }
    let n = buf[0] as usize;
    if index >= n {
        return Err(DecodeError::PayloadTruncated);
    }
    let offset = 1 + index * RANGE_DEVICE_SIZE;
    if buf.len() < offset + RANGE_DEVICE_SIZE {
        return Err(DecodeError::PayloadTruncated);
    }
    let mut d1 = [0u8; 5];
    d1.copy_from_slice(&buf[offset + 4..offset + 9]);
    let mut d2 = [0u8; 5];
    d2.copy_from_slice(&buf[offset + 9..offset + 14]);
    Ok(RangeEntry {
        short_address: ShortAddress(u16::from_le_bytes([buf[offset], buf[offset + 1]])),
        delta1: Timestamp::from_le_bytes5(d1),
        delta2: Timestamp::from_le_bytes5(d2),
    })
}

pub fn range_device_count(buf: &[u8]) -> Result<usize, DecodeError> {
    if buf.is_empty() {
        return Err(DecodeError::PayloadTruncated);
    }
    Ok(buf[0] as usize)
}

/// `[range f32 LE][rx_power f32 LE]`.
pub fn encode_range_report_payload(range_m: f32, rx_power_dbm: f32, out: &mut [u8]) -> usize {
    out[0..4].copy_from_slice(&range_m.to_le_bytes());
    out[4..8].copy_from_slice(&rx_power_dbm.to_le_bytes());
    RANGE_REPORT_LEN
}

pub fn decode_range_report_payload(buf: &[u8]) -> Result<(f32, f32), DecodeError> {
    if buf.len() < RANGE_REPORT_LEN {
        return Err(DecodeError::TooShort { have: buf.len(), need: RANGE_REPORT_LEN });
    }
    let mut range_bytes = [0u8; 4];
    range_bytes.copy_from_slice(&buf[0..4]);
    let mut power_bytes = [0u8; 4];
    power_bytes.copy_from_slice(&buf[4..8]);
    Ok((f32::from_le_bytes(range_bytes), f32::from_le_bytes(power_bytes)))
}
