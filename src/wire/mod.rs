//! Fixed-width wire framing for the two header layouts in use: the
//! sender-to-receivers header (29 bytes) and the receiver-to-sender header
//! (6 bytes). See [`SenderHeader`] and [`ReceiverHeader`].

pub mod deficit;

use std::convert::Infallible;

use octs::{BufTooShortOr, Decode, Encode, FixedEncodeLen, Read, Write};

/// Widens a `BufTooShortOr<Infallible>` into any other `BufTooShortOr<E>`.
///
/// There is no inhabited `Or` case to convert since `Infallible` cannot be
/// constructed, so this is a total, panic-free function.
fn widen<E>(err: BufTooShortOr<Infallible>) -> BufTooShortOr<E> {
    match err {
        BufTooShortOr::TooShort => BufTooShortOr::TooShort,
        BufTooShortOr::Or(never) => match never {},
    }
}

/// The closed set of packet types exchanged by the protocol.
///
/// Type `3` carries different meanings depending on direction: an
/// end-of-generation marker when sent by the sender, and a deficit report
/// when sent by a receiver. The wire representation is identical; only the
/// interpretation differs, which is why a single variant covers both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "fuzzing", derive(arbitrary::Arbitrary))]
#[repr(u16)]
pub enum PacketType {
    /// Advertisement (sender→receivers) / enrollment acknowledgement
    /// (receiver→sender).
    Advertise = 1,
    /// Data symbol, sender→receivers.
    Data = 2,
    /// End-of-generation marker (sender→receivers) or deficit report
    /// (receiver→sender).
    EndOfGenOrDeficit = 3,
    /// Generation-complete acknowledgement, receiver→sender.
    GenComplete = 4,
    /// Advance-generation notice, sender→receivers.
    Advance = 5,
    /// Transfer-complete notice, sender→receivers.
    Done = 6,
}

/// A packet type discriminant did not match any known [`PacketType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized packet type {0}")]
pub struct UnknownPacketType(pub u16);

impl TryFrom<u16> for PacketType {
    type Error = UnknownPacketType;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Advertise),
            2 => Ok(Self::Data),
            3 => Ok(Self::EndOfGenOrDeficit),
            4 => Ok(Self::GenComplete),
            5 => Ok(Self::Advance),
            6 => Ok(Self::Done),
            other => Err(UnknownPacketType(other)),
        }
    }
}

impl FixedEncodeLen for PacketType {
    const ENCODE_LEN: usize = u16::ENCODE_LEN;
}

impl Encode for PacketType {
    type Error = Infallible;

    fn encode(&self, mut dst: impl Write) -> Result<(), BufTooShortOr<Self::Error>> {
        dst.write(&(*self as u16))
    }
}

impl Decode for PacketType {
    type Error = UnknownPacketType;

    fn decode(mut src: impl Read) -> Result<Self, BufTooShortOr<Self::Error>> {
        let raw: u16 = src.read().map_err(widen)?;
        Self::try_from(raw).map_err(BufTooShortOr::Or)
    }
}

/// Sender→receivers header, 29 bytes little-endian.
///
/// `field_tag` and `field_tag_low` together preserve a legacy duplicate
/// from the reference wire format: the finite-field tag is packed once as
/// a full `u64` and once more, truncated, as a trailing byte. This is kept
/// byte-exact rather than cleaned up — see `DESIGN.md`.
///
/// For the uncoded variant the `seed` slot carries `seq` zero-extended to
/// 64 bits; which interpretation applies is fixed per deployment, never
/// per-packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzzing", derive(arbitrary::Arbitrary))]
pub struct SenderHeader {
    /// Packet type discriminant.
    pub packet_type: PacketType,
    /// RLNC coding seed (coded variant) or file slot index (uncoded
    /// variant), zero-extended to 64 bits.
    pub seed: u64,
    /// Finite-field tag, full width.
    pub field_tag: u64,
    /// Finite-field tag, truncated to one byte (legacy duplicate).
    pub field_tag_low: u8,
    /// Total length of the source file in bytes.
    pub total_bytes: u32,
    /// Bytes per data symbol.
    pub packet_bytes: u32,
    /// Symbols in the generation this packet belongs to (may be reduced
    /// for a short final generation).
    pub gen_size: u16,
}

impl FixedEncodeLen for SenderHeader {
    const ENCODE_LEN: usize = PacketType::ENCODE_LEN
        + u64::ENCODE_LEN
        + u64::ENCODE_LEN
        + u8::ENCODE_LEN
        + u32::ENCODE_LEN
        + u32::ENCODE_LEN
        + u16::ENCODE_LEN;
}

impl Encode for SenderHeader {
    type Error = Infallible;

    fn encode(&self, mut dst: impl Write) -> Result<(), BufTooShortOr<Self::Error>> {
        dst.write(&self.packet_type)?;
        dst.write(&self.seed)?;
        dst.write(&self.field_tag)?;
        dst.write(&self.field_tag_low)?;
        dst.write(&self.total_bytes)?;
        dst.write(&self.packet_bytes)?;
        dst.write(&self.gen_size)?;
        Ok(())
    }
}

impl Decode for SenderHeader {
    type Error = UnknownPacketType;

    fn decode(mut src: impl Read) -> Result<Self, BufTooShortOr<Self::Error>> {
        let packet_type = src.read::<PacketType>()?;
        Ok(Self {
            packet_type,
            seed: src.read().map_err(widen)?,
            field_tag: src.read().map_err(widen)?,
            field_tag_low: src.read().map_err(widen)?,
            total_bytes: src.read().map_err(widen)?,
            packet_bytes: src.read().map_err(widen)?,
            gen_size: src.read().map_err(widen)?,
        })
    }
}

/// Receiver→sender header, 6 bytes little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzzing", derive(arbitrary::Arbitrary))]
pub struct ReceiverHeader {
    /// Packet type discriminant (`Advertise`, `EndOfGenOrDeficit`, or
    /// `GenComplete`).
    pub packet_type: PacketType,
    /// Receiver identifier, stable for the lifetime of the transfer.
    pub receiver_id: u32,
}

impl FixedEncodeLen for ReceiverHeader {
    const ENCODE_LEN: usize = PacketType::ENCODE_LEN + u32::ENCODE_LEN;
}

impl Encode for ReceiverHeader {
    type Error = Infallible;

    fn encode(&self, mut dst: impl Write) -> Result<(), BufTooShortOr<Self::Error>> {
        dst.write(&self.packet_type)?;
        dst.write(&self.receiver_id)?;
        Ok(())
    }
}

impl Decode for ReceiverHeader {
    type Error = UnknownPacketType;

    fn decode(mut src: impl Read) -> Result<Self, BufTooShortOr<Self::Error>> {
        let packet_type = src.read::<PacketType>()?;
        Ok(Self {
            packet_type,
            receiver_id: src.read().map_err(widen)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use octs::Bytes;

    use super::*;

    #[test]
    fn sender_header_round_trip() {
        let v = SenderHeader {
            packet_type: PacketType::Data,
            seed: 0x1122_3344_5566_7788,
            field_tag: 0x5,
            field_tag_low: 0x5,
            total_bytes: 1_048_576,
            packet_bytes: 1400,
            gen_size: 20,
        };
        let mut buf = octs::BytesMut::with_capacity(SenderHeader::ENCODE_LEN);
        buf.write(&v).unwrap();
        assert_eq!(SenderHeader::ENCODE_LEN, buf.len());
        assert_eq!(29, SenderHeader::ENCODE_LEN);

        let mut read_buf: Bytes = buf.freeze();
        assert_eq!(v, read_buf.read::<SenderHeader>().unwrap());
    }

    #[test]
    fn receiver_header_round_trip() {
        let v = ReceiverHeader {
            packet_type: PacketType::GenComplete,
            receiver_id: 42,
        };
        let mut buf = octs::BytesMut::with_capacity(ReceiverHeader::ENCODE_LEN);
        buf.write(&v).unwrap();
        assert_eq!(6, ReceiverHeader::ENCODE_LEN);

        let mut read_buf: Bytes = buf.freeze();
        assert_eq!(v, read_buf.read::<ReceiverHeader>().unwrap());
    }

    #[test]
    fn unknown_packet_type_is_malformed() {
        let mut buf = octs::BytesMut::with_capacity(2);
        buf.write(&99u16).unwrap();
        let mut read_buf: Bytes = buf.freeze();
        let err = read_buf.read::<PacketType>().unwrap_err();
        assert!(matches!(err, BufTooShortOr::Or(UnknownPacketType(99))));
    }
}
