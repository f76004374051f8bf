//! Wire encoding for deficit-report payloads (packet type 3, receiver→sender
//! direction).
//!
//! The coded variant reports a single rank deficit; the uncoded variant
//! reports the explicit set of missing sequence indices, since a coded
//! repair symbol benefits every lagging receiver equally but an uncoded
//! repair symbol only benefits receivers actually missing that exact slot.
//!
//! Neither shape carries a discriminant tag: the variant is fixed per
//! deployment, so both ends already know which shape to expect, exactly as
//! `SenderHeader.seed` is reinterpreted without a tag depending on the same
//! fixed variant.

use std::convert::Infallible;

use octs::{BufTooShortOr, Encode, Read, Write};

use crate::{codec::Deficit, config::Variant};

/// A deficit report, sized for the wire: either a bare count or an
/// explicit list of missing sequence indices.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "fuzzing", derive(arbitrary::Arbitrary))]
pub enum DeficitReport {
    /// Coded variant: `gen_size - rank`.
    Count(u32),
    /// Uncoded variant: explicit missing slot indices within the
    /// generation.
    Missing(Vec<u32>),
}

impl From<&Deficit> for DeficitReport {
    fn from(deficit: &Deficit) -> Self {
        match deficit {
            Deficit::Count(c) => Self::Count(*c),
            Deficit::Missing(m) => Self::Missing(m.clone()),
        }
    }
}

impl DeficitReport {
    /// The scalar size of the deficit, regardless of representation.
    #[must_use]
    pub fn len(&self) -> u32 {
        match self {
            Self::Count(c) => *c,
            Self::Missing(m) => u32::try_from(m.len()).unwrap_or(u32::MAX),
        }
    }

    /// Whether no repair is needed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn widen<E>(err: BufTooShortOr<Infallible>) -> BufTooShortOr<E> {
    match err {
        BufTooShortOr::TooShort => BufTooShortOr::TooShort,
        BufTooShortOr::Or(never) => match never {},
    }
}

impl Encode for DeficitReport {
    type Error = Infallible;

    fn encode(&self, mut dst: impl Write) -> Result<(), BufTooShortOr<Self::Error>> {
        match self {
            Self::Count(count) => dst.write(count)?,
            Self::Missing(indices) => {
                let len = u32::try_from(indices.len()).unwrap_or(u32::MAX);
                dst.write(&len)?;
                for index in indices {
                    dst.write(index)?;
                }
            }
        }
        Ok(())
    }
}

impl DeficitReport {
    /// Decodes a payload whose shape is already known from `variant`
    /// (there is no tag on the wire to distinguish them).
    pub fn decode(variant: Variant, mut src: impl Read) -> Result<Self, BufTooShortOr<Infallible>> {
        match variant {
            Variant::Coded => {
                let count: u32 = src.read().map_err(widen)?;
                Ok(Self::Count(count))
            }
            Variant::Uncoded => {
                let len: u32 = src.read().map_err(widen)?;
                let mut indices = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    indices.push(src.read().map_err(widen)?);
                }
                Ok(Self::Missing(indices))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use octs::Bytes;

    use super::*;

    #[test]
    fn count_round_trip() {
        let v = DeficitReport::Count(7);
        let mut buf = octs::BytesMut::new();
        buf.write(&v).unwrap();
        let mut read_buf: Bytes = buf.freeze();
        assert_eq!(v, DeficitReport::decode(Variant::Coded, &mut read_buf).unwrap());
    }

    #[test]
    fn missing_round_trip() {
        let v = DeficitReport::Missing(vec![1, 4, 9, 16]);
        let mut buf = octs::BytesMut::new();
        buf.write(&v).unwrap();
        let mut read_buf: Bytes = buf.freeze();
        assert_eq!(v, DeficitReport::decode(Variant::Uncoded, &mut read_buf).unwrap());
    }

    #[test]
    fn empty_missing_is_empty() {
        assert!(DeficitReport::Missing(vec![]).is_empty());
        assert!(DeficitReport::Count(0).is_empty());
        assert!(!DeficitReport::Count(1).is_empty());
    }
}
