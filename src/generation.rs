//! Slicing a file into generations, and the short-tail handling that
//! applies to the final one.

use std::{
    fs::File,
    io::{BufReader, Read as _},
    path::Path,
};

use crate::error::TransferError;

/// `⌈total_bytes / packet_bytes⌉`, the number of fixed-size packet slots
/// the file is divided into. This is the ceiling-division form
/// `SPEC_FULL.md` §3 defines explicitly; the reference implementation's
/// unconditional `+ 1` is a known off-by-one not reproduced here — see
/// `DESIGN.md`.
#[must_use]
pub fn total_packets(total_bytes: u64, packet_bytes: u32) -> u64 {
    total_bytes.div_ceil(u64::from(packet_bytes))
}

/// `⌈total_packets / gen_size⌉`, the number of generations.
#[must_use]
pub fn num_generations(total_packets: u64, gen_size: u16) -> u32 {
    u32::try_from(total_packets.div_ceil(u64::from(gen_size)))
        .expect("generation count fits in u32 for any reasonable transfer")
}

/// The number of packet slots that belong to generation `g`, accounting
/// for a possibly-short final generation.
#[must_use]
pub fn slots_in_generation(g: u32, total_packets: u64, gen_size: u16) -> u16 {
    let start = u64::from(g) * u64::from(gen_size);
    let remaining = total_packets.saturating_sub(start);
    u16::try_from(remaining.min(u64::from(gen_size))).expect("bounded by gen_size")
}

/// Reads successive generation blocks from the source file, padding the
/// final short block with zeros.
pub struct SourceReader {
    reader: BufReader<File>,
    packet_bytes: u32,
}

impl SourceReader {
    /// Opens `path` for generation-by-generation reading.
    pub fn open(path: &Path, packet_bytes: u32) -> Result<Self, TransferError> {
        let file = File::open(path).map_err(TransferError::IoSource)?;
        Ok(Self {
            reader: BufReader::new(file),
            packet_bytes,
        })
    }

    /// Reads the next generation's raw block, zero-padding the final
    /// short slot (and the final short generation) to exactly
    /// `slots * packet_bytes` bytes.
    pub fn read_generation(&mut self, slots: u16) -> Result<Vec<u8>, TransferError> {
        let want = usize::from(slots) * self.packet_bytes as usize;
        let mut block = vec![0u8; want];
        let mut filled = 0usize;
        while filled < want {
            match self.reader.read(&mut block[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) => return Err(TransferError::IoSource(e)),
            }
        }
        Ok(block)
    }
}

/// Accumulates completed generation blocks and writes them atomically to
/// the sink path on completion.
#[derive(Debug, Default)]
pub struct SinkBuffer {
    bytes: Vec<u8>,
}

impl SinkBuffer {
    /// Appends a completed generation's reconstructed block.
    pub fn append(&mut self, block: &[u8]) {
        self.bytes.extend_from_slice(block);
    }

    /// Writes the buffer, truncated to `total_bytes`, to `path` via a
    /// write-to-temp-then-rename so a crash mid-write never leaves a
    /// partial file at the final path.
    pub fn finish(mut self, path: &Path, total_bytes: u64) -> Result<(), TransferError> {
        self.bytes.truncate(total_bytes as usize);
        let tmp_path = path.with_extension("relcast-tmp");
        std::fs::write(&tmp_path, &self.bytes).map_err(TransferError::IoSink)?;
        std::fs::rename(&tmp_path, path).map_err(TransferError::IoSink)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_packets_is_ceiling_division() {
        assert_eq!(total_packets(1400, 1400), 1);
        assert_eq!(total_packets(1401, 1400), 2);
        assert_eq!(total_packets(2800, 1400), 2);
        assert_eq!(total_packets(0, 1400), 0);
    }

    #[test]
    fn num_generations_is_ceiling_division() {
        assert_eq!(num_generations(20, 20), 1);
        assert_eq!(num_generations(21, 20), 2);
        assert_eq!(num_generations(40, 20), 2);
    }

    #[test]
    fn last_generation_is_short() {
        // 45 packets, gen_size 20 -> generations of 20, 20, 5
        assert_eq!(slots_in_generation(0, 45, 20), 20);
        assert_eq!(slots_in_generation(1, 45, 20), 20);
        assert_eq!(slots_in_generation(2, 45, 20), 5);
    }
}
