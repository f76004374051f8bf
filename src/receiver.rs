//! The sans-IO receiver state machine: `Connect -> GenRecv -> GenDoneWait
//! -> ... -> Completed`. Owns no socket; [`Receiver::on_packet`] consumes
//! raw incoming multicast datagrams and yields outgoing unicast feedback
//! datagrams. A real socket adapter lives in [`crate::channel`].

use octs::{FixedEncodeLen, Read as _, Write};
use tracing::{info, trace};

use crate::{
    codec::{Decoder, Deficit},
    config::Variant,
    erasure::ErasureModel,
    error::AbsorbOutcome,
    generation::{self, SinkBuffer},
    stats::TransferStats,
    wire::{PacketType, ReceiverHeader, SenderHeader, deficit::DeficitReport},
};

/// Static configuration for a [`Receiver`].
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Uncoded or coded variant; fixes how the data packet's `seed` field
    /// is interpreted.
    pub variant: Variant,
    /// This receiver's identifier, stable for the transfer's lifetime.
    pub receiver_id: u32,
    /// Simulated channel loss, for testability.
    pub erasure: ErasureModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Connect,
    GenRecv,
    GenDoneWait,
    Completed,
}

/// An outgoing unicast feedback datagram, already wire-encoded.
pub type OutPacket = Vec<u8>;

/// The sans-IO receiver. Generic over the codec [`Decoder`] so the same
/// state machine drives either variant.
pub struct Receiver<D: Decoder> {
    config: ReceiverConfig,
    decoder: D,
    sink: SinkBuffer,
    phase: Phase,
    g: u32,
    gen_size: u16,
    total_bytes: u64,
    packet_bytes: u32,
    num_gens: u32,
    stats: TransferStats,
}

impl<D: Decoder> Receiver<D> {
    /// A receiver that has not yet observed an advertisement.
    pub fn new(config: ReceiverConfig, decoder: D) -> Self {
        Self {
            config,
            decoder,
            sink: SinkBuffer::default(),
            phase: Phase::Connect,
            g: 0,
            gen_size: 0,
            total_bytes: 0,
            packet_bytes: 0,
            num_gens: 0,
            stats: TransferStats::default(),
        }
    }

    /// Whether the transfer has been fully reconstructed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.phase == Phase::Completed
    }

    /// A snapshot of this receiver's counters so far.
    #[must_use]
    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    fn local_index_of(&self, global_seq: u64) -> u64 {
        global_seq - u64::from(self.g) * u64::from(self.gen_size)
    }

    fn global_seq_of(&self, local_index: u64) -> u64 {
        u64::from(self.g) * u64::from(self.gen_size) + local_index
    }

    fn encode_feedback(&self, packet_type: PacketType, payload: &[u8]) -> OutPacket {
        let header = ReceiverHeader {
            packet_type,
            receiver_id: self.config.receiver_id,
        };
        let mut buf = octs::BytesMut::with_capacity(ReceiverHeader::ENCODE_LEN + payload.len());
        buf.write(&header).expect("buffer sized for header");
        buf.extend_from_slice(payload);
        buf.to_vec()
    }

    fn deficit_report_payload(&self) -> (DeficitReport, Vec<u8>) {
        let report = match self.decoder.deficit() {
            Deficit::Count(c) => DeficitReport::Count(c),
            Deficit::Missing(locals) => {
                let globals = locals
                    .into_iter()
                    .map(|local| self.global_seq_of(u64::from(local)) as u32)
                    .collect();
                DeficitReport::Missing(globals)
            }
        };
        let mut buf = octs::BytesMut::new();
        buf.write(&report).expect("deficit report always encodes");
        (report, buf.to_vec())
    }

    /// Consumes one raw incoming multicast datagram. Returns any unicast
    /// feedback datagrams to send in response.
    pub fn on_packet(&mut self, datagram: &[u8]) -> Vec<OutPacket> {
        let mut out = Vec::new();
        let mut bytes = octs::Bytes::copy_from_slice(datagram);
        let header: SenderHeader = match bytes.read() {
            Ok(h) => h,
            Err(_) => {
                trace!("dropping malformed datagram");
                return out;
            }
        };
        let payload = bytes;

        match self.phase {
            Phase::Connect => {
                if header.packet_type == PacketType::Advertise {
                    self.gen_size = header.gen_size.max(1);
                    self.total_bytes = u64::from(header.total_bytes);
                    self.packet_bytes = header.packet_bytes;
                    let total_packets = generation::total_packets(self.total_bytes, self.packet_bytes);
                    self.num_gens = generation::num_generations(total_packets, self.gen_size).max(1);
                    let slots = generation::slots_in_generation(0, total_packets, self.gen_size);
                    self.decoder.configure(slots, self.packet_bytes as usize);
                    out.push(self.encode_feedback(PacketType::Advertise, &[]));
                    self.phase = Phase::GenRecv;
                    info!(receiver = self.config.receiver_id, "enrolled");
                }
            }
            Phase::GenRecv => match header.packet_type {
                PacketType::Data => {
                    if self.config.erasure.passes() {
                        let codec_seed = match self.config.variant {
                            Variant::Coded => header.seed,
                            Variant::Uncoded => self.local_index_of(header.seed),
                        };
                        match self.decoder.absorb_symbol(codec_seed, &payload) {
                            AbsorbOutcome::Accepted => self.stats.add_symbols_absorbed(1),
                            AbsorbOutcome::Redundant => self.stats.add_symbols_redundant(1),
                        }
                    }
                }
                PacketType::EndOfGenOrDeficit => {
                    if self.decoder.is_complete() {
                        out.push(self.encode_feedback(PacketType::GenComplete, &[]));
                        self.phase = Phase::GenDoneWait;
                    } else {
                        let (_, payload) = self.deficit_report_payload();
                        out.push(self.encode_feedback(PacketType::EndOfGenOrDeficit, &payload));
                    }
                }
                _ => {}
            },
            Phase::GenDoneWait => match header.packet_type {
                PacketType::Advance => {
                    self.sink.append(&self.decoder.extract_block());
                    self.g += 1;
                    if self.g < self.num_gens {
                        let total_packets = generation::total_packets(self.total_bytes, self.packet_bytes);
                        let slots = generation::slots_in_generation(self.g, total_packets, self.gen_size);
                        self.decoder.configure(slots, self.packet_bytes as usize);
                        self.phase = Phase::GenRecv;
                    } else {
                        self.phase = Phase::Completed;
                    }
                }
                PacketType::EndOfGenOrDeficit => {
                    // Lost type-5; our prior type-4 may also have been
                    // lost, so re-ack idempotently.
                    out.push(self.encode_feedback(PacketType::GenComplete, &[]));
                }
                PacketType::Done => {
                    // Our Advance was lost too; this generation's block
                    // never made it into the sink via the Advance arm.
                    self.sink.append(&self.decoder.extract_block());
                    self.phase = Phase::Completed;
                }
                _ => {}
            },
            Phase::Completed => {}
        }

        out
    }

    /// Writes the assembled file to `path`. Only meaningful once
    /// [`Receiver::is_completed`] is true.
    pub fn finish(self, path: &std::path::Path) -> Result<(), crate::error::TransferError> {
        let total_bytes = self.total_bytes;
        let stats = self.stats.clone();
        self.sink.finish(path, total_bytes)?;
        stats.log_summary(total_bytes);
        Ok(())
    }
}
