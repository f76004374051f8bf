//! The sans-IO sender state machine: `Enroll -> GenSend -> GenWait -> ...
//! -> Finish`. Owns no socket; [`Sender::poll`] takes decoded feedback and
//! the current time, and returns raw outgoing multicast datagrams. A real
//! socket adapter lives in [`crate::channel`].

use std::{path::Path, time::{Duration, Instant}};

use octs::{FixedEncodeLen, Read as _, Write};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, info, trace};

use crate::{
    codec::{Deficit, Encoder},
    config::Variant,
    error::TransferError,
    generation::{self, SourceReader},
    receiver_table::ReceiverTable,
    stats::TransferStats,
    wire::{PacketType, ReceiverHeader, SenderHeader, deficit::DeficitReport},
};

/// Decodes a raw unicast datagram from a receiver into a
/// [`ReceiverEvent`], for callers driving [`Sender::poll`] from a real
/// socket. `variant` must be the same fixed variant this deployment was
/// started with, since a deficit report carries no shape discriminant of
/// its own. Returns `None` for malformed datagrams, which are dropped
/// silently per `SPEC_FULL.md` §7.
#[must_use]
pub fn decode_feedback(datagram: &[u8], variant: Variant) -> Option<ReceiverEvent> {
    let mut bytes = octs::Bytes::copy_from_slice(datagram);
    let header: ReceiverHeader = bytes.read().ok()?;
    let kind = match header.packet_type {
        PacketType::Advertise => ReceiverEventKind::Enroll,
        PacketType::EndOfGenOrDeficit => {
            let report = DeficitReport::decode(variant, &mut bytes).ok()?;
            ReceiverEventKind::Deficit(report)
        }
        PacketType::GenComplete => ReceiverEventKind::Complete,
        _ => return None,
    };
    Some(ReceiverEvent {
        receiver_id: header.receiver_id,
        kind,
    })
}

/// Static configuration for a [`Sender`], fixed for the lifetime of the
/// transfer.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Uncoded or coded variant; fixes how `seed` in the wire header is
    /// interpreted and which codec is driven.
    pub variant: Variant,
    /// Nominal symbols per generation (the last generation may use fewer).
    pub gen_size: u16,
    /// Bytes per data symbol.
    pub packet_bytes: u32,
    /// Finite-field tag carried in every sender header (coded variant
    /// only; ignored for uncoded).
    pub field_tag: u64,
    /// How long to wait after the last advertisement before entering
    /// `GenSend(0)`.
    pub enroll_window: Duration,
    /// Number of type-1 advertisements to emit during enrollment.
    pub advertisement_count: u32,
    /// Consecutive idle polls in `GenWait` before re-emitting the type-3
    /// marker.
    pub idle_retransmit_threshold: u32,
    /// Repair rounds without reaching quorum-complete before surfacing
    /// [`TransferError::Stalled`].
    pub max_stalls: u32,
    /// Seeds the sender's coefficient-seed RNG (coded variant). `None`
    /// draws from OS entropy; tests pass `Some` for reproducibility.
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Enroll,
    GenWait,
    Finish,
}

/// Feedback observed from a receiver, already parsed off the wire by the
/// channel adapter.
#[derive(Debug, Clone)]
pub struct ReceiverEvent {
    /// Which receiver this came from.
    pub receiver_id: u32,
    /// What it reported.
    pub kind: ReceiverEventKind,
}

/// The three things a receiver can tell the sender.
#[derive(Debug, Clone)]
pub enum ReceiverEventKind {
    /// Type-1: enrollment.
    Enroll,
    /// Type-3: deficit report for the generation currently in flight.
    Deficit(DeficitReport),
    /// Type-4: generation-complete acknowledgement.
    Complete,
}

/// The sans-IO sender. Generic over the codec [`Encoder`] so the same
/// state machine drives either variant.
pub struct Sender<E: Encoder> {
    config: SenderConfig,
    encoder: E,
    table: ReceiverTable,
    reader: SourceReader,
    total_bytes: u64,
    total_packets: u64,
    num_gens: u32,
    g: u32,
    phase: Phase,
    current_gen_slots: u16,
    rng: StdRng,
    idle_polls: u32,
    stall_rounds: u32,
    enroll_deadline: Option<Instant>,
    round_max_deficit: u32,
    round_missing: Vec<u32>,
    stats: TransferStats,
    finished: bool,
}

impl<E: Encoder> Sender<E> {
    /// Opens `source_path` and prepares the sender. Does not send
    /// anything yet; the first [`Sender::poll`] call emits the
    /// advertisements.
    pub fn new(config: SenderConfig, encoder: E, source_path: &Path) -> Result<Self, TransferError> {
        if config.variant == Variant::Coded && config.packet_bytes % 2 != 0 {
            return Err(TransferError::Config(format!(
                "coded variant requires an even packet-size for GF(2^16) symbols, got {}",
                config.packet_bytes
            )));
        }
        if config.gen_size == 0 {
            return Err(TransferError::Config("gen-size must be at least 1".to_string()));
        }
        let total_bytes = std::fs::metadata(source_path)
            .map_err(TransferError::IoSource)?
            .len();
        let total_packets = generation::total_packets(total_bytes, config.packet_bytes);
        let num_gens = generation::num_generations(total_packets, config.gen_size).max(1);
        let reader = SourceReader::open(source_path, config.packet_bytes)?;
        let rng = config
            .rng_seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        Ok(Self {
            config,
            encoder,
            table: ReceiverTable::new(),
            reader,
            total_bytes,
            total_packets,
            num_gens,
            g: 0,
            phase: Phase::Enroll,
            current_gen_slots: 0,
            rng,
            idle_polls: 0,
            stall_rounds: 0,
            enroll_deadline: None,
            round_max_deficit: 0,
            round_missing: Vec::new(),
            stats: TransferStats::default(),
            finished: false,
        })
    }

    /// Whether the sender has emitted type-6 and has nothing left to do.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// A snapshot of throughput/repair counters so far.
    #[must_use]
    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    /// Total size of the source file in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    fn header(&self, packet_type: PacketType, seed: u64, gen_size: u16) -> SenderHeader {
        SenderHeader {
            packet_type,
            seed,
            field_tag: self.config.field_tag,
            field_tag_low: self.config.field_tag as u8,
            total_bytes: u32::try_from(self.total_bytes).unwrap_or(u32::MAX),
            packet_bytes: self.config.packet_bytes,
            gen_size,
        }
    }

    fn encode(&self, header: SenderHeader, payload: &[u8]) -> Vec<u8> {
        let mut buf = octs::BytesMut::with_capacity(SenderHeader::ENCODE_LEN + payload.len());
        buf.write(&header).expect("buffer sized for header");
        buf.extend_from_slice(payload);
        buf.to_vec()
    }

    /// Returns `(wire_seed, codec_seed)` for the data symbol at
    /// `local_index` within the generation currently installed in the
    /// encoder.
    ///
    /// These differ for the uncoded variant: the wire carries the global
    /// file-slot index (`g * gen_size + local_index`, per invariant I3 —
    /// `g = seq / gen_size`), but the codec is generation-local and only
    /// understands indices in `0..slots`. For the coded variant the two
    /// are the same random value, since the codec has no notion of
    /// position at all.
    fn seeds_for(&mut self, local_index: u16) -> (u64, u64) {
        match self.config.variant {
            Variant::Coded => {
                let seed = self.rng.r#gen::<u64>();
                (seed, seed)
            }
            Variant::Uncoded => {
                let global_seq = u64::from(self.g) * u64::from(self.config.gen_size) + u64::from(local_index);
                (global_seq, u64::from(local_index))
            }
        }
    }

    /// Converts a global file-slot index reported by a receiver back into
    /// the generation-local index the encoder understands (uncoded
    /// variant only).
    fn local_index_of(&self, global_seq: u64) -> u64 {
        global_seq - u64::from(self.g) * u64::from(self.config.gen_size)
    }

    /// Reads the next generation's block, installs it in the encoder,
    /// emits its data symbols and an end-of-generation marker. Called
    /// both for generation 0 (after enrollment) and for every subsequent
    /// advance, inline within the same [`Sender::poll`] call that
    /// triggered it.
    fn begin_generation(&mut self, out: &mut Vec<Vec<u8>>) -> Result<(), TransferError> {
        let slots = generation::slots_in_generation(self.g, self.total_packets, self.config.gen_size);
        self.current_gen_slots = slots;
        let block = self.reader.read_generation(slots)?;
        self.encoder.configure(slots, self.config.packet_bytes as usize);
        self.encoder.install_block(&block);
        self.table.reset_for_new_generation();
        self.round_max_deficit = 0;
        self.round_missing.clear();
        self.idle_polls = 0;

        for local_index in 0..slots {
            let (wire_seed, codec_seed) = self.seeds_for(local_index);
            let symbol = self.encoder.produce_symbol(codec_seed);
            self.stats.add_symbols_sent(1);
            out.push(self.encode(self.header(PacketType::Data, wire_seed, slots), &symbol));
        }
        out.push(self.encode(self.header(PacketType::EndOfGenOrDeficit, 0, slots), &[]));
        self.phase = Phase::GenWait;
        debug!(generation = self.g, slots, "sent generation");
        Ok(())
    }

    /// Advances the driving clock and hands off any feedback observed
    /// since the last call. Returns the raw multicast datagrams to send.
    pub fn poll(&mut self, now: Instant, feedback: &[ReceiverEvent]) -> Result<Vec<Vec<u8>>, TransferError> {
        let mut out = Vec::new();
        if self.finished {
            return Ok(out);
        }

        match self.phase {
            Phase::Enroll => {
                if self.enroll_deadline.is_none() {
                    for _ in 0..self.config.advertisement_count {
                        out.push(self.encode(self.header(PacketType::Advertise, 0, self.config.gen_size), &[]));
                    }
                    self.enroll_deadline = Some(now + self.config.enroll_window);
                }
                for event in feedback {
                    if let ReceiverEventKind::Enroll = event.kind {
                        self.table.enroll(event.receiver_id);
                        info!(receiver = event.receiver_id, "receiver enrolled");
                    }
                }
                if self.enroll_deadline.is_some_and(|deadline| now >= deadline) {
                    self.begin_generation(&mut out)?;
                }
            }
            Phase::GenWait => {
                let mut saw_feedback = false;
                for event in feedback {
                    saw_feedback = true;
                    match &event.kind {
                        ReceiverEventKind::Enroll => {
                            // Late joiners after the enrollment window are
                            // out of scope; ignore per the Non-goals.
                        }
                        ReceiverEventKind::Deficit(report) => {
                            self.table.mark_needs_more(event.receiver_id);
                            match report {
                                DeficitReport::Count(c) => self.round_max_deficit = self.round_max_deficit.max(*c),
                                DeficitReport::Missing(indices) => {
                                    for idx in indices {
                                        if !self.round_missing.contains(idx) {
                                            self.round_missing.push(*idx);
                                        }
                                    }
                                }
                            }
                        }
                        ReceiverEventKind::Complete => {
                            self.table.mark_complete(event.receiver_id);
                        }
                    }
                }

                if saw_feedback {
                    self.idle_polls = 0;
                } else {
                    self.idle_polls += 1;
                    if self.idle_polls >= self.config.idle_retransmit_threshold {
                        trace!(generation = self.g, "idle, re-sending end-of-generation marker");
                        out.push(self.encode(
                            self.header(PacketType::EndOfGenOrDeficit, 0, self.current_gen_slots),
                            &[],
                        ));
                        self.idle_polls = 0;
                    }
                }

                if self.table.is_quorum_fresh() {
                    if self.table.any_needs_more() {
                        let repair_count = match self.config.variant {
                            Variant::Coded => self.round_max_deficit,
                            Variant::Uncoded => u32::try_from(self.round_missing.len()).unwrap_or(0),
                        };
                        if repair_count > 0 {
                            match self.config.variant {
                                Variant::Coded => {
                                    for _ in 0..repair_count {
                                        let seed = self.rng.r#gen::<u64>();
                                        let symbol = self.encoder.produce_symbol(seed);
                                        self.stats.add_symbols_sent(1);
                                        self.stats.add_repairs_sent(1);
                                        out.push(self.encode(
                                            self.header(PacketType::Data, seed, self.current_gen_slots),
                                            &symbol,
                                        ));
                                    }
                                }
                                Variant::Uncoded => {
                                    self.round_missing.sort_unstable();
                                    for &global_seq in &self.round_missing {
                                        let codec_seed = self.local_index_of(global_seq);
                                        let symbol = self.encoder.produce_symbol(codec_seed);
                                        self.stats.add_symbols_sent(1);
                                        self.stats.add_repairs_sent(1);
                                        out.push(self.encode(
                                            self.header(
                                                PacketType::Data,
                                                global_seq,
                                                self.current_gen_slots,
                                            ),
                                            &symbol,
                                        ));
                                    }
                                }
                            }
                            out.push(self.encode(
                                self.header(PacketType::EndOfGenOrDeficit, 0, self.current_gen_slots),
                                &[],
                            ));
                        }
                        self.table.reset_needs_more_to_pending();
                        self.round_max_deficit = 0;
                        self.round_missing.clear();
                        self.stall_rounds += 1;
                        if self.stall_rounds > self.config.max_stalls {
                            return Err(TransferError::Stalled {
                                generation: self.g,
                                stalls: self.stall_rounds,
                            });
                        }
                    } else {
                        // Quorum-complete.
                        self.stall_rounds = 0;
                        out.push(self.encode(
                            self.header(PacketType::Advance, 0, self.current_gen_slots),
                            &[],
                        ));
                        info!(generation = self.g, "generation complete, advancing");
                        self.g += 1;
                        if self.g < self.num_gens {
                            self.begin_generation(&mut out)?;
                        } else {
                            out.push(self.encode(self.header(PacketType::Done, 0, 0), &[]));
                            self.phase = Phase::Finish;
                            self.finished = true;
                            info!("transfer complete");
                        }
                    }
                }
            }
            Phase::Finish => {}
        }

        Ok(out)
    }
}
