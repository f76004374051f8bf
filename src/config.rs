//! Shared configuration types and `clap`-derived CLI argument structs for
//! the four binaries. Grounded on `original_source/arguments.py`'s option
//! set, widened with the ambient `--log-level`/`--max-stalls` flags
//! `SPEC_FULL.md` §6 adds.

use std::{net::Ipv4Addr, path::PathBuf, time::Duration};

use clap::Parser;

use crate::sender::SenderConfig;

/// Which symbol codec a deployment uses. Fixed for the lifetime of a
/// transfer; never negotiated on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Random linear network coding over `GF(2^16)`.
    Coded,
    /// Indexed file slices, no coding.
    Uncoded,
}

/// Common multicast/generation options shared by all four binaries.
#[derive(Debug, Clone, Parser)]
pub struct CommonArgs {
    /// Multicast group address.
    #[arg(long, default_value = "224.1.1.1")]
    pub ip: Ipv4Addr,

    /// Multicast port.
    #[arg(long, default_value_t = 5007)]
    pub port: u16,

    /// Bytes per data symbol.
    #[arg(long, default_value_t = 1400)]
    pub packet_size: u32,

    /// Symbols per generation.
    #[arg(long, default_value_t = 20)]
    pub gen_size: u16,

    /// `tracing-subscriber` filter directive, e.g. `info` or
    /// `relcast=debug`.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Sender-only CLI arguments.
#[derive(Debug, Clone, Parser)]
pub struct SenderArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Path to the file to send.
    #[arg(long)]
    pub file_path: PathBuf,

    /// Number of type-1 advertisements to emit during enrollment.
    #[arg(long, default_value_t = 3)]
    pub advertisement_count: u32,

    /// Enrollment window, in milliseconds, after the last advertisement.
    #[arg(long, default_value_t = 100)]
    pub enroll_window_ms: u64,

    /// Consecutive idle polls before re-sending the end-of-generation
    /// marker.
    #[arg(long, default_value_t = 3)]
    pub idle_retransmit_threshold: u32,

    /// Repair rounds without reaching quorum-complete before aborting.
    #[arg(long, default_value_t = 1000)]
    pub max_stalls: u32,

    /// Seeds the coded variant's coefficient-seed RNG, for reproducible
    /// runs. Unset draws from OS entropy.
    #[arg(long)]
    pub rng_seed: Option<u64>,
}

/// Receiver-only CLI arguments.
#[derive(Debug, Clone, Parser)]
pub struct ReceiverArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Path to write the reconstructed file to.
    #[arg(long)]
    pub output_file: PathBuf,

    /// This receiver's identifier. Must be unique among concurrent
    /// receivers.
    #[arg(long)]
    pub hostname: u32,

    /// Lower bound of the simulated erasure percentage range.
    #[arg(long, default_value_t = 0.0)]
    pub erasure_low: f64,

    /// Upper bound of the simulated erasure percentage range.
    #[arg(long, default_value_t = 0.0)]
    pub erasure_high: f64,

    /// Seeds the erasure simulation RNG, for reproducible runs. Unset
    /// draws from OS entropy.
    #[arg(long)]
    pub erasure_seed: Option<u64>,
}

impl SenderArgs {
    /// Builds a [`SenderConfig`] for the given codec `variant` and a
    /// fixed `field_tag` (the coded variant's finite-field identifier;
    /// ignored for uncoded).
    #[must_use]
    pub fn to_sender_config(&self, variant: Variant, field_tag: u64) -> SenderConfig {
        SenderConfig {
            variant,
            gen_size: self.common.gen_size,
            packet_bytes: self.common.packet_size,
            field_tag,
            enroll_window: Duration::from_millis(self.enroll_window_ms),
            advertisement_count: self.advertisement_count,
            idle_retransmit_threshold: self.idle_retransmit_threshold,
            max_stalls: self.max_stalls,
            rng_seed: self.rng_seed,
        }
    }
}
