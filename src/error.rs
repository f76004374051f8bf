//! See [`TransferError`].

use std::io;

/// Errors surfaced by the transfer protocol.
///
/// `Malformed` and codec-redundant absorbs are deliberately *not* part of
/// this enum's error path at the call sites that can expect them routinely
/// (a lossy multicast channel produces malformed and redundant packets as a
/// matter of course); they are logged and discarded rather than propagated.
/// This enum carries only the kinds that abort a transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Failed to read the source file.
    #[error("failed to read source file")]
    IoSource(#[source] io::Error),

    /// Failed to write the sink file.
    #[error("failed to write output file")]
    IoSink(#[source] io::Error),

    /// Invalid configuration supplied before any network I/O began.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The repair loop exceeded the configured retry cap without reaching
    /// quorum-complete for the current generation.
    #[error("transfer stalled on generation {generation} after {stalls} idle rounds")]
    Stalled {
        /// Generation index the sender or receiver was stuck on.
        generation: u32,
        /// Number of consecutive idle rounds observed.
        stalls: u32,
    },

    /// Transport-level socket error.
    #[error("socket error")]
    Io(#[from] io::Error),
}

/// Result of attempting to absorb a single symbol into a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsorbOutcome {
    /// The symbol increased the decoder's rank by exactly one.
    Accepted,
    /// The symbol was linearly dependent on symbols already absorbed
    /// (coded variant) or duplicated an already-filled slot (uncoded
    /// variant). Not an error: the protocol's `CODEC_REDUNDANT` kind is
    /// modeled as this `Ok` variant, never as an `Err`.
    Redundant,
}
