//! Reliable multicast file transfer, with interoperable uncoded and
//! network-coded (RLNC) variants.
//!
//! See `SPEC_FULL.md` at the repository root for the full design; in
//! brief, a single sender drives a generation-by-generation transfer over
//! IP multicast, aggregating feedback from many receivers before
//! advancing, while the two variants differ only in which
//! [`codec::Encoder`]/[`codec::Decoder`] pair is plugged into the
//! otherwise-identical [`sender::Sender`]/[`receiver::Receiver`] state
//! machines.

pub mod channel;
pub mod codec;
pub mod config;
pub mod erasure;
pub mod error;
pub mod generation;
pub mod receiver;
pub mod receiver_table;
pub mod sender;
pub mod stats;
pub mod wire;

pub use config::Variant;
pub use error::TransferError;
