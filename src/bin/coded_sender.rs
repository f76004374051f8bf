//! `coded-sender`: sends a file using the RLNC-coded variant.

use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use relcast::{
    channel::SenderChannel,
    codec::rlnc::RlncEncoder,
    config::{SenderArgs, Variant},
    sender::{Sender, decode_feedback},
};

/// The finite-field tag carried in every coded-variant header, matching
/// the reference implementation's `kodo.FiniteField.binary16` constant.
const FIELD_TAG_BINARY16: u64 = 2;

fn main() -> anyhow::Result<()> {
    let args = SenderArgs::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.common.log_level))
        .init();

    let config = args.to_sender_config(Variant::Coded, FIELD_TAG_BINARY16);
    let mut sender = Sender::new(config, RlncEncoder::default(), &args.file_path)?;
    let mut channel = SenderChannel::new(args.common.ip, args.common.port)?;

    loop {
        let now = Instant::now();
        let raw = channel.poll_incoming(Duration::from_secs(1))?;
        let events: Vec<_> = raw
            .iter()
            .filter_map(|d| decode_feedback(d, Variant::Coded))
            .collect();

        let outgoing = sender.poll(now, &events)?;
        for packet in &outgoing {
            channel.send(packet)?;
        }

        if sender.is_finished() {
            break;
        }
    }

    sender.stats().log_summary(sender.total_bytes());
    Ok(())
}
