//! `uncoded-sender`: sends a file using the indexed-slice variant.

use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use relcast::{
    channel::SenderChannel,
    codec::identity::IdentityEncoder,
    config::{SenderArgs, Variant},
    sender::{Sender, decode_feedback},
};

fn main() -> anyhow::Result<()> {
    let args = SenderArgs::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.common.log_level))
        .init();

    // The uncoded variant carries no finite-field meaning; the tag is
    // wire-compatible zero.
    let config = args.to_sender_config(Variant::Uncoded, 0);
    let mut sender = Sender::new(config, IdentityEncoder::default(), &args.file_path)?;
    let mut channel = SenderChannel::new(args.common.ip, args.common.port)?;

    loop {
        let now = Instant::now();
        let raw = channel.poll_incoming(Duration::from_secs(1))?;
        let events: Vec<_> = raw
            .iter()
            .filter_map(|d| decode_feedback(d, Variant::Uncoded))
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
