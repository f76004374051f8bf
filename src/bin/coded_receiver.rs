//! `coded-receiver`: receives a file using the RLNC-coded variant.

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use relcast::{
    channel::ReceiverChannel,
    codec::rlnc::RlncDecoder,
    config::{ReceiverArgs, Variant},
    erasure::ErasureModel,
    receiver::{Receiver, ReceiverConfig},
};

fn main() -> anyhow::Result<()> {
    let args = ReceiverArgs::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.common.log_level))
        .init();

    let erasure = ErasureModel::new(args.erasure_low, args.erasure_high, args.erasure_seed);
    let config = ReceiverConfig {
        variant: Variant::Coded,
        receiver_id: args.hostname,
        erasure,
    };
    let mut receiver = Receiver::new(config, RlncDecoder::default());
    let mut channel = ReceiverChannel::new(args.common.ip, args.common.port)?;

    loop {
        let incoming = channel.poll_incoming(Duration::from_secs(1))?;
        for datagram in &incoming {
            let outgoing = receiver.on_packet(datagram);
            for packet in &outgoing {
                channel.send_feedback(packet)?;
            }
        }
        if receiver.is_completed() {
            break;
        }
    }

    receiver.finish(&args.output_file)?;
    Ok(())
}
