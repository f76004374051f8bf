//! Integration tests driving the sans-IO sender/receiver state machines
//! directly, with simulated loss, against the scenarios and invariants in
//! `SPEC_FULL.md` §8 (S1-S6 plus the quantified properties).

use std::{
    io::Write as _,
    path::PathBuf,
    time::{Duration, Instant},
};

use relcast::{
    codec::{identity::{IdentityDecoder, IdentityEncoder}, rlnc::{RlncDecoder, RlncEncoder}},
    config::Variant,
    erasure::ErasureModel,
    receiver::{Receiver, ReceiverConfig},
    sender::{Sender, SenderConfig, decode_feedback},
    wire::{PacketType, SenderHeader},
};

fn write_temp_file(name: &str, contents: &[u8]) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("relcast-test-{name}-{:?}", std::thread::current().id()));
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents).unwrap();
    path
}

fn fast_sender_config(variant: Variant, gen_size: u16, packet_bytes: u32) -> SenderConfig {
    SenderConfig {
        variant,
        gen_size,
        packet_bytes,
        field_tag: 2,
        enroll_window: Duration::from_millis(1),
        advertisement_count: 1,
        idle_retransmit_threshold: 1,
        max_stalls: 10_000,
        rng_seed: Some(12345),
    }
}

/// Runs sender + N receivers to completion with no real sockets,
/// delivering every sender datagram to every receiver and feeding
/// receiver feedback straight back to the sender on the next round.
/// Returns the reconstructed bytes at each receiver.
fn run_to_completion(
    variant: Variant,
    gen_size: u16,
    packet_bytes: u32,
    file_contents: &[u8],
    erasures: &[ErasureModel],
) -> Vec<Vec<u8>> {
    let src_path = write_temp_file("src", file_contents);
    let config = fast_sender_config(variant, gen_size, packet_bytes);

    let mut outputs = Vec::new();
    let num_receivers = erasures.len();

    match variant {
        Variant::Coded => {
            let mut sender = Sender::new(config, RlncEncoder::default(), &src_path).unwrap();
            let mut receivers: Vec<_> = erasures
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    Receiver::new(
                        ReceiverConfig {
                            variant,
                            receiver_id: i as u32 + 1,
                            erasure: e.clone(),
                        },
                        RlncDecoder::default(),
                    )
                })
                .collect();
            drive_with_variant(&mut sender, &mut receivers, variant, &mut |_| true);
            for r in receivers {
                outputs.push(extract(r));
            }
        }
        Variant::Uncoded => {
            let mut sender = Sender::new(config, IdentityEncoder::default(), &src_path).unwrap();
            let mut receivers: Vec<_> = erasures
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    Receiver::new(
                        ReceiverConfig {
                            variant,
                            receiver_id: i as u32 + 1,
                            erasure: e.clone(),
                        },
                        IdentityDecoder::default(),
                    )
                })
                .collect();
            drive_with_variant(&mut sender, &mut receivers, variant, &mut |_| true);
            for r in receivers {
                outputs.push(extract(r));
            }
        }
    }

    std::fs::remove_file(&src_path).ok();
    assert_eq!(outputs.len(), num_receivers);
    outputs
}

fn extract<D: relcast::codec::Decoder>(receiver: Receiver<D>) -> Vec<u8> {
    // Receiver::finish writes to a file; for test assertions we instead
    // pull the buffer out via a throwaway file round-trip.
    let mut path = std::env::temp_dir();
    path.push(format!("relcast-test-out-{:p}", &receiver));
    receiver.finish(&path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    std::fs::remove_file(&path).ok();
    bytes
}

fn packet_type_of(datagram: &[u8]) -> Option<PacketType> {
    let mut bytes = octs::Bytes::copy_from_slice(datagram);
    octs::Read::read::<SenderHeader>(&mut bytes)
        .ok()
        .map(|h| h.packet_type)
}

/// Drives sender + receivers to completion with no real sockets, delivering
/// every sender datagram receivers let through `keep`, simulating targeted
/// packet loss. `variant` must match the sender/receivers' own variant,
/// since `decode_feedback` needs it to know the deficit report's shape.
fn drive_with_variant<E, D>(
    sender: &mut Sender<E>,
    receivers: &mut [Receiver<D>],
    variant: Variant,
    keep: &mut dyn FnMut(&[u8]) -> bool,
) where
    E: relcast::codec::Encoder,
    D: relcast::codec::Decoder,
{
    let mut pending_feedback = Vec::new();
    for _round in 0..10_000 {
        let now = Instant::now();
        let outgoing = sender.poll(now, &pending_feedback).unwrap();
        pending_feedback.clear();

        for datagram in &outgoing {
            if !keep(datagram) {
                continue;
            }
            for receiver in receivers.iter_mut() {
                for fb in receiver.on_packet(datagram) {
                    if let Some(event) = decode_feedback(&fb, variant) {
                        pending_feedback.push(event);
                    }
                }
            }
        }

        if sender.is_finished() && receivers.iter().all(Receiver::is_completed) {
            break;
        }
        // Let the enrollment window's real-time deadline elapse.
        std::thread::sleep(Duration::from_millis(2));
    }

    assert!(sender.is_finished(), "sender never finished");
    assert!(
        receivers.iter().all(Receiver::is_completed),
        "not every receiver completed"
    );
}

// S1: zero-loss small file, coded variant.
#[test]
fn s1_zero_loss_small_file_coded() {
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let outputs = run_to_completion(Variant::Coded, 8, 64, &data, &[ErasureModel::none()]);
    assert_eq!(outputs[0], data);
}

// S1, uncoded variant.
#[test]
fn s1_zero_loss_small_file_uncoded() {
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let outputs = run_to_completion(Variant::Uncoded, 8, 64, &data, &[ErasureModel::none()]);
    assert_eq!(outputs[0], data);
}

// S2: moderate erasure, coded variant recovers via repair rounds.
#[test]
fn s2_moderate_erasure_coded() {
    let data: Vec<u8> = (0..20_000u32).map(|i| (i % 233) as u8).collect();
    let erasure = ErasureModel::new(25.0, 25.0, Some(99));
    let outputs = run_to_completion(Variant::Coded, 10, 128, &data, &[erasure]);
    assert_eq!(outputs[0], data);
}

// S2, uncoded variant.
#[test]
fn s2_moderate_erasure_uncoded() {
    let data: Vec<u8> = (0..20_000u32).map(|i| (i % 233) as u8).collect();
    let erasure = ErasureModel::new(25.0, 25.0, Some(99));
    let outputs = run_to_completion(Variant::Uncoded, 10, 128, &data, &[erasure]);
    assert_eq!(outputs[0], data);
}

// S3: two receivers with asymmetric loss both reconstruct bit-exactly.
#[test]
fn s3_asymmetric_two_receiver_loss() {
    let data: Vec<u8> = (0..15_000u32).map(|i| (i % 197) as u8).collect();
    let erasures = vec![
        ErasureModel::new(5.0, 5.0, Some(1)),
        ErasureModel::new(40.0, 40.0, Some(2)),
    ];
    let outputs = run_to_completion(Variant::Coded, 12, 64, &data, &erasures);
    assert_eq!(outputs[0], data);
    assert_eq!(outputs[1], data);
}

// S4: file size forces a short final generation.
#[test]
fn s4_short_final_generation() {
    // gen_size 10, packet_bytes 32 -> 320 bytes per full generation;
    // make the file just over two generations so the third is short.
    let data: Vec<u8> = (0..700u32).map(|i| (i % 200) as u8).collect();
    let outputs = run_to_completion(Variant::Coded, 10, 32, &data, &[ErasureModel::none()]);
    assert_eq!(outputs[0].len(), data.len());
    assert_eq!(outputs[0], data);
}

#[test]
fn s4_short_final_generation_uncoded() {
    let data: Vec<u8> = (0..700u32).map(|i| (i % 200) as u8).collect();
    let outputs = run_to_completion(Variant::Uncoded, 10, 32, &data, &[ErasureModel::none()]);
    assert_eq!(outputs[0], data);
}

// S6: duplicate enrollment from the same receiver id is idempotent; model
// this directly against the receiver table rather than the full loop.
#[test]
fn s6_duplicate_enrollment_idempotent() {
    use relcast::receiver_table::ReceiverTable;
    let mut table = ReceiverTable::new();
    table.enroll(7);
    table.mark_complete(7);
    table.enroll(7);
    assert_eq!(table.len(), 1);
    assert!(table.is_quorum_complete());
}

// S5: the last generation's Advance (type 5) is lost, but Done (type 6)
// still arrives. The receiver must append the final block from the Done
// arm of GenDoneWait, not just the Advance arm, to reconstruct bit-exactly.
#[test]
fn s5_lost_advance_still_completes() {
    let data: Vec<u8> = (0..700u32).map(|i| (i % 200) as u8).collect();
    let src_path = write_temp_file("s5-src", &data);
    // gen_size/packet_bytes chosen so the whole file fits in one generation:
    // Advance is sent exactly once, right before Done, so dropping it
    // exercises GenDoneWait's Done arm rather than its Advance arm.
    let config = fast_sender_config(Variant::Coded, 64, 32);

    let mut sender = Sender::new(config, RlncEncoder::default(), &src_path).unwrap();
    let mut receivers = vec![Receiver::new(
        ReceiverConfig {
            variant: Variant::Coded,
            receiver_id: 1,
            erasure: ErasureModel::none(),
        },
        RlncDecoder::default(),
    )];

    let mut dropped_advance = false;
    drive_with_variant(&mut sender, &mut receivers, Variant::Coded, &mut |datagram| {
        if !dropped_advance && packet_type_of(datagram) == Some(PacketType::Advance) {
            dropped_advance = true;
            return false;
        }
        true
    });

    assert!(dropped_advance, "test did not actually exercise a lost Advance");
    let output = extract(receivers.into_iter().next().unwrap());
    assert_eq!(output, data);

    std::fs::remove_file(&src_path).ok();
}

// Property 7 (round-trip) is covered by the codec's own unit tests:
// `src/codec/rlnc/mod.rs:181-202` and `src/codec/identity.rs:92-112`.
// Property 1 (bit-exact delivery) is exercised by every scenario above.
