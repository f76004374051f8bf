#![no_main]

use libfuzzer_sys::fuzz_target;
use octs::{Bytes, Read};
use relcast::{
    config::Variant,
    wire::{ReceiverHeader, SenderHeader, deficit::DeficitReport},
};

fuzz_target!(|data: &[u8]| {
    let mut src: Bytes = Bytes::copy_from_slice(data);
    let _ = src.read::<SenderHeader>();

    let mut src: Bytes = Bytes::copy_from_slice(data);
    let _ = src.read::<ReceiverHeader>();

    let mut src: Bytes = Bytes::copy_from_slice(data);
    let _ = DeficitReport::decode(Variant::Coded, &mut src);

    let mut src: Bytes = Bytes::copy_from_slice(data);
    let _ = DeficitReport::decode(Variant::Uncoded, &mut src);
});
