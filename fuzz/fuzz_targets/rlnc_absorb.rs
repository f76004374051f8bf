#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use relcast::codec::{Decoder, rlnc::RlncDecoder};

#[derive(Debug, Arbitrary)]
struct Symbol {
    seed: u64,
    // Padded/truncated to a fixed even length so `symbol_bytes` stays
    // valid for `GF(2^16)`; see `RlncDecoder::configure`.
    words: [u16; 4],
}

fuzz_target!(|data: (u8, Vec<Symbol>)| {
    let (gen_size_raw, symbols) = data;
    let gen_size = u16::from(gen_size_raw).max(1);
    let mut decoder = RlncDecoder::default();
    decoder.configure(gen_size, 8);

    for symbol in symbols.into_iter().take(64) {
        if decoder.is_complete() {
            break;
        }
        let bytes: Vec<u8> = symbol.words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let _ = decoder.absorb_symbol(symbol.seed, &bytes);
    }
});
