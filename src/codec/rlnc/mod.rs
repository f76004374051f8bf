//! Random linear network coding over `GF(2^16)`.
//!
//! Coefficient vectors are never transmitted: both encoder and decoder
//! derive the same vector from the packet's 64-bit seed via a seeded PRNG,
//! matching the seed-per-symbol scheme in the reference implementation
//! (which drove `kodo.FiniteField.binary16` the same way).

pub mod gf;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    codec::{Decoder, Deficit, Encoder},
    error::AbsorbOutcome,
};

fn coefficients(seed: u64, gen_size: usize) -> Vec<u16> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..gen_size).map(|_| rng.r#gen::<u16>()).collect()
}

fn symbol_to_words(symbol: &[u8]) -> Vec<u16> {
    symbol
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

fn words_to_symbol(words: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 2);
    for word in words {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out
}

/// Computes `dst += factor * src` over the field, in place.
fn axpy(dst: &mut [u16], factor: u16, src: &[u16]) {
    if factor == 0 {
        return;
    }
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d = gf::add(*d, gf::mul(factor, *s));
    }
}

/// RLNC encoder: emits random linear combinations of the installed block's
/// source symbols.
#[derive(Debug, Default)]
pub struct RlncEncoder {
    gen_size: u16,
    word_count: usize,
    /// `gen_size` rows of `word_count` field elements each.
    source: Vec<Vec<u16>>,
}

impl Encoder for RlncEncoder {
    fn configure(&mut self, gen_size: u16, symbol_bytes: usize) {
        assert_eq!(symbol_bytes % 2, 0, "RLNC symbol_bytes must be even for GF(2^16)");
        self.gen_size = gen_size;
        self.word_count = symbol_bytes / 2;
        self.source.clear();
    }

    fn install_block(&mut self, block: &[u8]) {
        let symbol_bytes = self.word_count * 2;
        self.source = block
            .chunks_exact(symbol_bytes)
            .map(symbol_to_words)
            .collect();
        debug_assert_eq!(self.source.len(), usize::from(self.gen_size));
    }

    fn produce_symbol(&mut self, seed: u64) -> Vec<u8> {
        let coeffs = coefficients(seed, usize::from(self.gen_size));
        let mut acc = vec![0u16; self.word_count];
        for (coeff, row) in coeffs.iter().zip(self.source.iter()) {
            axpy(&mut acc, *coeff, row);
        }
        words_to_symbol(&acc)
    }
}

/// One row of the decoder's row-reduced echelon form: `coeffs[pivot] == 1`
/// and `coeffs[j] == 0` for every `j` that is some other row's pivot.
#[derive(Debug, Clone)]
struct Row {
    pivot: usize,
    coeffs: Vec<u16>,
    symbol: Vec<u16>,
}

/// RLNC decoder: maintains an incremental row-reduced echelon form so that
/// absorbing a symbol either raises rank by exactly one or is redundant.
#[derive(Debug, Default)]
pub struct RlncDecoder {
    gen_size: u16,
    word_count: usize,
    rows: Vec<Row>,
}

impl Decoder for RlncDecoder {
    fn configure(&mut self, gen_size: u16, symbol_bytes: usize) {
        assert_eq!(symbol_bytes % 2, 0, "RLNC symbol_bytes must be even for GF(2^16)");
        self.gen_size = gen_size;
        self.word_count = symbol_bytes / 2;
        self.rows.clear();
    }

    fn absorb_symbol(&mut self, seed: u64, symbol: &[u8]) -> AbsorbOutcome {
        let mut coeffs = coefficients(seed, usize::from(self.gen_size));
        let mut words = symbol_to_words(symbol);

        // Reduce against every existing pivot row.
        for row in &self.rows {
            let factor = coeffs[row.pivot];
            if factor != 0 {
                axpy(&mut coeffs, factor, &row.coeffs);
                axpy(&mut words, factor, &row.symbol);
            }
        }

        let Some(pivot) = coeffs.iter().position(|&c| c != 0) else {
            return AbsorbOutcome::Redundant;
        };

        let inv_pivot = gf::inv(coeffs[pivot]);
        for c in &mut coeffs {
            *c = gf::mul(*c, inv_pivot);
        }
        for w in &mut words {
            *w = gf::mul(*w, inv_pivot);
        }

        // Back-substitute the new pivot into every existing row so the
        // whole set stays in reduced (not just echelon) form.
        for row in &mut self.rows {
            let factor = row.coeffs[pivot];
            if factor != 0 {
                axpy(&mut row.coeffs, factor, &coeffs);
                axpy(&mut row.symbol, factor, &words);
            }
        }

        self.rows.push(Row {
            pivot,
            coeffs,
            symbol: words,
        });
        AbsorbOutcome::Accepted
    }

    fn is_complete(&self) -> bool {
        self.rows.len() == usize::from(self.gen_size)
    }

    fn deficit(&self) -> Deficit {
        Deficit::Count(u32::from(self.gen_size) - self.rows.len() as u32)
    }

    fn extract_block(&self) -> Vec<u8> {
        assert!(self.is_complete(), "extract_block called before completion");
        let mut by_pivot = self.rows.clone();
        by_pivot.sort_by_key(|r| r.pivot);
        let mut out = Vec::with_capacity(by_pivot.len() * self.word_count * 2);
        for row in &by_pivot {
            out.extend_from_slice(&words_to_symbol(&row.symbol));
        }
        out
    }
}
