//! Arithmetic over `GF(2^16)`, the binary extension field used by the
//! coded variant, via lazily-built log/antilog tables.
//!
//! The field is generated by the irreducible polynomial
//! `x^16 + x^12 + x^3 + x + 1` (`0x1100B`), the same degree-16 polynomial
//! used by production RLNC implementations such as Kodo. Addition and
//! subtraction are both XOR (characteristic 2); multiplication and
//! inversion go through the tables.

use std::sync::OnceLock;

const POLY: u32 = 0x1_100B;
const FIELD_SIZE: usize = 1 << 16;
const ORDER: usize = FIELD_SIZE - 1;

struct Tables {
    exp: Vec<u16>,
    log: Vec<u16>,
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut exp = vec![0u16; 2 * ORDER];
        let mut log = vec![0u16; FIELD_SIZE];
        let mut x: u32 = 1;
        for i in 0..ORDER {
            exp[i] = x as u16;
            log[x as usize] = i as u16;
            x <<= 1;
            if x & FIELD_SIZE as u32 != 0 {
                x ^= POLY;
            }
        }
        for i in ORDER..2 * ORDER {
            exp[i] = exp[i - ORDER];
        }
        Tables { exp, log }
    })
}

/// Multiplies two field elements.
#[must_use]
pub fn mul(a: u16, b: u16) -> u16 {
    if a == 0 || b == 0 {
        return 0;
    }
    let t = tables();
    let sum = usize::from(t.log[usize::from(a)]) + usize::from(t.log[usize::from(b)]);
    t.exp[sum]
}

/// Inverts a nonzero field element. Panics on zero, which has no inverse;
/// callers never invert a zero pivot (the RREF elimination only inverts
/// the pivot it just found nonzero).
#[must_use]
pub fn inv(a: u16) -> u16 {
    assert_ne!(a, 0, "zero has no multiplicative inverse in GF(2^16)");
    let t = tables();
    t.exp[ORDER - usize::from(t.log[usize::from(a)])]
}

/// Adds (equivalently, subtracts) two field elements.
#[must_use]
pub const fn add(a: u16, b: u16) -> u16 {
    a ^ b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_by_zero_is_zero() {
        assert_eq!(mul(0, 1234), 0);
        assert_eq!(mul(1234, 0), 0);
    }

    #[test]
    fn mul_by_one_is_identity() {
        assert_eq!(mul(1, 1234), 1234);
        assert_eq!(mul(1234, 1), 1234);
    }

    #[test]
    fn inv_round_trips() {
        for a in [1u16, 2, 3, 255, 1000, 65535] {
            assert_eq!(mul(a, inv(a)), 1, "a = {a}");
        }
    }

    #[test]
    fn add_is_its_own_inverse() {
        let a = 4242u16;
        let b = 1337u16;
        assert_eq!(add(add(a, b), b), a);
    }

    #[test]
    fn mul_is_commutative_and_associative_sample() {
        let (a, b, c) = (17u16, 999u16, 54321u16);
        assert_eq!(mul(a, b), mul(b, a));
        assert_eq!(mul(mul(a, b), c), mul(a, mul(b, c)));
    }
}
