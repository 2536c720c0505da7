//! Decimal-valued draws on top of any `rand::Rng`.
//!
//! Uniform draws are quantized to millionths so that every random price
//! offset is an exact decimal and runs are reproducible from a seed.

use rand::Rng;
use rust_decimal::Decimal;

const RESOLUTION: i64 = 1_000_000;
const RESOLUTION_SCALE: u32 = 6;

/// Lot granularity for maker and taker sizes.
pub const LOT: u32 = 5;

/// U(0, 1), half open.
pub fn unit<R: Rng + ?Sized>(rng: &mut R) -> Decimal {
    Decimal::new(rng.gen_range(0..RESOLUTION), RESOLUTION_SCALE)
}

/// U(-0.5, 0.5), half open.
pub fn centered<R: Rng + ?Sized>(rng: &mut R) -> Decimal {
    unit(rng) - Decimal::new(5, 1)
}

/// A multiple of [`LOT`] in `[LOT, max_lots * LOT]`.
pub fn lots<R: Rng + ?Sized>(rng: &mut R, max_lots: u32) -> u32 {
    rng.gen_range(1..=max_lots.max(1)) * LOT
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use rust_decimal_macros::dec;

    #[test]
    fn test_draws_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1_000 {
            let u = unit(&mut rng);
            assert!(u >= dec!(0) && u < dec!(1));

            let c = centered(&mut rng);
            assert!(c >= dec!(-0.5) && c < dec!(0.5));

            let size = lots(&mut rng, 5);
            assert!((5..=25).contains(&size));
            assert_eq!(size % LOT, 0);
        }
    }

    #[test]
    fn test_same_seed_same_draws() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            assert_eq!(unit(&mut a), unit(&mut b));
            assert_eq!(lots(&mut a, 3), lots(&mut b, 3));
        }
    }
}
