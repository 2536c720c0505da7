use rand::Rng;

use crate::quote::{OrderSide, TakerOrder};
use crate::random;

/// Largest taker size, in lots of [`random::LOT`].
const TAKER_MAX_LOTS: u32 = 3;

/// Aggressive order flow: at most one taker per tick.
pub struct TakerFlow {
    probability: f64,
}

impl TakerFlow {
    /// `probability` is clamped to `[0, 1]`; NaN means no takers.
    pub fn new(probability: f64) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };

        Self { probability }
    }

    /// Draw this tick's taker, if one shows up. Direction is a fair coin and
    /// size a multiple of 5 in `[5, 15]`.
    pub fn arrive<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<TakerOrder> {
        if !rng.gen_bool(self.probability) {
            return None;
        }

        let side = if rng.gen_bool(0.5) {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };

        Some(TakerOrder {
            side,
            size: random::lots(rng, TAKER_MAX_LOTS),
        })
    }
}
