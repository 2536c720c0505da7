use rand::Rng;
use rust_decimal::Decimal;

use crate::random;
use crate::ticks::TickSize;

/// The simulated "true" price, evolving as a bounded random walk.
///
/// Each step moves the value by at most `volatility` ticks in either
/// direction and snaps the result to the nearest tick:
///
/// `f' = round_to_tick(f + U(-0.5, 0.5) * volatility * 2 * tick_size)`
pub struct FairValueWalker {
    value: Decimal,
    tick_size: TickSize,
    volatility: Decimal,
}

impl FairValueWalker {
    pub fn new(initial: Decimal, tick_size: TickSize, volatility: Decimal) -> Self {
        Self {
            value: tick_size.round(initial),
            tick_size,
            volatility,
        }
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Advance one step using a fresh draw from `rng`.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Decimal {
        let shock = random::centered(rng);
        self.step_with(shock)
    }

    /// Advance one step with an explicit shock in `[-0.5, 0.5)`.
    pub fn step_with(&mut self, shock: Decimal) -> Decimal {
        let moved = self.value + shock * self.volatility * Decimal::TWO * self.tick_size.value();
        self.value = self.tick_size.round(moved);
        self.value
    }
}
