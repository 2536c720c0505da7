use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// The minimum price increment of the simulated market.
///
/// Every price the engine publishes is a multiple of the tick size. The three
/// alignment helpers mirror how prices are produced:
/// - `round` for the fair value walk (nearest tick, halves away from zero)
/// - `floor` for maker bids (never better than the maker intended)
/// - `ceil` for maker asks
///
/// # Example
/// ```
/// # use rust_decimal_macros::dec;
/// # use quotebook::TickSize;
/// let tick = TickSize::new(dec!(0.25)).unwrap();
/// assert_eq!(tick.round(dec!(100.13)), dec!(100.25));
/// assert_eq!(tick.floor(dec!(100.49)), dec!(100.25));
/// assert_eq!(tick.ceil(dec!(100.01)), dec!(100.25));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSize(Decimal);

impl TickSize {
    pub fn new(size: Decimal) -> eyre::Result<Self> {
        if size <= Decimal::ZERO {
            return Err(eyre::eyre!("Tick size must be positive"));
        }

        Ok(Self(size))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Nearest tick. Exact half ticks round away from zero.
    pub fn round(&self, price: Decimal) -> Decimal {
        (price / self.0).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * self.0
    }

    /// Highest tick at or below `price`.
    pub fn floor(&self, price: Decimal) -> Decimal {
        (price / self.0).floor() * self.0
    }

    /// Lowest tick at or above `price`.
    pub fn ceil(&self, price: Decimal) -> Decimal {
        (price / self.0).ceil() * self.0
    }

    /// Convert a distance measured in ticks into price units.
    pub fn ticks(&self, count: Decimal) -> Decimal {
        count * self.0
    }

    /// Convert a price distance into a (possibly fractional) tick count.
    pub fn count(&self, distance: Decimal) -> Decimal {
        distance / self.0
    }

    pub fn is_aligned(&self, price: Decimal) -> bool {
        (price % self.0).is_zero()
    }
}
