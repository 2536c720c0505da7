use rand::Rng;
use rust_decimal::Decimal;

use crate::quote::{Quote, QuoteOwner};
use crate::random;
use crate::ticks::TickSize;

/// Largest maker size, in lots of [`random::LOT`].
const MAKER_MAX_LOTS: u32 = 5;

/// One tick's worth of synthetic liquidity, unsorted.
#[derive(Debug, Default)]
pub struct MakerQuotes {
    pub bids: Vec<Quote>,
    pub asks: Vec<Quote>,
}

/// Random draws behind a single maker's quote pair.
///
/// # Fields
/// * `spread` - Position within the spread range, in `[0, 1)`
/// * `offset` - Displacement of the quote center, in `[-0.5, 0.5)`
/// * `size` - Size posted on both sides
#[derive(Copy, Clone, Debug)]
pub struct MakerDraw {
    pub spread: Decimal,
    pub offset: Decimal,
    pub size: u32,
}

impl MakerDraw {
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            spread: random::unit(rng),
            offset: random::centered(rng),
            size: random::lots(rng, MAKER_MAX_LOTS),
        }
    }
}

/// Generates independent two-sided quotes around fair value.
///
/// Each maker picks a spread between `spread_min` and `spread_max` ticks,
/// centers it within one tick of fair value and rounds outward: the bid
/// down and the ask up to the nearest tick. The outward rounding means
/// `ask - bid >= spread_min * tick_size` whenever `spread_min > 0`.
pub struct MakerQuoteGenerator {
    num_makers: u32,
    spread_min: Decimal,
    spread_max: Decimal,
    tick_size: TickSize,
}

impl MakerQuoteGenerator {
    pub fn new(num_makers: u32, spread_min: Decimal, spread_max: Decimal, tick_size: TickSize) -> Self {
        Self {
            num_makers,
            spread_min,
            spread_max,
            tick_size,
        }
    }

    pub fn num_makers(&self) -> u32 {
        self.num_makers
    }

    pub fn generate<R: Rng + ?Sized>(&self, fair_value: Decimal, rng: &mut R) -> MakerQuotes {
        let capacity = self.num_makers as usize;
        let mut quotes = MakerQuotes {
            bids: Vec::with_capacity(capacity),
            asks: Vec::with_capacity(capacity),
        };

        for index in 0..self.num_makers {
            let draw = MakerDraw::sample(rng);
            let (bid, ask) = self.quote_pair(index, fair_value, draw);
            quotes.bids.push(bid);
            quotes.asks.push(ask);
        }

        quotes
    }

    /// Build maker `index`'s bid and ask from a given draw.
    pub fn quote_pair(&self, index: u32, fair_value: Decimal, draw: MakerDraw) -> (Quote, Quote) {
        let tick = self.tick_size.value();
        let spread = self
            .tick_size
            .ticks(self.spread_min + draw.spread * (self.spread_max - self.spread_min));
        let center = fair_value + draw.offset * tick * Decimal::TWO;
        let half_spread = spread / Decimal::TWO;

        let bid_price = self.tick_size.floor(center - half_spread);
        let ask_price = self.tick_size.ceil(center + half_spread);

        if bid_price >= ask_price {
            // Left as is: a locked or crossed maker is part of the game's behavior
            log::debug!(
                "maker {index} quoted {bid_price} / {ask_price} with spread {spread}"
            );
        }

        let owner = QuoteOwner::Maker(index);
        (
            Quote::new(owner, bid_price, draw.size),
            Quote::new(owner, ask_price, draw.size),
        )
    }
}
