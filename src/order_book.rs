use crate::makers::MakerQuotes;
use crate::quote::{Fill, OrderSide, Quote, QuoteOwner, Side, TakerOrder, UserQuote};
use crate::ticks::TickSize;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The book published after every tick.
///
/// Unlike a persistent limit order book, this one is rebuilt from scratch each
/// tick: synthetic makers requote, the user's resting quote is merged in, and
/// both sides are sorted best price first.
///
/// # Ordering
/// - Bids: descending by price
/// - Asks: ascending by price
/// - Equal prices keep insertion order (makers by index, then the user)
///
/// # Matching
/// A taker only ever trades against the head of one side, for at most the
/// head's size. There is no sweeping through deeper levels.
///
/// # Example
/// ```
/// # use rust_decimal_macros::dec;
/// # use quotebook::{OrderBook, OrderSide, Quote, QuoteOwner, TakerOrder, UserQuote};
/// let user = UserQuote {
///     bid: Some(Quote::new(QuoteOwner::User, dec!(4499.75), 10)),
///     ask: None,
/// };
/// let mut book = OrderBook::assemble(
///     vec![Quote::new(QuoteOwner::Maker(0), dec!(4499.50), 20)],
///     vec![Quote::new(QuoteOwner::Maker(0), dec!(4500.50), 20)],
///     &user,
/// );
/// assert_eq!(book.best_bid(), Some(dec!(4499.75)));
///
/// let fill = book
///     .match_taker(TakerOrder { side: OrderSide::Sell, size: 15 })
///     .expect("bid side has liquidity");
/// assert_eq!(fill.size, 10);
/// assert_eq!(fill.maker, QuoteOwner::User);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub(crate) bids: Vec<Quote>,
    pub(crate) asks: Vec<Quote>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge maker quotes with the user's resting quote and sort both sides.
    pub fn assemble(mut bids: Vec<Quote>, mut asks: Vec<Quote>, user: &UserQuote) -> Self {
        bids.extend(user.bid.iter().filter(|q| q.size > 0).cloned());
        asks.extend(user.ask.iter().filter(|q| q.size > 0).cloned());

        // Vec::sort_by is stable, so equal prices keep insertion order
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));

        Self { bids, asks }
    }

    pub fn from_makers(makers: MakerQuotes, user: &UserQuote) -> Self {
        Self::assemble(makers.bids, makers.asks, user)
    }

    // Taker Matching Logic
    //
    // A buy taker lifts the best ask, a sell taker hits the best bid. The fill
    // is min(taker size, resting size) at the resting price and the resting
    // quote shrinks in place. Anything the head cannot absorb is dropped: the
    // taker does not walk the book.
    //
    // Example:
    // Sell taker of 15 against bids
    // Price     Size   Owner
    // 4499.75   10     USER
    // 4499.50   20     MM-0
    //
    // Fills 10 at 4499.75 against USER; the remaining 5 is not executed.
    pub fn match_taker(&mut self, taker: TakerOrder) -> Option<Fill> {
        let side = taker.side.resting_side();
        let book_side = match taker.side {
            OrderSide::Buy => &mut self.asks,
            OrderSide::Sell => &mut self.bids,
        };

        let best = book_side.first_mut()?;
        let executed = taker.size.min(best.size);
        if executed == 0 {
            return None;
        }

        best.size -= executed;

        Some(Fill {
            price: best.price,
            size: executed,
            side,
            maker: best.owner,
        })
    }

    /// Drop every exhausted quote from both sides.
    pub fn prune(&mut self) {
        self.bids.retain(|q| q.size > 0);
        self.asks.retain(|q| q.size > 0);
    }

    /// Take every quote of `owner` off one side.
    pub fn withdraw(&mut self, side: Side, owner: QuoteOwner) {
        let quotes = match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };
        quotes.retain(|q| q.owner != owner);
    }

    pub fn bids(&self) -> &[Quote] {
        &self.bids
    }

    pub fn asks(&self) -> &[Quote] {
        &self.asks
    }

    pub fn side(&self, side: Side) -> &[Quote] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Helpers
    /// Get the best (highest) bid price if any bids exist
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|q| q.price)
    }

    /// Get the best (lowest) ask price if any asks exist
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|q| q.price)
    }

    /// Get the current spread (best_ask - best_bid)
    /// Returns None if either side is empty
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }

    /// The spread measured in ticks
    pub fn spread_in_ticks(&self, tick_size: TickSize) -> Option<Decimal> {
        self.spread().map(|spread| tick_size.count(spread))
    }

    /// Midpoint of the best bid and ask
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// Get the best bid and ask prices
    /// Returns (bid, ask) tuple, either value may be None
    pub fn best_prices(&self) -> (Option<Decimal>, Option<Decimal>) {
        (self.best_bid(), self.best_ask())
    }

    /// Get the size resting at the head of the bid side
    pub fn best_bid_volume(&self) -> Option<u32> {
        self.bids.first().map(|q| q.size)
    }

    /// Get the size resting at the head of the ask side
    pub fn best_ask_volume(&self) -> Option<u32> {
        self.asks.first().map(|q| q.size)
    }
}
