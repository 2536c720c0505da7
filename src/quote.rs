use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ticks::TickSize;

/// Identifier for trades. Implemented as a simple incrementing counter,
/// which is sufficient as trades never leave the engine that numbered them.
pub type TradeId = u64;

/// Who is resting a quote in the book.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum QuoteOwner {
    /// The human player.
    User,
    /// A synthetic maker, identified by its index within the tick.
    Maker(u32),
}

impl QuoteOwner {
    pub fn is_user(&self) -> bool {
        matches!(self, QuoteOwner::User)
    }
}

impl fmt::Display for QuoteOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteOwner::User => write!(f, "USER"),
            QuoteOwner::Maker(index) => write!(f, "MM-{index}"),
        }
    }
}

/// The side of a resting quote.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

/// The direction of an aggressive (taker) order.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The resting side a taker in this direction trades against.
    pub fn resting_side(&self) -> Side {
        match self {
            OrderSide::Buy => Side::Ask,
            OrderSide::Sell => Side::Bid,
        }
    }
}

/// A resting price and size posted by a maker.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Quote {
    pub owner: QuoteOwner,
    pub price: Decimal,
    pub size: u32,
}

impl Quote {
    pub fn new(owner: QuoteOwner, price: Decimal, size: u32) -> Self {
        Self { owner, price, size }
    }
}

/// An aggressive order arriving from outside the book.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct TakerOrder {
    pub side: OrderSide,
    pub size: u32,
}

/// The result of a taker hitting the top of the book.
///
/// # Fields
/// * `price` - The resting quote's price
/// * `size` - Executed size, at most the smaller of taker and resting size
/// * `side` - The side of the resting quote that was hit
/// * `maker` - Owner of the resting quote
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Fill {
    pub price: Decimal,
    pub size: u32,
    pub side: Side,
    pub maker: QuoteOwner,
}

/// A printed trade, as shown on the tape.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub price: Decimal,
    pub size: u32,
    /// Side of the resting quote that was hit
    pub side: Side,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    pub fn from_fill(id: TradeId, fill: &Fill, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            price: fill.price,
            size: fill.size,
            side: fill.side,
            timestamp,
        }
    }
}

/// The user's persistent two-sided quote. A missing side is not quoted.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct UserQuote {
    pub bid: Option<Quote>,
    pub ask: Option<Quote>,
}

impl UserQuote {
    /// Build the quote from a validated request. Sides with zero size are dropped
    /// and prices are normalized to the nearest tick.
    pub fn from_request(request: &QuoteRequest, tick_size: TickSize) -> Self {
        let side = |price: Decimal, size: u32| {
            (size > 0).then(|| Quote::new(QuoteOwner::User, tick_size.round(price), size))
        };

        Self {
            bid: side(request.bid_price, request.bid_size),
            ask: side(request.ask_price, request.ask_size),
        }
    }

    /// A symmetric quote `ticks_away` ticks either side of `fair_value`.
    ///
    /// # Example
    /// ```
    /// # use rust_decimal_macros::dec;
    /// # use quotebook::{TickSize, UserQuote};
    /// let tick = TickSize::new(dec!(0.25)).unwrap();
    /// let quote = UserQuote::around(dec!(4500.00), tick, 2, 10);
    /// assert_eq!(quote.bid.unwrap().price, dec!(4499.50));
    /// assert_eq!(quote.ask.unwrap().price, dec!(4500.50));
    /// ```
    pub fn around(fair_value: Decimal, tick_size: TickSize, ticks_away: u32, size: u32) -> Self {
        Self::from_request(
            &QuoteRequest::around(fair_value, tick_size, ticks_away, size),
            tick_size,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.bid.is_none() && self.ask.is_none()
    }
}

/// A quote update coming from outside the engine.
///
/// Construct it directly from already typed values, or through
/// [`QuoteRequest::from_f64`] / [`str::parse`] which reject malformed input.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub bid_price: Decimal,
    pub bid_size: u32,
    pub ask_price: Decimal,
    pub ask_size: u32,
}

impl QuoteRequest {
    /// Request both sides `ticks_away` ticks from `fair_value`, `size` each.
    pub fn around(fair_value: Decimal, tick_size: TickSize, ticks_away: u32, size: u32) -> Self {
        let offset = tick_size.ticks(Decimal::from(ticks_away));
        Self {
            bid_price: fair_value - offset,
            bid_size: size,
            ask_price: fair_value + offset,
            ask_size: size,
        }
    }

    /// Validate raw numeric input, as typed into a form.
    pub fn from_f64(bid_price: f64, bid_size: i64, ask_price: f64, ask_size: i64) -> eyre::Result<Self> {
        let request = Self {
            bid_price: parse_price("bid", bid_price)?,
            bid_size: parse_size("bid", bid_size)?,
            ask_price: parse_price("ask", ask_price)?,
            ask_size: parse_size("ask", ask_size)?,
        };
        request.validate()?;
        Ok(request)
    }

    /// A live side (non-zero size) must carry a positive price small enough
    /// that any fill's notional fits in a [`Decimal`].
    pub fn validate(&self) -> eyre::Result<()> {
        validate_side("Bid", self.bid_price, self.bid_size)?;
        validate_side("Ask", self.ask_price, self.ask_size)
    }
}

fn validate_side(label: &str, price: Decimal, size: u32) -> eyre::Result<()> {
    if size == 0 {
        return Ok(());
    }

    if price <= Decimal::ZERO {
        return Err(eyre::eyre!("{label} price must be positive"));
    }

    if price.checked_mul(Decimal::from(u32::MAX)).is_none() {
        return Err(eyre::eyre!("{label} price {price} is too large"));
    }

    Ok(())
}

fn parse_price(label: &str, price: f64) -> eyre::Result<Decimal> {
    if !price.is_finite() {
        return Err(eyre::eyre!("{label} price must be a finite number"));
    }

    Decimal::try_from(price).map_err(|e| eyre::eyre!("{label} price {price} is out of range: {e}"))
}

fn parse_size(label: &str, size: i64) -> eyre::Result<u32> {
    if size < 0 {
        return Err(eyre::eyre!("{label} size must not be negative"));
    }

    u32::try_from(size).map_err(|_| eyre::eyre!("{label} size {size} is too large"))
}

/// Parses `BID_PX,BID_SZ,ASK_PX,ASK_SZ`, e.g. `4499.50,10,4500.50,10`.
impl FromStr for QuoteRequest {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        let &[bid_price, bid_size, ask_price, ask_size] = fields.as_slice() else {
            return Err(eyre::eyre!(
                "Expected BID_PX,BID_SZ,ASK_PX,ASK_SZ but got {} fields",
                fields.len()
            ));
        };

        let price = |label: &str, text: &str| -> eyre::Result<Decimal> {
            Decimal::from_str(text).map_err(|e| eyre::eyre!("Invalid {label} price {text:?}: {e}"))
        };
        let size = |label: &str, text: &str| -> eyre::Result<u32> {
            let size: i64 = text
                .parse()
                .map_err(|e| eyre::eyre!("Invalid {label} size {text:?}: {e}"))?;
            parse_size(label, size)
        };

        let request = Self {
            bid_price: price("bid", bid_price)?,
            bid_size: size("bid", bid_size)?,
            ask_price: price("ask", ask_price)?,
            ask_size: size("ask", ask_size)?,
        };
        request.validate()?;
        Ok(request)
    }
}
