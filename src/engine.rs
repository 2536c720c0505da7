use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::account::UserAccount;
use crate::config::SimulationConfig;
use crate::fair_value::FairValueWalker;
use crate::history::{PriceHistory, TradeTape};
use crate::makers::MakerQuoteGenerator;
use crate::order_book::OrderBook;
use crate::quote::{Fill, QuoteOwner, QuoteRequest, Side, TakerOrder, Trade, TradeId, UserQuote};
use crate::snapshot::{MarketSnapshot, SimulationStatus};
use crate::taker::TakerFlow;
use crate::ticks::TickSize;

/// What a single tick produced.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub fair_value: Decimal,
    pub trade: Option<Trade>,
    pub pnl: Decimal,
}

/// The market tick engine.
///
/// Owns every piece of mutable game state: fair value, the current book, the
/// user's resting quote and account, and the bounded histories. A tick runs
/// these steps in order:
///
/// 1. Fair value takes one random walk step and is recorded
/// 2. Synthetic makers quote around the new fair value
/// 3. The user's resting quote is merged in
/// 4. Both sides are sorted
/// 5. At most one taker trades against the top of the book
/// 6. Exhausted quotes are pruned and the trade is taped
/// 7. P&L is marked to the new fair value
///
/// The random source is a type parameter so tests can seed or replace it.
///
/// # Example
/// ```
/// # use rust_decimal_macros::dec;
/// # use quotebook::{MarketEngine, QuoteRequest, SimulationConfig};
/// let config = SimulationConfig {
///     initial_price: dec!(4500.00),
///     seed: Some(7),
///     ..Default::default()
/// };
/// let mut engine = MarketEngine::new(config).unwrap();
/// engine
///     .set_user_quote(QuoteRequest {
///         bid_price: dec!(4499.50),
///         bid_size: 10,
///         ask_price: dec!(4500.50),
///         ask_size: 10,
///     })
///     .unwrap();
///
/// let report = engine.tick();
/// assert_eq!(report.tick, 1);
/// assert_eq!(report.pnl, engine.pnl());
/// ```
pub struct MarketEngine<R = StdRng> {
    config: SimulationConfig,
    tick_size: TickSize,
    walker: FairValueWalker,
    makers: MakerQuoteGenerator,
    takers: TakerFlow,
    book: OrderBook,
    user_quote: UserQuote,
    account: UserAccount,
    trades: TradeTape,
    prices: PriceHistory,
    next_trade_id: TradeId,
    ticks: u64,
    rng: R,
}

impl MarketEngine<StdRng> {
    /// Build an engine seeded from `config.seed`, or from entropy when unset.
    pub fn new(config: SimulationConfig) -> eyre::Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> MarketEngine<R> {
    pub fn with_rng(config: SimulationConfig, rng: R) -> eyre::Result<Self> {
        config.validate()?;
        let tick_size = TickSize::new(config.tick_size)?;

        let walker = FairValueWalker::new(config.initial_price, tick_size, config.price_volatility);
        let makers = MakerQuoteGenerator::new(
            config.num_makers,
            config.maker_spread_min,
            config.maker_spread_max,
            tick_size,
        );
        let takers = TakerFlow::new(config.taker_probability);

        let mut prices = PriceHistory::new(config.max_price_history);
        prices.record(Utc::now(), walker.value());

        Ok(Self {
            tick_size,
            walker,
            makers,
            takers,
            book: OrderBook::new(),
            user_quote: UserQuote::default(),
            account: UserAccount::new(),
            trades: TradeTape::new(config.max_trades),
            prices,
            next_trade_id: 0,
            ticks: 0,
            rng,
            config,
        })
    }

    // TradeId Incrementer
    fn next_trade_id(&mut self) -> TradeId {
        let id = self.next_trade_id;
        self.next_trade_id += 1;
        id
    }

    /// Replace the user's resting quote. Both sides change together; a zero
    /// size takes that side out of the book from the next tick on.
    pub fn set_user_quote(&mut self, request: QuoteRequest) -> eyre::Result<()> {
        request.validate()?;

        let quote = UserQuote::from_request(&request, self.tick_size);
        for (label, side) in [("Bid", &quote.bid), ("Ask", &quote.ask)] {
            if let Some(side) = side.as_ref().filter(|q| q.price <= Decimal::ZERO) {
                return Err(eyre::eyre!(
                    "{label} price rounds to {} on a {} tick",
                    side.price,
                    self.tick_size.value()
                ));
            }
        }

        if quote != self.user_quote {
            log::debug!(
                "user quote {:?} x {} / {:?} x {}",
                quote.bid.as_ref().map(|q| q.price),
                request.bid_size,
                quote.ask.as_ref().map(|q| q.price),
                request.ask_size
            );
        }
        self.user_quote = quote;

        Ok(())
    }

    pub fn clear_user_quote(&mut self) {
        self.user_quote = UserQuote::default();
    }

    /// Run one tick stamped with the current wall clock.
    pub fn tick(&mut self) -> TickReport {
        self.tick_at(Utc::now())
    }

    /// Run one tick stamped with `now`.
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> TickReport {
        let fair_value = self.walker.step(&mut self.rng);
        self.prices.record(now, fair_value);

        let makers = self.makers.generate(fair_value, &mut self.rng);
        self.book = OrderBook::from_makers(makers, &self.user_quote);

        let trade = match self.takers.arrive(&mut self.rng) {
            Some(taker) => self.execute(taker, now),
            None => None,
        };
        self.book.prune();
        self.ticks += 1;

        let pnl = self.pnl();
        log::trace!(
            "tick {} fair value {} bid {:?} ask {:?} pnl {}",
            self.ticks,
            fair_value,
            self.book.best_bid(),
            self.book.best_ask(),
            pnl
        );

        TickReport {
            tick: self.ticks,
            fair_value,
            trade,
            pnl,
        }
    }

    /// Match one taker against the current book and settle the result.
    fn execute(&mut self, taker: TakerOrder, now: DateTime<Utc>) -> Option<Trade> {
        let fill = self.book.match_taker(taker)?;

        if fill.maker.is_user() {
            if let Err(e) = self.settle_user_fill(&fill) {
                // Pull the side rather than print a trade the account cannot hold
                log::error!("withdrawing user {:?}: {e}", fill.side);
                self.withdraw_user_side(fill.side);
                return None;
            }
        }

        let trade = Trade::from_fill(self.next_trade_id(), &fill, now);
        log::debug!(
            "trade {} {:?} {} @ {} against {}",
            trade.id,
            trade.side,
            trade.size,
            trade.price,
            fill.maker
        );
        self.trades.record(trade.clone());

        Some(trade)
    }

    /// A fill against the user moves the account and consumes the resting
    /// quote; a fully filled side leaves the book.
    fn settle_user_fill(&mut self, fill: &Fill) -> eyre::Result<()> {
        self.account.apply_fill(fill)?;

        let side = match fill.side {
            Side::Bid => &mut self.user_quote.bid,
            Side::Ask => &mut self.user_quote.ask,
        };
        if let Some(quote) = side.as_mut() {
            quote.size = quote.size.saturating_sub(fill.size);
        }
        if side.as_ref().is_some_and(|q| q.size == 0) {
            *side = None;
        }

        log::debug!(
            "user {:?} filled {} @ {}, position {} cash {}",
            fill.side,
            fill.size,
            fill.price,
            self.account.position(),
            self.account.cash()
        );
        Ok(())
    }

    fn withdraw_user_side(&mut self, side: Side) {
        match side {
            Side::Bid => self.user_quote.bid = None,
            Side::Ask => self.user_quote.ask = None,
        }
        self.book.withdraw(side, QuoteOwner::User);
    }

    pub fn fair_value(&self) -> Decimal {
        self.walker.value()
    }

    pub fn position(&self) -> i64 {
        self.account.position()
    }

    pub fn cash(&self) -> Decimal {
        self.account.cash()
    }

    /// Mark-to-market P&L at the current fair value.
    pub fn pnl(&self) -> Decimal {
        self.account.pnl(self.fair_value())
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn user_quote(&self) -> &UserQuote {
        &self.user_quote
    }

    pub fn trades(&self) -> &TradeTape {
        &self.trades
    }

    pub fn price_history(&self) -> &PriceHistory {
        &self.prices
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick_size(&self) -> TickSize {
        self.tick_size
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Copy the current state out for display.
    pub fn snapshot(&self, status: SimulationStatus) -> MarketSnapshot {
        MarketSnapshot {
            status,
            tick: self.ticks,
            fair_value: self.fair_value(),
            bids: self.book.bids().to_vec(),
            asks: self.book.asks().to_vec(),
            best_bid: self.book.best_bid(),
            best_ask: self.book.best_ask(),
            spread: self.book.spread(),
            trades: self.trades.iter().cloned().collect(),
            price_history: self.prices.iter().cloned().collect(),
            position: self.position(),
            cash: self.cash(),
            pnl: self.pnl(),
            user_quote: self.user_quote.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::{OrderSide, Quote};
    use rust_decimal_macros::dec;

    fn config() -> SimulationConfig {
        SimulationConfig {
            initial_price: dec!(4500.00),
            seed: Some(2024),
            ..Default::default()
        }
    }

    fn scenario_quote() -> QuoteRequest {
        QuoteRequest {
            bid_price: dec!(4499.50),
            bid_size: 10,
            ask_price: dec!(4500.50),
            ask_size: 10,
        }
    }

    /// Book with only the user's quote resting, as if makers were absent.
    fn user_only_book(engine: &mut MarketEngine) {
        engine.book = OrderBook::assemble(vec![], vec![], &engine.user_quote);
    }

    #[test]
    fn test_sell_taker_fills_user_bid() {
        let mut engine = MarketEngine::new(config()).expect("valid config");
        engine.set_user_quote(scenario_quote()).expect("valid quote");
        user_only_book(&mut engine);

        let trade = engine
            .execute(
                TakerOrder {
                    side: OrderSide::Sell,
                    size: 10,
                },
                Utc::now(),
            )
            .expect("user bid is best");
        engine.book.prune();

        assert_eq!(trade.price, dec!(4499.50));
        assert_eq!(trade.size, 10);
        assert_eq!(trade.side, Side::Bid);
        assert_eq!(engine.position(), 10);
        assert_eq!(engine.cash(), dec!(-44995.00));
        assert_eq!(engine.fair_value(), dec!(4500.00));
        assert_eq!(engine.pnl(), dec!(5.00));

        // Fully filled bid leaves the book and the user's quote
        assert!(engine.book().bids().is_empty());
        assert!(engine.user_quote().bid.is_none());
        assert!(engine.user_quote().ask.is_some());
        assert_eq!(engine.trades().latest(), Some(&trade));
    }

    #[test]
    fn test_partial_fill_shrinks_user_quote() {
        let mut engine = MarketEngine::new(config()).expect("valid config");
        engine.set_user_quote(scenario_quote()).expect("valid quote");
        user_only_book(&mut engine);

        engine
            .execute(
                TakerOrder {
                    side: OrderSide::Buy,
                    size: 5,
                },
                Utc::now(),
            )
            .expect("user ask is best");

        assert_eq!(engine.position(), -5);
        assert_eq!(engine.cash(), dec!(22502.50));
        assert_eq!(
            engine.user_quote().ask,
            Some(Quote::new(QuoteOwner::User, dec!(4500.50), 5))
        );
    }

    #[test]
    fn test_fill_against_maker_leaves_account_alone() {
        let mut engine = MarketEngine::new(config()).expect("valid config");
        engine.set_user_quote(scenario_quote()).expect("valid quote");
        engine.book = OrderBook::assemble(
            vec![Quote::new(QuoteOwner::Maker(0), dec!(4499.75), 5)],
            vec![],
            &engine.user_quote,
        );

        let trade = engine
            .execute(
                TakerOrder {
                    side: OrderSide::Sell,
                    size: 15,
                },
                Utc::now(),
            )
            .expect("maker bid is best");

        assert_eq!(trade.price, dec!(4499.75));
        assert_eq!(trade.size, 5);
        assert_eq!(engine.position(), 0);
        assert_eq!(engine.cash(), dec!(0));
        assert_eq!(engine.user_quote().bid.as_ref().map(|q| q.size), Some(10));
    }

    #[test]
    fn test_tick_publishes_sorted_book() {
        let mut engine = MarketEngine::new(config()).expect("valid config");
        engine.set_user_quote(scenario_quote()).expect("valid quote");

        for expected in 1..=50 {
            let report = engine.tick();
            assert_eq!(report.tick, expected);
            assert_eq!(report.fair_value, engine.fair_value());

            let book = engine.book();
            assert!(book.bids().windows(2).all(|w| w[0].price >= w[1].price));
            assert!(book.asks().windows(2).all(|w| w[0].price <= w[1].price));
            assert!(book.bids().iter().chain(book.asks()).all(|q| q.size > 0));
        }
    }

    #[test]
    fn test_quiet_market_without_takers() {
        let mut engine = MarketEngine::new(SimulationConfig {
            taker_probability: 0.0,
            price_volatility: dec!(0),
            ..config()
        })
        .expect("valid config");
        engine.set_user_quote(scenario_quote()).expect("valid quote");

        for _ in 0..20 {
            let report = engine.tick();
            assert!(report.trade.is_none());
            assert_eq!(report.fair_value, dec!(4500.00));
        }

        assert!(engine.trades().is_empty());
        assert_eq!(engine.pnl(), dec!(0));
        // 10 makers plus the user on each side
        assert_eq!(engine.book().bids().len(), 11);
        assert_eq!(engine.book().asks().len(), 11);
    }

    #[test]
    fn test_same_seed_same_session() {
        let mut a = MarketEngine::new(config()).expect("valid config");
        let mut b = MarketEngine::new(config()).expect("valid config");
        let now = Utc::now();

        for _ in 0..100 {
            let ra = a.tick_at(now);
            let rb = b.tick_at(now);
            assert_eq!(ra, rb);
        }
        assert_eq!(a.book(), b.book());
    }

    #[test]
    fn test_setting_same_quote_twice_is_unobservable() {
        let mut engine = MarketEngine::new(config()).expect("valid config");
        engine.set_user_quote(scenario_quote()).expect("valid quote");
        let first = engine.snapshot(SimulationStatus::Stopped);

        engine.set_user_quote(scenario_quote()).expect("valid quote");
        assert_eq!(engine.snapshot(SimulationStatus::Stopped), first);
    }

    #[test]
    fn test_rejects_invalid_quote() {
        let mut engine = MarketEngine::new(config()).expect("valid config");
        engine.set_user_quote(scenario_quote()).expect("valid quote");

        let bad = QuoteRequest {
            bid_price: dec!(0),
            ..scenario_quote()
        };
        assert!(engine.set_user_quote(bad).is_err());
        // Previous quote untouched
        assert_eq!(
            engine.user_quote().bid.as_ref().map(|q| q.price),
            Some(dec!(4499.50))
        );

        engine.clear_user_quote();
        assert!(engine.user_quote().is_empty());
    }

    #[test]
    fn test_rejects_price_that_rounds_to_zero() {
        let mut engine = MarketEngine::new(config()).expect("valid config");
        engine.set_user_quote(scenario_quote()).expect("valid quote");

        // Positive as typed, but 0.1 snaps to 0 on a 0.25 tick
        let request = QuoteRequest::from_f64(0.1, 10, 4500.5, 10).expect("positive prices");
        assert!(engine.set_user_quote(request).is_err());
        assert_eq!(
            engine.user_quote().bid.as_ref().map(|q| q.price),
            Some(dec!(4499.50))
        );

        // A removed side may still round to zero
        let request = QuoteRequest::from_f64(0.1, 0, 4500.5, 10).expect("valid request");
        engine.set_user_quote(request).expect("bid side is out");
        assert!(engine.user_quote().bid.is_none());
    }

    #[test]
    fn test_rejects_price_too_large_to_settle() {
        let mut engine = MarketEngine::new(SimulationConfig {
            num_makers: 0,
            taker_probability: 1.0,
            ..config()
        })
        .expect("valid config");

        let request = QuoteRequest {
            bid_price: dec!(10000000000000000000000000000),
            bid_size: 15,
            ask_price: dec!(10000000000000000000000000000),
            ask_size: 15,
        };
        assert!(engine.set_user_quote(request).is_err());
        assert!(engine.user_quote().is_empty());

        for _ in 0..20 {
            assert!(engine.tick().trade.is_none());
        }
    }

    #[test]
    fn test_unsettleable_fill_withdraws_user_side() {
        let mut engine = MarketEngine::new(config()).expect("valid config");
        engine.set_user_quote(scenario_quote()).expect("valid quote");
        engine.account = UserAccount::with_balance(0, Decimal::MAX);
        user_only_book(&mut engine);

        let trade = engine.execute(
            TakerOrder {
                side: OrderSide::Buy,
                size: 5,
            },
            Utc::now(),
        );

        assert!(trade.is_none());
        assert!(engine.trades().is_empty());
        assert_eq!(engine.cash(), Decimal::MAX);
        assert!(engine.user_quote().ask.is_none());
        assert!(engine.book().asks().is_empty());
        // The other side keeps quoting
        assert_eq!(engine.user_quote().bid.as_ref().map(|q| q.size), Some(10));
    }

    #[test]
    fn test_price_history_seeded_with_initial_price() {
        let engine = MarketEngine::new(config()).expect("valid config");
        let snapshot = engine.snapshot(SimulationStatus::Stopped);

        assert_eq!(snapshot.tick, 0);
        assert_eq!(snapshot.price_history.len(), 1);
        assert_eq!(snapshot.price_history[0].price, dec!(4500.00));
        assert!(snapshot.bids.is_empty());
        assert_eq!(snapshot.spread, None);
    }
}
