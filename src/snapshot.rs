use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::history::PricePoint;
use crate::quote::{Quote, Trade, UserQuote};

/// Whether ticks are currently being scheduled.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationStatus {
    #[default]
    Stopped,
    Running,
}

/// Everything a display needs after a tick, detached from engine state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub status: SimulationStatus,
    /// Ticks completed since the engine was created
    pub tick: u64,
    pub fair_value: Decimal,
    /// Descending by price
    pub bids: Vec<Quote>,
    /// Ascending by price
    pub asks: Vec<Quote>,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub spread: Option<Decimal>,
    /// Newest first
    pub trades: Vec<Trade>,
    /// Oldest first
    pub price_history: Vec<PricePoint>,
    pub position: i64,
    pub cash: Decimal,
    pub pnl: Decimal,
    pub user_quote: UserQuote,
}

impl MarketSnapshot {
    pub fn is_running(&self) -> bool {
        self.status == SimulationStatus::Running
    }

    /// The user's quotes as they currently rest in the book, bid then ask.
    pub fn user_levels(&self) -> (Option<&Quote>, Option<&Quote>) {
        (user_level(&self.bids), user_level(&self.asks))
    }
}

fn user_level(side: &[Quote]) -> Option<&Quote> {
    side.iter().find(|q| q.owner.is_user())
}
