// in lib.rs
pub mod account;
pub mod config;
pub mod controller;
pub mod engine;
pub mod fair_value;
pub mod history;
pub mod makers;
pub mod order_book;
pub mod quote;
pub mod random;
pub mod snapshot;
pub mod taker;
pub mod ticks;

// Re-export main types for easier use
pub use account::UserAccount;
pub use config::SimulationConfig;
pub use controller::Simulation;
pub use engine::{MarketEngine, TickReport};
pub use fair_value::FairValueWalker;
pub use history::{PriceHistory, PricePoint, TradeTape};
pub use makers::{MakerDraw, MakerQuoteGenerator, MakerQuotes};
pub use order_book::OrderBook;
pub use quote::{
    Fill, OrderSide, Quote, QuoteOwner, QuoteRequest, Side, TakerOrder, Trade, TradeId, UserQuote,
};
pub use snapshot::{MarketSnapshot, SimulationStatus};
pub use taker::TakerFlow;
pub use ticks::TickSize;
