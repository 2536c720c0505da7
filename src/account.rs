use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::quote::{Fill, Side};

/// The user's inventory and running cash.
///
/// Only fills against the user's own resting quote touch it. Profit is never
/// stored: it is marked to the current fair value on demand.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    position: i64,
    cash: Decimal,
}

impl UserAccount {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn with_balance(position: i64, cash: Decimal) -> Self {
        Self { position, cash }
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// Book a fill in which the user was the resting side.
    ///
    /// Ask filled: the user sold, cash up and position down.
    /// Bid filled: the user bought, cash down and position up.
    ///
    /// Fails without touching the account if cash or position would overflow.
    pub fn apply_fill(&mut self, fill: &Fill) -> eyre::Result<()> {
        let size = i64::from(fill.size);
        let notional = fill
            .price
            .checked_mul(Decimal::from(fill.size))
            .ok_or_else(|| eyre::eyre!("Notional of {} @ {} overflows", fill.size, fill.price))?;

        let (cash, position) = match fill.side {
            Side::Ask => (
                self.cash.checked_add(notional),
                self.position.checked_sub(size),
            ),
            Side::Bid => (
                self.cash.checked_sub(notional),
                self.position.checked_add(size),
            ),
        };

        let (Some(cash), Some(position)) = (cash, position) else {
            return Err(eyre::eyre!(
                "Fill of {} @ {} overflows the account",
                fill.size,
                fill.price
            ));
        };

        self.cash = cash;
        self.position = position;
        Ok(())
    }

    /// Mark-to-market P&L: `fair_value * position + cash`, saturating at the
    /// [`Decimal`] bounds.
    pub fn pnl(&self, fair_value: Decimal) -> Decimal {
        fair_value
            .saturating_mul(Decimal::from(self.position))
            .saturating_add(self.cash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::QuoteOwner;
    use rust_decimal_macros::dec;

    fn user_fill(price: Decimal, size: u32, side: Side) -> Fill {
        Fill {
            price,
            size,
            side,
            maker: QuoteOwner::User,
        }
    }

    #[test]
    fn test_bid_fill_buys() {
        let mut account = UserAccount::new();
        account.apply_fill(&user_fill(dec!(4499.50), 10, Side::Bid)).expect("fits");

        assert_eq!(account.position(), 10);
        assert_eq!(account.cash(), dec!(-44995.00));
        assert_eq!(account.pnl(dec!(4500.00)), dec!(5.00));
    }

    #[test]
    fn test_ask_fill_sells() {
        let mut account = UserAccount::new();
        account.apply_fill(&user_fill(dec!(4500.50), 5, Side::Ask)).expect("fits");

        assert_eq!(account.position(), -5);
        assert_eq!(account.cash(), dec!(22502.50));
        assert_eq!(account.pnl(dec!(4500.00)), dec!(2.50));
        assert_eq!(account.pnl(dec!(4501.00)), dec!(-2.50));
    }

    #[test]
    fn test_round_trip_realizes_spread() {
        let mut account = UserAccount::new();
        account.apply_fill(&user_fill(dec!(4499.50), 10, Side::Bid)).expect("fits");
        account.apply_fill(&user_fill(dec!(4500.50), 10, Side::Ask)).expect("fits");

        assert_eq!(account.position(), 0);
        assert_eq!(account.cash(), dec!(10.00));
        // Flat book: P&L no longer depends on fair value
        assert_eq!(account.pnl(dec!(1)), account.pnl(dec!(100000)));
    }

    #[test]
    fn test_overflowing_fill_leaves_account_untouched() {
        let mut account = UserAccount {
            position: 3,
            cash: Decimal::MAX,
        };

        assert!(account.apply_fill(&user_fill(dec!(1), 5, Side::Ask)).is_err());
        assert!(account.apply_fill(&user_fill(Decimal::MAX, 2, Side::Bid)).is_err());
        assert_eq!(account.position(), 3);
        assert_eq!(account.cash(), Decimal::MAX);

        // Still settles fills that fit
        account.apply_fill(&user_fill(dec!(1), 5, Side::Bid)).expect("fits");
        assert_eq!(account.position(), 8);
    }

    #[test]
    fn test_pnl_saturates_instead_of_panicking() {
        let account = UserAccount {
            position: i64::MAX,
            cash: Decimal::MAX,
        };

        assert_eq!(account.pnl(Decimal::MAX), Decimal::MAX);
        assert_eq!(account.pnl(dec!(0)), Decimal::MAX);
    }
}
