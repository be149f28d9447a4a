use log::{debug, warn};

/// The lounge's cash. Never negative.
#[derive(Debug, Clone, Default)]
pub struct BalanceLedger {
    balance: f64,
}

impl BalanceLedger {
    pub fn new(starting_balance: f64) -> Self {
        Self {
            balance: starting_balance.max(0.0),
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Credit `amount`; negative or non-finite amounts are ignored
    pub fn add(&mut self, amount: f64) {
        if !amount.is_finite() || amount < 0.0 {
            warn!("[Ledger] Ignoring invalid credit of {}", amount);
            return;
        }
        self.balance += amount;
    }

    /// Debit `amount` if the balance covers it; otherwise leave it untouched
    pub fn try_spend(&mut self, amount: f64) -> bool {
        if !amount.is_finite() || amount < 0.0 || amount > self.balance {
            debug!(
                "[Ledger] Refused to spend {:.2} with balance {:.2}",
                amount, self.balance
            );
            return false;
        }
        self.balance -= amount;
        true
    }

    /// Pay back a customer. If the till cannot cover the full amount it is
    /// emptied instead; returns what was actually paid back.
    pub fn refund(&mut self, amount: f64) -> f64 {
        if self.try_spend(amount) {
            return amount;
        }
        let available = self.balance;
        warn!(
            "[Ledger] Refund of {:.2} exceeds balance, paying back {:.2}",
            amount, available
        );
        if self.try_spend(available) {
            available
        } else {
            0.0
        }
    }
}
