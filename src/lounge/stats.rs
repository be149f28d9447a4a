use serde::Serialize;

/// Running counters of one lounge
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoungeStats {
    // Customers
    pub spawned: u64,
    pub seated: u64,
    pub sessions_completed: u64,
    pub orders_cancelled: u64,
    pub departed: u64,

    // Service
    pub drinks_served: u64,
    pub food_ordered: u64,
    pub food_served: u64,
    pub food_timeouts: u64,
    pub hookahs_served: u64,

    // Money
    pub revenue: f64,
    pub refunds: f64,
    pub stock_spent: f64,

    // Incidents
    pub breakdowns: u64,
    pub repairs: u64,
    pub seats_broken: u64,
    pub fires: u64,
    pub fires_extinguished: u64,

    // Self-healing
    pub nav_failures: u64,
    pub stuck_reissues: u64,
    pub reconciled: u64,
}

impl LoungeStats {
    /// Revenue minus refunds and stock purchases
    pub fn net(&self) -> f64 {
        self.revenue - self.refunds - self.stock_spent
    }

    /// Add another lounge's counters to these
    pub fn absorb(&mut self, other: &LoungeStats) {
        self.spawned += other.spawned;
        self.seated += other.seated;
        self.sessions_completed += other.sessions_completed;
        self.orders_cancelled += other.orders_cancelled;
        self.departed += other.departed;
        self.drinks_served += other.drinks_served;
        self.food_ordered += other.food_ordered;
        self.food_served += other.food_served;
        self.food_timeouts += other.food_timeouts;
        self.hookahs_served += other.hookahs_served;
        self.revenue += other.revenue;
        self.refunds += other.refunds;
        self.stock_spent += other.stock_spent;
        self.breakdowns += other.breakdowns;
        self.repairs += other.repairs;
        self.seats_broken += other.seats_broken;
        self.fires += other.fires;
        self.fires_extinguished += other.fires_extinguished;
        self.nav_failures += other.nav_failures;
        self.stuck_reissues += other.stuck_reissues;
        self.reconciled += other.reconciled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_and_net() {
        let mut total = LoungeStats {
            revenue: 100.0,
            refunds: 20.0,
            seated: 2,
            ..LoungeStats::default()
        };
        let day = LoungeStats {
            revenue: 50.0,
            stock_spent: 10.0,
            seated: 1,
            fires: 1,
            ..LoungeStats::default()
        };

        total.absorb(&day);

        assert_eq!(total.seated, 3);
        assert_eq!(total.fires, 1);
        assert_eq!(total.net(), 120.0);
    }
}
