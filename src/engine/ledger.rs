use crate::domain::{Position, PositionId, PositionRecord, Transaction, TxType};
use tracing::warn;

/// Folds a position's event history into net liquidity.
///
/// Add events contribute `+delta`, Remove events `-delta`. Unrecognized events
/// are skipped and counted. The running total is never floored at zero.
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    position_id: Option<PositionId>,
    net_liquidity: i128,
    skipped: usize,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger that tags its anomaly logs with a position id.
    pub fn for_position(position_id: PositionId) -> Self {
        Self {
            position_id: Some(position_id),
            ..Self::default()
        }
    }

    /// Apply one event to the running total.
    pub fn apply(&mut self, tx: &Transaction) {
        let delta = match tx.tx_type {
            TxType::Add => self.signed_delta(tx.liquidity_delta),
            TxType::Remove => -self.signed_delta(tx.liquidity_delta),
            TxType::Unrecognized(code) => {
                warn!(
                    position = ?self.position_id,
                    code,
                    tx_hash = %tx.tx_hash,
                    "Ignoring unrecognized transaction type"
                );
                self.skipped += 1;
                return;
            }
        };

        self.net_liquidity = match self.net_liquidity.checked_add(delta) {
            Some(total) => total,
            None => {
                warn!(position = ?self.position_id, "Net liquidity overflow, saturating");
                self.net_liquidity.saturating_add(delta)
            }
        };
    }

    fn signed_delta(&self, magnitude: u128) -> i128 {
        i128::try_from(magnitude).unwrap_or_else(|_| {
            warn!(position = ?self.position_id, magnitude, "Liquidity delta exceeds i128, saturating");
            i128::MAX
        })
    }

    pub fn net_liquidity(&self) -> i128 {
        self.net_liquidity
    }

    /// Number of events skipped as unrecognized.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Signed sum of the Add/Remove deltas in `transactions`.
pub fn net_liquidity(transactions: &[Transaction]) -> i128 {
    let mut ledger = PositionLedger::new();
    for tx in transactions {
        ledger.apply(tx);
    }
    ledger.net_liquidity()
}

/// Build a [`Position`] from its raw record by folding the event history.
pub fn build_position(record: PositionRecord) -> Position {
    let mut ledger = PositionLedger::for_position(record.id);
    for tx in &record.transactions {
        ledger.apply(tx);
    }

    let net_liquidity = ledger.net_liquidity();
    if net_liquidity < 0 {
        warn!(
            position = %record.id,
            network = %record.network,
            net_liquidity,
            "More liquidity removed than added; upstream history is inconsistent"
        );
    }

    Position {
        id: record.id,
        network: record.network,
        token0: record.token0,
        token1: record.token1,
        fee_tier: record.fee_tier,
        tick_lower: record.tick_lower,
        tick_upper: record.tick_upper,
        owner: record.owner,
        pool_address: record.pool_address,
        transactions: record.transactions,
        net_liquidity,
    }
}
