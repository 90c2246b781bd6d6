use crate::domain::{PoolKey, Position};
use std::collections::HashMap;

/// Drop positions whose net liquidity is exactly zero when `enabled`.
///
/// Runs before grouping so a pool whose positions are all closed never
/// produces a pool state.
pub fn filter_closed(positions: Vec<Position>, enabled: bool) -> Vec<Position> {
    if !enabled {
        return positions;
    }
    positions.into_iter().filter(|p| !p.is_closed()).collect()
}

/// Partition positions by canonical pool key.
///
/// Every position lands in exactly one group; order within a group follows
/// input order.
pub fn group_by_pool(positions: Vec<Position>) -> HashMap<PoolKey, Vec<Position>> {
    let mut groups: HashMap<PoolKey, Vec<Position>> = HashMap::new();
    for position in positions {
        groups.entry(position.pool_key()).or_default().push(position);
    }
    groups
}
