use cart_ops_core::contract::{CartRecord, ExitUpdate};
use cart_ops_core::sweep::SweepQuery;

pub trait RecordStore {
    fn query_overdue(&self, query: &SweepQuery) -> Result<Vec<CartRecord>, String>;

    /// Applies every update or none of them.
    fn commit_exits(&self, updates: &[ExitUpdate]) -> Result<(), String>;
}
