use crate::domain::entities::contract::Contract;
use crate::domain::entities::quote::GreeksRecord;
use crate::domain::entities::search_state::SearchState;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// Observed delta within tolerance of the target.
    Converged,
    /// The search came back to a strike it had already probed; this is the
    /// closest observation instead.
    CycleFallback,
    /// Step budget exhausted; only carried inside `DomainError::Unresolved`.
    BestEffort,
    /// Closest strike of a chain-wide read, outside tolerance.
    ChainClosest,
}

/// A contract matched to a target delta.
#[derive(Debug, Clone, Serialize)]
pub struct StrikeMatch {
    pub outcome: ResolutionOutcome,
    pub symbol: String,
    pub contract: Contract,
    pub target_delta: f64,
    pub observed_delta: f64,
    /// Greeks row the delta was read from.
    pub record: GreeksRecord,
    pub search: SearchState,
}
