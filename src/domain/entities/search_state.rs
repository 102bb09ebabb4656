use crate::domain::values::strike::Strike;
use serde::Serialize;
use std::collections::BTreeMap;

/// Where a strike search currently is.
///
/// `Start → SeekingSpot → Searching(strike) → {Converged | CycleFallback | BudgetExceeded}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "phase", content = "strike", rename_all = "snake_case")]
pub enum SearchPhase {
    Start,
    SeekingSpot,
    Searching(Strike),
    Converged,
    CycleFallback,
    BudgetExceeded,
    /// Answered from one chain-wide read without walking.
    ChainRead,
}

impl SearchPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SearchPhase::Converged | SearchPhase::CycleFallback | SearchPhase::BudgetExceeded | SearchPhase::ChainRead
        )
    }
}

/// Bookkeeping for one resolve call.
///
/// `visited` maps every probed strike to the delta observed there, or
/// `None` when the probe returned no usable row.
#[derive(Debug, Clone, Serialize)]
pub struct SearchState {
    pub phase: SearchPhase,
    pub current_strike: Option<Strike>,
    pub delta_observed: Option<f64>,
    pub visited: BTreeMap<Strike, Option<f64>>,
    pub step_count: usize,
}

impl SearchState {
    pub fn new() -> Self {
        Self {
            phase: SearchPhase::Start,
            current_strike: None,
            delta_observed: None,
            visited: BTreeMap::new(),
            step_count: 0,
        }
    }

    pub fn enter(&mut self, phase: SearchPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "search transition");
        self.phase = phase;
        if let SearchPhase::Searching(strike) = phase {
            self.current_strike = Some(strike);
        }
    }

    pub fn has_visited(&self, strike: Strike) -> bool {
        self.visited.contains_key(&strike)
    }

    /// Record one probe and count it against the step budget.
    pub fn record(&mut self, strike: Strike, delta: Option<f64>) {
        self.step_count += 1;
        self.delta_observed = delta;
        self.visited.insert(strike, delta);
    }

    /// Visited strike whose observed delta magnitude is closest to `|target|`.
    /// Ties go to the lower strike.
    pub fn closest_to(&self, target: f64) -> Option<(Strike, f64)> {
        let target = target.abs();
        let mut best: Option<(Strike, f64, f64)> = None;
        for (strike, delta) in &self.visited {
            let Some(delta) = delta else { continue };
            let diff = (delta.abs() - target).abs();
            match best {
                Some((_, _, best_diff)) if best_diff <= diff => {}
                _ => best = Some((*strike, *delta, diff)),
            }
        }
        best.map(|(strike, delta, _)| (strike, delta))
    }
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new()
    }
}
