//! Delta-to-strike resolution.
//!
//! Finds the listed strike whose observed delta is closest to a target at a
//! point in time. A Black-Scholes estimate (or a caller-supplied spot) picks
//! the starting strike; the search then walks the strike list one step at a
//! time, reading the observed delta from historical greeks, until it is
//! within tolerance, comes back to a strike it already probed, or runs out
//! of steps.
//!
//! Walking direction follows delta magnitude: call deltas shrink as the
//! strike rises and put deltas grow, so a call whose delta is too large
//! moves up the list and a put whose delta is too large moves down.

use crate::application::market_data::MarketDataUseCase;
use crate::domain::entities::contract::Contract;
use crate::domain::entities::quote::{nearest_in_time, GreeksRecord, StrikeGreeks};
use crate::domain::entities::search_state::{SearchPhase, SearchState};
use crate::domain::entities::strike_match::{ResolutionOutcome, StrikeMatch};
use crate::domain::error::DomainError;
use crate::domain::values::black_scholes::{closest_strike_index, PricingInputs};
use crate::domain::values::date_range::DateRange;
use crate::domain::values::right::Right;
use crate::domain::values::strike::Strike;
use crate::domain::values::venue_time::{market_close, venue_date};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResolverConfig {
    /// Strikes probed before giving up. Default: 25.
    pub max_steps: usize,
    /// Accepted gap between observed and target delta magnitude. Default: 0.1.
    pub tolerance: f64,
    pub pricing: PricingInputs,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_steps: 25,
            tolerance: 0.1,
            pricing: PricingInputs::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeltaStrikeRequest {
    pub root: String,
    pub expiration: NaiveDate,
    pub right: Right,
    /// Fractional delta (40 delta = 0.4). Sign is ignored.
    pub target_delta: f64,
    /// UTC epoch seconds at which the delta is read.
    pub at_time: i64,
    /// Underlying price at `at_time`, when the caller already knows it.
    pub spot_price: Option<f64>,
}

pub struct DeltaStrikeResolver {
    market: Arc<MarketDataUseCase>,
    config: ResolverConfig,
}

impl DeltaStrikeResolver {
    pub fn new(market: Arc<MarketDataUseCase>, config: ResolverConfig) -> Self {
        Self { market, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub async fn resolve(&self, req: &DeltaStrikeRequest) -> Result<StrikeMatch, DomainError> {
        check_target(req.target_delta)?;
        let day = venue_date(req.at_time)
            .ok_or_else(|| DomainError::InvalidInput(format!("Timestamp out of range: {}", req.at_time)))?;

        let mut strikes = match self.market.strikes(&req.root, req.expiration).await? {
            Some(s) if !s.is_empty() => s,
            _ => {
                return Err(DomainError::NotFound(format!(
                    "No strikes listed for {} {}",
                    req.root, req.expiration
                )))
            }
        };
        strikes.sort();
        strikes.dedup();

        let template = Contract::new(req.root.as_str(), req.expiration, req.right, strikes[0]);
        let range = DateRange::single(day);
        let mut state = SearchState::new();
        let mut index = self.starting_index(req, &template, &strikes, range, &mut state).await?;
        let mut rows: BTreeMap<Strike, GreeksRecord> = BTreeMap::new();

        while state.step_count < self.config.max_steps {
            let strike = strikes[index];
            if state.has_visited(strike) {
                state.enter(SearchPhase::CycleFallback);
                info!(%strike, "strike revisited, falling back to closest observation");
                return closest_match(req, &template, state, &rows, ResolutionOutcome::CycleFallback).ok_or_else(|| {
                    DomainError::NotFound(format!(
                        "No usable greeks for {} {} {} on {day}",
                        req.root, req.expiration, req.right
                    ))
                });
            }

            state.enter(SearchPhase::Searching(strike));
            let contract = template.with_strike(strike);
            match self.observe(&contract, range, req.at_time).await? {
                None => {
                    state.record(strike, None);
                    info!(symbol = %contract, "no usable greeks at strike");
                    index = step_index(index, strikes.len(), empty_probe_step(req.right));
                }
                Some(record) => {
                    let delta = record.delta;
                    state.record(strike, Some(delta));
                    info!(symbol = %contract, delta, "observed delta");

                    if (delta.abs() - req.target_delta.abs()).abs() < self.config.tolerance {
                        state.enter(SearchPhase::Converged);
                        return Ok(StrikeMatch {
                            outcome: ResolutionOutcome::Converged,
                            symbol: contract.symbol(),
                            contract,
                            target_delta: req.target_delta,
                            observed_delta: delta,
                            record,
                            search: state,
                        });
                    }

                    rows.insert(strike, record);
                    index = step_index(index, strikes.len(), search_step(req.right, delta, req.target_delta));
                }
            }
        }

        state.enter(SearchPhase::BudgetExceeded);
        warn!(
            root = %req.root,
            expiration = %req.expiration,
            steps = state.step_count,
            "strike search exhausted its step budget"
        );
        let steps = state.step_count;
        match closest_match(req, &template, state, &rows, ResolutionOutcome::BestEffort) {
            Some(best) => Err(DomainError::Unresolved {
                steps,
                best: Some(Box::new(best)),
            }),
            None => Err(DomainError::NotFound(format!(
                "No usable greeks for {} {} {} on {day} in {steps} probes",
                req.root, req.expiration, req.right
            ))),
        }
    }

    /// Pick the strike from one chain-wide greeks read at `at_time` instead
    /// of walking the list. The closest row is returned even when it is
    /// outside tolerance; `spot_price` is not used.
    pub async fn resolve_at_time(&self, req: &DeltaStrikeRequest) -> Result<StrikeMatch, DomainError> {
        check_target(req.target_delta)?;
        let not_found = || {
            DomainError::NotFound(format!(
                "No chain greeks for {} {} {} at {}",
                req.root, req.expiration, req.right, req.at_time
            ))
        };

        let rows: Vec<StrikeGreeks> = self
            .market
            .chain_greeks_at(&req.root, req.expiration, req.right, req.at_time)
            .await?
            .ok_or_else(not_found)?
            .into_iter()
            .filter(|r| r.record.delta.is_finite())
            .collect();

        let mut state = SearchState::new();
        state.visited = rows.iter().map(|r| (r.strike, Some(r.record.delta))).collect();
        state.step_count = 1;
        let (strike, delta) = state.closest_to(req.target_delta).ok_or_else(not_found)?;
        let Some(record) = rows.into_iter().find(|r| r.strike == strike).map(|r| r.record) else {
            return Err(not_found());
        };
        state.current_strike = Some(strike);
        state.delta_observed = Some(delta);

        let outcome = if (delta.abs() - req.target_delta.abs()).abs() < self.config.tolerance {
            state.enter(SearchPhase::Converged);
            ResolutionOutcome::Converged
        } else {
            state.enter(SearchPhase::ChainRead);
            ResolutionOutcome::ChainClosest
        };
        let contract = Contract::new(req.root.as_str(), req.expiration, req.right, strike);
        info!(symbol = %contract, delta, strikes = state.visited.len(), "resolved from chain read");
        Ok(StrikeMatch {
            outcome,
            symbol: contract.symbol(),
            contract,
            target_delta: req.target_delta,
            observed_delta: delta,
            record,
            search: state,
        })
    }

    async fn starting_index(
        &self,
        req: &DeltaStrikeRequest,
        template: &Contract,
        strikes: &[Strike],
        range: DateRange,
        state: &mut SearchState,
    ) -> Result<usize, DomainError> {
        if let Some(spot) = req.spot_price {
            if !spot.is_finite() || spot <= 0.0 {
                return Err(DomainError::InvalidInput(format!("Spot price must be positive, got {spot}")));
            }
            return Ok(nearest_price_index(strikes, spot));
        }

        state.enter(SearchPhase::SeekingSpot);
        let mid = strikes.len() / 2;
        let probe = template.with_strike(strikes[mid]);
        let observed_spot = self
            .market
            .option_greeks(&probe, range, false)
            .await?
            .and_then(|rows| nearest_in_time(&rows, req.at_time, |r| r.timestamp).map(|r| r.underlying_price))
            .filter(|p| p.is_finite() && *p > 0.0);
        let spot = match observed_spot {
            Some(p) => p,
            None => {
                info!(symbol = %probe, "no underlying price observed, using middle strike as spot");
                strikes[mid].price()
            }
        };

        let close = market_close(req.expiration)
            .ok_or_else(|| DomainError::InvalidInput(format!("Invalid expiration {}", req.expiration)))?;
        let time_to_expiry = Duration::seconds(close - req.at_time);

        match closest_strike_index(
            spot,
            time_to_expiry,
            req.right,
            req.target_delta,
            strikes,
            &self.config.pricing,
        ) {
            Ok(i) => Ok(i),
            Err(DomainError::InvalidParameter(msg)) => {
                warn!(%msg, spot, "model estimate unavailable, starting at strike nearest spot");
                Ok(nearest_price_index(strikes, spot))
            }
            Err(e) => Err(e),
        }
    }

    /// Greeks row nearest `at_time`, ignoring rows with a zero ask.
    async fn observe(
        &self,
        contract: &Contract,
        range: DateRange,
        at_time: i64,
    ) -> Result<Option<GreeksRecord>, DomainError> {
        let Some(rows) = self.market.option_greeks(contract, range, false).await? else {
            return Ok(None);
        };
        let valid: Vec<GreeksRecord> = rows.into_iter().filter(|r| r.ask != 0.0).collect();
        Ok(nearest_in_time(&valid, at_time, |r| r.timestamp).cloned())
    }
}

fn check_target(target_delta: f64) -> Result<(), DomainError> {
    if !target_delta.is_finite() || target_delta.abs() > 1.0 {
        return Err(DomainError::InvalidInput(format!(
            "Target delta must be within [-1, 1], got {target_delta}"
        )));
    }
    Ok(())
}

fn closest_match(
    req: &DeltaStrikeRequest,
    template: &Contract,
    state: SearchState,
    rows: &BTreeMap<Strike, GreeksRecord>,
    outcome: ResolutionOutcome,
) -> Option<StrikeMatch> {
    let (strike, delta) = state.closest_to(req.target_delta)?;
    let record = rows.get(&strike)?.clone();
    let contract = template.with_strike(strike);
    Some(StrikeMatch {
        outcome,
        symbol: contract.symbol(),
        contract,
        target_delta: req.target_delta,
        observed_delta: delta,
        record,
        search: state,
    })
}

/// Index of the strike whose price is nearest `spot`; ties keep the lower strike.
pub fn nearest_price_index(strikes: &[Strike], spot: f64) -> usize {
    let mut best = 0;
    let mut best_gap = f64::INFINITY;
    for (i, strike) in strikes.iter().enumerate() {
        let gap = (strike.price() - spot).abs();
        if gap < best_gap {
            best_gap = gap;
            best = i;
        }
    }
    best
}

/// +1 moves to the next higher strike, -1 to the next lower.
pub fn search_step(right: Right, observed: f64, target: f64) -> isize {
    let too_large = observed.abs() > target.abs();
    match (right, too_large) {
        (Right::Call, true) | (Right::Put, false) => 1,
        (Right::Call, false) | (Right::Put, true) => -1,
    }
}

/// Probes with no usable rows move away from the money.
fn empty_probe_step(right: Right) -> isize {
    match right {
        Right::Call => 1,
        Right::Put => -1,
    }
}

/// Clamped to the list, so stepping off either end lands on a probed strike.
fn step_index(index: usize, len: usize, step: isize) -> usize {
    let next = index as isize + step;
    next.clamp(0, len as isize - 1) as usize
}
