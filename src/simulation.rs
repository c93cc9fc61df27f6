//! Scripted end-to-end run standing in for the front-end and the oracle relay.
//!
//! Used by the `simulate` CLI command: the airline funds and registers a flight,
//! passengers insure it, a fleet of oracles registers and answers the status
//! request on their index, and credited passengers withdraw.

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::errors::{SuretyError, SuretyResult};
use crate::oracle::ResponseOutcome;
use crate::primitives::{Address, Amount, CallContext, FlightStatus, Timestamp};
use crate::surety::FlightSurety;

const PASSENGER_BASE: u64 = 10_000;
const ORACLE_BASE: u64 = 20_000;

#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub flight: String,
    pub timestamp: Timestamp,
    pub oracles: usize,
    pub passengers: usize,
    /// Premium each passenger pays; clamped to the configured cap
    pub premium: Amount,
    /// Probability that an oracle reports `LateAirline`; otherwise a random status
    pub late_airline_bias: f64,
    pub seed: u64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            flight: "AA100".to_string(),
            timestamp: 123,
            oracles: 20,
            passengers: 3,
            premium: crate::primitives::UNIT,
            late_airline_bias: 0.8,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    pub request_index: u8,
    pub responders: usize,
    pub resolved: Option<FlightStatus>,
    pub credits: Vec<(Address, Amount)>,
    pub payouts: Vec<(Address, Amount)>,
}

pub fn passenger_address(n: usize) -> Address {
    Address::from_low_u64(PASSENGER_BASE + n as u64)
}

pub fn oracle_address(n: usize) -> Address {
    Address::from_low_u64(ORACLE_BASE + n as u64)
}

/// Drive one full scenario against `surety`, whose first airline is `airline`.
pub fn run(
    surety: &FlightSurety,
    airline: Address,
    params: &SimulationParams,
) -> SuretyResult<SimulationReport> {
    if !(0.0..=1.0).contains(&params.late_airline_bias) {
        return Err(SuretyError::Config(format!(
            "late_airline_bias {} is not a probability",
            params.late_airline_bias
        )));
    }
    let config = surety.config();
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut report = SimulationReport::default();

    let premium = params.premium.min(config.insurance_cap);
    // Enough reserve to back the surplus of every policy sold below
    let surplus = premium
        .checked_mul(config.payout_numerator)
        .map(|scaled| (scaled / config.payout_denominator).saturating_sub(premium))
        .and_then(|per_policy| per_policy.checked_mul(params.passengers as u64))
        .ok_or(SuretyError::Overflow)?;
    if !surety.is_airline_funded(&airline) {
        let funding = config.min_airline_funding.max(surplus);
        surety.fund(&CallContext::with_value(airline, funding))?;
    }
    surety.register_flight(&CallContext::new(airline), &params.flight)?;

    for n in 0..params.passengers {
        let ctx = CallContext::with_value(passenger_address(n), premium);
        surety.buy_insurance(&ctx, &params.flight)?;
    }

    let fee = surety.registration_fee();
    let mut fleet = Vec::with_capacity(params.oracles);
    for n in 0..params.oracles {
        let ctx = CallContext::with_value(oracle_address(n), fee);
        let indexes = surety.register_oracle(&ctx)?;
        fleet.push((ctx, indexes));
    }
    info!("Registered {} oracles", fleet.len());

    let index = surety.fetch_flight_status(
        &CallContext::new(airline),
        &airline,
        &params.flight,
        params.timestamp,
    )?;
    report.request_index = index;

    for (ctx, indexes) in fleet.iter().filter(|(_, indexes)| indexes.contains(&index)) {
        let status = if rng.gen_bool(params.late_airline_bias) {
            FlightStatus::LateAirline
        } else {
            *FlightStatus::ALL.choose(&mut rng).unwrap_or(&FlightStatus::Unknown)
        };
        debug!("Oracle {} with indexes {:?} answers {}", ctx.caller, indexes, status);

        let outcome = surety.submit_oracle_response(
            ctx,
            index,
            &airline,
            &params.flight,
            params.timestamp,
            status,
        )?;
        report.responders += 1;
        if let ResponseOutcome::Resolved(resolved) = outcome {
            report.resolved = Some(resolved);
        }
    }

    for n in 0..params.passengers {
        let passenger = passenger_address(n);
        let credit = surety.get_passenger_funds(&passenger);
        if credit == 0 {
            continue;
        }
        report.credits.push((passenger, credit));
        let paid = surety.pay(&CallContext::new(passenger))?;
        report.payouts.push((passenger, paid));
    }

    Ok(report)
}
