//! The single entry point external callers use.
//!
//! `FlightSurety` serializes every call behind one write lock and runs it against a
//! draft copy of the state. The draft replaces the live state only when the whole
//! call succeeded, so a failing call (including a failed payout transfer) leaves no
//! trace: no state change, no events and no logs beyond a debug line.

mod data;
pub mod snapshot;

#[cfg(test)]
mod tests;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};

use crate::airline::{Airline, RegistrationOutcome};
use crate::config::SuretyConfig;
use crate::errors::{SuretyError, SuretyResult};
use crate::events::Event;
use crate::flight::Flight;
use crate::insurance::{PayoutSink, Policy};
use crate::oracle::{RequestKey, ResponseGroup, ResponseOutcome};
use crate::primitives::{format_amount, Address, Amount, CallContext, FlightStatus, Timestamp};
use crate::utils::current_time;

pub use data::SuretyData;

/// Derive the facade identity from its owner, the way a deployment yields a
/// contract address.
pub fn app_address(owner: &Address) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(b"flight-surety-app");
    hasher.update(owner.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[..20]);
    Address::new(bytes)
}

pub struct FlightSurety {
    app: Address,
    state: RwLock<SuretyData>,
    events: RwLock<Vec<Event>>,
    payouts: Mutex<Box<dyn PayoutSink>>,
}

impl FlightSurety {
    /// Deploy with `first_airline` admitted and the facade authorized on the data layer.
    pub fn new(
        config: SuretyConfig,
        owner: Address,
        first_airline: Address,
        first_airline_name: &str,
        payouts: Box<dyn PayoutSink>,
    ) -> SuretyResult<Self> {
        let app = app_address(&owner);
        let mut state = SuretyData::new(config, owner, first_airline, first_airline_name)?;
        state.authorize_caller(&owner, app)?;
        info!(
            "Flight surety deployed by {} with first airline {} ({})",
            owner, first_airline, first_airline_name
        );
        Ok(Self::from_parts(app, state, Vec::new(), payouts))
    }

    pub(crate) fn from_parts(
        app: Address,
        state: SuretyData,
        events: Vec<Event>,
        payouts: Box<dyn PayoutSink>,
    ) -> Self {
        FlightSurety {
            app,
            state: RwLock::new(state),
            events: RwLock::new(events),
            payouts: Mutex::new(payouts),
        }
    }

    /// Run `op` atomically: commit state and events on success, discard both on error.
    fn transact<T, F>(&self, name: &str, op: F) -> SuretyResult<T>
    where
        F: FnOnce(&mut SuretyData, &mut Vec<Event>) -> SuretyResult<T>,
    {
        let mut state = self.state.write();
        let mut draft = state.clone();
        let mut journal = Vec::new();

        match op(&mut draft, &mut journal) {
            Ok(value) => {
                *state = draft;
                drop(state);
                journal.iter().for_each(log_event);
                self.events.write().extend(journal);
                Ok(value)
            }
            Err(err) => {
                debug!("{} reverted: {}", name, err);
                Err(err)
            }
        }
    }

    pub fn app(&self) -> Address {
        self.app
    }

    pub fn config(&self) -> SuretyConfig {
        self.state.read().config.clone()
    }

    pub fn owner(&self) -> Address {
        self.state.read().access.owner()
    }

    // Operations and settings

    pub fn is_operational(&self) -> bool {
        self.state.read().access.is_operational()
    }

    pub fn set_operating_status(&self, ctx: &CallContext, operational: bool) -> SuretyResult<()> {
        self.transact("setOperatingStatus", |state, events| {
            state.set_operating_status(&ctx.caller, operational, events)
        })
    }

    pub fn authorize_caller(&self, ctx: &CallContext, target: Address) -> SuretyResult<()> {
        self.transact("authorizeCaller", |state, _| state.authorize_caller(&ctx.caller, target))
    }

    pub fn deauthorize_caller(&self, ctx: &CallContext, target: &Address) -> SuretyResult<()> {
        self.transact("deauthorizeCaller", |state, _| {
            state.deauthorize_caller(&ctx.caller, target)
        })
    }

    pub fn is_caller_authorized(&self, target: &Address) -> bool {
        self.state.read().access.is_authorized(target)
    }

    // Airlines

    pub fn register_airline(
        &self,
        ctx: &CallContext,
        candidate: Address,
        name: &str,
    ) -> SuretyResult<RegistrationOutcome> {
        let app = self.app;
        self.transact("registerAirline", |state, events| {
            state.register_airline(&app, &ctx.caller, candidate, name, events)
        })
    }

    /// Contribute `ctx.value` as the caller's airline funding. Returns its running total.
    pub fn fund(&self, ctx: &CallContext) -> SuretyResult<Amount> {
        let app = self.app;
        self.transact("fund", |state, events| state.fund(&app, ctx, events))
    }

    pub fn is_airline(&self, airline: &Address) -> bool {
        self.state.read().airlines.is_airline(airline)
    }

    pub fn is_airline_funded(&self, airline: &Address) -> bool {
        self.state.read().airlines.is_airline_funded(airline)
    }

    pub fn get_airline(&self, airline: &Address) -> Option<Airline> {
        self.state.read().airlines.get_airline(airline).cloned()
    }

    pub fn get_airline_count(&self) -> usize {
        self.state.read().airlines.get_airline_count()
    }

    // Flights

    pub fn register_flight(&self, ctx: &CallContext, designator: &str) -> SuretyResult<()> {
        let app = self.app;
        let now = current_time();
        self.transact("registerFlight", |state, events| {
            state.register_flight(&app, &ctx.caller, designator, now, events)
        })
    }

    pub fn get_flight(&self, designator: &str) -> Option<Flight> {
        self.state.read().flights.get_flight(designator).cloned()
    }

    pub fn is_flight_registered(&self, designator: &str) -> bool {
        self.state.read().flights.is_flight_registered(designator)
    }

    // Insurance

    /// Buy a policy on `designator` with `ctx.value` as the premium.
    pub fn buy_insurance(&self, ctx: &CallContext, designator: &str) -> SuretyResult<()> {
        let app = self.app;
        self.transact("buyInsurance", |state, events| {
            state.buy_insurance(&app, ctx, designator, events)
        })
    }

    pub fn is_passenger_insured(&self, designator: &str, passenger: &Address) -> bool {
        self.state.read().pool.is_passenger_insured(designator, passenger)
    }

    pub fn get_policy(&self, designator: &str, passenger: &Address) -> Option<Policy> {
        self.state.read().pool.get_policy(designator, passenger).cloned()
    }

    pub fn get_passenger_funds(&self, passenger: &Address) -> Amount {
        self.state.read().pool.get_passenger_funds(passenger)
    }

    /// Withdraw the caller's whole credit.
    ///
    /// The credit is zeroed before the transfer is attempted; a failed transfer
    /// reverts the call and the credit stays withdrawable.
    pub fn pay(&self, ctx: &CallContext) -> SuretyResult<Amount> {
        let app = self.app;
        self.transact("pay", |state, events| {
            let amount = state.withdraw(&app, &ctx.caller, events)?;
            self.payouts
                .lock()
                .transfer(&ctx.caller, amount)
                .map_err(|reason| {
                    warn!(
                        "Payout of {} to {} failed: {}",
                        format_amount(amount),
                        ctx.caller,
                        reason
                    );
                    SuretyError::TransferFailed(reason)
                })?;
            Ok(amount)
        })
    }

    // Oracles

    pub fn registration_fee(&self) -> Amount {
        self.state.read().oracles.registration_fee()
    }

    /// Register the caller as an oracle, paying `ctx.value` as the fee.
    pub fn register_oracle(&self, ctx: &CallContext) -> SuretyResult<Vec<u8>> {
        let app = self.app;
        self.transact("registerOracle", |state, events| {
            state.register_oracle(&app, ctx, events)
        })
    }

    pub fn is_oracle_registered(&self, oracle: &Address) -> bool {
        self.state.read().oracles.is_oracle_registered(oracle)
    }

    /// Response group of the request routed to `index` for this flight, if one was opened.
    pub fn get_oracle_request(
        &self,
        index: u8,
        airline: &Address,
        designator: &str,
        timestamp: Timestamp,
    ) -> Option<ResponseGroup> {
        let key = RequestKey::derive(index, airline, designator, timestamp);
        self.state.read().oracles.get_request(&key).cloned()
    }

    pub fn get_my_indexes(&self, ctx: &CallContext) -> SuretyResult<Vec<u8>> {
        self.state
            .read()
            .oracles
            .get_my_indexes(&ctx.caller)
            .map(|indexes| indexes.to_vec())
    }

    /// Ask oracles for a flight's status. Returns the index the request was routed to.
    pub fn fetch_flight_status(
        &self,
        ctx: &CallContext,
        airline: &Address,
        designator: &str,
        timestamp: Timestamp,
    ) -> SuretyResult<u8> {
        let app = self.app;
        self.transact("fetchFlightStatus", |state, events| {
            state.fetch_flight_status(&app, &ctx.caller, airline, designator, timestamp, events)
        })
    }

    pub fn submit_oracle_response(
        &self,
        ctx: &CallContext,
        index: u8,
        airline: &Address,
        designator: &str,
        timestamp: Timestamp,
        status: FlightStatus,
    ) -> SuretyResult<ResponseOutcome> {
        let app = self.app;
        self.transact("submitOracleResponse", |state, events| {
            state.submit_oracle_response(
                &app,
                &ctx.caller,
                index,
                airline,
                designator,
                timestamp,
                status,
                events,
            )
        })
    }

    /// Owner override of a flight's status, crediting passengers like a quorum would.
    pub fn process_flight_status(
        &self,
        ctx: &CallContext,
        airline: &Address,
        designator: &str,
        timestamp: Timestamp,
        status: FlightStatus,
    ) -> SuretyResult<()> {
        let app = self.app;
        self.transact("processFlightStatus", |state, events| {
            state.process_flight_status(
                &app,
                &ctx.caller,
                airline,
                designator,
                timestamp,
                status,
                events,
            )
        })
    }

    // Accounting and notifications

    /// Total value held: airline reserve, escrowed premiums, unpaid credits and oracle fees.
    pub fn contract_balance(&self) -> Amount {
        self.state.read().balance
    }

    pub fn is_balanced(&self) -> bool {
        self.state.read().is_balanced()
    }

    /// Committed notifications, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Take the committed notifications, leaving the log empty.
    pub fn drain_events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.write())
    }
}

fn log_event(event: &Event) {
    match event {
        Event::AirlineRegistered { airline, name, sponsor } => {
            info!("Airline {} ({}) registered, sponsored by {}", airline, name, sponsor)
        }
        Event::AirlineVoted { candidate, voter, votes, required } => {
            debug!("{} voted for {}: {}/{} votes", voter, candidate, votes, required)
        }
        Event::AirlineFunded { airline, amount, total } => info!(
            "Airline {} funded {} (total {})",
            airline,
            format_amount(*amount),
            format_amount(*total)
        ),
        Event::FlightRegistered { airline, flight } => {
            info!("Flight {} registered by {}", flight, airline)
        }
        Event::InsurancePurchased { passenger, flight, premium } => debug!(
            "{} insured flight {} for {}",
            passenger,
            flight,
            format_amount(*premium)
        ),
        Event::OracleRegistered { oracle, indexes } => {
            debug!("Oracle {} registered with indexes {:?}", oracle, indexes)
        }
        Event::OracleRequest { index, flight, timestamp, .. } => {
            debug!("Status requested for {} at {} on index {}", flight, timestamp, index)
        }
        Event::OracleReport { oracle, flight, status, .. } => {
            debug!("Oracle {} reported {} for {}", oracle, status, flight)
        }
        Event::FlightStatusInfo { flight, timestamp, status, .. } => {
            info!("Flight {} at {} resolved as {}", flight, timestamp, status)
        }
        Event::PassengerCredited { passenger, flight, amount } => info!(
            "Passenger {} credited {} for flight {}",
            passenger,
            format_amount(*amount),
            flight
        ),
        Event::PassengerPaid { passenger, amount } => {
            info!("Passenger {} withdrew {}", passenger, format_amount(*amount))
        }
        Event::OperatingStatusChanged { operational } => {
            info!("Operational status set to {}", operational)
        }
    }
}
