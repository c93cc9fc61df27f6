use serde::{Deserialize, Serialize};

use crate::access::AccessControl;
use crate::airline::{AirlineRegistry, RegistrationOutcome};
use crate::config::SuretyConfig;
use crate::errors::{SuretyError, SuretyResult};
use crate::events::Event;
use crate::flight::FlightRegistry;
use crate::insurance::InsurancePool;
use crate::oracle::{OracleConsensus, ResponseOutcome};
use crate::primitives::{Address, Amount, CallContext, FlightStatus, Timestamp};

/// Every registry of the marketplace plus the value held on its behalf.
///
/// Mutating methods take the facade identity `app` and reject it unless it is on
/// the allowlist, and every one of them checks the operational flag first.
/// Emitted notifications go into `events`; the caller decides whether they commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuretyData {
    pub(crate) config: SuretyConfig,
    pub(crate) access: AccessControl,
    pub(crate) airlines: AirlineRegistry,
    pub(crate) flights: FlightRegistry,
    pub(crate) pool: InsurancePool,
    pub(crate) oracles: OracleConsensus,
    /// Value received and not yet paid out
    pub(crate) balance: Amount,
}

impl SuretyData {
    pub fn new(
        config: SuretyConfig,
        owner: Address,
        first_airline: Address,
        first_airline_name: &str,
    ) -> SuretyResult<Self> {
        config.ensure_valid()?;
        Ok(SuretyData {
            access: AccessControl::new(owner),
            airlines: AirlineRegistry::new(
                first_airline,
                first_airline_name,
                config.voting_threshold,
                config.min_airline_funding,
            ),
            flights: FlightRegistry::new(),
            pool: InsurancePool::new(&config),
            oracles: OracleConsensus::new(&config),
            balance: 0,
            config,
        })
    }

    fn guard(&self, app: &Address) -> SuretyResult<()> {
        self.access.require_operational()?;
        self.access.require_authorized(app)
    }

    fn receive(&mut self, value: Amount) -> SuretyResult<()> {
        self.balance = self.balance.checked_add(value).ok_or(SuretyError::Overflow)?;
        Ok(())
    }

    pub fn register_airline(
        &mut self,
        app: &Address,
        sponsor: &Address,
        candidate: Address,
        name: &str,
        events: &mut Vec<Event>,
    ) -> SuretyResult<RegistrationOutcome> {
        self.guard(app)?;
        let outcome = self.airlines.register_airline(sponsor, candidate, name)?;
        match outcome {
            RegistrationOutcome::Registered => events.push(Event::AirlineRegistered {
                airline: candidate,
                name: name.to_string(),
                sponsor: *sponsor,
            }),
            RegistrationOutcome::Pending { votes, required } => events.push(Event::AirlineVoted {
                candidate,
                voter: *sponsor,
                votes,
                required,
            }),
        }
        Ok(outcome)
    }

    pub fn fund(
        &mut self,
        app: &Address,
        ctx: &CallContext,
        events: &mut Vec<Event>,
    ) -> SuretyResult<Amount> {
        self.guard(app)?;
        let total = self.airlines.fund(&ctx.caller, ctx.value)?;
        self.pool.add_reserve(ctx.value)?;
        self.receive(ctx.value)?;
        events.push(Event::AirlineFunded {
            airline: ctx.caller,
            amount: ctx.value,
            total,
        });
        Ok(total)
    }

    pub fn register_flight(
        &mut self,
        app: &Address,
        airline: &Address,
        designator: &str,
        timestamp: Timestamp,
        events: &mut Vec<Event>,
    ) -> SuretyResult<()> {
        self.guard(app)?;
        self.flights
            .register_flight(&self.airlines, airline, designator, timestamp)?;
        events.push(Event::FlightRegistered {
            airline: *airline,
            flight: designator.to_string(),
        });
        Ok(())
    }

    pub fn buy_insurance(
        &mut self,
        app: &Address,
        ctx: &CallContext,
        designator: &str,
        events: &mut Vec<Event>,
    ) -> SuretyResult<()> {
        self.guard(app)?;
        self.pool
            .buy_insurance(&self.flights, ctx.caller, designator, ctx.value)?;
        self.receive(ctx.value)?;
        events.push(Event::InsurancePurchased {
            passenger: ctx.caller,
            flight: designator.to_string(),
            premium: ctx.value,
        });
        Ok(())
    }

    pub fn register_oracle(
        &mut self,
        app: &Address,
        ctx: &CallContext,
        events: &mut Vec<Event>,
    ) -> SuretyResult<Vec<u8>> {
        self.guard(app)?;
        let indexes = self.oracles.register_oracle(ctx.caller, ctx.value)?;
        self.receive(ctx.value)?;
        events.push(Event::OracleRegistered {
            oracle: ctx.caller,
            indexes: indexes.clone(),
        });
        Ok(indexes)
    }

    pub fn fetch_flight_status(
        &mut self,
        app: &Address,
        requester: &Address,
        airline: &Address,
        designator: &str,
        timestamp: Timestamp,
        events: &mut Vec<Event>,
    ) -> SuretyResult<u8> {
        self.guard(app)?;
        self.flights.require_flight_of(airline, designator)?;
        let index = self
            .oracles
            .request_flight_status(*requester, *airline, designator, timestamp);
        events.push(Event::OracleRequest {
            index,
            airline: *airline,
            flight: designator.to_string(),
            timestamp,
        });
        Ok(index)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn submit_oracle_response(
        &mut self,
        app: &Address,
        oracle: &Address,
        index: u8,
        airline: &Address,
        designator: &str,
        timestamp: Timestamp,
        status: FlightStatus,
        events: &mut Vec<Event>,
    ) -> SuretyResult<ResponseOutcome> {
        self.guard(app)?;
        let outcome = self
            .oracles
            .submit_response(oracle, index, airline, designator, timestamp, status)?;
        events.push(Event::OracleReport {
            oracle: *oracle,
            index,
            airline: *airline,
            flight: designator.to_string(),
            timestamp,
            status,
        });

        if let ResponseOutcome::Resolved(resolved) = outcome {
            self.apply_flight_status(airline, designator, timestamp, resolved, events)?;
        }
        Ok(outcome)
    }

    /// Owner-only override with the same effect as a quorum resolution.
    #[allow(clippy::too_many_arguments)]
    pub fn process_flight_status(
        &mut self,
        app: &Address,
        caller: &Address,
        airline: &Address,
        designator: &str,
        timestamp: Timestamp,
        status: FlightStatus,
        events: &mut Vec<Event>,
    ) -> SuretyResult<()> {
        self.guard(app)?;
        self.access.require_owner(caller)?;
        self.flights.require_flight_of(airline, designator)?;
        self.apply_flight_status(airline, designator, timestamp, status, events)
    }

    /// Record a final status and settle the flight's policies. Passengers are
    /// credited when the airline is at fault.
    fn apply_flight_status(
        &mut self,
        airline: &Address,
        designator: &str,
        timestamp: Timestamp,
        status: FlightStatus,
        events: &mut Vec<Event>,
    ) -> SuretyResult<()> {
        self.flights.set_flight_status(designator, status, timestamp)?;
        events.push(Event::FlightStatusInfo {
            airline: *airline,
            flight: designator.to_string(),
            timestamp,
            status,
        });

        for credit in self.pool.settle_flight(designator, status)? {
            events.push(Event::PassengerCredited {
                passenger: credit.passenger,
                flight: designator.to_string(),
                amount: credit.amount,
            });
        }
        Ok(())
    }

    /// Zero the caller's credit and debit the held balance. The facade performs
    /// the outbound transfer afterwards.
    pub fn withdraw(
        &mut self,
        app: &Address,
        passenger: &Address,
        events: &mut Vec<Event>,
    ) -> SuretyResult<Amount> {
        self.guard(app)?;
        let amount = self.pool.withdraw(passenger)?;
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(SuretyError::InsufficientFunds {
                required: amount,
                available: self.balance,
            })?;
        events.push(Event::PassengerPaid {
            passenger: *passenger,
            amount,
        });
        Ok(amount)
    }

    pub fn set_operating_status(
        &mut self,
        caller: &Address,
        operational: bool,
        events: &mut Vec<Event>,
    ) -> SuretyResult<()> {
        self.access.set_operational(caller, operational)?;
        events.push(Event::OperatingStatusChanged { operational });
        Ok(())
    }

    pub fn authorize_caller(&mut self, caller: &Address, target: Address) -> SuretyResult<()> {
        self.access.authorize_caller(caller, target)
    }

    pub fn deauthorize_caller(&mut self, caller: &Address, target: &Address) -> SuretyResult<()> {
        self.access.deauthorize_caller(caller, target)
    }

    /// Re-derive every component's parameters from the validated configuration
    /// and check that the held balance is fully accounted for.
    pub(crate) fn restore(&mut self) -> SuretyResult<()> {
        self.config.ensure_valid()?;
        self.airlines.apply_config(&self.config);
        self.pool.apply_config(&self.config);
        self.oracles.apply_config(&self.config);
        if !self.is_balanced() {
            return Err(SuretyError::Config(format!(
                "held balance {} does not match the ledgers",
                self.balance
            )));
        }
        Ok(())
    }

    /// Held balance must always equal what the pool and oracle fees account for.
    pub fn is_balanced(&self) -> bool {
        self.pool
            .total_held()
            .and_then(|held| held.checked_add(self.oracles.fees_collected()))
            .map_or(false, |accounted| accounted == self.balance)
    }
}
