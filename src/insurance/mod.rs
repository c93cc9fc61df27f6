pub mod payout;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::SuretyConfig;
use crate::errors::{SuretyError, SuretyResult};
use crate::flight::FlightRegistry;
use crate::primitives::{Address, Amount, FlightStatus};

pub use payout::{PayoutSink, RecordingPayoutSink};

/// Premium escrowed by one passenger against one flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub passenger: Address,
    pub flight: String,
    pub premium: Amount,
    pub paid_out: bool,
}

/// A credit granted when a flight resolved late through the airline's fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    pub passenger: Address,
    pub amount: Amount,
}

/// Escrow, airline reserve and the withdrawable passenger credit ledger.
///
/// Funds are held in three buckets: `reserve` (airline contributions), `escrow`
/// (premiums of unsettled policies per flight) and `credits` (owed to passengers
/// until they withdraw). Each policy commits its payout surplus against the reserve
/// when it is bought, so settling a flight never runs short.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsurancePool {
    cap: Amount,
    payout_numerator: u64,
    payout_denominator: u64,
    reserve: Amount,
    /// Part of `reserve` promised to unsettled policies
    committed: Amount,
    escrow: HashMap<String, Amount>,
    policies: HashMap<String, BTreeMap<Address, Policy>>,
    credits: HashMap<Address, Amount>,
    settled_flights: HashSet<String>,
}

impl InsurancePool {
    pub fn new(config: &SuretyConfig) -> Self {
        InsurancePool {
            cap: config.insurance_cap,
            payout_numerator: config.payout_numerator,
            payout_denominator: config.payout_denominator,
            reserve: 0,
            committed: 0,
            escrow: HashMap::new(),
            policies: HashMap::new(),
            credits: HashMap::new(),
            settled_flights: HashSet::new(),
        }
    }

    /// Take the cap and payout multiplier from `config`, leaving the ledger as is.
    pub(crate) fn apply_config(&mut self, config: &SuretyConfig) {
        self.cap = config.insurance_cap;
        self.payout_numerator = config.payout_numerator;
        self.payout_denominator = config.payout_denominator;
    }

    /// Airline contributions backing the payout surplus.
    pub fn add_reserve(&mut self, amount: Amount) -> SuretyResult<()> {
        self.reserve = self.reserve.checked_add(amount).ok_or(SuretyError::Overflow)?;
        Ok(())
    }

    /// Reserve not yet promised to an unsettled policy.
    pub fn available_reserve(&self) -> Amount {
        self.reserve.saturating_sub(self.committed)
    }

    /// Credit owed for `premium` if the flight is late through the airline's fault.
    pub fn payout_for(&self, premium: Amount) -> SuretyResult<Amount> {
        premium
            .checked_mul(self.payout_numerator)
            .and_then(|scaled| scaled.checked_div(self.payout_denominator))
            .ok_or(SuretyError::Overflow)
    }

    fn surplus_for(&self, premium: Amount) -> SuretyResult<Amount> {
        Ok(self.payout_for(premium)?.saturating_sub(premium))
    }

    pub fn buy_insurance(
        &mut self,
        flights: &FlightRegistry,
        passenger: Address,
        flight: &str,
        amount: Amount,
    ) -> SuretyResult<()> {
        if !flights.is_flight_registered(flight) {
            return Err(SuretyError::UnknownFlight(flight.to_string()));
        }
        if self.is_flight_settled(flight) {
            return Err(SuretyError::FlightSettled(flight.to_string()));
        }
        if amount > self.cap {
            return Err(SuretyError::InsuranceCapExceeded {
                amount,
                cap: self.cap,
            });
        }
        if amount == 0 {
            return Err(SuretyError::InsufficientFunds {
                required: 1,
                available: 0,
            });
        }
        if self.is_passenger_insured(flight, &passenger) {
            return Err(SuretyError::DuplicatePolicy(flight.to_string()));
        }

        let surplus = self.surplus_for(amount)?;
        let available = self.available_reserve();
        if surplus > available {
            return Err(SuretyError::InsufficientFunds {
                required: surplus,
                available,
            });
        }
        self.committed += surplus;

        let escrowed = self.escrow.entry(flight.to_string()).or_insert(0);
        *escrowed = escrowed.checked_add(amount).ok_or(SuretyError::Overflow)?;

        self.policies.entry(flight.to_string()).or_default().insert(
            passenger,
            Policy {
                passenger,
                flight: flight.to_string(),
                premium: amount,
                paid_out: false,
            },
        );
        Ok(())
    }

    /// Close `flight` with its final status.
    ///
    /// An airline-caused delay credits every policy with its payout, taking the
    /// premium from escrow and the surplus from the reserve. Any other status
    /// moves the premiums into the reserve and releases their commitments.
    /// Runs at most once per flight; later calls return an empty list.
    pub fn settle_flight(
        &mut self,
        flight: &str,
        status: FlightStatus,
    ) -> SuretyResult<Vec<Credit>> {
        if !self.settled_flights.insert(flight.to_string()) {
            return Ok(Vec::new());
        }
        let escrowed = self.escrow.remove(flight).unwrap_or(0);
        let mut policies = self.policies.remove(flight).unwrap_or_default();

        let mut credits = Vec::new();
        let mut premiums: Amount = 0;
        for policy in policies.values_mut().filter(|p| !p.paid_out) {
            let payout = self.payout_for(policy.premium)?;
            let surplus = payout.saturating_sub(policy.premium);
            premiums = premiums.checked_add(policy.premium).ok_or(SuretyError::Overflow)?;
            self.committed = self.committed.saturating_sub(surplus);

            if !status.is_airline_fault() {
                continue;
            }
            self.reserve = self
                .reserve
                .checked_sub(surplus)
                .ok_or(SuretyError::InsufficientFunds {
                    required: surplus,
                    available: self.reserve,
                })?;
            let balance = self.credits.entry(policy.passenger).or_insert(0);
            *balance = balance.checked_add(payout).ok_or(SuretyError::Overflow)?;
            policy.paid_out = true;

            credits.push(Credit {
                passenger: policy.passenger,
                amount: payout,
            });
        }

        if escrowed != premiums {
            return Err(SuretyError::InsufficientFunds {
                required: premiums,
                available: escrowed,
            });
        }
        if !status.is_airline_fault() {
            self.reserve = self.reserve.checked_add(escrowed).ok_or(SuretyError::Overflow)?;
        }
        self.policies.insert(flight.to_string(), policies);
        Ok(credits)
    }

    /// Zero the passenger's credit and return the amount to transfer out.
    pub fn withdraw(&mut self, passenger: &Address) -> SuretyResult<Amount> {
        let amount = self.get_passenger_funds(passenger);
        if amount == 0 {
            return Err(SuretyError::InsufficientFunds {
                required: 1,
                available: 0,
            });
        }
        self.credits.remove(passenger);
        Ok(amount)
    }

    pub fn get_passenger_funds(&self, passenger: &Address) -> Amount {
        self.credits.get(passenger).copied().unwrap_or(0)
    }

    pub fn get_policy(&self, flight: &str, passenger: &Address) -> Option<&Policy> {
        self.policies.get(flight).and_then(|p| p.get(passenger))
    }

    pub fn is_passenger_insured(&self, flight: &str, passenger: &Address) -> bool {
        self.get_policy(flight, passenger).is_some()
    }

    pub fn escrowed_for(&self, flight: &str) -> Amount {
        self.escrow.get(flight).copied().unwrap_or(0)
    }

    pub fn is_flight_settled(&self, flight: &str) -> bool {
        self.settled_flights.contains(flight)
    }

    /// Everything the pool is holding: reserve, escrow and unpaid credits.
    /// `None` if the buckets do not fit in an `Amount`.
    pub fn total_held(&self) -> Option<Amount> {
        self.escrow
            .values()
            .chain(self.credits.values())
            .try_fold(self.reserve, |total, amount| total.checked_add(*amount))
    }
}
