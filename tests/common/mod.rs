#![allow(dead_code)]

use flight_surety_core::simulation::oracle_address;
use flight_surety_core::{
    Address, CallContext, FlightSurety, RecordingPayoutSink, SuretyConfig, UNIT,
};

pub const FLIGHT: &str = "AA100";
pub const DEPARTURE: u64 = 123;

pub fn owner() -> Address {
    Address::from_low_u64(1)
}

pub fn first_airline() -> Address {
    Address::from_low_u64(2)
}

pub fn airline(n: u64) -> Address {
    Address::from_low_u64(100 + n)
}

pub fn passenger(n: u64) -> Address {
    Address::from_low_u64(500 + n)
}

pub fn deploy(config: SuretyConfig) -> (FlightSurety, RecordingPayoutSink) {
    let sink = RecordingPayoutSink::new();
    let payouts = Box::new(sink.clone());
    let surety = FlightSurety::new(config, owner(), first_airline(), "Founder Air", payouts)
        .expect("default deployment");
    (surety, sink)
}

/// First airline funded with 10 units and flight AA100 registered.
pub fn deploy_with_flight() -> (FlightSurety, RecordingPayoutSink) {
    let (surety, sink) = deploy(SuretyConfig::default());
    surety
        .fund(&CallContext::with_value(first_airline(), 10 * UNIT))
        .unwrap();
    surety
        .register_flight(&CallContext::new(first_airline()), FLIGHT)
        .unwrap();
    (surety, sink)
}

/// Register `count` oracles and return those holding `index`.
pub fn oracles_holding(surety: &FlightSurety, count: usize, index: u8) -> Vec<CallContext> {
    let fee = surety.registration_fee();
    let mut holders = Vec::new();
    for n in 0..count {
        let ctx = CallContext::with_value(oracle_address(n), fee);
        let indexes = surety.register_oracle(&ctx).unwrap();
        if indexes.contains(&index) {
            holders.push(ctx);
        }
    }
    holders
}
