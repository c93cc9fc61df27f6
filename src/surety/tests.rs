use mockall::predicate::eq;
use tempfile::tempdir;

use super::snapshot::Snapshot;
use super::*;
use crate::flight::FlightRegistry;
use crate::insurance::payout::MockPayoutSink;
use crate::insurance::RecordingPayoutSink;
use crate::primitives::UNIT;

fn owner() -> Address {
    Address::from_low_u64(1)
}

fn first_airline() -> Address {
    Address::from_low_u64(2)
}

fn passenger() -> Address {
    Address::from_low_u64(50)
}

fn deploy_with(payouts: Box<dyn PayoutSink>) -> FlightSurety {
    FlightSurety::new(
        SuretyConfig::default(),
        owner(),
        first_airline(),
        "Founder Air",
        payouts,
    )
    .unwrap()
}

/// Funded first airline, flight AA100, passenger insured for the full cap.
fn insured(payouts: Box<dyn PayoutSink>) -> FlightSurety {
    let surety = deploy_with(payouts);
    surety
        .fund(&CallContext::with_value(first_airline(), 10 * UNIT))
        .unwrap();
    surety
        .register_flight(&CallContext::new(first_airline()), "AA100")
        .unwrap();
    surety
        .buy_insurance(&CallContext::with_value(passenger(), UNIT), "AA100")
        .unwrap();
    surety
}

fn credit_passenger(surety: &FlightSurety) {
    surety
        .process_flight_status(
            &CallContext::new(owner()),
            &first_airline(),
            "AA100",
            123,
            FlightStatus::LateAirline,
        )
        .unwrap();
}

#[test]
fn test_deploy_authorizes_facade() {
    let surety = deploy_with(Box::new(RecordingPayoutSink::new()));
    assert!(surety.is_operational());
    assert!(surety.is_caller_authorized(&surety.app()));
    assert_eq!(surety.app(), app_address(&owner()));
    assert!(surety.is_airline(&first_airline()));
    assert_eq!(surety.get_airline_count(), 1);
}

#[test]
fn test_invalid_config_rejected_at_deploy() {
    let config = SuretyConfig {
        oracle_min_responses: 0,
        ..SuretyConfig::default()
    };
    let result = FlightSurety::new(
        config,
        owner(),
        first_airline(),
        "Founder Air",
        Box::new(RecordingPayoutSink::new()),
    );
    assert!(matches!(result, Err(SuretyError::Config(_))));
}

#[test]
fn test_pause_blocks_mutations() {
    let surety = deploy_with(Box::new(RecordingPayoutSink::new()));

    let denied = surety.set_operating_status(&CallContext::new(passenger()), false);
    assert!(matches!(denied, Err(SuretyError::AccessDenied(_))));

    surety
        .set_operating_status(&CallContext::new(owner()), false)
        .unwrap();
    let err = surety
        .fund(&CallContext::with_value(first_airline(), 10 * UNIT))
        .unwrap_err();
    assert!(matches!(err, SuretyError::NotOperational));
    assert!(!surety.is_airline_funded(&first_airline()));

    surety
        .set_operating_status(&CallContext::new(owner()), true)
        .unwrap();
    surety
        .fund(&CallContext::with_value(first_airline(), 10 * UNIT))
        .unwrap();
    assert!(surety.is_airline_funded(&first_airline()));
}

#[test]
fn test_deauthorized_facade_cannot_mutate() {
    let surety = deploy_with(Box::new(RecordingPayoutSink::new()));
    let app = surety.app();
    surety
        .deauthorize_caller(&CallContext::new(owner()), &app)
        .unwrap();

    let err = surety
        .fund(&CallContext::with_value(first_airline(), 10 * UNIT))
        .unwrap_err();
    assert!(matches!(err, SuretyError::AccessDenied(_)));

    surety
        .authorize_caller(&CallContext::new(owner()), app)
        .unwrap();
    assert!(surety
        .fund(&CallContext::with_value(first_airline(), 10 * UNIT))
        .is_ok());
}

#[test]
fn test_failed_call_leaves_no_events() {
    let surety = deploy_with(Box::new(RecordingPayoutSink::new()));
    let before = surety.events().len();
    let _ = surety.register_flight(&CallContext::new(first_airline()), "AA100");
    assert_eq!(surety.events().len(), before);
    assert_eq!(surety.contract_balance(), 0);
}

#[test]
fn test_override_is_owner_only() {
    let surety = insured(Box::new(RecordingPayoutSink::new()));
    let err = surety
        .process_flight_status(
            &CallContext::new(passenger()),
            &first_airline(),
            "AA100",
            123,
            FlightStatus::LateAirline,
        )
        .unwrap_err();
    assert!(matches!(err, SuretyError::AccessDenied(_)));
    assert_eq!(surety.get_passenger_funds(&passenger()), 0);

    credit_passenger(&surety);
    assert_eq!(surety.get_passenger_funds(&passenger()), UNIT + UNIT / 2);
    assert_eq!(
        surety.get_flight("AA100").unwrap().status,
        FlightStatus::LateAirline
    );
    assert!(surety.is_balanced());
}

#[test]
fn test_non_airline_delay_pays_nothing() {
    let surety = insured(Box::new(RecordingPayoutSink::new()));
    surety
        .process_flight_status(
            &CallContext::new(owner()),
            &first_airline(),
            "AA100",
            123,
            FlightStatus::LateWeather,
        )
        .unwrap();
    assert_eq!(surety.get_passenger_funds(&passenger()), 0);
    assert!(!surety.get_policy("AA100", &passenger()).unwrap().paid_out);
}

#[test]
fn test_pay_transfers_through_sink() {
    let mut sink = MockPayoutSink::new();
    sink.expect_transfer()
        .with(eq(passenger()), eq(UNIT + UNIT / 2))
        .times(1)
        .returning(|_, _| Ok(()));

    let surety = insured(Box::new(sink));
    credit_passenger(&surety);
    let held = surety.contract_balance();

    let paid = surety.pay(&CallContext::new(passenger())).unwrap();
    assert_eq!(paid, UNIT + UNIT / 2);
    assert_eq!(surety.get_passenger_funds(&passenger()), 0);
    assert_eq!(surety.contract_balance(), held - paid);
    assert!(surety.is_balanced());

    let err = surety.pay(&CallContext::new(passenger())).unwrap_err();
    assert!(matches!(err, SuretyError::InsufficientFunds { .. }));
}

#[test]
fn test_failed_transfer_reverts_withdrawal() {
    let mut sink = MockPayoutSink::new();
    let mut attempts = 0;
    sink.expect_transfer().times(2).returning(move |_, _| {
        attempts += 1;
        if attempts == 1 {
            Err("recipient rejected value".to_string())
        } else {
            Ok(())
        }
    });

    let surety = insured(Box::new(sink));
    credit_passenger(&surety);
    let events_before = surety.events().len();

    let err = surety.pay(&CallContext::new(passenger())).unwrap_err();
    assert!(matches!(err, SuretyError::TransferFailed(_)));
    // Credit restored and nothing announced
    assert_eq!(surety.get_passenger_funds(&passenger()), UNIT + UNIT / 2);
    assert_eq!(surety.events().len(), events_before);

    assert_eq!(
        surety.pay(&CallContext::new(passenger())).unwrap(),
        UNIT + UNIT / 2
    );
    assert_eq!(surety.get_passenger_funds(&passenger()), 0);
}

#[test]
fn test_fetch_requires_flight_of_airline() {
    let surety = insured(Box::new(RecordingPayoutSink::new()));
    let anyone = CallContext::new(passenger());

    let err = surety
        .fetch_flight_status(&anyone, &passenger(), "AA100", 123)
        .unwrap_err();
    assert!(matches!(err, SuretyError::UnknownFlight(_)));

    let index = surety
        .fetch_flight_status(&anyone, &first_airline(), "AA100", 123)
        .unwrap();
    assert!(index < 10);
    assert!(matches!(
        surety.events().last(),
        Some(Event::OracleRequest { index: i, .. }) if *i == index
    ));
}

#[test]
fn test_drain_events_empties_log() {
    let surety = insured(Box::new(RecordingPayoutSink::new()));
    let drained = surety.drain_events();
    assert_eq!(drained.len(), 3);
    assert!(surety.events().is_empty());
}

#[test]
fn test_snapshot_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("surety.json");

    let surety = insured(Box::new(RecordingPayoutSink::new()));
    credit_passenger(&surety);
    surety.save_snapshot(&path).unwrap();

    let restored =
        FlightSurety::load_snapshot(&path, Box::new(RecordingPayoutSink::new())).unwrap();
    assert_eq!(restored.app(), surety.app());
    assert_eq!(restored.get_passenger_funds(&passenger()), UNIT + UNIT / 2);
    assert_eq!(restored.contract_balance(), surety.contract_balance());
    assert_eq!(restored.events(), surety.events());
    assert!(restored.is_passenger_insured("AA100", &passenger()));
    assert!(restored.is_balanced());

    // Restored deployment keeps working
    assert_eq!(
        restored.pay(&CallContext::new(passenger())).unwrap(),
        UNIT + UNIT / 2
    );
}

#[test]
fn test_snapshot_version_checked() {
    let surety = deploy_with(Box::new(RecordingPayoutSink::new()));
    let mut snapshot = surety.snapshot();
    snapshot.version = 99;
    let result = FlightSurety::from_snapshot(snapshot, Box::new(RecordingPayoutSink::new()));
    assert!(matches!(result, Err(SuretyError::Config(_))));
}

/// Register oracles until `count` of them hold `index`.
fn oracles_holding(surety: &FlightSurety, index: u8, count: usize) -> Vec<CallContext> {
    let fee = surety.registration_fee();
    let mut holders = Vec::new();
    let mut n = 0;
    while holders.len() < count {
        let ctx = CallContext::with_value(Address::from_low_u64(900 + n), fee);
        if surety.register_oracle(&ctx).unwrap().contains(&index) {
            holders.push(ctx);
        }
        n += 1;
    }
    holders
}

#[test]
fn test_failed_resolution_leaves_no_trace() {
    let surety = insured(Box::new(RecordingPayoutSink::new()));
    let airline = first_airline();
    let index = surety
        .fetch_flight_status(&CallContext::new(passenger()), &airline, "AA100", 123)
        .unwrap();
    let holders = oracles_holding(&surety, index, 3);
    let late = FlightStatus::LateAirline;
    for ctx in &holders[..2] {
        surety
            .submit_oracle_response(ctx, index, &airline, "AA100", 123, late)
            .unwrap();
    }

    // Without its flight record the quorum-completing vote fails after being counted
    let flights = surety.state.read().flights.clone();
    surety.state.write().flights = FlightRegistry::new();
    let events_before = surety.events().len();
    let balance_before = surety.contract_balance();

    let err = surety
        .submit_oracle_response(&holders[2], index, &airline, "AA100", 123, late)
        .unwrap_err();
    assert!(matches!(err, SuretyError::UnknownFlight(_)));

    let group = surety
        .get_oracle_request(index, &airline, "AA100", 123)
        .unwrap();
    assert_eq!(group.responders.len(), 2);
    assert!(!group.is_resolved());
    assert_eq!(surety.events().len(), events_before);
    assert_eq!(surety.contract_balance(), balance_before);
    assert_eq!(surety.get_passenger_funds(&passenger()), 0);

    surety.state.write().flights = flights;
    assert_eq!(
        surety.get_flight("AA100").unwrap().status,
        FlightStatus::Unknown
    );
    // The dropped vote was never recorded, so it can be cast again
    assert_eq!(
        surety
            .submit_oracle_response(&holders[2], index, &airline, "AA100", 123, late)
            .unwrap(),
        ResponseOutcome::Resolved(late)
    );
    assert_eq!(surety.get_passenger_funds(&passenger()), UNIT + UNIT / 2);
    assert!(surety.is_balanced());
}

fn restore_edited(
    surety: &FlightSurety,
    edit: impl FnOnce(&mut serde_json::Value),
) -> SuretyResult<FlightSurety> {
    let mut value = serde_json::to_value(surety.snapshot()).unwrap();
    edit(&mut value);
    let snapshot: Snapshot = serde_json::from_value(value).unwrap();
    FlightSurety::from_snapshot(snapshot, Box::new(RecordingPayoutSink::new()))
}

#[test]
fn test_snapshot_component_parameters_follow_config() {
    let surety = insured(Box::new(RecordingPayoutSink::new()));

    let restored = restore_edited(&surety, |value| {
        value["state"]["oracles"]["index_space"] = 0.into();
        value["state"]["oracles"]["min_responses"] = 0.into();
        value["state"]["pool"]["payout_denominator"] = 0.into();
        value["state"]["airlines"]["voting_threshold"] = 0.into();
    })
    .unwrap();

    let index = restored
        .fetch_flight_status(&CallContext::new(passenger()), &first_airline(), "AA100", 123)
        .unwrap();
    assert!(index < 10);
    credit_passenger(&restored);
    assert_eq!(restored.get_passenger_funds(&passenger()), UNIT + UNIT / 2);
    assert!(restored.is_balanced());
}

#[test]
fn test_snapshot_with_bad_config_or_balance_rejected() {
    let surety = insured(Box::new(RecordingPayoutSink::new()));

    let result = restore_edited(&surety, |value| {
        value["state"]["config"]["oracle_index_space"] = 0.into();
    });
    assert!(matches!(result, Err(SuretyError::Config(_))));

    let inflated = surety.contract_balance() + UNIT;
    let result = restore_edited(&surety, |value| {
        value["state"]["balance"] = inflated.into();
    });
    assert!(matches!(result, Err(SuretyError::Config(_))));
}

#[test]
fn test_snapshot_file_name_ending_in_partial() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.partial");
    let surety = insured(Box::new(RecordingPayoutSink::new()));

    surety.save_snapshot(&path).unwrap();
    assert!(!dir.path().join("state.partial.partial").exists());
    let restored =
        FlightSurety::load_snapshot(&path, Box::new(RecordingPayoutSink::new())).unwrap();
    assert_eq!(restored.contract_balance(), surety.contract_balance());
}
