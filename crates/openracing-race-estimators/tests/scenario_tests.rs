//! Scenario Tests
//!
//! Hand-computed race situations driven through the public API.

use openracing_race_estimators::prelude::*;
use openracing_race_estimators::stint::pit_stop_counts;

fn init_tracing() {
    // Another test may already have installed the subscriber.
    let _installed = tracing_subscriber::fmt()
        .with_env_filter("openracing_race_estimators=debug")
        .with_test_writer()
        .try_init()
        .is_ok();
}

fn timing(elapsed: f64, lap_start: f64, last: f64) -> VehicleTiming<'static> {
    VehicleTiming {
        elapsed,
        lap_start_time: lap_start,
        vehicle_class: "LMP2",
        in_pits: false,
        last_lap_time: last,
        best_lap_time: -1.0,
    }
}

/// Drive `laps` back to back and collect the pace after each lap has been
/// validated.
fn drive_laps(pace: &mut AdaptivePaceEstimator, laps: &[f64]) -> Vec<f64> {
    let mut lap_start = 0.0;
    let mut last = -1.0;
    pace.update(&timing(0.0, lap_start, last));

    let mut history = Vec::with_capacity(laps.len());
    for &lap in laps {
        lap_start += lap;
        // The game publishes the new lap time shortly after the line.
        pace.update(&timing(lap_start, lap_start, last));
        last = lap;
        history.push(pace.update(&timing(lap_start + 1.5, lap_start, last)));
    }
    history
}

#[test]
fn pace_ratchets_down_and_decays_up() -> Result<(), String> {
    init_tracing();
    let mut pace = AdaptivePaceEstimator::new(PaceConfig {
        sample_count: 6,
        margin: 5.0,
    });
    let history = drive_laps(&mut pace, &[90.0, 89.5, 91.0, 88.9]);

    let [seed, faster, slower, best] = <[f64; 4]>::try_from(history)
        .map_err(|history| format!("expected four pace values, got {history:?}"))?;
    assert!((seed - 90.0).abs() < 1e-9);
    assert!((faster - 89.5).abs() < 1e-9);
    assert!(slower > 89.5 && slower <= 94.5);
    assert!((slower - (89.5 * 5.0 + 91.0) / 6.0).abs() < 1e-9);
    assert!((best - 88.9).abs() < 1e-9);
    Ok(())
}

#[test]
fn pace_ignores_out_lap_after_pit_stop() {
    init_tracing();
    let mut pace = AdaptivePaceEstimator::new(PaceConfig::default());
    drive_laps(&mut pace, &[100.0]);

    // Lap two ends in the pit lane: 130 s in-lap.
    let mut pit = timing(180.0, 100.0, 100.0);
    pit.in_pits = true;
    pace.update(&pit);
    let mut line = timing(230.0, 230.0, 100.0);
    line.in_pits = true;
    pace.update(&line);
    let mut after = timing(231.5, 230.0, 130.0);
    after.in_pits = true;
    assert!((pace.update(&after) - 100.0).abs() < 1e-9);

    // Out-lap started in the pits, so it is excluded as well.
    pace.update(&timing(360.0, 360.0, 130.0));
    assert!((pace.update(&timing(361.5, 360.0, 130.0)) - 100.0).abs() < 1e-9);

    // The next flying lap counts again.
    pace.update(&timing(458.0, 458.0, 130.0));
    assert!((pace.update(&timing(459.5, 458.0, 98.0)) - 98.0).abs() < 1e-9);
}

#[test]
fn pace_reseeds_on_class_change() {
    init_tracing();
    let mut pace = AdaptivePaceEstimator::new(PaceConfig::default());
    drive_laps(&mut pace, &[100.0, 99.0]);
    let mut hypercar = timing(400.0, 199.0, 210.0);
    hypercar.vehicle_class = "Hypercar";
    hypercar.best_lap_time = 205.0;
    assert!((pace.update(&hypercar) - 205.0).abs() < 1e-9);
}

fn stint_input(amount: f64, race_laps: u32) -> StintInput {
    StintInput {
        amount,
        capacity: 80.0,
        completed_laps: 10,
        laptime_pace: 100.0,
        last_lap_time: 100.0,
        race_length: RaceLength::Laps(10 + race_laps),
        consumption: ConsumptionReading {
            completed_lap: None,
            last_lap: Some(2.5),
            pace: Some(2.5),
        },
        ..StintInput::default()
    }
}

/// Start a stint on a full tank, then run it down to `amount`.
fn stint_at(amount: f64, race_laps: u32) -> (StintStrategy, StintEstimate) {
    let mut stint = StintStrategy::new(StintConfig::default());
    stint.update(&stint_input(80.0, race_laps));
    let estimate = stint.update(&stint_input(amount, race_laps));
    (stint, estimate)
}

#[test]
fn stint_half_tank_twenty_laps_to_go() {
    init_tracing();
    let (stint, estimate) = stint_at(40.0, 20);
    assert!((stint.state().start_fuel - 80.0).abs() < 1e-9);
    assert!((estimate.laps_remaining - 16.0).abs() < 1e-9);
    assert!((estimate.stint_used - 40.0).abs() < 1e-9);
    assert!((estimate.required_refuel_absolute - 50.0).abs() < 1e-9);
    assert!((estimate.required_refuel_relative - 10.0).abs() < 1e-9);
    assert_eq!(estimate.pit_stops_end, 1);
    assert_eq!(estimate.pit_stops_early, 1);
    assert!((estimate.one_less_pit_consumption - 2.0).abs() < 1e-9);
    assert!((estimate.one_less_pit_saving - 0.5).abs() < 1e-9);
}

#[test]
fn stint_full_tank_covers_race() {
    // A full tank sustains 32 laps, more than the 20 left.
    let (_, estimate) = stint_at(80.0, 20);
    assert_eq!(estimate.pit_stops_end, 0);
    assert_eq!(estimate.pit_stops_early, 0);
    assert!(estimate.required_refuel_relative.abs() < 1e-12);
    assert_eq!(estimate.one_less_pit_consumption(), None);
}

#[test]
fn stint_exact_division_not_rounded_up() {
    // 48 laps need 120; 80 missing is exactly one full tank.
    let (_, estimate) = stint_at(40.0, 48);
    assert_eq!(estimate.pit_stops_end, 1);
    assert_eq!(estimate.pit_stops_early, 2);
}

#[test]
fn stint_long_race_two_stops() {
    let (_, estimate) = stint_at(40.0, 80);
    assert_eq!(estimate.pit_stops_end, 2);
    assert_eq!(estimate.pit_stops_early, 3);
    assert!((estimate.one_less_pit_consumption - 1.5).abs() < 1e-9);
    assert!((estimate.one_less_pit_saving - 1.0).abs() < 1e-9);
}

#[test]
fn stint_fuel_exactly_enough() {
    let (_, estimate) = stint_at(40.0, 16);
    assert_eq!(estimate.pit_stops_end, 0);
    assert!(estimate.required_refuel_relative.abs() < 1e-12);
}

#[test]
fn pit_stop_counts_early_keeps_lap_end_fuel() {
    // Half way round the lap: 40 - 1.25 left at the line is wasted capacity.
    assert_eq!(pit_stop_counts(40.0, 80.0, 2.5, 0.5, 20.0), Some((1, 1)));
    assert_eq!(pit_stop_counts(40.0, 80.0, 2.5, 0.5, 47.5), Some((2, 1)));
    assert_eq!(pit_stop_counts(40.0, 0.0, 2.5, 0.5, 47.5), None);
}

#[test]
fn time_limited_race_uses_pace() {
    init_tracing();
    let mut stint = StintStrategy::new(StintConfig::default());
    let input = StintInput {
        race_length: RaceLength::Time,
        session_remaining: 1000.0,
        lap_progress: 0.25,
        ..stint_input(40.0, 0)
    };
    let estimate = stint.update(&input);
    // ceil(0.25 + 10) - 0.25 = 10.75 laps.
    assert!((estimate.race_laps_remaining - 10.75).abs() < 1e-9);
    assert!((estimate.required_refuel_absolute - 26.875).abs() < 1e-9);
}

#[test]
fn extra_laps_added_to_distance() {
    let mut stint = StintStrategy::new(StintConfig {
        extra_laps: 1.0,
        ..StintConfig::default()
    });
    let estimate = stint.update(&stint_input(40.0, 20));
    assert!((estimate.race_laps_remaining - 21.0).abs() < 1e-9);
}

fn engine_sample(elapsed: f64, lap: u32, fuel: f64) -> TelemetrySample {
    TelemetrySample {
        session_elapsed: elapsed,
        session_remaining: 3600.0 - elapsed,
        race_length: RaceLength::Laps(30),
        lap_start_time: f64::from(lap) * 100.0,
        completed_laps: lap,
        lap_progress: (elapsed - f64::from(lap) * 100.0) / 100.0,
        last_lap_time: if lap > 0 { 100.0 } else { -1.0 },
        vehicle_class: "GT3".to_string(),
        fuel,
        fuel_capacity: 100.0,
        tyre_wear: [0.05; 4],
        ..TelemetrySample::default()
    }
}

#[test]
fn engine_flashes_low_fuel_warning() {
    init_tracing();
    let mut engine = EstimatorEngine::new(EstimatorConfig::default());

    // 100 s laps sampled every 2 s, burning 3.0 per lap from 15.0; the
    // first lap is joined part way round and never counts.
    let mut first_warning = None;
    let mut last = EstimatorOutputs::default();
    for tick in 0..=200u32 {
        let elapsed = 0.5 + 2.0 * f64::from(tick);
        let lap = tick / 50;
        let fuel = 15.0 - 3.0 * (elapsed - 0.5) / 100.0;
        last = engine.update(&engine_sample(elapsed, lap, fuel)).clone();
        if last.low_fuel_warning && first_warning.is_none() {
            first_warning = Some(elapsed);
        }
    }

    // Two laps of fuel left at the start of lap three.
    assert_eq!(first_warning, Some(300.5));
    let laps = last.fuel.laps_remaining().unwrap_or(-1.0);
    assert!((laps - 1.0).abs() < 1e-9, "laps remaining {laps}");
    assert_eq!(last.fuel_consumption.pace, Some(3.0));
    assert!((last.laptime_pace - 100.0).abs() < 1e-9);
}

#[test]
fn engine_rewind_resets_stint() {
    init_tracing();
    let mut engine = EstimatorEngine::new(EstimatorConfig::default());
    engine.update(&engine_sample(250.0, 2, 50.0));
    engine.update(&engine_sample(252.0, 2, 49.9));
    let outputs = engine.update(&engine_sample(120.0, 1, 52.0));
    assert_eq!(outputs.clock_event, ClockEvent::Rewound);
    assert_eq!(engine.fuel_stint().state().start_lap_number, 1);
    assert!((engine.fuel_stint().state().start_fuel - 52.0).abs() < 1e-9);
}
