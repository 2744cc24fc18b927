//! Emulator - simulated flight instruments
//!
//! Generates plausible values for a light twin so gauges can be developed
//! and tested without a simulator attached. The state advances in fixed
//! 10 ms substeps regardless of how often it is stepped, so the motion does
//! not depend on the server's send rate.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::time::Duration;

use super::DataSource;
use crate::var::VarKey;

/// Fixed simulation step
const SUBSTEP: Duration = Duration::from_millis(10);

/// How long each aircraft stays loaded
const VEHICLE_PERIOD: Duration = Duration::from_secs(5);

/// Aircraft the emulator cycles through
pub const AIRCRAFT_TITLES: [&str; 2] = ["Cessna Skyhawk", "Piper PA44"];

const MAX_BANK_RADIANS: f64 = PI / 6.0;
const ROLL_SPEED: f64 = 0.001;
const ALTITUDE_STEP: f64 = 2.0;
const MIN_ALTITUDE: f64 = 1000.0;
const MAX_ALTITUDE: f64 = 10000.0;

/// Simulated data source
pub struct EmulatorSource {
    rng: StdRng,
    /// Time not yet consumed by a substep
    pending: Duration,

    vehicle: Option<String>,
    remaining_titles: Vec<&'static str>,
    vehicle_elapsed: Duration,

    altitude: f64,
    ascending: bool,
    bank_radians: f64,
    rolling_left: bool,
    pitch_time: f64,
    pitch_degrees: f64,
    rpm_time: (f64, f64),
    rpm: (f64, f64),
    vertical_speed_time: f64,
    vertical_speed: f64,
    heading_time: f64,
    heading_degrees: f64,
    ball_time: f64,
    ball_degrees: f64,
    ball_position: f64,
    airspeed: Airspeed,
    turn_rate_time: f64,
    turn_rate_radians: f64,
    manifold_time: (f64, f64),
    manifold: (f64, f64),
}

/// Airspeed oscillates between a random low and high speed, picking a new
/// band and cycle duration after every full cycle
#[derive(Debug, Clone, Copy, Default)]
struct Airspeed {
    knots: f64,
    phase: f64,
    min: f64,
    max: f64,
    cycle_secs: f64,
}

impl Default for EmulatorSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EmulatorSource {
    /// Create an emulator seeded from system entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a deterministic emulator
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut source = Self {
            rng,
            pending: Duration::ZERO,
            vehicle: None,
            remaining_titles: Vec::new(),
            vehicle_elapsed: Duration::ZERO,
            altitude: MIN_ALTITUDE,
            ascending: true,
            bank_radians: 0.0,
            rolling_left: true,
            pitch_time: 0.0,
            pitch_degrees: 0.0,
            rpm_time: (0.0, 0.0),
            rpm: (0.0, 0.0),
            vertical_speed_time: 0.0,
            vertical_speed: 0.0,
            heading_time: 0.0,
            heading_degrees: 180.0,
            ball_time: 0.0,
            ball_degrees: 0.0,
            ball_position: 0.0,
            airspeed: Airspeed::default(),
            turn_rate_time: 0.0,
            turn_rate_radians: 0.0,
            manifold_time: (0.0, 0.0),
            manifold: (0.0, 0.0),
        };
        source.next_vehicle();
        source
    }

    /// Pick another aircraft, visiting every title once before repeating
    fn next_vehicle(&mut self) {
        if self.remaining_titles.is_empty() {
            self.remaining_titles = AIRCRAFT_TITLES.to_vec();
        }

        let index = self.rng.gen_range(0..self.remaining_titles.len());
        let title = self.remaining_titles.remove(index);

        if self.vehicle.as_deref() != Some(title) {
            tracing::info!("[EMULATOR] New vehicle: {}", title);
            self.vehicle = Some(title.to_string());
        }
    }

    fn substep(&mut self) {
        let dt = SUBSTEP.as_secs_f64();

        self.update_altitude();
        self.update_roll();
        self.update_pitch();
        self.update_rpms();
        self.update_vertical_speed();
        self.update_heading();
        self.update_turn_ball();
        self.update_airspeed(dt);
        self.update_turn_rate();
        self.update_manifold_pressure();
    }

    fn update_altitude(&mut self) {
        if self.ascending {
            self.altitude += ALTITUDE_STEP;
            if self.altitude >= MAX_ALTITUDE {
                self.ascending = false;
            }
        } else {
            self.altitude -= ALTITUDE_STEP;
            if self.altitude <= MIN_ALTITUDE {
                self.ascending = true;
            }
        }
    }

    fn update_roll(&mut self) {
        if self.rolling_left {
            self.bank_radians -= ROLL_SPEED;
            if self.bank_radians <= -MAX_BANK_RADIANS {
                self.rolling_left = false;
            }
        } else {
            self.bank_radians += ROLL_SPEED;
            if self.bank_radians >= MAX_BANK_RADIANS {
                self.rolling_left = true;
            }
        }
    }

    fn update_pitch(&mut self) {
        self.pitch_time += 0.005;
        self.pitch_degrees = self.pitch_time.sin() * 20.0;
    }

    fn update_rpms(&mut self) {
        self.rpm_time.0 += 0.01;
        self.rpm_time.1 += 0.0105;

        let left = band(500.0, 2800.0, self.rpm_time.0.sin());
        let right = band(600.0, 2900.0, self.rpm_time.1.sin());

        self.rpm = (
            left + self.rng.gen_range(-5.0..5.0),
            right + self.rng.gen_range(-5.0..5.0),
        );
    }

    fn update_vertical_speed(&mut self) {
        self.vertical_speed_time += 0.005;
        self.vertical_speed = self.vertical_speed_time.sin() * 33.3333;
    }

    fn update_heading(&mut self) {
        // Swings between 90 and 270 degrees
        self.heading_time += 0.005;
        self.heading_degrees = 180.0 + self.heading_time.sin() * 90.0;
    }

    fn update_turn_ball(&mut self) {
        self.ball_time += 0.005;
        self.ball_degrees = self.ball_time.sin() * 10.0;
        self.ball_position = self.ball_time.sin() * 127.0;
    }

    fn update_airspeed(&mut self, dt: f64) {
        let a = &mut self.airspeed;

        if a.cycle_secs <= 0.0 || a.phase >= 2.0 * PI {
            a.min = self.rng.gen_range(40.0..60.0);
            a.max = self.rng.gen_range(120.0..160.0);
            a.cycle_secs = self.rng.gen_range(10.0..20.0);
            a.phase = 0.0;
        }

        a.phase += 2.0 * PI / a.cycle_secs * dt;
        let wave = (a.phase.sin() + 1.0) / 2.0;
        a.knots = a.min + (a.max - a.min) * wave;
    }

    fn update_turn_rate(&mut self) {
        self.turn_rate_time += 0.01;
        self.turn_rate_radians = self.turn_rate_time.sin() * 3.0_f64.to_radians();
    }

    fn update_manifold_pressure(&mut self) {
        self.manifold_time.0 += 0.008;
        self.manifold_time.1 += 0.0095;

        let first = band(10.0, 35.0, self.manifold_time.0.sin());
        let second = band(10.0, 35.0, (self.manifold_time.1 + 0.3).sin());

        self.manifold = (
            first + self.rng.gen_range(-0.25..0.25),
            second + self.rng.gen_range(-0.25..0.25),
        );
    }
}

/// Midpoint of `min..max` plus `wave` (in `[-1, 1]`) times half the range
fn band(min: f64, max: f64, wave: f64) -> f64 {
    (max + min) / 2.0 + (max - min) / 2.0 * wave
}

impl DataSource for EmulatorSource {
    fn name(&self) -> &str {
        "emulator"
    }

    fn vehicle_name(&self) -> Option<String> {
        self.vehicle.clone()
    }

    fn value(&self, key: &VarKey) -> Option<f64> {
        let unit = key.unit.to_ascii_lowercase();
        let radians = unit == "radians";

        let value = match key.name.to_ascii_uppercase().as_str() {
            "INDICATED ALTITUDE" => self.altitude,
            "AIRSPEED INDICATED" => self.airspeed.knots,
            "PLANE BANK DEGREES" if radians => self.bank_radians,
            "PLANE BANK DEGREES" => self.bank_radians.to_degrees(),
            "PLANE PITCH DEGREES" => self.pitch_degrees,
            "GENERAL ENG RPM:1" => self.rpm.0,
            "GENERAL ENG RPM:2" => self.rpm.1,
            "VERTICAL SPEED" => self.vertical_speed,
            "PLANE HEADING DEGREES TRUE" if radians => self.heading_degrees.to_radians(),
            "PLANE HEADING DEGREES TRUE" => self.heading_degrees,
            "TURN INDICATOR RATE" if radians => self.turn_rate_radians,
            "TURN INDICATOR RATE" => self.turn_rate_radians.to_degrees(),
            "TURN COORDINATOR BALL" if unit == "degrees" => self.ball_degrees,
            "TURN COORDINATOR BALL" => self.ball_position,
            "KOHLSMAN SETTING HG:1" => 29.92,
            "ENG MANIFOLD PRESSURE:1" => self.manifold.0,
            "ENG MANIFOLD PRESSURE:2" => self.manifold.1,
            _ => return None,
        };

        Some(value)
    }

    fn step(&mut self, dt: Duration) {
        self.vehicle_elapsed += dt;
        while self.vehicle_elapsed >= VEHICLE_PERIOD {
            self.vehicle_elapsed -= VEHICLE_PERIOD;
            self.next_vehicle();
        }

        self.pending += dt;
        while self.pending >= SUBSTEP {
            self.pending -= SUBSTEP;
            self.substep();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str, unit: &str) -> VarKey {
        VarKey::new(name, unit)
    }

    #[test]
    fn test_unknown_var() {
        let source = EmulatorSource::with_seed(1);
        assert_eq!(source.value(&key("FLAPS HANDLE INDEX", "number")), None);
        assert_eq!(source.value(&key("KOHLSMAN SETTING HG:1", "inHg")), Some(29.92));
    }

    #[test]
    fn test_altitude_ramps_in_substeps() {
        let mut source = EmulatorSource::with_seed(1);
        let altitude = key("INDICATED ALTITUDE", "feet");

        // Less than one substep does nothing
        source.step(Duration::from_millis(5));
        assert_eq!(source.value(&altitude), Some(1000.0));

        source.step(Duration::from_millis(25));
        assert_eq!(source.value(&altitude), Some(1006.0));
    }

    #[test]
    fn test_values_stay_in_range() {
        let mut source = EmulatorSource::with_seed(7);
        let rpm = key("GENERAL ENG RPM:1", "rpm");
        let airspeed = key("AIRSPEED INDICATED", "knots");
        let bank = key("PLANE BANK DEGREES", "degrees");
        let heading = key("PLANE HEADING DEGREES TRUE", "degrees");

        for _ in 0..2000 {
            source.step(Duration::from_millis(17));

            let v = source.value(&rpm).unwrap();
            assert!((490.0..=2810.0).contains(&v), "rpm {}", v);
            let v = source.value(&airspeed).unwrap();
            assert!((40.0..=160.0).contains(&v), "airspeed {}", v);
            let v = source.value(&bank).unwrap();
            assert!(v.abs() <= 30.0 + 0.1, "bank {}", v);
            let v = source.value(&heading).unwrap();
            assert!((90.0..=270.0).contains(&v), "heading {}", v);
        }
    }

    #[test]
    fn test_units() {
        let mut source = EmulatorSource::with_seed(3);
        source.step(Duration::from_secs(1));

        let degrees = source.value(&key("PLANE BANK DEGREES", "degrees")).unwrap();
        let radians = source.value(&key("plane bank degrees", "radians")).unwrap();
        assert!((degrees - radians.to_degrees()).abs() < 1e-9);
    }

    #[test]
    fn test_vehicle_cycles() {
        let mut source = EmulatorSource::with_seed(11);
        let first = source.vehicle_name().unwrap();
        assert!(AIRCRAFT_TITLES.contains(&first.as_str()));

        // Every title is used once before any repeats
        source.step(VEHICLE_PERIOD);
        let second = source.vehicle_name().unwrap();
        assert_ne!(first, second);
    }
}
