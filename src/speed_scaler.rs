//! Airspeed-dependent control-surface gain scaling
//!
//! Surface authority must shrink at high dynamic pressure and grow at low
//! airspeed to keep angular-rate response roughly constant. The multiplier
//! computed here is applied to every axis controller gain this tick.

/// Gain multiplier for the current tick
///
/// With a valid airspeed estimate the multiplier is
/// `scaling_speed / airspeed`, clamped to [0.5, 2.0], and the monotone
/// `highest_airspeed` statistic is updated. Without one, a first-order
/// throttle approximation is used instead, clamped to the tighter
/// [0.6, 1.67] band because there is no real speed information.
///
/// # Arguments
///
/// * `airspeed` - airspeed estimate (m/s), `None` if unavailable
/// * `throttle_servo_out` - current throttle demand (0..100)
/// * `scaling_speed` - reference airspeed for unity gain (m/s)
/// * `cruise_throttle` - configured cruise throttle percentage
/// * `highest_airspeed` - monotone highest-seen statistic, updated in place
pub fn get_speed_scaler(
    airspeed: Option<f32>,
    throttle_servo_out: i16,
    scaling_speed: f32,
    cruise_throttle: i16,
    highest_airspeed: &mut f32,
) -> f32 {
    match airspeed {
        Some(aspeed) => {
            if aspeed > *highest_airspeed {
                *highest_airspeed = aspeed;
            }
            let scaler = if aspeed > 0.0 {
                scaling_speed / aspeed
            } else {
                2.0
            };
            scaler.clamp(0.5, 2.0)
        }
        None => {
            // First order Taylor expansion of the square-root airspeed/
            // throttle relation.
            let scaler = if throttle_servo_out > 0 {
                0.5 + cruise_throttle as f32 / throttle_servo_out as f32 / 2.0
            } else {
                1.67
            };
            scaler.clamp(0.6, 1.67)
        }
    }
}
