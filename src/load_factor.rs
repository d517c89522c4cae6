//! Aerodynamic load factor and stall-prevention roll limiting
//!
//! A banked turn multiplies wing loading by `1 / sqrt(cos(roll))`. At low
//! airspeed the wing cannot sustain that load, so the roll demand and the
//! working roll limit are narrowed to a bank angle the airframe can hold.
//! A floor of 25 degrees is always kept so the aircraft stays maneuverable
//! under a bad airspeed estimate (at 25 degrees the load factor is 1.1).

use libm::{acosf, cosf, sqrtf};

const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Minimum roll limit kept under stall prevention (centidegrees)
pub const STALL_PREVENTION_ROLL_MIN_CD: i32 = 2500;

/// Recompute the load factor and narrow the roll demand/limit
///
/// Mutates `nav_roll_cd` and `roll_limit_cd` in place and returns this
/// tick's aerodynamic load factor. No limiting is applied when stall
/// prevention is disabled or the aircraft is flying inverted.
///
/// # Arguments
///
/// * `nav_roll_cd` - roll demand from the navigation controller
/// * `roll_limit_cd` - working roll limit for this tick (starts at the
///   configured limit, may only narrow)
/// * `smoothed_airspeed` - filtered best airspeed estimate (m/s)
/// * `airspeed_min` - configured minimum airspeed (m/s)
pub fn update_load_factor(
    nav_roll_cd: &mut i32,
    roll_limit_cd: &mut i32,
    smoothed_airspeed: f32,
    airspeed_min: f32,
    stall_prevention: bool,
    fly_inverted: bool,
) -> f32 {
    // 85 degree clamp keeps cos() away from zero
    let demanded_roll = (nav_roll_cd.unsigned_abs() as f32 * 0.01).min(85.0);
    let cos_roll = cosf(demanded_roll * DEG_TO_RAD);
    let load_factor = 1.0 / sqrtf(cos_roll.max(0.0)).max(1e-6);

    if !stall_prevention {
        return load_factor;
    }
    if fly_inverted {
        // no roll limits when inverted
        return load_factor;
    }
    if airspeed_min <= 0.0 {
        return load_factor;
    }

    let max_load_factor = smoothed_airspeed / airspeed_min;
    if max_load_factor <= 1.0 {
        // below minimum airspeed: hold the 25 degree floor
        *nav_roll_cd = (*nav_roll_cd)
            .clamp(-STALL_PREVENTION_ROLL_MIN_CD, STALL_PREVENTION_ROLL_MIN_CD);
        *roll_limit_cd = (*roll_limit_cd)
            .clamp(-STALL_PREVENTION_ROLL_MIN_CD, STALL_PREVENTION_ROLL_MIN_CD);
    } else if max_load_factor < load_factor {
        // bank angle whose load factor matches what the airframe can hold
        let inv = 1.0 / max_load_factor;
        let mut roll_limit = (acosf((inv * inv).clamp(-1.0, 1.0)) * RAD_TO_DEG * 100.0) as i32;
        if roll_limit < STALL_PREVENTION_ROLL_MIN_CD {
            roll_limit = STALL_PREVENTION_ROLL_MIN_CD;
        }
        *nav_roll_cd = (*nav_roll_cd).clamp(-roll_limit, roll_limit);
        *roll_limit_cd = (*roll_limit_cd).clamp(-roll_limit, roll_limit);
    }

    load_factor
}
