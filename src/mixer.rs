//! Output mixing primitives for non-conventional airframe geometries
//!
//! V-tail, elevon, flaperon and differential-spoiler airframes all reuse one
//! two-channel software mixer. The mixer works on PWM values after the
//! per-channel angle-to-PWM conversion, so reversal and trim settings keep
//! their usual meaning.
//!
//! Flap scheduling and the flap slew limiter also live here since their
//! output feeds the flaperon mixer.

use crate::context::TickContext;
use crate::mode::{ControlMode, FlightStage};
use crate::SERVO_MAX_CD;

/// Two-channel mixer geometry
///
/// The four active variants select which of the combined terms is negated,
/// covering every servo installation direction without channel reversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixGeometry {
    #[default]
    Disabled,
    UpUp,
    UpDn,
    DnUp,
    DnDn,
}

impl MixGeometry {
    pub fn as_str(&self) -> &'static str {
        match self {
            MixGeometry::Disabled => "Disabled",
            MixGeometry::UpUp => "UpUp",
            MixGeometry::UpDn => "UpDn",
            MixGeometry::DnUp => "DnUp",
            MixGeometry::DnDn => "DnDn",
        }
    }
}

/// Static output-stage configuration
#[derive(Debug, Clone, Copy)]
pub struct MixingConfig {
    /// Gain applied to both combined terms of the two-channel mixer
    pub mixing_gain: f32,
    /// Legacy elevon mode: roll/pitch are mixed directly into PWM
    pub elevon_mix_mode: bool,
    pub reverse_elevons: bool,
    pub reverse_ch1_elevon: bool,
    pub reverse_ch2_elevon: bool,
    /// Elevon output centers, PWM microseconds
    pub elevon_trim1: u16,
    pub elevon_trim2: u16,
    pub vtail_output: MixGeometry,
    pub elevon_output: MixGeometry,
    pub flaperon_output: MixGeometry,
    /// Both flaperon outputs are assigned
    pub has_flaperons: bool,
    /// Both differential spoiler outputs are assigned
    pub has_dspoilers: bool,
    /// A dedicated ground-steering output is assigned
    pub has_steering_wheel: bool,
    /// Manual throttle passthrough while suppressed
    pub throttle_suppress_manual: bool,
    /// Manual throttle passthrough in pilot-stabilized modes
    pub throttle_passthru_stabilize: bool,
    /// Throttle percent limits
    pub throttle_min: i16,
    pub throttle_max: i16,
    /// Overrides `throttle_max` during takeoff and aborted landing when nonzero
    pub takeoff_throttle_max: i16,
    /// Percent of throttle travel per second, 0 disables
    pub throttle_slewrate: u8,
    /// Replaces `throttle_slewrate` during autonomous takeoff when nonzero
    pub takeoff_throttle_slewrate: u8,
    /// Flap percent per second, 0 disables
    pub flap_slewrate: u8,
    /// Speed-scheduled flap stages, speeds in m/s, 0 disables a stage
    pub flap_1_speed: u8,
    pub flap_1_percent: i8,
    pub flap_2_speed: u8,
    pub flap_2_percent: i8,
    pub takeoff_flap_percent: i8,
    pub land_flap_percent: i8,
    /// Cruise throttle percent, flap speed source without an airspeed sensor
    pub throttle_cruise: i16,
}

impl Default for MixingConfig {
    fn default() -> Self {
        Self {
            mixing_gain: 0.5,
            elevon_mix_mode: false,
            reverse_elevons: false,
            reverse_ch1_elevon: false,
            reverse_ch2_elevon: false,
            elevon_trim1: 1500,
            elevon_trim2: 1500,
            vtail_output: MixGeometry::Disabled,
            elevon_output: MixGeometry::Disabled,
            flaperon_output: MixGeometry::Disabled,
            has_flaperons: false,
            has_dspoilers: false,
            has_steering_wheel: false,
            throttle_suppress_manual: false,
            throttle_passthru_stabilize: false,
            throttle_min: 0,
            throttle_max: 100,
            takeoff_throttle_max: 0,
            throttle_slewrate: 100,
            takeoff_throttle_slewrate: 0,
            flap_slewrate: 75,
            flap_1_speed: 0,
            flap_1_percent: 0,
            flap_2_speed: 0,
            flap_2_percent: 0,
            takeoff_flap_percent: 0,
            land_flap_percent: 0,
            throttle_cruise: 45,
        }
    }
}

fn bool_to_sign(b: bool) -> f32 {
    if b {
        -1.0
    } else {
        1.0
    }
}

/// Two-channel software mixer
///
/// Centers both inputs on their trims, forms difference and sum scaled by
/// `gain`, applies the geometry's signs, clamps to a symmetric 600 us range
/// and re-centers on the 1500 us midpoint.
pub fn channel_output_mixer(
    geometry: MixGeometry,
    chan1: &mut u16,
    chan2: &mut u16,
    trim1: u16,
    trim2: u16,
    gain: f32,
) {
    if geometry == MixGeometry::Disabled {
        return;
    }

    let c1 = *chan1 as i32 - trim1 as i32;
    let c2 = *chan2 as i32 - trim2 as i32;

    let mut v1 = ((c1 - c2) as f32 * gain) as i32;
    let mut v2 = ((c1 + c2) as f32 * gain) as i32;

    match geometry {
        MixGeometry::Disabled => unreachable!(),
        MixGeometry::UpUp => {}
        MixGeometry::UpDn => v2 = -v2,
        MixGeometry::DnUp => v1 = -v1,
        MixGeometry::DnDn => {
            v1 = -v1;
            v2 = -v2;
        }
    }

    v1 = v1.clamp(-600, 600);
    v2 = v2.clamp(-600, 600);

    *chan1 = (1500 + v1) as u16;
    *chan2 = (1500 + v2) as u16;
}

/// Flaperon outputs: aileron demand mixed with a percentage of flap
///
/// The flap percent maps to a 500 us half-range PWM offset. Returns the two
/// flaperon PWM values, or None when the airframe has no flaperons.
pub fn flaperon_update(
    cfg: &MixingConfig,
    roll_radio_out: u16,
    roll_radio_trim: u16,
    flap_percent: i8,
) -> Option<(u16, u16)> {
    if !cfg.has_flaperons {
        return None;
    }
    let mut ch1 = roll_radio_out;
    let mut ch2 = (1500 - flap_percent as i32 * 5) as u16;
    channel_output_mixer(
        cfg.flaperon_output,
        &mut ch1,
        &mut ch2,
        roll_radio_trim,
        1500,
        cfg.mixing_gain,
    );
    Some((ch1, ch2))
}

/// Elevon combination of pitch and roll demands, centidegree scale
pub fn elevon_mix(cfg: &MixingConfig, roll_servo_out: i16, pitch_servo_out: i16) -> (f32, f32) {
    let sign = bool_to_sign(cfg.reverse_elevons);
    let ch1 = pitch_servo_out as f32 - sign * roll_servo_out as f32;
    let ch2 = pitch_servo_out as f32 + sign * roll_servo_out as f32;
    (ch1, ch2)
}

/// Elevon PWM for one output channel with its own trim and reversal
pub fn elevon_pwm(value: f32, trim: u16, reversed: bool) -> u16 {
    let offset = bool_to_sign(reversed) * (value * 500.0 / SERVO_MAX_CD as f32);
    (trim as f32 + offset) as u16
}

/// Differential-spoiler split of the rudder demand across the elevon pair
///
/// Adds drag on the side of the requested yaw by deflecting one elevon and
/// its paired spoiler in opposite directions. Returns the adjusted elevon
/// pair and the two spoiler demands, all in centidegrees.
pub fn dspoiler_split(
    reverse_elevons: bool,
    rudder_servo_out: i16,
    ch1: f32,
    ch2: f32,
) -> (f32, f32, f32, f32) {
    let rudder = rudder_servo_out as f32;
    let mut ch1 = ch1;
    let mut ch2 = ch2;
    let mut ch3 = ch1;
    let mut ch4 = ch2;
    if bool_to_sign(reverse_elevons) * rudder < 0.0 {
        ch1 += rudder.abs();
        ch3 -= rudder.abs();
    } else {
        ch2 += rudder.abs();
        ch4 -= rudder.abs();
    }
    (ch1, ch2, ch3, ch4)
}

/// Flap change limited to `flap_slewrate` percent per second
///
/// A minimum of one percent per tick is always allowed, so the slowest
/// possible full deflection takes two seconds at a 50 Hz tick.
pub fn flap_slew_limit(last_value: &mut i8, new_value: i8, slewrate: u8, dt: f32) -> i8 {
    let mut value = new_value;
    if slewrate != 0 {
        let mut step = slewrate as f32 * dt;
        if step < 1.0 {
            step = 1.0;
        }
        let lo = *last_value as f32 - step;
        let hi = *last_value as f32 + step;
        value = (value as f32).clamp(lo, hi) as i8;
    }
    *last_value = value;
    value
}

/// Speed-scheduled automatic flap deployment
///
/// Uses target airspeed when a sensor is fitted, cruise throttle as a proxy
/// otherwise. Takeoff and landing stages override the speed schedule since
/// fixed stage levels oscillate less than speed-based selection.
pub fn auto_flap_schedule(ctx: &TickContext, cfg: &MixingConfig) -> i8 {
    if !ctx.mode.auto_throttle() {
        return 0;
    }

    let flap_speed_source = if ctx.speed.airspeed.is_some() {
        (ctx.nav.target_airspeed_cm as f32 * 0.01) as i16
    } else {
        cfg.throttle_cruise
    };

    let mut percent = 0;
    if cfg.flap_2_speed != 0 && flap_speed_source <= cfg.flap_2_speed as i16 {
        percent = cfg.flap_2_percent;
    } else if cfg.flap_1_speed != 0 && flap_speed_source <= cfg.flap_1_speed as i16 {
        percent = cfg.flap_1_percent;
    }

    if ctx.mode == ControlMode::Auto {
        match ctx.stage {
            FlightStage::Takeoff | FlightStage::LandAbort => {
                if cfg.takeoff_flap_percent != 0 {
                    percent = cfg.takeoff_flap_percent;
                }
            }
            FlightStage::LandApproach | FlightStage::LandFinal => {
                if cfg.land_flap_percent != 0 {
                    percent = cfg.land_flap_percent;
                }
            }
            _ => {}
        }
    }

    percent
}

/// Throttle percent limits for the current mode and stage
pub fn throttle_limits(ctx: &TickContext, cfg: &MixingConfig) -> (i16, i16) {
    let mut min_throttle = cfg.throttle_min;
    let mut max_throttle = cfg.throttle_max;
    if ctx.mode == ControlMode::Auto {
        if ctx.stage == FlightStage::LandFinal {
            min_throttle = 0;
        }
        if matches!(ctx.stage, FlightStage::Takeoff | FlightStage::LandAbort)
            && cfg.takeoff_throttle_max != 0
        {
            max_throttle = cfg.takeoff_throttle_max;
        }
    }
    (min_throttle, max_throttle)
}
