//! Yaw and ground-steering state machine
//!
//! Produces two values per tick: `steering` for a nose/tail wheel and
//! `rudder` for coordinated flight. The ground-steering sub-machine locks
//! the current heading when the pilot releases the rudder and tracks the
//! accumulated course error while locked; course hold takes over on final
//! landing or when an external hold course is set.
//!
//! Only this module writes [`SteeringControl`]; only the output mixer reads
//! it. No other stage touches either value.

use crate::channel::Channels;
use crate::context::TickContext;
use crate::mode::{ControlMode, FlightStage};
use crate::pid::{SteerController, YawController};
use crate::stick_mixing::{stick_mix_channel, stick_mixing_enabled, StickMixing};
use crate::SERVO_MAX_CD;

const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Persistent ground-steering state
#[derive(Debug, Clone, Copy)]
pub struct SteerState {
    /// Course lock engaged
    pub locked_course: bool,
    /// Accumulated course error while locked (rad)
    pub locked_course_err: f32,
    /// Externally commanded hold course (centidegrees), -1 = none
    pub hold_course_cd: i32,
}

impl Default for SteerState {
    fn default() -> Self {
        Self {
            locked_course: false,
            locked_course_err: 0.0,
            hold_course_cd: -1,
        }
    }
}

/// Per-tick steering outputs, consumed by the output mixer
#[derive(Debug, Clone, Copy, Default)]
pub struct SteeringControl {
    /// Ground steering decided active this tick
    pub ground_steering: bool,
    /// Nose/tail wheel demand (centidegrees)
    pub steering: i16,
    /// Rudder demand (centidegrees)
    pub rudder: i16,
}

/// Configuration consumed by the yaw state machine
#[derive(Debug, Clone, Copy)]
pub struct YawParams {
    /// Altitude below which ground steering engages (m)
    pub ground_steer_alt: f32,
    /// Full-stick ground steer rate (deg/s)
    pub ground_steer_dps: f32,
    /// Roll-servo to rudder feed-forward gain
    pub kff_rudder_mix: f32,
    pub stick_mixing: StickMixing,
}

impl Default for YawParams {
    fn default() -> Self {
        Self {
            ground_steer_alt: 0.0,
            ground_steer_dps: 90.0,
            kff_rudder_mix: 0.5,
            stick_mixing: StickMixing::default(),
        }
    }
}

/// Run the yaw state machine for this tick
///
/// Decides whether ground steering is active, selects the steering source
/// (course hold, ground sub-machine, or none), then computes the
/// coordinated rudder unconditionally.
#[allow(clippy::too_many_arguments)]
pub fn stabilize_yaw(
    ctx: &TickContext,
    p: &YawParams,
    channels: &Channels,
    speed_scaler: f32,
    steer_state: &mut SteerState,
    out: &mut SteeringControl,
    steer_controller: &mut SteerController,
    yaw_controller: &mut YawController,
) {
    let land_final = ctx.mode == ControlMode::Auto && ctx.stage == FlightStage::LandFinal;

    if land_final {
        // in land final, set up for ground steering
        out.ground_steering = true;
    } else {
        // otherwise ground steer when no roll input and below the
        // configured altitude
        out.ground_steering = channels.roll.control_in == 0
            && ctx.speed.relative_altitude.abs() < p.ground_steer_alt;
        if ctx.mode == ControlMode::Auto && ctx.stage == FlightStage::LandApproach {
            out.ground_steering = false;
        }
    }

    if land_final || (steer_state.hold_course_cd != -1 && out.ground_steering) {
        calc_nav_yaw_course(ctx, p, channels, out, steer_controller);
    } else if out.ground_steering {
        calc_nav_yaw_ground(ctx, p, channels, steer_state, out, steer_controller);
    }
    // when ground steering is off, the previous steering value persists for
    // the mixer's steering fallback

    calc_nav_yaw_coordinated(ctx, p, channels, speed_scaler, out, yaw_controller);
}

/// Course-hold steering on the navigation bearing error
///
/// Used during auto takeoff and landing when a straight ground track must
/// be held.
fn calc_nav_yaw_course(
    ctx: &TickContext,
    p: &YawParams,
    channels: &Channels,
    out: &mut SteeringControl,
    steer_controller: &mut SteerController,
) {
    let yaw_rate_dps = ctx.attitude.gyro.z * RAD_TO_DEG;
    let mut steering =
        steer_controller.get_steering_out_angle_error(ctx.nav.bearing_error_cd, yaw_rate_dps, ctx.dt);
    if stick_mixing_enabled(ctx, p.stick_mixing) {
        steering = stick_mix_channel(&channels.rudder, steering);
    }
    out.steering = steering.clamp(-SERVO_MAX_CD, SERVO_MAX_CD);
}

/// Ground-steering sub-machine: manual / rate / locked-course
fn calc_nav_yaw_ground(
    ctx: &TickContext,
    p: &YawParams,
    channels: &Channels,
    steer_state: &mut SteerState,
    out: &mut SteeringControl,
    steer_controller: &mut SteerController,
) {
    let rudder_input = channels.rudder.control_in;

    if ctx.gps.ground_speed < 1.0
        && channels.throttle.control_in == 0
        && !ctx.stage.is_takeoff_or_abort()
    {
        // manual rudder control while still
        steer_state.locked_course = false;
        steer_state.locked_course_err = 0.0;
        out.steering = rudder_input;
        return;
    }

    let mut steer_rate = (rudder_input as f32 / SERVO_MAX_CD as f32) * p.ground_steer_dps;
    if ctx.stage.is_takeoff_or_abort() {
        steer_rate = 0.0;
    }
    if steer_rate != 0.0 {
        // pilot is giving rudder input
        steer_state.locked_course = false;
    } else if !steer_state.locked_course {
        // pilot released the rudder stick - lock the course
        steer_state.locked_course = true;
        if !ctx.stage.is_takeoff_or_abort() {
            steer_state.locked_course_err = 0.0;
        }
    }

    let yaw_rate_dps = ctx.attitude.gyro.z * RAD_TO_DEG;
    if !steer_state.locked_course {
        out.steering = steer_controller.get_steering_out_rate(steer_rate, yaw_rate_dps, ctx.dt);
    } else {
        // track heading drift while locked, then close the loop on the
        // accumulated error
        steer_state.locked_course_err += ctx.attitude.gyro.z * ctx.dt;
        let yaw_error_cd = (-steer_state.locked_course_err * RAD_TO_DEG * 100.0) as i32;
        out.steering =
            steer_controller.get_steering_out_angle_error(yaw_error_cd, yaw_rate_dps, ctx.dt);
    }
    out.steering = out.steering.clamp(-SERVO_MAX_CD, SERVO_MAX_CD);
}

/// Coordinated-flight rudder, computed every tick
fn calc_nav_yaw_coordinated(
    ctx: &TickContext,
    p: &YawParams,
    channels: &Channels,
    speed_scaler: f32,
    out: &mut SteeringControl,
    yaw_controller: &mut YawController,
) {
    let rudder_input = channels.rudder.control_in;
    let disable_integrator = ctx.mode == ControlMode::Stabilize && rudder_input != 0;

    let airspeed = ctx
        .speed
        .airspeed
        .unwrap_or(ctx.speed.smoothed_airspeed);
    let yaw_rate_dps = ctx.attitude.gyro.z * RAD_TO_DEG;

    let mut rudder = yaw_controller.get_servo_out(
        ctx.attitude.roll_cd,
        airspeed,
        yaw_rate_dps,
        speed_scaler,
        disable_integrator,
        ctx.dt,
    ) as i32;

    // turn coordination from the roll servo, plus raw pilot rudder
    rudder += (channels.roll.servo_out as f32 * p.kff_rudder_mix) as i32;
    rudder += rudder_input as i32;
    out.rudder = rudder.clamp(-(SERVO_MAX_CD as i32), SERVO_MAX_CD as i32) as i16;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pid::{SteerGains, YawGains};

    struct Fixture {
        ctx: TickContext,
        p: YawParams,
        channels: Channels,
        steer_state: SteerState,
        out: SteeringControl,
        steer: SteerController,
        yaw: YawController,
    }

    impl Fixture {
        fn new() -> Self {
            let mut ctx = TickContext::default();
            ctx.mode = ControlMode::FlyByWireA;
            Self {
                ctx,
                p: YawParams {
                    ground_steer_alt: 5.0,
                    ..YawParams::default()
                },
                channels: Channels::new(),
                steer_state: SteerState::default(),
                out: SteeringControl::default(),
                steer: SteerController::new(SteerGains::default()),
                yaw: YawController::new(YawGains::default()),
            }
        }

        fn run(&mut self) {
            stabilize_yaw(
                &self.ctx,
                &self.p,
                &self.channels,
                1.0,
                &mut self.steer_state,
                &mut self.out,
                &mut self.steer,
                &mut self.yaw,
            );
        }
    }

    // ========== Ground Steering Enable Tests ==========

    #[test]
    fn test_ground_steering_low_and_centered() {
        let mut f = Fixture::new();
        f.ctx.speed.relative_altitude = 1.0;
        f.run();
        assert!(f.out.ground_steering);
    }

    #[test]
    fn test_no_ground_steering_with_roll_input() {
        let mut f = Fixture::new();
        f.ctx.speed.relative_altitude = 1.0;
        f.channels.roll.control_in = 500;
        f.run();
        assert!(!f.out.ground_steering);
    }

    #[test]
    fn test_no_ground_steering_above_threshold() {
        let mut f = Fixture::new();
        f.ctx.speed.relative_altitude = 50.0;
        f.run();
        assert!(!f.out.ground_steering);
    }

    #[test]
    fn test_land_final_forces_ground_steering() {
        let mut f = Fixture::new();
        f.ctx.mode = ControlMode::Auto;
        f.ctx.stage = FlightStage::LandFinal;
        f.ctx.speed.relative_altitude = 50.0;
        f.run();
        assert!(f.out.ground_steering);
    }

    #[test]
    fn test_land_approach_forbids_ground_steering() {
        let mut f = Fixture::new();
        f.ctx.mode = ControlMode::Auto;
        f.ctx.stage = FlightStage::LandApproach;
        f.ctx.speed.relative_altitude = 1.0;
        f.run();
        assert!(!f.out.ground_steering);
    }

    // ========== Ground Sub-Machine Tests ==========

    #[test]
    fn test_stationary_manual_rudder_passthrough() {
        let mut f = Fixture::new();
        f.ctx.speed.relative_altitude = 0.0;
        f.ctx.gps.ground_speed = 0.2;
        f.channels.rudder.control_in = 1800;
        f.steer_state.locked_course = true;
        f.steer_state.locked_course_err = 0.4;
        f.run();
        assert_eq!(f.out.steering, 1800, "still: stick passes straight through");
        assert!(!f.steer_state.locked_course, "stationary clears the lock");
        assert_eq!(f.steer_state.locked_course_err, 0.0);
    }

    #[test]
    fn test_moving_zero_rudder_locks_course() {
        let mut f = Fixture::new();
        f.ctx.speed.relative_altitude = 0.0;
        f.ctx.gps.ground_speed = 4.0;
        f.run();
        assert!(f.steer_state.locked_course, "released stick must lock");
        assert_eq!(f.steer_state.locked_course_err, 0.0, "fresh lock resets error");
    }

    #[test]
    fn test_rudder_input_unlocks() {
        let mut f = Fixture::new();
        f.ctx.speed.relative_altitude = 0.0;
        f.ctx.gps.ground_speed = 4.0;
        f.run();
        assert!(f.steer_state.locked_course);
        f.channels.rudder.control_in = 2000;
        f.run();
        assert!(!f.steer_state.locked_course, "rudder input must unlock");
    }

    #[test]
    fn test_takeoff_preserves_locked_error() {
        let mut f = Fixture::new();
        f.ctx.speed.relative_altitude = 0.0;
        f.ctx.gps.ground_speed = 4.0;
        f.ctx.stage = FlightStage::Takeoff;
        f.steer_state.locked_course = false;
        f.steer_state.locked_course_err = 0.1;
        f.run();
        assert!(f.steer_state.locked_course);
        assert!(
            f.steer_state.locked_course_err > 0.09,
            "takeoff lock must not reset error (discontinuity)"
        );
    }

    #[test]
    fn test_takeoff_ignores_pilot_steer_rate() {
        let mut f = Fixture::new();
        f.ctx.speed.relative_altitude = 0.0;
        f.ctx.gps.ground_speed = 4.0;
        f.ctx.stage = FlightStage::Takeoff;
        f.channels.rudder.control_in = 4500;
        f.run();
        assert!(f.steer_state.locked_course, "full rudder is ignored on takeoff");
    }

    #[test]
    fn test_locked_course_integrates_drift() {
        let mut f = Fixture::new();
        f.ctx.speed.relative_altitude = 0.0;
        f.ctx.gps.ground_speed = 4.0;
        f.run(); // lock
        f.ctx.attitude.gyro.z = 0.2; // drifting right
        f.run();
        assert!(f.steer_state.locked_course_err > 0.0);
        assert!(f.out.steering < 0, "steering must oppose the drift");
    }

    // ========== Coordinated Rudder Tests ==========

    #[test]
    fn test_rudder_includes_roll_feedforward() {
        let mut f = Fixture::new();
        f.ctx.speed.relative_altitude = 100.0; // no ground steering
        f.channels.roll.servo_out = 2000;
        f.run();
        assert_eq!(f.out.rudder, 1000, "0.5 rudder mix of 2000 roll servo");
    }

    #[test]
    fn test_rudder_adds_pilot_input() {
        let mut f = Fixture::new();
        f.ctx.speed.relative_altitude = 100.0;
        f.channels.rudder.control_in = 800;
        f.run();
        assert_eq!(f.out.rudder, 800);
    }

    #[test]
    fn test_rudder_clamped() {
        let mut f = Fixture::new();
        f.ctx.speed.relative_altitude = 100.0;
        f.channels.roll.servo_out = 4500;
        f.channels.rudder.control_in = 4500;
        f.run();
        assert_eq!(f.out.rudder, 4500);
    }

    #[test]
    fn test_steering_persists_when_disabled() {
        let mut f = Fixture::new();
        f.ctx.speed.relative_altitude = 100.0;
        f.out.steering = 777;
        f.run();
        assert_eq!(f.out.steering, 777, "no steering source ran this tick");
    }

    // ========== Course Hold Tests ==========

    #[test]
    fn test_hold_course_uses_bearing_error() {
        let mut f = Fixture::new();
        f.ctx.speed.relative_altitude = 1.0;
        f.steer_state.hold_course_cd = 9000;
        f.ctx.nav.bearing_error_cd = 2000;
        f.run();
        assert!(f.out.steering > 0, "positive bearing error steers right");
    }
}
