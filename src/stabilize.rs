//! Per-mode attitude stabilization for the roll and pitch axes
//!
//! Each function turns this tick's attitude demand into servo demands on the
//! roll/pitch channels. The roll path carries the inverted-flight wrap, the
//! pitch path carries the takeoff tail-hold short circuit and the
//! throttle-to-pitch feedforward.

use crate::channel::Channels;
use crate::context::TickContext;
use crate::pid::AxisController;
use crate::steering::SteeringControl;

/// Persistent acro-mode locking state
///
/// While a stick is centered the corresponding axis is "locked": roll holds
/// the attitude at release by integrating rate error, pitch latches the
/// attitude at release directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcroLockState {
    pub locked_roll: bool,
    /// Integrated roll rate error while locked (rad)
    pub locked_roll_err: f32,
    pub locked_pitch: bool,
    pub locked_pitch_cd: i32,
}

/// Acro-mode configuration
#[derive(Debug, Clone, Copy)]
pub struct AcroConfig {
    /// Full-stick roll rate (deg/s)
    pub roll_rate_dps: f32,
    /// Full-stick pitch rate (deg/s)
    pub pitch_rate_dps: f32,
    /// Hold attitude while sticks are centered
    pub locking: bool,
}

impl Default for AcroConfig {
    fn default() -> Self {
        Self {
            roll_rate_dps: 180.0,
            pitch_rate_dps: 180.0,
            locking: false,
        }
    }
}

/// Training-mode attitude targets for this tick
#[derive(Debug, Clone, Copy)]
pub struct TrainingState {
    pub manual_roll: bool,
    pub manual_pitch: bool,
    pub nav_roll_cd: i32,
    pub nav_pitch_cd: i32,
}

/// Roll axis stabilization
///
/// When flying inverted the demand is rotated so demand and measurement
/// wrap in the same direction from zero; without this the wrap of the
/// measured roll fights the wrap of the demand near 180 degrees.
pub fn stabilize_roll(
    ctx: &TickContext,
    nav_roll_cd: i32,
    speed_scaler: f32,
    controller: &mut AxisController,
    channels: &mut Channels,
) {
    let mut demand_cd = nav_roll_cd;
    if ctx.fly_inverted {
        demand_cd += 18000;
        if ctx.attitude.roll_cd < 0 {
            demand_cd -= 36000;
        }
    }

    let roll_rate_dps = ctx.attitude.gyro.x.to_degrees();
    channels.roll.servo_out = controller.get_servo_out(
        demand_cd - ctx.attitude.roll_cd,
        roll_rate_dps,
        speed_scaler,
        false,
        ctx.dt,
    );
}

/// Pitch axis stabilization
///
/// During the tail-hold phase of a tail-dragger takeoff the elevator is
/// forced directly from the held percentage and the controller is bypassed.
/// Otherwise the demand is the navigation pitch plus the static trim plus
/// the throttle feedforward, so power changes do not balloon the nose.
pub fn stabilize_pitch(
    ctx: &TickContext,
    nav_pitch_cd: i32,
    pitch_trim_cd: i32,
    kff_throttle_to_pitch: f32,
    speed_scaler: f32,
    controller: &mut AxisController,
    channels: &mut Channels,
) {
    let force_elevator = ctx.takeoff.tail_hold_elevator;
    if force_elevator != 0 {
        // percentage to a -4500..4500 centidegree angle
        channels.pitch.servo_out = 45 * force_elevator as i16;
        return;
    }

    let demanded_pitch_cd = nav_pitch_cd
        + pitch_trim_cd
        + (channels.throttle.servo_out as f32 * kff_throttle_to_pitch) as i32;

    let pitch_rate_dps = ctx.attitude.gyro.y.to_degrees();
    channels.pitch.servo_out = controller.get_servo_out(
        demanded_pitch_cd - ctx.attitude.pitch_cd,
        pitch_rate_dps,
        speed_scaler,
        false,
        ctx.dt,
    );
}

/// Training-mode targets: the pilot flies freely inside the configured
/// attitude limits; beyond a limit the stabilizer holds the limit.
pub fn training_update(
    ctx: &TickContext,
    roll_limit_cd: i32,
    pitch_limit_max_cd: i32,
    pitch_limit_min_cd: i32,
) -> TrainingState {
    let mut ts = TrainingState {
        manual_roll: false,
        manual_pitch: false,
        nav_roll_cd: 0,
        nav_pitch_cd: 0,
    };

    if ctx.attitude.roll_cd >= roll_limit_cd {
        ts.nav_roll_cd = roll_limit_cd;
    } else if ctx.attitude.roll_cd <= -roll_limit_cd {
        ts.nav_roll_cd = -roll_limit_cd;
    } else {
        ts.manual_roll = true;
    }

    if ctx.attitude.pitch_cd >= pitch_limit_max_cd {
        ts.nav_pitch_cd = pitch_limit_max_cd;
    } else if ctx.attitude.pitch_cd <= pitch_limit_min_cd {
        ts.nav_pitch_cd = pitch_limit_min_cd;
    } else {
        ts.manual_pitch = true;
    }

    ts
}

/// Training-mode stabilization
///
/// Inside the limits the sticks pass straight through. At a limit the
/// stabilizer takes over, but a stick deflection that reduces the attitude
/// excursion is always honored so the pilot can recover.
pub fn stabilize_training(
    ctx: &TickContext,
    ts: &TrainingState,
    pitch_trim_cd: i32,
    kff_throttle_to_pitch: f32,
    speed_scaler: f32,
    roll_controller: &mut AxisController,
    pitch_controller: &mut AxisController,
    channels: &mut Channels,
) {
    if ts.manual_roll {
        channels.roll.servo_out = channels.roll.control_in;
    } else {
        stabilize_roll(ctx, ts.nav_roll_cd, speed_scaler, roll_controller, channels);
        if (ts.nav_roll_cd > 0 && channels.roll.control_in < channels.roll.servo_out)
            || (ts.nav_roll_cd < 0 && channels.roll.control_in > channels.roll.servo_out)
        {
            // allow the pilot to get out of the roll
            channels.roll.servo_out = channels.roll.control_in;
        }
    }

    if ts.manual_pitch {
        channels.pitch.servo_out = channels.pitch.control_in;
    } else {
        stabilize_pitch(
            ctx,
            ts.nav_pitch_cd,
            pitch_trim_cd,
            kff_throttle_to_pitch,
            speed_scaler,
            pitch_controller,
            channels,
        );
        if (ts.nav_pitch_cd > 0 && channels.pitch.control_in < channels.pitch.servo_out)
            || (ts.nav_pitch_cd < 0 && channels.pitch.control_in > channels.pitch.servo_out)
        {
            // allow the pilot to get back to level
            channels.pitch.servo_out = channels.pitch.control_in;
        }
    }
}

/// Acro-mode rate stabilization with optional attitude locking
///
/// With a deflected stick the axis runs pure rate control. With locking
/// enabled and the stick centered, roll holds the release attitude by
/// driving the integrated rate error to zero, pitch latches the release
/// attitude and holds it with the full angle controller. Rudder passes
/// through from the stick.
#[allow(clippy::too_many_arguments)]
pub fn stabilize_acro(
    ctx: &TickContext,
    cfg: &AcroConfig,
    speed_scaler: f32,
    lock: &mut AcroLockState,
    roll_controller: &mut AxisController,
    pitch_controller: &mut AxisController,
    nav_roll_cd: &mut i32,
    nav_pitch_cd: &mut i32,
    steering: &mut SteeringControl,
    channels: &mut Channels,
) {
    let roll_rate = (channels.roll.control_in as f32 / 4500.0) * cfg.roll_rate_dps;
    let pitch_rate = (channels.pitch.control_in as f32 / 4500.0) * cfg.pitch_rate_dps;

    let gyro_roll_dps = ctx.attitude.gyro.x.to_degrees();
    let gyro_pitch_dps = ctx.attitude.gyro.y.to_degrees();

    if cfg.locking && roll_rate == 0.0 {
        if !lock.locked_roll {
            lock.locked_roll = true;
            lock.locked_roll_err = 0.0;
        } else {
            lock.locked_roll_err += ctx.attitude.gyro.x * ctx.dt;
        }
        let roll_error_cd = (-lock.locked_roll_err.to_degrees() * 100.0) as i32;
        *nav_roll_cd = ctx.attitude.roll_cd + roll_error_cd;
        // drive the integrated angular error to zero, integrator disabled
        channels.roll.servo_out =
            roll_controller.get_servo_out(roll_error_cd, gyro_roll_dps, speed_scaler, true, ctx.dt);
    } else {
        lock.locked_roll = false;
        channels.roll.servo_out =
            roll_controller.get_rate_out(roll_rate, gyro_roll_dps, speed_scaler, ctx.dt);
    }

    if cfg.locking && pitch_rate == 0.0 {
        if !lock.locked_pitch {
            lock.locked_pitch = true;
            lock.locked_pitch_cd = ctx.attitude.pitch_cd;
        }
        // hold the locked pitch with the integrator enabled, which helps
        // with inverted flight
        *nav_pitch_cd = lock.locked_pitch_cd;
        channels.pitch.servo_out = pitch_controller.get_servo_out(
            *nav_pitch_cd - ctx.attitude.pitch_cd,
            gyro_pitch_dps,
            speed_scaler,
            false,
            ctx.dt,
        );
    } else {
        lock.locked_pitch = false;
        channels.pitch.servo_out =
            pitch_controller.get_rate_out(pitch_rate, gyro_pitch_dps, speed_scaler, ctx.dt);
    }

    // manual rudder
    steering.steering = channels.rudder.control_in;
    steering.rudder = channels.rudder.control_in;
}

/// Pre-takeoff integrator zeroing condition
///
/// Returns (zero attitude integrators, zero steering integrator). Low, not
/// climbing, zero throttle and barely moving means we are parked; zeroing
/// prevents integrator buildup before takeoff.
pub fn integrator_zero_flags(ctx: &TickContext, channels: &Channels) -> (bool, bool) {
    let parked = channels.throttle.control_in == 0
        && ctx.speed.relative_altitude.abs() < 5.0
        && ctx.speed.climb_rate.abs() < 0.5
        && ctx.gps.ground_speed < 3.0;
    (parked, parked && ctx.gps.ground_speed < 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pid::{AxisController, AxisGains};

    fn p_only() -> AxisController {
        // tau 0.5, kp 0.4: 1000 cd error -> 20 deg/s -> 8 deg -> 800 cd
        AxisController::new(AxisGains {
            ki: 0.0,
            kd: 0.0,
            ..AxisGains::default()
        })
    }

    fn fixture() -> (TickContext, Channels) {
        (TickContext::default(), Channels::default())
    }

    // ========== Roll Tests ==========

    #[test]
    fn test_roll_proportional_output() {
        let (ctx, mut ch) = fixture();
        let mut c = p_only();
        stabilize_roll(&ctx, 1000, 1.0, &mut c, &mut ch);
        assert_eq!(ch.roll.servo_out, 800);
    }

    #[test]
    fn test_roll_inverted_wrap_signs() {
        let (mut ctx, mut ch) = fixture();
        ctx.fly_inverted = true;

        // upright-right of inverted: demand wraps to +18000
        ctx.attitude.roll_cd = 17000;
        let mut c = p_only();
        stabilize_roll(&ctx, 0, 1.0, &mut c, &mut ch);
        assert!(ch.roll.servo_out > 0, "error +1000 rolls right");

        // mirrored case wraps to -18000
        ctx.attitude.roll_cd = -17000;
        let mut c = p_only();
        stabilize_roll(&ctx, 0, 1.0, &mut c, &mut ch);
        assert!(ch.roll.servo_out < 0, "error -1000 rolls left");
    }

    #[test]
    fn test_roll_inverted_no_wrap_discontinuity() {
        // just either side of the wrap the error magnitude matches
        let (mut ctx, mut ch) = fixture();
        ctx.fly_inverted = true;

        ctx.attitude.roll_cd = 17950;
        let mut c = p_only();
        stabilize_roll(&ctx, 0, 1.0, &mut c, &mut ch);
        let right = ch.roll.servo_out;

        ctx.attitude.roll_cd = -17950;
        let mut c = p_only();
        stabilize_roll(&ctx, 0, 1.0, &mut c, &mut ch);
        let left = ch.roll.servo_out;

        assert_eq!(right, -left, "outputs mirror across the wrap");
        assert!(right.abs() < 200, "small error near the wrap: {}", right);
    }

    // ========== Pitch Tests ==========

    #[test]
    fn test_pitch_proportional_output() {
        let (ctx, mut ch) = fixture();
        let mut c = p_only();
        stabilize_pitch(&ctx, 1000, 0, 0.0, 1.0, &mut c, &mut ch);
        assert_eq!(ch.pitch.servo_out, 800);
    }

    #[test]
    fn test_pitch_trim_adds_to_demand() {
        let (ctx, mut ch) = fixture();
        let mut c = p_only();
        stabilize_pitch(&ctx, 1000, 500, 0.0, 1.0, &mut c, &mut ch);
        // demand 1500 cd -> 30 deg/s -> 12 deg
        assert_eq!(ch.pitch.servo_out, 1200);
    }

    #[test]
    fn test_pitch_throttle_feedforward() {
        let (ctx, mut ch) = fixture();
        ch.throttle.servo_out = 50;
        let mut c = p_only();
        // kff 10 cd per throttle percent adds 500 cd
        stabilize_pitch(&ctx, 1000, 0, 10.0, 1.0, &mut c, &mut ch);
        assert_eq!(ch.pitch.servo_out, 1200);
    }

    #[test]
    fn test_pitch_tail_hold_bypasses_controller() {
        let (mut ctx, mut ch) = fixture();
        ctx.takeoff.tail_hold_elevator = -100;
        let mut c = p_only();
        stabilize_pitch(&ctx, 1000, 0, 0.0, 1.0, &mut c, &mut ch);
        assert_eq!(ch.pitch.servo_out, -4500, "held tail forces full elevator");
    }

    // ========== Training Tests ==========

    #[test]
    fn test_training_manual_inside_limits() {
        let (mut ctx, _) = fixture();
        ctx.attitude.roll_cd = 1000;
        ctx.attitude.pitch_cd = -500;
        let ts = training_update(&ctx, 4500, 2000, -2500);
        assert!(ts.manual_roll);
        assert!(ts.manual_pitch);
    }

    #[test]
    fn test_training_holds_roll_limit() {
        let (mut ctx, _) = fixture();
        ctx.attitude.roll_cd = 5000;
        let ts = training_update(&ctx, 4500, 2000, -2500);
        assert!(!ts.manual_roll);
        assert_eq!(ts.nav_roll_cd, 4500);
    }

    #[test]
    fn test_training_manual_passthrough() {
        let (mut ctx, mut ch) = fixture();
        ctx.attitude.roll_cd = 1000;
        ch.roll.control_in = 2300;
        ch.pitch.control_in = -400;
        let ts = training_update(&ctx, 4500, 2000, -2500);
        let mut roll = p_only();
        let mut pitch = p_only();
        stabilize_training(&ctx, &ts, 0, 0.0, 1.0, &mut roll, &mut pitch, &mut ch);
        assert_eq!(ch.roll.servo_out, 2300);
        assert_eq!(ch.pitch.servo_out, -400);
    }

    #[test]
    fn test_training_recovery_stick_honored() {
        let (mut ctx, mut ch) = fixture();
        // past the positive roll limit: controller demands correction
        ctx.attitude.roll_cd = 6000;
        // pilot stick also rolls left, less than the correction
        ch.roll.control_in = -4000;
        ch.pitch.control_in = 0;
        let ts = training_update(&ctx, 4500, 2000, -2500);
        let mut roll = p_only();
        let mut pitch = p_only();
        stabilize_training(&ctx, &ts, 0, 0.0, 1.0, &mut roll, &mut pitch, &mut ch);
        // nav_roll 4500 > 0 and stick (-4000) < controller output
        assert_eq!(ch.roll.servo_out, -4000, "recovery input wins");
    }

    // ========== Acro Tests ==========

    fn acro_fixture() -> (
        TickContext,
        Channels,
        AcroLockState,
        AxisController,
        AxisController,
        SteeringControl,
    ) {
        let (ctx, ch) = fixture();
        (
            ctx,
            ch,
            AcroLockState::default(),
            p_only(),
            p_only(),
            SteeringControl::default(),
        )
    }

    #[test]
    fn test_acro_rate_control_with_stick() {
        let (ctx, mut ch, mut lock, mut roll, mut pitch, mut steer) = acro_fixture();
        let cfg = AcroConfig {
            locking: true,
            ..AcroConfig::default()
        };
        ch.roll.control_in = 4500; // full stick: 180 deg/s demand
        let mut nav_roll = 0;
        let mut nav_pitch = 0;
        stabilize_acro(
            &ctx, &cfg, 1.0, &mut lock, &mut roll, &mut pitch, &mut nav_roll, &mut nav_pitch,
            &mut steer, &mut ch,
        );
        assert!(!lock.locked_roll);
        // rate error 180 deg/s * kp 0.4 = 72 deg, clamped
        assert_eq!(ch.roll.servo_out, 4500);
    }

    #[test]
    fn test_acro_locks_on_release() {
        let (mut ctx, mut ch, mut lock, mut roll, mut pitch, mut steer) = acro_fixture();
        let cfg = AcroConfig {
            locking: true,
            ..AcroConfig::default()
        };
        ctx.attitude.pitch_cd = 1500;
        let mut nav_roll = 0;
        let mut nav_pitch = 0;
        stabilize_acro(
            &ctx, &cfg, 1.0, &mut lock, &mut roll, &mut pitch, &mut nav_roll, &mut nav_pitch,
            &mut steer, &mut ch,
        );
        assert!(lock.locked_roll);
        assert!(lock.locked_roll_err == 0.0, "fresh lock starts with zero error");
        assert!(lock.locked_pitch);
        assert_eq!(lock.locked_pitch_cd, 1500, "pitch latches the release attitude");
        assert_eq!(nav_pitch, 1500);
    }

    #[test]
    fn test_acro_locked_roll_integrates_drift() {
        let (mut ctx, mut ch, mut lock, mut roll, mut pitch, mut steer) = acro_fixture();
        let cfg = AcroConfig {
            locking: true,
            ..AcroConfig::default()
        };
        let mut nav_roll = 0;
        let mut nav_pitch = 0;
        stabilize_acro(
            &ctx, &cfg, 1.0, &mut lock, &mut roll, &mut pitch, &mut nav_roll, &mut nav_pitch,
            &mut steer, &mut ch,
        );
        // aircraft rolls right while locked
        ctx.attitude.gyro.x = 0.5;
        stabilize_acro(
            &ctx, &cfg, 1.0, &mut lock, &mut roll, &mut pitch, &mut nav_roll, &mut nav_pitch,
            &mut steer, &mut ch,
        );
        assert!(lock.locked_roll_err > 0.0);
        assert!(ch.roll.servo_out < 0, "correction opposes the drift");
    }

    #[test]
    fn test_acro_without_locking_stays_rate() {
        let (ctx, mut ch, mut lock, mut roll, mut pitch, mut steer) = acro_fixture();
        let cfg = AcroConfig::default(); // locking off
        let mut nav_roll = 0;
        let mut nav_pitch = 0;
        stabilize_acro(
            &ctx, &cfg, 1.0, &mut lock, &mut roll, &mut pitch, &mut nav_roll, &mut nav_pitch,
            &mut steer, &mut ch,
        );
        assert!(!lock.locked_roll);
        assert!(!lock.locked_pitch);
    }

    #[test]
    fn test_acro_rudder_passthrough() {
        let (ctx, mut ch, mut lock, mut roll, mut pitch, mut steer) = acro_fixture();
        ch.rudder.control_in = 1800;
        let cfg = AcroConfig::default();
        let mut nav_roll = 0;
        let mut nav_pitch = 0;
        stabilize_acro(
            &ctx, &cfg, 1.0, &mut lock, &mut roll, &mut pitch, &mut nav_roll, &mut nav_pitch,
            &mut steer, &mut ch,
        );
        assert_eq!(steer.rudder, 1800);
        assert_eq!(steer.steering, 1800);
    }

    // ========== Integrator Zeroing Tests ==========

    #[test]
    fn test_integrator_zero_when_parked() {
        let (mut ctx, ch) = fixture();
        ctx.speed.relative_altitude = 2.0;
        ctx.speed.climb_rate = 0.1;
        ctx.gps.ground_speed = 0.5;
        let (attitude, steering) = integrator_zero_flags(&ctx, &ch);
        assert!(attitude);
        assert!(steering, "below 1 m/s the steering integrator zeroes too");
    }

    #[test]
    fn test_integrator_kept_while_taxiing() {
        let (mut ctx, ch) = fixture();
        ctx.speed.relative_altitude = 2.0;
        ctx.gps.ground_speed = 2.0;
        let (attitude, steering) = integrator_zero_flags(&ctx, &ch);
        assert!(attitude, "slow taxi still zeroes attitude integrators");
        assert!(!steering, "steering integrator survives a taxi turn");
    }

    #[test]
    fn test_integrator_kept_with_throttle() {
        let (mut ctx, mut ch) = fixture();
        ctx.speed.relative_altitude = 2.0;
        ch.throttle.control_in = 30;
        let (attitude, _) = integrator_zero_flags(&ctx, &ch);
        assert!(!attitude, "open throttle means takeoff roll, keep integrators");
    }
}
