//! Integrator-bearing axis, yaw and steering controllers
//!
//! These are the stateful numeric primitives the pipeline drives every tick.
//! The call contract is fixed: angle errors arrive in centidegrees, measured
//! body rates in deg/s, the speed-scaler multiplies the working gains, and
//! outputs are servo demands clamped to +/-4500 centidegrees.
//!
//! Angle control goes through a time constant to a rate demand, then a rate
//! PID closes the loop on the measured rate. Integrators persist across
//! ticks; they are zeroed only by `reset_integrator` or while explicitly
//! disabled for a tick.

use libm::tanf;

use crate::SERVO_MAX_CD;

const GRAVITY_MSS: f32 = 9.80665;
const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;

fn constrain_servo(out_deg: f32) -> i16 {
    let cd = out_deg * 100.0;
    cd.clamp(-(SERVO_MAX_CD as f32), SERVO_MAX_CD as f32) as i16
}

/// Gains for one angle-stabilized axis (roll or pitch)
#[derive(Debug, Clone, Copy)]
pub struct AxisGains {
    /// Angle error to rate demand time constant (s)
    pub tau: f32,
    /// Rate error to surface deflection (deg per deg/s)
    pub kp: f32,
    /// Integrator gain
    pub ki: f32,
    /// Rate-error derivative gain
    pub kd: f32,
    /// Integrator contribution clamp (deg of surface)
    pub imax_deg: f32,
    /// Maximum commanded rate (deg/s), 0 = unlimited
    pub rate_max_dps: f32,
}

impl Default for AxisGains {
    fn default() -> Self {
        Self {
            tau: 0.5,
            kp: 0.4,
            ki: 0.04,
            kd: 0.02,
            imax_deg: 15.0,
            rate_max_dps: 75.0,
        }
    }
}

/// Roll/pitch axis controller
#[derive(Debug, Clone, Copy)]
pub struct AxisController {
    gains: AxisGains,
    /// Integrator state (deg of surface)
    integrator: f32,
    last_rate_err: f32,
}

impl AxisController {
    pub fn new(gains: AxisGains) -> Self {
        Self {
            gains,
            integrator: 0.0,
            last_rate_err: 0.0,
        }
    }

    /// Servo demand for an attitude error
    ///
    /// # Arguments
    ///
    /// * `angle_err_cd` - demanded minus measured attitude (centidegrees)
    /// * `measured_rate_dps` - body rate on this axis (deg/s)
    /// * `scaler` - speed-scaler gain multiplier for this tick
    /// * `disable_integrator` - zero and hold the integrator this tick
    /// * `dt` - tick period (s)
    pub fn get_servo_out(
        &mut self,
        angle_err_cd: i32,
        measured_rate_dps: f32,
        scaler: f32,
        disable_integrator: bool,
        dt: f32,
    ) -> i16 {
        let mut desired_rate = angle_err_cd as f32 * 0.01 / self.gains.tau;
        if self.gains.rate_max_dps > 0.0 {
            desired_rate = desired_rate.clamp(-self.gains.rate_max_dps, self.gains.rate_max_dps);
        }
        self.rate_loop(desired_rate, measured_rate_dps, scaler, disable_integrator, dt)
    }

    /// Servo demand for a commanded rate (acro), integrator enabled
    pub fn get_rate_out(
        &mut self,
        desired_rate_dps: f32,
        measured_rate_dps: f32,
        scaler: f32,
        dt: f32,
    ) -> i16 {
        self.rate_loop(desired_rate_dps, measured_rate_dps, scaler, false, dt)
    }

    fn rate_loop(
        &mut self,
        desired_rate_dps: f32,
        measured_rate_dps: f32,
        scaler: f32,
        disable_integrator: bool,
        dt: f32,
    ) -> i16 {
        let rate_err = desired_rate_dps - measured_rate_dps;

        let p = rate_err * self.gains.kp * scaler;

        let d = if dt > 0.0 {
            (rate_err - self.last_rate_err) / dt * self.gains.kd * scaler
        } else {
            0.0
        };
        self.last_rate_err = rate_err;

        if disable_integrator {
            self.integrator = 0.0;
        } else {
            self.integrator += rate_err * self.gains.ki * scaler * dt;
            self.integrator = self
                .integrator
                .clamp(-self.gains.imax_deg, self.gains.imax_deg);
        }

        constrain_servo(p + self.integrator + d)
    }

    /// Zero the integrator (pre-takeoff windup prevention)
    pub fn reset_integrator(&mut self) {
        self.integrator = 0.0;
    }

    /// Current integrator state (deg of surface)
    pub fn integrator(&self) -> f32 {
        self.integrator
    }
}

/// Gains for the sideslip-coordination yaw damper
#[derive(Debug, Clone, Copy)]
pub struct YawGains {
    /// Yaw-rate error damping gain
    pub kd: f32,
    /// Integrator gain
    pub ki: f32,
    /// Integrator contribution clamp (deg of surface)
    pub imax_deg: f32,
}

impl Default for YawGains {
    fn default() -> Self {
        Self {
            kd: 0.3,
            ki: 0.05,
            imax_deg: 15.0,
        }
    }
}

/// Coordinated-flight yaw controller
///
/// Damps the difference between the measured yaw rate and the rate a
/// coordinated turn at the current bank and airspeed would produce. The
/// damper term carries the speed scaler squared: rudder authority falls
/// with the square of dynamic pressure.
#[derive(Debug, Clone, Copy)]
pub struct YawController {
    gains: YawGains,
    integrator: f32,
}

impl YawController {
    pub fn new(gains: YawGains) -> Self {
        Self {
            gains,
            integrator: 0.0,
        }
    }

    /// Rudder demand for coordinated flight
    ///
    /// # Arguments
    ///
    /// * `roll_cd` - measured roll (centidegrees)
    /// * `airspeed` - best airspeed estimate (m/s)
    /// * `yaw_rate_dps` - measured body yaw rate (deg/s)
    pub fn get_servo_out(
        &mut self,
        roll_cd: i32,
        airspeed: f32,
        yaw_rate_dps: f32,
        scaler: f32,
        disable_integrator: bool,
        dt: f32,
    ) -> i16 {
        // Coordinated turn rate at the current bank angle. The speed floor
        // keeps the reference finite while stationary.
        let speed = airspeed.max(3.0);
        let roll_rad = roll_cd as f32 * 0.01 * DEG_TO_RAD;
        // clamp bank used for the reference to avoid tan() blowup
        let roll_rad = roll_rad.clamp(-1.48, 1.48);
        let rate_offset_dps = GRAVITY_MSS * tanf(roll_rad) / speed / DEG_TO_RAD;

        let rate_err = rate_offset_dps - yaw_rate_dps;

        if disable_integrator {
            self.integrator = 0.0;
        } else {
            self.integrator += rate_err * self.gains.ki * dt;
            self.integrator = self
                .integrator
                .clamp(-self.gains.imax_deg, self.gains.imax_deg);
        }

        let out_deg = (rate_err * self.gains.kd + self.integrator) * scaler * scaler;
        constrain_servo(out_deg)
    }

    pub fn reset_integrator(&mut self) {
        self.integrator = 0.0;
    }

    pub fn integrator(&self) -> f32 {
        self.integrator
    }
}

/// Gains for the ground-steering controller
#[derive(Debug, Clone, Copy)]
pub struct SteerGains {
    /// Course error to turn-rate demand time constant (s)
    pub tau: f32,
    /// Rate error to steering deflection (deg per deg/s)
    pub kp: f32,
    /// Integrator gain
    pub ki: f32,
    /// Integrator contribution clamp (deg of steering)
    pub imax_deg: f32,
    /// Maximum commanded turn rate (deg/s), 0 = unlimited
    pub rate_max_dps: f32,
}

impl Default for SteerGains {
    fn default() -> Self {
        Self {
            tau: 0.75,
            kp: 1.8,
            ki: 0.2,
            imax_deg: 15.0,
            rate_max_dps: 90.0,
        }
    }
}

/// Nose/tail wheel steering controller
///
/// One integrator is shared by the angle-error and rate paths so that lock
/// and unlock transitions in the ground-steering state machine do not step
/// the output.
#[derive(Debug, Clone, Copy)]
pub struct SteerController {
    gains: SteerGains,
    integrator: f32,
}

impl SteerController {
    pub fn new(gains: SteerGains) -> Self {
        Self {
            gains,
            integrator: 0.0,
        }
    }

    /// Steering demand for a held-course error (centidegrees)
    pub fn get_steering_out_angle_error(
        &mut self,
        angle_err_cd: i32,
        yaw_rate_dps: f32,
        dt: f32,
    ) -> i16 {
        let mut desired_rate = angle_err_cd as f32 * 0.01 / self.gains.tau;
        if self.gains.rate_max_dps > 0.0 {
            desired_rate = desired_rate.clamp(-self.gains.rate_max_dps, self.gains.rate_max_dps);
        }
        self.rate_loop(desired_rate, yaw_rate_dps, dt)
    }

    /// Steering demand for a pilot-commanded turn rate (deg/s)
    pub fn get_steering_out_rate(
        &mut self,
        desired_rate_dps: f32,
        yaw_rate_dps: f32,
        dt: f32,
    ) -> i16 {
        self.rate_loop(desired_rate_dps, yaw_rate_dps, dt)
    }

    fn rate_loop(&mut self, desired_rate_dps: f32, yaw_rate_dps: f32, dt: f32) -> i16 {
        let rate_err = desired_rate_dps - yaw_rate_dps;
        self.integrator += rate_err * self.gains.ki * dt;
        self.integrator = self
            .integrator
            .clamp(-self.gains.imax_deg, self.gains.imax_deg);
        constrain_servo(rate_err * self.gains.kp + self.integrator)
    }

    pub fn reset_integrator(&mut self) {
        self.integrator = 0.0;
    }

    pub fn integrator(&self) -> f32 {
        self.integrator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.02;

    // ========== Axis Controller Tests ==========

    #[test]
    fn test_axis_output_sign_follows_error() {
        let mut c = AxisController::new(AxisGains::default());
        assert!(c.get_servo_out(3000, 0.0, 1.0, false, DT) > 0);
        c.reset_integrator();
        assert!(c.get_servo_out(-3000, 0.0, 1.0, false, DT) < 0);
    }

    #[test]
    fn test_axis_output_clamped() {
        let mut c = AxisController::new(AxisGains {
            kp: 100.0,
            ..AxisGains::default()
        });
        let out = c.get_servo_out(18000, 0.0, 2.0, false, DT);
        assert_eq!(out, 4500);
    }

    #[test]
    fn test_axis_scaler_scales_proportional() {
        let gains = AxisGains {
            ki: 0.0,
            kd: 0.0,
            ..AxisGains::default()
        };
        let mut a = AxisController::new(gains);
        let mut b = AxisController::new(gains);
        let half = a.get_servo_out(1000, 0.0, 0.5, false, DT);
        let full = b.get_servo_out(1000, 0.0, 1.0, false, DT);
        assert!(
            (full as i32 - 2 * half as i32).abs() <= 1,
            "P term must scale linearly: half={} full={}",
            half,
            full
        );
    }

    #[test]
    fn test_axis_integrator_accumulates_and_resets() {
        let mut c = AxisController::new(AxisGains::default());
        for _ in 0..50 {
            c.get_servo_out(2000, 0.0, 1.0, false, DT);
        }
        assert!(c.integrator() > 0.0, "integrator should wind up");
        c.reset_integrator();
        assert!(c.integrator() == 0.0);
    }

    #[test]
    fn test_axis_disable_integrator_zeroes_state() {
        let mut c = AxisController::new(AxisGains::default());
        for _ in 0..50 {
            c.get_servo_out(2000, 0.0, 1.0, false, DT);
        }
        c.get_servo_out(2000, 0.0, 1.0, true, DT);
        assert!(c.integrator() == 0.0, "disable must zero the integrator");
    }

    #[test]
    fn test_axis_integrator_clamped() {
        let mut c = AxisController::new(AxisGains {
            ki: 10.0,
            ..AxisGains::default()
        });
        for _ in 0..500 {
            c.get_servo_out(18000, 0.0, 1.0, false, DT);
        }
        assert!(
            c.integrator() <= AxisGains::default().imax_deg + 0.001,
            "integrator exceeded clamp: {}",
            c.integrator()
        );
    }

    #[test]
    fn test_axis_rate_out_zero_at_matched_rate() {
        let mut c = AxisController::new(AxisGains {
            ki: 0.0,
            kd: 0.0,
            ..AxisGains::default()
        });
        let out = c.get_rate_out(20.0, 20.0, 1.0, DT);
        assert_eq!(out, 0, "no output when measured rate matches demand");
    }

    // ========== Yaw Controller Tests ==========

    #[test]
    fn test_yaw_level_flight_no_rate_is_quiet() {
        let mut c = YawController::new(YawGains::default());
        let out = c.get_servo_out(0, 15.0, 0.0, 1.0, false, DT);
        assert_eq!(out, 0);
    }

    #[test]
    fn test_yaw_damps_uncommanded_rate() {
        let mut c = YawController::new(YawGains::default());
        // wings level but yawing right: rudder must oppose
        let out = c.get_servo_out(0, 15.0, 20.0, 1.0, false, DT);
        assert!(out < 0, "expected opposing rudder, got {}", out);
    }

    #[test]
    fn test_yaw_banked_turn_feeds_rudder() {
        let mut c = YawController::new(YawGains::default());
        // 30 deg bank, no yaw rate yet: rudder into the turn
        let out = c.get_servo_out(3000, 15.0, 0.0, 1.0, false, DT);
        assert!(out > 0, "expected pro-turn rudder, got {}", out);
    }

    #[test]
    fn test_yaw_disable_integrator() {
        let mut c = YawController::new(YawGains::default());
        for _ in 0..50 {
            c.get_servo_out(3000, 15.0, 0.0, 1.0, false, DT);
        }
        assert!(c.integrator() > 0.0);
        c.get_servo_out(3000, 15.0, 0.0, 1.0, true, DT);
        assert!(c.integrator() == 0.0);
    }

    // ========== Steering Controller Tests ==========

    #[test]
    fn test_steer_angle_error_sign() {
        let mut c = SteerController::new(SteerGains::default());
        assert!(c.get_steering_out_angle_error(2000, 0.0, DT) > 0);
        c.reset_integrator();
        assert!(c.get_steering_out_angle_error(-2000, 0.0, DT) < 0);
    }

    #[test]
    fn test_steer_rate_matched_is_quiet() {
        let mut c = SteerController::new(SteerGains {
            ki: 0.0,
            ..SteerGains::default()
        });
        assert_eq!(c.get_steering_out_rate(30.0, 30.0, DT), 0);
    }

    #[test]
    fn test_steer_integrator_shared_between_paths() {
        let mut c = SteerController::new(SteerGains::default());
        for _ in 0..50 {
            c.get_steering_out_rate(30.0, 0.0, DT);
        }
        let wound = c.integrator();
        assert!(wound > 0.0);
        // switching to the angle path keeps the accumulated state
        c.get_steering_out_angle_error(0, 0.0, DT);
        assert!(c.integrator() > 0.0, "lock transition must not dump integrator");
    }
}
