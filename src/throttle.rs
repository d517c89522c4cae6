//! Throttle suppression safety gate and throttle slew limiting
//!
//! The suppression machine keeps the motor from spinning up while the
//! aircraft sits on the ground in an autonomous-throttle mode, without
//! blocking a legitimate takeoff. It is sticky in one direction: once
//! cleared during a flight it stays cleared, and only a parachute release
//! re-asserts it.

use crate::channel::ControlChannel;
use crate::context::TickContext;
use crate::mode::ControlMode;

/// Why the throttle was enabled, reported for observability
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThrottleEnableReason {
    /// Altitude above home cleared the threshold
    Altitude { altitude: f32 },
    /// GPS (and airspeed, when present) confirmed forward motion
    Speed {
        ground_speed: f32,
        airspeed: Option<f32>,
    },
    /// The VTOL collaborator reports active flight
    VtolFlying,
    /// Auto takeoff re-entered while already airborne (mission restart)
    AlreadyFlying { altitude: f32 },
}

impl ThrottleEnableReason {
    /// Static reason name (usable with defmt on embedded)
    pub fn as_str(&self) -> &'static str {
        match self {
            ThrottleEnableReason::Altitude { .. } => "Altitude",
            ThrottleEnableReason::Speed { .. } => "Speed",
            ThrottleEnableReason::VtolFlying => "VTOL",
            ThrottleEnableReason::AlreadyFlying { .. } => "AlreadyFlying",
        }
    }
}

/// Persistent throttle suppression state machine
#[derive(Debug, Clone, Copy)]
pub struct ThrottleSuppression {
    suppressed: bool,
}

impl Default for ThrottleSuppression {
    fn default() -> Self {
        // suppressed until a clearing condition is met
        Self { suppressed: true }
    }
}

impl ThrottleSuppression {
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Evaluate the machine for this tick
    ///
    /// Returns whether throttle output must be zeroed downstream, and the
    /// enable event when suppression was cleared this tick.
    ///
    /// `takeoff_throttle_delay` is in 0.1 s units; the launch-duration
    /// boundary is `delay * 100 ms + 2000 ms`, floored at 5000 ms. The
    /// formula is carried over verbatim from flight-proven tuning and
    /// should be validated against the airframe's launch profile.
    pub fn update(
        &mut self,
        ctx: &TickContext,
        auto_fbw_steer: bool,
        takeoff_throttle_delay: i16,
        vtol_flying: bool,
        baro_takeoff_alt: &mut f32,
    ) -> (bool, Option<ThrottleEnableReason>) {
        if ctx.mode.auto_throttle() && ctx.parachute_released {
            // suppressed for the rest of the flight
            self.suppressed = true;
            return (true, None);
        }

        if !self.suppressed {
            // a clearing condition was met earlier in this flight
            return (false, None);
        }

        if !ctx.mode.auto_throttle() {
            // the pilot controls the throttle
            self.suppressed = false;
            return (false, None);
        }

        if ctx.mode == ControlMode::Auto && auto_fbw_steer {
            // pilot has throttle control in this configuration
            return (false, None);
        }

        let gps_movement = ctx.gps.has_fix_2d && ctx.gps.ground_speed >= 5.0;

        if ctx.mode == ControlMode::Auto && !ctx.takeoff.complete {
            let launch_duration_ms =
                ((takeoff_throttle_delay as i32 * 100 + 2000).max(5000)) as u32;
            if ctx.flying.is_flying
                && ctx.now_ms.wrapping_sub(ctx.flying.started_flying_ms) > launch_duration_ms
                && ctx.speed.relative_altitude > 5.0
                && ctx.attitude.pitch_cd.abs() < 3000
                && gps_movement
            {
                // already flying: a restarted mission put us back in the
                // takeoff item while airborne below the takeoff altitude
                self.suppressed = false;
                return (
                    false,
                    Some(ThrottleEnableReason::AlreadyFlying {
                        altitude: ctx.speed.relative_altitude,
                    }),
                );
            }
            if ctx.takeoff.launch_detected {
                self.suppressed = false;
                *baro_takeoff_alt = ctx.speed.relative_altitude;
                return (false, None);
            }
            return (true, None);
        }

        if ctx.speed.relative_altitude.abs() >= 10.0 {
            self.suppressed = false;
            return (
                false,
                Some(ThrottleEnableReason::Altitude {
                    altitude: ctx.speed.relative_altitude,
                }),
            );
        }

        if gps_movement {
            // with an airspeed sensor require it to agree, so spiky GPS
            // ground speed with bad reception cannot throttle up
            let airspeed_ok = match ctx.speed.airspeed {
                Some(aspeed) => aspeed >= 5.0,
                None => true,
            };
            if airspeed_ok {
                self.suppressed = false;
                return (
                    false,
                    Some(ThrottleEnableReason::Speed {
                        ground_speed: ctx.gps.ground_speed,
                        airspeed: ctx.speed.airspeed,
                    }),
                );
            }
        }

        if vtol_flying {
            self.suppressed = false;
            return (false, Some(ThrottleEnableReason::VtolFlying));
        }

        (true, None)
    }
}

/// Throttle demand from the speed/height controller
///
/// A cruise throttle of 1 percent or less means the mission asked for the
/// engine off (e.g. parachute landing); the demand is forced to zero.
pub fn calc_throttle(ctx: &TickContext, throttle_cruise: i16, channel: &mut ControlChannel) {
    if throttle_cruise <= 1 {
        channel.servo_out = 0;
        return;
    }
    channel.servo_out = ctx.nav.throttle_demand;
}

/// Minimum throttle pulse width, accounting for channel reversal
pub fn throttle_min(channel: &ControlChannel) -> u16 {
    if channel.reversed {
        channel.radio_max
    } else {
        channel.radio_min
    }
}

/// Bound the throttle PWM change per tick
///
/// `slewrate` is percent of full travel per second; zero disables limiting.
/// At least one PWM unit of change per tick is always allowed so the output
/// can make progress at any configured rate.
pub fn throttle_slew_limit(
    channel: &mut ControlChannel,
    last_throttle_pwm: u16,
    slewrate: u8,
    dt: f32,
) {
    if slewrate == 0 {
        return;
    }
    let travel = (channel.radio_max as f32 - channel.radio_min as f32).abs();
    let mut step = slewrate as f32 * dt * 0.01 * travel;
    if step < 1.0 {
        step = 1.0;
    }
    let lo = last_throttle_pwm as f32 - step;
    let hi = last_throttle_pwm as f32 + step;
    let out = (channel.radio_out as f32).clamp(lo, hi);
    channel.radio_out = out as u16;
}
