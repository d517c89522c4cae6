//! Top-level attitude control driver
//!
//! [`AttitudeControl`] owns every persistent piece of pipeline state and
//! runs the fixed per-tick sequence: navigation demand clamping, mode
//! dispatch into the stabilizers, the yaw state machine, throttle
//! suppression and finally servo output assembly. The hosting firmware
//! updates the radio channels and builds a [`TickContext`] before each call.

use crate::channel::Channels;
use crate::context::{ArmingRequired, TickContext, VtolInterface};
use crate::load_factor::update_load_factor;
use crate::mixer::{
    auto_flap_schedule, channel_output_mixer, dspoiler_split, elevon_mix, elevon_pwm,
    flap_slew_limit, flaperon_update, throttle_limits, MixGeometry, MixingConfig,
};
use crate::mode::ControlMode;
use crate::params::ControlParams;
use crate::pid::{AxisController, SteerController, YawController};
use crate::speed_scaler::get_speed_scaler;
use crate::stabilize::{
    integrator_zero_flags, stabilize_acro, stabilize_pitch, stabilize_roll, stabilize_training,
    training_update, AcroLockState,
};
use crate::steering::{stabilize_yaw, SteerState, SteeringControl};
use crate::stick_mixing::{stabilize_stick_mixing_direct, stabilize_stick_mixing_fbw, StickMixing};
use crate::throttle::{
    calc_throttle, throttle_min, throttle_slew_limit, ThrottleEnableReason, ThrottleSuppression,
};

/// An auxiliary output demand, in the scale its function expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxValue {
    /// Centidegree surface demand
    Angle(i16),
    /// Raw pulse width (us)
    Pwm(u16),
}

/// Auxiliary function outputs produced by servo assembly
///
/// `None` means the function was not driven this tick; the hosting system
/// routes each value to whatever output channel carries that function.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuxOutputs {
    /// Secondary aileron (centidegrees)
    pub aileron: Option<i16>,
    /// Secondary elevator (centidegrees)
    pub elevator: Option<i16>,
    /// Rudder function output (centidegrees)
    pub rudder: i16,
    /// Ground-steering wheel output (centidegrees)
    pub steering: i16,
    /// Slew-limited automatic flap (percent)
    pub flap_auto: i8,
    /// Slew-limited manual flap (percent)
    pub flap_manual: i8,
    /// Flaperon pair (PWM), when flaperons are configured
    pub flaperons: Option<(u16, u16)>,
    pub dspoiler1: Option<AuxValue>,
    pub dspoiler2: Option<AuxValue>,
}

/// Result of servo output assembly for one tick
#[derive(Debug, Clone, Copy, Default)]
pub struct ServoOutput {
    pub aux: AuxOutputs,
    /// Set on the tick throttle suppression is cleared
    pub throttle_event: Option<ThrottleEnableReason>,
}

/// Persistent pipeline state and the per-tick driver
pub struct AttitudeControl {
    params: ControlParams,
    mixing: MixingConfig,
    pub channels: Channels,
    roll_controller: AxisController,
    pitch_controller: AxisController,
    yaw_controller: YawController,
    steer_controller: SteerController,
    acro_lock: AcroLockState,
    steer_state: SteerState,
    steering_control: SteeringControl,
    suppression: ThrottleSuppression,
    /// Highest airspeed seen this flight, for the scaler statistic
    highest_airspeed: f32,
    /// Altitude recorded at launch detection
    baro_takeoff_alt: f32,
    last_auto_flap: i8,
    last_manual_flap: i8,
    nav_roll_cd: i32,
    nav_pitch_cd: i32,
    /// Working roll limit, narrowed by the load-factor limiter each tick
    roll_limit_cd: i32,
    aerodynamic_load_factor: f32,
}

impl AttitudeControl {
    pub fn new(params: ControlParams) -> Self {
        let mixing = params.mixing_config();
        let roll_limit_cd = params.roll_limit_cd;
        Self {
            roll_controller: AxisController::new(params.gains.roll),
            pitch_controller: AxisController::new(params.gains.pitch),
            yaw_controller: YawController::new(params.gains.yaw),
            steer_controller: SteerController::new(params.gains.steer),
            mixing,
            channels: Channels::new(),
            acro_lock: AcroLockState::default(),
            steer_state: SteerState::default(),
            steering_control: SteeringControl::default(),
            suppression: ThrottleSuppression::default(),
            highest_airspeed: 0.0,
            baro_takeoff_alt: 0.0,
            last_auto_flap: 0,
            last_manual_flap: 0,
            nav_roll_cd: 0,
            nav_pitch_cd: 0,
            roll_limit_cd,
            aerodynamic_load_factor: 1.0,
            params,
        }
    }

    pub fn params(&self) -> &ControlParams {
        &self.params
    }

    /// Airframe output configuration, for host-side adjustments (elevon
    /// trims, assigned aux functions) that have no parameter entries
    pub fn mixing_mut(&mut self) -> &mut MixingConfig {
        &mut self.mixing
    }

    pub fn nav_roll_cd(&self) -> i32 {
        self.nav_roll_cd
    }

    pub fn nav_pitch_cd(&self) -> i32 {
        self.nav_pitch_cd
    }

    pub fn aerodynamic_load_factor(&self) -> f32 {
        self.aerodynamic_load_factor
    }

    pub fn is_throttle_suppressed(&self) -> bool {
        self.suppression.is_suppressed()
    }

    /// Commanded hold course for the ground-steering machine, `None` to
    /// steer on the navigation bearing error
    pub fn set_hold_course(&mut self, course_cd: Option<i32>) {
        self.steer_state.hold_course_cd = course_cd.unwrap_or(-1);
    }

    /// Speed scaler for this tick, updating the highest-airspeed statistic
    pub fn speed_scaler(&mut self, ctx: &TickContext) -> f32 {
        get_speed_scaler(
            ctx.speed.airspeed,
            self.channels.throttle.servo_out,
            self.params.scaling_speed,
            self.params.throttle_cruise,
            &mut self.highest_airspeed,
        )
    }

    /// Roll demand from navigation, limited by the load-factor limiter
    pub fn calc_nav_roll(&mut self, ctx: &TickContext) {
        self.nav_roll_cd = ctx.nav.nav_roll_cd;
        self.roll_limit_cd = self.params.roll_limit_cd;
        self.aerodynamic_load_factor = update_load_factor(
            &mut self.nav_roll_cd,
            &mut self.roll_limit_cd,
            ctx.speed.smoothed_airspeed,
            self.params.airspeed_min,
            self.params.stall_prevention,
            ctx.fly_inverted,
        );
        self.nav_roll_cd = self.nav_roll_cd.clamp(-self.roll_limit_cd, self.roll_limit_cd);
    }

    /// Pitch demand from the speed/height controller
    pub fn calc_nav_pitch(&mut self, ctx: &TickContext) {
        self.nav_pitch_cd = ctx.nav.nav_pitch_cd.clamp(
            self.params.pitch_limit_min_cd,
            self.params.pitch_limit_max_cd,
        );
    }

    /// Pitch down at reduced throttle so airspeed holds through a descent
    pub fn adjust_nav_pitch_throttle(&mut self, ctx: &TickContext) {
        let throttle = self.channels.throttle.servo_out;
        if throttle < self.params.throttle_cruise && ctx.stage != crate::mode::FlightStage::Vtol {
            let p = (self.params.throttle_cruise - throttle) as f32
                / self.params.throttle_cruise as f32;
            self.nav_pitch_cd -= (self.params.stab_pitch_down_deg * 100.0 * p) as i32;
        }
    }

    /// Throttle demand from the speed/height controller
    pub fn calc_throttle(&mut self, ctx: &TickContext) {
        calc_throttle(ctx, self.params.throttle_cruise, &mut self.channels.throttle);
    }

    /// Mode dispatch into the stabilizers, then integrator housekeeping
    pub fn stabilize(&mut self, ctx: &TickContext, vtol: &mut dyn VtolInterface) {
        if ctx.mode == ControlMode::Manual {
            return;
        }
        let speed_scaler = self.speed_scaler(ctx);

        match ctx.mode {
            ControlMode::Training => {
                let ts = training_update(
                    ctx,
                    self.params.roll_limit_cd,
                    self.params.pitch_limit_max_cd,
                    self.params.pitch_limit_min_cd,
                );
                stabilize_training(
                    ctx,
                    &ts,
                    self.params.pitch_trim_cd,
                    self.params.kff_throttle_to_pitch,
                    speed_scaler,
                    &mut self.roll_controller,
                    &mut self.pitch_controller,
                    &mut self.channels,
                );
                self.run_yaw(ctx, speed_scaler);
            }
            ControlMode::Acro => {
                let acro = self.params.acro_config();
                stabilize_acro(
                    ctx,
                    &acro,
                    speed_scaler,
                    &mut self.acro_lock,
                    &mut self.roll_controller,
                    &mut self.pitch_controller,
                    &mut self.nav_roll_cd,
                    &mut self.nav_pitch_cd,
                    &mut self.steering_control,
                    &mut self.channels,
                );
            }
            m if m.is_vtol() => {
                vtol.control_run();
            }
            _ => {
                if self.params.stick_mixing == StickMixing::Fbw {
                    stabilize_stick_mixing_fbw(
                        ctx,
                        self.params.stick_mixing,
                        self.params.auto_fbw_steer,
                        &self.channels,
                        &mut self.nav_roll_cd,
                        &mut self.nav_pitch_cd,
                        self.roll_limit_cd,
                        self.params.pitch_limit_max_cd,
                        self.params.pitch_limit_min_cd,
                    );
                }
                stabilize_roll(
                    ctx,
                    self.nav_roll_cd,
                    speed_scaler,
                    &mut self.roll_controller,
                    &mut self.channels,
                );
                stabilize_pitch(
                    ctx,
                    self.nav_pitch_cd,
                    self.params.pitch_trim_cd,
                    self.params.kff_throttle_to_pitch,
                    speed_scaler,
                    &mut self.pitch_controller,
                    &mut self.channels,
                );
                if self.params.stick_mixing == StickMixing::Direct {
                    stabilize_stick_mixing_direct(ctx, self.params.stick_mixing, &mut self.channels);
                }
                self.run_yaw(ctx, speed_scaler);
            }
        }

        let (zero_attitude, zero_steering) = integrator_zero_flags(ctx, &self.channels);
        if zero_attitude {
            self.roll_controller.reset_integrator();
            self.pitch_controller.reset_integrator();
            self.yaw_controller.reset_integrator();
            if zero_steering {
                self.steer_controller.reset_integrator();
            }
        }
    }

    fn run_yaw(&mut self, ctx: &TickContext, speed_scaler: f32) {
        let yaw_params = self.params.yaw_params();
        stabilize_yaw(
            ctx,
            &yaw_params,
            &self.channels,
            speed_scaler,
            &mut self.steer_state,
            &mut self.steering_control,
            &mut self.steer_controller,
            &mut self.yaw_controller,
        );
    }

    /// Assemble and mix the final per-channel outputs
    ///
    /// `manual_flap_percent` is the pilot's flap input channel, read by the
    /// host; it is ignored while a failsafe is active.
    pub fn set_servos(
        &mut self,
        ctx: &TickContext,
        manual_flap_percent: i8,
        vtol: &mut dyn VtolInterface,
    ) -> ServoOutput {
        let mut out = ServoOutput::default();
        let last_throttle = self.channels.throttle.radio_out;

        vtol.update();

        // resolve the steering/rudder pair decided by the yaw machine
        if !self.steering_control.ground_steering {
            // above the steering altitude: keep the nose wheel on the
            // rudder in case the barometer drifted
            self.steering_control.steering = self.steering_control.rudder;
        } else if !self.mixing.has_steering_wheel {
            self.steering_control.rudder = self.steering_control.steering;
        }
        self.channels.rudder.servo_out = self.steering_control.rudder;

        // cleared so a tick without the yaw stabilizer falls back to manual
        self.steering_control.ground_steering = false;

        out.aux.rudder = self.steering_control.rudder;
        out.aux.steering = self.steering_control.steering;

        if ctx.mode == ControlMode::Manual {
            if self.mixing.elevon_mix_mode && self.mixing.elevon_output == MixGeometry::Disabled {
                // legacy elevon airframe: mix the raw sticks
                let (ch1, ch2) =
                    elevon_mix(&self.mixing, self.channels.roll.control_in, self.channels.pitch.control_in);
                self.channels.roll.radio_out =
                    elevon_pwm(ch1, self.mixing.elevon_trim1, self.mixing.reverse_ch1_elevon);
                self.channels.pitch.radio_out =
                    elevon_pwm(ch2, self.mixing.elevon_trim2, self.mixing.reverse_ch2_elevon);
            } else {
                self.channels.roll.radio_out = self.channels.roll.radio_in;
                self.channels.pitch.radio_out = self.channels.pitch.radio_in;
            }
            self.channels.throttle.radio_out = self.channels.throttle.radio_in;
            self.channels.rudder.radio_out = self.channels.rudder.radio_in;

            // secondary surfaces follow the main input without the main
            // channel's dead zone, so they track the first surface exactly
            out.aux.aileron = Some(self.channels.roll.pwm_to_angle_dz(0));
            out.aux.elevator = Some(self.channels.pitch.pwm_to_angle_dz(0));

            if !self.mixing.elevon_mix_mode && self.mixing.elevon_output == MixGeometry::Disabled {
                out.aux.dspoiler1 = Some(AuxValue::Pwm(self.channels.roll.radio_out));
                out.aux.dspoiler2 = Some(AuxValue::Pwm(self.channels.pitch.radio_out));
            }
        } else {
            if self.mixing.elevon_mix_mode {
                let (mut ch1, mut ch2) = elevon_mix(
                    &self.mixing,
                    self.channels.roll.servo_out,
                    self.channels.pitch.servo_out,
                );
                if self.mixing.has_dspoilers {
                    let (a, b, s1, s2) = dspoiler_split(
                        self.mixing.reverse_elevons,
                        self.channels.rudder.servo_out,
                        ch1,
                        ch2,
                    );
                    ch1 = a;
                    ch2 = b;
                    out.aux.dspoiler1 = Some(AuxValue::Angle(s1 as i16));
                    out.aux.dspoiler2 = Some(AuxValue::Angle(s2 as i16));
                }
                self.channels.roll.radio_out =
                    elevon_pwm(ch1, self.mixing.elevon_trim1, self.mixing.reverse_ch1_elevon);
                self.channels.pitch.radio_out =
                    elevon_pwm(ch2, self.mixing.elevon_trim2, self.mixing.reverse_ch2_elevon);
            } else {
                out.aux.aileron = Some(self.channels.roll.servo_out);
                out.aux.elevator = Some(self.channels.pitch.servo_out);
                self.channels.roll.calc_pwm();
                self.channels.pitch.calc_pwm();
            }
            self.channels.rudder.calc_pwm();

            let (min_throttle, max_throttle) = throttle_limits(ctx, &self.mixing);
            self.channels.throttle.servo_out = self
                .channels
                .throttle
                .servo_out
                .clamp(min_throttle, max_throttle);

            if !ctx.armed {
                self.channels.throttle.servo_out = 0;
                self.channels.throttle.calc_pwm();
            } else {
                let (suppress, event) = self.suppression.update(
                    ctx,
                    self.params.auto_fbw_steer,
                    self.params.takeoff_throttle_delay,
                    vtol.is_flying(),
                    &mut self.baro_takeoff_alt,
                );
                out.throttle_event = event;

                if suppress {
                    self.channels.throttle.servo_out = 0;
                    if self.mixing.throttle_suppress_manual {
                        // manual passthrough while suppressed
                        self.channels.throttle.radio_out = self.channels.throttle.radio_in;
                    } else {
                        self.channels.throttle.calc_pwm();
                    }
                } else if self.mixing.throttle_passthru_stabilize
                    && matches!(
                        ctx.mode,
                        ControlMode::Stabilize
                            | ControlMode::Training
                            | ControlMode::Acro
                            | ControlMode::FlyByWireA
                            | ControlMode::Autotune
                    )
                {
                    self.channels.throttle.radio_out = self.channels.throttle.radio_in;
                } else if ctx.mode == ControlMode::Guided && ctx.guided_throttle_passthru {
                    self.channels.throttle.radio_out = self.channels.throttle.radio_in;
                } else if ctx.mode.is_vtol() || vtol.in_vtol_auto() {
                    // no forward throttle while hovering
                    self.channels.throttle.servo_out = 0;
                    self.channels.throttle.calc_pwm();
                } else {
                    self.channels.throttle.calc_pwm();
                }
            }
        }

        // flap deployment
        let manual_flap = if ctx.failsafe.active {
            0
        } else {
            manual_flap_percent
        };
        let mut auto_flap = auto_flap_schedule(ctx, &self.mixing);
        if manual_flap.abs() > auto_flap {
            auto_flap = manual_flap;
        }
        out.aux.flap_auto =
            flap_slew_limit(&mut self.last_auto_flap, auto_flap, self.mixing.flap_slewrate, ctx.dt);
        out.aux.flap_manual = flap_slew_limit(
            &mut self.last_manual_flap,
            manual_flap,
            self.mixing.flap_slewrate,
            ctx.dt,
        );

        if ctx.mode.throttle_slew_limited() {
            let slewrate = if ctx.mode == ControlMode::Auto
                && !ctx.takeoff.complete
                && self.mixing.takeoff_throttle_slewrate != 0
            {
                self.mixing.takeoff_throttle_slewrate
            } else {
                self.mixing.throttle_slewrate
            };
            throttle_slew_limit(&mut self.channels.throttle, last_throttle, slewrate, ctx.dt);
        }

        if ctx.mode == ControlMode::Training {
            // pilot keeps the rudder in training mode
            self.channels.rudder.radio_out = self.channels.rudder.radio_in;
        }

        if self.mixing.flaperon_output != MixGeometry::Disabled
            && self.mixing.elevon_output == MixGeometry::Disabled
            && !self.mixing.elevon_mix_mode
        {
            out.aux.flaperons = flaperon_update(
                &self.mixing,
                self.channels.roll.radio_out,
                self.channels.roll.radio_trim,
                out.aux.flap_auto,
            );
        }
        if self.mixing.vtail_output != MixGeometry::Disabled {
            let pitch_trim = self.channels.pitch.radio_trim;
            let rudder_trim = self.channels.rudder.radio_trim;
            channel_output_mixer(
                self.mixing.vtail_output,
                &mut self.channels.pitch.radio_out,
                &mut self.channels.rudder.radio_out,
                pitch_trim,
                rudder_trim,
                self.mixing.mixing_gain,
            );
        } else if self.mixing.elevon_output != MixGeometry::Disabled {
            let pitch_trim = self.channels.pitch.radio_trim;
            let roll_trim = self.channels.roll.radio_trim;
            channel_output_mixer(
                self.mixing.elevon_output,
                &mut self.channels.pitch.radio_out,
                &mut self.channels.roll.radio_out,
                pitch_trim,
                roll_trim,
                self.mixing.mixing_gain,
            );
        }

        // disarmed override goes last so nothing upstream can re-arm the
        // throttle output
        if !ctx.armed {
            match ctx.arming_required {
                ArmingRequired::No => {}
                ArmingRequired::YesZeroPwm => self.channels.throttle.radio_out = 0,
                ArmingRequired::YesMinPwm => {
                    self.channels.throttle.radio_out = throttle_min(&self.channels.throttle)
                }
            }
        }

        out
    }

    /// One full control tick in the fixed pipeline order
    pub fn tick(
        &mut self,
        ctx: &TickContext,
        manual_flap_percent: i8,
        vtol: &mut dyn VtolInterface,
    ) -> ServoOutput {
        self.calc_nav_roll(ctx);
        self.calc_nav_pitch(ctx);
        if ctx.mode.auto_throttle() {
            self.calc_throttle(ctx);
            self.adjust_nav_pitch_throttle(ctx);
        }
        self.stabilize(ctx, vtol);
        self.set_servos(ctx, manual_flap_percent, vtol)
    }

    #[cfg(test)]
    pub(crate) fn integrators(&self) -> (f32, f32, f32, f32) {
        (
            self.roll_controller.integrator(),
            self.pitch_controller.integrator(),
            self.yaw_controller.integrator(),
            self.steer_controller.integrator(),
        )
    }
}
