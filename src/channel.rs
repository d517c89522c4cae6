//! RC/servo channel state and PWM conversion
//!
//! A [`ControlChannel`] carries one actuator axis through the tick: pilot
//! stick (`control_in`), post-control-law demand (`servo_out`) and the final
//! pulse width (`radio_out`). The pipeline owns all channels exclusively for
//! the duration of a tick; exactly one stage writes each field.
//!
//! Angle channels span -4500..+4500 centidegrees, range channels (throttle)
//! span 0..100 percent. Calibration follows the usual 1000/1500/2000 us
//! servo convention with asymmetric min/trim/max interpolation.

use crate::SERVO_MAX_CD;

/// How `servo_out` maps onto the pulse width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Symmetric around trim, -4500..+4500
    Angle,
    /// One-sided from min, 0..100
    Range,
}

/// One control channel (roll, pitch, throttle or rudder)
#[derive(Debug, Clone, Copy)]
pub struct ControlChannel {
    /// Pilot input after capture-path normalization
    /// (angle: -4500..4500 centidegrees, range: 0..100 percent)
    pub control_in: i16,
    /// Control-law output demand, same units as `control_in`
    pub servo_out: i16,
    /// Raw received pulse width (us)
    pub radio_in: u16,
    /// Output pulse width (us), written by `calc_pwm` or passthrough
    pub radio_out: u16,
    /// Calibrated minimum pulse width (us)
    pub radio_min: u16,
    /// Calibrated trim/neutral pulse width (us)
    pub radio_trim: u16,
    /// Calibrated maximum pulse width (us)
    pub radio_max: u16,
    /// Servo direction reversal
    pub reversed: bool,
    /// Stick dead zone around trim (us)
    pub dead_zone: u16,
    kind: ChannelKind,
}

impl ControlChannel {
    /// Create an angle channel with default 1000/1500/2000 calibration
    pub fn angle() -> Self {
        Self {
            control_in: 0,
            servo_out: 0,
            radio_in: 1500,
            radio_out: 1500,
            radio_min: 1000,
            radio_trim: 1500,
            radio_max: 2000,
            reversed: false,
            dead_zone: 30,
            kind: ChannelKind::Angle,
        }
    }

    /// Create a range channel (throttle) with default calibration
    pub fn range() -> Self {
        Self {
            control_in: 0,
            servo_out: 0,
            radio_in: 1000,
            radio_out: 1000,
            radio_min: 1000,
            radio_trim: 1000,
            radio_max: 2000,
            reversed: false,
            dead_zone: 30,
            kind: ChannelKind::Range,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Compute `radio_out` from `servo_out`
    ///
    /// Angle channels interpolate asymmetrically between min/trim/max so an
    /// off-center trim keeps full deflection on both sides. Range channels
    /// interpolate min..max over 0..100, from max downward when reversed.
    pub fn calc_pwm(&mut self) {
        match self.kind {
            ChannelKind::Angle => {
                let servo = if self.reversed {
                    -(self.servo_out as i32)
                } else {
                    self.servo_out as i32
                };
                let servo = servo.clamp(-(SERVO_MAX_CD as i32), SERVO_MAX_CD as i32);
                let pwm = if servo >= 0 {
                    self.radio_trim as i32
                        + servo * (self.radio_max as i32 - self.radio_trim as i32)
                            / SERVO_MAX_CD as i32
                } else {
                    self.radio_trim as i32
                        + servo * (self.radio_trim as i32 - self.radio_min as i32)
                            / SERVO_MAX_CD as i32
                };
                self.radio_out = pwm.clamp(self.radio_min as i32, self.radio_max as i32) as u16;
            }
            ChannelKind::Range => {
                let servo = (self.servo_out as i32).clamp(0, 100);
                let span = self.radio_max as i32 - self.radio_min as i32;
                let pwm = if self.reversed {
                    self.radio_max as i32 - servo * span / 100
                } else {
                    self.radio_min as i32 + servo * span / 100
                };
                self.radio_out = pwm as u16;
            }
        }
    }

    /// Convert `radio_in` to a centidegree angle using the channel dead zone
    pub fn pwm_to_angle(&self) -> i16 {
        self.pwm_to_angle_dz(self.dead_zone)
    }

    /// Convert `radio_in` to a centidegree angle with an explicit dead zone
    ///
    /// A zero dead zone is used when slaving a second channel to this one,
    /// so the follower tracks exactly instead of flat-lining near trim.
    pub fn pwm_to_angle_dz(&self, dead_zone: u16) -> i16 {
        let radio = self.radio_in as i32;
        let trim = self.radio_trim as i32;
        let dz = dead_zone as i32;

        let angle = if radio > trim + dz {
            let span = self.radio_max as i32 - (trim + dz);
            if span <= 0 {
                0
            } else {
                SERVO_MAX_CD as i32 * (radio - (trim + dz)) / span
            }
        } else if radio < trim - dz {
            let span = (trim - dz) - self.radio_min as i32;
            if span <= 0 {
                0
            } else {
                SERVO_MAX_CD as i32 * (radio - (trim - dz)) / span
            }
        } else {
            0
        };

        let angle = if self.reversed { -angle } else { angle };
        angle.clamp(-(SERVO_MAX_CD as i32), SERVO_MAX_CD as i32) as i16
    }

    /// Normalized dead-zone-trimmed input, -1.0..1.0
    pub fn norm_input_dz(&self) -> f32 {
        self.pwm_to_angle() as f32 / SERVO_MAX_CD as f32
    }

    /// `radio_in` as a percentage of channel travel, 0..100
    pub fn percent_input(&self) -> i8 {
        let span = self.radio_max as i32 - self.radio_min as i32;
        if span <= 0 {
            return 0;
        }
        let pct = (self.radio_in as i32 - self.radio_min as i32) * 100 / span;
        let pct = if self.reversed { 100 - pct } else { pct };
        pct.clamp(0, 100) as i8
    }
}

/// The four primary channels, owned by the pipeline during a tick
#[derive(Debug, Clone, Copy)]
pub struct Channels {
    pub roll: ControlChannel,
    pub pitch: ControlChannel,
    pub throttle: ControlChannel,
    pub rudder: ControlChannel,
}

impl Channels {
    pub fn new() -> Self {
        Self {
            roll: ControlChannel::angle(),
            pitch: ControlChannel::angle(),
            throttle: ControlChannel::range(),
            rudder: ControlChannel::angle(),
        }
    }
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}
