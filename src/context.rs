//! Per-tick input snapshots
//!
//! Everything the pipeline reads during a tick arrives here as an immutable
//! snapshot, handed off by the hosting system before the tick begins. The
//! pipeline performs no blocking reads; absent data is an explicit `Option`
//! or availability flag, never an error.

use nalgebra::Vector3;

use crate::mode::{ControlMode, FlightStage};

/// Attitude and body-rate estimate
///
/// Angles in centidegrees, NED convention. Body rates in rad/s.
#[derive(Debug, Clone, Copy)]
pub struct AttitudeSnapshot {
    pub roll_cd: i32,
    pub pitch_cd: i32,
    pub yaw_cd: i32,
    /// Body angular rates (rad/s), x=roll, y=pitch, z=yaw
    pub gyro: Vector3<f32>,
}

impl Default for AttitudeSnapshot {
    fn default() -> Self {
        Self {
            roll_cd: 0,
            pitch_cd: 0,
            yaw_cd: 0,
            gyro: Vector3::zeros(),
        }
    }
}

/// Airspeed, ground speed and height estimates
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedSnapshot {
    /// Airspeed estimate (m/s), `None` when no sensor/estimate is available
    pub airspeed: Option<f32>,
    /// Low-pass filtered airspeed for load-factor limiting (m/s)
    pub smoothed_airspeed: f32,
    /// Barometric climb rate (m/s, positive up)
    pub climb_rate: f32,
    /// Altitude relative to home (m, positive above home)
    pub relative_altitude: f32,
}

/// GPS snapshot consumed by steering and throttle suppression
#[derive(Debug, Clone, Copy, Default)]
pub struct GpsSnapshot {
    /// At least a 2D position fix
    pub has_fix_2d: bool,
    /// Ground speed (m/s)
    pub ground_speed: f32,
}

/// Demands produced by the outer guidance and speed/height controllers
#[derive(Debug, Clone, Copy, Default)]
pub struct NavDemands {
    /// Commanded roll from the navigation controller (centidegrees)
    pub nav_roll_cd: i32,
    /// Commanded pitch from the speed/height controller (centidegrees)
    pub nav_pitch_cd: i32,
    /// Commanded throttle from the speed/height controller (0..100)
    pub throttle_demand: i16,
    /// Bearing error from the navigation controller (centidegrees)
    pub bearing_error_cd: i32,
    /// Target airspeed (cm/s) for the auto flap schedule
    pub target_airspeed_cm: i32,
}

/// Auto-takeoff progress reported by the takeoff logic
#[derive(Debug, Clone, Copy, Default)]
pub struct TakeoffStatus {
    /// Auto takeoff has finished
    pub complete: bool,
    /// Launch detection (speed/accel threshold) fired this tick
    pub launch_detected: bool,
    /// Tail-hold elevator percentage while holding the tail down, 0 = none
    pub tail_hold_elevator: i8,
}

/// Flying-state detection from the external estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct FlyingStatus {
    pub is_flying: bool,
    /// Timestamp when flying was first detected (ms since boot)
    pub started_flying_ms: u32,
}

/// Failsafe flags observed by stick mixing
#[derive(Debug, Clone, Copy, Default)]
pub struct FailsafeFlags {
    /// Any failsafe currently active
    pub active: bool,
    /// RC/throttle failsafe with short action configured to FBWA glide
    pub fbwa_glide: bool,
}

/// Disarmed throttle output policy, applied after all mixing and slewing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArmingRequired {
    /// Leave the throttle channel untouched
    No,
    /// Force zero pulse width
    YesZeroPwm,
    /// Force minimum pulse width (maximum when the channel is reversed)
    #[default]
    YesMinPwm,
}

/// Immutable per-tick context for the whole pipeline
#[derive(Debug, Clone, Copy)]
pub struct TickContext {
    pub mode: ControlMode,
    pub stage: FlightStage,
    pub armed: bool,
    pub arming_required: ArmingRequired,
    /// Recovery parachute has been released
    pub parachute_released: bool,
    /// Inverted-flight request is active
    pub fly_inverted: bool,
    /// Geofence permits stick mixing this tick
    pub geofence_allows_mixing: bool,
    pub failsafe: FailsafeFlags,
    pub attitude: AttitudeSnapshot,
    pub speed: SpeedSnapshot,
    pub gps: GpsSnapshot,
    pub nav: NavDemands,
    pub takeoff: TakeoffStatus,
    pub flying: FlyingStatus,
    /// GUIDED-mode throttle passthrough request
    pub guided_throttle_passthru: bool,
    /// Milliseconds since boot
    pub now_ms: u32,
    /// Tick period (seconds)
    pub dt: f32,
}

impl Default for TickContext {
    fn default() -> Self {
        Self {
            mode: ControlMode::Manual,
            stage: FlightStage::Normal,
            armed: true,
            arming_required: ArmingRequired::default(),
            parachute_released: false,
            fly_inverted: false,
            geofence_allows_mixing: true,
            failsafe: FailsafeFlags::default(),
            attitude: AttitudeSnapshot::default(),
            speed: SpeedSnapshot::default(),
            gps: GpsSnapshot::default(),
            nav: NavDemands::default(),
            takeoff: TakeoffStatus::default(),
            flying: FlyingStatus::default(),
            guided_throttle_passthru: false,
            now_ms: 0,
            dt: 0.02,
        }
    }
}

/// VTOL transition collaborator
///
/// VTOL sub-mode ticks delegate entirely to this interface; the core
/// performs no computation for those ticks beyond invoking it.
pub trait VtolInterface {
    /// Run the VTOL attitude controller for this tick
    fn control_run(&mut self);

    /// Per-tick transition bookkeeping, called from servo output assembly
    fn update(&mut self);

    /// VTOL motors are producing lift
    fn is_flying(&self) -> bool;

    /// An AUTO mission item is currently flown as VTOL
    fn in_vtol_auto(&self) -> bool;
}

/// Null VTOL collaborator for pure fixed-wing airframes
#[derive(Debug, Default)]
pub struct NoVtol;

impl VtolInterface for NoVtol {
    fn control_run(&mut self) {}
    fn update(&mut self) {}
    fn is_flying(&self) -> bool {
        false
    }
    fn in_vtol_auto(&self) -> bool {
        false
    }
}
