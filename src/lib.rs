//! pico_plane_core - Pure no_std fixed-wing attitude control for the pico autopilot family
//!
//! This crate contains the per-tick attitude/steering/throttle pipeline that
//! turns navigation demands and pilot stick input into actuator commands.
//! It is platform-agnostic and testable on host without any feature flags.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives allowed
//! - **Pure no_std**: No std library dependencies
//! - **Snapshot inputs**: Estimation, navigation and pilot input arrive as
//!   immutable per-tick snapshots; the pipeline never blocks
//! - **Single writer**: Every persistent state struct is mutated by exactly
//!   one pipeline stage per tick
//!
//! # Pipeline
//!
//! Per control tick, in fixed order:
//!
//! 1. [`speed_scaler`]: airspeed-dependent PID gain multiplier
//! 2. [`load_factor`]: stall-prevention roll demand limiting
//! 3. [`stabilize`]: mode dispatch into manual/training/acro/autonomous paths
//! 4. [`steering`]: ground-steering / course-hold / coordinated yaw
//! 5. [`throttle`]: throttle suppression safety gate and slew limiting
//! 6. [`mixer`]: elevon/V-tail/flaperon geometry, flap schedule, PWM output
//!
//! # Modules
//!
//! - [`mode`]: Control mode and flight stage enums
//! - [`channel`]: RC/servo channel state and PWM conversion
//! - [`context`]: Per-tick input snapshots and the VTOL delegation trait
//! - [`pid`]: Integrator-bearing axis, yaw and steering controllers
//! - [`params`]: Parameter store and typed control parameters
//! - [`controller`]: Top-level [`controller::AttitudeControl`] driver

#![no_std]

pub mod channel;
pub mod context;
pub mod controller;
pub mod load_factor;
pub mod mixer;
pub mod mode;
pub mod params;
pub mod pid;
pub mod speed_scaler;
pub mod stabilize;
pub mod steering;
pub mod stick_mixing;
pub mod throttle;

/// Full control-surface deflection in centidegrees (stick and servo range).
pub const SERVO_MAX_CD: i16 = 4500;
