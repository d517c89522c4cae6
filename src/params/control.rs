//! Attitude-control parameter definitions
//!
//! Maps every control tunable onto the parameter store under conventional
//! autopilot parameter names. `register_defaults`
//! seeds the store; `from_store` reads a validated snapshot back out,
//! clamping each value into its safe range.

use crate::mixer::{MixGeometry, MixingConfig};
use crate::pid::{AxisGains, SteerGains, YawGains};
use crate::stabilize::AcroConfig;
use crate::steering::YawParams;
use crate::stick_mixing::StickMixing;

use super::store::{ParamFlags, ParamValue, ParameterError, ParameterStore};

// --- Defaults ---

const DEFAULT_SCALING_SPEED: f32 = 15.0;
const DEFAULT_TRIM_THROTTLE: i32 = 45;
const DEFAULT_AIRSPEED_MIN: f32 = 9.0;
const DEFAULT_KFF_THR2PTCH: f32 = 0.0;
const DEFAULT_KFF_RDDRMIX: f32 = 0.5;
const DEFAULT_TRIM_PITCH_CD: i32 = 0;
const DEFAULT_STAB_PITCH_DOWN: f32 = 2.0;
const DEFAULT_ACRO_RATE: f32 = 180.0;
const DEFAULT_GROUND_STEER_DPS: f32 = 90.0;
const DEFAULT_TKOFF_THR_DELAY: i32 = 2;
const DEFAULT_THR_SLEWRATE: i32 = 100;
const DEFAULT_FLAP_SLEWRATE: i32 = 75;
const DEFAULT_THR_MAX: i32 = 100;
const DEFAULT_LIM_ROLL_CD: i32 = 4500;
const DEFAULT_LIM_PITCH_MAX: i32 = 2000;
const DEFAULT_LIM_PITCH_MIN: i32 = -2500;
const DEFAULT_MIXING_GAIN: f32 = 0.5;

// --- Ranges ---

const MIN_SCALING_SPEED: f32 = 1.0;
const MAX_SCALING_SPEED: f32 = 50.0;
const MIN_AIRSPEED: f32 = 5.0;
const MAX_AIRSPEED: f32 = 100.0;
const MIN_ACRO_RATE: f32 = 10.0;
const MAX_ACRO_RATE: f32 = 500.0;
const MIN_LIMIT_CD: i32 = 0;
const MAX_LIMIT_CD: i32 = 9000;
const MIN_MIXING_GAIN: f32 = 0.5;
const MAX_MIXING_GAIN: f32 = 1.2;

/// Gain sets for all four controllers
#[derive(Debug, Clone, Copy, Default)]
pub struct AttitudeGains {
    pub roll: AxisGains,
    pub pitch: AxisGains,
    pub yaw: YawGains,
    pub steer: SteerGains,
}

/// Attitude-control parameters loaded from the parameter store
#[derive(Debug, Clone)]
pub struct ControlParams {
    /// Reference airspeed for surface-effectiveness scaling (m/s)
    pub scaling_speed: f32,
    /// Cruise throttle percent (parameter TRIM_THROTTLE)
    pub throttle_cruise: i16,
    /// Minimum flying airspeed for stall prevention (m/s)
    pub airspeed_min: f32,
    /// Throttle percent to pitch demand feedforward (cd per percent)
    pub kff_throttle_to_pitch: f32,
    /// Roll servo to rudder feedforward
    pub kff_rudder_mix: f32,
    /// Static pitch trim (centidegrees)
    pub pitch_trim_cd: i32,
    /// Pitch-down applied at low throttle (degrees)
    pub stab_pitch_down_deg: f32,
    pub acro_roll_rate_dps: f32,
    pub acro_pitch_rate_dps: f32,
    pub acro_locking: bool,
    pub stick_mixing: StickMixing,
    /// Pilot keeps throttle and rudder in AUTO
    pub auto_fbw_steer: bool,
    /// Altitude below which ground steering engages (m)
    pub ground_steer_alt: f32,
    pub ground_steer_dps: f32,
    /// Launch delay in 0.1 s units (parameter TKOFF_THR_DELAY)
    pub takeoff_throttle_delay: i16,
    pub takeoff_throttle_slewrate: u8,
    pub throttle_slewrate: u8,
    pub flap_slewrate: u8,
    pub throttle_suppress_manual: bool,
    pub throttle_passthru_stabilize: bool,
    pub throttle_min: i16,
    pub throttle_max: i16,
    pub takeoff_throttle_max: i16,
    pub roll_limit_cd: i32,
    pub pitch_limit_max_cd: i32,
    pub pitch_limit_min_cd: i32,
    pub stall_prevention: bool,
    pub mixing_gain: f32,
    pub vtail_output: MixGeometry,
    pub elevon_output: MixGeometry,
    pub flaperon_output: MixGeometry,
    pub flap_1_speed: u8,
    pub flap_1_percent: i8,
    pub flap_2_speed: u8,
    pub flap_2_percent: i8,
    pub takeoff_flap_percent: i8,
    pub land_flap_percent: i8,
    pub gains: AttitudeGains,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            scaling_speed: DEFAULT_SCALING_SPEED,
            throttle_cruise: DEFAULT_TRIM_THROTTLE as i16,
            airspeed_min: DEFAULT_AIRSPEED_MIN,
            kff_throttle_to_pitch: DEFAULT_KFF_THR2PTCH,
            kff_rudder_mix: DEFAULT_KFF_RDDRMIX,
            pitch_trim_cd: DEFAULT_TRIM_PITCH_CD,
            stab_pitch_down_deg: DEFAULT_STAB_PITCH_DOWN,
            acro_roll_rate_dps: DEFAULT_ACRO_RATE,
            acro_pitch_rate_dps: DEFAULT_ACRO_RATE,
            acro_locking: false,
            stick_mixing: StickMixing::Fbw,
            auto_fbw_steer: false,
            ground_steer_alt: 0.0,
            ground_steer_dps: DEFAULT_GROUND_STEER_DPS,
            takeoff_throttle_delay: DEFAULT_TKOFF_THR_DELAY as i16,
            takeoff_throttle_slewrate: 0,
            throttle_slewrate: DEFAULT_THR_SLEWRATE as u8,
            flap_slewrate: DEFAULT_FLAP_SLEWRATE as u8,
            throttle_suppress_manual: false,
            throttle_passthru_stabilize: false,
            throttle_min: 0,
            throttle_max: DEFAULT_THR_MAX as i16,
            takeoff_throttle_max: 0,
            roll_limit_cd: DEFAULT_LIM_ROLL_CD,
            pitch_limit_max_cd: DEFAULT_LIM_PITCH_MAX,
            pitch_limit_min_cd: DEFAULT_LIM_PITCH_MIN,
            stall_prevention: true,
            mixing_gain: DEFAULT_MIXING_GAIN,
            vtail_output: MixGeometry::Disabled,
            elevon_output: MixGeometry::Disabled,
            flaperon_output: MixGeometry::Disabled,
            flap_1_speed: 0,
            flap_1_percent: 0,
            flap_2_speed: 0,
            flap_2_percent: 0,
            takeoff_flap_percent: 0,
            land_flap_percent: 0,
            gains: AttitudeGains::default(),
        }
    }
}

/// Registration table: every control parameter with its default
const DEFAULTS: &[(&str, ParamValue)] = &[
    ("SCALING_SPEED", ParamValue::Float(DEFAULT_SCALING_SPEED)),
    ("TRIM_THROTTLE", ParamValue::Int(DEFAULT_TRIM_THROTTLE)),
    ("ARSPD_FBW_MIN", ParamValue::Float(DEFAULT_AIRSPEED_MIN)),
    ("KFF_THR2PTCH", ParamValue::Float(DEFAULT_KFF_THR2PTCH)),
    ("KFF_RDDRMIX", ParamValue::Float(DEFAULT_KFF_RDDRMIX)),
    ("TRIM_PITCH_CD", ParamValue::Int(DEFAULT_TRIM_PITCH_CD)),
    ("STAB_PITCH_DOWN", ParamValue::Float(DEFAULT_STAB_PITCH_DOWN)),
    ("ACRO_ROLL_RATE", ParamValue::Float(DEFAULT_ACRO_RATE)),
    ("ACRO_PITCH_RATE", ParamValue::Float(DEFAULT_ACRO_RATE)),
    ("ACRO_LOCKING", ParamValue::Bool(false)),
    ("STICK_MIXING", ParamValue::Int(1)),
    ("AUTO_FBW_STEER", ParamValue::Bool(false)),
    ("GROUND_STEER_ALT", ParamValue::Float(0.0)),
    ("GROUND_STEER_DPS", ParamValue::Float(DEFAULT_GROUND_STEER_DPS)),
    ("TKOFF_THR_DELAY", ParamValue::Int(DEFAULT_TKOFF_THR_DELAY)),
    ("TKOFF_THR_SLEW", ParamValue::Int(0)),
    ("THR_SLEWRATE", ParamValue::Int(DEFAULT_THR_SLEWRATE)),
    ("FLAP_SLEWRATE", ParamValue::Int(DEFAULT_FLAP_SLEWRATE)),
    ("THR_SUPP_MAN", ParamValue::Bool(false)),
    ("THR_PASS_STAB", ParamValue::Bool(false)),
    ("THR_MIN", ParamValue::Int(0)),
    ("THR_MAX", ParamValue::Int(DEFAULT_THR_MAX)),
    ("TKOFF_THR_MAX", ParamValue::Int(0)),
    ("LIM_ROLL_CD", ParamValue::Int(DEFAULT_LIM_ROLL_CD)),
    ("LIM_PITCH_MAX", ParamValue::Int(DEFAULT_LIM_PITCH_MAX)),
    ("LIM_PITCH_MIN", ParamValue::Int(DEFAULT_LIM_PITCH_MIN)),
    ("STALL_PREVENTION", ParamValue::Bool(true)),
    ("MIXING_GAIN", ParamValue::Float(DEFAULT_MIXING_GAIN)),
    ("VTAIL_OUTPUT", ParamValue::Int(0)),
    ("ELEVON_OUTPUT", ParamValue::Int(0)),
    ("FLAPERON_OUTPUT", ParamValue::Int(0)),
    ("FLAP_1_SPEED", ParamValue::Int(0)),
    ("FLAP_1_PERCENT", ParamValue::Int(0)),
    ("FLAP_2_SPEED", ParamValue::Int(0)),
    ("FLAP_2_PERCENT", ParamValue::Int(0)),
    ("TKOFF_FLAP_PCNT", ParamValue::Int(0)),
    ("LAND_FLAP_PERCNT", ParamValue::Int(0)),
    ("RLL2SRV_TCONST", ParamValue::Float(0.5)),
    ("RLL2SRV_P", ParamValue::Float(0.4)),
    ("RLL2SRV_I", ParamValue::Float(0.04)),
    ("RLL2SRV_D", ParamValue::Float(0.02)),
    ("RLL2SRV_IMAX", ParamValue::Float(15.0)),
    ("RLL2SRV_RMAX", ParamValue::Float(75.0)),
    ("PTCH2SRV_TCONST", ParamValue::Float(0.5)),
    ("PTCH2SRV_P", ParamValue::Float(0.4)),
    ("PTCH2SRV_I", ParamValue::Float(0.04)),
    ("PTCH2SRV_D", ParamValue::Float(0.02)),
    ("PTCH2SRV_IMAX", ParamValue::Float(15.0)),
    ("PTCH2SRV_RMAX", ParamValue::Float(75.0)),
    ("YAW2SRV_DAMP", ParamValue::Float(0.3)),
    ("YAW2SRV_INT", ParamValue::Float(0.05)),
    ("YAW2SRV_IMAX", ParamValue::Float(15.0)),
    ("STEER2SRV_TCONST", ParamValue::Float(0.75)),
    ("STEER2SRV_P", ParamValue::Float(1.8)),
    ("STEER2SRV_I", ParamValue::Float(0.2)),
    ("STEER2SRV_IMAX", ParamValue::Float(15.0)),
    ("STEER2SRV_RMAX", ParamValue::Float(90.0)),
];

fn load_float(store: &ParameterStore, name: &str, default: f32, min: f32, max: f32) -> f32 {
    store.get_float(name).unwrap_or(default).clamp(min, max)
}

fn load_int(store: &ParameterStore, name: &str, default: i32, min: i32, max: i32) -> i32 {
    store.get_int(name).unwrap_or(default).clamp(min, max)
}

fn load_bool(store: &ParameterStore, name: &str, default: bool) -> bool {
    store.get_bool(name).unwrap_or(default)
}

fn load_geometry(store: &ParameterStore, name: &str) -> MixGeometry {
    match store.get_int(name).unwrap_or(0) {
        1 => MixGeometry::UpUp,
        2 => MixGeometry::UpDn,
        3 => MixGeometry::DnUp,
        4 => MixGeometry::DnDn,
        _ => MixGeometry::Disabled,
    }
}

fn load_stick_mixing(store: &ParameterStore) -> StickMixing {
    match store.get_int("STICK_MIXING").unwrap_or(1) {
        0 => StickMixing::Disabled,
        2 => StickMixing::Direct,
        _ => StickMixing::Fbw,
    }
}

impl ControlParams {
    /// Register every control parameter with its default value
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        for &(name, default) in DEFAULTS.iter() {
            store.register(name, default, ParamFlags::empty())?;
        }
        Ok(())
    }

    /// Load a validated parameter snapshot from the store
    pub fn from_store(store: &ParameterStore) -> Self {
        let gains = AttitudeGains {
            roll: AxisGains {
                tau: load_float(store, "RLL2SRV_TCONST", 0.5, 0.1, 2.0),
                kp: load_float(store, "RLL2SRV_P", 0.4, 0.0, 5.0),
                ki: load_float(store, "RLL2SRV_I", 0.04, 0.0, 1.0),
                kd: load_float(store, "RLL2SRV_D", 0.02, 0.0, 0.5),
                imax_deg: load_float(store, "RLL2SRV_IMAX", 15.0, 0.0, 45.0),
                rate_max_dps: load_float(store, "RLL2SRV_RMAX", 75.0, 0.0, 500.0),
            },
            pitch: AxisGains {
                tau: load_float(store, "PTCH2SRV_TCONST", 0.5, 0.1, 2.0),
                kp: load_float(store, "PTCH2SRV_P", 0.4, 0.0, 5.0),
                ki: load_float(store, "PTCH2SRV_I", 0.04, 0.0, 1.0),
                kd: load_float(store, "PTCH2SRV_D", 0.02, 0.0, 0.5),
                imax_deg: load_float(store, "PTCH2SRV_IMAX", 15.0, 0.0, 45.0),
                rate_max_dps: load_float(store, "PTCH2SRV_RMAX", 75.0, 0.0, 500.0),
            },
            yaw: YawGains {
                kd: load_float(store, "YAW2SRV_DAMP", 0.3, 0.0, 2.0),
                ki: load_float(store, "YAW2SRV_INT", 0.05, 0.0, 1.0),
                imax_deg: load_float(store, "YAW2SRV_IMAX", 15.0, 0.0, 45.0),
            },
            steer: SteerGains {
                tau: load_float(store, "STEER2SRV_TCONST", 0.75, 0.1, 2.0),
                kp: load_float(store, "STEER2SRV_P", 1.8, 0.0, 10.0),
                ki: load_float(store, "STEER2SRV_I", 0.2, 0.0, 1.0),
                imax_deg: load_float(store, "STEER2SRV_IMAX", 15.0, 0.0, 45.0),
                rate_max_dps: load_float(store, "STEER2SRV_RMAX", 90.0, 0.0, 360.0),
            },
        };

        Self {
            scaling_speed: load_float(
                store,
                "SCALING_SPEED",
                DEFAULT_SCALING_SPEED,
                MIN_SCALING_SPEED,
                MAX_SCALING_SPEED,
            ),
            throttle_cruise: load_int(store, "TRIM_THROTTLE", DEFAULT_TRIM_THROTTLE, 0, 100) as i16,
            airspeed_min: load_float(
                store,
                "ARSPD_FBW_MIN",
                DEFAULT_AIRSPEED_MIN,
                MIN_AIRSPEED,
                MAX_AIRSPEED,
            ),
            kff_throttle_to_pitch: load_float(store, "KFF_THR2PTCH", 0.0, -50.0, 50.0),
            kff_rudder_mix: load_float(store, "KFF_RDDRMIX", DEFAULT_KFF_RDDRMIX, -1.0, 1.0),
            pitch_trim_cd: load_int(store, "TRIM_PITCH_CD", 0, -4500, 4500),
            stab_pitch_down_deg: load_float(
                store,
                "STAB_PITCH_DOWN",
                DEFAULT_STAB_PITCH_DOWN,
                0.0,
                15.0,
            ),
            acro_roll_rate_dps: load_float(
                store,
                "ACRO_ROLL_RATE",
                DEFAULT_ACRO_RATE,
                MIN_ACRO_RATE,
                MAX_ACRO_RATE,
            ),
            acro_pitch_rate_dps: load_float(
                store,
                "ACRO_PITCH_RATE",
                DEFAULT_ACRO_RATE,
                MIN_ACRO_RATE,
                MAX_ACRO_RATE,
            ),
            acro_locking: load_bool(store, "ACRO_LOCKING", false),
            stick_mixing: load_stick_mixing(store),
            auto_fbw_steer: load_bool(store, "AUTO_FBW_STEER", false),
            ground_steer_alt: load_float(store, "GROUND_STEER_ALT", 0.0, -10.0, 80.0),
            ground_steer_dps: load_float(
                store,
                "GROUND_STEER_DPS",
                DEFAULT_GROUND_STEER_DPS,
                10.0,
                360.0,
            ),
            takeoff_throttle_delay: load_int(
                store,
                "TKOFF_THR_DELAY",
                DEFAULT_TKOFF_THR_DELAY,
                -1,
                127,
            ) as i16,
            takeoff_throttle_slewrate: load_int(store, "TKOFF_THR_SLEW", 0, 0, 127) as u8,
            throttle_slewrate: load_int(store, "THR_SLEWRATE", DEFAULT_THR_SLEWRATE, 0, 127) as u8,
            flap_slewrate: load_int(store, "FLAP_SLEWRATE", DEFAULT_FLAP_SLEWRATE, 0, 100) as u8,
            throttle_suppress_manual: load_bool(store, "THR_SUPP_MAN", false),
            throttle_passthru_stabilize: load_bool(store, "THR_PASS_STAB", false),
            throttle_min: load_int(store, "THR_MIN", 0, 0, 100) as i16,
            throttle_max: load_int(store, "THR_MAX", DEFAULT_THR_MAX, 0, 100) as i16,
            takeoff_throttle_max: load_int(store, "TKOFF_THR_MAX", 0, 0, 100) as i16,
            roll_limit_cd: load_int(
                store,
                "LIM_ROLL_CD",
                DEFAULT_LIM_ROLL_CD,
                MIN_LIMIT_CD,
                MAX_LIMIT_CD,
            ),
            pitch_limit_max_cd: load_int(
                store,
                "LIM_PITCH_MAX",
                DEFAULT_LIM_PITCH_MAX,
                MIN_LIMIT_CD,
                MAX_LIMIT_CD,
            ),
            pitch_limit_min_cd: load_int(
                store,
                "LIM_PITCH_MIN",
                DEFAULT_LIM_PITCH_MIN,
                -MAX_LIMIT_CD,
                0,
            ),
            stall_prevention: load_bool(store, "STALL_PREVENTION", true),
            mixing_gain: load_float(
                store,
                "MIXING_GAIN",
                DEFAULT_MIXING_GAIN,
                MIN_MIXING_GAIN,
                MAX_MIXING_GAIN,
            ),
            vtail_output: load_geometry(store, "VTAIL_OUTPUT"),
            elevon_output: load_geometry(store, "ELEVON_OUTPUT"),
            flaperon_output: load_geometry(store, "FLAPERON_OUTPUT"),
            flap_1_speed: load_int(store, "FLAP_1_SPEED", 0, 0, 100) as u8,
            flap_1_percent: load_int(store, "FLAP_1_PERCENT", 0, 0, 100) as i8,
            flap_2_speed: load_int(store, "FLAP_2_SPEED", 0, 0, 100) as u8,
            flap_2_percent: load_int(store, "FLAP_2_PERCENT", 0, 0, 100) as i8,
            takeoff_flap_percent: load_int(store, "TKOFF_FLAP_PCNT", 0, 0, 100) as i8,
            land_flap_percent: load_int(store, "LAND_FLAP_PERCNT", 0, 0, 100) as i8,
            gains,
        }
    }

    /// Yaw state-machine configuration view
    pub fn yaw_params(&self) -> YawParams {
        YawParams {
            ground_steer_alt: self.ground_steer_alt,
            ground_steer_dps: self.ground_steer_dps,
            kff_rudder_mix: self.kff_rudder_mix,
            stick_mixing: self.stick_mixing,
        }
    }

    /// Acro-mode configuration view
    pub fn acro_config(&self) -> AcroConfig {
        AcroConfig {
            roll_rate_dps: self.acro_roll_rate_dps,
            pitch_rate_dps: self.acro_pitch_rate_dps,
            locking: self.acro_locking,
        }
    }

    /// Output-stage configuration view
    ///
    /// Elevon-mode flags and trims have no store entries; they come from
    /// the airframe definition and keep their defaults here.
    pub fn mixing_config(&self) -> MixingConfig {
        MixingConfig {
            mixing_gain: self.mixing_gain,
            vtail_output: self.vtail_output,
            elevon_output: self.elevon_output,
            flaperon_output: self.flaperon_output,
            throttle_suppress_manual: self.throttle_suppress_manual,
            throttle_passthru_stabilize: self.throttle_passthru_stabilize,
            throttle_min: self.throttle_min,
            throttle_max: self.throttle_max,
            takeoff_throttle_max: self.takeoff_throttle_max,
            throttle_slewrate: self.throttle_slewrate,
            takeoff_throttle_slewrate: self.takeoff_throttle_slewrate,
            flap_slewrate: self.flap_slewrate,
            flap_1_speed: self.flap_1_speed,
            flap_1_percent: self.flap_1_percent,
            flap_2_speed: self.flap_2_speed,
            flap_2_percent: self.flap_2_percent,
            takeoff_flap_percent: self.takeoff_flap_percent,
            land_flap_percent: self.land_flap_percent,
            throttle_cruise: self.throttle_cruise,
            ..MixingConfig::default()
        }
    }
}
