//! Parameter management
//!
//! [`store`] holds the generic name/value parameter store; [`control`] maps
//! the attitude-control tunables onto it under conventional autopilot
//! parameter names so a ground station sees familiar identifiers.
//! Persistence of the store is the hosting system's concern.

pub mod control;
pub mod store;

pub use control::{AttitudeGains, ControlParams};
pub use store::{ParamFlags, ParamValue, ParameterError, ParameterStore};
pub use store::{MAX_PARAMS, PARAM_NAME_LEN};
