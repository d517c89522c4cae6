//! Control mode and flight stage types
//!
//! `ControlMode` is immutable during a tick; an external mode-switch request
//! takes effect atomically at the next tick boundary. `FlightStage` is a
//! read-only input supplied by the speed/height controller.

/// Flight control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Direct radio passthrough, no stabilization
    Manual,
    /// Pilot flies attitude demands, autopilot stabilizes
    Stabilize,
    /// Per-axis pilot override for flight instruction
    Training,
    /// Rate-command aerobatic mode with optional attitude locking
    Acro,
    /// Fly-by-wire: pilot commands attitude, no auto throttle
    FlyByWireA,
    /// Fly-by-wire with speed/height control
    FlyByWireB,
    /// FBW-B plus heading hold
    Cruise,
    /// Gain tuning flight mode
    Autotune,
    /// Autonomous mission flight
    Auto,
    /// Autonomous flight to an externally commanded target
    Guided,
    /// Circle around the current position
    Circle,
    /// VTOL stabilize (delegated)
    QStabilize,
    /// VTOL hover (delegated)
    QHover,
    /// VTOL loiter (delegated)
    QLoiter,
}

impl ControlMode {
    /// True for VTOL sub-modes handled entirely by the VTOL collaborator
    pub fn is_vtol(&self) -> bool {
        matches!(
            self,
            ControlMode::QStabilize | ControlMode::QHover | ControlMode::QLoiter
        )
    }

    /// True when the autopilot owns the throttle demand
    ///
    /// In these modes the throttle suppression state machine gates output;
    /// in all others the pilot has direct throttle authority.
    pub fn auto_throttle(&self) -> bool {
        matches!(
            self,
            ControlMode::FlyByWireB
                | ControlMode::Cruise
                | ControlMode::Auto
                | ControlMode::Guided
                | ControlMode::Circle
        ) || self.is_vtol()
    }

    /// True for modes subject to automatic throttle slew limiting
    pub fn throttle_slew_limited(&self) -> bool {
        self.auto_throttle()
    }

    /// Mode name for event reporting
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlMode::Manual => "Manual",
            ControlMode::Stabilize => "Stabilize",
            ControlMode::Training => "Training",
            ControlMode::Acro => "Acro",
            ControlMode::FlyByWireA => "FlyByWireA",
            ControlMode::FlyByWireB => "FlyByWireB",
            ControlMode::Cruise => "Cruise",
            ControlMode::Autotune => "Autotune",
            ControlMode::Auto => "Auto",
            ControlMode::Guided => "Guided",
            ControlMode::Circle => "Circle",
            ControlMode::QStabilize => "QStabilize",
            ControlMode::QHover => "QHover",
            ControlMode::QLoiter => "QLoiter",
        }
    }
}

/// Flight stage reported by the speed/height controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightStage {
    /// Normal flight
    #[default]
    Normal,
    /// Auto takeoff in progress
    Takeoff,
    /// Landing approach
    LandApproach,
    /// Final landing stage, wings held level
    LandFinal,
    /// Aborted landing climb-out
    LandAbort,
    /// VTOL flight
    Vtol,
}

impl FlightStage {
    /// True during takeoff or an aborted-landing climb-out
    ///
    /// These stages share steering semantics: pilot steer-rate input is
    /// ignored and any accumulated course error is preserved.
    pub fn is_takeoff_or_abort(&self) -> bool {
        matches!(self, FlightStage::Takeoff | FlightStage::LandAbort)
    }
}
