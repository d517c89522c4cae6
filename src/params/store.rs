//! Generic parameter store
//!
//! Key/value configuration storage with per-parameter flags. Keys are short
//! fixed-capacity strings, values are the three scalar types the control
//! core needs. The store tracks a dirty flag so the hosting system knows
//! when a persistence pass is due.

use bitflags::bitflags;
use heapless::{FnvIndexMap, String};

/// Maximum parameter name length
pub const PARAM_NAME_LEN: usize = 16;

/// Maximum number of parameters (FnvIndexMap capacity, power of two)
pub const MAX_PARAMS: usize = 128;

bitflags! {
    /// Parameter flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ParamFlags: u8 {
        /// Not modifiable at runtime
        const READ_ONLY = 0b0000_0001;
        /// Not listed to the ground station
        const HIDDEN = 0b0000_0010;
    }
}

/// Parameter value types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i32),
    Float(f32),
}

/// Parameter store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterError {
    /// Parameter was never registered
    Unknown,
    /// Parameter is flagged read-only
    ReadOnly,
    /// Store capacity exhausted
    StoreFull,
    /// Name exceeds `PARAM_NAME_LEN`
    NameTooLong,
}

impl ParameterError {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterError::Unknown => "Unknown",
            ParameterError::ReadOnly => "ReadOnly",
            ParameterError::StoreFull => "StoreFull",
            ParameterError::NameTooLong => "NameTooLong",
        }
    }
}

type Key = String<PARAM_NAME_LEN>;

fn key(name: &str) -> Result<Key, ParameterError> {
    let mut k = Key::new();
    k.push_str(name).map_err(|_| ParameterError::NameTooLong)?;
    Ok(k)
}

/// Name/value parameter store with flags and a dirty marker
pub struct ParameterStore {
    values: FnvIndexMap<Key, ParamValue, MAX_PARAMS>,
    flags: FnvIndexMap<Key, ParamFlags, MAX_PARAMS>,
    dirty: bool,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self {
            values: FnvIndexMap::new(),
            flags: FnvIndexMap::new(),
            dirty: false,
        }
    }

    /// Register a parameter with its default value
    ///
    /// Idempotent: an already-registered name keeps its current value.
    pub fn register(
        &mut self,
        name: &str,
        default: ParamValue,
        flags: ParamFlags,
    ) -> Result<(), ParameterError> {
        let k = key(name)?;
        if self.values.contains_key(&k) {
            return Ok(());
        }
        self.values
            .insert(k.clone(), default)
            .map_err(|_| ParameterError::StoreFull)?;
        self.flags
            .insert(k, flags)
            .map_err(|_| ParameterError::StoreFull)?;
        self.dirty = true;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        let k = key(name).ok()?;
        self.values.get(&k)
    }

    /// Set a registered parameter, honoring the read-only flag
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        let k = key(name)?;
        if !self.values.contains_key(&k) {
            return Err(ParameterError::Unknown);
        }
        if let Some(f) = self.flags.get(&k) {
            if f.contains(ParamFlags::READ_ONLY) {
                return Err(ParameterError::ReadOnly);
            }
        }
        self.values.insert(k, value).ok();
        self.dirty = true;
        Ok(())
    }

    /// Float value of a parameter, `None` for other types or unknown names
    pub fn get_float(&self, name: &str) -> Option<f32> {
        match self.get(name) {
            Some(ParamValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.get(name) {
            Some(ParamValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(ParamValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    /// Names visible to the ground station
    pub fn iter_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().filter_map(|k| {
            let hidden = self
                .flags
                .get(k)
                .map(|f| f.contains(ParamFlags::HIDDEN))
                .unwrap_or(false);
            if hidden {
                None
            } else {
                Some(k.as_str())
            }
        })
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Called by the hosting system after a successful persistence pass
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}
