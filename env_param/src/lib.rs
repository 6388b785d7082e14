//! Global tuning parameters that can be overridden from environment variables.
//!
//! An [`EnvParam`] holds the name of an environment variable and the textual representation of
//! its default value. It is meant for internal knobs of an algorithm (precisions, ratios, seeds)
//! that are too specialized to appear in a command line interface.
//!
//! ```
//! use env_param::EnvParam;
//! static IVPROP_DEMO_RATIO: EnvParam<f64> = EnvParam::new("IVPROP_DEMO_RATIO", "0.1");
//!
//! // environment variable not set, using the default value
//! assert_eq!(IVPROP_DEMO_RATIO.get(), 0.1);
//! ```
//!
//! The environment is only read on the first access: later changes of the variable are ignored.
//!
//! ```
//! use env_param::EnvParam;
//! static IVPROP_DEMO_SEED: EnvParam<u64> = EnvParam::new("IVPROP_DEMO_SEED", "0");
//!
//! std::env::set_var("IVPROP_DEMO_SEED", "9");
//! assert_eq!(IVPROP_DEMO_SEED.get(), 9);
//! std::env::set_var("IVPROP_DEMO_SEED", "10"); // ignored
//! assert_eq!(IVPROP_DEMO_SEED.get(), 9);
//! ```
//!
//! [`EnvParam::set`] forces the value of a parameter that was not accessed yet.

use once_cell::sync::OnceCell;
use std::str::FromStr;
use tracing::{error, warn};

pub struct EnvParam<T> {
    value: OnceCell<T>,
    env: &'static str,
    default: &'static str,
}

/// Raised by [`EnvParam::set`] when the parameter already has a value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AlreadyInitialized(pub &'static str);

impl std::fmt::Display for AlreadyInitialized {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parameter {} is already initialized", self.0)
    }
}

impl std::error::Error for AlreadyInitialized {}

impl<T> EnvParam<T> {
    /// Declares a parameter read from the environment variable `env`, or parsed from `default` if the
    /// variable is not set.
    pub const fn new(env: &'static str, default: &'static str) -> EnvParam<T> {
        EnvParam {
            value: OnceCell::new(),
            env,
            default,
        }
    }

    /// Name of the environment variable.
    pub fn name(&self) -> &'static str {
        self.env
    }

    /// Sets the parameter, unless it was already initialized (which typically means it was already read).
    pub fn set(&self, value: T) -> Result<(), AlreadyInitialized> {
        self.value.set(value).map_err(|_| AlreadyInitialized(self.env))
    }
}

impl<T: FromStr> EnvParam<T> {
    fn read_default(&self) -> T {
        match T::from_str(self.default) {
            Ok(v) => v,
            Err(_) => {
                error!("{}: could not parse the default value {:?}", self.env, self.default);
                panic!("{}: invalid default value {:?}", self.env, self.default)
            }
        }
    }

    fn read(&self) -> T {
        match std::env::var(self.env) {
            Ok(param) => match T::from_str(&param) {
                Ok(value) => value,
                Err(_) => {
                    warn!(
                        "{}: could not parse {:?}, using default {:?}",
                        self.env, param, self.default
                    );
                    self.read_default()
                }
            },
            Err(std::env::VarError::NotPresent) => self.read_default(),
            Err(err) => {
                warn!("{}: {err}, using default {:?}", self.env, self.default);
                self.read_default()
            }
        }
    }

    /// Value of the parameter, read from the environment on the first access.
    ///
    /// # Panic
    ///
    /// Panics if the default value cannot be parsed. An unparsable environment variable only
    /// results in a warning and the default value being used.
    pub fn get(&self) -> T
    where
        T: Copy,
    {
        *self.get_ref()
    }

    /// Same as [`EnvParam::get`], by reference.
    pub fn get_ref(&self) -> &T {
        self.value.get_or_init(|| self.read())
    }
}
