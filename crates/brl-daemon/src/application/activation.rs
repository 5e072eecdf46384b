//! Driver activation: choosing and constructing a driver for one class.
//!
//! A [`DriverRegistry`] maps driver codes to loaders.  [`activate`] walks the
//! candidate list derived from an [`ActivationPlan`] and returns the first
//! driver that constructs, or the no-op driver when there is nothing to try.
//!
//! # Candidate selection
//!
//! | Requested            | Candidates                                           |
//! |----------------------|------------------------------------------------------|
//! | `["al"]`             | `al`                                                 |
//! | `["auto"]`           | the registry default, else the autodetect list       |
//! | `["al", "bm"]`       | `al`, then `bm`                                      |
//! | nothing to try       | `no` (reported as [`Activation::Degraded`])          |
//!
//! Autodetected codes the registry does not know are skipped silently;
//! explicitly requested unknown codes are reported as not loadable.

use std::fmt;

use brl_core::{DisplayError, TransportError};
use thiserror::Error;
use tracing::{debug, error};

/// The requested-driver value that asks for autodetection.
pub const AUTO: &str = "auto";
/// The code of the no-op driver every registry carries.
pub const NO_DRIVER: &str = "no";

/// The three kinds of driver the daemon activates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverClass {
    Braille,
    Speech,
    Screen,
}

impl fmt::Display for DriverClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DriverClass::Braille => "braille",
            DriverClass::Speech => "speech",
            DriverClass::Screen => "screen",
        })
    }
}

/// Errors raised while loading or constructing one driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver not loadable: {0}")]
    NotLoadable(String),

    #[error("driver initialization failed: {0}")]
    Construct(String),

    #[error(transparent)]
    Display(#[from] DisplayError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0} not supported by this driver")]
    NotSupported(&'static str),
}

/// Errors raised by [`activate`] and [`verify`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActivationError {
    #[error("{class} driver not found")]
    NotFound { class: DriverClass },

    #[error("{class} driver verification needs exactly one driver and one device")]
    NotVerifiable { class: DriverClass },
}

/// Static description of one driver class.
pub trait DriverKind: 'static {
    /// The driver interface, usually a `dyn Trait`.
    type Driver: ?Sized + Send;

    const CLASS: DriverClass;

    /// A driver that accepts every call and does nothing.
    fn no_op() -> Box<Self::Driver>;

    /// Codes to try when autodetecting on `device`.
    fn autodetect_candidates(device: Option<&str>) -> &'static [&'static str] {
        let _ = device;
        &[]
    }
}

/// Constructs a driver for an optional device identifier.
pub type Loader<K> = Box<dyn Fn(Option<&str>) -> Result<Box<<K as DriverKind>::Driver>, DriverError> + Send>;

/// The drivers available for one class.
pub struct DriverRegistry<K: DriverKind> {
    entries: Vec<(&'static str, Loader<K>)>,
    default: Option<&'static str>,
}

impl<K: DriverKind> Default for DriverRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: DriverKind> DriverRegistry<K> {
    /// A registry holding only the no-op driver.
    pub fn new() -> Self {
        let mut registry = Self { entries: Vec::new(), default: None };
        registry.register(NO_DRIVER, Box::new(|_: Option<&str>| Ok(K::no_op())));
        registry
    }

    /// Adds `loader` under `code`, replacing any earlier entry.
    pub fn register(&mut self, code: &'static str, loader: Loader<K>) {
        self.entries.retain(|(existing, _)| *existing != code);
        self.entries.push((code, loader));
    }

    /// Makes `code` the driver chosen by `auto` instead of autodetection.
    pub fn with_default(mut self, code: &'static str) -> Self {
        self.default = Some(code);
        self
    }

    pub fn has_driver(&self, code: &str) -> bool {
        self.entries.iter().any(|(existing, _)| *existing == code)
    }

    pub fn default_driver(&self) -> Option<&'static str> {
        self.default
    }

    /// Constructs the driver registered under `code`.
    ///
    /// # Errors
    ///
    /// [`DriverError::NotLoadable`] for an unknown code, otherwise whatever
    /// the loader reports.
    pub fn load(&self, code: &str, device: Option<&str>) -> Result<Box<K::Driver>, DriverError> {
        let Some((_, loader)) = self.entries.iter().find(|(existing, _)| *existing == code) else {
            error!("{} driver not loadable: {code}", K::CLASS);
            return Err(DriverError::NotLoadable(code.to_string()));
        };

        loader(device).map_err(|e| {
            debug!(
                "{} driver initialization failed: {code} -> {} ({e})",
                K::CLASS,
                device.unwrap_or("default")
            );
            e
        })
    }
}

/// What to activate: requested codes and, for braille, the devices to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationPlan {
    pub requested: Vec<String>,
    /// `None` stands for "no device", used by classes that do not open one.
    pub devices: Vec<Option<String>>,
}

impl ActivationPlan {
    /// A plan for a class that does not open devices.
    pub fn without_device(requested: Vec<String>) -> Self {
        Self { requested, devices: vec![None] }
    }

    /// A plan that tries `devices` in order.  An empty list behaves like a
    /// single unspecified device.
    pub fn with_devices(requested: Vec<String>, devices: Vec<String>) -> Self {
        let devices = if devices.is_empty() { vec![None] } else { devices.into_iter().map(Some).collect() };
        Self { requested, devices }
    }

    fn is_autodetect(&self) -> bool {
        matches!(self.requested.as_slice(), [only] if only == AUTO)
    }

    /// Verification needs one explicit driver on one device.
    pub fn is_verifiable(&self) -> bool {
        self.requested.len() == 1 && !self.is_autodetect() && self.devices.len() == 1
    }
}

/// The outcome of a successful [`activate`].
pub enum Activation<K: DriverKind> {
    /// A real driver is running.
    Engaged { code: String, device: Option<String>, driver: Box<K::Driver> },
    /// The no-op driver was chosen.
    Degraded { driver: Box<K::Driver> },
}

impl<K: DriverKind> fmt::Debug for Activation<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activation::Engaged { code, device, .. } => {
                f.debug_struct("Engaged").field("code", code).field("device", device).finish_non_exhaustive()
            }
            Activation::Degraded { .. } => f.write_str("Degraded"),
        }
    }
}

/// The driver a successful [`verify`] constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub code: String,
    pub device: Option<String>,
}

/// Activates the first driver of `plan` that constructs.
///
/// # Errors
///
/// [`ActivationError::NotFound`] when every candidate on every device failed.
pub fn activate<K: DriverKind>(registry: &DriverRegistry<K>, plan: &ActivationPlan) -> Result<Activation<K>, ActivationError> {
    let (code, device, driver) = first_driver(registry, plan)?;
    if code == NO_DRIVER {
        Ok(Activation::Degraded { driver })
    } else {
        Ok(Activation::Engaged { code, device, driver })
    }
}

/// Checks that the single requested driver constructs on the single
/// requested device, then releases it.
///
/// # Errors
///
/// [`ActivationError::NotVerifiable`] when the plan names several drivers,
/// several devices or `auto`; [`ActivationError::NotFound`] when the driver
/// does not construct.
pub fn verify<K: DriverKind>(registry: &DriverRegistry<K>, plan: &ActivationPlan) -> Result<Verified, ActivationError> {
    if !plan.is_verifiable() {
        return Err(ActivationError::NotVerifiable { class: K::CLASS });
    }

    let (code, device, driver) = first_driver(registry, plan)?;
    drop(driver);
    Ok(Verified { code, device })
}

fn first_driver<K: DriverKind>(
    registry: &DriverRegistry<K>,
    plan: &ActivationPlan,
) -> Result<(String, Option<String>, Box<K::Driver>), ActivationError> {
    for device in &plan.devices {
        if let Some(device) = device {
            debug!("checking {} device: {device}", K::CLASS);
        }

        let device = device.as_deref();
        if let Some((code, driver)) = activate_on_device(registry, plan, device) {
            return Ok((code, device.map(str::to_string), driver));
        }
    }

    Err(ActivationError::NotFound { class: K::CLASS })
}

fn activate_on_device<K: DriverKind>(
    registry: &DriverRegistry<K>,
    plan: &ActivationPlan,
    device: Option<&str>,
) -> Option<(String, Box<K::Driver>)> {
    let mut autodetect = plan.is_autodetect();
    let mut candidates: Vec<&str> = if !autodetect {
        plan.requested.iter().map(String::as_str).collect()
    } else if let Some(default) = registry.default_driver() {
        vec![default]
    } else {
        debug!("performing {} driver autodetection", K::CLASS);
        let detected = K::autodetect_candidates(device).to_vec();
        if detected.is_empty() {
            debug!("no autodetectable {} drivers", K::CLASS);
        }
        detected
    };

    if candidates.is_empty() {
        candidates.push(NO_DRIVER);
        autodetect = false;
    }

    for code in candidates {
        if autodetect && !registry.has_driver(code) {
            continue;
        }

        debug!("checking for {} driver: {code}", K::CLASS);
        if let Ok(driver) = registry.load(code, device) {
            return Some((code.to_string(), driver));
        }
    }

    debug!("{} driver not found", K::CLASS);
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────
