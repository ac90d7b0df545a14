// Copyright (c) 2023 The MobileCoin Foundation

//! Process wide security settings

use crate::{Error, Result, TrustMode};
use config::{Config, ConfigError, Environment, File};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Configuration key enabling relaxed trust and the legacy handshake flags
pub const RELAXED_TRUST_KEY: &str = "relax.ssl.security";
/// Configuration key for legacy renegotiation, defaults to [`RELAXED_TRUST_KEY`]
pub const LEGACY_RENEGOTIATION_KEY: &str = "relax.ssl.legacy_renegotiation";
/// Configuration key for legacy hello messages, defaults to [`RELAXED_TRUST_KEY`]
pub const LEGACY_HELLO_MESSAGES_KEY: &str = "relax.ssl.legacy_hello_messages";

/// Prefix of environment variables overriding configuration keys
///
/// `PDFSIGN_RELAX__SSL__SECURITY=true` sets `relax.ssl.security`.
pub const ENVIRONMENT_PREFIX: &str = "PDFSIGN";

static INSTALLED: OnceLock<SecurityMode> = OnceLock::new();

/// The security settings of the process.
///
/// Read once at startup and installed with [`SecurityMode::install()`] before
/// any trust or network component is created.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct SecurityMode {
    relaxed_trust: bool,
    legacy_renegotiation: bool,
    legacy_hello_messages: bool,
}

impl SecurityMode {
    /// Create a new instance
    pub fn new(relaxed_trust: bool, legacy_renegotiation: bool, legacy_hello_messages: bool) -> Self {
        Self {
            relaxed_trust,
            legacy_renegotiation,
            legacy_hello_messages,
        }
    }

    /// Everything off.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Relaxed trust with both legacy handshake flags.
    pub fn relaxed() -> Self {
        Self::new(true, true, true)
    }

    /// Read the mode from `config`. Missing keys take their defaults.
    ///
    /// # Errors
    /// `Error::Config` if a key is present but is not a boolean.
    pub fn from_config(config: &Config) -> Result<Self> {
        let relaxed_trust = optional(config, RELAXED_TRUST_KEY)?.unwrap_or(false);
        let legacy_renegotiation =
            optional(config, LEGACY_RENEGOTIATION_KEY)?.unwrap_or(relaxed_trust);
        let legacy_hello_messages =
            optional(config, LEGACY_HELLO_MESSAGES_KEY)?.unwrap_or(relaxed_trust);
        Ok(Self::new(
            relaxed_trust,
            legacy_renegotiation,
            legacy_hello_messages,
        ))
    }

    /// Read the mode from an optional TOML file and the environment.
    ///
    /// See [`load_config()`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_config(&load_config(path)?)
    }

    /// Whether server chains are trusted on first use.
    pub fn relaxed_trust(&self) -> bool {
        self.relaxed_trust
    }

    /// Whether the legacy renegotiation compatibility flag is set.
    pub fn legacy_renegotiation(&self) -> bool {
        self.legacy_renegotiation
    }

    /// Whether the legacy hello messages compatibility flag is set.
    pub fn legacy_hello_messages(&self) -> bool {
        self.legacy_hello_messages
    }

    /// The [`TrustMode`] for chain validation.
    pub fn trust_mode(&self) -> TrustMode {
        if self.relaxed_trust {
            TrustMode::Relaxed
        } else {
            TrustMode::Strict
        }
    }

    /// Install this mode for the process.
    ///
    /// Installing the mode which is already installed returns it again.
    ///
    /// # Errors
    /// `Error::SecurityModeAlreadyInstalled` if a different mode was
    /// installed before.
    pub fn install(self) -> Result<&'static SecurityMode> {
        let installed = INSTALLED.get_or_init(|| {
            info!(
                relaxed_trust = self.relaxed_trust,
                legacy_renegotiation = self.legacy_renegotiation,
                legacy_hello_messages = self.legacy_hello_messages,
                "security mode installed"
            );
            if self.relaxed_trust {
                warn!("relaxed security mode is active");
            }
            self
        });
        if *installed != self {
            return Err(Error::SecurityModeAlreadyInstalled);
        }
        Ok(installed)
    }

    /// The installed mode, if any.
    pub fn installed() -> Option<&'static SecurityMode> {
        INSTALLED.get()
    }

    /// The installed mode, which components read when they are created.
    ///
    /// # Errors
    /// `Error::SecurityModeNotInstalled` until [`SecurityMode::install()`]
    /// has been called.
    pub fn current() -> Result<&'static SecurityMode> {
        Self::installed().ok_or(Error::SecurityModeNotInstalled)
    }
}

/// Build the process configuration.
///
/// Sources, lowest precedence first:
/// 1. the TOML file at `path`, when given and present,
/// 2. environment variables prefixed with [`ENVIRONMENT_PREFIX`], using `__`
///    between key segments.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(false));
    }
    let config = builder
        .add_source(
            Environment::with_prefix(ENVIRONMENT_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    Ok(config)
}

/// Look up `key`, mapping a missing key to `None`.
pub(crate) fn optional<T: DeserializeOwned>(config: &Config, key: &str) -> Result<Option<T>> {
    match config.get::<T>(key) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
