// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Severity levels used to gate local printing and remote shipping.

use std::fmt;
use std::str::FromStr;

/// Ordered log importance. `Disable` sorts above every real level, so as a
/// threshold it never lets anything through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Disable,
}

impl Severity {
    /// Returns true when an entry of this severity meets `threshold`.
    #[must_use]
    pub fn passes(self, threshold: Severity) -> bool {
        self != Severity::Disable && threshold != Severity::Disable && self >= threshold
    }

    /// Tag prepended to every formatted line.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warn => "Warn",
            Severity::Error => "Error",
            Severity::Disable => "Disable",
        }
    }
}

impl AsRef<str> for Severity {
    fn as_ref(&self) -> &str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Disable => "disable",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "disable" | "off" | "none" => Ok(Severity::Disable),
            _ => Err(format!(
                "Invalid severity: '{s}'. Valid severities are: debug, info, warn, error, disable",
            )),
        }
    }
}
