// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Label validation and rendering.
//!
//! A [`LabelSet`] is validated by a [`LabelFormatter`] and turned into a
//! [`Labels`] value. Extra keys (service name, version) are appended to the
//! structured value and the whole thing is rendered once into the
//! `{host="...",source="...",job="..."}` stream selector the push endpoint
//! expects.

use regex::Regex;

use crate::errors::ValidationError;

const HOST_OR_IP_PATTERN: &str = r"^(https?://)?(((25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)(\.(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)){3})|([A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*))(:[0-9]{1,5})?/?$";
const IDENTIFIER_PATTERN: &str = r"^[A-Za-z0-9_-]+$";
const VERSION_PATTERN: &str = r"^[0-9]{1,2}\.[0-9]{1,2}\.[0-9]{1,3}$";

pub const SERVICE_NAME_LABEL: &str = "service_name";
pub const VERSION_LABEL: &str = "version";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    pub host: String,
    pub source: String,
    pub job: String,
}

impl LabelSet {
    pub fn new(host: impl Into<String>, source: impl Into<String>, job: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            source: source.into(),
            job: job.into(),
        }
    }
}

/// Owns the compiled validators. Build one and reuse it; it is `Sync`.
#[derive(Debug, Clone)]
pub struct LabelFormatter {
    host_or_ip: Regex,
    identifier: Regex,
    version: Regex,
}

impl Default for LabelFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelFormatter {
    // The patterns are constants, compilation cannot fail at runtime.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self {
            host_or_ip: Regex::new(HOST_OR_IP_PATTERN).expect("invalid host pattern"),
            identifier: Regex::new(IDENTIFIER_PATTERN).expect("invalid identifier pattern"),
            version: Regex::new(VERSION_PATTERN).expect("invalid version pattern"),
        }
    }

    /// Checks fields in order (host, source, job) and reports the first bad one.
    pub fn validate(&self, set: &LabelSet) -> Result<(), ValidationError> {
        if !self.host_or_ip.is_match(&set.host) {
            return Err(ValidationError::new("host", &set.host));
        }
        if !self.identifier.is_match(&set.source) {
            return Err(ValidationError::new("source", &set.source));
        }
        if !self.identifier.is_match(&set.job) {
            return Err(ValidationError::new("job", &set.job));
        }
        Ok(())
    }

    pub fn validate_version(&self, version: &str) -> Result<(), ValidationError> {
        if self.version.is_match(version) {
            Ok(())
        } else {
            Err(ValidationError::new(VERSION_LABEL, version))
        }
    }

    /// Validates `set` and renders it as a label string.
    pub fn format(&self, set: &LabelSet) -> Result<String, ValidationError> {
        self.labels(set).map(|labels| labels.render())
    }

    /// Validates `set` and returns the structured form, ready for amendment.
    pub fn labels(&self, set: &LabelSet) -> Result<Labels, ValidationError> {
        self.validate(set)?;
        Ok(Labels {
            base: set.clone(),
            extras: Vec::new(),
        })
    }
}

/// Validated label set plus appended extras. Extras are append-only and each
/// key is recorded at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    base: LabelSet,
    extras: Vec<(&'static str, String)>,
}

impl Labels {
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Appends `service_name` unless it is already present.
    pub fn ensure_service_name(&mut self, service_name: &str) {
        self.append_once(SERVICE_NAME_LABEL, service_name);
    }

    /// Appends a validated `version` unless one is already present.
    pub fn append_version(
        &mut self,
        formatter: &LabelFormatter,
        version: &str,
    ) -> Result<(), ValidationError> {
        formatter.validate_version(version)?;
        self.append_once(VERSION_LABEL, version);
        Ok(())
    }

    fn append_once(&mut self, key: &'static str, value: &str) {
        if self.extra(key).is_none() {
            self.extras.push((key, value.to_string()));
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push('{');
        push_pair(&mut out, "host", &self.base.host);
        out.push(',');
        push_pair(&mut out, "source", &self.base.source);
        out.push(',');
        push_pair(&mut out, "job", &self.base.job);
        for (key, value) in &self.extras {
            out.push(',');
            push_pair(&mut out, key, value);
        }
        out.push('}');
        out
    }
}

fn push_pair(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push_str("=\"");
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
}
