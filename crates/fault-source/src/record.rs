//! Fault Records and Decoding
//!
//! Defines the raw record shape returned by a fault source and the
//! normalized [`FaultRecord`] the rest of the pipeline works with.

use crate::error::DecodeError;
use crate::FAULT_CLASS_ID;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a fault occurrence on the remote system
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaultId(String);

impl FaultId {
    /// Create a fault id from its remote representation
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fault severity as reported by the management system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Condition resolved
    Cleared,
    /// Informational
    Info,
    /// Condition noted, no impact
    Condition,
    /// Potential impact
    Warning,
    /// Minor impact
    Minor,
    /// Major impact
    Major,
    /// Service-affecting
    Critical,
}

impl Severity {
    /// Whether the fault is still active
    pub fn is_raised(&self) -> bool {
        *self != Severity::Cleared
    }

    /// Wire name of the severity
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Cleared => "cleared",
            Severity::Info => "info",
            Severity::Condition => "condition",
            Severity::Warning => "warning",
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cleared" => Ok(Severity::Cleared),
            "info" => Ok(Severity::Info),
            "condition" => Ok(Severity::Condition),
            "warning" => Ok(Severity::Warning),
            "minor" => Ok(Severity::Minor),
            "major" => Ok(Severity::Major),
            "critical" => Ok(Severity::Critical),
            _ => Err(DecodeError::UnknownSeverity(s.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_class_id() -> String {
    FAULT_CLASS_ID.to_string()
}

/// A managed object exactly as the source returned it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Class of the managed object
    #[serde(default = "default_class_id")]
    pub class_id: String,
    /// Attribute name to value
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl RawRecord {
    /// Create an empty fault instance record
    pub fn new() -> Self {
        Self {
            class_id: default_class_id(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Look up an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Render the object as a property dump, one attribute per line
    pub fn describe(&self) -> String {
        let width = self.attributes.keys().map(String::len).max().unwrap_or(0);
        let mut out = format!("Managed Object : {}\n--------------\n", self.class_id);
        for (name, value) in &self.attributes {
            out.push_str(&format!("{:<width$} : {}\n", name, value, width = width));
        }
        out
    }
}

impl Default for RawRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// One fault as reported at a single poll instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultRecord {
    /// Occurrence identifier
    pub id: FaultId,
    /// Reported severity
    pub severity: Severity,
    /// Hierarchical path of the affected resource
    pub distinguished_name: String,
    /// Fault cause (e.g. "threshold-crossed")
    pub cause: String,
    /// Fault code, when the source provides one
    pub code: Option<String>,
    /// Full text rendering of the raw record
    pub description: String,
}

impl FaultRecord {
    /// Whether the fault is active at this instant
    pub fn is_raised(&self) -> bool {
        self.severity.is_raised()
    }
}

fn required<'a>(raw: &'a RawRecord, name: &'static str) -> Result<&'a str, DecodeError> {
    let value = raw.attr(name).ok_or(DecodeError::MissingAttribute(name))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(DecodeError::EmptyAttribute(name));
    }
    Ok(value)
}

/// Decode a raw record into a [`FaultRecord`].
///
/// `id`, `severity` and `dn` are required. `cause` and `code` are carried
/// through when present.
pub fn decode(raw: &RawRecord) -> Result<FaultRecord, DecodeError> {
    let id = required(raw, "id")?;
    let severity: Severity = required(raw, "severity")?.parse()?;
    let dn = required(raw, "dn")?;

    Ok(FaultRecord {
        id: FaultId::new(id),
        severity,
        distinguished_name: dn.to_string(),
        cause: raw.attr("cause").unwrap_or_default().to_string(),
        code: raw.attr("code").map(str::to_string),
        description: raw.describe(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold_fault(id: &str, severity: &str) -> RawRecord {
        RawRecord::new()
            .with("id", id)
            .with("severity", severity)
            .with("dn", "sys/chassis-1/blade-3/fault-F0381")
            .with("cause", "threshold-crossed")
            .with("code", "F0381")
            .with("descr", "Adapter temperature above upper non-critical")
    }

    #[test]
    fn test_decode_raised() {
        let record = decode(&threshold_fault("4211", "major")).unwrap();
        assert_eq!(record.id, FaultId::new("4211"));
        assert_eq!(record.severity, Severity::Major);
        assert!(record.is_raised());
        assert_eq!(record.distinguished_name, "sys/chassis-1/blade-3/fault-F0381");
        assert_eq!(record.cause, "threshold-crossed");
        assert_eq!(record.code.as_deref(), Some("F0381"));
    }

    #[test]
    fn test_decode_cleared() {
        let record = decode(&threshold_fault("4211", "cleared")).unwrap();
        assert!(!record.is_raised());
    }

    #[test]
    fn test_severity_case_insensitive() {
        assert_eq!("Critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!(" CLEARED ".parse::<Severity>().unwrap(), Severity::Cleared);
        assert!("loud".parse::<Severity>().is_err());
    }

    #[test]
    fn test_decode_missing_id() {
        let raw = RawRecord::new().with("severity", "major").with("dn", "sys");
        assert_eq!(decode(&raw), Err(DecodeError::MissingAttribute("id")));
    }

    #[test]
    fn test_decode_blank_dn() {
        let raw = RawRecord::new()
            .with("id", "7")
            .with("severity", "minor")
            .with("dn", "   ");
        assert_eq!(decode(&raw), Err(DecodeError::EmptyAttribute("dn")));
    }

    #[test]
    fn test_decode_unknown_severity() {
        let err = decode(&threshold_fault("7", "apocalyptic")).unwrap_err();
        assert_eq!(err, DecodeError::UnknownSeverity("apocalyptic".into()));
    }

    #[test]
    fn test_description_lists_every_attribute() {
        let record = decode(&threshold_fault("4211", "major")).unwrap();
        assert!(record.description.starts_with("Managed Object : faultInst"));
        assert!(record.description.contains("descr"));
        assert!(record.description.contains("Adapter temperature above upper non-critical"));
        assert_eq!(record.description.lines().count(), 2 + 6);
    }

    #[test]
    fn test_raw_record_json_defaults_class() {
        let raw: RawRecord =
            serde_json::from_str(r#"{"attributes": {"id": "1", "severity": "info", "dn": "sys"}}"#)
                .unwrap();
        assert_eq!(raw.class_id, FAULT_CLASS_ID);
        assert_eq!(raw.attr("id"), Some("1"));
    }
}
