//! Credit quota types and their persisted shape.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Fields;

/// Metered feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Feature {
    Grader,
    Generator,
}

impl Feature {
    /// Field name used in both the remote document and the local blob.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::Grader => "grader",
            Self::Generator => "generator",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grader" => Ok(Self::Grader),
            "generator" => Ok(Self::Generator),
            other => Err(format!("unknown feature: {other}")),
        }
    }
}

/// In-memory quota pair for the current session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credits {
    pub grader: i64,
    pub generator: i64,
}

impl Credits {
    #[must_use]
    pub const fn zero() -> Self {
        Self::uniform(0)
    }

    #[must_use]
    pub const fn uniform(value: i64) -> Self {
        Self {
            grader: value,
            generator: value,
        }
    }

    #[must_use]
    pub const fn get(&self, feature: Feature) -> i64 {
        match feature {
            Feature::Grader => self.grader,
            Feature::Generator => self.generator,
        }
    }

    pub fn set(&mut self, feature: Feature, value: i64) {
        match feature {
            Feature::Grader => self.grader = value,
            Feature::Generator => self.generator = value,
        }
    }
}

/// Stored credit record, shared by the remote document and the local blob.
///
/// `last_reset` is kept as the raw RFC 3339 string; a value that does not
/// parse is treated as stale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditRecord {
    pub grader: i64,
    pub generator: i64,
    pub last_reset: String,
}

impl CreditRecord {
    /// Full allotment stamped with `now`.
    #[must_use]
    pub fn fresh(allotment: i64, now: DateTime<FixedOffset>) -> Self {
        Self {
            grader: allotment,
            generator: allotment,
            last_reset: now.to_rfc3339(),
        }
    }

    /// Calendar date of the last reset, seen from `now`'s offset.
    #[must_use]
    pub fn reset_date(&self, now: &DateTime<FixedOffset>) -> Option<NaiveDate> {
        DateTime::parse_from_rfc3339(&self.last_reset)
            .ok()
            .map(|at| at.with_timezone(&now.timezone()).date_naive())
    }

    /// Whether the record was reset on `now`'s calendar day.
    #[must_use]
    pub fn is_current(&self, now: &DateTime<FixedOffset>) -> bool {
        self.reset_date(now) == Some(now.date_naive())
    }

    #[must_use]
    pub const fn credits(&self) -> Credits {
        Credits {
            grader: self.grader,
            generator: self.generator,
        }
    }

    /// Record carrying `credits`, stamped with `now`.
    #[must_use]
    pub fn from_credits(credits: Credits, now: DateTime<FixedOffset>) -> Self {
        Self {
            grader: credits.grader,
            generator: credits.generator,
            last_reset: now.to_rfc3339(),
        }
    }

    #[must_use]
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("grader".to_string(), Value::from(self.grader));
        fields.insert("generator".to_string(), Value::from(self.generator));
        fields.insert("lastReset".to_string(), Value::from(self.last_reset.clone()));
        fields
    }

    /// Reads a record from document fields.
    ///
    /// # Errors
    /// Returns an error if a field is missing or has the wrong type.
    pub fn from_fields(fields: &Fields) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(fields.clone()))
    }
}
