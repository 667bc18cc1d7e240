use std::fmt;

use chrono::NaiveDate;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum TrialParseError {
    #[error("invalid date format: {0}")]
    InvalidDateFormat(String),
    #[error("invalid date value: {0}")]
    InvalidDateValue(String),
    #[error("invalid dosage: {0}")]
    InvalidDosage(String),
    #[error("invalid outcome: {0}")]
    InvalidOutcome(String),
}

/// Calendar date in ISO `YYYY-MM-DD` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TrialDate {
    year: i32,
    month: u8,
    day: u8,
}

impl TrialDate {
    pub fn parse(value: &str) -> Result<Self, TrialParseError> {
        let trimmed = value.trim();
        let bytes = trimmed.as_bytes();
        if trimmed.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(TrialParseError::InvalidDateFormat(value.to_string()));
        }
        if !trimmed[0..4].chars().all(|ch| ch.is_ascii_digit())
            || !trimmed[5..7].chars().all(|ch| ch.is_ascii_digit())
            || !trimmed[8..10].chars().all(|ch| ch.is_ascii_digit())
        {
            return Err(TrialParseError::InvalidDateFormat(value.to_string()));
        }

        let year: i32 = trimmed[0..4]
            .parse()
            .map_err(|_| TrialParseError::InvalidDateFormat(value.to_string()))?;
        let month: u8 = trimmed[5..7]
            .parse()
            .map_err(|_| TrialParseError::InvalidDateFormat(value.to_string()))?;
        let day: u8 = trimmed[8..10]
            .parse()
            .map_err(|_| TrialParseError::InvalidDateFormat(value.to_string()))?;

        if NaiveDate::from_ymd_opt(year, month as u32, day as u32).is_none() {
            return Err(TrialParseError::InvalidDateValue(value.to_string()));
        }

        Ok(Self { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }
}

impl fmt::Display for TrialDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl Serialize for TrialDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TrialDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TrialDateVisitor;

        impl<'de> Visitor<'de> for TrialDateVisitor {
            type Value = TrialDate;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a date in YYYY-MM-DD format")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<TrialDate, E> {
                TrialDate::parse(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(TrialDateVisitor)
    }
}

/// Administered dose in whole milligrams. Must be strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dosage(u32);

impl Dosage {
    pub fn parse(value: &str) -> Result<Self, TrialParseError> {
        let trimmed = value.trim();
        let parsed: i64 = trimmed
            .parse()
            .map_err(|_| TrialParseError::InvalidDosage(value.to_string()))?;
        if parsed <= 0 {
            return Err(TrialParseError::InvalidDosage(value.to_string()));
        }
        u32::try_from(parsed)
            .map(Self)
            .map_err(|_| TrialParseError::InvalidDosage(value.to_string()))
    }

    pub fn milligrams(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Dosage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recorded trial outcome. Matching is exact; `improved` or
/// `NO CHANGE` are not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Improved,
    #[serde(rename = "No Change")]
    NoChange,
    Worsened,
}

impl Outcome {
    pub fn parse(value: &str) -> Result<Self, TrialParseError> {
        match value {
            "Improved" => Ok(Self::Improved),
            "No Change" => Ok(Self::NoChange),
            "Worsened" => Ok(Self::Worsened),
            other => Err(TrialParseError::InvalidOutcome(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improved => "Improved",
            Self::NoChange => "No Change",
            Self::Worsened => "Worsened",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fully typed data row of a clinical-trial submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    #[serde(rename = "PatientID")]
    pub patient_id: String,
    #[serde(rename = "TrialCode")]
    pub trial_code: String,
    #[serde(rename = "DrugCode")]
    pub drug_code: String,
    #[serde(rename = "Dosage_mg")]
    pub dosage_mg: Dosage,
    #[serde(rename = "StartDate")]
    pub start_date: TrialDate,
    #[serde(rename = "EndDate")]
    pub end_date: TrialDate,
    #[serde(rename = "Outcome")]
    pub outcome: Outcome,
    #[serde(rename = "SideEffects")]
    pub side_effects: String,
    #[serde(rename = "Analyst")]
    pub analyst: String,
}
