//! Execution profiles.
//!
//! A [`Profile`] is a call graph sampled at statement boundaries: a
//! deduplicated function table, one location per function, and an ordered
//! list of samples weighted by the computation spent since the previous
//! sample. [`ProfileBuilder`] produces it from statement callbacks and
//! [`pprof`] serializes it.

mod builder;
pub mod pprof;

pub use builder::{ProfileBuilder, PROFILE_FILE_NAME};

use serde::{Deserialize, Serialize};

pub const SAMPLE_TYPE: &str = "execution effort";
pub const SAMPLE_UNIT: &str = "effort";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueType {
    pub kind: String,
    pub unit: String,
}

impl Default for ValueType {
    fn default() -> Self {
        Self {
            kind: SAMPLE_TYPE.to_string(),
            unit: SAMPLE_UNIT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub id: u64,
    pub name: String,
    pub system_name: String,
    /// Declaring type or location of the function.
    pub filename: String,
    pub start_line: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub function_id: u64,
    pub line: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: u64,
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Location ids, innermost frame first.
    pub location_ids: Vec<u64>,
    pub value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub sample_type: ValueType,
    pub functions: Vec<Function>,
    pub locations: Vec<Location>,
    pub samples: Vec<Sample>,
}

impl Profile {
    pub fn function(&self, id: u64) -> Option<&Function> {
        self.functions.iter().find(|f| f.id == id)
    }

    pub fn location(&self, id: u64) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// Sum of all sample values.
    pub fn total_value(&self) -> i64 {
        self.samples.iter().map(|s| s.value).sum()
    }

    /// Function names of a sample's stack, innermost first.
    pub fn sample_stack(&self, sample: &Sample) -> Vec<&str> {
        sample
            .location_ids
            .iter()
            .filter_map(|id| self.location(*id))
            .flat_map(|loc| loc.lines.iter())
            .filter_map(|line| self.function(line.function_id))
            .map(|f| f.name.as_str())
            .collect()
    }

    pub fn encode_pprof(&self) -> Vec<u8> {
        pprof::encode(self)
    }
}
