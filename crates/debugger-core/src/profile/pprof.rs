//! pprof encoding.
//!
//! Message definitions follow `perftools.profiles.Profile` (profile.proto);
//! only the fields the debugger populates are declared. Output is the raw,
//! uncompressed protobuf.

use std::collections::HashMap;

use prost::Message;

use super::Profile;

#[derive(Clone, PartialEq, Message)]
pub struct PbProfile {
    #[prost(message, repeated, tag = "1")]
    pub sample_type: Vec<PbValueType>,
    #[prost(message, repeated, tag = "2")]
    pub sample: Vec<PbSample>,
    #[prost(message, repeated, tag = "4")]
    pub location: Vec<PbLocation>,
    #[prost(message, repeated, tag = "5")]
    pub function: Vec<PbFunction>,
    #[prost(string, repeated, tag = "6")]
    pub string_table: Vec<String>,
    #[prost(message, optional, tag = "11")]
    pub period_type: Option<PbValueType>,
    #[prost(int64, tag = "12")]
    pub period: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbValueType {
    #[prost(int64, tag = "1")]
    pub r#type: i64,
    #[prost(int64, tag = "2")]
    pub unit: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbSample {
    #[prost(uint64, repeated, tag = "1")]
    pub location_id: Vec<u64>,
    #[prost(int64, repeated, tag = "2")]
    pub value: Vec<i64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbLocation {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(message, repeated, tag = "4")]
    pub line: Vec<PbLine>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbLine {
    #[prost(uint64, tag = "1")]
    pub function_id: u64,
    #[prost(int64, tag = "2")]
    pub line: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct PbFunction {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(int64, tag = "2")]
    pub name: i64,
    #[prost(int64, tag = "3")]
    pub system_name: i64,
    #[prost(int64, tag = "4")]
    pub filename: i64,
    #[prost(int64, tag = "5")]
    pub start_line: i64,
}

/// pprof string table. Index 0 is always the empty string.
#[derive(Debug)]
struct StringTable {
    strings: Vec<String>,
    index: HashMap<String, i64>,
}

impl StringTable {
    fn new() -> Self {
        let mut table = Self {
            strings: Vec::new(),
            index: HashMap::new(),
        };
        table.intern("");
        table
    }

    fn intern(&mut self, s: &str) -> i64 {
        if let Some(i) = self.index.get(s) {
            return *i;
        }
        let i = self.strings.len() as i64;
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), i);
        i
    }
}

pub fn to_message(profile: &Profile) -> PbProfile {
    let mut strings = StringTable::new();
    let sample_type = PbValueType {
        r#type: strings.intern(&profile.sample_type.kind),
        unit: strings.intern(&profile.sample_type.unit),
    };

    let function = profile
        .functions
        .iter()
        .map(|f| PbFunction {
            id: f.id,
            name: strings.intern(&f.name),
            system_name: strings.intern(&f.system_name),
            filename: strings.intern(&f.filename),
            start_line: f.start_line,
        })
        .collect();

    let location = profile
        .locations
        .iter()
        .map(|l| PbLocation {
            id: l.id,
            line: l
                .lines
                .iter()
                .map(|line| PbLine {
                    function_id: line.function_id,
                    line: line.line,
                })
                .collect(),
        })
        .collect();

    let sample = profile
        .samples
        .iter()
        .map(|s| PbSample {
            location_id: s.location_ids.clone(),
            value: vec![s.value],
        })
        .collect();

    PbProfile {
        sample_type: vec![sample_type.clone()],
        sample,
        location,
        function,
        string_table: strings.strings,
        period_type: Some(sample_type),
        period: 1,
    }
}

/// Encode `profile` as an uncompressed pprof protobuf.
pub fn encode(profile: &Profile) -> Vec<u8> {
    to_message(profile).encode_to_vec()
}
