use std::any::Any;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use debugger_types::DebuggerResult;
use tracing::{debug, trace};

use super::{Function, Line, Location, Profile, Sample};
use crate::engine::{StatementEvent, StatementHandler};

pub const PROFILE_FILE_NAME: &str = "profile.pb";

/// Builds a [`Profile`] from statement callbacks.
///
/// Each callback becomes one sample weighted by the computation used since
/// the previous sampled callback. Functions are keyed by declaring type and
/// invoked name; the first sighting allocates a function and a location, both
/// with the next id, and every later sighting reuses them.
#[derive(Debug, Default)]
pub struct ProfileBuilder {
    profile: Profile,
    ids: HashMap<(String, String), u64>,
    last_computation: u64,
    export_dir: Option<PathBuf>,
}

impl ProfileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `profile.pb` into `dir` on finalize.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn into_profile(self) -> Profile {
        self.profile
    }

    /// Record one statement.
    pub fn record(&mut self, event: &StatementEvent<'_>) -> DebuggerResult<()> {
        if event.stack.is_empty() {
            trace!(computation_used = event.computation_used, "statement outside any frame, no sample");
            return Ok(());
        }

        // Resolve every frame before touching any table so a rejected frame
        // leaves the builder unchanged.
        let mut resolved = Vec::with_capacity(event.stack.len());
        for frame in event.stack {
            let (name, line) = frame.resolve_name()?;
            resolved.push((frame.declaring_type.as_str(), name, line));
        }

        let value = event.computation_used.saturating_sub(self.last_computation);
        self.last_computation = event.computation_used;

        // Ids follow stack order (outermost first); samples want innermost first.
        let ids: Vec<u64> = resolved
            .into_iter()
            .map(|(filename, name, line)| self.intern(filename, name, line))
            .collect();
        let location_ids = ids.into_iter().rev().collect();

        self.profile.samples.push(Sample {
            location_ids,
            value: i64::try_from(value).unwrap_or(i64::MAX),
        });
        Ok(())
    }

    fn intern(&mut self, filename: &str, name: &str, line: u32) -> u64 {
        let key = (filename.to_string(), name.to_string());
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }

        let id = self.profile.functions.len() as u64 + 1;
        debug!(id, filename, function = name, "new profiled function");
        self.profile.functions.push(Function {
            id,
            name: name.to_string(),
            system_name: name.to_string(),
            filename: filename.to_string(),
            start_line: i64::from(line),
        });
        self.profile.locations.push(Location {
            id,
            lines: vec![Line {
                function_id: id,
                line: i64::from(line),
            }],
        });
        self.ids.insert(key, id);
        id
    }

    /// Write the pprof encoding of the profile to `dir/profile.pb`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        let path = dir.join(PROFILE_FILE_NAME);
        fs::write(&path, self.profile.encode_pprof())
            .with_context(|| format!("Failed to write profile to {}", path.display()))?;
        debug!(
            path = %path.display(),
            samples = self.profile.samples.len(),
            functions = self.profile.functions.len(),
            "saved execution profile"
        );
        Ok(path)
    }
}

impl StatementHandler for ProfileBuilder {
    fn name(&self) -> &'static str {
        "profile_builder"
    }

    fn on_statement(&mut self, event: &StatementEvent<'_>) -> DebuggerResult<()> {
        self.record(event)
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(dir) = &self.export_dir {
            self.save(dir)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
