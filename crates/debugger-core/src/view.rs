//! Layered register view.
//!
//! [`RemoteView`] gives the execution engine a mutable register store over
//! immutable remote state. Every nested execution scope is a frame in an
//! arena; a frame owns only its own writes (its delta) and holds the index of
//! its parent frame. Reads resolve delta first, then the parent chain, then
//! the shared read [`Pipeline`]. Writes only ever land in the frame they were
//! issued against.
//!
//! Frames are addressed by [`ScopeId`] handles. A handle carries the
//! generation of the slot it was issued for, so a handle kept past a merge or
//! discard is rejected instead of silently aliasing a reused slot.

use std::collections::HashMap;

use debugger_types::{DebuggerError, DebuggerResult, RegisterId, RegisterValue};
use register_fetcher::Pipeline;
use tracing::{debug, trace};

/// Handle to one scope of a [`RemoteView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId {
    index: usize,
    generation: u64,
}

impl ScopeId {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Default)]
struct ViewFrame {
    parent: Option<usize>,
    depth: usize,
    live_children: usize,
    delta: HashMap<RegisterId, RegisterValue>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    frame: Option<ViewFrame>,
}

/// Copy-on-write register view backed by a read pipeline.
#[derive(Debug)]
pub struct RemoteView {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: ScopeId,
    pipeline: Pipeline,
}

impl RemoteView {
    /// Create a view with a single, empty root scope.
    pub fn new(pipeline: Pipeline) -> Self {
        let slots = vec![Slot {
            generation: 0,
            frame: Some(ViewFrame::default()),
        }];
        Self {
            slots,
            free: Vec::new(),
            root: ScopeId {
                index: 0,
                generation: 0,
            },
            pipeline,
        }
    }

    /// The outermost scope. It lives as long as the view.
    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn block_height(&self) -> u64 {
        self.pipeline.block_height()
    }

    /// Resolve a register: own delta, then ancestors, then the pipeline.
    pub fn get(&mut self, scope: ScopeId, id: &RegisterId) -> DebuggerResult<RegisterValue> {
        let mut cursor = Some(self.frame(scope)?);
        while let Some(frame) = cursor {
            if let Some(value) = frame.delta.get(id) {
                trace!(register = %id, depth = frame.depth, "register served from view delta");
                return Ok(value.clone());
            }
            cursor = frame.parent.and_then(|parent| self.slots[parent].frame.as_ref());
        }
        self.pipeline.fetch(id)
    }

    /// Write into the delta of `scope` only.
    pub fn set(
        &mut self,
        scope: ScopeId,
        id: RegisterId,
        value: RegisterValue,
    ) -> DebuggerResult<()> {
        trace!(register = %id, bytes = value.len(), "register written to view delta");
        self.frame_mut(scope)?.delta.insert(id, value);
        Ok(())
    }

    /// The value `scope` itself wrote for `id`, ignoring ancestors and remote state.
    pub fn peek(&self, scope: ScopeId, id: &RegisterId) -> DebuggerResult<Option<RegisterValue>> {
        Ok(self.frame(scope)?.delta.get(id).cloned())
    }

    /// Accepted for engine compatibility. Reads are already tracked by the pipeline.
    pub fn touch(&self, scope: ScopeId, _id: &RegisterId) -> DebuggerResult<()> {
        self.frame(scope).map(|_| ())
    }

    /// Open a nested scope whose reads fall back to `parent`.
    pub fn new_child(&mut self, parent: ScopeId) -> DebuggerResult<ScopeId> {
        let depth = {
            let frame = self.frame_mut(parent)?;
            frame.live_children += 1;
            frame.depth + 1
        };
        let frame = ViewFrame {
            parent: Some(parent.index),
            depth,
            live_children: 0,
            delta: HashMap::new(),
        };

        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].frame = Some(frame);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    frame: Some(frame),
                });
                self.slots.len() - 1
            }
        };
        let child = ScopeId {
            index,
            generation: self.slots[index].generation,
        };
        debug!(scope = index, depth, "opened view scope");
        Ok(child)
    }

    /// Fold `child`'s writes into `parent` and close `child`.
    ///
    /// Writes in `child` overwrite `parent`'s. Sibling scopes merged one after
    /// another follow the same rule, so the last merge wins.
    pub fn merge(&mut self, parent: ScopeId, child: ScopeId) -> DebuggerResult<()> {
        self.frame(parent)?;
        let child_frame = self.frame(child)?;
        if child_frame.parent != Some(parent.index) {
            return Err(DebuggerError::contract_violation(format!(
                "scope {} is not a direct child of scope {}",
                child.index, parent.index
            )));
        }
        if child_frame.live_children > 0 {
            return Err(DebuggerError::contract_violation(format!(
                "scope {} still has {} open child scope(s)",
                child.index, child_frame.live_children
            )));
        }

        let delta = self.release(child)?;
        debug!(
            scope = child.index,
            into = parent.index,
            registers = delta.len(),
            "merged view scope"
        );
        self.frame_mut(parent)?.delta.extend(delta);
        Ok(())
    }

    /// Close `scope` and throw away its writes.
    pub fn discard(&mut self, scope: ScopeId) -> DebuggerResult<()> {
        if scope == self.root {
            return Err(DebuggerError::contract_violation(
                "the root scope cannot be discarded",
            ));
        }
        let live_children = self.frame(scope)?.live_children;
        if live_children > 0 {
            return Err(DebuggerError::contract_violation(format!(
                "scope {} still has {} open child scope(s)",
                scope.index, live_children
            )));
        }
        let delta = self.release(scope)?;
        debug!(scope = scope.index, registers = delta.len(), "discarded view scope");
        Ok(())
    }

    /// Roll back the writes of `scope` only. Ancestors are untouched.
    pub fn drop_changes(&mut self, scope: ScopeId) -> DebuggerResult<()> {
        let frame = self.frame_mut(scope)?;
        debug!(scope = scope.index, registers = frame.delta.len(), "dropped view scope changes");
        frame.delta.clear();
        Ok(())
    }

    /// Nesting depth of `scope`; the root is 0.
    pub fn depth(&self, scope: ScopeId) -> DebuggerResult<usize> {
        Ok(self.frame(scope)?.depth)
    }

    /// Number of registers written in `scope` itself.
    pub fn delta_len(&self, scope: ScopeId) -> DebuggerResult<usize> {
        Ok(self.frame(scope)?.delta.len())
    }

    /// Every register ever touched. Not available against sparse remote state.
    pub fn all_registers(&self) -> DebuggerResult<Vec<RegisterId>> {
        Err(DebuggerError::unsupported("all_registers"))
    }

    /// The accumulated write set. Not available against sparse remote state.
    pub fn register_updates(&self) -> DebuggerResult<Vec<(RegisterId, RegisterValue)>> {
        Err(DebuggerError::unsupported("register_updates"))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    pub fn into_pipeline(self) -> Pipeline {
        self.pipeline
    }

    fn frame(&self, scope: ScopeId) -> DebuggerResult<&ViewFrame> {
        match self.slots.get(scope.index) {
            Some(slot) if slot.generation == scope.generation => {
                slot.frame.as_ref().ok_or_else(|| stale(scope))
            }
            _ => Err(stale(scope)),
        }
    }

    fn frame_mut(&mut self, scope: ScopeId) -> DebuggerResult<&mut ViewFrame> {
        match self.slots.get_mut(scope.index) {
            Some(slot) if slot.generation == scope.generation => {
                slot.frame.as_mut().ok_or_else(|| stale(scope))
            }
            _ => Err(stale(scope)),
        }
    }

    fn release(&mut self, scope: ScopeId) -> DebuggerResult<HashMap<RegisterId, RegisterValue>> {
        self.frame(scope)?;
        let slot = &mut self.slots[scope.index];
        let frame = slot.frame.take().ok_or_else(|| stale(scope))?;
        slot.generation += 1;
        self.free.push(scope.index);

        if let Some(parent) = frame.parent {
            if let Some(parent) = self.slots[parent].frame.as_mut() {
                parent.live_children = parent.live_children.saturating_sub(1);
            }
        }
        Ok(frame.delta)
    }
}

fn stale(scope: ScopeId) -> DebuggerError {
    DebuggerError::contract_violation(format!(
        "scope {} (generation {}) is no longer open",
        scope.index, scope.generation
    ))
}
