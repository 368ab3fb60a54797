//! The reference tables.
//!
//! One table is scoped to exactly one encode or decode call (unless the
//! session explicitly opts into sharing across sequential calls). The
//! encode side maps shared-allocation addresses to integer ids in
//! first-visit order; the decode side maps ids back to live handles,
//! registered as soon as the wrapper is allocated and before its pointee is
//! populated, which is what lets self- and mutually-referencing graphs
//! resolve.

use std::collections::HashMap;

use crate::Error;
use crate::value::{Shared, Value, ValueRef};

/// The first reference id ever assigned in a pass.
const FIRST_ID: u32 = 1;

// -----------------------------------------------------------------------------
// EncodeRefs

/// Identity → id table for one encode pass.
pub(crate) struct EncodeRefs {
    ids: HashMap<usize, u32>,
    next: u32,
}

impl EncodeRefs {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            next: FIRST_ID,
        }
    }

    /// Forgets every assignment and restarts the id sequence.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.next = FIRST_ID;
    }

    /// Returns the id previously assigned to this identity.
    pub fn get(&self, identity: usize) -> Option<u32> {
        self.ids.get(&identity).copied()
    }

    /// Assigns the next id to a first-visited identity.
    pub fn assign(&mut self, identity: usize) -> u32 {
        let id = self.next;
        self.next += 1;
        self.ids.insert(identity, id);
        id
    }
}

// -----------------------------------------------------------------------------
// DecodeRefs

/// Id → handle table for one decode pass.
pub(crate) struct DecodeRefs {
    handles: HashMap<u32, Box<dyn Value>>,
}

impl DecodeRefs {
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Forgets every registration.
    pub fn clear(&mut self) {
        self.handles.clear();
    }

    /// Registers a shared handle under a stream id.
    pub fn register(&mut self, id: u32, handle: Box<dyn Value>) -> Result<(), Error> {
        if self.handles.insert(id, handle).is_some() {
            return Err(Error::format(format!("reference id {id} registered twice")));
        }
        Ok(())
    }

    /// Resolves a back-reference into a fresh handle aliasing the registered
    /// allocation.
    pub fn resolve(&self, id: u32) -> Result<Box<dyn Value>, Error> {
        let handle = self
            .handles
            .get(&id)
            .ok_or_else(|| Error::format(format!("back-reference to unregistered id {id}")))?;
        match handle.value_ref() {
            ValueRef::Shared(shared) => Ok(shared.clone_shared()),
            _ => Err(Error::format(format!(
                "reference id {id} does not name a shared instance"
            ))),
        }
    }
}
