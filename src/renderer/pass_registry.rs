//! Pass Registry
//!
//! `PassRegistry` holds the ordered list of named rendering passes.
//! Every frame renders the passes front to back. Each entry records which
//! objects render under it and carries its own pre/post hooks; the registry
//! itself carries the hooks that wrap the whole sequence.
//!
//! The default pass ([`DEFAULT_PASS`]) is created with the registry and can
//! never be removed.

use std::fmt;

use crate::errors::{Result, StrataError};
use crate::renderer::hooks::PassHook;

/// Name of the always-present fallback pass.
pub const DEFAULT_PASS: &str = "strata_default";

/// One named pass and its ordered member objects.
pub struct PassEntry {
    name: String,
    members: Vec<String>,
    pub(crate) pre_hooks: Vec<PassHook>,
    pub(crate) post_hooks: Vec<PassHook>,
}

impl fmt::Debug for PassEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassEntry")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("pre_hooks", &self.pre_hooks.len())
            .field("post_hooks", &self.post_hooks.len())
            .finish()
    }
}

impl PassEntry {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: Vec::new(),
            pre_hooks: Vec::new(),
            post_hooks: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member objects in the order they joined.
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }

    #[must_use]
    pub fn contains(&self, object: &str) -> bool {
        self.members.iter().any(|m| m == object)
    }
}

/// Ordered registry of rendering passes.
pub struct PassRegistry {
    passes: Vec<PassEntry>,
    pub(crate) begin_hooks: Vec<PassHook>,
    pub(crate) end_hooks: Vec<PassHook>,
}

impl fmt::Debug for PassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassRegistry")
            .field("passes", &self.passes)
            .field("begin_hooks", &self.begin_hooks.len())
            .field("end_hooks", &self.end_hooks.len())
            .finish()
    }
}

impl Default for PassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PassRegistry {
    /// Creates a registry holding only the default pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            passes: vec![PassEntry::new(DEFAULT_PASS)],
            begin_hooks: Vec::new(),
            end_hooks: Vec::new(),
        }
    }

    /// Inserts a pass that renders before every existing pass.
    pub fn add_to_front(&mut self, name: &str) -> Result<()> {
        self.ensure_vacant(name)?;
        self.passes.insert(0, PassEntry::new(name));
        Ok(())
    }

    /// Inserts a pass that renders after every existing pass.
    pub fn add_to_back(&mut self, name: &str) -> Result<()> {
        self.ensure_vacant(name)?;
        self.passes.push(PassEntry::new(name));
        Ok(())
    }

    /// Removes a pass together with its membership and hooks.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        if name == DEFAULT_PASS {
            return Err(StrataError::DefaultPassRemoval);
        }
        let index = self.index_of(name)?;
        self.passes.remove(index);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.passes.iter().any(|p| p.name == name)
    }

    pub fn get(&self, name: &str) -> Result<&PassEntry> {
        let index = self.index_of(name)?;
        Ok(&self.passes[index])
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Result<&mut PassEntry> {
        let index = self.index_of(name)?;
        Ok(&mut self.passes[index])
    }

    /// Pass names in rendering order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.passes.iter().map(|p| p.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &PassEntry> {
        self.passes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Always `false`: the default pass is always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.passes
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| StrataError::PassNotFound(name.to_string()))
    }

    fn ensure_vacant(&self, name: &str) -> Result<()> {
        if self.contains(name) {
            return Err(StrataError::DuplicatePass(name.to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Adds `object` to the members of `pass`. Adding twice is a no-op.
    pub fn add_member(&mut self, pass: &str, object: &str) -> Result<()> {
        let entry = self.get_mut(pass)?;
        if !entry.contains(object) {
            entry.members.push(object.to_string());
        }
        Ok(())
    }

    /// Removes `object` from `pass`. Returns whether it was a member.
    pub fn remove_member(&mut self, pass: &str, object: &str) -> bool {
        self.get_mut(pass).is_ok_and(|entry| {
            let before = entry.members.len();
            entry.members.retain(|m| m != object);
            before != entry.members.len()
        })
    }

    /// Removes `object` from every pass.
    pub fn remove_object(&mut self, object: &str) {
        for entry in &mut self.passes {
            entry.members.retain(|m| m != object);
        }
    }

    pub fn clear_members(&mut self) {
        for entry in &mut self.passes {
            entry.members.clear();
        }
    }

    #[must_use]
    pub fn is_object_in_pass(&self, object: &str, pass: &str) -> bool {
        self.get(pass).is_ok_and(|entry| entry.contains(object))
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    pub fn add_begin_all_hook(&mut self, hook: PassHook) {
        self.begin_hooks.push(hook);
    }

    pub fn add_end_all_hook(&mut self, hook: PassHook) {
        self.end_hooks.push(hook);
    }

    pub fn add_pre_pass_hook(&mut self, pass: &str, hook: PassHook) -> Result<()> {
        self.get_mut(pass)?.pre_hooks.push(hook);
        Ok(())
    }

    pub fn add_post_pass_hook(&mut self, pass: &str, hook: PassHook) -> Result<()> {
        self.get_mut(pass)?.post_hooks.push(hook);
        Ok(())
    }

    #[must_use]
    pub fn has_hooks(&self) -> bool {
        !self.begin_hooks.is_empty()
            || !self.end_hooks.is_empty()
            || self
                .passes
                .iter()
                .any(|p| !p.pre_hooks.is_empty() || !p.post_hooks.is_empty())
    }
}
