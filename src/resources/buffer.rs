//! Named GPU Buffers
//!
//! VBOs and IBOs are uploaded once and then shared by every pass that draws
//! with them. Ownership is explicit:
//!
//! - The [`ResourceTable`] holds one `Arc` per live name.
//! - Every object pass created with a buffer holds another `Arc`.
//! - When the last `Arc` drops, the buffer posts its GPU handle to the
//!   [`ReleaseQueue`]. The render context drains that queue on the render
//!   thread and deletes the handle through the backend.
//!
//! Removing a name therefore never invalidates passes already bound to it.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::{Result, StrataError};
use crate::renderer::backend::{GpuBufferId, GpuResource, GraphicsBackend};
use crate::resources::attributes::AttributeLayout;
use crate::resources::types::IndexType;

// ============================================================================
// Deferred release
// ============================================================================

/// Channel of GPU handles whose last owner has been dropped.
#[derive(Debug, Clone)]
pub struct ReleaseQueue {
    tx: flume::Sender<GpuResource>,
    rx: flume::Receiver<GpuResource>,
}

impl Default for ReleaseQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseQueue {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }

    #[must_use]
    pub fn sender(&self) -> flume::Sender<GpuResource> {
        self.tx.clone()
    }

    /// Number of handles waiting to be deleted.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Deletes every pending handle. Must run on the render thread.
    pub fn drain(&self, backend: &mut dyn GraphicsBackend) -> usize {
        let mut released = 0;
        for resource in self.rx.try_iter() {
            match resource {
                GpuResource::Buffer(id) => backend.delete_buffer(id),
                GpuResource::Program(id) => backend.delete_program(id),
            }
            released += 1;
        }
        released
    }
}

/// Posts `resource` for deletion when dropped.
struct ReleaseOnDrop {
    resource: GpuResource,
    tx: flume::Sender<GpuResource>,
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        // The receiver only disappears together with the render context, in
        // which case the backend is gone as well.
        let _ = self.tx.send(self.resource);
    }
}

impl fmt::Debug for ReleaseOnDrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReleaseOnDrop").field(&self.resource).finish()
    }
}

// ============================================================================
// Buffers
// ============================================================================

/// An uploaded vertex buffer and its interleaved attribute layout.
#[derive(Debug)]
pub struct VertexBuffer {
    name: String,
    gpu: GpuBufferId,
    byte_len: usize,
    layout: AttributeLayout,
    _release: ReleaseOnDrop,
}

impl VertexBuffer {
    pub(crate) fn new(
        name: &str,
        gpu: GpuBufferId,
        byte_len: usize,
        layout: AttributeLayout,
        release: flume::Sender<GpuResource>,
    ) -> Self {
        Self {
            name: name.to_string(),
            gpu,
            byte_len,
            layout,
            _release: ReleaseOnDrop {
                resource: GpuResource::Buffer(gpu),
                tx: release,
            },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn gpu_id(&self) -> GpuBufferId {
        self.gpu
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    #[must_use]
    pub fn layout(&self) -> &AttributeLayout {
        &self.layout
    }

    /// Number of whole vertices, or 0 for an empty layout.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        match self.layout.stride() {
            0 => 0,
            stride => self.byte_len / stride,
        }
    }
}

/// An uploaded index buffer.
#[derive(Debug)]
pub struct IndexBuffer {
    name: String,
    gpu: GpuBufferId,
    byte_len: usize,
    index_type: IndexType,
    _release: ReleaseOnDrop,
}

impl IndexBuffer {
    pub(crate) fn new(
        name: &str,
        gpu: GpuBufferId,
        byte_len: usize,
        index_type: IndexType,
        release: flume::Sender<GpuResource>,
    ) -> Self {
        Self {
            name: name.to_string(),
            gpu,
            byte_len,
            index_type,
            _release: ReleaseOnDrop {
                resource: GpuResource::Buffer(gpu),
                tx: release,
            },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn gpu_id(&self) -> GpuBufferId {
        self.gpu
    }

    #[must_use]
    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    #[must_use]
    pub fn index_count(&self) -> usize {
        self.byte_len / self.index_type.size()
    }
}

// ============================================================================
// Named tables
// ============================================================================

/// Resources that live in a [`ResourceTable`].
pub trait NamedResource {
    fn duplicate(name: &str) -> StrataError;
    fn not_found(name: &str) -> StrataError;
}

impl NamedResource for VertexBuffer {
    fn duplicate(name: &str) -> StrataError {
        StrataError::DuplicateVbo(name.to_string())
    }

    fn not_found(name: &str) -> StrataError {
        StrataError::VboNotFound(name.to_string())
    }
}

impl NamedResource for IndexBuffer {
    fn duplicate(name: &str) -> StrataError {
        StrataError::DuplicateIbo(name.to_string())
    }

    fn not_found(name: &str) -> StrataError {
        StrataError::IboNotFound(name.to_string())
    }
}

/// Name-keyed table of shared resources.
pub struct ResourceTable<T> {
    map: FxHashMap<String, Arc<T>>,
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self {
            map: FxHashMap::default(),
        }
    }
}

impl<T> fmt::Debug for ResourceTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTable")
            .field("names", &self.map.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: NamedResource> ResourceTable<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with the type's duplicate error if `name` is taken.
    ///
    /// Called before any GPU work so a rejected add leaves nothing behind.
    pub fn ensure_vacant(&self, name: &str) -> Result<()> {
        if self.map.contains_key(name) {
            return Err(T::duplicate(name));
        }
        Ok(())
    }

    pub fn insert(&mut self, name: &str, resource: T) -> Result<Arc<T>> {
        self.ensure_vacant(name)?;
        let shared = Arc::new(resource);
        self.map.insert(name.to_string(), Arc::clone(&shared));
        Ok(shared)
    }

    pub fn get(&self, name: &str) -> Result<Arc<T>> {
        self.map.get(name).cloned().ok_or_else(|| T::not_found(name))
    }

    /// Drops the table's reference. Passes still holding the resource keep it
    /// alive.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.map
            .remove(name)
            .map(drop)
            .ok_or_else(|| T::not_found(name))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}
