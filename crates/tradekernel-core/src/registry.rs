//! Kernel registry.
//!
//! The registry stores metadata for every published kernel so a host can list
//! and look them up by id, domain or mode.

use crate::domain::Domain;
use crate::error::{KernelError, Result};
use crate::kernel::{KernelMetadata, KernelMode};
use hashbrown::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Registry statistics.
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    /// Total number of registered kernels.
    pub total: usize,
    /// Number of batch kernels.
    pub batch_kernels: usize,
    /// Number of stateful kernels.
    pub stateful_kernels: usize,
    /// Kernels by domain.
    pub by_domain: HashMap<Domain, usize>,
}

/// Central registry for kernel metadata.
#[derive(Debug, Default)]
pub struct KernelRegistry {
    kernels: RwLock<HashMap<String, KernelMetadata>>,
}

impl KernelRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written entry, so a
    // poisoned lock is still safe to read through.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, KernelMetadata>> {
        self.kernels.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, KernelMetadata>> {
        self.kernels.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a kernel.
    ///
    /// # Errors
    ///
    /// Returns `KernelAlreadyRegistered` if the id is taken.
    pub fn register(&self, metadata: KernelMetadata) -> Result<()> {
        let id = metadata.id.clone();
        let mut kernels = self.write();

        if kernels.contains_key(&id) {
            return Err(KernelError::KernelAlreadyRegistered(id));
        }

        debug!(kernel_id = %id, domain = %metadata.domain, mode = %metadata.mode, "Registering kernel");
        kernels.insert(id, metadata);
        Ok(())
    }

    /// Get a kernel by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<KernelMetadata> {
        self.read().get(id).cloned()
    }

    /// Get a kernel by ID or fail with `KernelNotFound`.
    pub fn require(&self, id: &str) -> Result<KernelMetadata> {
        self.get(id).ok_or_else(|| KernelError::not_found(id))
    }

    /// Check if a kernel exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// All kernel IDs, sorted.
    #[must_use]
    pub fn all_kernel_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Get kernels by domain, sorted by id.
    #[must_use]
    pub fn by_domain(&self, domain: Domain) -> Vec<KernelMetadata> {
        let mut result: Vec<KernelMetadata> = self
            .read()
            .values()
            .filter(|m| m.domain == domain)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.id.cmp(&b.id));
        result
    }

    /// Get kernels by mode.
    #[must_use]
    pub fn by_mode(&self, mode: KernelMode) -> Vec<KernelMetadata> {
        self.read()
            .values()
            .filter(|m| m.mode == mode)
            .cloned()
            .collect()
    }

    /// Get registry statistics.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let kernels = self.read();
        let mut stats = RegistryStats {
            total: kernels.len(),
            ..Default::default()
        };

        for meta in kernels.values() {
            match meta.mode {
                KernelMode::Batch => stats.batch_kernels += 1,
                KernelMode::Stateful => stats.stateful_kernels += 1,
            }
            *stats.by_domain.entry(meta.domain).or_default() += 1;
        }

        stats
    }

    /// Total number of registered kernels.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.read().len()
    }

    /// Clear all registered kernels.
    pub fn clear(&self) {
        self.write().clear();
        info!("Cleared kernel registry");
    }

    /// Unregister a kernel by ID.
    pub fn unregister(&self, id: &str) -> bool {
        if self.write().remove(id).is_some() {
            debug!(kernel_id = %id, "Unregistered kernel");
            return true;
        }
        warn!(kernel_id = %id, "Attempted to unregister non-existent kernel");
        false
    }
}

/// Builder for kernel registry.
#[derive(Debug, Default)]
pub struct KernelRegistryBuilder {
    entries: Vec<KernelMetadata>,
}

impl KernelRegistryBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a kernel.
    #[must_use]
    pub fn with_kernel(mut self, metadata: KernelMetadata) -> Self {
        self.entries.push(metadata);
        self
    }

    /// Build the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if two entries share an id.
    pub fn build(self) -> Result<KernelRegistry> {
        let registry = KernelRegistry::new();
        for entry in self.entries {
            registry.register(entry)?;
        }

        info!(total = registry.total_count(), "Built kernel registry");
        Ok(registry)
    }
}
