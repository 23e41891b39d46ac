//! Pick a storage backend from the configured preference.
//!
//! Priority for `Auto`: localStorage → Memory (fallback).

use std::rc::Rc;
use biobrain_core::ports::StoragePort;
use biobrain_types::config::StorageBackendType;
use super::{LocalStorage, MemoryStorage};

/// Try to open the best available storage backend.
/// Returns a trait object so callers are backend-agnostic.
pub fn auto_detect_storage() -> Rc<dyn StoragePort> {
    match LocalStorage::open() {
        Ok(local) => {
            log::info!("Storage backend: localStorage");
            Rc::new(local)
        }
        Err(e) => {
            log::warn!("localStorage unavailable ({}), falling back to memory", e);
            Rc::new(MemoryStorage::new())
        }
    }
}

pub fn open_storage(backend: &StorageBackendType) -> Rc<dyn StoragePort> {
    match backend {
        StorageBackendType::Auto | StorageBackendType::LocalStorage => auto_detect_storage(),
        StorageBackendType::Memory => {
            log::info!("Storage backend: memory (configured)");
            Rc::new(MemoryStorage::new())
        }
    }
}
