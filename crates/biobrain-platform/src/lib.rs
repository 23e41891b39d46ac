//! Browser adapters for the ports defined in `biobrain-core`.

pub mod storage;
pub mod llm;
pub mod image;
