//! Infrastructure layer - storage adapters for the domain ports

pub mod storage;
