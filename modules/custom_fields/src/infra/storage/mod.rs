//! Storage layer - database entities, repositories and the in-memory store

pub mod entity;
pub mod mapper;
pub mod memory;
pub mod migrations;
pub mod repositories;

pub use memory::InMemoryFieldStore;
pub use repositories::SeaOrmFieldRepository;
