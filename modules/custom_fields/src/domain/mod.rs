//! Domain layer - business logic and services

pub mod dispatch;
pub mod normalizer;
pub mod persistence;
pub mod repository;
pub mod service;
pub mod validation;

pub use dispatch::{control_for, control_spec, Coercion, ControlSpec};
pub use persistence::{BatchReport, UpsertCommand, UpsertOutcome};
pub use repository::{DefinitionSource, UploadSink, ValueSink};
pub use service::Service;
