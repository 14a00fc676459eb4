//! Core persistence and application layer for the roster service.
//!
//! The crate is storage-agnostic: aggregates are mapped to flat records by the
//! [`mapping`] registry, persisted through the [`storage`] port inside a
//! [`unit_of_work`], and reached from the outside only through the
//! [`mediator`] dispatcher.

pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod mapping;
pub mod mediator;
pub mod records;
pub mod repository;
pub mod result;
pub mod storage;
pub mod unit_of_work;
pub mod usecases;

pub use errors::{Error, Result};
