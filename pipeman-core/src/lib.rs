//! Pipe Manager Core
//!
//! Core types and helpers shared by the pipeline compiler and the launcher.
//!
//! This crate contains:
//! - Domain types: the typed pipeline model (Pipeline, Task, Step, Trigger, etc.)
//! - DTOs: the object shape handed to the cluster API
//! - Name synthesis for cluster-safe identifiers
//! - The artifact/cache storage layout

pub mod domain;
pub mod dto;
pub mod names;
pub mod storage;

mod scalar;
