//! Data Transfer Objects for the cluster boundary
//!
//! This module contains the objects handed to the deployer. They wrap the
//! normalized domain types in the envelope the cluster API expects.

pub mod pipeline;
