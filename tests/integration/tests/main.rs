//! End-to-End Integration Tests
//!
//! These tests drive the identity runtime through its public API only:
//! producer, factory, facade and the file-backed store.

mod common;
mod configuration;
mod dispatch;
mod group_management;
mod persistence;
