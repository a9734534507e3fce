//! Test utilities for integration testing.
//!
//! This module provides:
//! - An in-memory subscription store for mocking persistence
//! - Mock store gateways with canned responses
//! - Factories for claims and signed test tokens
//! - A builder for constructing `AppState` with test dependencies

mod app_state_builder;
mod factories;
mod gateway_mocks;
mod store_mocks;

pub use app_state_builder::*;
pub use factories::*;
pub use gateway_mocks::*;
pub use store_mocks::*;
