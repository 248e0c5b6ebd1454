// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stock node sets built on the core engine.

pub mod calculator;

pub use calculator::create_calculator_registry;
