// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for typed-sql
//!
//! This crate provides common testing components including:
//! - IR fixtures built from the sample `Student` schema
//! - Round-trip and rendering assertions
//! - A YAML render-case format and its parser
//! - Tracing initialisation for tests

pub mod assertions;
pub mod fixtures;
pub mod test_case_parser;

use std::sync::Once;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Re-exports for convenience
pub use assertions::IrAssertions;
pub use fixtures::IrFixtures;
pub use test_case_parser::{ParseError, RenderCase, parse_case_content, parse_case_file};

/// Install a fmt subscriber honouring `RUST_LOG`; later calls are no-ops
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        // another harness may have installed one already
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
