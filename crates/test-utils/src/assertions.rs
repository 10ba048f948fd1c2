// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! IR-specific test helpers and custom assertions

use typed_sql_ir::{IrError, IrResult, NodeRegistry, SqlNode};

use crate::test_case_parser::RenderCase;

/// Custom assertion helpers for IR testing
pub struct IrAssertions;

impl IrAssertions {
    /// Assert that `node` revives from its JSON into a node with identical JSON
    pub fn assert_round_trip<N: SqlNode>(node: &N) {
        Self::assert_round_trip_with(NodeRegistry::global(), node);
    }

    /// [`assert_round_trip`](Self::assert_round_trip) reviving through `registry`
    pub fn assert_round_trip_with<N: SqlNode>(registry: &NodeRegistry, node: &N) {
        let json = node
            .to_json()
            .unwrap_or_else(|e| panic!("{} does not serialize: {}", node.classname(), e));
        let revived = registry
            .revive(&json)
            .unwrap_or_else(|e| panic!("{} does not revive: {}", node.classname(), e));
        let revived_json = revived
            .to_json()
            .unwrap_or_else(|e| panic!("revived {} does not serialize: {}", node.classname(), e));
        assert_eq!(revived_json, json, "Round trip changed {}", node.classname());
        assert_eq!(
            revived.to_string(),
            node.to_string(),
            "Round trip changed the SQL of {}",
            node.classname()
        );
    }

    /// Assert that `node` renders exactly `sql`
    pub fn assert_renders<N: SqlNode>(node: &N, sql: &str) {
        match node.to_sql() {
            Ok(rendered) => assert_eq!(rendered, sql, "Unexpected SQL for {}", node.classname()),
            Err(e) => panic!("{} does not render: {}", node.classname(), e),
        }
    }

    /// Assert that a result failed with a malformed-construct error
    pub fn assert_malformed<T: std::fmt::Debug>(result: IrResult<T>) -> IrError {
        match result {
            Err(e) if e.is_malformed() => e,
            other => panic!("Expected a malformed-construct error, found {:?}", other),
        }
    }

    /// Revive the case's JSON and check it against the expected SQL or error
    pub fn assert_case(case: &RenderCase) {
        let registry = NodeRegistry::with_dialect(case.dialect);
        let result = registry
            .revive_str(&case.json)
            .and_then(|node| node.to_sql().map(|sql| (node, sql)));
        match (&case.error, result) {
            (Some(expected), Err(e)) => assert!(
                format!("{:?}", e).starts_with(expected.as_str()),
                "{}: expected {} error, found {:?}",
                case.description,
                expected,
                e
            ),
            (Some(expected), Ok((_, sql))) => panic!(
                "{}: expected {} error, rendered {}",
                case.description, expected, sql
            ),
            (None, Err(e)) => panic!("{}: unexpected error {}", case.description, e),
            (None, Ok((node, sql))) => {
                if let Some(expected) = &case.sql {
                    assert_eq!(&sql, expected, "{}", case.description);
                }
                Self::assert_round_trip_with(&registry, &node);
            }
        }
    }
}
