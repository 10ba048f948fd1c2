// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Lock Configuration
//!
//! ```
//! use std::time::Duration;
//! use typed_sql_lock::LockConfig;
//!
//! let config: LockConfig = serde_json::from_str(r#"{ "acquire_timeout_ms": 250 }"#).unwrap();
//! assert_eq!(config.acquire_timeout, Some(Duration::from_millis(250)));
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Settings for [`LockManager`](crate::LockManager)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Upper bound for each single table-lock acquisition; `None` waits forever
    #[serde(rename = "acquire_timeout_ms", deserialize_with = "millis")]
    pub acquire_timeout: Option<Duration>,
}

impl LockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }
}

fn millis<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}
