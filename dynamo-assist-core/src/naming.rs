/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Canonical attribute and index names.
//!
//! Tables built with this crate store the primary key in `pk`/`sk` and secondary index
//! `N` in `gsi{N}_pk`/`gsi{N}_sk`. Local indexes share `pk` and add `lsi{N}_sk`. Index
//! names passed to queries must match these prefixes.

/// Primary partition-key attribute.
pub const PK: &str = "pk";

/// Primary sort-key attribute.
pub const SK: &str = "sk";

/// Names for global secondary index `n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GsiNames {
    /// Index name, `gsi{n}`.
    pub index: String,
    /// Partition attribute, `gsi{n}_pk`.
    pub partition: String,
    /// Sort attribute, `gsi{n}_sk`.
    pub sort: String,
}

/// Names for local secondary index `n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsiNames {
    /// Index name, `lsi{n}`.
    pub index: String,
    /// Sort attribute, `lsi{n}_sk`.
    pub sort: String,
}

/// Canonical names for global secondary index `n`.
pub fn gsi(n: usize) -> GsiNames {
    GsiNames {
        index: format!("gsi{n}"),
        partition: format!("gsi{n}_pk"),
        sort: format!("gsi{n}_sk"),
    }
}

/// Canonical names for local secondary index `n`.
pub fn lsi(n: usize) -> LsiNames {
    LsiNames {
        index: format!("lsi{n}"),
        sort: format!("lsi{n}_sk"),
    }
}
