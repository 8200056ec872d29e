// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Derivations (region, frontend address, identity, validation) and
//! whole-graph generation are checked over generated inputs.

mod derivations;
