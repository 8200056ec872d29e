// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compute Region to Storage Location Mapping
//!
//! Capture storage is placed in the storage location closest to the compute
//! region the fleet runs in. The selection is a pure, deterministic lookup
//! against a fixed list with three fallback tiers:
//!
//! 1. exact match (case-insensitive)
//! 2. same sub-region, i.e. the region with trailing digits removed
//!    (`EUROPE-WEST2` → `EUROPE-WEST`)
//! 3. same major region, i.e. the token before the first hyphen (`EUROPE`)
//!
//! and finally [`DEFAULT_STORAGE_LOCATION`]. At every tier the first match in
//! [`STORAGE_LOCATIONS`] order wins.

/// Valid single-region storage locations, in tie-break order
pub const STORAGE_LOCATIONS: &[&str] = &[
    "NORTHAMERICA-NORTHEAST1",
    "NORTHAMERICA-NORTHEAST2",
    "US-CENTRAL1",
    "US-EAST1",
    "US-EAST4",
    "US-EAST5",
    "US-SOUTH1",
    "US-WEST1",
    "US-WEST2",
    "US-WEST3",
    "US-WEST4",
    "SOUTHAMERICA-EAST1",
    "SOUTHAMERICA-WEST1",
    "EUROPE-CENTRAL2",
    "EUROPE-NORTH1",
    "EUROPE-SOUTHWEST1",
    "EUROPE-WEST1",
    "EUROPE-WEST2",
    "EUROPE-WEST3",
    "EUROPE-WEST4",
    "EUROPE-WEST6",
    "EUROPE-WEST8",
    "EUROPE-WEST9",
    "ASIA-EAST1",
    "ASIA-EAST2",
    "ASIA-NORTHEAST1",
    "ASIA-NORTHEAST2",
    "ASIA-NORTHEAST3",
    "ASIA-SOUTH1",
    "ASIA-SOUTH2",
    "ASIA-SOUTHEAST1",
    "ASIA-SOUTHEAST2",
    "ME-WEST1",
    "AUSTRALIA-SOUTHEAST1",
    "AUSTRALIA-SOUTHEAST2",
];

/// Location used when no tier matches; cheapest standard storage
pub const DEFAULT_STORAGE_LOCATION: &str = "US-CENTRAL1";

/// Select the storage location closest to `compute_region`
///
/// The result is always one of [`STORAGE_LOCATIONS`], upper-cased.
pub fn nearest_storage_location(compute_region: &str) -> &'static str {
    let region = compute_region.to_ascii_uppercase();

    if let Some(exact) = STORAGE_LOCATIONS.iter().find(|l| **l == region) {
        return exact;
    }

    let sub_region = region.trim_end_matches(|c: char| c.is_ascii_digit());
    if let Some(same_sub) = first_with_prefix(sub_region) {
        return same_sub;
    }

    let major_region = sub_region.split('-').next().unwrap_or(sub_region);
    if let Some(same_major) = first_with_prefix(major_region) {
        return same_major;
    }

    DEFAULT_STORAGE_LOCATION
}

/// An empty prefix matches the first location
fn first_with_prefix(prefix: &str) -> Option<&'static str> {
    STORAGE_LOCATIONS
        .iter()
        .copied()
        .find(|location| location.starts_with(prefix))
}
