// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Deployment Derivations
//!
//! Every derivation the generator relies on is pure, so each property is
//! stated over arbitrary inputs rather than hand-picked cases.

use proptest::prelude::*;
use std::net::Ipv4Addr;

use vsensor_quickstart::domain::identity::MAX_SERVICE_ACCOUNT_ID_LENGTH;
use vsensor_quickstart::domain::invariants::validate_fleet_size;
use vsensor_quickstart::domain::region::STORAGE_LOCATIONS;
use vsensor_quickstart::domain::{
    nearest_storage_location, select_ingest_frontend_ip, validate_deployment, DeploymentHash,
    DeploymentIdentity, SubnetCidr, ValidationError,
};
use vsensor_quickstart::{generate, Environment};

use crate::fixtures::{base_properties, feature_matrix, PROJECT};

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate a subnet with room for the frontend address
fn sensor_subnet() -> impl Strategy<Value = (u32, u8)> {
    (any::<u32>(), 8u8..=29).prop_map(|(addr, prefix)| {
        let mask = u32::MAX << (32 - u32::from(prefix));
        (addr & mask, prefix)
    })
}

/// Generate a deployment name within the length limit
fn deployment_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,39}"
}

/// Generate a compute-region shaped string
fn compute_region() -> impl Strategy<Value = String> {
    "[a-z]{2,12}(-[a-z]{2,10}[0-9]{1,2})?"
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: Canonical storage locations map to themselves
    ///
    /// The mapping is case-insensitive on input and upper-case on output.
    #[test]
    fn prop_canonical_location_is_fixed_point(
        location in prop::sample::select(STORAGE_LOCATIONS),
        lower in any::<bool>(),
    ) {
        let input = if lower { location.to_ascii_lowercase() } else { location.to_string() };
        prop_assert_eq!(nearest_storage_location(&input), location);
    }

    /// Property: Any region maps to a known storage location
    #[test]
    fn prop_region_maps_to_known_location(region in compute_region()) {
        let location = nearest_storage_location(&region);
        prop_assert!(STORAGE_LOCATIONS.contains(&location), "{} -> {}", region, location);
    }

    /// Property: The frontend address is broadcast minus two
    ///
    /// It lies inside the subnet and is never the network or broadcast
    /// address.
    #[test]
    fn prop_frontend_ip_inside_subnet((network, prefix) in sensor_subnet()) {
        let cidr = format!("{}/{}", Ipv4Addr::from(network), prefix);
        let subnet = SubnetCidr::new(&cidr).unwrap();
        let ip = select_ingest_frontend_ip(&cidr).unwrap();

        prop_assert!(subnet.contains(ip));
        prop_assert_ne!(ip, subnet.network());
        prop_assert_ne!(ip, subnet.broadcast());
        prop_assert_eq!(u32::from(ip), u32::from(subnet.broadcast()) - 2);
    }

    /// Property: Host bits are always rejected
    #[test]
    fn prop_host_bits_rejected((network, prefix) in sensor_subnet(), host in 1u32..4) {
        let cidr = format!("{}/{}", Ipv4Addr::from(network | host), prefix);
        prop_assert!(SubnetCidr::new(&cidr).is_err());
    }

    /// Property: The deployment hash is eight lowercase hex characters
    ///
    /// Hashing the same name twice yields the same value.
    #[test]
    fn prop_hash_is_deterministic(name in deployment_name()) {
        let hash = DeploymentHash::of(&name);
        prop_assert_eq!(hash.as_str().len(), DeploymentHash::LENGTH);
        prop_assert!(hash
            .as_str()
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        prop_assert_eq!(hash, DeploymentHash::of(&name));
    }

    /// Property: Fleet service account ids fit the platform limit
    #[test]
    fn prop_service_account_id_fits(name in deployment_name()) {
        let id = DeploymentIdentity::new(name.clone()).fleet_service_account_id();
        prop_assert!(id.len() <= MAX_SERVICE_ACCOUNT_ID_LENGTH, "{}", id);
    }

    /// Property: An inverted fleet size is always reported
    #[test]
    fn prop_inverted_fleet_size_reported(max in 0u32..100, delta in 1u32..100) {
        let min = max + delta;
        prop_assert!(validate_fleet_size(min, max).is_err());

        let mut props = base_properties();
        props.mig_min_size = min;
        props.mig_max_size = max;
        let report = validate_deployment("demo", &props).unwrap_err();
        let expected = ValidationError::FleetSizeInverted { min, max };
        prop_assert!(report.errors().contains(&expected));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: Generation is deterministic
    ///
    /// The same name and property set produce an equal graph and an
    /// identical manifest.
    #[test]
    fn prop_generation_is_deterministic(
        name in deployment_name(),
        toggles in prop::sample::select(feature_matrix()),
    ) {
        let env = Environment::new(name, PROJECT);
        let props = toggles.properties();

        let first = generate(&env, &props).unwrap();
        let second = generate(&env, &props).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.to_yaml().unwrap(), second.to_yaml().unwrap());
        prop_assert!(first.audit().is_clean(), "{}", first.audit());
    }
}
