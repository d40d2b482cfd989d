// SPDX-FileCopyrightText: 2026 Director Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests for tier fallback.

use std::sync::Arc;

use director_core::{Capability, DirectorError, QualityTier, ResourceSnapshot, WorkerProfile};
use director_router::{TierRegistry, TierRouter};
use proptest::prelude::*;

fn tier() -> impl Strategy<Value = QualityTier> {
    prop_oneof![
        Just(QualityTier::Low),
        Just(QualityTier::Standard),
        Just(QualityTier::High),
    ]
}

/// Optional cost per tier, indexed Low, Standard, High.
fn tier_costs() -> impl Strategy<Value = [Option<u64>; 3]> {
    [
        proptest::option::of(0u64..32),
        proptest::option::of(0u64..32),
        proptest::option::of(0u64..32),
    ]
}

fn build(costs: &[Option<u64>; 3]) -> TierRouter {
    let capability = Capability::from("create_image");
    let entries = QualityTier::ALL
        .iter()
        .zip(costs)
        .filter_map(|(tier, cost)| {
            cost.map(|c| {
                (
                    capability.clone(),
                    *tier,
                    WorkerProfile::new(format!("{tier}-backend"), "gpu", c),
                )
            })
        });
    TierRouter::new(Arc::new(TierRegistry::from_entries(entries)))
}

/// Outcome reduced to comparable parts.
fn outcome(
    router: &TierRouter,
    requested: QualityTier,
    snapshot: &ResourceSnapshot,
) -> Result<(QualityTier, String), String> {
    router
        .resolve(&Capability::from("create_image"), requested, snapshot)
        .map(|route| (route.decision.accepted_tier, route.profile.backend_id.clone()))
        .map_err(|e| e.to_string())
}

proptest! {
    #[test]
    fn same_inputs_same_route(costs in tier_costs(), requested in tier(), available in 0u64..40) {
        let router = build(&costs);
        let snapshot = ResourceSnapshot::empty().with_pool("gpu", available, 0);

        let first = outcome(&router, requested, &snapshot);
        for _ in 0..5 {
            prop_assert_eq!(&outcome(&router, requested, &snapshot), &first);
        }
    }

    #[test]
    fn picks_highest_fitting_tier_at_or_below_request(
        costs in tier_costs(),
        requested in tier(),
        available in 0u64..40,
    ) {
        let router = build(&costs);
        let snapshot = ResourceSnapshot::empty().with_pool("gpu", available, 0);
        let result = router.resolve(&Capability::from("create_image"), requested, &snapshot);

        let expected = QualityTier::ALL
            .iter()
            .zip(&costs)
            .filter(|(tier, cost)| **tier <= requested && cost.is_some_and(|c| c <= available))
            .map(|(tier, _)| *tier)
            .max();

        match (result, expected) {
            (Ok(route), Some(tier)) => {
                prop_assert_eq!(route.decision.accepted_tier, tier);
                prop_assert!(route.decision.accepted_tier <= requested);
                prop_assert_eq!(route.decision.original_tier, requested);
            }
            (Err(DirectorError::UnsupportedCapability { .. }), None) => {
                prop_assert!(costs.iter().all(Option::is_none));
            }
            (Err(DirectorError::ResourceExhausted { tier, .. }), None) => {
                prop_assert_eq!(tier, requested);
                prop_assert!(costs.iter().any(Option::is_some));
            }
            (other, expected) => {
                prop_assert!(false, "got {:?}, expected tier {:?}", other.map(|r| r.decision), expected);
            }
        }
    }

    #[test]
    fn more_capacity_never_lowers_the_tier(
        costs in tier_costs(),
        requested in tier(),
        available in 0u64..40,
        extra in 0u64..40,
    ) {
        let router = build(&costs);
        let capability = Capability::from("create_image");
        let tight = ResourceSnapshot::empty().with_pool("gpu", available, 0);
        let roomy = ResourceSnapshot::empty().with_pool("gpu", available + extra, 0);

        if let Ok(tight_route) = router.resolve(&capability, requested, &tight) {
            let roomy_route = router.resolve(&capability, requested, &roomy);
            prop_assert!(roomy_route.is_ok());
            if let Ok(roomy_route) = roomy_route {
                prop_assert!(roomy_route.decision.accepted_tier >= tight_route.decision.accepted_tier);
            }
        }
    }
}
