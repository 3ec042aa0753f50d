//! Planner integration tests
//!
//! End-to-end create and edit flows through `UniversePlanner::configure`,
//! with provisioning simulated between plans.

#[allow(dead_code)]
mod common;

use common::*;
use meridian::cluster::{ConfigureMode, ModeSelector};
use meridian::error::MeridianError;
use meridian::placement::PlacementTree;
use meridian::types::{Cluster, NodeState, Universe, UniverseDefinition, ZoneId};
use std::collections::HashSet;

// =============================================================================
// Create Tests
// =============================================================================

#[test]
fn test_single_zone_create() {
    let fixture = TopologyFixture::aws().with_region("r1", 1);
    let mut planner = fixture.planner(1);
    let cluster = Cluster::primary(fixture.intent("orders", 3, 3));
    let cluster_id = cluster.id;
    let mut definition = UniverseDefinition::new(vec![cluster]);

    let outcome = planner
        .configure(&mut definition, None, CUSTOMER_ID, cluster_id)
        .unwrap();

    assert_eq!(outcome.mode, ConfigureMode::NewConfig);
    assert!(outcome.placement_regenerated);

    let tree = definition.clusters[0].placement_info.as_ref().unwrap();
    let zones: Vec<_> = tree.zones().collect();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].num_nodes_in_az, 3);
    assert_eq!(zones[0].replication_factor, 3);

    let prefix = prefix_for("orders");
    let names: Vec<&str> = definition.nodes.iter().map(|n| n.node_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            format!("{}-n1", prefix),
            format!("{}-n2", prefix),
            format!("{}-n3", prefix)
        ]
    );
    assert_eq!(count_in_state(&definition.nodes, NodeState::ToBeAdded), 3);
    assert!(definition.universe_id.is_some());
    assert_eq!(definition.node_prefix, prefix);
}

#[test]
fn test_create_round_robins_over_zones() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(2);
    let universe = create_universe(&mut planner, fixture.intent("orders", 3, 6));

    let cluster = universe.primary_cluster().unwrap();
    let tree = cluster.placement_info.as_ref().unwrap();
    assert_eq!(sorted_counts(tree), vec![2, 2, 2]);
    check_rf_sum(tree, 3).assert();
    check_placement_matches_nodes(tree, universe.nodes(), cluster.id).assert();
}

#[test]
fn test_create_leaves_masters_to_provisioning() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(3);
    let cluster = Cluster::primary(fixture.intent("orders", 3, 3));
    let cluster_id = cluster.id;
    let mut definition = UniverseDefinition::new(vec![cluster]);

    let outcome = planner
        .configure(&mut definition, None, CUSTOMER_ID, cluster_id)
        .unwrap();

    assert!(outcome.summary.masters.is_empty());
    assert!(definition.nodes.iter().all(|n| !n.is_master && n.is_tserver));
}

#[test]
fn test_invalid_intent_rejected() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(4);
    let cluster = Cluster::primary(fixture.intent("orders", 3, 2));
    let cluster_id = cluster.id;
    let mut definition = UniverseDefinition::new(vec![cluster]);

    let err = planner
        .configure(&mut definition, None, CUSTOMER_ID, cluster_id)
        .unwrap_err();
    assert!(matches!(err, MeridianError::InvalidIntent(_)));
    assert!(definition.nodes.is_empty());
}

#[test]
fn test_too_many_regions_infeasible() {
    let fixture = TopologyFixture::aws()
        .with_region("r1", 1)
        .with_region("r2", 1)
        .with_region("r3", 1)
        .with_region("r4", 1);
    let mut planner = fixture.planner(5);
    let cluster = Cluster::primary(fixture.intent("orders", 3, 4));
    let cluster_id = cluster.id;
    let mut definition = UniverseDefinition::new(vec![cluster]);

    let err = planner
        .configure(&mut definition, None, CUSTOMER_ID, cluster_id)
        .unwrap_err();
    assert!(matches!(err, MeridianError::InfeasibleIntent(_)));
    assert!(err.is_caller_fixable());
}

// =============================================================================
// Edit Tests
// =============================================================================

#[test]
fn test_zone_count_edit_uses_delta() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(6);
    let universe = create_universe(&mut planner, fixture.intent("orders", 3, 6));

    let mut definition = edit_request(&universe);
    let cluster_id = primary_id(&definition);
    primary_mut(&mut definition).user_intent.num_nodes = 8;
    let first_zone = {
        let tree = placement_mut(&mut definition);
        let zone = tree.zones().next().unwrap().id;
        set_zone_count(tree, zone, 4);
        zone
    };

    let selected = ModeSelector::new().select_mode(
        Some(&universe.details),
        &definition,
        definition.cluster(cluster_id).unwrap(),
    );
    assert_eq!(selected, ConfigureMode::UpdateFromPlacementInfo);

    let outcome = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
        .unwrap();

    assert_eq!(outcome.mode, ConfigureMode::UpdateFromPlacementInfo);
    let prefix = prefix_for("orders");
    assert_eq!(
        outcome.summary.added,
        vec![format!("{}-n7", prefix), format!("{}-n8", prefix)]
    );
    assert!(outcome.summary.removed.is_empty());
    assert!(outcome.summary.masters.is_empty());

    let live = live_counts(&definition.nodes, cluster_id);
    assert_eq!(live[&first_zone], 4);
    let tree = definition.cluster(cluster_id).unwrap().placement_info.as_ref().unwrap();
    assert_eq!(sorted_counts(tree), vec![2, 2, 4]);
    check_placement_matches_nodes(tree, &definition.nodes, cluster_id).assert();
}

#[test]
fn test_node_count_edit_fills_least_occupied() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(7);
    let universe = create_universe(&mut planner, fixture.intent("orders", 3, 6));

    let mut definition = edit_request(&universe);
    let cluster_id = primary_id(&definition);
    primary_mut(&mut definition).user_intent.num_nodes = 9;

    let outcome = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
        .unwrap();

    assert_eq!(outcome.mode, ConfigureMode::UpdateFromUserIntent);
    assert_eq!(outcome.summary.added.len(), 3);
    let tree = definition.cluster(cluster_id).unwrap().placement_info.as_ref().unwrap();
    assert_eq!(sorted_counts(tree), vec![3, 3, 3]);
    assert_eq!(count_in_state(&definition.nodes, NodeState::Running), 6);
}

#[test]
fn test_replication_factor_edit_rejected() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(8);
    let universe = create_universe(&mut planner, fixture.intent("orders", 3, 6));

    let mut definition = edit_request(&universe);
    let cluster_id = primary_id(&definition);
    primary_mut(&mut definition).user_intent.replication_factor = 5;

    let err = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
        .unwrap_err();

    assert!(matches!(err, MeridianError::UnsupportedChange(_)));
    assert_eq!(definition.nodes, universe.details.nodes);
}

#[test]
fn test_noop_edit_rejected() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(9);
    let universe = create_universe(&mut planner, fixture.intent("orders", 3, 3));

    let mut definition = edit_request(&universe);
    let cluster_id = primary_id(&definition);

    let err = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
        .unwrap_err();
    assert!(matches!(err, MeridianError::NoOpEdit));
}

/// Two masters in the crowded zone, one in the second.
fn crowd_masters(universe: &mut Universe, crowded: ZoneId, second: ZoneId) {
    for node in universe.details.nodes.iter_mut() {
        node.is_master = false;
    }
    let mut crowded_masters = 0;
    let mut second_master = false;
    for node in universe.details.nodes.iter_mut() {
        if node.zone_id == crowded && crowded_masters < 2 {
            node.is_master = true;
            crowded_masters += 1;
        } else if node.zone_id == second && !second_master {
            node.is_master = true;
            second_master = true;
        }
    }
}

fn flip_anchor(tree: &mut PlacementTree, zone: ZoneId) {
    for z in tree.zones_mut().filter(|z| z.id == zone) {
        z.is_affinitized = !z.is_affinitized;
    }
}

#[test]
fn test_shrink_through_master_forces_full_move() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(10);
    let mut universe = create_universe(&mut planner, fixture.intent("orders", 3, 7));

    let cluster_id = universe.primary_cluster().unwrap().id;
    let zones: Vec<_> = universe
        .primary_cluster()
        .unwrap()
        .placement_info
        .as_ref()
        .unwrap()
        .zones()
        .map(|z| z.id)
        .collect();
    let (crowded, second) = (zones[0], zones[1]);
    assert_eq!(live_counts(universe.nodes(), cluster_id)[&crowded], 3);
    crowd_masters(&mut universe, crowded, second);

    let mut definition = edit_request(&universe);
    primary_mut(&mut definition).user_intent.num_nodes = 5;
    set_zone_count(placement_mut(&mut definition), crowded, 1);

    let selected = ModeSelector::new().select_mode(
        Some(&universe.details),
        &definition,
        definition.cluster(cluster_id).unwrap(),
    );
    assert_eq!(selected, ConfigureMode::NewConfig);

    let outcome = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
        .unwrap();

    assert_eq!(outcome.mode, ConfigureMode::NewConfig);
    assert_eq!(outcome.summary.removed.len(), 7);
    assert_eq!(outcome.summary.added.len(), 5);
    assert_eq!(outcome.summary.added[0], format!("{}-n8", prefix_for("orders")));
    assert_eq!(count_in_state(&definition.nodes, NodeState::ToBeRemoved), 7);

    // Masters re-elected among the new nodes only.
    assert_eq!(outcome.summary.masters.len(), 3);
    let live_masters: Vec<_> = definition
        .nodes
        .iter()
        .filter(|n| n.is_master && !n.is_to_be_removed())
        .collect();
    assert_eq!(live_masters.len(), 3);
    assert!(live_masters.iter().all(|n| n.state == NodeState::ToBeAdded));
    let subnets: HashSet<&str> = live_masters.iter().map(|n| n.subnet()).collect();
    assert_eq!(subnets.len(), 3);
}

#[test]
fn test_safe_zone_shrink_uses_delta() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(11);
    let universe = create_universe(&mut planner, fixture.intent("orders", 3, 6));

    let mut definition = edit_request(&universe);
    let cluster_id = primary_id(&definition);
    primary_mut(&mut definition).user_intent.num_nodes = 5;
    let zone = {
        let tree = placement_mut(&mut definition);
        let zone = tree.zones().next().unwrap().id;
        set_zone_count(tree, zone, 1);
        zone
    };

    let outcome = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
        .unwrap();

    assert_eq!(outcome.mode, ConfigureMode::UpdateFromPlacementInfo);
    assert_eq!(outcome.summary.removed.len(), 1);
    let removed = definition
        .nodes
        .iter()
        .find(|n| n.node_name == outcome.summary.removed[0])
        .unwrap();
    assert_eq!(removed.state, NodeState::ToBeRemoved);
    assert_eq!(removed.zone_id, zone);
    assert!(!removed.is_master);

    let tree = definition.cluster(cluster_id).unwrap().placement_info.as_ref().unwrap();
    assert_eq!(sorted_counts(tree), vec![1, 2, 2]);
}

#[test]
fn test_region_change_regenerates_placement() {
    let fixture = TopologyFixture::aws()
        .with_region("r1", 3)
        .with_region("r2", 3);
    let (r1, r2) = (fixture.regions[0], fixture.regions[1]);
    let mut planner = fixture.planner(12);
    let universe = create_universe(
        &mut planner,
        fixture.intent("orders", 3, 6).with_regions(vec![r1]),
    );

    let mut definition = edit_request(&universe);
    let cluster_id = primary_id(&definition);
    primary_mut(&mut definition).user_intent.region_list = vec![r2];

    let outcome = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
        .unwrap();

    assert_eq!(outcome.mode, ConfigureMode::NewConfig);
    assert!(outcome.placement_regenerated);
    assert_eq!(outcome.summary.removed.len(), 6);
    assert_eq!(outcome.summary.added.len(), 6);

    let r2_zones: HashSet<_> = fixture.zones(1).into_iter().collect();
    assert!(definition
        .nodes
        .iter()
        .filter(|n| !n.is_to_be_removed())
        .all(|n| r2_zones.contains(&n.zone_id)));
    let tree = definition.cluster(cluster_id).unwrap().placement_info.as_ref().unwrap();
    assert!(tree.zones().all(|z| r2_zones.contains(&z.id)));
    check_rf_sum(tree, 3).assert();
}

#[test]
fn test_anchor_flag_flip_keeps_nodes() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(13);
    let universe = create_universe(&mut planner, fixture.intent("orders", 3, 3));

    let mut definition = edit_request(&universe);
    let cluster_id = primary_id(&definition);
    let zone = placement_mut(&mut definition).zones().next().unwrap().id;
    let before = placement_mut(&mut definition).find_zone(zone).unwrap().is_affinitized;
    flip_anchor(placement_mut(&mut definition), zone);

    let outcome = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
        .unwrap();

    assert_eq!(outcome.mode, ConfigureMode::UpdateFromPlacementInfo);
    assert!(outcome.summary.added.is_empty());
    assert!(outcome.summary.removed.is_empty());
    let tree = definition.cluster(cluster_id).unwrap().placement_info.as_ref().unwrap();
    assert_eq!(tree.find_zone(zone).unwrap().is_affinitized, !before);
}

#[test]
fn test_anchor_flag_flip_with_master_blocked_shrink_forces_full_move() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(10);
    let mut universe = create_universe(&mut planner, fixture.intent("orders", 3, 7));

    let cluster_id = universe.primary_cluster().unwrap().id;
    let zones: Vec<_> = universe
        .primary_cluster()
        .unwrap()
        .placement_info
        .as_ref()
        .unwrap()
        .zones()
        .map(|z| z.id)
        .collect();
    let (crowded, second) = (zones[0], zones[1]);
    assert_eq!(live_counts(universe.nodes(), cluster_id)[&crowded], 3);
    crowd_masters(&mut universe, crowded, second);

    let mut definition = edit_request(&universe);
    primary_mut(&mut definition).user_intent.num_nodes = 5;
    set_zone_count(placement_mut(&mut definition), crowded, 1);
    flip_anchor(placement_mut(&mut definition), second);

    let outcome = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
        .unwrap();

    assert_eq!(outcome.mode, ConfigureMode::NewConfig);
    assert_eq!(outcome.summary.removed.len(), 7);
    assert_eq!(outcome.summary.added.len(), 5);
}

#[test]
fn test_anchor_flag_flip_with_instance_type_change_moves_nodes() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(14);
    let universe = create_universe(&mut planner, fixture.intent("orders", 3, 3));

    let mut definition = edit_request(&universe);
    let cluster_id = primary_id(&definition);
    primary_mut(&mut definition).user_intent.instance_type = "m5.4xlarge".to_string();
    let zone = placement_mut(&mut definition).zones().next().unwrap().id;
    flip_anchor(placement_mut(&mut definition), zone);

    let outcome = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
        .unwrap();

    assert_eq!(outcome.mode, ConfigureMode::NewConfig);
    assert_eq!(outcome.summary.removed.len(), 3);
    assert_eq!(outcome.summary.added.len(), 3);
    assert!(definition
        .nodes
        .iter()
        .filter(|n| !n.is_to_be_removed())
        .all(|n| n.cloud_info.instance_type == "m5.4xlarge"));
}

#[test]
fn test_cleared_placement_edit_regenerates() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(15);
    let universe = create_universe(&mut planner, fixture.intent("orders", 3, 3));

    let mut definition = edit_request(&universe);
    let cluster_id = primary_id(&definition);
    primary_mut(&mut definition).placement_info = None;
    primary_mut(&mut definition).user_intent.num_nodes = 6;

    let outcome = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
        .unwrap();

    assert_eq!(outcome.mode, ConfigureMode::NewConfig);
    assert!(outcome.placement_regenerated);
    assert_eq!(outcome.summary.removed.len(), 3);
    assert_eq!(outcome.summary.added.len(), 6);

    let tree = definition.cluster(cluster_id).unwrap().placement_info.as_ref().unwrap();
    check_rf_sum(tree, 3).assert();
    check_placement_matches_nodes(tree, &definition.nodes, cluster_id).assert();
    check_unique_names(&definition.nodes, cluster_id).assert();
}

// =============================================================================
// Manual Placement Tests
// =============================================================================

#[test]
fn test_manual_placement_full_move() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(13);
    let universe = create_universe(&mut planner, fixture.intent("orders", 3, 6));

    let mut definition = edit_request(&universe);
    definition.user_az_selected = true;
    let cluster_id = primary_id(&definition);
    let kept = {
        let tree = placement_mut(&mut definition);
        let zones: Vec<_> = tree.zones().map(|z| z.id).collect();
        tree.cloud_list[0].region_list[0]
            .az_list
            .retain(|z| z.id != zones[2]);
        set_zone_count(tree, zones[0], 3);
        set_zone_count(tree, zones[1], 3);
        vec![zones[0], zones[1]]
    };

    let outcome = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
        .unwrap();

    assert_eq!(outcome.mode, ConfigureMode::NewConfigFromPlacementInfo);
    assert_eq!(outcome.summary.added.len(), 6);
    assert_eq!(outcome.summary.removed.len(), 6);
    assert_eq!(outcome.summary.masters.len(), 3);

    let live = live_counts(&definition.nodes, cluster_id);
    assert_eq!(live.len(), 2);
    assert!(kept.iter().all(|z| live[z] == 3));
    check_unique_names(&definition.nodes, cluster_id).assert();
}

#[test]
fn test_manual_placement_simple_expand() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(14);
    let universe = create_universe(&mut planner, fixture.intent("orders", 3, 6));

    let mut definition = edit_request(&universe);
    definition.user_az_selected = true;
    let cluster_id = primary_id(&definition);
    primary_mut(&mut definition).user_intent.num_nodes = 7;
    let tree = placement_mut(&mut definition);
    let zone = tree.zones().next().unwrap().id;
    set_zone_count(tree, zone, 3);

    let outcome = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
        .unwrap();

    assert_eq!(outcome.mode, ConfigureMode::NewConfigFromPlacementInfo);
    assert_eq!(outcome.summary.added.len(), 1);
    assert!(outcome.summary.removed.is_empty());
    assert_eq!(live_counts(&definition.nodes, cluster_id)[&zone], 3);
}

#[test]
fn test_manual_placement_reset() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(15);
    let universe = create_universe(&mut planner, fixture.intent("orders", 3, 6));

    let mut definition = edit_request(&universe);
    definition.user_az_selected = true;
    let cluster_id = primary_id(&definition);
    primary_mut(&mut definition).placement_info = None;

    let outcome = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
        .unwrap();

    assert_eq!(outcome.mode, ConfigureMode::NewConfigFromPlacementInfo);
    assert!(outcome.placement_regenerated);
    assert_eq!(outcome.summary.added.len(), 6);
    assert_eq!(outcome.summary.removed.len(), 6);
    assert!(definition.cluster(cluster_id).unwrap().placement_info.is_some());
}

// =============================================================================
// Read-only Cluster Tests
// =============================================================================

#[test]
fn test_read_only_cluster_create() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(16);
    let universe = create_universe(&mut planner, fixture.intent("orders", 3, 3));

    let mut definition = edit_request(&universe);
    let read_only = Cluster::read_only(fixture.intent("orders-ro", 3, 3));
    let ro_id = read_only.id;
    definition.clusters.push(read_only);

    let outcome = planner
        .configure(&mut definition, Some(&universe), CUSTOMER_ID, ro_id)
        .unwrap();

    assert_eq!(outcome.mode, ConfigureMode::NewConfig);
    assert!(outcome.summary.masters.is_empty());

    let cluster = definition.cluster(ro_id).unwrap();
    assert_eq!(cluster.index, 1);
    assert_eq!(definition.next_cluster_index, 2);

    let prefix = prefix_for("orders");
    let names: Vec<&str> = definition
        .nodes_in_cluster(ro_id)
        .map(|n| n.node_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            format!("{}-readonly1-n4", prefix),
            format!("{}-readonly1-n5", prefix),
            format!("{}-readonly1-n6", prefix)
        ]
    );

    let primary = primary_id(&definition);
    let primary_nodes: Vec<_> = definition.nodes_in_cluster(primary).collect();
    assert_eq!(primary_nodes.len(), 3);
    assert!(primary_nodes.iter().all(|n| n.state == NodeState::Running));
}

// =============================================================================
// On-prem Tests
// =============================================================================

#[test]
fn test_on_prem_inventory_shortfall() {
    let fixture = TopologyFixture::on_prem()
        .with_region("dc1", 3)
        .with_inventory("c5.large", 1);
    let mut planner = fixture.planner(17);
    let cluster = Cluster::primary(fixture.intent("orders", 3, 5));
    let cluster_id = cluster.id;
    let mut definition = UniverseDefinition::new(vec![cluster]);

    let err = planner
        .configure(&mut definition, None, CUSTOMER_ID, cluster_id)
        .unwrap_err();

    match err {
        MeridianError::InsufficientInventory(shortfalls) => {
            assert_eq!(shortfalls.len(), 2);
            assert!(shortfalls.iter().all(|s| s.required == 2 && s.available == 1));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_on_prem_inventory_fits() {
    let fixture = TopologyFixture::on_prem()
        .with_region("dc1", 3)
        .with_inventory("c5.large", 2);
    let mut planner = fixture.planner(18);
    let cluster = Cluster::primary(fixture.intent("orders", 3, 6));
    let cluster_id = cluster.id;
    let mut definition = UniverseDefinition::new(vec![cluster]);

    planner
        .configure(&mut definition, None, CUSTOMER_ID, cluster_id)
        .unwrap();

    let live = live_counts(&definition.nodes, cluster_id);
    assert_eq!(live.len(), 3);
    assert!(live.values().all(|&c| c == 2));
}

// =============================================================================
// Property Tests
// =============================================================================

#[test]
fn test_rf_sum_and_pruning_across_layouts() {
    let layouts: Vec<Vec<usize>> = vec![vec![1], vec![2], vec![4], vec![3, 1], vec![2, 2, 2]];

    for layout in &layouts {
        let mut fixture = TopologyFixture::aws();
        for (i, zones) in layout.iter().enumerate() {
            fixture = fixture.with_region(&format!("r{}", i), *zones);
        }

        for rf in [1u32, 3, 5, 7] {
            for extra in [0u32, 2] {
                for seed in 0..4 {
                    let mut planner = fixture.planner(seed);
                    let intent = fixture.intent("props", rf, rf + extra);

                    let tree = planner.generate_placement(&intent).unwrap();
                    check_rf_sum(&tree, rf).assert();
                    check_pruned(&tree).assert();

                    let cluster = Cluster::primary(intent);
                    let cluster_id = cluster.id;
                    let mut definition = UniverseDefinition::new(vec![cluster]);
                    planner
                        .configure(&mut definition, None, CUSTOMER_ID, cluster_id)
                        .unwrap();

                    let planned = definition.cluster(cluster_id).unwrap();
                    let tree = planned.placement_info.as_ref().unwrap();
                    check_pruned(tree).assert();
                    check_placement_matches_nodes(tree, &definition.nodes, cluster_id).assert();
                    check_unique_names(&definition.nodes, cluster_id).assert();
                    assert_eq!(definition.nodes.len() as u32, rf + extra);
                }
            }
        }
    }
}

#[test]
fn test_mode_selection_is_idempotent() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(19);
    let universe = create_universe(&mut planner, fixture.intent("orders", 3, 6));

    let mut definition = edit_request(&universe);
    let cluster_id = primary_id(&definition);
    primary_mut(&mut definition).user_intent.num_nodes = 8;
    let tree = placement_mut(&mut definition);
    let zone = tree.zones().next().unwrap().id;
    set_zone_count(tree, zone, 4);

    let selector = ModeSelector::new();
    let cluster = definition.cluster(cluster_id).unwrap();
    let first = selector.select_mode(Some(&universe.details), &definition, cluster);
    let second = selector.select_mode(Some(&universe.details), &definition, cluster);
    assert_eq!(first, second);
}

#[test]
fn test_indices_never_reused_across_edits() {
    let fixture = TopologyFixture::aws().with_region("r1", 3);
    let mut planner = fixture.planner(20);
    let prefix = prefix_for("orders");
    let mut universe = create_universe(&mut planner, fixture.intent("orders", 3, 3));
    let cluster_id = universe.primary_cluster().unwrap().id;

    // Grow to 6, shrink to 4, grow back to 6.
    let mut all_names: HashSet<String> =
        universe.nodes().iter().map(|n| n.node_name.clone()).collect();
    for num_nodes in [6, 4, 6] {
        let mut definition = edit_request(&universe);
        primary_mut(&mut definition).user_intent.num_nodes = num_nodes;

        let outcome = planner
            .configure(&mut definition, Some(&universe), CUSTOMER_ID, cluster_id)
            .unwrap();
        assert_eq!(outcome.mode, ConfigureMode::UpdateFromUserIntent);
        check_unique_names(&definition.nodes, cluster_id).assert();

        for name in &outcome.summary.added {
            assert!(all_names.insert(name.clone()), "reused name {}", name);
        }
        if num_nodes == 4 {
            assert_eq!(outcome.summary.removed.len(), 2);
        }
        universe = provision(&definition);
        assert_eq!(universe.nodes().len() as u32, num_nodes);
    }

    let last: Vec<&str> = universe
        .nodes()
        .iter()
        .rev()
        .take(2)
        .map(|n| n.node_name.as_str())
        .collect();
    assert_eq!(last, vec![format!("{}-n8", prefix), format!("{}-n7", prefix)]);
}
