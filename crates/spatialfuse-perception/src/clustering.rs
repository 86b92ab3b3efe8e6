//! Clustering Engine.
//!
//! Groups the world detections of one flushed time window into candidate
//! physical objects. Two detections are adjacent when they share a label and
//! their world (x, y) projections lie closer than the distance threshold;
//! groups are the connected components of that graph, found by BFS.
//!
//! The adjacency is held as index-based lists rather than cross-references
//! between detections, so the graph is transient and owns nothing. Pairwise
//! comparison is O(n²) in the detections per window, which is fine for the
//! expected tens of simultaneous objects.
//!
//! Group membership is order-independent: the same input set always yields
//! the same partition, whatever the input order.

use std::collections::VecDeque;

use spatialfuse_types::{FusedGroup, WorldDetection};
use tracing::debug;

/// Euclidean distance between the world (x, y) projections of two detections.
/// Height is deliberately ignored: the cameras agree much better on ground
/// position than on elevation.
fn ground_distance(a: &WorldDetection, b: &WorldDetection) -> f32 {
    let dx = a.world_position[0] - b.world_position[0];
    let dy = a.world_position[1] - b.world_position[1];
    (dx * dx + dy * dy).sqrt()
}

/// Partition `detections` into groups of same-label detections transitively
/// linked by ground distance below `distance_threshold_m`.
///
/// Every input detection lands in exactly one group; an isolated detection
/// forms a singleton group.
pub fn group_detections(
    detections: Vec<WorldDetection>,
    distance_threshold_m: f32,
) -> Vec<FusedGroup> {
    let n = detections.len();

    // Symmetric index-based adjacency: edge (i, j) ⇔ edge (j, i).
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if detections[i].label != detections[j].label {
                continue;
            }
            if ground_distance(&detections[i], &detections[j]) < distance_threshold_m {
                adjacency[i].push(j);
                adjacency[j].push(i);
            }
        }
    }

    // BFS component discovery with an explicit visited set.
    let mut groups: Vec<FusedGroup> = Vec::new();
    let mut visited = vec![false; n];
    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;

        let mut members: Vec<WorldDetection> = Vec::new();
        let mut queue: VecDeque<usize> = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            members.push(detections[current].clone());
            for &neighbour in &adjacency[current] {
                if !visited[neighbour] {
                    visited[neighbour] = true;
                    queue.push_back(neighbour);
                }
            }
        }
        groups.push(FusedGroup { members });
    }

    debug!(
        detections = n,
        groups = groups.len(),
        "clustered window detections"
    );
    groups
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn det(label: &str, x: f32, y: f32, camera: u32) -> WorldDetection {
        WorldDetection {
            label: label.to_string(),
            confidence: 0.9,
            world_position: [x, y, 0.0, 1.0],
            camera,
        }
    }

    /// Group membership as a set of (camera, x-millimetre) pairs, so tests
    /// compare partitions rather than sequences.
    fn membership(groups: &[FusedGroup]) -> BTreeSet<Vec<(u32, i64)>> {
        groups
            .iter()
            .map(|g| {
                let mut ids: Vec<(u32, i64)> = g
                    .members
                    .iter()
                    .map(|d| (d.camera, (d.world_position[0] * 1000.0) as i64))
                    .collect();
                ids.sort();
                ids
            })
            .collect()
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_detections(Vec::new(), 1.5).is_empty());
    }

    #[test]
    fn nearby_same_label_detections_merge() {
        let groups = group_detections(
            vec![det("person", 0.0, 0.0, 0), det("person", 0.3, 0.0, 1)],
            1.5,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 2);
    }

    #[test]
    fn distant_same_label_detections_stay_apart() {
        let groups = group_detections(
            vec![det("person", 0.0, 0.0, 0), det("person", 5.0, 0.0, 1)],
            1.5,
        );
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.members.len() == 1));
    }

    #[test]
    fn threshold_is_exclusive() {
        // Exactly at the threshold is NOT adjacent (strict less-than).
        let groups = group_detections(
            vec![det("person", 0.0, 0.0, 0), det("person", 1.5, 0.0, 1)],
            1.5,
        );
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn different_labels_never_merge() {
        let groups = group_detections(
            vec![det("person", 0.0, 0.0, 0), det("chair", 0.1, 0.0, 1)],
            1.5,
        );
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn transitive_chain_lands_in_one_group() {
        // A–B and B–C are within threshold, A–C is not; connectivity through
        // B must still pull all three into one group.
        let groups = group_detections(
            vec![
                det("person", 0.0, 0.0, 0),
                det("person", 1.0, 0.0, 1),
                det("person", 2.0, 0.0, 2),
            ],
            1.5,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 3);
    }

    #[test]
    fn distance_uses_ground_projection_only() {
        // Same (x, y), wildly different heights: still one object.
        let mut a = det("person", 1.0, 1.0, 0);
        let mut b = det("person", 1.0, 1.0, 1);
        a.world_position[2] = 0.0;
        b.world_position[2] = 10.0;
        let groups = group_detections(vec![a, b], 1.5);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn partition_is_order_independent() {
        let dets = vec![
            det("person", 0.0, 0.0, 0),
            det("person", 1.0, 0.0, 1),
            det("person", 5.0, 0.0, 2),
            det("chair", 5.2, 0.0, 3),
        ];
        let forward = group_detections(dets.clone(), 1.5);
        let mut reversed_input = dets;
        reversed_input.reverse();
        let reversed = group_detections(reversed_input, 1.5);
        assert_eq!(membership(&forward), membership(&reversed));
    }

    #[test]
    fn every_detection_appears_exactly_once() {
        let dets: Vec<WorldDetection> = (0..7u32)
            .map(|i| det("person", i as f32 * 0.9, 0.0, i))
            .collect();
        let groups = group_detections(dets, 1.5);
        let total: usize = groups.iter().map(|g| g.members.len()).sum();
        assert_eq!(total, 7);
    }
}
