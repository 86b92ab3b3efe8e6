//! Redundancy Resolver.
//!
//! A camera that reports the same physical object twice in one window (for
//! example when the detector fires on both the torso and the full body)
//! would otherwise inflate the fused group. Within each group, every camera
//! is collapsed to its single highest-confidence detection; ties keep the
//! first-seen member, so the result is deterministic for a stable input
//! order.

use std::collections::HashMap;

use spatialfuse_types::FusedGroup;

/// Collapse same-camera duplicates inside `group` to one detection per
/// camera. Surviving members retain their original relative order.
pub fn prune_redundant(group: FusedGroup) -> FusedGroup {
    // Best member index per camera; strictly-greater comparison keeps the
    // first-seen detection on confidence ties.
    let mut best_per_camera: HashMap<u32, usize> = HashMap::new();
    for (i, det) in group.members.iter().enumerate() {
        match best_per_camera.get(&det.camera) {
            Some(&kept) if group.members[kept].confidence >= det.confidence => {}
            _ => {
                best_per_camera.insert(det.camera, i);
            }
        }
    }

    let mut keep: Vec<usize> = best_per_camera.into_values().collect();
    keep.sort_unstable();

    let members = group
        .members
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep.binary_search(i).is_ok())
        .map(|(_, det)| det)
        .collect();
    FusedGroup { members }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use spatialfuse_types::WorldDetection;

    fn det(camera: u32, confidence: f32, x: f32) -> WorldDetection {
        WorldDetection {
            label: "person".to_string(),
            confidence,
            world_position: [x, 0.0, 0.0, 1.0],
            camera,
        }
    }

    fn group(members: Vec<WorldDetection>) -> FusedGroup {
        FusedGroup { members }
    }

    #[test]
    fn single_member_untouched() {
        let pruned = prune_redundant(group(vec![det(0, 0.8, 1.0)]));
        assert_eq!(pruned.members.len(), 1);
    }

    #[test]
    fn same_camera_duplicate_keeps_highest_confidence() {
        let pruned = prune_redundant(group(vec![
            det(0, 0.6, 1.0),
            det(0, 0.9, 1.1),
            det(0, 0.7, 0.9),
        ]));
        assert_eq!(pruned.members.len(), 1);
        assert!((pruned.members[0].confidence - 0.9).abs() < 1e-5);
    }

    #[test]
    fn distinct_cameras_all_survive() {
        let pruned = prune_redundant(group(vec![
            det(0, 0.6, 1.0),
            det(1, 0.9, 1.1),
            det(2, 0.7, 0.9),
        ]));
        assert_eq!(pruned.members.len(), 3);
    }

    #[test]
    fn confidence_tie_keeps_first_seen() {
        let pruned = prune_redundant(group(vec![det(0, 0.8, 1.0), det(0, 0.8, 2.0)]));
        assert_eq!(pruned.members.len(), 1);
        assert!((pruned.members[0].world_position[0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn survivors_retain_input_order() {
        let pruned = prune_redundant(group(vec![
            det(1, 0.5, 1.0),
            det(0, 0.9, 2.0),
            det(1, 0.8, 3.0),
            det(2, 0.6, 4.0),
        ]));
        let cameras: Vec<u32> = pruned.members.iter().map(|d| d.camera).collect();
        // Camera 1's winner is its second detection, which sits between
        // camera 0 and camera 2 in the input.
        assert_eq!(cameras, vec![0, 1, 2]);
        assert!((pruned.members[1].world_position[0] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn at_most_one_member_per_camera() {
        let pruned = prune_redundant(group(vec![
            det(0, 0.5, 1.0),
            det(1, 0.6, 1.1),
            det(0, 0.7, 1.2),
            det(1, 0.4, 1.3),
            det(0, 0.6, 1.4),
        ]));
        let mut cameras: Vec<u32> = pruned.members.iter().map(|d| d.camera).collect();
        cameras.sort_unstable();
        cameras.dedup();
        assert_eq!(cameras.len(), pruned.members.len());
    }

    #[test]
    fn empty_group_stays_empty() {
        assert!(prune_redundant(group(vec![])).members.is_empty());
    }
}
