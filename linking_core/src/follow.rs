//! Follow geometry.

use std::f32::consts::TAU;
use world_rules::{Creature, FollowDirective, LinkHost};

/// The formation slot of `follower` around `leader`.
///
/// Both sides use their canonical positions. Distance is the planar gap
/// between the two bounding circles; the angle is relative to the leader's
/// facing and normalized to `[0, 2π)`.
pub fn compute_follow(follower: &Creature, leader: &Creature) -> FollowDirective {
    let distance = (follower.home.planar_distance(&leader.home)
        - follower.bounding_radius
        - leader.bounding_radius)
        .max(0.0);

    let dx = leader.home.x - follower.home.x;
    let dy = leader.home.y - follower.home.y;
    let mut angle = (dy.atan2(dx) - leader.home.orientation).rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if angle >= TAU {
        angle = 0.0;
    }

    FollowDirective {
        leader: leader.id,
        distance,
        angle,
    }
}

/// Order `follower` to keep its slot around `leader`.
pub fn set_following<H: LinkHost + ?Sized>(host: &mut H, follower: &Creature, leader: &Creature) {
    let directive = compute_follow(follower, leader);
    tracing::debug!(
        follower = %follower.id,
        leader = %leader.id,
        distance = directive.distance,
        angle = directive.angle,
        "follow"
    );
    host.move_follow(follower.id, directive);
}
