//! Spawn and graveyard point selection.

use crate::types::{TeamIndex, Vec2};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct SpawnPoints {
    points: Vec<Vec2>,
    fallback: Vec2,
    next_free_for_all: usize,
}

impl SpawnPoints {
    pub fn new(points: Vec<Vec2>, fallback: Vec2) -> Self {
        Self {
            points,
            fallback,
            next_free_for_all: 0,
        }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn fallback(&self) -> Vec2 {
        self.fallback
    }

    /// Closest registered point to `position` by straight-line distance.
    /// Falls back to the default point when none is registered.
    pub fn nearest(&self, position: Vec2) -> Vec2 {
        self.points
            .iter()
            .copied()
            .min_by(|a, b| a.distance(position).total_cmp(&b.distance(position)))
            .unwrap_or_else(|| {
                warn!("⚠️ No spawn points registered, using fallback {}", self.fallback);
                self.fallback
            })
    }

    /// Initial placement on join: teams get a fixed point, free-for-all
    /// players rotate through every point.
    pub fn for_join(&mut self, team: TeamIndex) -> Vec2 {
        if self.points.is_empty() {
            warn!("⚠️ No spawn points registered, using fallback {}", self.fallback);
            return self.fallback;
        }
        let index = if team.is_assigned() {
            team.0 as usize % self.points.len()
        } else {
            let index = self.next_free_for_all % self.points.len();
            self.next_free_for_all = self.next_free_for_all.wrapping_add(1);
            index
        };
        self.points[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_point_wins() {
        let points = SpawnPoints::new(vec![Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0)], Vec2::ZERO);
        assert_eq!(points.nearest(Vec2::new(4.0, 3.0)), Vec2::new(10.0, 0.0));
        assert_eq!(points.nearest(Vec2::new(-1.0, 0.0)), Vec2::new(-10.0, 0.0));
    }

    #[test]
    fn test_empty_set_uses_fallback() {
        let mut points = SpawnPoints::new(Vec::new(), Vec2::new(1.0, 1.0));
        assert_eq!(points.nearest(Vec2::new(50.0, 0.0)), Vec2::new(1.0, 1.0));
        assert_eq!(points.for_join(TeamIndex(0)), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_join_placement() {
        let a = Vec2::new(-5.0, 0.0);
        let b = Vec2::new(5.0, 0.0);
        let mut points = SpawnPoints::new(vec![a, b], Vec2::ZERO);
        assert_eq!(points.for_join(TeamIndex(1)), b);
        assert_eq!(points.for_join(TeamIndex(1)), b);
        assert_eq!(points.for_join(TeamIndex::NONE), a);
        assert_eq!(points.for_join(TeamIndex::NONE), b);
    }
}
