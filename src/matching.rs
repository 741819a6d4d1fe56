//! Staff selection for AUTO ("Maestro match") bookings.

use crate::models::{StaffId, StaffMember};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use std::cmp::Ordering;

/// Picks one member out of the eligible roster.
pub trait StaffSelector: Send {
    /// Returns `None` only when `eligible` is empty.
    fn select(&mut self, eligible: &[StaffMember]) -> Option<StaffId>;
}

/// Uniform random choice.
#[derive(Debug, Clone)]
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    /// Seeded from the OS.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible sequence for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl StaffSelector for RandomSelector {
    fn select(&mut self, eligible: &[StaffMember]) -> Option<StaffId> {
        eligible.choose(&mut self.rng).map(|m| m.id.clone())
    }
}

/// Deterministic ranking: highest rating first, non-owners before the owner
/// on equal rating, then lowest id.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankedSelector;

impl RankedSelector {
    fn compare(a: &StaffMember, b: &StaffMember) -> Ordering {
        b.rating
            .partial_cmp(&a.rating)
            .unwrap_or(Ordering::Equal)
            .then(a.is_owner.cmp(&b.is_owner))
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl StaffSelector for RankedSelector {
    fn select(&mut self, eligible: &[StaffMember]) -> Option<StaffId> {
        eligible.iter().min_by(|a, b| Self::compare(a, b)).map(|m| m.id.clone())
    }
}

/// Filter the roster down to members AUTO may assign.
pub fn eligible_staff(roster: &[StaffMember], include_unavailable: bool) -> Vec<StaffMember> {
    roster
        .iter()
        .filter(|m| include_unavailable || m.available)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, rating: f32, is_owner: bool, available: bool) -> StaffMember {
        StaffMember {
            id: StaffId::new(id),
            name: id.to_uppercase(),
            role: "Stylist".to_string(),
            is_owner,
            available,
            rating,
        }
    }

    #[test]
    fn test_random_selector_draws_from_roster() {
        let roster = vec![
            member("a", 4.0, false, true),
            member("b", 4.5, false, true),
            member("c", 3.0, true, true),
        ];
        let mut selector = RandomSelector::seeded(42);
        for _ in 0..100 {
            let picked = selector.select(&roster).unwrap();
            assert!(roster.iter().any(|m| m.id == picked));
        }
    }

    #[test]
    fn test_random_selector_covers_roster() {
        let roster = vec![member("a", 0.0, false, true), member("b", 0.0, false, true)];
        let mut selector = RandomSelector::seeded(3);
        let picks: Vec<_> = (0..200).map(|_| selector.select(&roster).unwrap()).collect();
        assert!(picks.contains(&StaffId::new("a")));
        assert!(picks.contains(&StaffId::new("b")));
    }

    #[test]
    fn test_random_selector_seed_is_reproducible() {
        let roster: Vec<_> = (0..10).map(|i| member(&format!("s{i}"), 0.0, false, true)).collect();
        let mut first = RandomSelector::seeded(9);
        let mut second = RandomSelector::seeded(9);
        for _ in 0..20 {
            assert_eq!(first.select(&roster), second.select(&roster));
        }
    }

    #[test]
    fn test_empty_roster() {
        assert_eq!(RandomSelector::seeded(1).select(&[]), None);
        assert_eq!(RankedSelector.select(&[]), None);
    }

    #[test]
    fn test_ranked_selector_order() {
        let roster = vec![
            member("c", 4.8, true, true),
            member("b", 4.8, false, true),
            member("a", 4.2, false, true),
        ];
        assert_eq!(RankedSelector.select(&roster), Some(StaffId::new("b")));

        let tied = vec![member("z", 4.0, false, true), member("y", 4.0, false, true)];
        assert_eq!(RankedSelector.select(&tied), Some(StaffId::new("y")));
    }

    #[test]
    fn test_eligible_staff_filters_unavailable() {
        let roster = vec![member("a", 0.0, false, false), member("b", 0.0, false, true)];

        let available = eligible_staff(&roster, false);
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, StaffId::new("b"));

        assert_eq!(eligible_staff(&roster, true).len(), 2);
    }
}
