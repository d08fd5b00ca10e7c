use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Instance positions: the first cube sits at the origin, the rest are
/// uniform in `[-spread, spread]^3`.
///
/// The same seed always yields the same layout.
pub fn scatter(count: usize, spread: f32, seed: Option<u64>) -> Vec<Vec3> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let s = spread.abs();

    (0..count)
        .map(|i| {
            if i == 0 {
                Vec3::ZERO
            } else {
                Vec3::new(
                    rng.gen_range(-s..=s),
                    rng.gen_range(-s..=s),
                    rng.gen_range(-s..=s),
                )
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_instance_is_centered() {
        assert_eq!(scatter(1, 10.0, Some(7)), vec![Vec3::ZERO]);
        assert!(scatter(0, 10.0, Some(7)).is_empty());
    }

    #[test]
    fn positions_stay_inside_the_spread() {
        let positions = scatter(500, 4.0, Some(1));
        assert_eq!(positions.len(), 500);
        assert!(positions.iter().all(|p| p.abs().max_element() <= 4.0));
    }

    #[test]
    fn seed_is_deterministic() {
        assert_eq!(scatter(32, 10.0, Some(42)), scatter(32, 10.0, Some(42)));
        assert_ne!(scatter(32, 10.0, Some(42)), scatter(32, 10.0, Some(43)));
    }

    #[test]
    fn negative_spread_is_mirrored() {
        let positions = scatter(16, -2.0, Some(3));
        assert!(positions.iter().all(|p| p.abs().max_element() <= 2.0));
    }
}
