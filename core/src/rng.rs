//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through SessionRng instances derived
//! from the single master seed of the classroom run.
//!
//! Each team gets its own RNG stream, seeded from
//! (master_seed XOR team_hash XOR reset_epoch). This means:
//!   - Adding a team never changes another team's scenario draws.
//!   - A reset starts a fresh stream, so a replayed session may
//!     see a different scenario than the first attempt.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A deterministic RNG owned by a single team session.
#[derive(Debug, Clone)]
pub struct SessionRng {
    pub team: String,
    inner: Pcg64Mcg,
}

impl SessionRng {
    pub fn new(master_seed: u64, team: &str, epoch: u64) -> Self {
        let derived_seed = master_seed
            ^ team_hash(team)
            ^ epoch.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            team: team.to_string(),
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::Rng;
        assert!(n > 0, "n must be > 0");
        self.inner.gen_range(0..n)
    }

    /// Pick one element uniformly. Returns None for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.next_u64_below(items.len() as u64) as usize;
        items.get(index)
    }
}

/// Hands out per-team RNG streams for one classroom run.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_team(&self, team: &str, epoch: u64) -> SessionRng {
        SessionRng::new(self.master_seed, team, epoch)
    }
}

/// FNV-1a over the team name. Stable across platforms and compiler
/// versions, unlike `DefaultHasher`.
fn team_hash(team: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME:  u64 = 0x0000_0100_0000_01b3;
    team.bytes()
        .fold(OFFSET, |hash, b| (hash ^ b as u64).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_team_same_seed_is_reproducible() {
        let bank = RngBank::new(12345);
        let mut a = bank.for_team("Team 1", 0);
        let mut b = bank.for_team("Team 1", 0);
        for _ in 0..32 {
            assert_eq!(a.next_u64_below(1000), b.next_u64_below(1000));
        }
    }

    #[test]
    fn teams_and_epochs_get_distinct_streams() {
        let bank = RngBank::new(12345);
        let draw = |team: &str, epoch: u64| {
            let mut rng = bank.for_team(team, epoch);
            (0..16).map(|_| rng.next_u64_below(u64::MAX)).collect::<Vec<_>>()
        };
        assert_ne!(draw("Team 1", 0), draw("Team 2", 0));
        assert_ne!(draw("Team 1", 0), draw("Team 1", 1));
    }

    #[test]
    fn pick_on_empty_slice_is_none() {
        let mut rng = RngBank::new(7).for_team("x", 0);
        let empty: [u8; 0] = [];
        assert!(rng.pick(&empty).is_none());
    }
}
