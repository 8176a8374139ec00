//! Deal id generation: short random tokens over a lowercase+digit alphabet.

use gbot_core::DealId;

const DEAL_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of every generated deal id.
pub const DEAL_ID_LEN: usize = 6;

/// Produces random deal id tokens. Tokens are not sequential, so deals cannot be
/// enumerated by guessing neighbours. Uniqueness against already-issued ids is
/// enforced by [`crate::DealRegistry::create`], which re-rolls on collision while
/// holding its write lock.
#[derive(Default)]
pub struct DealIdGenerator;

impl DealIdGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generates one candidate token.
    pub fn next(&self) -> DealId {
        use rand::Rng;
        let mut rng = rand::rng();
        let token: String = (0..DEAL_ID_LEN)
            .map(|_| {
                let idx = rng.random_range(0..DEAL_ALPHABET.len());
                DEAL_ALPHABET[idx] as char
            })
            .collect();
        DealId::new(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_length_and_alphabet() {
        let generator = DealIdGenerator::new();
        for _ in 0..100 {
            let id = generator.next();
            assert_eq!(id.as_str().len(), DEAL_ID_LEN);
            assert!(id
                .as_str()
                .bytes()
                .all(|b| DEAL_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_ids_are_spread_out() {
        let generator = DealIdGenerator::new();
        let ids: std::collections::HashSet<_> =
            (0..200).map(|_| generator.next()).collect();
        // 36^6 tokens; 200 draws colliding down to a handful would mean a broken RNG.
        assert!(ids.len() > 190);
    }
}
