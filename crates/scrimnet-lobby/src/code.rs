//! Lobby code generation.

use rand::Rng;

use scrimnet_protocol::LobbyCode;

/// Codes are 5 characters so they can be read over voice chat.
pub const CODE_LEN: usize = 5;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random lobby code. Uniqueness against live lobbies is the
/// registry's job.
pub fn generate_code<R: Rng>(rng: &mut R) -> LobbyCode {
    let code: String = (0..CODE_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect();
    LobbyCode(code)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_generate_code_length_and_charset() {
        let mut rng = rand::rng();
        for _ in 0..100 {
            let code = generate_code(&mut rng);
            assert_eq!(code.as_str().len(), CODE_LEN);
            assert!(
                code.as_str()
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            );
        }
    }

    #[test]
    fn test_generate_code_is_seed_deterministic() {
        let a = generate_code(&mut StdRng::seed_from_u64(7));
        let b = generate_code(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }
}
