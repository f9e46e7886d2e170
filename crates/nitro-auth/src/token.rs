use base64::Engine;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Random bytes behind every bearer token.
pub const BEARER_TOKEN_BYTES: usize = 48;

/// Generate a fresh bearer token: 48 CSPRNG bytes, base64url without padding.
pub fn generate_bearer_token() -> String {
    let mut bytes = [0u8; BEARER_TOKEN_BYTES];
    rand::fill(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare two secrets without leaking their content or length through timing.
///
/// Both sides are hashed to fixed-length digests before the constant-time compare.
pub fn tokens_match(a: &[u8], b: &[u8]) -> bool {
    let ha = Sha256::digest(a);
    let hb = Sha256::digest(b);
    ha.ct_eq(&hb).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_url_safe_and_full_length() {
        let token = generate_bearer_token();
        // 48 bytes -> 64 base64 characters, no padding needed
        assert_eq!(token.len(), 64);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1_000).map(|_| generate_bearer_token()).collect();
        assert_eq!(tokens.len(), 1_000);
    }

    #[test]
    fn tokens_match_compares_content() {
        assert!(tokens_match(b"secret", b"secret"));
        assert!(!tokens_match(b"secret", b"secreT"));
        assert!(!tokens_match(b"secret", b"secret-longer"));
        assert!(tokens_match(b"", b""));
    }
}
