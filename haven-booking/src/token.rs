use rand::distributions::Alphanumeric;
use rand::Rng;

pub const TOKEN_PREFIX: &str = "hv_";
const TOKEN_LEN: usize = 32;

/// Fresh session-access token for a booking, e.g. `hv_Q3x...` (35 chars).
pub fn generate_session_token() -> String {
    let body: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", TOKEN_PREFIX, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_format() {
        let token = generate_session_token();
        assert!(token.starts_with(TOKEN_PREFIX));
        assert_eq!(token.len(), TOKEN_PREFIX.len() + TOKEN_LEN);
        assert!(token[TOKEN_PREFIX.len()..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_session_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
