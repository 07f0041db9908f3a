use std::fmt;

/// Credential for gated diarization models (a Hugging Face token).
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Returns `None` for blank input.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_is_rejected() {
        assert!(AccessToken::new("").is_none());
        assert!(AccessToken::new("   ").is_none());
    }

    #[test]
    fn test_token_is_trimmed() {
        let token = AccessToken::new(" hf_abc \n").unwrap();
        assert_eq!(token.expose(), "hf_abc");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let token = AccessToken::new("hf_secret").unwrap();
        let printed = format!("{token:?}");
        assert!(!printed.contains("hf_secret"));
    }
}
