//! auth::token
//!
//! Opaque bearer credential.

/// A bearer token for the hosting API.
///
/// Acquired once per run and dropped at exit. `Debug` and `Display` are
/// redacted so the value cannot leak through logs or error chains.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wrap a raw token value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for building an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Token([REDACTED])")
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_redact() {
        let token = Token::new("ghu_secret123");
        assert!(!format!("{:?}", token).contains("ghu_secret123"));
        assert!(!format!("{}", token).contains("ghu_secret123"));
        assert_eq!(token.expose(), "ghu_secret123");
    }
}
