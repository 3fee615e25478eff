//! The transport seam: reading and writing named opaque tokens.
//!
//! HTTP cookie mechanics live outside this crate. The lifecycle only needs
//! to read a named token from the inbound side of an exchange and write a
//! named token (with expiry and flags) to the outbound side. An empty token
//! with a negative max age is the clear signal.

use std::collections::HashMap;

use crate::config::SessionOptions;

/// Reads and writes named opaque tokens for one client exchange.
pub trait TokenTransport {
    /// Read the inbound token with the given name, if any.
    fn read_token(&self, name: &str) -> Option<String>;

    /// Write an outbound token. An empty `token` together with a negative
    /// `options.max_age` instructs the client to discard the token.
    fn write_token(&mut self, name: &str, token: &str, options: &SessionOptions);
}

/// A [`TokenTransport`] over plain hash maps.
///
/// Serves as the test double for the lifecycle suite and as a ready-made
/// carrier for non-HTTP embeddings.
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    inbound: HashMap<String, String>,
    outbound: HashMap<String, (String, SessionOptions)>,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an inbound token, as if the client had presented it.
    pub fn with_inbound_token(mut self, name: impl Into<String>, token: impl Into<String>) -> Self {
        self.inbound.insert(name.into(), token.into());
        self
    }

    /// The token written for `name` on the outbound side, if any.
    pub fn outbound_token(&self, name: &str) -> Option<&str> {
        self.outbound.get(name).map(|(token, _)| token.as_str())
    }

    /// The options the outbound token for `name` was written with.
    pub fn outbound_options(&self, name: &str) -> Option<&SessionOptions> {
        self.outbound.get(name).map(|(_, options)| options)
    }

    /// Build the transport for a follow-up exchange the way a client jar
    /// would: inbound tokens carry over, outbound writes replace them, and
    /// cleared tokens (empty value or negative max age) are dropped.
    pub fn into_next_request(self) -> Self {
        let mut next = Self {
            inbound: self.inbound,
            outbound: HashMap::new(),
        };
        for (name, (token, options)) in self.outbound {
            if token.is_empty() || options.max_age < 0 {
                next.inbound.remove(&name);
            } else {
                next.inbound.insert(name, token);
            }
        }
        next
    }
}

impl TokenTransport for MemoryTransport {
    fn read_token(&self, name: &str) -> Option<String> {
        self.inbound.get(name).cloned()
    }

    fn write_token(&mut self, name: &str, token: &str, options: &SessionOptions) {
        self.outbound
            .insert(name.to_string(), (token.to_string(), options.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write() {
        let mut transport = MemoryTransport::new().with_inbound_token("session", "tok-in");
        assert_eq!(transport.read_token("session").as_deref(), Some("tok-in"));
        assert_eq!(transport.read_token("other"), None);

        transport.write_token("session", "tok-out", &SessionOptions::default());
        assert_eq!(transport.outbound_token("session"), Some("tok-out"));
    }

    #[test]
    fn test_next_request_echoes_tokens() {
        let mut transport = MemoryTransport::new();
        transport.write_token("session", "tok", &SessionOptions::default());

        let next = transport.into_next_request();
        assert_eq!(next.read_token("session").as_deref(), Some("tok"));
    }

    #[test]
    fn test_next_request_drops_cleared_tokens() {
        let mut transport = MemoryTransport::new();
        let clear = SessionOptions::default().with_max_age(-1);
        transport.write_token("session", "", &clear);
        transport.write_token("other", "tok", &SessionOptions::default());

        let next = transport.into_next_request();
        assert_eq!(next.read_token("session"), None);
        assert_eq!(next.read_token("other").as_deref(), Some("tok"));
    }
}
