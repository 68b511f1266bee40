//! Transport-safe tool name encoding.
//!
//! Providers require tool names matching `[A-Za-z0-9_-]`, while internal
//! names may contain `:` (notification tools). The rewrite `:` ↔ `__` is
//! deterministic and bidirectional for every name the system produces.

/// Encode an internal tool name for provider transport.
#[must_use]
pub fn encode_tool_name(name: &str) -> String {
    name.replace(':', "__")
}

/// Decode a provider-transported tool name back to its internal form.
#[must_use]
pub fn decode_tool_name(name: &str) -> String {
    name.replace("__", ":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(encode_tool_name("fetch_url"), "fetch_url");
        assert_eq!(decode_tool_name("fetch_url"), "fetch_url");
    }

    #[test]
    fn notify_names_round_trip() {
        let name = "notify:ops-alerts";
        let encoded = encode_tool_name(name);
        assert_eq!(encoded, "notify__ops-alerts");
        assert_eq!(decode_tool_name(&encoded), name);
    }

    #[test]
    fn encoded_names_are_transport_safe() {
        let encoded = encode_tool_name("notify:team:sub");
        assert!(encoded.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }
}
