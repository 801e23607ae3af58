/// Log tags identify which pipeline stage produced a message.
///
/// The lowercase debug key of each tag is what `--debug-<key>` matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Wallet,
    Lut,
    Builder,
    Chunker,
    Bundle,
    Relay,
    Rpc,
    State,
    Test,
    Other(String),
}

impl LogTag {
    /// Key used by `--debug-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Wallet => "wallet".to_string(),
            LogTag::Lut => "lut".to_string(),
            LogTag::Builder => "builder".to_string(),
            LogTag::Chunker => "chunker".to_string(),
            LogTag::Bundle => "bundle".to_string(),
            LogTag::Relay => "relay".to_string(),
            LogTag::Rpc => "rpc".to_string(),
            LogTag::State => "state".to_string(),
            LogTag::Test => "test".to_string(),
            LogTag::Other(s) => s.to_lowercase(),
        }
    }

    /// Uncolored label used in the log file
    pub fn to_plain_string(&self) -> String {
        self.to_debug_key().to_uppercase()
    }

    pub fn from_debug_key(key: &str) -> LogTag {
        match key {
            "system" => LogTag::System,
            "wallet" => LogTag::Wallet,
            "lut" => LogTag::Lut,
            "builder" => LogTag::Builder,
            "chunker" => LogTag::Chunker,
            "bundle" => LogTag::Bundle,
            "relay" => LogTag::Relay,
            "rpc" => LogTag::Rpc,
            "state" => LogTag::State,
            "test" => LogTag::Test,
            other => LogTag::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_key_roundtrip() {
        for tag in [LogTag::Lut, LogTag::Chunker, LogTag::Relay] {
            assert_eq!(LogTag::from_debug_key(&tag.to_debug_key()), tag);
        }
        assert_eq!(LogTag::Other("Misc".into()).to_debug_key(), "misc");
    }
}
