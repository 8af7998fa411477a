//! Worker capability grants

use serde::{Deserialize, Serialize};

/// Coarse-grained permission tag gating which tools a worker may invoke.
///
/// A worker is configured with a subset of these; any tool call whose
/// required capability is absent fails deterministically before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Read file contents
    Read,
    /// Grep / glob searches
    Search,
    /// Shell command execution
    Bash,
    /// Write / edit files
    Write,
    /// Web search and fetch
    Web,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::Search => "search",
            Capability::Bash => "bash",
            Capability::Write => "write",
            Capability::Web => "web",
        }
    }

    /// All capabilities, in a stable order.
    pub fn all() -> [Capability; 5] {
        [
            Capability::Read,
            Capability::Search,
            Capability::Bash,
            Capability::Write,
            Capability::Web,
        ]
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Capability::Read.to_string(), "read");
        assert_eq!(Capability::Web.to_string(), "web");
    }

    #[test]
    fn test_all_is_exhaustive() {
        assert_eq!(Capability::all().len(), 5);
    }
}
