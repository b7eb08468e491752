//! Tool-server modes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::McpError;
use crate::server::Runtime;

/// Which auxiliary tool servers an agent may use
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpMode {
    /// No servers, responses are mocked
    #[default]
    Test,
    /// Node servers when npx is available, plus the bundled servers
    Auto,
    /// Node servers only
    Nodejs,
    /// Bundled servers only
    Python,
}

impl McpMode {
    pub const ALL: [Self; 4] = [Self::Test, Self::Auto, Self::Nodejs, Self::Python];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Auto => "auto",
            Self::Nodejs => "nodejs",
            Self::Python => "python",
        }
    }

    pub fn values() -> Vec<&'static str> {
        Self::ALL.iter().map(|m| m.as_str()).collect()
    }

    /// Server runtimes enabled by this mode
    pub const fn runtimes(self) -> &'static [Runtime] {
        match self {
            Self::Test => &[],
            Self::Auto => &[Runtime::Node, Runtime::Native],
            Self::Nodejs => &[Runtime::Node],
            Self::Python => &[Runtime::Native],
        }
    }

    pub fn allows(self, runtime: Runtime) -> bool {
        self.runtimes().contains(&runtime)
    }

    /// Whether npx must be probed before selecting servers
    pub fn needs_npx(self) -> bool {
        self.allows(Runtime::Node)
    }
}

impl fmt::Display for McpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for McpMode {
    type Err = McpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| McpError::UnknownMode(s.to_string()))
    }
}
