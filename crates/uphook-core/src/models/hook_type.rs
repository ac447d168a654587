use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lifecycle point at which a hook is emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookType {
    PreCreate,
    PostCreate,
    PreAccess,
    PostReceive,
    PreFinish,
    PostFinish,
    PreTerminate,
    PostTerminate,
}

/// Every hook type the dispatcher knows how to emit
pub const AVAILABLE_HOOKS: [HookType; 8] = [
    HookType::PreCreate,
    HookType::PostCreate,
    HookType::PreAccess,
    HookType::PostReceive,
    HookType::PreFinish,
    HookType::PostFinish,
    HookType::PreTerminate,
    HookType::PostTerminate,
];

impl HookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookType::PreCreate => "pre-create",
            HookType::PostCreate => "post-create",
            HookType::PreAccess => "pre-access",
            HookType::PostReceive => "post-receive",
            HookType::PreFinish => "pre-finish",
            HookType::PostFinish => "post-finish",
            HookType::PreTerminate => "pre-terminate",
            HookType::PostTerminate => "post-terminate",
        }
    }

    /// Blocking hooks gate an upload operation: a failed dispatch must fail
    /// the operation. Informational hooks may fail open.
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            HookType::PreCreate | HookType::PreAccess | HookType::PreFinish | HookType::PreTerminate
        )
    }

    /// Hook types whose `HTTPResponse` is passed to the client even when the
    /// upload proceeds.
    pub fn allows_informational_response(&self) -> bool {
        matches!(self, HookType::PreFinish | HookType::PostFinish)
    }
}

impl Display for HookType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HookType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AVAILABLE_HOOKS
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownHookType(s.to_string()))
    }
}
