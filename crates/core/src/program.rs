use serde::{Deserialize, Serialize};

/// Resolved loyalty-program identifier.
///
/// Routing and auth live outside this workspace; by the time the core runs,
/// the program id has already been resolved for the calling merchant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub i64);

impl std::fmt::Display for ProgramId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
