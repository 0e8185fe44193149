use serde::{Deserialize, Serialize};

/// The authenticated identity attached to a live session. Derived from a
/// user row at login and read-only afterward.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
}
