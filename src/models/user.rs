use serde::{Deserialize, Serialize};

/// The signed-in operator, derived from the current token on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub email: String,
    pub groups: Vec<String>,
}

impl AuthUser {
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}
