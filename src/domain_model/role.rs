use serde::{Deserialize, Deserializer, Serialize};

/// Role cached from the current-user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Unknown,
    Admin,
    Storekeeper,
    Other,
}

impl Role {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Role::Unknown,
            Some("admin") => Role::Admin,
            Some("storekeeper") => Role::Storekeeper,
            Some(_) => Role::Other,
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Role::parse(raw.as_deref()))
    }
}

/// Access level a view asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleRequirement {
    Admin,
    /// Admin or storekeeper.
    Manager,
}

impl RoleRequirement {
    pub fn is_satisfied_by(self, role: Option<Role>) -> bool {
        match (self, role) {
            (RoleRequirement::Admin, Some(Role::Admin)) => true,
            (RoleRequirement::Manager, Some(Role::Admin | Role::Storekeeper)) => true,
            _ => false,
        }
    }
}

impl std::str::FromStr for RoleRequirement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(RoleRequirement::Admin),
            "manager" => Ok(RoleRequirement::Manager),
            other => Err(format!("unknown role requirement: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "unknown_role")]
    pub role: Role,
}

fn unknown_role() -> Role {
    Role::Unknown
}
