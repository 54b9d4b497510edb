use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool { matches!(self, Role::Admin) }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity attached to a session. Never carries the credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub id: u64,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool { self.role.is_admin() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_json_shape() {
        let p = Principal { id: 1, username: "abhay".into(), role: Role::Admin };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v, serde_json::json!({"id": 1, "username": "abhay", "role": "admin"}));
    }

    #[test]
    fn role_parses_lowercase_only() {
        let r: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(r, Role::User);
        assert!(serde_json::from_str::<Role>("\"Admin\"").is_err());
    }
}
