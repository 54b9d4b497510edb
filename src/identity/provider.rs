use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::info;

use super::principal::{Principal, Role};

/// Static definition of a known user. The credential is plaintext; this crate
/// is a demo and does no hashing.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct IdentityRecord {
    pub id: u64,
    pub username: String,
    #[serde(alias = "password")]
    pub credential: String,
    pub role: Role,
}

impl IdentityRecord {
    pub fn new(id: u64, username: &str, credential: &str, role: Role) -> Self {
        Self { id, username: username.to_string(), credential: credential.to_string(), role }
    }

    pub fn principal(&self) -> Principal {
        Principal { id: self.id, username: self.username.clone(), role: self.role }
    }
}

impl std::fmt::Debug for IdentityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("credential", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Read-only lookup over known identities.
///
/// The gateway only depends on this trait, so a persistent store can replace the
/// static list without changing gateway behaviour.
pub trait IdentityProvider: Send + Sync {
    fn records(&self) -> &[IdentityRecord];

    fn find_by_username(&self, username: &str) -> Option<&IdentityRecord> {
        self.records().iter().find(|r| r.username == username)
    }

    /// Exact, case-sensitive match on both username and credential.
    fn verify(&self, username: &str, credential: &str) -> Option<&IdentityRecord> {
        self.records().iter().find(|r| r.username == username && r.credential == credential)
    }
}

static DEMO_IDENTITIES: Lazy<Vec<IdentityRecord>> = Lazy::new(|| {
    vec![
        IdentityRecord::new(1, "abhay", "1234", Role::Admin),
        IdentityRecord::new(2, "user1", "1111", Role::User),
        IdentityRecord::new(3, "user2", "2222", Role::User),
    ]
});

#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    records: Vec<IdentityRecord>,
}

impl StaticIdentityProvider {
    /// The built-in demo users.
    pub fn demo() -> Self {
        Self { records: DEMO_IDENTITIES.clone() }
    }

    pub fn from_records(records: Vec<IdentityRecord>) -> Result<Self> {
        let mut seen = HashSet::new();
        for r in &records {
            if r.username.is_empty() {
                return Err(anyhow!("identity {} has an empty username", r.id));
            }
            if !seen.insert(r.username.as_str()) {
                return Err(anyhow!("duplicate username '{}'", r.username));
            }
        }
        Ok(Self { records })
    }

    /// Load a JSON array of `{id, username, password|credential, role}` objects.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading users file {}", path.display()))?;
        let records: Vec<IdentityRecord> = serde_json::from_str(&text)
            .with_context(|| format!("parsing users file {}", path.display()))?;
        let provider = Self::from_records(records)
            .with_context(|| format!("validating users file {}", path.display()))?;
        info!(target: "startup", path = %path.display(), count = provider.records.len(), "loaded identities");
        Ok(provider)
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn records(&self) -> &[IdentityRecord] { &self.records }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn demo_list_is_three_users() {
        let p = StaticIdentityProvider::demo();
        let names: Vec<&str> = p.records().iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["abhay", "user1", "user2"]);
        assert_eq!(p.find_by_username("abhay").map(|r| r.role), Some(Role::Admin));
    }

    #[test]
    fn verify_is_exact_and_case_sensitive() {
        let p = StaticIdentityProvider::demo();
        assert!(p.verify("user1", "1111").is_some());
        assert!(p.verify("User1", "1111").is_none());
        assert!(p.verify("user1", "1111 ").is_none());
        assert!(p.verify("user1", "2222").is_none());
        assert!(p.find_by_username("ABHAY").is_none());
    }

    #[test]
    fn duplicate_usernames_rejected() {
        let recs = vec![
            IdentityRecord::new(1, "a", "x", Role::User),
            IdentityRecord::new(2, "a", "y", Role::Admin),
        ];
        let err = StaticIdentityProvider::from_records(recs).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn debug_redacts_credential() {
        let r = IdentityRecord::new(9, "carol", "s3cret", Role::User);
        let s = format!("{:?}", r);
        assert!(!s.contains("s3cret"));
        assert!(s.contains("carol"));
    }

    #[test]
    fn json_file_accepts_password_alias() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"[{{"id":7,"username":"root","password":"pw","role":"admin"}},
               {{"id":8,"username":"guest","credential":"g","role":"user"}}]"#
        ).unwrap();
        let p = StaticIdentityProvider::from_json_file(f.path()).unwrap();
        assert_eq!(p.verify("root", "pw").map(|r| r.id), Some(7));
        assert_eq!(p.verify("guest", "g").map(|r| r.role), Some(Role::User));
    }

    #[test]
    fn json_file_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StaticIdentityProvider::from_json_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("reading users file"));
    }
}
