//! Identities, sessions and the auth gateway that ties them together.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod provider;
mod session;
mod gateway;

pub use principal::{Principal, Role};
pub use provider::{IdentityProvider, IdentityRecord, StaticIdentityProvider};
pub use session::{MemorySessionStore, Session, SessionId, SessionStore};
pub use gateway::{AuthError, AuthGateway, require_authenticated};
