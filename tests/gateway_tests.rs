//! Auth gateway behaviour over explicit sessions, without any HTTP in the way.

use std::sync::Arc;

use sessiongate::identity::{
    AuthError, AuthGateway, IdentityProvider, IdentityRecord, Principal, Role, Session,
    StaticIdentityProvider, require_authenticated,
};

fn demo_gateway() -> AuthGateway {
    AuthGateway::new(Arc::new(StaticIdentityProvider::demo()))
}

fn principal(id: u64, username: &str, role: Role) -> Principal {
    Principal { id, username: username.to_string(), role }
}

#[test]
fn every_known_pair_logs_in_as_its_record() {
    let gw = demo_gateway();
    for rec in gw.identities().records().to_vec() {
        let mut s = Session::anonymous();
        let p = gw.login(&mut s, &rec.username, &rec.credential).expect("known pair");
        assert_eq!(p.id, rec.id);
        assert_eq!(p.role, rec.role);
        assert_eq!(s.principal(), Some(&p));
    }
}

#[test]
fn bad_logins_leave_session_anonymous() {
    let gw = demo_gateway();
    let cases = [("user1", "wrong"), ("nobody", "1234"), ("ABHAY", "1234"), ("", ""), ("abhay", "")];
    for (u, c) in cases {
        let mut s = Session::anonymous();
        assert_eq!(gw.login(&mut s, u, c), Err(AuthError::InvalidCredentials), "{u}/{c}");
        assert!(!s.is_authenticated());
        assert_eq!(gw.current_principal(&s), None);
    }
}

#[test]
fn logout_always_ends_anonymous() {
    let gw = demo_gateway();
    let mut anon = Session::anonymous();
    gw.logout(&mut anon);
    assert_eq!(gw.current_principal(&anon), None);

    let mut s = Session::anonymous();
    gw.login(&mut s, "user2", "2222").unwrap();
    gw.logout(&mut s);
    assert_eq!(gw.current_principal(&s), None);
}

#[test]
fn guard_blocks_anonymous_and_passes_authenticated() {
    let gw = demo_gateway();
    let mut s = Session::anonymous();
    assert_eq!(require_authenticated(&s), Err(AuthError::Unauthenticated));
    gw.login(&mut s, "user1", "1111").unwrap();
    assert_eq!(require_authenticated(&s).map(|p| p.id), Ok(2));
}

#[test]
fn non_admin_switch_is_forbidden_and_changes_nothing() {
    let gw = demo_gateway();
    let mut s = Session::anonymous();
    let acting = gw.login(&mut s, "user1", "1111").unwrap();
    for target in ["abhay", "user2", "ghost"] {
        assert_eq!(gw.switch_identity(&mut s, &acting, target), Err(AuthError::Forbidden));
        assert_eq!(gw.current_principal(&s), Some(acting.clone()));
    }
}

#[test]
fn admin_switch_to_each_user_succeeds() {
    let gw = demo_gateway();
    for target in ["abhay", "user1", "user2"] {
        let mut s = Session::anonymous();
        let admin = gw.login(&mut s, "abhay", "1234").unwrap();
        let p = gw.switch_identity(&mut s, &admin, target).unwrap();
        assert_eq!(p.username, target);
        assert_eq!(gw.current_principal(&s), Some(p));
    }
}

#[test]
fn impersonation_scenario() {
    let gw = demo_gateway();
    let mut s = Session::anonymous();

    let admin = gw.login(&mut s, "abhay", "1234").unwrap();
    assert_eq!(admin, principal(1, "abhay", Role::Admin));

    let mut other = Session::anonymous();
    assert_eq!(gw.login(&mut other, "user1", "wrong"), Err(AuthError::InvalidCredentials));

    let acting = require_authenticated(&s).unwrap().clone();
    let switched = gw.switch_identity(&mut s, &acting, "user2").unwrap();
    assert_eq!(switched, principal(3, "user2", Role::User));

    // The session is now user2; nothing of the admin remains
    let acting = require_authenticated(&s).unwrap().clone();
    assert_eq!(gw.switch_identity(&mut s, &acting, "abhay"), Err(AuthError::Forbidden));
    assert_eq!(gw.current_principal(&s), Some(principal(3, "user2", Role::User)));
}

struct SingleUser(Vec<IdentityRecord>);

impl IdentityProvider for SingleUser {
    fn records(&self) -> &[IdentityRecord] { &self.0 }
}

#[test]
fn gateway_works_over_any_provider() {
    let gw = AuthGateway::new(Arc::new(SingleUser(vec![IdentityRecord::new(77, "ops", "pw", Role::Admin)])));
    let mut s = Session::anonymous();
    assert_eq!(gw.login(&mut s, "abhay", "1234"), Err(AuthError::InvalidCredentials));
    let p = gw.login(&mut s, "ops", "pw").unwrap();
    assert_eq!(p, principal(77, "ops", Role::Admin));
    assert_eq!(gw.switch_identity(&mut s, &p, "user1"), Err(AuthError::NotFound));
}
