use crate::error::{CredentialError, HydrationError};
use crate::models::{AuthStatus, Session};

pub const DEMO_USERNAME: &str = "admin";
pub const DEMO_PASSWORD: &str = "password";

/// Decides whether a username/password pair may log in.
pub trait CredentialVerifier {
    fn verify(&self, username: &str, password: &str) -> bool;
}

impl<F> CredentialVerifier for F
where
    F: Fn(&str, &str) -> bool,
{
    fn verify(&self, username: &str, password: &str) -> bool {
        self(username, password)
    }
}

/// The single hardcoded demo account.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoCredentials;

impl CredentialVerifier for DemoCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        username == DEMO_USERNAME && password == DEMO_PASSWORD
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    session: Option<Session>,
    status: AuthStatus,
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn status(&self) -> &AuthStatus {
        &self.status
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn begin_login(&mut self) {
        self.status.pending = true;
        self.status.last_error = None;
    }

    /// On mismatch the error message lands in `status().last_error` and any
    /// existing session is left alone.
    pub fn complete_login(
        &mut self,
        verifier: &dyn CredentialVerifier,
        username: &str,
        password: &str,
    ) -> Result<&Session, CredentialError> {
        if !verifier.verify(username, password) {
            let err = CredentialError::InvalidCredentials;
            self.status = AuthStatus {
                pending: false,
                last_error: Some(err.to_string()),
            };
            return Err(err);
        }
        self.status = AuthStatus::default();
        Ok(&*self.session.insert(Session::new(username)))
    }

    /// Returns whether a session was present.
    pub fn logout(&mut self) -> bool {
        self.status = AuthStatus::default();
        self.session.take().is_some()
    }

    /// Restores a previously persisted session as-is; credentials are not re-checked.
    pub fn hydrate(&mut self, session: Session) -> Result<(), HydrationError> {
        if !session.authenticated {
            return Err(HydrationError::InvalidSession {
                username: session.username,
            });
        }
        self.session = Some(session);
        self.status = AuthStatus::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_credentials_accept_only_admin_password() {
        assert!(DemoCredentials.verify("admin", "password"));
        assert!(!DemoCredentials.verify("admin", "Password"));
        assert!(!DemoCredentials.verify("root", "password"));
        assert!(!DemoCredentials.verify("", ""));
    }

    #[test]
    fn begin_login_sets_pending_and_clears_error() {
        let mut auth = AuthState::default();
        let _ = auth.complete_login(&DemoCredentials, "admin", "nope");
        assert!(auth.status().last_error.is_some());

        auth.begin_login();
        assert!(auth.status().pending);
        assert_eq!(auth.status().last_error, None);
        assert!(auth.session().is_none());
    }

    #[test]
    fn successful_login_sets_session_and_resets_status() {
        let mut auth = AuthState::default();
        auth.begin_login();
        let session = auth
            .complete_login(&DemoCredentials, "admin", "password")
            .expect("login")
            .clone();
        assert_eq!(session, Session::new("admin"));
        assert!(auth.is_authenticated());
        assert_eq!(auth.status(), &AuthStatus::default());
    }

    #[test]
    fn failed_login_reports_error_and_stays_logged_out() {
        let mut auth = AuthState::default();
        auth.begin_login();
        let err = auth
            .complete_login(&DemoCredentials, "admin", "wrong")
            .expect_err("mismatch");
        assert_eq!(err, CredentialError::InvalidCredentials);
        assert!(!auth.status().pending);
        assert_eq!(
            auth.status().last_error.as_deref(),
            Some("Invalid credentials")
        );
        assert!(auth.session().is_none());
    }

    #[test]
    fn custom_verifier_is_used() {
        let mut auth = AuthState::default();
        let verifier = |user: &str, _: &str| user == "guest";
        auth.complete_login(&verifier, "guest", "anything")
            .expect("closure verifier accepts");
        assert_eq!(auth.session().map(|s| s.username.as_str()), Some("guest"));
    }

    #[test]
    fn logout_clears_session_and_status() {
        let mut auth = AuthState::default();
        auth.complete_login(&DemoCredentials, "admin", "password")
            .unwrap();
        auth.begin_login();
        assert!(auth.logout());
        assert!(auth.session().is_none());
        assert_eq!(auth.status(), &AuthStatus::default());
        assert!(!auth.logout());
    }

    #[test]
    fn hydrate_trusts_stored_session_without_verifying() {
        let mut auth = AuthState::default();
        auth.hydrate(Session::new("someone-else")).expect("hydrate");
        assert_eq!(
            auth.session().map(|s| s.username.as_str()),
            Some("someone-else")
        );
    }

    #[test]
    fn hydrate_rejects_unauthenticated_session() {
        let mut auth = AuthState::default();
        let err = auth
            .hydrate(Session {
                username: "admin".to_string(),
                authenticated: false,
            })
            .expect_err("not authenticated");
        assert!(matches!(err, HydrationError::InvalidSession { .. }));
        assert!(auth.session().is_none());
    }
}
