//! Auth state, events and the pure transition function.

use crewdesk_core::{AuthInfo, UserProfile};
use crewdesk_session::AuthError;
use zeroize::Zeroizing;

/// Email and password of a sign-in attempt. The password is wiped on drop
/// and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: Zeroizing<String>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: Zeroizing::new(password.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthState {
    pub profile: Option<UserProfile>,
    pub loading: bool,
    pub error: Option<AuthError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    LoginRequested { credentials: Credentials },
    LoginSucceeded { user: AuthInfo },
    LoginFailed { error: AuthError },
    LogoutRequested,
    LogoutSucceeded,
    LogoutFailed { error: AuthError },
    UserDataSet { profile: UserProfile },
}

impl AuthEvent {
    pub fn login(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::LoginRequested {
            credentials: Credentials::new(email, password),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LoginRequested { .. } => "login_requested",
            Self::LoginSucceeded { .. } => "login_succeeded",
            Self::LoginFailed { .. } => "login_failed",
            Self::LogoutRequested => "logout_requested",
            Self::LogoutSucceeded => "logout_succeeded",
            Self::LogoutFailed { .. } => "logout_failed",
            Self::UserDataSet { .. } => "user_data_set",
        }
    }
}

/// Next state after `event`.
///
/// Sign-out clears the profile whether or not the provider confirmed it.
/// Resolved user data is only accepted for the user currently signed in, so
/// a lookup that finishes after a sign-out or a change of user is dropped.
pub fn reduce(state: &AuthState, event: &AuthEvent) -> AuthState {
    match event {
        AuthEvent::LoginRequested { .. } | AuthEvent::LogoutRequested => AuthState {
            loading: true,
            error: None,
            ..state.clone()
        },
        AuthEvent::LoginSucceeded { user } => AuthState {
            profile: Some(UserProfile::from_auth(user.clone())),
            loading: false,
            error: None,
        },
        AuthEvent::LoginFailed { error } => AuthState {
            loading: false,
            error: Some(error.clone()),
            ..state.clone()
        },
        AuthEvent::LogoutSucceeded => AuthState::default(),
        AuthEvent::LogoutFailed { error } => AuthState {
            profile: None,
            loading: false,
            error: Some(error.clone()),
        },
        AuthEvent::UserDataSet { profile } => {
            let current = state.profile.as_ref().map(|p| &p.auth.local_id);
            if current != Some(&profile.auth.local_id) {
                return state.clone();
            }
            AuthState {
                profile: Some(profile.clone()),
                loading: false,
                ..state.clone()
            }
        }
    }
}

pub mod selectors {
    use super::*;

    pub fn is_loading(state: &AuthState) -> bool {
        state.loading
    }

    pub fn error(state: &AuthState) -> Option<&AuthError> {
        state.error.as_ref()
    }

    pub fn profile(state: &AuthState) -> Option<&UserProfile> {
        state.profile.as_ref()
    }

    pub fn auth_info(state: &AuthState) -> Option<&AuthInfo> {
        state.profile.as_ref().map(|p| &p.auth)
    }

    pub fn is_signed_in(state: &AuthState) -> bool {
        state.profile.is_some()
    }
}
