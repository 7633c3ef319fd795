//! Effect runner: performs the side effects the reducer describes.

use std::sync::Arc;

use crewdesk_session::{SessionError, SessionManager};
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::auth::AuthEvent;
use crate::profile::ProfileResolver;
use crate::store::AuthStore;

pub struct AuthEffects {
    session: Arc<SessionManager>,
    profiles: ProfileResolver,
}

impl std::fmt::Debug for AuthEffects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthEffects").finish_non_exhaustive()
    }
}

impl AuthEffects {
    pub fn new(session: Arc<SessionManager>, profiles: ProfileResolver) -> Self {
        Self { session, profiles }
    }

    /// Perform the effect of `event` and return the events it produces.
    pub async fn handle(&self, event: &AuthEvent) -> Vec<AuthEvent> {
        match event {
            AuthEvent::LoginRequested { credentials } => {
                match self
                    .session
                    .sign_in(&credentials.email, &credentials.password)
                    .await
                {
                    Ok(user) => vec![AuthEvent::LoginSucceeded {
                        user: user.auth_info(),
                    }],
                    Err(error) => vec![AuthEvent::LoginFailed { error }],
                }
            }
            AuthEvent::LoginSucceeded { user } => {
                let profile = self.profiles.resolve(user.clone()).await;
                vec![AuthEvent::UserDataSet { profile }]
            }
            AuthEvent::LogoutRequested => match self.session.sign_out().await {
                Ok(()) => vec![AuthEvent::LogoutSucceeded],
                Err(error) => vec![AuthEvent::LogoutFailed { error }],
            },
            AuthEvent::LoginFailed { .. }
            | AuthEvent::LogoutSucceeded
            | AuthEvent::LogoutFailed { .. }
            | AuthEvent::UserDataSet { .. } => Vec::new(),
        }
    }

    /// Observe `store` and dispatch follow-up events until the returned
    /// task is aborted. Events are handled one at a time, in dispatch order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoRuntime`] when called outside a runtime.
    pub fn spawn(self: Arc<Self>, store: AuthStore) -> Result<JoinHandle<()>, SessionError> {
        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;
        let mut events = store.events();
        Ok(runtime.spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "auth effects fell behind; events dropped");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                for follow_up in self.handle(&event).await {
                    store.dispatch(follow_up);
                }
            }
        }))
    }
}
