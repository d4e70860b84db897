use std::sync::Arc;
use tracing::{error, warn};

use crate::error::{ApiError, Disposition};
use crate::notify::{Notification, Notifier};
use crate::session::Session;

/// Applies the error policy to every failed request: notices for
/// infrastructure errors, nothing for inline validation, a session reset on
/// 401. The error itself is always passed on to the caller.
#[derive(Clone)]
pub struct ErrorInterceptor {
    notifier: Arc<dyn Notifier>,
    session: Session,
}

impl std::fmt::Debug for ErrorInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorInterceptor").finish_non_exhaustive()
    }
}

impl ErrorInterceptor {
    pub fn new(notifier: Arc<dyn Notifier>, session: Session) -> Self { Self { notifier, session } }

    /// `quiet_not_found` suppresses the toast for callers that turn a 404
    /// into a default state.
    pub fn handle(&self, err: ApiError, quiet_not_found: bool) -> ApiError {
        match &err {
            ApiError::Server => error!(status = 500, "server error"),
            ApiError::Unexpected { status, message } => error!(status, %message, "unhandled HTTP error"),
            other => warn!(status = other.status(), error = %other, "request failed"),
        }
        if quiet_not_found && err.is_not_found() {
            return err;
        }
        match err.disposition() {
            Disposition::NetworkNotice => self.notifier.notify(Notification::NetworkError),
            Disposition::Inline => {}
            Disposition::SessionReset => {
                self.session.logout();
                self.notifier.notify(Notification::AuthError);
            }
            Disposition::PermissionNotice => self.notifier.notify(Notification::PermissionError),
            Disposition::Toast(message) => self.notifier.notify(Notification::Error(message)),
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, User};
    use crate::notify::RecordingNotifier;

    fn setup() -> (ErrorInterceptor, RecordingNotifier, Session) {
        let notifier = RecordingNotifier::new();
        let session = Session::new();
        session.login(User::new("u1", "John Client", "client@test.com", Role::Client), None);
        (ErrorInterceptor::new(Arc::new(notifier.clone()), session.clone()), notifier, session)
    }

    #[test]
    fn test_unauthorized_resets_session() {
        let (interceptor, notifier, session) = setup();
        let err = interceptor.handle(ApiError::Unauthorized, false);
        assert_eq!(err, ApiError::Unauthorized);
        assert!(!session.is_authenticated());
        assert_eq!(notifier.take(), vec![Notification::AuthError]);
    }

    #[test]
    fn test_validation_is_left_inline() {
        let (interceptor, notifier, session) = setup();
        interceptor.handle(ApiError::from_response(400, r#"{"message":"bad quantity"}"#), false);
        assert!(notifier.take().is_empty());
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_toasts_and_quiet_not_found() {
        let (interceptor, notifier, _) = setup();
        interceptor.handle(ApiError::from_response(404, r#"{"message":"Cart not found"}"#), true);
        assert!(notifier.take().is_empty());
        interceptor.handle(ApiError::from_response(409, r#"{"message":"Order cannot be cancelled"}"#), false);
        interceptor.handle(ApiError::Network { detail: "refused".into() }, false);
        assert_eq!(notifier.take(), vec![
            Notification::Error("Order cannot be cancelled".into()),
            Notification::NetworkError,
        ]);
    }
}
