//! Application session: the signed-in user and the open workspace, injected where needed.

use crate::transport::BoxFuture;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Credential storage error: {0}")]
    Storage(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub onboarded: bool,
}

/// The workspace record fields the canvas and streaming code read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub whip_url: Option<String>,
    pub stream_id: Option<String>,
    pub output_playback_id: Option<String>,
}

impl Workspace {
    pub fn whip_url(&self) -> Option<&str> {
        self.whip_url.as_deref().filter(|u| !u.trim().is_empty())
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref().filter(|s| !s.is_empty())
    }

    pub fn playback_id(&self) -> Option<&str> {
        self.output_playback_id.as_deref().filter(|s| !s.is_empty())
    }
}

/// Persists the signed-in identity between page loads.
pub trait CredentialStore {
    fn load(&self) -> BoxFuture<'_, SessionResult<Option<String>>>;
    fn save(&self, credentials: &str) -> BoxFuture<'_, SessionResult<()>>;
    fn clear(&self) -> BoxFuture<'_, SessionResult<()>>;
}

/// In-memory credential store for tests and native tools.
#[derive(Default)]
pub struct MemoryCredentialStore {
    value: RefCell<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> BoxFuture<'_, SessionResult<Option<String>>> {
        Box::pin(async move { Ok(self.value.borrow().clone()) })
    }

    fn save(&self, credentials: &str) -> BoxFuture<'_, SessionResult<()>> {
        let credentials = credentials.to_string();
        Box::pin(async move {
            *self.value.borrow_mut() = Some(credentials);
            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'_, SessionResult<()>> {
        Box::pin(async move {
            self.value.borrow_mut().take();
            Ok(())
        })
    }
}

/// Explicit session context: initialised from stored credentials, ended by sign-out.
pub struct AppSession<S: CredentialStore> {
    store: Rc<S>,
    user: Option<UserIdentity>,
    workspace: Option<Workspace>,
}

impl<S: CredentialStore> AppSession<S> {
    pub fn new(store: Rc<S>) -> Self {
        Self {
            store,
            user: None,
            workspace: None,
        }
    }

    /// Restore the user from the credential store.
    ///
    /// Unreadable stored credentials are discarded and the session starts signed out.
    pub async fn initialize(&mut self) -> SessionResult<Option<&UserIdentity>> {
        let stored = self.store.load().await?;
        self.user = match stored {
            Some(json) => match serde_json::from_str::<UserIdentity>(&json) {
                Ok(user) => {
                    log::info!("Restored session for user {}", user.id);
                    Some(user)
                }
                Err(e) => {
                    log::warn!("Discarding unreadable stored credentials: {}", e);
                    self.store.clear().await?;
                    None
                }
            },
            None => None,
        };
        Ok(self.user.as_ref())
    }

    pub async fn sign_in(&mut self, user: UserIdentity) -> SessionResult<()> {
        let json =
            serde_json::to_string(&user).map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.store.save(&json).await?;
        log::info!("Signed in as {}", user.id);
        self.user = Some(user);
        Ok(())
    }

    /// Clear the stored credentials and the open workspace.
    pub async fn sign_out(&mut self) -> SessionResult<()> {
        self.user = None;
        self.workspace = None;
        self.store.clear().await?;
        log::info!("Signed out");
        Ok(())
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn require_user(&self) -> SessionResult<&UserIdentity> {
        self.user.as_ref().ok_or(SessionError::NotSignedIn)
    }

    pub fn open_workspace(&mut self, workspace: Workspace) -> SessionResult<&Workspace> {
        self.require_user()?;
        log::debug!("Opened workspace {} ({})", workspace.id, workspace.name);
        Ok(self.workspace.insert(workspace))
    }

    pub fn close_workspace(&mut self) -> Option<Workspace> {
        self.workspace.take()
    }

    pub fn workspace(&self) -> Option<&Workspace> {
        self.workspace.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;

    fn block_on<F: Future>(f: F) -> F::Output {
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn dummy_raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                dummy_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);
        loop {
            if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
                return result;
            }
        }
    }

    fn user() -> UserIdentity {
        UserIdentity {
            id: "u1".into(),
            email: Some("a@b.c".into()),
            onboarded: true,
        }
    }

    #[test]
    fn test_restore_from_store() {
        let store = Rc::new(MemoryCredentialStore::new());
        let mut first = AppSession::new(store.clone());
        block_on(first.sign_in(user())).unwrap();

        let mut second = AppSession::new(store.clone());
        let restored = block_on(second.initialize()).unwrap().cloned();
        assert_eq!(restored, Some(user()));
    }

    #[test]
    fn test_sign_out_clears_everything() {
        let store = Rc::new(MemoryCredentialStore::new());
        let mut session = AppSession::new(store.clone());
        assert!(matches!(
            session.open_workspace(Workspace::default()),
            Err(SessionError::NotSignedIn)
        ));
        block_on(session.sign_in(user())).unwrap();
        session.open_workspace(Workspace::default()).unwrap();
        block_on(session.sign_out()).unwrap();
        assert!(!session.is_signed_in());
        assert!(session.workspace().is_none());
        assert_eq!(block_on(store.load()).unwrap(), None);
    }

    #[test]
    fn test_corrupt_credentials_discarded() {
        let store = Rc::new(MemoryCredentialStore::new());
        block_on(store.save("{not json")).unwrap();
        let mut session = AppSession::new(store.clone());
        assert!(block_on(session.initialize()).unwrap().is_none());
        assert_eq!(block_on(store.load()).unwrap(), None);
    }

    #[test]
    fn test_workspace_fields() {
        let ws: Workspace = serde_json::from_str(
            r#"{"id":"w1","name":"Demo","whip_url":"  ","stream_id":"s1","createdAt":123}"#,
        )
        .unwrap();
        assert_eq!(ws.whip_url(), None);
        assert_eq!(ws.stream_id(), Some("s1"));
        assert_eq!(ws.playback_id(), None);
    }
}
