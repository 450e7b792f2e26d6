//! Key file resolution state machine.
//!
//! ```text
//! NoHandle ──pick──────────────────────────────► Resolved (fresh)
//!    │ cancel                                       ▲
//!    ▼                                              │ read
//! Failed(UserCancelled)     HasHandle{Unknown} ──► HasHandle{Granted}
//!                                │ query             ▲
//!                                ├──► HasHandle{Prompt} ──grant──┘
//!                                │          │ refuse
//!                                ▼          ▼
//!                  HasHandle{Denied} ──► Failed(PermissionDenied)
//! ```
//!
//! Each [`KeyStoreResolver::advance`] call performs one transition and
//! returns any side effect (persisting a handle) instead of applying it, so
//! callers can audit or defer it. [`KeyStoreResolver::resolve`] drives the
//! machine to completion and applies effects as they occur.
//!
//! The read-then-persist sequence is not atomic; callers must not run two
//! resolutions for the same name concurrently.

use zeroize::Zeroizing;

use super::repository::HandleRepository;
use super::{FileAccess, KeyFileHandle, Permission, PickRequest};
use crate::crypto::{KEY_FILE_EXTENSION, KEY_FILE_MIME};
use crate::error::{Result, VaultError};

/// Default logical name for the key file handle.
pub const DEFAULT_HANDLE_NAME: &str = "keypair";

/// Why a resolution ended without key bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveFailure {
    UserCancelled,
    PermissionDenied,
}

/// A key file that was successfully read.
pub struct ResolvedKeyFile<H> {
    /// Raw key file contents
    pub bytes: Zeroizing<Vec<u8>>,
    /// `true` when the user just picked or created the file
    pub freshly_created: bool,
    /// Handle the bytes were read through
    pub handle: H,
}

impl<H: std::fmt::Debug> std::fmt::Debug for ResolvedKeyFile<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedKeyFile")
            .field("bytes", &format_args!("[{} bytes]", self.bytes.len()))
            .field("freshly_created", &self.freshly_created)
            .field("handle", &self.handle)
            .finish()
    }
}

/// Resolver states.
#[derive(Debug)]
pub enum ResolveState<H> {
    NoHandle,
    HasHandle { handle: H, permission: Permission },
    Resolved(ResolvedKeyFile<H>),
    Failed(ResolveFailure),
}

impl<H> ResolveState<H> {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            ResolveState::NoHandle => "no_handle",
            ResolveState::HasHandle { permission, .. } => match permission {
                Permission::Unknown => "has_handle(unknown)",
                Permission::Prompt => "has_handle(prompt)",
                Permission::Granted => "has_handle(granted)",
                Permission::Denied => "has_handle(denied)",
            },
            ResolveState::Resolved(_) => "resolved",
            ResolveState::Failed(ResolveFailure::UserCancelled) => "failed(user_cancelled)",
            ResolveState::Failed(ResolveFailure::PermissionDenied) => "failed(permission_denied)",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolveState::Resolved(_) | ResolveState::Failed(_))
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect<H> {
    PersistHandle(H),
}

/// One transition: the next state plus an optional effect.
#[derive(Debug)]
pub struct Step<H> {
    pub next: ResolveState<H>,
    pub effect: Option<Effect<H>>,
}

impl<H> Step<H> {
    fn to(next: ResolveState<H>) -> Self {
        Self { next, effect: None }
    }

    fn persisting(next: ResolveState<H>, handle: H) -> Self {
        Self {
            next,
            effect: Some(Effect::PersistHandle(handle)),
        }
    }
}

/// Locates the key file through a stored handle, prompting the user when
/// needed.
pub struct KeyStoreResolver<R, A> {
    repository: R,
    access: A,
    name: String,
}

impl<R, A> KeyStoreResolver<R, A>
where
    A: FileAccess,
    R: HandleRepository<A::Handle>,
{
    /// Create a resolver using the default handle name.
    pub fn new(repository: R, access: A) -> Self {
        Self {
            repository,
            access,
            name: DEFAULT_HANDLE_NAME.to_string(),
        }
    }

    /// Use a different logical handle name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    /// Initial state, from whatever the repository holds.
    pub fn begin(&self) -> Result<ResolveState<A::Handle>> {
        let state = match self.repository.load(&self.name)? {
            Some(handle) => ResolveState::HasHandle {
                handle,
                permission: Permission::Unknown,
            },
            None => ResolveState::NoHandle,
        };
        Ok(state)
    }

    /// Perform one transition. Terminal states are returned unchanged.
    pub fn advance(&mut self, state: ResolveState<A::Handle>) -> Result<Step<A::Handle>> {
        let from = state.label();
        let step = match state {
            ResolveState::NoHandle => self.pick()?,
            ResolveState::HasHandle {
                handle,
                permission: Permission::Unknown,
            } => Self::query(handle)?,
            ResolveState::HasHandle {
                handle,
                permission: Permission::Granted,
            } => Self::read(handle)?,
            ResolveState::HasHandle {
                handle,
                permission: Permission::Prompt,
            } => self.request(handle)?,
            ResolveState::HasHandle {
                permission: Permission::Denied,
                ..
            } => Step::to(ResolveState::Failed(ResolveFailure::PermissionDenied)),
            terminal => Step::to(terminal),
        };
        tracing::debug!(
            name = %self.name,
            from,
            to = step.next.label(),
            persist = step.effect.is_some(),
            "key store transition"
        );
        Ok(step)
    }

    /// Apply an effect returned by [`advance`](Self::advance).
    pub fn apply(&mut self, effect: Effect<A::Handle>) -> Result<()> {
        match effect {
            Effect::PersistHandle(handle) => {
                self.repository.store(&self.name, &handle)?;
                tracing::info!(name = %self.name, file = %handle.describe(), "remembered key file");
            }
        }
        Ok(())
    }

    /// Run the machine to a terminal state without applying effects.
    ///
    /// Returns the resolved file and the effects the caller still has to
    /// apply. Effects gathered on a failed path are discarded.
    pub fn resolve_deferred(
        &mut self,
    ) -> Result<(ResolvedKeyFile<A::Handle>, Vec<Effect<A::Handle>>)> {
        let mut effects = Vec::new();
        let mut state = self.begin()?;
        loop {
            state = match state {
                ResolveState::Resolved(resolved) => return Ok((resolved, effects)),
                ResolveState::Failed(failure) => return Err(self.failure_error(failure)),
                pending => {
                    let step = self.advance(pending)?;
                    effects.extend(step.effect);
                    step.next
                }
            };
        }
    }

    /// Resolve the key file, persisting handles as transitions request.
    ///
    /// # Errors
    ///
    /// - `VaultError::UserCancelled` if the user closed the picker
    /// - `VaultError::PermissionDenied` if access was refused or revoked
    pub fn resolve(&mut self) -> Result<ResolvedKeyFile<A::Handle>> {
        let (resolved, effects) = self.resolve_deferred()?;
        for effect in effects {
            self.apply(effect)?;
        }
        Ok(resolved)
    }

    /// Forget the stored handle. Returns whether one existed.
    pub fn forget(&mut self) -> Result<bool> {
        self.repository.remove(&self.name)
    }

    fn pick(&mut self) -> Result<Step<A::Handle>> {
        let request = PickRequest {
            mime: KEY_FILE_MIME,
            extension: KEY_FILE_EXTENSION,
            suggested_name_prefix: &self.name,
        };
        let step = match self.access.pick_or_create(&request)? {
            Some((bytes, handle)) => Step::persisting(
                ResolveState::Resolved(ResolvedKeyFile {
                    bytes: Zeroizing::new(bytes),
                    freshly_created: true,
                    handle: handle.clone(),
                }),
                handle,
            ),
            None => Step::to(ResolveState::Failed(ResolveFailure::UserCancelled)),
        };
        Ok(step)
    }

    fn query(handle: A::Handle) -> Result<Step<A::Handle>> {
        match handle.query_permission() {
            Ok(permission) => {
                // A handle that cannot tell is treated as needing confirmation.
                let permission = match permission {
                    Permission::Unknown => Permission::Prompt,
                    other => other,
                };
                Ok(Step::to(ResolveState::HasHandle { handle, permission }))
            }
            Err(err) if is_access_error(&err) => {
                tracing::warn!(file = %handle.describe(), error = %err, "permission query failed");
                Ok(Step::to(ResolveState::Failed(
                    ResolveFailure::PermissionDenied,
                )))
            }
            Err(err) => Err(err),
        }
    }

    fn read(handle: A::Handle) -> Result<Step<A::Handle>> {
        match handle.read() {
            Ok(bytes) => Ok(Step::to(ResolveState::Resolved(ResolvedKeyFile {
                bytes: Zeroizing::new(bytes),
                freshly_created: false,
                handle,
            }))),
            Err(err) if is_access_error(&err) => {
                tracing::warn!(file = %handle.describe(), error = %err, "key file read refused");
                Ok(Step::to(ResolveState::Failed(
                    ResolveFailure::PermissionDenied,
                )))
            }
            Err(err) => Err(err),
        }
    }

    fn request(&mut self, handle: A::Handle) -> Result<Step<A::Handle>> {
        let step = match self.access.request_permission(&handle)? {
            Some(refreshed) => Step::persisting(
                ResolveState::HasHandle {
                    handle: refreshed.clone(),
                    permission: Permission::Granted,
                },
                refreshed,
            ),
            None => Step::to(ResolveState::Failed(ResolveFailure::PermissionDenied)),
        };
        Ok(step)
    }

    fn failure_error(&self, failure: ResolveFailure) -> VaultError {
        match failure {
            ResolveFailure::UserCancelled => VaultError::UserCancelled,
            ResolveFailure::PermissionDenied => VaultError::PermissionDenied(format!(
                "access to key file \"{}\" was not granted",
                self.name
            )),
        }
    }
}

fn is_access_error(err: &VaultError) -> bool {
    match err {
        VaultError::PermissionDenied(_) => true,
        VaultError::Io { source } => matches!(
            source.kind(),
            std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::NotFound
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::{MemoryHandleRepository, WriteRequest};

    /// Error a fake handle raises from `query_permission` or `read`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum FakeFailure {
        Refused,
        Missing,
        Broken,
    }

    impl FakeFailure {
        fn error(self) -> VaultError {
            match self {
                FakeFailure::Refused => VaultError::PermissionDenied("revoked".into()),
                FakeFailure::Missing => std::io::Error::from(std::io::ErrorKind::NotFound).into(),
                FakeFailure::Broken => VaultError::Storage("handle store offline".into()),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct FakeHandle {
        id: u32,
        permission: Permission,
        contents: Vec<u8>,
        query_fails: Option<FakeFailure>,
        read_fails: Option<FakeFailure>,
    }

    impl FakeHandle {
        fn new(id: u32, permission: Permission) -> Self {
            Self {
                id,
                permission,
                contents: format!("key-{}", id).into_bytes(),
                query_fails: None,
                read_fails: None,
            }
        }

        fn failing_query(id: u32, failure: FakeFailure) -> Self {
            Self {
                query_fails: Some(failure),
                ..Self::new(id, Permission::Granted)
            }
        }

        fn failing_read(id: u32, failure: FakeFailure) -> Self {
            Self {
                read_fails: Some(failure),
                ..Self::new(id, Permission::Granted)
            }
        }
    }

    impl KeyFileHandle for FakeHandle {
        fn describe(&self) -> String {
            format!("fake-{}", self.id)
        }

        fn query_permission(&self) -> Result<Permission> {
            match self.query_fails {
                Some(failure) => Err(failure.error()),
                None => Ok(self.permission),
            }
        }

        fn read(&self) -> Result<Vec<u8>> {
            if let Some(failure) = self.read_fails {
                return Err(failure.error());
            }
            match self.permission {
                Permission::Granted => Ok(self.contents.clone()),
                _ => Err(VaultError::PermissionDenied("not granted".into())),
            }
        }
    }

    #[derive(Default)]
    struct FakeAccess {
        pick: Option<FakeHandle>,
        grant: bool,
        picks: u32,
        requests: u32,
    }

    impl FileAccess for FakeAccess {
        type Handle = FakeHandle;

        fn pick_or_create(
            &mut self,
            _request: &PickRequest<'_>,
        ) -> Result<Option<(Vec<u8>, FakeHandle)>> {
            self.picks += 1;
            Ok(self
                .pick
                .clone()
                .map(|handle| (handle.contents.clone(), handle)))
        }

        fn request_permission(&mut self, handle: &FakeHandle) -> Result<Option<FakeHandle>> {
            self.requests += 1;
            if self.grant {
                let mut refreshed = handle.clone();
                refreshed.permission = Permission::Granted;
                Ok(Some(refreshed))
            } else {
                Ok(None)
            }
        }

        fn write_file(
            &mut self,
            _request: &WriteRequest<'_>,
            _content: &[u8],
        ) -> Result<Option<FakeHandle>> {
            Ok(None)
        }
    }

    fn resolver_with(
        stored: Option<FakeHandle>,
        access: FakeAccess,
    ) -> KeyStoreResolver<MemoryHandleRepository<FakeHandle>, FakeAccess> {
        let mut repository = MemoryHandleRepository::new();
        if let Some(handle) = stored {
            repository.store(DEFAULT_HANDLE_NAME, &handle).unwrap();
        }
        KeyStoreResolver::new(repository, access)
    }

    #[test]
    fn test_no_handle_pick_persists_and_resolves_fresh() {
        let picked = FakeHandle::new(1, Permission::Granted);
        let mut resolver = resolver_with(
            None,
            FakeAccess {
                pick: Some(picked.clone()),
                ..Default::default()
            },
        );

        let resolved = resolver.resolve().unwrap();
        assert!(resolved.freshly_created);
        assert_eq!(resolved.bytes.as_slice(), b"key-1");
        assert_eq!(
            resolver.repository().load(DEFAULT_HANDLE_NAME).unwrap(),
            Some(picked)
        );
    }

    #[test]
    fn test_no_handle_cancel_fails_user_cancelled() {
        let mut resolver = resolver_with(None, FakeAccess::default());

        let result = resolver.resolve();
        assert!(matches!(result, Err(VaultError::UserCancelled)));
        assert!(resolver.repository().is_empty());
    }

    #[test]
    fn test_granted_handle_reads_without_prompting() {
        let stored = FakeHandle::new(2, Permission::Granted);
        let mut resolver = resolver_with(Some(stored), FakeAccess::default());

        let resolved = resolver.resolve().unwrap();
        assert!(!resolved.freshly_created);
        assert_eq!(resolved.bytes.as_slice(), b"key-2");
        assert_eq!(resolver.access().picks, 0);
        assert_eq!(resolver.access().requests, 0);
    }

    #[test]
    fn test_prompt_then_grant_resolves_and_repersists() {
        let stored = FakeHandle::new(3, Permission::Prompt);
        let mut resolver = resolver_with(
            Some(stored),
            FakeAccess {
                grant: true,
                ..Default::default()
            },
        );

        let resolved = resolver.resolve().unwrap();
        assert_eq!(resolved.bytes.as_slice(), b"key-3");
        assert_eq!(resolver.access().requests, 1);

        let persisted = resolver.repository().load(DEFAULT_HANDLE_NAME).unwrap();
        assert_eq!(persisted.map(|h| h.permission), Some(Permission::Granted));
    }

    #[test]
    fn test_prompt_then_refuse_fails_permission_denied() {
        let stored = FakeHandle::new(4, Permission::Prompt);
        let mut resolver = resolver_with(Some(stored.clone()), FakeAccess::default());

        let result = resolver.resolve();
        assert!(matches!(result, Err(VaultError::PermissionDenied(_))));
        // No implicit fallback to re-picking, and the stored handle is untouched.
        assert_eq!(resolver.access().picks, 0);
        assert_eq!(
            resolver.repository().load(DEFAULT_HANDLE_NAME).unwrap(),
            Some(stored)
        );
    }

    #[test]
    fn test_denied_handle_fails_without_prompt() {
        let stored = FakeHandle::new(5, Permission::Denied);
        let mut resolver = resolver_with(Some(stored), FakeAccess::default());

        let result = resolver.resolve();
        assert!(matches!(result, Err(VaultError::PermissionDenied(_))));
        assert_eq!(resolver.access().requests, 0);
        assert_eq!(resolver.access().picks, 0);
    }

    #[test]
    fn test_step_by_step_transitions_are_explicit() {
        let stored = FakeHandle::new(6, Permission::Prompt);
        let mut resolver = resolver_with(
            Some(stored),
            FakeAccess {
                grant: true,
                ..Default::default()
            },
        );

        let state = resolver.begin().unwrap();
        assert_eq!(state.label(), "has_handle(unknown)");

        let step = resolver.advance(state).unwrap();
        assert_eq!(step.next.label(), "has_handle(prompt)");
        assert!(step.effect.is_none());

        let step = resolver.advance(step.next).unwrap();
        assert_eq!(step.next.label(), "has_handle(granted)");
        assert!(matches!(step.effect, Some(Effect::PersistHandle(_))));

        // Nothing persisted until the caller applies the effect.
        let stored = resolver.repository().load(DEFAULT_HANDLE_NAME).unwrap();
        assert_eq!(stored.map(|h| h.permission), Some(Permission::Prompt));

        let step = resolver.advance(step.next).unwrap();
        assert!(step.next.is_terminal());
        assert_eq!(step.next.label(), "resolved");
    }

    #[test]
    fn test_resolve_deferred_leaves_repository_untouched() {
        let picked = FakeHandle::new(7, Permission::Granted);
        let mut resolver = resolver_with(
            None,
            FakeAccess {
                pick: Some(picked.clone()),
                ..Default::default()
            },
        );

        let (resolved, effects) = resolver.resolve_deferred().unwrap();
        assert!(resolved.freshly_created);
        assert_eq!(effects, vec![Effect::PersistHandle(picked)]);
        assert!(resolver.repository().is_empty());
    }

    #[test]
    fn test_custom_names_do_not_collide() {
        let mut repository: MemoryHandleRepository<FakeHandle> = MemoryHandleRepository::new();
        repository
            .store("work", &FakeHandle::new(8, Permission::Granted))
            .unwrap();

        let mut resolver =
            KeyStoreResolver::new(repository, FakeAccess::default()).with_name("personal");
        assert_eq!(resolver.name(), "personal");

        let result = resolver.resolve();
        assert!(matches!(result, Err(VaultError::UserCancelled)));
    }

    #[test]
    fn test_forget_removes_handle() {
        let stored = FakeHandle::new(9, Permission::Granted);
        let mut resolver = resolver_with(Some(stored), FakeAccess::default());

        assert!(resolver.forget().unwrap());
        assert!(!resolver.forget().unwrap());
        assert_eq!(resolver.begin().unwrap().label(), "no_handle");
    }

    #[test]
    fn test_query_access_errors_fail_permission_denied() {
        for failure in [FakeFailure::Refused, FakeFailure::Missing] {
            let stored = FakeHandle::failing_query(10, failure);
            let mut resolver = resolver_with(Some(stored), FakeAccess::default());

            let state = resolver.begin().unwrap();
            let step = resolver.advance(state).unwrap();
            assert_eq!(step.next.label(), "failed(permission_denied)", "{:?}", failure);
            assert!(step.effect.is_none());

            let result = resolver.resolve();
            assert!(matches!(result, Err(VaultError::PermissionDenied(_))));
            assert_eq!(resolver.access().picks, 0);
            assert_eq!(resolver.access().requests, 0);
        }
    }

    #[test]
    fn test_query_other_errors_propagate() {
        let stored = FakeHandle::failing_query(11, FakeFailure::Broken);
        let mut resolver = resolver_with(Some(stored), FakeAccess::default());

        let state = resolver.begin().unwrap();
        assert!(matches!(
            resolver.advance(state),
            Err(VaultError::Storage(_))
        ));
        assert!(matches!(resolver.resolve(), Err(VaultError::Storage(_))));
    }

    #[test]
    fn test_unknown_after_query_is_treated_as_prompt() {
        let stored = FakeHandle::new(12, Permission::Unknown);
        let mut resolver = resolver_with(
            Some(stored),
            FakeAccess {
                grant: true,
                ..Default::default()
            },
        );

        let state = resolver.begin().unwrap();
        let step = resolver.advance(state).unwrap();
        assert_eq!(step.next.label(), "has_handle(prompt)");

        let resolved = resolver.resolve().unwrap();
        assert_eq!(resolved.bytes.as_slice(), b"key-12");
        assert_eq!(resolver.access().requests, 1);
    }

    #[test]
    fn test_granted_read_access_error_fails_permission_denied() {
        for failure in [FakeFailure::Refused, FakeFailure::Missing] {
            let stored = FakeHandle::failing_read(13, failure);
            let mut resolver = resolver_with(Some(stored.clone()), FakeAccess::default());

            let step = resolver
                .advance(ResolveState::HasHandle {
                    handle: stored,
                    permission: Permission::Granted,
                })
                .unwrap();
            assert_eq!(step.next.label(), "failed(permission_denied)", "{:?}", failure);
            assert!(matches!(
                resolver.resolve(),
                Err(VaultError::PermissionDenied(_))
            ));
        }
    }

    #[test]
    fn test_granted_read_other_error_propagates() {
        let stored = FakeHandle::failing_read(14, FakeFailure::Broken);
        let mut resolver = resolver_with(Some(stored), FakeAccess::default());

        assert!(matches!(resolver.resolve(), Err(VaultError::Storage(_))));
    }
}
