//! Loading and exporting key material through the key store.

use super::repository::HandleRepository;
use super::resolver::{KeyStoreResolver, DEFAULT_HANDLE_NAME};
use super::{FileAccess, KeyFileHandle, WriteRequest};
use crate::crypto::{suggest_file_name, KeyMaterial, KEY_FILE_EXTENSION, KEY_FILE_MIME};
use crate::error::{Result, VaultError};

/// Key material obtained from the key store.
#[derive(Debug)]
pub struct LoadedKey<H> {
    pub material: KeyMaterial,
    /// `true` when the user just picked or created the key file
    pub freshly_created: bool,
    pub handle: H,
}

/// Resolve the key file and parse it.
///
/// The handle is only remembered once the file parses, so a stray pick of
/// the wrong file does not replace a good stored handle.
///
/// # Errors
///
/// - `VaultError::UserCancelled` / `VaultError::PermissionDenied` from
///   resolution
/// - `VaultError::Format` if the file is not a supported key file
pub fn load_key_material<R, A>(
    resolver: &mut KeyStoreResolver<R, A>,
) -> Result<LoadedKey<A::Handle>>
where
    A: FileAccess,
    R: HandleRepository<A::Handle>,
{
    let (resolved, effects) = resolver.resolve_deferred()?;
    let material = KeyMaterial::from_json_bytes(&resolved.bytes).map_err(|err| {
        tracing::warn!(file = %resolved.handle.describe(), error = %err, "key file rejected");
        err
    })?;

    for effect in effects {
        resolver.apply(effect)?;
    }

    tracing::info!(
        file = %resolved.handle.describe(),
        fingerprint = %material.fingerprint(),
        fresh = resolved.freshly_created,
        "key material loaded"
    );

    Ok(LoadedKey {
        material,
        freshly_created: resolved.freshly_created,
        handle: resolved.handle,
    })
}

/// Save `material` as a key file the user chooses.
///
/// The suggested file name is dated and carries a short random suffix.
/// The returned handle is not stored; pass it to a repository if the new
/// file should become the active key.
pub fn export_key_material<A: FileAccess>(
    access: &mut A,
    material: &KeyMaterial,
) -> Result<A::Handle> {
    let file_name = suggest_file_name()?;
    let contents = zeroize::Zeroizing::new(material.to_json_bytes()?);
    let request = WriteRequest {
        mime: KEY_FILE_MIME,
        extension: KEY_FILE_EXTENSION,
        file_name: &file_name,
        handle_category: DEFAULT_HANDLE_NAME,
    };

    let handle = access
        .write_file(&request, &contents)?
        .ok_or(VaultError::UserCancelled)?;
    tracing::info!(file = %handle.describe(), "key material exported");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::{MemoryHandleRepository, Permission, PickRequest};

    #[derive(Debug, Clone, PartialEq)]
    struct BytesHandle(Vec<u8>);

    impl KeyFileHandle for BytesHandle {
        fn describe(&self) -> String {
            format!("{} bytes", self.0.len())
        }

        fn query_permission(&self) -> Result<Permission> {
            Ok(Permission::Granted)
        }

        fn read(&self) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct PickOnce {
        pick: Option<Vec<u8>>,
        written: Option<(String, Vec<u8>)>,
        cancel_write: bool,
    }

    impl FileAccess for PickOnce {
        type Handle = BytesHandle;

        fn pick_or_create(
            &mut self,
            _request: &PickRequest<'_>,
        ) -> Result<Option<(Vec<u8>, BytesHandle)>> {
            Ok(self
                .pick
                .take()
                .map(|bytes| (bytes.clone(), BytesHandle(bytes))))
        }

        fn request_permission(&mut self, handle: &BytesHandle) -> Result<Option<BytesHandle>> {
            Ok(Some(handle.clone()))
        }

        fn write_file(
            &mut self,
            request: &WriteRequest<'_>,
            content: &[u8],
        ) -> Result<Option<BytesHandle>> {
            if self.cancel_write {
                return Ok(None);
            }
            self.written = Some((request.file_name.to_string(), content.to_vec()));
            Ok(Some(BytesHandle(content.to_vec())))
        }
    }

    #[test]
    fn test_load_picked_key_file() {
        let material = KeyMaterial::generate().unwrap();
        let access = PickOnce {
            pick: Some(material.to_json_bytes().unwrap()),
            ..Default::default()
        };
        let mut resolver = KeyStoreResolver::new(MemoryHandleRepository::new(), access);

        let loaded = load_key_material(&mut resolver).unwrap();
        assert!(loaded.freshly_created);
        assert_eq!(loaded.material.fingerprint(), material.fingerprint());
        assert_eq!(resolver.repository().len(), 1);

        // Second load reads through the stored handle.
        let again = load_key_material(&mut resolver).unwrap();
        assert!(!again.freshly_created);
        assert_eq!(again.material.iv(), material.iv());
    }

    #[test]
    fn test_invalid_key_file_is_not_remembered() {
        let access = PickOnce {
            pick: Some(b"{\"not\":\"a key\"}".to_vec()),
            ..Default::default()
        };
        let mut resolver = KeyStoreResolver::new(MemoryHandleRepository::new(), access);

        let result = load_key_material(&mut resolver);
        assert!(matches!(result, Err(VaultError::Format(_))));
        assert!(resolver.repository().is_empty());
    }

    #[test]
    fn test_export_writes_parseable_key_file() {
        let material = KeyMaterial::generate().unwrap();
        let mut access = PickOnce::default();

        export_key_material(&mut access, &material).unwrap();

        let (file_name, content) = access.written.unwrap();
        assert!(file_name.contains("-Keypair-"));
        assert!(file_name.ends_with(".json"));
        let restored = KeyMaterial::from_json_bytes(&content).unwrap();
        assert_eq!(restored.fingerprint(), material.fingerprint());
    }

    #[test]
    fn test_export_cancelled() {
        let material = KeyMaterial::generate().unwrap();
        let mut access = PickOnce {
            cancel_write: true,
            ..Default::default()
        };

        let result = export_key_material(&mut access, &material);
        assert!(matches!(result, Err(VaultError::UserCancelled)));
    }
}
