//! Terminal implementation of the key store's file prompts.

use std::path::{Path, PathBuf};

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use ideavault_core::crypto::{
    suggest_file_name, KeyMaterial, KEY_FILE_EXTENSION, KEY_FILE_MIME,
};
use ideavault_core::fs::write_atomic;
use ideavault_core::keystore::{
    FileAccess, FsKeyFileHandle, KeyFileHandle, PickRequest, WriteRequest, DEFAULT_HANDLE_NAME,
};
use ideavault_core::{Result, VaultError};

/// File picker and permission prompts backed by dialoguer.
///
/// Without a terminal (or with `--no-input`) nothing is asked: picking and
/// permission requests are declined, and saves go straight to `key_dir`.
#[derive(Debug)]
pub struct TerminalAccess {
    key_dir: PathBuf,
    interactive: bool,
}

impl TerminalAccess {
    pub fn new(key_dir: PathBuf, interactive: bool) -> Self {
        Self {
            key_dir,
            interactive,
        }
    }

    fn ask_path(&self, prompt: &str, default: &Path) -> Result<PathBuf> {
        let value: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(default.display().to_string())
            .interact_text()
            .map_err(prompt_error)?;
        Ok(PathBuf::from(value.trim()))
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        let answer = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact_opt()
            .map_err(prompt_error)?;
        Ok(answer.unwrap_or(false))
    }

    fn open_existing(&self) -> Result<Option<(Vec<u8>, FsKeyFileHandle)>> {
        let path = self.ask_path("Key file", &self.key_dir)?;
        let contents = std::fs::read(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => {
                VaultError::NotFound(format!("Key file {}", path.display()))
            }
            _ => VaultError::from(err),
        })?;
        let handle = FsKeyFileHandle::approved(&path, &contents);
        Ok(Some((contents, handle)))
    }

    fn create_new(&mut self) -> Result<Option<(Vec<u8>, FsKeyFileHandle)>> {
        let material = KeyMaterial::generate()?;
        let contents = material.to_json_bytes()?;
        let file_name = suggest_file_name()?;
        let request = WriteRequest {
            mime: KEY_FILE_MIME,
            extension: KEY_FILE_EXTENSION,
            file_name: &file_name,
            handle_category: DEFAULT_HANDLE_NAME,
        };
        let handle = self.write_file(&request, &contents)?;
        Ok(handle.map(|handle| (contents, handle)))
    }

    fn save(&self, path: &Path, content: &[u8]) -> Result<FsKeyFileHandle> {
        write_atomic(path, content, true)?;
        tracing::debug!(path = %path.display(), "saved key file");
        Ok(FsKeyFileHandle::approved(path, content))
    }
}

impl FileAccess for TerminalAccess {
    type Handle = FsKeyFileHandle;

    fn pick_or_create(
        &mut self,
        request: &PickRequest<'_>,
    ) -> Result<Option<(Vec<u8>, FsKeyFileHandle)>> {
        if !self.interactive {
            tracing::debug!(name = request.suggested_name_prefix, "no terminal, picker declined");
            return Ok(None);
        }

        let choices = [
            "Open an existing key file",
            "Create a new key file",
            "Cancel",
        ];
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "No {} file remembered ({})",
                request.suggested_name_prefix, request.mime
            ))
            .items(&choices)
            .default(0)
            .interact_opt()
            .map_err(prompt_error)?;

        match selection {
            Some(0) => self.open_existing(),
            Some(1) => self.create_new(),
            _ => Ok(None),
        }
    }

    fn request_permission(&mut self, handle: &FsKeyFileHandle) -> Result<Option<FsKeyFileHandle>> {
        if !self.interactive {
            return Ok(None);
        }
        // Approve exactly the bytes shown to the user.
        let contents = handle.read_current()?;
        let fingerprint = KeyMaterial::from_json_bytes(&contents)
            .map(|material| material.fingerprint())
            .unwrap_or_else(|_| "not a key file".to_string());
        let prompt = if handle.is_approved() {
            format!(
                "{} changed since it was last used (fingerprint {}). Trust it?",
                handle.describe(),
                fingerprint
            )
        } else {
            format!(
                "Use {} (fingerprint {}) as your key file?",
                handle.describe(),
                fingerprint
            )
        };
        if self.confirm(&prompt)? {
            Ok(Some(FsKeyFileHandle::approved(handle.path(), &contents)))
        } else {
            Ok(None)
        }
    }

    fn write_file(
        &mut self,
        request: &WriteRequest<'_>,
        content: &[u8],
    ) -> Result<Option<FsKeyFileHandle>> {
        let default_path = self.key_dir.join(request.file_name);
        if !self.interactive {
            return self.save(&default_path, content).map(Some);
        }

        let mut path = self.ask_path("Save key file to", &default_path)?;
        if path.extension().is_none() {
            path.set_extension(request.extension);
        }
        if path.exists()
            && !self.confirm(&format!("{} exists. Overwrite it?", path.display()))?
        {
            return Ok(None);
        }
        self.save(&path, content).map(Some)
    }
}

fn prompt_error(err: dialoguer::Error) -> VaultError {
    VaultError::Storage(format!("Prompt failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideavault_core::keystore::Permission;
    use tempfile::tempdir;

    fn write_request(file_name: &str) -> WriteRequest<'_> {
        WriteRequest {
            mime: "application/json",
            extension: "json",
            file_name,
            handle_category: "keypair",
        }
    }

    #[test]
    fn test_non_interactive_pick_is_declined() {
        let dir = tempdir().unwrap();
        let mut access = TerminalAccess::new(dir.path().to_path_buf(), false);
        let request = PickRequest {
            mime: "application/json",
            extension: "json",
            suggested_name_prefix: "keypair",
        };

        assert!(access.pick_or_create(&request).unwrap().is_none());
    }

    #[test]
    fn test_non_interactive_permission_is_refused() {
        let dir = tempdir().unwrap();
        let mut access = TerminalAccess::new(dir.path().to_path_buf(), false);
        let handle = FsKeyFileHandle::new(dir.path().join("k.json"));

        assert!(access.request_permission(&handle).unwrap().is_none());
    }

    #[test]
    fn test_non_interactive_write_saves_to_key_dir() {
        let dir = tempdir().unwrap();
        let key_dir = dir.path().join("keys");
        let mut access = TerminalAccess::new(key_dir.clone(), false);

        let handle = access
            .write_file(&write_request("2024-3-14-Keypair-abcd.json"), b"{}")
            .unwrap()
            .unwrap();

        assert_eq!(handle.path(), key_dir.join("2024-3-14-Keypair-abcd.json"));
        assert_eq!(handle.query_permission().unwrap(), Permission::Granted);
    }
}
