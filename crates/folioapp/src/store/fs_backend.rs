use super::backend::{projected_usage, StorageBackend};
use crate::error::{FolioError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const ITEM_EXT: &str = ".json";

/// Filesystem storage medium: one file per key inside `root`.
pub struct FsBackend {
    root: PathBuf,
    quota: Option<usize>,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root, quota: None }
    }

    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`.
    pub fn item_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}{}", encode_key(key), ITEM_EXT))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(FolioError::Io)?;
        }
        Ok(())
    }

    fn item_files(&self) -> Result<Vec<(String, PathBuf)>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(FolioError::Io)? {
            let path = entry.map_err(FolioError::Io)?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(key) = name.strip_suffix(ITEM_EXT).and_then(decode_key) {
                items.push((key, path));
            }
        }
        Ok(items)
    }

    fn total_bytes(&self) -> Result<usize> {
        let mut total = 0;
        for (_, path) in self.item_files()? {
            total += fs::metadata(&path).map_err(FolioError::Io)?.len() as usize;
        }
        Ok(total)
    }
}

impl StorageBackend for FsBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.item_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(FolioError::Io)?;
        Ok(Some(content))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_dir()?;
        let target = self.item_path(key);

        if let Some(quota) = self.quota {
            let previous = if target.exists() {
                fs::metadata(&target).map_err(FolioError::Io)?.len() as usize
            } else {
                0
            };
            let needed = projected_usage(self.total_bytes()?, previous, value.len());
            if needed > quota {
                return Err(FolioError::QuotaExceeded {
                    needed,
                    available: quota,
                });
            }
        }

        // Atomic Write
        let tmp = self.root.join(format!(".item-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, value).map_err(FolioError::Io)?;
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(FolioError::Io(e));
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.item_path(key);
        if path.exists() {
            fs::remove_file(path).map_err(FolioError::Io)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.item_files()?.into_iter().map(|(k, _)| k).collect();
        keys.sort();
        Ok(keys)
    }
}

/// Keys may contain characters that are not portable in file names (`:` in particular).
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn decode_key(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_encoding_roundtrip() {
        for key in ["folio:saved_resumes", "folio:backup_1700000000000", "a b/c"] {
            let encoded = encode_key(key);
            assert!(!encoded.contains(':'));
            assert!(!encoded.contains('/'));
            assert_eq!(decode_key(&encoded).as_deref(), Some(key));
        }
    }

    #[test]
    fn test_decode_rejects_truncated_escape() {
        assert_eq!(decode_key("abc%4"), None);
    }
}
