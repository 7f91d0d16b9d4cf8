//! File Cache Module
//!
//! Filesystem-backed cache. Each key maps to one file named by the SHA-256
//! of the key (key length and character set never reach the filesystem),
//! so the verbatim key is stored inside the file for iteration. Layout,
//! little-endian:
//!
//! ```text
//! [8B expires_at ms, 0 = never][4B key length][key bytes][encoded payload]
//! ```
//!
//! Reads that find an expired file delete it and report absent. That
//! check-then-delete, like the derived `add`/`replace`/`incr` sequences, is
//! not atomic against a concurrent writer in another process; this backend
//! offers no cross-process atomicity guarantee. Writes themselves go
//! through a temp file plus rename, so a reader never observes a partially
//! written file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::contract::{counter_add, counter_value, Cache, ReplaceTtl, Ttl};
use crate::cache::entry::{ttl_to_expires_at, CacheEntry};
use crate::codec::{Codec, JsonCodec};
use crate::error::{CacheError, Result};
use crate::pattern::KeyPattern;

/// Default extension for cache files.
pub const DEFAULT_EXT: &str = ".cache";

/// Bytes of fixed-width header before the key: expiration + key length.
const HEADER_LEN: usize = 12;

// == File Cache ==
/// Filesystem cache backend rooted at one directory.
pub struct FileCache<C: Codec = JsonCodec> {
    dir: PathBuf,
    ext: String,
    codec: C,
}

impl FileCache<JsonCodec> {
    /// Opens (creating if needed) a cache directory with the default JSON
    /// codec and [`DEFAULT_EXT`].
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_codec(dir, JsonCodec)
    }
}

impl<C: Codec> FileCache<C> {
    /// Opens a cache directory with an explicit codec.
    ///
    /// The directory is created owner-only (0o700) on Unix, since cache
    /// contents may be sensitive.
    pub fn with_codec(dir: impl AsRef<Path>, codec: C) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            fs::DirBuilder::new().recursive(true).mode(0o700).create(&dir)?;
        }
        #[cfg(not(unix))]
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            ext: DEFAULT_EXT.to_string(),
            codec,
        })
    }

    /// Replaces the cache file extension (must start with a dot).
    pub fn with_extension(mut self, ext: &str) -> Self {
        self.ext = ext.to_string();
        self
    }

    /// Directory this cache stores its files in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a key to its file path: hex SHA-256 of the key plus extension.
    fn key_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}{}", hex::encode(digest), self.ext))
    }

    /// Parses a cache file into its original key and entry.
    ///
    /// Returns `Ok(None)` if the file is missing or expired; an expired
    /// file is deleted on the way out (lazy expiry).
    fn load(&self, path: &Path) -> Result<Option<(String, CacheEntry)>> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (key, entry) = parse_file(path, &data)?;
        if entry.is_expired() {
            debug!(path = %path.display(), "purging expired cache file");
            remove_if_exists(path)?;
            return Ok(None);
        }
        Ok(Some((key, entry)))
    }

    /// Writes a complete cache file via temp-file-and-rename.
    fn store(&self, key: &str, payload: &[u8], expires_at: Option<u64>) -> Result<()> {
        let mut buf = Vec::with_capacity(HEADER_LEN + key.len() + payload.len());
        buf.extend_from_slice(&expires_at.unwrap_or(0).to_le_bytes());
        buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
        buf.extend_from_slice(key.as_bytes());
        buf.extend_from_slice(payload);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&buf)?;
        tmp.persist(self.key_path(key)).map_err(|e| e.error)?;
        Ok(())
    }

    /// Yields the paths of all cache files currently in the directory.
    fn cache_files(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for dirent in fs::read_dir(&self.dir)? {
            let path = dirent?.path();
            if !path.is_file() {
                continue;
            }
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            if name.ends_with(&self.ext) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

/// Splits raw file bytes into the stored key and its entry.
fn parse_file(path: &Path, data: &[u8]) -> Result<(String, CacheEntry)> {
    let corrupt = || CacheError::CorruptFile(path.to_path_buf());

    if data.len() < HEADER_LEN {
        return Err(corrupt());
    }
    let expires_raw = u64::from_le_bytes(data[0..8].try_into().map_err(|_| corrupt())?);
    let key_len = u32::from_le_bytes(data[8..12].try_into().map_err(|_| corrupt())?) as usize;
    if data.len() < HEADER_LEN + key_len {
        return Err(corrupt());
    }

    let key = std::str::from_utf8(&data[HEADER_LEN..HEADER_LEN + key_len])
        .map_err(|_| corrupt())?
        .to_string();
    let entry = CacheEntry {
        value: data[HEADER_LEN + key_len..].to_vec(),
        expires_at: if expires_raw == 0 { None } else { Some(expires_raw) },
    };
    Ok((key, entry))
}

/// Deletes a file, tolerating a concurrent deletion.
fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl<C: Codec> Cache for FileCache<C> {
    fn read(&self, key: &str) -> Result<Option<Value>> {
        match self.load(&self.key_path(key))? {
            Some((_, entry)) => Ok(Some(self.codec.decode(&entry.value)?)),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<()> {
        let payload = self.codec.encode(value)?;
        self.store(key, &payload, ttl_to_expires_at(ttl))
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let path = self.key_path(key);
        // Expired files are purged by load and do not count as removals.
        if self.load(&path)?.is_none() {
            return Ok(false);
        }
        remove_if_exists(&path)?;
        Ok(true)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.load(&self.key_path(key))?.is_some())
    }

    fn get_ttl(&self, key: &str) -> Result<Option<Ttl>> {
        Ok(self
            .load(&self.key_path(key))?
            .map(|(_, entry)| Ttl::from_seconds(entry.ttl_remaining())))
    }

    fn set_ttl(&self, key: &str, ttl: Option<u64>) -> Result<bool> {
        match self.load(&self.key_path(key))? {
            Some((_, entry)) => {
                self.store(key, &entry.value, ttl_to_expires_at(ttl))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        let pattern = pattern.map(KeyPattern::new).transpose()?;
        let mut keys = Vec::new();
        for path in self.cache_files()? {
            // load purges expired files encountered along the way
            if let Some((key, _)) = self.load(&path)? {
                if pattern.as_ref().map_or(true, |p| p.matches(&key)) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }

    fn clear(&self) -> Result<()> {
        for path in self.cache_files()? {
            remove_if_exists(&path)?;
        }
        Ok(())
    }

    fn replace(&self, key: &str, value: &Value, ttl: ReplaceTtl) -> Result<bool> {
        let path = self.key_path(key);
        let current = match self.load(&path)? {
            Some((_, entry)) => entry,
            None => return Ok(false),
        };
        // Keep reuses the absolute timestamp so repeated replaces do not
        // drift the expiration by rounding.
        let expires_at = match ttl {
            ReplaceTtl::Keep => current.expires_at,
            ReplaceTtl::Never => None,
            ReplaceTtl::Seconds(s) => ttl_to_expires_at(Some(s)),
        };
        let payload = self.codec.encode(value)?;
        self.store(key, &payload, expires_at)?;
        Ok(true)
    }

    fn incr(&self, key: &str, delta: i64) -> Result<i64> {
        let (current, expires_at) = match self.load(&self.key_path(key))? {
            Some((_, entry)) => (
                counter_value(key, &self.codec.decode(&entry.value)?)?,
                entry.expires_at,
            ),
            None => (0, None),
        };
        let next = counter_add(key, current, delta)?;
        let payload = self.codec.encode(&Value::from(next))?;
        self.store(key, &payload, expires_at)?;
        Ok(next)
    }
}
