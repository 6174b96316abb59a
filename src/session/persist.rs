use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr};
use log::debug;
use serde::{Deserialize, Serialize};

/// Durable key-value storage, the stand-in for the browser's localStorage.
/// Implementations swallow nothing: callers decide what a write failure
/// means.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires: DateTime<Utc>,
    pub same_site: SameSite,
    pub path: String,
}

impl Cookie {
    pub fn is_expired(&self) -> bool {
        self.expires <= Utc::now()
    }
}

/// The cookie mirror. `get` already applies browser presence semantics:
/// an expired cookie is gone.
pub trait CookieJar: Send + Sync {
    fn set(&self, cookie: Cookie) -> Result<()>;
    fn get(&self, name: &str) -> Option<Cookie>;
    fn expire(&self, name: &str) -> Result<()>;
}

/// JSON map on disk, one file per store.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("failed to create {}", parent.display()))?;
        }

        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                debug!("discarding unreadable storage file {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, raw)
            .wrap_err_with(|| format!("failed to write {}", self.path.display()))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

/// Cookie file next to the storage file. Expired entries are dropped on
/// read, matching what a browser would send.
pub struct FileCookieJar {
    path: PathBuf,
    cookies: Mutex<HashMap<String, Cookie>>,
}

impl FileCookieJar {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("failed to create {}", parent.display()))?;
        }

        let cookies = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                debug!("discarding unreadable cookie file {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            path,
            cookies: Mutex::new(cookies),
        })
    }

    fn flush(&self, cookies: &HashMap<String, Cookie>) -> Result<()> {
        let raw = serde_json::to_string_pretty(cookies)?;
        fs::write(&self.path, raw)
            .wrap_err_with(|| format!("failed to write {}", self.path.display()))
    }
}

impl CookieJar for FileCookieJar {
    fn set(&self, cookie: Cookie) -> Result<()> {
        let mut cookies = self.cookies.lock().unwrap();
        cookies.insert(cookie.name.clone(), cookie);
        self.flush(&cookies)
    }

    fn get(&self, name: &str) -> Option<Cookie> {
        let cookies = self.cookies.lock().unwrap();
        cookies.get(name).filter(|c| !c.is_expired()).cloned()
    }

    fn expire(&self, name: &str) -> Result<()> {
        let mut cookies = self.cookies.lock().unwrap();
        if cookies.remove(name).is_some() {
            self.flush(&cookies)?;
        }
        Ok(())
    }
}

/// Process-lifetime storage, the stand-in for sessionStorage. Used for the
/// OAuth CSRF state, which must not outlive the run that minted it.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// In-memory jar with the same presence semantics as the file jar.
    #[derive(Default)]
    pub struct MemoryCookieJar {
        cookies: Mutex<HashMap<String, Cookie>>,
    }

    impl MemoryCookieJar {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl CookieJar for MemoryCookieJar {
        fn set(&self, cookie: Cookie) -> Result<()> {
            self.cookies.lock().unwrap().insert(cookie.name.clone(), cookie);
            Ok(())
        }

        fn get(&self, name: &str) -> Option<Cookie> {
            self.cookies.lock().unwrap().get(name).filter(|c| !c.is_expired()).cloned()
        }

        fn expire(&self, name: &str) -> Result<()> {
            self.cookies.lock().unwrap().remove(name);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn file_storage_round_trips_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set("user", r#"{"id":"u1"}"#).unwrap();
        }

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("user").as_deref(), Some(r#"{"id":"u1"}"#));

        reopened.remove("user").unwrap();
        assert_eq!(reopened.get("user"), None);

        let reopened_again = FileStorage::open(&path).unwrap();
        assert_eq!(reopened_again.get("user"), None);
    }

    #[test]
    fn corrupt_storage_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json at all").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("user"), None);
    }

    #[test]
    fn expired_cookies_are_absent() {
        let dir = TempDir::new().unwrap();
        let jar = FileCookieJar::open(dir.path().join("cookies.json")).unwrap();

        jar.set(Cookie {
            name: "user".to_string(),
            value: "{}".to_string(),
            expires: Utc::now() - Duration::minutes(1),
            same_site: SameSite::Lax,
            path: "/".to_string(),
        })
        .unwrap();

        assert!(jar.get("user").is_none());
    }

    #[test]
    fn live_cookies_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");

        {
            let jar = FileCookieJar::open(&path).unwrap();
            jar.set(Cookie {
                name: "user".to_string(),
                value: r#"{"id":"u1"}"#.to_string(),
                expires: Utc::now() + Duration::days(7),
                same_site: SameSite::Lax,
                path: "/".to_string(),
            })
            .unwrap();
        }

        let jar = FileCookieJar::open(&path).unwrap();
        let cookie = jar.get("user").unwrap();
        assert_eq!(cookie.value, r#"{"id":"u1"}"#);
        assert_eq!(cookie.same_site, SameSite::Lax);

        jar.expire("user").unwrap();
        assert!(jar.get("user").is_none());
    }
}
