use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use eyre::Result;
use log::{debug, info, warn};

use crate::models::user::User;
use crate::session::persist::{Cookie, CookieJar, KeyValueStorage, SameSite};

pub const USER_STORAGE_KEY: &str = "user";
pub const USER_COOKIE: &str = "user";
pub const PROFILE_STORAGE_KEY: &str = "userProfile";

const COOKIE_TTL_DAYS: i64 = 7;

/// Process-wide holder of the signed-in user. The record is mirrored into
/// durable storage and a cookie on every login so the request gate can make
/// its decision from cookie presence alone. Nothing is signed: the mirrors
/// are plain JSON the client fully controls.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    cookies: Arc<dyn CookieJar>,
    current: Mutex<Option<User>>,
}

impl SessionStore {
    /// Hydrates from durable storage first, then the cookie. Unparseable
    /// state clears both mirrors and yields logged-out; hydration never
    /// fails.
    pub fn open(storage: Arc<dyn KeyValueStorage>, cookies: Arc<dyn CookieJar>) -> Self {
        let current = hydrate(storage.as_ref(), cookies.as_ref());
        Self {
            storage,
            cookies,
            current: Mutex::new(current),
        }
    }

    pub fn login(&self, user: User) -> Result<()> {
        let serialized = serde_json::to_string(&user)?;

        self.storage.set(USER_STORAGE_KEY, &serialized)?;
        self.cookies.set(Cookie {
            name: USER_COOKIE.to_string(),
            value: serialized,
            expires: Utc::now() + Duration::days(COOKIE_TTL_DAYS),
            same_site: SameSite::Lax,
            path: "/".to_string(),
        })?;

        info!("signed in as {}", user.email);
        *self.current.lock().unwrap() = Some(user);
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.storage.remove(USER_STORAGE_KEY)?;
        self.storage.remove(PROFILE_STORAGE_KEY)?;
        self.cookies.expire(USER_COOKIE)?;
        *self.current.lock().unwrap() = None;

        info!("signed out");
        Ok(())
    }

    pub fn current(&self) -> Option<User> {
        self.current.lock().unwrap().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }

    /// What the request gate sees: cookie presence, contents uninspected.
    pub fn has_session_cookie(&self) -> bool {
        self.cookies.get(USER_COOKIE).is_some()
    }
}

fn hydrate(storage: &dyn KeyValueStorage, cookies: &dyn CookieJar) -> Option<User> {
    if let Some(raw) = storage.get(USER_STORAGE_KEY) {
        match serde_json::from_str(&raw) {
            Ok(user) => {
                debug!("session hydrated from storage");
                return Some(user);
            }
            Err(e) => {
                warn!("stored session is unreadable, clearing it: {}", e);
                clear_mirrors(storage, cookies);
                return None;
            }
        }
    }

    if let Some(cookie) = cookies.get(USER_COOKIE) {
        match serde_json::from_str(&cookie.value) {
            Ok(user) => {
                debug!("session hydrated from cookie");
                return Some(user);
            }
            Err(e) => {
                warn!("session cookie is unreadable, clearing it: {}", e);
                clear_mirrors(storage, cookies);
            }
        }
    }

    None
}

fn clear_mirrors(storage: &dyn KeyValueStorage, cookies: &dyn CookieJar) {
    if let Err(e) = storage.remove(USER_STORAGE_KEY) {
        debug!("failed to clear stored session: {}", e);
    }
    if let Err(e) = cookies.expire(USER_COOKIE) {
        debug!("failed to expire session cookie: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::user::Profile;
    use crate::session::persist::testing::MemoryCookieJar;
    use crate::session::persist::MemoryStorage;

    fn test_user() -> User {
        User {
            id: "u-42".to_string(),
            email: "ada@example.com".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            profile: Profile {
                skills: vec!["Rust".to_string(), "SQL".to_string()],
                ..Profile::default()
            },
        }
    }

    fn fresh_store() -> (Arc<MemoryStorage>, Arc<MemoryCookieJar>, SessionStore) {
        let storage = Arc::new(MemoryStorage::new());
        let cookies = Arc::new(MemoryCookieJar::new());
        let store = SessionStore::open(storage.clone(), cookies.clone());
        (storage, cookies, store)
    }

    #[test]
    fn login_mirrors_to_storage_and_cookie() {
        let (storage, cookies, store) = fresh_store();
        let user = test_user();

        store.login(user.clone()).unwrap();

        let stored: User =
            serde_json::from_str(&storage.get(USER_STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(stored, user);

        let cookie = cookies.get(USER_COOKIE).unwrap();
        let from_cookie: User = serde_json::from_str(&cookie.value).unwrap();
        assert_eq!(from_cookie, user);
        assert_eq!(cookie.same_site, SameSite::Lax);
        assert_eq!(cookie.path, "/");
        assert!(cookie.expires > Utc::now() + Duration::days(6));

        assert!(store.is_authenticated());
        assert_eq!(store.current(), Some(user));
    }

    #[test]
    fn logout_clears_all_three_copies() {
        let (storage, cookies, store) = fresh_store();
        store.login(test_user()).unwrap();

        store.logout().unwrap();

        assert_eq!(storage.get(USER_STORAGE_KEY), None);
        assert!(cookies.get(USER_COOKIE).is_none());
        assert_eq!(store.current(), None);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn hydrates_from_storage_first() {
        let storage = Arc::new(MemoryStorage::new());
        let cookies = Arc::new(MemoryCookieJar::new());
        let user = test_user();
        storage
            .set(USER_STORAGE_KEY, &serde_json::to_string(&user).unwrap())
            .unwrap();

        let store = SessionStore::open(storage, cookies);
        assert_eq!(store.current(), Some(user));
    }

    #[test]
    fn falls_back_to_cookie_when_storage_is_empty() {
        let storage = Arc::new(MemoryStorage::new());
        let cookies = Arc::new(MemoryCookieJar::new());
        let user = test_user();
        cookies
            .set(Cookie {
                name: USER_COOKIE.to_string(),
                value: serde_json::to_string(&user).unwrap(),
                expires: Utc::now() + Duration::days(1),
                same_site: SameSite::Lax,
                path: "/".to_string(),
            })
            .unwrap();

        let store = SessionStore::open(storage, cookies);
        assert_eq!(store.current(), Some(user));
    }

    #[test]
    fn unparseable_state_fails_open_to_logged_out() {
        let storage = Arc::new(MemoryStorage::new());
        let cookies = Arc::new(MemoryCookieJar::new());
        storage.set(USER_STORAGE_KEY, "{definitely not json").unwrap();
        cookies
            .set(Cookie {
                name: USER_COOKIE.to_string(),
                value: "also broken".to_string(),
                expires: Utc::now() + Duration::days(1),
                same_site: SameSite::Lax,
                path: "/".to_string(),
            })
            .unwrap();

        let store = SessionStore::open(storage.clone(), cookies.clone());

        assert_eq!(store.current(), None);
        assert_eq!(storage.get(USER_STORAGE_KEY), None);
        assert!(cookies.get(USER_COOKIE).is_none());
    }
}
