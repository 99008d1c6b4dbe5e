use std::{borrow::Borrow, collections::HashSet, hash::Hash, time::SystemTime};

use serde::{Deserialize, Serialize};

#[derive(Debug, Hash, PartialEq, Eq, Serialize, Deserialize, Clone)]
pub struct Role(String);

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Borrow<str> for Role {
    fn borrow(&self) -> &str {
        self.as_ref()
    }
}

impl Borrow<String> for Role {
    fn borrow(&self) -> &String {
        &self.0
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

pub trait TimeLimited {
    fn set_validity(&mut self, until: SystemTime);
    fn check_validity(&self) -> bool;
}

pub trait Authorization {
    fn has_role<Q>(&self, role: &Q) -> bool
    where
        Role: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    fn has_any_role<'a, Q, I>(&self, roles: I) -> bool
    where
        Role: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        roles.into_iter().any(|role| self.has_role(role))
    }
}

/// Authenticated caller identity, carried in the signed API token.
///
/// `sub` is the numeric user id as string, `username` is kept alongside
/// because profile URLs address authors by username.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiClaim {
    pub sub: String,
    pub username: String,
    pub exp: u64,
    pub roles: HashSet<Role>,
}

impl ApiClaim {
    pub fn new_expired<'a>(
        sub: String,
        username: String,
        roles: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        ApiClaim {
            sub,
            username,
            exp: 0,
            roles: roles.into_iter().map(|r| Role::from(r.as_str())).collect(),
        }
    }

    /// Numeric user id, if the token carries a well formed subject.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

impl Authorization for ApiClaim {
    fn has_role<Q>(&self, role: &Q) -> bool
    where
        Role: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.roles.contains(role)
    }
}

impl TimeLimited for ApiClaim {
    fn set_validity(&mut self, until: SystemTime) {
        self.exp = until
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_secs();
    }

    fn check_validity(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        self.exp > now
    }
}
