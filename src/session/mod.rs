//! Path-scoped session state backed by browser cookies.
//!
//! Each `/state/{key}` path owns one cookie, so the key space is partitioned
//! by exact request path: the browser only replays a state cookie on the path
//! it was written for. There is no server-side storage and no locking;
//! concurrent writes to the same path race and the last write wins.

pub mod cookie;

use serde::Serialize;

use crate::context::RequestContext;

/// A single piece of session state as seen by one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStateEntry {
    pub path: String,
    pub key: String,
    pub value: String,
}

impl SessionStateEntry {
    /// Read the entry for `key` from the request's state cookie, if present.
    pub fn read(ctx: &RequestContext, cookie_name: &str, key: &str) -> Option<Self> {
        let raw = ctx.cookie(cookie_name)?;
        Some(Self {
            path: ctx.path().to_string(),
            key: key.to_string(),
            value: cookie::decode_opportunistic(raw).into_owned(),
        })
    }

    /// Build the entry a write of `body` to the current path would store.
    pub fn for_write(ctx: &RequestContext, key: &str, body: &str) -> Self {
        Self {
            path: ctx.path().to_string(),
            key: key.to_string(),
            value: cookie::decode_opportunistic(body).into_owned(),
        }
    }

    /// Whether the entry fits in a single browser cookie.
    pub fn fits_in_cookie(&self, cookie_name: &str) -> bool {
        cookie::fits_in_cookie(cookie_name, &self.value)
    }

    /// `Set-Cookie` value persisting this entry for one year.
    pub fn to_set_cookie(&self, cookie_name: &str) -> String {
        cookie::make_state_cookie(cookie_name, &self.path, &self.value)
    }
}
