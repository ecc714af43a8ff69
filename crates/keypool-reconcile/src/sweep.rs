//! Expiry sweeper: compute the removal set from the token→expiry hash.
//!
//! Independent of network probing. The sweeper only computes; the caller is
//! responsible for removing the returned tokens from both the expiry hash
//! and the corresponding token set (the hash and the set are allowed to
//! drift, and sweeping one never assumes the other is consistent).

use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

use keypool_store::Token;

/// Return the tokens whose recorded expiry is strictly before `now`.
///
/// A value that fails to parse as epoch seconds is treated as expired —
/// fail-closed removal. One malformed entry must not block cleanup of the
/// rest; it is logged and included in the removal set.
pub fn sweep(expiries: &BTreeMap<Token, String>, now_epoch_secs: i64) -> BTreeSet<Token> {
    let mut expired = BTreeSet::new();

    for (token, raw) in expiries {
        match raw.trim().parse::<i64>() {
            Ok(expiry) if expiry < now_epoch_secs => {
                expired.insert(token.clone());
            }
            Ok(_) => {}
            Err(_) => {
                tracing::warn!(value = %raw, "unparsable expiry value, marking entry for removal");
                expired.insert(token.clone());
            }
        }
    }

    expired
}

/// Current wall-clock time as epoch seconds.
pub fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
