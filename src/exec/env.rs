// src/exec/env.rs

//! Spawn-environment assembly.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;

/// Merge `overlay` over `inherited`, returning the full environment for a
/// child process.
///
/// Every inherited variable is kept unless the overlay names it, in which
/// case the overlay value wins. `None` and an empty overlay behave the same.
///
/// This never touches the global process environment; callers pass
/// `std::env::vars_os()` explicitly.
pub fn build_spawn_env<I, K, V>(
    inherited: I,
    overlay: Option<&HashMap<String, String>>,
) -> BTreeMap<OsString, OsString>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<OsString>,
    V: Into<OsString>,
{
    let mut env: BTreeMap<OsString, OsString> = inherited
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    if let Some(overlay) = overlay {
        for (key, value) in overlay {
            env.insert(OsString::from(key), OsString::from(value));
        }
    }

    env
}
