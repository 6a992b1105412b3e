//! Routing manifest emission.

use std::collections::BTreeMap;

use funcpack_core::routes::IMMUTABLE_MAX_AGE;
use funcpack_core::{Route, RoutingManifest};

/// Source pattern of the fallback rule.
pub const CATCH_ALL: &str = "/(.*)";

/// Asset caching rule for `public_path`, followed by the catch-all dispatch
/// to `entry`.
///
/// `public_path` may be a path (`/_nuxt/`) or an absolute URL, in which case
/// only its path is used. A root public path emits no caching rule.
pub fn emit(public_path: &str, entry: &str) -> RoutingManifest {
    let mut rules = Vec::with_capacity(2);

    let prefix = asset_prefix(public_path);
    if prefix.is_empty() {
        tracing::warn!(public_path, "public path is the site root; skipping asset cache rule");
    } else {
        let headers = BTreeMap::from([(
            "cache-control".to_owned(),
            format!("public, max-age={IMMUTABLE_MAX_AGE}, immutable"),
        )]);
        rules.push(Route::headers(format!("^/{}/.+", regex_escape(&prefix)), headers));
    }

    rules.push(catch_all(entry));
    RoutingManifest { rules }
}

/// Only the catch-all dispatch to `entry`.
pub fn emit_catch_all(entry: &str) -> RoutingManifest {
    RoutingManifest {
        rules: vec![catch_all(entry)],
    }
}

fn catch_all(entry: &str) -> Route {
    Route::dispatch(CATCH_ALL, format!("/{entry}"))
}

/// Path component of `public_path` without surrounding slashes.
pub fn asset_prefix(public_path: &str) -> String {
    let host_and_path = public_path
        .split_once("://")
        .map(|(_, rest)| rest)
        .or_else(|| public_path.strip_prefix("//"));
    let path = match host_and_path {
        Some(rest) => rest.find('/').map_or("", |i| &rest[i..]),
        None => public_path,
    };
    path.trim_matches('/').to_owned()
}

fn regex_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
