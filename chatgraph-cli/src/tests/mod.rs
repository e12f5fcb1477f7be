//! Unit tests for chatgraph-cli, organized by module.
//!
//! Tests are BDD-style with Given/When/Then doc comments and descriptive names.


use std::sync::Mutex;

/// Lock used by tests that read or write process env so they run serially.
static ENV_LOCK: std::sync::OnceLock<Mutex<()>> = std::sync::OnceLock::new();

pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

/// Sets (`Some`) or removes (`None`) each var, returning the previous values.
pub(crate) fn swap_env(vars: &[(&str, Option<&str>)]) -> Vec<(String, Option<String>)> {
    vars.iter()
        .map(|(name, value)| {
            let saved = std::env::var(name).ok();
            match value {
                Some(v) => std::env::set_var(name, v),
                None => std::env::remove_var(name),
            }
            (name.to_string(), saved)
        })
        .collect()
}

pub(crate) fn restore_env(saved: Vec<(String, Option<String>)>) {
    for (name, value) in saved {
        match value {
            Some(v) => std::env::set_var(&name, v),
            None => std::env::remove_var(&name),
        }
    }
}
