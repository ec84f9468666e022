//! `SANYA_*` environment variables (§6), centralized the way
//! `wasmtime-cli-flags` centralizes its own flags into a single struct
//! rather than letting library crates read the environment directly.
//!
//! `sanya-jit` only ever sees the resolved [`sanya_jit::CodegenFlags`];
//! this module is the one place that knows the legacy variable names.

use sanya_jit::CodegenFlags;

/// `NAME=NO` disables; any other value (including unset) leaves the
/// behavior on. This matches the original's `getenv`-and-`strcmp`
/// checks, which only ever special-case the literal string `"NO"`.
fn env_is_no(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v == "NO")
}

/// `NAME=YES` enables; any other value (including unset) leaves it off.
fn env_is_yes(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v == "YES")
}

/// Resolved process configuration: the three environment toggles of §6,
/// read once at startup.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub codegen: CodegenFlags,
    pub log_info: bool,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Config {
        Config {
            codegen: CodegenFlags {
                tco: !env_is_no("SANYA_TCO"),
                stack_check: !env_is_no("SANYA_STACKCHECK"),
            },
            log_info: env_is_yes("SANYA_LOGINFO"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables are process-global, so these run serially by
    // touching only variables this module owns and restoring them.
    fn with_var<T>(name: &str, value: Option<&str>, f: impl FnOnce() -> T) -> T {
        let prev = std::env::var(name).ok();
        match value {
            Some(v) => std::env::set_var(name, v),
            None => std::env::remove_var(name),
        }
        let result = f();
        match prev {
            Some(v) => std::env::set_var(name, v),
            None => std::env::remove_var(name),
        }
        result
    }

    #[test]
    fn tco_defaults_on_and_disables_only_on_no() {
        with_var("SANYA_TCO", None, || {
            assert!(Config::from_env().codegen.tco);
        });
        with_var("SANYA_TCO", Some("NO"), || {
            assert!(!Config::from_env().codegen.tco);
        });
        with_var("SANYA_TCO", Some("anything-else"), || {
            assert!(Config::from_env().codegen.tco);
        });
    }

    #[test]
    fn log_info_defaults_off_and_enables_only_on_yes() {
        with_var("SANYA_LOGINFO", None, || {
            assert!(!Config::from_env().log_info);
        });
        with_var("SANYA_LOGINFO", Some("YES"), || {
            assert!(Config::from_env().log_info);
        });
    }
}
