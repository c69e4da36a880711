// src/pipeline/env.rs

//! Build environment composition
//!
//! Every external invocation gets a full copy of the ambient process
//! environment with a per-stage overlay on top. The base snapshot is
//! taken once and never mutated; stages layer their variables with
//! `with_var`/`prepend_path` and the final map is composed per call.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::BuildConfig;

/// Immutable base environment plus an ordered overlay
#[derive(Debug, Clone)]
pub struct BuildEnv {
    base: BTreeMap<String, String>,
    overlay: BTreeMap<String, String>,
}

impl BuildEnv {
    /// Snapshot the ambient process environment
    pub fn from_ambient() -> Self {
        Self {
            base: std::env::vars().collect(),
            overlay: BTreeMap::new(),
        }
    }

    /// Base environment supplied explicitly (tests)
    pub fn from_base(base: BTreeMap<String, String>) -> Self {
        Self {
            base,
            overlay: BTreeMap::new(),
        }
    }

    /// Standard overlay for a build run: accumulated compile/link
    /// flags, optimization level, and the parallelism directive.
    pub fn for_config(config: &BuildConfig) -> Self {
        let mut env = Self::from_ambient();

        let mut cflags = vec![format!("-O{}", config.optimize)];
        cflags.extend(config.cflags.iter().cloned());
        let mut cxxflags = vec![format!("-O{}", config.optimize)];
        cxxflags.extend(config.cxxflags.iter().cloned());

        env = env.with_var("CFLAGS", cflags.join(" "));
        env = env.with_var("CXXFLAGS", cxxflags.join(" "));
        if !config.ldflags.is_empty() {
            env = env.with_var("LDFLAGS", config.ldflags.join(" "));
        }
        env.with_var("MAKEFLAGS", format!("-j{}", config.jobs))
    }

    /// Return a copy with one overlay variable set
    pub fn with_var(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.overlay.insert(key.into(), value.into());
        next
    }

    /// Return a copy with `dir` prepended to the executable search path
    pub fn prepend_path(&self, dir: &Path) -> Self {
        let current = self
            .overlay
            .get("PATH")
            .or_else(|| self.base.get("PATH"))
            .cloned()
            .unwrap_or_default();
        let joined = if current.is_empty() {
            dir.display().to_string()
        } else {
            format!("{}:{}", dir.display(), current)
        };
        self.with_var("PATH", joined)
    }

    /// Compose the final map for one invocation: base, overlay wins
    pub fn compose(&self) -> BTreeMap<String, String> {
        let mut composed = self.base.clone();
        for (key, value) in &self.overlay {
            composed.insert(key.clone(), value.clone());
        }
        composed
    }

    /// Read a composed value (overlay first)
    pub fn get(&self, key: &str) -> Option<&str> {
        self.overlay
            .get(key)
            .or_else(|| self.base.get(key))
            .map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn base_env() -> BuildEnv {
        let mut base = BTreeMap::new();
        base.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
        base.insert("HOME".to_string(), "/home/builder".to_string());
        BuildEnv::from_base(base)
    }

    #[test]
    fn test_overlay_wins_over_base() {
        let env = base_env().with_var("HOME", "/tmp/override");
        let composed = env.compose();
        assert_eq!(composed["HOME"], "/tmp/override");
        assert_eq!(composed["PATH"], "/usr/bin:/bin");
    }

    #[test]
    fn test_prepend_path_orders_new_dir_first() {
        let env = base_env().prepend_path(&PathBuf::from("/opt/cross/bin"));
        assert_eq!(env.get("PATH"), Some("/opt/cross/bin:/usr/bin:/bin"));
    }

    #[test]
    fn test_prepend_path_stacks() {
        let env = base_env()
            .prepend_path(&PathBuf::from("/a"))
            .prepend_path(&PathBuf::from("/b"));
        assert_eq!(env.get("PATH"), Some("/b:/a:/usr/bin:/bin"));
    }

    #[test]
    fn test_with_var_does_not_mutate_original() {
        let env = base_env();
        let _derived = env.with_var("CC", "x86_64-elf-gcc");
        assert!(env.get("CC").is_none());
    }
}
