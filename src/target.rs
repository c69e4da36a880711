// src/target.rs

//! Target triple parsing and classification
//!
//! A target triple names architecture, vendor, OS and ABI/environment
//! for a cross-compilation target (`x86_64-elf`, `arm-none-eabi`,
//! `aarch64-linux-gnu`). Parsing is deliberately permissive: real-world
//! triples routinely omit the vendor or environment, so missing fields
//! take defaults instead of being rejected.

use serde::{Deserialize, Serialize};

/// A parsed target triple
///
/// Immutable once constructed. The classification predicates drive
/// downstream defaults: C library selection, sysroot layout, and which
/// backend an LLVM build enables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// The triple exactly as the user supplied it
    pub raw: String,
    /// Architecture (first field, e.g. `x86_64`, `arm`, `riscv64`)
    pub arch: String,
    /// Vendor (second field, defaults to `unknown`)
    pub vendor: String,
    /// Operating system (third field, defaults to `none`)
    pub os: String,
    /// ABI/environment (fourth field, defaults to `gnu`)
    pub env: String,
}

impl TargetSpec {
    /// Parse a target triple. Total: under-specified triples are
    /// completed with defaults rather than rejected.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split('-');
        let arch = parts.next().unwrap_or_default().to_string();
        let vendor = parts.next().unwrap_or("unknown").to_string();
        let os = parts.next().unwrap_or("none").to_string();
        let env = parts.next().unwrap_or("gnu").to_string();

        Self {
            raw: raw.to_string(),
            arch,
            vendor,
            os,
            env,
        }
    }

    /// Targets with no operating system underneath them
    pub fn is_bare_metal(&self) -> bool {
        matches!(self.os.as_str(), "elf" | "none" | "eabi")
    }

    /// Linux userland targets
    pub fn is_linux(&self) -> bool {
        self.os == "linux"
    }

    /// Windows targets (mingw toolchains put the marker in either field)
    pub fn is_windows(&self) -> bool {
        self.os == "mingw32" || self.env == "mingw32"
    }
}

impl std::fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_field_triple() {
        let spec = TargetSpec::parse("x86_64-elf");
        assert_eq!(spec.arch, "x86_64");
        assert_eq!(spec.vendor, "elf");
        assert_eq!(spec.os, "none");
        assert_eq!(spec.env, "gnu");
    }

    #[test]
    fn test_parse_three_field_triple() {
        let spec = TargetSpec::parse("arm-none-eabi");
        assert_eq!(spec.arch, "arm");
        assert_eq!(spec.vendor, "none");
        assert_eq!(spec.os, "eabi");
        assert_eq!(spec.env, "gnu");
        assert!(spec.is_bare_metal());
    }

    #[test]
    fn test_parse_four_field_triple() {
        let spec = TargetSpec::parse("aarch64-unknown-linux-gnu");
        assert_eq!(spec.arch, "aarch64");
        assert_eq!(spec.vendor, "unknown");
        assert_eq!(spec.os, "linux");
        assert_eq!(spec.env, "gnu");
        assert!(spec.is_linux());
        assert!(!spec.is_bare_metal());
    }

    #[test]
    fn test_parse_is_total() {
        // Degenerate inputs still parse
        let spec = TargetSpec::parse("riscv64");
        assert_eq!(spec.arch, "riscv64");
        assert_eq!(spec.vendor, "unknown");
        assert_eq!(spec.os, "none");
        assert!(spec.is_bare_metal());

        let empty = TargetSpec::parse("");
        assert_eq!(empty.arch, "");
        assert_eq!(empty.os, "none");
    }

    #[test]
    fn test_windows_detection_via_env() {
        assert!(TargetSpec::parse("i686-w64-mingw32").is_windows());
        assert!(TargetSpec::parse("x86_64-pc-mingw32").is_windows());
        assert!(TargetSpec::parse("i686-pc-linux-mingw32").is_windows());
    }

    #[test]
    fn test_predicates_mutually_consistent() {
        for raw in ["x86_64-elf", "arm-none-eabi", "aarch64-linux-gnu", "x86_64-pc-mingw32"] {
            let spec = TargetSpec::parse(raw);
            let classes = [spec.is_bare_metal(), spec.is_linux(), spec.is_windows()];
            assert!(
                classes.iter().filter(|c| **c).count() <= 1,
                "{raw} classified into more than one OS family"
            );
        }
    }

    #[test]
    fn test_display_round_trips_raw() {
        assert_eq!(TargetSpec::parse("arm-none-eabi").to_string(), "arm-none-eabi");
    }
}
