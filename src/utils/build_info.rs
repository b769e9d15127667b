/// Compile-time build metadata embedded by `build.rs`.
#[derive(Debug, Clone, Copy)]
pub struct BuildMetadata {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_status: &'static str,
    pub timestamp: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc: &'static str,
}

impl BuildMetadata {
    /// `0.1.0 (abc1234, clean)`
    pub fn label(&self) -> String {
        format!("{} ({}, {})", self.version, self.git_hash, self.git_status)
    }

    /// Field/value pairs in the order the `version` command prints them.
    pub fn details(&self) -> [(&'static str, &'static str); 4] {
        [
            ("Built at", self.timestamp),
            ("Target", self.target),
            ("Profile", self.profile),
            ("Rustc", self.rustc),
        ]
    }
}

pub fn current() -> BuildMetadata {
    BuildMetadata {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("TAX_TRACKER_BUILD_HASH").unwrap_or("unknown"),
        git_status: option_env!("TAX_TRACKER_BUILD_STATUS").unwrap_or("unknown"),
        timestamp: option_env!("TAX_TRACKER_BUILD_TIMESTAMP").unwrap_or("unknown"),
        target: option_env!("TAX_TRACKER_BUILD_TARGET").unwrap_or("unknown"),
        profile: option_env!("TAX_TRACKER_BUILD_PROFILE").unwrap_or("unknown"),
        rustc: option_env!("TAX_TRACKER_BUILD_RUSTC").unwrap_or("unknown"),
    }
}
