use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

impl Os {
    /// Normalize an OS name as reported by `std::env::consts::OS` or `uname`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "macos" | "macosx" | "darwin" | "mac os x" => Some(Self::MacOs),
            "windows" | "win32" => Some(Self::Windows),
            _ => None,
        }
    }

    pub fn is_macos(self) -> bool {
        self == Self::MacOs
    }

    fn identifier(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "macosx",
            Self::Windows => "windows",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    Arm64,
    Arm,
    I386,
}

impl Arch {
    /// Normalize an architecture name; accepts the common aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "amd64" | "x86_64" | "x64" => Some(Self::Amd64),
            "arm64" | "aarch64" => Some(Self::Arm64),
            "arm" | "armv7" | "armv7l" | "armhf" => Some(Self::Arm),
            "i386" | "i486" | "i586" | "i686" | "x86" => Some(Self::I386),
            _ => None,
        }
    }

    fn identifier(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
            Self::Arm => "arm",
            Self::I386 => "i386",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// An OS/architecture pair for which native bundles are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

/// Every platform with a published native bundle.
pub const SUPPORTED_PLATFORMS: &[Platform] = &[
    Platform::new(Os::Linux, Arch::Amd64),
    Platform::new(Os::Linux, Arch::Arm64),
    Platform::new(Os::Linux, Arch::Arm),
    Platform::new(Os::MacOs, Arch::Amd64),
    Platform::new(Os::MacOs, Arch::Arm64),
    Platform::new(Os::Windows, Arch::Amd64),
    Platform::new(Os::Windows, Arch::I386),
    Platform::new(Os::Windows, Arch::Arm64),
];

impl Platform {
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detect the platform this process was compiled for.
    pub fn current() -> Result<Self, SchemaError> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Resolve raw OS and architecture names into a supported platform.
    pub fn from_parts(os: &str, arch: &str) -> Result<Self, SchemaError> {
        let unsupported = || SchemaError::UnsupportedPlatform {
            os: os.to_owned(),
            arch: arch.to_owned(),
        };
        let platform = Self::new(
            Os::from_name(os).ok_or_else(unsupported)?,
            Arch::from_name(arch).ok_or_else(unsupported)?,
        );
        if SUPPORTED_PLATFORMS.contains(&platform) {
            Ok(platform)
        } else {
            Err(unsupported())
        }
    }

    /// Identifier used in artifact names, e.g. `linux-amd64`.
    pub fn identifier(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

impl FromStr for Platform {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (os, arch) = s
            .split_once('-')
            .ok_or_else(|| SchemaError::UnknownPlatform(s.to_owned()))?;
        Self::from_parts(os, arch).map_err(|_| SchemaError::UnknownPlatform(s.to_owned()))
    }
}
