//! Platform detection utilities

use crate::{Result, TalkError};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

/// Operating systems with a native speech facility we know how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
}

impl Platform {
    /// Platform of the running process
    pub fn current() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value onto a supported platform
    pub fn from_os(os: &str) -> Result<Self> {
        match os {
            "macos" => Ok(Platform::MacOs),
            "windows" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            other => Err(TalkError::UnsupportedPlatform(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Linux distribution family, used to pick an install command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinuxDistribution {
    Debian,
    RedHat,
    Arch,
    Alpine,
    Suse,
    Unknown,
}

impl LinuxDistribution {
    /// Detect the distribution from /etc/os-release, falling back to `uname -a`
    pub fn detect() -> Self {
        if let Ok(release) = fs::read_to_string("/etc/os-release") {
            return Self::from_os_release(&release);
        }

        Command::new("uname")
            .arg("-a")
            .stderr(Stdio::null())
            .output()
            .ok()
            .filter(|output| output.status.success())
            .map(|output| Self::from_uname(&String::from_utf8_lossy(&output.stdout)))
            .unwrap_or(LinuxDistribution::Unknown)
    }

    /// Classify the contents of an os-release file
    pub fn from_os_release(contents: &str) -> Self {
        let lower = contents.to_lowercase();
        if lower.contains("ubuntu") || lower.contains("debian") {
            LinuxDistribution::Debian
        } else if lower.contains("centos") || lower.contains("rhel") || lower.contains("fedora") {
            LinuxDistribution::RedHat
        } else if lower.contains("arch") {
            LinuxDistribution::Arch
        } else if lower.contains("alpine") {
            LinuxDistribution::Alpine
        } else if lower.contains("suse") {
            LinuxDistribution::Suse
        } else {
            LinuxDistribution::Unknown
        }
    }

    /// Classify `uname -a` output (only a few kernels carry a distro tag)
    pub fn from_uname(uname: &str) -> Self {
        let lower = uname.to_lowercase();
        if lower.contains("ubuntu") || lower.contains("debian") {
            LinuxDistribution::Debian
        } else if lower.contains("red hat") || lower.contains("centos") {
            LinuxDistribution::RedHat
        } else {
            LinuxDistribution::Unknown
        }
    }

    /// Shell command a user would run to install `package`
    pub fn install_command(&self, package: &str) -> String {
        match self {
            LinuxDistribution::Debian => format!("sudo apt-get install {}", package),
            LinuxDistribution::RedHat => format!("sudo yum install {}", package),
            LinuxDistribution::Arch => format!("sudo pacman -S {}", package),
            LinuxDistribution::Alpine => format!("sudo apk add {}", package),
            LinuxDistribution::Suse => format!("sudo zypper install {}", package),
            LinuxDistribution::Unknown => {
                format!("# install {} with your package manager", package)
            }
        }
    }
}

/// Summary of the host, as reported by `talk --platform`
#[derive(Debug, Clone, Serialize)]
pub struct PlatformInfo {
    pub platform: Platform,
    pub architecture: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<LinuxDistribution>,
}

/// Describe the running host
pub fn platform_info() -> Result<PlatformInfo> {
    let platform = Platform::current()?;
    let distribution = match platform {
        Platform::Linux => Some(LinuxDistribution::detect()),
        _ => None,
    };

    Ok(PlatformInfo {
        platform,
        architecture: std::env::consts::ARCH.to_string(),
        distribution,
    })
}

/// Is `program` an executable file somewhere on PATH?
///
/// Paths containing a separator are checked directly. On Windows the
/// PATHEXT extensions are tried as well.
pub fn is_command_available(program: &str) -> bool {
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return is_executable(direct);
    }

    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };

    std::env::split_paths(&paths).any(|dir| {
        let candidate = dir.join(program);
        if is_executable(&candidate) {
            return true;
        }
        executable_extensions()
            .iter()
            .any(|ext| is_executable(&dir.join(format!("{}{}", program, ext))))
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn executable_extensions() -> Vec<String> {
    if !cfg!(windows) {
        return Vec::new();
    }
    std::env::var("PATHEXT")
        .unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string())
        .split(';')
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_lowercase())
        .collect()
}
