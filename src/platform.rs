use crate::types::*;
use std::fmt;
use std::str::FromStr;

/// Extensions a downloadable build may carry: archives, installers and
/// self-extracting `.run` bundles.
pub const ALLOWED_EXTENSIONS: &[&str] = &[".zip", ".tar.gz", ".exe", ".msi", ".dmg", ".run"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Win,
    Osx,
    Lin,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Win, Platform::Osx, Platform::Lin];

    /// Segment used in asset names.
    pub fn asset_segment(self) -> &'static str {
        match self {
            Platform::Win => "Win",
            Platform::Osx => "OSX",
            Platform::Lin => "Lin",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Win => "Windows",
            Platform::Osx => "OS X",
            Platform::Lin => "Linux",
        }
    }

    pub fn detect() -> Platform {
        match std::env::consts::OS {
            "windows" => Platform::Win,
            "macos" => Platform::Osx,
            _ => Platform::Lin,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.asset_segment())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "win" | "windows" => Ok(Platform::Win),
            "osx" | "mac" | "macos" | "darwin" => Ok(Platform::Osx),
            "lin" | "linux" => Ok(Platform::Lin),
            _ => Err(format!("Unknown platform '{}': use Win, OSX or Lin", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitWidth {
    X32,
    X64,
    /// One build for every bit width; the name has no `<n>bit` segment.
    Universal,
}

impl fmt::Display for BitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitWidth::X32 => f.write_str("32"),
            BitWidth::X64 => f.write_str("64"),
            BitWidth::Universal => f.write_str("Universal"),
        }
    }
}

impl FromStr for BitWidth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches("bit");
        match trimmed {
            "32" => Ok(BitWidth::X32),
            "64" => Ok(BitWidth::X64),
            _ if trimmed.chars().all(|c| c.is_ascii_digit()) => {
                Err(format!("Unsupported bit width '{}': use 32, 64 or Universal", s))
            }
            _ => Ok(BitWidth::Universal),
        }
    }
}

pub fn host_bit_width() -> BitWidth {
    if cfg!(target_pointer_width = "64") {
        BitWidth::X64
    } else {
        BitWidth::X32
    }
}

/// Naming convention for release assets:
/// `<product>.v<version>.<platform>.<bits><suffix><ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetNaming {
    pub product: String,
    pub bit_suffix: String,
}

impl AssetNaming {
    pub fn from_settings(settings: &SiteSettings) -> Self {
        Self {
            product: settings.product_name.clone(),
            bit_suffix: settings.bit_suffix.clone(),
        }
    }

    /// Asset name without its extension.
    pub fn stem(&self, platform: Platform, version: &str, bits: BitWidth) -> String {
        let bits = match bits {
            BitWidth::Universal => "Universal".to_string(),
            other => format!("{}{}", other, self.bit_suffix),
        };
        format!(
            "{}.v{}.{}.{}",
            self.product,
            version.trim_start_matches('v'),
            platform.asset_segment(),
            bits
        )
    }

    pub fn matches(&self, name: &str, platform: Platform, version: &str, bits: BitWidth) -> bool {
        let stem = self.stem(platform, version, bits);
        name.strip_prefix(&stem)
            .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext))
    }
}

/// First asset in any release that follows the naming convention for the
/// given platform, version and bit width. Every release is scanned, not only
/// the one tagged `version`.
pub fn find_download<'a>(
    releases: &'a [Release],
    platform: Platform,
    version: &str,
    bits: BitWidth,
    naming: &AssetNaming,
) -> Option<&'a Asset> {
    tracing::trace!(
        "Looking for {} asset for {} {}",
        naming.stem(platform, version, bits),
        platform,
        bits
    );

    let found = releases
        .iter()
        .flat_map(|release| release.assets.iter())
        .find(|asset| naming.matches(&asset.name, platform, version, bits));

    match found {
        Some(asset) => tracing::debug!("Found download '{}'", asset.name),
        None => tracing::debug!(
            "No {} {}-bit download for version {}",
            platform,
            bits,
            version
        ),
    }
    found
}

const DOWNLOAD_LABELS: &[(&str, &str)] = &[
    (".Win.64bit.exe", "Windows 64bit"),
    (".Win.64bit.zip", "Windows 64bit"),
    (".Win.32bit.exe", "Windows 32bit"),
    (".Win.32bit.zip", "Windows 32bit"),
    (".OSX.64bit.zip", "OS X"),
    (".Lin.Universal.run", "Linux"),
    (".Universal.run", "Linux"),
    (".Source.zip", "Source Code"),
];

/// Short label for an asset of the release tagged `version`, keyed on the
/// part of the name after the version.
pub fn download_label(asset_name: &str, version: &str) -> String {
    if asset_name == "translations.zip" {
        return "Translations".to_string();
    }
    let suffix = match asset_name.split_once(version) {
        Some((_, rest)) => rest,
        None => asset_name,
    };
    DOWNLOAD_LABELS
        .iter()
        .find(|(key, _)| *key == suffix)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| suffix.to_string())
}
