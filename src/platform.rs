use crate::error::InstallError;
use crate::types::*;

pub fn get_system_info() -> PlatformInfo {
    let os = match std::env::consts::OS {
        "macos" => "darwin".to_string(),
        other => other.to_string(),
    };
    let arch = std::env::consts::ARCH.to_string();

    let normalized_arch = match arch.as_str() {
        "x86_64" => "amd64".to_string(),
        "aarch64" => "arm64".to_string(),
        "arm" => "arm".to_string(),
        _ => arch,
    };

    PlatformInfo {
        os,
        arch: normalized_arch,
    }
}

/// Pick the install archive and its checksum file out of a release's assets.
///
/// The archive is the first asset whose name contains both `marker` and
/// `archive_ext`; the checksum file is the first asset named exactly
/// `<archive name without archive_ext><checksum_suffix>`.
pub fn find_install_assets(
    assets: &[Asset],
    marker: &str,
    archive_ext: &str,
    checksum_suffix: &str,
) -> Result<SelectedAssets, InstallError> {
    tracing::trace!(
        "Looking for assets matching marker: '{}', extension: '{}'",
        marker,
        archive_ext
    );

    let mut candidates = assets
        .iter()
        .filter(|asset| asset.name.contains(marker) && asset.name.contains(archive_ext));

    let archive = candidates
        .next()
        .ok_or_else(|| InstallError::AssetNotFound {
            marker: marker.to_string(),
            extension: archive_ext.to_string(),
        })?;

    for ignored in candidates {
        tracing::debug!("Ignoring additional matching asset '{}'", ignored.name);
    }

    let base_name = archive.name.replace(archive_ext, "");
    let checksum_name = format!("{}{}", base_name, checksum_suffix);

    let checksum = assets
        .iter()
        .find(|asset| asset.name == checksum_name)
        .ok_or(InstallError::ChecksumAssetNotFound {
            name: checksum_name,
        })?;

    tracing::info!(
        "Found asset '{}' with checksum '{}'",
        archive.name,
        checksum.name
    );

    Ok(SelectedAssets {
        archive: archive.clone(),
        checksum: checksum.clone(),
        base_name,
    })
}
