use crate::error::InstallError;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Stream `url` into `local_path`, replacing any existing file.
pub async fn download_file(client: &Client, url: &str, local_path: &Path) -> Result<(), InstallError> {
    println!("Downloading {}...", url);

    let response = client.get(url).send().await?.error_for_status()?;
    let total_size = response.content_length().unwrap_or(0);

    let filename = local_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Downloading {}", filename));

    let mut file = fs::File::create(local_path).map_err(InstallError::io_at(local_path))?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .map_err(InstallError::io_at(local_path))?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    pb.finish_and_clear();
    tracing::debug!("Downloaded {} bytes to {}", downloaded, local_path.display());
    Ok(())
}

/// Unpack every entry of the zip at `archive_path` below `extract_dir`.
pub fn extract_zip(archive_path: &Path, extract_dir: &Path) -> Result<(), InstallError> {
    let file = fs::File::open(archive_path).map_err(InstallError::io_at(archive_path))?;
    let mut archive = zip::ZipArchive::new(file)?;

    fs::create_dir_all(extract_dir).map_err(InstallError::io_at(extract_dir))?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let outpath = match file.enclosed_name() {
            Some(name) => extract_dir.join(name),
            None => {
                tracing::warn!("Skipping malicious path in zip: {}", file.name());
                continue;
            }
        };

        if file.is_dir() {
            fs::create_dir_all(&outpath).map_err(InstallError::io_at(&outpath))?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent).map_err(InstallError::io_at(parent))?;
            }
            let mut outfile = fs::File::create(&outpath).map_err(InstallError::io_at(&outpath))?;
            io::copy(&mut file, &mut outfile).map_err(InstallError::io_at(&outpath))?;
        }
    }

    tracing::debug!(
        "Extracted {} entries into {}",
        archive.len(),
        extract_dir.display()
    );
    Ok(())
}

/// Move `<extract_dir>/<base_name>/<exe_name>` to `destination`.
pub fn install_executable(
    extract_dir: &Path,
    base_name: &str,
    exe_name: &str,
    destination: &Path,
) -> Result<PathBuf, InstallError> {
    let source = extract_dir.join(base_name).join(exe_name);
    if !source.is_file() {
        return Err(InstallError::MissingArchiveEntry {
            path: Path::new(base_name).join(exe_name),
        });
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(InstallError::io_at(parent))?;
    }

    if fs::rename(&source, destination).is_err() {
        // rename fails across filesystems when the install root is a mount
        fs::copy(&source, destination).map_err(InstallError::io_at(destination))?;
        fs::remove_file(&source).map_err(InstallError::io_at(&source))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(destination)
            .map_err(InstallError::io_at(destination))?
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(destination, perms).map_err(InstallError::io_at(destination))?;
    }

    Ok(destination.to_path_buf())
}
