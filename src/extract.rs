//! Archive expansion into layers
//!
//! Supports plain and gzip-compressed tarballs, detected by magic bytes.
//! Leading path components can be stripped, like `tar --strip-components`.

use crate::error::{BuildpackError, BuildpackResult};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Expand `archive` into `destination`, dropping `strip_components`
/// leading path segments from every entry.
pub async fn extract(
    archive: &Path,
    destination: &Path,
    strip_components: u32,
) -> BuildpackResult<()> {
    let archive = archive.to_path_buf();
    let destination = destination.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(&archive, &destination, strip_components))
        .await
        .map_err(|e| BuildpackError::Internal(format!("extraction task: {}", e)))?
}

fn extract_blocking(archive: &Path, destination: &Path, strip: u32) -> BuildpackResult<()> {
    let mut file = File::open(archive).map_err(|e| BuildpackError::extraction(archive, e))?;

    let mut magic = [0u8; 2];
    let is_gzip = match file.read_exact(&mut magic) {
        Ok(()) => magic == GZIP_MAGIC,
        Err(_) => false,
    };
    file.seek(SeekFrom::Start(0))
        .map_err(|e| BuildpackError::extraction(archive, e))?;

    let reader: Box<dyn Read> = if is_gzip {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    fs::create_dir_all(destination).map_err(|e| BuildpackError::extraction(archive, e))?;
    let count = unpack(reader, destination, strip as usize)
        .map_err(|reason| BuildpackError::extraction(archive, reason))?;

    debug!(
        "Expanded {} entries from {} into {}",
        count,
        archive.display(),
        destination.display()
    );
    Ok(())
}

fn unpack(reader: Box<dyn Read>, destination: &Path, strip: usize) -> Result<usize, String> {
    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_preserve_ownerships(false);
    archive.set_unpack_xattrs(false);

    let mut count = 0;
    for entry in archive.entries().map_err(|e| e.to_string())? {
        let mut entry = entry.map_err(|e| e.to_string())?;
        let path = entry.path().map_err(|e| e.to_string())?.into_owned();

        let Some(relative) = stripped(&path, strip)? else {
            continue;
        };
        within_destination(destination, &relative)?;
        let target = destination.join(&relative);

        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&target).map_err(|e| e.to_string())?;
            }
            EntryType::Link => {
                let link = entry
                    .link_name()
                    .map_err(|e| e.to_string())?
                    .ok_or_else(|| format!("hard link {} has no target", path.display()))?
                    .into_owned();
                let Some(link) = stripped(&link, strip)? else {
                    return Err(format!("hard link target {} is stripped away", link.display()));
                };
                within_destination(destination, &link)?;
                ensure_parent(&target)?;
                fs::hard_link(destination.join(link), &target).map_err(|e| e.to_string())?;
            }
            _ => {
                ensure_parent(&target)?;
                entry.unpack(&target).map_err(|e| e.to_string())?;
            }
        }
        count += 1;
    }

    Ok(count)
}

/// Drop `strip` leading components; `None` when nothing remains.
///
/// Rejects paths that would escape the destination.
fn stripped(path: &Path, strip: usize) -> Result<Option<PathBuf>, String> {
    let mut kept = PathBuf::new();
    let mut seen = 0;

    for component in path.components() {
        match component {
            Component::CurDir => continue,
            Component::Normal(part) => {
                seen += 1;
                if seen > strip {
                    kept.push(part);
                }
            }
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(format!("entry {} escapes the destination", path.display()));
            }
        }
    }

    if kept.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(kept))
    }
}

/// Reject `relative` when a directory on its way below `destination` is a
/// symlink, which would let the entry land outside the destination.
fn within_destination(destination: &Path, relative: &Path) -> Result<(), String> {
    let Some(parent) = relative.parent() else {
        return Ok(());
    };

    let mut current = destination.to_path_buf();
    for component in parent.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(format!(
                    "entry {} is below symlink {}",
                    relative.display(),
                    current.display()
                ));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
            Err(e) => return Err(e.to_string()),
        }
    }
    Ok(())
}

fn ensure_parent(target: &Path) -> Result<(), String> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    Ok(())
}
