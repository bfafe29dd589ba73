// File transfers: streaming downloads to disk and direct or chunked uploads.
// Progress is reported through an indicatif bar owned by the caller.

use crate::api::{ApiClient, ChunkedUpload};
use crate::error::{ApiResult, ErrorKind};
use crate::metadata::{base_name, Metadata};
use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Files above this many bytes are sent in chunks of this size.
pub const DIRECT_UPLOAD_SIZE_LIMIT: u64 = 15_000_000;
/// Attempts per chunk before a chunked upload gives up.
pub const MAX_TRY_LIMIT: usize = 5;

/// Join a remote folder and a relative path with exactly one `/`.
pub fn join_remote(dir: &str, rel: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let rel = rel.trim_start_matches('/');
    if rel.is_empty() {
        return if dir.is_empty() { "/".to_string() } else { dir.to_string() };
    }
    format!("{}/{}", dir, rel)
}

/// Local destination for `remote_path`: inside `local` when it is an
/// existing directory, `local` itself otherwise.
pub fn download_target(remote_path: &str, local: &Path) -> PathBuf {
    if local.is_dir() {
        local.join(base_name(remote_path))
    } else {
        local.to_path_buf()
    }
}

/// Download `remote_path` into `local`, creating parent directories.
/// Returns the path written.
pub fn download_file(
    api: &ApiClient,
    remote_path: &str,
    local: &Path,
    pb: &ProgressBar,
) -> Result<PathBuf> {
    let target = download_target(remote_path, local);
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }

    let download = api.download(remote_path)?;
    let expected = download.expected_len();
    if let Some(len) = expected {
        pb.set_length(len);
    }
    let mut file =
        File::create(&target).with_context(|| format!("creating {}", target.display()))?;
    let written = std::io::copy(&mut pb.wrap_read(download), &mut file)
        .with_context(|| format!("downloading {}", remote_path))?;
    if let Some(len) = expected.filter(|&len| len != written) {
        log::warn!(
            "download size of {} does not match: got {} bytes, expected {}",
            remote_path,
            written,
            len
        );
    }
    Ok(target)
}

/// Upload `local` to `remote_path`, choosing a direct or chunked transfer
/// by size.
pub fn upload_file(
    api: &ApiClient,
    remote_path: &str,
    local: &Path,
    pb: &ProgressBar,
) -> Result<Metadata> {
    upload_with_limit(api, remote_path, local, pb, DIRECT_UPLOAD_SIZE_LIMIT)
}

/// Like [`upload_file`] with an explicit direct-upload/chunk size.
pub fn upload_with_limit(
    api: &ApiClient,
    remote_path: &str,
    local: &Path,
    pb: &ProgressBar,
    limit: u64,
) -> Result<Metadata> {
    let file = File::open(local).with_context(|| format!("opening {}", local.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("reading size of {}", local.display()))?
        .len();
    pb.set_length(len);

    if len > limit {
        log::debug!("chunked upload of {} ({} bytes)", local.display(), len);
        return upload_chunked(api, remote_path, file, len, pb, limit);
    }
    let metadata = api.upload_direct(remote_path, pb.wrap_read(file), len)?;
    pb.set_position(len);
    Ok(metadata)
}

fn upload_chunked(
    api: &ApiClient,
    remote_path: &str,
    mut file: File,
    len: u64,
    pb: &ProgressBar,
    limit: u64,
) -> Result<Metadata> {
    let mut upload_id: Option<String> = None;
    let mut offset = 0;
    while offset < len {
        file.seek(SeekFrom::Start(offset))?;
        let mut chunk = Vec::new();
        (&mut file).take(limit).read_to_end(&mut chunk)?;
        if chunk.is_empty() {
            bail!("{} shrank to {} bytes during upload", remote_path, offset);
        }
        let state = send_chunk(api, upload_id.as_deref(), offset, chunk)?;
        if state.offset <= offset {
            bail!(
                "server did not accept data for {} past offset {}",
                remote_path,
                offset
            );
        }
        offset = state.offset;
        upload_id = Some(state.upload_id);
        pb.set_position(offset.min(len));
    }
    let upload_id = upload_id.context("chunked upload sent no data")?;
    Ok(api.commit_chunked_upload(remote_path, &upload_id)?)
}

fn send_chunk(
    api: &ApiClient,
    upload_id: Option<&str>,
    offset: u64,
    chunk: Vec<u8>,
) -> ApiResult<ChunkedUpload> {
    let mut attempt = 1;
    loop {
        match api.upload_chunk(upload_id, offset, chunk.clone()) {
            Err(e) if e.kind == ErrorKind::TransportFailure && attempt < MAX_TRY_LIMIT => {
                log::warn!("chunk at offset {} failed (attempt {}): {}", offset, attempt, e);
                attempt += 1;
            }
            result => return result,
        }
    }
}
