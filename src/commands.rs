// Command dispatch.
//
// `Session` is the context every command runs against: the API client, the
// loaded configuration and the folder metadata fetched so far. It is
// created once in `main` and passed down explicitly.

use crate::api::{ApiClient, MetadataResponse};
use crate::config::Config;
use crate::layout;
use crate::local::{self, MAX_FILE_LIMIT};
use crate::metadata::{Metadata, MetadataCache};
use crate::transfer::{self, join_remote};
use crate::ui;
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Download a remote file or folder
    Download {
        src: String,
        #[arg(default_value = ".")]
        dst: PathBuf,
    },
    /// Upload a local file or folder
    Upload { src: PathBuf, dst: String },
    /// Search for files below PATH
    Find { path: String, query: String },
    /// Move a file or folder
    Mv { src: String, dst: String },
    /// Copy a file or folder
    Cp { src: String, dst: String },
    /// Create a folder
    Mkdir { path: String },
    /// List a folder in columns
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Delete a file or folder
    Rm {
        path: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the linked account
    Account,
    /// Authorize dbox again
    Setup,
}

pub struct Session {
    api: ApiClient,
    config: Config,
    config_path: PathBuf,
    cache: MetadataCache,
}

impl Session {
    pub fn new(config: Config, config_path: PathBuf) -> Result<Self> {
        let api = ApiClient::from_config(&config).context("creating API client")?;
        Ok(Session {
            api,
            config,
            config_path,
            cache: MetadataCache::new(),
        })
    }

    /// Load the config at `config_path` and build a session from it.
    pub fn open(config_path: &Path) -> Result<Self> {
        let config = Config::load(config_path)?;
        Session::new(config, config_path.to_path_buf())
    }

    /// Run the setup wizard and persist the new token.
    pub fn authorize(&mut self) -> Result<()> {
        let token = ui::setup_wizard(&self.api)?;
        self.config.access_token = token.access_token;
        self.config.save(&self.config_path)?;
        self.api.set_token(&self.config.access_token);
        Ok(())
    }

    /// Metadata for `path`, revalidated against the cached copy when there
    /// is one.
    pub fn metadata(&mut self, path: &str) -> Result<Metadata> {
        let cached_hash = self.cache.hash_for(path).map(str::to_string);
        match self.api.metadata(path, cached_hash.as_deref())? {
            MetadataResponse::Fresh(metadata) => {
                self.cache.store(path, &metadata);
                Ok(metadata)
            }
            MetadataResponse::NotModified => self
                .cache
                .get(path)
                .cloned()
                .with_context(|| format!("server reported {} unchanged but it is not cached", path)),
        }
    }

    pub fn run(&mut self, command: Command, out: &mut dyn Write) -> Result<()> {
        if command == Command::Setup {
            self.authorize()?;
            return Ok(());
        }
        if !self.api.has_token() {
            self.authorize()?;
        }
        match command {
            Command::Download { src, dst } => self.download(&src, &dst, out),
            Command::Upload { src, dst } => self.upload(&src, &dst, out),
            Command::Find { path, query } => {
                for m in self.api.search(&path, &query)? {
                    writeln!(out, "{}", m.path)?;
                }
                Ok(())
            }
            Command::Mv { src, dst } => {
                self.api.move_entry(&src, &dst)?;
                writeln!(out, "Move operation successful")?;
                Ok(())
            }
            Command::Cp { src, dst } => {
                self.api.copy(&src, &dst)?;
                writeln!(out, "Copy operation successful")?;
                Ok(())
            }
            Command::Mkdir { path } => {
                self.api.create_folder(&path)?;
                writeln!(out, "Mkdir operation successful")?;
                Ok(())
            }
            Command::Ls { path } => self.list(&path, out),
            Command::Rm { path, yes } => {
                if !yes && !ui::confirm_delete(&path)? {
                    writeln!(out, "Aborted")?;
                    return Ok(());
                }
                self.api.delete(&path)?;
                writeln!(out, "Delete operation successful")?;
                Ok(())
            }
            Command::Account => {
                let account = self.api.account()?;
                writeln!(out, "Name:   {}", account.display_name)?;
                writeln!(out, "Uid:    {}", account.uid)?;
                writeln!(out, "Locale: {}", account.locale)?;
                if let Some(email) = account.email {
                    writeln!(out, "Email:  {}", email)?;
                }
                Ok(())
            }
            Command::Setup => Ok(()),
        }
    }

    fn list(&mut self, path: &str, out: &mut dyn Write) -> Result<()> {
        let metadata = self.metadata(path)?;
        if !metadata.is_dir {
            writeln!(out, "{}", metadata.base_name())?;
            return Ok(());
        }
        let listing = layout::format(&metadata.child_names());
        if !listing.is_empty() {
            writeln!(out, "{}", listing)?;
        }
        Ok(())
    }

    /// Paths of every file below `dir`, fetching sub-folder listings as
    /// needed, at most `limit`.
    fn remote_files(&mut self, dir: &Metadata, limit: usize) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let mut pending: Vec<Metadata> = dir.contents.iter().rev().cloned().collect();
        while let Some(entry) = pending.pop() {
            if files.len() >= limit {
                log::warn!("{} holds more than {} files; the rest are skipped", dir.path, limit);
                break;
            }
            if entry.is_dir {
                let listing = self.metadata(&entry.path)?;
                pending.extend(listing.contents.into_iter().rev());
            } else {
                files.push(entry.path);
            }
        }
        Ok(files)
    }

    fn download(&mut self, src: &str, dst: &Path, out: &mut dyn Write) -> Result<()> {
        let metadata = self.metadata(src)?;
        if !metadata.is_dir {
            writeln!(out, "Downloading {} to {}", metadata.path, dst.display())?;
            let pb = ui::transfer_bar(metadata.base_name())?;
            let result = transfer::download_file(&self.api, &metadata.path, dst, &pb);
            pb.finish_and_clear();
            result?;
            return Ok(());
        }

        let root = dst.join(metadata.base_name());
        let files = self.remote_files(&metadata, MAX_FILE_LIMIT)?;
        let mut failed = 0;
        for path in &files {
            let rel = relative_remote(&metadata.path, path);
            let target = root.join(rel);
            writeln!(out, "Downloading {} to {}", path, target.display())?;
            let pb = ui::transfer_bar(crate::metadata::base_name(path))?;
            let result = transfer::download_file(&self.api, path, &target, &pb);
            pb.finish_and_clear();
            if let Err(e) = result {
                log::warn!("{}: {:#}", path, e);
                failed += 1;
            }
        }
        if failed > 0 {
            bail!("{} of {} downloads failed", failed, files.len());
        }
        Ok(())
    }

    fn upload(&mut self, src: &Path, dst: &str, out: &mut dyn Write) -> Result<()> {
        let single = src.is_file();
        let files = local::collect_files(src, MAX_FILE_LIMIT)?;
        let mut failed = 0;
        for file in &files {
            let remote = if single && !dst.ends_with('/') {
                dst.to_string()
            } else {
                join_remote(dst, &file.remote_suffix())
            };
            writeln!(out, "Uploading {} to {}", file.path.display(), remote)?;
            let pb = ui::transfer_bar(&file.remote_suffix())?;
            let result = transfer::upload_file(&self.api, &remote, &file.path, &pb);
            pb.finish_and_clear();
            if let Err(e) = result {
                log::warn!("{}: {:#}", file.path.display(), e);
                failed += 1;
            }
        }
        if failed > 0 {
            bail!("{} of {} uploads failed", failed, files.len());
        }
        Ok(())
    }
}

/// `path` relative to the folder `dir`, split into local path components.
/// Server paths are case-insensitive, so the prefix is matched ignoring case.
fn relative_remote(dir: &str, path: &str) -> PathBuf {
    let dir = dir.trim_end_matches('/');
    let rel = match strip_prefix_ignore_case(path, dir) {
        Some(rest) if rest.starts_with('/') => rest,
        _ => crate::metadata::base_name(path),
    };
    rel.split('/').filter(|s| !s.is_empty()).collect()
}

fn strip_prefix_ignore_case<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let mut chars = path.char_indices();
    for d in prefix.chars() {
        let (_, p) = chars.next()?;
        if !d.to_lowercase().eq(p.to_lowercase()) {
            return None;
        }
    }
    Some(chars.next().map_or("", |(i, _)| &path[i..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_remote_strips_folder_prefix() {
        assert_eq!(
            relative_remote("/Photos", "/Photos/trip/a.jpg"),
            Path::new("trip").join("a.jpg")
        );
        // Paths are case-insensitive on the server.
        assert_eq!(relative_remote("/photos", "/Photos/a.jpg"), PathBuf::from("a.jpg"));
        assert_eq!(relative_remote("/Other", "/Photos/a.jpg"), PathBuf::from("a.jpg"));
        assert_eq!(relative_remote("/Photos", "/Photos2/a.jpg"), PathBuf::from("a.jpg"));
        assert_eq!(relative_remote("/", "/a/b.txt"), Path::new("a").join("b.txt"));
    }

    #[test]
    fn relative_remote_ignores_case_outside_ascii() {
        assert_eq!(
            relative_remote("/фото", "/Фото/поездка/a.jpg"),
            Path::new("поездка").join("a.jpg")
        );
        assert_eq!(
            relative_remote("/ÉTÉ 2024", "/été 2024/plage/b.jpg"),
            Path::new("plage").join("b.jpg")
        );
    }
}
