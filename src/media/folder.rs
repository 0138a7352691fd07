use super::{FileMover, MediaCatalogSource, PermissionService};
use crate::config;
use crate::model::{AudioAsset, PermissionStatus, TrackId};
use anyhow::{Context, Result, bail};
use log::{debug, warn};
use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus"];

/// Grants access when every configured folder can be listed.
pub struct FolderPermissions {
    folders: Vec<PathBuf>,
}

impl FolderPermissions {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self { folders }
    }
}

impl PermissionService for FolderPermissions {
    fn request_audio_library_access(&mut self) -> PermissionStatus {
        let denied = self
            .folders
            .iter()
            .find(|folder| fs::read_dir(folder).is_err());
        match denied {
            Some(folder) => {
                warn!("library folder {} is not readable", folder.display());
                PermissionStatus::Denied
            }
            None => PermissionStatus::Granted,
        }
    }
}

/// Media store backed by plain folders on disk.
pub struct FolderMediaSource {
    roots: Vec<PathBuf>,
    index: HashMap<TrackId, PathBuf>,
}

impl FolderMediaSource {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            index: HashMap::new(),
        }
    }

    fn scan_root(root: &Path, remaining: usize) -> Vec<AudioAsset> {
        let mut assets = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            if assets.len() >= remaining {
                break;
            }

            let path = entry.path();
            if !entry.file_type().is_file() || !is_audio(path) {
                continue;
            }

            let uri = config::normalize_path(path);
            let filename = uri
                .file_name()
                .and_then(OsStr::to_str)
                .unwrap_or("unknown")
                .to_string();
            let probe = probe_file(&uri);

            assets.push(AudioAsset {
                id: asset_id_for(&uri),
                filename,
                duration_seconds: probe.duration_seconds.unwrap_or(0.0),
                artist: probe.artist,
                uri,
            });
        }

        assets
    }
}

impl MediaCatalogSource for FolderMediaSource {
    fn list_audio_assets(&mut self, limit: usize) -> Result<Vec<AudioAsset>> {
        let mut all = Vec::new();
        for root in &self.roots {
            if !root.is_dir() {
                bail!("library folder {} does not exist", root.display());
            }
            let remaining = limit.saturating_sub(all.len());
            if remaining == 0 {
                break;
            }
            all.extend(Self::scan_root(root, remaining));
        }

        self.index = all
            .iter()
            .map(|asset| (asset.id.clone(), asset.uri.clone()))
            .collect();
        debug!("enumerated {} audio assets", all.len());
        Ok(all)
    }

    fn resolve_local_uri(&self, id: &TrackId) -> Option<PathBuf> {
        self.index.get(id).filter(|path| path.is_file()).cloned()
    }

    fn delete_assets(&mut self, ids: &[TrackId]) -> Result<bool> {
        let mut paths = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(path) = self.index.get(id) else {
                warn!("delete requested for unknown asset {id}");
                return Ok(false);
            };
            paths.push(path.clone());
        }

        for (id, path) in ids.iter().zip(paths) {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
            self.index.remove(id);
        }
        Ok(true)
    }

    fn patch_asset_uri(&mut self, id: &TrackId, uri: &Path) {
        self.index.insert(id.clone(), uri.to_path_buf());
    }
}

/// Renames on the local filesystem. Never overwrites another file.
pub struct FsMover;

impl FileMover for FsMover {
    fn move_file(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        if from == to {
            return Ok(());
        }
        // A case-only rename on a case-insensitive filesystem sees itself.
        if to.exists() && !is_same_file(from, to) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", to.display()),
            ));
        }
        fs::rename(from, to)
    }
}

#[cfg(unix)]
fn is_same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[derive(Default)]
struct FileProbe {
    duration_seconds: Option<f64>,
    artist: Option<String>,
}

fn probe_file(path: &Path) -> FileProbe {
    let mut probe = FileProbe::default();

    if let Ok(tagged) = Probe::open(path).and_then(|probe| probe.read()) {
        let duration = tagged.properties().duration();
        if !duration.is_zero() {
            probe.duration_seconds = Some(duration.as_secs_f64());
        }
        probe.artist = tagged
            .primary_tag()
            .or_else(|| tagged.first_tag())
            .and_then(|tag| tag.artist())
            .map(|artist| artist.trim().to_string())
            .filter(|artist| !artist.is_empty());
    }

    if probe.duration_seconds.is_none() {
        probe.duration_seconds = symphonia_duration_seconds(path);
    }
    probe
}

fn symphonia_duration_seconds(path: &Path) -> Option<f64> {
    let file = File::open(path).ok()?;
    let source = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(OsStr::to_str) {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let params = &probed.format.default_track()?.codec_params;
    if let (Some(time_base), Some(frame_count)) = (params.time_base, params.n_frames) {
        let time = time_base.calc_time(frame_count);
        return Some(time.seconds as f64 + time.frac);
    }

    params
        .n_frames
        .zip(params.sample_rate)
        .filter(|(_, sample_rate)| *sample_rate > 0)
        .map(|(frames, sample_rate)| frames as f64 / f64::from(sample_rate))
}

fn asset_id_for(path: &Path) -> TrackId {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    TrackId::new(hex)
}

fn is_audio(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    AUDIO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}
