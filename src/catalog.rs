use crate::error::MuzicError;
use crate::media::MediaCatalogSource;
use crate::model::{AudioAsset, Track, TrackId, UNKNOWN_ARTIST, title_from_filename};
use log::{info, warn};
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

/// Enumerated tracks in source order. Ids are unique.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    tracks: Vec<Track>,
    lookup: HashMap<TrackId, usize>,
}

impl Catalog {
    pub fn new(tracks: Vec<Track>) -> Self {
        let mut catalog = Self::default();
        for track in tracks {
            if catalog.lookup.contains_key(&track.id) {
                warn!("dropping duplicate track id {}", track.id);
                continue;
            }
            catalog.lookup.insert(track.id.clone(), catalog.tracks.len());
            catalog.tracks.push(track);
        }
        catalog
    }

    /// Enumerates up to `limit` assets. A failing source is logged and
    /// yields an empty catalog.
    pub fn load(source: &mut dyn MediaCatalogSource, limit: usize) -> Self {
        match Self::try_load(source, limit) {
            Ok(catalog) => {
                info!("catalog loaded with {} tracks", catalog.len());
                catalog
            }
            Err(err) => {
                warn!("{err}");
                Self::default()
            }
        }
    }

    pub fn try_load(
        source: &mut dyn MediaCatalogSource,
        limit: usize,
    ) -> Result<Self, MuzicError> {
        let assets =
            source
                .list_audio_assets(limit)
                .map_err(|err| MuzicError::CatalogLoadFailure {
                    reason: format!("{err:#}"),
                })?;
        let tracks = assets
            .into_iter()
            .map(|asset| {
                let local = source.resolve_local_uri(&asset.id);
                track_from_asset(asset, local)
            })
            .collect();
        Ok(Self::new(tracks))
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: &TrackId) -> Option<&Track> {
        self.lookup.get(id).and_then(|idx| self.tracks.get(*idx))
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.lookup.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &TrackId> {
        self.tracks.iter().map(|track| &track.id)
    }

    /// Swaps in `track` for the entry with the same id, keeping its slot.
    pub fn replace(&mut self, track: Track) -> Option<Track> {
        let idx = *self.lookup.get(&track.id)?;
        Some(std::mem::replace(&mut self.tracks[idx], track))
    }

    pub fn remove(&mut self, id: &TrackId) -> Option<Track> {
        let idx = self.lookup.remove(id)?;
        let removed = self.tracks.remove(idx);
        for slot in self.lookup.values_mut() {
            if *slot > idx {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Case-insensitive title match. An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&Track> {
        let needle = fold_for_search(query.trim());
        if needle.is_empty() {
            return self.tracks.iter().collect();
        }
        self.tracks
            .iter()
            .filter(|track| fold_for_search(&track.title).contains(&needle))
            .collect()
    }
}

fn track_from_asset(asset: AudioAsset, local_uri: Option<std::path::PathBuf>) -> Track {
    Track {
        title: title_from_filename(&asset.filename),
        uri: local_uri.unwrap_or(asset.uri),
        duration_seconds: asset.duration_seconds,
        artist: asset
            .artist
            .unwrap_or_else(|| String::from(UNKNOWN_ARTIST)),
        id: asset.id,
    }
}

fn fold_for_search(value: &str) -> String {
    value.nfkc().flat_map(char::to_lowercase).collect()
}
