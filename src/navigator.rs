use crate::catalog::Catalog;
use crate::model::{Track, TrackId};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

/// Answers "what comes after/before this track" over either the catalog's
/// natural order or a shuffled permutation of its ids.
///
/// Only ids are stored. Orders are resolved through the catalog on every
/// call, so renames and deletions are visible immediately.
#[derive(Debug)]
pub struct Navigator {
    shuffled_order: Option<Vec<TrackId>>,
    rng: SmallRng,
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            shuffled_order: None,
            rng: SmallRng::from_os_rng(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            shuffled_order: None,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled_order.is_some()
    }

    /// Turning shuffle on always draws a fresh permutation.
    pub fn set_shuffle(&mut self, on: bool, catalog: &Catalog) {
        if !on {
            self.shuffled_order = None;
            return;
        }

        let mut order: Vec<TrackId> = catalog.ids().cloned().collect();
        // Fisher-Yates: walks from the last index down, swapping with j <= i.
        order.shuffle(&mut self.rng);
        self.shuffled_order = Some(order);
    }

    pub fn shuffled_ids(&self) -> Option<&[TrackId]> {
        self.shuffled_order.as_deref()
    }

    pub fn current_order<'a>(&self, catalog: &'a Catalog) -> Vec<&'a Track> {
        match &self.shuffled_order {
            Some(order) => order.iter().filter_map(|id| catalog.get(id)).collect(),
            None => catalog.tracks().iter().collect(),
        }
    }

    pub fn position(&self, id: &TrackId, catalog: &Catalog) -> Option<usize> {
        self.current_order(catalog)
            .iter()
            .position(|track| &track.id == id)
    }

    pub fn is_last(&self, id: &TrackId, catalog: &Catalog) -> bool {
        let order = self.current_order(catalog);
        order.last().is_some_and(|track| &track.id == id)
    }

    /// Wraps to the first track after the last one.
    pub fn next<'a>(&self, active: &TrackId, catalog: &'a Catalog) -> Option<&'a Track> {
        let order = self.current_order(catalog);
        let idx = order.iter().position(|track| &track.id == active)?;
        order.get((idx + 1) % order.len()).copied()
    }

    /// Wraps to the last track before the first one.
    pub fn previous<'a>(&self, active: &TrackId, catalog: &'a Catalog) -> Option<&'a Track> {
        let order = self.current_order(catalog);
        let idx = order.iter().position(|track| &track.id == active)?;
        order.get((idx + order.len() - 1) % order.len()).copied()
    }

    pub fn first<'a>(&self, catalog: &'a Catalog) -> Option<&'a Track> {
        self.current_order(catalog).first().copied()
    }

    pub fn last<'a>(&self, catalog: &'a Catalog) -> Option<&'a Track> {
        self.current_order(catalog).last().copied()
    }

    /// Drops a deleted id from the shuffled order without reshuffling.
    pub fn forget(&mut self, id: &TrackId) {
        if let Some(order) = self.shuffled_order.as_mut() {
            order.retain(|candidate| candidate != id);
        }
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UNKNOWN_ARTIST;
    use proptest::prop_assert_eq;
    use std::path::PathBuf;

    fn catalog_of(len: usize) -> Catalog {
        Catalog::new(
            (0..len)
                .map(|n| Track {
                    id: TrackId::new(format!("id-{n}")),
                    title: format!("song_{n}"),
                    uri: PathBuf::from(format!("song_{n}.mp3")),
                    duration_seconds: 1.0,
                    artist: String::from(UNKNOWN_ARTIST),
                })
                .collect(),
        )
    }

    fn ids<'a>(tracks: &[&'a Track]) -> Vec<&'a str> {
        tracks.iter().map(|track| track.id.as_str()).collect()
    }

    #[test]
    fn natural_order_wraps_both_ways() {
        let catalog = catalog_of(3);
        let nav = Navigator::with_seed(1);
        let first = TrackId::from("id-0");
        let last = TrackId::from("id-2");

        assert_eq!(nav.next(&last, &catalog).map(|t| t.id.as_str()), Some("id-0"));
        assert_eq!(
            nav.previous(&first, &catalog).map(|t| t.id.as_str()),
            Some("id-2")
        );
        assert!(nav.is_last(&last, &catalog));
        assert!(!nav.is_last(&first, &catalog));
    }

    #[test]
    fn unknown_id_and_empty_catalog_are_no_ops() {
        let nav = Navigator::with_seed(1);
        let catalog = catalog_of(2);
        assert!(nav.next(&TrackId::from("ghost"), &catalog).is_none());
        assert!(nav.previous(&TrackId::from("ghost"), &catalog).is_none());

        let empty = Catalog::default();
        assert!(nav.next(&TrackId::from("id-0"), &empty).is_none());
        assert!(nav.first(&empty).is_none());
    }

    #[test]
    fn single_track_wraps_onto_itself() {
        let catalog = catalog_of(1);
        let nav = Navigator::with_seed(1);
        let only = TrackId::from("id-0");
        assert_eq!(nav.next(&only, &catalog).map(|t| &t.id), Some(&only));
        assert_eq!(nav.previous(&only, &catalog).map(|t| &t.id), Some(&only));
    }

    #[test]
    fn shuffle_off_restores_natural_order() {
        let catalog = catalog_of(6);
        let mut nav = Navigator::with_seed(9);
        nav.set_shuffle(true, &catalog);
        assert!(nav.is_shuffled());
        nav.set_shuffle(false, &catalog);
        assert!(!nav.is_shuffled());
        assert_eq!(
            ids(&nav.current_order(&catalog)),
            ids(&catalog.tracks().iter().collect::<Vec<_>>())
        );
    }

    #[test]
    fn reshuffling_draws_a_new_order() {
        let catalog = catalog_of(12);
        let mut nav = Navigator::with_seed(3);
        nav.set_shuffle(true, &catalog);
        let first: Vec<TrackId> = nav.shuffled_ids().expect("shuffled").to_vec();

        let mut differs = false;
        for _ in 0..8 {
            nav.set_shuffle(false, &catalog);
            nav.set_shuffle(true, &catalog);
            if nav.shuffled_ids().expect("shuffled") != first.as_slice() {
                differs = true;
                break;
            }
        }
        assert!(differs, "toggling shuffle should produce a fresh permutation");
    }

    #[test]
    fn forget_filters_without_reshuffling() {
        let catalog = catalog_of(5);
        let mut nav = Navigator::with_seed(5);
        nav.set_shuffle(true, &catalog);
        let mut expected: Vec<TrackId> = nav.shuffled_ids().expect("shuffled").to_vec();
        let victim = TrackId::from("id-2");
        expected.retain(|id| id != &victim);

        nav.forget(&victim);
        assert_eq!(nav.shuffled_ids().expect("shuffled"), expected.as_slice());
    }

    #[test]
    fn shuffled_order_skips_ids_missing_from_catalog() {
        let mut catalog = catalog_of(4);
        let mut nav = Navigator::with_seed(2);
        nav.set_shuffle(true, &catalog);
        catalog.remove(&TrackId::from("id-1"));

        let order = nav.current_order(&catalog);
        assert_eq!(order.len(), 3);
        assert!(order.iter().all(|track| track.id.as_str() != "id-1"));
    }

    proptest::proptest! {
        #[test]
        fn next_and_previous_are_inverse(len in 1usize..40, pick in 0usize..40, seed in 0u64..1000, shuffled in proptest::bool::ANY) {
            let catalog = catalog_of(len);
            let mut nav = Navigator::with_seed(seed);
            nav.set_shuffle(shuffled, &catalog);
            let id = TrackId::new(format!("id-{}", pick % len));

            let after = nav.next(&id, &catalog).expect("next").id.clone();
            let back = nav.previous(&after, &catalog).expect("previous").id.clone();
            prop_assert_eq!(&back, &id);

            let before = nav.previous(&id, &catalog).expect("previous").id.clone();
            let forward = nav.next(&before, &catalog).expect("next").id.clone();
            prop_assert_eq!(&forward, &id);
        }

        #[test]
        fn shuffle_is_a_permutation(len in 0usize..60, seed in 0u64..1000) {
            let catalog = catalog_of(len);
            let mut nav = Navigator::with_seed(seed);
            nav.set_shuffle(true, &catalog);

            let mut shuffled: Vec<&str> = ids(&nav.current_order(&catalog));
            let mut natural: Vec<&str> = catalog.ids().map(TrackId::as_str).collect();
            prop_assert_eq!(shuffled.len(), natural.len());
            shuffled.sort_unstable();
            natural.sort_unstable();
            prop_assert_eq!(shuffled, natural);
        }
    }
}
