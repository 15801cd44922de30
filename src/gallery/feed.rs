use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::{Gallery, GalleryError};
use crate::db::ImageRecord;

pub const SEED_RANGE: std::ops::RangeInclusive<u64> = 1..=1_000_000;

/// A fresh per-visitor feed seed.
pub fn new_seed() -> u64 {
    rand::rng().random_range(SEED_RANGE)
}

/// Shuffle `ids` deterministically for `seed`. The input is sorted first so
/// the result only depends on the set of ids, not on query order.
pub fn seeded_order(mut ids: Vec<i64>, seed: u64) -> Vec<i64> {
    ids.sort_unstable();
    let mut rng = StdRng::seed_from_u64(seed);
    ids.shuffle(&mut rng);
    ids
}

/// Bounds of the `[offset, offset + limit)` window over `total` items and
/// whether anything follows it.
fn window(total: usize, offset: usize, limit: usize) -> (usize, usize, bool) {
    let start = offset.min(total);
    let end = offset.saturating_add(limit).min(total);
    let has_more = offset.saturating_add(limit) < total;
    (start, end, has_more)
}

impl Gallery {
    /// One slice of the visitor's shuffled feed.
    pub async fn load_more(
        &self,
        seed: u64,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<ImageRecord>, bool), GalleryError> {
        let db = self.db.clone();
        let result = tokio::task::spawn_blocking(move || {
            let order = seeded_order(db.all_image_ids()?, seed);
            let (start, end, has_more) = window(order.len(), offset, limit);
            let images = db.images_by_ids(&order[start..end])?;
            Ok::<_, GalleryError>((images, has_more))
        })
        .await??;
        Ok(result)
    }
}
