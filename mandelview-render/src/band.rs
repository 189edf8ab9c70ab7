/// A contiguous run of buffer rows owned by one worker: `[start_y, end_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub start_y: u32,
    pub end_y: u32,
}

impl Band {
    pub fn new(start_y: u32, end_y: u32) -> Self {
        Self {
            start_y,
            end_y: end_y.max(start_y),
        }
    }

    /// Number of rows in this band.
    pub fn rows(&self) -> u32 {
        self.end_y - self.start_y
    }

    pub fn is_empty(&self) -> bool {
        self.start_y == self.end_y
    }

    #[inline]
    pub fn contains(&self, y: u32) -> bool {
        y >= self.start_y && y < self.end_y
    }
}

/// Split `height` rows into one band per worker.
///
/// Every band gets `height / workers` rows and the last band also takes the
/// remainder. When there are more workers than rows the leading bands are
/// empty; callers skip them.
pub fn partition_rows(height: u32, workers: usize) -> Vec<Band> {
    let workers = workers.max(1) as u32;
    let rows = height / workers;
    (0..workers)
        .map(|i| {
            let start = i * rows;
            let end = if i == workers - 1 { height } else { start + rows };
            Band::new(start, end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_exact_cover(height: u32, workers: usize) {
        let bands = partition_rows(height, workers);
        assert_eq!(bands.len(), workers.max(1));

        let mut covered = vec![0u32; height as usize];
        for band in &bands {
            for y in band.start_y..band.end_y {
                covered[y as usize] += 1;
            }
        }
        assert!(
            covered.iter().all(|&n| n == 1),
            "height {height}, workers {workers}: every row exactly once"
        );

        for pair in bands.windows(2) {
            assert_eq!(pair[0].end_y, pair[1].start_y, "bands must be contiguous");
        }
    }

    #[test]
    fn bands_cover_rows_exactly_once() {
        for height in [1, 2, 7, 64, 100, 719, 720, 1081] {
            for workers in [1, 2, 3, 4, 6, 8, 12, 16, 33] {
                assert_exact_cover(height, workers);
            }
        }
    }

    #[test]
    fn last_band_absorbs_remainder() {
        let bands = partition_rows(720, 7);
        let rows = 720 / 7;
        for band in &bands[..6] {
            assert_eq!(band.rows(), rows);
        }
        assert_eq!(bands[6].rows(), rows + 720 % 7);
        assert_eq!(bands[6].end_y, 720);
    }

    #[test]
    fn more_workers_than_rows() {
        let bands = partition_rows(3, 8);
        assert_eq!(bands.iter().filter(|b| !b.is_empty()).count(), 1);
        assert_eq!(bands[7], Band::new(0, 3));
    }

    #[test]
    fn zero_workers_means_one() {
        assert_eq!(partition_rows(10, 0), vec![Band::new(0, 10)]);
    }

    #[test]
    fn contains_is_half_open() {
        let band = Band::new(4, 8);
        assert!(band.contains(4));
        assert!(band.contains(7));
        assert!(!band.contains(8));
        assert!(!band.contains(3));
    }
}
