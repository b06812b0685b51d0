//! Plain region sets: sorted, merged half-open intervals per chromosome.
//!
//! Used for blacklist exclusion and for the union of labeled spans that
//! negative draws must avoid. Merging at construction keeps the overlap
//! query a single binary search.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct RegionSet {
    by_chromosome: HashMap<String, Vec<(usize, usize)>>,
}

impl RegionSet {
    /// Build from raw `(chromosome, start, end)` triples. Regions are sorted
    /// and overlapping/adjacent regions merged per chromosome.
    pub fn from_regions<I>(regions: I) -> Self
    where
        I: IntoIterator<Item = (String, usize, usize)>,
    {
        let mut by_chromosome: HashMap<String, Vec<(usize, usize)>> = HashMap::new();
        for (chrom, start, end) in regions {
            by_chromosome.entry(chrom).or_default().push((start, end));
        }
        for regions in by_chromosome.values_mut() {
            regions.sort_unstable();
            *regions = merge_sorted(regions);
        }
        Self { by_chromosome }
    }

    /// True if any region overlaps `[start, end)` on `chromosome`.
    pub fn overlaps(&self, chromosome: &str, start: usize, end: usize) -> bool {
        let Some(regions) = self.by_chromosome.get(chromosome) else {
            return false;
        };
        // Regions are disjoint and sorted, so the first region ending after
        // `start` is the only candidate.
        let idx = regions.partition_point(|&(_, region_end)| region_end <= start);
        idx < regions.len() && regions[idx].0 < end
    }

    pub fn is_empty(&self) -> bool {
        self.by_chromosome.values().all(|r| r.is_empty())
    }

    pub fn region_count(&self) -> usize {
        self.by_chromosome.values().map(|r| r.len()).sum()
    }
}

fn merge_sorted(sorted: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(sorted.len());
    for &(start, end) in sorted {
        match merged.last_mut() {
            Some((_, last_end)) if start <= *last_end => {
                *last_end = (*last_end).max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chr(name: &str, start: usize, end: usize) -> (String, usize, usize) {
        (name.to_string(), start, end)
    }

    #[test]
    fn test_overlap_detection() {
        let set = RegionSet::from_regions(vec![chr("chr1", 100, 200), chr("chr1", 500, 600)]);

        assert!(set.overlaps("chr1", 150, 160));
        assert!(set.overlaps("chr1", 90, 101));
        assert!(set.overlaps("chr1", 199, 300));
        assert!(!set.overlaps("chr1", 200, 500));
        assert!(!set.overlaps("chr1", 0, 100));
        assert!(!set.overlaps("chr2", 150, 160));
    }

    #[test]
    fn test_merging_overlapping_regions() {
        let set = RegionSet::from_regions(vec![
            chr("chr1", 100, 300),
            chr("chr1", 200, 400),
            chr("chr1", 400, 500),
        ]);
        // Adjacent and overlapping regions collapse to one.
        assert_eq!(set.region_count(), 1);
        assert!(set.overlaps("chr1", 350, 360));
        assert!(!set.overlaps("chr1", 500, 600));
    }

    #[test]
    fn test_empty_set() {
        let set = RegionSet::from_regions(Vec::new());
        assert!(set.is_empty());
        assert!(!set.overlaps("chr1", 0, 1000));
    }
}
