//! Greedy center-first semantic clustering
//!
//! Walk keywords in descending volume; each unassigned keyword opens a
//! cluster and absorbs every remaining keyword above the absorption
//! threshold. Undersized clusters release their keywords, which are then
//! attached to the best surviving cluster or pooled into a trailing misc
//! cluster.

use crate::text::similarity;
use crate::types::Keyword;

/// Similarity needed to absorb a keyword into a forming cluster.
const ABSORB_THRESHOLD: f64 = 0.4;

/// Similarity needed to attach a leftover keyword to an existing cluster.
const ATTACH_THRESHOLD: f64 = 0.3;

/// Cluster keywords greedily. Returns groups of indices into `keywords`.
pub fn semantic_groups(keywords: &[Keyword], min_cluster_size: usize) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..keywords.len()).collect();
    order.sort_by(|&a, &b| keywords[b].search_volume.cmp(&keywords[a].search_volume));

    let mut assigned = vec![false; keywords.len()];
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for &center in &order {
        if assigned[center] {
            continue;
        }
        assigned[center] = true;
        let mut group = vec![center];

        for &candidate in &order {
            if assigned[candidate] {
                continue;
            }
            if similarity(&keywords[center].text, &keywords[candidate].text) > ABSORB_THRESHOLD {
                assigned[candidate] = true;
                group.push(candidate);
            }
        }
        groups.push(group);
    }

    // Undersized groups dissolve; their keywords go back into the pool.
    let mut leftovers: Vec<usize> = Vec::new();
    groups.retain(|group| {
        if group.len() >= min_cluster_size {
            true
        } else {
            leftovers.extend(group.iter().copied());
            false
        }
    });

    // Attach leftovers to the closest surviving group, judged against the
    // group's center (its highest-volume keyword).
    let mut misc: Vec<usize> = Vec::new();
    for index in leftovers {
        let mut best: Option<(usize, f64)> = None;
        for (group_index, group) in groups.iter().enumerate() {
            let center = group[0];
            let sim = similarity(&keywords[index].text, &keywords[center].text);
            if sim > ATTACH_THRESHOLD && best.map_or(true, |(_, s)| sim > s) {
                best = Some((group_index, sim));
            }
        }
        match best {
            Some((group_index, _)) => groups[group_index].push(index),
            None => misc.push(index),
        }
    }

    if misc.len() >= min_cluster_size {
        groups.push(misc);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Competition;

    fn keyword(text: &str, volume: u64) -> Keyword {
        Keyword::new(text, volume, Competition::Medium)
    }

    #[test]
    fn test_groups_by_similarity() {
        let keywords = vec![
            keyword("seo services", 1000),
            keyword("seo services zurich", 900),
            keyword("affordable seo services", 800),
            keyword("web design", 700),
            keyword("web design agency", 600),
            keyword("modern web design", 500),
        ];
        let groups = semantic_groups(&keywords, 2);
        assert_eq!(groups.len(), 2);

        let find = |i: usize| groups.iter().position(|g| g.contains(&i)).unwrap();
        assert_eq!(find(0), find(1));
        assert_eq!(find(0), find(2));
        assert_eq!(find(3), find(4));
        assert_ne!(find(0), find(3));
    }

    #[test]
    fn test_centers_walk_in_volume_order() {
        let keywords = vec![
            keyword("tiny keyword", 10),
            keyword("huge keyword", 10_000),
        ];
        let groups = semantic_groups(&keywords, 1);
        // Highest volume keyword seeds the first cluster.
        assert_eq!(groups[0][0], 1);
    }

    #[test]
    fn test_misc_cluster_for_orphans() {
        let keywords = vec![
            keyword("alpha decay", 100),
            keyword("zebra stripes", 90),
            keyword("quantum foam", 80),
        ];
        // Nothing is similar; all three orphan groups dissolve and pool
        // into one misc cluster at the threshold size.
        let groups = semantic_groups(&keywords, 3);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn test_orphans_dropped_below_misc_threshold() {
        let keywords = vec![keyword("alpha decay", 100), keyword("zebra stripes", 90)];
        let groups = semantic_groups(&keywords, 3);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_every_index_in_at_most_one_group() {
        let keywords = vec![
            keyword("seo services", 1000),
            keyword("seo audit", 900),
            keyword("seo services pricing", 800),
            keyword("link building", 700),
        ];
        let groups = semantic_groups(&keywords, 1);
        let mut seen = std::collections::HashSet::new();
        for group in &groups {
            for &index in group {
                assert!(seen.insert(index), "index {} appears twice", index);
            }
        }
    }
}
