//! Corpus-wide tag frequency table.
//!
//! Input is the `tags.json` mapping (image id → ranked tags). Every
//! occurrence counts. Output is sorted by count descending; equal counts keep
//! the order in which tags were first seen while walking the mapping.

use std::collections::{BTreeMap, HashMap};

use crate::types::TagCount;

/// Count how often each tag occurs across all images.
pub fn aggregate_tags(tags_by_id: &BTreeMap<String, Vec<String>>) -> Vec<TagCount> {
    // (first-seen position, count) per tag
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

    for tag in tags_by_id.values().flatten() {
        let next_position = counts.len();
        counts
            .entry(tag.as_str())
            .or_insert((next_position, 0))
            .1 += 1;
    }

    let mut table: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(tag, (first_seen, count))| (tag, first_seen, count))
        .collect();
    table.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));

    table
        .into_iter()
        .map(|(tag, _, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect()
}
