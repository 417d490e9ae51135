//! Validation Hook Aggregator - merges scanner metadata across a rule set.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::RuleCard;

/// Merge the `detect` maps of `cards` into tool -> sorted, unique rule ids.
///
/// Output is independent of card order.
pub fn aggregate<'a, I>(cards: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = &'a RuleCard>,
{
    let mut merged: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for card in cards {
        for (tool, rule_ids) in &card.detect {
            merged
                .entry(tool.as_str())
                .or_default()
                .extend(rule_ids.iter().map(String::as_str));
        }
    }

    merged
        .into_iter()
        .map(|(tool, ids)| {
            (
                tool.to_string(),
                ids.into_iter().map(str::to_string).collect(),
            )
        })
        .collect()
}
