//! Optimization score.
//!
//! Percentage of impact weight that is currently enabled, counting only
//! tweaks whose key or service exists.

use crate::types::{Category, ReconciledTweak};
use serde::{Deserialize, Serialize};

/// Aggregate score in `0..=100`. Zero when nothing exists.
pub fn compute_score(tweaks: &[ReconciledTweak]) -> u8 {
    score_of(tweaks.iter())
}

/// Score restricted to a single category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    pub score: u8,
    pub enabled: usize,
    pub available: usize,
}

/// Per-category scores in `Category::ALL` order
pub fn category_scores(tweaks: &[ReconciledTweak]) -> Vec<CategoryScore> {
    Category::ALL
        .iter()
        .map(|&category| {
            let in_category = || tweaks.iter().filter(move |t| t.descriptor.category == category);
            CategoryScore {
                category,
                score: score_of(in_category()),
                enabled: in_category().filter(|t| t.exists && t.is_enabled).count(),
                available: in_category().filter(|t| t.exists).count(),
            }
        })
        .collect()
}

fn score_of<'a>(tweaks: impl Iterator<Item = &'a ReconciledTweak>) -> u8 {
    let (earned, total) = tweaks
        .filter(|t| t.exists)
        .fold((0u64, 0u64), |(earned, total), t| {
            let w = u64::from(t.descriptor.impact.weight());
            let earned = if t.is_enabled { earned + w } else { earned };
            (earned, total + w)
        });

    if total == 0 {
        return 0;
    }

    // round(100 * earned / total), half away from zero
    ((200 * earned + total) / (2 * total)) as u8
}
