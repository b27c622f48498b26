// src/engine/aggregate.rs

use std::collections::{BTreeMap, HashMap};

use crate::models::score::{ScoreRecord, UserScoreHistory};

/// Display name used when a score belongs to a user missing from the directory.
pub const UNKNOWN_USER_NAME: &str = "Unknown user";

/// Groups score records by user and computes per-user totals.
///
/// Every record lands in exactly one history, even when its user is not in
/// `directory`. Each user's scores are sorted most recent first. Histories are
/// returned by ascending user id.
pub fn aggregate_scores(
    records: &[ScoreRecord],
    directory: &HashMap<i64, String>,
) -> Vec<UserScoreHistory> {
    let mut by_user: BTreeMap<i64, UserScoreHistory> = BTreeMap::new();

    for record in records {
        let history = by_user
            .entry(record.user_id)
            .or_insert_with(|| UserScoreHistory {
                user_id: record.user_id,
                user_name: directory
                    .get(&record.user_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string()),
                scores: Vec::new(),
                total_score: 0,
                quiz_count: 0,
                average_score: 0,
            });

        history.scores.push(record.clone());
        history.total_score += record.score;
        history.quiz_count += 1;
    }

    by_user
        .into_values()
        .map(|mut history| {
            history.average_score = rounded_average(history.total_score, history.quiz_count);
            history
                .scores
                .sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
            history
        })
        .collect()
}

/// `total / count` rounded to the nearest integer, halves away from zero.
pub fn rounded_average(total: i64, count: i64) -> i64 {
    if count == 0 {
        return 0;
    }
    (total as f64 / count as f64).round() as i64
}
