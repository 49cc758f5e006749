//! Read-only summaries rendered by the results page and the dashboard.

use crate::db::models::Poll;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionResult {
    pub id: Uuid,
    pub text: String,
    pub votes: i64,
    pub percentage: u32,
    pub leading: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    pub poll_id: Uuid,
    pub title: String,
    pub is_active: bool,
    pub total_votes: i64,
    pub options: Vec<OptionResult>,
}

impl PollResults {
    /// Options sorted by votes, most first; ties keep their poll order.
    pub fn from_poll(poll: &Poll) -> Self {
        let mut options: Vec<_> = poll.options.iter().collect();
        options.sort_by(|a, b| b.votes.cmp(&a.votes));

        let options = options
            .into_iter()
            .enumerate()
            .map(|(index, option)| OptionResult {
                id: option.id,
                text: option.text.clone(),
                votes: option.votes,
                percentage: percentage(option.votes, poll.total_votes),
                leading: index == 0 && option.votes > 0,
            })
            .collect();

        PollResults {
            poll_id: poll.id,
            title: poll.title.clone(),
            is_active: poll.is_active,
            total_votes: poll.total_votes,
            options,
        }
    }
}

fn percentage(votes: i64, total: i64) -> u32 {
    if total <= 0 {
        return 0;
    }
    (votes as f64 * 100.0 / total as f64).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_polls: usize,
    pub total_votes: i64,
    pub active_polls: usize,
    pub polls_this_month: usize,
}

impl DashboardStats {
    pub fn from_polls(polls: &[Poll], total_votes: i64, now: DateTime<Utc>) -> Self {
        DashboardStats {
            total_polls: polls.len(),
            total_votes,
            active_polls: polls.iter().filter(|p| p.is_active).count(),
            polls_this_month: polls
                .iter()
                .filter(|p| p.created_at.year() == now.year() && p.created_at.month() == now.month())
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::PollOption;
    use chrono::TimeZone;

    fn poll(votes: &[i64]) -> Poll {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let options: Vec<PollOption> = votes
            .iter()
            .enumerate()
            .map(|(i, v)| PollOption {
                id: Uuid::new_v4(),
                text: format!("option {i}"),
                votes: *v,
                poll_id: id,
            })
            .collect();
        Poll {
            id,
            title: "Favourite colour".into(),
            description: "Pick the one you like most".into(),
            total_votes: votes.iter().sum(),
            options,
            is_active: true,
            created_at: now,
            updated_at: now,
            author_id: Uuid::new_v4(),
            author: None,
        }
    }

    #[test]
    fn results_are_sorted_with_rounded_percentages() {
        let results = PollResults::from_poll(&poll(&[1, 2]));

        assert_eq!(results.total_votes, 3);
        assert_eq!(results.options[0].text, "option 1");
        assert_eq!(results.options[0].percentage, 67);
        assert!(results.options[0].leading);
        assert_eq!(results.options[1].percentage, 33);
        assert!(!results.options[1].leading);
    }

    #[test]
    fn no_votes_means_no_leader_and_zero_percent() {
        let results = PollResults::from_poll(&poll(&[0, 0]));

        assert!(results.options.iter().all(|o| o.percentage == 0 && !o.leading));
        assert_eq!(results.options[0].text, "option 0");
    }

    #[test]
    fn dashboard_counts_this_month_and_active() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let mut recent = poll(&[]);
        recent.created_at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let mut old = poll(&[]);
        old.created_at = Utc.with_ymd_and_hms(2025, 3, 20, 0, 0, 0).unwrap();
        old.is_active = false;

        let stats = DashboardStats::from_polls(&[recent, old], 7, now);

        assert_eq!(
            stats,
            DashboardStats {
                total_polls: 2,
                total_votes: 7,
                active_polls: 1,
                polls_this_month: 1,
            }
        );
    }
}
