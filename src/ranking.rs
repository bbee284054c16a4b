use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::{errors::RequestError, models::Prompt};

/// Added to the age in hours so brand new prompts don't divide by ~0.
pub const TRENDING_AGE_OFFSET_HOURS: f64 = 2.0;
/// Gravity of the trending decay.
pub const TRENDING_GRAVITY: f64 = 1.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    Recent,
    Popular,
    #[default]
    Trending,
    Controversial,
}

impl FromStr for SortMode {
    type Err = RequestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "recent" => Ok(SortMode::Recent),
            "popular" => Ok(SortMode::Popular),
            "trending" => Ok(SortMode::Trending),
            "controversial" => Ok(SortMode::Controversial),
            other => Err(RequestError::Validation(format!(
                "Unknown sort mode '{other}'"
            ))),
        }
    }
}

/// What the ranking needs to know about an item.
pub trait Ranked {
    fn id(&self) -> i64;
    fn upvotes(&self) -> i64;
    fn downvotes(&self) -> i64;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Ranked for Prompt {
    fn id(&self) -> i64 {
        self.id
    }
    fn upvotes(&self) -> i64 {
        self.upvotes
    }
    fn downvotes(&self) -> i64 {
        self.downvotes
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

pub fn net_score(item: &impl Ranked) -> i64 {
    item.upvotes() - item.downvotes()
}

pub fn trending_score(item: &impl Ranked, now: DateTime<Utc>) -> f64 {
    let age_ms = (now - item.created_at()).num_milliseconds().max(0);
    let age_hours = age_ms as f64 / 3_600_000.0;
    net_score(item) as f64 / (age_hours + TRENDING_AGE_OFFSET_HOURS).powf(TRENDING_GRAVITY)
}

pub fn controversial_score(item: &impl Ranked) -> f64 {
    let (up, down) = (item.upvotes(), item.downvotes());
    if up == 0 {
        return 0.0;
    }
    (up + down) as f64 * (down as f64 / up as f64)
}

fn newest_first(a: &impl Ranked, b: &impl Ranked) -> Ordering {
    b.created_at()
        .cmp(&a.created_at())
        .then_with(|| b.id().cmp(&a.id()))
}

/// Orders `items` for a listing. Pure: the same inputs and `now` always give
/// the same order.
pub fn rank_prompts<T: Ranked>(mut items: Vec<T>, mode: SortMode, now: DateTime<Utc>) -> Vec<T> {
    match mode {
        SortMode::Recent => items.sort_by(newest_first),
        SortMode::Popular => items.sort_by(|a, b| {
            net_score(b)
                .cmp(&net_score(a))
                .then_with(|| newest_first(a, b))
        }),
        SortMode::Trending => items.sort_by(|a, b| {
            trending_score(b, now)
                .total_cmp(&trending_score(a, now))
                .then_with(|| newest_first(a, b))
        }),
        SortMode::Controversial => items.sort_by(|a, b| {
            controversial_score(b)
                .total_cmp(&controversial_score(a))
                .then_with(|| newest_first(a, b))
        }),
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[derive(Debug, Clone)]
    struct Item {
        id: i64,
        up: i64,
        down: i64,
        created_at: DateTime<Utc>,
    }

    impl Ranked for Item {
        fn id(&self) -> i64 {
            self.id
        }
        fn upvotes(&self) -> i64 {
            self.up
        }
        fn downvotes(&self) -> i64 {
            self.down
        }
        fn created_at(&self) -> DateTime<Utc> {
            self.created_at
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn item(id: i64, up: i64, down: i64, hours_ago: i64) -> Item {
        Item {
            id,
            up,
            down,
            created_at: now() - Duration::hours(hours_ago),
        }
    }

    fn ids(items: &[Item]) -> Vec<i64> {
        items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn sort_mode_parses_known_values() {
        assert_eq!("recent".parse::<SortMode>().unwrap(), SortMode::Recent);
        assert_eq!("popular".parse::<SortMode>().unwrap(), SortMode::Popular);
        assert_eq!("trending".parse::<SortMode>().unwrap(), SortMode::Trending);
        assert_eq!(
            "controversial".parse::<SortMode>().unwrap(),
            SortMode::Controversial
        );
        assert!(matches!(
            "hot".parse::<SortMode>(),
            Err(RequestError::Validation(_))
        ));
    }

    #[test]
    fn recent_orders_newest_first() {
        let ranked = rank_prompts(
            vec![item(1, 0, 0, 10), item(2, 0, 0, 1), item(3, 0, 0, 5)],
            SortMode::Recent,
            now(),
        );
        assert_eq!(ids(&ranked), vec![2, 3, 1]);
    }

    #[test]
    fn popular_orders_by_net_votes() {
        let ranked = rank_prompts(
            vec![item(1, 3, 2, 1), item(2, 10, 1, 100), item(3, 4, 0, 50)],
            SortMode::Popular,
            now(),
        );
        assert_eq!(ids(&ranked), vec![2, 3, 1]);
    }

    #[test]
    fn trending_prefers_younger_prompts_with_equal_votes() {
        let fresh = item(1, 5, 1, 1);
        let stale = item(2, 5, 1, 48);
        assert!(trending_score(&fresh, now()) > trending_score(&stale, now()));

        let ranked = rank_prompts(vec![stale, fresh], SortMode::Trending, now());
        assert_eq!(ids(&ranked), vec![1, 2]);
    }

    #[test]
    fn trending_uses_the_documented_decay() {
        let score = trending_score(&item(1, 6, 2, 2), now());
        let expected = 4.0 / 4.0_f64.powf(1.8);
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn trending_treats_future_timestamps_as_brand_new() {
        let future = item(1, 2, 0, -3);
        let expected = 2.0 / 2.0_f64.powf(1.8);
        assert!((trending_score(&future, now()) - expected).abs() < 1e-9);
    }

    #[test]
    fn controversial_scores_contested_engagement() {
        assert_eq!(controversial_score(&item(1, 10, 0, 0)), 0.0);
        assert_eq!(controversial_score(&item(2, 5, 5, 0)), 10.0);
        assert_eq!(controversial_score(&item(3, 0, 7, 0)), 0.0);

        let ranked = rank_prompts(
            vec![item(1, 10, 0, 0), item(2, 5, 5, 0)],
            SortMode::Controversial,
            now(),
        );
        assert_eq!(ids(&ranked), vec![2, 1]);
    }

    #[test]
    fn ties_fall_back_to_newest_then_highest_id() {
        let ranked = rank_prompts(
            vec![item(1, 1, 0, 3), item(3, 1, 0, 3), item(2, 1, 0, 1)],
            SortMode::Popular,
            now(),
        );
        assert_eq!(ids(&ranked), vec![2, 3, 1]);
    }
}
