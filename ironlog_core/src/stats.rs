//! Lifetime training totals.
//!
//! Everything here is derived from committed sessions; the session in
//! progress does not count until it is ended.

use crate::{db, Database, Muscle, Result};
use chrono::{DateTime, Datelike, Duration, IsoWeek, NaiveTime, Utc};
use std::collections::{BTreeMap, HashSet};

#[derive(Clone, Debug, PartialEq)]
pub struct TrainingStats {
    /// Sum of weight x reps over every loaded set
    pub total_volume: f64,
    pub session_count: usize,
    /// Time between start and end, summed over sessions
    pub gym_time: Duration,
    /// Consecutive ISO weeks with a session, counting back from this week
    pub week_streak: u32,
    /// Performed sets per primary muscle in the current ISO week
    pub sets_this_week: BTreeMap<Muscle, usize>,
}

/// Totals as of `now`
pub fn training_stats(db: &Database, now: DateTime<Utc>) -> Result<TrainingStats> {
    let times = db::session_times(db.conn())?;

    let gym_time = times
        .iter()
        .filter_map(|(start, end)| end.map(|end| end - *start))
        .fold(Duration::zero(), |total, d| total + d);

    let weeks: HashSet<IsoWeek> = times.iter().map(|(start, _)| start.iso_week()).collect();

    let week_start = start_of_week(now);
    let mut sets_this_week = BTreeMap::new();
    for muscle in
        db::performed_set_muscles(db.conn(), &week_start, &(week_start + Duration::weeks(1)))?
    {
        *sets_this_week.entry(muscle).or_insert(0) += 1;
    }

    let stats = TrainingStats {
        total_volume: db::lifted_volume(db.conn())?,
        session_count: times.len(),
        gym_time,
        week_streak: week_streak(&weeks, now),
        sets_this_week,
    };
    tracing::debug!(
        "Stats over {} sessions, streak {}",
        stats.session_count,
        stats.week_streak
    );
    Ok(stats)
}

/// Monday 00:00 UTC of the ISO week containing `t`
fn start_of_week(t: DateTime<Utc>) -> DateTime<Utc> {
    let monday = t.date_naive() - Duration::days(i64::from(t.weekday().num_days_from_monday()));
    monday.and_time(NaiveTime::MIN).and_utc()
}

fn week_streak(weeks: &HashSet<IsoWeek>, now: DateTime<Utc>) -> u32 {
    let mut streak = 0;
    let mut cursor = now;
    while weeks.contains(&cursor.iso_week()) {
        streak += 1;
        cursor -= Duration::weeks(1);
    }
    streak
}
