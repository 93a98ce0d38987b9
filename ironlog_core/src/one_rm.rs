//! One-rep-max estimation.
//!
//! Uses the Epley formula: `weight * (1 + reps / 30)`.

use crate::ExerciseSet;

/// Estimated 1RM for a single set; 0 when no reps were done.
pub fn estimate(weight: f64, reps: u32) -> f64 {
    if reps == 0 {
        return 0.0;
    }
    weight * (1.0 + f64::from(reps) / 30.0)
}

/// The set with the highest estimated 1RM
///
/// Sets flagged `ignore_for_one_rm` and sets with no estimate are skipped.
/// On equal estimates the most recent set wins.
pub fn best_set<'a, I>(sets: I) -> Option<&'a ExerciseSet>
where
    I: IntoIterator<Item = &'a ExerciseSet>,
{
    sets.into_iter()
        .filter(|s| !s.ignore_for_one_rm && s.estimated_one_rm() > 0.0)
        .fold(None, |best, candidate| match best {
            Some(current) if !beats(candidate, current) => Some(current),
            _ => Some(candidate),
        })
}

fn beats(candidate: &ExerciseSet, current: &ExerciseSet) -> bool {
    let (c, b) = (candidate.estimated_one_rm(), current.estimated_one_rm());
    c > b || (c == b && candidate.timestamp > current.timestamp)
}
