//! Plain-text rendering of sessions, exercises and programs.

use chrono::{DateTime, Duration, Utc};
use ironlog_core::{
    display_groups, Exercise, ExerciseSet, Program, SessionExercise, SessionState,
    SessionSummary, Technique, TrainingSession, TrainingStats,
};
use std::fmt;

/// `100x5`, `BWx12`, or `-` for a set not performed
pub fn set(set: &ExerciseSet) -> String {
    if set.is_sentinel() {
        "-".to_string()
    } else if set.bodyweight {
        format!("BWx{}", set.reps)
    } else {
        format!("{}x{}", weight(set.weight), set.reps)
    }
}

fn weight(w: f64) -> String {
    if w.fract() == 0.0 {
        format!("{:.0}", w)
    } else {
        format!("{}", w)
    }
}

fn duration(d: Duration) -> String {
    let minutes = d.num_minutes().max(0);
    format!("{}h{:02}m", minutes / 60, minutes % 60)
}

fn day(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

fn week_label(week: Option<u32>) -> String {
    week.map(|w| format!(" (week {})", w)).unwrap_or_default()
}

/// The session in progress, superset members listed together
pub fn session(state: &SessionState, now: DateTime<Utc>) -> impl fmt::Display + '_ {
    SessionView { state, now }
}

struct SessionView<'a> {
    state: &'a SessionState,
    now: DateTime<Utc>,
}

impl fmt::Display for SessionView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state;
        writeln!(
            f,
            "\n{} / {}{}  [{}]",
            state.program_name,
            state.block_name,
            week_label(state.week),
            duration(state.elapsed(self.now))
        )?;
        if !state.block_description.is_empty() {
            writeln!(f, "{}", state.block_description)?;
        }

        for group in display_groups(state.exercises.iter().map(|e| &e.technique)) {
            if let Some(id) = group.superset {
                writeln!(f, "\n── Superset {} ──", id)?;
            }
            for idx in group.indices {
                exercise_block(f, idx + 1, &state.exercises[idx])?;
            }
        }
        Ok(())
    }
}

fn exercise_block(f: &mut fmt::Formatter<'_>, number: usize, entry: &SessionExercise) -> fmt::Result {
    write!(f, "\n{}. {}", number, entry.exercise.name)?;
    match entry.technique {
        Technique::None | Technique::Superset { .. } => {}
        ref other => write!(f, "  [{}]", other)?,
    }
    writeln!(f, "  ({}/{} sets)", entry.performed_sets(), entry.sets.len())?;

    if !entry.program_notes.is_empty() {
        writeln!(f, "   Plan: {}", entry.program_notes)?;
    }
    if !entry.options.is_empty() {
        writeln!(f, "   Variations: {}", entry.options.join(", "))?;
    }

    for (i, current) in entry.sets.iter().enumerate() {
        let mut target = Vec::new();
        if let Some(reps) = entry.target_reps.get(i).filter(|r| !r.is_empty()) {
            target.push(format!("{} reps", reps));
        }
        if let Some(rpe) = entry.target_rpe.get(i) {
            target.push(format!("@{}", rpe));
        }
        if let Some(percent) = entry.target_rm_percent.get(i) {
            match entry.target_weight(i) {
                Some(w) => target.push(format!("{}% ({})", percent, weight(w.round()))),
                None => target.push(format!("{}%", percent)),
            }
        }

        let previous = entry
            .previous_sets
            .get(i)
            .map(set)
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            f,
            "   {:>2}  {:<20} last {:<8} now {}",
            i + 1,
            target.join(" "),
            previous,
            set(current)
        )?;
    }

    if !entry.session_notes.is_empty() {
        writeln!(f, "   Note: {}", entry.session_notes)?;
    }
    Ok(())
}

/// A committed session
pub fn training_session(session: &TrainingSession) -> impl fmt::Display + '_ {
    Logged(session)
}

struct Logged<'a>(&'a TrainingSession);

impl fmt::Display for Logged<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.0;
        writeln!(
            f,
            "\n{} / {}{}  {}",
            session.program_name,
            session.block_name,
            week_label(session.week),
            day(&session.start_time)
        )?;
        if let Some(d) = session.duration() {
            writeln!(f, "Duration: {}", duration(d))?;
        }
        writeln!(f, "Volume: {}", weight(session.total_volume().round()))?;

        for (i, logged) in session.exercises.iter().enumerate() {
            let performed: Vec<String> = logged
                .sets
                .iter()
                .filter(|s| !s.is_sentinel())
                .map(set)
                .collect();
            let sets = if performed.is_empty() {
                "-".to_string()
            } else {
                performed.join(", ")
            };
            writeln!(f, "{}. {}: {}", i + 1, logged.exercise.name, sets)?;
            if !logged.notes.is_empty() {
                writeln!(f, "   Note: {}", logged.notes)?;
            }
        }
        Ok(())
    }
}

/// Exercise detail with history-derived stats
pub fn exercise(exercise: &Exercise) -> impl fmt::Display + '_ {
    ExerciseDetail(exercise)
}

struct ExerciseDetail<'a>(&'a Exercise);

impl fmt::Display for ExerciseDetail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exercise = self.0;
        writeln!(f, "{} ({})", exercise.name, exercise.primary_muscle)?;
        if !exercise.description.is_empty() {
            writeln!(f, "  {}", exercise.description)?;
        }
        match &exercise.best_set {
            Some(best) => writeln!(
                f,
                "  Estimated 1RM: {:.1}  (best set {} on {})",
                exercise.estimated_one_rm,
                set(best),
                day(&best.timestamp)
            )?,
            None => writeln!(f, "  Estimated 1RM: -")?,
        }
        match &exercise.last_performed {
            Some(t) => writeln!(f, "  Last performed: {}", day(t)),
            None => writeln!(f, "  Last performed: never"),
        }
    }
}

pub fn exercise_line(exercise: &Exercise) -> String {
    if exercise.estimated_one_rm > 0.0 {
        format!(
            "{:<28} {:<11} 1RM {:.1}",
            exercise.name, exercise.primary_muscle, exercise.estimated_one_rm
        )
    } else {
        format!("{:<28} {}", exercise.name, exercise.primary_muscle)
    }
}

pub fn program(program: &Program) -> impl fmt::Display + '_ {
    ProgramView(program)
}

struct ProgramView<'a>(&'a Program);

impl fmt::Display for ProgramView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.0;
        writeln!(f, "{}", program.name)?;
        if !program.description.is_empty() {
            writeln!(f, "{}", program.description)?;
        }
        for block in &program.blocks {
            writeln!(f, "\n{}{}", block.name, week_label(block.week))?;
            for planned in &block.exercises {
                write!(f, "  {} {}x", planned.exercise_name, planned.sets)?;
                if !planned.reps.is_empty() {
                    write!(f, "{}", planned.reps.join("/"))?;
                }
                if let Some(tag) = planned.technique {
                    write!(f, "  [{}]", tag)?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

pub fn history(sessions: &[SessionSummary]) -> impl fmt::Display + '_ {
    History(sessions)
}

struct History<'a>(&'a [SessionSummary]);

impl fmt::Display for History<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in self.0 {
            let status = match s.end_time {
                Some(end) => duration(end - s.start_time),
                None => "open".to_string(),
            };
            writeln!(
                f,
                "{}  {} / {}{}  {} exercises, {} sets  {}  {}",
                day(&s.start_time),
                s.program_name,
                s.block_name,
                week_label(s.week),
                s.exercise_count,
                s.set_count,
                status,
                s.id
            )?;
        }
        Ok(())
    }
}

/// Lifetime totals and this week's sets per muscle
pub fn stats(stats: &TrainingStats) -> impl fmt::Display + '_ {
    StatsView(stats)
}

struct StatsView<'a>(&'a TrainingStats);

impl fmt::Display for StatsView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.0;
        writeln!(f, "Total volume:     {}", weight(stats.total_volume.round()))?;
        writeln!(f, "Sessions:         {}", stats.session_count)?;
        writeln!(f, "Time in the gym:  {}", duration(stats.gym_time))?;
        let plural = if stats.week_streak == 1 { "" } else { "s" };
        writeln!(f, "Week streak:      {} week{}", stats.week_streak, plural)?;

        writeln!(f, "\nSets per muscle this week:")?;
        if stats.sets_this_week.is_empty() {
            writeln!(f, "  none yet")?;
        }
        for (muscle, count) in &stats.sets_this_week {
            writeln!(f, "  {:<12} {}", muscle.as_str(), count)?;
        }
        Ok(())
    }
}
