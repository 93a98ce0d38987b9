//! Advanced training techniques.
//!
//! A program exercise may carry a technique tag. The tag decides two things:
//! how the exercise is grouped for display during a session, and how its
//! sets are transformed right before the session is committed.

use crate::{Error, ExerciseSet, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Technique name as written in program definitions and stored in the database
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TechniqueTag {
    Superset,
    Myoreps,
    Hell,
    Drop,
}

impl TechniqueTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TechniqueTag::Superset => "superset",
            TechniqueTag::Myoreps => "myoreps",
            TechniqueTag::Hell => "hell",
            TechniqueTag::Drop => "drop",
        }
    }
}

impl fmt::Display for TechniqueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TechniqueTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "superset" => Ok(TechniqueTag::Superset),
            "myoreps" => Ok(TechniqueTag::Myoreps),
            "hell" => Ok(TechniqueTag::Hell),
            "drop" => Ok(TechniqueTag::Drop),
            other => Err(Error::Validation(format!("unknown technique '{}'", other))),
        }
    }
}

impl TryFrom<String> for TechniqueTag {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Resolved technique with its parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Technique {
    #[default]
    None,
    /// Exercises sharing `group` are performed back to back
    Superset { group: i64 },
    /// Activation set plus mini-sets; never counts toward 1RM records
    Myoreps,
    /// Sets continue until reps fall below `threshold`
    Hell { threshold: u32 },
    Drop,
}

impl Technique {
    pub fn resolve(tag: Option<TechniqueTag>, group: i64, hell_min_reps: u32) -> Self {
        match tag {
            None => Technique::None,
            Some(TechniqueTag::Superset) => Technique::Superset { group },
            Some(TechniqueTag::Myoreps) => Technique::Myoreps,
            Some(TechniqueTag::Hell) => Technique::Hell {
                threshold: hell_min_reps,
            },
            Some(TechniqueTag::Drop) => Technique::Drop,
        }
    }

    pub fn tag(&self) -> Option<TechniqueTag> {
        match self {
            Technique::None => None,
            Technique::Superset { .. } => Some(TechniqueTag::Superset),
            Technique::Myoreps => Some(TechniqueTag::Myoreps),
            Technique::Hell { .. } => Some(TechniqueTag::Hell),
            Technique::Drop => Some(TechniqueTag::Drop),
        }
    }

    pub fn superset_group(&self) -> Option<i64> {
        match self {
            Technique::Superset { group } => Some(*group),
            _ => None,
        }
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Technique::None => Ok(()),
            Technique::Superset { group } => write!(f, "superset {}", group),
            Technique::Myoreps => f.write_str("myoreps"),
            Technique::Hell { threshold } => write!(f, "hell (min {} reps)", threshold),
            Technique::Drop => f.write_str("drop set"),
        }
    }
}

/// Transform the performed sets of one exercise before they are committed.
///
/// - myoreps: every set is kept and excluded from 1RM records
/// - hell: sets are kept up to (not including) the first one below the
///   threshold; kept sets are excluded from 1RM records
/// - everything else passes through untouched
pub fn apply(technique: &Technique, sets: Vec<ExerciseSet>) -> Vec<ExerciseSet> {
    match technique {
        Technique::None | Technique::Superset { .. } | Technique::Drop => sets,
        Technique::Myoreps => sets.into_iter().map(exclude_from_records).collect(),
        Technique::Hell { threshold } => {
            let before = sets.len();
            let kept: Vec<_> = sets
                .into_iter()
                .take_while(|s| s.reps >= *threshold)
                .map(exclude_from_records)
                .collect();
            if kept.len() < before {
                tracing::debug!(
                    "Hell sets: keeping {} of {} sets (threshold {})",
                    kept.len(),
                    before,
                    threshold
                );
            }
            kept
        }
    }
}

fn exclude_from_records(mut set: ExerciseSet) -> ExerciseSet {
    set.ignore_for_one_rm = true;
    set
}

/// A display unit: a single exercise, or every member of one superset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExerciseGroup {
    pub superset: Option<i64>,
    /// 0-based positions in the session's exercise list
    pub indices: Vec<usize>,
}

/// Group exercises for display. Superset members are gathered into one unit
/// placed where the first member of that superset appears.
pub fn display_groups<'a, I>(techniques: I) -> Vec<ExerciseGroup>
where
    I: IntoIterator<Item = &'a Technique>,
{
    let mut groups: Vec<ExerciseGroup> = Vec::new();
    let mut slot_of_superset: HashMap<i64, usize> = HashMap::new();

    for (idx, technique) in techniques.into_iter().enumerate() {
        match technique.superset_group() {
            Some(group) => match slot_of_superset.get(&group) {
                Some(&slot) => groups[slot].indices.push(idx),
                None => {
                    slot_of_superset.insert(group, groups.len());
                    groups.push(ExerciseGroup {
                        superset: Some(group),
                        indices: vec![idx],
                    });
                }
            },
            None => groups.push(ExerciseGroup {
                superset: None,
                indices: vec![idx],
            }),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sets(reps: &[u32]) -> Vec<ExerciseSet> {
        reps.iter()
            .map(|r| ExerciseSet::performed(60.0, *r, false))
            .collect()
    }

    #[test]
    fn test_tag_parsing() {
        assert_eq!("Hell".parse::<TechniqueTag>().unwrap(), TechniqueTag::Hell);
        assert_eq!(
            "MYOREPS".parse::<TechniqueTag>().unwrap(),
            TechniqueTag::Myoreps
        );
        assert!("cluster".parse::<TechniqueTag>().is_err());
    }

    #[test]
    fn test_tag_deserializes_case_insensitively() {
        #[derive(Deserialize)]
        struct Entry {
            technique: TechniqueTag,
        }
        let entry: Entry = toml::from_str("technique = \"SuperSet\"").unwrap();
        assert_eq!(entry.technique, TechniqueTag::Superset);
    }

    #[test]
    fn test_resolve_uses_hell_threshold() {
        let t = Technique::resolve(Some(TechniqueTag::Hell), 0, 6);
        assert_eq!(t, Technique::Hell { threshold: 6 });
        assert_eq!(t.tag(), Some(TechniqueTag::Hell));
        assert_eq!(Technique::resolve(None, 3, 6), Technique::None);
    }

    #[test]
    fn test_myoreps_flags_every_set() {
        let out = apply(&Technique::Myoreps, sets(&[15, 5, 5]));
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|s| s.ignore_for_one_rm));
    }

    #[test]
    fn test_hell_stops_at_first_set_below_threshold() {
        let out = apply(&Technique::Hell { threshold: 5 }, sets(&[8, 6, 4, 7]));
        let reps: Vec<u32> = out.iter().map(|s| s.reps).collect();
        assert_eq!(reps, vec![8, 6]);
        assert!(out.iter().all(|s| s.ignore_for_one_rm));
    }

    #[test]
    fn test_plain_and_drop_untouched() {
        let out = apply(&Technique::None, sets(&[5, 5]));
        assert!(out.iter().all(|s| !s.ignore_for_one_rm));

        let out = apply(&Technique::Drop, sets(&[10, 8, 6]));
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|s| !s.ignore_for_one_rm));
    }

    #[test]
    fn test_superset_members_grouped_at_first_position() {
        let techniques = vec![
            Technique::Superset { group: 1 },
            Technique::None,
            Technique::Superset { group: 1 },
            Technique::Superset { group: 2 },
        ];

        let groups = display_groups(&techniques);
        assert_eq!(
            groups,
            vec![
                ExerciseGroup {
                    superset: Some(1),
                    indices: vec![0, 2]
                },
                ExerciseGroup {
                    superset: None,
                    indices: vec![1]
                },
                ExerciseGroup {
                    superset: Some(2),
                    indices: vec![3]
                },
            ]
        );
    }
}
