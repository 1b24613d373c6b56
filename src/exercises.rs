//! Exercise catalog - canonical lifts grouped by muscle group

use serde::{Deserialize, Serialize};

/// Muscle groups the catalog is organised by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MuscleGroup {
    Arms,
    Chest,
    Back,
    Shoulders,
    Legs,
    Core,
}

impl MuscleGroup {
    pub fn name(&self) -> &'static str {
        match self {
            MuscleGroup::Arms => "Arms",
            MuscleGroup::Chest => "Chest",
            MuscleGroup::Back => "Back",
            MuscleGroup::Shoulders => "Shoulders",
            MuscleGroup::Legs => "Legs",
            MuscleGroup::Core => "Core",
        }
    }

    /// All muscle groups for iteration
    pub fn all() -> &'static [MuscleGroup] {
        &[
            MuscleGroup::Arms,
            MuscleGroup::Chest,
            MuscleGroup::Back,
            MuscleGroup::Shoulders,
            MuscleGroup::Legs,
            MuscleGroup::Core,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Exercise {
    pub name: &'static str,
    pub group: MuscleGroup,
    /// Loaded lifts get 1RM forecasts; holds like the plank do not
    pub is_loaded: bool,
}

const fn lift(name: &'static str, group: MuscleGroup) -> Exercise {
    Exercise { name, group, is_loaded: true }
}

pub const CATALOG: &[Exercise] = &[
    lift("Bicep Curl", MuscleGroup::Arms),
    lift("Hammer Curl", MuscleGroup::Arms),
    lift("EZ-Bar Curl", MuscleGroup::Arms),
    lift("Tricep Pushdown", MuscleGroup::Arms),
    lift("Overhead Tricep Extension", MuscleGroup::Arms),
    lift("Bench Press", MuscleGroup::Chest),
    lift("Incline DB Press", MuscleGroup::Chest),
    lift("Chest Fly", MuscleGroup::Chest),
    lift("Lat Pulldown", MuscleGroup::Back),
    lift("Barbell Row", MuscleGroup::Back),
    lift("Seated Row", MuscleGroup::Back),
    lift("Overhead Press", MuscleGroup::Shoulders),
    lift("Lateral Raise", MuscleGroup::Shoulders),
    lift("Rear Delt Fly", MuscleGroup::Shoulders),
    lift("Back Squat", MuscleGroup::Legs),
    lift("Leg Press", MuscleGroup::Legs),
    lift("Romanian Deadlift", MuscleGroup::Legs),
    lift("Leg Extension", MuscleGroup::Legs),
    lift("Cable Crunch", MuscleGroup::Core),
    lift("Hanging Leg Raise", MuscleGroup::Core),
    Exercise { name: "Plank", group: MuscleGroup::Core, is_loaded: false },
];

pub fn exercises_in(group: MuscleGroup) -> impl Iterator<Item = &'static Exercise> {
    CATALOG.iter().filter(move |e| e.group == group)
}

/// Find exercise by name, ignoring case and surrounding whitespace
pub fn find_exercise_by_name(name: &str) -> Option<&'static Exercise> {
    let name = name.trim();
    CATALOG.iter().find(|e| e.name.eq_ignore_ascii_case(name))
}

/// Catalog spelling of a name, or the trimmed input for lifts outside the catalog
pub fn canonical_name(name: &str) -> String {
    find_exercise_by_name(name).map_or_else(|| name.trim().to_string(), |e| e.name.to_string())
}
