use serde::{Deserialize, Serialize};

/// Name tasks fall back to when their category record is gone. Never stored
/// as a Category itself.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Pseudo-category meaning "no category filter". Exists only as a filter
/// option; creation under this name is rejected.
pub const ALL: &str = "all";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    /// Trimmed, lowercase, case-insensitively unique among stored records.
    pub name: String,
    /// Display color token, e.g. `#ff4444`.
    pub color: String,
}

impl Category {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

/// Canonical form used for storage and comparison.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn is_reserved(name: &str) -> bool {
    name == UNCATEGORIZED || name == ALL
}

/// Serde default for a task's category field.
pub fn sentinel() -> String {
    UNCATEGORIZED.to_string()
}

/// Categories seeded on first run.
pub fn seed() -> Vec<Category> {
    vec![
        Category::new("work", "#ff4444"),
        Category::new("personal", "#4444ff"),
        Category::new("shopping", "#44ff44"),
    ]
}

#[cfg(test)]
mod tests {
    use super::{is_reserved, normalize_name, seed};

    #[test]
    fn normalization_trims_and_lowercases() {
        assert_eq!(normalize_name("  Work "), "work");
        assert_eq!(normalize_name("ERRANDS"), "errands");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn reserved_names_are_flagged() {
        assert!(is_reserved("all"));
        assert!(is_reserved("uncategorized"));
        assert!(!is_reserved("work"));
    }

    #[test]
    fn seed_contains_the_three_defaults() {
        let names: Vec<_> = seed().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["work", "personal", "shopping"]);
    }
}
