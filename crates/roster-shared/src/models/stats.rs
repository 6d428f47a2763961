use serde::{Deserialize, Serialize};

use super::user::{Role, CLASSES};

/// Value of the class filter that selects users without a class.
pub const NO_CLASS_VALUE: &str = "none";

/// Role counts over the whole directory, independent of any list filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleStats {
    pub total: i64,
    pub admins: i64,
    pub moderators: i64,
    pub users: i64,
}

impl RoleStats {
    pub fn from_counts<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (Role, i64)>,
    {
        rows.into_iter().fold(Self::default(), |mut acc, (role, count)| {
            acc.total += count;
            match role {
                Role::Admin => acc.admins += count,
                Role::Moderator => acc.moderators += count,
                Role::User => acc.users += count,
            }
            acc
        })
    }
}

/// Sidebar entry: a class (or "no class") with its member count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassGroup {
    pub label: String,
    pub value: String,
    pub count: i64,
}

impl ClassGroup {
    /// Builds the sidebar from `(class, count)` rows: "no class" first, then every
    /// known class in order. Classes outside `CLASSES` are not listed.
    pub fn tally<I>(rows: I) -> Vec<ClassGroup>
    where
        I: IntoIterator<Item = (Option<String>, i64)>,
    {
        let rows: Vec<(Option<String>, i64)> = rows.into_iter().collect();
        let count_for = |class: Option<&str>| {
            rows.iter()
                .filter(|(c, _)| c.as_deref() == class)
                .map(|(_, n)| *n)
                .sum::<i64>()
        };

        let mut groups = Vec::with_capacity(CLASSES.len() + 1);
        groups.push(ClassGroup {
            label: "No class".to_string(),
            value: NO_CLASS_VALUE.to_string(),
            count: count_for(None),
        });
        groups.extend(CLASSES.iter().map(|class| ClassGroup {
            label: class.to_string(),
            value: class.to_string(),
            count: count_for(Some(class)),
        }));
        groups
    }
}
