use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five relations of the profile schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileTable {
    Auth,
    Users,
    Roles,
    Divisions,
    Logs,
}

impl ProfileTable {
    /// Parents before children, the order tables are created in.
    pub const ALL: [ProfileTable; 5] = [
        ProfileTable::Auth,
        ProfileTable::Users,
        ProfileTable::Roles,
        ProfileTable::Divisions,
        ProfileTable::Logs,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            ProfileTable::Auth => "auth",
            ProfileTable::Users => "users",
            ProfileTable::Roles => "roles",
            ProfileTable::Divisions => "divisions",
            ProfileTable::Logs => "logs",
        }
    }

    /// Name of the snapshot table taken before cleaning.
    pub fn backup_table_name(self) -> String {
        format!("{}_backup", self.table_name())
    }
}

impl fmt::Display for ProfileTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// How earliest-wins deduplication orders rows that share the same `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// The row with the smaller primary key wins.
    #[default]
    LowestId,
    /// The row with the larger primary key wins.
    HighestId,
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "lowest-id" => Ok(TieBreak::LowestId),
            "highest-id" => Ok(TieBreak::HighestId),
            other => Err(format!(
                "unknown tie-break '{}', expected 'lowest-id' or 'highest-id'",
                other
            )),
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TieBreak::LowestId => f.write_str("lowest-id"),
            TieBreak::HighestId => f.write_str("highest-id"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_table_names() {
        let names: Vec<String> = ProfileTable::ALL
            .iter()
            .map(|t| t.backup_table_name())
            .collect();
        assert_eq!(
            names,
            vec!["auth_backup", "users_backup", "roles_backup", "divisions_backup", "logs_backup"]
        );
    }

    #[test]
    fn test_tie_break_parsing() {
        assert_eq!("lowest-id".parse::<TieBreak>(), Ok(TieBreak::LowestId));
        assert_eq!("HIGHEST_ID".parse::<TieBreak>(), Ok(TieBreak::HighestId));
        assert!("newest".parse::<TieBreak>().is_err());
        assert_eq!(TieBreak::default(), TieBreak::LowestId);
    }
}
