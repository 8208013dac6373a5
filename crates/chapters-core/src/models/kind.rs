use serde::{Deserialize, Serialize};

/// The two record sets the catalog keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Books,
    Authors,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::Books, EntityKind::Authors];

    pub fn table(&self) -> &'static str {
        match self {
            Self::Books => "books",
            Self::Authors => "authors",
        }
    }

    /// Name of the bundled asset holding this kind's snapshot.
    pub fn asset_name(&self) -> &'static str {
        match self {
            Self::Books => "books.json",
            Self::Authors => "authors.json",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "books" => Ok(Self::Books),
            "authors" => Ok(Self::Authors),
            _ => Err(format!("Invalid EntityKind: {s}")),
        }
    }
}

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Remote,
    Bundled,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Bundled => write!(f, "bundled"),
        }
    }
}
