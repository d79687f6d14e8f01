use serde::{Deserialize, Serialize};

/// The objective mode of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    TurfWar,
    Rainmaker,
    SplatZones,
    TowerControl,
    ClamBlitz,
    TricolorTurfWar,
}

impl Rule {
    pub fn value(&self) -> &'static str {
        match self {
            Rule::TurfWar => "ナワバリバトル",
            Rule::Rainmaker => "ガチホコ",
            Rule::SplatZones => "ガチエリア",
            Rule::TowerControl => "ガチヤグラ",
            Rule::ClamBlitz => "ガチアサリ",
            Rule::TricolorTurfWar => "トリカラバトル",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.value() == value)
    }

    pub const ALL: [Rule; 6] = [
        Rule::TurfWar,
        Rule::Rainmaker,
        Rule::SplatZones,
        Rule::TowerControl,
        Rule::ClamBlitz,
        Rule::TricolorTurfWar,
    ];
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}
