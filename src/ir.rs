use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static JAPANESE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{3040}-\u{30FF}\u{3400}-\u{4DBF}\u{4E00}-\u{9FFF}]").unwrap());

/// The eight fan-out categories, in the order the prompt asks for them.
pub const KNOWN_CATEGORIES: [&str; 8] = [
    "曖昧さの解消",
    "潜在ニーズの顕在化",
    "詳細深掘りの誘導（次の質問提案）",
    "主張の賛否エビデンス収集",
    "エンティティ取得（人・場所・組織など）",
    "関連性の高い文書予測",
    "セッション文脈の維持（最近の行動・状態を反映）",
    "ユーザー個別化（過去検索や位置・時間などの信号を活用）",
];

/// Category used when the model answer could not be parsed.
pub const RAW_CATEGORY: &str = "Raw";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Ja,
    En,
}

impl Locale {
    pub fn detect(text: &str) -> Self {
        if JAPANESE_RE.is_match(text) {
            Self::Ja
        } else {
            Self::En
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ja => "ja",
            Self::En => "en",
        }
    }

    /// Language name as written in the prompt.
    pub fn language_name(&self) -> &'static str {
        match self {
            Self::Ja => "日本語",
            Self::En => "English",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "ja" => Ok(Self::Ja),
            "en" => Ok(Self::En),
            other => Err(format!("unknown locale '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubqueryRow {
    pub seed: String,
    pub locale: Locale,
    pub category: String,
    pub subquery: String,
}

impl SubqueryRow {
    pub fn new(
        seed: impl Into<String>,
        locale: Locale,
        category: impl Into<String>,
        subquery: impl Into<String>,
    ) -> Self {
        Self {
            seed: seed.into(),
            locale,
            category: category.into(),
            subquery: subquery.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGroup {
    pub name: String,
    pub subqueries: Vec<String>,
}

/// Generator output before it is flattened into rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanoutResult {
    pub seed: String,
    pub locale: Locale,
    pub categories: Vec<CategoryGroup>,
}

impl FanoutResult {
    pub fn new(seed: impl Into<String>, locale: Locale) -> Self {
        Self {
            seed: seed.into(),
            locale,
            categories: Vec::new(),
        }
    }

    pub fn push_category(&mut self, name: impl Into<String>, subqueries: Vec<String>) {
        self.categories.push(CategoryGroup {
            name: name.into(),
            subqueries,
        });
    }

    pub fn total_subqueries(&self) -> usize {
        self.categories.iter().map(|c| c.subqueries.len()).sum()
    }

    pub fn rows(&self) -> Vec<SubqueryRow> {
        let mut rows = Vec::with_capacity(self.total_subqueries());
        for category in &self.categories {
            for subquery in &category.subqueries {
                rows.push(SubqueryRow::new(
                    self.seed.clone(),
                    self.locale,
                    category.name.clone(),
                    subquery.clone(),
                ));
            }
        }
        rows
    }

    /// JSON shape printed by `fanout generate --json`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut categories = serde_json::Map::new();
        for category in &self.categories {
            categories.insert(
                category.name.clone(),
                serde_json::Value::from(category.subqueries.clone()),
            );
        }
        serde_json::json!({
            "seed": self.seed,
            "locale": self.locale,
            "categories": categories,
        })
    }
}
