use crate::ir::{KNOWN_CATEGORIES, Locale};
use serde_json::{Value, json};

/// Purpose of each category, in `KNOWN_CATEGORIES` order.
const CATEGORY_AIMS: [&str; 8] = [
    "多義語や同名語の意味・文脈を切り分ける。",
    "潜在課題・目的に対応した観点を広げる。",
    "次に聞くべき具体的フォローアップを提示。",
    "賛成/反対の根拠・エビデンス・反証を探索。",
    "関連する固有名詞や属性を列挙。",
    "高関連のトピック/文書タイプ/資料を推定。",
    "現在の作業文脈やタスク進行を踏まえたクエリ。",
    "セグメント/地域/時間/履歴で差が出る切り口。",
];

/// Instruction prompt asking for a JSON object keyed by the eight fixed
/// Japanese category names. The output language follows `locale`.
pub fn build_prompt(seed: &str, locale: Locale, max_per_category: usize) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "あなたは検索クエリ設計の専門家です。以下の8分類に基づき、シードから多様で重複のない**サブクエリ**を生成してください。出力は**JSONのみ**（マークダウンや説明文は禁止）。言語は{}。\n\n",
        locale.language_name()
    ));

    prompt.push_str("【カテゴリ（固定の日本語キー）と狙い】\n");
    for (idx, (name, aim)) in KNOWN_CATEGORIES.iter().zip(CATEGORY_AIMS).enumerate() {
        prompt.push_str(&format!("{}) {name}: {aim}\n", idx + 1));
    }

    prompt.push_str("\n【生成ルール】\n");
    prompt.push_str(&format!("- 各カテゴリ 最大 {max_per_category} 件。\n"));
    prompt.push_str("- 各サブクエリは query fan-out で派生した検索キーワードとして短い名詞句または命令形で表現し、文や説明は書かない。\n");
    prompt.push_str("- 1クエリ 6〜16語 / 12〜40字 程度で**具体・可動的**に（名詞列よりも動作/条件を入れる）。\n");
    prompt.push_str("- 重複・言い換えを避け、多様な意図（how/compare/risk/cost/policy/benchmark/地域/時期）をカバー。\n");
    prompt.push_str("- 記号は最小限、引用符/絵文字/不要な句読点は使用禁止。\n");
    prompt.push_str("- シードの語をそのまま繰り返しすぎない（同義語・上位下位語を混ぜる）。\n");

    prompt.push_str("\n【出力形式（JSONのみ）】\n");
    let categories: Vec<String> = KNOWN_CATEGORIES
        .iter()
        .map(|name| format!("    \"{name}\": [\"...\"]"))
        .collect();
    prompt.push_str(&format!(
        "{{\n  \"seed\": \"{seed}\",\n  \"locale\": \"{locale}\",\n  \"categories\": {{\n{}\n  }}\n}}\n",
        categories.join(",\n")
    ));
    prompt.push_str("※各カテゴリ配列の要素は query fan-out で派生した検索キーワードのみ。\n\n");
    prompt.push_str(&format!("シード: \"{seed}\""));
    prompt
}

/// JSON schema of the expected answer. Not sent with the request; the
/// model is steered by the prompt alone.
pub fn categories_schema() -> Value {
    let mut properties = serde_json::Map::new();
    for name in KNOWN_CATEGORIES {
        properties.insert(
            name.to_string(),
            json!({ "type": "array", "items": { "type": "string" } }),
        );
    }
    json!({
        "type": "object",
        "properties": {
            "seed": { "type": "string" },
            "locale": { "type": "string" },
            "categories": {
                "type": "object",
                "properties": properties,
                "required": KNOWN_CATEGORIES,
                "additionalProperties": false,
            },
        },
        "required": ["seed", "locale", "categories"],
        "additionalProperties": false,
    })
}
