use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The subset of a SerpApi response handed downstream. Entries are kept as
/// opaque JSON; only the top-level keys are selected.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchRecord {
    pub organic_results: Vec<Value>,
    pub knowledge_graph: Value,
    pub related_questions: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SerpResponse {
    #[serde(default)]
    pub organic_results: Vec<Value>,
    pub knowledge_graph: Option<Value>,
    #[serde(default)]
    pub related_questions: Vec<Value>,
    pub error: Option<String>,
}

impl From<SerpResponse> for SearchRecord {
    fn from(response: SerpResponse) -> Self {
        Self {
            organic_results: response.organic_results,
            knowledge_graph: response
                .knowledge_graph
                .unwrap_or_else(|| Value::Object(Map::new())),
            related_questions: response.related_questions,
        }
    }
}

/// Title and link of an organic result, when both are present.
pub fn organic_link(result: &Value) -> Option<(&str, &str)> {
    let title = result.get("title")?.as_str()?;
    let link = result.get("link")?.as_str()?;
    Some((title, link))
}

/// The question text of a related-questions entry.
pub fn related_question(entry: &Value) -> Option<&str> {
    entry.get("question")?.as_str()
}
