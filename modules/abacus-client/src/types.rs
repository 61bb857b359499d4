use serde::{Deserialize, Serialize};

/// Request body for the execute_agent endpoint.
///
/// The classification agent takes its input as a keyword argument;
/// positional `arguments` are always null for this deployment.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteAgentRequest {
    pub arguments: Option<serde_json::Value>,
    #[serde(rename = "keywordArguments")]
    pub keyword_arguments: KeywordArguments,
}

/// Keyword arguments understood by the classification agent.
#[derive(Debug, Clone, Serialize)]
pub struct KeywordArguments {
    pub page_content: String,
}

impl ExecuteAgentRequest {
    /// Wrap raw page text in the fixed payload shape the agent expects.
    pub fn for_page_content(text: &str) -> Self {
        Self {
            arguments: None,
            keyword_arguments: KeywordArguments {
                page_content: text.to_string(),
            },
        }
    }
}

/// Outer shape of a successful execute_agent response.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteAgentResponse {
    pub result: AgentResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentResult {
    pub segments: Vec<AgentSegment>,
}

/// One agent output segment. `segment` is a JSON-encoded string that has to
/// be parsed a second time to reach the labels.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSegment {
    pub segment: String,
}

/// Inner payload of the first segment. A missing or null list is the valid
/// "no labels" outcome, not an error.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxonomyLabels {
    #[serde(rename = "taxonomy_labels")]
    pub labels: Option<Vec<String>>,
}
