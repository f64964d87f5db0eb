use serde::{Deserialize, Serialize};

/// One advice thread as the server represents it. `advisorys_details` is
/// ordered by `line_number` ascending and matches server insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advice {
    pub id: i64,
    pub description: String,
    #[serde(default)]
    pub advisorys_details: Vec<AdviceDetail>,
}

/// One question/answer turn within a thread. Append-only: never edited or
/// reordered after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceDetail {
    pub id: i64,
    pub line_number: i32,
    pub question: String,
    pub answer: String,
    /// Name of the generative backend that produced the answer.
    #[serde(default)]
    pub model: String,
}

/// Which generative backend answers the next message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiKind {
    Openai,
    #[default]
    Anthropic,
}

impl std::str::FromStr for ApiKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ApiKind::Openai),
            "anthropic" => Ok(ApiKind::Anthropic),
            other => Err(format!("unknown api type '{other}'")),
        }
    }
}

impl std::fmt::Display for ApiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiKind::Openai => write!(f, "openai"),
            ApiKind::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// Body shape shared by advice create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceRequest {
    pub user_professional_id: i64,
    pub ask: String,
    pub api_type: ApiKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Display view of a thread with the originating assignment stamped on.
/// The canonical `Advice` wire type is never widened with these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceView {
    pub advice: Advice,
    pub asesor_id: i64,
    pub asesor_name: String,
}

impl AdviceView {
    pub fn id(&self) -> i64 {
        self.advice.id
    }
}
