use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of the `ask` endpoint request
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AskRequest {
    /// The user prompt
    pub question: String,

    /// Code attached to the question (always empty for comparisons)
    #[serde(default)]
    pub code: String,

    /// Source identifier the backend routes the prompt to
    pub model: String,

    /// Conversation to append to; comparisons never belong to one
    pub conversation_id: Option<String>,

    /// Ask the backend not to persist the exchange
    #[serde(default)]
    pub no_save: bool,
}

impl AskRequest {
    /// Build the request used for one side of a comparison
    pub fn comparison(question: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            code: String::new(),
            model: model.into(),
            conversation_id: None,
            no_save: true,
        }
    }
}

/// JSON body carried after the `data: ` marker of a streamed frame.
///
/// Fields are kept as raw values so a wrongly-typed field degrades to an
/// unrecognized frame instead of a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub chunk: Option<Value>,

    #[serde(default)]
    pub error: Option<Value>,
}

impl StreamChunk {
    /// Incremental text, if present and non-empty
    pub fn text(&self) -> Option<&str> {
        self.chunk
            .as_ref()
            .and_then(|c| c.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Error message, accepting either `"error": "msg"` or `"error": {"message": "msg"}`.
    ///
    /// Any other shape (`false`, `0`, `""`, arrays, objects without a string
    /// `message`) is not an error report.
    pub fn error_message(&self) -> Option<&str> {
        let message = match self.error.as_ref()? {
            Value::String(s) => s.as_str(),
            Value::Object(map) => map.get("message")?.as_str()?,
            _ => return None,
        };
        (!message.trim().is_empty()).then_some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_comparison_request_shape() {
        let req = AskRequest::comparison("What is Rust?", "gpt-4o");
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(
            value,
            json!({
                "question": "What is Rust?",
                "code": "",
                "model": "gpt-4o",
                "conversation_id": null,
                "no_save": true
            })
        );
    }

    #[test]
    fn test_chunk_text() {
        let chunk: StreamChunk = serde_json::from_str(r#"{"chunk":"Hel"}"#).unwrap();
        assert_eq!(chunk.text(), Some("Hel"));

        let empty: StreamChunk = serde_json::from_str(r#"{"chunk":""}"#).unwrap();
        assert_eq!(empty.text(), None);

        let number: StreamChunk = serde_json::from_str(r#"{"chunk":42}"#).unwrap();
        assert_eq!(number.text(), None);
    }

    #[test]
    fn test_error_message_shapes() {
        let plain: StreamChunk = serde_json::from_str(r#"{"error":"quota"}"#).unwrap();
        assert_eq!(plain.error_message().as_deref(), Some("quota"));

        let nested: StreamChunk =
            serde_json::from_str(r#"{"error":{"message":"overloaded","code":529}}"#).unwrap();
        assert_eq!(nested.error_message().as_deref(), Some("overloaded"));

        let null: StreamChunk = serde_json::from_str(r#"{"error":null}"#).unwrap();
        assert!(null.error_message().is_none());
    }

    #[test]
    fn test_non_message_error_values_are_ignored() {
        for body in [
            r#"{"chunk":"Hi","error":false}"#,
            r#"{"chunk":"Hi","error":""}"#,
            r#"{"chunk":"Hi","error":0}"#,
            r#"{"chunk":"Hi","error":[]}"#,
            r#"{"chunk":"Hi","error":{"code":500}}"#,
            r#"{"chunk":"Hi","error":{"message":42}}"#,
        ] {
            let chunk: StreamChunk = serde_json::from_str(body).unwrap();
            assert_eq!(chunk.error_message(), None, "{}", body);
            assert_eq!(chunk.text(), Some("Hi"), "{}", body);
        }
    }
}
