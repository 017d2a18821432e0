use serde::Deserialize;

use crate::models::error::CaptureError;

/// A recognizer's current reading of the utterance in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hypothesis {
    /// Everything heard so far in the current utterance. Each partial
    /// repeats the previous one plus any new words, though trailing words
    /// may still be revised.
    Partial(String),
    /// The settled text of a finished utterance.
    Final(String),
}

#[derive(Deserialize)]
struct PartialResult {
    partial: String,
}

#[derive(Deserialize)]
struct FinalResult {
    text: String,
}

impl Hypothesis {
    /// Parse a `{"partial": "..."}` result. Blank text yields `None`.
    pub fn from_partial_json(json: &str) -> Result<Option<Self>, CaptureError> {
        let parsed: PartialResult = serde_json::from_str(json)
            .map_err(|e| CaptureError::RecognitionFailed(format!("unreadable partial result: {}", e)))?;
        Ok(non_blank(parsed.partial).map(Self::Partial))
    }

    /// Parse a `{"text": "..."}` result. Blank text yields `None`.
    pub fn from_final_json(json: &str) -> Result<Option<Self>, CaptureError> {
        let parsed: FinalResult = serde_json::from_str(json)
            .map_err(|e| CaptureError::RecognitionFailed(format!("unreadable result: {}", e)))?;
        Ok(non_blank(parsed.text).map(Self::Final))
    }
}

fn non_blank(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == text.len() {
        Some(text)
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial() {
        let h = Hypothesis::from_partial_json(r#"{"partial": "hello wor"}"#).unwrap();
        assert_eq!(h, Some(Hypothesis::Partial("hello wor".into())));
    }

    #[test]
    fn parses_final_and_ignores_extra_fields() {
        let json = r#"{"result": [{"conf": 1.0, "word": "hello"}], "text": " hello world\n"}"#;
        let h = Hypothesis::from_final_json(json).unwrap();
        assert_eq!(h, Some(Hypothesis::Final("hello world".into())));
    }

    #[test]
    fn blank_text_is_no_hypothesis() {
        assert_eq!(Hypothesis::from_partial_json(r#"{"partial": ""}"#).unwrap(), None);
        assert_eq!(Hypothesis::from_final_json(r#"{"text": "   "}"#).unwrap(), None);
    }

    #[test]
    fn malformed_json_is_a_recognition_error() {
        let err = Hypothesis::from_final_json(r#"{"partial": "x"}"#).unwrap_err();
        assert!(matches!(err, CaptureError::RecognitionFailed(_)));
    }
}
