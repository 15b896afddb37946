//! Validation of generation outputs

use crate::error::{Error, Result};
use crate::utils::{extract_json_object, strip_code_fences};
use serde::{Deserialize, Serialize};

const DOCTYPE: &str = "<!doctype html";

/// Privacy policy and terms of service, as Markdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalPages {
    /// Privacy policy
    pub privacy_policy: String,
    /// Terms of service
    pub terms_of_service: String,
}

/// Model review of the generated site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// 0 to 100
    pub score: u8,
    /// Problems found
    #[serde(default)]
    pub issues: Vec<String>,
}

fn invalid(prompt_id: &str, reason: impl Into<String>) -> Error {
    Error::InvalidOutput {
        prompt_id: prompt_id.to_string(),
        reason: reason.into(),
    }
}

/// Accept a complete HTML document, tolerating code fences and leading whitespace
pub fn validate_html(prompt_id: &str, raw: &str) -> Result<String> {
    let body = strip_code_fences(raw);
    let starts_with_doctype = body
        .get(..DOCTYPE.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(DOCTYPE));
    if !starts_with_doctype {
        return Err(invalid(prompt_id, "output is not a complete HTML document"));
    }
    Ok(body.to_string())
}

/// Parse the legal pages reply
pub fn parse_legal_pages(prompt_id: &str, raw: &str) -> Result<LegalPages> {
    let json = extract_json_object(raw).ok_or_else(|| invalid(prompt_id, "no JSON object in reply"))?;
    let pages: LegalPages =
        serde_json::from_str(json).map_err(|e| invalid(prompt_id, e.to_string()))?;
    if pages.privacy_policy.trim().is_empty() || pages.terms_of_service.trim().is_empty() {
        return Err(invalid(prompt_id, "legal page text is empty"));
    }
    Ok(pages)
}

/// Quality reply as sent by the model; scores may be fractional
#[derive(Deserialize)]
struct QualityReply {
    score: f64,
    #[serde(default)]
    issues: Vec<String>,
}

/// Parse the quality review reply, rounding the score to a whole number
pub fn parse_quality_report(prompt_id: &str, raw: &str) -> Result<QualityReport> {
    let json = extract_json_object(raw).ok_or_else(|| invalid(prompt_id, "no JSON object in reply"))?;
    let reply: QualityReply =
        serde_json::from_str(json).map_err(|e| invalid(prompt_id, e.to_string()))?;
    if !(0.0..=100.0).contains(&reply.score) {
        return Err(invalid(prompt_id, format!("score {} outside 0-100", reply.score)));
    }
    Ok(QualityReport {
        score: reply.score.round() as u8,
        issues: reply.issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_doctype_required() {
        assert!(validate_html("website_html", "<!DOCTYPE html><html></html>").is_ok());
        assert!(validate_html("website_html", "\n  <!doctype HTML>\n<html></html>").is_ok());
        let fenced = validate_html("website_html", "```html\n<!DOCTYPE html>\n<html></html>\n```").unwrap();
        assert!(fenced.ends_with("</html>"));

        let err = validate_html("website_html", "<html><body>hi</body></html>").unwrap_err();
        assert!(matches!(err, Error::InvalidOutput { .. }));
        assert!(validate_html("website_html", "").is_err());
    }

    #[test]
    fn test_legal_pages() {
        let pages = parse_legal_pages(
            "legal_pages",
            r##"{"privacy_policy": "# Privacy", "terms_of_service": "# Terms"}"##,
        )
        .unwrap();
        assert_eq!(pages.privacy_policy, "# Privacy");
        assert!(parse_legal_pages("legal_pages", r#"{"privacy_policy": "x"}"#).is_err());
        assert!(parse_legal_pages("legal_pages", r#"{"privacy_policy": "", "terms_of_service": "t"}"#).is_err());
    }

    #[test]
    fn test_quality_report() {
        let report = parse_quality_report("quality_score", r#"{"score": 87, "issues": ["no map"]}"#).unwrap();
        assert_eq!(report.score, 87);
        assert!(parse_quality_report("quality_score", r#"{"score": 140}"#).is_err());
        assert!(parse_quality_report("quality_score", r#"{"score": -1}"#).is_err());
    }

    #[test]
    fn test_fractional_quality_score_rounds() {
        let report = parse_quality_report("quality_score", r#"{"score": 87.5, "issues": []}"#).unwrap();
        assert_eq!(report.score, 88);
        let report = parse_quality_report("quality_score", r#"{"score": 99.6}"#).unwrap();
        assert_eq!(report.score, 100);
        assert!(parse_quality_report("quality_score", r#"{"score": 100.4}"#).is_err());
        assert!(parse_quality_report("quality_score", r#"{"score": "high"}"#).is_err());
    }
}
