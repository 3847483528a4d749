use std::fmt::Write as _;

use chrono::Local;
use uuid::Uuid;

use super::Flow;
use crate::workflows::registration::domain::EmployeeSubmission;

/// Produces the document attached to notifications and kept in the blob store.
pub trait ArtifactRenderer: Send + Sync {
    fn render(&self, submission: &EmployeeSubmission, flow: Flow) -> Result<Vec<u8>, RenderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("report formatting failed: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Renders a self-contained HTML employee summary.
#[derive(Debug, Clone)]
pub struct HtmlReportRenderer {
    organisation: String,
}

impl Default for HtmlReportRenderer {
    fn default() -> Self {
        Self::new("Human Resources")
    }
}

impl HtmlReportRenderer {
    pub fn new(organisation: impl Into<String>) -> Self {
        Self {
            organisation: organisation.into(),
        }
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

impl ArtifactRenderer for HtmlReportRenderer {
    fn render(&self, submission: &EmployeeSubmission, flow: Flow) -> Result<Vec<u8>, RenderError> {
        let title = match flow {
            Flow::Create => "Employee registration",
            Flow::Update => "Employee information update",
        };
        let rows = [
            ("Names", submission.names.as_str()),
            ("Last names", submission.last_names.as_str()),
            ("Document type", submission.document_type.as_str()),
            ("Document number", submission.document_number.as_str()),
            ("Date of birth", submission.date_of_birth.as_str()),
            ("Company affiliation", submission.date_affiliation_company.as_str()),
            ("Position", submission.position.as_str()),
            ("Salary", submission.salary.as_str()),
            ("Email", submission.contact_address().unwrap_or("-")),
        ];

        let mut html = String::new();
        writeln!(html, "<!DOCTYPE html>")?;
        writeln!(html, "<html><head><meta charset=\"utf-8\"><title>{title}</title></head>")?;
        writeln!(html, "<body>")?;
        writeln!(html, "<h1>{}</h1>", escape_html(&self.organisation))?;
        writeln!(html, "<h2>{title}</h2>")?;
        writeln!(html, "<table>")?;
        for (label, value) in rows {
            writeln!(
                html,
                "<tr><th>{label}</th><td>{}</td></tr>",
                escape_html(value)
            )?;
        }
        writeln!(html, "</table>")?;
        writeln!(
            html,
            "<p>Generated on {}</p>",
            Local::now().format("%Y-%m-%d %H:%M")
        )?;
        writeln!(html, "</body></html>")?;
        Ok(html.into_bytes())
    }
}

/// First `length` letters, uppercased and padded with `X`.
pub fn safe_prefix(value: &str, length: usize) -> String {
    let mut prefix: String = value
        .chars()
        .filter(|ch| ch.is_alphabetic())
        .flat_map(char::to_uppercase)
        .take(length)
        .collect();
    while prefix.chars().count() < length {
        prefix.push('X');
    }
    prefix
}

/// Alphanumeric characters uppercased, `NA` when nothing is left.
pub fn safe_upper(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    if cleaned.is_empty() {
        "NA".to_string()
    } else {
        cleaned
    }
}

/// First `length` digits, left-padded with zeros.
pub fn safe_digits_prefix(value: &str, length: usize) -> String {
    let digits: String = value
        .chars()
        .filter(char::is_ascii_digit)
        .take(length)
        .collect();
    format!("{digits:0>length$}")
}

/// `REPORT-{names}{last names}-{document type}-{document digits}-{unique id}.html`
pub fn report_file_name(submission: &EmployeeSubmission) -> String {
    format!(
        "REPORT-{}{}-{}-{}-{}.html",
        safe_prefix(&submission.names, 2),
        safe_prefix(&submission.last_names, 2),
        safe_upper(&submission.document_type),
        safe_digits_prefix(&submission.document_number, 3),
        Uuid::new_v4()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> EmployeeSubmission {
        EmployeeSubmission {
            names: "ana <b>".to_string(),
            last_names: "Ruiz".to_string(),
            document_type: "id".to_string(),
            document_number: "10-20-30".to_string(),
            ..EmployeeSubmission::default()
        }
    }

    #[test]
    fn name_helpers_pad_and_clean() {
        assert_eq!(safe_prefix("  j1o", 2), "JO");
        assert_eq!(safe_prefix("", 2), "XX");
        assert_eq!(safe_prefix("a", 3), "AXX");
        assert_eq!(safe_upper(" cc "), "CC");
        assert_eq!(safe_upper("  "), "NA");
        assert_eq!(safe_digits_prefix("A-1", 3), "001");
        assert_eq!(safe_digits_prefix("", 3), "000");
        assert_eq!(safe_digits_prefix("987654", 3), "987");
    }

    #[test]
    fn report_name_is_unique_and_structured() {
        let first = report_file_name(&submission());
        let second = report_file_name(&submission());
        assert!(first.starts_with("REPORT-ANRU-ID-102-"), "{first}");
        assert!(first.ends_with(".html"));
        assert_ne!(first, second);
    }

    #[test]
    fn html_escapes_submitted_values() {
        let bytes = HtmlReportRenderer::new("Acme")
            .render(&submission(), Flow::Update)
            .expect("rendered");
        let html = String::from_utf8(bytes).expect("utf8");
        assert!(html.contains("ana &lt;b&gt;"));
        assert!(html.contains("Employee information update"));
        assert!(html.contains("<h1>Acme</h1>"));
    }
}
