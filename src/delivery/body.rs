//! The submission summary e-mail sent alongside the rendered forms.

use handlebars::html_escape;
use std::fmt::Write;

use crate::models::RequestRecord;
use crate::template::helpers::{currency, is_yes};

const ACCENT: &str = "#ea580c";
const FLAG_YES: &str = "#dc2626";
const FLAG_NO: &str = "#16a34a";

const ROW: &str = "padding: 8px 0;";

/// Hazard questions shown with a red/green answer.
const OPERATIONS_FLAGS: [(&str, &str); 3] = [
    ("gas_line_work", "Gas Line Work"),
    ("boiler_work", "Boiler Work"),
    ("high_pressure_steam", "High-Pressure Steam"),
];

pub fn default_subject(record: &RequestRecord) -> String {
    match record.non_empty("applicant_name") {
        Some(name) => format!("New Submission - {name}"),
        None => "New Submission".to_string(),
    }
}

fn heading(out: &mut String, title: &str, first: bool) {
    let margin = if first { "" } else { " margin-top: 20px;" };
    let _ = write!(
        out,
        "<h3 style=\"color: #333; border-bottom: 2px solid {ACCENT}; padding-bottom: 5px;{margin}\">{title}</h3>"
    );
}

fn row(out: &mut String, label: &str, value: &str) {
    let _ = write!(
        out,
        "<tr><td style=\"{ROW}\"><strong>{label}:</strong></td><td>{}</td></tr>",
        html_escape(value)
    );
}

fn text_or(record: &RequestRecord, key: &str, fallback: &str) -> String {
    record
        .non_empty(key)
        .unwrap_or_else(|| fallback.to_string())
}

fn address(record: &RequestRecord) -> String {
    let state_zip = [record.text("premise_state"), record.text("premise_zip")]
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    [record.text("premise_address"), record.text("premise_city"), state_zip]
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// HTML summary of a plumbing submission. Every record value is escaped;
/// missing values print blank (percentages print `0`).
pub fn submission_summary_html(record: &RequestRecord, attachment_names: &[&str]) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str("<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">");
    let _ = write!(
        out,
        "<h2 style=\"color: {ACCENT};\">New Plumber Insurance Submission</h2>"
    );

    heading(&mut out, "Business Information", true);
    out.push_str("<table style=\"width: 100%; border-collapse: collapse;\">");
    row(&mut out, "Applicant", &record.text("applicant_name"));
    row(&mut out, "Business", &record.text("business_name"));
    row(&mut out, "Phone", &record.text("business_phone"));
    row(&mut out, "Email", &record.text("contact_email"));
    row(&mut out, "Address", &address(record));
    out.push_str("</table>");

    heading(&mut out, "Plumbing Operations", false);
    out.push_str("<table style=\"width: 100%; border-collapse: collapse;\">");
    row(&mut out, "Years in Business", &record.text("years_in_business"));
    row(&mut out, "Years Experience", &record.text("years_experience"));
    let revenue = record
        .get("projected_gross_revenue")
        .map(currency)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "$0.00".to_string());
    row(&mut out, "Revenue", &revenue);
    for (key, label) in OPERATIONS_FLAGS {
        let colour = match record.get(key) {
            Some(value) if is_yes(value) => FLAG_YES,
            _ => FLAG_NO,
        };
        let _ = write!(
            out,
            "<tr><td style=\"{ROW}\"><strong>{label}:</strong></td><td style=\"color: {colour}; font-weight: bold;\">{}</td></tr>",
            html_escape(&text_or(record, key, "No"))
        );
    }
    out.push_str("</table>");

    if let Some(clients) = record.non_empty("industrial_plumbing_clients") {
        heading(&mut out, "Industrial Clients", false);
        let _ = write!(
            out,
            "<p style=\"background: #fef3c7; padding: 10px; border-left: 4px solid #f59e0b;\">{}</p>",
            html_escape(&clients)
        );
    }

    heading(&mut out, "Work Breakdown", false);
    out.push_str("<table style=\"width: 100%; border-collapse: collapse;\">");
    for (key, label) in [
        ("pct_residential", "Residential"),
        ("pct_commercial", "Commercial"),
        ("pct_industrial", "Industrial"),
    ] {
        row(&mut out, label, &format!("{}%", text_or(record, key, "0")));
    }
    out.push_str("</table>");

    if !attachment_names.is_empty() {
        let _ = write!(
            out,
            "<p style=\"margin-top: 30px; padding-top: 20px; border-top: 1px solid #ddd; color: #666; font-size: 14px;\"><strong>PDFs attached:</strong> {}</p>",
            html_escape(&attachment_names.join(", "))
        );
    }
    out.push_str("</div>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_escapes_and_colours() {
        let record = RequestRecord::from_value(json!({
            "applicant_name": "Joe's <Plumbing> & Sons",
            "premise_address": "1 Main St",
            "premise_city": "Springfield",
            "premise_state": "IL",
            "premise_zip": "62701",
            "projected_gross_revenue": 1234567,
            "gas_line_work": "Yes",
            "boiler_work": "no",
            "pct_residential": 60
        }));
        let html = submission_summary_html(&record, &["ACORD-125.pdf", "ACORD-126.pdf"]);

        assert!(html.contains("Joe&#x27;s &lt;Plumbing&gt; &amp; Sons"));
        assert!(html.contains("1 Main St, Springfield, IL 62701"));
        assert!(html.contains("$1,234,567.00"));
        assert!(html.contains("color: #dc2626; font-weight: bold;\">Yes</td>"));
        assert!(html.contains("color: #16a34a; font-weight: bold;\">no</td>"));
        assert!(html.contains("color: #16a34a; font-weight: bold;\">No</td>"));
        assert!(html.contains("60%"));
        assert!(html.contains("<strong>Commercial:</strong></td><td>0%</td>"));
        assert!(html.contains("ACORD-125.pdf, ACORD-126.pdf"));
    }

    #[test]
    fn test_industrial_section_only_when_present() {
        let empty = submission_summary_html(&RequestRecord::new(), &[]);
        assert!(!empty.contains("Industrial Clients"));
        assert!(!empty.contains("PDFs attached"));
        assert!(empty.contains("$0.00"));

        let record = RequestRecord::from_value(json!({"industrial_plumbing_clients": "Refinery"}));
        assert!(submission_summary_html(&record, &[]).contains("Industrial Clients"));
    }

    #[test]
    fn test_default_subject() {
        assert_eq!(default_subject(&RequestRecord::new()), "New Submission");
        let record = RequestRecord::from_value(json!({"applicant_name": " Joe "}));
        assert_eq!(default_subject(&record), "New Submission - Joe");
    }
}
