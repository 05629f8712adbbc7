//! Human-readable rendering of stored reports.

use chrono::DateTime;
use shared::{BoneClass, ReportRecord};

const COMMON_RECOMMENDATIONS: [&str; 3] = [
    "Schedule a follow-up appointment with your healthcare provider to discuss these results.",
    "Maintain a balanced diet rich in calcium and vitamin D.",
    "Engage in regular weight-bearing exercises as appropriate for your condition.",
];

pub fn summary(class: BoneClass) -> &'static str {
    match class {
        BoneClass::Normal => {
            "Your bone density appears to be within normal range. Continue with regular \
             check-ups as recommended by your healthcare provider."
        }
        BoneClass::Osteopenia => {
            "Your bone density is lower than normal. This condition may lead to osteoporosis \
             if not addressed. Please consult with your healthcare provider for appropriate \
             interventions."
        }
        BoneClass::Osteoporosis => {
            "Your bone density is significantly reduced, indicating osteoporosis. This \
             condition increases your risk of fractures. Please consult with your healthcare \
             provider immediately for treatment options."
        }
    }
}

pub fn recommendations(class: BoneClass) -> Vec<&'static str> {
    let specific: &[&str] = match class {
        BoneClass::Normal => &[
            "Continue with regular bone density screenings as recommended by your healthcare provider.",
            "Maintain a healthy lifestyle to preserve bone health.",
        ],
        BoneClass::Osteopenia => &[
            "Discuss calcium and vitamin D supplementation with your healthcare provider.",
            "Consider lifestyle modifications to reduce risk of progression to osteoporosis.",
            "Schedule more frequent bone density screenings to monitor your condition.",
        ],
        BoneClass::Osteoporosis => &[
            "Discuss medication options with your healthcare provider.",
            "Implement fall prevention strategies in your home and daily activities.",
            "Consider physical therapy for safe exercise recommendations.",
            "Schedule regular bone density screenings to monitor treatment effectiveness.",
        ],
    };
    COMMON_RECOMMENDATIONS
        .iter()
        .chain(specific.iter())
        .copied()
        .collect()
}

fn date_and_time(timestamp: &str) -> (String, String) {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(ts) => (
            ts.format("%Y-%m-%d").to_string(),
            ts.format("%H:%M:%S %:z").to_string(),
        ),
        Err(_) => (timestamp.to_string(), String::from("-")),
    }
}

/// Plain-text report served as a download.
pub fn plain_text(record: &ReportRecord) -> String {
    let report = &record.report;
    let (date, time) = date_and_time(&report.timestamp);

    let probabilities: String = report
        .class_probabilities
        .iter()
        .map(|(class, probability)| format!("  {:<14}{:>6.2}%\n", class.as_ref(), probability))
        .collect();
    let advice: String = recommendations(report.predicted_class)
        .iter()
        .map(|line| format!("  - {}\n", line))
        .collect();

    format!(
        "BONE HEALTH ANALYSIS REPORT\n\
         ===========================\n\
         \n\
         Report ID: {report_id}\n\
         Image ID: {image_id}\n\
         Date: {date}\n\
         Time: {time}\n\
         \n\
         DIAGNOSIS: {class}\n\
         CONFIDENCE: {confidence:.2}%\n\
         \n\
         CLASS PROBABILITIES:\n\
         {probabilities}\
         \n\
         SUMMARY:\n\
         {summary}\n\
         \n\
         RECOMMENDATIONS:\n\
         {advice}\
         \n\
         This report was generated automatically by the Bone Health Analysis System.\n\
         Please consult with a healthcare professional for proper medical advice.\n",
        report_id = record.report_id,
        image_id = report.image_id,
        class = report.predicted_class,
        confidence = report.confidence,
        summary = summary(report.predicted_class),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const HTML_STYLE: &str = "\
body{font-family:-apple-system,'Segoe UI',Roboto,sans-serif;color:#1f2937;background:#f9fafb;margin:0}\
.container{max-width:900px;margin:2rem auto;padding:2rem;background:#fff;border-radius:8px}\
.meta{display:grid;grid-template-columns:repeat(2,1fr);gap:1rem;padding:1rem;background:#f9fafb}\
.diagnosis{padding:1.5rem;border-radius:8px;margin:1.5rem 0}\
.diagnosis.normal{background:#d1fae5;border-left:4px solid #10b981}\
.diagnosis.osteopenia{background:#fef3c7;border-left:4px solid #f59e0b}\
.diagnosis.osteoporosis{background:#fee2e2;border-left:4px solid #ef4444}\
.bar{height:8px;background:#e5e7eb;border-radius:4px}\
.bar span{display:block;height:100%;background:#0070f3;border-radius:4px}\
img{max-width:100%;border-radius:8px}\
footer{margin-top:2rem;font-size:.875rem;color:#6b7280}";

/// Standalone HTML page for viewing a report in a browser.
pub fn html(record: &ReportRecord) -> String {
    let report = &record.report;
    let (date, time) = date_and_time(&report.timestamp);
    let image_id = escape_html(&report.image_id);

    let probabilities: String = report
        .class_probabilities
        .iter()
        .map(|(class, probability)| {
            format!(
                "<li>{class} {probability:.2}%<div class=\"bar\">\
                 <span style=\"width:{width:.2}%\"></span></div></li>\n",
                class = class.as_ref(),
                width = probability.clamp(0.0, 100.0),
            )
        })
        .collect();
    let advice: String = recommendations(report.predicted_class)
        .iter()
        .map(|line| format!("<li>{}</li>\n", escape_html(line)))
        .collect();

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>OsteoScan Bone Health Analysis Report</title>\n\
         <style>{style}</style>\n\
         </head>\n\
         <body>\n\
         <div class=\"container\">\n\
         <h1>Bone Health Analysis Report</h1>\n\
         <div class=\"meta\">\n\
         <div>Report ID<br><strong>{report_id}</strong></div>\n\
         <div>Image ID<br><strong>{image_id}</strong></div>\n\
         <div>Date<br><strong>{date}</strong></div>\n\
         <div>Time<br><strong>{time}</strong></div>\n\
         </div>\n\
         <div class=\"diagnosis {css_class}\">\n\
         <h2>{class}</h2>\n\
         <p>Confidence: {confidence:.2}%</p>\n\
         </div>\n\
         <img src=\"/images/{image_id}\" alt=\"Analyzed X-ray\">\n\
         <h3>Class probabilities</h3>\n\
         <ul>\n{probabilities}</ul>\n\
         <h3>Summary</h3>\n\
         <p>{summary}</p>\n\
         <h3>Recommendations</h3>\n\
         <ul>\n{advice}</ul>\n\
         <footer>This report was generated automatically by the Bone Health Analysis System. \
         Please consult with a healthcare professional for proper medical advice.</footer>\n\
         </div>\n\
         </body>\n\
         </html>\n",
        style = HTML_STYLE,
        report_id = escape_html(&record.report_id),
        date = escape_html(&date),
        time = escape_html(&time),
        css_class = report.predicted_class.as_ref().to_lowercase(),
        class = report.predicted_class,
        confidence = report.confidence,
        summary = summary(report.predicted_class),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_report;

    fn record(timestamp: &str) -> ReportRecord {
        ReportRecord {
            report_id: "0b6f7b8e-0000-4000-8000-000000000000".into(),
            report: sample_report("img-7", timestamp),
        }
    }

    #[test]
    fn text_report_lists_diagnosis_and_probabilities() {
        let text = plain_text(&record("2026-03-01T10:15:30.000000Z"));

        assert!(text.contains("DIAGNOSIS: Osteopenia"));
        assert!(text.contains("CONFIDENCE: 60.00%"));
        assert!(text.contains("Date: 2026-03-01"));
        assert!(text.contains("Time: 10:15:30 +00:00"));
        assert!(text.contains("Osteoporosis   10.00%"));
        assert!(text.contains(summary(BoneClass::Osteopenia)));
        assert!(text.contains("Report ID: 0b6f7b8e-0000-4000-8000-000000000000"));
    }

    #[test]
    fn unparsable_timestamp_is_printed_verbatim() {
        let text = plain_text(&record("yesterday"));
        assert!(text.contains("Date: yesterday"));
    }

    #[test]
    fn recommendations_extend_the_common_advice() {
        assert_eq!(recommendations(BoneClass::Normal).len(), 5);
        assert_eq!(recommendations(BoneClass::Osteopenia).len(), 6);
        let osteoporosis = recommendations(BoneClass::Osteoporosis);
        assert_eq!(osteoporosis.len(), 7);
        assert_eq!(osteoporosis[0], COMMON_RECOMMENDATIONS[0]);
    }

    #[test]
    fn html_view_styles_the_diagnosis_and_links_the_image() {
        let page = html(&record("2026-03-01T10:15:30.000000Z"));

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<div class=\"diagnosis osteopenia\">"));
        assert!(page.contains("<h2>Osteopenia</h2>"));
        assert!(page.contains("Confidence: 60.00%"));
        assert!(page.contains("<img src=\"/images/img-7\""));
        assert!(page.contains("<li>Normal 30.00%"));
        assert_eq!(page.matches("<li>").count(), 3 + 6);
    }

    #[test]
    fn html_view_escapes_stored_text() {
        let mut stored = record("<b>now</b>");
        stored.report.image_id = "\"><script>alert(1)</script>".into();

        let page = html(&stored);

        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(page.contains("&lt;b&gt;now&lt;/b&gt;"));
    }
}
