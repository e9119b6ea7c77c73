//! Printable HTML diplomas.

use std::fmt::Write as _;

use async_trait::async_trait;

use certexam_core::diploma::CourseDiploma;
use certexam_core::levels::{describe, LEGAL_DISCLAIMER_TEXT};
use certexam_core::traits::DiplomaRenderer;

use crate::html::html_escape;

/// Renders a diploma as a standalone, print-ready HTML page.
#[derive(Debug, Clone)]
pub struct HtmlDiplomaRenderer {
    issuer_name: String,
}

impl Default for HtmlDiplomaRenderer {
    fn default() -> Self {
        Self::new("MyEasyLearning")
    }
}

impl HtmlDiplomaRenderer {
    pub fn new(issuer_name: impl Into<String>) -> Self {
        Self {
            issuer_name: issuer_name.into(),
        }
    }

    pub fn render_html(&self, diploma: &CourseDiploma) -> String {
        let level = describe(diploma.certificate_level());
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(
            html,
            "<title>Certificate {}</title>",
            html_escape(diploma.id())
        );
        html.push_str("<style>\n");
        html.push_str(CSS);
        html.push_str("</style>\n</head>\n<body>\n<main class=\"diploma\">\n");

        let _ = writeln!(html, "<p class=\"issuer\">{}</p>", html_escape(&self.issuer_name));
        html.push_str("<h1>Certificate of Completion</h1>\n");
        html.push_str("<p>This certifies that</p>\n");
        let _ = writeln!(
            html,
            "<p class=\"student\">{}</p>",
            html_escape(diploma.student_name())
        );
        let _ = writeln!(
            html,
            "<p>completed the study program <strong>{}</strong> ({}) at level <strong>{}</strong>, \
             scoring {}% on the final exam.</p>",
            html_escape(diploma.skill_name()),
            html_escape(diploma.skill_category()),
            level.label,
            diploma.final_exam_score()
        );
        let _ = writeln!(
            html,
            "<p class=\"stats\">{:.1} hours studied | {} lessons | {} exercises</p>",
            diploma.total_hours_studied(),
            diploma.lessons_completed(),
            diploma.exercises_completed()
        );

        html.push_str("<h2>This certificate attests</h2>\n<ul>\n");
        for item in level.what_it_attests {
            let _ = writeln!(html, "<li>{}</li>", html_escape(item));
        }
        html.push_str("</ul>\n");

        let _ = writeln!(
            html,
            "<p class=\"id\">Certificate ID {} | issued {}</p>",
            html_escape(diploma.id()),
            diploma.issued_at().format("%Y-%m-%d")
        );
        let _ = writeln!(
            html,
            "<p class=\"disclaimer\">{}</p>",
            html_escape(LEGAL_DISCLAIMER_TEXT)
        );
        html.push_str("</main>\n</body>\n</html>");
        html
    }
}

#[async_trait]
impl DiplomaRenderer for HtmlDiplomaRenderer {
    fn content_type(&self) -> &str {
        "text/html; charset=utf-8"
    }

    async fn render(&self, diploma: &CourseDiploma) -> anyhow::Result<Vec<u8>> {
        Ok(self.render_html(diploma).into_bytes())
    }
}

const CSS: &str = r#"
@page { size: A4 landscape; margin: 1.5cm; }
body { font-family: Georgia, 'Times New Roman', serif; margin: 0; color: #1a1a1a; }
.diploma { border: 6px double #1e3a8a; padding: 3rem; text-align: center; }
.issuer { letter-spacing: 0.2em; text-transform: uppercase; color: #1e3a8a; }
h1 { font-size: 2.5rem; margin: 1rem 0; }
.student { font-size: 2rem; font-style: italic; margin: 1rem 0; }
.stats, .id { color: #4b5563; }
ul { display: inline-block; text-align: left; }
.disclaimer { font-size: 0.75rem; color: #6b7280; margin-top: 2rem; }
"#;
