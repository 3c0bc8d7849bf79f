//! HTML rendering for the dashboard page.

use std::fmt::Write;

use crate::chart::{render_bar_chart, ChartContent, DashboardView, Summary};

pub const PAGE_TITLE: &str = "PI Dashboard";

/// Everything the page template needs for one render.
#[derive(Debug, Clone, Default)]
pub struct PageModel {
    pub status: Option<String>,
    pub username: Option<String>,
    pub is_admin: bool,
    /// PIs offered in the admin dropdown.
    pub pi_options: Vec<String>,
    pub selected: Vec<String>,
    pub content: Option<ChartContent>,
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
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

pub fn render_page(model: &PageModel) -> String {
    let mut body = String::new();
    let _ = write!(body, "<h1>{PAGE_TITLE}</h1><hr>");

    render_login_form(&mut body, model);

    if model.is_admin {
        render_pi_selector(&mut body, model);
    }

    body.push_str(r#"<div id="bar-chart">"#);
    match &model.content {
        Some(ChartContent::Message(message)) => {
            let _ = write!(body, r#"<div class="message">{}</div>"#, escape_html(message));
        }
        Some(ChartContent::View(view)) => render_view(&mut body, view),
        None => {}
    }
    body.push_str("</div>");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{PAGE_TITLE}</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
.alert-warning {{ background: #fff3cd; border: 1px solid #ffe69c; padding: 0.5rem 1rem; }}
.bar-chart {{ max-width: 720px; }}
</style>
</head>
<body class="app-container">
{body}
</body>
</html>
"#
    )
}

fn render_login_form(out: &mut String, model: &PageModel) {
    out.push_str(
        r#"<div class="login mb-4"><form method="post" action="/login">"#,
    );
    out.push_str(
        r#"<input id="username-input" type="text" name="username" placeholder="Username">"#,
    );
    out.push_str(
        r#"<input id="password-input" type="password" name="password" placeholder="Password">"#,
    );
    out.push_str(r#"<button type="submit" id="login-button">Login</button></form>"#);
    out.push_str(
        r#"<form method="post" action="/logout"><button type="submit" id="logout-button">Logout</button></form>"#,
    );

    let _ = write!(
        out,
        r#"<div id="login-status">{}</div></div>"#,
        model.status.as_deref().map(escape_html).unwrap_or_default()
    );
}

fn render_pi_selector(out: &mut String, model: &PageModel) {
    out.push_str(r#"<div id="bar-chart-controls"><form method="get" action="/">"#);
    out.push_str(r#"<h6 id="pi-label">Select PI(s)</h6>"#);
    out.push_str(r#"<select id="pi-dropdown" name="pi" multiple>"#);
    for pi in &model.pi_options {
        let selected = if model.selected.contains(pi) {
            " selected"
        } else {
            ""
        };
        let pi = escape_html(pi);
        let _ = write!(out, r#"<option value="{pi}"{selected}>{pi}</option>"#);
    }
    out.push_str("</select>");
    out.push_str(r#"<button type="submit">Show</button>"#);
    out.push_str(
        r#"<button type="submit" name="all" value="1" id="pi-select-all">Show All</button>"#,
    );
    out.push_str("</form></div>");
}

/// Two decimals at most, whole numbers keep one trailing zero (`10.0`).
fn format_average(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded:?}")
}

fn render_view(out: &mut String, view: &DashboardView) {
    match &view.summary {
        Summary::Lab {
            pi,
            number_of_users,
            total_usage,
            average_usage,
            max_usage,
        } => {
            let _ = write!(
                out,
                "<div class=\"summary mb-4\"><h5>PI Usage Summary</h5><ul>\
                 <li>PI: {pi}</li>\
                 <li>Number of Users: {number_of_users}</li>\
                 <li>Total Usage: {total_usage} GB</li>\
                 <li>Average Usage: {average} GB</li>\
                 <li>Max Individual Usage: {max_usage} GB</li>\
                 </ul></div>",
                pi = escape_html(pi),
                average = format_average(*average_usage),
            );
        }
        Summary::Admin {
            number_of_pis,
            total_usage,
            remaining_quota,
        } => {
            let _ = write!(
                out,
                "<div class=\"summary mb-4\"><h5>Admin Summary for Selected PIs</h5>\
                 <p>Number of PIs: {number_of_pis}</p>\
                 <p>Total Usage: {total_usage} GB</p>\
                 <p>Remaining Quota: {remaining_quota} GB</p></div>"
            );
        }
    }

    if !view.warnings.is_empty() {
        out.push_str(r#"<div class="alert alert-warning"><h5>Warnings</h5><ul>"#);
        for warning in &view.warnings {
            let _ = write!(out, "<li>{}</li>", escape_html(warning));
        }
        out.push_str("</ul></div>");
    }

    out.push_str(&render_bar_chart(&view.chart));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{member_view, NOT_LOGGED_IN};
    use crate::client::{MemberMap, MemberStats};

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn averages_round_to_two_places() {
        assert_eq!(format_average(16.0 / 3.0), "5.33");
        assert_eq!(format_average(23.0 / 3.0), "7.67");
        assert_eq!(format_average(10.0), "10.0");
        assert_eq!(format_average(2.5), "2.5");
    }

    #[test]
    fn anonymous_page_has_login_form_only() {
        let html = render_page(&PageModel {
            content: Some(ChartContent::message(NOT_LOGGED_IN)),
            ..PageModel::default()
        });

        assert!(html.contains(r#"action="/login""#));
        assert!(html.contains(NOT_LOGGED_IN));
        assert!(!html.contains("pi-dropdown"));
        assert!(!html.contains("<svg"));
    }

    #[test]
    fn admin_page_marks_selected_options() {
        let html = render_page(&PageModel {
            username: Some("admin".into()),
            is_admin: true,
            pi_options: vec!["amy".into(), "bob".into()],
            selected: vec!["bob".into()],
            ..PageModel::default()
        });

        assert!(html.contains(r#"<option value="amy">amy</option>"#));
        assert!(html.contains(r#"<option value="bob" selected>bob</option>"#));
        assert!(html.contains("Show All"));
    }

    #[test]
    fn lab_view_renders_summary_warnings_and_chart() {
        let mut members = MemberMap::new();
        members.insert(
            "mary".into(),
            MemberStats {
                usage: 19,
                soft: 20,
                hard: 25,
                files: 1401,
            },
        );
        members.insert(
            "tom".into(),
            MemberStats {
                usage: 1,
                soft: 20,
                hard: 25,
                files: 13,
            },
        );

        let html = render_page(&PageModel {
            username: Some("amy".into()),
            content: Some(member_view("amy", &members, 95.0)),
            ..PageModel::default()
        });

        assert!(html.contains("<li>Average Usage: 10.0 GB</li>"));
        assert!(html.contains("<li>Max Individual Usage: 19 GB</li>"));
        assert!(html.contains("<li>mary is at 95% of their soft limit.</li>"));
        assert!(html.contains("<svg"));
    }
}
