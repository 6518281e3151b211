//! Server-rendered HTML for the login and dashboard pages.

use pagesaver_auth::Identity;
use pagesaver_storage::{PageStats, SavedPage};

const STYLES: &str = r#"
body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
    background: #f3f2ef;
    color: #1d2226;
    margin: 0;
}
.container { max-width: 860px; margin: 0 auto; padding: 2rem 1rem; }
.card { background: #fff; border-radius: 8px; padding: 1.5rem; margin-bottom: 1rem; }
.btn { display: inline-block; background: #0a66c2; color: #fff; padding: .6rem 1.2rem; border-radius: 24px; text-decoration: none; }
.alert-error { background: #fde8e8; color: #9b1c1c; padding: .75rem; border-radius: 6px; margin-bottom: 1rem; }
.stats { display: flex; gap: 1rem; }
.stats div { flex: 1; text-align: center; }
ul.pages { list-style: none; padding: 0; }
ul.pages li { padding: .5rem 0; border-bottom: 1px solid #eee; }
"#;

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLES}</style>
</head>
<body>
<div class="container">
{body}
</div>
</body>
</html>"#,
        title = html_escape(title),
    )
}

/// Human-readable text for a `?error=` kind.
fn error_message(kind: &str) -> &'static str {
    match kind {
        "provider_denied" => "LinkedIn did not authorize the login.",
        "csrf_mismatch" => "The login request expired or was tampered with. Please try again.",
        "missing_code" => "LinkedIn returned no authorization code.",
        "exchange_failed" => "Could not complete the login with LinkedIn.",
        "profile_fetch_failed" => "Could not load your LinkedIn profile.",
        _ => "Login failed. Please try again.",
    }
}

pub fn render_login_page(error: Option<&str>) -> String {
    let alert = error
        .map(|kind| {
            format!(
                r#"<div class="alert-error">{}</div>"#,
                html_escape(error_message(kind))
            )
        })
        .unwrap_or_default();
    page(
        "Page Saver - Login",
        &format!(
            r#"<div class="card">
<h1>Page Saver</h1>
<p>Save pages and LinkedIn posts to your collection.</p>
{alert}
<a class="btn" href="/auth/linkedin">Sign in with LinkedIn</a>
</div>"#
        ),
    )
}

pub fn render_dashboard(user: &Identity, stats: &PageStats, pages: &[SavedPage]) -> String {
    let name = user.name.as_deref().unwrap_or("there");
    let items: String = pages
        .iter()
        .map(|p| {
            format!(
                r#"<li><a href="{url}" target="_blank" rel="noopener">{title}</a> <small>{description}</small></li>"#,
                url = html_escape(&p.url),
                title = html_escape(&p.title),
                description = html_escape(&p.description),
            )
        })
        .collect();
    let list = if items.is_empty() {
        "<p>No saved pages yet.</p>".to_string()
    } else {
        format!(r#"<ul class="pages">{items}</ul>"#)
    };

    page(
        "Page Saver - Dashboard",
        &format!(
            r#"<div class="card">
<h1>Welcome, {name}</h1>
<a class="btn" href="/logout">Logout</a>
</div>
<div class="card stats">
<div><strong>{total}</strong><br>Total pages</div>
<div><strong>{week}</strong><br>This week</div>
<div><strong>{domains}</strong><br>Domains</div>
</div>
<div class="card">{list}</div>"#,
            name = html_escape(name),
            total = stats.total_pages,
            week = stats.week_pages,
            domains = stats.unique_domains,
        ),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
