//! The HTML dashboard page.

use std::fmt::Write;
use std::sync::Arc;

use axum::{extract::Extension, response::Html};
use monitor_common::FileKind;

use crate::handlers::error::ApiResult;
use crate::state::AppState;
use crate::store::StoredFile;

const STYLE: &str = "\
body { font-family: sans-serif; margin: 2em auto; max-width: 960px; color: #222; }
h1 { border-bottom: 2px solid #1f77b4; padding-bottom: 0.3em; }
table { border-collapse: collapse; width: 100%; margin-bottom: 1em; }
td, th { border-bottom: 1px solid #ddd; padding: 0.3em 0.6em; text-align: left; }
.empty { color: #777; font-style: italic; }
form { margin: 0.5em 0 1.5em; }
td form { display: inline; margin: 0; }
";

const DELETE_SCRIPT: &str = "\
document.querySelectorAll('button[data-delete]').forEach(function (button) {
  button.addEventListener('click', function () {
    if (!confirm('Delete ' + button.dataset.name + '?')) { return; }
    fetch(button.dataset.delete, { method: 'DELETE' }).then(function (response) {
      if (response.ok) { location.reload(); return; }
      response.json().then(function (body) { alert(body.error); });
    });
  });
});
";

/// GET /
pub async fn index_handler(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Html<String>> {
    let data_files = state.store.list(FileKind::Data).await?;
    let scripts = state.store.list(FileKind::Script).await?;
    Ok(Html(render_page(&data_files, &scripts)))
}

fn render_page(data_files: &[StoredFile], scripts: &[StoredFile]) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Monitoring Data Dashboard</title>\n");
    let _ = writeln!(html, "<style>\n{}</style>", STYLE);
    html.push_str("</head>\n<body>\n<h1>Monitoring Data Dashboard</h1>\n");

    html.push_str("<h2>Data Files</h2>\n");
    html.push_str(&upload_form("/api/data", "Upload a data file"));
    if data_files.is_empty() {
        html.push_str("<p class=\"empty\">No data files uploaded yet.</p>\n");
    } else {
        html.push_str(
            "<table>\n<tr><th>Name</th><th>Format</th><th>Size</th><th>Views</th><th></th></tr>\n",
        );
        for file in data_files {
            let name = escape(&file.name);
            let path = file_path(FileKind::Data, &file.name);
            let views = match file.format {
                Some(format) if format.is_tabular() => format!(
                    "<a href=\"{p}/table\">table</a> \
                     <a href=\"{p}/summary\">summary</a> \
                     <a href=\"{p}/chart.png\">chart</a> \
                     <a href=\"{p}/chart.png?profile=true\">profile</a> \
                     <a href=\"{p}/sites\">map</a>",
                    p = path
                ),
                _ => "<span class=\"empty\">scripts only</span>".to_string(),
            };
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                name,
                file.format.map(|f| f.as_str()).unwrap_or("-"),
                format_size(file.size),
                views,
                delete_button(&path, &name)
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str("<h2>Scripts</h2>\n");
    html.push_str(&upload_form("/api/scripts", "Upload a script"));
    if scripts.is_empty() {
        html.push_str("<p class=\"empty\">No scripts uploaded yet.</p>\n");
    } else {
        html.push_str("<table>\n<tr><th>Name</th><th>Size</th><th>Actions</th></tr>\n");
        for script in scripts {
            let name = escape(&script.name);
            let path = file_path(FileKind::Script, &script.name);
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td><form method=\"post\" action=\"{p}/run\">\
                 <button type=\"submit\">Run</button></form> {}</td></tr>",
                name,
                format_size(script.size),
                delete_button(&path, &name),
                p = path
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str("<p><a href=\"/api/runs\">Recent runs</a></p>\n");
    let _ = writeln!(html, "<script>\n{}</script>", DELETE_SCRIPT);
    html.push_str("</body>\n</html>\n");
    html
}

/// API path of a stored file with the name percent-encoded as one segment.
fn file_path(kind: FileKind, name: &str) -> String {
    let collection = match kind {
        FileKind::Data => "data",
        FileKind::Script => "scripts",
    };
    format!("/api/{}/{}", collection, urlencoding::encode(name))
}

fn delete_button(path: &str, escaped_name: &str) -> String {
    format!(
        "<button type=\"button\" data-delete=\"{}\" data-name=\"{}\">Delete</button>",
        path, escaped_name
    )
}

fn upload_form(action: &str, label: &str) -> String {
    format!(
        "<form method=\"post\" action=\"{}\" enctype=\"multipart/form-data\">\
         <label>{} <input type=\"file\" name=\"file\"></label> \
         <button type=\"submit\">Upload</button></form>\n",
        action, label
    )
}

fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{} B", bytes)
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
