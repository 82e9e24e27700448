//! Server-rendered console page.
//!
//! Each form-post handler runs the action, records a banner for the outcome,
//! then re-fetches the table list before rendering — the same duplicated flow
//! on every action, kept deliberately simple.

use axum::{extract::State, response::Html, Form};
use serde::Deserialize;
use tracing::{error, info};

use service::{Row, TableSchema};

use crate::routes::ServerState;

#[derive(Debug, Deserialize)]
pub struct QueryForm {
    pub sql: String,
}

#[derive(Debug, Deserialize)]
pub struct TableForm {
    pub table_name: String,
}

/// Outcome of the last query submission, echoed back into the page.
struct QueryOutcome {
    sql: String,
    result: Result<Vec<Row>, String>,
}

#[derive(Default)]
struct PageContext {
    tables: Vec<String>,
    list_error: Option<String>,
    query: Option<QueryOutcome>,
    notice: Option<Result<String, String>>,
}

async fn fetch_tables(state: &ServerState, page: &mut PageContext) {
    match state.service.list_tables().await {
        Ok(tables) => page.tables = tables,
        Err(e) => {
            error!(error = %e, "table list fetch failed");
            page.list_error = Some(format!("failed to list tables: {}", e));
        }
    }
}

/// GET /
pub async fn console(State(state): State<ServerState>) -> Html<String> {
    let mut page = PageContext::default();
    fetch_tables(&state, &mut page).await;
    Html(render(&page))
}

/// POST /execute-query
pub async fn execute_query(
    State(state): State<ServerState>,
    Form(form): Form<QueryForm>,
) -> Html<String> {
    info!(sql = %form.sql, "console query submitted");
    let mut page = PageContext::default();
    let result = state
        .service
        .run_query(&form.sql)
        .await
        .map_err(|e| format!("query failed: {}", e));
    page.query = Some(QueryOutcome { sql: form.sql, result });
    fetch_tables(&state, &mut page).await;
    Html(render(&page))
}

/// POST /create-table
pub async fn create_table(
    State(state): State<ServerState>,
    Form(form): Form<TableForm>,
) -> Html<String> {
    info!(table = %form.table_name, "console table create submitted");
    let mut page = PageContext::default();
    page.notice = Some(
        state
            .service
            .create_table(&form.table_name, &TableSchema::sample())
            .await
            .map(|_| format!("table '{}' created", form.table_name))
            .map_err(|e| format!("failed to create table: {}", e)),
    );
    fetch_tables(&state, &mut page).await;
    Html(render(&page))
}

/// POST /delete-table
pub async fn delete_table(
    State(state): State<ServerState>,
    Form(form): Form<TableForm>,
) -> Html<String> {
    info!(table = %form.table_name, "console table delete submitted");
    let mut page = PageContext::default();
    page.notice = Some(
        state
            .service
            .delete_table(&form.table_name)
            .await
            .map(|_| format!("table '{}' deleted", form.table_name))
            .map_err(|e| format!("failed to delete table: {}", e)),
    );
    fetch_tables(&state, &mut page).await;
    Html(render(&page))
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn banner(out: &mut String, class: &str, text: &str) {
    out.push_str(&format!("<p class=\"{}\">{}</p>\n", class, escape(text)));
}

fn render(page: &PageContext) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head><title>BigQuery Console</title></head>\n<body>\n");
    out.push_str("<h1>BigQuery Console</h1>\n");

    if let Some(notice) = &page.notice {
        match notice {
            Ok(msg) => banner(&mut out, "success", msg),
            Err(msg) => banner(&mut out, "error", msg),
        }
    }

    // Query form and result
    out.push_str("<h2>Run Query</h2>\n");
    out.push_str("<form method=\"post\" action=\"/execute-query\">");
    out.push_str("<textarea name=\"sql\" rows=\"4\" cols=\"80\"></textarea>");
    out.push_str("<button type=\"submit\">Execute</button></form>\n");
    if let Some(query) = &page.query {
        match &query.result {
            Ok(rows) => {
                banner(
                    &mut out,
                    "success",
                    &format!("{} rows returned for: {}", rows.len(), query.sql),
                );
                render_rows(&mut out, rows);
            }
            Err(msg) => banner(&mut out, "error", msg),
        }
    }

    // Table list
    out.push_str("<h2>Tables</h2>\n");
    if let Some(msg) = &page.list_error {
        banner(&mut out, "error", msg);
    }
    out.push_str("<ul>\n");
    for table in &page.tables {
        out.push_str(&format!("<li>{}</li>\n", escape(table)));
    }
    out.push_str("</ul>\n");

    // Create / delete forms
    out.push_str("<h2>Create Table (sample schema)</h2>\n");
    out.push_str("<form method=\"post\" action=\"/create-table\">");
    out.push_str("<input name=\"table_name\" type=\"text\"/>");
    out.push_str("<button type=\"submit\">Create</button></form>\n");
    out.push_str("<h2>Delete Table</h2>\n");
    out.push_str("<form method=\"post\" action=\"/delete-table\">");
    out.push_str("<input name=\"table_name\" type=\"text\"/>");
    out.push_str("<button type=\"submit\">Delete</button></form>\n");

    out.push_str("</body>\n</html>\n");
    out
}

fn render_rows(out: &mut String, rows: &[Row]) {
    let Some(first) = rows.first() else {
        return;
    };
    let columns: Vec<&String> = first.keys().collect();
    out.push_str("<table border=\"1\">\n<tr>");
    for col in &columns {
        out.push_str(&format!("<th>{}</th>", escape(col)));
    }
    out.push_str("</tr>\n");
    for row in rows {
        out.push_str("<tr>");
        for col in &columns {
            let cell = match row.get(*col) {
                Some(serde_json::Value::Null) | None => String::new(),
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(v) => v.to_string(),
            };
            out.push_str(&format!("<td>{}</td>", escape(&cell)));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
}
