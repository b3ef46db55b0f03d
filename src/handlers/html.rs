//! Interactive HTML dashboard.
//!
//! The page renders the kill list server-side and then drives `/sysinfo`
//! from the browser: the process table with per-row Kill and Add buttons,
//! the network counters, a kill-list manager, and a periodic refresh that
//! also runs `kill_loop_check`.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use herakles_process_control::{KillListEntry, KillListStore};
use std::path::Path;
use tracing::{debug, error, instrument};

use crate::handlers::health::{format_uptime, FOOTER_TEXT};
use crate::state::SharedState;

/// Browser refresh period; every refresh also reconciles the kill list.
pub const REFRESH_MS: u64 = 7000;

/// Escapes text for element content and quoted attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

/// Generate HTML header.
fn html_header(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Herakles Process Control</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 0; padding: 20px; background: #f5f5f5; }}
        .container {{ max-width: 1400px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        h1 {{ color: #333; border-bottom: 3px solid #007bff; padding-bottom: 10px; }}
        h2 {{ color: #555; margin-top: 30px; }}
        nav {{ background: #007bff; padding: 15px; border-radius: 4px; margin-bottom: 20px; }}
        nav a {{ color: white; text-decoration: none; margin-right: 20px; font-weight: 500; }}
        table {{ border-collapse: collapse; width: 100%; margin: 20px 0; }}
        th {{ background: #007bff; color: white; padding: 10px; text-align: left; font-weight: 600; }}
        td {{ padding: 8px 10px; border-bottom: 1px solid #ddd; }}
        tr:hover {{ background: #f8f9fa; }}
        tr.system-process {{ background: #fff3cd; }}
        tr.listed-process td:first-child {{ border-left: 4px solid #dc3545; }}
        button {{ padding: 4px 10px; margin-right: 4px; border: 1px solid #007bff; background: white; color: #007bff; border-radius: 4px; cursor: pointer; }}
        button.danger {{ border-color: #dc3545; color: #dc3545; }}
        input[type=text] {{ padding: 4px 8px; border: 1px solid #ccc; border-radius: 4px; }}
        .metric {{ display: inline-block; margin: 10px 20px 10px 0; padding: 10px 15px; background: #e9ecef; border-radius: 4px; }}
        .metric-label {{ font-weight: 600; color: #555; }}
        .metric-value {{ font-size: 1.2em; color: #007bff; }}
        #status {{ min-height: 1.5em; margin: 10px 0; font-weight: 600; }}
        .status-success {{ color: #28a745; }}
        .status-info {{ color: #007bff; }}
        .status-error {{ color: #dc3545; }}
        .footer {{ margin-top: 40px; padding-top: 20px; border-top: 1px solid #ddd; color: #666; font-size: 0.9em; }}
    </style>
</head>
<body>
<div class="container">
<nav>
    <a href="/">Home</a>
    <a href="/html/">Dashboard</a>
    <a href="/health">Health</a>
    <a href="/metrics">Metrics</a>
</nav>
"#
    )
}

/// Generate HTML footer.
fn html_footer() -> String {
    format!(
        r#"<div class="footer">
    <p>{}</p>
</div>
</div>
</body>
</html>"#,
        FOOTER_TEXT
    )
}

/// Rows of the kill-list manager; also re-rendered by the script.
fn render_kill_list_rows(entries: &[KillListEntry]) -> String {
    if entries.is_empty() {
        return r#"<tr><td colspan="4">Kill list is empty.</td></tr>"#.to_string();
    }

    let mut rows = String::new();
    for entry in entries {
        let added = entry
            .added_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".into());
        rows.push_str(&format!(
            r#"<tr><td>{pid}</td><td>{label}</td><td>{added}</td><td><button class="danger" data-remove="{pid}">Remove</button></td></tr>"#,
            pid = entry.pid,
            label = escape_html(entry.label.as_deref().unwrap_or("")),
            added = added,
        ));
        rows.push('\n');
    }
    rows
}

/// Renders the full dashboard page.
pub fn render_dashboard(kill_list_path: &Path, entries: &[KillListEntry], uptime: &str) -> String {
    let mut html = html_header("Dashboard");
    html.push_str("<h1>Process Dashboard</h1>\n");

    html.push_str(&format!(
        r#"<div class="metric"><span class="metric-label">Uptime:</span> <span class="metric-value">{}</span></div>"#,
        escape_html(uptime)
    ));
    html.push_str(&format!(
        r#"<div class="metric"><span class="metric-label">Kill list:</span> <span class="metric-value">{}</span></div>"#,
        escape_html(&kill_list_path.display().to_string())
    ));
    html.push_str(&format!(
        r#"<div class="metric"><span class="metric-label">Refresh:</span> <span class="metric-value">{}s</span></div>"#,
        REFRESH_MS / 1000
    ));
    html.push_str("\n<div id=\"status\"></div>\n");

    html.push_str(
        r#"<h2>Kill List</h2>
<p>
    <input type="text" id="kl-pid" placeholder="PID">
    <input type="text" id="kl-label" placeholder="Label (optional)">
    <button id="kl-add">Add</button>
    <button class="danger" id="kl-remove">Remove</button>
    <button id="kl-reconcile">Reconcile now</button>
</p>
<table>
<thead><tr><th>PID</th><th>Label</th><th>Added</th><th>Actions</th></tr></thead>
<tbody id="kill-list-body">
"#,
    );
    html.push_str(&render_kill_list_rows(entries));
    html.push_str("</tbody>\n</table>\n");

    html.push_str(
        r#"<h2>Network</h2>
<div id="network-stats"><p>Loading network data...</p></div>
<h2>Processes <button id="refresh">Refresh</button></h2>
<table>
<thead><tr><th>Name</th><th>PID</th><th>CPU %</th><th>Memory %</th><th>Parent PID</th><th>User</th><th>System</th><th>Actions</th></tr></thead>
<tbody id="process-body"><tr><td colspan="8">Loading process data...</td></tr></tbody>
</table>
"#,
    );

    html.push_str(&format!(
        "<script>const REFRESH_MS = {};</script>\n",
        REFRESH_MS
    ));
    html.push_str(DASHBOARD_SCRIPT);
    html.push_str(&html_footer());
    html
}

/// Handler for /html/.
#[instrument(skip(state))]
pub async fn html_dashboard_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /html/ request");

    let store = state.store();
    let entries = match tokio::task::spawn_blocking(move || store.load()).await {
        Ok(entries) => entries,
        Err(e) => {
            error!("Failed to load kill list for dashboard: {}", e);
            Vec::new()
        }
    };

    let uptime = format_uptime(state.start_time.elapsed().as_secs());
    Html(render_dashboard(&state.kill_list_path, &entries, &uptime))
}

/// Browser side of the dashboard. Data from `/sysinfo` is inserted with
/// `textContent` only.
const DASHBOARD_SCRIPT: &str = r#"<script>
(function () {
    const statusDiv = document.getElementById('status');
    const processBody = document.getElementById('process-body');
    const killListBody = document.getElementById('kill-list-body');
    const networkDiv = document.getElementById('network-stats');
    let listed = new Set();

    async function sysinfo(action, params) {
        const body = new URLSearchParams(params || {});
        body.append('action', action);
        const response = await fetch('/sysinfo', { method: 'POST', body: body });
        if (!response.ok) {
            throw new Error('HTTP ' + response.status);
        }
        return response.json();
    }

    function showStatus(message, status) {
        statusDiv.textContent = message || '';
        statusDiv.className = 'status-' + (status || 'info');
    }

    function cell(row, text) {
        const td = document.createElement('td');
        td.textContent = text;
        row.appendChild(td);
        return td;
    }

    function button(parent, label, onClick, danger) {
        const b = document.createElement('button');
        b.textContent = label;
        if (danger) {
            b.className = 'danger';
        }
        b.addEventListener('click', onClick);
        parent.appendChild(b);
    }

    function renderKillList(entries) {
        listed = new Set(entries.map(e => e.pid));
        killListBody.replaceChildren();
        if (entries.length === 0) {
            const row = killListBody.insertRow();
            cell(row, 'Kill list is empty.').colSpan = 4;
            return;
        }
        entries.forEach(entry => {
            const row = killListBody.insertRow();
            cell(row, String(entry.pid));
            cell(row, entry.label || '');
            cell(row, entry.added_at || '-');
            button(cell(row, ''), 'Remove', () => removeEntry(entry.pid), true);
        });
    }

    function renderProcesses(processes) {
        processBody.replaceChildren();
        if (!processes || processes.length === 0) {
            cell(processBody.insertRow(), 'No process data available.').colSpan = 8;
            return;
        }
        processes.forEach(p => {
            const row = processBody.insertRow();
            const classes = [];
            if (p.is_system_process) classes.push('system-process');
            if (listed.has(p.pid)) classes.push('listed-process');
            row.className = classes.join(' ');
            cell(row, p.name);
            cell(row, String(p.pid));
            cell(row, p.cpu_percent.toFixed(2) + '%');
            cell(row, p.memory_percent.toFixed(2) + '%');
            cell(row, String(p.ppid));
            cell(row, p.username);
            cell(row, p.is_system_process ? 'Yes' : 'No');
            const actions = cell(row, '');
            button(actions, 'Kill', () => killProcess(p.pid), true);
            button(actions, 'Add to Kill List', () => addEntry(p.pid, ''));
        });
    }

    function renderNetwork(stats) {
        networkDiv.replaceChildren();
        if (!stats) {
            networkDiv.textContent = 'No network data available.';
            return;
        }
        Object.keys(stats).forEach(key => {
            const span = document.createElement('span');
            span.className = 'metric';
            span.textContent = key.replace(/_/g, ' ') + ': ' + stats[key];
            networkDiv.appendChild(span);
        });
    }

    async function loadKillList() {
        const result = await sysinfo('get_kill_list');
        if (result.status === 'success') {
            renderKillList(result.kill_list);
        }
    }

    async function reconcile() {
        const result = await sysinfo('kill_loop_check');
        if (result.status === 'error') {
            showStatus(result.message, 'error');
        } else if (result.processed_count > 0) {
            showStatus('Kill loop: ' + result.terminated_count + ' terminated, ' +
                result.already_gone_count + ' already gone, ' + result.denied_count +
                ' denied, ' + result.failed_count + ' failed', 'info');
        }
        await loadKillList();
    }

    async function refresh() {
        try {
            await loadKillList();
            const data = await sysinfo('list');
            if (data.status !== 'success') {
                throw new Error(data.message || 'Failed to load data');
            }
            renderProcesses(data.processes);
            renderNetwork(data.network_stats);
            await reconcile();
        } catch (e) {
            showStatus('Error loading data: ' + e.message, 'error');
        }
    }

    async function killProcess(pid) {
        if (!confirm('Kill process ' + pid + '?')) {
            return;
        }
        const result = await sysinfo('kill', { pid: pid });
        showStatus(result.message, result.status);
        if (result.status === 'success') {
            refresh();
        }
    }

    async function addEntry(pid, label) {
        const params = { pid: pid };
        if (label) {
            params.label = label;
        }
        const result = await sysinfo('add_kill_list', params);
        showStatus(result.message, result.status);
        if (result.kill_list) {
            renderKillList(result.kill_list);
        }
    }

    async function removeEntry(pid) {
        if (!confirm('Remove PID ' + pid + ' from the kill list?')) {
            return;
        }
        const result = await sysinfo('remove_kill_list', { pid: pid });
        showStatus(result.message, result.status);
        if (result.kill_list) {
            renderKillList(result.kill_list);
        }
    }

    function pidInput() {
        const raw = document.getElementById('kl-pid').value.trim();
        if (!/^\d+$/.test(raw) || parseInt(raw, 10) <= 0) {
            showStatus('Please enter a valid positive PID.', 'error');
            return null;
        }
        return raw;
    }

    document.getElementById('kl-add').addEventListener('click', () => {
        const pid = pidInput();
        if (pid) {
            addEntry(pid, document.getElementById('kl-label').value.trim());
        }
    });
    document.getElementById('kl-remove').addEventListener('click', () => {
        const pid = pidInput();
        if (pid) {
            removeEntry(pid);
        }
    });
    document.getElementById('kl-reconcile').addEventListener('click', () => reconcile());
    document.getElementById('refresh').addEventListener('click', () => refresh());
    killListBody.querySelectorAll('button[data-remove]').forEach(b => {
        b.addEventListener('click', () => removeEntry(b.dataset.remove));
    });

    refresh();
    setInterval(refresh, REFRESH_MS);
})();
</script>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use herakles_process_control::ProcessId;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b a="1">&'x'</b>"#),
            "&lt;b a=&quot;1&quot;&gt;&amp;&#39;x&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_dashboard_renders_kill_list_and_actions() {
        let entries = vec![
            KillListEntry::new(ProcessId::new(4242).unwrap()).with_label("<script>x</script>"),
            KillListEntry::new(ProcessId::new(7).unwrap()),
        ];
        let page = render_dashboard(Path::new("/tmp/kl.json"), &entries, "1.0 hours");

        assert!(page.contains(r#"data-remove="4242""#));
        assert!(page.contains(r#"data-remove="7""#));
        assert!(page.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(!page.contains("<script>x</script>"));
        assert!(page.contains("/tmp/kl.json"));
        for action in ["'list'", "'kill'", "'add_kill_list'", "'remove_kill_list'", "'get_kill_list'", "'kill_loop_check'"] {
            assert!(page.contains(action), "missing action {}", action);
        }
        assert!(page.contains(&format!("const REFRESH_MS = {};", REFRESH_MS)));
    }

    #[test]
    fn test_dashboard_empty_kill_list() {
        let page = render_dashboard(Path::new("/var/lib/herakles/kill_list.json"), &[], "2.0 minutes");
        assert!(page.contains("Kill list is empty."));
        assert!(page.contains(FOOTER_TEXT));
    }
}
