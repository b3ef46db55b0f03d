//! Root endpoint handler for the landing page.
//!
//! This module provides the `/` endpoint handler that displays
//! a landing page with the available endpoints and actions.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");

    // Calculate actual uptime from service start time
    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;
    let uptime_str = format!("{}h {}m {}s", hours, minutes, seconds);

    let interval = match state.config.reconcile_interval_seconds.unwrap_or(0) {
        0 => "on request".to_string(),
        secs => format!("every {}s", secs),
    };

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Herakles Process Control</title>
    <style>
        body {{ 
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; 
            margin: 0; 
            padding: 20px; 
            background: #f5f5f5; 
            line-height: 1.6;
        }}
        .container {{ 
            max-width: 900px; 
            margin: 0 auto; 
            background: white; 
            padding: 40px; 
            border-radius: 8px; 
            box-shadow: 0 2px 8px rgba(0,0,0,0.1); 
        }}
        h1 {{ 
            color: #333; 
            border-bottom: 3px solid #007bff; 
            padding-bottom: 15px; 
            margin-bottom: 10px;
        }}
        .subtitle {{
            color: #666;
            font-size: 1.1em;
            margin-bottom: 30px;
        }}
        h2 {{ 
            color: #555; 
            margin-top: 35px; 
            margin-bottom: 15px;
        }}
        .info {{ 
            background: #e9ecef; 
            padding: 15px; 
            border-radius: 4px; 
            margin: 20px 0;
            display: flex;
            justify-content: space-around;
            flex-wrap: wrap;
        }}
        .info-item {{
            margin: 10px;
        }}
        .info-label {{ 
            font-weight: 600; 
            color: #555; 
            display: block;
            font-size: 0.9em;
        }}
        .info-value {{ 
            font-size: 1.2em; 
            color: #007bff; 
        }}
        .endpoint-list {{
            list-style: none;
            padding: 0;
        }}
        .endpoint-list li {{
            margin: 20px 0;
            padding: 15px;
            background: #f8f9fa;
            border-left: 4px solid #007bff;
            border-radius: 4px;
        }}
        .endpoint-list a {{
            color: #007bff;
            text-decoration: none;
            font-weight: 600;
            font-size: 1.1em;
        }}
        .endpoint-list a:hover {{
            text-decoration: underline;
        }}
        .endpoint-desc {{
            color: #666;
            margin-top: 5px;
        }}
        .footer {{ 
            margin-top: 40px; 
            padding-top: 20px; 
            border-top: 1px solid #ddd; 
            color: #666; 
            font-size: 0.9em; 
            text-align: center;
        }}
        code {{
            background: #e9ecef;
            padding: 2px 6px;
            border-radius: 3px;
            font-family: 'Courier New', monospace;
        }}
    </style>
</head>
<body>
<div class="container">
    <h1>Herakles Process Control</h1>
    <p class="subtitle">Live process metrics, process termination and a reconciled kill list</p>

    <div class="info">
        <div class="info-item">
            <span class="info-label">Version</span>
            <span class="info-value">{version}</span>
        </div>
        <div class="info-item">
            <span class="info-label">Uptime</span>
            <span class="info-value">{uptime}</span>
        </div>
    </div>

    <div class="info">
        <div class="info-item">
            <span class="info-label">Kill list</span>
            <span class="info-value"><code>{kill_list}</code></span>
        </div>
        <div class="info-item">
            <span class="info-label">Reconcile interval</span>
            <span class="info-value">{interval}</span>
        </div>
    </div>

    <h2>Available Endpoints</h2>
    <ul class="endpoint-list">
        <li>
            <a href="/html/">/html/</a>
            <div class="endpoint-desc">Interactive dashboard: processes, kill list and network totals, refreshed every few seconds</div>
        </li>
        <li>
            <a href="/sysinfo?action=list">/sysinfo?action=list</a>
            <div class="endpoint-desc">Live processes with CPU/memory utilization and network totals (JSON)</div>
        </li>
        <li>
            <a href="/sysinfo?action=get_kill_list">/sysinfo?action=get_kill_list</a>
            <div class="endpoint-desc">Current kill list (JSON)</div>
        </li>
        <li>
            <a href="/sysinfo?action=kill_loop_check">/sysinfo?action=kill_loop_check</a>
            <div class="endpoint-desc">Run one reconciliation pass and report every outcome (JSON)</div>
        </li>
        <li>
            <code>/sysinfo?action=kill&amp;pid=N</code>,
            <code>add_kill_list&amp;pid=N</code>,
            <code>remove_kill_list&amp;pid=N</code>
            <div class="endpoint-desc">Kill a process now, or add/remove a kill list entry (GET query or POST form)</div>
        </li>
        <li>
            <a href="/health">/health</a>
            <div class="endpoint-desc">Service health (text)</div>
        </li>
        <li>
            <a href="/metrics">/metrics</a>
            <div class="endpoint-desc">Prometheus-compatible request and reconciliation counters</div>
        </li>
    </ul>

    <div class="footer">
        <p>{footer}</p>
    </div>
</div>
</body>
</html>"#,
        version = version,
        uptime = uptime_str,
        kill_list = state.kill_list_path.display(),
        interval = interval,
        footer = FOOTER_TEXT
    );

    Html(html)
}
