//! Analyze command: load or fetch events, build intervals, reduce windows.
//!
//! This module implements `occ analyze` with optional window splitting
//! (--split-minutes) and output formats (human-readable, JSON).

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use occ_core::{
    AnalysisWindow, BuilderConfig, PresenceEvent, TrackStats, WindowReport, analyze_windows,
    parse_timestamp,
};

use crate::Config;

/// Options resolved from the command line.
#[derive(Debug)]
pub struct AnalyzeOptions<'a> {
    pub start: &'a str,
    pub end: &'a str,
    pub channel: Option<&'a str>,
    pub input: Option<&'a Path>,
    pub split_minutes: Option<i64>,
    pub include_open: bool,
    pub json: bool,
}

// ========== Window Construction ==========

/// Divides the window into consecutive sub-windows of `minutes`, the last
/// one clamped to the window end. `None` keeps the window whole.
fn split_windows(window: &AnalysisWindow, minutes: Option<i64>) -> Result<Vec<AnalysisWindow>> {
    let Some(minutes) = minutes else {
        return Ok(vec![*window]);
    };
    if minutes <= 0 {
        bail!("--split-minutes must be positive, got {minutes}");
    }

    let step = Duration::minutes(minutes);
    let mut windows = Vec::new();
    let mut cursor = window.start();
    while cursor < window.end() {
        let next = window.end().min(cursor + step);
        windows.push(AnalysisWindow::new(cursor, next)?);
        cursor = next;
    }
    Ok(windows)
}

// ========== Event Acquisition ==========

/// Loads events from a local file or the configured history service.
fn load_events(
    config: &Config,
    opts: &AnalyzeOptions<'_>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<PresenceEvent>> {
    if let Some(path) = opts.input {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return Ok(occ_history::parse_history_body(&body)?);
    }

    let Some(channel) = opts.channel else {
        bail!("--channel is required when fetching from the history service");
    };
    let Some(service_url) = config.service_url.as_deref() else {
        bail!(
            "no history service configured; set service_url in config.toml \
             or OCC_SERVICE_URL, or pass --input <file>"
        );
    };

    let client = occ_history::Client::new(service_url, config.api_key.clone())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let events = runtime.block_on(client.fetch_presence(channel, start, end))?;
    tracing::debug!(channel, count = events.len(), "loaded events");
    Ok(events)
}

// ========== Duration Formatting ==========

/// Formats milliseconds as a duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm Ys" if >= 1 minute, "Xs" otherwise.
/// Negative durations are treated as 0s.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0s".to_string();
    }
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else if minutes >= 1 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

// ========== Coverage Bar ==========

/// Generates a 10-character coverage bar from a percentage.
/// Non-zero coverage below 5% gets a single block for visibility.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn coverage_bar(percent: f64) -> String {
    let filled = if percent > 0.0 && percent < 5.0 {
        1
    } else {
        (percent / 10.0).round().clamp(0.0, 10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

// ========== Report Rendering ==========

fn fmt_instant(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn write_track(output: &mut String, label: &str, stats: &TrackStats) {
    let duration = format_duration(stats.present_ms);
    let bar = coverage_bar(stats.present_percent);
    let earliest = stats.earliest_present.map_or_else(|| "none".to_string(), fmt_instant);
    writeln!(
        output,
        "  {label:<11}{duration:>8}  {:>5.1}%  {bar}  first seen {earliest}",
        stats.present_percent
    )
    .unwrap();
}

/// Formats the human-readable analysis output.
pub fn format_reports(channel: Option<&str>, reports: &[WindowReport]) -> String {
    let mut output = String::new();

    match channel {
        Some(name) => writeln!(output, "PRESENCE REPORT: channel {name}").unwrap(),
        None => writeln!(output, "PRESENCE REPORT").unwrap(),
    }

    for report in reports {
        writeln!(output).unwrap();
        writeln!(
            output,
            "Window {} .. {} ({})",
            fmt_instant(report.window.start()),
            fmt_instant(report.window.end()),
            format_duration(report.duration_ms)
        )
        .unwrap();
        write_track(&mut output, "Publisher", &report.publisher);
        write_track(&mut output, "Subscriber", &report.subscriber);
        write_track(&mut output, "Both", &report.both);
    }

    output
}

// ========== Public Interface ==========

/// Runs the analyze command.
pub fn run(config: &Config, opts: &AnalyzeOptions<'_>) -> Result<()> {
    let start = parse_timestamp(opts.start).context("invalid --start")?;
    let end = parse_timestamp(opts.end).context("invalid --end")?;
    let window = AnalysisWindow::new(start, end)?;

    let windows = split_windows(&window, opts.split_minutes)?;
    let events = load_events(config, opts, start, end)?;

    let builder = BuilderConfig {
        close_open_at: opts.include_open.then_some(window.end()),
    };
    let reports = analyze_windows(&events, &windows, &builder);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print!("{}", format_reports(opts.channel, &reports));
    }

    Ok(())
}
