/// tilesim results dashboard: renders a saved sweep in the terminal.
///
/// Run after a sweep with `save_detailed_results: true`:
///   cargo run --bin viz -- tilesim_gemm_results.json
///
/// Re-reads the file every 200ms, so re-running the sweep updates the view:
///
///     ┌ header: operation / hardware summary ───────────────────────┐
///     │ per-point phase shares (stacked) │ selected point: cycles,  │
///     │                                  │ reload, tier utilization │
///     │ ↑/↓: select  q/esc: quit  …footer…                          │
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame, Terminal,
};
use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};
use tilesim::analysis::{AnalysisRecord, SweepReport};
use tilesim::memory::{MemoryTier, KIB, MIB};
use tilesim::report::read_results;

const DRAM_COLOR: Color = Color::LightRed;
const LOCAL_COLOR: Color = Color::Blue;
const COMPUTE_COLOR: Color = Color::Green;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tilesim_gemm_results.json"));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &path);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, path: &Path) -> anyhow::Result<()> {
    let mut selected: usize = 0;
    loop {
        let report = read_results(path).ok();
        let count = report.as_ref().map_or(0, |r| r.records.len());
        selected = selected.min(count.saturating_sub(1));

        terminal.draw(|f| render(f, report.as_ref(), selected, path))?;

        // Non-blocking: poll for 200ms, then redraw regardless
        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Up => selected = selected.saturating_sub(1),
                    KeyCode::Down if selected + 1 < count => selected += 1,
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Top-level layout
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, report: Option<&SweepReport>, selected: usize, path: &Path) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(8),    // bars + details
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    render_header(f, rows[0], report);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(rows[1]);

    render_breakdown(f, cols[0], report, selected);
    render_details(f, cols[1], report.and_then(|r| r.records.get(selected).map(|rec| (r, rec))));
    render_footer(f, rows[2], path);
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

fn render_header(f: &mut Frame, area: Rect, report: Option<&SweepReport>) {
    let block = Block::default()
        .title(Span::styled(
            " tilesim sweep ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let spans = match report {
        None => vec![Span::styled(
            "  no results loaded",
            Style::default().fg(Color::DarkGray),
        )],
        Some(r) => {
            let hw = &r.hardware;
            vec![
                Span::styled("  operation: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    r.operation.to_string(),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                Span::styled("   points: ", Style::default().fg(Color::DarkGray)),
                Span::raw(format!("{} ({} skipped)", r.records.len(), r.skipped.len())),
                Span::styled("   DRAM/central/local: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!(
                        "{} MiB / {} KiB / {} KiB",
                        hw.dram_capacity_bytes / MIB,
                        hw.central_capacity_bytes / KIB,
                        hw.local_capacity_bytes / KIB
                    ),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled("   DMA: ", Style::default().fg(Color::DarkGray)),
                Span::raw(format!("{} B/cycle", hw.dma_bytes_per_cycle)),
            ]
        }
    };

    f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

// ---------------------------------------------------------------------------
// Phase breakdown bars
// ---------------------------------------------------------------------------

/// Split `width` cells between the three phases of one record.
fn bar_cells(record: &AnalysisRecord, width: usize) -> [usize; 3] {
    let l = &record.latency;
    if l.total_cycles == 0 {
        return [0, 0, 0];
    }
    let share = |cycles: u64| (cycles as f64 / l.total_cycles as f64 * width as f64).round() as usize;
    let dram = share(l.dram_to_central_cycles);
    let local = share(l.central_to_local_cycles).min(width - dram);
    [dram, local, width - dram - local]
}

fn render_breakdown(f: &mut Frame, area: Rect, report: Option<&SweepReport>, selected: usize) {
    let block = Block::default().title(" Cycle share per point ").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(report) = report else {
        let msg = Paragraph::new(vec![
            Line::raw(""),
            Line::from(Span::styled(
                "  No results file yet.",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                "  Run tilesim with save_detailed_results: true.",
                Style::default().fg(Color::DarkGray),
            )),
        ]);
        f.render_widget(msg, inner);
        return;
    };

    let legend = Line::from(vec![
        Span::styled("██", Style::default().fg(DRAM_COLOR)),
        Span::raw(" DRAM-Central   "),
        Span::styled("██", Style::default().fg(LOCAL_COLOR)),
        Span::raw(" Central-Local   "),
        Span::styled("██", Style::default().fg(COMPUTE_COLOR)),
        Span::raw(" Computation"),
    ]);
    let mut lines: Vec<Line> = vec![legend, Line::raw("")];

    // label (12) + space + bar + space + seconds (12)
    let bar_width = (inner.width as usize).saturating_sub(27).max(1);

    for (idx, record) in report.records.iter().enumerate() {
        let marker = if idx == selected { "▶ " } else { "  " };
        let label_style = if idx == selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let [dram, local, compute] = bar_cells(record, bar_width);
        let seconds = record.time(&report.hardware).total_s;
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(format!("{:<10} ", record.workload.label()), label_style),
            Span::styled("█".repeat(dram), Style::default().fg(DRAM_COLOR)),
            Span::styled("█".repeat(local), Style::default().fg(LOCAL_COLOR)),
            Span::styled("█".repeat(compute), Style::default().fg(COMPUTE_COLOR)),
            Span::styled(format!(" {:>11.6}s", seconds), Style::default().fg(Color::DarkGray)),
        ]));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

// ---------------------------------------------------------------------------
// Selected point
// ---------------------------------------------------------------------------

fn render_details(f: &mut Frame, area: Rect, selection: Option<(&SweepReport, &AnalysisRecord)>) {
    let block = Block::default().title(" Point ").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some((report, record)) = selection else {
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // DRAM gauge
            Constraint::Length(2), // central gauge
            Constraint::Length(2), // local gauge
            Constraint::Length(1), // spacer
            Constraint::Min(0),    // text stats
        ])
        .split(inner);

    for (row, tier) in MemoryTier::ALL.into_iter().enumerate() {
        let frac = record.utilization.get(tier);
        let pct = (frac * 100.0).clamp(0.0, 100.0) as u16;
        let color = match pct {
            0..=50 => Color::Green,
            51..=99 => Color::Yellow,
            _ => Color::Red,
        };
        let gauge = Gauge::default()
            .block(Block::default().title(format!(
                "{tier} ({} cycle access)",
                report.hardware.latency_cycles(tier)
            )))
            .gauge_style(Style::default().fg(color))
            .percent(pct)
            .label(format!("{:.2}%", frac * 100.0));
        f.render_widget(gauge, rows[row]);
    }

    let l = &record.latency;
    let t = &record.traffic;
    let stat = |name: &'static str, value: String| {
        Line::from(vec![
            Span::styled(name, Style::default().fg(Color::DarkGray)),
            Span::raw(value),
        ])
    };
    let text = vec![
        stat("Point:      ", record.workload.label()),
        stat("Placement:  ", t.placement.to_string()),
        stat("Footprint:  ", format!("{} B", record.footprint.total_bytes)),
        stat("Working set:", format!(" {} B", t.working_set_bytes)),
        stat("Reload:     ", format!("{:.3}", t.reload)),
        Line::raw(""),
        stat("DRAM cyc:   ", l.dram_to_central_cycles.to_string()),
        stat("Local cyc:  ", l.central_to_local_cycles.to_string()),
        stat("Compute cyc:", format!(" {}", l.computation_cycles)),
        stat("Total cyc:  ", l.total_cycles.to_string()),
        stat("Total time: ", format!("{:.6} s", record.time(&report.hardware).total_s)),
    ];
    f.render_widget(Paragraph::new(text), rows[4]);
}

// ---------------------------------------------------------------------------
// Footer
// ---------------------------------------------------------------------------

fn render_footer(f: &mut Frame, area: Rect, path: &Path) {
    let text = Paragraph::new(Span::styled(
        format!(
            "  ↑/↓: select point    q / esc: quit    refreshes every 200ms    reads {}",
            path.display()
        ),
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(text, area);
}
