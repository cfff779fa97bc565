use std::path::{Path, PathBuf};

use plotters::prelude::*;
use uuid::Uuid;

use crate::config::ChartPathMode;
use crate::types::{AppError, AppResult};

pub const SHARED_CHART_FILE: &str = "trial_status.png";

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);

/// Renders the status distribution. Called from a blocking thread.
pub trait ChartRenderer: Send + Sync {
    fn render_status_chart(&self, counts: &[(String, usize)], output_path: &Path) -> AppResult<()>;
}

/// Output location for a run's status chart
pub fn chart_path(output_dir: &Path, mode: ChartPathMode, run_id: Uuid) -> PathBuf {
    match mode {
        ChartPathMode::PerRun => output_dir.join(format!("trial_status-{}.png", run_id)),
        ChartPathMode::Shared => output_dir.join(SHARED_CHART_FILE),
    }
}

/// PNG bar chart via plotters' bitmap backend
#[derive(Debug, Clone)]
pub struct PlottersChartRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for PlottersChartRenderer {
    fn default() -> Self {
        Self { width: 600, height: 400 }
    }
}

impl ChartRenderer for PlottersChartRenderer {
    fn render_status_chart(&self, counts: &[(String, usize)], output_path: &Path) -> AppResult<()> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_status_bar_chart(output_path, counts, (self.width, self.height))
            .map_err(|e| AppError::Chart(format!("{}: {}", output_path.display(), e)))
    }
}

pub fn write_status_bar_chart(
    output_path: &Path,
    counts: &[(String, usize)],
    size: (u32, u32),
) -> Result<(), Box<dyn std::error::Error>> {
    let bars = counts.len().max(1);
    let max_count = counts.iter().map(|(_, c)| *c as u32).max().unwrap_or(0);
    // Headroom above the tallest bar
    let y_max = max_count + (max_count / 10).max(1);

    let root = BitMapBackend::new(output_path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("COVID-19 Trials by Status", ("sans-serif", 22))
        .x_label_area_size(60)
        .y_label_area_size(50)
        .build_cartesian_2d((0..bars).into_segmented(), 0u32..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Status")
        .y_desc("Count")
        .x_labels(bars)
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(idx) => counts.get(*idx).map(|(label, _)| label.clone()).unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(SKY_BLUE.filled())
            .margin(8)
            .data(counts.iter().enumerate().map(|(idx, (_, count))| (idx, *count as u32))),
    )?;

    root.present()?;
    Ok(())
}
