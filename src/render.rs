//! Diagnostic rendering and the viewer collaborator.
//!
//! The pipeline only ever talks to [`Renderer`] and [`ComponentViewer`];
//! [`SvgRenderer`] is the bundled implementation and writes one SVG file
//! per figure with `plotters`.
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::{IcaError, Result};
use crate::header::MegHeader;
use crate::ic::IndependentComponents;
use crate::removal::RemovalTrace;
use crate::verdict::{Panel, Verdict};

/// Draws diagnostic figures. Side effect only; nothing downstream reads
/// the output.
pub trait Renderer {
    fn render_verdict(&mut self, verdict: &Verdict, header: &MegHeader) -> Result<()>;
    fn render_removal(&mut self, traces: &[RemovalTrace], header: &MegHeader) -> Result<()>;
}

/// Interactive component browser. No implementation ships with the crate.
pub trait ComponentViewer {
    fn view(&mut self, ic: &IndependentComponents, reject: &[usize], header: Option<&MegHeader>) -> Result<()>;
}

/// SVG files under `out_dir`: `verdict.svg` and `removal.svg`.
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    pub out_dir: PathBuf,
    /// Size of a single panel in pixels.
    pub panel_size: (u32, u32),
}

impl SvgRenderer {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self { out_dir: out_dir.into(), panel_size: (480, 320) }
    }

    pub fn verdict_path(&self) -> PathBuf {
        self.out_dir.join("verdict.svg")
    }

    pub fn removal_path(&self) -> PathBuf {
        self.out_dir.join("removal.svg")
    }
}

fn render_err(e: impl std::fmt::Display) -> IcaError {
    IcaError::Render(e.to_string())
}

/// `[lo, hi]` covering every finite value, padded by 10 %.
fn value_range(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (-1.0, 1.0);
    }
    let pad = if hi > lo { 0.1 * (hi - lo) } else { 1.0 };
    (lo - pad, hi + pad)
}

fn draw_panel(area: &DrawingArea<SVGBackend<'_>, Shift>, panel: &Panel) -> Result<()> {
    let n = panel.values.len();
    let (y_lo, y_hi) = value_range(panel.values.iter().chain(&panel.thresholds).copied());

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 16).into_font())
        .margin(8)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5).max(0.5), y_lo..y_hi)
        .map_err(render_err)?;
    chart
        .configure_mesh()
        .x_desc("component")
        .y_desc(panel.ylabel.as_str())
        .draw()
        .map_err(render_err)?;

    let points: Vec<(f64, f64)> = panel
        .values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, &v)| (i as f64, v))
        .collect();
    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
        .map_err(render_err)?;
    chart
        .draw_series(points.iter().map(|&p| Circle::new(p, 2, BLUE.filled())))
        .map_err(render_err)?;

    for &t in &panel.thresholds {
        chart
            .draw_series(LineSeries::new(vec![(-0.5, t), (n as f64 - 0.5, t)], BLACK.mix(0.6)))
            .map_err(render_err)?;
    }
    chart
        .draw_series(
            panel
                .rejected
                .iter()
                .filter(|&&i| i < n && panel.values[i].is_finite())
                .map(|&i| Circle::new((i as f64, panel.values[i]), 4, RED.filled())),
        )
        .map_err(render_err)?;
    chart
        .draw_series(
            panel
                .merged
                .iter()
                .filter(|&&i| i < n && panel.values[i].is_finite())
                .map(|&i| Circle::new((i as f64, panel.values[i]), 7, RED.stroke_width(1))),
        )
        .map_err(render_err)?;
    Ok(())
}

fn draw_trace(area: &DrawingArea<SVGBackend<'_>, Shift>, trace: &RemovalTrace, header: &MegHeader) -> Result<()> {
    let n = trace.original.len();
    let dt = if header.sfreq > 0.0 { 1.0 / header.sfreq } else { 1.0 };
    let (y_lo, y_hi) = value_range(trace.original.iter().chain(&trace.cleaned).copied());

    let mut title = format!("IC {} on {}", trace.component + 1, header.channel_label(trace.channel));
    if let Some(e) = trace.epoch {
        title.push_str(&format!(", trial {}", e + 1));
    }
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 16).into_font())
        .margin(8)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..(n.max(1) as f64 * dt), y_lo..y_hi)
        .map_err(render_err)?;
    chart
        .configure_mesh()
        .x_desc(if header.sfreq > 0.0 { "time (s)" } else { "sample" })
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(LineSeries::new(
            trace.original.iter().enumerate().map(|(i, &v)| (i as f64 * dt, v)),
            &BLACK,
        ))
        .map_err(render_err)?
        .label("original")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));
    chart
        .draw_series(LineSeries::new(
            trace.cleaned.iter().enumerate().map(|(i, &v)| (i as f64 * dt, v)),
            &RED,
        ))
        .map_err(render_err)?
        .label("cleaned")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_err)?;
    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

impl Renderer for SvgRenderer {
    fn render_verdict(&mut self, verdict: &Verdict, _header: &MegHeader) -> Result<()> {
        let Some(layout) = verdict.layout else {
            log::debug!("no active criteria; nothing to draw");
            return Ok(());
        };
        ensure_dir(&self.out_dir)?;
        let path = self.verdict_path();
        let (w, h) = self.panel_size;
        let size = (w * layout.ncols as u32, h * layout.nrows as u32);

        let root = SVGBackend::new(&path, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        let areas = root.split_evenly((layout.nrows, layout.ncols));
        for (area, panel) in areas.iter().zip(&verdict.panels) {
            draw_panel(area, panel)?;
        }
        root.present().map_err(render_err)?;
        log::info!("wrote {}", path.display());
        Ok(())
    }

    fn render_removal(&mut self, traces: &[RemovalTrace], header: &MegHeader) -> Result<()> {
        if traces.is_empty() {
            return Ok(());
        }
        ensure_dir(&self.out_dir)?;
        let path = self.removal_path();
        let (w, h) = self.panel_size;
        let size = (w * 2, h * traces.len() as u32);

        let root = SVGBackend::new(&path, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        let areas = root.split_evenly((traces.len(), 1));
        for (area, trace) in areas.iter().zip(traces) {
            draw_trace(area, trace, header)?;
        }
        root.present().map_err(render_err)?;
        log::info!("wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::GridLayout;

    #[test]
    fn range_ignores_nan_and_pads_flat_data() {
        assert_eq!(value_range([f64::NAN, 2.0, 2.0]), (1.0, 3.0));
        assert_eq!(value_range(std::iter::empty()), (-1.0, 1.0));
        let (lo, hi) = value_range([0.0, 10.0]);
        approx::assert_abs_diff_eq!(lo, -1.0);
        approx::assert_abs_diff_eq!(hi, 11.0);
    }

    #[test]
    fn writes_svg_with_one_panel_per_criterion() {
        let dir = tempfile::tempdir().unwrap();
        let panel = Panel {
            title: "Kurtosis".into(),
            ylabel: "excess kurtosis".into(),
            values: vec![30.0, 2.0, f64::NAN],
            thresholds: vec![15.0],
            rejected: vec![0],
            merged: vec![0, 2],
        };
        let verdict = Verdict {
            keep: vec![1, 2],
            reject: vec![0],
            panels: vec![panel.clone(), panel],
            layout: GridLayout::for_panels(2),
        };
        let mut r = SvgRenderer::new(dir.path());
        r.render_verdict(&verdict, &MegHeader::default()).unwrap();

        let svg = std::fs::read_to_string(r.verdict_path()).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Kurtosis"));
    }

    #[test]
    fn nothing_written_without_layout() {
        let dir = tempfile::tempdir().unwrap();
        let verdict = Verdict { keep: vec![0], reject: vec![], panels: vec![], layout: None };
        let mut r = SvgRenderer::new(dir.path().join("figs"));
        r.render_verdict(&verdict, &MegHeader::default()).unwrap();
        assert!(!r.verdict_path().exists());
    }
}
