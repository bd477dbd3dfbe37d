//! Null distribution figure
//!
//! Draws the density histogram of the null samples with a KDE overlay, a
//! vertical marker at the observed statistic, and an arrow annotating the gap
//! to the largest null sample. The figure is 10x6 inches at the configured
//! DPI and is written as PNG with a `pHYs` chunk carrying that DPI.
//!
//! Text needs a TrueType font. One is loaded at runtime (configured path or a
//! well-known system location); without one the figure is drawn without text.

use crate::error::RenderError;
use crate::stats::{density_histogram, kde_curve, DensityHistogram};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use plotters_backend::DrawingErrorKind;
use std::collections::HashMap;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

pub const FIGURE_WIDTH_IN: f64 = 10.0;
pub const FIGURE_HEIGHT_IN: f64 = 6.0;

const TITLE: &str = "True Null Model Validation: Specific Phases vs. Random Phases";
const X_DESC: &str = "Mean Gain Difference (Dual - Single)";
const Y_DESC: &str = "Density";
const NULL_LABEL: &str = "Null Model (Random Phases)";

const FONT_FAMILY: &str = "sans-serif";
const KDE_GRID_POINTS: usize = 200;
const ARROW_SHRINK: f64 = 0.05;

/// Annotation anchors in data coordinates (y)
const ANNOTATION_TIP_Y: f64 = 0.001;
const ANNOTATION_TEXT_Y: f64 = 0.005;

const NULL_GREY: RGBColor = RGBColor(0x99, 0x99, 0x99);
const OBSERVED_RED: RGBColor = RGBColor(0xD6, 0x27, 0x28);

/// Searched in order when no font is configured
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loaded font bytes per requested path (`None` key is the system search)
type FontCache = HashMap<Option<PathBuf>, Option<&'static [u8]>>;

static TEXT_FONTS: OnceLock<Mutex<FontCache>> = OnceLock::new();

type BitmapError = <BitMapBackend<'static> as DrawingBackend>::ErrorType;

/// Everything the figure shows
#[derive(Debug, Clone, Copy)]
pub struct NullModelFigure<'a> {
    pub null_samples: &'a [f64],
    pub real_diff: f64,
    pub max_random: f64,
    pub dpi: u32,
}

impl NullModelFigure<'_> {
    /// Pixel dimensions of the figure at its DPI
    pub fn pixel_size(&self) -> (u32, u32) {
        let dpi = self.dpi as f64;
        (
            (FIGURE_WIDTH_IN * dpi).round() as u32,
            (FIGURE_HEIGHT_IN * dpi).round() as u32,
        )
    }

    /// Points (1/72 inch) to pixels
    fn px(&self, points: f64) -> f64 {
        points * self.dpi as f64 / 72.0
    }

    fn stroke(&self, points: f64) -> u32 {
        self.px(points).round().max(1.0) as u32
    }
}

/// Writes a figure to a file
pub trait Renderer {
    fn render(&self, figure: &NullModelFigure<'_>, output_path: &Path) -> Result<(), RenderError>;
}

/// Bitmap renderer built on plotters, encoding PNG with DPI metadata
#[derive(Debug, Clone, Default)]
pub struct PlottersRenderer {
    font_path: Option<PathBuf>,
}

impl PlottersRenderer {
    pub fn new(font_path: Option<PathBuf>) -> Self {
        Self { font_path }
    }
}

impl Renderer for PlottersRenderer {
    fn render(&self, figure: &NullModelFigure<'_>, output_path: &Path) -> Result<(), RenderError> {
        if !figure.real_diff.is_finite() {
            return Err(RenderError::Draw(format!(
                "observed statistic is not finite: {}",
                figure.real_diff
            )));
        }

        let (width, height) = figure.pixel_size();
        let mut buffer = vec![0u8; width as usize * height as usize * 3];

        with_text_font(self.font_path.as_deref(), |with_text| {
            match draw_into(&mut buffer, (width, height), figure, with_text) {
                Err(DrawingAreaErrorKind::BackendError(DrawingErrorKind::FontError(err)))
                    if with_text =>
                {
                    tracing::warn!(error = %err, "Font rendering failed, drawing figure without text");
                    draw_into(&mut buffer, (width, height), figure, false).map_err(draw_error)
                }
                result => result.map_err(draw_error),
            }
        })?;

        write_png(output_path, &buffer, (width, height), figure.dpi)?;
        tracing::info!(path = %output_path.display(), width, height, dpi = figure.dpi, "Wrote figure");
        Ok(())
    }
}

/// Render the null distribution figure with the default renderer
pub fn render(
    null_samples: &[f64],
    real_diff: f64,
    max_random: f64,
    output_path: &Path,
    dpi: u32,
) -> Result<(), RenderError> {
    let figure = NullModelFigure {
        null_samples,
        real_diff,
        max_random,
        dpi,
    };
    PlottersRenderer::default().render(&figure, output_path)
}

fn draw_error(err: DrawingAreaErrorKind<BitmapError>) -> RenderError {
    RenderError::Draw(err.to_string())
}

/// Run `draw` with this renderer's font registered as the figure family
///
/// The family is process-global in plotters, so the lock is held while
/// drawing. `draw` receives false when no usable font was found.
fn with_text_font<T>(font_path: Option<&Path>, draw: impl FnOnce(bool) -> T) -> T {
    let fonts = TEXT_FONTS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut fonts = fonts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let bytes = *fonts
        .entry(font_path.map(Path::to_path_buf))
        .or_insert_with(|| load_text_font(font_path));
    let with_text = match bytes {
        Some(bytes) => register_font(FONT_FAMILY, FontStyle::Normal, bytes).is_ok(),
        None => false,
    };

    draw(with_text)
}

/// Read the first usable font: the configured path, else the system candidates
fn load_text_font(font_path: Option<&Path>) -> Option<&'static [u8]> {
    let candidates: Vec<PathBuf> = match font_path {
        Some(path) => vec![path.to_path_buf()],
        None => SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from).collect(),
    };

    for path in candidates {
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                if font_path.is_some() {
                    tracing::warn!(path = %path.display(), error = %err, "Cannot read font");
                }
                continue;
            }
        };

        // plotters keeps registered fonts for the life of the process
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Loaded figure font");
                return Some(bytes);
            }
            Err(_) => {
                tracing::warn!(path = %path.display(), "Invalid font file");
            }
        }
    }

    tracing::warn!("No usable TrueType font found, figure text will be omitted");
    None
}

fn draw_into(
    buffer: &mut [u8],
    size: (u32, u32),
    figure: &NullModelFigure<'_>,
    with_text: bool,
) -> Result<(), DrawingAreaErrorKind<BitmapError>> {
    let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
    draw_figure(&root, figure, with_text)?;
    root.present()
}

/// x and y ranges covering the histogram, the marker and the annotation
fn axis_ranges(
    figure: &NullModelFigure<'_>,
    hist: &DensityHistogram,
    kde: &[(f64, f64)],
) -> (Range<f64>, Range<f64>) {
    let mut lo = figure.real_diff.min(figure.real_diff / 2.0);
    let mut hi = figure.real_diff.max(figure.real_diff / 2.0);
    if let (Some(&first), Some(&last)) = (hist.edges.first(), hist.edges.last()) {
        lo = lo.min(first);
        hi = hi.max(last);
    }
    let span = if hi > lo { hi - lo } else { 1.0 };
    let x_range = (lo - span * 0.05)..(hi + span * 0.05);

    let kde_max = kde.iter().map(|&(_, d)| d).fold(0.0, f64::max);
    let y_top = hist.max_density().max(kde_max).max(ANNOTATION_TEXT_Y * 2.0) * 1.05;

    (x_range, 0.0..y_top)
}

fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &NullModelFigure<'_>,
    with_text: bool,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let hist = density_histogram(figure.null_samples);
    let kde = kde_curve(figure.null_samples, KDE_GRID_POINTS);
    let (x_range, y_range) = axis_ranges(figure, &hist, &kde);

    let mut builder = ChartBuilder::on(root);
    builder.margin(figure.px(12.0) as u32);
    if with_text {
        builder
            .caption(TITLE, (FONT_FAMILY, figure.px(14.0)))
            .x_label_area_size(figure.px(36.0) as u32)
            .y_label_area_size(figure.px(48.0) as u32);
    }
    let mut chart = builder.build_cartesian_2d(x_range.clone(), y_range.clone())?;

    let grid_style = BLACK.mix(0.3).stroke_width(figure.stroke(0.8));
    if with_text {
        chart
            .configure_mesh()
            .x_desc(X_DESC)
            .y_desc(Y_DESC)
            .axis_desc_style((FONT_FAMILY, figure.px(12.0)))
            .label_style((FONT_FAMILY, figure.px(10.0)))
            .bold_line_style(grid_style)
            .light_line_style(WHITE.mix(0.0).stroke_width(0))
            .draw()?;
    } else {
        // Grid only; tick labels need a font
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            let x = x_range.start + (x_range.end - x_range.start) * t;
            let y = y_range.start + (y_range.end - y_range.start) * t;
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(x, y_range.start), (x, y_range.end)],
                grid_style,
            )))?;
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(x_range.start, y), (x_range.end, y)],
                grid_style,
            )))?;
        }
    }

    let legend_len = figure.px(20.0) as i32;
    let legend_half = figure.px(5.0) as i32;

    let bar_style = NULL_GREY.mix(0.6).filled();
    chart
        .draw_series(
            hist.bars()
                .map(|(left, right, density)| Rectangle::new([(left, 0.0), (right, density)], bar_style)),
        )?
        .label(NULL_LABEL)
        .legend(move |(x, y)| {
            Rectangle::new([(x, y - legend_half), (x + legend_len, y + legend_half)], bar_style)
        });

    chart.draw_series(LineSeries::new(
        kde.iter().copied(),
        NULL_GREY.stroke_width(figure.stroke(1.5)),
    ))?;

    let marker_style = OBSERVED_RED.stroke_width(figure.stroke(3.0));
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(figure.real_diff, y_range.start), (figure.real_diff, y_range.end)],
            marker_style,
        )))?
        .label(format!("Observed Real Data (Diff={:.0})", figure.real_diff))
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + legend_len, y)], marker_style));

    // Arrow from the annotation text to the marker, both ends shrunk
    let tip = chart.backend_coord(&(figure.real_diff, ANNOTATION_TIP_Y));
    let tail = chart.backend_coord(&(figure.real_diff / 2.0, ANNOTATION_TEXT_Y));
    let (dx, dy) = ((tip.0 - tail.0) as f64, (tip.1 - tail.1) as f64);
    let length = (dx * dx + dy * dy).sqrt();
    if length >= 1.0 {
        let (ux, uy) = (dx / length, dy / length);
        let shrink = length * ARROW_SHRINK;
        let start = (
            tail.0 + (ux * shrink) as i32,
            tail.1 + (uy * shrink) as i32,
        );
        let end = (tip.0 - (ux * shrink) as i32, tip.1 - (uy * shrink) as i32);

        let head_len = figure.px(10.0).min(length / 2.0);
        let head_half = figure.px(4.0);
        let base = (end.0 as f64 - ux * head_len, end.1 as f64 - uy * head_len);
        let head = vec![
            end,
            ((base.0 - uy * head_half) as i32, (base.1 + ux * head_half) as i32),
            ((base.0 + uy * head_half) as i32, (base.1 - ux * head_half) as i32),
        ];

        root.draw(&PathElement::new(
            vec![start, (base.0 as i32, base.1 as i32)],
            BLACK.stroke_width(figure.stroke(1.5)),
        ))?;
        root.draw(&Polygon::new(head, BLACK.filled()))?;
    }

    if with_text {
        let font_px = figure.px(12.0);
        root.draw(&Text::new(
            format!(
                "Gap: {:.0} (Significance!)",
                figure.real_diff - figure.max_random
            ),
            (tail.0, tail.1 - font_px as i32),
            (FONT_FAMILY, font_px).into_font(),
        ))?;

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font((FONT_FAMILY, font_px))
            .legend_area_size(legend_len + legend_half)
            .background_style(WHITE.mix(0.8).filled())
            .border_style(BLACK.mix(0.3).stroke_width(1))
            .draw()?;
    }

    Ok(())
}

/// PNG pixels-per-meter for a DPI
pub fn pixels_per_meter(dpi: u32) -> u32 {
    (dpi as f64 / 0.0254).round() as u32
}

/// Encode RGB pixels as PNG with a `pHYs` chunk and write them to `path`
///
/// The image is encoded in memory and written in one call, replacing any
/// existing file.
fn write_png(path: &Path, rgb: &[u8], size: (u32, u32), dpi: u32) -> Result<(), RenderError> {
    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, size.0, size.1);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let ppm = pixels_per_meter(dpi);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));

        let mut writer = encoder.write_header()?;
        writer.write_image_data(rgb)?;
        writer.finish()?;
    }

    fs::write(path, &bytes)?;
    Ok(())
}
