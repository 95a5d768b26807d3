//! Raster charts for the two summary tables.
//!
//! Charts are drawn into an in-memory RGB buffer with `plotters` and encoded
//! as PNG. Sizes follow an inch-based layout at [`CHART_DPI`], so a chart that
//! is `8in` wide is `1200px` wide.

use std::{fmt::Display, ops::Range, sync::OnceLock};

use image::{ColorType, ImageEncoder, codecs::png::PngEncoder};
use log::debug;
use plotters::{
    coord::ranged1d::SegmentValue,
    prelude::*,
    style::{
        FontTransform, register_font,
        text_anchor::{HPos, Pos, VPos},
    },
};
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{
    aggregate::{MonthSummary, ProductSummary},
    error::RenderError,
};

pub const CHART_DPI: f32 = 150.0;
pub const DEFAULT_TOP_N: usize = 10;

const FONT_FAMILY: &str = "sans-serif";
const FONT_REGULAR: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");
const FONT_BOLD: &[u8] = include_bytes!("../assets/fonts/DejaVuSans-Bold.ttf");

const BAR_COLOR: RGBColor = RGBColor(0x7c, 0x5c, 0xff);
const LINE_COLOR: RGBColor = RGBColor(0x00, 0xaa, 0xff);

const CAPTION_SIZE: f64 = 30.0;
const LABEL_SIZE: f64 = 19.0;
/// Pixels between the x axis line and the first glyph of a month label.
const MONTH_LABEL_GAP: i32 = 10;

/// An encoded chart ready to be placed in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub dpi: f32,
    pub title: String,
}

/// Horizontal bars for the `top_n` best-selling products, largest at the top.
pub fn render_top_products(
    summary: &ProductSummary,
    top_n: usize,
) -> Result<ChartImage, RenderError> {
    ensure_fonts()?;
    // Ascending, so the largest bar ends up at the top of the y axis.
    let bars: Vec<(&str, f64)> = summary
        .top(top_n)
        .iter()
        .rev()
        .map(|row| (row.product.as_str(), to_f64(row.sales)))
        .collect();
    let title = format!("Top {} Produtos por Vendas", bars.len());
    let width = inches_to_px(8.0);
    let height = inches_to_px(f64::max(3.0, 0.5 * bars.len() as f64));
    let (low, high) = value_bounds(bars.iter().map(|(_, sales)| *sales));
    debug!(
        "Rendering '{}' with {} bar(s) on a {}x{} canvas",
        title,
        bars.len(),
        width,
        height
    );

    let mut buffer = blank_canvas(width, height);
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error(&title))?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&title, caption_font())
            .margin(24)
            .x_label_area_size(70)
            .y_label_area_size(product_label_area(&bars))
            .build_cartesian_2d(low..high, slot_range(bars.len()).into_segmented())
            .map_err(chart_error(&title))?;

        let product_label = |value: &SegmentValue<usize>| {
            segment_index(value)
                .and_then(|idx| bars.get(idx))
                .map(|(product, _)| (*product).to_string())
                .unwrap_or_default()
        };
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(bars.len().max(1))
            .y_label_formatter(&product_label)
            .x_label_formatter(&|value: &f64| format!("{value:.0}"))
            .x_desc("Vendas (unidade monetária)")
            .label_style(label_font())
            .axis_desc_style(label_font())
            .draw()
            .map_err(chart_error(&title))?;

        chart
            .draw_series(
                Histogram::horizontal(&chart)
                    .style(BAR_COLOR.mix(0.9).filled())
                    .margin(6)
                    .data(bars.iter().enumerate().map(|(idx, (_, sales))| (idx, *sales))),
            )
            .map_err(chart_error(&title))?;

        root.present().map_err(chart_error(&title))?;
    }

    encode(title, &buffer, width, height)
}

/// Line with circular markers over the months in calendar order.
pub fn render_monthly_sales(summary: &MonthSummary) -> Result<ChartImage, RenderError> {
    ensure_fonts()?;
    let title = "Vendas por Mês".to_string();
    let width = inches_to_px(10.0);
    let height = inches_to_px(4.0);
    let points: Vec<(SegmentValue<usize>, f64)> = summary
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| (SegmentValue::CenterOf(idx), to_f64(row.sales)))
        .collect();
    let (low, high) = value_bounds(points.iter().map(|(_, sales)| *sales));
    debug!(
        "Rendering '{}' with {} month(s) on a {}x{} canvas",
        title,
        points.len(),
        width,
        height
    );

    let mut buffer = blank_canvas(width, height);
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error(&title))?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&title, caption_font())
            .margin(24)
            .x_label_area_size(130)
            .y_label_area_size(110)
            .build_cartesian_2d(slot_range(summary.len()).into_segmented(), low..high)
            .map_err(chart_error(&title))?;

        // The mesh draws the ticks only; month labels are placed below.
        chart
            .configure_mesh()
            .set_all_tick_mark_size(5)
            .x_labels(summary.len().max(1))
            .x_label_formatter(&|_: &SegmentValue<usize>| String::new())
            .y_label_formatter(&|value: &f64| format!("{value:.0}"))
            .y_label_style(label_font())
            .x_desc("Mês")
            .y_desc("Vendas")
            .axis_desc_style(label_font())
            .draw()
            .map_err(chart_error(&title))?;

        chart
            .draw_series(LineSeries::new(
                points.iter().cloned(),
                LINE_COLOR.stroke_width(3),
            ))
            .map_err(chart_error(&title))?;
        chart
            .draw_series(
                points
                    .iter()
                    .map(|point| Circle::new(point.clone(), 6, LINE_COLOR.filled())),
            )
            .map_err(chart_error(&title))?;

        // Rotated text is centred on its anchor along the reading direction,
        // so anchor the start of each label just under the axis.
        let month_style = TextStyle::from(label_font().transform(FontTransform::Rotate90))
            .pos(Pos::new(HPos::Left, VPos::Center));
        for (idx, row) in summary.rows.iter().enumerate() {
            let (x, axis_y) = chart.backend_coord(&(SegmentValue::CenterOf(idx), low));
            root.draw_text(
                &row.month.format("%Y-%m").to_string(),
                &month_style,
                (x, axis_y + MONTH_LABEL_GAP),
            )
            .map_err(chart_error(&title))?;
        }

        root.present().map_err(chart_error(&title))?;
    }

    encode(title, &buffer, width, height)
}

fn ensure_fonts() -> Result<(), RenderError> {
    static REGISTERED: OnceLock<Result<(), &'static str>> = OnceLock::new();
    let outcome = *REGISTERED.get_or_init(|| {
        register_font(FONT_FAMILY, FontStyle::Normal, FONT_REGULAR)
            .map_err(|_| "DejaVuSans")?;
        register_font(FONT_FAMILY, FontStyle::Bold, FONT_BOLD).map_err(|_| "DejaVuSans-Bold")
    });
    outcome.map_err(|name| RenderError::Font { name })
}

fn caption_font() -> FontDesc<'static> {
    (FONT_FAMILY, CAPTION_SIZE, FontStyle::Bold).into_font()
}

fn label_font() -> FontDesc<'static> {
    (FONT_FAMILY, LABEL_SIZE).into_font()
}

fn chart_error<E: Display>(chart: &str) -> impl Fn(E) -> RenderError + '_ {
    move |err| RenderError::Chart {
        chart: chart.to_string(),
        message: err.to_string(),
    }
}

fn encode(title: String, buffer: &[u8], width: u32, height: u32) -> Result<ChartImage, RenderError> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(buffer, width, height, ColorType::Rgb8)
        .map_err(|source| RenderError::Encode {
            chart: title.clone(),
            source,
        })?;
    Ok(ChartImage {
        png,
        width,
        height,
        dpi: CHART_DPI,
        title,
    })
}

fn inches_to_px(inches: f64) -> u32 {
    (inches * f64::from(CHART_DPI)).round() as u32
}

fn blank_canvas(width: u32, height: u32) -> Vec<u8> {
    vec![255u8; width as usize * height as usize * 3]
}

/// Discrete slots for `count` categories. A single-value integer range
/// collapses in plotters, so at least two slots are always laid out.
fn slot_range(count: usize) -> Range<usize> {
    0..count.max(2) - 1
}

fn segment_index(value: &SegmentValue<usize>) -> Option<usize> {
    match value {
        SegmentValue::Exact(idx) | SegmentValue::CenterOf(idx) => Some(*idx),
        SegmentValue::Last => None,
    }
}

/// Room for the longest product name, within sane limits.
fn product_label_area(bars: &[(&str, f64)]) -> u32 {
    let longest = bars
        .iter()
        .map(|(product, _)| product.chars().count())
        .max()
        .unwrap_or(0) as u32;
    (longest * 11 + 30).clamp(120, 480)
}

/// Value-axis range that always includes zero and leaves headroom above the
/// largest value (and below the smallest, when negative).
fn value_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), value| {
        (lo.min(value), hi.max(value))
    });
    let span = max - min;
    if span <= f64::EPSILON {
        return (0.0, 1.0);
    }
    let pad = span * 0.1;
    let low = if min < 0.0 { min - pad } else { 0.0 };
    let high = if max > 0.0 { max + pad } else { 0.0 };
    (low, high)
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
