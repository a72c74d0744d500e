//! A4 layout of the report: a summary page with the totals as cards, then
//! one page per chart.

use super::chart::{LineChart, ZERO_LINE};
use super::{FOOTER, ReportData, TITLE, format_euro};
use crate::error::{Error, Result};
use plotters::style::RGBColor;
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject,
    IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Px, Rect, Rgb,
};
use rust_decimal::Decimal;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const HEADER_BAND: RGBColor = RGBColor(0x00, 0x33, 0x66);
const WHITE: RGBColor = RGBColor(0xff, 0xff, 0xff);
const BLACK: RGBColor = RGBColor(0x00, 0x00, 0x00);
const GREY: RGBColor = RGBColor(0x80, 0x80, 0x80);
const AXIS: RGBColor = RGBColor(0xcc, 0xcc, 0xcc);
const NEGATIVE: RGBColor = RGBColor(0xdc, 0x35, 0x45);

/// Chart raster size in pixels and its printed width; the height follows
/// from the dpi.
const CHART_PX: (u32, u32) = (1020, 600);
const CHART_WIDTH_MM: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const CHART_BOTTOM: f32 = 150.0;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

fn pdf_err(err: impl std::fmt::Display) -> Error {
    Error::Pdf(err.to_string())
}

fn color(c: RGBColor) -> Color {
    let unit = |v: u8| f32::from(v) / 255.0;
    Color::Rgb(Rgb::new(unit(c.0), unit(c.1), unit(c.2), None))
}

pub fn render(report: &ReportData) -> Result<Vec<u8>> {
    let (doc, page, layer) =
        PdfDocument::new(TITLE, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "resumen");
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_err)?,
        italic: doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(pdf_err)?,
    };

    let first = doc.get_page(page).get_layer(layer);
    draw_header(&first, &fonts, report);
    draw_cards(&first, &fonts, report);
    draw_footer(&first, &fonts);

    for chart in &report.charts {
        let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "grafica");
        let layer = doc.get_page(page).get_layer(layer);
        draw_chart(&layer, &fonts, chart)?;
        draw_footer(&layer, &fonts);
    }

    doc.save_to_bytes().map_err(pdf_err)
}

fn text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    fill: RGBColor,
    size: f32,
    x: f32,
    y: f32,
    s: &str,
) {
    layer.set_fill_color(color(fill));
    layer.use_text(s, size, Mm(x), Mm(y), font);
}

fn stroke(
    layer: &PdfLayerReference,
    c: RGBColor,
    thickness: f32,
    points: &[(f32, f32)],
    closed: bool,
) {
    if points.len() < 2 {
        return;
    }
    layer.set_outline_color(color(c));
    layer.set_outline_thickness(thickness);
    layer.add_line(Line {
        points: points
            .iter()
            .map(|&(x, y)| (Point::new(Mm(x), Mm(y)), false))
            .collect(),
        is_closed: closed,
    });
}

fn draw_header(layer: &PdfLayerReference, fonts: &Fonts, report: &ReportData) {
    layer.set_fill_color(color(HEADER_BAND));
    layer.add_rect(Rect::new(
        Mm(0.0),
        Mm(PAGE_HEIGHT - 20.0),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
    ));
    text(layer, &fonts.bold, WHITE, 16.0, MARGIN, PAGE_HEIGHT - 13.0, TITLE);

    let generated = format!(
        "Generado: {}",
        report.generated_at.format("%d/%m/%Y %H:%M:%S")
    );
    text(layer, &fonts.regular, BLACK, 10.0, MARGIN, PAGE_HEIGHT - 30.0, &generated);
    text(
        layer,
        &fonts.regular,
        BLACK,
        10.0,
        MARGIN,
        PAGE_HEIGHT - 36.0,
        &report.period_line(),
    );
}

fn draw_cards(layer: &PdfLayerReference, fonts: &Fonts, report: &ReportData) {
    let s = &report.summary;
    let cards: [(&str, Decimal, RGBColor); 5] = [
        ("Total Forecast", s.total_forecast, RGBColor(0x6c, 0x63, 0xff)),
        ("Total Facturado", s.total_billed, RGBColor(0x00, 0xb8, 0x94)),
        ("WIP", s.wip_total, RGBColor(0x17, 0xa2, 0xb8)),
        ("Pendiente", s.total_pending, RGBColor(0xe1, 0x70, 0x55)),
        ("WIP Calculado", s.wip_calculated, RGBColor(0x00, 0x7b, 0xff)),
    ];

    let width = (PAGE_WIDTH - 2.0 * MARGIN) / 2.2;
    let height = 16.0;
    let top = PAGE_HEIGHT - 60.0;
    for (i, (label, value, outline)) in cards.into_iter().enumerate() {
        let x = if i % 2 == 0 {
            MARGIN
        } else {
            PAGE_WIDTH - MARGIN - width
        };
        let y = top - (i / 2) as f32 * 22.0;

        stroke(
            layer,
            outline,
            1.5,
            &[(x, y), (x + width, y), (x + width, y + height), (x, y + height)],
            true,
        );
        text(layer, &fonts.bold, BLACK, 11.0, x + 4.0, y + 10.0, label);
        let fill = if value.is_sign_negative() && !value.is_zero() {
            NEGATIVE
        } else {
            BLACK
        };
        text(layer, &fonts.regular, fill, 10.0, x + 4.0, y + 4.0, &format_euro(value));
    }
}

fn draw_chart(layer: &PdfLayerReference, fonts: &Fonts, chart: &LineChart) -> Result<()> {
    text(layer, &fonts.bold, BLACK, 14.0, MARGIN, PAGE_HEIGHT - 27.0, chart.title);
    if chart.is_empty() {
        text(
            layer,
            &fonts.italic,
            GREY,
            10.0,
            MARGIN,
            PAGE_HEIGHT - 40.0,
            "Sin datos para el periodo seleccionado",
        );
        return Ok(());
    }

    let (width, height) = CHART_PX;
    let dpi = width as f32 * 25.4 / CHART_WIDTH_MM;
    let chart_height = height as f32 * 25.4 / dpi;
    let pixels = chart.to_rgb(width, height)?;
    Image::from(ImageXObject {
        width: Px(width as usize),
        height: Px(height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: pixels,
        image_filter: None,
        smask: None,
        clipping_bbox: None,
    })
    .add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(MARGIN)),
            translate_y: Some(Mm(CHART_BOTTOM)),
            dpi: Some(dpi),
            ..ImageTransform::default()
        },
    );

    let (left, right, bottom, top) = (
        MARGIN,
        MARGIN + CHART_WIDTH_MM,
        CHART_BOTTOM,
        CHART_BOTTOM + chart_height,
    );
    stroke(
        layer,
        AXIS,
        0.5,
        &[(left, bottom), (right, bottom), (right, top), (left, top)],
        true,
    );

    let (low, high) = chart.bounds();
    text(layer, &fonts.regular, GREY, 7.0, left, top + 2.0, &format!("{high:.0}"));
    text(layer, &fonts.regular, GREY, 7.0, left, bottom - 5.0, &format!("{low:.0}"));
    if let (Some(first), Some(last)) = (chart.labels.first(), chart.labels.last()) {
        let months = if first == last {
            first.clone()
        } else {
            format!("{first} a {last}")
        };
        text(layer, &fonts.regular, GREY, 7.0, right - 30.0, bottom - 5.0, &months);
    }

    let mut legend = vec![("Cero", ZERO_LINE)];
    legend.extend(chart.series.iter().map(|s| (s.label, s.color)));
    for (i, (label, c)) in legend.into_iter().enumerate() {
        let y = bottom - 16.0 - i as f32 * 6.0;
        stroke(layer, c, 2.0, &[(left, y + 1.0), (left + 8.0, y + 1.0)], false);
        text(layer, &fonts.regular, BLACK, 9.0, left + 11.0, y, label);
    }
    Ok(())
}

fn draw_footer(layer: &PdfLayerReference, fonts: &Fonts) {
    text(layer, &fonts.italic, GREY, 9.0, MARGIN, 12.0, FOOTER);
}
