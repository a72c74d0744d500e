//! Line charts drawn with plotters: SVG for the dashboard, an RGB raster for
//! the PDF report.

use crate::domain::{EvolucionEntry, MonthlyRecord};
use crate::error::{Error, Result};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

pub const ZERO_LINE: RGBColor = RED;
pub const FORECAST: RGBColor = RGBColor(0x6c, 0x63, 0xff);
pub const BILLED: RGBColor = RGBColor(0x00, 0xb8, 0x94);
pub const PENDING: RGBColor = RGBColor(0xe1, 0x70, 0x55);
pub const INCREMENT: RGBColor = RGBColor(0x09, 0x84, 0xe3);
pub const ACCUMULATED: RGBColor = RGBColor(0x6c, 0x5c, 0xe7);

#[derive(Debug, Clone)]
pub struct Series {
    pub label: &'static str,
    pub color: RGBColor,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct LineChart {
    pub title: &'static str,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

/// The raster for the PDF carries no text: the report sets title, legend and
/// axis range with its own fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Labels {
    Drawn,
    Omitted,
}

fn chart_err(err: impl std::fmt::Display) -> Error {
    Error::Chart(err.to_string())
}

impl LineChart {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Value range over every series, always including zero.
    pub fn bounds(&self) -> (f64, f64) {
        let (low, high) = self
            .series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if high - low < f64::EPSILON {
            (low - 1.0, high + 1.0)
        } else {
            (low, high)
        }
    }

    pub fn to_svg(&self, width: u32, height: u32) -> Result<String> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
            self.plot(&root, Labels::Drawn).map_err(chart_err)?;
            root.present().map_err(chart_err)?;
        }
        Ok(svg)
    }

    /// Row-major 8-bit RGB pixels, top row first.
    pub fn to_rgb(&self, width: u32, height: u32) -> Result<Vec<u8>> {
        let mut pixels = vec![0; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
            self.plot(&root, Labels::Omitted).map_err(chart_err)?;
            root.present().map_err(chart_err)?;
        }
        Ok(pixels)
    }

    fn plot<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        labels: Labels,
    ) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        root.fill(&WHITE)?;
        let (low, high) = self.bounds();
        // One x unit per month, centred on its index.
        let right = self.labels.len().max(1) as f64 - 0.5;

        let mut builder = ChartBuilder::on(root);
        builder.margin(12);
        if labels == Labels::Drawn {
            builder
                .caption(self.title, ("sans-serif", 18).into_font())
                .x_label_area_size(30)
                .y_label_area_size(70);
        }
        let mut chart = builder.build_cartesian_2d(-0.5..right, low..high)?;

        if labels == Labels::Drawn {
            let month_label = |x: &f64| {
                let i = x.round();
                if (x - i).abs() > 1e-6 || i < 0.0 {
                    return String::new();
                }
                self.labels.get(i as usize).cloned().unwrap_or_default()
            };
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(self.labels.len().clamp(1, 12))
                .x_label_formatter(&month_label)
                .y_label_formatter(&|v: &f64| format!("{v:.0}"))
                .draw()?;
        }

        chart.draw_series(LineSeries::new([(-0.5, 0.0), (right, 0.0)], &ZERO_LINE))?;

        for series in &self.series {
            let color = series.color;
            let points = series
                .values
                .iter()
                .enumerate()
                .map(|(i, v)| (i as f64, *v));
            let drawn = chart.draw_series(LineSeries::new(points, color.stroke_width(2)))?;
            if labels == Labels::Drawn {
                drawn.label(series.label).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            }
        }

        if labels == Labels::Drawn {
            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()?;
        }
        Ok(())
    }
}

fn float(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Forecast, billed and pending per month.
pub fn monthly_chart(records: &[MonthlyRecord]) -> LineChart {
    LineChart {
        title: "Serie Mensual",
        labels: records.iter().map(|r| r.month.label()).collect(),
        series: vec![
            Series {
                label: "Forecast (1)",
                color: FORECAST,
                values: records.iter().map(|r| float(r.values.forecast)).collect(),
            },
            Series {
                label: "Facturado (2)",
                color: BILLED,
                values: records.iter().map(|r| float(r.values.billed)).collect(),
            },
            Series {
                label: "Pendiente (3+4)",
                color: PENDING,
                values: records
                    .iter()
                    .map(|r| float(r.values.pending_to_incur) + float(r.values.pending_invoice))
                    .collect(),
            },
        ],
    }
}

/// Increment and accumulated balance per month.
pub fn ledger_chart(entries: &[EvolucionEntry]) -> LineChart {
    LineChart {
        title: "Evolución de la Bolsa Mensual",
        labels: entries.iter().map(|e| e.month.label()).collect(),
        series: vec![
            Series {
                label: "Incremento",
                color: INCREMENT,
                values: entries.iter().map(|e| float(e.increment)).collect(),
            },
            Series {
                label: "Acumulado",
                color: ACCUMULATED,
                values: entries.iter().map(|e| float(e.accumulated)).collect(),
            },
        ],
    }
}
