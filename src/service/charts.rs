use std::f64::consts::PI;

use eyre::Result;
use plotters::prelude::*;

use crate::domain::report::{ClassCount, CorrelationHeatmap, FeatureImportance};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 420;
const FONT: &str = "sans-serif";

const PALETTE: [RGBColor; 4] = [
    RGBColor(76, 114, 176),
    RGBColor(221, 132, 82),
    RGBColor(85, 168, 104),
    RGBColor(196, 78, 82),
];

fn class_name(label: u8) -> String {
    match label {
        0 => "0 (legit)".to_string(),
        1 => "1 (fraud)".to_string(),
        other => other.to_string(),
    }
}

fn segment_label(names: &[String], value: &SegmentValue<i32>) -> String {
    match value {
        SegmentValue::CenterOf(i) => usize::try_from(*i)
            .ok()
            .and_then(|i| names.get(i))
            .cloned()
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Bar per predicted class.
pub fn class_histogram(counts: &[ClassCount]) -> Result<String> {
    let names: Vec<String> = counts.iter().map(|c| class_name(c.label)).collect();
    let top = counts.iter().map(|c| c.count).max().unwrap_or(0);
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption("Prediction Distribution", (FONT, 24))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(
                (0..counts.len() as i32).into_segmented(),
                0usize..top + top / 10 + 1,
            )?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_label_formatter(&|v: &SegmentValue<i32>| segment_label(&names, v))
            .x_desc("predicted_fraud")
            .y_desc("Count")
            .draw()?;
        chart.draw_series(counts.iter().enumerate().map(|(i, c)| {
            let i = i as i32;
            Rectangle::new(
                [
                    (SegmentValue::Exact(i), 0),
                    (SegmentValue::Exact(i + 1), c.count),
                ],
                PALETTE[i as usize % PALETTE.len()].filled(),
            )
        }))?;
        root.present()?;
    }
    Ok(svg)
}

/// Share of each predicted class, wedges start at twelve o'clock and run clockwise.
pub fn class_pie(counts: &[ClassCount]) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;
        root.draw(&Text::new(
            "Fraud vs Legit Proportion",
            (WIDTH as i32 / 2 - 130, 12),
            (FONT, 24).into_font(),
        ))?;

        let center = (WIDTH as f64 / 2.0, HEIGHT as f64 / 2.0 + 15.0);
        let radius = HEIGHT as f64 / 2.0 - 50.0;
        let point = |angle: f64, r: f64| {
            (
                (center.0 + r * angle.sin()).round() as i32,
                (center.1 - r * angle.cos()).round() as i32,
            )
        };

        let mut start = 0.0;
        for (i, class) in counts.iter().enumerate() {
            let sweep = class.share * 2.0 * PI;
            if sweep <= 0.0 {
                continue;
            }
            let steps = ((sweep / (2.0 * PI)) * 180.0).ceil().max(2.0) as usize;
            let mut wedge = vec![point(0.0, 0.0)];
            wedge.extend(
                (0..=steps).map(|s| point(start + sweep * s as f64 / steps as f64, radius)),
            );
            let color = PALETTE[i % PALETTE.len()];
            root.draw(&Polygon::new(wedge, color.filled()))?;

            let middle = point(start + sweep / 2.0, radius * 0.6);
            root.draw(&Text::new(
                format!("{} {:.1}%", class_name(class.label), class.share * 100.0),
                (middle.0 - 40, middle.1 - 8),
                (FONT, 16).into_font().color(&BLACK),
            ))?;
            start += sweep;
        }
        root.present()?;
    }
    Ok(svg)
}

/// Diverging blue-white-red scale over `[-1, 1]`.
fn coolwarm(r: f64) -> RGBColor {
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);
    let r = r.clamp(-1.0, 1.0);
    let (from, to, t) = if r < 0.0 {
        (MID, COLD, -r)
    } else {
        (MID, WARM, r)
    };
    let mix = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

/// Annotated correlation grid.
pub fn correlation_heatmap(heatmap: &CorrelationHeatmap) -> Result<String> {
    let n = heatmap.columns.len().max(1) as i32;
    let (left, top) = (110, 50);
    let cell = ((HEIGHT as i32 + 180 - top - 60) / n).max(1);
    let width = (left + cell * n + 20) as u32;
    let height = (top + cell * n + 90) as u32;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;
        root.draw(&Text::new(
            "Top 10 Correlated Features",
            (left, 12),
            (FONT, 22).into_font(),
        ))?;

        for (row, values) in heatmap.matrix.iter().enumerate() {
            let y = top + row as i32 * cell;
            for (col, value) in values.iter().enumerate() {
                let x = left + col as i32 * cell;
                let fill = value.map(coolwarm).unwrap_or(RGBColor(200, 200, 200));
                root.draw(&Rectangle::new([(x, y), (x + cell, y + cell)], fill.filled()))?;
                root.draw(&Rectangle::new(
                    [(x, y), (x + cell, y + cell)],
                    WHITE.stroke_width(1),
                ))?;
                let annotation = value.map(|v| format!("{:.2}", v)).unwrap_or_default();
                root.draw(&Text::new(
                    annotation,
                    (x + cell / 2 - 13, y + cell / 2 - 6),
                    (FONT, 12).into_font(),
                ))?;
            }
        }

        for (i, name) in heatmap.columns.iter().enumerate() {
            let offset = i as i32 * cell + cell / 2;
            root.draw(&Text::new(
                name.clone(),
                (8, top + offset - 6),
                (FONT, 13).into_font(),
            ))?;
            root.draw(&Text::new(
                name.clone(),
                (left + offset - 6, top + n * cell + 8),
                (FONT, 13)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            ))?;
        }
        root.present()?;
    }
    Ok(svg)
}

/// Horizontal bars, most important feature on top.
pub fn importance_bars(importances: &[FeatureImportance]) -> Result<String> {
    let names: Vec<String> = importances
        .iter()
        .rev()
        .map(|f| f.feature.clone())
        .collect();
    let top = importances
        .iter()
        .map(|f| f.importance)
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption("Top 10 Important Features", (FONT, 24))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(110)
            .build_cartesian_2d(
                0f64..top * 1.1,
                (0..importances.len() as i32).into_segmented(),
            )?;
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_label_formatter(&|v: &SegmentValue<i32>| segment_label(&names, v))
            .x_desc("Importance")
            .draw()?;
        chart.draw_series(importances.iter().rev().enumerate().map(|(i, f)| {
            let i = i as i32;
            Rectangle::new(
                [
                    (0.0, SegmentValue::Exact(i)),
                    (f.importance, SegmentValue::Exact(i + 1)),
                ],
                PALETTE[0].filled(),
            )
        }))?;
        root.present()?;
    }
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn counts() -> Vec<ClassCount> {
        vec![
            ClassCount {
                label: 0,
                count: 90,
                share: 0.9,
            },
            ClassCount {
                label: 1,
                count: 10,
                share: 0.1,
            },
        ]
    }

    #[test]
    fn test_histogram_is_svg_with_class_labels() -> Result<()> {
        let svg = class_histogram(&counts())?;
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Prediction Distribution"));
        assert!(svg.contains("1 (fraud)"));
        Ok(())
    }

    #[test]
    fn test_pie_annotates_shares() -> Result<()> {
        let svg = class_pie(&counts())?;
        assert!(svg.contains("90.0%"));
        assert!(svg.contains("10.0%"));
        assert_eq!(svg.matches("<polygon").count(), 2);
        Ok(())
    }

    #[test]
    fn test_pie_with_single_class_is_one_wedge() -> Result<()> {
        let svg = class_pie(&[ClassCount {
            label: 0,
            count: 4,
            share: 1.0,
        }])?;
        assert_eq!(svg.matches("<polygon").count(), 1);
        assert!(svg.contains("100.0%"));
        Ok(())
    }

    #[test]
    fn test_heatmap_annotates_values_and_blanks_constant_columns() -> Result<()> {
        let heatmap = CorrelationHeatmap {
            columns: vec!["V1".to_string(), "V2".to_string()],
            matrix: vec![vec![Some(1.0), Some(-0.25)], vec![Some(-0.25), None]],
        };
        let svg = correlation_heatmap(&heatmap)?;
        assert!(svg.contains("1.00"));
        assert!(svg.contains("-0.25"));
        assert!(svg.contains("V2"));
        Ok(())
    }

    #[test]
    fn test_importance_bars_name_every_feature() -> Result<()> {
        let importances = vec![
            FeatureImportance {
                feature: "V14".to_string(),
                importance: 0.6,
            },
            FeatureImportance {
                feature: "Amount".to_string(),
                importance: 0.4,
            },
        ];
        let svg = importance_bars(&importances)?;
        assert!(svg.contains("V14"));
        assert!(svg.contains("Amount"));
        Ok(())
    }

    #[rstest]
    #[case(-1.0, RGBColor(59, 76, 192))]
    #[case(0.0, RGBColor(221, 221, 221))]
    #[case(1.0, RGBColor(180, 4, 38))]
    #[case(7.0, RGBColor(180, 4, 38))]
    fn test_coolwarm_endpoints(#[case] r: f64, #[case] expected: RGBColor) {
        assert_eq!(coolwarm(r), expected);
    }
}
