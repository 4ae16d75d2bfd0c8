use momentquad::{SolveOutcome, datatypes::QuadratureRule};
use plotters::{coord::types::RangedCoordf64, prelude::*};

const SOLVED_COLOR: RGBColor = RGBColor(0x58, 0x50, 0x8d);
const REFERENCE_COLOR: RGBColor = RGBColor(0xff, 0x63, 0x61);
const WEIGHT_ERROR_COLOR: RGBColor = RGBColor(0xbc, 0x50, 0x90);

const LABEL_STYLE: (&str, i32) = ("sans-serif", 30);

/// Two panels: the rule itself (nodes against weights) next to how far
/// each node and weight is from Gauss-Legendre, on a log scale.
pub fn save_png(
    chart_name: &str,
    outcome: &SolveOutcome,
    reference: &QuadratureRule,
    output_path: &str,
) -> anyhow::Result<()> {
    let solved = outcome.rule().sorted_pairs();
    let reference = reference.sorted_pairs();

    let width = 1600;
    let height = 800;
    let dpi_scale = 2;
    let root = BitMapBackend::new(output_path, (width * dpi_scale, height * dpi_scale))
        .into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(chart_name, ("sans-serif", 50))?;
    let panels = root.split_evenly((1, 2));

    draw_rule(&panels[0], &solved, &reference)?;
    draw_errors(&panels[1], &solved, &reference)?;

    // Finished.
    root.present()?;
    println!("Plot saved to {output_path}");
    Ok(())
}

/// Span of a chart axis, padded so points don't sit on the border.
struct Bounds {
    min: f64,
    max: f64,
}

impl Bounds {
    fn new(values: impl Iterator<Item = f64>) -> Self {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (libm::fmin(lo, v), libm::fmax(hi, v))
        });
        if !min.is_finite() || !max.is_finite() {
            return Self { min: -1.0, max: 1.0 };
        }
        let padding = 0.1 * (max - min).max(1e-3);
        Self {
            min: min - padding,
            max: max + padding,
        }
    }
}

fn draw_rule<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    solved: &[(f64, f64)],
    reference: &[(f64, f64)],
) -> anyhow::Result<()>
where
    <DB as DrawingBackend>::ErrorType: 'static,
{
    let xs = Bounds::new(solved.iter().chain(reference).map(|p| p.0));
    let ys = Bounds::new(solved.iter().chain(reference).map(|p| p.1).chain([0.0]));
    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .caption("nodes vs. weights", LABEL_STYLE)
        .build_cartesian_2d(xs.min..xs.max, ys.min..ys.max)?;
    draw_axes(&mut chart, "node", "weight")?;

    chart
        .draw_series(PointSeries::of_element(
            reference.iter().copied(),
            12,
            &REFERENCE_COLOR,
            &|coord, size, style| EmptyElement::at(coord) + Circle::new((0, 0), size, style.stroke_width(3)),
        ))?
        .label("Gauss-Legendre")
        .legend(|(x, y)| Circle::new((x, y), 8, REFERENCE_COLOR.stroke_width(3)));
    chart
        .draw_series(PointSeries::of_element(
            solved.iter().copied(),
            6,
            &SOLVED_COLOR,
            &|coord, size, style| EmptyElement::at(coord) + Circle::new((0, 0), size, style.filled()),
        ))?
        .label("moment matching")
        .legend(|(x, y)| Circle::new((x, y), 6, SOLVED_COLOR.filled()));
    chart
        .configure_series_labels()
        .label_font(LABEL_STYLE)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

/// Semilog `|x - x_gl|` and `|w - w_gl|` per node, floored at machine epsilon
/// so exact matches still show up.
fn draw_errors<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    solved: &[(f64, f64)],
    reference: &[(f64, f64)],
) -> anyhow::Result<()>
where
    <DB as DrawingBackend>::ErrorType: 'static,
{
    let floored = |e: f64| if e.is_finite() { e.max(f64::EPSILON) } else { 1.0 };
    let node_errors: Vec<(f64, f64)> = solved
        .iter()
        .zip(reference)
        .enumerate()
        .map(|(i, (s, r))| (i as f64, floored((s.0 - r.0).abs())))
        .collect();
    let weight_errors: Vec<(f64, f64)> = solved
        .iter()
        .zip(reference)
        .enumerate()
        .map(|(i, (s, r))| (i as f64, floored((s.1 - r.1).abs())))
        .collect();
    let largest = node_errors
        .iter()
        .chain(&weight_errors)
        .map(|p| p.1)
        .fold(f64::EPSILON, libm::fmax);

    let last = solved.len().saturating_sub(1) as f64;
    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(120)
        .caption("distance from Gauss-Legendre", LABEL_STYLE)
        .build_cartesian_2d(-0.5..last + 0.5, (f64::EPSILON / 2.0..largest * 10.0).log_scale())?;
    chart
        .configure_mesh()
        .x_desc("node index")
        .y_desc("abs. error")
        .y_label_formatter(&|y| format!("{y:.0e}"))
        .label_style(LABEL_STYLE)
        .axis_desc_style(LABEL_STYLE)
        .draw()?;

    for (errors, color, label) in [
        (node_errors, SOLVED_COLOR, "|x - x_gl|"),
        (weight_errors, WEIGHT_ERROR_COLOR, "|w - w_gl|"),
    ] {
        chart
            .draw_series(LineSeries::new(errors.iter().copied(), color.stroke_width(3)))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3)));
        chart.draw_series(
            errors
                .iter()
                .map(|&p| Circle::new(p, 6, color.filled())),
        )?;
    }
    chart
        .configure_series_labels()
        .label_font(LABEL_STYLE)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_axes<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    x_desc: &str,
    y_desc: &str,
) -> anyhow::Result<()>
where
    <DB as DrawingBackend>::ErrorType: 'static,
{
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .label_style(LABEL_STYLE) // axis labels
        .axis_desc_style(LABEL_STYLE) // x/y axis captions
        .draw()?;

    // Bold line at weight 0, to spot negative weights.
    let x_range = chart.as_coord_spec().x_spec().to_owned();
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x_range.range().start, 0.0), (x_range.range().end, 0.0)],
        BLACK.stroke_width(3),
    )))?;
    Ok(())
}
