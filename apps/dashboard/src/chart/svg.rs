use std::fmt::Write;

use crate::views::escape_html;

use super::{BarChart, REMAINING_COLOR};

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 420.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 70.0;
const Y_TICKS: u64 = 5;

/// Renders a stacked bar chart (usage at the bottom, remaining on top) as
/// inline SVG. Each segment carries a `<title>` used as hover text.
pub fn render_bar_chart(chart: &BarChart) -> String {
    let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = MARGIN_TOP + plot_height;

    let max_total = chart
        .bars
        .iter()
        .map(|bar| bar.usage.saturating_add(bar.remaining))
        .max()
        .unwrap_or(0);
    let y_max = nice_ceiling(max_total);
    let scale = plot_height / y_max as f64;

    let mut out = String::new();
    let _ = write!(
        out,
        r#"<svg class="bar-chart" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}" role="img" aria-label="{title}">"#,
        title = escape_html(&chart.title)
    );
    let _ = write!(
        out,
        r#"<text x="{x}" y="28" text-anchor="middle" class="chart-title">{title}</text>"#,
        x = WIDTH / 2.0,
        title = escape_html(&chart.title)
    );

    for tick in 0..=Y_TICKS {
        let value = y_max as f64 * tick as f64 / Y_TICKS as f64;
        let y = baseline - value * scale;
        let _ = write!(
            out,
            r##"<line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{x2}" y2="{y:.1}" stroke="#e5e5e5"/><text x="{tx}" y="{ty:.1}" text-anchor="end" class="tick">{value:.0}</text>"##,
            x2 = WIDTH - MARGIN_RIGHT,
            tx = MARGIN_LEFT - 8.0,
            ty = y + 4.0,
        );
    }

    if !chart.bars.is_empty() {
        let slot = plot_width / chart.bars.len() as f64;
        let bar_width = (slot * 0.6).min(80.0);

        for (index, bar) in chart.bars.iter().enumerate() {
            let x = MARGIN_LEFT + slot * index as f64 + (slot - bar_width) / 2.0;
            let usage_height = bar.usage as f64 * scale;
            let remaining_height = bar.remaining as f64 * scale;
            let usage_top = baseline - usage_height;
            let remaining_top = usage_top - remaining_height;

            let _ = write!(
                out,
                r#"<rect class="usage" x="{x:.1}" y="{usage_top:.1}" width="{bar_width:.1}" height="{usage_height:.1}" fill="{fill}"><title>{hover}</title></rect>"#,
                fill = bar.color.css(),
                hover = escape_html(&bar.usage_hover),
            );
            let _ = write!(
                out,
                r#"<rect class="remaining" x="{x:.1}" y="{remaining_top:.1}" width="{bar_width:.1}" height="{remaining_height:.1}" fill="{REMAINING_COLOR}"><title>{hover}</title></rect>"#,
                hover = escape_html(&bar.remaining_hover),
            );
            let _ = write!(
                out,
                r#"<text x="{lx:.1}" y="{ly:.1}" text-anchor="middle" class="bar-label">{label}</text>"#,
                lx = x + bar_width / 2.0,
                ly = baseline + 18.0,
                label = escape_html(&bar.label),
            );
        }
    }

    let _ = write!(
        out,
        r#"<line x1="{MARGIN_LEFT}" y1="{baseline}" x2="{x2}" y2="{baseline}" stroke="black"/>"#,
        x2 = WIDTH - MARGIN_RIGHT,
    );
    let _ = write!(
        out,
        r#"<text x="{x}" y="{y}" text-anchor="middle" class="axis-title">{title}</text>"#,
        x = MARGIN_LEFT + plot_width / 2.0,
        y = HEIGHT - 20.0,
        title = escape_html(&chart.x_title),
    );
    let _ = write!(
        out,
        r#"<text x="18" y="{y}" text-anchor="middle" transform="rotate(-90 18 {y})" class="axis-title">{title}</text>"#,
        y = MARGIN_TOP + plot_height / 2.0,
        title = escape_html(&chart.y_title),
    );
    out.push_str("</svg>");
    out
}

/// Smallest multiple of [`Y_TICKS`] at or above `value`, never zero.
fn nice_ceiling(value: u64) -> u64 {
    let value = value.max(1);
    value.div_ceil(Y_TICKS).saturating_mul(Y_TICKS)
}
