//! Chart model for the dashboard: stacked usage/remaining bars, threshold
//! warnings and the summary block shown above the chart.

mod svg;

pub use svg::render_bar_chart;

use crate::client::{AdminQuotas, MemberMap};

pub const DEFAULT_WARNING_THRESHOLD: f64 = 95.0;

pub const NOT_LOGGED_IN: &str = "Please log in to view data.";
pub const SELECT_A_PI: &str = "Please select at least one PI.";
pub const NO_USAGE_DATA: &str = "No usage data found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarColor {
    Normal,
    Warning,
}

impl BarColor {
    pub fn css(self) -> &'static str {
        match self {
            BarColor::Normal => "blue",
            BarColor::Warning => "red",
        }
    }
}

pub const REMAINING_COLOR: &str = "lightgray";

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub usage: u64,
    pub remaining: u64,
    pub color: BarColor,
    pub usage_hover: String,
    pub remaining_hover: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    Lab {
        pi: String,
        number_of_users: usize,
        total_usage: u64,
        average_usage: f64,
        max_usage: u64,
    },
    Admin {
        number_of_pis: usize,
        total_usage: u64,
        remaining_quota: u64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub summary: Summary,
    pub warnings: Vec<String>,
    pub chart: BarChart,
}

/// What the chart area shows: either a plain message or a full view.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartContent {
    Message(String),
    View(DashboardView),
}

impl ChartContent {
    pub fn message(text: impl Into<String>) -> Self {
        ChartContent::Message(text.into())
    }
}

/// Percent of the soft limit in use; zero when no soft limit is set.
pub fn usage_percent(usage: u64, soft: u64) -> f64 {
    if soft == 0 {
        return 0.0;
    }
    usage as f64 / soft as f64 * 100.0
}

fn saturating_sum(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0, u64::saturating_add)
}

fn color_for(percent: f64, threshold: f64) -> BarColor {
    if percent >= threshold {
        BarColor::Warning
    } else {
        BarColor::Normal
    }
}

/// View for a regular PI: one bar per lab member.
pub fn member_view(pi: &str, members: &MemberMap, threshold: f64) -> ChartContent {
    if members.is_empty() {
        return ChartContent::message(NO_USAGE_DATA);
    }

    let mut bars = Vec::with_capacity(members.len());
    let mut warnings = Vec::new();
    let mut total_usage = 0u64;
    let mut max_usage = 0u64;

    for (member, stats) in members.iter() {
        let percent = usage_percent(stats.usage, stats.soft);
        let remaining = stats.soft.saturating_sub(stats.usage);
        let color = color_for(percent, threshold);

        if color == BarColor::Warning {
            warnings.push(format!(
                "{member} is at {percent:.0}% of their soft limit."
            ));
        }

        bars.push(Bar {
            label: member.clone(),
            usage: stats.usage,
            remaining,
            color,
            usage_hover: format!(
                "PI: {pi}\nLab Member: {member}\nUsage: {} GB\nSoft Limit: {} GB\nHard Limit: {} GB\nFiles: {}",
                stats.usage, stats.soft, stats.hard, stats.files
            ),
            remaining_hover: format!("{member}: {remaining} GB remaining"),
        });

        total_usage = total_usage.saturating_add(stats.usage);
        max_usage = max_usage.max(stats.usage);
    }

    ChartContent::View(DashboardView {
        summary: Summary::Lab {
            pi: pi.to_string(),
            number_of_users: members.len(),
            total_usage,
            average_usage: total_usage as f64 / members.len() as f64,
            max_usage,
        },
        warnings,
        chart: BarChart {
            title: "Lab Member Usage vs Soft Limit".to_string(),
            x_title: "Lab Member".to_string(),
            y_title: "Usage (GB)".to_string(),
            bars,
        },
    })
}

/// View for an admin: one bar per selected PI, summed across that PI's members.
pub fn admin_view(quotas: &AdminQuotas, selected: &[String], threshold: f64) -> ChartContent {
    if selected.is_empty() {
        return ChartContent::message(SELECT_A_PI);
    }

    let empty = MemberMap::new();
    let mut bars = Vec::with_capacity(selected.len());
    let mut warnings = Vec::new();

    for pi in selected {
        let members = quotas.get(pi).unwrap_or(&empty);
        let usage = saturating_sum(members.values().map(|stats| stats.usage));
        let soft = saturating_sum(members.values().map(|stats| stats.soft));
        let remaining = soft.saturating_sub(usage);
        let percent = usage_percent(usage, soft);
        let color = color_for(percent, threshold);

        if color == BarColor::Warning {
            warnings.push(format!(
                "PI '{pi}' is at {percent:.0}% of their total soft limit."
            ));
        }

        bars.push(Bar {
            label: pi.clone(),
            usage,
            remaining,
            color,
            usage_hover: format!("{pi}: {usage} GB used"),
            remaining_hover: format!("{pi}: {remaining} GB remaining"),
        });
    }

    let total_usage = saturating_sum(bars.iter().map(|bar| bar.usage));
    let remaining_quota = saturating_sum(bars.iter().map(|bar| bar.remaining));

    ChartContent::View(DashboardView {
        summary: Summary::Admin {
            number_of_pis: bars.len(),
            total_usage,
            remaining_quota,
        },
        warnings,
        chart: BarChart {
            title: "PI Usage vs Soft Limit".to_string(),
            x_title: "PI".to_string(),
            y_title: "Total Usage (GB)".to_string(),
            bars,
        },
    })
}
