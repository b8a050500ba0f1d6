//! Replacing a chart's data while keeping its formatting.
//!
//! Engines reset data labels, axes and the legend when series are replaced.
//! The update therefore captures those settings first, replaces the data,
//! then writes the captured settings back, one field at a time.

use super::ChartModel;
use crate::engine::{
    AxisKind, DataLabelFlag, DataLabelPosition, EngineAxis, EngineChart, EngineDataLabels,
    EngineError, LegendPosition, ScaleBound, Tier, TickLabelPosition, TickMark,
};
use crate::report::ApplyReport;

/// Data label settings of one series. Unreadable fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataLabelSnapshot {
    pub number_format: Option<String>,
    pub number_format_is_linked: Option<bool>,
    pub position: Option<DataLabelPosition>,
    pub flags: Vec<(DataLabelFlag, bool)>,
}

impl DataLabelSnapshot {
    pub fn capture(labels: &dyn EngineDataLabels) -> Self {
        Self {
            number_format: labels.number_format().ok().flatten(),
            number_format_is_linked: labels.number_format_is_linked().ok(),
            position: labels.position().ok().flatten(),
            flags: DataLabelFlag::ALL
                .into_iter()
                .filter_map(|flag| Some((flag, labels.flag(flag).ok().flatten()?)))
                .collect(),
        }
    }

    pub fn restore(&self, labels: &mut dyn EngineDataLabels, report: &mut ApplyReport) {
        if let Some(format) = &self.number_format {
            report.record("number_format", labels.set_number_format(format));
        }
        if let Some(linked) = self.number_format_is_linked {
            report.record(
                "number_format_is_linked",
                labels.set_number_format_is_linked(linked),
            );
        }
        if let Some(position) = self.position {
            report.record("position", labels.set_position(position));
        }
        for (flag, value) in &self.flags {
            report.record(flag.as_str(), labels.set_flag(*flag, *value));
        }
    }
}

/// Settings of one chart axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisSnapshot {
    pub has_title: Option<bool>,
    pub title_text: Option<String>,
    pub tick_marks: Vec<(Tier, TickMark)>,
    pub scales: Vec<(ScaleBound, f64)>,
    pub reverse_order: Option<bool>,
    pub tick_label_position: Option<TickLabelPosition>,
    pub gridlines: Vec<(Tier, bool)>,
    pub tick_label_number_format: Option<String>,
    pub tick_label_format_is_linked: Option<bool>,
    pub visible: Option<bool>,
}

impl AxisSnapshot {
    pub fn capture(axis: &dyn EngineAxis) -> Self {
        let has_title = axis.has_title().ok();
        Self {
            has_title,
            title_text: match has_title {
                Some(true) => axis.title_text().ok().flatten(),
                _ => None,
            },
            tick_marks: Tier::ALL
                .into_iter()
                .filter_map(|tier| Some((tier, axis.tick_mark(tier).ok().flatten()?)))
                .collect(),
            scales: ScaleBound::ALL
                .into_iter()
                .filter_map(|bound| Some((bound, axis.scale(bound).ok().flatten()?)))
                .collect(),
            reverse_order: axis.reverse_order().ok(),
            tick_label_position: axis.tick_label_position().ok().flatten(),
            gridlines: Tier::ALL
                .into_iter()
                .filter_map(|tier| Some((tier, axis.gridlines(tier).ok()?)))
                .collect(),
            tick_label_number_format: axis.tick_label_number_format().ok().flatten(),
            tick_label_format_is_linked: axis.tick_label_format_is_linked().ok(),
            visible: axis.visible().ok(),
        }
    }

    pub fn restore(&self, axis: &mut dyn EngineAxis, report: &mut ApplyReport) {
        if let Some(has_title) = self.has_title {
            let title_set = report.record("has_title", axis.set_has_title(has_title));
            if let (true, true, Some(text)) = (title_set, has_title, &self.title_text) {
                report.record("title_text", axis.set_title_text(text));
            }
        }
        for (tier, mark) in &self.tick_marks {
            report.record(tier.tick_mark_name(), axis.set_tick_mark(*tier, *mark));
        }
        for (bound, value) in &self.scales {
            report.record(bound.as_str(), axis.set_scale(*bound, *value));
        }
        if let Some(reverse) = self.reverse_order {
            report.record("reverse_order", axis.set_reverse_order(reverse));
        }
        if let Some(position) = self.tick_label_position {
            report.record("tick_label_position", axis.set_tick_label_position(position));
        }
        for (tier, value) in &self.gridlines {
            report.record(tier.gridlines_name(), axis.set_gridlines(*tier, *value));
        }
        if let Some(visible) = self.visible {
            report.record("visible", axis.set_visible(visible));
        }
        if let Some(format) = &self.tick_label_number_format {
            report.record(
                "tick_labels.number_format",
                axis.set_tick_label_number_format(format),
            );
        }
        if let Some(linked) = self.tick_label_format_is_linked {
            report.record(
                "tick_labels.number_format_is_linked",
                axis.set_tick_label_format_is_linked(linked),
            );
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegendSnapshot {
    pub has_legend: Option<bool>,
    pub position: Option<LegendPosition>,
    pub include_in_layout: Option<bool>,
}

impl LegendSnapshot {
    pub fn capture(chart: &dyn EngineChart) -> Self {
        match chart.has_legend() {
            Ok(true) => {
                let legend = chart.legend();
                Self {
                    has_legend: Some(true),
                    position: legend.and_then(|l| l.position().ok().flatten()),
                    include_in_layout: legend.and_then(|l| l.include_in_layout().ok().flatten()),
                }
            }
            Ok(false) => Self {
                has_legend: Some(false),
                ..Self::default()
            },
            Err(e) => {
                log::debug!("Legend not captured: {}", e);
                Self::default()
            }
        }
    }

    pub fn restore(&self, chart: &mut dyn EngineChart, report: &mut ApplyReport) {
        let Some(has_legend) = self.has_legend else {
            return;
        };
        report.record("has_legend", chart.set_has_legend(has_legend));
        if !has_legend {
            return;
        }

        let Some(legend) = chart.legend_mut() else {
            report.fail("legend", &EngineError::Unsupported("legend".into()));
            return;
        };
        if let Some(position) = self.position {
            report.record("position", legend.set_position(position));
        }
        if let Some(include) = self.include_in_layout {
            report.record("include_in_layout", legend.set_include_in_layout(include));
        }
    }
}

/// Everything an engine forgets when a chart's data is replaced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormattingSnapshot {
    /// One entry per series, in series order. An unreadable series keeps an
    /// empty entry so later series stay aligned.
    pub data_labels: Vec<DataLabelSnapshot>,
    pub category_axis: Option<AxisSnapshot>,
    pub value_axis: Option<AxisSnapshot>,
    pub legend: LegendSnapshot,
}

impl FormattingSnapshot {
    pub fn capture(chart: &dyn EngineChart) -> Self {
        let data_labels = (0..chart.series_count())
            .map(|i| {
                let labels = chart
                    .series(i)
                    .ok_or_else(|| EngineError::Failed(format!("series {} vanished", i)))
                    .and_then(|series| series.data_labels());
                match labels {
                    Ok(labels) => DataLabelSnapshot::capture(labels),
                    Err(e) => {
                        log::debug!("Data labels of series {} not captured: {}", i, e);
                        DataLabelSnapshot::default()
                    }
                }
            })
            .collect();

        let axis = |kind: AxisKind| match chart.axis(kind) {
            Ok(axis) => Some(AxisSnapshot::capture(axis)),
            Err(e) => {
                log::debug!("{} not captured: {}", kind.as_str(), e);
                None
            }
        };

        Self {
            data_labels,
            category_axis: axis(AxisKind::Category),
            value_axis: axis(AxisKind::Value),
            legend: LegendSnapshot::capture(chart),
        }
    }

    /// Write the snapshot back. Series are paired by position with whatever
    /// series the chart holds now.
    pub fn restore(&self, chart: &mut dyn EngineChart) -> ApplyReport {
        let mut report = ApplyReport::new();

        let paired = self.data_labels.len().min(chart.series_count());
        for (i, snapshot) in self.data_labels.iter().take(paired).enumerate() {
            let field = format!("series[{}].data_labels", i);
            let Some(series) = chart.series_mut(i) else {
                continue;
            };
            match series.data_labels_mut() {
                Ok(labels) => {
                    let mut inner = ApplyReport::new();
                    snapshot.restore(labels, &mut inner);
                    report.absorb(&field, inner);
                }
                Err(e) => report.fail(&field, &e),
            }
        }

        for (kind, snapshot) in [
            (AxisKind::Category, &self.category_axis),
            (AxisKind::Value, &self.value_axis),
        ] {
            let Some(snapshot) = snapshot else {
                continue;
            };
            match chart.axis_mut(kind) {
                Ok(axis) => {
                    let mut inner = ApplyReport::new();
                    snapshot.restore(axis, &mut inner);
                    report.absorb(kind.as_str(), inner);
                }
                Err(e) => report.fail(kind.as_str(), &e),
            }
        }

        let mut inner = ApplyReport::new();
        self.legend.restore(chart, &mut inner);
        report.absorb("legend", inner);

        report
    }
}

/// How an in-place chart update went.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartUpdateOutcome {
    /// Data was replaced; formatting restore and overrides are in the report.
    Replaced(ApplyReport),
    /// The model had no data block; only the overrides were applied.
    PropertiesOnly(ApplyReport),
    /// The engine refused to replace the data. The chart was not touched.
    NoOp(EngineError),
}

impl ChartUpdateOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp(_))
    }

    pub fn report(&self) -> Option<&ApplyReport> {
        match self {
            Self::Replaced(report) | Self::PropertiesOnly(report) => Some(report),
            Self::NoOp(_) => None,
        }
    }
}

impl ChartModel {
    /// Push this model's data and chart-level properties into an existing
    /// chart, keeping data label, axis and legend formatting.
    pub fn apply_to_existing_chart(&self, chart: &mut dyn EngineChart) -> ChartUpdateOutcome {
        let Some(payload) = self.data_payload() else {
            let mut report = ApplyReport::new();
            self.apply_overrides(chart, &mut report);
            return ChartUpdateOutcome::PropertiesOnly(report);
        };

        let snapshot = FormattingSnapshot::capture(chart);

        if let Err(e) = chart.replace_data(payload) {
            log::warn!("Chart {:?} data not replaced: {}", self.name, e);
            return ChartUpdateOutcome::NoOp(e);
        }

        let mut report = ApplyReport::new();
        report.absorb("", snapshot.restore(chart));
        self.apply_overrides(chart, &mut report);
        ChartUpdateOutcome::Replaced(report)
    }
}
