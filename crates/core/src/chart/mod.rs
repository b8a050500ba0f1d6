//! Charts: type detection, data blocks, creation and in-place updates.
//!
//! A chart carries at most one data block, matching its family:
//!
//! | family   | chart types                                         | block           |
//! |----------|-----------------------------------------------------|-----------------|
//! | category | column, bar, line, line with markers, pie, doughnut, area | `category_data` |
//! | xy       | scatter                                             | `xy_data`       |
//! | bubble   | bubble                                              | `bubble_data`   |
//!
//! Besides full creation ([`ChartModel::apply_to_slide`]) there are two ways
//! to push new data into an existing chart: replacing its series while
//! carrying formatting across ([`ChartModel::apply_to_existing_chart`]), and
//! rewriting only the cells of its embedded workbook
//! ([`ChartModel::update_workbook_only`]).

mod build;
mod extract;
mod update;
mod workbook;

pub use update::{
    AxisSnapshot, ChartUpdateOutcome, DataLabelSnapshot, FormattingSnapshot, LegendSnapshot,
};

use crate::engine::{ChartPayload, NativeChartType};
use crate::json::{check_range, JsonModel};
use crate::shape::{validate_placement, Placement};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

pub const MIN_STYLE: u8 = 1;
pub const MAX_STYLE: u8 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    #[default]
    ColumnClustered,
    BarClustered,
    Line,
    LineMarkers,
    Pie,
    Doughnut,
    Area,
    Scatter,
    Bubble,
}

/// Which data block a chart type is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFamily {
    Category,
    Xy,
    Bubble,
}

impl ChartType {
    pub fn family(&self) -> ChartFamily {
        match self {
            Self::Scatter => ChartFamily::Xy,
            Self::Bubble => ChartFamily::Bubble,
            _ => ChartFamily::Category,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ColumnClustered => "column_clustered",
            Self::BarClustered => "bar_clustered",
            Self::Line => "line",
            Self::LineMarkers => "line_markers",
            Self::Pie => "pie",
            Self::Doughnut => "doughnut",
            Self::Area => "area",
            Self::Scatter => "scatter",
            Self::Bubble => "bubble",
        }
    }
}

/// Collapse an engine chart type to a portable one.
///
/// Every scatter variant becomes [`ChartType::Scatter`] and both bubble
/// variants [`ChartType::Bubble`]. Types without a portable counterpart fall
/// back to [`ChartType::ColumnClustered`].
pub fn detect_family(native: NativeChartType) -> ChartType {
    match native {
        NativeChartType::ColumnClustered => ChartType::ColumnClustered,
        NativeChartType::BarClustered => ChartType::BarClustered,
        NativeChartType::Line => ChartType::Line,
        NativeChartType::LineMarkers => ChartType::LineMarkers,
        NativeChartType::Pie => ChartType::Pie,
        NativeChartType::Doughnut => ChartType::Doughnut,
        NativeChartType::Area => ChartType::Area,
        NativeChartType::XyScatter
        | NativeChartType::XyScatterLines
        | NativeChartType::XyScatterLinesNoMarkers
        | NativeChartType::XyScatterSmooth
        | NativeChartType::XyScatterSmoothNoMarkers => ChartType::Scatter,
        NativeChartType::Bubble | NativeChartType::BubbleThreeDEffect => ChartType::Bubble,
        _ => ChartType::ColumnClustered,
    }
}

pub fn to_native_chart_type(chart_type: ChartType) -> NativeChartType {
    match chart_type {
        ChartType::ColumnClustered => NativeChartType::ColumnClustered,
        ChartType::BarClustered => NativeChartType::BarClustered,
        ChartType::Line => NativeChartType::Line,
        ChartType::LineMarkers => NativeChartType::LineMarkers,
        ChartType::Pie => NativeChartType::Pie,
        ChartType::Doughnut => NativeChartType::Doughnut,
        ChartType::Area => NativeChartType::Area,
        ChartType::Scatter => NativeChartType::XyScatter,
        ChartType::Bubble => NativeChartType::Bubble,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategorySeries {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub values: Vec<Option<f64>>,
    pub number_format: Option<String>,
}

/// Category labels shared by every series, plus the series themselves.
///
/// Series are expected to hold one value per category; this is not enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryChartData {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub series: Vec<CategorySeries>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct XyPoint {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct XySeries {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub points: Vec<XyPoint>,
    pub number_format: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct XyChartData {
    #[serde(default)]
    pub series: Vec<XySeries>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BubblePoint {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub size: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BubbleSeries {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub points: Vec<BubblePoint>,
    pub number_format: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BubbleChartData {
    #[serde(default)]
    pub series: Vec<BubbleSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartModel {
    pub name: Option<String>,
    pub left_pt: f64,
    pub top_pt: f64,
    pub width_pt: f64,
    pub height_pt: f64,
    pub rotation: Option<f64>,

    #[serde(default)]
    pub chart_type: ChartType,
    pub title: Option<String>,
    pub has_legend: Option<bool>,
    /// Built-in chart style, 1 to 48.
    pub style: Option<u8>,

    pub category_data: Option<CategoryChartData>,
    pub xy_data: Option<XyChartData>,
    pub bubble_data: Option<BubbleChartData>,
}

impl ChartModel {
    /// An empty chart of `chart_type` at the given position, in points.
    pub fn new(
        chart_type: ChartType,
        left_pt: f64,
        top_pt: f64,
        width_pt: f64,
        height_pt: f64,
    ) -> Self {
        Self {
            name: None,
            left_pt,
            top_pt,
            width_pt,
            height_pt,
            rotation: None,
            chart_type,
            title: None,
            has_legend: None,
            style: None,
            category_data: None,
            xy_data: None,
            bubble_data: None,
        }
    }

    pub(crate) fn placement(&self) -> Placement {
        Placement {
            name: self.name.clone(),
            left_pt: self.left_pt,
            top_pt: self.top_pt,
            width_pt: self.width_pt,
            height_pt: self.height_pt,
            rotation: self.rotation,
        }
    }

    /// The populated data block, checked in category, xy, bubble order.
    pub fn data_payload(&self) -> Option<ChartPayload<'_>> {
        if let Some(data) = &self.category_data {
            Some(ChartPayload::Category(data))
        } else if let Some(data) = &self.xy_data {
            Some(ChartPayload::Xy(data))
        } else {
            self.bubble_data.as_ref().map(ChartPayload::Bubble)
        }
    }
}

impl JsonModel for ChartModel {
    fn validate(&self) -> Result<()> {
        validate_placement(
            self.left_pt,
            self.top_pt,
            self.width_pt,
            self.height_pt,
            self.rotation,
        )?;

        if let Some(style) = self.style {
            check_range("style", f64::from(style), f64::from(MIN_STYLE), f64::from(MAX_STYLE))?;
        }

        let blocks = [
            (self.category_data.is_some(), ChartFamily::Category, "category_data"),
            (self.xy_data.is_some(), ChartFamily::Xy, "xy_data"),
            (self.bubble_data.is_some(), ChartFamily::Bubble, "bubble_data"),
        ];
        let present: Vec<_> = blocks.iter().filter(|(set, _, _)| *set).collect();

        if present.len() > 1 {
            let names: Vec<&str> = present.iter().map(|(_, _, name)| *name).collect();
            return Err(Error::validation(format!(
                "chart carries more than one data block: {}",
                names.join(", ")
            )));
        }
        if let Some((_, family, name)) = present.first() {
            if *family != self.chart_type.family() {
                return Err(Error::validation(format!(
                    "{} does not match chart type {}",
                    name,
                    self.chart_type.as_str()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sales_chart() -> ChartModel {
        ChartModel {
            name: Some("Sales".into()),
            title: Some("Quarterly sales".into()),
            has_legend: Some(true),
            style: Some(10),
            rotation: Some(0.0),
            category_data: Some(CategoryChartData {
                categories: vec!["Q1".into(), "Q2".into(), "Q3".into()],
                series: vec![
                    CategorySeries {
                        name: "East".into(),
                        values: vec![Some(1.0), Some(2.0), Some(3.0)],
                        number_format: None,
                    },
                    CategorySeries {
                        name: "West".into(),
                        values: vec![Some(4.0), None, Some(6.0)],
                        number_format: None,
                    },
                ],
            }),
            ..ChartModel::new(ChartType::ColumnClustered, 36.0, 72.0, 480.0, 270.0)
        }
    }

    #[test]
    fn test_detect_family() {
        assert_eq!(detect_family(NativeChartType::XyScatterSmooth), ChartType::Scatter);
        assert_eq!(detect_family(NativeChartType::XyScatterLinesNoMarkers), ChartType::Scatter);
        assert_eq!(detect_family(NativeChartType::BubbleThreeDEffect), ChartType::Bubble);
        assert_eq!(detect_family(NativeChartType::Doughnut), ChartType::Doughnut);
        assert_eq!(detect_family(NativeChartType::Radar), ChartType::ColumnClustered);
        assert_eq!(detect_family(NativeChartType::ColumnStacked), ChartType::ColumnClustered);
    }

    #[test]
    fn test_native_type_round_trip() {
        for chart_type in [
            ChartType::ColumnClustered,
            ChartType::BarClustered,
            ChartType::Line,
            ChartType::LineMarkers,
            ChartType::Pie,
            ChartType::Doughnut,
            ChartType::Area,
            ChartType::Scatter,
            ChartType::Bubble,
        ] {
            assert_eq!(detect_family(to_native_chart_type(chart_type)), chart_type);
        }
    }

    #[test]
    fn test_payload_priority() {
        let mut chart = sales_chart();
        assert!(matches!(chart.data_payload(), Some(ChartPayload::Category(_))));

        chart.category_data = None;
        assert!(chart.data_payload().is_none());

        chart.bubble_data = Some(BubbleChartData::default());
        assert!(matches!(chart.data_payload(), Some(ChartPayload::Bubble(_))));
    }

    #[test]
    fn test_validation() {
        assert!(sales_chart().validate().is_ok());

        let mut chart = sales_chart();
        chart.style = Some(0);
        assert!(chart.validate().is_err());
        chart.style = Some(49);
        assert!(chart.validate().is_err());

        let mut chart = sales_chart();
        chart.xy_data = Some(XyChartData::default());
        assert!(chart.validate().is_err());

        let mut chart = sales_chart();
        chart.chart_type = ChartType::Scatter;
        assert!(chart.validate().is_err());

        let mut chart = sales_chart();
        chart.category_data = None;
        assert!(chart.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let chart = sales_chart();
        let json = chart.to_json_pretty().unwrap();
        assert!(json.contains("\"chart_type\": \"column_clustered\""));
        assert!(json.contains("\"xy_data\": null"));
        assert_eq!(ChartModel::from_json(&json).unwrap(), chart);
    }

    #[test]
    fn test_json_rejects_unknown_chart_type() {
        let json = r#"{"left_pt": 0, "top_pt": 0, "width_pt": 10, "height_pt": 10,
                       "chart_type": "radar"}"#;
        assert!(ChartModel::from_json(json).is_err());
    }
}
