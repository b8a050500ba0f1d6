//! Snapshotting a live chart into a [`ChartModel`].
//!
//! Extraction never fails: an unreadable piece becomes an empty or default
//! value and the rest of the chart is still read.

use super::{
    detect_family, BubbleChartData, BubblePoint, BubbleSeries, CategoryChartData, CategorySeries,
    ChartFamily, ChartModel, ChartType, XyChartData, XyPoint, XySeries, MAX_STYLE, MIN_STYLE,
};
use crate::engine::{EngineChart, EngineSeries, EngineShape, PointDimension};
use crate::shape::Placement;

impl ChartModel {
    pub fn from_engine(shape: &dyn EngineShape, chart: &dyn EngineChart) -> Self {
        let placement = Placement::read(shape);
        let chart_type = chart
            .chart_type()
            .map(detect_family)
            .unwrap_or_else(|e| {
                log::debug!("Unreadable chart type, assuming column: {}", e);
                ChartType::default()
            });

        let title = match chart.has_title() {
            Ok(true) => chart.title_text().ok().flatten(),
            _ => None,
        };

        let mut model = Self {
            name: placement.name,
            left_pt: placement.left_pt,
            top_pt: placement.top_pt,
            width_pt: placement.width_pt,
            height_pt: placement.height_pt,
            rotation: placement.rotation,
            chart_type,
            title,
            has_legend: chart.has_legend().ok(),
            style: chart
                .style()
                .ok()
                .flatten()
                .filter(|style| (MIN_STYLE..=MAX_STYLE).contains(style)),
            category_data: None,
            xy_data: None,
            bubble_data: None,
        };

        match chart_type.family() {
            ChartFamily::Category => model.category_data = Some(category_data(chart)),
            ChartFamily::Xy => model.xy_data = Some(xy_data(chart)),
            ChartFamily::Bubble => model.bubble_data = Some(bubble_data(chart)),
        }
        model
    }
}

fn all_series(chart: &dyn EngineChart) -> impl Iterator<Item = &dyn EngineSeries> {
    (0..chart.series_count()).filter_map(move |i| chart.series(i))
}

fn series_name(series: &dyn EngineSeries) -> String {
    series.name().ok().flatten().unwrap_or_default()
}

fn category_data(chart: &dyn EngineChart) -> CategoryChartData {
    CategoryChartData {
        categories: chart.categories().unwrap_or_default(),
        series: all_series(chart)
            .map(|series| CategorySeries {
                name: series_name(series),
                values: series.values().unwrap_or_default(),
                number_format: None,
            })
            .collect(),
    }
}

/// Number of complete points across `dimensions`, or `None` when any of them
/// has no per-point storage.
fn paired_count(series: &dyn EngineSeries, dimensions: &[PointDimension]) -> Option<usize> {
    dimensions
        .iter()
        .map(|dim| series.point_count(*dim).ok().flatten())
        .try_fold(usize::MAX, |count, n| n.map(|n| count.min(n)))
}

fn point(series: &dyn EngineSeries, dim: PointDimension, index: usize) -> Option<f64> {
    series.point_value(dim, index).ok().flatten()
}

/// Fall back to the series values, with the point index standing in for x.
fn indexed_values(series: &dyn EngineSeries) -> impl Iterator<Item = (f64, Option<f64>)> {
    series
        .values()
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, y)| (i as f64, y))
}

fn xy_data(chart: &dyn EngineChart) -> XyChartData {
    let dims = [PointDimension::X, PointDimension::Y];
    XyChartData {
        series: all_series(chart)
            .map(|series| {
                let points = match paired_count(series, &dims) {
                    Some(count) => (0..count)
                        .map(|i| XyPoint {
                            x: point(series, PointDimension::X, i),
                            y: point(series, PointDimension::Y, i),
                        })
                        .collect(),
                    None => indexed_values(series)
                        .map(|(x, y)| XyPoint { x: Some(x), y })
                        .collect(),
                };
                XySeries {
                    name: series_name(series),
                    points,
                    number_format: None,
                }
            })
            .collect(),
    }
}

fn bubble_data(chart: &dyn EngineChart) -> BubbleChartData {
    let dims = [PointDimension::X, PointDimension::Y, PointDimension::BubbleSize];
    BubbleChartData {
        series: all_series(chart)
            .map(|series| {
                let points = match paired_count(series, &dims) {
                    Some(count) => (0..count)
                        .map(|i| BubblePoint {
                            x: point(series, PointDimension::X, i),
                            y: point(series, PointDimension::Y, i),
                            size: point(series, PointDimension::BubbleSize, i),
                        })
                        .collect(),
                    None => indexed_values(series)
                        .map(|(x, y)| BubblePoint {
                            x: Some(x),
                            y,
                            size: None,
                        })
                        .collect(),
                };
                BubbleSeries {
                    name: series_name(series),
                    points,
                    number_format: None,
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{MemoryChart, MemoryShape, MemorySeries, ShapeContent};
    use crate::engine::{Geometry, NativeChartType};
    use crate::json::JsonModel;

    fn chart_shape(chart: MemoryChart) -> MemoryShape {
        MemoryShape::new(
            Some("Chart 1".into()),
            Geometry {
                left: 12_700,
                top: 25_400,
                width: 1_270_000,
                height: 635_000,
            },
            ShapeContent::Chart(chart),
        )
    }

    fn extract(shape: &MemoryShape) -> ChartModel {
        let chart = shape.as_chart().unwrap();
        ChartModel::from_engine(shape, chart)
    }

    #[test]
    fn test_scatter_truncates_to_shorter_dimension() {
        let mut series = MemorySeries::named("Trend");
        series.x_values = Some(vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]);
        series.y_values = Some(vec![Some(10.0), Some(20.0), Some(30.0)]);

        let mut chart = MemoryChart::empty(NativeChartType::XyScatterLines);
        chart.series.push(series);

        let model = extract(&chart_shape(chart));
        assert_eq!(model.chart_type, ChartType::Scatter);
        let points = &model.xy_data.as_ref().unwrap().series[0].points;
        assert_eq!(points.len(), 3);
        assert_eq!(points[2], XyPoint { x: Some(3.0), y: Some(30.0) });
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_scatter_without_point_storage_uses_index() {
        let mut series = MemorySeries::named("Plain");
        series.values = vec![Some(7.0), None];

        let mut chart = MemoryChart::empty(NativeChartType::XyScatter);
        chart.series.push(series);

        let model = extract(&chart_shape(chart));
        let points = &model.xy_data.unwrap().series[0].points;
        assert_eq!(
            points,
            &vec![
                XyPoint { x: Some(0.0), y: Some(7.0) },
                XyPoint { x: Some(1.0), y: None },
            ]
        );
    }

    #[test]
    fn test_bubble_size_lookup_failure_keeps_point() {
        let mut series = MemorySeries::named("Markets");
        series.x_values = Some(vec![Some(1.0), Some(2.0)]);
        series.y_values = Some(vec![Some(3.0), Some(4.0)]);
        series.bubble_sizes = Some(vec![Some(5.0), Some(6.0), Some(7.0)]);
        series.faults.insert("point_value.bubble_size");

        let mut chart = MemoryChart::empty(NativeChartType::BubbleThreeDEffect);
        chart.series.push(series);

        let model = extract(&chart_shape(chart));
        let points = &model.bubble_data.unwrap().series[0].points;
        assert_eq!(points.len(), 2);
        assert_eq!(
            points[1],
            BubblePoint {
                x: Some(2.0),
                y: Some(4.0),
                size: None
            }
        );
    }

    #[test]
    fn test_category_extraction() {
        let mut east = MemorySeries::named("East");
        east.values = vec![Some(1.0), Some(2.0)];

        let mut chart = MemoryChart::empty(NativeChartType::LineMarkers);
        chart.categories = vec!["Jan".into(), "Feb".into()];
        chart.series.push(east);
        chart.title = Some("Trend".into());
        chart.style = Some(3);

        let model = extract(&chart_shape(chart));
        assert_eq!(model.chart_type, ChartType::LineMarkers);
        assert_eq!(model.title.as_deref(), Some("Trend"));
        assert_eq!(model.style, Some(3));
        assert_eq!(model.has_legend, Some(false));
        assert_eq!(model.name.as_deref(), Some("Chart 1"));
        assert_eq!((model.left_pt, model.top_pt), (1.0, 2.0));
        assert_eq!((model.width_pt, model.height_pt), (100.0, 50.0));

        let data = model.category_data.unwrap();
        assert_eq!(data.categories, vec!["Jan", "Feb"]);
        assert_eq!(data.series[0].values, vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_failing_getters_degrade_to_defaults() {
        let mut chart = MemoryChart::empty(NativeChartType::Pie);
        chart.title = Some("Hidden".into());
        chart.style = Some(99);
        for op in ["chart_type", "title_text", "has_legend", "categories"] {
            chart.faults.insert(op);
        }
        let mut series = MemorySeries::named("Share");
        series.faults.insert("values");
        chart.series.push(series);

        let model = extract(&chart_shape(chart));
        assert_eq!(model.chart_type, ChartType::ColumnClustered);
        assert_eq!(model.title, None);
        assert_eq!(model.has_legend, None);
        assert_eq!(model.style, None);

        let data = model.category_data.as_ref().unwrap();
        assert!(data.categories.is_empty());
        assert_eq!(data.series[0].name, "Share");
        assert!(data.series[0].values.is_empty());
        assert!(model.validate().is_ok());
    }
}
