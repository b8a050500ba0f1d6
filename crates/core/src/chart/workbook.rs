//! Updating a chart through its embedded workbook only.
//!
//! The chart XML is never touched: each series' formula reference is parsed
//! and the model's values are written into exactly those cells.

use super::ChartModel;
use crate::engine::{ChartPayload, EngineChart, EngineError, EngineSeries, SeriesFormula};
use crate::Result;
use deck_xlsx::{parse_reference, CellValue, WorkbookPackage};

/// Values to write for one formula of one series.
type Column = (SeriesFormula, Vec<CellValue>);

impl ChartModel {
    /// Write this model's data into the chart's embedded workbook.
    ///
    /// Returns `false` when the workbook is missing or unreadable, a
    /// reference does not parse, or the package cannot be saved. The chart
    /// is left unmodified in that case.
    pub fn update_workbook_only(&self, chart: &mut dyn EngineChart) -> bool {
        match self.try_update_workbook(chart) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Workbook-only update of {:?} not applied: {}", self.name, e);
                false
            }
        }
    }

    fn try_update_workbook(&self, chart: &mut dyn EngineChart) -> Result<()> {
        let Some(payload) = self.data_payload() else {
            return Err(EngineError::Unsupported("chart model has no data".into()).into());
        };
        let bytes = chart
            .workbook()?
            .ok_or_else(|| EngineError::Failed("chart has no embedded workbook".into()))?;
        let mut package = WorkbookPackage::from_bytes(&bytes)?;

        if let ChartPayload::Category(data) = payload {
            if !data.categories.is_empty() {
                if let Some(formula) = chart.series(0).and_then(category_formula) {
                    let labels: Vec<CellValue> =
                        data.categories.iter().map(|c| CellValue::from(c.as_str())).collect();
                    write_formula(&mut package, &formula, &labels)?;
                }
            }
        }

        for index in 0..chart.series_count() {
            let Some(series) = chart.series(index) else {
                continue;
            };
            for (which, values) in series_columns(payload, index) {
                let Some(formula) = series.formula(which) else {
                    log::debug!("Series {} has no {:?} reference", index, which);
                    continue;
                };
                write_formula(&mut package, &formula, &values)?;
            }
        }

        let bytes = package.to_bytes()?;
        chart.set_workbook(bytes)?;
        Ok(())
    }
}

fn category_formula(series: &dyn EngineSeries) -> Option<String> {
    series
        .formula(SeriesFormula::CategoryText)
        .or_else(|| series.formula(SeriesFormula::CategoryNumbers))
}

fn write_formula(package: &mut WorkbookPackage, formula: &str, values: &[CellValue]) -> Result<()> {
    let range = parse_reference(formula)?;
    let written = package.write_cells(&range, values)?;
    log::debug!("Wrote {} cells to {}", written, formula);
    Ok(())
}

/// Model values for the live series at `index`. A live series with no model
/// counterpart gets empty columns, which leaves its cells untouched.
fn series_columns(payload: ChartPayload<'_>, index: usize) -> Vec<Column> {
    fn numbers(values: impl Iterator<Item = Option<f64>>) -> Vec<CellValue> {
        values.map(CellValue::from).collect()
    }

    match payload {
        ChartPayload::Category(data) => {
            let values = data
                .series
                .get(index)
                .map(|s| numbers(s.values.iter().copied()))
                .unwrap_or_default();
            vec![(SeriesFormula::Values, values)]
        }
        ChartPayload::Xy(data) => {
            let points = data.series.get(index).map(|s| s.points.as_slice()).unwrap_or(&[]);
            vec![
                (SeriesFormula::X, numbers(points.iter().map(|p| p.x))),
                (SeriesFormula::Y, numbers(points.iter().map(|p| p.y))),
            ]
        }
        ChartPayload::Bubble(data) => {
            let points = data.series.get(index).map(|s| s.points.as_slice()).unwrap_or(&[]);
            vec![
                (SeriesFormula::X, numbers(points.iter().map(|p| p.x))),
                (SeriesFormula::Y, numbers(points.iter().map(|p| p.y))),
                (SeriesFormula::BubbleSize, numbers(points.iter().map(|p| p.size))),
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::sales_chart;
    use super::super::{ChartType, XyChartData, XyPoint, XySeries};
    use super::*;
    use crate::engine::memory::MemoryChart;
    use crate::engine::NativeChartType;
    use deck_xlsx::CellRef;

    fn live_sales_chart() -> MemoryChart {
        let data = sales_chart().category_data.unwrap();
        MemoryChart::new(NativeChartType::ColumnClustered, ChartPayload::Category(&data)).unwrap()
    }

    fn cell(chart: &MemoryChart, address: &str) -> CellValue {
        let bytes = chart.workbook.as_ref().unwrap();
        let package = WorkbookPackage::from_bytes(bytes).unwrap();
        package.cell_value("Sheet1", CellRef::parse(address).unwrap()).unwrap()
    }

    #[test]
    fn test_rewrites_cells_and_keeps_formatting() {
        let mut chart = live_sales_chart();
        chart.style = Some(7);
        chart.value_axis.maximum = Some(50.0);

        let mut model = sales_chart();
        let data = model.category_data.as_mut().unwrap();
        data.categories = vec!["Jan".into(), "Feb".into(), "Mar".into()];
        data.series[1].values = vec![Some(40.0), Some(41.0), Some(42.0)];

        assert!(model.update_workbook_only(&mut chart));
        assert_eq!(cell(&chart, "A2"), CellValue::Text("Jan".into()));
        assert_eq!(cell(&chart, "C3"), CellValue::Number(41.0));
        assert_eq!(cell(&chart, "B4"), CellValue::Number(3.0));

        // Chart XML side is left alone.
        assert_eq!(chart.style, Some(7));
        assert_eq!(chart.value_axis.maximum, Some(50.0));
        assert_eq!(chart.categories, vec!["Q1", "Q2", "Q3"]);
    }

    #[test]
    fn test_short_model_leaves_extra_cells_untouched() {
        let mut chart = live_sales_chart();
        chart.series[0]
            .formulas
            .insert(SeriesFormula::Values, "Sheet1!$B$1:$B$5".into());

        let mut model = sales_chart();
        model.category_data.as_mut().unwrap().series[0].values =
            vec![Some(7.0), Some(8.0), Some(9.0)];

        assert!(model.update_workbook_only(&mut chart));
        assert_eq!(cell(&chart, "B1"), CellValue::Number(7.0));
        assert_eq!(cell(&chart, "B3"), CellValue::Number(9.0));
        assert_eq!(cell(&chart, "B4"), CellValue::Number(3.0));
        assert_eq!(cell(&chart, "B5"), CellValue::Empty);
    }

    #[test]
    fn test_scatter_columns() {
        let mut model = ChartModel::new(ChartType::Scatter, 0.0, 0.0, 100.0, 100.0);
        model.xy_data = Some(XyChartData {
            series: vec![XySeries {
                name: "Fit".into(),
                points: vec![XyPoint { x: Some(1.0), y: Some(2.0) }],
                number_format: None,
            }],
        });
        let mut chart = MemoryChart::new(
            NativeChartType::XyScatter,
            ChartPayload::Xy(model.xy_data.as_ref().unwrap()),
        )
        .unwrap();

        model.xy_data.as_mut().unwrap().series[0].points[0] = XyPoint { x: Some(5.0), y: None };
        assert!(model.update_workbook_only(&mut chart));
        assert_eq!(cell(&chart, "A2"), CellValue::Number(5.0));
        assert_eq!(cell(&chart, "B2"), CellValue::Empty);
    }

    #[test]
    fn test_unparseable_formula_fails_without_saving() {
        let mut chart = live_sales_chart();
        chart.series[1]
            .formulas
            .insert(SeriesFormula::Values, "=SUM(B2:B4)+1".into());
        let before = chart.workbook.clone();

        assert!(!sales_chart().update_workbook_only(&mut chart));
        assert_eq!(chart.workbook, before);
    }

    #[test]
    fn test_missing_or_unwritable_workbook_fails() {
        let mut chart = live_sales_chart();
        chart.workbook = None;
        assert!(!sales_chart().update_workbook_only(&mut chart));

        let mut chart = live_sales_chart();
        chart.workbook = Some(b"not a zip".to_vec());
        assert!(!sales_chart().update_workbook_only(&mut chart));

        let mut chart = live_sales_chart();
        chart.faults.insert("set_workbook");
        assert!(!sales_chart().update_workbook_only(&mut chart));
    }

    #[test]
    fn test_unknown_sheet_fails() {
        let mut chart = live_sales_chart();
        chart.series[0]
            .formulas
            .insert(SeriesFormula::Values, "'Q data'!$B$2:$B$4".into());
        assert!(!sales_chart().update_workbook_only(&mut chart));
    }
}
