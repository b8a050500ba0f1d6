//! The whole deck: building, extracting, and patching charts in place.

use crate::chart::{ChartModel, ChartUpdateOutcome};
use crate::engine::{EngineChart, EngineDocument, EngineSlide};
use crate::json::JsonModel;
use crate::report::ApplyReport;
use crate::slide::SlideModel;
use crate::units::{emu_to_inches, inches_to_emu};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresentationModel {
    /// Slide size in inches. `None` keeps the engine's default.
    pub slide_width_in: Option<f64>,
    pub slide_height_in: Option<f64>,
    #[serde(default)]
    pub slides: Vec<SlideModel>,
}

/// How one chart was patched.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchMethod {
    /// Only the embedded workbook cells were rewritten.
    WorkbookOnly,
    /// The chart's data was replaced, carrying its formatting across.
    Formatting(ChartUpdateOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPatch {
    pub slide: usize,
    /// Position of the chart among the model slide's charts.
    pub chart: usize,
    /// Index of the paired shape on the live slide.
    pub shape: usize,
    pub name: Option<String>,
    pub method: PatchMethod,
}

/// A model chart that found no live chart to update.
#[derive(Debug, Clone, PartialEq)]
pub struct UnpairedChart {
    pub slide: usize,
    pub chart: usize,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchReport {
    pub patched: Vec<ChartPatch>,
    pub unpaired: Vec<UnpairedChart>,
}

impl PatchReport {
    /// Charts whose update left the live chart unchanged.
    pub fn noops(&self) -> impl Iterator<Item = &ChartPatch> {
        self.patched
            .iter()
            .filter(|p| matches!(&p.method, PatchMethod::Formatting(outcome) if outcome.is_noop()))
    }
}

impl PresentationModel {
    pub fn from_engine(doc: &dyn EngineDocument) -> Self {
        let inches = |emu: Option<i64>| emu.filter(|e| *e > 0).map(emu_to_inches);
        Self {
            slide_width_in: inches(doc.slide_width().ok().flatten()),
            slide_height_in: inches(doc.slide_height().ok().flatten()),
            slides: (0..doc.slide_count())
                .filter_map(|i| doc.slide(i))
                .map(SlideModel::from_engine)
                .collect(),
        }
    }

    /// Add this model's slides to `doc`.
    ///
    /// A slide whose layout index is missing or out of range uses layout 0.
    /// Fails only when the engine refuses to add a slide.
    pub fn build_into(&self, doc: &mut dyn EngineDocument) -> Result<ApplyReport> {
        let mut report = ApplyReport::new();
        if let Some(width) = self.slide_width_in {
            report.record("slide_width_in", doc.set_slide_width(inches_to_emu(width)));
        }
        if let Some(height) = self.slide_height_in {
            report.record("slide_height_in", doc.set_slide_height(inches_to_emu(height)));
        }

        for (i, slide_model) in self.slides.iter().enumerate() {
            let layout = match slide_model.layout_index {
                Some(index) if index < doc.layout_count() => index,
                Some(index) => {
                    log::debug!("Slide {} asks for missing layout {}, using 0", i, index);
                    0
                }
                None => 0,
            };
            let slide = doc.add_slide(layout)?;
            report.absorb(&format!("slides[{}]", i), slide_model.apply_to(slide));
        }
        Ok(report)
    }

    /// Push chart data from this model into the charts of an existing deck.
    ///
    /// Slides are walked in parallel up to the shorter of the two decks.
    /// Model charts are paired with the slide's live charts by
    /// [`pair_charts`]. With `strict`, each pair first tries the
    /// workbook-only update and falls back to replacing the data; otherwise
    /// data is replaced directly. One failing chart never stops the rest.
    pub fn patch_charts(&self, doc: &mut dyn EngineDocument, strict: bool) -> PatchReport {
        let mut report = PatchReport::default();
        let count = self.slides.len().min(doc.slide_count());
        if self.slides.len() != doc.slide_count() {
            log::debug!(
                "Patching {} slides: model has {}, document has {}",
                count,
                self.slides.len(),
                doc.slide_count()
            );
        }

        for index in 0..count {
            let Some(slide) = doc.slide_mut(index) else {
                continue;
            };
            patch_slide(index, &self.slides[index], slide, strict, &mut report);
        }
        report
    }
}

fn patch_slide(
    index: usize,
    model: &SlideModel,
    slide: &mut dyn EngineSlide,
    strict: bool,
    report: &mut PatchReport,
) {
    let charts: Vec<&ChartModel> = model.charts().collect();
    let chart_shapes: Vec<usize> = (0..slide.shape_count())
        .filter(|&i| slide.shape(i).is_some_and(|shape| shape.chart().is_some()))
        .collect();

    let model_names: Vec<Option<String>> = charts.iter().map(|c| c.name.clone()).collect();
    let live_names: Vec<Option<String>> = chart_shapes
        .iter()
        .map(|&i| slide.shape(i).and_then(|shape| shape.name()))
        .collect();
    let pairs = pair_charts(&model_names, &live_names);

    for (chart_index, chart) in charts.iter().enumerate() {
        if !pairs.iter().any(|(m, _)| *m == chart_index) {
            log::warn!(
                "Slide {}: no live chart left for model chart {:?}",
                index,
                chart.name
            );
            report.unpaired.push(UnpairedChart {
                slide: index,
                chart: chart_index,
                name: chart.name.clone(),
            });
        }
    }

    for (chart_index, live_index) in pairs {
        let shape_index = chart_shapes[live_index];
        let model = charts[chart_index];
        let Some(live) = slide.shape_mut(shape_index).and_then(|shape| shape.chart_mut()) else {
            continue;
        };
        report.patched.push(ChartPatch {
            slide: index,
            chart: chart_index,
            shape: shape_index,
            name: model.name.clone(),
            method: patch_chart(model, live, strict),
        });
    }
}

fn patch_chart(model: &ChartModel, chart: &mut dyn EngineChart, strict: bool) -> PatchMethod {
    if strict {
        if model.update_workbook_only(chart) {
            return PatchMethod::WorkbookOnly;
        }
        log::warn!(
            "Workbook-only update of chart {:?} failed, replacing its data instead",
            model.name
        );
    }
    PatchMethod::Formatting(model.apply_to_existing_chart(chart))
}

/// Pair model charts with live charts on one slide.
///
/// Both lists hold chart names in order. A model chart first takes the first
/// unused live chart with the same non-empty name; the model charts left over
/// then take the remaining live charts in order. Model charts beyond the
/// available live charts are left out. Pairs are `(model, live)` indices in
/// model order.
pub fn pair_charts(models: &[Option<String>], live: &[Option<String>]) -> Vec<(usize, usize)> {
    let mut used = vec![false; live.len()];

    let by_name: Vec<Option<usize>> = models
        .iter()
        .map(|name| {
            let name = name.as_deref().filter(|n| !n.is_empty())?;
            let found = (0..live.len()).find(|&j| !used[j] && live[j].as_deref() == Some(name))?;
            used[found] = true;
            Some(found)
        })
        .collect();

    let mut free = (0..live.len())
        .filter(|&j| !used[j])
        .collect::<Vec<_>>()
        .into_iter();

    by_name
        .into_iter()
        .enumerate()
        .filter_map(|(i, matched)| matched.or_else(|| free.next()).map(|j| (i, j)))
        .collect()
}

impl JsonModel for PresentationModel {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("slide_width_in", self.slide_width_in),
            ("slide_height_in", self.slide_height_in),
        ] {
            if let Some(inches) = value.filter(|v| !(v.is_finite() && *v > 0.0)) {
                return Err(Error::validation(format!(
                    "{} must be a positive number of inches, got {}",
                    field, inches
                )));
            }
        }
        self.slides.iter().try_for_each(SlideModel::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{CategoryChartData, CategorySeries, ChartType};
    use crate::engine::memory::{MemoryDocument, MemoryLegend};
    use crate::engine::{LegendPosition, SeriesFormula};
    use crate::shape::{ShapeModel, TextBoxModel, UnknownShapeModel};
    use crate::units::emu_to_pt;
    use crate::table::TableModel;
    use crate::text::TextFrameModel;

    fn names(list: &[&str]) -> Vec<Option<String>> {
        list.iter()
            .map(|n| (!n.is_empty()).then(|| n.to_string()))
            .collect()
    }

    fn chart(name: &str, values: [f64; 2]) -> ChartModel {
        let mut chart = ChartModel::new(ChartType::ColumnClustered, 0.0, 0.0, 200.0, 100.0);
        chart.name = Some(name.into());
        chart.category_data = Some(CategoryChartData {
            categories: vec!["a".into(), "b".into()],
            series: vec![CategorySeries {
                name: "s".into(),
                values: values.iter().copied().map(Some).collect(),
                number_format: None,
            }],
        });
        chart
    }

    fn deck(charts: Vec<ChartModel>) -> PresentationModel {
        PresentationModel {
            slide_width_in: Some(10.0),
            slide_height_in: Some(5.625),
            slides: vec![SlideModel {
                layout_index: Some(6),
                shapes: charts.into_iter().map(ShapeModel::Chart).collect(),
            }],
        }
    }

    fn live(model: &PresentationModel) -> MemoryDocument {
        let mut doc = MemoryDocument::new();
        model.build_into(&mut doc).unwrap();
        doc
    }

    #[test]
    fn test_pair_by_name_then_order() {
        assert_eq!(
            pair_charts(&names(&["A", "B"]), &names(&["B", "C"])),
            vec![(0, 1), (1, 0)]
        );
        assert_eq!(
            pair_charts(&names(&["", "X", "Y"]), &names(&["Y", ""])),
            vec![(0, 1), (2, 0)]
        );
        assert_eq!(
            pair_charts(&names(&["A", "A"]), &names(&["A", "A", "B"])),
            vec![(0, 0), (1, 1)]
        );
        assert!(pair_charts(&names(&["A"]), &[]).is_empty());
    }

    #[test]
    fn test_build_extract_round_trip() {
        let mut model = deck(vec![chart("Revenue", [1.0, 2.0])]);
        model.slides[0].shapes.insert(
            0,
            ShapeModel::TextBox(TextBoxModel {
                name: Some("Title".into()),
                left_pt: 20.0,
                top_pt: 10.0,
                width_pt: 500.0,
                height_pt: 40.0,
                rotation: None,
                text_frame: TextFrameModel::from_text("Q3 review\nDraft"),
            }),
        );
        model.slides[0].shapes.push(ShapeModel::Table(TableModel {
            rows: vec![vec!["k".into(), "v".into()]],
            ..TableModel::from_json(
                r#"{"left_pt": 0, "top_pt": 300, "width_pt": 100, "height_pt": 20}"#,
            )
            .unwrap()
        }));

        let first = PresentationModel::from_engine(&live(&model));
        assert_eq!(first.slide_width_in, Some(10.0));
        assert_eq!(first.slide_height_in, Some(5.625));
        assert_eq!(first.slides[0].layout_index, Some(6));

        let shapes = &first.slides[0].shapes;
        assert_eq!(shapes.len(), 3);
        let ShapeModel::TextBox(title) = &shapes[0] else {
            panic!("expected the title first");
        };
        assert_eq!(title.text_frame.text(), "Q3 review\nDraft");
        let revenue = shapes[1].as_chart().unwrap();
        assert_eq!(revenue.category_data, chart("Revenue", [1.0, 2.0]).category_data);

        let second = PresentationModel::from_engine(&live(&first));
        assert_eq!(second, first);
    }

    #[test]
    fn test_missing_layout_falls_back_to_first() {
        let mut model = deck(Vec::new());
        model.slides[0].layout_index = Some(99);
        model.slides.push(SlideModel::default());

        let doc = live(&model);
        assert_eq!(doc.slides[0].layout_index, Some(0));
        assert_eq!(doc.slides[1].layout_index, Some(0));
    }

    #[test]
    fn test_patch_pairs_by_name_and_keeps_formatting() {
        let mut doc = live(&deck(vec![chart("B", [1.0, 1.0]), chart("C", [2.0, 2.0])]));
        let live_b = doc.slides[0].shapes[0].as_chart_mut().unwrap();
        live_b.legend = Some(MemoryLegend {
            position: Some(LegendPosition::Top),
            ..MemoryLegend::default()
        });

        let update = deck(vec![chart("A", [10.0, 11.0]), chart("B", [20.0, 21.0])]);
        let report = update.patch_charts(&mut doc, false);

        assert_eq!(report.patched.len(), 2);
        assert!(report.unpaired.is_empty());
        assert_eq!(report.noops().count(), 0);

        let shapes = &doc.slides[0].shapes;
        let b = shapes[0].as_chart().unwrap();
        assert_eq!(b.series[0].values, vec![Some(20.0), Some(21.0)]);
        assert_eq!(b.legend.as_ref().unwrap().position, Some(LegendPosition::Top));
        let c = shapes[1].as_chart().unwrap();
        assert_eq!(c.series[0].values, vec![Some(10.0), Some(11.0)]);
        assert_eq!(shapes[1].name.as_deref(), Some("C"));
    }

    #[test]
    fn test_strict_falls_back_for_broken_chart_only() {
        let mut doc = live(&deck(vec![chart("Good", [1.0, 1.0]), chart("Broken", [2.0, 2.0])]));
        doc.slides[0].shapes[1].as_chart_mut().unwrap().series[0]
            .formulas
            .insert(SeriesFormula::Values, "not a reference".into());

        let update = deck(vec![chart("Good", [5.0, 6.0]), chart("Broken", [7.0, 8.0])]);
        let report = update.patch_charts(&mut doc, true);

        assert_eq!(report.patched[0].method, PatchMethod::WorkbookOnly);
        assert!(matches!(
            &report.patched[1].method,
            PatchMethod::Formatting(ChartUpdateOutcome::Replaced(_))
        ));

        let shapes = &doc.slides[0].shapes;
        // Workbook-only leaves the chart's cached series alone.
        assert_eq!(shapes[0].as_chart().unwrap().series[0].values, vec![Some(1.0), Some(1.0)]);
        assert_eq!(shapes[1].as_chart().unwrap().series[0].values, vec![Some(7.0), Some(8.0)]);
    }

    #[test]
    fn test_failing_chart_does_not_stop_siblings() {
        let mut doc = live(&deck(vec![chart("One", [1.0, 1.0]), chart("Two", [2.0, 2.0])]));
        doc.slides[0].shapes[0]
            .as_chart_mut()
            .unwrap()
            .faults
            .insert("replace_data");

        let update = deck(vec![
            chart("One", [3.0, 3.0]),
            chart("Two", [4.0, 4.0]),
            chart("Three", [5.0, 5.0]),
        ]);
        let report = update.patch_charts(&mut doc, false);

        assert_eq!(report.noops().count(), 1);
        assert_eq!(report.unpaired.len(), 1);
        assert_eq!(report.unpaired[0].name.as_deref(), Some("Three"));

        let shapes = &doc.slides[0].shapes;
        assert_eq!(shapes[0].as_chart().unwrap().series[0].values, vec![Some(1.0), Some(1.0)]);
        assert_eq!(shapes[1].as_chart().unwrap().series[0].values, vec![Some(4.0), Some(4.0)]);
        assert_eq!(shapes.len(), 2);
    }

    #[test]
    fn test_extra_slides_are_ignored() {
        let mut doc = live(&deck(vec![chart("A", [1.0, 1.0])]));
        let mut update = deck(vec![chart("A", [2.0, 2.0])]);
        update.slides.push(deck(vec![chart("Z", [0.0, 0.0])]).slides.remove(0));

        let report = update.patch_charts(&mut doc, false);
        assert_eq!(report.patched.len(), 1);
        assert!(report.unpaired.is_empty());
    }

    #[test]
    fn test_json_idempotence_and_validation() {
        let model = deck(vec![chart("A", [1.0, 2.0])]);
        let json = model.to_json_pretty().unwrap();
        assert_eq!(PresentationModel::from_json(&json).unwrap(), model);

        assert!(PresentationModel::from_json(r#"{"slide_width_in": 0}"#).is_err());
        assert!(PresentationModel::from_json(r#"{"slides": [], "theme": "x"}"#).is_err());
        let empty = PresentationModel::from_json("{}").unwrap();
        assert!(empty.slides.is_empty());
    }

    #[test]
    fn test_extracted_floats_survive_json() {
        let mut model = deck(Vec::new());
        for emu in [122, 1_234_567, 9_144_001] {
            model.slides[0].shapes.push(ShapeModel::Unknown(UnknownShapeModel {
                name: None,
                left_pt: emu_to_pt(emu),
                top_pt: emu_to_pt(emu * 3),
                width_pt: emu_to_pt(emu + 7),
                height_pt: 1.0,
                rotation: None,
            }));
        }

        let compact = PresentationModel::from_json(&model.to_json().unwrap()).unwrap();
        assert_eq!(compact, model);
        let pretty = PresentationModel::from_json(&model.to_json_pretty().unwrap()).unwrap();
        assert_eq!(pretty, model);
    }
}
