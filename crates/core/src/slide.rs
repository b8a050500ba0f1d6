use crate::chart::ChartModel;
use crate::engine::EngineSlide;
use crate::json::JsonModel;
use crate::report::ApplyReport;
use crate::shape::ShapeModel;
use crate::Result;
use serde::{Deserialize, Serialize};

/// One slide: the layout it was built from and its shapes, back to front.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlideModel {
    pub layout_index: Option<usize>,
    #[serde(default)]
    pub shapes: Vec<ShapeModel>,
}

impl SlideModel {
    pub fn from_engine(slide: &dyn EngineSlide) -> Self {
        Self {
            layout_index: slide.layout_index(),
            shapes: (0..slide.shape_count())
                .filter_map(|i| slide.shape(i))
                .map(ShapeModel::from_engine)
                .collect(),
        }
    }

    /// Add every shape to `slide`. A shape the engine refuses to create is
    /// recorded and the remaining shapes are still added.
    pub fn apply_to(&self, slide: &mut dyn EngineSlide) -> ApplyReport {
        let mut report = ApplyReport::new();
        for (i, shape) in self.shapes.iter().enumerate() {
            let field = format!("shapes[{}]", i);
            match shape.apply_to_slide(slide) {
                Ok(inner) => report.absorb(&field, inner),
                Err(e) => report.fail(&field, &e),
            }
        }
        report
    }

    /// Chart shapes, in slide order.
    pub fn charts(&self) -> impl Iterator<Item = &ChartModel> {
        self.shapes.iter().filter_map(ShapeModel::as_chart)
    }
}

impl JsonModel for SlideModel {
    fn validate(&self) -> Result<()> {
        self.shapes.iter().try_for_each(ShapeModel::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemorySlide;
    use crate::enums::ShapeKind;

    const SLIDE: &str = r#"{
        "layout_index": 1,
        "shapes": [
            {"type": "text_box", "name": "Title", "left_pt": 36, "top_pt": 20,
             "width_pt": 600, "height_pt": 50,
             "text_frame": {"paragraphs": [{"runs": [{"text": "Results"}]}]}},
            {"type": "table", "name": "Grid", "left_pt": 36, "top_pt": 100,
             "width_pt": 300, "height_pt": 60, "rows": [["a", "b"]]},
            {"type": "chart", "name": "Trend", "left_pt": 360, "top_pt": 100,
             "width_pt": 300, "height_pt": 200, "chart_type": "line",
             "category_data": {"categories": ["x"], "series": [{"name": "s", "values": [1]}]}}
        ]
    }"#;

    #[test]
    fn test_build_and_extract() {
        let model = SlideModel::from_json(SLIDE).unwrap();
        assert_eq!(model.charts().count(), 1);

        let mut slide = MemorySlide::default();
        let report = model.apply_to(&mut slide);
        assert!(report.is_clean(), "{:?}", report.failures);
        assert!(report.was_applied("shapes[0].text_frame.auto_size"));

        let extracted = SlideModel::from_engine(&slide);
        let kinds: Vec<ShapeKind> = extracted.shapes.iter().map(ShapeModel::kind).collect();
        assert_eq!(kinds, vec![ShapeKind::TextBox, ShapeKind::Table, ShapeKind::Chart]);
        assert_eq!(extracted.shapes[2].name(), Some("Trend"));
    }

    #[test]
    fn test_refused_shape_does_not_stop_the_rest() {
        let model = SlideModel::from_json(SLIDE).unwrap();
        let mut slide = MemorySlide::default();
        slide.faults.insert("add_table");

        let report = model.apply_to(&mut slide);
        assert!(report.failed("shapes[1]"));
        assert_eq!(slide.shapes.len(), 2);
    }

    #[test]
    fn test_validation_reaches_shapes() {
        let bad = SLIDE.replace(r#""chart_type": "line""#, r#""chart_type": "scatter""#);
        assert!(SlideModel::from_json(&bad).is_err());
        assert!(SlideModel::from_json(r#"{"layout_index": 0, "notes": ""}"#).is_err());
    }
}
