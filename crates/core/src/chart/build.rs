use super::{to_native_chart_type, ChartModel};
use crate::engine::{EngineChart, EngineSlide};
use crate::report::ApplyReport;
use crate::shape::finish_shape;

impl ChartModel {
    /// Create this chart on `slide`.
    ///
    /// Without a data block nothing is created. If the engine refuses to
    /// create the chart the failure is recorded and the slide is left as is.
    pub fn apply_to_slide(&self, slide: &mut dyn EngineSlide) -> ApplyReport {
        let mut report = ApplyReport::new();
        let Some(payload) = self.data_payload() else {
            log::debug!("Skipping chart {:?} without data", self.name);
            return report;
        };

        let placement = self.placement();
        let native_type = to_native_chart_type(self.chart_type);
        let shape = match slide.add_chart(native_type, placement.geometry(), payload) {
            Ok(shape) => shape,
            Err(e) => {
                report.fail("chart", &e);
                return report;
            }
        };

        finish_shape(shape, &placement, &mut report);
        if let Some(chart) = shape.chart_mut() {
            self.apply_overrides(chart, &mut report);
        }
        report
    }

    /// Write style, legend flag and title. Each is independent of the others.
    pub(crate) fn apply_overrides(&self, chart: &mut dyn EngineChart, report: &mut ApplyReport) {
        if let Some(style) = self.style {
            report.record("style", chart.set_style(style));
        }
        if let Some(has_legend) = self.has_legend {
            report.record("has_legend", chart.set_has_legend(has_legend));
        }
        if let Some(title) = &self.title {
            report.record("title", chart.set_title(title));
        }
    }
}
