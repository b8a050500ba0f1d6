//! CLI tool for presentation JSON models.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use deck_core::engine::memory::MemoryDocument;
use deck_core::{
    ChartModel, ChartUpdateOutcome, JsonModel, PatchMethod, PatchReport, PresentationModel,
    ShapeModel,
};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Validate, normalize and patch presentation JSON models.
#[derive(Parser, Debug)]
#[command(name = "deck")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load model files strictly and print what they contain
    Validate {
        #[arg(required = true)]
        input: Vec<PathBuf>,
    },

    /// Re-emit a model as canonical pretty JSON
    Normalize {
        input: PathBuf,

        /// Output file (default: <input>.normalized.json next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print output to stdout instead of writing to file
        #[arg(short, long, conflicts_with = "output")]
        print: bool,
    },

    /// Build a model into a blank document, extract it again and compare
    Roundtrip { input: PathBuf },

    /// Build `base`, patch its charts from `update`, print the result
    Patch {
        base: PathBuf,
        update: PathBuf,

        /// Try the workbook-only update first for every chart
        #[arg(short, long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match &args.command {
        Command::Validate { input } => validate(input),
        Command::Normalize {
            input,
            output,
            print,
        } => normalize(input, output.as_deref(), *print, args.verbose),
        Command::Roundtrip { input } => roundtrip(input),
        Command::Patch {
            base,
            update,
            strict,
        } => patch(base, update, *strict),
    }
}

fn load(path: &Path) -> Result<PresentationModel> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let model = PresentationModel::from_json(&json)
        .with_context(|| format!("Invalid model in {}", path.display()))?;
    log::debug!("Loaded {} with {} slides", path.display(), model.slides.len());
    Ok(model)
}

fn validate(inputs: &[PathBuf]) -> Result<()> {
    let mut failed = 0;
    for path in inputs {
        match load(path) {
            Ok(model) => {
                let shapes: usize = model.slides.iter().map(|s| s.shapes.len()).sum();
                let charts: usize = model.slides.iter().map(|s| s.charts().count()).sum();
                println!(
                    "{}: {} slides, {} shapes, {} charts",
                    path.display(),
                    model.slides.len(),
                    shapes,
                    charts
                );
            }
            Err(e) => {
                eprintln!("{}: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} files failed validation", failed, inputs.len());
    }
    Ok(())
}

fn normalize(input: &Path, output: Option<&Path>, print: bool, verbose: bool) -> Result<()> {
    let json = load(input)?.to_json_pretty()?;
    if print {
        println!("{}", json);
        return Ok(());
    }

    let output_path = match output {
        Some(path) => path.to_path_buf(),
        None => default_output_path(input),
    };
    write_output(&output_path, &json)?;
    if verbose {
        eprintln!("Written to: {}", output_path.display());
    }
    Ok(())
}

/// `deck.json` becomes `deck.normalized.json` in the same directory.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{}.normalized.json", stem))
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;
    file.write_all(b"\n")?;

    Ok(())
}

fn roundtrip(input: &Path) -> Result<()> {
    let model = load(input)?;
    let mut doc = MemoryDocument::new();
    log::debug!("Building {} into a blank document", input.display());
    let report = model
        .build_into(&mut doc)
        .context("Failed to build the model")?;
    for failure in &report.failures {
        eprintln!("  not applied: {} ({})", failure.field, failure.error);
    }

    let extracted = PresentationModel::from_engine(&doc);
    let differences = compare(&model, &extracted);
    if differences.is_empty() {
        println!(
            "{}: content survived ({} fields written, {} skipped)",
            input.display(),
            report.applied.len(),
            report.failures.len()
        );
        return Ok(());
    }

    for difference in &differences {
        eprintln!("  {}", difference);
    }
    bail!("{}: {} differences after round trip", input.display(), differences.len())
}

/// Modeled content that differs between `before` and `after`: slide and
/// shape counts, shape kinds and names, text, and chart data.
fn compare(before: &PresentationModel, after: &PresentationModel) -> Vec<String> {
    let mut differences = Vec::new();
    if before.slides.len() != after.slides.len() {
        differences.push(format!(
            "slide count {} became {}",
            before.slides.len(),
            after.slides.len()
        ));
    }

    for (s, (old, new)) in before.slides.iter().zip(&after.slides).enumerate() {
        // Shapes the builder skips are not expected back.
        let expected: Vec<&ShapeModel> =
            old.shapes.iter().filter(|shape| is_built(shape)).collect();
        if expected.len() != new.shapes.len() {
            differences.push(format!(
                "slide {}: {} shapes became {}",
                s,
                expected.len(),
                new.shapes.len()
            ));
            continue;
        }

        for (i, (old, new)) in expected.iter().zip(&new.shapes).enumerate() {
            let at = format!("slide {} shape {}", s, i);
            if old.kind() != new.kind() {
                differences.push(format!("{}: {:?} became {:?}", at, old.kind(), new.kind()));
                continue;
            }
            if old.name().filter(|n| !n.is_empty()) != new.name().filter(|n| !n.is_empty()) {
                differences.push(format!("{}: name {:?} became {:?}", at, old.name(), new.name()));
            }
            match (old, new) {
                (ShapeModel::TextBox(a), ShapeModel::TextBox(b))
                    if a.text_frame.text() != b.text_frame.text() =>
                {
                    differences.push(format!("{}: text changed", at));
                }
                (ShapeModel::Chart(a), ShapeModel::Chart(b)) if data_only(a) != data_only(b) => {
                    differences.push(format!("{}: chart data changed", at));
                }
                _ => {}
            }
        }
    }
    differences
}

/// Chart data blocks without number formats, which extraction does not read.
fn data_only(chart: &ChartModel) -> ChartModel {
    let mut data = ChartModel::new(chart.chart_type, 0.0, 0.0, 0.0, 0.0);
    data.category_data = chart.category_data.clone();
    data.xy_data = chart.xy_data.clone();
    data.bubble_data = chart.bubble_data.clone();
    if let Some(d) = &mut data.category_data {
        d.series.iter_mut().for_each(|s| s.number_format = None);
    }
    if let Some(d) = &mut data.xy_data {
        d.series.iter_mut().for_each(|s| s.number_format = None);
    }
    if let Some(d) = &mut data.bubble_data {
        d.series.iter_mut().for_each(|s| s.number_format = None);
    }
    data
}

fn is_built(shape: &ShapeModel) -> bool {
    match shape {
        ShapeModel::Unknown(_) => false,
        ShapeModel::Picture(p) => p.image_path.as_deref().is_some_and(|p| !p.is_empty()),
        ShapeModel::Table(t) => !t.rows.is_empty(),
        ShapeModel::Chart(c) => c.data_payload().is_some(),
        ShapeModel::TextBox(_) => true,
    }
}

fn patch(base: &Path, update: &Path, strict: bool) -> Result<()> {
    let base_model = load(base)?;
    let update_model = load(update)?;

    let mut doc = MemoryDocument::new();
    base_model
        .build_into(&mut doc)
        .with_context(|| format!("Failed to build {}", base.display()))?;

    log::debug!("Patching charts from {} (strict: {})", update.display(), strict);
    let report = update_model.patch_charts(&mut doc, strict);
    print_patch_report(&report);

    let patched = PresentationModel::from_engine(&doc);
    println!("{}", patched.to_json_pretty()?);
    Ok(())
}

fn print_patch_report(report: &PatchReport) {
    for patch in &report.patched {
        let how = match &patch.method {
            PatchMethod::WorkbookOnly => "workbook cells rewritten".to_string(),
            PatchMethod::Formatting(ChartUpdateOutcome::Replaced(r)) => {
                format!("data replaced, {} settings skipped", r.failures.len())
            }
            PatchMethod::Formatting(ChartUpdateOutcome::PropertiesOnly(r)) => {
                format!("no data in model, {} properties written", r.applied.len())
            }
            PatchMethod::Formatting(ChartUpdateOutcome::NoOp(e)) => format!("unchanged: {}", e),
        };
        eprintln!(
            "slide {} chart {} ({}) -> shape {}: {}",
            patch.slide,
            patch.chart,
            patch.name.as_deref().unwrap_or("unnamed"),
            patch.shape,
            how
        );
    }
    for chart in &report.unpaired {
        eprintln!(
            "slide {} chart {} ({}): no live chart to update",
            chart.slide,
            chart.chart,
            chart.name.as_deref().unwrap_or("unnamed")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("decks/q3.json")),
            PathBuf::from("decks/q3.normalized.json")
        );
    }

    #[test]
    fn test_compare_ignores_skipped_shapes() {
        let model = PresentationModel::from_json(
            r#"{"slides": [{"layout_index": 0, "shapes": [
                {"type": "unknown", "left_pt": 0, "top_pt": 0, "width_pt": 1, "height_pt": 1},
                {"type": "text_box", "name": "T", "left_pt": 0, "top_pt": 0,
                 "width_pt": 10, "height_pt": 10,
                 "text_frame": {"paragraphs": [{"runs": [{"text": "hi"}]}]}}
            ]}]}"#,
        )
        .unwrap();

        let mut doc = MemoryDocument::new();
        model.build_into(&mut doc).unwrap();
        let extracted = PresentationModel::from_engine(&doc);
        assert!(compare(&model, &extracted).is_empty());

        let mut changed = extracted.clone();
        changed.slides.clear();
        assert_eq!(compare(&model, &changed).len(), 1);
    }
}
