//! Output formatting helpers for CLI commands

use crate::benchmark::BenchmarkReport;
use crate::prompts::PromptTemplate;
use crate::stress::ModelSummary;
use crate::upstream::{ModelDescriptor, RunningModel};
use crate::vram::CalculationResult;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::Serialize;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

/// Human-readable size using binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

/// Pretty JSON for `--json` output.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Success rate colored green at 100%, yellow above 50%, red otherwise.
pub fn colored_rate(rate: f64) -> String {
    let text = format!("{:.1}%", rate);
    if rate >= 100.0 {
        text.green().to_string()
    } else if rate > 50.0 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

/// Format installed models as a table
pub fn format_models_table(models: &[ModelDescriptor]) -> String {
    let mut table = new_table(vec!["Name", "Size", "Family", "Parameters", "Quantization"]);
    for m in models {
        table.add_row(vec![
            Cell::new(&m.name),
            Cell::new(format_bytes(m.size_bytes)),
            Cell::new(m.details.family.as_deref().unwrap_or("-")),
            Cell::new(m.details.parameter_size.as_deref().unwrap_or("-")),
            Cell::new(m.details.quantization_level.as_deref().unwrap_or("-")),
        ]);
    }
    table.to_string()
}

/// Format loaded models as a table
pub fn format_running_table(models: &[RunningModel]) -> String {
    let mut table = new_table(vec!["Name", "Size", "VRAM", "Expires"]);
    for m in models {
        table.add_row(vec![
            Cell::new(&m.name),
            Cell::new(format_bytes(m.size_bytes)),
            Cell::new(format_bytes(m.size_vram_bytes)),
            Cell::new(m.expires_at.as_deref().unwrap_or("-")),
        ]);
    }
    table.to_string()
}

/// Component breakdown of one estimate
pub fn format_vram_breakdown(model: &str, result: &CalculationResult) -> String {
    let mut table = new_table(vec!["Component", "MB"]);
    table.add_row(vec![
        Cell::new(format!("Model weights ({})", result.precision)),
        Cell::new(format!("{:.2}", result.base_model_vram_mb)),
    ]);
    table.add_row(vec![
        Cell::new(format!(
            "Context buffer ({} tokens x {} batch, ~{} layers)",
            result.context_length, result.batch_size, result.estimated_layers
        )),
        Cell::new(format!("{:.2}", result.context_buffer_mb)),
    ]);
    table.add_row(vec![
        Cell::new("Framework overhead"),
        Cell::new(format!("{:.2}", result.framework_overhead_mb)),
    ]);

    format!(
        "{}\n{}\nTotal: {}",
        model.bold(),
        table,
        format!("{:.2} GB", result.total_vram_gb).cyan().bold()
    )
}

/// One row per precision
pub fn format_vram_comparison(model: &str, results: &[CalculationResult]) -> String {
    let mut table = new_table(vec!["Precision", "Weights MB", "Context MB", "Total GB"]);
    for r in results {
        table.add_row(vec![
            Cell::new(r.precision),
            Cell::new(format!("{:.2}", r.base_model_vram_mb)),
            Cell::new(format!("{:.2}", r.context_buffer_mb)),
            Cell::new(format!("{:.2}", r.total_vram_gb)),
        ]);
    }
    format!("{}\n{}", model.bold(), table)
}

/// Per-model stress statistics
pub fn format_stress_summary(summaries: &[ModelSummary]) -> String {
    let mut table = new_table(vec![
        "Model", "Total", "Completed", "Failed", "Success", "Avg ms", "Min ms", "Max ms",
        "Avg tok/s", "Tokens",
    ]);
    for s in summaries {
        let (avg, min, max, tps) = match &s.stats {
            Some(st) => (
                format!("{:.0}", st.average_response_time_ms),
                st.min_response_time_ms.to_string(),
                st.max_response_time_ms.to_string(),
                format!("{:.2}", st.average_tokens_per_second),
            ),
            None => ("-".into(), "-".into(), "-".into(), "-".into()),
        };
        table.add_row(vec![
            Cell::new(&s.model_name),
            Cell::new(s.total_requests),
            Cell::new(s.completed_requests),
            Cell::new(s.failed_requests),
            Cell::new(colored_rate(s.success_rate)),
            Cell::new(avg),
            Cell::new(min),
            Cell::new(max),
            Cell::new(tps),
            Cell::new(s.total_tokens),
        ]);
    }
    table.to_string()
}

/// Per-test benchmark results with the aggregate line
pub fn format_benchmark(report: &BenchmarkReport) -> String {
    let mut table = new_table(vec!["Test", "Tokens", "Tok/s", "Response ms"]);
    for r in &report.results {
        table.add_row(vec![
            Cell::new(&r.test_name),
            Cell::new(r.token_count),
            Cell::new(r.tokens_per_second),
            Cell::new(r.response_time_ms),
        ]);
    }
    format!(
        "{}\n{}\nAverage: {:.1} tok/s, {:.0} ms; total tokens {}",
        report.model.bold(),
        table,
        report.summary.average_tokens_per_second,
        report.summary.average_response_time_ms,
        report.summary.total_tokens
    )
}

/// Prompt library listing
pub fn format_prompts_table(prompts: &[&PromptTemplate]) -> String {
    let mut table = new_table(vec!["", "Id", "Name", "Category", "Description"]);
    for p in prompts {
        let star = if p.is_favorite {
            "★".yellow().to_string()
        } else {
            String::new()
        };
        table.add_row(vec![
            Cell::new(star),
            Cell::new(&p.id),
            Cell::new(&p.name),
            Cell::new(&p.category),
            Cell::new(&p.description),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stress::summarize;
    use crate::upstream::ModelDescriptor;
    use crate::vram::{estimate, CalculationInput, Precision};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(4 * 1024 * 1024 * 1024), "4.00 GB");
    }

    #[test]
    fn test_format_models_table_with_data() {
        let output = format_models_table(&[ModelDescriptor::sized("llama3:8b", 4_661_224_676)]);
        assert!(output.contains("llama3:8b"));
        assert!(output.contains("4.34 GB"));
    }

    #[test]
    fn test_format_models_table_empty_has_header() {
        assert!(format_models_table(&[]).contains("Name"));
    }

    #[test]
    fn test_format_vram_breakdown() {
        let result = estimate(&CalculationInput {
            model: ModelDescriptor::sized("m", 4 * 1024 * 1024 * 1024),
            context_length: 4096,
            precision: Precision::Fp16,
            batch_size: 1,
            framework_overhead_mb: 1024.0,
        });
        let output = format_vram_breakdown("m", &result);
        assert!(output.contains("4096.00"));
        assert!(output.contains("Framework overhead"));
        assert!(output.contains("5.00 GB"));
    }

    #[test]
    fn test_format_stress_summary_without_completions() {
        let output = format_stress_summary(&[summarize("idle-model", &[])]);
        assert!(output.contains("idle-model"));
        assert!(output.contains("-"));
    }

    #[test]
    fn test_to_json_is_pretty() {
        let json = to_json(&serde_json::json!({"a": 1})).unwrap();
        assert!(json.contains('\n'));
    }
}
