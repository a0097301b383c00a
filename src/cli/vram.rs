//! VRAM command implementation

use crate::cli::output::{format_vram_breakdown, format_vram_comparison, to_json};
use crate::cli::{upstream_server, VramArgs};
use crate::upstream::ModelDescriptor;
use crate::vram::{estimate, CalculationInput, CalculationResult, Precision};
use serde::Serialize;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VramView<'a> {
    model: &'a str,
    #[serde(flatten)]
    result: &'a CalculationResult,
}

/// Size from the flags, or `None` when it must be looked up.
fn size_from_args(args: &VramArgs) -> Option<u64> {
    args.size_bytes
        .or_else(|| args.size_gb.map(|gb| (gb.max(0.0) * BYTES_PER_GIB) as u64))
}

async fn resolve_model(args: &VramArgs) -> Result<ModelDescriptor, Box<dyn std::error::Error>> {
    if let Some(size) = size_from_args(args) {
        return Ok(ModelDescriptor::sized(args.model.clone(), size));
    }

    let config = args.connection.load_config()?;
    let installed = upstream_server(&config)?.list_models().await?;
    let names: Vec<&str> = installed.iter().map(|m| m.name.as_str()).collect();
    let found = installed.iter().find(|m| m.name == args.model).cloned();
    found.ok_or_else(|| {
        format!(
            "Model '{}' not found. Available: {}. Pass --size-gb to estimate without a server.",
            args.model,
            names.join(", ")
        )
        .into()
    })
}

fn input_for(args: &VramArgs, model: &ModelDescriptor, precision: Precision) -> CalculationInput {
    CalculationInput {
        model: model.clone(),
        context_length: args.context,
        precision,
        batch_size: args.batch,
        framework_overhead_mb: args.overhead_mb,
    }
    .clamped()
}

/// Handle `llmdeck vram`
pub async fn handle_vram(args: &VramArgs) -> Result<String, Box<dyn std::error::Error>> {
    let model = resolve_model(args).await?;

    if args.compare {
        let results: Vec<CalculationResult> = Precision::ALL
            .iter()
            .map(|p| estimate(&input_for(args, &model, *p)))
            .collect();
        return if args.json {
            Ok(to_json(&results)?)
        } else {
            Ok(format_vram_comparison(&model.name, &results))
        };
    }

    let result = estimate(&input_for(args, &model, args.precision));
    if args.json {
        Ok(to_json(&VramView {
            model: &model.name,
            result: &result,
        })?)
    } else {
        Ok(format_vram_breakdown(&model.name, &result))
    }
}
