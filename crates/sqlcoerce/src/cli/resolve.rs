//! `resolve` command: explain how operands would be unified

use super::output::{self, OutputFormat};
use anyhow::{Result, bail};
use serde_json::json;
use sqlcoerce_eval::{CastContext, CastEngine, Operand, ResolvedCast, Usage};
use tabled::Tabled;

/// Configuration for the resolve command
pub struct ResolveConfig {
    pub usage: String,
    pub operands: Vec<String>,
    pub format: OutputFormat,
}

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Operand")]
    operand: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Step")]
    step: String,
}

/// Resolve the operands in the given usage and print the plan
pub fn resolve(engine: &CastEngine, config: ResolveConfig) -> Result<()> {
    let usage = parse_usage(engine, &config.usage)?;
    let operands = config
        .operands
        .iter()
        .map(|spec| parse_operand(engine, spec))
        .collect::<Result<Vec<_>>>()?;
    let resolved = engine.resolve(&CastContext::new(usage, operands))?;

    match config.format {
        OutputFormat::Json => output::print_json(&to_json(&config.operands, &resolved)),
        OutputFormat::Pretty => {
            println!("target: {}", resolved.target);
            let rows = config
                .operands
                .iter()
                .zip(&resolved.steps)
                .enumerate()
                .map(|(index, (spec, cast))| StepRow {
                    index: index + 1,
                    operand: spec.clone(),
                    source: cast.source.to_string(),
                    step: cast.step.to_string(),
                });
            println!("{}", output::table(rows));
            Ok(())
        }
    }
}

fn to_json(specs: &[String], resolved: &ResolvedCast) -> serde_json::Value {
    let steps: Vec<_> = specs
        .iter()
        .zip(&resolved.steps)
        .map(|(spec, cast)| {
            json!({
                "operand": spec,
                "source": cast.source.to_string(),
                "step": cast.step.to_string(),
            })
        })
        .collect();
    json!({ "target": resolved.target.to_string(), "steps": steps })
}

/// `+`, `binary:+`, `comparison:=`, `=`, `case`, `assign:<type>` or `subquery`
pub fn parse_usage(engine: &CastEngine, spec: &str) -> Result<Usage> {
    let spec = spec.trim();
    if let Some(operator) = spec.strip_prefix("binary:") {
        return Ok(Usage::binary(operator));
    }
    if let Some(operator) = spec.strip_prefix("comparison:") {
        return Ok(Usage::comparison(operator));
    }
    if let Some(target) = spec.strip_prefix("assign:") {
        return Ok(Usage::column(engine.parse_type(target)?));
    }
    Ok(match spec.to_ascii_lowercase().as_str() {
        "case" => Usage::CaseBranches,
        "subquery" => Usage::ScalarSubquery,
        "=" | "<>" | "!=" | "<" | "<=" | ">" | ">=" => Usage::comparison(spec),
        "+" | "-" | "*" | "/" | "||" => Usage::binary(spec),
        _ => bail!("Unknown usage: {spec}"),
    })
}

/// `'raw'` is a string literal, `null` the NULL literal, anything else a
/// typed expression
pub fn parse_operand(engine: &CastEngine, spec: &str) -> Result<Operand> {
    let spec = spec.trim();
    if spec.eq_ignore_ascii_case("null") {
        return Ok(Operand::null());
    }
    let quoted = spec
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''));
    match quoted {
        Some(raw) => Ok(Operand::string_literal(raw.replace("''", "'"))),
        None => Ok(Operand::expression(engine.parse_type(spec)?)),
    }
}
