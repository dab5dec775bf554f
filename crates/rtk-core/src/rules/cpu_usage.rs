//! `cpu-usage`: assert CPU consumption percent per CPU lies within a range.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_options, round2, Options, RuleDefinition, RuleDocs, RuleInstance, RuleMeta};
use crate::errors::{Result, RtkError};
use crate::message::{Finding, Severity};
use crate::report::Report;

pub const ID: &str = "cpu-usage";

const CPUS_PATH: &str = "header.cpus";
const CONSUMPTION_PATH: &str = "resourceUsage.cpuConsumptionPercent";

/// How per-context usages are reduced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Report every context individually
    All,
    #[default]
    Mean,
    Min,
    Max,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::All => "all",
            Mode::Mean => "mean",
            Mode::Min => "min",
            Mode::Max => "max",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Mode::All => "Report",
            Mode::Mean => "Mean",
            Mode::Min => "Minimum",
            Mode::Max => "Maximum",
        }
    }

    fn reduce(&self, usages: &[f64]) -> f64 {
        match self {
            Mode::Max => usages.iter().copied().fold(0.0, f64::max),
            Mode::Min => usages.iter().copied().fold(f64::INFINITY, f64::min),
            Mode::Mean | Mode::All => round2(usages.iter().sum::<f64>() / usages.len() as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CpuUsageOptions {
    #[serde(default)]
    pub min: u32,
    #[serde(default = "default_max")]
    pub max: u32,
    #[serde(default)]
    pub mode: Mode,
}

fn default_max() -> u32 {
    50
}

impl Default for CpuUsageOptions {
    fn default() -> Self {
        Self {
            min: 0,
            max: default_max(),
            mode: Mode::default(),
        }
    }
}

pub struct CpuUsage {
    meta: RuleMeta,
}

impl CpuUsage {
    pub fn new() -> Self {
        let constants = [Mode::All, Mode::Max, Mode::Mean, Mode::Min]
            .iter()
            .map(|m| {
                (
                    format!("MODE_{}", m.as_str().to_ascii_uppercase()),
                    json!(m.as_str()),
                )
            })
            .collect::<BTreeMap<_, _>>();
        Self {
            meta: RuleMeta {
                docs: RuleDocs {
                    category: "resource".to_string(),
                    description: "Assert CPU usage % is within a range".to_string(),
                    url: None,
                },
                schema: json!({
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "max": {"type": "integer", "minimum": 0, "default": 50},
                        "min": {"type": "integer", "minimum": 0, "default": 0},
                        "mode": {"type": "string", "enum": ["mean", "min", "max", "all"], "default": "mean"}
                    }
                }),
                constants,
            },
        }
    }
}

impl Default for CpuUsage {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleDefinition for CpuUsage {
    fn id(&self) -> &str {
        ID
    }

    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn inspect(&self, options: &Options) -> Result<Box<dyn RuleInstance>> {
        let options: CpuUsageOptions = parse_options(ID, options)?;
        if options.min > options.max {
            return Err(RtkError::InvalidRuleOptions {
                rule_id: ID.to_string(),
                reason: format!("min ({}) exceeds max ({})", options.min, options.max),
            }
            .into());
        }
        Ok(Box::new(CpuUsageInstance {
            options,
            usages: Vec::new(),
        }))
    }
}

struct CpuUsageInstance {
    options: CpuUsageOptions,
    usages: Vec<f64>,
}

impl CpuUsageInstance {
    fn evaluate(&self, usage: f64) -> Finding {
        let CpuUsageOptions { min, max, mode } = self.options;
        let within = usage >= f64::from(min) && usage <= f64::from(max);
        let finding = Finding::new(format!(
            "{} CPU consumption percent ({}%) is {} the allowed range of {}-{}%",
            mode.label(),
            usage,
            if within { "within" } else { "outside" },
            min,
            max
        ))
        .with_data(json!({
            "max": max,
            "min": min,
            "mode": mode.as_str(),
            "usage": usage,
        }));
        if within {
            finding.with_severity(Severity::Info)
        } else {
            finding
        }
    }
}

fn usage_of(context: &Report) -> Result<f64> {
    let cpus = context
        .require(CPUS_PATH)?
        .as_array()
        .filter(|cpus| !cpus.is_empty())
        .ok_or_else(|| missing(CPUS_PATH, context))?;
    let consumption = context
        .require(CONSUMPTION_PATH)?
        .as_f64()
        .ok_or_else(|| missing(CONSUMPTION_PATH, context))?;
    Ok(round2(consumption / cpus.len() as f64))
}

fn missing(path: &str, context: &Report) -> crate::errors::ExError {
    RtkError::MissingProperty {
        path: path.to_string(),
        filename: context.display_name().to_string(),
    }
    .into()
}

impl RuleInstance for CpuUsageInstance {
    fn next(&mut self, context: &Report) -> Result<Option<Finding>> {
        let usage = usage_of(context)?;
        if self.options.mode == Mode::All {
            return Ok(Some(self.evaluate(usage)));
        }
        self.usages.push(usage);
        Ok(None)
    }

    fn complete(&mut self) -> Result<Option<Finding>> {
        if self.options.mode == Mode::All || self.usages.is_empty() {
            return Ok(None);
        }
        let usage = self.options.mode.reduce(&self.usages);
        Ok(Some(self.evaluate(usage)))
    }
}
