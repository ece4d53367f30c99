use super::KeepReport;
use crate::graph::EntityKind;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// JSON reporter for programmatic output
pub struct JsonReporter {
    output_path: Option<PathBuf>,
}

impl JsonReporter {
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self { output_path }
    }

    pub fn report(&self, report: &KeepReport) -> Result<()> {
        let json = self.render(report)?;

        if let Some(path) = &self.output_path {
            std::fs::write(path, &json).into_diagnostic()?;
            println!("Report written to: {}", path.display());
        } else {
            println!("{}", json);
        }

        Ok(())
    }

    pub fn render(&self, report: &KeepReport) -> Result<String> {
        serde_json::to_string_pretty(&JsonReport::from_report(report)).into_diagnostic()
    }
}

#[derive(Serialize)]
struct JsonReport {
    version: &'static str,
    total_entities: usize,
    total_reachable: usize,
    entities: Vec<JsonEntity>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonEntity {
    name: String,
    kind: &'static str,
    by_type: bool,
    by_string: bool,
    by_resources: bool,
    is_serde: bool,
    keep_count: u32,
    allow_shrinking: bool,
    allow_obfuscation: bool,
    keep_reasons: Vec<JsonReason>,
}

#[derive(Serialize)]
struct JsonReason {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    triggered_by: Option<String>,
}

#[derive(Serialize)]
struct JsonSummary {
    classes: usize,
    methods: usize,
    fields: usize,
    roots: usize,
    by_reason: BTreeMap<&'static str, usize>,
}

impl JsonReport {
    fn from_report(report: &KeepReport) -> Self {
        let mut by_reason = BTreeMap::new();
        for entity in &report.entities {
            for reason in &entity.reasons {
                *by_reason.entry(reason.kind.as_str()).or_insert(0) += 1;
            }
        }

        let entities = report
            .entities
            .iter()
            .map(|e| JsonEntity {
                name: e.name.clone(),
                kind: e.kind.display_name(),
                by_type: e.by_type,
                by_string: e.by_string,
                by_resources: e.by_resources,
                is_serde: e.is_serde,
                keep_count: e.keep_count,
                allow_shrinking: e.allow_shrinking,
                allow_obfuscation: e.allow_obfuscation,
                keep_reasons: e
                    .reasons
                    .iter()
                    .map(|r| JsonReason {
                        kind: r.kind.as_str(),
                        triggered_by: r.triggered_by.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            version: "1.0",
            total_entities: report.total_entities,
            total_reachable: report.entities.len(),
            entities,
            summary: JsonSummary {
                classes: report.count_of(EntityKind::Class),
                methods: report.count_of(EntityKind::Method),
                fields: report.count_of(EntityKind::Field),
                roots: report.roots().count(),
                by_reason,
            },
        }
    }
}
