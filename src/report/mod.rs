mod json;
mod terminal;

pub use json::JsonReporter;
pub use terminal::TerminalReporter;

use crate::graph::{EntityId, EntityKind, KeepReasonKind, Program};
use miette::Result;
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Terminal,
    Json,
}

/// A keep reason resolved for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonEntry {
    pub kind: KeepReasonKind,
    /// Method whose code caused the reason
    pub triggered_by: Option<String>,
}

/// One reachable entity and why
#[derive(Debug, Clone)]
pub struct KeptEntity {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub by_type: bool,
    pub by_string: bool,
    pub by_resources: bool,
    pub is_serde: bool,
    pub keep_count: u32,
    pub allow_shrinking: bool,
    pub allow_obfuscation: bool,
    pub reasons: Vec<ReasonEntry>,
    /// Compact rendering of the state
    pub state: String,
}

/// Every reachable entity of a program, in program order
#[derive(Debug, Clone, Default)]
pub struct KeepReport {
    pub entities: Vec<KeptEntity>,
    pub total_entities: usize,
}

impl KeepReport {
    /// Collect reachable entities. With `filter`, only those whose display
    /// name contains it.
    pub fn build(program: &Program, filter: Option<&str>) -> Self {
        let mut total_entities = 0;
        let mut entities = Vec::new();

        for id in program.entities() {
            total_entities += 1;
            let rstate = program.rstate(id);
            if !rstate.is_reachable() {
                continue;
            }
            let name = program.display(id);
            if filter.is_some_and(|f| !name.contains(f)) {
                continue;
            }

            let reasons = rstate
                .keep_reasons()
                .into_iter()
                .map(|reason| ReasonEntry {
                    kind: reason.kind,
                    triggered_by: reason.method.map(|m| program.method(m).to_string()),
                })
                .collect();

            entities.push(KeptEntity {
                id,
                name,
                kind: id.kind(),
                by_type: rstate.is_referenced_by_type(),
                by_string: rstate.is_referenced_by_string(),
                by_resources: rstate.is_referenced_by_resource_xml(),
                is_serde: rstate.is_serde(),
                keep_count: rstate.keep_count(),
                allow_shrinking: rstate.allow_shrinking(),
                allow_obfuscation: rstate.allow_obfuscation(),
                reasons,
                state: rstate.to_string(),
            });
        }

        Self {
            entities,
            total_entities,
        }
    }

    pub fn roots(&self) -> impl Iterator<Item = &KeptEntity> {
        self.entities.iter().filter(|e| !e.reasons.is_empty())
    }

    pub fn with_reason(&self, kind: KeepReasonKind) -> impl Iterator<Item = &KeptEntity> + '_ {
        self.entities
            .iter()
            .filter(move |e| e.reasons.iter().any(|r| r.kind == kind))
    }

    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.entities.iter().filter(|e| e.kind == kind).count()
    }
}

/// Reporter for outputting keep reports
pub struct Reporter {
    format: ReportFormat,
    output_path: Option<PathBuf>,
}

impl Reporter {
    pub fn new(format: ReportFormat, output_path: Option<PathBuf>) -> Self {
        Self { format, output_path }
    }

    pub fn report(&self, report: &KeepReport) -> Result<()> {
        match self.format {
            ReportFormat::Terminal => {
                let reporter = TerminalReporter::new();
                reporter.report(report)
            }
            ReportFormat::Json => {
                let reporter = JsonReporter::new(self.output_path.clone());
                reporter.report(report)
            }
        }
    }
}
