use super::{KeepReport, KeptEntity};
use crate::graph::{EntityKind, KeepReasonKind};
use colored::Colorize;
use miette::Result;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Terminal reporter with colored output
pub struct TerminalReporter {
    /// Print the compact state bits next to each entity
    show_state: bool,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self { show_state: true }
    }

    pub fn with_state(mut self, show: bool) -> Self {
        self.show_state = show;
        self
    }

    pub fn report(&self, report: &KeepReport) -> Result<()> {
        print!("{}", self.render(report));
        Ok(())
    }

    pub fn render(&self, report: &KeepReport) -> String {
        let mut out = String::new();

        if report.entities.is_empty() {
            let _ = writeln!(out, "{}", "Nothing is reachable.".green().bold());
            return out;
        }

        // Roots grouped by each of their reasons
        let mut by_reason: BTreeMap<KeepReasonKind, Vec<&KeptEntity>> = BTreeMap::new();
        let mut referenced = Vec::new();
        for entity in &report.entities {
            if entity.reasons.is_empty() {
                referenced.push(entity);
            }
            for reason in &entity.reasons {
                by_reason.entry(reason.kind).or_default().push(entity);
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}",
            format!("{} reachable entities:", report.entities.len())
                .yellow()
                .bold()
        );
        let _ = writeln!(out);

        for (kind, entities) in &by_reason {
            let _ = writeln!(
                out,
                "{}",
                format!("Kept by {} ({})", kind, entities.len()).cyan().bold()
            );
            for entity in entities {
                self.write_entity(&mut out, entity, Some(*kind));
            }
            let _ = writeln!(out);
        }

        if !referenced.is_empty() {
            let _ = writeln!(
                out,
                "{}",
                format!("Referenced ({})", referenced.len()).cyan().bold()
            );
            for entity in referenced {
                self.write_entity(&mut out, entity, None);
            }
            let _ = writeln!(out);
        }

        self.write_summary(&mut out, report);
        out
    }

    fn write_entity(&self, out: &mut String, entity: &KeptEntity, group: Option<KeepReasonKind>) {
        let _ = write!(
            out,
            "  {} {}",
            format!("{:<6}", entity.kind.display_name()).dimmed(),
            entity.name
        );

        if self.show_state {
            let _ = write!(out, " {}", format!("[{}]", entity.state).dimmed());
        }

        let triggers: Vec<&str> = entity
            .reasons
            .iter()
            .filter(|r| Some(r.kind) == group)
            .filter_map(|r| r.triggered_by.as_deref())
            .collect();
        let _ = writeln!(out);
        for trigger in triggers {
            let _ = writeln!(out, "      {} {}", "from".dimmed(), trigger);
        }

        let mut flags = Vec::new();
        if entity.by_type {
            flags.push("type");
        }
        if entity.by_string {
            flags.push("string");
        }
        if entity.by_resources {
            flags.push("resources");
        }
        if entity.is_serde {
            flags.push("serde");
        }
        if !flags.is_empty() {
            let _ = writeln!(
                out,
                "      {}",
                format!("referenced by {}", flags.join(", ")).dimmed()
            );
        }
    }

    fn write_summary(&self, out: &mut String, report: &KeepReport) {
        let _ = writeln!(out, "{}", "─".repeat(60).dimmed());

        let _ = writeln!(
            out,
            "Summary: {} classes, {} methods, {} fields reachable of {} entities",
            report.count_of(EntityKind::Class).to_string().yellow(),
            report.count_of(EntityKind::Method).to_string().yellow(),
            report.count_of(EntityKind::Field).to_string().yellow(),
            report.total_entities
        );

        let pinned = report
            .entities
            .iter()
            .filter(|e| !e.allow_shrinking || !e.allow_obfuscation)
            .count();
        let _ = writeln!(
            out,
            "  {} roots, {} pinned against shrinking or obfuscation",
            report.roots().count(),
            pinned
        );
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}
