// Copyright 2024-2025 Aprio One AB, Sweden
// Author: Kenneth Pernyer, kenneth@aprio.one
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Output rendering for the CLI.
//!
//! # Output Formats
//!
//! ## Human-readable (default)
//! ```text
//! #1    100.0  high    Northwind Analytics          Schedule demo or meeting
//! #2     93.0  high    Helix Security               Review lead
//! ```
//!
//! ## JSON (one document per result)
//! ```json
//! [{"leadId":1,"companyName":"Northwind Analytics","priorityScore":100.0,...}]
//! ```

use std::io::{self, Write};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::attribution::AttributionReport;
use crate::funnel::{ChannelPerformance, FunnelStage};
use crate::journey::LeadJourney;
use crate::model::{LeadId, RuleId};
use crate::priority::{PrioritizedLead, PriorityScore};
use crate::workflow::{ActionOutcome, SweepReport, TickReport, WorkflowRule};

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned plain text.
    #[default]
    Human,
    /// One JSON document per result.
    Json,
}

/// Human rendering of a result; JSON comes from `Serialize`.
pub trait Render {
    fn render(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Writes results to a sink in the selected format.
pub struct Printer<W: Write> {
    format: OutputFormat,
    out: W,
}

impl Printer<io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(format, io::stdout())
    }
}

impl<W: Write> Printer<W> {
    pub fn new(format: OutputFormat, out: W) -> Self {
        Self { format, out }
    }

    pub fn emit<T>(&mut self, value: &T) -> io::Result<()>
    where
        T: Render + Serialize + ?Sized,
    {
        match self.format {
            OutputFormat::Human => value.render(&mut self.out)?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut self.out, value)?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Result of evaluating one rule against one lead without acting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerCheck {
    pub rule_id: RuleId,
    pub lead_id: LeadId,
    pub trigger: String,
    pub fires: bool,
}

impl Render for LeadJourney {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "Lead {} | {} | {}",
            self.lead_id, self.company_name, self.status
        )?;
        if let Some(contact) = &self.contact_name {
            writeln!(out, "Contact: {contact}")?;
        }
        writeln!(out, "Path: {}", self.conversion_path)?;
        writeln!(
            out,
            "{} touchpoints ({} email, {} call, {} sms) over {:.1} days",
            self.total_touchpoints,
            self.email_count,
            self.call_count,
            self.sms_count,
            self.days_since_first_touch
        )?;
        for touch in &self.touchpoints {
            writeln!(
                out,
                "  {}  {:<6} {:<10} {:<10} {}",
                touch.timestamp.format("%Y-%m-%d %H:%M"),
                touch.channel,
                touch.touch_type,
                touch.status,
                touch.content.as_deref().unwrap_or("")
            )?;
        }
        Ok(())
    }
}

impl Render for AttributionReport {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "Attribution ({}) | {} contributing, {} skipped",
            self.model, self.contributing_leads, self.skipped_leads
        )?;
        for (channel, credit) in &self.credits {
            writeln!(out, "  {channel:<6} {credit:>8.3}")?;
        }
        Ok(())
    }
}

impl Render for [FunnelStage] {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        for stage in self {
            writeln!(
                out,
                "{:<12} {:>5} {:>6.1}%  dropoff {:>4}",
                stage.stage.to_string(),
                stage.count,
                stage.percentage,
                stage.dropoff
            )?;
        }
        Ok(())
    }
}

impl Render for [ChannelPerformance] {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "{:<6} {:>5} {:>7} {:>7} {:>7} {:>7} {:>8}",
            "chan", "sent", "open%", "click%", "reply%", "conv%", "resp(h)"
        )?;
        for perf in self {
            writeln!(
                out,
                "{:<6} {:>5} {:>7.1} {:>7.1} {:>7.1} {:>7.1} {:>8.1}",
                perf.channel.to_string(),
                perf.total_sent,
                perf.open_rate,
                perf.click_rate,
                perf.reply_rate,
                perf.conversion_rate,
                perf.avg_time_to_response
            )?;
        }
        Ok(())
    }
}

fn render_reasons(out: &mut dyn Write, reasons: &[String]) -> io::Result<()> {
    for reason in reasons {
        writeln!(out, "  - {reason}")?;
    }
    Ok(())
}

impl Render for PriorityScore {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "Score {:.1} ({}) | {}",
            self.priority_score, self.urgency, self.recommended_action
        )?;
        render_reasons(out, &self.reasons)
    }
}

impl Render for [PrioritizedLead] {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        for (rank, lead) in self.iter().enumerate() {
            writeln!(
                out,
                "#{:<4} {:>5.1}  {:<7} {:<28} {}",
                rank + 1,
                lead.priority.priority_score,
                lead.priority.urgency.to_string(),
                lead.company_name,
                lead.priority.recommended_action
            )?;
        }
        Ok(())
    }
}

impl Render for [WorkflowRule] {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        for rule in self {
            writeln!(
                out,
                "{:>4}  campaign {:<4} {:<8} {:<14} -> {:<14} {}",
                rule.id,
                rule.campaign_id,
                if rule.is_active { "active" } else { "inactive" },
                rule.trigger.kind(),
                rule.action.kind(),
                rule.label()
            )?;
        }
        Ok(())
    }
}

impl Render for TriggerCheck {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        let verdict = if self.fires { "fires" } else { "does not fire" };
        writeln!(
            out,
            "Rule {} ({}) {verdict} for lead {}",
            self.rule_id, self.trigger, self.lead_id
        )
    }
}

fn describe(outcome: &ActionOutcome) -> String {
    match outcome {
        ActionOutcome::ActivityLogged {
            activity_id,
            activity_type,
        } => format!("logged {activity_type} activity {activity_id}"),
        ActionOutcome::StatusUpdated { from, to } => format!("status {from} -> {to}"),
        ActionOutcome::OwnerNotified { message } => format!("notified owner: {message}"),
    }
}

impl Render for SweepReport {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "Campaign {} | {} leads, {} checks, {} fired, {} failed",
            self.campaign_id, self.leads_evaluated, self.checks, self.fired, self.failed
        )?;
        if !self.skipped_rules.is_empty() {
            writeln!(out, "  skipped invalid rules: {:?}", self.skipped_rules)?;
        }
        for execution in &self.executions {
            let detail = match (&execution.outcome, &execution.error) {
                (Some(outcome), _) => describe(outcome),
                (None, Some(error)) => format!("FAILED: {error}"),
                (None, None) => String::new(),
            };
            writeln!(
                out,
                "  rule {:>4} lead {:>5}  {detail}",
                execution.rule_id, execution.lead_id
            )?;
        }
        Ok(())
    }
}

impl Render for TickReport {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Workflow run {}", self.run_id)?;
        for sweep in &self.sweeps {
            sweep.render(out)?;
        }
        for (campaign_id, error) in &self.failed_campaigns {
            writeln!(out, "Campaign {campaign_id} | FAILED: {error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::tests::at;
    use crate::priority::{RecommendedAction, Urgency};
    use crate::store::tests::demo_store;

    fn render<T: Render + Serialize + ?Sized>(format: OutputFormat, value: &T) -> String {
        let mut printer = Printer::new(format, Vec::new());
        printer.emit(value).unwrap();
        String::from_utf8(printer.into_inner()).unwrap()
    }

    fn score() -> PriorityScore {
        PriorityScore {
            priority_score: 72.5,
            reasons: vec!["Lead has responded".into()],
            recommended_action: RecommendedAction::MakePhoneCall,
            urgency: Urgency::High,
            days_since_last_contact: 4,
        }
    }

    #[test]
    fn human_priority_score() {
        let text = render(OutputFormat::Human, &score());
        assert_eq!(
            text,
            "Score 72.5 (high) | Make a phone call\n  - Lead has responded\n"
        );
    }

    #[test]
    fn json_priority_score_uses_wire_names() {
        let text = render(OutputFormat::Json, &score());
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["priorityScore"], 72.5);
        assert_eq!(value["recommendedAction"], "Make a phone call");
        assert_eq!(value["urgency"], "high");
        assert_eq!(value["daysSinceLastContact"], 4);
    }

    #[tokio::test]
    async fn funnel_renders_one_line_per_stage() {
        let store = demo_store();
        let funnel = crate::funnel::get_conversion_funnel(&store, 1).await.unwrap();
        let text = render(OutputFormat::Human, funnel.as_slice());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("Total Leads"));
        assert!(lines[4].starts_with("Converted"));
    }

    #[tokio::test]
    async fn journey_renders_path_and_touchpoints() {
        let store = demo_store();
        let journey = crate::journey::build_journey(&store, 1, at("2025-06-15T12:00:00Z"))
            .await
            .unwrap();
        let text = render(OutputFormat::Human, &journey);
        assert!(text.contains("Path: Email → Call → Qualified"));
        assert_eq!(text.lines().count(), 4 + journey.touchpoints.len());
    }

    #[test]
    fn trigger_check_json() {
        let check = TriggerCheck {
            rule_id: 2,
            lead_id: 9,
            trigger: "status_change".into(),
            fires: true,
        };
        assert_eq!(
            render(OutputFormat::Human, &check),
            "Rule 2 (status_change) fires for lead 9\n"
        );
        let value: serde_json::Value =
            serde_json::from_str(&render(OutputFormat::Json, &check)).unwrap();
        assert_eq!(value["ruleId"], 2);
        assert_eq!(value["fires"], true);
    }
}
