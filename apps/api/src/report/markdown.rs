use std::fmt::Write;

use async_trait::async_trait;
use serde_json::Value;

use crate::report::{RenderedReport, ReportDocument, ReportRenderer};

pub struct MarkdownReportRenderer;

#[async_trait]
impl ReportRenderer for MarkdownReportRenderer {
    async fn render(&self, report: &ReportDocument) -> anyhow::Result<RenderedReport> {
        Ok(RenderedReport {
            content_type: "text/markdown; charset=utf-8",
            extension: "md",
            bytes: render_markdown(report)?.into_bytes(),
        })
    }
}

pub fn render_markdown(report: &ReportDocument) -> Result<String, std::fmt::Error> {
    let mut out = String::new();

    writeln!(out, "# Interview Results")?;
    writeln!(out)?;
    writeln!(out, "- Session: `{}`", report.session_id)?;
    writeln!(out, "- Status: {}", report.status)?;
    writeln!(out, "- Date: {}", report.created_at.format("%Y-%m-%d %H:%M UTC"))?;
    writeln!(out, "- Planned duration: {} min", report.duration_seconds / 60)?;
    match report.average_score {
        Some(avg) => writeln!(out, "- Average score: {avg:.1}/10")?,
        None => writeln!(out, "- Average score: not scored")?,
    }
    writeln!(out)?;
    writeln!(out, "## Job Description")?;
    writeln!(out)?;
    writeln!(out, "{}", report.job_description.trim())?;

    for (index, entry) in report.entries.iter().enumerate() {
        writeln!(out)?;
        match &entry.question {
            Some(text) => writeln!(out, "## Question {}: {text}", index + 1)?,
            None => writeln!(out, "## Unlisted question `{}`", entry.question_id)?,
        }
        writeln!(out)?;

        let Some(answer) = &entry.answer else {
            writeln!(out, "_Not answered._")?;
            continue;
        };

        writeln!(out, "**Your answer**")?;
        writeln!(out)?;
        if answer.transcript.trim().is_empty() {
            writeln!(out, "_No transcript available._")?;
        } else {
            writeln!(out, "> {}", answer.transcript.trim())?;
        }
        writeln!(out)?;
        match answer.score {
            Some(score) => writeln!(out, "**Score:** {score}/10")?,
            None => writeln!(out, "**Score:** not scored")?,
        }

        if !answer.feedback.is_empty() {
            writeln!(out)?;
            writeln!(out, "**Feedback**")?;
            writeln!(out)?;
            for item in &answer.feedback {
                writeln!(out, "- {}", feedback_line(item))?;
            }
        }

        if let Some(model_answer) = answer.model_answer.as_deref().filter(|m| !m.trim().is_empty()) {
            writeln!(out)?;
            writeln!(out, "**Model answer**")?;
            writeln!(out)?;
            writeln!(out, "{}", model_answer.trim())?;
        }
    }

    Ok(out)
}

fn feedback_line(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
