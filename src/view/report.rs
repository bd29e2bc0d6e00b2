use crate::models::{AnalysisResult, ExecutionPlan, Recommendation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Strong,
    Moderate,
    Weak,
}

impl ScoreBand {
    pub fn for_score(score: u8) -> Self {
        if score > 75 {
            ScoreBand::Strong
        } else if score > 40 {
            ScoreBand::Moderate
        } else {
            ScoreBand::Weak
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Strong => "strong",
            ScoreBand::Moderate => "moderate",
            ScoreBand::Weak => "weak",
        }
    }
}

fn verdict_blurb(recommendation: Recommendation) -> &'static str {
    match recommendation {
        Recommendation::Go => "Build it.",
        Recommendation::Iterate => "Good problem, rework the solution.",
        Recommendation::NoGo => "Walk away.",
    }
}

/// Renders an analysis as Markdown. Sections whose data is missing are left
/// out, so partial model output still produces a readable report.
pub fn render_markdown(result: &AnalysisResult) -> String {
    let mut out = String::new();

    out.push_str("# Final Verdict\n\n");
    match result.recommendation {
        Some(rec) => {
            out.push_str(&format!("**{}**: {}\n\n", rec, verdict_blurb(rec)));
        }
        None => out.push_str("**UNKNOWN**: the analyst gave no verdict.\n\n"),
    }
    if let Some(score) = result.market_realism_score {
        out.push_str(&format!(
            "Market realism: **{}/100** ({})\n\n",
            score,
            ScoreBand::for_score(score).label()
        ));
    }

    if let Some(justification) = &result.score_justification {
        section(&mut out, "Market Reality");
        out.push_str(&format!("{}\n\n", justification));
    }
    if let Some(reasoning) = &result.reasoning {
        out.push_str(&format!("{}\n\n", reasoning));
    }

    bullets(&mut out, "Competitive Landscape", &result.competitors);
    bullets(&mut out, "Red Flags & Risks", &result.red_flags);

    if let Some(plan) = &result.execution_plan {
        render_plan(&mut out, plan);
    }

    bullets(&mut out, "Hidden Assumptions", &result.core_assumptions);
    bullets(&mut out, "Pivot & Improve", &result.pivot_suggestions);

    if !result.sources.is_empty() {
        section(&mut out, "Market Data Sources");
        for source in &result.sources {
            out.push_str(&format!("- [{}]({})\n", source.title, source.url));
        }
        out.push('\n');
    }

    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

fn render_plan(out: &mut String, plan: &ExecutionPlan) {
    section(out, "Execution Plan");
    if let Some(stack) = &plan.tech_stack_recommendation {
        out.push_str(&format!("### Recommended Stack\n\n{}\n\n", stack));
    }
    if !plan.mvp_features.is_empty() {
        out.push_str("### MVP Features\n\n");
        for feature in &plan.mvp_features {
            out.push_str(&format!("- {}\n", feature));
        }
        out.push('\n');
    }
    if let Some(channel) = &plan.sales_channel {
        out.push_str(&format!("### Primary Channel\n\n{}\n\n", channel));
    }
    if !plan.first_month_goals.is_empty() {
        out.push_str("### First 30 Days\n\n");
        for (i, goal) in plan.first_month_goals.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, goal));
        }
        out.push('\n');
    }
}

fn section(out: &mut String, title: &str) {
    out.push_str(&format!("## {}\n\n", title));
}

fn bullets(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    section(out, title);
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}
