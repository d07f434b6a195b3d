//! 人間向けの出力整形

use colored::Colorize;
use shipflow_core::{
    DeploymentOutcome, DeploymentPlan, DeploymentReport, EnvValue, OutcomeStatus, OverallStatus,
};

/// デプロイ計画を表示
pub fn print_plan(plan: &DeploymentPlan) {
    println!(
        "{} → {} ({})",
        plan.service.cyan().bold(),
        plan.resource_name,
        plan.kind
    );

    let resources = &plan.resources;
    if let Some(memory) = resources.memory {
        println!("  memory:  {} MiB", memory);
    }
    if let Some(timeout) = resources.timeout {
        println!("  timeout: {} s", timeout);
    }
    if let Some(cpu) = resources.cpu {
        println!("  cpu:     {}", cpu);
    }
    if let Some(scaling) = plan.scaling {
        println!(
            "  scaling: {}..{}",
            scaling.min_instances, scaling.max_instances
        );
    }
    if !plan.env.is_empty() {
        println!("  env:");
        for var in &plan.env {
            match &var.value {
                EnvValue::Literal(value) => println!("    {}={}", var.name, value),
                EnvValue::Secret(reference) => {
                    println!("    {}={}", var.name, format!("<secret:{}>", reference).dimmed())
                }
            }
        }
    }
    if !plan.secrets.is_empty() {
        let secrets: Vec<_> = plan.secrets.iter().map(String::as_str).collect();
        println!("  secrets: {}", secrets.join(", "));
    }
    println!();
}

fn print_outcome(outcome: &DeploymentOutcome) {
    let duration = format!("{:.1}s", outcome.duration().as_secs_f64());
    match outcome.status {
        OutcomeStatus::Success => {
            println!(
                "  {} {} ({})",
                "✓".green(),
                outcome.service.cyan(),
                duration.dimmed()
            );
            if let Some(message) = &outcome.message {
                println!("      {}", message.dimmed());
            }
        }
        OutcomeStatus::Failed => {
            println!(
                "  {} {} ({})",
                "✗".red(),
                outcome.service.cyan(),
                duration.dimmed()
            );
            if let Some(error) = &outcome.error {
                println!("      {}", error.red());
            }
        }
        OutcomeStatus::Skipped => {
            println!("  {} {}", "-".dimmed(), outcome.service.dimmed());
        }
    }
}

/// デプロイレポートを表示
pub fn print_report(report: &DeploymentReport) {
    println!();
    println!(
        "ブランチ: {}  環境: {}  ref: {}",
        report.branch.cyan(),
        report.environment.cyan().bold(),
        report.triggering_ref
    );

    if report.outcomes.is_empty() {
        println!("{}", "変更されたサービスはありません".yellow());
    } else {
        println!();
        for outcome in &report.outcomes {
            print_outcome(outcome);
        }
    }

    println!();
    let summary = report.summary().to_string();
    match report.overall_status {
        OverallStatus::Success => {
            println!("{} ({})", "✓ デプロイ完了".green().bold(), summary)
        }
        OverallStatus::Failed => {
            println!("{} ({})", "✗ デプロイ失敗".red().bold(), summary)
        }
    }
}
