//! Catalog command handler

use anyhow::Result;
use colored::*;
use waypoint_core::domain::catalog::{AnalysisConfig, Pattern, StepCatalog};

/// Print the steps an analysis run goes through
pub fn print_catalog(config: &AnalysisConfig) -> Result<()> {
    let catalog = StepCatalog::build(config)?;

    println!(
        "{}",
        format!(
            "{} steps, estimated {}:",
            catalog.len(),
            format_duration(catalog.estimated_total_seconds())
        )
        .bold()
    );
    println!();

    for (index, step) in catalog.iter().enumerate() {
        println!(
            "  {:>2}. {} {}",
            index + 1,
            step.name.cyan(),
            format!("(~{})", format_duration(step.estimated_seconds)).dimmed()
        );
        if !step.description.is_empty() {
            println!("      {}", step.description);
        }
        let rules: Vec<String> = step.matches.iter().map(describe_pattern).collect();
        if !rules.is_empty() {
            println!("      {} {}", "matches:".dimmed(), rules.join(", ").dimmed());
        }
    }

    Ok(())
}

fn describe_pattern(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Contains(text) => format!("\"{}\"", text),
        Pattern::Prefix(text) => format!("^\"{}\"", text),
    }
}

/// Formats seconds as `1m 05s` or `42s`
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    match (total / 3600, total / 60 % 60, total % 60) {
        (0, 0, s) => format!("{}s", s),
        (0, m, s) => format!("{}m {:02}s", m, s),
        (h, m, s) => format!("{}h {:02}m {:02}s", h, m, s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0s");
        assert_eq!(format_duration(42.4), "42s");
        assert_eq!(format_duration(65.0), "1m 05s");
        assert_eq!(format_duration(3725.0), "1h 02m 05s");
        assert_eq!(format_duration(-3.0), "0s");
    }

    #[test]
    fn test_describe_pattern() {
        assert_eq!(describe_pattern(&Pattern::contains("trader")), "\"trader\"");
        assert_eq!(describe_pattern(&Pattern::prefix("Starting")), "^\"Starting\"");
    }
}
