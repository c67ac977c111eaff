//! Message classifier
//!
//! Maps free-text status messages onto catalog steps. Upstream message text is
//! not stable, so an unrecognised message is a normal outcome (`None`) rather
//! than an error.

use crate::domain::catalog::{Pattern, StepCatalog};

/// Returns the index of the first step with a rule matching `message`
///
/// Steps are tried in catalog order and rules in definition order; the first
/// hit wins even if a later rule would match more of the message.
pub fn classify(message: &str, catalog: &StepCatalog) -> Option<usize> {
    matching_rule(message, catalog).map(|(index, _)| index)
}

/// Like [`classify`], also returning the rule that matched
pub fn matching_rule<'a>(message: &str, catalog: &'a StepCatalog) -> Option<(usize, &'a Pattern)> {
    catalog.iter().enumerate().find_map(|(index, step)| {
        step.matches
            .iter()
            .find(|pattern| pattern.matches(message))
            .map(|pattern| (index, pattern))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{AnalysisConfig, Analyst, StepDefinition};

    #[test]
    fn test_classify_scenario_messages() {
        let catalog = StepCatalog::from_names(["fetch", "analyze", "report"]).unwrap();

        assert_eq!(classify("starting fetch", &catalog), Some(0));
        assert_eq!(classify("now analyze data", &catalog), Some(1));
        assert_eq!(classify("report ready", &catalog), Some(2));
        assert_eq!(classify("anything", &catalog), None);
    }

    #[test]
    fn test_first_match_wins_not_longest() {
        let catalog = StepCatalog::new(vec![
            StepDefinition::new("short").matching(Pattern::contains("data")),
            StepDefinition::new("long").matching(Pattern::contains("analyze data fully")),
        ])
        .unwrap();

        assert_eq!(classify("analyze data fully", &catalog), Some(0));
    }

    #[test]
    fn test_prefix_rules_only_match_at_start() {
        let catalog = StepCatalog::new(vec![
            StepDefinition::new("boot").matching(Pattern::prefix("[boot]")),
            StepDefinition::new("run").matching(Pattern::contains("run")),
        ])
        .unwrap();

        assert_eq!(classify("[boot] loading", &catalog), Some(0));
        assert_eq!(classify("after [boot] we run", &catalog), Some(1));
    }

    #[test]
    fn test_matching_rule_reports_pattern() {
        let catalog = StepCatalog::new(vec![
            StepDefinition::new("fetch")
                .matching(Pattern::contains("download"))
                .matching(Pattern::contains("fetch")),
        ])
        .unwrap();

        let (index, pattern) = matching_rule("fetch and download", &catalog).unwrap();
        assert_eq!(index, 0);
        assert_eq!(pattern, &Pattern::contains("download"));
    }

    #[test]
    fn test_classify_analysis_pipeline_messages() {
        let config = AnalysisConfig::new(vec![Analyst::Market, Analyst::Fundamentals], 2);
        let catalog = StepCatalog::build(&config).unwrap();
        let index_of = |name: &str| catalog.iter().position(|s| s.name == name);

        assert_eq!(
            classify("[module start] market_analyst - 000858", &catalog),
            index_of("Market analysis")
        );
        assert_eq!(
            classify("[fundamentals analyst] tool call: get_stock_fundamentals_unified", &catalog),
            index_of("Fundamentals analysis")
        );
        assert_eq!(
            classify("[module start] risk_manager - 000858", &catalog),
            index_of("Risk manager")
        );
        assert_eq!(
            classify("[module done] graph_signal_processing - ok", &catalog),
            index_of("Signal processing")
        );
        // News analyst is not part of this run
        assert_eq!(classify("[module start] news_analyst", &catalog), None);
    }
}
