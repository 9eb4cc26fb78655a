use maintrag_core::models::{ConversationContext, Intent};
use maintrag_core::{Catalog, Dataset};
use maintrag_llm::{rephrase_or_fallback, Rephraser};
use maintrag_query::{classify, extract_filters};
use std::sync::Arc;

use crate::analytics::{self, AnalyticsOptions};
use crate::formatter::format_answer;
use crate::models::{
    Answer, GenerationPhaseExplanation, ParsePhaseExplanation, QueryExplanation, QueryPlan,
    RetrievalPhaseExplanation,
};
use crate::retriever::retrieve_with_stats;

/// Question answering pipeline over one loaded dataset
///
/// The pipeline itself is stateless; conversation state is passed in and
/// returned by [`QueryPipeline::ask`], so one pipeline can serve many
/// sessions.
pub struct QueryPipeline {
    dataset: Arc<Dataset>,
    catalog: Catalog,
    options: AnalyticsOptions,
    rephraser: Option<Arc<dyn Rephraser>>,
    explain: bool,
}

impl QueryPipeline {
    /// Create a new pipeline
    pub fn new(dataset: Arc<Dataset>) -> Self {
        let catalog = dataset.catalog();
        Self {
            dataset,
            catalog,
            options: AnalyticsOptions::default(),
            rephraser: None,
            explain: false,
        }
    }

    /// Set ranking and listing limits
    pub fn with_options(mut self, options: AnalyticsOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable rephrasing of the deterministic answer
    pub fn with_rephraser(mut self, rephraser: Arc<dyn Rephraser>) -> Self {
        self.rephraser = Some(rephraser);
        self
    }

    /// Enable detailed explanation
    pub fn with_explain(mut self, enabled: bool) -> Self {
        self.explain = enabled;
        self
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> AnalyticsOptions {
        self.options
    }

    /// Model name of the configured rephraser, if any
    pub fn rephraser_model(&self) -> Option<&str> {
        self.rephraser.as_deref().map(|r| r.model_name())
    }

    /// Answer one question
    ///
    /// Returns the answer and the context the next turn of the same
    /// conversation should use. The given context is left untouched.
    pub fn ask(&self, question: &str, context: &ConversationContext) -> (Answer, ConversationContext) {
        // Phase 1: Question understanding
        let extraction = extract_filters(question, &self.catalog, context);
        let classification = classify(question);
        let intent = classification.intent;

        tracing::info!(
            intent = intent.name(),
            rule = classification.rule,
            follow_up = extraction.follow_up,
            "Resolved question"
        );

        // Phase 2: Retrieval and analytics
        // Listing with a keyword scores every row in scope instead of requiring the phrase
        let scope = match (&intent, &extraction.filters.keyword) {
            (Intent::ListMatches, Some(_)) => extraction.filters.without_keyword(),
            _ => extraction.filters.clone(),
        };
        let (rows, stats) = retrieve_with_stats(&self.dataset, &scope);
        let result = analytics::run(&intent, &rows, &self.dataset, &extraction.filters, &self.options);
        let formatted = format_answer(&intent, &extraction.filters, &result);

        // Phase 3: Optional rephrasing
        let rephrased = rephrase_or_fallback(self.rephraser.as_deref(), question, &formatted.text);

        let explanation = self.explain.then(|| QueryExplanation {
            parse_phase: ParsePhaseExplanation {
                rule: classification.rule,
                fallback: classification.fallback,
                stated_filters: extract_filters(question, &self.catalog, &ConversationContext::new())
                    .filters,
            },
            retrieval_phase: RetrievalPhaseExplanation {
                stats,
                full_dataset: matches!(intent, Intent::DetailLookup { .. }),
            },
            generation_phase: GenerationPhaseExplanation {
                model: self.rephraser_model().map(str::to_string),
                rephrased: rephrased.rephrased,
                fallback: rephrased.fallback,
            },
        });

        let next = context.advance(extraction.filters.clone(), intent);
        let answer = Answer {
            text: rephrased.text,
            deterministic_text: formatted.text,
            rephrased: rephrased.rephrased,
            plan: QueryPlan {
                question: question.to_string(),
                intent,
                filters: extraction.filters,
                follow_up: extraction.follow_up,
            },
            result,
            notes: extraction.notes,
            explanation,
        };

        (answer, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maintrag_core::error::{MaintragError, Result};
    use maintrag_core::models::{AnalyticsResult, WorkOrderId};

    const CSV: &str = "\
work_order_id,equipment_id,product_line,start_date,start_time,end_date,end_time,description,technician,comment,symptom_code
1001,PRESS-01,Stamping,2024-07-02,08:00:00,2024-07-02,10:00:00,Repair/Stamping/Press/Hydraulics/Seal,Alice,Oil leak at main cylinder,HYDRAULIC_LEAK
1001,PRESS-01,Stamping,2024-07-02,11:00:00,2024-07-02,12:00:00,Repair/Stamping/Press/Hydraulics/Seal,Bob,Seal replaced,HYDRAULIC_LEAK
1002,PRESS-01,Stamping,2024-07-15,09:00:00,2024-07-15,11:00:00,Repair/Stamping/Press/Drive/Bearing,Bob,Bearing noise,BEARING_WEAR
1003,CNC-01,Machining,2024-03-04,07:30:00,2024-03-04,09:00:00,Repair/Machining/CNC/Spindle/Controller,Carol,Spindle timeout on start,SPINDLE_TIMEOUT
1004,CNC-01,Machining,2024-08-20,13:00:00,2024-08-20,15:00:00,Repair/Machining/CNC/Coolant/Pump,Carol,Coolant leak under pump,COOLANT_LEAK
";

    fn pipeline() -> QueryPipeline {
        let dataset = Dataset::from_reader(CSV.as_bytes()).unwrap();
        QueryPipeline::new(Arc::new(dataset))
    }

    struct Broken;

    impl Rephraser for Broken {
        fn rephrase(&self, _question: &str, _answer: &str) -> Result<String> {
            Err(MaintragError::GeneratorUnavailable {
                reason: "timeout".into(),
                remediation: "none".into(),
            })
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn test_count_on_equipment() {
        let (answer, next) = pipeline().ask("How many incidents on PRESS-01?", &ConversationContext::new());
        assert_eq!(answer.plan.intent, Intent::CountIncidents);
        assert!(matches!(answer.result, AnalyticsResult::Count { value: 2, .. }));
        assert_eq!(next.turns, 1);
        assert_eq!(next.filters.equipment_id.as_deref(), Some("PRESS-01"));
    }

    #[test]
    fn test_follow_up_inherits_equipment() {
        let pipeline = pipeline();
        let (_, ctx) = pipeline.ask("How many incidents on PRESS-01?", &ConversationContext::new());
        let (answer, _) = pipeline.ask("How many different technicians worked on it?", &ctx);
        assert!(answer.plan.follow_up);
        assert!(matches!(answer.result, AnalyticsResult::Count { value: 2, .. }));
    }

    #[test]
    fn test_missing_work_order() {
        let (answer, _) = pipeline().ask("Show me work order 999999", &ConversationContext::new());
        assert_eq!(
            answer.result,
            AnalyticsResult::NotFound {
                work_order_id: WorkOrderId(999_999)
            }
        );
        assert!(answer.text.starts_with("No matching records"));
    }

    #[test]
    fn test_broken_rephraser_keeps_deterministic_text() {
        let plain = pipeline();
        let with_llm = pipeline().with_rephraser(Arc::new(Broken));
        let question = "Which equipment had the most incidents?";

        let (a, _) = plain.ask(question, &ConversationContext::new());
        let (b, _) = with_llm.ask(question, &ConversationContext::new());
        assert_eq!(a.text, b.text);
        assert!(!b.rephrased);
    }

    #[test]
    fn test_explanation_only_when_enabled() {
        let (answer, _) = pipeline().ask("List leaks in July 2024", &ConversationContext::new());
        assert!(answer.explanation.is_none());

        let (answer, _) = pipeline()
            .with_explain(true)
            .ask("How many incidents in July 2024?", &ConversationContext::new());
        let explanation = answer.explanation.unwrap();
        assert_eq!(explanation.retrieval_phase.stats.rows_scanned, 5);
        assert_eq!(explanation.retrieval_phase.stats.work_orders_matched, 2);
        assert_eq!(explanation.parse_phase.rule, "count_incidents");
    }
}
