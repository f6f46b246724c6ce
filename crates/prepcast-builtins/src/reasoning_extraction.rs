use crate::input::question_input;
use crate::search::{ContextSearcher, SearchHit};
use async_trait::async_trait;
use prepcast_core::{Context, Outcome, PrepcastError, PrepcastResult, Question};
use prepcast_steps::{Step, StepConfig, StepDescriptor};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// How much web searching to do before falling back to a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDepth {
    /// No search.
    Basic,
    /// Question-specific and generic solution queries.
    Standard,
    /// Standard plus a technique query.
    Enhanced,
}

impl SearchDepth {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(SearchDepth::Basic),
            "standard" => Some(SearchDepth::Standard),
            "enhanced" => Some(SearchDepth::Enhanced),
            _ => None,
        }
    }
}

const TITLE_KEYWORDS: [&str; 6] = ["solution", "explanation", "approach", "solve", "cat", "exam"];

const BOILERPLATE: [&str; 8] = [
    "download these questions",
    "pdf with solutions",
    "practice questions",
    "scroll the page to see",
    "video solutions for every question",
    "explained in detail by",
    "practice rc passages",
    "questions are from",
];

const USEFUL_INDICATORS: [&str; 11] = [
    "answer",
    "because",
    "correct",
    "option",
    "explanation",
    "reason",
    "solve",
    "approach",
    "method",
    "analysis",
    "conclusion",
];

/// Hits considered after de-duplication.
const MAX_UNIQUE_HITS: usize = 5;
/// Hits that may contribute text.
const MAX_USED_HITS: usize = 3;
const RESULTS_PER_QUERY: usize = 3;
const MIN_SNIPPET_CHARS: usize = 20;

/// Gathers reasoning context for the question. Requires `question`, outputs
/// `reasoning_text` and `reasoning_source` (`search` or `template`).
///
/// Config: `depth` (`basic` | `standard` | `enhanced`, default `standard`),
/// `search_timeout` in seconds per query, fractional allowed (default 10).
pub struct ReasoningExtractionStep {
    descriptor: StepDescriptor,
    searcher: Arc<dyn ContextSearcher>,
    depth: SearchDepth,
    timeout: Duration,
}

impl ReasoningExtractionStep {
    pub const NAME: &'static str = "reasoning_extraction";
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(
        name: &str,
        config: StepConfig,
        searcher: Arc<dyn ContextSearcher>,
    ) -> PrepcastResult<Self> {
        let descriptor = StepDescriptor::new(name, config);
        let depth = match descriptor.config.get("depth") {
            None => SearchDepth::Standard,
            Some(v) => v.as_str().and_then(SearchDepth::parse).ok_or_else(|| {
                PrepcastError::StepConstruction {
                    name: name.to_string(),
                    reason: format!("unknown depth {v}"),
                }
            })?,
        };
        let timeout = match descriptor.config.get("search_timeout") {
            None => Self::DEFAULT_TIMEOUT,
            Some(v) => v
                .as_f64()
                .filter(|secs| *secs > 0.0)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .ok_or_else(|| PrepcastError::StepConstruction {
                    name: name.to_string(),
                    reason: format!("search_timeout must be a positive number of seconds, got {v}"),
                })?,
        };
        Ok(Self {
            descriptor,
            searcher,
            depth,
            timeout,
        })
    }

    pub fn depth(&self) -> SearchDepth {
        self.depth
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn queries(&self, question: &Question) -> Vec<String> {
        let subject = &question.subject;
        let excerpt: String = question.question_text.chars().take(50).collect();
        let mut queries = match self.depth {
            SearchDepth::Basic => return Vec::new(),
            SearchDepth::Standard | SearchDepth::Enhanced => vec![
                format!("CAT {subject} {excerpt}"),
                format!("CAT exam {subject} solution explanation"),
            ],
        };
        if self.depth == SearchDepth::Enhanced {
            queries.push(format!("CAT {subject} problem solving technique"));
        }
        queries
    }

    async fn search(&self, question: &Question) -> Vec<SearchHit> {
        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        for query in self.queries(question) {
            let found = tokio::time::timeout(
                self.timeout,
                self.searcher.search(&query, RESULTS_PER_QUERY, self.timeout),
            )
            .await;
            match found {
                Ok(Ok(found)) => {
                    hits.extend(found.into_iter().filter(|h| seen.insert(h.url.clone())));
                }
                Ok(Err(e)) => warn!(query = %query, error = %e, "Search failed"),
                Err(_) => warn!(query = %query, "Search timed out"),
            }
        }
        hits.truncate(MAX_UNIQUE_HITS);
        hits
    }
}

#[async_trait]
impl Step for ReasoningExtractionStep {
    fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    async fn execute(&self, context: &Context) -> Outcome {
        let question = match question_input(context, &["question"]) {
            Ok(q) => q,
            Err(failure) => return failure,
        };

        let hits = self.search(&question).await;
        let extracted = extract_reasoning(&hits);

        let (text, source) = if !extracted.is_empty() && is_useful(&extracted) {
            info!(hits = hits.len(), "Using reasoning found by search");
            (extracted, "search")
        } else {
            info!(subject = %question.subject, "Using template reasoning");
            (fallback_reasoning(&question), "template")
        };

        Outcome::success(Context::new())
            .with_value("reasoning_text", json!(text))
            .with_value("reasoning_source", json!(source))
    }
}

/// Join the snippets of the top educational-looking hits.
pub fn extract_reasoning(hits: &[SearchHit]) -> String {
    let mut parts = Vec::new();
    for hit in hits.iter().take(MAX_USED_HITS) {
        let title = hit.title.to_lowercase();
        let snippet = hit.snippet.trim();
        if TITLE_KEYWORDS.iter().any(|k| title.contains(k))
            && snippet.chars().count() > MIN_SNIPPET_CHARS
        {
            parts.push(format!("**From {}:**\n{snippet}\n", hit.title));
        }
    }
    parts.join("\n")
}

/// Reject text dominated by boilerplate or lacking reasoning vocabulary.
pub fn is_useful(text: &str) -> bool {
    let lowered = text.to_lowercase();
    let boilerplate = BOILERPLATE.iter().filter(|p| lowered.contains(*p)).count();
    // more than 30% of the known boilerplate phrases
    if boilerplate * 10 > BOILERPLATE.len() * 3 {
        return false;
    }
    USEFUL_INDICATORS
        .iter()
        .filter(|w| lowered.contains(*w))
        .count()
        >= 2
}

/// Subject-specific reasoning used when search yields nothing useful.
pub fn fallback_reasoning(question: &Question) -> String {
    let answer = &question.correct_answer;
    let text = question.question_text.to_lowercase();
    let header = format!("## Reasoning for Answer {answer}:");

    let body = match question.subject.as_str() {
        "Quant" if text.contains("log") => format!(
            "This is a logarithm problem.\n\
             - Combine the equations with log(a) + log(b) = log(ab) \
               and log(a) - log(b) = log(a/b)\n\
             - Simplify the logarithmic expressions before solving\n\
             - Answer {answer} follows from that algebra\n\
             - Substitute the remaining options back to rule them out"
        ),
        "Quant" => format!(
            "This quantitative problem needs a systematic calculation.\n\
             - List what is given and what is asked\n\
             - Apply the relevant formula\n\
             - Answer {answer} comes out of the step-by-step calculation\n\
             - The other options break at least one constraint"
        ),
        "Verbal" => format!(
            "This reading comprehension question asks for the main argument.\n\
             - The correct choice is \"{}\"\n\
             - Answer {answer} keeps the passage's balanced position\n\
             - The other options are too extreme or unsupported by the passage\n\
             - Prefer moderate, well-supported conclusions over absolute claims",
            question.correct_option_text().unwrap_or_default()
        ),
        "Logic" if text.contains("sequence") => format!(
            "This is a sequence problem.\n\
             - Each new term is built from the previous terms by the stated rule\n\
             - Write the terms out one by one until the requested position\n\
             - Answer {answer} is the term at that position\n\
             - The other options are neighbouring terms or misapply the rule"
        ),
        "Logic" => format!(
            "This logic problem hinges on the underlying rule.\n\
             - Work through the stated relationships one at a time\n\
             - Answer {answer} is the only option consistent with all of them\n\
             - The other options violate at least one constraint"
        ),
        "DI" => format!(
            "This data interpretation question depends on reading the data correctly.\n\
             - Pull the relevant values from the table or chart\n\
             - Answer {answer} follows from an accurate calculation on them\n\
             - Watch for misread values and wrong periods"
        ),
        _ => format!(
            "Working through the question carefully:\n\
             - Answer {answer} is the best supported option\n\
             - It matches the key information in the question\n\
             - The other options are inconsistent or unsupported"
        ),
    };
    format!("{header}\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use prepcast_store::sample_questions;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedSearcher {
        hits: Vec<SearchHit>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContextSearcher for CannedSearcher {
        async fn search(
            &self,
            _query: &str,
            _max: usize,
            _timeout: Duration,
        ) -> PrepcastResult<Vec<SearchHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.hits.clone())
        }
    }

    fn hit(title: &str, url: &str, snippet: &str) -> SearchHit {
        SearchHit {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }

    fn config(depth: &str) -> StepConfig {
        let mut c = StepConfig::new();
        c.insert("depth".into(), json!(depth));
        c
    }

    fn step(
        config: StepConfig,
        searcher: Arc<dyn ContextSearcher>,
    ) -> PrepcastResult<ReasoningExtractionStep> {
        ReasoningExtractionStep::new(ReasoningExtractionStep::NAME, config, searcher)
    }

    fn context() -> Context {
        let mut ctx = Context::new();
        ctx.insert(
            "question".into(),
            serde_json::to_value(&sample_questions()[0]).unwrap(),
        );
        ctx
    }

    #[test]
    fn test_unknown_depth_is_rejected() {
        let result = step(config("deep"), Arc::new(crate::NoopSearcher));
        assert!(matches!(result, Err(PrepcastError::StepConstruction { .. })));
    }

    #[test]
    fn test_fractional_search_timeout() {
        let mut c = config("standard");
        c.insert("search_timeout".into(), json!(7.5));
        let extraction = step(c, Arc::new(crate::NoopSearcher)).unwrap();
        assert_eq!(extraction.timeout(), Duration::from_millis(7500));

        let mut c = config("standard");
        c.insert("search_timeout".into(), json!(3));
        let extraction = step(c, Arc::new(crate::NoopSearcher)).unwrap();
        assert_eq!(extraction.timeout(), Duration::from_secs(3));

        let extraction = step(config("basic"), Arc::new(crate::NoopSearcher)).unwrap();
        assert_eq!(extraction.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_search_timeout_is_rejected() {
        for bad in [json!(0), json!(-2.5), json!("7.5"), json!(1e300)] {
            let mut c = config("standard");
            c.insert("search_timeout".into(), bad.clone());
            let result = step(c, Arc::new(crate::NoopSearcher));
            assert!(
                matches!(result, Err(PrepcastError::StepConstruction { .. })),
                "{bad} was accepted"
            );
        }
    }

    #[test]
    fn test_extract_filters_titles_and_short_snippets() {
        let hits = vec![
            hit(
                "CAT 2023 Quant Solution",
                "u1",
                "Because log x + log y = log xy, the answer is 32.",
            ),
            hit("Random blog", "u2", "Because log x + log y = log xy, the answer is 32."),
            hit("Exam tips", "u3", "short"),
        ];
        let text = extract_reasoning(&hits);
        assert!(text.starts_with("**From CAT 2023 Quant Solution:**"));
        assert!(!text.contains("Random blog"));
        assert!(!text.contains("Exam tips"));
    }

    #[test]
    fn test_boilerplate_is_not_useful() {
        let text = "Download these questions as a PDF with solutions. Practice questions here. \
                    The answer is explained because of the correct method.";
        assert!(!is_useful(text));
        assert!(is_useful("The correct answer is B because of the method."));
        assert!(!is_useful("Nice page."));
    }

    #[test]
    fn test_fallback_by_subject() {
        let samples = sample_questions();
        assert!(fallback_reasoning(&samples[0]).contains("logarithm"));
        assert!(fallback_reasoning(&samples[1])
            .contains("Technology offers both benefits and challenges to education"));
        assert!(fallback_reasoning(&samples[2]).contains("sequence"));
    }

    #[tokio::test]
    async fn test_basic_depth_skips_search() {
        let searcher = Arc::new(CannedSearcher {
            hits: vec![],
            calls: AtomicUsize::new(0),
        });
        let extraction = step(config("basic"), searcher.clone()).unwrap();

        let out = extraction.execute(&context()).await;
        assert!(out.is_success());
        assert_eq!(out.data()["reasoning_source"], "template");
        assert_eq!(searcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_enhanced_uses_search_results() {
        let searcher = Arc::new(CannedSearcher {
            hits: vec![hit(
                "CAT Quant solution explanation",
                "https://a.example",
                "Add the equations: the correct answer is 32 because 2 log x = 6.",
            )],
            calls: AtomicUsize::new(0),
        });
        let extraction = step(config("enhanced"), searcher.clone()).unwrap();

        let out = extraction.execute(&context()).await;
        assert_eq!(out.data()["reasoning_source"], "search");
        assert!(out.data()["reasoning_text"]
            .as_str()
            .unwrap()
            .contains("2 log x = 6"));
        assert_eq!(searcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_missing_question_fails() {
        let extraction = step(StepConfig::new(), Arc::new(crate::NoopSearcher)).unwrap();
        let out = extraction.execute(&Context::new()).await;
        assert_eq!(out.error(), Some("missing required keys: question"));
    }
}
