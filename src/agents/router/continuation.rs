//! Deciding whether a request needs another specialist call

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::agents::domain::{Classification, ConversationTurn, Domain, Message, RouteDecision};
use crate::agents::llm::{parse_json_reply, CompletionRequest, LlmProvider};

/// Chooses the next step after a specialist turn
#[async_trait]
pub trait ContinuationPolicy: Send + Sync {
    async fn next(
        &self,
        request: &str,
        classification: &Classification,
        history: &[ConversationTurn],
        max_iterations: u32,
    ) -> RouteDecision;
}

/// Errors that another specialist cannot fix
fn is_caller_error(code: &str) -> bool {
    code.starts_with("missing_") || matches!(code, "policy_denied" | "empty_request")
}

/// Walks the classified candidates in order
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicContinuation;

impl HeuristicContinuation {
    pub fn decide(&self, request: &str, classification: &Classification, history: &[ConversationTurn]) -> RouteDecision {
        let Some(last) = history.last() else {
            return RouteDecision::complete("nothing has run");
        };

        let untried = classification
            .candidates
            .iter()
            .copied()
            .find(|d| !history.iter().any(|turn| turn.domain == *d));

        if classification.is_multi_leg() {
            if let Some(domain) = untried {
                return RouteDecision::delegate(domain, request, "next leg of a multi-domain request");
            }
            return RouteDecision::complete("every leg handled");
        }

        if last.success {
            return RouteDecision::complete("request served");
        }

        match (untried, last.error.as_deref()) {
            (_, Some(code)) if is_caller_error(code) => {
                RouteDecision::complete(format!("{} needs the user's input", code))
            }
            (Some(domain), _) => RouteDecision::delegate(domain, request, "previous specialist failed"),
            (None, _) => RouteDecision::complete("no other specialist can help"),
        }
    }
}

#[async_trait]
impl ContinuationPolicy for HeuristicContinuation {
    async fn next(
        &self,
        request: &str,
        classification: &Classification,
        history: &[ConversationTurn],
        _max_iterations: u32,
    ) -> RouteDecision {
        self.decide(request, classification, history)
    }
}

/// Render turns for a model prompt
pub fn format_history(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return "(no prior interactions)".to_string();
    }

    history
        .iter()
        .map(|turn| {
            let excerpt: String = turn.result.chars().take(200).collect();
            format!(
                "[{}] Task: {}\nResult: {}...\n",
                turn.domain.as_str().to_uppercase(),
                turn.task,
                excerpt
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const SUPERVISOR_PROMPT: &str = "You are a travel planning supervisor agent.
You do NOT have direct access to booking tools. You delegate to specialists:
- airline: flight searches and bookings
- hotel: hotel searches and bookings
- car_rental: car rental searches and bookings
When the user's request is complete, or no results were found after attempts, route to \"complete\".
Reply with a JSON object only: {\"agent\": \"airline\" | \"hotel\" | \"car_rental\" | \"complete\", \"task\": \"...\", \"reasoning\": \"...\"}";

#[derive(Debug, Deserialize)]
struct ModelRoute {
    agent: String,
    #[serde(default)]
    task: String,
    #[serde(default)]
    reasoning: String,
}

/// Asks the reasoning model; the heuristic decides when the model cannot
pub struct ModelContinuation {
    llm: Arc<dyn LlmProvider>,
    fallback: HeuristicContinuation,
}

impl ModelContinuation {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            fallback: HeuristicContinuation,
        }
    }

    async fn ask(&self, request: &str, history: &[ConversationTurn], max_iterations: u32) -> Result<RouteDecision, String> {
        let prompt = format!(
            "Original user request: {}\n\nWork completed so far:\n{}\n\nAttempts made: {}/{}\n\n\
             Is the user's original request fully satisfied?\n\
             - If yes, route to \"complete\"\n\
             - If no results were found after multiple attempts, route to \"complete\"\n\
             - Otherwise, route to the next agent needed",
            request,
            format_history(history),
            history.len(),
            max_iterations
        );

        let completion = CompletionRequest::new(vec![Message::system(SUPERVISOR_PROMPT), Message::user(prompt)]);
        let response = self.llm.complete(completion).await.map_err(|e| e.to_string())?;
        let route: ModelRoute = parse_json_reply(&response.message.content).map_err(|e| e.to_string())?;

        if route.agent.trim().eq_ignore_ascii_case("complete") {
            return Ok(RouteDecision::complete(route.reasoning));
        }

        let domain: Domain = route.agent.parse()?;
        let task = if route.task.trim().is_empty() {
            request.to_string()
        } else {
            route.task
        };
        Ok(RouteDecision::delegate(domain, task, route.reasoning))
    }
}

#[async_trait]
impl ContinuationPolicy for ModelContinuation {
    async fn next(
        &self,
        request: &str,
        classification: &Classification,
        history: &[ConversationTurn],
        max_iterations: u32,
    ) -> RouteDecision {
        match self.ask(request, history, max_iterations).await {
            Ok(decision) => {
                debug!(target = ?decision.target, rationale = %decision.rationale, "Model routing decision");
                decision
            }
            Err(e) => {
                warn!(error = %e, "Model routing failed, using heuristic");
                self.fallback.decide(request, classification, history)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::domain::{DomainTarget, IntentType, RouteTarget, SpecialistResponse};
    use crate::agents::error::LlmResult;
    use crate::agents::llm::{CompletionResponse, FinishReason};

    fn classification(candidates: Vec<Domain>) -> Classification {
        Classification {
            domain: if candidates.len() > 1 {
                DomainTarget::Multi
            } else {
                DomainTarget::Single(candidates[0])
            },
            intent: IntentType::Search,
            candidates,
        }
    }

    fn turn(domain: Domain, response: SpecialistResponse) -> ConversationTurn {
        ConversationTurn::from_response(domain, "task", &response)
    }

    #[test]
    fn test_multi_leg_walks_candidates() {
        let c = classification(vec![Domain::Airline, Domain::Hotel]);
        let history = vec![turn(Domain::Airline, SpecialistResponse::ok("flights"))];
        let decision = HeuristicContinuation.decide("flight and hotel", &c, &history);
        assert_eq!(decision.target, RouteTarget::Delegate(Domain::Hotel));
        assert_eq!(decision.task, "flight and hotel");

        let history = vec![
            turn(Domain::Airline, SpecialistResponse::ok("flights")),
            turn(Domain::Hotel, SpecialistResponse::failed("none", "application_error")),
        ];
        let decision = HeuristicContinuation.decide("flight and hotel", &c, &history);
        assert_eq!(decision.target, RouteTarget::Complete);
    }

    #[test]
    fn test_single_domain_completes() {
        let c = classification(vec![Domain::CarRental]);
        let ok = vec![turn(Domain::CarRental, SpecialistResponse::ok("cars"))];
        assert_eq!(HeuristicContinuation.decide("car", &c, &ok).target, RouteTarget::Complete);

        let missing = vec![turn(
            Domain::CarRental,
            SpecialistResponse::failed("Please provide rental_id", "missing_rental_id"),
        )];
        assert_eq!(HeuristicContinuation.decide("car", &c, &missing).target, RouteTarget::Complete);
    }

    #[test]
    fn test_failure_moves_to_untried_candidate() {
        let c = classification(vec![Domain::Hotel]);
        let history = vec![turn(Domain::CarRental, SpecialistResponse::failed("down", "transport_error"))];
        let decision = HeuristicContinuation.decide("stay", &c, &history);
        assert_eq!(decision.target, RouteTarget::Delegate(Domain::Hotel));

        let denied = vec![turn(Domain::CarRental, SpecialistResponse::failed("no", "policy_denied"))];
        assert_eq!(HeuristicContinuation.decide("stay", &c, &denied).target, RouteTarget::Complete);
    }

    #[test]
    fn test_format_history() {
        assert_eq!(format_history(&[]), "(no prior interactions)");
        let text = format_history(&[turn(Domain::CarRental, SpecialistResponse::ok("Found 3 vehicles"))]);
        assert_eq!(text, "[CAR-RENTAL] Task: task\nResult: Found 3 vehicles...\n");
    }

    struct Reply(&'static str);

    #[async_trait]
    impl LlmProvider for Reply {
        fn name(&self) -> &str {
            "reply"
        }

        fn model(&self) -> &str {
            "reply"
        }

        async fn complete(&self, _request: CompletionRequest) -> LlmResult<CompletionResponse> {
            Ok(CompletionResponse {
                message: Message::assistant(self.0),
                finish_reason: FinishReason::Stop,
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn test_model_continuation() {
        let c = classification(vec![Domain::Airline]);
        let history = vec![turn(Domain::Airline, SpecialistResponse::ok("flights"))];

        let model = ModelContinuation::new(Arc::new(Reply(
            r#"{"agent": "car_rental", "task": "Find a car at LAX", "reasoning": "user needs a car"}"#,
        )));
        let decision = model.next("trip", &c, &history, 5).await;
        assert_eq!(decision.target, RouteTarget::Delegate(Domain::CarRental));
        assert_eq!(decision.task, "Find a car at LAX");

        let done = ModelContinuation::new(Arc::new(Reply(r#"{"agent": "complete", "reasoning": "done"}"#)));
        assert_eq!(done.next("trip", &c, &history, 5).await.target, RouteTarget::Complete);

        let confused = ModelContinuation::new(Arc::new(Reply(r#"{"agent": "train"}"#)));
        assert_eq!(confused.next("trip", &c, &history, 5).await.target, RouteTarget::Complete);
    }
}
