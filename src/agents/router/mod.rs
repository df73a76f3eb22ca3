//! Router / supervisor
//!
//! Serves one user request per [`Router::route`] call: load the user's
//! context, classify, answer directly or delegate to specialists for a
//! bounded number of rounds, then synthesize one response. The router never
//! fails a request; every path ends in a [`RouteResponse`].

pub mod classifier;
pub mod continuation;
pub mod synthesis;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::adapters::metrics_handler::MetricsCollector;
use crate::agents::config::{ClassifierKind, ContinuationKind, RouterConfig, SynthesisKind};
use crate::agents::domain::{
    Classification, ConversationTurn, Domain, DomainTarget, IntentType, RouteDecision, RouteTarget,
    SpecialistRequest, SpecialistResponse,
};
use crate::agents::llm::LlmProvider;
use crate::agents::registry::AgentRegistry;
use crate::domain::{ContextProvider, NewItineraryItem, NewTrip, UserContext};

pub use classifier::{extract_destination, Classifier, KeywordClassifier, ModelClassifier};
pub use continuation::{format_history, ContinuationPolicy, HeuristicContinuation, ModelContinuation};
pub use synthesis::{render_itinerary, ModelSynthesizer, Synthesizer, TemplateSynthesizer};

const CLARIFICATION_MESSAGE: &str =
    "I can help you plan your trip! What would you like to start with - flights, hotels, or car rental?";

const HELP_MESSAGE: &str = "I'm your Travel Planner! I can help you:\n\
- Plan new trips\n\
- Search for flights, hotels, and car rentals\n\
- Manage your bookings\n\
- View your itinerary\n\n\
What would you like to do?";

const NO_CONTEXT_MESSAGE: &str = "I couldn't find any trip information. Would you like to plan a new trip?";

const TRIP_FAILED_MESSAGE: &str = "I had trouble creating your trip. Please try again.";

/// Booking payload keys that carry the reference stored on itinerary items
const REFERENCE_KEYS: &[&str] = &["confirmation_code", "booking_reference", "reservation_id", "rental_id"];

fn default_user_id() -> String {
    "anonymous".to_string()
}

/// Body of `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(alias = "userId", default = "default_user_id")]
    pub user_id: String,
    #[serde(alias = "conversationId", default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Structured hints forwarded to specialists
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl ChatRequest {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            user_id: user_id.into(),
            conversation_id: None,
            context: Map::new(),
        }
    }
}

/// Final answer for one user request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    #[serde(flatten)]
    pub response: SpecialistResponse,
    pub intent: IntentType,
    pub domain: DomainTarget,
    /// Specialists called, first call order
    #[serde(rename = "agentsUsed", default)]
    pub agents_used: Vec<Domain>,
    pub iterations: u32,
    #[serde(rename = "contextUsed", default)]
    pub context_used: bool,
}

pub struct Router {
    registry: AgentRegistry,
    context: Arc<dyn ContextProvider>,
    classifier: Arc<dyn Classifier>,
    continuation: Arc<dyn ContinuationPolicy>,
    synthesizer: Arc<dyn Synthesizer>,
    max_iterations: u32,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Router {
    /// Keyword classification, heuristic continuation and template synthesis
    pub fn new(registry: AgentRegistry, context: Arc<dyn ContextProvider>) -> Self {
        Self {
            registry,
            context,
            classifier: Arc::new(KeywordClassifier),
            continuation: Arc::new(HeuristicContinuation),
            synthesizer: Arc::new(TemplateSynthesizer),
            max_iterations: RouterConfig::default().max_iterations,
            metrics: None,
        }
    }

    /// Build from configuration. Model-backed stages fall back to their
    /// deterministic counterparts when no model is available.
    pub fn from_config(
        registry: AgentRegistry,
        context: Arc<dyn ContextProvider>,
        config: &RouterConfig,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        let mut router = Self::new(registry, context).with_max_iterations(config.max_iterations);

        if let Some(llm) = llm {
            if config.classifier == ClassifierKind::Model {
                router.classifier = Arc::new(ModelClassifier::new(llm.clone()));
            }
            if config.continuation == ContinuationKind::Model {
                router.continuation = Arc::new(ModelContinuation::new(llm.clone()));
            }
            if config.synthesis == SynthesisKind::Model {
                router.synthesizer = Arc::new(ModelSynthesizer::new(llm));
            }
        }
        router
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_continuation(mut self, continuation: Arc<dyn ContinuationPolicy>) -> Self {
        self.continuation = continuation;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn context_provider(&self) -> &Arc<dyn ContextProvider> {
        &self.context
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub async fn route(&self, request: ChatRequest) -> RouteResponse {
        let started = Instant::now();

        let user_context = match self.context.get_user_context(&request.user_id).await {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!(user_id = %request.user_id, error = %e, "Context lookup failed");
                None
            }
        };

        let classification = self.classifier.classify(&request.message, user_context.as_ref()).await;
        info!(
            user_id = %request.user_id,
            intent = classification.intent.as_str(),
            domain = classification.domain.as_str(),
            candidates = ?classification.candidates,
            "Classified request"
        );

        let response = self.dispatch(&request, &classification, user_context.as_ref()).await;

        if let Some(metrics) = &self.metrics {
            let intent = classification.intent.as_str();
            metrics
                .requests_total
                .with_label_values(&[intent, classification.domain.as_str()])
                .inc();
            metrics
                .request_duration
                .with_label_values(&[intent])
                .observe(started.elapsed().as_secs_f64());
        }

        response
    }

    async fn dispatch(
        &self,
        request: &ChatRequest,
        classification: &Classification,
        user_context: Option<&UserContext>,
    ) -> RouteResponse {
        let context_used = user_context.is_some();
        let direct = |response: SpecialistResponse| RouteResponse {
            response,
            intent: classification.intent,
            domain: classification.domain,
            agents_used: Vec::new(),
            iterations: 0,
            context_used,
        };

        if classification.intent == IntentType::QueryExisting {
            match user_context {
                Some(ctx) => return direct(SpecialistResponse::ok(render_itinerary(ctx))),
                None if classification.candidates.is_empty() => {
                    return direct(SpecialistResponse::ok(NO_CONTEXT_MESSAGE))
                }
                None => {}
            }
        }

        if classification.intent == IntentType::CreateTrip {
            return direct(self.create_trip(request).await);
        }

        let first = match (classification.domain, classification.candidates.first()) {
            (DomainTarget::Single(domain), _) => domain,
            (DomainTarget::Multi, Some(domain)) => *domain,
            (DomainTarget::Multi, None) => {
                debug!("Ambiguous request, asking for clarification");
                return direct(SpecialistResponse::ok(CLARIFICATION_MESSAGE));
            }
            (DomainTarget::None, _) => return direct(SpecialistResponse::ok(HELP_MESSAGE)),
        };

        let mut history: Vec<ConversationTurn> = Vec::new();
        let mut decision = RouteDecision::delegate(first, request.message.clone(), "classified");
        let mut iterations = 0u32;

        while let RouteTarget::Delegate(domain) = decision.target {
            iterations += 1;
            info!(iteration = iterations, domain = domain.as_str(), rationale = %decision.rationale, "Delegating");

            let turn = self.delegate(domain, &decision.task, request, user_context).await;
            if classification.intent == IntentType::AddToTrip {
                self.record_booking(&turn, user_context).await;
            }
            history.push(turn);

            if iterations >= self.max_iterations {
                info!(max_iterations = self.max_iterations, "Iteration bound reached");
                break;
            }
            decision = self
                .continuation
                .next(&request.message, classification, &history, self.max_iterations)
                .await;
        }

        let mut agents_used: Vec<Domain> = Vec::new();
        for turn in &history {
            if !agents_used.contains(&turn.domain) {
                agents_used.push(turn.domain);
            }
        }

        RouteResponse {
            response: self.synthesizer.synthesize(&request.message, &history).await,
            intent: classification.intent,
            domain: classification.domain,
            agents_used,
            iterations,
            context_used,
        }
    }

    async fn create_trip(&self, request: &ChatRequest) -> SpecialistResponse {
        let destination = extract_destination(&request.message);
        match self.context.create_trip(NewTrip::to(&request.user_id, &destination)).await {
            Ok(trip) => {
                info!(user_id = %request.user_id, trip_id = %trip.trip_id, destination = %destination, "Trip created");
                SpecialistResponse::ok(format!(
                    "I've started planning your trip to {}! Would you like me to search for flights, hotels, or both?",
                    destination
                ))
                .with_data(json!({ "trip": trip }))
            }
            Err(e) => {
                warn!(user_id = %request.user_id, error = %e, "Trip creation failed");
                SpecialistResponse::failed(TRIP_FAILED_MESSAGE, "trip_creation_failed")
            }
        }
    }

    async fn delegate(
        &self,
        domain: Domain,
        task: &str,
        request: &ChatRequest,
        user_context: Option<&UserContext>,
    ) -> ConversationTurn {
        let Some(specialist) = self.registry.get(domain) else {
            warn!(domain = domain.as_str(), "No specialist registered");
            let response = SpecialistResponse::failed(
                format!("No specialist is available for {}", domain),
                "agent_unavailable",
            );
            return ConversationTurn::from_response(domain, task, &response);
        };

        let mut context = request.context.clone();
        if let Some(ctx) = user_context {
            context.extend(ctx.specialist_context());
        }

        let specialist_request = SpecialistRequest {
            message: task.to_string(),
            context,
            conversation_id: request.conversation_id.clone(),
        };
        let response = specialist.handle(specialist_request).await;

        debug!(
            domain = domain.as_str(),
            success = response.success,
            tools = ?response.tools_called,
            "Specialist turn finished"
        );
        if let Some(metrics) = &self.metrics {
            let success = if response.success { "true" } else { "false" };
            metrics
                .agent_calls_total
                .with_label_values(&[domain.as_str(), success])
                .inc();
        }

        ConversationTurn::from_response(domain, task, &response)
    }

    /// Append a successful booking to the active trip. Failures are logged only.
    async fn record_booking(&self, turn: &ConversationTurn, user_context: Option<&UserContext>) {
        let Some(trip) = user_context.and_then(|ctx| ctx.active_trip.as_ref()) else {
            return;
        };
        if !turn.success || !turn.tools_called.iter().any(|t| t.starts_with("book")) {
            return;
        }
        let Some(booking) = turn.data.as_ref().and_then(|d| d.get("booking")) else {
            return;
        };

        let reference = REFERENCE_KEYS
            .iter()
            .find_map(|key| booking.get(*key).and_then(Value::as_str))
            .map(str::to_string);
        let item = NewItineraryItem::new(&trip.trip_id, turn.domain.item_type(), booking.clone(), reference);

        match self.context.append_itinerary_item(item).await {
            Ok(saved) => info!(trip_id = %trip.trip_id, item_id = %saved.item_id, "Booking added to itinerary"),
            Err(e) => warn!(trip_id = %trip.trip_id, error = %e, "Could not add booking to itinerary"),
        }
    }
}
