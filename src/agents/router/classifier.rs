//! Request classification
//!
//! The keyword classifier is an ordered table of `(predicate, outcome)`
//! pairs evaluated top to bottom; the first match decides. It is pure: the
//! same text and trip state always give the same classification.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::agents::domain::{Classification, Domain, DomainTarget, IntentType, Message};
use crate::agents::llm::{parse_json_reply, CompletionRequest, LlmProvider};
use crate::domain::UserContext;

/// Decides the domain and intent of a user request
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, message: &str, context: Option<&UserContext>) -> Classification;
}

const DOMAIN_KEYWORDS: [(Domain, &[&str]); 3] = [
    (Domain::Airline, &["flight", "fly", "airport", "airline", "plane"]),
    (Domain::Hotel, &["hotel", "room", "stay", "accommodation", "lodge"]),
    (Domain::CarRental, &["car", "vehicle", "rent", "rental", "drive"]),
];

const MULTI_KEYWORDS: &[&str] = &["trip", "travel", "vacation", "journey"];

/// What a matched intent row resolves to
#[derive(Debug, Clone, Copy)]
enum IntentOutcome {
    Fixed(IntentType),
    /// Only with an active trip; otherwise the row is skipped
    AddToActiveTrip,
    /// Add to the active trip, else start one unless a concrete domain was named
    Book,
}

struct IntentRow {
    phrases: &'static [&'static str],
    outcome: IntentOutcome,
}

static INTENT_TABLE: &[IntentRow] = &[
    IntentRow {
        phrases: &["cancel", "delete", "remove"],
        outcome: IntentOutcome::Fixed(IntentType::Cancel),
    },
    IntentRow {
        phrases: &["change", "modify", "update", "reschedule"],
        outcome: IntentOutcome::Fixed(IntentType::Modify),
    },
    IntentRow {
        phrases: &[
            "my booking",
            "my flight",
            "my hotel",
            "my reservation",
            "my trip",
            "my itinerary",
            "what time",
            "when is",
            "show me",
            "what do i have",
        ],
        outcome: IntentOutcome::Fixed(IntentType::QueryExisting),
    },
    IntentRow {
        phrases: &[
            "plan a trip",
            "planning a trip",
            "new trip",
            "going to",
            "want to go",
            "need to go",
            "traveling to",
            "travel to",
        ],
        outcome: IntentOutcome::Fixed(IntentType::CreateTrip),
    },
    IntentRow {
        phrases: &["add", "book", "reserve", "get me", "find me", "i need", "i want"],
        outcome: IntentOutcome::AddToActiveTrip,
    },
    IntentRow {
        phrases: &["search", "find", "look for", "show", "list", "available", "options"],
        outcome: IntentOutcome::Fixed(IntentType::Search),
    },
    IntentRow {
        phrases: &["book", "reserve", "purchase"],
        outcome: IntentOutcome::Book,
    },
];

/// Table-driven classifier over lower-cased text
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Concrete domains mentioned in the text, in processing order
    pub fn domains_in(text: &str) -> Vec<Domain> {
        let lower = text.to_lowercase();
        DOMAIN_KEYWORDS
            .iter()
            .filter(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map(|(domain, _)| *domain)
            .collect()
    }

    pub fn classify_text(&self, text: &str, has_active_trip: bool) -> Classification {
        let lower = text.to_lowercase();
        let candidates = Self::domains_in(&lower);

        let domain = match candidates.as_slice() {
            [] if MULTI_KEYWORDS.iter().any(|w| lower.contains(w)) => DomainTarget::Multi,
            [] => DomainTarget::None,
            [single] => DomainTarget::Single(*single),
            _ => DomainTarget::Multi,
        };

        let intent = INTENT_TABLE
            .iter()
            .filter(|row| row.phrases.iter().any(|p| lower.contains(p)))
            .find_map(|row| match row.outcome {
                IntentOutcome::Fixed(intent) => Some(intent),
                IntentOutcome::AddToActiveTrip => has_active_trip.then_some(IntentType::AddToTrip),
                IntentOutcome::Book if has_active_trip => Some(IntentType::AddToTrip),
                IntentOutcome::Book if candidates.is_empty() => Some(IntentType::CreateTrip),
                IntentOutcome::Book => Some(IntentType::General),
            })
            .unwrap_or(IntentType::General);

        Classification {
            domain,
            intent,
            candidates,
        }
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, message: &str, context: Option<&UserContext>) -> Classification {
        self.classify_text(message, context.map_or(false, UserContext::has_active_trip))
    }
}

const CLASSIFIER_PROMPT: &str = "You are an intent classifier for a travel booking system.
Classify the user's message and reply with a JSON object only:
{\"domain\": \"airline\" | \"hotel\" | \"car-rental\" | \"multi\" | \"none\",
 \"intent\": \"create-trip\" | \"add-to-trip\" | \"modify\" | \"cancel\" | \"query-existing\" | \"search\" | \"general\"}
- airline: flights, airports, boarding passes
- hotel: hotels, rooms, accommodations
- car-rental: car rentals, vehicles
- multi: the request spans several of these or the whole trip
- none: anything else";

#[derive(Debug, Deserialize)]
struct ModelVerdict {
    domain: DomainTarget,
    intent: String,
}

/// Asks the reasoning model, falling back to keywords on any failure
pub struct ModelClassifier {
    llm: Arc<dyn LlmProvider>,
    fallback: KeywordClassifier,
}

impl ModelClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            fallback: KeywordClassifier,
        }
    }

    async fn ask(&self, message: &str, has_active_trip: bool) -> Result<Classification, String> {
        let mut prompt = message.to_string();
        if has_active_trip {
            prompt.push_str("\n\n(The user has an active trip.)");
        }
        let request = CompletionRequest::new(vec![Message::system(CLASSIFIER_PROMPT), Message::user(prompt)]);
        let response = self.llm.complete(request).await.map_err(|e| e.to_string())?;
        let verdict: ModelVerdict = parse_json_reply(&response.message.content).map_err(|e| e.to_string())?;
        let intent: IntentType = verdict.intent.parse()?;

        // The model names the domain; candidate order still comes from the text
        let candidates = match verdict.domain {
            DomainTarget::Single(domain) => vec![domain],
            DomainTarget::Multi => KeywordClassifier::domains_in(message),
            DomainTarget::None => Vec::new(),
        };

        Ok(Classification {
            domain: verdict.domain,
            intent,
            candidates,
        })
    }
}

#[async_trait]
impl Classifier for ModelClassifier {
    async fn classify(&self, message: &str, context: Option<&UserContext>) -> Classification {
        let has_active_trip = context.map_or(false, UserContext::has_active_trip);
        match self.ask(message, has_active_trip).await {
            Ok(classification) => {
                debug!(domain = classification.domain.as_str(), intent = classification.intent.as_str(), "Model classification");
                classification
            }
            Err(e) => {
                warn!(error = %e, "Model classification failed, using keywords");
                self.fallback.classify_text(message, has_active_trip)
            }
        }
    }
}

const KNOWN_CITIES: &[&str] = &[
    "New York",
    "Los Angeles",
    "Chicago",
    "Houston",
    "Phoenix",
    "Philadelphia",
    "San Antonio",
    "San Diego",
    "Dallas",
    "San Jose",
    "Austin",
    "Jacksonville",
    "Fort Worth",
    "Columbus",
    "Charlotte",
    "San Francisco",
    "Indianapolis",
    "Seattle",
    "Denver",
    "Boston",
    "Miami",
    "Atlanta",
    "Las Vegas",
    "Orlando",
    "Tampa",
    "Portland",
    "Paris",
    "London",
    "Tokyo",
    "Sydney",
    "Dubai",
    "Singapore",
];

static DESTINATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        "trip to", "going to", "travel to", "fly to", "visit", "vacation in", "to",
    ]
    .iter()
    .filter_map(|lead| Regex::new(&format!(r"\b{} ([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)", lead)).ok())
    .collect()
});

const NOT_DESTINATIONS: &[&str] = &["plan", "book", "search", "find", "help", "want", "need"];
const NOT_NAMES: &[&str] = &["i", "would", "like", "want", "need", "please", "can", "could"];

/// Best-effort destination from free text; `"Unknown"` when nothing fits
pub fn extract_destination(message: &str) -> String {
    let text = message.trim();
    let lower = text.to_lowercase();

    if let Some(city) = KNOWN_CITIES.iter().find(|c| lower.contains(&c.to_lowercase())) {
        return city.to_string();
    }

    for pattern in DESTINATION_PATTERNS.iter() {
        if let Some(found) = pattern.captures(text).and_then(|c| c.get(1)) {
            let candidate = found.as_str().trim();
            if !NOT_DESTINATIONS.contains(&candidate.to_lowercase().as_str()) {
                return candidate.to_string();
            }
        }
    }

    let capitalized = |w: &str| w.chars().next().map_or(false, char::is_uppercase);
    let words: Vec<&str> = text.split_whitespace().collect();
    for (i, word) in words.iter().enumerate() {
        if capitalized(word) && !NOT_NAMES.contains(&word.to_lowercase().as_str()) {
            return match words.get(i + 1) {
                Some(next) if capitalized(next) => format!("{} {}", word, next),
                _ => word.to_string(),
            };
        }
    }

    "Unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::error::{LlmError, LlmResult};
    use crate::agents::llm::{CompletionResponse, FinishReason};

    fn classify(text: &str) -> Classification {
        KeywordClassifier.classify_text(text, false)
    }

    #[test]
    fn test_list_airports_is_airline_search() {
        let c = classify("List available airports");
        assert_eq!(c.domain, DomainTarget::Single(Domain::Airline));
        assert_eq!(c.intent, IntentType::Search);
        assert!(!c.is_multi_leg());
    }

    #[test]
    fn test_cancel_wins_over_query() {
        let c = classify("Cancel my rental");
        assert_eq!(c.domain, DomainTarget::Single(Domain::CarRental));
        assert_eq!(c.intent, IntentType::Cancel);
    }

    #[test]
    fn test_two_domains_are_multi_leg_in_fixed_order() {
        let c = classify("I need a rental car and a flight to Denver");
        assert_eq!(c.domain, DomainTarget::Multi);
        assert_eq!(c.candidates, vec![Domain::Airline, Domain::CarRental]);
        assert!(c.is_multi_leg());
    }

    #[test]
    fn test_trip_words_without_domain() {
        let c = classify("Plan a trip to Chicago");
        assert_eq!(c.domain, DomainTarget::Multi);
        assert!(c.candidates.is_empty());
        assert_eq!(c.intent, IntentType::CreateTrip);
    }

    #[test]
    fn test_book_depends_on_active_trip() {
        let with_trip = KeywordClassifier.classify_text("book the hotel", true);
        assert_eq!(with_trip.intent, IntentType::AddToTrip);

        let without = KeywordClassifier.classify_text("book the hotel", false);
        assert_eq!(without.intent, IntentType::General);
        assert_eq!(without.domain, DomainTarget::Single(Domain::Hotel));

        let bare = KeywordClassifier.classify_text("book something nice", false);
        assert_eq!(bare.intent, IntentType::CreateTrip);
    }

    #[test]
    fn test_query_existing() {
        assert_eq!(classify("What do I have planned?").intent, IntentType::QueryExisting);
        assert_eq!(classify("hello there").intent, IntentType::General);
        assert_eq!(classify("hello there").domain, DomainTarget::None);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let text = "Find me a hotel room and a car in Miami";
        assert_eq!(classify(text), classify(text));
    }

    #[test]
    fn test_extract_destination() {
        assert_eq!(extract_destination("Plan a trip to chicago next week"), "Chicago");
        assert_eq!(extract_destination("I am going to Rome"), "Rome");
        assert_eq!(extract_destination("We want to visit Buenos Aires"), "Buenos Aires");
        assert_eq!(extract_destination("I would like Lisbon"), "Lisbon");
        assert_eq!(extract_destination("plan something fun"), "Unknown");
    }

    struct FixedModel(LlmResult<String>);

    #[async_trait]
    impl LlmProvider for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: CompletionRequest) -> LlmResult<CompletionResponse> {
            match &self.0 {
                Ok(text) => Ok(CompletionResponse {
                    message: Message::assistant(text.clone()),
                    finish_reason: FinishReason::Stop,
                    usage: None,
                }),
                Err(_) => Err(LlmError::Timeout),
            }
        }
    }

    #[tokio::test]
    async fn test_model_classifier_reads_json() {
        let model = FixedModel(Ok("```json\n{\"domain\": \"car_rental\", \"intent\": \"search\"}\n```".into()));
        let classifier = ModelClassifier::new(Arc::new(model));
        let c = classifier.classify("something with wheels", None).await;
        assert_eq!(c.domain, DomainTarget::Single(Domain::CarRental));
        assert_eq!(c.candidates, vec![Domain::CarRental]);
        assert_eq!(c.intent, IntentType::Search);
    }

    #[tokio::test]
    async fn test_model_classifier_falls_back_to_keywords() {
        let failing = ModelClassifier::new(Arc::new(FixedModel(Err(LlmError::Timeout))));
        let c = failing.classify("List available airports", None).await;
        assert_eq!(c, classify("List available airports"));

        let rambling = ModelClassifier::new(Arc::new(FixedModel(Ok("it is about hotels".into()))));
        let c = rambling.classify("a hotel in Paris", None).await;
        assert_eq!(c.domain, DomainTarget::Single(Domain::Hotel));
    }
}
