//! Final answer composition

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use super::continuation::format_history;
use crate::agents::domain::{ConversationTurn, Domain, Message, SpecialistResponse};
use crate::agents::llm::{CompletionRequest, LlmProvider};
use crate::domain::UserContext;

pub const NO_RESULT_MESSAGE: &str =
    "I wasn't able to complete your request. Please try rephrasing or breaking it down into simpler steps.";

/// Keys whose values are surfaced to the user as confirmation codes
const CONFIRMATION_KEYS: &[&str] = &[
    "confirmation_code",
    "confirmation_number",
    "booking_reference",
    "reservation_id",
    "rental_id",
    "pnr",
];

/// Turns the conversation history into one response
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, request: &str, history: &[ConversationTurn]) -> SpecialistResponse;
}

fn collect_codes(value: &Value, codes: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                if CONFIRMATION_KEYS.contains(&key.as_str()) {
                    let code = match inner {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    };
                    if let Some(code) = code.filter(|c| !c.is_empty() && !codes.contains(c)) {
                        codes.push(code);
                    }
                }
                collect_codes(inner, codes);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_codes(item, codes)),
        _ => {}
    }
}

/// Confirmation codes found in successful turns, first occurrence order
pub fn confirmation_codes(history: &[ConversationTurn]) -> Vec<String> {
    let mut codes = Vec::new();
    for turn in history.iter().filter(|t| t.success) {
        if let Some(data) = &turn.data {
            collect_codes(data, &mut codes);
        }
    }
    codes
}

/// Append codes the message does not already mention
pub fn with_confirmation_codes(message: String, codes: &[String]) -> String {
    let missing: Vec<&str> = codes
        .iter()
        .map(String::as_str)
        .filter(|code| !message.contains(code))
        .collect();
    if missing.is_empty() {
        return message;
    }
    format!("{}\n\nConfirmation codes: {}", message, missing.join(", "))
}

fn section_title(domain: Domain) -> &'static str {
    match domain {
        Domain::Airline => "Flights",
        Domain::Hotel => "Hotels",
        Domain::CarRental => "Car rental",
    }
}

/// Deterministic composition from the turns
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateSynthesizer;

impl TemplateSynthesizer {
    pub fn compose(&self, history: &[ConversationTurn]) -> SpecialistResponse {
        let (first, rest) = match history.split_first() {
            Some(split) => split,
            None => return SpecialistResponse::failed(NO_RESULT_MESSAGE, "no_result"),
        };

        let (message, data) = if rest.is_empty() {
            (first.result.clone(), first.data.clone())
        } else {
            let message = history
                .iter()
                .map(|t| format!("{}: {}", section_title(t.domain), t.result))
                .collect::<Vec<_>>()
                .join("\n\n");
            let results: Vec<Value> = history
                .iter()
                .map(|t| json!({ "domain": t.domain, "success": t.success, "data": t.data }))
                .collect();
            (message, Some(json!({ "results": results })))
        };

        let message = with_confirmation_codes(message, &confirmation_codes(history));
        let tools: Vec<String> = history.iter().flat_map(|t| t.tools_called.iter().cloned()).collect();

        let response = if history.iter().any(|t| t.success) {
            SpecialistResponse::ok(message)
        } else {
            let code = history
                .iter()
                .rev()
                .find_map(|t| t.error.clone())
                .unwrap_or_default();
            SpecialistResponse::failed(message, code)
        };

        let response = response.with_tools(tools);
        match data {
            Some(data) => response.with_data(data),
            None => response,
        }
    }
}

#[async_trait]
impl Synthesizer for TemplateSynthesizer {
    async fn synthesize(&self, _request: &str, history: &[ConversationTurn]) -> SpecialistResponse {
        self.compose(history)
    }
}

/// Model-written summary over the template's outcome fields
pub struct ModelSynthesizer {
    llm: Arc<dyn LlmProvider>,
    template: TemplateSynthesizer,
}

impl ModelSynthesizer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            template: TemplateSynthesizer,
        }
    }
}

#[async_trait]
impl Synthesizer for ModelSynthesizer {
    async fn synthesize(&self, request: &str, history: &[ConversationTurn]) -> SpecialistResponse {
        let mut response = self.template.compose(history);
        if history.is_empty() {
            return response;
        }

        let prompt = format!(
            "User's original request: {}\n\nActions completed by specialist agents:\n{}\n\n\
             Provide a clear, concise summary of what was accomplished.\n\
             Include relevant booking details and confirmation numbers if any.\n\
             If no results were found, explain this clearly and suggest alternatives.",
            request,
            format_history(history)
        );

        match self.llm.complete(CompletionRequest::new(vec![Message::user(prompt)])).await {
            Ok(reply) if !reply.message.content.trim().is_empty() => {
                response.message = with_confirmation_codes(reply.message.content, &confirmation_codes(history));
            }
            Ok(_) => warn!("Model returned an empty summary, keeping template"),
            Err(e) => warn!(error = %e, "Model synthesis failed, keeping template"),
        }
        response
    }
}

fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut boundary = true;
    for c in raw.chars() {
        if boundary {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        boundary = !c.is_alphabetic();
    }
    out
}

/// Render the active trip and its itinerary
pub fn render_itinerary(context: &UserContext) -> String {
    let Some(trip) = &context.active_trip else {
        return "You don't have any active trips. Would you like me to help you plan one?".to_string();
    };

    let name = if trip.name.is_empty() { "Your Trip" } else { trip.name.as_str() };
    let destination = if trip.destination.is_empty() { "TBD" } else { trip.destination.as_str() };

    let mut lines = vec![format!("**{}**", name), format!("Destination: {}", destination)];
    if let (Some(start), Some(end)) = (&trip.start_date, &trip.end_date) {
        lines.push(format!("Dates: {} to {}", start, end));
    }
    lines.push(format!("Status: {}", title_case(&trip.status)));
    lines.push(String::new());

    if context.itinerary.is_empty() {
        lines.push("No bookings yet. What would you like to add?".to_string());
        return lines.join("\n");
    }

    lines.push("**Itinerary:**".to_string());
    for item in &context.itinerary {
        let status = title_case(&item.status);
        let detail = |key: &str| item.details.get(key).and_then(Value::as_str).map(str::to_string);
        let line = match item.item_type.as_str() {
            "flight" => format!(
                "- Flight {}: {} -> {} [{}]",
                detail("flight_number").unwrap_or_else(|| "N/A".to_string()),
                detail("origin").unwrap_or_default(),
                detail("destination").unwrap_or_default(),
                status
            ),
            "hotel" => format!("- {} [{}]", detail("hotel_name").unwrap_or_else(|| "Hotel".to_string()), status),
            "car_rental" => format!("- Car Rental [{}]", status),
            other => format!("- {} [{}]", title_case(other), status),
        };
        lines.push(line);
    }
    lines.join("\n")
}
