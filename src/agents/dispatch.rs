//! Deterministic dispatch tables
//!
//! A specialist's deterministic strategy is an ordered list of rules. Each
//! rule pairs a predicate over the task text (and context keys) with a tool
//! and the recipe for its arguments. The first matching rule wins.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::domain::Domain;

/// Predicate over the lower-cased task text and the request context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPredicate {
    /// Task contains the term
    Contains { term: String },
    /// Task contains at least one term
    AnyOf { terms: Vec<String> },
    /// Every nested predicate holds
    AllOf { all: Vec<TaskPredicate> },
    /// Context carries a non-empty value for the key
    HasContext { key: String },
    Always,
}

impl TaskPredicate {
    pub fn contains(term: &str) -> Self {
        TaskPredicate::Contains {
            term: term.to_string(),
        }
    }

    pub fn any_of(terms: &[&str]) -> Self {
        TaskPredicate::AnyOf {
            terms: terms.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn all_of(all: Vec<TaskPredicate>) -> Self {
        TaskPredicate::AllOf { all }
    }

    pub fn has_context(key: &str) -> Self {
        TaskPredicate::HasContext {
            key: key.to_string(),
        }
    }

    /// `task` must already be lower-cased
    pub fn matches(&self, task: &str, context: &Map<String, Value>) -> bool {
        match self {
            TaskPredicate::Contains { term } => task.contains(&term.to_lowercase()),
            TaskPredicate::AnyOf { terms } => terms.iter().any(|t| task.contains(&t.to_lowercase())),
            TaskPredicate::AllOf { all } => all.iter().all(|p| p.matches(task, context)),
            TaskPredicate::HasContext { key } => context_value(context, key).is_some(),
            TaskPredicate::Always => true,
        }
    }
}

/// Maps a phrase found in the task to an argument value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLookup {
    pub term: String,
    pub value: Value,
}

/// How one tool argument is filled in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    /// Context keys to read, first present wins. Empty means `[name]`.
    #[serde(default)]
    pub from: Vec<String>,
    /// Phrases scanned in the task when the context has nothing
    #[serde(default)]
    pub lookup: Vec<TextLookup>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
    /// Error code when a required value is missing (default `missing_<name>`)
    #[serde(default)]
    pub missing_error: Option<String>,
}

impl ArgSpec {
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            from: Vec::new(),
            lookup: Vec::new(),
            default: None,
            required: true,
            missing_error: None,
        }
    }

    pub fn optional(name: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name)
        }
    }

    pub fn with_default(name: &str, default: Value) -> Self {
        Self {
            default: Some(default),
            ..Self::optional(name)
        }
    }

    pub fn from_keys(mut self, keys: &[&str]) -> Self {
        self.from = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn lookup(mut self, table: &[(&str, &str)]) -> Self {
        self.lookup = table
            .iter()
            .map(|(term, value)| TextLookup {
                term: term.to_string(),
                value: Value::String(value.to_string()),
            })
            .collect();
        self
    }

    pub fn missing_error(mut self, code: &str) -> Self {
        self.missing_error = Some(code.to_string());
        self
    }

    pub fn resolve(&self, task: &str, context: &Map<String, Value>) -> Option<Value> {
        let from_context = if self.from.is_empty() {
            context_value(context, &self.name)
        } else {
            self.from.iter().find_map(|key| context_value(context, key))
        };

        from_context
            .cloned()
            .or_else(|| {
                self.lookup
                    .iter()
                    .find(|l| task.contains(&l.term.to_lowercase()))
                    .map(|l| l.value.clone())
            })
            .or_else(|| self.default.clone())
    }

    fn missing_code(&self) -> String {
        self.missing_error
            .clone()
            .unwrap_or_else(|| format!("missing_{}", self.name))
    }
}

fn context_value<'a>(context: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    context.get(key).filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

/// One entry of a dispatch table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRule {
    pub when: TaskPredicate,
    pub tool: String,
    #[serde(default)]
    pub args: Vec<ArgSpec>,
    /// Success message; `{arg}` placeholders are filled from the arguments
    pub message: String,
    /// Key under which the tool payload is placed in `data`
    #[serde(default = "default_data_key")]
    pub data_key: String,
}

fn default_data_key() -> String {
    "result".to_string()
}

impl DispatchRule {
    pub fn new(when: TaskPredicate, tool: &str, message: &str, data_key: &str) -> Self {
        Self {
            when,
            tool: tool.to_string(),
            args: Vec::new(),
            message: message.to_string(),
            data_key: data_key.to_string(),
        }
    }

    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.args.push(spec);
        self
    }

    /// Fill the message template from resolved arguments
    pub fn render_message(&self, arguments: &Map<String, Value>) -> String {
        let mut message = self.message.clone();
        for (name, value) in arguments {
            let placeholder = format!("{{{}}}", name);
            if message.contains(&placeholder) {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                message = message.replace(&placeholder, &text);
            }
        }
        message
    }
}

/// What the table decided for a task
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// Call the rule's tool with these arguments
    Call {
        rule: &'a DispatchRule,
        arguments: Map<String, Value>,
    },
    /// A rule matched but required arguments are absent
    Missing {
        rule: &'a DispatchRule,
        code: String,
        missing: Vec<String>,
    },
}

/// First matching rule wins. `None` when nothing matches.
pub fn resolve<'a>(
    rules: &'a [DispatchRule],
    task: &str,
    context: &Map<String, Value>,
) -> Option<Resolution<'a>> {
    let task = task.to_lowercase();
    let rule = rules.iter().find(|r| r.when.matches(&task, context))?;

    let mut arguments = Map::new();
    let mut missing = Vec::new();
    let mut code = None;

    for spec in &rule.args {
        match spec.resolve(&task, context) {
            Some(value) => {
                arguments.insert(spec.name.clone(), value);
            }
            None if spec.required => {
                missing.push(spec.name.clone());
                code.get_or_insert_with(|| spec.missing_code());
            }
            None => {}
        }
    }

    Some(match code {
        Some(code) => Resolution::Missing {
            rule,
            code,
            missing,
        },
        None => Resolution::Call { rule, arguments },
    })
}

const DEFAULT_DEPARTURE: &str = "2026-02-15";
const DEFAULT_RETURN: &str = "2026-02-17";

const CITY_CODES: &[(&str, &str)] = &[
    ("miami", "MIA"),
    ("new york", "NYC"),
    ("los angeles", "LAX"),
    ("lax", "LAX"),
    ("chicago", "CHI"),
    ("san francisco", "SFO"),
    ("seattle", "SEA"),
    ("boston", "BOS"),
    ("denver", "DEN"),
    ("atlanta", "ATL"),
];

/// Built-in rule table for a domain
pub fn builtin_rules(domain: Domain) -> Vec<DispatchRule> {
    use TaskPredicate as P;

    match domain {
        Domain::Airline => vec![
            DispatchRule::new(
                P::all_of(vec![P::contains("airport"), P::any_of(&["list", "available", "show"])]),
                "list_airports",
                "Here are the available airports",
                "airports",
            ),
            DispatchRule::new(
                P::all_of(vec![P::contains("search"), P::contains("flight")]),
                "search_flights",
                "Found flights from {origin} to {destination}",
                "flights",
            )
            .arg(ArgSpec::with_default("origin", json!("JFK")))
            .arg(ArgSpec::with_default("destination", json!("LAX")))
            .arg(
                ArgSpec::with_default("departure_date", json!(DEFAULT_DEPARTURE))
                    .from_keys(&["departure_date", "date"]),
            )
            .arg(ArgSpec::with_default("passengers", json!(1)))
            .arg(ArgSpec::with_default("cabin_class", json!("economy"))),
            DispatchRule::new(
                P::all_of(vec![P::contains("book"), P::contains("flight")]),
                "book_flight",
                "Flight booked successfully",
                "booking",
            )
            .arg(ArgSpec::required("flight_id").from_keys(&["flight_id", "flightId"]))
            .arg(ArgSpec::with_default("passengers", json!(["Guest"]))),
            DispatchRule::new(P::contains("cancel"), "cancel_booking", "Booking cancelled", "result")
                .arg(
                    ArgSpec::required("confirmation_code")
                        .from_keys(&["confirmation_code", "confirmationCode"]),
                ),
            DispatchRule::new(
                P::all_of(vec![
                    P::any_of(&["booking", "reservation"]),
                    P::has_context("confirmation_code"),
                ]),
                "get_booking",
                "Booking details retrieved",
                "booking",
            )
            .arg(ArgSpec::required("confirmation_code")),
            DispatchRule::new(
                P::all_of(vec![P::contains("flight"), P::contains("detail")]),
                "get_flight_details",
                "Flight details retrieved",
                "flight",
            )
            .arg(ArgSpec::required("flight_id").from_keys(&["flight_id", "flightId"])),
        ],
        Domain::Hotel => vec![
            DispatchRule::new(
                P::all_of(vec![P::contains("cit"), P::any_of(&["list", "available"])]),
                "list_cities",
                "Available cities",
                "cities",
            ),
            DispatchRule::new(P::contains("book"), "book_hotel", "Hotel booked", "booking")
                .arg(ArgSpec::required("hotel_id").from_keys(&["hotel_id", "hotelId"]))
                .arg(ArgSpec::with_default("room_type", json!("standard")))
                .arg(ArgSpec::with_default("check_in", json!("2026-02-01")))
                .arg(ArgSpec::with_default("check_out", json!("2026-02-03")))
                .arg(ArgSpec::with_default("guest_name", json!("Guest"))),
            DispatchRule::new(P::contains("cancel"), "cancel_reservation", "Reservation cancelled", "result")
                .arg(
                    ArgSpec::required("reservation_id")
                        .from_keys(&["reservation_id", "reservationId"]),
                ),
            DispatchRule::new(
                P::any_of(&["detail", "info"]),
                "get_hotel_details",
                "Hotel details",
                "hotel",
            )
            .arg(ArgSpec::required("hotel_id").from_keys(&["hotel_id", "hotelId"])),
            DispatchRule::new(
                P::any_of(&["search", "find", "hotel"]),
                "search_hotels",
                "Hotels in {city_code}",
                "hotels",
            )
            .arg(
                ArgSpec::with_default("city_code", json!("MIA"))
                    .from_keys(&["city_code"])
                    .lookup(CITY_CODES),
            )
            .arg(
                ArgSpec::with_default("check_in_date", json!(DEFAULT_DEPARTURE))
                    .from_keys(&["check_in_date", "check_in"]),
            )
            .arg(
                ArgSpec::with_default("check_out_date", json!(DEFAULT_RETURN))
                    .from_keys(&["check_out_date", "check_out"]),
            )
            .arg(ArgSpec::with_default("guests", json!(1))),
        ],
        Domain::CarRental => vec![
            DispatchRule::new(
                P::all_of(vec![P::contains("location"), P::any_of(&["list", "available"])]),
                "list_locations",
                "Available rental locations",
                "locations",
            ),
            DispatchRule::new(
                P::contains("categor"),
                "get_vehicle_categories",
                "Vehicle categories",
                "categories",
            ),
            DispatchRule::new(P::contains("cancel"), "cancel_rental", "Rental cancelled", "result")
                .arg(ArgSpec::required("rental_id").from_keys(&["rental_id", "rentalId"])),
            DispatchRule::new(
                P::any_of(&["modify", "change", "extend"]),
                "modify_rental",
                "Rental modified",
                "result",
            )
            .arg(
                ArgSpec::required("rental_id")
                    .from_keys(&["rental_id", "rentalId"])
                    .missing_error("missing_parameters"),
            )
            .arg(ArgSpec::required("new_return_date").missing_error("missing_parameters")),
            DispatchRule::new(P::any_of(&["book", "reserve"]), "book_vehicle", "Vehicle booked", "booking")
                .arg(ArgSpec::required("vehicle_id").from_keys(&["vehicle_id", "vehicleId"]))
                .arg(ArgSpec::with_default("pickup_date", json!(DEFAULT_DEPARTURE)))
                .arg(ArgSpec::with_default("return_date", json!(DEFAULT_RETURN)))
                .arg(ArgSpec::with_default("driver_name", json!("Guest"))),
            vehicle_search(P::any_of(&["search", "find"])),
            vehicle_search(P::all_of(vec![P::contains("car"), P::contains("rent")])),
            DispatchRule::new(
                P::any_of(&["detail", "info"]),
                "get_vehicle_details",
                "Vehicle details",
                "vehicle",
            )
            .arg(ArgSpec::required("vehicle_id").from_keys(&["vehicle_id", "vehicleId"])),
        ],
    }
}

fn vehicle_search(when: TaskPredicate) -> DispatchRule {
    DispatchRule::new(when, "search_vehicles", "Available vehicles", "vehicles")
        .arg(
            ArgSpec::with_default("pickup_location_code", json!("LAX"))
                .from_keys(&["pickup_location_code", "location_code"]),
        )
        .arg(ArgSpec::with_default("pickup_date", json!(DEFAULT_DEPARTURE)))
        .arg(
            ArgSpec::with_default("dropoff_date", json!(DEFAULT_RETURN))
                .from_keys(&["dropoff_date", "return_date"]),
        )
        .arg(ArgSpec::optional("category"))
}

/// Reference-data tool used when no rule matches
pub fn builtin_fallback(domain: Domain) -> &'static str {
    match domain {
        Domain::Airline => "list_airports",
        Domain::Hotel => "list_cities",
        Domain::CarRental => "list_locations",
    }
}

/// Data key for the fallback tool's payload
pub fn fallback_data_key(tool: &str) -> &str {
    tool.strip_prefix("list_").unwrap_or("result")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_list_airports_takes_no_arguments() {
        let rules = builtin_rules(Domain::Airline);
        match resolve(&rules, "List available airports", &Map::new()) {
            Some(Resolution::Call { rule, arguments }) => {
                assert_eq!(rule.tool, "list_airports");
                assert!(arguments.is_empty());
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_search_flights_applies_defaults_and_message() {
        let rules = builtin_rules(Domain::Airline);
        let context = ctx(json!({"destination": "SFO", "date": "2026-03-01"}));
        let Some(Resolution::Call { rule, arguments }) =
            resolve(&rules, "Search flights to San Francisco", &context)
        else {
            panic!("expected a call");
        };
        assert_eq!(rule.tool, "search_flights");
        assert_eq!(arguments["origin"], "JFK");
        assert_eq!(arguments["destination"], "SFO");
        assert_eq!(arguments["departure_date"], "2026-03-01");
        assert_eq!(arguments["cabin_class"], "economy");
        assert_eq!(rule.render_message(&arguments), "Found flights from JFK to SFO");
    }

    #[test]
    fn test_cancel_rental_without_id_is_missing() {
        let rules = builtin_rules(Domain::CarRental);
        match resolve(&rules, "Cancel my rental", &Map::new()) {
            Some(Resolution::Missing { rule, code, missing }) => {
                assert_eq!(rule.tool, "cancel_rental");
                assert_eq!(code, "missing_rental_id");
                assert_eq!(missing, vec!["rental_id"]);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_rental_id_accepts_camel_case_key() {
        let rules = builtin_rules(Domain::CarRental);
        let context = ctx(json!({"rentalId": "r-1"}));
        let Some(Resolution::Call { arguments, .. }) = resolve(&rules, "Cancel my rental", &context) else {
            panic!("expected a call");
        };
        assert_eq!(arguments["rental_id"], "r-1");
    }

    #[test]
    fn test_modify_rental_shares_missing_code() {
        let rules = builtin_rules(Domain::CarRental);
        let context = ctx(json!({"rental_id": "r-1"}));
        let Some(Resolution::Missing { code, missing, .. }) =
            resolve(&rules, "Extend my rental please", &context)
        else {
            panic!("expected missing");
        };
        assert_eq!(code, "missing_parameters");
        assert_eq!(missing, vec!["new_return_date"]);
    }

    #[test]
    fn test_hotel_city_lookup_from_text() {
        let rules = builtin_rules(Domain::Hotel);
        let Some(Resolution::Call { rule, arguments }) =
            resolve(&rules, "Find a hotel in Chicago", &Map::new())
        else {
            panic!("expected a call");
        };
        assert_eq!(rule.tool, "search_hotels");
        assert_eq!(arguments["city_code"], "CHI");
        assert_eq!(rule.render_message(&arguments), "Hotels in CHI");
    }

    #[test]
    fn test_book_hotel_wins_over_search() {
        let rules = builtin_rules(Domain::Hotel);
        let context = ctx(json!({"hotel_id": "h-9"}));
        let Some(Resolution::Call { rule, .. }) = resolve(&rules, "Book this hotel", &context) else {
            panic!("expected a call");
        };
        assert_eq!(rule.tool, "book_hotel");
    }

    #[test]
    fn test_get_booking_requires_code_in_context() {
        let rules = builtin_rules(Domain::Airline);
        assert!(resolve(&rules, "What about my reservation", &Map::new()).is_none());
        let context = ctx(json!({"confirmation_code": "ABC123"}));
        let Some(Resolution::Call { rule, .. }) = resolve(&rules, "What about my reservation", &context) else {
            panic!("expected a call");
        };
        assert_eq!(rule.tool, "get_booking");
    }

    #[test]
    fn test_empty_string_context_counts_as_missing() {
        let rules = builtin_rules(Domain::Hotel);
        let context = ctx(json!({"reservation_id": "  "}));
        assert!(matches!(
            resolve(&rules, "cancel reservation", &context),
            Some(Resolution::Missing { .. })
        ));
    }

    #[test]
    fn test_rules_deserialize_from_tagged_config() {
        let yaml = r#"
when:
  kind: all_of
  all:
    - { kind: contains, term: cruise }
    - { kind: any_of, terms: [list, show] }
tool: list_cruises
message: Cruises
data_key: cruises
args:
  - { name: port, default: MIA }
"#;
        let rule: DispatchRule = serde_yaml::from_str(yaml).unwrap();
        assert!(rule.when.matches("show cruise options", &Map::new()));
        assert_eq!(rule.args[0].default, Some(json!("MIA")));
    }

    #[test]
    fn test_fallback_tools() {
        assert_eq!(builtin_fallback(Domain::CarRental), "list_locations");
        assert_eq!(fallback_data_key("list_cities"), "cities");
    }
}
