use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::{json, Map};
use std::sync::Arc;
use waypoint::adapters::in_memory_context::InMemoryContextProvider;
use waypoint::adapters::mcp_envelope::decode_body;
use waypoint::agents::dispatch::{builtin_rules, resolve};
use waypoint::agents::domain::Domain;
use waypoint::agents::registry::AgentRegistry;
use waypoint::agents::router::{ChatRequest, KeywordClassifier, Router};

const MESSAGES: &[&str] = &[
    "Search flights from Boston to Denver next Friday",
    "Find a hotel and a rental car in Miami",
    "Cancel my rental",
    "Show me my itinerary",
    "I'm planning a trip to San Francisco",
];

fn benchmark_keyword_classification(c: &mut Criterion) {
    let classifier = KeywordClassifier::new();

    let mut group = c.benchmark_group("classification");
    group.throughput(Throughput::Elements(MESSAGES.len() as u64));
    group.bench_function("keyword", |b| {
        b.iter(|| {
            for message in MESSAGES {
                black_box(classifier.classify_text(black_box(message), false));
            }
        });
    });
    group.finish();
}

fn benchmark_rule_resolution(c: &mut Criterion) {
    let rules = builtin_rules(Domain::Hotel);
    let context = json!({"hotel_id": "H-100"}).as_object().cloned().unwrap_or_default();
    let empty = Map::new();

    c.bench_function("resolve_search_hotels", |b| {
        b.iter(|| resolve(&rules, black_box("Find hotels in Chicago"), &empty))
    });
    c.bench_function("resolve_book_hotel", |b| {
        b.iter(|| resolve(&rules, black_box("Book this hotel"), &context))
    });
}

fn benchmark_envelope_decoding(c: &mut Criterion) {
    let plain = json!({
        "jsonrpc": "2.0",
        "id": "bench-1",
        "result": {"content": [{"type": "text", "text": "[{\"code\":\"JFK\"}]"}], "isError": false}
    })
    .to_string();
    let stream = format!("event: message\ndata: {}\n\n", plain);

    c.bench_function("decode_json_body", |b| {
        b.iter(|| decode_body(black_box(&plain), Some("application/json")))
    });
    c.bench_function("decode_event_stream", |b| {
        b.iter(|| decode_body(black_box(&stream), Some("text/event-stream")))
    });
}

fn benchmark_direct_answer(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let router = Router::new(AgentRegistry::new(), Arc::new(InMemoryContextProvider::new()));

    c.bench_function("route_help", |b| {
        b.to_async(&rt)
            .iter(|| router.route(black_box(ChatRequest::new("bench", "hello"))));
    });
}

criterion_group!(
    benches,
    benchmark_keyword_classification,
    benchmark_rule_resolution,
    benchmark_envelope_decoding,
    benchmark_direct_answer
);
criterion_main!(benches);
