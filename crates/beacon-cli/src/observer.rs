//! Printing observed events.

use beacon_core::{ObserveChannel, ObserveUpdate};
use serde_json::json;

use crate::config::OutputFormat;
use crate::metrics;

/// Register a handler for every observe event that prints it to stdout.
pub fn register(channel: &ObserveChannel, format: OutputFormat) {
    channel.on_update(move |update| {
        metrics::record_event(update.event().name());
        println!("{}", render(&update, format));
    });
}

/// Render one update as a single output line.
#[must_use]
pub fn render(update: &ObserveUpdate, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => render_text(update),
        OutputFormat::Json => render_json(update).to_string(),
    }
}

fn render_text(update: &ObserveUpdate) -> String {
    let event = update.event();
    match update {
        ObserveUpdate::StreamCreated(stream)
        | ObserveUpdate::StreamUpdated(stream)
        | ObserveUpdate::StreamDeleted(stream) => format!(
            "{:<18} {} ({}) messages={} consumers={}",
            event, stream.name, stream.id, stream.stats.message_count, stream.stats.consumer_count
        ),
        ObserveUpdate::ConsumerCreated(consumer)
        | ObserveUpdate::ConsumerUpdated(consumer)
        | ObserveUpdate::ConsumerDeleted(consumer) => format!(
            "{:<18} {} ({}) stream={} filter={}",
            event, consumer.name, consumer.id, consumer.stream_id, consumer.filter_key_pattern
        ),
        ObserveUpdate::MessagesUpserted(messages) => {
            let keys: Vec<&str> = messages.iter().map(|m| m.key.as_str()).collect();
            format!(
                "{:<18} {} message(s) [{}]",
                event,
                messages.len(),
                keys.join(", ")
            )
        }
    }
}

fn render_json(update: &ObserveUpdate) -> serde_json::Value {
    let data = match update {
        ObserveUpdate::StreamCreated(stream)
        | ObserveUpdate::StreamUpdated(stream)
        | ObserveUpdate::StreamDeleted(stream) => json!(stream),
        ObserveUpdate::ConsumerCreated(consumer)
        | ObserveUpdate::ConsumerUpdated(consumer)
        | ObserveUpdate::ConsumerDeleted(consumer) => json!(consumer),
        ObserveUpdate::MessagesUpserted(messages) => json!({ "messages": messages }),
    };
    json!({ "event": update.event().name(), "data": data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::{Consumer, Message, Stream};

    #[test]
    fn test_render_stream_text() {
        let update = ObserveUpdate::StreamCreated(Stream {
            id: "s1".into(),
            name: "orders".into(),
            ..Default::default()
        });
        let line = render(&update, OutputFormat::Text);
        assert!(line.starts_with("stream:created"));
        assert!(line.contains("orders (s1)"));
    }

    #[test]
    fn test_render_consumer_text() {
        let update = ObserveUpdate::ConsumerDeleted(Consumer {
            id: "c1".into(),
            name: "billing".into(),
            stream_id: "s1".into(),
            filter_key_pattern: "orders.>".into(),
            ..Default::default()
        });
        let line = render(&update, OutputFormat::Text);
        assert!(line.contains("billing (c1) stream=s1 filter=orders.>"));
    }

    #[test]
    fn test_render_messages_json() {
        let update = ObserveUpdate::MessagesUpserted(vec![
            Message {
                id: "m1".into(),
                key: "orders.1".into(),
                ..Default::default()
            },
            Message {
                id: "m2".into(),
                key: "orders.2".into(),
                ..Default::default()
            },
        ]);

        let value: serde_json::Value =
            serde_json::from_str(&render(&update, OutputFormat::Json)).unwrap();
        assert_eq!(value["event"], "messages:upserted");
        assert_eq!(value["data"]["messages"][1]["id"], "m2");
    }

    #[test]
    fn test_render_empty_batch_text() {
        let line = render(&ObserveUpdate::MessagesUpserted(Vec::new()), OutputFormat::Text);
        assert!(line.contains("0 message(s) []"));
    }
}
