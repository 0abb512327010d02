//! Integration tests for the WhatsApp client against a mocked provider

use application::{ApplicationError, WhatsAppGatewayPort};
use integration_whatsapp::{WhatsAppClient, parse_inbound};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod send_text_tests {
    use super::*;

    #[tokio::test]
    async fn sends_to_correct_endpoint_with_provider_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("D360-API-KEY", "sandbox-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "wamid.001"}]
            })))
            .mount(&server)
            .await;

        let client = WhatsAppClient::new(server.uri()).unwrap();
        let sent = client
            .send_text("sandbox-key", "15551234567", "hello")
            .await
            .unwrap();
        assert_eq!(sent.provider_msg_id.as_deref(), Some("wamid.001"));
    }

    #[tokio::test]
    async fn missing_messages_array_yields_no_provider_msg_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = WhatsAppClient::new(server.uri()).unwrap();
        let sent = client.send_text("k", "1555", "hi").await.unwrap();
        assert!(sent.provider_msg_id.is_none());
    }
}

mod send_template_tests {
    use super::*;

    #[tokio::test]
    async fn sends_template_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "wamid.tpl"}]
            })))
            .mount(&server)
            .await;

        let client = WhatsAppClient::new(server.uri()).unwrap();
        let sent = client
            .send_template(
                "k",
                "1555",
                "reminder_v1",
                serde_json::json!([{"type": "body", "parameters": []}]),
                "en_US",
            )
            .await
            .unwrap();
        assert_eq!(sent.provider_msg_id.as_deref(), Some("wamid.tpl"));
    }
}

mod error_mapping_tests {
    use super::*;

    #[tokio::test]
    async fn register_webhook_maps_401_to_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/configs/webhook"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = WhatsAppClient::new(server.uri()).unwrap();
        let err = client
            .register_webhook("bad-key", "https://example.com/hook")
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Auth(_)));
    }

    #[tokio::test]
    async fn register_webhook_maps_404_to_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/configs/webhook"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = WhatsAppClient::new(server.uri()).unwrap();
        let err = client
            .register_webhook("key", "https://example.com/hook")
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Endpoint(_)));
    }
}

mod webhook_parsing_tests {
    use super::*;

    #[test]
    fn nested_and_flat_shapes_extract_the_same_message() {
        let nested = serde_json::json!({
            "entry": [{"changes": [{"value": {"messages": [{
                "from": "491234567890", "id": "wamid.A", "type": "text",
                "text": {"body": "hi"}
            }]}}]}]
        });
        let flat = serde_json::json!({
            "messages": [{
                "from": "491234567890", "id": "wamid.A", "type": "text",
                "text": {"body": "hi"}
            }]
        });

        let from_nested = parse_inbound(&nested);
        let from_flat = parse_inbound(&flat);
        assert_eq!(from_nested.len(), 1);
        assert_eq!(from_flat.len(), 1);
        assert_eq!(from_nested[0].text, from_flat[0].text);
        assert_eq!(from_nested[0].provider_msg_id, from_flat[0].provider_msg_id);
    }
}
