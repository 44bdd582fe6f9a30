//! Integration tests for the HTTP surface
//!
//! Handlers run against the in-memory repositories and a scripted gateway.

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use kora_api::{configure_routes, AppState, BUSINESS_ID_HEADER};
    use kora_core::models::{AccountType, TransactionType};
    use kora_provider::{DeliveryStatus, OutcomeCategory, ProviderBalance, ProviderOutcome};
    use kora_services::memory::{
        InMemoryLedger, InMemoryMessages, InMemorySenders, InMemoryTemplates, ScriptedGateway,
    };
    use kora_services::{LedgerService, SendOrchestrator, SenderValidator};
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use uuid::Uuid;

    struct Fixture {
        business: Uuid,
        ledger: Arc<InMemoryLedger>,
        messages: Arc<InMemoryMessages>,
        senders: Arc<InMemorySenders>,
        gateway: Arc<ScriptedGateway>,
        state: AppState,
    }

    fn fixture(gateway: ScriptedGateway) -> Fixture {
        let business = Uuid::new_v4();
        let ledger = Arc::new(InMemoryLedger::new("NGN"));
        let messages = Arc::new(InMemoryMessages::new());
        let senders = Arc::new(InMemorySenders::linked(messages.clone()));
        let templates = Arc::new(InMemoryTemplates::new());
        let gateway = Arc::new(gateway);
        senders.approve(business, "AEGIS");

        let ledger_service = Arc::new(LedgerService::new(ledger.clone()));
        let sender_service = Arc::new(SenderValidator::new(senders.clone()));
        let orchestrator = Arc::new(SendOrchestrator::new(
            ledger_service.clone(),
            sender_service.clone(),
            messages.clone(),
            templates,
            gateway.clone(),
            "234",
        ));

        Fixture {
            business,
            ledger,
            messages,
            senders,
            gateway,
            state: AppState::new(ledger_service, sender_service, orchestrator),
        }
    }

    fn send_body() -> Value {
        json!({
            "recipient": "08012345678",
            "body": "Your code is 4821",
            "senderId": "AEGIS",
        })
    }

    #[actix_web::test]
    async fn test_health_check() {
        let f = fixture(ScriptedGateway::accepting());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(f.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "kora-sms");
    }

    #[actix_web::test]
    async fn test_send_success_returns_message() {
        let f = fixture(ScriptedGateway::accepting());
        f.ledger.set_balance(f.business, AccountType::Sms, dec!(2));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(f.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/messages")
            .insert_header((BUSINESS_ID_HEADER, f.business.to_string()))
            .set_json(send_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["status"], "sent");
        assert_eq!(body["data"]["recipient"], "2348012345678");
        assert_eq!(body["data"]["external_id"], "ext-1");

        assert_eq!(f.ledger.balance(f.business, AccountType::Sms), dec!(1));
        assert_eq!(f.messages.count(), 1);
        assert_eq!(f.gateway.calls().len(), 1);
    }

    #[actix_web::test]
    async fn test_send_without_credits_is_rejected() {
        let f = fixture(ScriptedGateway::accepting());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(f.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/messages")
            .insert_header((BUSINESS_ID_HEADER, f.business.to_string()))
            .set_json(send_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "insufficient_credits");
        assert_eq!(body["details"]["reason"], "insufficient_credits");
        assert_eq!(body["details"]["additional_needed"], "1");

        assert_eq!(f.messages.count(), 0);
        assert!(f.gateway.calls().is_empty());
    }

    #[actix_web::test]
    async fn test_provider_rejection_maps_to_bad_request() {
        let f = fixture(ScriptedGateway::new(ProviderOutcome::failure(
            OutcomeCategory::InvalidParameters,
            "Invalid URL",
            Some("1702".to_string()),
        )));
        f.ledger.set_balance(f.business, AccountType::Sms, dec!(1));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(f.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/messages")
            .insert_header((BUSINESS_ID_HEADER, f.business.to_string()))
            .set_json(send_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "invalid_parameters");
        assert_eq!(body["provider_code"], "1702");
        assert_eq!(body["charged"], false);
        assert_eq!(body["data"]["status"], "failed_invalid_parameters");
        assert_eq!(f.ledger.balance(f.business, AccountType::Sms), dec!(1));
    }

    #[actix_web::test]
    async fn test_provider_outage_maps_to_bad_gateway() {
        let f = fixture(ScriptedGateway::new(ProviderOutcome::failure(
            OutcomeCategory::Timeout,
            "Provider did not answer in time",
            None,
        )));
        f.ledger.set_balance(f.business, AccountType::Sms, dec!(1));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(f.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/messages")
            .insert_header((BUSINESS_ID_HEADER, f.business.to_string()))
            .set_json(send_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "timeout");
        assert_eq!(body["charged"], true);
        assert_eq!(f.ledger.balance(f.business, AccountType::Sms), dec!(0));
    }

    #[actix_web::test]
    async fn test_missing_business_header() {
        let f = fixture(ScriptedGateway::accepting());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(f.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/messages")
            .set_json(send_body())
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(f.messages.count(), 0);
    }

    #[actix_web::test]
    async fn test_message_lookup_is_scoped_to_business() {
        let f = fixture(ScriptedGateway::accepting().with_delivery(DeliveryStatus::Delivered));
        f.ledger.set_balance(f.business, AccountType::Sms, dec!(1));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(f.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/messages")
            .insert_header((BUSINESS_ID_HEADER, f.business.to_string()))
            .set_json(send_body())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/messages/{}", id))
            .insert_header((BUSINESS_ID_HEADER, f.business.to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/messages/{}/delivery", id))
            .insert_header((BUSINESS_ID_HEADER, f.business.to_string()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["delivery_status"], "delivered");

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/messages/{}", id))
            .insert_header((BUSINESS_ID_HEADER, Uuid::new_v4().to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_topup_then_transfer() {
        let f = fixture(ScriptedGateway::accepting());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(f.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/accounts/general/topup")
            .insert_header((BUSINESS_ID_HEADER, f.business.to_string()))
            .set_json(json!({ "amount": "10" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(f.ledger.balance(f.business, AccountType::General), dec!(10));

        let req = test::TestRequest::post()
            .uri("/api/v1/accounts/transfer")
            .insert_header((BUSINESS_ID_HEADER, f.business.to_string()))
            .set_json(json!({ "from": "general", "to": "sms", "amount": "4" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        assert_eq!(f.ledger.balance(f.business, AccountType::General), dec!(6));
        assert_eq!(f.ledger.balance(f.business, AccountType::Sms), dec!(4));

        let kinds: Vec<TransactionType> = f
            .ledger
            .transactions(f.business)
            .into_iter()
            .map(|tx| tx.transaction_type)
            .collect();
        assert!(kinds.contains(&TransactionType::Purchase));
        assert!(kinds.contains(&TransactionType::TransferOut));
        assert!(kinds.contains(&TransactionType::TransferIn));
    }

    #[actix_web::test]
    async fn test_transfer_to_same_account_is_rejected() {
        let f = fixture(ScriptedGateway::accepting());
        f.ledger.set_balance(f.business, AccountType::General, dec!(5));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(f.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/accounts/transfer")
            .insert_header((BUSINESS_ID_HEADER, f.business.to_string()))
            .set_json(json!({ "from": "general", "to": "wallet", "amount": "1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(f.ledger.balance(f.business, AccountType::General), dec!(5));
    }

    #[actix_web::test]
    async fn test_oversized_topup_is_rejected() {
        let f = fixture(ScriptedGateway::accepting());
        f.ledger.set_balance(f.business, AccountType::General, dec!(1));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(f.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/accounts/general/topup")
            .insert_header((BUSINESS_ID_HEADER, f.business.to_string()))
            .set_json(json!({ "amount": "79228162514264337593543950335" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(f.ledger.balance(f.business, AccountType::General), dec!(1));
        assert!(f.ledger.transactions(f.business).is_empty());
    }

    #[actix_web::test]
    async fn test_unknown_account_type_is_rejected() {
        let f = fixture(ScriptedGateway::accepting());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(f.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/accounts/savings/balance")
            .insert_header((BUSINESS_ID_HEADER, f.business.to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_register_and_delete_sender() {
        let f = fixture(ScriptedGateway::accepting());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(f.state.clone()))
                .configure(configure_routes),
        )
        .await;
        let before = f.senders.count();

        let req = test::TestRequest::post()
            .uri("/api/v1/senders")
            .insert_header((BUSINESS_ID_HEADER, f.business.to_string()))
            .set_json(json!({ "displayName": "Kora" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["status"], "pending");
        assert_eq!(f.senders.count(), before + 1);
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/senders/{}", id))
            .insert_header((BUSINESS_ID_HEADER, f.business.to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(f.senders.count(), before);
    }

    #[actix_web::test]
    async fn test_provider_balance() {
        let f = fixture(ScriptedGateway::accepting().with_balance(ProviderBalance::Available {
            amount: dec!(120.5),
            currency: Some("NGN".to_string()),
        }));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(f.state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/provider/balance")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"]["state"], "available");
        assert_eq!(body["data"]["currency"], "NGN");
    }
}
