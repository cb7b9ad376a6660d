//! Integration tests for the eSewa gateway client.
//!
//! These tests drive the client through the `PaymentGateway` port the way an
//! application would:
//! 1. Sign a payment and check the form a browser would submit
//! 2. Accept the gateway's callback and verify it
//! 3. Confirm the transaction with a status lookup

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use httpmock::prelude::*;
use secrecy::SecretString;
use serde_json::json;

use esewa_client::adapters::EsewaClient;
use esewa_client::config::{GatewayConfig, InitiationMode};
use esewa_client::domain::{
    canonical_message, GatewayError, PaymentRequest, Signer, TransactionStatus,
    CALLBACK_SIGNED_FIELDS, PAYMENT_SIGNED_FIELDS,
};
use esewa_client::ports::{CallOptions, PaymentGateway};

// =============================================================================
// Test Infrastructure
// =============================================================================

const SECRET: &str = "8gBm/:&EnhH.1/q";

fn gateway_for(server: &MockServer, mode: InitiationMode) -> Arc<dyn PaymentGateway> {
    let config = GatewayConfig::new(
        SECRET,
        "EPAYTEST",
        "https://merchant.example.com/esewa/success",
        "https://merchant.example.com/esewa/failure",
    )
    .with_initiation_mode(mode)
    .with_endpoints(
        server.url("/api/epay/main/v2/form"),
        server.url("/api/epay/transaction/status/"),
    );
    Arc::new(EsewaClient::new(config).unwrap())
}

/// Builds the `data` parameter eSewa appends to the success URL.
fn gateway_callback(status: &str, total_amount: serde_json::Value, uuid: &str) -> String {
    let gateway_signer = Signer::new(SecretString::new(SECRET.to_string()));
    let total_text = match &total_amount {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let signed_field_names = CALLBACK_SIGNED_FIELDS.join(",");
    let values = [
        "000AWEO",
        status,
        total_text.as_str(),
        uuid,
        "EPAYTEST",
        signed_field_names.as_str(),
    ];
    let signature =
        gateway_signer.sign(&canonical_message(CALLBACK_SIGNED_FIELDS.into_iter().zip(values)));

    let body = json!({
        "transaction_code": "000AWEO",
        "status": status,
        "total_amount": total_amount,
        "transaction_uuid": uuid,
        "product_code": "EPAYTEST",
        "signed_field_names": signed_field_names,
        "signature": signature,
    });
    BASE64_STANDARD.encode(body.to_string())
}

// =============================================================================
// Checkout Flow
// =============================================================================

#[tokio::test]
async fn full_checkout_flow_with_payload_mode() {
    let server = MockServer::start();
    let status_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/epay/transaction/status/")
            .query_param("product_code", "EPAYTEST")
            .query_param("total_amount", "110")
            .query_param("transaction_uuid", "250610-162413")
            .matches(|req| req.query_params.as_ref().map(|q| q.len()) == Some(3));
        then.status(200).json_body(json!({
            "product_code": "EPAYTEST",
            "transaction_uuid": "250610-162413",
            "total_amount": 110.0,
            "status": "COMPLETE",
            "ref_id": "0007G36"
        }));
    });
    let gateway = gateway_for(&server, InitiationMode::ReturnPayload);

    // 1. Sign the payment form
    let request = PaymentRequest::new("100", "110", "250610-162413").with_tax_amount("10");
    let initiation = gateway
        .initiate_payment(request, CallOptions::default())
        .await
        .unwrap();
    let payload = initiation.payload().unwrap();

    assert_eq!(payload.tax_amount, "10");
    assert_eq!(payload.product_service_charge, "0");
    assert_eq!(
        payload.signature,
        gateway.generate_signature("110", "250610-162413", "EPAYTEST")
    );
    let names: Vec<&str> = payload.form_fields().iter().map(|(name, _)| *name).collect();
    assert_eq!(names.last(), Some(&"signature"));
    assert!(names.contains(&"signed_field_names"));

    // 2. Payer returns with the gateway callback
    let data = gateway_callback("COMPLETE", json!(110.0), "250610-162413");
    let callback = gateway.verify_encoded_callback(&data).unwrap();
    assert!(callback.is_complete());
    assert_eq!(callback.total_amount, "110.0");

    // 3. Confirm server-side
    let status = gateway
        .transaction_status(&callback.transaction_uuid, "110", CallOptions::default())
        .await
        .unwrap();
    status_mock.assert();
    assert_eq!(status.state(), TransactionStatus::Complete);
    assert_eq!(status.ref_id.as_deref(), Some("0007G36"));
}

#[tokio::test]
async fn follow_redirect_mode_posts_signed_form() {
    let server = MockServer::start();
    let signature = {
        let signer = Signer::new(SecretString::new(SECRET.to_string()));
        let values = ["100", "TXN-001", "EPAYTEST"];
        signer.sign(&canonical_message(PAYMENT_SIGNED_FIELDS.into_iter().zip(values)))
    };
    let form_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/epay/main/v2/form")
            .header("content-type", "application/x-www-form-urlencoded")
            .x_www_form_urlencoded_tuple("amount", "100")
            .x_www_form_urlencoded_tuple("tax_amount", "0")
            .x_www_form_urlencoded_tuple("product_service_charge", "0")
            .x_www_form_urlencoded_tuple("product_delivery_charge", "0")
            .x_www_form_urlencoded_tuple(
                "signed_field_names",
                "total_amount,transaction_uuid,product_code",
            )
            .x_www_form_urlencoded_tuple("signature", &signature);
        then.status(303)
            .header("Location", "/api/epay/main/v2/login?session=xyz");
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/epay/main/v2/login");
        then.status(200).body("<html>eSewa login</html>");
    });
    let gateway = gateway_for(&server, InitiationMode::FollowRedirect);

    let initiation = gateway
        .initiate_payment(
            PaymentRequest::new("100", "100", "TXN-001"),
            CallOptions::default(),
        )
        .await
        .unwrap();

    form_mock.assert();
    assert_eq!(
        initiation.redirect_url(),
        Some(server.url("/api/epay/main/v2/login?session=xyz").as_str())
    );
}

// =============================================================================
// Callback Verification
// =============================================================================

#[tokio::test]
async fn tampered_callback_is_rejected() {
    let server = MockServer::start();
    let gateway = gateway_for(&server, InitiationMode::ReturnPayload);

    let genuine = gateway_callback("COMPLETE", json!("100.0"), "TXN-001");
    let mut callback = gateway.decode_callback(&genuine).unwrap();
    assert!(gateway.verify_signature(&callback.signature, &callback));

    callback.status = "PENDING".into();
    assert!(!gateway.verify_signature(&callback.signature, &callback));

    let forged = BASE64_STANDARD.encode(serde_json::to_string(&callback).unwrap());
    assert!(matches!(
        gateway.verify_encoded_callback(&forged),
        Err(GatewayError::SignatureMismatch)
    ));
}

#[tokio::test]
async fn malformed_callback_is_decode_error() {
    let server = MockServer::start();
    let gateway = gateway_for(&server, InitiationMode::ReturnPayload);

    let result = gateway.verify_encoded_callback("this is not base64");

    assert!(matches!(result, Err(GatewayError::Decode(_))));
}

// =============================================================================
// Status Lookup Failures
// =============================================================================

#[tokio::test]
async fn status_lookup_failures_are_classified() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/epay/transaction/status/")
            .query_param("transaction_uuid", "TXN-500");
        then.status(500).body("internal error");
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/epay/transaction/status/")
            .query_param("transaction_uuid", "TXN-SLOW");
        then.status(200)
            .json_body(json!({"status": "PENDING"}))
            .delay(Duration::from_millis(500));
    });
    let gateway = gateway_for(&server, InitiationMode::ReturnPayload);

    let server_error = gateway
        .transaction_status("TXN-500", "100", CallOptions::default())
        .await
        .unwrap_err();
    assert!(server_error.is_retryable());
    assert!(matches!(
        server_error,
        GatewayError::Network {
            status: Some(500),
            ..
        }
    ));

    let timeout = gateway
        .transaction_status(
            "TXN-SLOW",
            "100",
            CallOptions::with_timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
    assert!(matches!(timeout, GatewayError::Timeout));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn client_is_shared_across_tasks() {
    let server = MockServer::start();
    let status_mock = server.mock(|when, then| {
        when.method(GET).path("/api/epay/transaction/status/");
        then.status(200).json_body(json!({
            "product_code": "EPAYTEST",
            "transaction_uuid": "TXN",
            "total_amount": "100",
            "status": "PENDING"
        }));
    });
    let gateway = gateway_for(&server, InitiationMode::ReturnPayload);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let gateway = Arc::clone(&gateway);
            tokio::spawn(async move {
                gateway
                    .transaction_status(&format!("TXN-{}", i), "100", CallOptions::default())
                    .await
            })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.state(), TransactionStatus::Pending);
    }
    status_mock.assert_hits(8);
}
