//! Generated clients talking to a mock HTTP server.

use std::sync::Arc;
use std::time::Duration;

use clientkit::{
    ClientError, ClientFactory, ClientRegistry, ClientRegistryBuilder, ClientsRegistrar,
    ErrorDecoder, InventoryTypes, LogLevel, MapEnvironment, TransportConfig, TrustPolicy,
};
use httpmock::prelude::*;
use serde_json::json;

const ROOT: &str = module_path!();

pub mod clients {
    use clientkit::ClientError;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Payment {
        pub id: u64,
        pub amount: i64,
        pub currency: String,
    }

    #[derive(Debug, Serialize)]
    pub struct NewPayment {
        pub amount: i64,
        pub currency: String,
    }

    #[derive(Debug, Serialize)]
    pub struct OrderForm {
        pub item: String,
        pub qty: u32,
    }

    #[clientkit::http_contract(url = "${payments.url}")]
    #[clientkit::async_trait]
    pub trait PaymentClient: Send + Sync {
        #[get("/payments/{id}")]
        async fn get_payment(
            &self,
            id: u64,
            #[query] expand: Option<bool>,
        ) -> Result<Payment, ClientError>;

        #[post("/payments")]
        async fn create_payment(
            &self,
            #[header("Idempotency-Key")] key: &str,
            body: &NewPayment,
        ) -> Result<Payment, ClientError>;

        #[get("/payments")]
        async fn search(
            &self,
            #[query("status")] statuses: Vec<String>,
        ) -> Result<Vec<Payment>, ClientError>;

        #[delete("/payments/{id}")]
        async fn cancel(&self, id: u64) -> Result<(), ClientError>;
    }

    #[clientkit::http_contract(
        url = "${orders.url}/v1",
        encoder = clientkit::FormEncoder,
        log_level = "FULL"
    )]
    #[clientkit::async_trait]
    pub trait OrderServiceClient: Send + Sync {
        #[post("/orders")]
        async fn place(&self, body: OrderForm) -> Result<serde_json::Value, ClientError>;
    }
}

use clients::{NewPayment, OrderForm, OrderServiceClient, Payment, PaymentClient};

fn environment(payments_url: impl Into<String>, server: &MockServer) -> Arc<MapEnvironment> {
    Arc::new(
        MapEnvironment::new()
            .with("payments.url", payments_url)
            .with("orders.url", server.base_url()),
    )
}

fn registry_for(server: &MockServer, transport: TransportConfig) -> ClientRegistry {
    let env = environment(server.base_url(), server);
    register(ClientsRegistrar::with_inventory(env).with_transport(transport))
}

fn register(registrar: ClientsRegistrar) -> ClientRegistry {
    let mut builder = ClientRegistryBuilder::new();
    let report = registrar
        .run(&[format!("{ROOT}::clients")], &mut builder)
        .unwrap();
    assert!(report.is_complete(), "{:?}", report.failures);
    builder.build()
}

fn payments(server: &MockServer) -> Arc<dyn PaymentClient> {
    registry_for(server, TransportConfig::default())
        .get::<dyn PaymentClient>("paymentClient")
        .unwrap()
}

#[tokio::test]
async fn get_with_path_variable_and_query() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET)
            .path("/payments/7")
            .query_param("expand", "true");
        then.status(200)
            .json_body(json!({"id": 7, "amount": 1250, "currency": "EUR"}));
    });

    let payment = payments(&server).get_payment(7, Some(true)).await.unwrap();

    m.assert_async().await;
    assert_eq!(
        payment,
        Payment {
            id: 7,
            amount: 1250,
            currency: "EUR".to_owned()
        }
    );
}

#[tokio::test]
async fn post_sends_json_body_and_header() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(POST)
            .path("/payments")
            .header("Idempotency-Key", "k-1")
            .header("content-type", "application/json")
            .json_body(json!({"amount": 500, "currency": "USD"}));
        then.status(201)
            .json_body(json!({"id": 9, "amount": 500, "currency": "USD"}));
    });

    let created = payments(&server)
        .create_payment(
            "k-1",
            &NewPayment {
                amount: 500,
                currency: "USD".to_owned(),
            },
        )
        .await
        .unwrap();

    m.assert_async().await;
    assert_eq!(created.id, 9);
}

#[tokio::test]
async fn sequence_query_parameters_repeat() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET)
            .path("/payments")
            .query_param("status", "open")
            .query_param("status", "held");
        then.status(200).json_body(json!([]));
    });

    let found = payments(&server)
        .search(vec!["open".to_owned(), "held".to_owned()])
        .await
        .unwrap();

    m.assert_async().await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn empty_body_decodes_to_unit() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(DELETE).path("/payments/3");
        then.status(204);
    });

    payments(&server).cancel(3).await.unwrap();
}

#[tokio::test]
async fn non_success_status_becomes_status_error() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/payments/404");
        then.status(404).body("payment not found");
    });

    let err = payments(&server).get_payment(404, None).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    match err {
        ClientError::Status {
            method_key, body, ..
        } => {
            assert_eq!(method_key, "PaymentClient#get_payment");
            assert!(body.contains("payment not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/payments/1");
        then.status(200).body("<html>oops</html>");
    });

    let err = payments(&server).get_payment(1, None).await.unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }), "{err:?}");
}

#[tokio::test]
async fn custom_encoder_sends_form_body() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/orders")
            .header("content-type", "application/x-www-form-urlencoded")
            .body("item=book&qty=2");
        then.status(200).json_body(json!({"accepted": true}));
    });

    let registry = registry_for(&server, TransportConfig::default());
    assert_eq!(
        registry.configuration("orderServiceClient").unwrap().log_level,
        LogLevel::Full
    );
    let orders = registry
        .get::<dyn OrderServiceClient>("orderServiceClient")
        .unwrap();

    let reply = orders
        .place(OrderForm {
            item: "book".to_owned(),
            qty: 2,
        })
        .await
        .unwrap();

    m.assert_async().await;
    assert_eq!(reply, json!({"accepted": true}));
}

#[tokio::test]
async fn request_timeout_is_enforced() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/payments/5");
        then.status(200)
            .delay(Duration::from_millis(1500))
            .json_body(json!({"id": 5, "amount": 1, "currency": "EUR"}));
    });

    let transport = TransportConfig {
        request_timeout: Duration::from_millis(200),
        ..TransportConfig::default()
    };
    let client = registry_for(&server, transport)
        .get::<dyn PaymentClient>("paymentClient")
        .unwrap();

    let err = client.get_payment(5, None).await.unwrap_err();
    assert!(
        matches!(err, ClientError::Timeout { timeout, .. }
            if timeout == Duration::from_millis(200)),
        "{err:?}"
    );
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let server = MockServer::start();
    let registrar = ClientsRegistrar::with_inventory(environment("http://127.0.0.1:1", &server));
    let mut builder = ClientRegistryBuilder::new();
    registrar
        .run(&[format!("{ROOT}::clients")], &mut builder)
        .unwrap();
    let client = builder
        .build()
        .get::<dyn PaymentClient>("paymentClient")
        .unwrap();

    let err = client.get_payment(1, None).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }), "{err:?}");
}

struct TaggedErrors;

impl ErrorDecoder for TaggedErrors {
    fn decode(&self, method_key: &str, status: u16, _body: &[u8]) -> ClientError {
        ClientError::Status {
            method_key: format!("tagged:{method_key}"),
            status,
            body: String::new(),
        }
    }
}

#[tokio::test]
async fn transport_override_keeps_custom_error_decoder() {
    let server = MockServer::start();
    let _failing = server.mock(|when, then| {
        when.method(GET).path("/payments/5");
        then.status(503).body("down");
    });
    let _slow = server.mock(|when, then| {
        when.method(GET).path("/payments/6");
        then.status(200)
            .delay(Duration::from_millis(1500))
            .json_body(json!({"id": 6, "amount": 1, "currency": "EUR"}));
    });

    let factory = ClientFactory::new(Arc::new(InventoryTypes::new()), TransportConfig::default())
        .with_error_decoder(Arc::new(TaggedErrors));
    let transport = TransportConfig {
        request_timeout: Duration::from_millis(200),
        ..TransportConfig::default()
    };
    let registrar = ClientsRegistrar::with_inventory(environment(server.base_url(), &server))
        .with_factory(factory)
        .with_transport(transport);
    let client = register(registrar)
        .get::<dyn PaymentClient>("paymentClient")
        .unwrap();

    let err = client.get_payment(5, None).await.unwrap_err();
    assert!(
        matches!(&err, ClientError::Status { method_key, status: 503, .. }
            if method_key == "tagged:PaymentClient#get_payment"),
        "{err:?}"
    );

    let err = client.get_payment(6, None).await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout { .. }), "{err:?}");
}

/// The mock server answers TLS on its only port with a certificate from its own CA.
fn https_url(server: &MockServer) -> String {
    let url = server.base_url();
    assert!(url.starts_with("https://"), "{url}");
    url
}

#[tokio::test]
async fn trust_all_accepts_self_signed_endpoint() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/payments/8");
        then.status(200)
            .json_body(json!({"id": 8, "amount": 20, "currency": "CHF"}));
    });

    let registrar = ClientsRegistrar::with_inventory(environment(https_url(&server), &server));
    let client = register(registrar)
        .get::<dyn PaymentClient>("paymentClient")
        .unwrap();

    let payment = client.get_payment(8, None).await.unwrap();

    m.assert_async().await;
    assert_eq!(payment.currency, "CHF");
}

#[tokio::test]
async fn web_pki_rejects_self_signed_endpoint() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/payments/8");
        then.status(200)
            .json_body(json!({"id": 8, "amount": 20, "currency": "CHF"}));
    });

    let transport = TransportConfig {
        trust: TrustPolicy::WebPki,
        ..TransportConfig::default()
    };
    let registrar = ClientsRegistrar::with_inventory(environment(https_url(&server), &server))
        .with_transport(transport);
    let client = register(registrar)
        .get::<dyn PaymentClient>("paymentClient")
        .unwrap();

    let err = client.get_payment(8, None).await.unwrap_err();

    assert!(matches!(err, ClientError::Transport { .. }), "{err:?}");
    m.assert_hits_async(0).await;
}
