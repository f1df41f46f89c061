//! Remote APIs this application talks to.

use clientkit::{http_contract, ClientError, FormEncoder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: u64,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPayment {
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderForm {
    pub item: String,
    pub quantity: u32,
}

#[http_contract(url = "${payments.url}")]
#[clientkit::async_trait]
pub trait PaymentClient: Send + Sync {
    #[get("/payments/{id}")]
    async fn get_payment(&self, id: u64) -> Result<Payment, ClientError>;

    #[post("/payments")]
    async fn create_payment(
        &self,
        #[header("Idempotency-Key")] idempotency_key: String,
        body: NewPayment,
    ) -> Result<Payment, ClientError>;

    #[get("/payments")]
    async fn list_payments(
        &self,
        #[query] status: Option<String>,
        #[query] limit: Option<u32>,
    ) -> Result<Vec<Payment>, ClientError>;
}

/// Legacy order service; accepts form posts only.
#[http_contract(
    url = "https://${orders.host}:${orders.port:443}/legacy",
    encoder = FormEncoder,
    log_level = "${orders.log-level:HEADERS}"
)]
#[clientkit::async_trait]
pub trait OrderServiceClient: Send + Sync {
    #[post("/orders")]
    async fn place_order(&self, form: OrderForm) -> Result<serde_json::Value, ClientError>;

    #[head("/orders/{order_id}")]
    async fn order_exists(&self, order_id: String) -> Result<(), ClientError>;
}
