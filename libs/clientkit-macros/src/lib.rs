use proc_macro::TokenStream;
use syn::parse_macro_input;

mod contract;
mod utils;

/// Declare an HTTP client contract on a trait.
///
/// # Example
///
/// ```ignore
/// #[clientkit::http_contract(url = "${payments.url}", encoder = clientkit::FormEncoder)]
/// #[clientkit::async_trait]
/// pub trait PaymentClient: Send + Sync {
///     #[get("/payments/{id}")]
///     async fn get_payment(&self, id: u64, #[query] expand: Option<bool>) -> Result<Payment, ClientError>;
///
///     #[post("/payments")]
///     async fn create_payment(
///         &self,
///         #[header("Idempotency-Key")] key: String,
///         body: NewPayment,
///     ) -> Result<Payment, ClientError>;
/// }
/// ```
///
/// This generates:
/// - The trait definition, with the HTTP method and parameter attributes removed
/// - `PaymentClientHttp`, implementing the trait over a `clientkit::ClientCore`
/// - An `inventory` registration carrying the declared attributes, picked up by
///   `clientkit::InventorySource` and `clientkit::InventoryTypes`
///
/// # Parameters
///
/// - `url`: target base URL; `${key}` / `${key:default}` placeholders are resolved at startup
/// - `encoder`: request body encoder type implementing `clientkit::NewEncoder`
///   (default: JSON)
/// - `log_level`: `NONE`, `BASIC`, `HEADERS` or `FULL`; overrides `clients.log-level`
///
/// # Method rules
///
/// - `async fn(&self, ..) -> Result<T, E>` with `T: DeserializeOwned` and `E: From<ClientError>`
/// - exactly one of `#[get]`, `#[post]`, `#[put]`, `#[patch]`, `#[delete]`, `#[head]`
/// - parameters named like a `{var}` in the path fill it; `#[query]` / `#[query("name")]`
///   and `#[header("Name")]` parameters go to the query string and headers; at most one
///   remaining parameter (or one marked `#[body]`) is the request body
#[proc_macro_attribute]
pub fn http_contract(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = parse_macro_input!(attr as contract::ContractConfig);
    let trait_def = parse_macro_input!(item as syn::ItemTrait);

    match contract::expand_http_contract(config, trait_def) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(e) => TokenStream::from(e.to_compile_error()),
    }
}
