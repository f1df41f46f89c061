//! HTTP client generation from contract trait definitions.
//!
//! Applied to a trait, this validates every method, generates `<Trait>Http` whose
//! methods build and send one request each, and submits the contract (attributes +
//! binding) to `inventory` for discovery by the registrar.

use heck::ToSnakeCase;
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{
    parse::Parse, parse::ParseStream, punctuated::Punctuated, Attribute, FnArg, Ident, ItemTrait,
    LitStr, Pat, Path, ReturnType, Token, TraitItem, TraitItemFn, Type, TypeParamBound,
};

use crate::utils::{
    did_you_mean, extract_result_types, parse_path_attribute, parse_string_attribute,
    path_variables,
};

const CONTRACT_KEYS: &[&str] = &["url", "encoder", "log_level"];
const HTTP_VERBS: &[&str] = &["get", "post", "put", "patch", "delete", "head"];
const LOG_LEVELS: &[&str] = &["NONE", "BASIC", "HEADERS", "FULL"];
const PARAM_ATTRS: &[&str] = &["query", "header", "body"];
/// Built-in attributes passed through untouched, never suggested against.
const PASSTHROUGH_ATTRS: &[&str] = &[
    "doc", "allow", "warn", "deny", "expect", "cfg", "cfg_attr", "deprecated", "must_use",
];

/// Arguments of `#[http_contract(...)]`
#[derive(Default)]
pub struct ContractConfig {
    pub url: Option<LitStr>,
    pub encoder: Option<Path>,
    pub log_level: Option<LitStr>,
}

impl Parse for ContractConfig {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut config = ContractConfig::default();
        if input.is_empty() {
            return Ok(config);
        }

        let punctuated: Punctuated<syn::Meta, Token![,]> =
            input.parse_terminated(syn::Meta::parse, Token![,])?;

        for meta in punctuated {
            let key = meta
                .path()
                .get_ident()
                .map(ToString::to_string)
                .unwrap_or_default();
            match key.as_str() {
                "url" => {
                    if config.url.is_some() {
                        return Err(syn::Error::new_spanned(meta, "duplicate `url` parameter"));
                    }
                    config.url = parse_string_attribute("url", &meta)?;
                }
                "encoder" => {
                    if config.encoder.is_some() {
                        return Err(syn::Error::new_spanned(meta, "duplicate `encoder` parameter"));
                    }
                    config.encoder = parse_path_attribute("encoder", &meta)?;
                }
                "log_level" => {
                    if config.log_level.is_some() {
                        return Err(syn::Error::new_spanned(
                            meta,
                            "duplicate `log_level` parameter",
                        ));
                    }
                    let level = parse_string_attribute("log_level", &meta)?;
                    if let Some(lit) = &level {
                        validate_log_level(lit)?;
                    }
                    config.log_level = level;
                }
                other => {
                    return Err(syn::Error::new_spanned(
                        &meta,
                        format!(
                            "unknown parameter '{other}'; expected one of `url`, `encoder`, `log_level`{}",
                            did_you_mean(other, CONTRACT_KEYS)
                        ),
                    ));
                }
            }
            if matches!(meta, syn::Meta::Path(_) | syn::Meta::List(_)) {
                return Err(syn::Error::new_spanned(meta, format!("expected `{key} = ...`")));
            }
        }

        Ok(config)
    }
}

/// Placeholders are resolved at startup; literal levels are checked here.
fn validate_log_level(lit: &LitStr) -> syn::Result<()> {
    let value = lit.value();
    if value.contains("${") {
        return Ok(());
    }
    let upper = value.trim().to_ascii_uppercase();
    if LOG_LEVELS.contains(&upper.as_str()) {
        return Ok(());
    }
    Err(syn::Error::new_spanned(
        lit,
        format!(
            "unknown log level '{value}'; expected NONE, BASIC, HEADERS or FULL{}",
            did_you_mean(&upper, LOG_LEVELS)
        ),
    ))
}

enum ParamKind {
    Path(String),
    Query(String),
    Header(String),
    Body,
}

struct Param {
    ident: Ident,
    kind: ParamKind,
}

struct MethodSpec {
    sig: syn::Signature,
    verb: Ident,
    path: LitStr,
    params: Vec<Param>,
    ok_type: Type,
}

fn verb_of(attr: &Attribute) -> Option<String> {
    attr.path()
        .get_ident()
        .map(ToString::to_string)
        .filter(|name| HTTP_VERBS.contains(&name.as_str()))
}

/// Find the HTTP verb attribute, strip it and return (verb, path literal).
fn take_verb(method: &mut TraitItemFn) -> syn::Result<(Ident, LitStr)> {
    let mut found: Option<(Ident, LitStr)> = None;
    let mut kept = Vec::with_capacity(method.attrs.len());

    for attr in method.attrs.drain(..) {
        if let Some(verb) = verb_of(&attr) {
            if found.is_some() {
                return Err(syn::Error::new_spanned(
                    attr,
                    "only one HTTP method attribute is allowed per method",
                ));
            }
            let path: LitStr = attr.parse_args().map_err(|_| {
                syn::Error::new_spanned(&attr, format!("expected #[{verb}(\"/path\")]"))
            })?;
            found = Some((Ident::new(&verb.to_uppercase(), Span::call_site()), path));
            continue;
        }

        if let Some(name) = attr
            .path()
            .get_ident()
            .map(ToString::to_string)
            .filter(|n| !PASSTHROUGH_ATTRS.contains(&n.as_str()))
        {
            let hint = did_you_mean(&name, HTTP_VERBS);
            if !hint.is_empty() {
                return Err(syn::Error::new_spanned(
                    &attr,
                    format!("unknown HTTP method attribute '{name}'{hint}"),
                ));
            }
        }
        kept.push(attr);
    }
    method.attrs = kept;

    found.ok_or_else(|| {
        syn::Error::new_spanned(
            &method.sig,
            "contract methods need an HTTP method attribute: #[get], #[post], #[put], #[patch], #[delete] or #[head]",
        )
    })
}

/// Classify one parameter and strip its marker attributes.
fn take_param(arg: &mut syn::PatType, path_vars: &[String]) -> syn::Result<Param> {
    let Pat::Ident(pat) = &*arg.pat else {
        return Err(syn::Error::new_spanned(
            &arg.pat,
            "contract parameters must be plain identifiers",
        ));
    };
    let ident = pat.ident.clone();
    let name = ident.to_string();

    let mut kind: Option<ParamKind> = None;
    let mut kept = Vec::with_capacity(arg.attrs.len());
    for attr in arg.attrs.drain(..) {
        let Some(attr_name) = attr
            .path()
            .get_ident()
            .map(ToString::to_string)
            .filter(|n| !PASSTHROUGH_ATTRS.contains(&n.as_str()))
        else {
            kept.push(attr);
            continue;
        };
        let parsed = match attr_name.as_str() {
            "query" => match &attr.meta {
                syn::Meta::Path(_) => ParamKind::Query(name.clone()),
                _ => ParamKind::Query(attr.parse_args::<LitStr>()?.value()),
            },
            "header" => {
                let name = attr.parse_args::<LitStr>().map_err(|_| {
                    syn::Error::new_spanned(&attr, "expected #[header(\"Header-Name\")]")
                })?;
                ParamKind::Header(name.value())
            }
            "body" => ParamKind::Body,
            other => {
                let hint = did_you_mean(other, PARAM_ATTRS);
                if hint.is_empty() {
                    kept.push(attr);
                    continue;
                }
                return Err(syn::Error::new_spanned(
                    &attr,
                    format!("unknown parameter attribute '{other}'{hint}"),
                ));
            }
        };
        if kind.is_some() {
            return Err(syn::Error::new_spanned(
                attr,
                "a parameter can carry only one of #[query], #[header] or #[body]",
            ));
        }
        kind = Some(parsed);
    }
    arg.attrs = kept;

    let kind = match kind {
        Some(k) => k,
        None if path_vars.contains(&name) => ParamKind::Path(name),
        None => ParamKind::Body,
    };
    Ok(Param { ident, kind })
}

fn require_send_sync(trait_def: &ItemTrait) -> syn::Result<()> {
    let has = |wanted: &str| {
        trait_def.supertraits.iter().any(|b| match b {
            TypeParamBound::Trait(t) => t.path.segments.last().is_some_and(|s| s.ident == wanted),
            _ => false,
        })
    };
    if has("Send") && has("Sync") {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            &trait_def.ident,
            "contract traits must be declared `: Send + Sync`",
        ))
    }
}

/// Validate and strip the trait's methods in place.
fn extract_methods(trait_def: &mut ItemTrait) -> syn::Result<Vec<MethodSpec>> {
    let mut methods = Vec::new();

    for item in &mut trait_def.items {
        let TraitItem::Fn(method) = item else {
            return Err(syn::Error::new_spanned(
                item,
                "contract traits may only contain methods",
            ));
        };

        if method.sig.asyncness.is_none() {
            return Err(syn::Error::new_spanned(&method.sig, "contract methods must be async"));
        }
        if method.default.is_some() {
            return Err(syn::Error::new_spanned(
                &method.sig.ident,
                "contract methods must not have a default body",
            ));
        }
        if !method.sig.generics.params.is_empty() {
            return Err(syn::Error::new_spanned(
                &method.sig.generics,
                "contract methods cannot be generic",
            ));
        }

        let (verb, path) = take_verb(method)?;
        let path_vars =
            path_variables(&path.value()).map_err(|e| syn::Error::new_spanned(&path, e))?;

        let mut inputs = method.sig.inputs.iter_mut();
        match inputs.next() {
            Some(FnArg::Receiver(r)) if r.reference.is_some() && r.mutability.is_none() => {}
            _ => {
                return Err(syn::Error::new_spanned(
                    &method.sig.ident,
                    "contract methods must begin with &self",
                ))
            }
        }

        let mut params = Vec::new();
        for arg in inputs {
            let FnArg::Typed(pat_type) = arg else {
                return Err(syn::Error::new_spanned(arg, "expected a typed parameter"));
            };
            params.push(take_param(pat_type, &path_vars)?);
        }

        let bodies: Vec<_> = params
            .iter()
            .filter(|p| matches!(p.kind, ParamKind::Body))
            .collect();
        if let [_, extra, ..] = bodies.as_slice() {
            return Err(syn::Error::new_spanned(
                &extra.ident,
                "at most one request body parameter is allowed; mark the others with #[query] or #[header]",
            ));
        }
        for var in &path_vars {
            let bound = params
                .iter()
                .any(|p| matches!(&p.kind, ParamKind::Path(n) if n == var));
            if !bound {
                return Err(syn::Error::new_spanned(
                    &path,
                    format!("path variable '{{{var}}}' has no parameter of the same name"),
                ));
            }
        }

        let ok_type = match &method.sig.output {
            ReturnType::Type(_, ty) => extract_result_types(ty)?.0,
            ReturnType::Default => {
                return Err(syn::Error::new_spanned(
                    &method.sig,
                    "contract methods must return Result<T, E>",
                ))
            }
        };

        methods.push(MethodSpec {
            sig: method.sig.clone(),
            verb,
            path,
            params,
            ok_type,
        });
    }

    Ok(methods)
}

fn generate_method(trait_name: &Ident, method: &MethodSpec) -> TokenStream {
    let sig = &method.sig;
    let verb = &method.verb;
    let path = &method.path;
    let ok_type = &method.ok_type;
    let method_key = LitStr::new(
        &format!("{}#{}", trait_name, method.sig.ident),
        Span::call_site(),
    );

    let fill = method.params.iter().map(|p| {
        let ident = &p.ident;
        match &p.kind {
            ParamKind::Path(name) => quote! { __request.path_param(#name, &#ident)?; },
            ParamKind::Query(name) => quote! { __request.query(#name, &#ident)?; },
            ParamKind::Header(name) => quote! { __request.header(#name, &#ident)?; },
            ParamKind::Body => quote! { self.core.encode_body(&mut __request, &#ident)?; },
        }
    });

    quote! {
        #sig {
            #[allow(unused_mut)]
            let mut __request = ::clientkit::RequestTemplate::new(
                ::clientkit::__private::Method::#verb,
                #path,
            );
            #(#fill)*
            let __response = self.core.execute(#method_key, __request).await?;
            ::core::result::Result::Ok(self.core.decode::<#ok_type>(#method_key, __response)?)
        }
    }
}

fn registration_attributes(config: &ContractConfig) -> Vec<TokenStream> {
    let mut attrs = Vec::new();
    if let Some(url) = &config.url {
        attrs.push(quote! { ("url", ::clientkit::declaration::StaticAttribute::Text(#url)) });
    }
    if let Some(encoder) = &config.encoder {
        let name = quote!(#encoder).to_string().replace(' ', "");
        attrs.push(quote! {
            ("encoder", ::clientkit::declaration::StaticAttribute::Encoder(
                ::clientkit::EncoderRef {
                    type_name: #name,
                    instantiate: ::clientkit::codec::instantiate_encoder::<#encoder>,
                }
            ))
        });
    }
    if let Some(level) = &config.log_level {
        attrs.push(quote! {
            ("log_level", ::clientkit::declaration::StaticAttribute::Text(#level))
        });
    }
    attrs
}

/// Main expansion function
pub fn expand_http_contract(
    config: ContractConfig,
    mut trait_def: ItemTrait,
) -> syn::Result<TokenStream> {
    if !trait_def.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &trait_def.generics,
            "contract traits cannot be generic",
        ));
    }
    require_send_sync(&trait_def)?;

    let methods = extract_methods(&mut trait_def)?;

    let trait_name = &trait_def.ident;
    let vis = &trait_def.vis;
    let client_name = format_ident!("{}Http", trait_name);
    let bind_fn = format_ident!("__clientkit_bind_{}", trait_name.to_string().to_snake_case());
    let method_impls = methods.iter().map(|m| generate_method(trait_name, m));
    let attributes = registration_attributes(&config);
    let client_doc = format!(
        "HTTP implementation of [`{trait_name}`] generated by `#[http_contract]`."
    );

    Ok(quote! {
        #trait_def

        #[doc = #client_doc]
        #[derive(Clone, Debug)]
        #vis struct #client_name {
            core: ::clientkit::ClientCore,
        }

        impl #client_name {
            pub fn new(core: ::clientkit::ClientCore) -> Self {
                Self { core }
            }

            pub fn core(&self) -> &::clientkit::ClientCore {
                &self.core
            }
        }

        #[::clientkit::async_trait]
        impl #trait_name for #client_name {
            #(#method_impls)*
        }

        #[doc(hidden)]
        #[allow(non_snake_case)]
        fn #bind_fn(
            core: ::clientkit::ClientCore,
        ) -> ::std::sync::Arc<dyn ::core::any::Any + ::core::marker::Send + ::core::marker::Sync> {
            let client: ::std::sync::Arc<dyn #trait_name> =
                ::std::sync::Arc::new(#client_name::new(core));
            ::std::sync::Arc::new(client)
        }

        ::clientkit::inventory::submit! {
            ::clientkit::ContractRegistration {
                type_name: ::core::concat!(::core::module_path!(), "::", ::core::stringify!(#trait_name)),
                module_path: ::core::module_path!(),
                attributes: &[#(#attributes),*],
                bind: #bind_fn,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
        let config: ContractConfig = syn::parse2(attr)?;
        let trait_def: ItemTrait = syn::parse2(item)?;
        expand_http_contract(config, trait_def)
    }

    fn error_of(attr: TokenStream, item: TokenStream) -> String {
        match expand(attr, item) {
            Ok(_) => panic!("expected expansion to fail"),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn expands_client_and_registration() {
        let out = expand(
            quote!(url = "${pay.url}", encoder = clientkit::FormEncoder),
            quote! {
                pub trait PaymentClient: Send + Sync {
                    #[get("/payments/{id}")]
                    async fn get_payment(&self, id: u64, #[query] expand: Option<bool>) -> Result<Payment, ClientError>;

                    #[post("/payments")]
                    async fn create(&self, #[header("Idempotency-Key")] key: String, body: NewPayment) -> Result<Payment, ClientError>;
                }
            },
        )
        .unwrap()
        .to_string();

        assert!(out.contains("pub struct PaymentClientHttp"));
        assert!(out.contains("fn __clientkit_bind_payment_client"));
        assert!(out.contains("\"PaymentClient#get_payment\""));
        assert!(out.contains("path_param (\"id\""));
        assert!(out.contains("query (\"expand\""));
        assert!(out.contains("header (\"Idempotency-Key\""));
        assert!(out.contains("encode_body"));
        assert!(out.contains("\"clientkit::FormEncoder\""));
        // method markers are stripped from the re-emitted trait
        assert!(!out.contains("# [get"));
        assert!(!out.contains("# [query]"));
    }

    #[test]
    fn rejects_unknown_contract_key_with_hint() {
        let msg = error_of(quote!(urll = "x"), quote!(trait A: Send + Sync {}));
        assert!(msg.contains("did you mean `url`"), "{msg}");
    }

    #[test]
    fn rejects_bad_literal_log_level() {
        let msg = error_of(quote!(log_level = "FUL"), quote!(trait A: Send + Sync {}));
        assert!(msg.contains("FULL"), "{msg}");
        assert!(expand(quote!(log_level = "${x.level}"), quote!(trait A: Send + Sync {})).is_ok());
    }

    #[test]
    fn rejects_missing_verb_and_typos() {
        let msg = error_of(
            quote!(),
            quote! {
                trait A: Send + Sync {
                    async fn f(&self) -> Result<(), E>;
                }
            },
        );
        assert!(msg.contains("HTTP method attribute"), "{msg}");

        let msg = error_of(
            quote!(),
            quote! {
                trait A: Send + Sync {
                    #[gett("/x")]
                    async fn f(&self) -> Result<(), E>;
                }
            },
        );
        assert!(msg.contains("did you mean `get`"), "{msg}");
    }

    #[test]
    fn rejects_two_bodies_and_unbound_path_vars() {
        let msg = error_of(
            quote!(),
            quote! {
                trait A: Send + Sync {
                    #[post("/x")]
                    async fn f(&self, a: A, b: B) -> Result<(), E>;
                }
            },
        );
        assert!(msg.contains("at most one request body"), "{msg}");

        let msg = error_of(
            quote!(),
            quote! {
                trait A: Send + Sync {
                    #[get("/x/{id}")]
                    async fn f(&self, key: u64) -> Result<(), E>;
                }
            },
        );
        assert!(msg.contains("'{id}'"), "{msg}");
    }

    #[test]
    fn rejects_non_async_and_missing_send_sync() {
        let msg = error_of(
            quote!(),
            quote! {
                trait A: Send + Sync {
                    #[get("/x")]
                    fn f(&self) -> Result<(), E>;
                }
            },
        );
        assert!(msg.contains("must be async"), "{msg}");

        let msg = error_of(quote!(), quote!(trait A {}));
        assert!(msg.contains("Send + Sync"), "{msg}");
    }
}
