use syn::{Path, Type};

/// Up to two entries of `candidates` that look like `input`, best first.
pub fn suggest_similar(input: &str, candidates: &[&'static str]) -> Vec<&'static str> {
    let mut suggestions: Vec<(&'static str, f64)> = candidates
        .iter()
        .map(|&c| (c, strsim::jaro_winkler(input, c)))
        .filter(|(_, score)| *score > 0.75)
        .collect();

    suggestions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    suggestions.into_iter().take(2).map(|(c, _)| c).collect()
}

/// `help: did you mean ...?` suffix, or nothing when no candidate is close.
pub fn did_you_mean(input: &str, candidates: &[&'static str]) -> String {
    let similar = suggest_similar(input, candidates);
    if similar.is_empty() {
        String::new()
    } else {
        format!(
            "\n       = help: did you mean {}?",
            similar
                .iter()
                .map(|s| format!("`{s}`"))
                .collect::<Vec<_>>()
                .join(" or ")
        )
    }
}

/// Parse a `key = "string"` argument
pub fn parse_string_attribute(
    attr_name: &str,
    meta: &syn::Meta,
) -> syn::Result<Option<syn::LitStr>> {
    match meta {
        syn::Meta::NameValue(nv) if nv.path.is_ident(attr_name) => {
            if let syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(lit_str),
                ..
            }) = &nv.value
            {
                Ok(Some(lit_str.clone()))
            } else {
                Err(syn::Error::new_spanned(
                    &nv.value,
                    format!("{attr_name} must be a string literal"),
                ))
            }
        }
        _ => Ok(None),
    }
}

/// Parse a `key = some::Type` argument; a string literal holding the path is accepted too.
pub fn parse_path_attribute(attr_name: &str, meta: &syn::Meta) -> syn::Result<Option<Path>> {
    match meta {
        syn::Meta::NameValue(nv) if nv.path.is_ident(attr_name) => match &nv.value {
            syn::Expr::Path(p) if p.qself.is_none() => Ok(Some(p.path.clone())),
            syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(lit_str),
                ..
            }) => lit_str.parse().map(Some),
            other => Err(syn::Error::new_spanned(
                other,
                format!("{attr_name} must be a type path"),
            )),
        },
        _ => Ok(None),
    }
}

/// Extract T and E from Result<T, E>
pub fn extract_result_types(ty: &Type) -> syn::Result<(Type, Type)> {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Result" {
                if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                    let generic_args: Vec<_> = args.args.iter().collect();

                    if let [syn::GenericArgument::Type(ok_type), syn::GenericArgument::Type(err_type)] =
                        generic_args.as_slice()
                    {
                        return Ok((ok_type.clone(), err_type.clone()));
                    }
                }
            }
        }
    }
    Err(syn::Error::new_spanned(
        ty,
        "return type must be Result<T, E> with both type parameters spelled out",
    ))
}

/// `{name}` variables of a path template, in order of appearance.
pub fn path_variables(path: &str) -> Result<Vec<String>, String> {
    let mut vars = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| format!("unterminated '{{' in path \"{path}\""))?;
        let name = &after[..end];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("invalid path variable '{{{name}}}' in \"{path}\""));
        }
        vars.push(name.to_owned());
        rest = &after[end + 1..];
    }
    if rest.contains('}') {
        return Err(format!("unmatched '}}' in path \"{path}\""));
    }
    Ok(vars)
}
