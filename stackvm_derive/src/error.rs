//! Derive macro for error types.
//!
//! Every enum variant (or the struct itself) carries an `#[error("...")]` message.
//! Tuple fields are referenced as `{0}`, `{1}`; named fields by name.
//!
//! ```ignore
//! use stackvm_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum FaultError {
//!     #[error("stack underflow")]
//!     Underflow,
//!     #[error("invalid opcode 0x{0:02x}")]
//!     Opcode(u8),
//!     #[error("index {index} out of range for size {size}")]
//!     Index { index: usize, size: usize },
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use proc_macro2::Ident;
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, parse_macro_input, spanned::Spanned};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .map(|variant| {
                    let ident = &variant.ident;
                    let message = message(&variant.attrs, variant.span())?;
                    let (pattern, write) = bind_fields(&variant.fields, &message);
                    Ok(quote! { Self::#ident #pattern => #write, })
                })
                .collect::<syn::Result<Vec<_>>>()?;
            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(data) => {
            let message = message(&input.attrs, input.ident.span())?;
            let (pattern, write) = bind_fields(&data.fields, &message);
            quote! {
                let Self #pattern = self;
                #write
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error derive does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Builds the destructuring pattern for `fields` and the matching `write!` call.
///
/// Tuple fields are bound as `f0`, `f1`, ... and the positional placeholders in the
/// message are rewritten to those names.
fn bind_fields(fields: &Fields, message: &LitStr) -> (TokenStream2, TokenStream2) {
    match fields {
        Fields::Unit => (quote! {}, quote! { write!(f, #message) }),
        Fields::Named(named) => {
            let idents: Vec<_> = named
                .named
                .iter()
                .filter_map(|field| field.ident.clone())
                .collect();
            let used = referenced(&message.value(), &idents);
            (
                quote! { { #(#idents),* } },
                quote! { write!(f, #message, #(#used = #used),*) },
            )
        }
        Fields::Unnamed(unnamed) => {
            let idents: Vec<_> = (0..unnamed.unnamed.len())
                .map(|i| format_ident!("f{}", i))
                .collect();
            let mut text = message.value();
            for i in 0..idents.len() {
                text = text
                    .replace(&format!("{{{i}}}"), &format!("{{f{i}}}"))
                    .replace(&format!("{{{i}:"), &format!("{{f{i}:"));
            }
            let used = referenced(&text, &idents);
            let message = LitStr::new(&text, message.span());
            (
                quote! { ( #(#idents),* ) },
                quote! { write!(f, #message, #(#used = #used),*) },
            )
        }
    }
}

/// Keeps the identifiers that `text` interpolates; `format_args!` rejects unused named
/// arguments.
fn referenced(text: &str, idents: &[Ident]) -> Vec<Ident> {
    idents
        .iter()
        .filter(|ident| {
            text.contains(&format!("{{{ident}}}")) || text.contains(&format!("{{{ident}:"))
        })
        .cloned()
        .collect()
}

/// Finds the `#[error("...")]` message in `attrs`.
fn message(attrs: &[Attribute], span: proc_macro2::Span) -> syn::Result<LitStr> {
    let attr = attrs
        .iter()
        .find(|attr| attr.path().is_ident("error"))
        .ok_or_else(|| {
            syn::Error::new(
                span,
                "missing #[error(\"...\")] attribute; every error variant must declare a display message",
            )
        })?;
    attr.parse_args::<LitStr>().map_err(|_| {
        syn::Error::new_spanned(
            attr,
            "expected a string literal like #[error(\"invalid opcode: {0}\")]",
        )
    })
}
