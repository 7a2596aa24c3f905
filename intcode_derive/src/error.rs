//! Derive macro for error types.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations.
//!
//! # Usage
//!
//! ```ignore
//! use intcode_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum RunError {
//!     #[error("unknown opcode {0}")]
//!     UnknownOpcode(i64),
//!
//!     #[error("address {address} outside memory of {len} words")]
//!     OutOfBounds { address: i64, len: usize },
//!
//!     #[error("amplifier {amplifier} faulted: {source}")]
//!     Fault { amplifier: usize, source: VmFault },
//!
//!     #[error("no input available")]
//!     Starved,
//! }
//! ```
//!
//! Every field must be referenced by the message, since all fields are
//! passed to `write!` as named arguments. Positional `{0}` placeholders are
//! rewritten to named ones. Named fields called `source` become the
//! `Error::source` of that variant.

use proc_macro::TokenStream;
use quote::{ToTokens, quote};
use syn::{Data, DeriveInput, Fields, Lit, Meta, parse_macro_input};

/// Derives `Display` and `Error` for an enum or struct.
pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_error_derive(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_error_derive(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let (display_body, source_body) = match &input.data {
        Data::Enum(data_enum) => {
            let mut display_arms = Vec::with_capacity(data_enum.variants.len());
            let mut source_arms = Vec::new();

            for variant in &data_enum.variants {
                let variant_name = &variant.ident;
                let error_msg = extract_error_message_from_attrs(
                    &variant.attrs,
                    &variant.ident,
                    &format!("variant `{}`", variant.ident),
                )?;

                display_arms.push(match &variant.fields {
                    Fields::Unit => quote! {
                        Self::#variant_name => write!(f, #error_msg),
                    },
                    Fields::Unnamed(fields) => {
                        let field_names: Vec<_> = (0..fields.unnamed.len())
                            .map(|i| quote::format_ident!("f{}", i))
                            .collect();
                        let format_str =
                            convert_positional_to_named(&error_msg, fields.unnamed.len());
                        quote! {
                            Self::#variant_name(#(#field_names),*) => write!(f, #format_str, #(#field_names = #field_names),*),
                        }
                    }
                    Fields::Named(fields) => {
                        let field_names: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();
                        quote! {
                            Self::#variant_name { #(#field_names),* } => write!(f, #error_msg, #(#field_names = #field_names),*),
                        }
                    }
                });

                if has_source_field(&variant.fields) {
                    source_arms.push(quote! {
                        Self::#variant_name { source, .. } => Some(source as &(dyn ::std::error::Error + 'static)),
                    });
                }
            }

            let display = quote! {
                match self {
                    #(#display_arms)*
                }
            };
            let source = if source_arms.is_empty() {
                quote! { None }
            } else {
                quote! {
                    match self {
                        #(#source_arms)*
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            };
            (display, source)
        }
        Data::Struct(data_struct) => {
            let error_msg = extract_error_message_from_attrs(
                &input.attrs,
                &input.ident,
                &format!("type `{}`", input.ident),
            )?;

            let display = match &data_struct.fields {
                Fields::Unit => quote! {
                    write!(f, #error_msg)
                },
                Fields::Named(fields) => {
                    let field_names: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();
                    quote! {
                        write!(f, #error_msg, #(#field_names = self.#field_names),*)
                    }
                }
                Fields::Unnamed(fields) => {
                    let field_idents: Vec<_> = (0..fields.unnamed.len())
                        .map(|i| quote::format_ident!("f{}", i))
                        .collect();
                    let field_indices: Vec<_> =
                        (0..fields.unnamed.len()).map(syn::Index::from).collect();
                    let format_str = convert_positional_to_named(&error_msg, fields.unnamed.len());
                    quote! {
                        write!(f, #format_str, #(#field_idents = self.#field_indices),*)
                    }
                }
            };
            let source = if has_source_field(&data_struct.fields) {
                quote! { Some(&self.source as &(dyn ::std::error::Error + 'static)) }
            } else {
                quote! { None }
            };
            (display, source)
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
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #display_body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {
            fn source(&self) -> ::std::option::Option<&(dyn ::std::error::Error + 'static)> {
                #source_body
            }
        }
    })
}

/// Returns true if the fields contain a named field called `source`.
fn has_source_field(fields: &Fields) -> bool {
    match fields {
        Fields::Named(named) => named
            .named
            .iter()
            .any(|f| f.ident.as_ref().is_some_and(|ident| ident == "source")),
        _ => false,
    }
}

/// Extracts the message from an `#[error("...")]` attribute.
fn extract_error_message_from_attrs<T: ToTokens>(
    attrs: &[syn::Attribute],
    target: &T,
    target_desc: &str,
) -> syn::Result<String> {
    for attr in attrs {
        if !attr.path().is_ident("error") {
            continue;
        }

        let Meta::List(meta_list) = &attr.meta else {
            return Err(syn::Error::new_spanned(
                &attr.meta,
                "invalid #[error] attribute; use #[error(\"message\")] to describe the error",
            ));
        };

        let lit = syn::parse2::<Lit>(meta_list.tokens.clone()).map_err(|_| {
            syn::Error::new_spanned(
                &attr.meta,
                "failed to parse #[error] attribute; expected a string literal like #[error(\"unknown opcode {0}\")]",
            )
        })?;

        return match lit {
            Lit::Str(lit_str) => Ok(lit_str.value()),
            _ => Err(syn::Error::new_spanned(
                &attr.meta,
                "invalid #[error] attribute: message must be a string literal",
            )),
        };
    }

    Err(syn::Error::new_spanned(
        target,
        format!(
            "missing #[error(\"...\")] attribute on {}; every error variant must declare a display message",
            target_desc
        ),
    ))
}

/// Converts positional format args `{0}`, `{1:?}` to named args `{f0}`, `{f1:?}`.
fn convert_positional_to_named(format_str: &str, field_count: usize) -> String {
    let mut result = format_str.to_string();
    for i in (0..field_count).rev() {
        result = result
            .replace(&format!("{{{}}}", i), &format!("{{f{}}}", i))
            .replace(&format!("{{{}:", i), &format!("{{f{}:", i));
    }
    result
}
