//! Derive macros for the intcode crate.
//!
//! Provides `#[derive(Error)]`, which generates `Display` and
//! `std::error::Error` for VM and network error enums.

mod error;

use proc_macro::TokenStream;

/// Automatically implements `Display` and `Error` traits for error types.
///
/// A field named `source` is returned from `Error::source`.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
