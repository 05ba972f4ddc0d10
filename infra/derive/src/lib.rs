#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the workspace crates.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! modhub-derive = { path = "../infra/derive" }
//! thiserror = "2"
//! ```

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for defining domain-specific error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
///   Other derives (for example `Clone`) are kept as written.
/// * **Context Support**: Generates a companion `...Ext` trait that adds `.context()`
///   to any `Result` carrying this error type.
/// * **Source Conversions**: Variants consisting of exactly a `source` and a `context` field
///   get `From<Source>` and `...Ext` for `Result<T, Source>`, so `?` works on upstream errors.
///   Variants with additional fields are left for explicit construction.
/// * **Internal Fallback**: `From<&'static str>` and `From<String>` when an
///   `Internal { message, context }` variant is present.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with named-field variants only.
/// 2. A `context` field, when present, must be `Option<Cow<'static, str>>`.
/// 3. Variants with a source (`source` field, `#[source]` or `#[from]`) must have a `context`.
///
/// A `format_context` helper is generated next to the enum for use in `#[error(...)]` strings,
/// so declare at most one such enum per module.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[modhub_derive::modhub_error]
/// pub enum StoreError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read(path: &str) -> Result<String, StoreError> {
///     std::fs::read_to_string(path).context("Reading snapshot")
/// }
/// ```
#[proc_macro_attribute]
pub fn modhub_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}
