//! Kora SMS provider gateway adapter
//!
//! Translates an internal send request into the upstream wire call and
//! normalizes whatever comes back into a [`ProviderOutcome`]. Nothing in this
//! crate returns an error to the caller: transport failures, bad payloads and
//! local precondition violations are all folded into an outcome category.
//!
//! - `validation`: local wire preconditions checked before any network call
//! - `transport`: HTTP seam, reqwest in production and a fake in tests
//! - `codes`: static upstream code table
//! - `parser`: pipe-delimited and JSON response parsing
//! - `client`: the [`SmsGateway`] trait and its HTTP implementation

pub mod client;
pub mod codes;
pub mod outcome;
pub mod parser;
pub mod transport;
pub mod validation;

pub use client::{ProviderClient, SmsGateway};
pub use outcome::{DeliveryStatus, OutcomeCategory, ParsedOutcome, ProviderBalance, ProviderOutcome};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};
