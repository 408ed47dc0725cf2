//! `crmsync-sources`: HTTP adapters for the two contact stores.
//!
//! Blocking reqwest, no async runtime. [`SupabaseClient`] implements
//! `SourceStore`, [`HubSpotClient`] implements `CrmStore`; both also accept
//! verification-status writes for [`sync`].

pub mod client;
pub mod hubspot;
pub mod pager;
pub mod supabase;
pub mod sync;
pub mod unavailable;

pub use client::{FetchClient, FetchResponse, RetryPolicy};
pub use hubspot::HubSpotClient;
pub use pager::{Collected, Fetched, PageCursor, Pager};
pub use supabase::SupabaseClient;
pub use sync::{push_status, StatusWriter, SyncRequest, SyncTargets};
pub use unavailable::Unavailable;
