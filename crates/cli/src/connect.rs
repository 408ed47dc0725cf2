//! Build the store adapters from settings.

use std::time::Duration;

use crmsync_config::Settings;
use crmsync_recon::{CrmStore, SourceError, SourceStore};
use crmsync_sources::{HubSpotClient, RetryPolicy, SupabaseClient, Unavailable};

pub fn retry_policy(settings: &Settings) -> RetryPolicy {
    RetryPolicy {
        max_retries: settings.recon.max_retries,
        timeout: Duration::from_secs(settings.recon.timeout_secs.max(1)),
        ..RetryPolicy::default()
    }
}

pub fn supabase(settings: &Settings) -> Result<SupabaseClient, SourceError> {
    SupabaseClient::new(
        &settings.supabase.url,
        &settings.supabase.service_key,
        &settings.supabase.table,
        retry_policy(settings),
    )
}

pub fn hubspot(settings: &Settings) -> Result<HubSpotClient, SourceError> {
    HubSpotClient::with_base_url(
        &settings.hubspot.access_token,
        &settings.hubspot.api_base,
        retry_policy(settings),
    )
}

/// The source side for a recon run. An unconfigured side still yields a
/// store, one whose fetch fails with the construction error.
pub fn source_store(settings: &Settings) -> Box<dyn SourceStore> {
    match supabase(settings) {
        Ok(client) => Box::new(client),
        Err(e) => {
            log::warn!("source store unavailable: {}", e);
            Box::new(Unavailable(e))
        }
    }
}

pub fn crm_store(settings: &Settings) -> Box<dyn CrmStore> {
    match hubspot(settings) {
        Ok(client) => Box::new(client),
        Err(e) => {
            log::warn!("CRM unavailable: {}", e);
            Box::new(Unavailable(e))
        }
    }
}
