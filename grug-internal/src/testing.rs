#![cfg(test)]

use std::sync::Arc;

use secrecy::SecretString;

use crate::auth::AuthenticationInfo;
use crate::config_parser::Config;
use crate::gateway_util::AppStateData;
use crate::inference::provider::ProviderInfo;
use crate::ledger::QuotaEnforcement;

/// App state with every external collaborator absent: no provider, no ledger
/// backend, no session store.
pub fn get_unit_test_app_state_data() -> AppStateData {
    AppStateData {
        config: Arc::new(Config::default()),
        http_client: reqwest::Client::new(),
        authentication_info: AuthenticationInfo::Disabled,
        provider: ProviderInfo::Unconfigured,
        quota: QuotaEnforcement::Disabled,
        ip_hash_salt: Arc::new(SecretString::from("unit-test-salt")),
    }
}
