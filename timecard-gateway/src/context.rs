//! Shared gateway state.

use std::time::Duration;

use timecard_core::Result;

use crate::config::Config;
use crate::executor::ApiClient;
use crate::leaves::LeavesClient;
use crate::rate::WriteRateGuard;
use crate::timelogs::TimelogEngine;
use crate::token::TokenExchanger;

/// Everything a tool call needs: configuration, the HTTP client, the token
/// cache, and the write rate guard. Built once and shared across callers.
pub struct Context {
    pub config: Config,
    pub api: ApiClient,
    pub tokens: TokenExchanger,
    pub rate: WriteRateGuard,
}

impl Context {
    pub fn new(config: Config) -> Result<Self> {
        let api = ApiClient::new(
            &config.base_url,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        let tokens = TokenExchanger::new(
            &config.allowed_domain,
            config.token_cache_size,
            Duration::from_secs(config.token_cache_ttl_secs),
        )?;
        let rate = WriteRateGuard::new(Duration::from_secs(config.rate_window_secs));
        Ok(Self {
            config,
            api,
            tokens,
            rate,
        })
    }

    /// Resolve an identity assertion to `(session_token, email)`.
    pub async fn authenticate(&self, assertion: &str) -> Result<(String, String)> {
        self.tokens.resolve(&self.api, assertion).await
    }

    pub fn timelogs(&self) -> TimelogEngine<'_> {
        TimelogEngine::new(&self.api)
    }

    pub fn leaves(&self) -> LeavesClient<'_> {
        LeavesClient::new(&self.api)
    }
}
