//! OAuth authorization-code flow.
//!
//! The user opens [`OAuthHandler::authorization_url`] in a browser, logs in, and is redirected
//! with a `code`. [`OAuthHandler::get_access_token`] exchanges that code at `GenAcsTok`, proving
//! possession of the client secret with a SHA-256 checksum.

use crate::{
    common::{
        credential::OAuthCredential,
        parse::extract_emsg,
        urls::{NorenRoute, NorenUrl},
    },
    config::NorenConfig,
    http::{
        client::{build_http_client, post_jdata},
        error::NorenHttpError,
        models::OAuthTokenInfo,
        query::AccessTokenRequest,
    },
};

#[derive(Debug)]
pub struct OAuthHandler {
    credential: OAuthCredential,
    config: NorenConfig,
    client: reqwest::Client,
}

impl OAuthHandler {
    /// Creates a handler whose endpoints come from `credential`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(credential: OAuthCredential, http_timeout: u64) -> Result<Self, NorenHttpError> {
        let config = NorenConfig {
            http_timeout,
            ..NorenConfig::with_urls(credential.base_url.clone(), credential.ws_url.clone())
        };
        let client = build_http_client(&config)?;
        Ok(Self {
            credential,
            config,
            client,
        })
    }

    /// Configuration pointing at the REST and WebSocket endpoints of the credential.
    #[must_use]
    pub fn config(&self) -> &NorenConfig {
        &self.config
    }

    #[must_use]
    pub fn credential(&self) -> &OAuthCredential {
        &self.credential
    }

    /// # Errors
    ///
    /// Returns [`NorenHttpError::InvalidRequestError`] if the configured `oauth_url` is invalid.
    pub fn authorization_url(&self) -> Result<String, NorenHttpError> {
        self.credential
            .authorization_url()
            .map_err(|e| NorenHttpError::InvalidRequestError(e.to_string()))
    }

    /// Exchanges an authorization code for an access token.
    ///
    /// A response without `access_token` is returned as is. Callers decide whether to abort.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a `Not_Ok` response.
    pub async fn get_access_token(&self, code: &str) -> Result<OAuthTokenInfo, NorenHttpError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(NorenHttpError::InvalidRequestError(
                "authorization code is empty".to_string(),
            ));
        }

        let request = AccessTokenRequest {
            code: code.to_string(),
            checksum: self.credential.checksum(code),
        };
        let url = NorenUrl::new(self.config.base_url.clone())
            .route_url(NorenRoute::GenerateAccessToken);
        tracing::debug!(client_id = %self.credential.client_id, "Exchanging authorization code");

        let value = post_jdata(&self.client, url, &request, None).await?;
        if let Some(emsg) = extract_emsg(&value) {
            return Err(NorenHttpError::from_emsg(emsg));
        }

        let token: OAuthTokenInfo = serde_json::from_value(value)?;
        if token.access_token.is_some() {
            tracing::info!(uid = %token.uid, "Access token issued");
        } else {
            tracing::warn!("Token response has no access_token");
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn credential() -> OAuthCredential {
        OAuthCredential::from_properties_str(
            "client_id=CLIENT1\n\
             secret_code=s3cr3t\n\
             oauth_url=https://auth.example.com/oauth\n\
             base_url=https://api.example.com/NorenWClientAPI/\n\
             ws_url=wss://api.example.com/NorenWS/\n",
        )
        .unwrap()
    }

    #[rstest]
    fn test_config_uses_credential_endpoints() {
        let handler = OAuthHandler::new(credential(), 10).unwrap();
        assert_eq!(handler.config().base_url, "https://api.example.com/NorenWClientAPI/");
        assert_eq!(handler.config().ws_url, "wss://api.example.com/NorenWS/");
        assert_eq!(handler.config().http_timeout, 10);
        assert!(handler.config().validate().is_ok());
    }

    #[rstest]
    fn test_authorization_url() {
        let handler = OAuthHandler::new(credential(), 10).unwrap();
        let url = handler.authorization_url().unwrap();
        assert_eq!(url, "https://auth.example.com/oauth?client_id=CLIENT1");
    }

    #[rstest]
    #[tokio::test]
    async fn test_empty_code_is_rejected() {
        let handler = OAuthHandler::new(credential(), 10).unwrap();
        let result = handler.get_access_token("  \n").await;
        assert!(matches!(result, Err(NorenHttpError::InvalidRequestError(_))));
    }
}
