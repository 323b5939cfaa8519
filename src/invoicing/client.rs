//! Israeli Tax Authority (ITA) invoice-approval client.
//!
//! The API is OAuth2 client-credentials: a bearer token is fetched from
//! `token_url`, cached until shortly before it expires, and presented on each
//! approval request. A 401 drops the cached token so the next call refreshes.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::core::config::ItaConfig;

const TOKEN_EXPIRY_SKEW: Duration = Duration::from_secs(30);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ItaError {
    #[error("ITA credentials are not configured")]
    NotConfigured,
    #[error("ITA circuit breaker is open")]
    CircuitOpen,
    #[error("ITA authentication failed: {0}")]
    Auth(String),
    #[error("ITA request failed: {0}")]
    Transport(String),
    #[error("ITA returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Unreadable ITA response: {0}")]
    Decode(String),
}

/// What is sent to the approval endpoint for one invoice.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSubmission {
    pub invoice_number: String,
    pub issuer_vat_number: String,
    pub customer_name: String,
    pub customer_vat_number: Option<String>,
    pub issue_date: NaiveDate,
    pub amount_before_vat: BigDecimal,
    pub vat_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItaOutcome {
    /// Approved with an allocation number.
    Accepted { allocation_number: String },
    /// Received but not yet decided.
    Submitted,
    Rejected { reason: String },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApprovalResponse {
    status: String,
    #[serde(default)]
    confirmation_number: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[async_trait]
pub trait ItaClient: Send + Sync {
    async fn submit_invoice(&self, submission: &InvoiceSubmission) -> Result<ItaOutcome, ItaError>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
pub struct HttpItaClient {
    config: ItaConfig,
    http_client: reqwest::Client,
    access_token: Arc<RwLock<Option<CachedToken>>>,
}

impl HttpItaClient {
    pub fn new(config: ItaConfig) -> Result<Self, ItaError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ItaError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    fn approval_url(&self) -> String {
        format!("{}/Invoices/v1/Approval", self.config.base_url.trim_end_matches('/'))
    }

    async fn get_access_token(&self) -> Result<String, ItaError> {
        {
            let token = self.access_token.read().await;
            if let Some(t) = token.as_ref().filter(|t| t.expires_at > Instant::now()) {
                return Ok(t.value.clone());
            }
        }

        if !self.config.is_configured() {
            return Err(ItaError::NotConfigured);
        }

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", "scope"),
        ];
        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ItaError::Transport(format!("token request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ItaError::Auth(format!("HTTP {}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ItaError::Decode(format!("token response: {}", e)))?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_SKEW);
        debug!("Fetched ITA access token valid for {}s", lifetime.as_secs());

        {
            let mut cached = self.access_token.write().await;
            *cached = Some(CachedToken {
                value: token.access_token.clone(),
                expires_at,
            });
        }
        Ok(token.access_token)
    }

    async fn invalidate_token(&self) {
        *self.access_token.write().await = None;
    }
}

fn outcome_from(response: ApprovalResponse) -> ItaOutcome {
    match (response.status.as_str(), response.confirmation_number) {
        ("rejected", _) => ItaOutcome::Rejected {
            reason: response
                .message
                .unwrap_or_else(|| "rejected without reason".to_string()),
        },
        (_, Some(number)) if !number.is_empty() => ItaOutcome::Accepted {
            allocation_number: number,
        },
        _ => ItaOutcome::Submitted,
    }
}

#[async_trait]
impl ItaClient for HttpItaClient {
    async fn submit_invoice(&self, submission: &InvoiceSubmission) -> Result<ItaOutcome, ItaError> {
        let token = self.get_access_token().await?;
        let response = self
            .http_client
            .post(self.approval_url())
            .bearer_auth(&token)
            .json(submission)
            .send()
            .await
            .map_err(|e| ItaError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.invalidate_token().await;
            let body = response.text().await.unwrap_or_default();
            return Err(ItaError::Auth(body));
        }
        if status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "ITA rejected invoice {}: {}",
                submission.invoice_number, body
            );
            return Ok(ItaOutcome::Rejected { reason: body });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ItaError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let approval: ApprovalResponse = response
            .json()
            .await
            .map_err(|e| ItaError::Decode(e.to_string()))?;
        Ok(outcome_from(approval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn submission() -> InvoiceSubmission {
        InvoiceSubmission {
            invoice_number: "INV-1001".into(),
            issuer_vat_number: "516000000".into(),
            customer_name: "Paws Ltd".into(),
            customer_vat_number: Some("514000000".into()),
            issue_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            amount_before_vat: BigDecimal::from_str("25000.00").unwrap(),
            vat_amount: BigDecimal::from_str("4250.00").unwrap(),
            total_amount: BigDecimal::from_str("29250.00").unwrap(),
            currency: "ILS".into(),
        }
    }

    fn client_for(server: &mockito::Server) -> HttpItaClient {
        HttpItaClient::new(ItaConfig {
            base_url: server.url(),
            token_url: format!("{}/oauth2/token", server.url()),
            client_id: "client".into(),
            client_secret: "secret".into(),
            company_vat_number: "516000000".into(),
            request_timeout_secs: 5,
            ..ItaConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_accepted_and_token_cached() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"tok-1","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;
        let approval = server
            .mock("POST", "/Invoices/v1/Approval")
            .match_header("authorization", "Bearer tok-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"approved","confirmationNumber":"ALLOC-77"}"#)
            .expect(2)
            .create_async()
            .await;

        let client = client_for(&server);
        for _ in 0..2 {
            let outcome = client.submit_invoice(&submission()).await.unwrap();
            assert_eq!(
                outcome,
                ItaOutcome::Accepted {
                    allocation_number: "ALLOC-77".into()
                }
            );
        }
        token.assert_async().await;
        approval.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejection_and_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token":"tok","expires_in":3600}"#)
            .create_async()
            .await;
        let rejected = server
            .mock("POST", "/Invoices/v1/Approval")
            .with_status(422)
            .with_body("customer vat number invalid")
            .create_async()
            .await;

        let client = client_for(&server);
        let outcome = client.submit_invoice(&submission()).await.unwrap();
        assert_eq!(
            outcome,
            ItaOutcome::Rejected {
                reason: "customer vat number invalid".into()
            }
        );
        rejected.remove_async().await;

        server
            .mock("POST", "/Invoices/v1/Approval")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;
        let err = client.submit_invoice(&submission()).await.unwrap_err();
        assert_eq!(
            err,
            ItaError::Http {
                status: 503,
                body: "maintenance".into()
            }
        );
    }

    #[tokio::test]
    async fn test_unauthorized_drops_cached_token() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token":"stale","expires_in":3600}"#)
            .expect(2)
            .create_async()
            .await;
        server
            .mock("POST", "/Invoices/v1/Approval")
            .with_status(401)
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.submit_invoice(&submission()).await,
            Err(ItaError::Auth(_))
        ));
        assert!(matches!(
            client.submit_invoice(&submission()).await,
            Err(ItaError::Auth(_))
        ));
        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let client = HttpItaClient::new(ItaConfig::default()).unwrap();
        assert_eq!(
            client.submit_invoice(&submission()).await,
            Err(ItaError::NotConfigured)
        );
    }

    #[test]
    fn test_outcome_mapping() {
        let pending = ApprovalResponse {
            status: "pending".into(),
            confirmation_number: None,
            message: None,
        };
        assert_eq!(outcome_from(pending), ItaOutcome::Submitted);
    }
}
