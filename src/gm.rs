use crate::{
    Result,
    protocol::ClientEvent,
    transport::base_url,
};
use serde::Deserialize;
use serde_json::json;
use std::{
    future::Future,
    time::Duration,
};
use tracing::{
    error,
    info,
    warn,
};
use url::Url;

/// Checks the shared Game Master password.
pub trait GmVerifier {
    fn verify(&self, password: &str) -> impl Future<Output = Result<bool>>;
}

#[derive(Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    success: bool,
}

/// Upper bound on one `/gm-verify` round trip.
pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Verifies against the server's `POST /gm-verify` endpoint.
#[derive(Clone, Debug)]
pub struct HttpGmVerifier {
    endpoint: Url,
    http: reqwest::Client,
}

impl HttpGmVerifier {
    pub fn new(server: &Url) -> Result<Self> {
        Self::with_timeout(server, VERIFY_TIMEOUT)
    }

    pub fn with_timeout(server: &Url, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: base_url(server).join("gm-verify")?,
            http,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl GmVerifier for HttpGmVerifier {
    async fn verify(&self, password: &str) -> Result<bool> {
        let response: VerifyResponse = self
            .http
            .post(self.endpoint.clone())
            .json(&json!({ "password": password }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.success)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PasswordPrompt {
    pub visible: bool,
    pub error_visible: bool,
    pub focused: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GateOutcome {
    /// GM mode is on; the events must be published.
    Granted(Vec<ClientEvent>),
    Denied,
}

#[derive(Debug, Default)]
pub struct GmSessionGate {
    active: bool,
    prompt: PasswordPrompt,
}

impl GmSessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn prompt(&self) -> PasswordPrompt {
        self.prompt
    }

    pub fn open_prompt(&mut self) {
        self.prompt = PasswordPrompt {
            visible: true,
            error_visible: false,
            focused: true,
        };
    }

    pub fn close_prompt(&mut self) {
        self.prompt = PasswordPrompt::default();
    }

    /// Verification failures are reported exactly like a wrong password.
    pub async fn enter<V>(&mut self, verifier: &V, password: &str) -> GateOutcome
    where
        V: GmVerifier + ?Sized,
    {
        let granted = match verifier.verify(password).await {
            Ok(granted) => granted,
            Err(err) => {
                error!(error = %err, "GM verification failed");
                false
            }
        };
        if !granted {
            warn!("GM password rejected");
            self.prompt = PasswordPrompt {
                visible: true,
                error_visible: true,
                focused: true,
            };
            return GateOutcome::Denied;
        }
        self.active = true;
        self.close_prompt();
        info!("entered GM mode");
        GateOutcome::Granted(vec![
            ClientEvent::JoinGmRoom,
            ClientEvent::RequestHistory { is_gm: true },
        ])
    }

    pub fn exit(&mut self) -> Vec<ClientEvent> {
        self.active = false;
        info!("left GM mode");
        vec![ClientEvent::RequestHistory { is_gm: false }]
    }
}
