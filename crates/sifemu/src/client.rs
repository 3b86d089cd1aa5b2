//! `ApiClient`: one logical client session against the game server.
//!
//! This is where the layers meet. For every logical call the client:
//!
//! 1. builds the body (descriptor or shape → envelope)
//! 2. takes a command number (single calls only)
//! 3. per physical attempt: stamps the timestamp, takes a nonce, encodes
//!    JSON, signs headers, wraps the multipart body
//! 4. hands the attempt to the [`RetryPolicy`]
//! 5. validates the final response with the [`ResponseInspector`]
//!
//! All of this happens under `&mut self`: a session is driven strictly
//! sequentially.

use std::time::{SystemTime, UNIX_EPOCH};

use sifemu_protocol::{
    Body, CallKind, Codec, CommandTag, DeviceProfile, Fields, HeaderSigner,
    IntegrityOracle, JsonCodec, ProtocolError, RequestDescriptor, RequestShape,
    SigningInput,
};
use sifemu_session::SessionState;
use sifemu_transport::{
    Exchange, HttpExchange, HttpRequest, HttpResponse, MultipartBody,
    ReqwestExchange, ResponseInspector, RetryPolicy, TransportError,
};

use crate::{ClientConfig, ClientError};

/// A game-API client bound to one session.
///
/// Generic over the HTTP exchange (a real network client in production, a
/// scripted double in tests) and the integrity oracle.
///
/// # Example
///
/// ```rust,no_run
/// use sifemu::prelude::*;
///
/// # async fn run() -> Result<(), ClientError> {
/// let oracle = |data: &[u8]| format!("{:040x}", data.len());
/// let mut client = ApiClient::connect(ClientConfig::default(), oracle)?;
///
/// client.start_session().await?;
/// let info = client.single_request(Some(("user", "userInfo").into()), None).await?;
/// println!("{:?}", info.decoded);
/// # Ok(())
/// # }
/// ```
pub struct ApiClient<X, O> {
    config: ClientConfig,
    exchange: X,
    signer: HeaderSigner<O>,
    session: SessionState,
    retry: RetryPolicy,
    last_response: Option<Exchange>,
    server_version: Option<String>,
}

impl<O: IntegrityOracle> ApiClient<ReqwestExchange, O> {
    /// Creates a client that talks to `config.base_url` over the network.
    ///
    /// # Errors
    /// [`TransportError::InvalidRequest`] if the HTTP client can't be built.
    pub fn connect(config: ClientConfig, oracle: O) -> Result<Self, ClientError> {
        let exchange = ReqwestExchange::new(config.base_url.as_str())?;
        Ok(Self::new(config, exchange, oracle))
    }
}

impl<X, O> ApiClient<X, O>
where
    X: HttpExchange,
    O: IntegrityOracle,
{
    /// Creates a client with a fresh, empty session.
    pub fn new(config: ClientConfig, exchange: X, oracle: O) -> Self {
        let signer = HeaderSigner::new(config.profile.clone(), oracle);
        let retry = RetryPolicy::new(config.max_attempts);
        Self {
            config,
            exchange,
            signer,
            session: SessionState::new(),
            retry,
            last_response: None,
            server_version: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The identity currently sent, including any adopted version.
    pub fn profile(&self) -> &DeviceProfile {
        self.signer.profile()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub fn exchange(&self) -> &X {
        &self.exchange
    }

    /// The validated result of the most recent API exchange.
    pub fn last_response(&self) -> Option<&Exchange> {
        self.last_response.as_ref()
    }

    /// The last `server-version` header the server sent.
    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    /// Starts claiming the last seen `server-version` as the client
    /// version. Returns the adopted version, or `None` if none was seen.
    pub fn adopt_server_version(&mut self) -> Option<&str> {
        let version = self.server_version.as_deref()?;
        tracing::info!(
            from = %self.signer.profile().client_version,
            to = %version,
            "adopting server version"
        );
        self.signer.profile_mut().client_version = version.to_string();
        // Webview headers embed the client version.
        self.session.webview_mut().clear();
        Some(version)
    }

    // -----------------------------------------------------------------------
    // API path
    // -----------------------------------------------------------------------

    /// Sends one command, or no body at all when `shape` is `None`.
    ///
    /// The request goes to `path` if given, otherwise to
    /// `/main.php/{module}/{action}` of the shape. Every call takes a
    /// command number, whether or not the body has a `commandNum` slot.
    ///
    /// # Errors
    /// - [`ProtocolError::UnknownTarget`] if no path can be determined
    /// - any error of the exchange; see [`RetryPolicy::run`] and
    ///   [`ResponseInspector::inspect`]
    pub async fn single_request(
        &mut self,
        shape: Option<RequestShape>,
        path: Option<&str>,
    ) -> Result<Exchange, ClientError> {
        let path = match (path, &shape) {
            (Some(path), _) => path.to_string(),
            (None, Some(shape)) => shape.path()?,
            (None, None) => {
                return Err(ProtocolError::UnknownTarget(
                    "a bodyless request needs an explicit path".into(),
                )
                .into());
            }
        };

        let body = Body::single(shape);
        let command = self.session.next_command_tag();
        tracing::debug!(%path, command = command.number, "single request");
        self.post(&path, body.as_ref(), Some(&command)).await
    }

    /// Sends several commands in one batched exchange.
    ///
    /// Batched commands share one timestamp and carry no `commandNum`; the
    /// session's command number is left alone.
    pub async fn multiple_requests<I>(&mut self, shapes: I) -> Result<Exchange, ClientError>
    where
        I: IntoIterator<Item = RequestShape>,
    {
        let body = Body::batch(shapes);
        let path = self.config.batch_path.clone();
        tracing::debug!(%path, "batched request");
        self.post(&path, Some(&body), None).await
    }

    /// Builds `descriptor` with `args` and sends it to the descriptor's URI.
    ///
    /// # Errors
    /// [`ProtocolError::MissingRequiredField`] before anything is sent, and
    /// before any session counter moves.
    pub async fn call(
        &mut self,
        descriptor: &RequestDescriptor,
        args: &Fields,
    ) -> Result<Exchange, ClientError> {
        let envelope = descriptor.build(CallKind::Single, args)?;
        self.single_request(Some(envelope.into()), Some(&descriptor.uri()))
            .await
    }

    /// Builds every descriptor and sends them as one batch.
    ///
    /// Fails without sending anything if any member fails to build.
    pub async fn call_batch<'a, I>(&mut self, calls: I) -> Result<Exchange, ClientError>
    where
        I: IntoIterator<Item = (&'a RequestDescriptor, &'a Fields)>,
    {
        let shapes = calls
            .into_iter()
            .map(|(descriptor, args)| {
                descriptor
                    .build(CallKind::Batched, args)
                    .map(RequestShape::from)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.multiple_requests(shapes).await
    }

    /// Runs the retry loop for one logical call and validates the result.
    async fn post(
        &mut self,
        path: &str,
        body: Option<&Body>,
        command: Option<&CommandTag>,
    ) -> Result<Exchange, ClientError> {
        let Self {
            config,
            exchange,
            signer,
            session,
            retry,
            last_response,
            server_version,
        } = self;
        let timeout = config.request_timeout;

        let response = retry
            .run(&*exchange, |attempt| -> Result<HttpRequest, ClientError> {
                let timestamp = unix_now();
                let nonce = session.next_nonce();
                let json = body
                    .map(|body| JsonCodec.encode(&body.stamp(timestamp, command)))
                    .transpose()?;

                let mut headers = signer.sign(&SigningInput {
                    timestamp,
                    body: json.as_deref(),
                    nonce,
                    user_id: session.user_id(),
                    token: session.token(),
                });
                let payload = match json {
                    Some(json) => {
                        let multipart = MultipartBody::encode(&json);
                        headers.push("Content-Length", multipart.content_length().to_string());
                        headers.push("Content-Type", multipart.content_type);
                        multipart.body
                    }
                    None => {
                        headers.push("Content-Length", "0");
                        Vec::new()
                    }
                };

                tracing::debug!(%path, attempt, nonce, "prepared attempt");
                Ok(HttpRequest::post(path, headers, payload, timeout))
            })
            .await?;

        let inspector =
            ResponseInspector::new(signer.oracle(), &signer.profile().client_version);
        let validated = inspector.inspect(response)?;

        if let Some(version) = validated.server_version() {
            *server_version = Some(version.to_string());
        }
        *last_response = Some(validated.clone());
        Ok(validated)
    }

    // -----------------------------------------------------------------------
    // Webview path
    // -----------------------------------------------------------------------

    /// Fetches a webview page with the cached webview headers.
    ///
    /// Builds the header set on first use and reuses it until
    /// [`clear_webview`](Self::clear_webview). Consumes a session nonce
    /// even though the header carries the fixed sentinel. No retries and no
    /// validation: the raw response is returned, and a timeout yields a
    /// synthetic empty `504`.
    ///
    /// # Errors
    /// Any non-timeout transport error.
    pub async fn webview_get(&mut self, path: &str) -> Result<HttpResponse, ClientError> {
        let Self {
            config,
            exchange,
            signer,
            session,
            ..
        } = self;

        let nonce = session.next_nonce();
        let user_id = session.user_id();
        let token = session.token().map(str::to_owned);
        let headers = session
            .webview_mut()
            .get_or_build(|| signer.webview_headers(unix_now(), user_id, token.as_deref()))
            .clone();

        tracing::debug!(%path, nonce, "webview fetch");
        let request = HttpRequest::get(path, headers, config.webview_timeout);
        match exchange.exchange(request).await {
            Ok(response) => Ok(response),
            Err(TransportError::Timeout) => {
                tracing::warn!(%path, "webview fetch timed out");
                Ok(HttpResponse::new(504))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Drops the cached webview headers; the next fetch rebuilds them.
    pub fn clear_webview(&mut self) {
        self.session.webview_mut().clear();
    }
}

/// Current unix time in whole seconds.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
