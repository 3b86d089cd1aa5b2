//! Game flows: the named call sequences a real client performs.
//!
//! Each flow is a thin wrapper over [`ApiClient::call`] or
//! [`ApiClient::multiple_requests`] that knows which descriptor to use,
//! which response fields matter, and which session state to update
//! afterwards. Flows are the only place application error codes turn into
//! [`ClientError::Api`].

use rand::seq::IndexedRandom;
use serde_json::{Value, json};
use sifemu_protocol::{
    ApiResponse, Fields, IntegrityOracle, ProtocolError, RequestDescriptor, RequestShape,
};
use sifemu_transport::{Exchange, HttpExchange};

use crate::{ApiClient, ClientError, Credentials, catalog};

/// Transfer code used on another device.
pub const ERROR_TRANSFER_CODE_USED: i64 = 407;
/// Transfer code doesn't exist.
pub const ERROR_TRANSFER_CODE_INCORRECT: i64 = 4402;

/// What [`ApiClient::startapp`] collected on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Startapp {
    pub user_info: ApiResponse,
    /// One response per startup-bundle call, in request order.
    pub startup: Vec<ApiResponse>,
    pub connected_account: ApiResponse,
}

/// Choices made while setting up a new account.
///
/// Unset fields are picked at random: the nickname from
/// [`catalog::DEFAULT_NAMES`], the leader from the offered starting units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSetup {
    pub nickname: Option<String>,
    pub leader: Option<i64>,
}

/// The terms-of-service state reported by `tos/tosCheck`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TosState {
    pub tos_id: i64,
    pub is_agreed: bool,
}

impl TosState {
    /// Reads the state out of a `tosCheck` response.
    pub fn from_response(response: &ApiResponse) -> Result<Self, ProtocolError> {
        let tos_id = response
            .field("tos_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| ProtocolError::MalformedResponse("tosCheck has no tos_id".into()))?;
        let is_agreed = response
            .field("is_agreed")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(Self { tos_id, is_agreed })
    }
}

impl<X, O> ApiClient<X, O>
where
    X: HttpExchange,
    O: IntegrityOracle,
{
    // -----------------------------------------------------------------------
    // Session and account
    // -----------------------------------------------------------------------

    /// Starts a new session: resets all session state and obtains a fresh
    /// authorization token from a bodyless `login/authkey` call.
    pub async fn start_session(&mut self) -> Result<ApiResponse, ClientError> {
        tracing::info!("starting new session");
        self.session_mut().reset();

        let response = self
            .single_request(None, Some(&catalog::auth_key().uri()))
            .await?
            .api_response()?;
        let token = response.authorize_token().ok_or_else(|| {
            ProtocolError::MalformedResponse("authkey response has no authorize_token".into())
        })?;
        self.session_mut().adopt_token(token);
        Ok(response)
    }

    /// Logs in with existing credentials, adopting the new token and
    /// recording the account identity.
    ///
    /// # Errors
    /// [`ClientError::Api`] if the server refuses the login, e.g. with
    /// [`ERROR_TRANSFER_CODE_USED`] when the account moved to another device.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<ApiResponse, ClientError> {
        tracing::info!(login_key = %credentials.login_key, "logging in");
        let response = self
            .call_checked(&catalog::login(), &credentials.to_fields())
            .await
            .inspect_err(|error| {
                if error.error_code() == Some(ERROR_TRANSFER_CODE_USED) {
                    tracing::error!("transfer code used elsewhere");
                }
            })?;

        if let Some(review) = response.field("review_version").filter(|v| is_set(v)) {
            tracing::warn!(%review, "review_version set");
        }

        let token = response.authorize_token().ok_or_else(|| {
            ProtocolError::MalformedResponse("login response has no authorize_token".into())
        })?;
        self.session_mut().adopt_token(token);
        self.record_login_from(&response, &credentials.login_key)?;
        Ok(response)
    }

    /// Registers a new credential pair: the first step of a fresh install.
    pub async fn register_new_login(
        &mut self,
        credentials: &Credentials,
    ) -> Result<ApiResponse, ClientError> {
        tracing::info!(login_key = %credentials.login_key, "registering new credentials");
        let response = self
            .call_checked(&catalog::start_up(), &credentials.to_fields())
            .await?;

        let echoed_key = response.field("login_key").and_then(Value::as_str);
        let echoed_passwd = response.field("login_passwd").and_then(Value::as_str);
        if echoed_key != Some(credentials.login_key.as_str())
            || echoed_passwd != Some(credentials.login_passwd.as_str())
        {
            tracing::warn!(?echoed_key, "server returned different credentials");
        }

        self.record_login_from(&response, &credentials.login_key)?;
        Ok(response)
    }

    /// Creates the account behind freshly registered credentials.
    pub async fn start_without_invite(
        &mut self,
        credentials: &Credentials,
    ) -> Result<ApiResponse, ClientError> {
        tracing::info!("starting new account from scratch");
        let exchange = self
            .call(&catalog::start_without_invite(), &credentials.to_fields())
            .await?;
        Ok(exchange.api_response()?)
    }

    /// Creates a brand-new account with `credentials` and plays through
    /// its setup: TOS, nickname, leader choice, and the tutorial's
    /// practice and idolization steps.
    pub async fn register_account(
        &mut self,
        credentials: &Credentials,
        setup: &AccountSetup,
    ) -> Result<(), ClientError> {
        tracing::info!("creating new account");
        self.create_login(credentials).await?;
        self.user_info().await?;
        let tos = self.tos_check().await?;
        if !tos.is_agreed {
            self.tos_agree(tos.tos_id).await?;
        }

        let nickname = match &setup.nickname {
            Some(nickname) => nickname.as_str(),
            None => catalog::DEFAULT_NAMES
                .choose(&mut rand::rng())
                .copied()
                .unwrap_or_default(),
        };
        self.change_name(nickname).await?;
        self.tutorial_progress(1).await?;

        self.startup_bundle().await?;
        self.unit_and_deck().await?;

        let offered = self.login_unit_list().await?;
        let leader = pick_leader(&offered, setup.leader)?;
        self.login_unit_select(leader).await?;
        self.tutorial_skip().await?;

        let units = self.unit_and_deck().await?;
        let owned = units.first().map(|unit_all| &unit_all.response_data);
        let base = owning_id(owned, 0)?;
        self.unit_merge(base, &[owning_id(owned, 10)?]).await?;
        self.tutorial_skip().await?;

        self.unit_rank_up(base, owning_id(owned, 9)?).await?;
        self.tutorial_skip().await?;
        tracing::info!(login_key = %credentials.login_key, "account ready");
        Ok(())
    }

    /// Creates fresh credentials on the server and moves the account behind
    /// `code` onto them.
    ///
    /// # Errors
    /// [`ClientError::Api`] if the code is refused; see
    /// [`use_transfer_code`](Self::use_transfer_code).
    pub async fn account_from_transfer_code(
        &mut self,
        credentials: &Credentials,
        code: &str,
    ) -> Result<ApiResponse, ClientError> {
        tracing::info!("creating account from transfer code");
        self.create_login(credentials).await?;
        self.user_info().await?;
        self.tos_check().await?;
        self.use_transfer_code(code).await
    }

    /// The steps every fresh install starts with: register the credentials,
    /// create the account, then log in with a new session.
    async fn create_login(&mut self, credentials: &Credentials) -> Result<(), ClientError> {
        self.start_session().await?;
        self.register_new_login(credentials).await?;
        self.start_without_invite(credentials).await?;

        self.start_session().await?;
        self.login(credentials).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Single calls
    // -----------------------------------------------------------------------

    pub async fn user_info(&mut self) -> Result<ApiResponse, ClientError> {
        tracing::info!("acquiring user info");
        let response = self.call_simple(&catalog::user_info()).await?;

        let reported = response
            .field("user")
            .and_then(|user| user.get("user_id"))
            .and_then(Value::as_u64);
        let known = self.session().user_id().map(|id| id.0);
        if reported != known {
            tracing::warn!(?reported, ?known, "userInfo returned a different user_id");
        }
        Ok(response)
    }

    pub async fn personal_notice(&mut self) -> Result<ApiResponse, ClientError> {
        let response = self.call_simple(&catalog::personal_notice()).await?;
        if response.field("has_notice").is_some_and(is_set) {
            tracing::warn!(notice = %response.response_data, "personal notice");
        }
        Ok(response)
    }

    pub async fn tos_check(&mut self) -> Result<TosState, ClientError> {
        tracing::info!("checking TOS state");
        let response = self.call_simple(&catalog::tos_check()).await?;
        Ok(TosState::from_response(&response)?)
    }

    pub async fn tos_agree(&mut self, tos_id: i64) -> Result<ApiResponse, ClientError> {
        tracing::info!(tos_id, "agreeing to TOS");
        self.call_with(&catalog::tos_agree(), [("tos_id", tos_id.into())])
            .await
    }

    /// Whether the account is linked to a platform account.
    pub async fn check_connected_account(&mut self) -> Result<ApiResponse, ClientError> {
        self.call_simple(&catalog::is_connected_account()).await
    }

    /// Collects the daily login bonus.
    pub async fn lbonus(&mut self) -> Result<ApiResponse, ClientError> {
        tracing::info!("retrieving daily login bonus");
        self.call_simple(&catalog::login_bonus()).await
    }

    /// Issues a transfer code for the current account.
    pub async fn get_transfer_code(&mut self) -> Result<ApiResponse, ClientError> {
        tracing::info!("retrieving transfer code");
        self.call_simple(&catalog::handover_start()).await
    }

    /// Moves the account behind `code` onto the current credentials.
    ///
    /// # Errors
    /// [`ClientError::Api`] on failure; [`ERROR_TRANSFER_CODE_INCORRECT`]
    /// for an unknown code.
    pub async fn use_transfer_code(&mut self, code: &str) -> Result<ApiResponse, ClientError> {
        tracing::info!("using transfer code");
        self.call_checked(&catalog::handover_exec(), &args([("handover", code.into())]))
            .await
            .inspect_err(|error| {
                if error.error_code() == Some(ERROR_TRANSFER_CODE_INCORRECT) {
                    tracing::error!("transfer code incorrect");
                }
            })
    }

    // -----------------------------------------------------------------------
    // New-account setup
    // -----------------------------------------------------------------------

    pub async fn change_name(&mut self, nickname: &str) -> Result<ApiResponse, ClientError> {
        tracing::info!(%nickname, "changing player name");
        self.call_with(&catalog::change_name(), [("name", nickname.into())])
            .await
    }

    pub async fn tutorial_progress(&mut self, state: i64) -> Result<ApiResponse, ClientError> {
        tracing::info!(state, "tutorial progress");
        self.call_with(&catalog::tutorial_progress(), [("tutorial_state", state.into())])
            .await
    }

    pub async fn tutorial_skip(&mut self) -> Result<ApiResponse, ClientError> {
        tracing::info!("skipping tutorial");
        self.call_simple(&catalog::tutorial_skip()).await
    }

    pub async fn login_unit_list(&mut self) -> Result<ApiResponse, ClientError> {
        tracing::info!("getting starting unit list");
        self.call_simple(&catalog::login_unit_list()).await
    }

    pub async fn login_unit_select(&mut self, unit: i64) -> Result<ApiResponse, ClientError> {
        tracing::info!(unit, "selecting starting unit");
        self.call_with(&catalog::login_unit_select(), [("unit_initial_set_id", unit.into())])
            .await
    }

    // -----------------------------------------------------------------------
    // Units
    // -----------------------------------------------------------------------

    /// Practice: merges `partners` into `base`. Both are
    /// `unit_owning_user_id`s.
    pub async fn unit_merge(&mut self, base: u64, partners: &[u64]) -> Result<ApiResponse, ClientError> {
        tracing::info!(base, partners = partners.len(), "merging units");
        self.call_with(
            &catalog::unit_merge(),
            [
                ("base_owning_unit_user_id", base.into()),
                ("unit_owning_user_ids", json!(partners)),
            ],
        )
        .await
    }

    /// Idolization: ranks `base` up by consuming `partner`.
    pub async fn unit_rank_up(&mut self, base: u64, partner: u64) -> Result<ApiResponse, ClientError> {
        tracing::info!(base, partner, "ranking up unit");
        self.call_with(
            &catalog::unit_rank_up(),
            [
                ("base_owning_unit_user_id", base.into()),
                ("unit_owning_user_ids", json!([partner])),
            ],
        )
        .await
    }

    pub async fn unit_sale(&mut self, units: &[u64]) -> Result<ApiResponse, ClientError> {
        tracing::info!(count = units.len(), "selling units");
        self.call_with(&catalog::unit_sale(), [("unit_owning_user_id", json!(units))])
            .await
    }

    // -----------------------------------------------------------------------
    // Present box
    // -----------------------------------------------------------------------

    /// Opens the present box: one listing per category, newest first, in a
    /// single batch.
    pub async fn reward_list_all(&mut self) -> Result<Vec<ApiResponse>, ClientError> {
        tracing::info!("opening present box");
        let descriptor = catalog::reward_list();
        let listings = catalog::REWARD_CATEGORIES
            .iter()
            .map(|category| reward_page(*category, None))
            .collect::<Vec<_>>();
        let exchange = self
            .call_batch(listings.iter().map(|fields| (&descriptor, fields)))
            .await?;
        batch_results(&exchange)
    }

    /// The next page of `category`, after the present `incentive_id`.
    pub async fn reward_list_page_down(
        &mut self,
        incentive_id: i64,
        category: i64,
    ) -> Result<ApiResponse, ClientError> {
        tracing::info!(incentive_id, category, "browsing present box");
        let exchange = self
            .call(&catalog::reward_list(), &reward_page(category, Some(incentive_id)))
            .await?;
        Ok(exchange.api_response()?)
    }

    pub async fn reward_open(&mut self, incentive_id: i64) -> Result<ApiResponse, ClientError> {
        tracing::info!(incentive_id, "opening present");
        self.call_with(&catalog::reward_open(), [("incentive_id", incentive_id.into())])
            .await
    }

    // -----------------------------------------------------------------------
    // Scouting
    // -----------------------------------------------------------------------

    /// Every scouting tab currently offered.
    pub async fn recruit_info(&mut self) -> Result<ApiResponse, ClientError> {
        tracing::info!("getting scouting tabs");
        self.call_simple(&catalog::secretbox_all()).await
    }

    /// Scouts one member from `secret_box_id`.
    pub async fn recruit(
        &mut self,
        secret_box_id: i64,
        cost_priority: i64,
    ) -> Result<ApiResponse, ClientError> {
        tracing::info!(secret_box_id, "scouting one member");
        self.call_with(
            &catalog::secretbox_pon(),
            [
                ("cost_priority", cost_priority.into()),
                ("secret_box_id", secret_box_id.into()),
            ],
        )
        .await
    }

    /// Scouts `count` members from `secret_box_id` at once.
    pub async fn multi_recruit(
        &mut self,
        count: i64,
        secret_box_id: i64,
        cost_priority: i64,
    ) -> Result<ApiResponse, ClientError> {
        tracing::info!(count, secret_box_id, "scouting multiple members");
        self.call_with(
            &catalog::secretbox_multi(),
            [
                ("count", count.into()),
                ("cost_priority", cost_priority.into()),
                ("secret_box_id", secret_box_id.into()),
            ],
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Rankings
    // -----------------------------------------------------------------------

    /// The page of the event ranking that contains `rank`.
    pub async fn event_ranking(
        &mut self,
        rank: i64,
        event_child_id: i64,
    ) -> Result<ApiResponse, ClientError> {
        tracing::info!(rank, event_child_id, "retrieving event ranking");
        self.call_with(
            &catalog::ranking_event_player(),
            [
                ("buff", 0.into()),
                ("limit", 20.into()),
                ("event_child_id", event_child_id.into()),
                ("rank", rank.into()),
            ],
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    /// The batch a client sends right after login to populate its state.
    pub async fn startup_bundle(&mut self) -> Result<Vec<ApiResponse>, ClientError> {
        tracing::info!("executing startup bundle");
        self.batch_of(catalog::STARTUP_BUNDLE).await
    }

    /// The complete unit and deck listing.
    pub async fn unit_and_deck(&mut self) -> Result<Vec<ApiResponse>, ClientError> {
        tracing::info!("retrieving unit and deck info");
        self.batch_of(catalog::UNIT_AND_DECK).await
    }

    // -----------------------------------------------------------------------
    // Launch
    // -----------------------------------------------------------------------

    /// Simulates launching the game client with existing credentials.
    ///
    /// New session, login, user info, personal notice, TOS (agreeing if
    /// needed), platform-account check, login bonus, the announcement
    /// webview page, then the startup bundle.
    pub async fn startapp(&mut self, credentials: &Credentials) -> Result<Startapp, ClientError> {
        self.start_session().await?;
        self.login(credentials).await?;

        let user_info = self.user_info().await?;
        self.personal_notice().await?;

        let tos = self.tos_check().await?;
        if !tos.is_agreed {
            self.tos_agree(tos.tos_id).await?;
        }

        let connected_account = self.check_connected_account().await?;
        self.lbonus().await?;

        let page = self.webview_get(&catalog::webview_path("announce")).await?;
        tracing::debug!(status = page.status, bytes = page.body.len(), "announcement page");
        self.clear_webview();

        let startup = self.startup_bundle().await?;
        tracing::info!("client launch complete");
        Ok(Startapp {
            user_info,
            startup,
            connected_account,
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn call_simple(&mut self, descriptor: &RequestDescriptor) -> Result<ApiResponse, ClientError> {
        let exchange = self.call(descriptor, &Fields::new()).await?;
        Ok(exchange.api_response()?)
    }

    /// Like [`call`](Self::call), but a non-200 `status_code` is an error.
    async fn call_checked(
        &mut self,
        descriptor: &RequestDescriptor,
        args: &Fields,
    ) -> Result<ApiResponse, ClientError> {
        let response = self.call(descriptor, args).await?.api_response()?;
        if !response.is_success() {
            tracing::error!(
                module = descriptor.module(),
                action = descriptor.action(),
                status_code = response.status_code,
                error_code = ?response.error_code(),
                "request refused"
            );
            return Err(ClientError::api(&response));
        }
        Ok(response)
    }

    async fn call_with<const N: usize>(
        &mut self,
        descriptor: &RequestDescriptor,
        fields: [(&str, Value); N],
    ) -> Result<ApiResponse, ClientError> {
        let exchange = self.call(descriptor, &args(fields)).await?;
        Ok(exchange.api_response()?)
    }

    async fn batch_of(&mut self, pairs: &[(&str, &str)]) -> Result<Vec<ApiResponse>, ClientError> {
        let shapes = pairs
            .iter()
            .map(|(module, action)| RequestShape::single(*module, *action));
        let exchange = self.multiple_requests(shapes).await?;
        batch_results(&exchange)
    }

    fn record_login_from(&mut self, response: &ApiResponse, login_key: &str) -> Result<(), ClientError> {
        let user_id = response.user_id().ok_or_else(|| {
            ProtocolError::MalformedResponse("response has no user_id".into())
        })?;
        self.session_mut().record_login(login_key, user_id);
        Ok(())
    }
}

fn args<const N: usize>(fields: [(&str, Value); N]) -> Fields {
    fields
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// A present box listing body: newest first, no filter.
fn reward_page(category: i64, incentive_id: Option<i64>) -> Fields {
    let mut fields = args([
        ("order", 0.into()),
        ("filter", json!([0])),
        ("category", category.into()),
    ]);
    if let Some(incentive_id) = incentive_id {
        fields.insert("incentive_id".into(), incentive_id.into());
    }
    fields
}

/// The per-command responses of a batch. A wrapped batch whose own status
/// is not 200 is refused as a whole.
fn batch_results(exchange: &Exchange) -> Result<Vec<ApiResponse>, ClientError> {
    if let Some(outer) = exchange.decoded.as_ref().filter(|value| value.is_object()) {
        let outer = ApiResponse::from_value(outer)?;
        if !outer.is_success() {
            tracing::error!(status_code = outer.status_code, "batch refused");
            return Err(ClientError::api(&outer));
        }
    }
    Ok(exchange.batch_responses()?)
}

/// Chooses the new account's leader among the offered starting units,
/// keeping `wanted` if it is on offer.
fn pick_leader(offered: &ApiResponse, wanted: Option<i64>) -> Result<i64, ProtocolError> {
    let available: Vec<i64> = offered
        .field("unit_initial_set")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|set| set.get("unit_initial_set_id").and_then(Value::as_i64))
        .collect();

    if let Some(leader) = wanted.filter(|leader| available.contains(leader)) {
        return Ok(leader);
    }
    available.choose(&mut rand::rng()).copied().ok_or_else(|| {
        ProtocolError::MalformedResponse("unitList offered no starting units".into())
    })
}

/// The `unit_owning_user_id` of the `index`-th card of a `unitAll` result.
fn owning_id(unit_all: Option<&Value>, index: usize) -> Result<u64, ProtocolError> {
    unit_all
        .and_then(|units| units.get(index))
        .and_then(|unit| unit.get("unit_owning_user_id"))
        .and_then(Value::as_u64)
        .ok_or_else(|| {
            ProtocolError::MalformedResponse(format!("unitAll has no card at {index}"))
        })
}

/// Truthiness of a loosely typed response flag.
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
