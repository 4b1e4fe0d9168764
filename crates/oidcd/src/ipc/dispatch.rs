// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request dispatch: one handler per request type.
//!
//! Handlers never hold the registry mutex across network I/O or frontend
//! prompts. The pattern is copy-out/commit: duplicate the minimum record
//! under the lock, release it, do the I/O, reacquire to commit.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::account::{Account, AccountConfig};
use crate::callback::CallbackCoordinator;
use crate::config::AgentOptions;
use crate::error::AgentError;
use crate::flow::refresh::FORCE_NEW_TOKEN;
use crate::flow::{self, parse_flow_list, DeviceAuthResponse, Flow};
use crate::frontend::FrontendChannel;
use crate::ipc::protocol::{Request, Response};
use crate::issuer::IssuerCache;
use crate::registry::AccountRegistry;
use crate::util::epoch_secs;

/// Lifetime of a pending (tokenless) code-flow record waiting for its
/// exchange.
const PENDING_CODE_LIFETIME: u64 = 600;

/// Everything a handler needs, shared across connections.
pub struct AgentContext {
    pub registry: Arc<Mutex<AccountRegistry>>,
    pub issuers: IssuerCache,
    pub http: reqwest::Client,
    pub frontend: FrontendChannel,
    pub callbacks: CallbackCoordinator,
    pub options: AgentOptions,
}

impl AgentContext {
    pub fn new(http: reqwest::Client, frontend: FrontendChannel, options: AgentOptions) -> Self {
        Self {
            registry: Arc::new(Mutex::new(AccountRegistry::new())),
            issuers: IssuerCache::new(http.clone()),
            http,
            frontend,
            callbacks: CallbackCoordinator::new(),
            options,
        }
    }
}

/// Handle one raw request frame, producing exactly one response.
pub async fn handle_frame(ctx: &AgentContext, payload: &[u8]) -> Response {
    // Reaper tick: expired accounts disappear before any lookup.
    ctx.registry.lock().await.reap(epoch_secs());

    let request = match Request::from_json(payload) {
        Ok(request) => request,
        Err(e) => return Response::from_error(&e),
    };
    if ctx.registry.lock().await.is_locked() && !request.allowed_while_locked() {
        return Response::from_error(&AgentError::AgentLocked);
    }
    match dispatch(ctx, request).await {
        Ok(response) => response,
        Err(e) => Response::from_error(&e),
    }
}

async fn dispatch(ctx: &AgentContext, request: Request) -> Result<Response, AgentError> {
    match request {
        Request::Gen { config, flow } => handle_gen(ctx, &config, &flow).await,
        Request::Add { config, timeout, confirm } => {
            handle_add(ctx, &config, timeout, confirm).await
        }
        Request::Remove { account_name } => handle_remove(ctx, &account_name).await,
        Request::Delete { config } => handle_delete(ctx, &config).await,
        Request::RemoveAll => {
            ctx.registry.lock().await.remove_all();
            Ok(Response::success())
        }
        Request::AccessToken { account_name, min_valid_period, scope, application_hint } => {
            handle_access_token(
                ctx,
                &account_name,
                min_valid_period.unwrap_or(0),
                scope.as_deref(),
                application_hint.as_deref().unwrap_or(""),
            )
            .await
        }
        Request::Register { config, flow_list, access_token } => {
            handle_register(ctx, &config, &flow_list, access_token.as_deref()).await
        }
        Request::CodeExchange { config, code, redirect_uri, state, code_verifier } => {
            handle_code_exchange(ctx, &config, &code, &redirect_uri, &state, &code_verifier).await
        }
        Request::StateLookup { state } => handle_state_lookup(ctx, &state).await,
        Request::DeviceLookup { config, device } => {
            handle_device_lookup(ctx, &config, &device).await
        }
        Request::TermHttp { state } => handle_term_http(ctx, &state).await,
        Request::AccountList => {
            let accounts = ctx.registry.lock().await.shortnames();
            let mut response = Response::success();
            response.accounts = Some(accounts);
            Ok(response)
        }
        Request::Lock { password } => {
            ctx.registry.lock().await.lock(&password)?;
            Ok(Response::success().info("Agent locked"))
        }
        Request::Unlock { password } => {
            ctx.registry.lock().await.unlock(&password)?;
            Ok(Response::success().info("Agent unlocked"))
        }
    }
}

/// `gen`: try each requested flow in order; first success wins.
async fn handle_gen(ctx: &AgentContext, config: &str, flow: &str) -> Result<Response, AgentError> {
    tracing::debug!("handle gen request");
    let config = AccountConfig::from_json(config)?;
    let flows = parse_flow_list(flow)?;
    let single = flows.len() == 1;
    let issuer = ctx.issuers.get(&config.issuer_url).await?;
    let mut account = Account::new(config);

    for f in flows {
        match f {
            Flow::Refresh => {
                match flow::refresh::get_access_token(
                    &ctx.http,
                    &issuer.token_endpoint,
                    &mut account,
                    FORCE_NEW_TOKEN,
                    None,
                )
                .await
                {
                    Ok(_) => return finish_gen(ctx, account).await,
                    Err(e) if single => return Err(e),
                    Err(e) => {
                        tracing::debug!(error = %e, "refresh flow failed, trying next")
                    }
                }
            }
            Flow::Password => {
                match flow::password::get_tokens(
                    &ctx.http,
                    &issuer.token_endpoint,
                    &mut account,
                    &ctx.frontend,
                )
                .await
                {
                    Ok(()) => return finish_gen(ctx, account).await,
                    Err(e) if single => return Err(e),
                    Err(e) => {
                        tracing::debug!(error = %e, "password flow failed, trying next")
                    }
                }
            }
            Flow::Code => {
                let request = flow::code::init(&mut account, &issuer.authorization_endpoint)?;
                ctx.callbacks.register(&request.state).await;
                // The tokenless record waits in the registry for its
                // exchange, bounded so abandoned flows get reaped.
                account.death = epoch_secs() + PENDING_CODE_LIFETIME;
                account.wipe_credentials();
                ctx.registry.lock().await.insert(account);

                let mut response = Response::accepted();
                response.authorization_url = Some(request.authorization_url);
                response.state = Some(request.state);
                response.code_verifier = Some(request.code_verifier);
                return Ok(response);
            }
            Flow::Device => {
                let device = flow::device::init(
                    &ctx.http,
                    &issuer.device_authorization_endpoint,
                    &account,
                )
                .await?;
                account.wipe_credentials();
                let mut response = Response::accepted();
                response.config = Some(account.config.to_json()?);
                response.oidc_device = Some(device);
                return Ok(response);
            }
        }
    }
    Ok(Response::failure("no flow was successful"))
}

async fn finish_gen(ctx: &AgentContext, mut account: Account) -> Result<Response, AgentError> {
    account.wipe_credentials();
    if !account.refresh_token_is_valid() {
        return Ok(Response::failure("provider response does not contain a refresh token"));
    }
    let config_json = account.config.to_json()?;
    ctx.registry.lock().await.insert(account);
    Ok(Response::success().config(config_json))
}

/// `add`: verify the config via the refresh flow and load it. Re-adding
/// a loaded account only updates its lifetime.
async fn handle_add(
    ctx: &AgentContext,
    config: &str,
    timeout: Option<u64>,
    confirm: bool,
) -> Result<Response, AgentError> {
    tracing::debug!("handle add request");
    let config = AccountConfig::from_json(config)?;
    let timeout = timeout.unwrap_or(ctx.options.default_timeout);
    let death = if timeout > 0 { epoch_secs() + timeout } else { 0 };

    {
        let mut registry = ctx.registry.lock().await;
        if let Some(existing) = registry.find_mut(&config.shortname) {
            if confirm {
                existing.confirmation_required = true;
            }
            let info = if existing.death != death {
                existing.death = death;
                format!("account already loaded. Lifetime set to {timeout} seconds.")
            } else {
                "account already loaded.".to_owned()
            };
            return Ok(Response::success().info(info));
        }
    }

    let issuer = ctx.issuers.get(&config.issuer_url).await?;
    let mut account = Account::new(config);
    account.death = death;
    account.confirmation_required = confirm;
    if let Err(e) = flow::refresh::get_access_token(
        &ctx.http,
        &issuer.token_endpoint,
        &mut account,
        FORCE_NEW_TOKEN,
        None,
    )
    .await
    {
        // The cached discovery document may be stale. Refetch it and
        // retry once if the token endpoint moved.
        if !matches!(e, AgentError::NetworkError(_)) {
            return Err(e);
        }
        ctx.issuers.invalidate(&account.config.issuer_url).await;
        let fresh = ctx.issuers.get(&account.config.issuer_url).await?;
        if fresh.token_endpoint == issuer.token_endpoint {
            return Err(e);
        }
        tracing::debug!(account = %account.shortname(), "token endpoint moved, retrying");
        flow::refresh::get_access_token(
            &ctx.http,
            &fresh.token_endpoint,
            &mut account,
            FORCE_NEW_TOKEN,
            None,
        )
        .await?;
    }
    ctx.registry.lock().await.insert(account);

    tracing::debug!(timeout, "account loaded");
    Ok(if timeout > 0 {
        Response::success().info(format!("Lifetime set to {timeout} seconds"))
    } else {
        Response::success()
    })
}

async fn handle_remove(ctx: &AgentContext, account_name: &str) -> Result<Response, AgentError> {
    tracing::debug!(account = %account_name, "handle remove request");
    if ctx.registry.lock().await.remove(account_name) {
        Ok(Response::success())
    } else {
        Err(AgentError::AccountNotLoaded)
    }
}

/// `delete`: revoke the account's tokens at the issuer, then unload. A
/// failed revocation leaves the account loaded.
async fn handle_delete(ctx: &AgentContext, config: &str) -> Result<Response, AgentError> {
    tracing::debug!("handle delete request");
    let config = AccountConfig::from_json(config)?;
    let mut account = {
        let registry = ctx.registry.lock().await;
        match registry.find(&config.shortname) {
            Some(account) => account.duplicate(),
            None => {
                return Ok(Response::failure("Could not revoke token: account not loaded"));
            }
        }
    };

    let issuer = ctx.issuers.get(&account.config.issuer_url).await?;
    if let Err(e) = flow::revoke::revoke(&ctx.http, &issuer.revocation_endpoint, &mut account).await
    {
        return Ok(Response::failure(format!("Could not revoke token: {}", e.message())));
    }
    ctx.registry.lock().await.remove(&config.shortname);
    Ok(Response::success())
}

/// `access_token`: autoload when the account is missing, confirmation
/// when flagged, then the refresh flow.
async fn handle_access_token(
    ctx: &AgentContext,
    account_name: &str,
    min_valid_period: u64,
    scope: Option<&str>,
    application_hint: &str,
) -> Result<Response, AgentError> {
    tracing::debug!(account = %account_name, application_hint, "handle token request");
    let loaded = {
        let registry = ctx.registry.lock().await;
        registry.find(account_name).map(Account::duplicate)
    };

    let mut account = match loaded {
        Some(account) => {
            if ctx.options.confirm || account.confirmation_required {
                ctx.frontend.request_confirm(account_name, application_hint).await?;
            }
            account
        }
        None => {
            if ctx.options.no_autoload {
                return Err(AgentError::AccountNotLoaded);
            }
            autoload(ctx, account_name, application_hint).await?
        }
    };

    let issuer = ctx.issuers.get(&account.config.issuer_url).await?;
    let result = flow::refresh::get_access_token(
        &ctx.http,
        &issuer.token_endpoint,
        &mut account,
        min_valid_period,
        scope,
    )
    .await;
    let issuer_url = account.config.issuer_url.clone();
    // Commit the record in every outcome: the refresh may have rotated
    // the refresh token or wiped a revoked one.
    ctx.registry.lock().await.insert(account);

    let token = result?;
    let mut response = Response::success();
    response.access_token = Some(token.access_token);
    response.issuer_url = Some(issuer_url);
    response.expires_at = Some(token.expires_at);
    Ok(response)
}

/// Ask the frontend for a stored config and load it like `add` would.
async fn autoload(
    ctx: &AgentContext,
    account_name: &str,
    application_hint: &str,
) -> Result<Account, AgentError> {
    tracing::debug!(account = %account_name, "requesting autoload from frontend");
    let config_json = match ctx.frontend.request_autoload(account_name, application_hint).await {
        Ok(config) => config,
        Err(AgentError::UserCancel) => return Err(AgentError::AccountNotLoaded),
        Err(e) => return Err(e),
    };
    let config = AccountConfig::from_json(&config_json)?;
    let issuer = ctx.issuers.get(&config.issuer_url).await?;

    let mut account = Account::new(config);
    account.death = if ctx.options.default_timeout > 0 {
        epoch_secs() + ctx.options.default_timeout
    } else {
        0
    };
    flow::refresh::get_access_token(
        &ctx.http,
        &issuer.token_endpoint,
        &mut account,
        FORCE_NEW_TOKEN,
        None,
    )
    .await?;
    ctx.registry.lock().await.insert(account.duplicate());
    Ok(account)
}

/// `register`: mint a client at the issuer. The account is not loaded;
/// callers follow up with `add`.
async fn handle_register(
    ctx: &AgentContext,
    config: &str,
    flow_list: &str,
    access_token: Option<&str>,
) -> Result<Response, AgentError> {
    tracing::debug!(flow_list, "handle register request");
    let config = AccountConfig::from_json(config)?;
    if ctx.registry.lock().await.find(&config.shortname).is_some() {
        return Err(AgentError::AccountAlreadyLoaded);
    }
    let issuer = ctx.issuers.get(&config.issuer_url).await?;
    let flows = parse_register_flows(flow_list)?;
    let account = Account::new(config);

    let outcome = flow::register::register(
        &ctx.http,
        &issuer.registration_endpoint,
        &account,
        &flows,
        access_token,
    )
    .await?;

    if outcome.insufficient_scope {
        let mut response = Response::from_error(&AgentError::InsufficientScope);
        response.client = Some(outcome.client);
        return Ok(response);
    }
    let mut response = Response::success();
    response.client = Some(outcome.client);
    if outcome.password_grant_dropped {
        response.info = Some(
            "the provider does not support the password grant for this client; \
             it was registered without it"
                .to_owned(),
        );
    }
    Ok(response)
}

/// The flow list arrives either as a JSON array of strings or as the
/// comma-joined form `gen` uses.
fn parse_register_flows(flow_list: &str) -> Result<Vec<Flow>, AgentError> {
    if let Ok(names) = serde_json::from_str::<Vec<String>>(flow_list) {
        let flows: Result<Vec<Flow>, AgentError> = names.iter().map(|n| Flow::parse(n)).collect();
        let flows = flows?;
        if flows.is_empty() {
            return Err(AgentError::BadRequest("empty flow list".to_owned()));
        }
        return Ok(flows);
    }
    parse_flow_list(flow_list)
}

/// `code_exchange`: finalize a pending code flow.
async fn handle_code_exchange(
    ctx: &AgentContext,
    config: &str,
    code: &str,
    redirect_uri: &str,
    state: &str,
    code_verifier: &str,
) -> Result<Response, AgentError> {
    tracing::debug!("handle code exchange request");
    let config = AccountConfig::from_json(config)?;
    let issuer = ctx.issuers.get(&config.issuer_url).await?;
    let mut account = Account::new(config);

    flow::code::exchange(
        &ctx.http,
        &issuer.token_endpoint,
        &mut account,
        code,
        redirect_uri,
        code_verifier,
    )
    .await?;
    if !account.refresh_token_is_valid() {
        return Ok(Response::failure("could not get a refresh token"));
    }

    // The completed record takes over the state for the later lookup.
    account.used_state = Some(state.to_owned());
    account.code_verifier.clear();
    let config_json = account.config.to_json()?;
    {
        let mut registry = ctx.registry.lock().await;
        // A pending record under a different shortname must not keep
        // claiming this state; the same shortname is simply replaced.
        let stale = match registry.find_by_state(state) {
            Some(p) if p.shortname() != account.shortname() => {
                Some((p.shortname().to_owned(), !p.refresh_token_is_valid()))
            }
            _ => None,
        };
        if let Some((name, tokenless)) = stale {
            if tokenless {
                registry.remove(&name);
            } else if let Some(p) = registry.find_by_state_mut(state) {
                p.clear_code_flow_scratch();
            }
        }
        registry.insert(account);
    }
    Ok(Response::success().config(config_json))
}

/// `state_lookup`: drain a completed code flow. One-shot per state.
async fn handle_state_lookup(ctx: &AgentContext, state: &str) -> Result<Response, AgentError> {
    tracing::debug!("handle state lookup request");
    let config_json = {
        let mut registry = ctx.registry.lock().await;
        match registry.find_by_state_mut(state) {
            None => {
                return Ok(Response::notfound(format!(
                    "no loaded account info found for state={state}"
                )));
            }
            Some(account) => {
                account.clear_code_flow_scratch();
                account.config.to_json()?
            }
        }
    };
    ctx.callbacks.term(state).await;
    Ok(Response::success().config(config_json))
}

/// `device_lookup`: poll the provider until the device flow resolves.
async fn handle_device_lookup(
    ctx: &AgentContext,
    config: &str,
    device: &str,
) -> Result<Response, AgentError> {
    tracing::debug!("handle device lookup request");
    let config = AccountConfig::from_json(config)?;
    let device: DeviceAuthResponse = serde_json::from_str(device)
        .map_err(|e| AgentError::BadRequest(format!("could not parse device code: {e}")))?;
    let issuer = ctx.issuers.get(&config.issuer_url).await?;
    let mut account = Account::new(config);

    flow::device::lookup(&ctx.http, &issuer.token_endpoint, &mut account, &device).await?;
    if !account.refresh_token_is_valid() {
        return Ok(Response::failure("could not get a refresh token"));
    }
    let config_json = account.config.to_json()?;
    ctx.registry.lock().await.insert(account);
    Ok(Response::success().config(config_json))
}

/// `term_http`: tear down the callback receiver for a state and cancel
/// the pending flow it belonged to.
async fn handle_term_http(ctx: &AgentContext, state: &str) -> Result<Response, AgentError> {
    tracing::debug!("handle term http request");
    ctx.callbacks.term(state).await;
    let mut registry = ctx.registry.lock().await;
    let cancelled = registry.find_by_state_mut(state).map(|account| {
        account.clear_code_flow_scratch();
        // A record that never completed its flow has nothing worth
        // keeping.
        let tokenless = !account.refresh_token_is_valid() && account.access_token.is_empty();
        (account.shortname().to_owned(), tokenless)
    });
    if let Some((name, true)) = cancelled {
        registry.remove(&name);
    }
    Ok(Response::success())
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
