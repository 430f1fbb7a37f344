//! A bolt running a sub-chain under temporarily elevated credentials.

use super::call::{merge_output, CallSpec};
use super::{report_completion, unit_stream, Bolt, Chain, UnitStream};
use crate::client::{Credentials, Kwargs, Operation};
use crate::context::ExecutionContext;
use crate::core::PipelineUnit;
use crate::errors::{ArgumentError, PipelineResult};
use crate::events::{EventKind, PipelineEvent};
use crate::observability::SpanTimer;
use crate::utils::ArgumentSpec;
use async_stream::stream;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::sync::Arc;

/// Service of the default elevation operation.
pub const DEFAULT_ELEVATION_SERVICE: &str = "sts";
/// Default elevation operation.
pub const DEFAULT_ELEVATION_OPERATION: &str = "assume_role";
/// Argument the elevation call iterates over.
pub const ROLE_ARGUMENT: &str = "RoleArn";

/// Obtains temporary credentials for each input unit and runs a sub-chain
/// under a session built from them.
///
/// Each input item is an elevation request: its role identifier is passed
/// as [`ROLE_ARGUMENT`] together with the fixed arguments. The elevation
/// result, merged over the call arguments, enters the sub-chain as a fresh
/// unit. Every item the sub-chain yields comes back into the parent stream
/// as a child of the input unit; the sub-chain's own history is not kept.
///
/// The delegated session is only visible to the sub-chain. Bolts after this
/// one keep running under the parent context.
#[derive(Debug, Clone)]
pub struct DelegatedSessionBolt {
    call: Arc<CallSpec>,
    chain: Chain,
}

impl DelegatedSessionBolt {
    /// Assumes a role with `sts.assume_role` and runs `chain` under it.
    #[must_use]
    pub fn new(chain: Chain) -> Self {
        Self::with_operation(
            Operation::new(DEFAULT_ELEVATION_SERVICE, DEFAULT_ELEVATION_OPERATION),
            chain,
        )
    }

    /// Uses a custom elevation operation.
    #[must_use]
    pub fn with_operation(operation: Operation, chain: Chain) -> Self {
        let mut call = CallSpec::new(operation);
        call.iterating_over = Some(ArgumentSpec::key(ROLE_ARGUMENT));
        Self {
            call: Arc::new(call),
            chain,
        }
    }

    /// Sets extra elevation call arguments (e.g. `RoleSessionName`).
    #[must_use]
    pub fn with_kwargs(mut self, kwargs: Kwargs) -> Self {
        Arc::make_mut(&mut self.call).kwargs = kwargs;
        self
    }

    /// Adds one extra elevation call argument.
    #[must_use]
    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        Arc::make_mut(&mut self.call).kwargs.insert(key.into(), value);
        self
    }

    /// Returns the sub-chain.
    #[must_use]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }
}

impl Bolt for DelegatedSessionBolt {
    fn name(&self) -> &str {
        self.call.label()
    }

    fn apply(&self, input: UnitStream, ctx: ExecutionContext) -> UnitStream {
        delegate_each(Arc::clone(&self.call), self.chain.clone(), input, ctx).boxed()
    }
}

fn delegate_each(
    call: Arc<CallSpec>,
    chain: Chain,
    mut input: UnitStream,
    ctx: ExecutionContext,
) -> impl Stream<Item = PipelineResult<PipelineUnit>> + Send + 'static {
    stream! {
        let timer = SpanTimer::start(call.label());
        let mut produced = 0usize;

        while let Some(next) = input.next().await {
            let unit = match next {
                Ok(unit) => unit,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            if let Err(err) = ctx.check_delegation_depth() {
                yield Err(err);
                return;
            }

            let client = match call.client(&ctx).await {
                Ok(client) => client,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            let kwargs: Kwargs = match call.call_arguments(&unit.item, &ctx) {
                Ok(kwargs) => kwargs,
                Err(err) => {
                    call.isolate(&ctx, err.kind(), err.to_string(), &unit.item, None);
                    continue;
                }
            };

            let result = match client.invoke(&call.operation.name, kwargs.clone()).await {
                Ok(result) => result,
                Err(err) => {
                    call.isolate(&ctx, &err.kind, err.detail, &unit.item, Some(&kwargs));
                    continue;
                }
            };

            let credentials = match Credentials::from_result(&result) {
                Ok(credentials) => credentials,
                Err(err) => {
                    call.isolate(&ctx, err.kind(), err.to_string(), &unit.item, Some(&kwargs));
                    continue;
                }
            };

            let seed = match merge_output(&kwargs, result) {
                Some(Ok(seed)) => seed,
                Some(Err(err)) => {
                    call.isolate(&ctx, err.kind(), err.to_string(), &unit.item, Some(&kwargs));
                    continue;
                }
                None => {
                    let err = ArgumentError::unsupported("null elevation result");
                    call.isolate(&ctx, err.kind(), err.to_string(), &unit.item, Some(&kwargs));
                    continue;
                }
            };

            let session = match ctx.session().delegate(&credentials).await {
                Ok(session) => session,
                Err(err) => {
                    call.isolate(&ctx, &err.kind, err.detail, &unit.item, Some(&kwargs));
                    continue;
                }
            };

            let nested = match ctx.delegated(session) {
                Ok(nested) => nested,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            tracing::debug!(
                bolt = call.label(),
                session = nested.session().name(),
                depth = nested.delegation_depth(),
                "Running bolt chain under delegated session"
            );
            ctx.emit(PipelineEvent::bolt(
                EventKind::SessionDelegated,
                call.label(),
                serde_json::json!({
                    "session": nested.session().name(),
                    "depth": nested.delegation_depth(),
                    "bolts": chain.names(),
                }),
            ));

            let mut results = chain.apply(unit_stream(vec![PipelineUnit::initial(seed)]), &nested);
            while let Some(sub) = results.next().await {
                match sub {
                    Ok(sub) => {
                        produced += 1;
                        yield Ok(unit.derive(sub.into_item()));
                    }
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
        }

        report_completion(&ctx, &timer, produced);
    }
}
