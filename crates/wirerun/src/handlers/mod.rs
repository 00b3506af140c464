//! # Endpoint Handlers
//!
//! Server-side implementations of every `Endpoint`, and the registry that binds them.
//!
//! ## Conventions
//! - Arguments arrive already checked against `Endpoint::params`, so accessors below only fall
//!   back to defaults for shapes the dispatcher has ruled out.
//! - Handle arguments are resolved first. A handle that does not resolve answers
//!   `[InvalidReference, "<Kind> reference is not valid."]`.
//! - Handlers return `Reply`; both arms are complete result lists, status first.

mod input;
mod source;
mod volmeter;

use std::sync::Arc;

use wirepack::Value;
use wirerpc::Collection;
use wirerpc::Dispatcher;
use wirerpc::ErrorCode;
use wirerpc::Registry;
use wirerpc::registry;
use wirerpc::status;

use crate::context::ServerContext;
use crate::endpoint::Endpoint;
use crate::engine::Meter;
use crate::engine::Source;

type Reply = std::result::Result<Vec<Value>, Vec<Value>>;

/// Registers a handler for every endpoint, one collection at a time.
pub fn registry() -> registry::Result<Registry<ServerContext>> {
    let mut collections: Vec<Collection<ServerContext>> = Vec::new();
    for &endpoint in Endpoint::ALL {
        let (collection, function) = endpoint.names();
        let idx = match collections.iter().position(|c| c.name() == collection) {
            Some(idx) => idx,
            None => {
                collections.push(Collection::new(collection));
                collections.len() - 1
            }
        };
        collections[idx].register_function(
            function,
            endpoint.params(),
            move |ctx: &ServerContext, _id: u64, args: &[Value]| route(endpoint, ctx, args),
        )?;
    }

    let mut registry = Registry::new();
    for collection in collections {
        registry.register_collection(collection)?;
    }
    Ok(registry)
}

pub fn dispatcher() -> registry::Result<Dispatcher<ServerContext>> {
    Ok(Dispatcher::new(registry()?))
}

fn route(endpoint: Endpoint, ctx: &ServerContext, args: &[Value]) -> Vec<Value> {
    let reply = match endpoint {
        Endpoint::InputCreate => input::create(ctx, args),

        Endpoint::SourceRelease => source::release(ctx, args),
        Endpoint::SourceRemove => source::remove(ctx, args),
        Endpoint::SourceGetId => source::get_id(ctx, args),
        Endpoint::SourceGetName => source::get_name(ctx, args),
        Endpoint::SourceSetName => source::set_name(ctx, args),
        Endpoint::SourceGetSettings => source::get_settings(ctx, args),
        Endpoint::SourceUpdate => source::update(ctx, args),
        Endpoint::SourceGetFlags => source::get_flags(ctx, args),
        Endpoint::SourceSetFlags => source::set_flags(ctx, args),
        Endpoint::SourceGetMuted => source::get_muted(ctx, args),
        Endpoint::SourceSetMuted => source::set_muted(ctx, args),
        Endpoint::SourceGetEnabled => source::get_enabled(ctx, args),
        Endpoint::SourceSetEnabled => source::set_enabled(ctx, args),
        Endpoint::SourceGetStatus => source::get_status(ctx, args),

        Endpoint::VolMeterCreate => volmeter::create(ctx, args),
        Endpoint::VolMeterDestroy => volmeter::destroy(ctx, args),
        Endpoint::VolMeterAttach => volmeter::attach(ctx, args),
        Endpoint::VolMeterDetach => volmeter::detach(ctx, args),
        Endpoint::VolMeterGetUpdateInterval => volmeter::get_update_interval(ctx, args),
        Endpoint::VolMeterSetUpdateInterval => volmeter::set_update_interval(ctx, args),
        Endpoint::VolMeterAddCallback => volmeter::add_callback(ctx, args),
        Endpoint::VolMeterRemoveCallback => volmeter::remove_callback(ctx, args),
        Endpoint::VolMeterQuery => volmeter::query(ctx, args),
    };
    match reply {
        Ok(results) | Err(results) => results,
    }
}

// ============================================================================
//  ARGUMENTS
// ============================================================================

fn u64_arg(args: &[Value], idx: usize) -> u64 {
    args.get(idx).and_then(Value::as_u64).unwrap_or_default()
}

fn u32_arg(args: &[Value], idx: usize) -> u32 {
    args.get(idx).and_then(Value::as_u32).unwrap_or_default()
}

fn i32_arg(args: &[Value], idx: usize) -> i32 {
    args.get(idx).and_then(Value::as_i32).unwrap_or_default()
}

fn str_arg(args: &[Value], idx: usize) -> &str {
    args.get(idx).and_then(Value::as_str).unwrap_or_default()
}

fn invalid_reference(kind: &str) -> Vec<Value> {
    status::error(ErrorCode::InvalidReference, format!("{} reference is not valid.", kind))
}

fn source_arg(ctx: &ServerContext, args: &[Value], idx: usize) -> Result<Arc<Source>, Vec<Value>> {
    ctx.sources.find(u64_arg(args, idx)).ok_or_else(|| invalid_reference("Source"))
}

fn meter_arg(ctx: &ServerContext, args: &[Value], idx: usize) -> Result<Arc<Meter>, Vec<Value>> {
    ctx.meters.find(u64_arg(args, idx)).ok_or_else(|| invalid_reference("VolMeter"))
}
