use wirepack::Value;
use wirerpc::status;

use super::Reply;
use super::i32_arg;
use super::source_arg;
use super::str_arg;
use super::u32_arg;
use crate::context::ServerContext;

fn flag(on: bool) -> Value {
    Value::Int32(on as i32)
}

/// Releases the engine's reference. The destruction signal frees the handle.
pub(super) fn release(ctx: &ServerContext, args: &[Value]) -> Reply {
    let source = source_arg(ctx, args, 0)?;
    ctx.engine.release_source(&source);
    Ok(status::ok(vec![]))
}

pub(super) fn remove(ctx: &ServerContext, args: &[Value]) -> Reply {
    source_arg(ctx, args, 0)?.remove();
    Ok(status::ok(vec![]))
}

pub(super) fn get_id(ctx: &ServerContext, args: &[Value]) -> Reply {
    let source = source_arg(ctx, args, 0)?;
    Ok(status::ok(vec![source.id().into()]))
}

pub(super) fn get_name(ctx: &ServerContext, args: &[Value]) -> Reply {
    let source = source_arg(ctx, args, 0)?;
    Ok(status::ok(vec![source.name().into()]))
}

pub(super) fn set_name(ctx: &ServerContext, args: &[Value]) -> Reply {
    let source = source_arg(ctx, args, 0)?;
    source.set_name(str_arg(args, 1));
    Ok(status::ok(vec![source.name().into()]))
}

pub(super) fn get_settings(ctx: &ServerContext, args: &[Value]) -> Reply {
    let source = source_arg(ctx, args, 0)?;
    Ok(status::ok(vec![source.settings().into()]))
}

pub(super) fn update(ctx: &ServerContext, args: &[Value]) -> Reply {
    let source = source_arg(ctx, args, 0)?;
    source.update(str_arg(args, 1));
    Ok(status::ok(vec![source.settings().into()]))
}

pub(super) fn get_flags(ctx: &ServerContext, args: &[Value]) -> Reply {
    let source = source_arg(ctx, args, 0)?;
    Ok(status::ok(vec![source.flags().into()]))
}

pub(super) fn set_flags(ctx: &ServerContext, args: &[Value]) -> Reply {
    let source = source_arg(ctx, args, 0)?;
    source.set_flags(u32_arg(args, 1));
    Ok(status::ok(vec![source.flags().into()]))
}

pub(super) fn get_muted(ctx: &ServerContext, args: &[Value]) -> Reply {
    let source = source_arg(ctx, args, 0)?;
    Ok(status::ok(vec![flag(source.muted())]))
}

pub(super) fn set_muted(ctx: &ServerContext, args: &[Value]) -> Reply {
    let source = source_arg(ctx, args, 0)?;
    source.set_muted(i32_arg(args, 1) != 0);
    Ok(status::ok(vec![flag(source.muted())]))
}

pub(super) fn get_enabled(ctx: &ServerContext, args: &[Value]) -> Reply {
    let source = source_arg(ctx, args, 0)?;
    Ok(status::ok(vec![flag(source.enabled())]))
}

pub(super) fn set_enabled(ctx: &ServerContext, args: &[Value]) -> Reply {
    let source = source_arg(ctx, args, 0)?;
    source.set_enabled(i32_arg(args, 1) != 0);
    Ok(status::ok(vec![flag(source.enabled())]))
}

/// A resolvable source is always reported as active.
pub(super) fn get_status(ctx: &ServerContext, args: &[Value]) -> Reply {
    source_arg(ctx, args, 0)?;
    Ok(status::ok(vec![Value::UInt32(1)]))
}
