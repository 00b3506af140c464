use wirepack::Value;
use wirerpc::ErrorCode;
use wirerpc::status;

use super::Reply;
use super::str_arg;
use crate::context::ServerContext;

/// `Input.Create(id, name)`. The handle is issued by the creation signal, not here.
pub(super) fn create(ctx: &ServerContext, args: &[Value]) -> Reply {
    let id = str_arg(args, 0);
    let name = str_arg(args, 1);
    if id.is_empty() {
        return Err(status::error(ErrorCode::BadParameter, "Input id must not be empty."));
    }

    let source = ctx.engine.create_source(id, name);
    match ctx.sources.find_handle(&source) {
        Some(handle) => Ok(status::ok(vec![Value::UInt64(handle)])),
        None => {
            ctx.engine.release_source(&source);
            Err(status::error(ErrorCode::CriticalError, "Source was created without a handle."))
        }
    }
}
