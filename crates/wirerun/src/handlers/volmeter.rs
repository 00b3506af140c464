use wirepack::Value;
use wirerpc::ErrorCode;
use wirerpc::status;

use super::Reply;
use super::i32_arg;
use super::meter_arg;
use super::source_arg;
use super::u32_arg;
use crate::context::ServerContext;
use crate::engine::ChannelLevel;
use crate::engine::FaderType;

/// Query payload layout: `[UInt32 channels, (magnitude, peak, input_peak) × channels]`.
fn encode_levels(levels: &[ChannelLevel]) -> Vec<Value> {
    let mut out = Vec::with_capacity(1 + levels.len() * 3);
    out.push(Value::UInt32(levels.len() as u32));
    for level in levels {
        out.push(Value::Float32(level.magnitude));
        out.push(Value::Float32(level.peak));
        out.push(Value::Float32(level.input_peak));
    }
    out
}

pub(super) fn create(ctx: &ServerContext, args: &[Value]) -> Reply {
    let raw = i32_arg(args, 0);
    let Some(fader_type) = FaderType::from_i32(raw) else {
        return Err(status::error(
            ErrorCode::BadParameter,
            format!("Invalid fader type {}, expected 0, 1 or 2.", raw),
        ));
    };

    let interval = ctx.config.meter_interval_ms;
    let meter = ctx.engine.create_meter(fader_type, interval);
    match ctx.meters.find_handle(&meter) {
        Some(handle) => Ok(status::ok(vec![Value::UInt64(handle), Value::UInt32(interval)])),
        None => {
            ctx.engine.destroy_meter(&meter);
            Err(status::error(ErrorCode::CriticalError, "VolMeter was created without a handle."))
        }
    }
}

pub(super) fn destroy(ctx: &ServerContext, args: &[Value]) -> Reply {
    let meter = meter_arg(ctx, args, 0)?;
    ctx.engine.destroy_meter(&meter);
    Ok(status::ok(vec![]))
}

pub(super) fn attach(ctx: &ServerContext, args: &[Value]) -> Reply {
    let meter = meter_arg(ctx, args, 0)?;
    let source = source_arg(ctx, args, 1)?;
    meter.attach(&source);
    Ok(status::ok(vec![]))
}

pub(super) fn detach(ctx: &ServerContext, args: &[Value]) -> Reply {
    meter_arg(ctx, args, 0)?.detach();
    Ok(status::ok(vec![]))
}

pub(super) fn get_update_interval(ctx: &ServerContext, args: &[Value]) -> Reply {
    let meter = meter_arg(ctx, args, 0)?;
    Ok(status::ok(vec![Value::UInt32(meter.update_interval())]))
}

pub(super) fn set_update_interval(ctx: &ServerContext, args: &[Value]) -> Reply {
    let meter = meter_arg(ctx, args, 0)?;
    let interval = u32_arg(args, 1);
    if interval == 0 {
        return Err(status::error(ErrorCode::BadParameter, "Update interval must be positive."));
    }
    meter.set_update_interval(interval);
    Ok(status::ok(vec![Value::UInt32(meter.update_interval())]))
}

pub(super) fn add_callback(ctx: &ServerContext, args: &[Value]) -> Reply {
    meter_arg(ctx, args, 0)?.add_callback();
    Ok(status::ok(vec![]))
}

pub(super) fn remove_callback(ctx: &ServerContext, args: &[Value]) -> Reply {
    meter_arg(ctx, args, 0)?.remove_callback();
    Ok(status::ok(vec![]))
}

pub(super) fn query(ctx: &ServerContext, args: &[Value]) -> Reply {
    let meter = meter_arg(ctx, args, 0)?;
    match meter.levels() {
        Ok(levels) => Ok(status::ok(encode_levels(&levels))),
        Err(e) => Err(status::error(ErrorCode::Error, e.to_string())),
    }
}
