//! Document-level operations: parameters, history, export, selection.

use serde_json::json;
use tracing::info;

use super::output;
use crate::bridge::{Args, HandlerContext, HandlerOutput};
use crate::host::{ExportFormat, HostResult, Selection};

pub fn set_parameter(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let name = args.text(0)?;
    let value = args.text(1)?;
    cx.host.set_parameter_expression(name, value)?;
    Ok(output(json!({ "name": name, "expression": value })))
}

pub fn undo(cx: &mut HandlerContext<'_>, _args: &Args) -> HostResult<HandlerOutput> {
    cx.host.undo()?;
    Ok(output(json!({ "history_marker": cx.host.history_marker() })))
}

fn export(cx: &mut HandlerContext<'_>, args: &Args, format: ExportFormat) -> HostResult<HandlerOutput> {
    let name = args.text(0)?;
    let path = cx.host.export(format, name)?;
    info!(path = %path.display(), "design exported");
    Ok(output(json!({ "path": path.display().to_string() })))
}

pub fn export_stl(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    export(cx, args, ExportFormat::Stl)
}

pub fn export_step(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    export(cx, args, ExportFormat::Step)
}

/// Removes every body, last first.
pub fn delete_everything(cx: &mut HandlerContext<'_>, _args: &Args) -> HostResult<HandlerOutput> {
    let count = cx.host.bodies().len();
    for body in (0..count).rev() {
        cx.host.remove_body(body)?;
    }
    Ok(output(json!({ "removed": count })))
}

pub fn select_body(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let name = args.text(0)?;
    cx.host.select(&Selection::Body(name.to_string()))?;
    Ok(output(json!({ "selected": name })))
}

pub fn select_sketch(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let name = args.text(0)?;
    cx.host.select(&Selection::Sketch(name.to_string()))?;
    Ok(output(json!({ "selected": name })))
}
