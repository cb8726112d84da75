//! Import bindings
//!
//! One host function per guest import. Pointers and `size_t` values arrive
//! as `i32` and are reinterpreted as unsigned guest addresses.

use std::time::Duration;

use wasmtime::{Caller, Linker, Memory};

use super::exports::{dispatch, heap_base};
use super::{ContractViolation, HostState, IntoTrap, TerminationSignal, IMPORT_MODULE};
use crate::gamepad::{GamepadSnapshot, Rumble};
use crate::handles::{Handle, HostObject};
use crate::memory;
use crate::scheduler::GuestCallback;

type Ctx<'a> = Caller<'a, HostState>;

pub(super) fn link(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    let env = IMPORT_MODULE;

    // Diagnostics
    linker.func_wrap(env, "JS_console_log", console_log)?;
    linker.func_wrap(env, "JS_console_error", console_error)?;

    // Scheduling
    linker.func_wrap(env, "JS_requestAnimationFrame", request_animation_frame)?;
    linker.func_wrap(env, "JS_requestAnimationFrame_data", request_animation_frame_data)?;
    linker.func_wrap(env, "JS_cancelAnimationFrame", cancel_animation_frame)?;
    linker.func_wrap(env, "JS_setTimeout", set_timeout)?;
    linker.func_wrap(env, "JS_clearTimeout", clear_timeout)?;

    // Time
    linker.func_wrap(env, "JS_Date_now", |caller: Ctx<'_>| caller.data().clock.date_now_ms())?;
    linker.func_wrap(env, "JS_performance_now", |caller: Ctx<'_>| {
        caller.data().clock.performance_now_ms()
    })?;

    // Terminal I/O
    linker.func_wrap(env, "JS_write", write)?;
    linker.func_wrap(env, "JS_read_char", |mut caller: Ctx<'_>| {
        caller.data_mut().terminal.read_char()
    })?;
    linker.func_wrap(env, "JS_get_terminal_width", |caller: Ctx<'_>| {
        saturate(caller.data().terminal.width())
    })?;
    linker.func_wrap(env, "JS_get_terminal_height", |caller: Ctx<'_>| {
        saturate(caller.data().terminal.height())
    })?;
    linker.func_wrap(env, "JS_get_memory_size", get_memory_size)?;
    linker.func_wrap(env, "JS_get_heap_base", |mut caller: Ctx<'_>| heap_base(&mut caller))?;

    // Handle-based device input
    linker.func_wrap(env, "JS_navigator_getGamepads", navigator_get_gamepads)?;
    linker.func_wrap(env, "JS_GamepadArray_get", gamepad_array_get)?;
    linker.func_wrap(env, "JS_Array_foreach", array_foreach)?;
    linker.func_wrap(env, "JS_Gamepad_get_id", gamepad_get_id)?;
    linker.func_wrap(env, "JS_Gamepad_get_index", |caller: Ctx<'_>, handle: i32| {
        with_gamepad(&caller, handle, |pad| saturate(pad.index as usize))
    })?;
    linker.func_wrap(env, "JS_Gamepad_get_connected", |caller: Ctx<'_>, handle: i32| {
        with_gamepad(&caller, handle, |pad| i32::from(pad.connected))
    })?;
    linker.func_wrap(env, "JS_Gamepad_get_axe", gamepad_get_axe)?;
    linker.func_wrap(env, "JS_Gamepad_get_button", gamepad_get_button)?;
    linker.func_wrap(env, "JS_Gamepad_get_axes_length", |caller: Ctx<'_>, handle: i32| {
        with_gamepad(&caller, handle, |pad| saturate(pad.axes.len()))
    })?;

    // Index-based device input
    linker.func_wrap(env, "JS_ongamepadconnected", |mut caller: Ctx<'_>, callback: i32| {
        caller.data_mut().gamepad_callbacks.connected = (callback != 0).then_some(callback);
    })?;
    linker.func_wrap(env, "JS_ongamepaddisconnected", |mut caller: Ctx<'_>, callback: i32| {
        caller.data_mut().gamepad_callbacks.disconnected = (callback != 0).then_some(callback);
    })?;
    linker.func_wrap(env, "JS_get_gamepad_buttons_count", |caller: Ctx<'_>, index: i32| {
        with_gamepad_at(&caller, "JS_get_gamepad_buttons_count", index, |pad| {
            saturate(pad.buttons.len())
        })
    })?;
    linker.func_wrap(env, "JS_get_gamepad_axis_count", |caller: Ctx<'_>, index: i32| {
        with_gamepad_at(&caller, "JS_get_gamepad_axis_count", index, |pad| {
            saturate(pad.axes.len())
        })
    })?;
    linker.func_wrap(env, "JS_get_gamepad_id", get_gamepad_id)?;
    linker.func_wrap(env, "JS_Gamepad_get_axis", gamepad_get_axis)?;
    linker.func_wrap(env, "JS_get_gamepad_button", get_gamepad_button)?;
    linker.func_wrap(env, "JS_gamepad_has_haptics", gamepad_has_haptics)?;
    // The guest ABI spells it this way; the corrected name is kept as an alias
    linker.func_wrap(env, "JS_gameapad_rumble", gamepad_rumble)?;
    linker.func_wrap(env, "JS_gamepad_rumble", gamepad_rumble)?;

    // Object lifecycle and exit
    linker.func_wrap(env, "JS_Object_free", object_free)?;
    linker.func_wrap(env, "_exit", exit)?;
    linker.func_wrap(env, "JS_exit", exit)?;

    Ok(())
}

fn saturate(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn guest_memory(caller: &Ctx<'_>) -> anyhow::Result<Memory> {
    caller.data().memory.ok_or(ContractViolation::NoMemory).or_trap()
}

fn guest_size(size: i32) -> usize {
    size as u32 as usize
}

fn non_null_callback(binding: &'static str, callback: i32) -> anyhow::Result<i32> {
    if callback == 0 {
        return Err(ContractViolation::NullCallback(binding)).or_trap();
    }
    Ok(callback)
}

fn element_index(binding: &'static str, index: i32) -> anyhow::Result<usize> {
    usize::try_from(index)
        .map_err(|_| ContractViolation::IndexOutOfRange { binding, index })
        .or_trap()
}

fn read_string(caller: &Ctx<'_>, ptr: i32) -> anyhow::Result<String> {
    let memory = guest_memory(caller)?;
    memory::read_c_string(memory.data(caller), ptr as u32).or_trap()
}

fn console_log(caller: Ctx<'_>, ptr: i32) -> anyhow::Result<()> {
    let message = read_string(&caller, ptr)?;
    tracing::info!(target: "guest", "{}", message.trim_end_matches('\n'));
    Ok(())
}

fn console_error(caller: Ctx<'_>, ptr: i32) -> anyhow::Result<()> {
    let message = read_string(&caller, ptr)?;
    tracing::error!(target: "guest", "{}", message.trim_end_matches('\n'));
    Ok(())
}

fn request_animation_frame(mut caller: Ctx<'_>, callback: i32) -> anyhow::Result<i32> {
    let func = non_null_callback("JS_requestAnimationFrame", callback)?;
    Ok(caller
        .data_mut()
        .scheduler
        .request_animation_frame(GuestCallback::Plain { func }))
}

fn request_animation_frame_data(
    mut caller: Ctx<'_>,
    callback: i32,
    data: i32,
) -> anyhow::Result<i32> {
    let func = non_null_callback("JS_requestAnimationFrame_data", callback)?;
    Ok(caller
        .data_mut()
        .scheduler
        .request_animation_frame(GuestCallback::WithPtr { func, data }))
}

fn cancel_animation_frame(mut caller: Ctx<'_>, id: i32) {
    caller.data_mut().scheduler.cancel_animation_frame(id);
}

fn set_timeout(mut caller: Ctx<'_>, callback: i32, delay_ms: i32) -> anyhow::Result<i32> {
    let func = non_null_callback("JS_setTimeout", callback)?;
    // Negative delays behave like zero
    let delay = Duration::from_millis(u64::try_from(delay_ms).unwrap_or(0));
    let state = caller.data_mut();
    let now = state.clock.elapsed();
    Ok(state
        .scheduler
        .set_timeout(GuestCallback::Plain { func }, delay, now))
}

fn clear_timeout(mut caller: Ctx<'_>, id: i32) {
    caller.data_mut().scheduler.clear_timeout(id);
}

fn write(mut caller: Ctx<'_>, ptr: i32, count: i32) -> anyhow::Result<()> {
    let memory = guest_memory(&caller)?;
    let (data, state) = memory.data_and_store_mut(&mut caller);
    let bytes = memory::slice(data, ptr as u32, guest_size(count)).or_trap()?;
    state.terminal.set_content(bytes).or_trap()
}

fn get_memory_size(caller: Ctx<'_>) -> anyhow::Result<i32> {
    let memory = guest_memory(&caller)?;
    Ok(saturate(memory.data_size(&caller)))
}

fn navigator_get_gamepads(mut caller: Ctx<'_>) -> i32 {
    let state = caller.data_mut();
    let list = state.gamepads.snapshot_list();
    let handle = state.handles.add(HostObject::GamepadList(list));
    tracing::debug!(%handle, "gamepad list issued");
    handle.raw()
}

fn gamepad_array_get(mut caller: Ctx<'_>, list: i32, index: i32) -> anyhow::Result<i32> {
    let index = element_index("JS_GamepadArray_get", index)?;
    let state = caller.data_mut();
    let pad = state
        .handles
        .gamepad_list(Handle::from_raw(list))
        .or_trap()?
        .get(index)
        .cloned()
        .flatten();
    Ok(state.handles.add_optional(pad.map(HostObject::Gamepad)).raw())
}

fn array_foreach(mut caller: Ctx<'_>, array: i32, callback: i32) -> anyhow::Result<()> {
    let func = non_null_callback("JS_Array_foreach", callback)?;
    let elements = caller
        .data()
        .handles
        .array_elements(Handle::from_raw(array))
        .or_trap()?;

    for element in elements {
        let handle = caller.data_mut().handles.add_optional(element);
        dispatch(
            &mut caller,
            GuestCallback::WithInt {
                func,
                param: handle.raw(),
            },
        )?;
    }
    Ok(())
}

fn with_gamepad<T>(
    caller: &Ctx<'_>,
    handle: i32,
    f: impl FnOnce(&GamepadSnapshot) -> T,
) -> anyhow::Result<T> {
    caller
        .data()
        .handles
        .gamepad(Handle::from_raw(handle))
        .map(f)
        .or_trap()
}

fn gamepad_get_id(mut caller: Ctx<'_>, handle: i32, ptr: i32, size: i32) -> anyhow::Result<()> {
    let memory = guest_memory(&caller)?;
    let (data, state) = memory.data_and_store_mut(&mut caller);
    let pad = state.handles.gamepad(Handle::from_raw(handle)).or_trap()?;
    memory::write_bounded_string(data, ptr as u32, guest_size(size), &pad.id).or_trap()
}

fn gamepad_get_axe(caller: Ctx<'_>, handle: i32, axis: i32) -> anyhow::Result<f32> {
    let slot = element_index("JS_Gamepad_get_axe", axis)?;
    with_gamepad(&caller, handle, |pad| pad.axes.get(slot).copied())?
        .ok_or(ContractViolation::IndexOutOfRange {
            binding: "JS_Gamepad_get_axe",
            index: axis,
        })
        .or_trap()
}

fn gamepad_get_button(caller: Ctx<'_>, handle: i32, button: i32) -> anyhow::Result<i32> {
    let slot = element_index("JS_Gamepad_get_button", button)?;
    with_gamepad(&caller, handle, |pad| pad.buttons.get(slot).copied())?
        .map(i32::from)
        .ok_or(ContractViolation::IndexOutOfRange {
            binding: "JS_Gamepad_get_button",
            index: button,
        })
        .or_trap()
}

fn with_gamepad_at<T>(
    caller: &Ctx<'_>,
    binding: &'static str,
    index: i32,
    f: impl FnOnce(&GamepadSnapshot) -> T,
) -> anyhow::Result<T> {
    let slot = element_index(binding, index)?;
    caller
        .data()
        .gamepads
        .get(slot as u32)
        .map(f)
        .ok_or(ContractViolation::NoGamepad { binding, index })
        .or_trap()
}

fn get_gamepad_id(mut caller: Ctx<'_>, index: i32, ptr: i32, size: i32) -> anyhow::Result<()> {
    let mut id = with_gamepad_at(&caller, "JS_get_gamepad_id", index, |pad| pad.id.clone())?;
    // Terminated when it fits, truncated otherwise
    id.push('\0');
    let memory = guest_memory(&caller)?;
    let dst =
        memory::slice_mut(memory.data_mut(&mut caller), ptr as u32, guest_size(size)).or_trap()?;
    memory::copy_bytes(dst, id.as_bytes());
    Ok(())
}

fn gamepad_get_axis(caller: Ctx<'_>, index: i32, axis: i32) -> anyhow::Result<f32> {
    let binding = "JS_Gamepad_get_axis";
    let slot = element_index(binding, axis)?;
    with_gamepad_at(&caller, binding, index, |pad| pad.axes.get(slot).copied())?
        .ok_or(ContractViolation::IndexOutOfRange { binding, index: axis })
        .or_trap()
}

fn get_gamepad_button(caller: Ctx<'_>, index: i32, button: i32) -> anyhow::Result<i32> {
    let binding = "JS_get_gamepad_button";
    let slot = element_index(binding, button)?;
    with_gamepad_at(&caller, binding, index, |pad| pad.buttons.get(slot).copied())?
        .map(i32::from)
        .ok_or(ContractViolation::IndexOutOfRange {
            binding,
            index: button,
        })
        .or_trap()
}

fn gamepad_has_haptics(caller: Ctx<'_>, index: i32) -> anyhow::Result<i32> {
    let slot = element_index("JS_gamepad_has_haptics", index)?;
    Ok(i32::from(caller.data().gamepads.has_haptics(slot as u32)))
}

fn gamepad_rumble(
    mut caller: Ctx<'_>,
    index: i32,
    low_frequency: i32,
    high_frequency: i32,
    duration_ms: i32,
) -> anyhow::Result<()> {
    let slot = element_index("JS_gamepad_rumble", index)?;
    let rumble = Rumble::new(low_frequency, high_frequency, duration_ms).or_trap()?;
    caller.data_mut().gamepads.rumble(slot as u32, rumble);
    Ok(())
}

fn object_free(mut caller: Ctx<'_>, handle: i32) -> anyhow::Result<()> {
    let handle = Handle::from_raw(handle);
    caller.data_mut().handles.remove(handle).or_trap()?;
    tracing::debug!(%handle, "object freed");
    Ok(())
}

fn exit(_caller: Ctx<'_>, status: i32) -> anyhow::Result<()> {
    tracing::info!(status, "guest requested exit");
    Err(anyhow::Error::new(TerminationSignal { status }))
}
