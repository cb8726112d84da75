//! Guest exports
//!
//! The import bindings exist before the instance does, yet some of them
//! must call back into guest exports. Each export is therefore held in a
//! forward-declared [`ExportSlot`], bound once the instance is known. Using
//! an unbound slot is a contract violation, never a silent no-op.

use wasmtime::{
    AsContext, AsContextMut, Global, Instance, Store, TypedFunc, Val, WasmParams, WasmResults,
};

use super::{ContractViolation, HostState, IntoTrap};
use crate::scheduler::GuestCallback;

/// A call target that may not exist yet
#[derive(Debug, Clone)]
pub struct ExportSlot<T> {
    name: &'static str,
    target: Option<T>,
}

impl<T: Clone> ExportSlot<T> {
    pub const fn unbound(name: &'static str) -> Self {
        Self { name, target: None }
    }

    pub fn bind(&mut self, target: T) {
        self.target = Some(target);
    }

    pub fn is_bound(&self) -> bool {
        self.target.is_some()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self) -> Result<T, ContractViolation> {
        self.target
            .clone()
            .ok_or(ContractViolation::UnboundExport(self.name))
    }
}

/// An export exists but its signature does not match
#[derive(Debug, thiserror::Error)]
#[error("export `{name}` has an unexpected type")]
pub struct ExportTypeError {
    pub name: String,
    #[source]
    pub source: anyhow::Error,
}

/// Optional exports the bindings call into
#[derive(Clone)]
pub struct GuestExports {
    pub run_callback: ExportSlot<TypedFunc<i32, ()>>,
    pub run_callback_int: ExportSlot<TypedFunc<(i32, i32), ()>>,
    pub run_callback_ptr: ExportSlot<TypedFunc<(i32, i32), ()>>,
    pub heap_base: ExportSlot<Global>,
}

impl Default for GuestExports {
    fn default() -> Self {
        Self {
            run_callback: ExportSlot::unbound("run_callback"),
            run_callback_int: ExportSlot::unbound("run_callback_int"),
            run_callback_ptr: ExportSlot::unbound("run_callback_ptr"),
            heap_base: ExportSlot::unbound("__heap_base"),
        }
    }
}

impl GuestExports {
    /// Bind every export the instance provides. Missing exports stay
    /// unbound; present ones with the wrong type are an error.
    pub fn resolve(
        instance: &Instance,
        store: &mut Store<HostState>,
    ) -> Result<Self, ExportTypeError> {
        let mut exports = Self::default();
        bind_func(&mut exports.run_callback, instance, store)?;
        bind_func(&mut exports.run_callback_int, instance, store)?;
        bind_func(&mut exports.run_callback_ptr, instance, store)?;
        if let Some(global) = instance.get_global(&mut *store, exports.heap_base.name()) {
            exports.heap_base.bind(global);
        }
        Ok(exports)
    }

    pub fn bound_names(&self) -> Vec<&'static str> {
        [
            (self.run_callback.name(), self.run_callback.is_bound()),
            (self.run_callback_int.name(), self.run_callback_int.is_bound()),
            (self.run_callback_ptr.name(), self.run_callback_ptr.is_bound()),
            (self.heap_base.name(), self.heap_base.is_bound()),
        ]
        .into_iter()
        .filter_map(|(name, bound)| bound.then_some(name))
        .collect()
    }
}

fn bind_func<P: WasmParams, R: WasmResults>(
    slot: &mut ExportSlot<TypedFunc<P, R>>,
    instance: &Instance,
    store: &mut Store<HostState>,
) -> Result<(), ExportTypeError> {
    let name = slot.name();
    if let Some(func) = instance.get_func(&mut *store, name) {
        let typed = func
            .typed::<P, R>(&*store)
            .map_err(|source| ExportTypeError {
                name: name.to_string(),
                source,
            })?;
        slot.bind(typed);
    }
    Ok(())
}

/// Invoke a scheduled callback through the matching `run_callback*` export
pub fn dispatch(
    mut store: impl AsContextMut<Data = HostState>,
    callback: GuestCallback,
) -> anyhow::Result<()> {
    match callback {
        GuestCallback::Plain { func } => {
            let target = exports(&store).run_callback.get().or_trap()?;
            target.call(&mut store, func)
        }
        GuestCallback::WithInt { func, param } => {
            let target = exports(&store).run_callback_int.get().or_trap()?;
            target.call(&mut store, (func, param))
        }
        GuestCallback::WithPtr { func, data } => {
            let target = exports(&store).run_callback_ptr.get().or_trap()?;
            target.call(&mut store, (func, data))
        }
    }
}

fn exports(store: &impl AsContext<Data = HostState>) -> &GuestExports {
    &store.as_context().data().exports
}

/// Read the `__heap_base` global
pub(super) fn heap_base(mut store: impl AsContextMut<Data = HostState>) -> anyhow::Result<i32> {
    let global = store.as_context().data().exports.heap_base.get().or_trap()?;
    match global.get(&mut store) {
        Val::I32(value) => Ok(value),
        _ => Err(ContractViolation::GlobalType("__heap_base")).or_trap(),
    }
}
