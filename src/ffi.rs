//! C ABI surface: `kernel_create`/`kernel_destroy`/`trata_interrupcao`.
//!
//! Follows the same opaque-pointer pattern as the rest of this lineage's FFI
//! work: a boxed value is leaked across the boundary with `Box::into_raw` and
//! reclaimed with `Box::from_raw`; callers never see the Rust type, only a
//! pointer they're obligated to pass back exactly once to `kernel_destroy`.
//!
//! `trata_interrupcao` bundles its own [`crate::sim`] harness internally so
//! the exported signature needs only the kernel handle and the IRQ code,
//! matching the original entry point's arity. A host that owns a real
//! simulated CPU would instead call [`crate::kernel::Kernel::handle_interrupt`]
//! directly from Rust or C++, bypassing this shim.

use std::os::raw::c_int;

use crate::config::Config;
use crate::kernel::{DispatchAction, Kernel};
use crate::sim::{FakeBus, FlatMemory, ImageLoader};

/// Bundles a kernel with the demo harness it drives itself through.
pub struct KernelHandle {
    kernel: Kernel,
    mem: FlatMemory,
    io: FakeBus,
    loader: ImageLoader,
}

/// Allocates a kernel with default configuration and an empty demo harness.
/// Returns null on allocation failure (never, in practice, but kept for ABI
/// symmetry with fallible constructors elsewhere in this family of bindings).
#[no_mangle]
pub extern "C" fn kernel_create() -> *mut KernelHandle {
    let handle = KernelHandle {
        kernel: Kernel::new(Config::default()),
        mem: FlatMemory::new(),
        io: FakeBus::new(),
        loader: ImageLoader::new(),
    };
    Box::into_raw(Box::new(handle))
}

/// Reclaims a handle returned by [`kernel_create`]. Passing the same pointer
/// twice, or a pointer not obtained from `kernel_create`, is undefined
/// behavior, same as any other boxed-handle FFI boundary.
#[no_mangle]
pub extern "C" fn kernel_destroy(handle: *mut KernelHandle) {
    if handle.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(handle));
    }
}

/// Registers an in-memory image under `name`, for the bundled demo harness'
/// [`ImageLoader`] to hand back on `spawn`/reset.
///
/// # Safety
/// `handle` must be a live pointer from [`kernel_create`]; `name` must point
/// to a valid, NUL-terminated C string for the duration of this call.
#[no_mangle]
pub unsafe extern "C" fn kernel_register_image(
    handle: *mut KernelHandle,
    name: *const std::os::raw::c_char,
    load_address: c_int,
    bytes: *const c_int,
    len: usize,
) {
    if handle.is_null() || name.is_null() {
        return;
    }
    let handle = &mut *handle;
    let name = std::ffi::CStr::from_ptr(name).to_string_lossy().into_owned();
    let body: Vec<i32> = if bytes.is_null() || len == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(bytes, len).to_vec()
    };
    handle.loader.register(&name, load_address, &body);
}

/// Drives one kernel entry. Returns 0 (resume) or 1 (halt), matching the
/// original entry point's return convention.
///
/// # Safety
/// `handle` must be a live pointer from [`kernel_create`].
#[no_mangle]
pub unsafe extern "C" fn trata_interrupcao(handle: *mut KernelHandle, irq_kind: c_int) -> c_int {
    if handle.is_null() {
        return 1;
    }
    let handle = &mut *handle;
    let result = handle.kernel.handle_interrupt(
        irq_kind.into(),
        &mut handle.mem,
        &mut handle.io,
        &handle.loader,
    );
    match result {
        Ok(DispatchAction::Resume) => 0,
        Ok(DispatchAction::Halt) => 1,
        Err(err) => {
            log::error!("kernel entry failed: {}", err);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_destroy_round_trip_does_not_leak_or_crash() {
        let handle = kernel_create();
        assert!(!handle.is_null());
        kernel_destroy(handle);
    }

    #[test]
    fn destroy_null_is_a_no_op() {
        kernel_destroy(std::ptr::null_mut());
    }

    #[test]
    fn full_reset_cycle_through_the_c_abi() {
        let handle = kernel_create();
        let name = std::ffi::CString::new("init.maq").unwrap();
        unsafe {
            kernel_register_image(handle, name.as_ptr(), 100, std::ptr::null(), 0);
            let resumed = trata_interrupcao(handle, 0); // RESET
            assert_eq!(resumed, 0);
            kernel_destroy(handle);
        }
    }
}
