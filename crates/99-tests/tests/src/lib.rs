//! End-to-end tests: controller and host loop on real files and threads.

#[cfg(all(test, not(target_arch = "wasm32")))]
mod support;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod native_e2e;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod misuse;
