//! Generates foreign bindings for `securekv-core` built with `--features ffi`.

fn main() {
    uniffi::uniffi_bindgen_main();
}
