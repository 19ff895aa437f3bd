//! Entry point for the WASM application

pub fn main() {
    waybill_frontend::run();
}
