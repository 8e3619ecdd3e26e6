//! Purpose: Provide the internal runtime JSON decode entrypoint.
//! Exports: `from_slice`.
//! Role: Parser boundary that centralizes simd-json usage details.
//! Invariants: Input buffers are copied once to satisfy simd-json mutable-slice API.
//! Notes: Error mapping is done by callsites so path and id context stays explicit.

use serde::de::DeserializeOwned;

pub(crate) fn from_slice<T: DeserializeOwned>(input: &[u8]) -> Result<T, simd_json::Error> {
    let mut bytes = input.to_vec();
    simd_json::serde::from_slice(&mut bytes)
}
