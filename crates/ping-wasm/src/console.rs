//! JS コンソールへのログ出力
//!
//! wasm32 以外（native テスト）では何もしない。web-sys の関数は
//! wasm 以外のターゲットで呼ぶとパニックするため。

#[cfg(target_arch = "wasm32")]
pub(crate) fn debug(message: &str) {
    web_sys::console::debug_1(&wasm_bindgen::JsValue::from_str(message));
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn debug(_message: &str) {}
