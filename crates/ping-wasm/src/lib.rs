//! # ping-wasm
//!
//! wasm-bindgen エクスポート：JS ホストから QUIC ping タイマーを駆動する公開 API。
//!
//! JS の `setTimeout` が単発アラームの役割を担う。`setAlarm` が返す期限で
//! タイマーを張り直し、発火したら `onAlarm` を呼ぶ。
//!
//! ## 使用方法（TypeScript）
//!
//! ```typescript
//! import { PingTimer, init_panic_hook } from '../ping-wasm-pkg/ping_wasm';
//!
//! init_panic_hook();
//!
//! const timer = new PingTimer("client", JSON.stringify({
//!     initial_retransmittable_on_wire_timeout_ms: 200,
//! }));
//!
//! let handle: NodeJS.Timeout | undefined;
//! function rearm(hasInFlight: boolean) {
//!     clearTimeout(handle);
//!     const deadline = timer.setAlarm(Date.now(), true, hasInFlight);
//!     if (deadline !== undefined) {
//!         handle = setTimeout(onTimer, Math.max(0, deadline - Date.now()));
//!     }
//! }
//!
//! function onTimer() {
//!     switch (timer.onAlarm(Date.now())) {
//!         case "keep_alive": sendPing(); break;
//!         case "retransmittable_on_wire": sendProbe(); break;
//!     }
//!     rearm(/* hasInFlight */ true);
//! }
//! ```

use wasm_bindgen::prelude::*;

mod console;
pub mod options;
pub mod timer;

pub use options::{OptionsError, PingOptions};
pub use timer::PingTimer;

/// パニック時にブラウザコンソールにスタックトレースを出力する
///
/// 開発時に必ず呼び出すこと。本番ビルドでは feature flag で無効化可能。
#[wasm_bindgen]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// 既定の設定を JSON 文字列で返す（設定 UI の初期値用）
#[wasm_bindgen(js_name = "defaultOptions")]
pub fn default_options() -> String {
    serde_json::to_string(&PingOptions::default()).unwrap_or_default()
}
