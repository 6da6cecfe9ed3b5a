//! PingTimer wasm-bindgen エクスポート
//!
//! ping マネージャーを JS ホストから駆動するためのラッパー。
//! アラームはメモリ上の `ManualAlarm` で、実際の待機は JS の setTimeout が担当する。

use serde::Serialize;
use wasm_bindgen::prelude::*;

use ping_manager::{Perspective, PingConfig, PingDelegate, PingManager, TimeoutReason};
use ping_timer::{Alarm, ManualAlarm, Timestamp};

use crate::console;
use crate::options::{self, duration_to_ms, OptionsError, PingOptions};

/// 発火したタイムアウトを `onAlarm` の戻り値として JS に返すためのデリゲート
#[derive(Debug, Default)]
struct FiredTimeout {
    reason: Option<TimeoutReason>,
}

impl PingDelegate for FiredTimeout {
    fn on_keep_alive_timeout(&mut self) {
        self.reason = Some(TimeoutReason::KeepAlive);
    }

    fn on_retransmittable_on_wire_timeout(&mut self) {
        self.reason = Some(TimeoutReason::RetransmittableOnWire);
    }
}

/// `getStats` の JSON
#[derive(Debug, Serialize)]
struct StatsJson {
    perspective: &'static str,
    armed_reason: Option<&'static str>,
    deadline_ms: Option<f64>,
    consecutive_retransmittable_on_wire_count: u32,
    retransmittable_on_wire_count: u64,
    keep_alive_count: u64,
    keep_alive_timeout_ms: f64,
    initial_retransmittable_on_wire_timeout_ms: f64,
    stopped: bool,
}

/// QUIC ping タイマー
///
/// ## スレッド安全性
///
/// WASM はシングルスレッドのため、JS からは単一スレッドで呼び出される前提。
#[wasm_bindgen]
pub struct PingTimer {
    manager: PingManager<FiredTimeout, ManualAlarm>,
}

#[wasm_bindgen]
impl PingTimer {
    /// ping タイマーを初期化する
    ///
    /// # 引数
    /// - `perspective`: `"client"` または `"server"`
    /// - `options_json`: 設定の JSON（省略時は既定値。`PingOptions` を参照）
    ///
    /// # エラー
    /// - perspective が不正
    /// - JSON のパース失敗、時間の値が不正
    #[wasm_bindgen(constructor)]
    pub fn new(perspective: &str, options_json: Option<String>) -> Result<PingTimer, JsError> {
        let perspective = options::parse_perspective(perspective).map_err(to_js_error)?;
        let config = match options_json {
            Some(json) => PingOptions::from_json(&json)
                .and_then(|options| options.to_config())
                .map_err(to_js_error)?,
            None => PingConfig::default(),
        };
        Ok(Self::with_config(perspective, config))
    }

    /// 送受信状態の変化後に呼び、アラームをセットし直す
    ///
    /// # 引数
    /// - `now_ms`: 現在時刻（`Date.now()`）
    /// - `should_keep_alive`: 接続維持が必要か
    /// - `has_in_flight_packets`: 未 ACK のパケットがあるか
    ///
    /// # 戻り値
    /// JS タイマーを張るべき時刻（ミリ秒）。アラーム解除なら `undefined`
    #[wasm_bindgen(js_name = "setAlarm")]
    pub fn set_alarm(&mut self, now_ms: f64, should_keep_alive: bool, has_in_flight_packets: bool) -> Option<f64> {
        self.manager
            .set_alarm(timestamp_from_ms(now_ms), should_keep_alive, has_in_flight_packets);
        self.deadline_ms()
    }

    /// JS タイマー発火時に呼ぶ
    ///
    /// # 戻り値
    /// - `"keep_alive"`: ping を送ること
    /// - `"retransmittable_on_wire"`: プローブを送ること
    /// - `"none"`: 期限前・解除済みの古いタイマー（何もしない）
    ///
    /// どの場合もアラームは自動では張り直されない。送信後に `setAlarm` を呼ぶこと。
    #[wasm_bindgen(js_name = "onAlarm")]
    pub fn on_alarm(&mut self, now_ms: f64) -> String {
        let now = timestamp_from_ms(now_ms);
        if !self.manager.alarm_mut().take_due(now) {
            return String::from("none");
        }
        self.manager.on_alarm(now);
        match self.manager.delegate_mut().reason.take() {
            Some(reason) => {
                console::debug(&format!("ping timeout: {}", reason.as_str()));
                String::from(reason.as_str())
            }
            None => String::from("none"),
        }
    }

    /// アラームがセットされているか
    #[wasm_bindgen(js_name = "isArmed")]
    pub fn is_armed(&self) -> bool {
        self.manager.alarm().is_set()
    }

    /// セット中の期限（ミリ秒）
    #[wasm_bindgen(js_name = "deadlineMs")]
    pub fn deadline_ms(&self) -> Option<f64> {
        self.manager.alarm().deadline().map(|deadline| deadline.as_millis_f64())
    }

    /// keep-alive の間隔を変更する
    #[wasm_bindgen(js_name = "setKeepAliveTimeoutMs")]
    pub fn set_keep_alive_timeout_ms(&mut self, timeout_ms: f64) -> Result<(), JsError> {
        let timeout = options::duration_from_ms("keep_alive_timeout_ms", timeout_ms).map_err(to_js_error)?;
        if timeout.is_zero() {
            return Err(to_js_error(OptionsError::InvalidDuration {
                field: "keep_alive_timeout_ms",
                value: timeout_ms,
            }));
        }
        self.manager.set_keep_alive_timeout(timeout);
        Ok(())
    }

    /// ROW プローブの初期間隔を変更する（0 で無効）
    #[wasm_bindgen(js_name = "setInitialRetransmittableOnWireTimeoutMs")]
    pub fn set_initial_retransmittable_on_wire_timeout_ms(&mut self, timeout_ms: f64) -> Result<(), JsError> {
        let timeout = options::duration_from_ms("initial_retransmittable_on_wire_timeout_ms", timeout_ms)
            .map_err(to_js_error)?;
        self.manager.set_initial_retransmittable_on_wire_timeout(timeout);
        Ok(())
    }

    /// 連続プローブ数をリセットする（ハンドシェイク完了、パス確認時など）
    #[wasm_bindgen(js_name = "resetConsecutiveRetransmittableOnWireCount")]
    pub fn reset_consecutive_retransmittable_on_wire_count(&mut self) {
        self.manager.reset_consecutive_retransmittable_on_wire_count();
    }

    /// タイマーを停止する（接続終了時）。以後 `setAlarm` は何もしない
    #[wasm_bindgen]
    pub fn stop(&mut self) {
        self.manager.stop();
        console::debug("ping timer stopped");
    }

    /// 統計情報を JSON 文字列で返す
    ///
    /// # 戻り値
    /// JSON 文字列:
    /// ```json
    /// {
    ///   "perspective": "client",
    ///   "armed_reason": "retransmittable_on_wire",
    ///   "deadline_ms": 1700000000200.0,
    ///   "consecutive_retransmittable_on_wire_count": 2,
    ///   "retransmittable_on_wire_count": 7,
    ///   "keep_alive_count": 1,
    ///   "keep_alive_timeout_ms": 15000.0,
    ///   "initial_retransmittable_on_wire_timeout_ms": 200.0,
    ///   "stopped": false
    /// }
    /// ```
    #[wasm_bindgen(js_name = "getStats")]
    pub fn get_stats(&self) -> String {
        let stats = self.manager.stats();
        let json = StatsJson {
            perspective: self.manager.perspective().as_str(),
            armed_reason: stats.armed_reason.map(|reason| reason.as_str()),
            deadline_ms: stats.deadline.map(|deadline| deadline.as_millis_f64()),
            consecutive_retransmittable_on_wire_count: stats.consecutive_retransmittable_on_wire_count,
            retransmittable_on_wire_count: stats.retransmittable_on_wire_count,
            keep_alive_count: stats.keep_alive_count,
            keep_alive_timeout_ms: duration_to_ms(self.manager.keep_alive_timeout()),
            initial_retransmittable_on_wire_timeout_ms: duration_to_ms(
                self.manager.initial_retransmittable_on_wire_timeout(),
            ),
            stopped: self.manager.is_stopped(),
        };
        serde_json::to_string(&json).unwrap_or_default()
    }
}

impl PingTimer {
    /// 設定済みの `PingConfig` から生成する（Rust 側から使う場合）
    pub fn with_config(perspective: Perspective, config: PingConfig) -> Self {
        PingTimer {
            manager: PingManager::with_config(perspective, FiredTimeout::default(), ManualAlarm::new(), config),
        }
    }

    /// 連続プローブ数（テスト・デバッグ用）
    pub fn consecutive_retransmittable_on_wire_count(&self) -> u32 {
        self.manager.consecutive_retransmittable_on_wire_count()
    }
}

/// JS の `Date.now()`（ミリ秒）を Timestamp に変換する。負数・NaN は 0 扱い
fn timestamp_from_ms(now_ms: f64) -> Timestamp {
    Timestamp::from_micros((now_ms * 1000.0) as u64)
}

fn to_js_error(e: OptionsError) -> JsError {
    JsError::new(&format!("{}", e))
}
