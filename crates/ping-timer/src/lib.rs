//! # ping-timer
//!
//! ping タイマーが使う時刻プリミティブと、単発アラーム（Schedulable Deadline）の能力インターフェース。
//!
//! ## 構成
//!
//! ```text
//! Timestamp    - マイクロ秒精度の単調時刻
//! Clock        - 現在時刻を返す能力（ManualClock はテスト・JS ホスト用）
//! Alarm        - 期限を 1 つだけ保持できる単発タイマー（ManualAlarm はメモリ上の実装）
//! ```
//!
//! アラームの実際の待機（イベントループ、JS の setTimeout 等）はこのクレートの外側が担当する。
//! このクレートは「いつ発火すべきか」を保持するだけで、自分からは何も起動しない。

#![no_std]

pub mod alarm;
pub mod clock;
pub mod timestamp;

pub use alarm::{Alarm, ManualAlarm};
pub use clock::{Clock, ManualClock};
pub use timestamp::Timestamp;
