//! 単調時刻（マイクロ秒）
//!
//! QUIC の ping タイマーはミリ秒未満の差分（アラーム粒度 1ms）を扱うため、
//! 内部表現はマイクロ秒の u64 とする。起点は任意（接続の時計が決める）で、
//! 比較と差分計算にのみ意味がある。

use core::ops::{Add, Sub};
use core::time::Duration;

/// 単調時刻（起点からのマイクロ秒）
///
/// u64 マイクロ秒は約 58 万年分あるので、通常の加算でオーバーフローは起きない。
/// ただし設定値由来の大きな Duration を足す経路では `checked_add` を使うこと。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// 時計の起点
    pub const ZERO: Self = Timestamp(0);

    /// マイクロ秒から生成する
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// ミリ秒から生成する
    ///
    /// # 引数
    /// - `millis`: 起点からのミリ秒（WASM 環境では JS の Date.now() から注入）
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis.saturating_mul(1000))
    }

    /// 起点からのマイクロ秒
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// 起点からのミリ秒（JS に返す用の浮動小数点表現）
    pub fn as_millis_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Duration を加算する。u64 マイクロ秒に収まらなければ None
    pub fn checked_add(self, delta: Duration) -> Option<Self> {
        let micros = u64::try_from(delta.as_micros()).ok()?;
        self.0.checked_add(micros).map(Timestamp)
    }

    /// `earlier` からの経過時間。`earlier` の方が新しければ 0
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    /// オーバーフロー時はパニックする（通常の時刻計算用）
    fn add(self, delta: Duration) -> Timestamp {
        self.checked_add(delta)
            .unwrap_or_else(|| panic!("timestamp overflow: {:?} + {:?}", self, delta))
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    /// 2 つの時刻の差。負になる場合は 0 に丸める
    fn sub(self, earlier: Timestamp) -> Duration {
        self.saturating_duration_since(earlier)
    }
}
