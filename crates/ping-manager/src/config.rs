//! ping タイマーの設定
//!
//! プロセス全体のフラグではなく、マネージャーごとのインスタンス設定として持つ。
//! 接続ごとに独立してしきい値を変えられ、テストも個別に設定できる。

use core::time::Duration;

use crate::{
    DEFAULT_MAX_AGGRESSIVE_RETRANSMITTABLE_ON_WIRE_COUNT,
    DEFAULT_MAX_RETRANSMITTABLE_ON_WIRE_PING_COUNT, PING_TIMEOUT,
};

/// ping タイマーの設定値
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingConfig {
    /// keep-alive の間隔
    pub keep_alive_timeout: Duration,
    /// ROW プローブの初期間隔。`Duration::ZERO` でプローブ無効
    pub initial_retransmittable_on_wire_timeout: Duration,
    /// この回数（連続発火数）まではバックオフしない
    pub max_aggressive_retransmittable_on_wire_count: u32,
    /// 連続発火数がこれを超えたらプローブを止める（0 = 無制限）
    pub max_retransmittable_on_wire_ping_count: u32,
}

impl PingConfig {
    /// 既定値の設定（keep-alive 15 秒、プローブ無効）
    pub const fn new() -> Self {
        PingConfig {
            keep_alive_timeout: PING_TIMEOUT,
            initial_retransmittable_on_wire_timeout: Duration::ZERO,
            max_aggressive_retransmittable_on_wire_count:
                DEFAULT_MAX_AGGRESSIVE_RETRANSMITTABLE_ON_WIRE_COUNT,
            max_retransmittable_on_wire_ping_count: DEFAULT_MAX_RETRANSMITTABLE_ON_WIRE_PING_COUNT,
        }
    }

    pub const fn with_keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.keep_alive_timeout = timeout;
        self
    }

    pub const fn with_initial_retransmittable_on_wire_timeout(mut self, timeout: Duration) -> Self {
        self.initial_retransmittable_on_wire_timeout = timeout;
        self
    }

    pub const fn with_max_aggressive_retransmittable_on_wire_count(mut self, count: u32) -> Self {
        self.max_aggressive_retransmittable_on_wire_count = count;
        self
    }

    pub const fn with_max_retransmittable_on_wire_ping_count(mut self, count: u32) -> Self {
        self.max_retransmittable_on_wire_ping_count = count;
        self
    }

    /// ROW プローブが設定上有効か（初期間隔が 0 でない）
    pub fn retransmittable_on_wire_enabled(&self) -> bool {
        !self.initial_retransmittable_on_wire_timeout.is_zero()
    }
}

impl Default for PingConfig {
    fn default() -> Self {
        Self::new()
    }
}
