//! 時計の能力インターフェース
//!
//! マネージャー本体は時刻を引数で受け取るので時計に依存しない。
//! 時計はマネージャーを駆動する側（接続のイベントループ、テスト）が持つ。

use core::time::Duration;

use crate::Timestamp;

/// 現在時刻を返す能力
pub trait Clock {
    /// 現在時刻（単調増加）
    fn now(&self) -> Timestamp;
}

/// 手動で進める時計
///
/// テストと、時刻を外部から注入するホスト（JS の `Date.now()`）用。
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Timestamp,
}

impl ManualClock {
    /// 起点（0）から始まる時計を生成する
    pub fn new() -> Self {
        Self::default()
    }

    /// 時計を `delta` だけ進める
    pub fn advance(&mut self, delta: Duration) {
        self.now = self.now + delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now
    }
}
