//! 単発アラーム（Schedulable Deadline）
//!
//! 期限を 1 つだけ保持できるタイマーの能力インターフェース。
//! 1 回のセットにつき最大 1 回だけ発火する。実際に時刻を待って
//! ハンドラを呼ぶのはイベントループ側で、このトレイトは状態の操作と参照のみを定義する。
//!
//! ## 発火の流れ
//!
//! ```text
//! owner.set_alarm() → Alarm::set(deadline)
//! event loop: alarm.is_due(now) → handler (PingManager::on_alarm)
//! handler: Alarm::cancel()（発火済みの期限を消費）
//! owner.stop()      → Alarm::permanent_cancel()（以後の set は無視）
//! ```

use crate::Timestamp;

/// 単発アラームの能力
///
/// `cancel` は冪等（セットされていないアラームの cancel は何もしない）。
pub trait Alarm {
    /// 期限をセットする。既にセットされていれば置き換える
    fn set(&mut self, deadline: Timestamp);

    /// セット済みの期限を取り消す
    fn cancel(&mut self);

    /// 期限がセットされているか
    fn is_set(&self) -> bool;

    /// セット中の期限（未セットなら None）
    fn deadline(&self) -> Option<Timestamp>;

    /// 期限を解除し、以後の `set` をすべて無視する（接続終了時）
    fn permanent_cancel(&mut self);

    /// `now` 時点で発火すべきか
    fn is_due(&self, now: Timestamp) -> bool {
        self.deadline().is_some_and(|deadline| deadline <= now)
    }
}

impl<A: Alarm + ?Sized> Alarm for &mut A {
    fn set(&mut self, deadline: Timestamp) {
        (**self).set(deadline)
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }

    fn is_set(&self) -> bool {
        (**self).is_set()
    }

    fn deadline(&self) -> Option<Timestamp> {
        (**self).deadline()
    }

    fn permanent_cancel(&mut self) {
        (**self).permanent_cancel()
    }
}

/// メモリ上の単発アラーム
///
/// 自分では待機しない。イベントループ（またはテスト）が `take_due` で
/// 発火を取り出してからハンドラを呼ぶ。
#[derive(Debug, Clone, Default)]
pub struct ManualAlarm {
    /// セット中の期限
    deadline: Option<Timestamp>,
    /// 永久キャンセル済み（接続終了後）。以後の set は無視する
    permanently_cancelled: bool,
}

impl ManualAlarm {
    /// 未セットのアラームを生成する
    pub fn new() -> Self {
        Self::default()
    }

    /// `now` 時点で期限が来ていれば解除して true を返す
    ///
    /// 1 回のセットにつき true を返すのは最大 1 回。
    pub fn take_due(&mut self, now: Timestamp) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}

impl Alarm for ManualAlarm {
    fn set(&mut self, deadline: Timestamp) {
        if self.permanently_cancelled {
            return;
        }
        self.deadline = Some(deadline);
    }

    fn cancel(&mut self) {
        self.deadline = None;
    }

    fn is_set(&self) -> bool {
        self.deadline.is_some()
    }

    fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    fn permanent_cancel(&mut self) {
        self.deadline = None;
        self.permanently_cancelled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_cancel() {
        let mut alarm = ManualAlarm::new();
        assert!(!alarm.is_set());
        assert_eq!(alarm.deadline(), None);

        alarm.set(Timestamp::from_millis(100));
        assert!(alarm.is_set());
        assert_eq!(alarm.deadline(), Some(Timestamp::from_millis(100)));

        alarm.cancel();
        assert!(!alarm.is_set());

        // 未セットの cancel は何もしない
        alarm.cancel();
        assert!(!alarm.is_set());
    }

    #[test]
    fn test_set_replaces_deadline() {
        let mut alarm = ManualAlarm::new();
        alarm.set(Timestamp::from_millis(100));
        alarm.set(Timestamp::from_millis(50));
        assert_eq!(alarm.deadline(), Some(Timestamp::from_millis(50)));
    }

    #[test]
    fn test_take_due_fires_once() {
        let mut alarm = ManualAlarm::new();
        alarm.set(Timestamp::from_millis(100));

        assert!(!alarm.take_due(Timestamp::from_millis(99)), "期限前は発火しない");
        assert!(alarm.is_set());

        assert!(alarm.take_due(Timestamp::from_millis(100)));
        assert!(!alarm.is_set(), "発火後は未セットに戻る");
        assert!(!alarm.take_due(Timestamp::from_millis(200)), "2 回目は発火しない");
    }

    #[test]
    fn test_permanent_cancel_ignores_set() {
        let mut alarm = ManualAlarm::new();
        alarm.set(Timestamp::from_millis(100));
        alarm.permanent_cancel();
        assert!(!alarm.is_set());

        alarm.set(Timestamp::from_millis(200));
        assert!(!alarm.is_set());
        assert!(!alarm.take_due(Timestamp::from_millis(300)));
    }

    #[test]
    fn test_permanent_cancel_through_borrow() {
        fn shut_down<A: Alarm>(mut alarm: A) {
            alarm.permanent_cancel();
        }

        let mut alarm = ManualAlarm::new();
        alarm.set(Timestamp::from_millis(100));
        shut_down(&mut alarm);

        alarm.set(Timestamp::from_millis(200));
        assert_eq!(alarm.deadline(), None);
    }

    #[test]
    fn test_borrowed_alarm() {
        fn arm<A: Alarm>(mut alarm: A) -> bool {
            alarm.set(Timestamp::from_millis(10));
            alarm.is_due(Timestamp::from_millis(10))
        }

        let mut alarm = ManualAlarm::new();
        assert!(arm(&mut alarm));
        assert_eq!(alarm.deadline(), Some(Timestamp::from_millis(10)));
    }
}
