//! ping タイムアウトマネージャー
//!
//! keep-alive と retransmittable-on-wire (ROW) の 2 つの期限を裁定し、
//! 早い方だけを単発アラームにセットする。
//!
//! ## 不変条件
//!
//! - アラームにセットされる期限は常に 2 つのうち早い方で、理由は 1 つだけ
//! - ROW の期限は keep-alive の期限以前（同時刻なら ROW を優先）
//! - 連続 ROW カウンタが変わるのは ROW の発火と明示的なリセットのみ

use core::time::Duration;

use ping_timer::{Alarm, Timestamp};
use tracing::{debug, trace};

use crate::{PingConfig, PingDelegate, Perspective, TimeoutReason};

/// ping タイムアウトマネージャー
///
/// デリゲートとアラームは外部から注入する。`&mut` で渡せば呼び出し側が所有したまま
/// 借用でき、借用期間がマネージャーの生存期間を上回ることはコンパイラが保証する。
///
/// ## スレッド安全性
///
/// 接続の処理ループから単一スレッドで駆動する前提。内部で同期は取らない。
pub struct PingManager<D: PingDelegate, A: Alarm> {
    /// ログと統計用。期限の裁定には使わない
    perspective: Perspective,
    delegate: D,
    alarm: A,
    config: PingConfig,
    /// 次に keep-alive を送るべき時刻
    keep_alive_deadline: Option<Timestamp>,
    /// 次に ROW プローブを送るべき時刻（プローブが有効な間のみ）
    retransmittable_on_wire_deadline: Option<Timestamp>,
    /// アラームにセット中の期限とその理由（発火時の判定用）
    armed: Option<(TimeoutReason, Timestamp)>,
    /// 連続して発火した ROW の回数（バックオフと上限判定に使う）
    consecutive_retransmittable_on_wire_count: u32,
    /// ROW 発火の累計（統計用）
    retransmittable_on_wire_count: u64,
    /// keep-alive 発火の累計（統計用）
    keep_alive_count: u64,
    /// `stop()` 済み。以後 `set_alarm` は何もしない
    stopped: bool,
}

impl<D: PingDelegate, A: Alarm> PingManager<D, A> {
    /// 既定設定のマネージャーを生成する
    ///
    /// # 引数
    /// - `perspective`: 接続の役割
    /// - `delegate`: タイムアウト通知の受け手
    /// - `alarm`: 期限を保持する単発アラーム（イベントループが待機を担当する）
    pub fn new(perspective: Perspective, delegate: D, alarm: A) -> Self {
        Self::with_config(perspective, delegate, alarm, PingConfig::default())
    }

    /// 設定を指定してマネージャーを生成する
    pub fn with_config(perspective: Perspective, delegate: D, alarm: A, config: PingConfig) -> Self {
        PingManager {
            perspective,
            delegate,
            alarm,
            config,
            keep_alive_deadline: None,
            retransmittable_on_wire_deadline: None,
            armed: None,
            consecutive_retransmittable_on_wire_count: 0,
            retransmittable_on_wire_count: 0,
            keep_alive_count: 0,
            stopped: false,
        }
    }

    /// 送受信状態が変わるたびに呼び、アラームをセットし直す
    ///
    /// パケット送信、ACK 受信、タイムアウト発火後、ハンドシェイク完了などの直後に呼ぶこと。
    ///
    /// # 引数
    /// - `now`: 現在時刻
    /// - `should_keep_alive`: アプリケーションが接続維持を望んでいるか。false ならアラームを解除する
    /// - `has_in_flight_packets`: 未 ACK のパケットがあるか
    pub fn set_alarm(&mut self, now: Timestamp, should_keep_alive: bool, has_in_flight_packets: bool) {
        if self.stopped {
            trace!(perspective = %self.perspective, "set_alarm ignored after stop");
            return;
        }

        self.update_deadlines(now, should_keep_alive, has_in_flight_packets);

        match self.earliest_deadline() {
            Some((reason, deadline)) => {
                self.alarm.set(deadline);
                self.armed = Some((reason, deadline));
                debug!(
                    perspective = %self.perspective,
                    reason = reason.as_str(),
                    delay_us = (deadline - now).as_micros() as u64,
                    "ping alarm armed"
                );
            }
            None => {
                self.alarm.cancel();
                self.armed = None;
                trace!(perspective = %self.perspective, "ping alarm cancelled");
            }
        }
    }

    /// アラーム発火時のハンドラ
    ///
    /// どちらの理由で発火したかを判定してデリゲートに通知する。自分では再セットしない。
    ///
    /// # パニック
    /// 何もセットしていないのに呼ばれた場合、またはアラームの期限が記録と食い違う場合。
    /// どちらも呼び出し側かマネージャー自身のバグ。
    pub fn on_alarm(&mut self, now: Timestamp) {
        let Some((reason, deadline)) = self.armed.take() else {
            panic!("ping alarm fired while nothing is armed");
        };
        if let Some(alarm_deadline) = self.alarm.deadline() {
            assert_eq!(
                alarm_deadline, deadline,
                "ping alarm deadline disagrees with the armed {} deadline",
                reason.as_str()
            );
        }
        // 発火済みの期限を消費する（スケジューラが既に解除していれば何もしない）
        self.alarm.cancel();

        trace!(late_us = (now - deadline).as_micros() as u64, "ping alarm fired");

        match reason {
            TimeoutReason::RetransmittableOnWire => {
                self.retransmittable_on_wire_deadline = None;
                self.consecutive_retransmittable_on_wire_count =
                    self.consecutive_retransmittable_on_wire_count.saturating_add(1);
                self.retransmittable_on_wire_count += 1;
                debug!(
                    perspective = %self.perspective,
                    consecutive = self.consecutive_retransmittable_on_wire_count,
                    "retransmittable-on-wire timeout"
                );
                self.delegate.on_retransmittable_on_wire_timeout();
            }
            TimeoutReason::KeepAlive => {
                self.keep_alive_deadline = None;
                self.keep_alive_count += 1;
                debug!(perspective = %self.perspective, "keep-alive timeout");
                self.delegate.on_keep_alive_timeout();
            }
        }
    }

    /// アラームを永久に解除し、以後の `set_alarm` を無視する（接続終了時）
    pub fn stop(&mut self) {
        self.alarm.permanent_cancel();
        self.armed = None;
        self.keep_alive_deadline = None;
        self.retransmittable_on_wire_deadline = None;
        self.stopped = true;
        debug!(perspective = %self.perspective, "ping manager stopped");
    }

    /// keep-alive の間隔を変更する。次に keep-alive の期限を計算し直す `set_alarm` から有効
    pub fn set_keep_alive_timeout(&mut self, timeout: Duration) {
        self.config.keep_alive_timeout = timeout;
    }

    /// ROW プローブの初期間隔を変更する。`Duration::ZERO` でプローブ無効
    pub fn set_initial_retransmittable_on_wire_timeout(&mut self, timeout: Duration) {
        self.config.initial_retransmittable_on_wire_timeout = timeout;
    }

    /// バックオフを始めるまでの連続 ROW 回数を変更する
    pub fn set_max_aggressive_retransmittable_on_wire_count(&mut self, count: u32) {
        self.config.max_aggressive_retransmittable_on_wire_count = count;
    }

    /// 連続 ROW の上限を変更する（0 = 無制限）
    pub fn set_max_retransmittable_on_wire_ping_count(&mut self, count: u32) {
        self.config.max_retransmittable_on_wire_ping_count = count;
    }

    /// 連続 ROW カウンタを 0 に戻す
    ///
    /// 次の `set_alarm` からプローブ間隔が初期値に戻り、上限で止まっていたプローブも再開する。
    pub fn reset_consecutive_retransmittable_on_wire_count(&mut self) {
        self.consecutive_retransmittable_on_wire_count = 0;
    }

    /// 現在のカウンタ値で計算した ROW プローブ間隔
    ///
    /// 連続回数 n がしきい値 k 以下なら初期間隔、超えたら `initial * 2^(n - k)`。
    /// 表現できないほど大きくなった場合は None（keep-alive の期限より必ず後ろ扱い）。
    pub fn retransmittable_on_wire_timeout(&self) -> Option<Duration> {
        let initial = self.config.initial_retransmittable_on_wire_timeout;
        let count = self.consecutive_retransmittable_on_wire_count;
        let aggressive = self.config.max_aggressive_retransmittable_on_wire_count;
        if count <= aggressive {
            return Some(initial);
        }
        let shift = count - aggressive;
        let timeout = 1u32
            .checked_shl(shift)
            .and_then(|factor| initial.checked_mul(factor));
        trace!(count, shift, timeout = ?timeout, "retransmittable-on-wire backoff");
        timeout
    }

    pub fn perspective(&self) -> Perspective {
        self.perspective
    }

    pub fn config(&self) -> &PingConfig {
        &self.config
    }

    pub fn keep_alive_timeout(&self) -> Duration {
        self.config.keep_alive_timeout
    }

    pub fn initial_retransmittable_on_wire_timeout(&self) -> Duration {
        self.config.initial_retransmittable_on_wire_timeout
    }

    pub fn consecutive_retransmittable_on_wire_count(&self) -> u32 {
        self.consecutive_retransmittable_on_wire_count
    }

    /// `stop()` 済みか
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// 注入されたアラーム（イベントループが期限を読むため）
    pub fn alarm(&self) -> &A {
        &self.alarm
    }

    /// 注入されたアラーム（イベントループが発火を取り出すため）
    ///
    /// ここで期限を解除しても構わない。`on_alarm` は解除済みのアラームを受け付ける。
    pub fn alarm_mut(&mut self) -> &mut A {
        &mut self.alarm
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    /// 統計情報を返す
    pub fn stats(&self) -> PingStats {
        PingStats {
            consecutive_retransmittable_on_wire_count: self.consecutive_retransmittable_on_wire_count,
            retransmittable_on_wire_count: self.retransmittable_on_wire_count,
            keep_alive_count: self.keep_alive_count,
            armed_reason: self.armed.map(|(reason, _)| reason),
            deadline: self.armed.map(|(_, deadline)| deadline),
        }
    }

    /// テスト用の内部状態スナップショット
    #[cfg(any(test, feature = "test-support"))]
    pub fn diagnostics(&self) -> PingDiagnostics {
        PingDiagnostics {
            armed: self.alarm.is_set(),
            deadline: self.alarm.deadline(),
            reason: self.armed.map(|(reason, _)| reason),
            keep_alive_deadline: self.keep_alive_deadline,
            retransmittable_on_wire_deadline: self.retransmittable_on_wire_deadline,
        }
    }

    // ===== Private メソッド =====

    /// keep-alive と ROW の期限を計算し直す
    fn update_deadlines(&mut self, now: Timestamp, should_keep_alive: bool, has_in_flight_packets: bool) {
        if !should_keep_alive {
            // アプリケーションが維持を望まない間は何も追跡しない
            self.keep_alive_deadline = None;
            self.retransmittable_on_wire_deadline = None;
            return;
        }

        if has_in_flight_packets {
            // 通常の ACK で生存確認できるので keep-alive だけを引き直す
            self.keep_alive_deadline = now.checked_add(self.config.keep_alive_timeout);
            self.retransmittable_on_wire_deadline = None;
            return;
        }

        // 既存の keep-alive 期限は上限として残す（延長しない）
        if self.keep_alive_deadline.is_none() {
            self.keep_alive_deadline = now.checked_add(self.config.keep_alive_timeout);
        }

        self.retransmittable_on_wire_deadline = self
            .retransmittable_on_wire_candidate(now)
            .filter(|candidate| match self.keep_alive_deadline {
                Some(keep_alive_deadline) => *candidate <= keep_alive_deadline,
                None => true,
            });
    }

    /// プローブが許可されていれば次のプローブ時刻の候補を返す
    fn retransmittable_on_wire_candidate(&self, now: Timestamp) -> Option<Timestamp> {
        if !self.retransmittable_on_wire_allowed() {
            return None;
        }
        let timeout = self.retransmittable_on_wire_timeout()?;
        now.checked_add(timeout)
    }

    /// プローブが有効で、連続回数が上限以内か
    fn retransmittable_on_wire_allowed(&self) -> bool {
        let max_count = self.config.max_retransmittable_on_wire_ping_count;
        self.config.retransmittable_on_wire_enabled()
            && (max_count == 0 || self.consecutive_retransmittable_on_wire_count <= max_count)
    }

    /// セットすべき期限とその理由
    fn earliest_deadline(&self) -> Option<(TimeoutReason, Timestamp)> {
        if let Some(deadline) = self.retransmittable_on_wire_deadline {
            debug_assert!(
                self.keep_alive_deadline.map_or(true, |keep_alive| deadline <= keep_alive),
                "retransmittable-on-wire deadline must not be after the keep-alive deadline"
            );
            return Some((TimeoutReason::RetransmittableOnWire, deadline));
        }
        self.keep_alive_deadline
            .map(|deadline| (TimeoutReason::KeepAlive, deadline))
    }
}

impl<D: PingDelegate, A: Alarm> Drop for PingManager<D, A> {
    /// セット中の期限を解除する
    fn drop(&mut self) {
        self.alarm.cancel();
    }
}

/// ping タイマー統計情報
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingStats {
    /// 連続 ROW 発火数（バックオフに使う値）
    pub consecutive_retransmittable_on_wire_count: u32,
    /// ROW 発火の累計
    pub retransmittable_on_wire_count: u64,
    /// keep-alive 発火の累計
    pub keep_alive_count: u64,
    /// セット中の理由（未セットなら None）
    pub armed_reason: Option<TimeoutReason>,
    /// セット中の期限
    pub deadline: Option<Timestamp>,
}

/// テスト用の内部状態スナップショット（本番 API ではない）
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingDiagnostics {
    /// アラームがセットされているか
    pub armed: bool,
    /// アラームの期限
    pub deadline: Option<Timestamp>,
    /// セット中の理由
    pub reason: Option<TimeoutReason>,
    pub keep_alive_deadline: Option<Timestamp>,
    pub retransmittable_on_wire_deadline: Option<Timestamp>,
}
