//! タイムアウト通知の受け手

/// 発火したタイムアウトの理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutReason {
    /// keep-alive の期限
    KeepAlive,
    /// retransmittable-on-wire プローブの期限
    RetransmittableOnWire,
}

impl TimeoutReason {
    /// ログ・JSON 用の名前
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeoutReason::KeepAlive => "keep_alive",
            TimeoutReason::RetransmittableOnWire => "retransmittable_on_wire",
        }
    }
}

/// タイムアウト発火時に呼ばれるデリゲート
///
/// `PingManager::on_alarm` の中から同期的に呼ばれる。実装側は ping / プローブパケットを
/// キューに積み、送信中パケットの状態を更新してから `PingManager::set_alarm` を呼び直すこと。
pub trait PingDelegate {
    /// keep-alive の期限が来た
    fn on_keep_alive_timeout(&mut self);

    /// 送信中パケットがない状態でプローブの期限が来た
    fn on_retransmittable_on_wire_timeout(&mut self);
}

impl<D: PingDelegate + ?Sized> PingDelegate for &mut D {
    fn on_keep_alive_timeout(&mut self) {
        (**self).on_keep_alive_timeout()
    }

    fn on_retransmittable_on_wire_timeout(&mut self) {
        (**self).on_retransmittable_on_wire_timeout()
    }
}
