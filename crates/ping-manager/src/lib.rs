//! # ping-manager
//!
//! QUIC 接続の生存確認タイマー（ping タイムアウトマネージャー）。
//!
//! ## 2 種類のタイムアウト
//!
//! - **Keep-alive**: 一定時間（既定 15 秒）通信がなければアプリケーション ping を送る。
//!   NAT のバインディングを維持するためのもの
//! - **Retransmittable-on-wire (ROW)**: 送信中（未 ACK）のパケットが 1 つもない間、
//!   短い間隔でプローブを送って死んだ経路を keep-alive より早く検出する
//!
//! マネージャーはどちらの期限が先に来るかを裁定し、単発アラーム（`ping_timer::Alarm`）に
//! 期限を 1 つだけセットする。発火したらどちらの理由かを判定してデリゲートに通知する。
//! パケットの組み立て・送信はデリゲート側の仕事で、このクレートは 1 バイトも送らない。
//!
//! ## 状態遷移
//!
//! ```text
//! Idle ──set_alarm──→ KeepAliveArmed ⇄ RetransmittableOnWireArmed
//!   ↑                        │                    │
//!   └──── on_alarm（発火）───┴────────────────────┘
//! ```
//!
//! 発火後は自分で再セットしない。呼び出し側（接続）が送受信状態を更新してから
//! `set_alarm` を呼び直す。
//!
//! ## バックオフ
//!
//! ROW の連続発火回数 n が `max_aggressive_retransmittable_on_wire_count` 以下の間は初期間隔のまま。
//! それを超えると `initial * 2^(n - max_aggressive)` で指数的に伸び、keep-alive の期限を
//! 越えた時点で keep-alive だけが残る。

#![no_std]

pub mod config;
pub mod delegate;
pub mod manager;

use core::time::Duration;

pub use config::PingConfig;
pub use delegate::{PingDelegate, TimeoutReason};
pub use manager::{PingManager, PingStats};

#[cfg(any(test, feature = "test-support"))]
pub use manager::PingDiagnostics;

pub use ping_timer::{Alarm, Timestamp};

/// keep-alive タイムアウトの既定値（15 秒）
/// NAT のバインディングが切れる前に ping を送るための間隔
pub const PING_TIMEOUT: Duration = Duration::from_secs(15);

/// バックオフせずに初期間隔で送る ROW プローブの既定回数
pub const DEFAULT_MAX_AGGRESSIVE_RETRANSMITTABLE_ON_WIRE_COUNT: u32 = 5;

/// 連続 ROW プローブ数の既定上限（0 = 無制限）
pub const DEFAULT_MAX_RETRANSMITTABLE_ON_WIRE_PING_COUNT: u32 = 0;

/// 接続を所有するエンドポイントの役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Perspective {
    /// クライアント（NAT の内側にいることが多く、keep-alive / プローブの主な利用者）
    Client,
    /// サーバー
    Server,
}

impl Perspective {
    /// ログ・JSON 用の名前
    pub fn as_str(&self) -> &'static str {
        match self {
            Perspective::Client => "client",
            Perspective::Server => "server",
        }
    }
}

impl core::fmt::Display for Perspective {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
