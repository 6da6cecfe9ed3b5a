//! JS から渡される設定（JSON）の解釈
//!
//! 時間はすべてミリ秒の数値で受け取る（JS の setTimeout と同じ単位）。
//! 省略したフィールドは既定値、未知のフィールドはエラーにする。

use core::time::Duration;

use serde::{Deserialize, Serialize};

use ping_manager::{Perspective, PingConfig};

/// 設定エラー
#[derive(Debug)]
pub enum OptionsError {
    /// JSON のパース失敗（未知のフィールドを含む）
    InvalidJson(serde_json::Error),
    /// perspective が "client" / "server" 以外
    UnknownPerspective(String),
    /// 時間として解釈できない値（負数、NaN、大きすぎる値、0 を許さないフィールドの 0）
    InvalidDuration { field: &'static str, value: f64 },
}

impl core::fmt::Display for OptionsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OptionsError::InvalidJson(e) => write!(f, "Invalid ping options JSON: {}", e),
            OptionsError::UnknownPerspective(p) => {
                write!(f, "Unknown perspective: {:?} (expected \"client\" or \"server\")", p)
            }
            OptionsError::InvalidDuration { field, value } => {
                write!(f, "Invalid duration for {}: {} ms", field, value)
            }
        }
    }
}

/// ping タイマー設定（JS 向けのミリ秒表現）
///
/// ```json
/// {
///   "keep_alive_timeout_ms": 15000,
///   "initial_retransmittable_on_wire_timeout_ms": 200,
///   "max_aggressive_retransmittable_on_wire_count": 5,
///   "max_retransmittable_on_wire_ping_count": 0
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PingOptions {
    /// keep-alive の間隔（0 より大きいこと）
    pub keep_alive_timeout_ms: f64,
    /// ROW プローブの初期間隔（0 = 無効）
    pub initial_retransmittable_on_wire_timeout_ms: f64,
    /// バックオフせずに送るプローブ数
    pub max_aggressive_retransmittable_on_wire_count: u32,
    /// 連続プローブの上限（0 = 無制限）
    pub max_retransmittable_on_wire_ping_count: u32,
}

impl PingOptions {
    /// JSON 文字列から読み込む
    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        serde_json::from_str(json).map_err(OptionsError::InvalidJson)
    }

    /// マネージャーの設定に変換する
    pub fn to_config(&self) -> Result<PingConfig, OptionsError> {
        let keep_alive_timeout = duration_from_ms("keep_alive_timeout_ms", self.keep_alive_timeout_ms)?;
        if keep_alive_timeout.is_zero() {
            return Err(OptionsError::InvalidDuration {
                field: "keep_alive_timeout_ms",
                value: self.keep_alive_timeout_ms,
            });
        }
        let initial_retransmittable_on_wire_timeout = duration_from_ms(
            "initial_retransmittable_on_wire_timeout_ms",
            self.initial_retransmittable_on_wire_timeout_ms,
        )?;

        Ok(PingConfig::new()
            .with_keep_alive_timeout(keep_alive_timeout)
            .with_initial_retransmittable_on_wire_timeout(initial_retransmittable_on_wire_timeout)
            .with_max_aggressive_retransmittable_on_wire_count(
                self.max_aggressive_retransmittable_on_wire_count,
            )
            .with_max_retransmittable_on_wire_ping_count(self.max_retransmittable_on_wire_ping_count))
    }
}

impl Default for PingOptions {
    fn default() -> Self {
        let config = PingConfig::default();
        PingOptions {
            keep_alive_timeout_ms: duration_to_ms(config.keep_alive_timeout),
            initial_retransmittable_on_wire_timeout_ms: duration_to_ms(
                config.initial_retransmittable_on_wire_timeout,
            ),
            max_aggressive_retransmittable_on_wire_count: config
                .max_aggressive_retransmittable_on_wire_count,
            max_retransmittable_on_wire_ping_count: config.max_retransmittable_on_wire_ping_count,
        }
    }
}

/// "client" / "server" を解釈する（大文字小文字は区別しない）
pub fn parse_perspective(value: &str) -> Result<Perspective, OptionsError> {
    if value.eq_ignore_ascii_case("client") {
        Ok(Perspective::Client)
    } else if value.eq_ignore_ascii_case("server") {
        Ok(Perspective::Server)
    } else {
        Err(OptionsError::UnknownPerspective(value.into()))
    }
}

/// ミリ秒（JS の数値）を Duration に変換する。精度はマイクロ秒（Timestamp と同じ）
pub fn duration_from_ms(field: &'static str, ms: f64) -> Result<Duration, OptionsError> {
    let micros = (ms * 1000.0).round();
    if micros.is_nan() || micros < 0.0 || micros >= u64::MAX as f64 {
        return Err(OptionsError::InvalidDuration { field, value: ms });
    }
    Ok(Duration::from_micros(micros as u64))
}

/// Duration をミリ秒（JS の数値）に変換する
pub fn duration_to_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_match_config() {
        let options = PingOptions::default();
        assert_eq!(options.keep_alive_timeout_ms, 15000.0);
        assert_eq!(options.initial_retransmittable_on_wire_timeout_ms, 0.0);
        assert_eq!(options.to_config().unwrap(), PingConfig::default());
    }

    #[test]
    fn test_duration_from_ms() {
        assert_eq!(duration_from_ms("x", 50.0).unwrap(), Duration::from_millis(50));
        assert_eq!(duration_from_ms("x", 0.0).unwrap(), Duration::ZERO);
        assert!(duration_from_ms("x", -1.0).is_err());
        assert!(duration_from_ms("x", f64::NAN).is_err());
        assert!(duration_from_ms("x", f64::INFINITY).is_err());
    }

    #[test]
    fn test_parse_perspective() {
        assert_eq!(parse_perspective("client").unwrap(), Perspective::Client);
        assert_eq!(parse_perspective("Server").unwrap(), Perspective::Server);
        assert!(matches!(
            parse_perspective("peer"),
            Err(OptionsError::UnknownPerspective(_))
        ));
    }
}
