//! コーデック／ビーコン共通のエラー型

use thiserror::Error;

/// レコードの符号化・復号・距離推定で発生するエラー。
/// いずれもローカルな同期処理の失敗で、リトライの意味はない。
#[derive(Copy, Clone, PartialEq, Debug, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// 生バイト列の長さがレイアウト長と一致しない（誤ルーティング or 壊れたパケット）
    #[error("raw record is {actual} bytes, layout expects {expected}")]
    LayoutMismatch { expected: usize, actual: usize },

    /// 値の個数（またはフィールド index）がレイアウトと合わない
    #[error("layout has {expected} fields, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// フィールドの幅・符号で表現できない値
    #[error("value {value} does not fit field {index}")]
    ValueOutOfRange { index: usize, value: i128 },

    /// 距離推定に必要な RSSI がない
    #[error("no RSSI available for distance estimate")]
    MissingSignalStrength,

    /// パスロス係数が正の有限値でない
    #[error("path loss constant {value} must be positive and finite")]
    InvalidPathLossConst { value: f32 },

    /// 対象 AD type のデータが広告に含まれていない
    #[error("advertisement has no data for AD type 0x{tag:02x}")]
    RecordAbsent { tag: u8 },

    /// AD 構造 `[len][type][data]` が途中で切れている
    #[error("malformed AD structure at offset {offset}")]
    MalformedAd { offset: usize },

    /// 固定長バッファ（AD 構造数／データ長／出力先）に収まらない
    #[error("capacity exceeded")]
    CapacityExceeded,
}

pub type Result<T> = core::result::Result<T, CodecError>;
