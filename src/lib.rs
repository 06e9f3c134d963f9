#![cfg_attr(not(test), no_std)]

// ログマクロ（defmt 有効時のみ出力）。他モジュールより先に読み込む
mod fmt;

/// 共通定数（AD type／Company ID／iBeacon マーカーなど）
pub mod constants {
    /// Manufacturer Specific Data の AD type
    pub const MANUFACTURING_DATA_ADT: u8 = 0xFF;

    /// Apple Company ID（Bluetooth SIG 割当, 本来の値）
    pub const APPLE_COMPANY_ID: u16 = 0x004C;

    /// レコード内に格納する Company ID。
    /// レコードはビッグエンディアンで符号化するが、Company ID だけは LE で載せる必要があるため
    /// 事前にバイトスワップした値を論理値として持つ（0x4C00 → ワイヤ上 4C 00）
    pub const APPLE_COMPANY_ID_FLIPPED: u16 = APPLE_COMPANY_ID.swap_bytes();

    /// iBeacon type マーカー
    pub const IBEACON_TYPE: u8 = 0x02;

    /// iBeacon length マーカー（UUID 16 + major 2 + minor 2 + tx power 1）
    pub const IBEACON_LENGTH: u8 = 0x15;

    /// iBeacon 判定用プレフィックス: [AD type][Company ID (LE)][type][length]
    pub const IBEACON_PREFIX: [u8; 5] = [
        MANUFACTURING_DATA_ADT,
        (APPLE_COMPANY_ID & 0xFF) as u8,
        (APPLE_COMPANY_ID >> 8) as u8,
        IBEACON_TYPE,
        IBEACON_LENGTH,
    ];

    /// 距離推定のパスロス係数の既定値（通常 2〜4）
    pub const DEFAULT_PATH_LOSS_CONST: f32 = 3.0;
}

pub mod advertisement;
pub mod beacon;
pub mod error;
pub mod field_codec;
pub mod format;

pub use advertisement::{Advertisement, AdvertisingData};
pub use beacon::{BeaconAdvertisement, IBeacon};
pub use error::{CodecError, Result};
pub use field_codec::{ByteOrder, FieldKind, FieldLayout, MultiStruct};

#[cfg(test)]
mod tests {
    use super::constants::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn prefix_is_tag_plus_le_company_id_and_markers() {
        assert_eq!(IBEACON_PREFIX, [0xFF, 0x4C, 0x00, 0x02, 0x15]);
        assert_eq!(APPLE_COMPANY_ID_FLIPPED, 0x4C00);
        // BE で書くと LE の Company ID と同じ並びになる
        assert_eq!(APPLE_COMPANY_ID_FLIPPED.to_be_bytes(), APPLE_COMPANY_ID.to_le_bytes());
    }
}
