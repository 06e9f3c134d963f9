//! ビーコン広告（iBeacon）
//! - Manufacturer Data(0xFF) 内の固定 25B レコード
//!   構造: [company id(2), type(1), length(1), uuid(16), major(2), minor(2), tx power(1)]
//! - 値はすべて広告側のバイト列に置き、アクセスの度に decode/encode する
//! - Company ID のみ LE（他はすべて BE）

use core::fmt;

use crate::advertisement::{Advertisement, AdvertisingData};
use crate::constants::{
    APPLE_COMPANY_ID_FLIPPED, DEFAULT_PATH_LOSS_CONST, IBEACON_LENGTH, IBEACON_PREFIX, IBEACON_TYPE,
    MANUFACTURING_DATA_ADT,
};
use crate::error::{CodecError, Result};
use crate::field_codec::{ByteOrder, FieldKind, FieldLayout, Fields, MultiStruct};
use crate::format::fmt_uuid;

/// iBeacon レコードのレイアウト（BE: H B B Q Q H H b）
pub const IBEACON_LAYOUT: FieldLayout = FieldLayout::new(
    ByteOrder::Big,
    &[
        FieldKind::U16, // company id（スワップ済みの値を格納）
        FieldKind::U8,  // type
        FieldKind::U8,  // length
        FieldKind::U64, // uuid 上位
        FieldKind::U64, // uuid 下位
        FieldKind::U16, // major
        FieldKind::U16, // minor
        FieldKind::I8,  // tx power
    ],
);

const BEACON_DATA: MultiStruct = MultiStruct::new(IBEACON_LAYOUT, MANUFACTURING_DATA_ADT);

// レコード内のフィールド index
const COMPANY_ID: usize = 0;
const BEACON_TYPE: usize = 1;
const BEACON_LENGTH: usize = 2;
const UUID_MSB: usize = 3;
const UUID_LSB: usize = 4;
const MAJOR: usize = 5;
const MINOR: usize = 6;
const TX_POWER: usize = 7;

/// 位置ビーコン共通の操作。種別ごとに実装する
pub trait BeaconAdvertisement {
    /// 128bit のビーコン識別子
    fn uuid(&self) -> Result<[u8; 16]>;

    fn set_uuid(&mut self, uuid: [u8; 16]) -> Result<()>;

    /// 1m 地点での送信電力（dBm）
    fn beacon_tx_power(&self) -> Result<i8>;

    /// i8 に収まらない値は `ValueOutOfRange`
    fn set_beacon_tx_power(&mut self, power: i32) -> Result<()>;

    /// 受信時の RSSI（dBm）
    fn rssi(&self) -> Option<i8>;

    /// パスロス係数（通常 2〜4）
    fn path_loss_const(&self) -> f32;

    /// 正の有限値以外は `InvalidPathLossConst`（値は変えない）
    fn set_path_loss_const(&mut self, value: f32) -> Result<()>;

    /// 推定距離（m）: 10 ^ ((tx_power - rssi) / (10 * n))
    /// 呼び出しの度に計算する
    fn distance(&self) -> Result<f32> {
        let rssi = self.rssi().ok_or(CodecError::MissingSignalStrength)?;
        let tx_power = self.beacon_tx_power()?;
        let n = check_path_loss_const(self.path_loss_const())?;
        let exponent = (f32::from(tx_power) - f32::from(rssi)) / (10.0 * n);
        Ok(libm::powf(10.0, exponent))
    }
}

/// iBeacon 広告。
/// `A` は生データを持つ広告オブジェクト（所有でも `&mut` 借用でもよい）
pub struct IBeacon<A = Advertisement> {
    adv: A,
    path_loss_const: f32,
}

impl IBeacon<Advertisement> {
    /// 送信用の新しい iBeacon（マーカー設定済み、他は 0）
    pub fn new() -> Result<Self> {
        Self::fresh(Advertisement::new())
    }

    /// 受信した AD全体から iBeacon を取り出す。プレフィックス不一致なら `Ok(None)`
    pub fn from_scan(ad: &[u8], rssi: Option<i8>) -> Result<Option<Self>> {
        let adv = Advertisement::from_ad_bytes(ad, rssi)?;
        if !Self::matches(&adv) {
            return Ok(None);
        }
        debug!("iBeacon prefix matched, rssi={}", rssi);
        Ok(Some(Self::from_advertisement(adv)))
    }
}

impl<A: AdvertisingData> IBeacon<A> {
    /// 判定用プレフィックス `FF 4C 00 02 15`
    pub const PREFIX: [u8; 5] = IBEACON_PREFIX;

    /// この広告が iBeacon か（プレフィックス一致のみ、長さは見ない）
    pub fn matches(adv: &A) -> bool {
        adv.matches_prefix(&Self::PREFIX)
    }

    /// 受信済みデータをそのまま包む。既定値は書き込まない
    pub fn from_advertisement(adv: A) -> Self {
        Self { adv, path_loss_const: DEFAULT_PATH_LOSS_CONST }
    }

    /// 送信用に初期化する。既存の Manufacturer Data は置き換える
    pub fn fresh(adv: A) -> Result<Self> {
        let mut beacon = Self::from_advertisement(adv);
        BEACON_DATA.set(
            &mut beacon.adv,
            &[
                i128::from(APPLE_COMPANY_ID_FLIPPED),
                i128::from(IBEACON_TYPE),
                i128::from(IBEACON_LENGTH),
                0,
                0,
                0,
                0,
                0,
            ],
        )?;
        Ok(beacon)
    }

    pub fn advertisement(&self) -> &A {
        &self.adv
    }

    pub fn into_advertisement(self) -> A {
        self.adv
    }

    /// レコードの生バイト列（AD type を除く 25B）
    pub fn manufacturer_data(&self) -> Option<&[u8]> {
        self.adv.data(MANUFACTURING_DATA_ADT)
    }

    /// Company ID（スワップを戻した値。Apple なら 0x004C）
    pub fn company_id(&self) -> Result<u16> {
        narrow::<u16>(COMPANY_ID, self.field(COMPANY_ID)?).map(u16::swap_bytes)
    }

    pub fn beacon_type(&self) -> Result<u8> {
        narrow(BEACON_TYPE, self.field(BEACON_TYPE)?)
    }

    pub fn beacon_length(&self) -> Result<u8> {
        narrow(BEACON_LENGTH, self.field(BEACON_LENGTH)?)
    }

    pub fn major(&self) -> Result<u16> {
        narrow(MAJOR, self.field(MAJOR)?)
    }

    /// u16 に収まらない値は `ValueOutOfRange`
    pub fn set_major(&mut self, major: i32) -> Result<()> {
        self.set_field(MAJOR, i128::from(major))
    }

    pub fn minor(&self) -> Result<u16> {
        narrow(MINOR, self.field(MINOR)?)
    }

    pub fn set_minor(&mut self, minor: i32) -> Result<()> {
        self.set_field(MINOR, i128::from(minor))
    }

    fn fields(&self) -> Result<Fields> {
        BEACON_DATA
            .get(&self.adv)?
            .ok_or(CodecError::RecordAbsent { tag: MANUFACTURING_DATA_ADT })
    }

    fn field(&self, index: usize) -> Result<i128> {
        let fields = self.fields()?;
        fields.get(index).copied().ok_or(CodecError::ArityMismatch {
            expected: IBEACON_LAYOUT.field_count(),
            actual: fields.len(),
        })
    }

    fn set_field(&mut self, index: usize, value: i128) -> Result<()> {
        BEACON_DATA.update(&mut self.adv, &[(index, value)])
    }
}

impl<A: AdvertisingData> BeaconAdvertisement for IBeacon<A> {
    fn uuid(&self) -> Result<[u8; 16]> {
        let msb: u64 = narrow(UUID_MSB, self.field(UUID_MSB)?)?;
        let lsb: u64 = narrow(UUID_LSB, self.field(UUID_LSB)?)?;
        let mut id = [0u8; 16];
        id[..8].copy_from_slice(&msb.to_be_bytes());
        id[8..].copy_from_slice(&lsb.to_be_bytes());
        Ok(id)
    }

    /// 上位/下位を 1 回の encode でまとめて書く
    fn set_uuid(&mut self, uuid: [u8; 16]) -> Result<()> {
        let mut msb = [0u8; 8];
        let mut lsb = [0u8; 8];
        msb.copy_from_slice(&uuid[..8]);
        lsb.copy_from_slice(&uuid[8..]);
        BEACON_DATA.update(
            &mut self.adv,
            &[
                (UUID_MSB, i128::from(u64::from_be_bytes(msb))),
                (UUID_LSB, i128::from(u64::from_be_bytes(lsb))),
            ],
        )
    }

    fn beacon_tx_power(&self) -> Result<i8> {
        narrow(TX_POWER, self.field(TX_POWER)?)
    }

    fn set_beacon_tx_power(&mut self, power: i32) -> Result<()> {
        self.set_field(TX_POWER, i128::from(power))
    }

    fn rssi(&self) -> Option<i8> {
        self.adv.rssi()
    }

    fn path_loss_const(&self) -> f32 {
        self.path_loss_const
    }

    fn set_path_loss_const(&mut self, value: f32) -> Result<()> {
        self.path_loss_const = check_path_loss_const(value)?;
        Ok(())
    }
}

fn check_path_loss_const(value: f32) -> Result<f32> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CodecError::InvalidPathLossConst { value })
    }
}

fn narrow<T: TryFrom<i128>>(index: usize, value: i128) -> Result<T> {
    T::try_from(value).map_err(|_| CodecError::ValueOutOfRange { index, value })
}

impl<A: AdvertisingData> fmt::Debug for IBeacon<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (Ok(uuid), Ok(major), Ok(minor), Ok(tx_power)) =
            (self.uuid(), self.major(), self.minor(), self.beacon_tx_power())
        else {
            return write!(f, "IBeacon {{ <no record> }}");
        };
        write!(
            f,
            "IBeacon {{ uuid: {}, major: {}, minor: {}, tx_power: {}, rssi: {:?} }}",
            fmt_uuid(&uuid),
            major,
            minor,
            tx_power,
            self.rssi()
        )
    }
}

#[cfg(feature = "defmt")]
impl<A: AdvertisingData> defmt::Format for IBeacon<A> {
    fn format(&self, f: defmt::Formatter) {
        match (self.uuid(), self.major(), self.minor(), self.beacon_tx_power()) {
            (Ok(uuid), Ok(major), Ok(minor), Ok(tx_power)) => defmt::write!(
                f,
                "IBeacon {{ uuid={=[u8]:x}, major={}, minor={}, tx_power={} }}",
                &uuid[..],
                major,
                minor,
                tx_power
            ),
            _ => defmt::write!(f, "IBeacon {{ <no record> }}"),
        }
    }
}
