//! 固定長レイアウト ⇔ 整数タプルの変換
//! - 1つの AD type（tag）に格納されるバイト列を、宣言したフィールド列で解釈/生成する
//! - 幅・符号・バイトオーダの規則はここだけに置く
//! - 値は i128 で持つ（u64/i64 まで損失なし）

use heapless::Vec;

use crate::advertisement::AdvertisingData;
use crate::error::{CodecError, Result};

/// 1レイアウトの最大フィールド数
pub const MAX_FIELDS: usize = 8;

/// 1 AD 構造に載るデータ長の上限（レガシー広告 31B - len - type）
pub const MAX_RECORD_LEN: usize = 29;

/// 復号結果（フィールド順）
pub type Fields = Vec<i128, MAX_FIELDS>;

/// 符号化結果
pub type RawRecord = Vec<u8, MAX_RECORD_LEN>;

/// バイトオーダ
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ByteOrder {
    Big,
    Little,
}

/// プリミティブ整数フィールドの種別（幅と符号）
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
}

impl FieldKind {
    /// バイト幅
    pub const fn width(self) -> usize {
        match self {
            FieldKind::U8 | FieldKind::I8 => 1,
            FieldKind::U16 | FieldKind::I16 => 2,
            FieldKind::U32 | FieldKind::I32 => 4,
            FieldKind::U64 | FieldKind::I64 => 8,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, FieldKind::I8 | FieldKind::I16 | FieldKind::I32 | FieldKind::I64)
    }

    const fn bits(self) -> u32 {
        (self.width() * 8) as u32
    }

    /// 表現できる最小値
    pub const fn min(self) -> i128 {
        if self.is_signed() {
            -(1i128 << (self.bits() - 1))
        } else {
            0
        }
    }

    /// 表現できる最大値
    pub const fn max(self) -> i128 {
        if self.is_signed() {
            (1i128 << (self.bits() - 1)) - 1
        } else {
            (1i128 << self.bits()) - 1
        }
    }

    pub const fn contains(self, value: i128) -> bool {
        value >= self.min() && value <= self.max()
    }

    fn write(self, order: ByteOrder, value: i128, dst: &mut RawRecord) -> Result<()> {
        let w = self.width();
        // 負値も下位 w バイトが 2 の補数表現になる
        let raw = value as u128;
        let res = match order {
            ByteOrder::Big => dst.extend_from_slice(&raw.to_be_bytes()[16 - w..]),
            ByteOrder::Little => dst.extend_from_slice(&raw.to_le_bytes()[..w]),
        };
        res.map_err(|_| CodecError::CapacityExceeded)
    }

    fn read(self, order: ByteOrder, src: &[u8]) -> i128 {
        let acc = match order {
            ByteOrder::Big => src.iter().fold(0u128, |acc, b| (acc << 8) | *b as u128),
            ByteOrder::Little => src.iter().rev().fold(0u128, |acc, b| (acc << 8) | *b as u128),
        };
        let value = acc as i128;
        if self.is_signed() && value > self.max() {
            value - (1i128 << self.bits())
        } else {
            value
        }
    }
}

/// 固定長レイアウト（定義後は不変）
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct FieldLayout {
    order: ByteOrder,
    kinds: &'static [FieldKind],
}

impl FieldLayout {
    /// レイアウトを定義する。`const` で使えば上限超過はコンパイル時に弾かれる
    pub const fn new(order: ByteOrder, kinds: &'static [FieldKind]) -> Self {
        assert!(kinds.len() <= MAX_FIELDS, "too many fields");
        let layout = Self { order, kinds };
        assert!(layout.encoded_len() <= MAX_RECORD_LEN, "layout longer than one AD structure");
        layout
    }

    pub const fn order(&self) -> ByteOrder {
        self.order
    }

    pub const fn kinds(&self) -> &'static [FieldKind] {
        self.kinds
    }

    pub const fn field_count(&self) -> usize {
        self.kinds.len()
    }

    /// 符号化後の固定バイト長
    pub const fn encoded_len(&self) -> usize {
        let mut len = 0;
        let mut i = 0;
        while i < self.kinds.len() {
            len += self.kinds[i].width();
            i += 1;
        }
        len
    }
}

/// 生バイト列を左から順にフィールドへ展開する
pub fn decode(layout: &FieldLayout, raw: &[u8]) -> Result<Fields> {
    let expected = layout.encoded_len();
    if raw.len() != expected {
        warn!("layout mismatch: expected={} actual={}", expected, raw.len());
        return Err(CodecError::LayoutMismatch { expected, actual: raw.len() });
    }

    let mut out = Fields::new();
    let mut off = 0usize;
    for kind in layout.kinds() {
        let w = kind.width();
        let value = kind.read(layout.order(), &raw[off..off + w]);
        out.push(value).map_err(|_| CodecError::CapacityExceeded)?;
        off += w;
    }
    Ok(out)
}

/// フィールド値をレイアウト通りのバイト列にする。範囲外があれば何も返さない
pub fn encode(layout: &FieldLayout, values: &[i128]) -> Result<RawRecord> {
    if values.len() != layout.field_count() {
        return Err(CodecError::ArityMismatch {
            expected: layout.field_count(),
            actual: values.len(),
        });
    }

    let mut out = RawRecord::new();
    for (index, (kind, &value)) in layout.kinds().iter().zip(values).enumerate() {
        if !kind.contains(value) {
            return Err(CodecError::ValueOutOfRange { index, value });
        }
        kind.write(layout.order(), value, &mut out)?;
    }
    Ok(out)
}

/// `tag` のデータを復号。広告に無ければ `Ok(None)`
pub fn get<A>(adv: &A, tag: u8, layout: &FieldLayout) -> Result<Option<Fields>>
where
    A: AdvertisingData + ?Sized,
{
    adv.data(tag).map(|raw| decode(layout, raw)).transpose()
}

/// 符号化して `tag` のデータを丸ごと置き換える。符号化に失敗したら書き込まない
pub fn set<A>(adv: &mut A, tag: u8, layout: &FieldLayout, values: &[i128]) -> Result<()>
where
    A: AdvertisingData + ?Sized,
{
    let raw = encode(layout, values)?;
    trace!("set tag={} len={}", tag, raw.len());
    adv.set_data(tag, &raw)
}

/// レイアウトと AD type を束ねたアクセサ
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct MultiStruct {
    layout: FieldLayout,
    tag: u8,
}

impl MultiStruct {
    pub const fn new(layout: FieldLayout, tag: u8) -> Self {
        Self { layout, tag }
    }

    pub const fn tag(&self) -> u8 {
        self.tag
    }

    pub const fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    pub fn get<A: AdvertisingData + ?Sized>(&self, adv: &A) -> Result<Option<Fields>> {
        get(adv, self.tag, &self.layout)
    }

    pub fn set<A: AdvertisingData + ?Sized>(&self, adv: &mut A, values: &[i128]) -> Result<()> {
        set(adv, self.tag, &self.layout, values)
    }

    /// `(index, value)` の書き換えをまとめて 1 回の decode → encode で適用する
    pub fn update<A: AdvertisingData + ?Sized>(&self, adv: &mut A, writes: &[(usize, i128)]) -> Result<()> {
        let mut values = self
            .get(adv)?
            .ok_or(CodecError::RecordAbsent { tag: self.tag })?;
        let count = values.len();
        for &(index, value) in writes {
            let slot = values
                .get_mut(index)
                .ok_or_else(|| CodecError::ArityMismatch {
                    expected: count,
                    actual: index.saturating_add(1),
                })?;
            *slot = value;
        }
        self.set(adv, &values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertisement::Advertisement;
    use pretty_assertions::assert_eq;

    const BEACON: FieldLayout = FieldLayout::new(
        ByteOrder::Big,
        &[
            FieldKind::U16,
            FieldKind::U8,
            FieldKind::U8,
            FieldKind::U64,
            FieldKind::U64,
            FieldKind::U16,
            FieldKind::U16,
            FieldKind::I8,
        ],
    );

    const SMALL_LE: FieldLayout =
        FieldLayout::new(ByteOrder::Little, &[FieldKind::U16, FieldKind::I32]);

    #[test]
    fn kind_ranges() {
        assert_eq!(FieldKind::I8.min(), -128);
        assert_eq!(FieldKind::I8.max(), 127);
        assert_eq!(FieldKind::U16.max(), 0xFFFF);
        assert_eq!(FieldKind::U64.max(), u64::MAX as i128);
        assert_eq!(FieldKind::I64.min(), i64::MIN as i128);
        assert!(!FieldKind::U8.contains(-1));
    }

    #[test]
    fn layout_length_is_sum_of_widths() {
        assert_eq!(BEACON.encoded_len(), 25);
        assert_eq!(BEACON.field_count(), 8);
        assert_eq!(SMALL_LE.encoded_len(), 6);
    }

    #[test]
    fn encode_big_endian_bytes() {
        let values = [0x4C00, 0x02, 0x15, 0x0102030405060708, -1i128 as u64 as i128, 1, 0xABCD, -59];
        let raw = encode(&BEACON, &values).unwrap();
        assert_eq!(raw.len(), 25);
        assert_eq!(&raw[..4], &[0x4C, 0x00, 0x02, 0x15]);
        assert_eq!(&raw[4..12], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&raw[12..20], &[0xFF; 8]);
        assert_eq!(&raw[20..24], &[0x00, 0x01, 0xAB, 0xCD]);
        assert_eq!(raw[24], 0xC5); // -59

        let back = decode(&BEACON, &raw).unwrap();
        assert_eq!(&back[..], &values[..]);
    }

    #[test]
    fn encode_little_endian_signed() {
        let raw = encode(&SMALL_LE, &[0x1234, -2]).unwrap();
        assert_eq!(&raw[..], &[0x34, 0x12, 0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&decode(&SMALL_LE, &raw).unwrap()[..], &[0x1234, -2]);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert_eq!(
            decode(&BEACON, &[0u8; 17]),
            Err(CodecError::LayoutMismatch { expected: 25, actual: 17 })
        );
        assert_eq!(
            decode(&BEACON, &[0u8; 24]),
            Err(CodecError::LayoutMismatch { expected: 25, actual: 24 })
        );
    }

    #[test]
    fn encode_rejects_arity_and_range() {
        assert_eq!(
            encode(&SMALL_LE, &[1]),
            Err(CodecError::ArityMismatch { expected: 2, actual: 1 })
        );
        assert_eq!(
            encode(&SMALL_LE, &[-1, 0]),
            Err(CodecError::ValueOutOfRange { index: 0, value: -1 })
        );
        assert_eq!(
            encode(&SMALL_LE, &[0, 1i128 << 31]),
            Err(CodecError::ValueOutOfRange { index: 1, value: 1i128 << 31 })
        );
    }

    #[test]
    fn get_returns_none_for_absent_tag() {
        let adv = Advertisement::new();
        assert_eq!(get(&adv, 0xFF, &BEACON), Ok(None));
    }

    #[test]
    fn set_replaces_whole_entry() {
        let mut adv = Advertisement::new();
        adv.set_data(0x20, &[0xAA; 3]).unwrap();
        set(&mut adv, 0x20, &SMALL_LE, &[7, 8]).unwrap();
        assert_eq!(adv.data(0x20), Some(&[7, 0, 8, 0, 0, 0][..]));
    }

    #[test]
    fn failed_set_keeps_previous_bytes() {
        let mut adv = Advertisement::new();
        set(&mut adv, 0x20, &SMALL_LE, &[7, 8]).unwrap();
        assert!(set(&mut adv, 0x20, &SMALL_LE, &[70_000, 8]).is_err());
        assert_eq!(adv.data(0x20), Some(&[7, 0, 8, 0, 0, 0][..]));
    }

    #[test]
    fn multistruct_update_batches_writes() {
        let acc = MultiStruct::new(SMALL_LE, 0x20);
        let mut adv = Advertisement::new();
        assert_eq!(
            acc.update(&mut adv, &[(0, 1)]),
            Err(CodecError::RecordAbsent { tag: 0x20 })
        );

        acc.set(&mut adv, &[1, 2]).unwrap();
        acc.update(&mut adv, &[(0, 3), (1, -4)]).unwrap();
        assert_eq!(&acc.get(&adv).unwrap().unwrap()[..], &[3, -4]);

        assert_eq!(
            acc.update(&mut adv, &[(2, 0)]),
            Err(CodecError::ArityMismatch { expected: 2, actual: 3 })
        );
        assert_eq!(
            acc.update(&mut adv, &[(usize::MAX, 0)]),
            Err(CodecError::ArityMismatch { expected: 2, actual: usize::MAX })
        );
        // 失敗した update は何も書かない
        assert_eq!(&acc.get(&adv).unwrap().unwrap()[..], &[3, -4]);
    }
}
