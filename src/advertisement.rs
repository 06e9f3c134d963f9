//! 広告データ（AD type → バイト列）の保持と AD 構造のビルダ/パーサ
//! - 受信: AD全体（[len][type][data]...）を走査して map に展開
//! - 送信: map を AD 構造列に書き戻す（31B 制限に注意）
//! - スキャン/無線制御はここでは扱わない

use core::fmt;

use heapless::Vec;

use crate::error::{CodecError, Result};
use crate::field_codec::MAX_RECORD_LEN;
use crate::format::fmt_bytes_colon;

/// レガシー広告の AD 全体長
pub const MAX_AD_LEN: usize = 31;

/// 1広告に保持できる AD 構造の数
pub const MAX_AD_STRUCTURES: usize = 8;

/// 1 AD 構造のデータ部
pub type AdData = Vec<u8, MAX_RECORD_LEN>;

/// レコード側から見た広告オブジェクト
pub trait AdvertisingData {
    /// `tag`（AD type）のデータ部
    fn data(&self, tag: u8) -> Option<&[u8]>;

    /// `tag` のデータ部を丸ごと置き換える
    fn set_data(&mut self, tag: u8, bytes: &[u8]) -> Result<()>;

    /// 受信時の RSSI（dBm）。自前で組み立てた広告では None
    fn rssi(&self) -> Option<i8>;

    /// `[type][data...]` の先頭が `prefix` と一致する AD 構造があるか
    fn matches_prefix(&self, prefix: &[u8]) -> bool {
        let Some((&tag, rest)) = prefix.split_first() else {
            return false;
        };
        self.data(tag).is_some_and(|data| data.starts_with(rest))
    }
}

impl<T: AdvertisingData + ?Sized> AdvertisingData for &mut T {
    fn data(&self, tag: u8) -> Option<&[u8]> {
        (**self).data(tag)
    }

    fn set_data(&mut self, tag: u8, bytes: &[u8]) -> Result<()> {
        (**self).set_data(tag, bytes)
    }

    fn rssi(&self) -> Option<i8> {
        (**self).rssi()
    }
}

/// 1件の広告（送信用 or 受信結果）
/// AD 構造は追加順に保持する（置き換えは同じ位置、削除で順序は崩れない）
#[derive(Clone)]
pub struct Advertisement {
    data: Vec<(u8, AdData), MAX_AD_STRUCTURES>,
    rssi: Option<i8>,
}

impl Advertisement {
    pub const fn new() -> Self {
        Self { data: Vec::new(), rssi: None }
    }

    pub fn with_rssi(rssi: i8) -> Self {
        Self { data: Vec::new(), rssi: Some(rssi) }
    }

    /// AD全体をパースして広告にする。
    /// - len=0 はパディングとして読み飛ばす
    /// - 同じ AD type が複数あれば後勝ち
    pub fn from_ad_bytes(ad: &[u8], rssi: Option<i8>) -> Result<Self> {
        let mut adv = Self { data: Vec::new(), rssi };
        let mut i = 0usize;
        while i < ad.len() {
            let len = ad[i] as usize;
            if len == 0 {
                i += 1;
                continue;
            }
            let end = i + 1 + len;
            if end > ad.len() {
                warn!("AD structure overruns buffer at {}", i);
                return Err(CodecError::MalformedAd { offset: i });
            }
            let ty = ad[i + 1];
            adv.set_data(ty, &ad[i + 2..end])?;
            i = end;
        }
        Ok(adv)
    }

    /// 広告を AD 構造列として追加順に buf に書き込み、書き込んだサイズを返す
    /// 構造: [len(1), type(1), data...] × n
    pub fn to_ad_bytes(&self, buf: &mut [u8]) -> Result<usize> {
        let mut w = 0usize;
        for (ty, data) in self.iter() {
            let need = 2 + data.len();
            if buf.len() < w + need {
                return Err(CodecError::CapacityExceeded);
            }
            buf[w] = (1 + data.len()) as u8;
            buf[w + 1] = ty;
            buf[w + 2..w + need].copy_from_slice(data);
            w += need;
        }
        Ok(w)
    }

    pub fn set_rssi(&mut self, rssi: Option<i8>) {
        self.rssi = rssi;
    }

    /// `tag` の AD 構造を取り除く。残りの順序は保つ
    pub fn remove(&mut self, tag: u8) -> Option<AdData> {
        let pos = self.position(tag)?;
        Some(self.data.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &[u8])> {
        self.data.iter().map(|(ty, data)| (*ty, data.as_slice()))
    }

    fn position(&self, tag: u8) -> Option<usize> {
        self.data.iter().position(|(ty, _)| *ty == tag)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for Advertisement {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvertisingData for Advertisement {
    fn data(&self, tag: u8) -> Option<&[u8]> {
        self.position(tag).map(|pos| self.data[pos].1.as_slice())
    }

    fn set_data(&mut self, tag: u8, bytes: &[u8]) -> Result<()> {
        let value = AdData::from_slice(bytes).map_err(|_| CodecError::CapacityExceeded)?;
        match self.position(tag) {
            Some(pos) => self.data[pos].1 = value,
            None => self
                .data
                .push((tag, value))
                .map_err(|_| CodecError::CapacityExceeded)?,
        }
        Ok(())
    }

    fn rssi(&self) -> Option<i8> {
        self.rssi
    }
}

impl fmt::Debug for Advertisement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Advertisement {{ rssi: {:?}", self.rssi)?;
        for (ty, data) in self.iter() {
            write!(f, ", 0x{:02x}: {}", ty, fmt_bytes_colon(data))?;
        }
        write!(f, " }}")
    }
}
