//! バイト列の可読フォーマット補助（Debug 出力用）

use heapless::String;

/// バイト列を "aa:bb:cc:..." 形式に整形して返す。
/// 1 AD 構造分（29B）まで。超えた分は切り捨て
pub fn fmt_bytes_colon(v: &[u8]) -> String<96> {
    let mut s: String<96> = String::new();
    for (i, b) in v.iter().enumerate() {
        if i > 0 {
            let _ = s.push(':');
        }
        push_hex_byte(&mut s, *b);
    }
    s
}

/// 16B の UUID を 8-4-4-4-12 形式で返す
/// 例: e2c56db5-dffb-48d2-b060-d0f5a71096e0
pub fn fmt_uuid(v: &[u8; 16]) -> String<36> {
    let mut s: String<36> = String::new();
    for (i, b) in v.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            let _ = s.push('-');
        }
        push_hex_byte(&mut s, *b);
    }
    s
}

fn push_hex_byte<const N: usize>(dst: &mut String<N>, b: u8) {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let _ = dst.push(HEX[(b >> 4) as usize] as char);
    let _ = dst.push(HEX[(b & 0x0f) as usize] as char);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn colon_separated() {
        assert_eq!(fmt_bytes_colon(&[0x4c, 0x00, 0x02, 0x15]).as_str(), "4c:00:02:15");
        assert_eq!(fmt_bytes_colon(&[]).as_str(), "");
    }

    #[test]
    fn uuid_groups() {
        let id = [
            0xE2, 0xC5, 0x6D, 0xB5, 0xDF, 0xFB, 0x48, 0xD2, 0xB0, 0x60, 0xD0, 0xF5, 0xA7, 0x10, 0x96, 0xE0,
        ];
        assert_eq!(fmt_uuid(&id).as_str(), "e2c56db5-dffb-48d2-b060-d0f5a71096e0");
    }
}
