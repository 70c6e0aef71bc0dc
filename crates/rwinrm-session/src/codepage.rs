use encoding_rs::Encoding;

use crate::DEFAULT_CODEPAGE;

/// Windows console code page that produces bytes in `encoding`
///
/// The remote shell is created with this code page so its output decodes with
/// the console's configured encoding. Encodings without a console code page
/// fall back to 437, the WinRM default.
pub fn codepage_for(encoding: &'static Encoding) -> u32 {
    let name = encoding.name();

    if let Some(number) = name.strip_prefix("windows-") {
        return number.parse().unwrap_or(DEFAULT_CODEPAGE);
    }
    if let Some(part) = name.strip_prefix("ISO-8859-") {
        // ISO-8859-8-I shares the visual code page
        let part = part.trim_end_matches("-I");
        return part.parse::<u32>().map(|n| 28590 + n).unwrap_or(DEFAULT_CODEPAGE);
    }

    match name {
        "UTF-8" => 65001,
        "IBM866" => 866,
        "Shift_JIS" => 932,
        "GBK" => 936,
        "gb18030" => 54936,
        "EUC-KR" => 949,
        "Big5" => 950,
        "EUC-JP" => 20932,
        "ISO-2022-JP" => 50220,
        "KOI8-R" => 20866,
        "KOI8-U" => 21866,
        "macintosh" => 10000,
        _ => DEFAULT_CODEPAGE,
    }
}
