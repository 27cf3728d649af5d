use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHtml {
    pub html: String,
    pub encoding_label: String,
    /// Malformed sequences were replaced with U+FFFD.
    pub had_errors: bool,
}

/// Decode a raw page body to UTF-8, best effort.
///
/// Order: BOM, then the `charset` parameter of the Content-Type header, then
/// a chardetng guess over the whole body. A header charset that does not
/// decode cleanly is treated as wrong and the guess wins. `tld` is the
/// top-level domain of the page host and sharpens the guess for legacy
/// encodings. Malformed sequences never fail the decode.
pub fn decode_html(bytes: &[u8], content_type: Option<&str>, tld: Option<&str>) -> DecodedHtml {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(&bytes[bom_len..], encoding);
    }

    let declared = content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()));
    if let Some(enc) = declared {
        let decoded = decode_with(bytes, enc);
        if !decoded.had_errors {
            return decoded;
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guessed = decode_with(bytes, detector.guess(tld.map(str::as_bytes), true));
    match declared {
        // Neither decodes cleanly: the declared charset is the better bet.
        Some(enc) if guessed.had_errors => decode_with(bytes, enc),
        _ => guessed,
    }
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|part| {
        let (name, value) = part.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']))
            .filter(|value| !value.is_empty())
    })
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedHtml {
    let (text, had_errors) = enc.decode_without_bom_handling(bytes);
    DecodedHtml {
        html: text.into_owned(),
        encoding_label: enc.name().to_string(),
        had_errors,
    }
}
