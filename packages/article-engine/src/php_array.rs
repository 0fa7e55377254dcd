//! Serialized-array codec for the CMS internal-linking plugin.
//!
//! The plugin stores its keyword list as a PHP-serialized array of
//! strings: `a:N:{i:0;s:LEN:"value";…}` where LEN is the UTF-8 byte
//! length of the value. The format is a fixed legacy wire contract; this
//! module is the only code that knows it.

/// Encode a list of keywords as a PHP-serialized string array.
pub fn encode_keyword_array(keywords: &[String]) -> String {
    let mut out = format!("a:{}:{{", keywords.len());
    for (i, keyword) in keywords.iter().enumerate() {
        out.push_str(&format!("i:{};s:{}:\"{}\";", i, keyword.len(), keyword));
    }
    out.push('}');
    out
}
