//! Minimal SSML document builder.

/// Default voice for synthesis.
pub const DEFAULT_VOICE: &str = "zh-CN-XiaoxiaoNeural";

/// Default document language.
pub const DEFAULT_LANG: &str = "zh-CN";

/// Wraps `text` in a `<speak><voice>` document for `voice`.
///
/// The text is XML-escaped; `voice` and `lang` are inserted as given.
pub fn build_ssml(voice: &str, lang: &str, text: &str) -> String {
    format!(
        r#"<speak xmlns="http://www.w3.org/2001/10/synthesis" xmlns:mstts="http://www.w3.org/2001/mstts" xmlns:emo="http://www.w3.org/2009/10/emotionml" version="1.0" xml:lang="{lang}"><voice name="{voice}">{}</voice></speak>"#,
        escape(text)
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_ssml() {
        let ssml = build_ssml(DEFAULT_VOICE, DEFAULT_LANG, "测试文本");
        assert!(ssml.starts_with("<speak "));
        assert!(ssml.contains(r#"xml:lang="zh-CN""#));
        assert!(ssml.ends_with(r#"<voice name="zh-CN-XiaoxiaoNeural">测试文本</voice></speak>"#));
    }

    #[test]
    fn test_escape() {
        let ssml = build_ssml("v", "en-US", r#"a < b & "c" > 'd'"#);
        assert!(ssml.contains("a &lt; b &amp; &quot;c&quot; &gt; &apos;d&apos;"));
    }
}
