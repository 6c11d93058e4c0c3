//! HTML rendering for the song lookup pages.

use std::fmt::Write;

use crate::notes::measured_note_name;
use crate::songs::Song;

const STYLE: &str = r#"
        body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif; display: flex; justify-content: center; align-items: center; min-height: 100vh; margin: 0; background-color: #f0f2f5; color: #333; }
        .container { padding: 40px; background-color: white; border-radius: 12px; box-shadow: 0 8px 30px rgba(0,0,0,0.1); width: 90%; max-width: 800px; }
        h1 { color: #1a73e8; margin-top: 0; }
        .vocal-range { margin-bottom: 30px; padding: 15px; background-color: #f8f9fa; border-radius: 8px; }
        .vocal-range span { font-weight: bold; color: #1a73e8; }
        .song-card { padding: 15px; margin-bottom: 15px; border: 1px solid #e0e0e0; border-radius: 8px; }
        .song-title { font-weight: bold; font-size: 1.2em; margin-bottom: 5px; }
        .song-artist { color: #666; }
        .song-range { margin-top: 8px; font-size: 0.9em; color: #1a73e8; }
        .no-songs { padding: 20px; text-align: center; background-color: #f8f9fa; border-radius: 8px; }
        .back-button { display: inline-block; margin-top: 20px; padding: 10px 20px; background-color: #6c757d; color: white; text-decoration: none; border-radius: 5px; }
"#;

pub const RESULT_TITLE: &str = "あなたの音域に合った曲";
pub const NO_MATCH_MESSAGE: &str = "あなたの音域に完全に収まる曲が見つかりませんでした。";
const NO_MATCH_HINT: &str =
    "より多くの曲をチェックするには、もう少し高音域または低音域まで測定してみてください。";

/// Escape text for use in element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"ja\">\n<head>\n    <meta charset=\"UTF-8\">\n    \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    \
         <title>{title}</title>\n    <style>{style}    </style>\n</head>\n<body>\n    \
         <div class=\"container\">\n{body}    </div>\n</body>\n</html>\n",
        style = STYLE
    )
}

/// Result page for a lookup: the range echoed back plus matching songs
pub fn render_lookup_page(lowest_note: i32, highest_note: i32, songs: &[&Song]) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "        <h1>{}</h1>", RESULT_TITLE);
    let _ = writeln!(
        body,
        "        <div class=\"vocal-range\">\n            \
         <p>あなたの音域: <span>{}</span> から <span>{}</span></p>\n            \
         <p>MIDIノート番号: <span>{}</span> から <span>{}</span></p>\n        </div>",
        measured_note_name(lowest_note),
        measured_note_name(highest_note),
        lowest_note,
        highest_note
    );

    if songs.is_empty() {
        let _ = writeln!(
            body,
            "        <div class=\"no-songs\">\n            <p>{}</p>\n            <p>{}</p>\n        </div>",
            NO_MATCH_MESSAGE, NO_MATCH_HINT
        );
    } else {
        body.push_str("        <div class=\"songs-list\">\n            <h2>おすすめの曲</h2>\n");
        for song in songs {
            let _ = writeln!(
                body,
                "            <div class=\"song-card\">\n                \
                 <div class=\"song-title\">{}</div>\n                \
                 <div class=\"song-artist\">{}</div>\n                \
                 <div class=\"song-range\">音域: {} から {}</div>\n            </div>",
                escape_html(&song.title),
                escape_html(&song.artist),
                song.min_name(),
                song.max_name()
            );
        }
        body.push_str("        </div>\n");
    }

    body.push_str("        <a href=\"/\" class=\"back-button\">戻る</a>\n");
    document(RESULT_TITLE, &body)
}

/// Entry page with a form posting a measured range to `/songs`
pub fn render_index_page() -> String {
    let body = "        <h1>音域から曲を探す</h1>\n        \
                <form method=\"post\" action=\"/songs\" class=\"vocal-range\">\n            \
                <p><label>最低音 (MIDI) <input type=\"number\" name=\"lowest_note\" min=\"0\"></label></p>\n            \
                <p><label>最高音 (MIDI) <input type=\"number\" name=\"highest_note\" min=\"0\"></label></p>\n            \
                <button type=\"submit\" class=\"back-button\">曲を探す</button>\n        </form>\n";
    document("音域テスト", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#039;Jerry&#039;&lt;/b&gt;"
        );
        assert_eq!(escape_html("恋"), "恋");
    }

    #[test]
    fn test_unmeasured_range_shows_placeholders() {
        let html = render_lookup_page(0, 0, &[]);
        assert!(html.contains("<span>--</span> から <span>--</span>"));
        assert!(html.contains(NO_MATCH_MESSAGE));
    }

    #[test]
    fn test_songs_are_listed_and_escaped() {
        let song = Song::new("A <b>Song</b>", "Band & Co", 48, 60);
        let html = render_lookup_page(48, 60, &[&song]);
        assert!(html.contains("<span>C3</span> から <span>C4</span>"));
        assert!(html.contains("A &lt;b&gt;Song&lt;/b&gt;"));
        assert!(html.contains("Band &amp; Co"));
        assert!(html.contains("音域: C3 から C4"));
        assert!(!html.contains(NO_MATCH_MESSAGE));
    }

    #[test]
    fn test_index_page_posts_to_lookup() {
        let html = render_index_page();
        assert!(html.contains("action=\"/songs\""));
        assert!(html.contains("name=\"lowest_note\""));
        assert!(html.contains("name=\"highest_note\""));
    }
}
