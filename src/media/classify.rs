use super::types::{FormatType, QualityCategory};

/// Human-facing annotations derived from a raw format record.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub format_type: FormatType,
    pub category: QualityCategory,
    pub label: String,
    pub glyph: &'static str,
}

/// Classifies a format from its codecs, height, bitrate and note.
///
/// Total over its inputs: missing values fall through to the `Unknown`
/// branches, except for audio-only formats, whose bitrate ladder bottoms out
/// at `Low` even when no bitrate is known. The bitrate is only consulted for
/// audio-only formats. When the height is missing, a leading `<N>p` in the
/// format note (e.g. `720p60`) is used instead.
pub fn classify_format(
    vcodec: Option<&str>,
    acodec: Option<&str>,
    height: Option<u32>,
    bitrate: Option<f64>,
    note: Option<&str>,
) -> Classification {
    let video = usable_codec(vcodec);
    let audio = usable_codec(acodec);

    let format_type = match (video, audio) {
        (Some(_), Some(_)) => FormatType::Combined,
        (Some(_), None) => FormatType::VideoOnly,
        (None, Some(_)) => FormatType::AudioOnly,
        (None, None) => FormatType::Unknown,
    };

    let category = match format_type {
        FormatType::AudioOnly => audio_category(bitrate),
        _ => video_category(height.or_else(|| note.and_then(height_from_note))),
    };

    Classification {
        format_type,
        category,
        label: codec_label(video, audio),
        glyph: glyph(format_type),
    }
}

fn usable_codec(codec: Option<&str>) -> Option<&str> {
    codec
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("none") && !c.eq_ignore_ascii_case("null"))
}

fn video_category(height: Option<u32>) -> QualityCategory {
    match height.unwrap_or(0) {
        h if h >= 1080 => QualityCategory::Best,
        h if h >= 720 => QualityCategory::High,
        h if h >= 480 => QualityCategory::Medium,
        h if h > 0 => QualityCategory::Low,
        _ => QualityCategory::Unknown,
    }
}

fn audio_category(bitrate: Option<f64>) -> QualityCategory {
    match bitrate {
        Some(kbps) if kbps >= 256.0 => QualityCategory::Best,
        Some(kbps) if kbps >= 192.0 => QualityCategory::High,
        Some(kbps) if kbps >= 128.0 => QualityCategory::Medium,
        _ => QualityCategory::Low,
    }
}

fn height_from_note(note: &str) -> Option<u32> {
    let digits: String = note.trim().chars().take_while(char::is_ascii_digit).collect();
    let rest = &note.trim()[digits.len()..];
    if digits.is_empty() || !rest.starts_with('p') {
        return None;
    }
    digits.parse().ok()
}

fn codec_label(video: Option<&str>, audio: Option<&str>) -> String {
    let parts: Vec<String> = [video.map(video_codec_name), audio.map(audio_codec_name)]
        .into_iter()
        .flatten()
        .collect();

    if parts.is_empty() {
        "Unknown".to_string()
    } else {
        parts.join(" + ")
    }
}

fn video_codec_name(codec: &str) -> String {
    let lower = codec.to_ascii_lowercase();
    let known = if lower.contains("avc") || lower.contains("h264") {
        Some("H.264")
    } else if lower.contains("hev") || lower.contains("hvc") || lower.contains("h265") {
        Some("H.265")
    } else if lower.contains("vp09") || lower.contains("vp9") {
        Some("VP9")
    } else if lower.contains("vp8") {
        Some("VP8")
    } else if lower.contains("av01") || lower.contains("av1") {
        Some("AV1")
    } else {
        None
    };
    known.map_or_else(|| fallback_codec_name(codec), str::to_string)
}

fn audio_codec_name(codec: &str) -> String {
    let lower = codec.to_ascii_lowercase();
    let known = if lower.contains("mp4a") || lower.contains("aac") {
        Some("AAC")
    } else if lower.contains("opus") {
        Some("Opus")
    } else if lower.contains("vorbis") {
        Some("Vorbis")
    } else if lower.contains("mp3") {
        Some("MP3")
    } else if lower.contains("flac") {
        Some("FLAC")
    } else if lower.contains("ac-3") || lower.contains("ac3") {
        Some("AC3")
    } else {
        None
    };
    known.map_or_else(|| fallback_codec_name(codec), str::to_string)
}

fn fallback_codec_name(codec: &str) -> String {
    codec
        .split('.')
        .next()
        .unwrap_or(codec)
        .chars()
        .take(6)
        .collect::<String>()
        .to_uppercase()
}

fn glyph(format_type: FormatType) -> &'static str {
    match format_type {
        FormatType::Combined => "🎬",
        FormatType::VideoOnly => "📹",
        FormatType::AudioOnly => "🎵",
        FormatType::Unknown => "📄",
    }
}
