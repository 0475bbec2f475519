use crate::text_metrics;

const ELLIPSIS: char = '…';
const SHRINK_STEP: f64 = 0.9;
/// A label is only worth drawing if this many characters fit along it.
const MIN_VISIBLE_CHARS: usize = 3;

/// Room a label may occupy, measured in pixels. `along` follows the text
/// baseline and `across` is perpendicular to it.
#[derive(Debug, Clone, Copy)]
pub struct LabelBox {
    pub along: f64,
    pub across: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct FitOptions<'a> {
    pub base_size: f64,
    pub min_size: f64,
    pub max_lines: usize,
    pub line_height: f64,
    pub font_family: &'a str,
    pub fast_metrics: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedLabel {
    pub lines: Vec<String>,
    pub font_size: f64,
}

/// Shapes `text` into `room`, shrinking the font before wrapping and
/// truncating. Returns `None` when the wedge is too narrow for even a short
/// single line at the minimum font size.
pub fn fit_label(text: &str, room: LabelBox, options: &FitOptions<'_>) -> Option<FittedLabel> {
    let text = text.trim();
    if text.is_empty() || options.base_size <= 0.0 {
        return None;
    }
    let min_size = options.min_size.min(options.base_size).max(0.5);
    let max_lines = options.max_lines.max(1);

    let mut size = options.base_size;
    loop {
        let lines_room = lines_that_fit(room.across, size, options.line_height).min(max_lines);
        if lines_room > 0 {
            let lines = wrap_text(text, room.along, size, options);
            if lines.len() <= lines_room && lines.iter().all(|l| width(l, size, options) <= room.along)
            {
                return Some(FittedLabel {
                    lines,
                    font_size: size,
                });
            }
        }
        let next = size * SHRINK_STEP;
        if next < min_size {
            break;
        }
        size = next;
    }

    // Smallest size: gate on the room across, then truncate along.
    let lines_room = lines_that_fit(room.across, size, options.line_height).min(max_lines);
    if lines_room == 0 {
        return None;
    }
    let head: String = text.chars().take(MIN_VISIBLE_CHARS).collect();
    if width(&head, size, options) > room.along {
        return None;
    }
    let mut lines = wrap_text(text, room.along, size, options);
    if lines.len() > lines_room {
        lines.truncate(lines_room);
        if let Some(last) = lines.last_mut() {
            *last = truncate_with_ellipsis(&format!("{last}{ELLIPSIS}"), room.along, size, options);
        }
    }
    for line in lines.iter_mut() {
        if width(line, size, options) > room.along {
            *line = truncate_with_ellipsis(line, room.along, size, options);
        }
    }
    Some(FittedLabel {
        lines,
        font_size: size,
    })
}

fn lines_that_fit(across: f64, size: f64, line_height: f64) -> usize {
    let line = size * line_height.max(1.0);
    if across < size || line <= 0.0 {
        return 0;
    }
    // The first line needs only the glyph height, later ones a full line.
    1 + ((across - size) / line).floor() as usize
}

/// Greedy word wrap; words wider than the line (or unspaced CJK runs) are
/// broken between characters.
pub fn wrap_text(text: &str, max_width: f64, size: f64, options: &FitOptions<'_>) -> Vec<String> {
    if width(text, size, options) <= max_width {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if width(&candidate, size, options) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if width(word, size, options) <= max_width {
            current.push_str(word);
            continue;
        }
        for ch in word.chars() {
            current.push(ch);
            if current.chars().count() > 1 && width(&current, size, options) > max_width {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn truncate_with_ellipsis(line: &str, max_width: f64, size: f64, options: &FitOptions<'_>) -> String {
    let mut chars: Vec<char> = line.trim_end_matches(ELLIPSIS).chars().collect();
    loop {
        let mut candidate: String = chars.iter().collect();
        candidate.push(ELLIPSIS);
        if chars.is_empty() || width(&candidate, size, options) <= max_width {
            return candidate;
        }
        chars.pop();
    }
}

fn width(text: &str, size: f64, options: &FitOptions<'_>) -> f64 {
    text_width(text, size, options.font_family, options.fast_metrics)
}

pub fn text_width(text: &str, font_size: f64, font_family: &str, fast_metrics: bool) -> f64 {
    if fast_metrics {
        return fallback_text_width(text, font_size);
    }
    text_metrics::measure_text_width(text, font_size as f32, font_family)
        .map(f64::from)
        .unwrap_or_else(|| fallback_text_width(text, font_size))
}

pub fn fallback_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().map(char_width_factor).sum::<f64>() * font_size
}

/// Approximate advance per em for a sans-serif face.
pub fn char_width_factor(ch: char) -> f64 {
    match ch {
        // Full-width punctuation, kana, CJK ideographs and full-width forms.
        '\u{2E80}'..='\u{9FFF}' | '\u{F900}'..='\u{FAFF}' | '\u{FF01}'..='\u{FF60}' => 1.0,
        ' ' => 0.306,
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '|' | '!' | '\'' => 0.25,
        'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '{' | '}' | '-' => 0.34,
        'I' | '1' => 0.33,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.9,
        'A'..='Z' => 0.66,
        ELLIPSIS => 1.0,
        _ if ch.is_ascii() => 0.56,
        _ => 0.8,
    }
}
