use crate::sdk::geo::Coordinate;
use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub distance_km: f64,
    pub eta_minutes: f64,
    pub steps: Vec<String>,
    pub polyline: Vec<Coordinate>,
}

impl RouteSummary {
    /// Route between a point and itself.
    pub fn zero(at: Coordinate) -> Self {
        Self {
            distance_km: 0.0,
            eta_minutes: 0.0,
            steps: Vec::new(),
            polyline: vec![at],
        }
    }

    /// Text for the ETA card, e.g. `0.6 km • 3 min`.
    pub fn headline(&self) -> String {
        format!("{:.1} km • {} min", self.distance_km, self.eta_minutes.round() as i64)
    }
}

/// Decodes an encoded polyline string at 1e-5 precision.
///
/// Returns `None` if the string is truncated mid-value or holds a byte outside the alphabet.
pub fn decode_polyline(encoded: &str) -> Option<Vec<Coordinate>> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        lat += next_delta(bytes, &mut index)?;
        lon += next_delta(bytes, &mut index)?;
        points.push(Coordinate::new(lat as f64 / 1e5, lon as f64 / 1e5));
    }
    Some(points)
}

fn next_delta(bytes: &[u8], index: &mut usize) -> Option<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let byte = *bytes.get(*index)?;
        if !(63..=126).contains(&byte) || shift > 60 {
            return None;
        }
        *index += 1;
        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Some(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

/// Strips markup from a step instruction and decodes the handful of entities the API emits.
pub fn clean_instruction(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut tag: Option<String> = None;
    for c in html.chars() {
        if let Some(name) = tag.as_mut() {
            if c != '>' {
                name.push(c);
                continue;
            }
            if is_block_tag(name) {
                text.push(' ');
            }
            tag = None;
        } else if c == '<' {
            tag = Some(String::new());
        } else {
            text.push(c);
        }
    }
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// "Turn left" and "Destination will be on the right" arrive as sibling divs
fn is_block_tag(tag: &str) -> bool {
    let name = tag
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or_default();
    name.eq_ignore_ascii_case("div") || name.eq_ignore_ascii_case("br")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn decodes_reference_polyline() {
        let points = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        assert_eq!(points.len(), 3);
        assert!(close(points[0].latitude, 38.5) && close(points[0].longitude, -120.2));
        assert!(close(points[1].latitude, 40.7) && close(points[1].longitude, -120.95));
        assert!(close(points[2].latitude, 43.252) && close(points[2].longitude, -126.453));
    }

    #[test]
    fn empty_polyline_has_no_points() {
        assert_eq!(decode_polyline(""), Some(Vec::new()));
    }

    #[test]
    fn truncated_polyline_is_rejected() {
        assert_eq!(decode_polyline("_p~iF~ps|"), None);
        assert_eq!(decode_polyline("_p~iF\n"), None);
    }

    #[test]
    fn instruction_markup_is_removed() {
        let raw = "Turn <b>left</b> onto <b>Pike St</b><div style=\"font-size:0.9em\">Destination will be on the right</div>";
        assert_eq!(
            clean_instruction(raw),
            "Turn left onto Pike St Destination will be on the right"
        );
        assert_eq!(clean_instruction("Head&nbsp;north on <b>1st &amp; Pine</b>"), "Head north on 1st & Pine");
    }

    #[test]
    fn inline_tags_do_not_split_words_from_punctuation() {
        assert_eq!(clean_instruction("Turn right onto <b>Pike St</b>."), "Turn right onto Pike St.");
        assert_eq!(clean_instruction("Slight <B>left</B>, then merge"), "Slight left, then merge");
        assert_eq!(clean_instruction("Continue<br/>Toll road"), "Continue Toll road");
        assert_eq!(clean_instruction("Exit<div>Toll road</div>"), "Exit Toll road");
    }

    #[test]
    fn headline_rounds_minutes() {
        let summary = RouteSummary {
            distance_km: 0.6,
            eta_minutes: 2.6,
            steps: Vec::new(),
            polyline: Vec::new(),
        };
        assert_eq!(summary.headline(), "0.6 km • 3 min");
    }
}
