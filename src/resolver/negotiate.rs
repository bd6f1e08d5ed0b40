//! Content negotiation.
//!
//! Turns an `Accept` header and an optional explicit format into the ordered
//! list of media types to try against a resource's dissemination services.

/// One parsed `Accept` entry.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    media_type: String,
    q: f32,
}

/// Parse the q value of an entry's parameters. Anything but digits and `.`
/// is dropped before parsing; absent or unparseable means 1.
fn quality(params: &[&str]) -> f32 {
    params
        .iter()
        .filter_map(|p| {
            let (key, value) = p.split_once('=')?;
            key.trim().eq_ignore_ascii_case("q").then_some(value)
        })
        .last()
        .and_then(|value| {
            let numeric: String = value.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
            numeric.parse::<f32>().ok()
        })
        .unwrap_or(1.0)
}

fn parse_accept(accept: &str) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();
    for entry in accept.trim().split(',') {
        let mut parts = entry.split(';');
        let media_type = parts.next().unwrap_or_default().trim();
        if media_type.is_empty() {
            continue;
        }
        let params: Vec<&str> = parts.collect();
        let q = quality(&params);

        // a repeated media type keeps its first position and takes the later q
        match candidates.iter_mut().find(|c| c.media_type == media_type) {
            Some(existing) => existing.q = q,
            None => candidates.push(Candidate {
                media_type: media_type.to_string(),
                q,
            }),
        }
    }
    candidates
}

/// Media types in the order they should be tried.
///
/// Accept entries are ordered by descending q; equal q keeps header order.
/// `format`, when given, always comes first.
pub fn negotiate(accept: Option<&str>, format: Option<&str>) -> Vec<String> {
    let mut candidates = accept.map(parse_accept).unwrap_or_default();
    // stable: ties keep their original relative order
    candidates.sort_by(|a, b| b.q.total_cmp(&a.q));

    let mut ordered: Vec<String> = Vec::with_capacity(candidates.len() + 1);
    if let Some(format) = format {
        ordered.push(format.to_string());
    }
    ordered.extend(candidates.into_iter().map(|c| c.media_type));
    ordered
}
