// Link header parsing for GitHub-style pagination

/// Pull the `rel="next"` URL out of a `Link` header
///
/// The header looks like:
/// `<https://api.github.com/repositories?since=364>; rel="next", <...>; rel="first"`
///
/// First matching segment wins. Anything malformed is skipped, and a missing
/// or empty header means there is no next page.
pub fn parse_next_link(header: Option<&str>) -> Option<String> {
    let header = header?.trim();
    if header.is_empty() {
        return None;
    }

    for part in header.split(',') {
        let mut segments = part.split(';');
        let (Some(url_part), Some(rel_part)) = (segments.next(), segments.next()) else {
            continue;
        };

        if !rel_part.trim().contains(r#"rel="next""#) {
            continue;
        }

        let url = url_part
            .trim()
            .trim_matches(|c: char| c == '<' || c == '>' || c.is_whitespace());

        if url.is_empty() {
            return None;
        }
        return Some(url.to_string());
    }

    None
}
