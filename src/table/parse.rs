// src/table/parse.rs

use crate::config::HeaderDetection;
use crate::table::header::{is_comment, locate_header, strip_preamble};
use crate::table::utils::clean_str;
use crate::table::RawTable;
use csv::{ReaderBuilder, Trim};
use std::io::Cursor;
use tracing::{debug, warn};

/// Comma-delimited parse. First record is the header. `None` when the csv
/// reader errors or the text holds no records.
fn parse_comma(text: &str, comment: Option<char>) -> Option<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .comment(comment.filter(|c| c.is_ascii()).map(|c| c as u8))
        .from_reader(Cursor::new(text.as_bytes()));

    let mut records = rdr.records();
    let headers: Vec<String> = match records.next()? {
        Ok(rec) => rec.iter().map(clean_str).collect(),
        Err(e) => {
            debug!(error = %e, "comma parse failed on header");
            return None;
        }
    };

    let mut rows = Vec::new();
    for (idx, result) in records.enumerate() {
        match result {
            Ok(rec) => rows.push(rec.iter().map(clean_str).collect()),
            Err(e) => {
                debug!(record = idx, error = %e, "comma parse failed");
                return None;
            }
        }
    }
    Some(RawTable { headers, rows })
}

/// Whitespace-delimited parse, one record per non-blank line.
fn parse_whitespace(text: &str, comment: Option<char>) -> RawTable {
    let mut lines = text
        .lines()
        .filter(|l| !l.trim().is_empty() && !is_comment(l, comment))
        .map(|l| l.split_whitespace().map(clean_str).collect::<Vec<_>>());

    let headers = lines.next().unwrap_or_default();
    RawTable {
        headers,
        rows: lines.collect(),
    }
}

/// Parse delimited text: comma first, whitespace when the comma parse fails
/// or collapses everything into a single column.
pub fn parse_delimited(text: &str, comment: Option<char>) -> RawTable {
    match parse_comma(text, comment) {
        Some(t) if t.headers.len() > 1 => t,
        _ => {
            debug!("falling back to whitespace-delimited parse");
            parse_whitespace(text, comment)
        }
    }
}

/// Header detection followed by the delimited parse. Returns `None` when the
/// text yields no header or no usable rows.
pub fn parse_text(text: &str, policy: &HeaderDetection) -> Option<RawTable> {
    let table = match locate_header(text, policy) {
        Some(idx) => {
            debug!(preamble_lines = idx, "header located");
            parse_delimited(&strip_preamble(text, idx), policy.comment)
        }
        None => {
            warn!(
                scanned = policy.scan_lines,
                "no header line matched, parsing text as-is"
            );
            parse_delimited(text, policy.comment)
        }
    };
    if table.is_empty() {
        None
    } else {
        Some(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_table_is_ragged_tolerant() {
        let t = parse_delimited("Year,Jan,Feb\n2020,1.0,1.2\n2021,1.1\n", None);
        assert_eq!(t.headers, vec!["Year", "Jan", "Feb"]);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[1], vec!["2021", "1.1"]);
    }

    #[test]
    fn whitespace_fallback_when_single_column() {
        let text = "time   global\n2002.29  1.5\n2002.37  -0.3\n";
        let t = parse_delimited(text, None);
        assert_eq!(t.headers, vec!["time", "global"]);
        assert_eq!(t.rows[1], vec!["2002.37", "-0.3"]);
    }

    #[test]
    fn comments_are_skipped_in_both_modes() {
        let t = parse_delimited("# c\ntime,v\n# mid\n1,2\n", Some('#'));
        assert_eq!(t.rows, vec![vec!["1".to_string(), "2".to_string()]]);
        let w = parse_delimited("# c\ntime v\n1 2\n", Some('#'));
        assert_eq!(w.headers, vec!["time", "v"]);
        assert_eq!(w.rows.len(), 1);
    }

    #[test]
    fn preamble_is_discarded() {
        let policy = HeaderDetection {
            required_tokens: vec!["Year".into()],
            any_tokens: vec!["Jan".into()],
            ..HeaderDetection::default()
        };
        let text = "Land-Ocean: Global Means\nYear,Jan,Feb\n2020,1.0,1.2\n";
        let t = parse_text(text, &policy).unwrap();
        assert_eq!(t.headers[0], "Year");
        assert_eq!(t.rows.len(), 1);
    }

    #[test]
    fn direct_parse_when_no_header_found() {
        let policy = HeaderDetection {
            required_tokens: vec!["Year".into()],
            ..HeaderDetection::default()
        };
        let t = parse_text("yr,val\n2000,3\n", &policy).unwrap();
        assert_eq!(t.headers, vec!["yr", "val"]);
    }

    #[test]
    fn empty_text_is_unparseable() {
        assert!(parse_text("", &HeaderDetection::default()).is_none());
        assert!(parse_text("just a title line\n", &HeaderDetection::default()).is_none());
    }
}
