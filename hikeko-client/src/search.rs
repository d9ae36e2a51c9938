use pest::Parser as _;

use crate::api::BlogFilter;

#[derive(pest_derive::Parser)]
#[grammar = "search.pest"]
struct Parser;

// Unescape a quoted-string
fn unescape(s: &str) -> String {
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s);
    let mut res = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => res.extend(chars.next()),
            c => res.push(c),
        }
    }
    res
}

fn plain_text(input: &str) -> BlogFilter {
    match input.trim() {
        "" => BlogFilter::Latest,
        query => BlogFilter::Search {
            query: String::from(query),
        },
    }
}

/// Turns what the user typed in the search bar into a filter
///
/// A lone `#tag` or `@username` selects that tag or author, nothing selects
/// the latest blogs, and anything else is a title search.
pub fn parse_search(input: &str) -> BlogFilter {
    let terms = match Parser::parse(Rule::search, input) {
        Ok(mut pairs) => match pairs.next() {
            Some(search) => search.into_inner(),
            None => return plain_text(input),
        },
        Err(err) => {
            tracing::debug!(%err, "unparseable search, using it as plain text");
            return plain_text(input);
        }
    };

    let mut selectors = Vec::new();
    let mut texts = Vec::new();
    let mut has_words = false;
    for t in terms {
        match t.as_rule() {
            Rule::tag => {
                texts.push(String::from(t.as_str()));
                let tag = t.into_inner().as_str();
                selectors.push(BlogFilter::tag(String::from(tag)));
            }
            Rule::author => {
                texts.push(String::from(t.as_str()));
                let username = t.into_inner().as_str();
                selectors.push(BlogFilter::Author {
                    username: String::from(username),
                });
            }
            Rule::phrase => {
                has_words = true;
                texts.push(unescape(t.as_str()));
            }
            Rule::word => {
                has_words = true;
                texts.push(String::from(t.as_str()));
            }
            Rule::EOI => (),
            r => unreachable!("search unexpected term: {:?}", r),
        }
    }

    match (selectors.len(), has_words) {
        (0, false) => BlogFilter::Latest,
        (1, false) => selectors.swap_remove(0),
        _ => BlogFilter::Search {
            query: texts.join(" "),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(s: &str) -> BlogFilter {
        BlogFilter::Search {
            query: String::from(s),
        }
    }

    #[test]
    fn empty() {
        assert_eq!(parse_search(""), BlogFilter::Latest);
        assert_eq!(parse_search("  \t "), BlogFilter::Latest);
    }

    #[test]
    fn selectors() {
        assert_eq!(
            parse_search("#Travel"),
            BlogFilter::tag(String::from("Travel"))
        );
        assert_eq!(
            parse_search("  @jane.doe "),
            BlogFilter::Author {
                username: String::from("jane.doe")
            }
        );
    }

    #[test]
    fn words() {
        assert_eq!(parse_search("alps"), search("alps"));
        assert_eq!(parse_search("  alps   hiking "), search("alps hiking"));
        assert_eq!(parse_search("#foo!"), search("#foo!"));
        assert_eq!(parse_search("#"), search("#"));
    }

    #[test]
    fn mixed_terms_become_a_search() {
        assert_eq!(parse_search("#travel alps"), search("#travel alps"));
        assert_eq!(parse_search("#travel #food"), search("#travel #food"));
        assert_eq!(parse_search("@jane #food"), search("@jane #food"));
    }

    #[test]
    fn phrases() {
        assert_eq!(parse_search(r#""the  alps""#), search("the  alps"));
        assert_eq!(parse_search(r##""#travel""##), search("#travel"));
        assert_eq!(parse_search(r#""foo\" bar""#), search(r#"foo" bar"#));
        assert_eq!(parse_search(r#""foo\\ bar""#), search(r#"foo\ bar"#));
    }

    #[test]
    fn unparseable_input_is_plain_text() {
        assert_eq!(parse_search(r#" "unterminated "#), search(r#""unterminated"#));
        assert_eq!(parse_search(r#"foo"bar"#), search(r#"foo"bar"#));
    }
}
