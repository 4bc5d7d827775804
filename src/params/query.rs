//! Form-urlencoded parameter sets.
//!
//! Query strings and POST bodies share the `key=value&key=value` shape and
//! are decoded the same way (`+` is a space, `%XX` escapes, split on the
//! first `=`). Repeated names are kept, in order.

use url::form_urlencoded;

/// An ordered list of decoded `(name, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a query string (without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        Self::from_form(query.as_bytes())
    }

    /// Decode a form-urlencoded body. Invalid UTF-8 is replaced lossily.
    pub fn from_form(input: &[u8]) -> Self {
        let pairs = form_urlencoded::parse(input)
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        Self { pairs }
    }

    /// Combine URL parameters with body parameters.
    ///
    /// Names present in `body` replace every URL value of that name; the
    /// remaining URL pairs come first, followed by all body pairs.
    pub fn merged_with(self, body: &Params) -> Params {
        let mut pairs: Vec<(String, String)> = self
            .pairs
            .into_iter()
            .filter(|(name, _)| !body.contains(name))
            .collect();
        pairs.extend(body.pairs.iter().cloned());
        Params { pairs }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(n, _)| n == name)
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(params: &Params) -> Vec<(&str, &str)> {
        params.iter().collect()
    }

    #[test]
    fn decodes_query_strings() {
        let params = Params::from_query("name=J%C3%BCrgen+K&empty=&flag&eq=a=b");
        assert_eq!(
            pairs(&params),
            [("name", "Jürgen K"), ("empty", ""), ("flag", ""), ("eq", "a=b")]
        );
    }

    #[test]
    fn keeps_repeated_names_in_order() {
        let params = Params::from_form(b"name=alice&name=bob");
        assert_eq!(pairs(&params), [("name", "alice"), ("name", "bob")]);
    }

    #[test]
    fn empty_input_has_no_pairs() {
        assert!(Params::from_query("").is_empty());
        assert!(Params::from_form(b"&&").is_empty());
    }

    #[test]
    fn body_wins_on_collision() {
        let url = Params::from_query("a=1&b=2&a=3");
        let body = Params::from_form(b"a=9&c=4");
        let merged = url.merged_with(&body);
        assert_eq!(pairs(&merged), [("b", "2"), ("a", "9"), ("c", "4")]);
    }
}
