use std::collections::HashMap;

use memchr::memmem;

use crate::{error::ConfigError, Result, SequenceRecord};

/// A query compiled for substring search
///
/// A query containing `*` is split into fragments that must appear in order;
/// without `*` it is a single plain substring.
struct Pattern {
    text: String,
    fragments: Vec<memmem::Finder<'static>>,
}
impl Pattern {
    fn new(text: String, wildcard: bool) -> Self {
        let fragments = if wildcard {
            text.split('*')
                .filter(|fragment| !fragment.is_empty())
                .map(|fragment| memmem::Finder::new(fragment.as_bytes()).into_owned())
                .collect()
        } else {
            vec![memmem::Finder::new(text.as_bytes()).into_owned()]
        };
        Self { text, fragments }
    }

    /// Whether every fragment occurs in `haystack`, in order and without overlap
    fn is_found_in(&self, haystack: &[u8]) -> bool {
        let mut pos = 0;
        for finder in &self.fragments {
            match finder.find(&haystack[pos..]) {
                Some(offset) => pos += offset + finder.needle().len(),
                None => return false,
            }
        }
        true
    }
}

/// The compiled set of extraction queries
///
/// Records are matched by name or by sequence content; the first query in
/// list order that matches a record wins and becomes its demultiplexing key.
///
/// | mode            | wildcard | matched against                                |
/// |-----------------|----------|------------------------------------------------|
/// | name            | no       | equality with the name or the Illumina barcode |
/// | name            | yes      | `*`-glob substring of the header               |
/// | content         | no       | substring of the sequence                      |
/// | content         | yes      | `*`-glob substring of name, description or sequence |
pub struct QuerySet {
    patterns: Vec<Pattern>,
    exact: HashMap<String, usize>,
    search_in_data: bool,
    wildcard: bool,
}
impl QuerySet {
    pub fn new<I, S>(queries: I, search_in_data: bool, wildcard: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<Pattern> = queries
            .into_iter()
            .map(Into::into)
            .filter(|query: &String| !query.is_empty())
            .map(|query| Pattern::new(query, wildcard))
            .collect();
        if patterns.is_empty() {
            return Err(ConfigError::NoQueries.into());
        }

        let mut exact = HashMap::with_capacity(patterns.len());
        for (index, pattern) in patterns.iter().enumerate() {
            exact.entry(pattern.text.clone()).or_insert(index);
        }

        Ok(Self {
            patterns,
            exact,
            search_in_data,
            wildcard,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Text of the `index`-th query
    #[must_use]
    pub fn query(&self, index: usize) -> &str {
        &self.patterns[index].text
    }

    /// Index of the first query matching `record`
    #[must_use]
    pub fn find(&self, record: &SequenceRecord) -> Option<usize> {
        if !self.search_in_data && !self.wildcard {
            let by_name = self.exact.get(record.name()).copied();
            let by_barcode = record.barcode().and_then(|bc| self.exact.get(bc).copied());
            return match (by_name, by_barcode) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
        (0..self.patterns.len()).find(|&index| self.is_match(index, record))
    }

    /// Whether the `index`-th query matches `record`
    #[must_use]
    pub fn is_match(&self, index: usize, record: &SequenceRecord) -> bool {
        let pattern = &self.patterns[index];
        match (self.search_in_data, self.wildcard) {
            (false, false) => {
                record.name() == pattern.text || record.barcode() == Some(pattern.text.as_str())
            }
            (false, true) => {
                pattern.is_found_in(record.name().as_bytes())
                    || (!record.description().is_empty()
                        && pattern.is_found_in(record.header().as_bytes()))
            }
            (true, false) => pattern.is_found_in(record.sequence()),
            (true, true) => {
                pattern.is_found_in(record.name().as_bytes())
                    || pattern.is_found_in(record.description().as_bytes())
                    || pattern.is_found_in(record.sequence())
            }
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::Error;

    fn illumina(name: &str, barcode: &str, sequence: &[u8]) -> SequenceRecord {
        SequenceRecord::new(name, sequence.to_vec()).with_description(format!("1:N:0:{barcode}"))
    }

    #[test]
    fn test_empty_queries() {
        assert!(matches!(
            QuerySet::new(Vec::<String>::new(), false, false),
            Err(Error::ConfigError(ConfigError::NoQueries))
        ));
        assert!(QuerySet::new([""], false, false).is_err());
    }

    #[test]
    fn test_exact_name_and_barcode() -> Result<()> {
        let set = QuerySet::new(["read_2", "GATTACA"], false, false)?;
        assert_eq!(set.find(&illumina("read_1", "GATTACA", b"ACGT")), Some(1));
        assert_eq!(set.find(&illumina("read_2", "CCCC", b"ACGT")), Some(0));
        assert_eq!(set.find(&illumina("read_2", "GATTACA", b"ACGT")), Some(0));
        assert_eq!(set.find(&illumina("read_3", "CCCC", b"GATTACA")), None);
        // exact mode never matches substrings
        assert_eq!(set.find(&illumina("read_22", "GATTACAA", b"ACGT")), None);
        Ok(())
    }

    #[test]
    fn test_wildcard_name() -> Result<()> {
        let set = QuerySet::new(["sample*_7", "lane2"], false, true)?;
        assert_eq!(set.find(&SequenceRecord::new("sampleX_7", b"A".to_vec())), Some(0));
        assert_eq!(set.find(&SequenceRecord::new("x_lane2_y", b"A".to_vec())), Some(1));
        assert_eq!(set.find(&SequenceRecord::new("7_sample", b"A".to_vec())), None);
        let described = SequenceRecord::new("r", b"A".to_vec()).with_description("lane2");
        assert_eq!(set.find(&described), Some(1));
        Ok(())
    }

    #[test]
    fn test_content_search() -> Result<()> {
        let set = QuerySet::new(["TTTT", "ACG"], true, false)?;
        assert_eq!(set.find(&SequenceRecord::new("ACG", b"GGGG".to_vec())), None);
        assert_eq!(set.find(&SequenceRecord::new("r", b"GGACGTTTTG".to_vec())), Some(0));
        assert_eq!(set.find(&SequenceRecord::new("r", b"GGACGG".to_vec())), Some(1));
        Ok(())
    }

    #[test]
    fn test_content_wildcard_covers_whole_record() -> Result<()> {
        let set = QuerySet::new(["AC*TT"], true, true)?;
        assert_eq!(set.find(&SequenceRecord::new("r", b"GACGGTTA".to_vec())), Some(0));
        assert_eq!(set.find(&SequenceRecord::new("ACxTT", b"GGGG".to_vec())), Some(0));
        assert_eq!(set.find(&SequenceRecord::new("r", b"TTGGAC".to_vec())), None);

        let anything = QuerySet::new(["*"], true, true)?;
        assert_eq!(anything.find(&SequenceRecord::new("r", b"A".to_vec())), Some(0));
        Ok(())
    }

    #[test]
    fn test_first_query_wins() -> Result<()> {
        let set = QuerySet::new(["GG", "AC"], true, false)?;
        let record = SequenceRecord::new("r", b"ACGG".to_vec());
        assert_eq!(set.find(&record), Some(0));
        assert!(set.is_match(1, &record));
        assert_eq!(set.query(0), "GG");
        assert_eq!(set.len(), 2);
        Ok(())
    }
}
