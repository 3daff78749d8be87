//! Parser for `topic[:p1,p2,...]` tokens.

use std::collections::{btree_map::Entry, BTreeMap, BTreeSet};

use super::error::{Error, Result, SyntaxError};

/// Which partitions of a topic a token selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionSelector {
    /// Every partition the cluster reports for the topic.
    All,

    /// The listed partitions, never empty.
    Explicit(BTreeSet<i32>),
}

impl PartitionSelector {
    /// Union of two selections of the same topic, [`All`](Self::All) absorbs everything.
    fn merge(&mut self, other: PartitionSelector) {
        match (self, other) {
            (Self::All, _) => {}
            (this, Self::All) => *this = Self::All,
            (Self::Explicit(this), Self::Explicit(other)) => this.extend(other),
        }
    }
}

/// Topics mapped to their selected partitions, ordered by topic name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicPartitionSpec(BTreeMap<String, PartitionSelector>);

impl TopicPartitionSpec {
    /// Parses and merges `tokens`, repeated topics accumulate their partitions.
    ///
    /// ```
    /// # use logdirs::logdirs::spec::{PartitionSelector, TopicPartitionSpec};
    /// let spec = TopicPartitionSpec::parse(["foo:1,2", "bar", "foo:3"]).unwrap();
    /// assert_eq!(spec.get("foo"), Some(&PartitionSelector::Explicit([1, 2, 3].into())));
    /// assert_eq!(spec.get("bar"), Some(&PartitionSelector::All));
    /// ```
    pub fn parse<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut spec = Self::default();
        for token in tokens {
            let token = token.as_ref();
            let (topic, selector) = parse_token(token).map_err(|source| Error::Syntax {
                token: token.to_string(),
                source,
            })?;
            spec.insert(topic, selector);
        }
        Ok(spec)
    }

    pub fn insert(&mut self, topic: impl Into<String>, selector: PartitionSelector) {
        match self.0.entry(topic.into()) {
            Entry::Vacant(v) => {
                v.insert(selector);
            }
            Entry::Occupied(mut o) => o.get_mut().merge(selector),
        }
    }

    pub fn get(&self, topic: &str) -> Option<&PartitionSelector> {
        self.0.get(topic)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Topics that select all of their partitions and thus need a metadata lookup.
    pub fn unresolved_topics(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|(_, selector)| matches!(selector, PartitionSelector::All))
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PartitionSelector)> {
        self.0.iter()
    }
}

impl IntoIterator for TopicPartitionSpec {
    type Item = (String, PartitionSelector);
    type IntoIter = std::collections::btree_map::IntoIter<String, PartitionSelector>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Splits `topic:1,2,3` on the first `:`, a token without `:` selects all partitions.
pub fn parse_token(token: &str) -> Result<(String, PartitionSelector), SyntaxError> {
    let (topic, partitions) = match token.split_once(':') {
        Some((topic, partitions)) => (topic, Some(partitions)),
        None => (token, None),
    };

    if topic.is_empty() {
        return Err(SyntaxError::EmptyTopic);
    }

    let selector = match partitions {
        None => PartitionSelector::All,
        Some("") => return Err(SyntaxError::EmptyPartitionList),
        Some(partitions) => PartitionSelector::Explicit(
            partitions
                .split(',')
                .map(parse_partition)
                .collect::<Result<_, _>>()?,
        ),
    };

    Ok((topic.to_string(), selector))
}

fn parse_partition(value: &str) -> Result<i32, SyntaxError> {
    let partition = value
        .parse::<i32>()
        .map_err(|source| SyntaxError::InvalidPartition {
            value: value.to_string(),
            source,
        })?;

    if partition < 0 {
        return Err(SyntaxError::NegativePartition(partition));
    }
    Ok(partition)
}
