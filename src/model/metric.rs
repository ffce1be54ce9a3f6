use std::collections::BTreeMap;

use super::statistic::Statistic;

pub type MetricName = String;

pub type DimensionName = String;

pub type DimensionValue = String;

pub type Dimensions = BTreeMap<DimensionName, DimensionValue>;

/// Dimension key meaning "the namespace-wide aggregate of a metric".
pub const AGGREGATE_DIMENSION: &str = "MetricName";

/// Group label printed for aggregate series.
pub const AGGREGATE_GROUP: &str = "Total";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionKey {
    Named(DimensionName),
    Aggregate,
}

impl DimensionKey {
    pub fn as_str(&self) -> &str {
        match self {
            DimensionKey::Named(name) => name,
            DimensionKey::Aggregate => AGGREGATE_DIMENSION,
        }
    }
}

impl From<&str> for DimensionKey {
    fn from(key: &str) -> Self {
        if key == AGGREGATE_DIMENSION {
            DimensionKey::Aggregate
        } else {
            DimensionKey::Named(key.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    namespace: String,
    name_prefix: Option<String>,
    dimension: Option<DimensionKey>,
}

impl MetricQuery {
    pub fn new<N: Into<String>>(
        namespace: N,
        name_prefix: Option<String>,
        dimension: Option<DimensionKey>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name_prefix,
            dimension,
        }
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline]
    pub fn name_prefix(&self) -> Option<&str> {
        self.name_prefix.as_deref()
    }

    #[inline]
    pub fn dimension(&self) -> Option<&DimensionKey> {
        self.dimension.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    name: MetricName,
    namespace: String,
    dimensions: Dimensions,
    statistics: Vec<Statistic>,
}

impl MetricDescriptor {
    pub fn new<N, S>(name: N, namespace: S, dimensions: Dimensions) -> Self
    where
        N: Into<MetricName>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            dimensions,
            statistics: Statistic::ALL.to_vec(),
        }
    }

    pub fn with_statistics(mut self, statistics: Vec<Statistic>) -> Self {
        self.statistics = statistics;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline]
    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    #[inline]
    pub fn statistics(&self) -> &[Statistic] {
        &self.statistics
    }
}

/// A descriptor that passed filtering, bound to the dimension value its
/// statistics are requested for. `dimension` is `None` for aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    descriptor: MetricDescriptor,
    key: DimensionKey,
    group: DimensionValue,
}

impl Series {
    /// Applies the dimension and name-prefix filters to a listed descriptor.
    pub fn select(descriptor: MetricDescriptor, query: &MetricQuery) -> Option<Self> {
        let key = query.dimension()?;

        let group = match key {
            DimensionKey::Named(name) => descriptor
                .dimensions()
                .get(name)
                .filter(|v| !v.is_empty())?
                .clone(),
            DimensionKey::Aggregate if descriptor.dimensions().is_empty() => {
                AGGREGATE_GROUP.to_string()
            }
            DimensionKey::Aggregate => return None,
        };

        if let Some(prefix) = query.name_prefix() {
            if !descriptor.name().starts_with(prefix) {
                return None;
            }
        }

        Some(Self {
            descriptor,
            key: key.clone(),
            group,
        })
    }

    #[inline]
    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn key(&self) -> &DimensionKey {
        &self.key
    }

    #[inline]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// The dimension filter to send along with the statistics request.
    pub fn dimension(&self) -> Option<(&str, &str)> {
        match &self.key {
            DimensionKey::Named(name) => Some((name.as_str(), self.group.as_str())),
            DimensionKey::Aggregate => None,
        }
    }
}
