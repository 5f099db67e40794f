use crate::error::TelemetryError;
use crate::models::{AggregatedMetric, Attribute, MetricPoint, Resource};
use crate::provider::{timestamp_or_now, Pipeline};
use std::sync::Arc;

/// Named metric producer bound to a provider
#[derive(Clone)]
pub struct Meter {
    pipeline: Arc<Pipeline>,
    name: String,
    version: Option<String>,
    resource: Resource,
}

impl Meter {
    pub(crate) fn new(pipeline: Arc<Pipeline>, name: &str, version: Option<&str>) -> Self {
        let resource = pipeline.scope_resource("meter", name);
        Self {
            pipeline,
            name: name.to_string(),
            version: version.map(str::to_string),
            resource,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Record points in order, stopping at the first error
    pub async fn record_metrics<I>(&self, points: I) -> Result<(), TelemetryError>
    where
        I: IntoIterator<Item = MetricPoint>,
    {
        for point in points {
            let point = self.enrich(point);
            self.pipeline.submit_metric(point).await?;
        }
        Ok(())
    }

    /// Record pre-aggregated points, tagging each with its aggregation window
    pub async fn record_aggregated<I>(&self, metrics: I) -> Result<(), TelemetryError>
    where
        I: IntoIterator<Item = AggregatedMetric>,
    {
        let points = metrics.into_iter().map(|aggregated| {
            let mut point = aggregated.metric;
            point
                .attributes
                .push(Attribute::new("aggregation.count", aggregated.count));
            point
                .attributes
                .push(Attribute::new("aggregation.window_ms", aggregated.window_ms));
            point
        });
        self.record_metrics(points).await
    }

    fn enrich(&self, mut point: MetricPoint) -> MetricPoint {
        point.resource = Some(self.resource.clone());
        point
            .attributes
            .extend(self.pipeline.default_tags().iter().cloned());
        if let Some(version) = &self.version {
            point
                .attributes
                .push(Attribute::new("meter.version", version.as_str()));
        }
        point.timestamp_nanos = Some(timestamp_or_now(point.timestamp_nanos));
        point
    }
}
