use std::sync::Arc;

use sonda_core::ViewInfo;

use crate::introspector::Introspector;
use crate::options::DiscoveryOptions;

/// Discovers views when enabled; failures degrade to an empty list.
pub struct ViewDiscovery {
    introspector: Arc<dyn Introspector>,
}

impl ViewDiscovery {
    pub fn new(introspector: Arc<dyn Introspector>) -> Self {
        Self { introspector }
    }

    pub async fn discover(&self, options: &DiscoveryOptions) -> Vec<ViewInfo> {
        if !options.include_views {
            return Vec::new();
        }

        match self.introspector.list_views().await {
            Ok(mut views) => {
                views.sort_by(|left, right| left.name.cmp(&right.name));
                views
            }
            Err(err) => {
                tracing::warn!(event = "facet_degraded", facet = "views", error = %err);
                Vec::new()
            }
        }
    }
}
