//! Resource attribute detection for the Functions environment.
//!
//! Builds the OpenTelemetry resource describing this function app from the
//! environment the host provides:
//!
//! - `cloud.provider`: "azure"
//! - `cloud.region`: from `REGION_NAME`
//! - `faas.name`: from `WEBSITE_SITE_NAME` (also the default `service.name`)
//! - `faas.version`: from `FUNCTIONS_EXTENSION_VERSION`
//! - `faas.instance`: from `WEBSITE_INSTANCE_ID`
//! - `service.name`: from `OTEL_SERVICE_NAME`, falling back to the site name
//!
//! Additional attributes come from `OTEL_RESOURCE_ATTRIBUTES` in
//! `key=value,key2=value2` format; values may be URL-encoded.

use crate::constants::env_vars;
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use std::env;
use urlencoding::decode;

/// Detect resource attributes from the Functions environment.
///
/// Used by [`init_telemetry`](crate::telemetry::init_telemetry) whenever no
/// custom resource is configured.
pub fn get_functions_resource() -> Resource {
    let mut attributes = Vec::new();

    if let Ok(region) = env::var(env_vars::REGION_NAME) {
        attributes.push(KeyValue::new("cloud.provider", "azure"));
        attributes.push(KeyValue::new("cloud.region", region));
    }

    if let Ok(site_name) = env::var(env_vars::SITE_NAME) {
        attributes.push(KeyValue::new("faas.name", site_name.clone()));
        // Use the site name as service name if not set
        if env::var(env_vars::SERVICE_NAME).is_err() {
            attributes.push(KeyValue::new("service.name", site_name));
        }
    }

    if let Ok(version) = env::var(env_vars::EXTENSION_VERSION) {
        attributes.push(KeyValue::new("faas.version", version));
    }

    if let Ok(instance_id) = env::var(env_vars::INSTANCE_ID) {
        attributes.push(KeyValue::new("faas.instance", instance_id));
    }

    if let Ok(attrs) = env::var(env_vars::RESOURCE_ATTRIBUTES) {
        for pair in attrs.split(',') {
            let parts: Vec<&str> = pair.split('=').collect();
            if parts.len() == 2 {
                let key = parts[0].trim().to_string();
                let value = parts[1].trim();
                if !value.is_empty() {
                    if let Ok(decoded_value) = decode(value) {
                        attributes.push(KeyValue::new(key, decoded_value.into_owned()));
                    }
                }
            }
        }
    }

    Resource::builder().with_attributes(attributes).build()
}
