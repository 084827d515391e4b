//! Network waterfall.
//!
//! Rebuilds one lifecycle per URL from the send / response / finish records,
//! then looks at size, concurrency, render blocking and time to first byte.
//! Only requests whose `ResourceFinish` was captured are reported.

use super::schema::{Bottleneck, BottleneckType};
use crate::aggregator::{sorted_by_time, to_ms};
use crate::parser::classify::is_first_paint_marker;
use crate::parser::payload::EventPayload;
use crate::parser::TraceEvent;
use crate::utils::config::{
    CONTENTION_CONCURRENCY, CRITICAL_SCRIPT_BYTES, CRITICAL_STYLE_BYTES, IMAGE_BUDGET_BYTES,
    LARGE_RESOURCE_BYTES, MAX_FONT_FILES, RESOURCE_EXTENSIONS, SCRIPT_BUDGET_BYTES,
    STYLE_BUDGET_BYTES,
};
use crate::utils::error::AnalysisError;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// One completed request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub url: String,
    pub resource_type: String,
    pub start_time: f64,
    pub end_time: f64,
    pub duration_ms: f64,
    /// Decoded body size, or the transfer size when unknown
    pub size: u64,
    pub transfer_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u64>,
    pub from_cache: bool,
    pub from_service_worker: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttfb_ms: Option<f64>,
}

impl Resource {
    pub fn is_large(&self) -> bool {
        self.size > LARGE_RESOURCE_BYTES
    }

    /// High priority, or a large script or stylesheet
    pub fn is_critical(&self) -> bool {
        matches!(self.priority.as_deref(), Some("High") | Some("VeryHigh"))
            || (self.resource_type == "script" && self.size > CRITICAL_SCRIPT_BYTES)
            || (self.resource_type == "style" && self.size > CRITICAL_STYLE_BYTES)
    }

    fn is_document(&self) -> bool {
        self.resource_type == "document" || self.mime_type.as_deref().is_some_and(|m| m.contains("html"))
    }
}

#[derive(Debug, Clone, Default)]
struct Lifecycle {
    request_time: Option<f64>,
    response_time: Option<f64>,
    finish_time: Option<f64>,
    priority: Option<String>,
    mime_type: Option<String>,
    status_code: Option<u64>,
    from_cache: bool,
    from_service_worker: bool,
    encoded_length: Option<u64>,
    decoded_length: Option<u64>,
    failed: bool,
}

impl Lifecycle {
    fn into_resource(self, url: String) -> Option<Resource> {
        let finish = self.finish_time?;
        let start = self.request_time.or(self.response_time).unwrap_or(finish);
        let transfer_size = self.encoded_length.unwrap_or(0);
        let size = self.decoded_length.filter(|&n| n > 0).unwrap_or(transfer_size);

        Some(Resource {
            resource_type: resource_type(&url).to_string(),
            url,
            start_time: start,
            end_time: finish,
            duration_ms: to_ms(finish - start),
            size,
            transfer_size,
            priority: self.priority,
            mime_type: self.mime_type,
            status_code: self.status_code,
            from_cache: self.from_cache,
            from_service_worker: self.from_service_worker,
            failed: self.failed,
            ttfb_ms: self.request_time.zip(self.response_time).map(|(req, res)| to_ms(res - req)),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LargeResourcesDetails {
    pub threshold_bytes: u64,
    pub total_bytes: u64,
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSummary {
    pub count: usize,
    pub total_bytes: u64,
    pub total_duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentionPeriod {
    pub start_time: f64,
    pub end_time: f64,
    pub duration_ms: f64,
    pub peak_concurrency: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLoadingDetails {
    pub resource_count: usize,
    pub total_bytes: u64,
    pub total_transfer_bytes: u64,
    pub by_type: BTreeMap<String, TypeSummary>,
    pub critical_path: Vec<String>,
    pub max_concurrency: usize,
    pub contention_periods: Vec<ContentionPeriod>,
    pub first_paint: Option<f64>,
    pub render_blocking: Vec<String>,
    pub ttfb_ms: Option<f64>,
    /// All resources in request order
    pub waterfall: Vec<Resource>,
    pub recommendations: Vec<String>,
}

/// Resource type from the URL's file extension
///
/// Query strings and fragments are ignored; anything unrecognized is `other`.
pub fn resource_type(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    let Some((_, extension)) = file.rsplit_once('.') else {
        return "other";
    };
    let extension = extension.to_ascii_lowercase();

    RESOURCE_EXTENSIONS
        .iter()
        .find(|(_, extensions)| extensions.contains(&extension.as_str()))
        .map(|(kind, _)| *kind)
        .unwrap_or("other")
}

/// Analyze the network waterfall
///
/// **Public** - engine entry point for resource analysis
///
/// # Returns
/// A `large_resources` bottleneck when any resource exceeds the size
/// threshold, followed by the `resource_loading` waterfall. Empty when no
/// request completed.
pub fn analyze_resource_loading(events: &[TraceEvent]) -> Result<Vec<Bottleneck>, AnalysisError> {
    let sorted = sorted_by_time(events)?;
    let resources = build_resources(&sorted);
    debug!("Reconstructed {} completed resources", resources.len());

    if resources.is_empty() {
        return Ok(Vec::new());
    }

    let mut bottlenecks = Vec::new();

    let large: Vec<Resource> = resources.iter().filter(|r| r.is_large()).cloned().collect();
    if !large.is_empty() {
        let details = LargeResourcesDetails {
            threshold_bytes: LARGE_RESOURCE_BYTES,
            total_bytes: large.iter().map(|r| r.size).sum(),
            resources: large,
        };
        let description = format!(
            "{} resource(s) larger than {} KB ({} bytes total)",
            details.resources.len(),
            LARGE_RESOURCE_BYTES / 1000,
            details.total_bytes
        );
        bottlenecks.push(Bottleneck::new(BottleneckType::LargeResources, description, &details)?);
    }

    let mut by_type: BTreeMap<String, TypeSummary> = BTreeMap::new();
    for resource in &resources {
        let summary = by_type.entry(resource.resource_type.clone()).or_default();
        summary.count += 1;
        summary.total_bytes += resource.size;
        summary.total_duration_ms += resource.duration_ms;
    }

    let (max_concurrency, contention_periods) = sweep_concurrency(&resources);

    let first_paint = sorted
        .iter()
        .find(|e| is_first_paint_marker(&e.name))
        .map(|e| e.start());
    let render_blocking = first_paint
        .map(|paint| render_blocking_after(&resources, paint))
        .unwrap_or_default();

    let ttfb_ms = resources.iter().find(|r| r.is_document()).and_then(|r| r.ttfb_ms);

    let details = ResourceLoadingDetails {
        resource_count: resources.len(),
        total_bytes: resources.iter().map(|r| r.size).sum(),
        total_transfer_bytes: resources.iter().map(|r| r.transfer_size).sum(),
        critical_path: resources.iter().filter(|r| r.is_critical()).map(|r| r.url.clone()).collect(),
        max_concurrency,
        contention_periods,
        first_paint,
        render_blocking,
        ttfb_ms,
        recommendations: build_recommendations(&by_type),
        by_type,
        waterfall: resources,
    };

    let description = format!(
        "{} resource(s), {} bytes; peak concurrency {}, {} render-blocking",
        details.resource_count,
        details.total_bytes,
        details.max_concurrency,
        details.render_blocking.len()
    );
    bottlenecks.push(Bottleneck::new(BottleneckType::ResourceLoading, description, &details)?);

    Ok(bottlenecks)
}

/// Fold the request records into completed resources, in request order
fn build_resources(sorted: &[&TraceEvent]) -> Vec<Resource> {
    let mut lifecycles: HashMap<String, Lifecycle> = HashMap::new();
    let mut urls_by_request: HashMap<String, String> = HashMap::new();

    let resolve = |request_id: &Option<String>, url: Option<String>, urls: &HashMap<String, String>| {
        url.filter(|u| !u.is_empty())
            .or_else(|| request_id.as_ref().and_then(|id| urls.get(id).cloned()))
    };

    for event in sorted {
        match event.payload() {
            EventPayload::ResourceSendRequest(request) => {
                let Some(url) = request.url.filter(|u| !u.is_empty()) else {
                    continue;
                };
                if let Some(id) = request.request_id {
                    urls_by_request.insert(id, url.clone());
                }
                // a repeated request for the same URL starts a fresh lifecycle
                lifecycles.insert(
                    url,
                    Lifecycle {
                        request_time: Some(event.start()),
                        priority: request.priority,
                        ..Lifecycle::default()
                    },
                );
            }
            EventPayload::ResourceReceiveResponse(response) => {
                let Some(url) = resolve(&response.request_id, response.url, &urls_by_request) else {
                    continue;
                };
                let lifecycle = lifecycles.entry(url).or_default();
                lifecycle.response_time = Some(event.start());
                lifecycle.status_code = response.status_code;
                lifecycle.mime_type = response.mime_type;
                lifecycle.from_cache = response.from_cache;
                lifecycle.from_service_worker = response.from_service_worker;
            }
            EventPayload::ResourceFinish(finish) => {
                let Some(url) = resolve(&finish.request_id, finish.url, &urls_by_request) else {
                    continue;
                };
                let lifecycle = lifecycles.entry(url).or_default();
                lifecycle.finish_time = Some(event.start());
                lifecycle.encoded_length = finish.encoded_data_length;
                lifecycle.decoded_length = finish.decoded_body_length;
                lifecycle.failed = finish.did_fail;
            }
            _ => {}
        }
    }

    let mut resources: Vec<Resource> = lifecycles
        .into_iter()
        .filter_map(|(url, lifecycle)| lifecycle.into_resource(url))
        .collect();
    resources.sort_by(|a, b| a.start_time.total_cmp(&b.start_time).then_with(|| a.url.cmp(&b.url)));
    resources
}

/// Peak in-flight count and the periods spent at or above the contention level
///
/// Ends sort before starts at the same instant, so back-to-back requests never overlap.
fn sweep_concurrency(resources: &[Resource]) -> (usize, Vec<ContentionPeriod>) {
    let mut edges: Vec<(f64, i32)> = resources
        .iter()
        .flat_map(|r| [(r.start_time, 1), (r.end_time, -1)])
        .collect();
    edges.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut in_flight: usize = 0;
    let mut max_concurrency = 0;
    let mut periods = Vec::new();
    let mut open: Option<(f64, usize)> = None;

    for (instant, delta) in edges {
        if delta > 0 {
            in_flight += 1;
        } else {
            in_flight = in_flight.saturating_sub(1);
        }
        max_concurrency = max_concurrency.max(in_flight);

        open = match open {
            None if in_flight >= CONTENTION_CONCURRENCY => Some((instant, in_flight)),
            Some((start, peak)) if in_flight < CONTENTION_CONCURRENCY => {
                periods.push(ContentionPeriod {
                    start_time: start,
                    end_time: instant,
                    duration_ms: to_ms(instant - start),
                    peak_concurrency: peak,
                });
                None
            }
            Some((start, peak)) => Some((start, peak.max(in_flight))),
            None => None,
        };
    }

    (max_concurrency, periods)
}

/// Scripts, styles and fonts still loading at first paint
fn render_blocking_after(resources: &[Resource], first_paint: f64) -> Vec<String> {
    resources
        .iter()
        .filter(|r| matches!(r.resource_type.as_str(), "script" | "style" | "font"))
        .filter(|r| r.end_time > first_paint && !r.from_cache && r.priority.as_deref() != Some("Low"))
        .map(|r| r.url.clone())
        .collect()
}

fn build_recommendations(by_type: &BTreeMap<String, TypeSummary>) -> Vec<String> {
    let mut recommendations = Vec::new();
    let bytes = |kind: &str| by_type.get(kind).map(|s| s.total_bytes).unwrap_or(0);

    if bytes("image") > IMAGE_BUDGET_BYTES {
        recommendations.push(format!(
            "Images total {} KB: serve WebP/AVIF, compress, and size images to their display dimensions",
            bytes("image") / 1000
        ));
    }
    if bytes("script") > SCRIPT_BUDGET_BYTES {
        recommendations.push(format!(
            "Scripts total {} KB: code-split, tree-shake, and defer non-critical bundles",
            bytes("script") / 1000
        ));
    }
    if bytes("style") > STYLE_BUDGET_BYTES {
        recommendations.push(format!(
            "Stylesheets total {} KB: remove unused CSS and inline only the critical rules",
            bytes("style") / 1000
        ));
    }
    let fonts = by_type.get("font").map(|s| s.count).unwrap_or(0);
    if fonts > MAX_FONT_FILES {
        recommendations.push(format!(
            "{} font files loaded: subset fonts and limit the number of weights",
            fonts
        ));
    }

    recommendations
}
