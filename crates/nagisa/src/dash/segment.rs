//! Expansion of the DASH segment-addressing schemes into concrete segment
//! lists. Exactly one scheme applies per representation, looked up through
//! the inheritance scope: `SegmentTemplate` (with a `SegmentTimeline` or a
//! fixed `@duration`), `SegmentList`, `SegmentBase`, or the plain `BaseURL`
//! as a single-file fallback.

use url::Url;

use crate::dash::template::Template;
use crate::dash::url::{is_absolute_url, merge_baseurls, repair_query};
use crate::dash::Scope;
use crate::error::{NagisaError, NagisaResult};
use crate::fetch::{content_range_total, RangeFetch};
use crate::track::Segment;
use crate::xml::Element;

pub(crate) async fn generate<C: RangeFetch>(
    scope: &Scope<'_>,
    base_url: Option<&Url>,
    manifest_url: Option<&Url>,
    period_duration: Option<f64>,
    probe: Option<&C>,
) -> NagisaResult<Vec<Segment>> {
    let rid = scope.representation.attr("id").unwrap_or_default().to_string();

    let mut template = Template::new();
    template.insert(Template::REPRESENTATION_ID, rid.clone());
    if let Some(bandwidth) = scope.attr("bandwidth") {
        template.insert(Template::BANDWIDTH, bandwidth.to_string());
    }

    let mut segments = if let Some(node) = scope.child("SegmentTemplate") {
        from_template(
            node,
            &rid,
            base_url,
            manifest_url,
            period_duration,
            &mut template,
        )?
    } else if let Some(node) = scope.child("SegmentList") {
        from_list(node, &rid, base_url)?
    } else if let Some(node) = scope.child("SegmentBase") {
        from_base(node, &rid, base_url, probe).await?
    } else if let Some(base_url) = base_url {
        // a representation addressed by nothing but its BaseURL is a single
        // media file
        vec![Segment::new(base_url.clone())]
    } else {
        return Err(NagisaError::NoSegmentStrategy(rid));
    };

    for segment in &mut segments {
        repair_query(&mut segment.url);
    }
    Ok(segments)
}

/// Resolves a URL template to absolute form before any substitution, so that
/// relative templates pick up the base chain. A resolved URL without a query
/// string inherits the manifest's, which keeps access tokens attached.
fn absolute_template(
    value: &str,
    base_url: Option<&Url>,
    manifest_url: Option<&Url>,
) -> NagisaResult<String> {
    let mut url = if is_absolute_url(value) {
        Url::parse(value)?
    } else {
        let base = base_url
            .ok_or_else(|| NagisaError::UnresolvableBaseUrl(value.to_string()))?;
        base.join(value)?
    };
    if url.query().is_none() {
        if let Some(manifest_url) = manifest_url {
            url.set_query(manifest_url.query());
        }
    }
    Ok(url.into())
}

fn resolve_against(base_url: Option<&Url>, value: &str) -> NagisaResult<Url> {
    if is_absolute_url(value) {
        Ok(Url::parse(value)?)
    } else {
        let base = base_url
            .ok_or_else(|| NagisaError::UnresolvableBaseUrl(value.to_string()))?;
        merge_baseurls(base, value)
    }
}

fn from_template(
    node: &Element,
    rid: &str,
    base_url: Option<&Url>,
    manifest_url: Option<&Url>,
    period_duration: Option<f64>,
    template: &mut Template<'_>,
) -> NagisaResult<Vec<Segment>> {
    let timescale = node
        .attr("timescale")
        .and_then(|value| value.parse::<f64>().ok())
        .unwrap_or(1.0);
    let start_number = node
        .attr("startNumber")
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1);

    let initialization = node
        .attr("initialization")
        .map(|value| absolute_template(value, base_url, manifest_url))
        .transpose()?;
    let media = node
        .attr("media")
        .map(|value| absolute_template(value, base_url, manifest_url))
        .transpose()?;

    let mut segments = Vec::new();

    if let Some(timeline) = node.find("SegmentTimeline") {
        let media = media.ok_or_else(|| NagisaError::NoSegmentStrategy(rid.to_string()))?;
        let mut time = 0u64;
        let mut number = start_number;
        for s in timeline.find_all("S") {
            // an explicit start time resets the running clock
            if let Some(t) = s.attr("t").and_then(|value| value.parse::<u64>().ok()) {
                time = t;
            }
            let duration = s
                .attr("d")
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(0);
            let repeat = s
                .attr("r")
                .and_then(|value| value.parse::<i64>().ok())
                .unwrap_or(0)
                .max(0) as u64;
            for _ in 0..=repeat {
                template.insert(Template::NUMBER, number.to_string());
                template.insert(Template::TIME, time.to_string());
                let mut segment = Segment::new(Url::parse(&template.resolve(&media))?);
                segment.duration = Some(duration as f64 / timescale);
                segment.number = Some(number);
                segment.presentation_time = Some(time as f64 / timescale);
                segments.push(segment);
                number += 1;
                time += duration;
            }
        }
    } else if let Some(media) = media {
        let segment_seconds = node
            .attr("duration")
            .and_then(|value| value.parse::<f64>().ok())
            .map(|duration| duration / timescale)
            .filter(|seconds| *seconds > 0.0)
            .ok_or_else(|| NagisaError::DurationRequired(rid.to_string()))?;
        let period_duration =
            period_duration.ok_or_else(|| NagisaError::DurationRequired(rid.to_string()))?;
        let count = (period_duration / segment_seconds).ceil() as u64;
        for index in 0..count {
            let number = start_number + index;
            template.insert(Template::NUMBER, number.to_string());
            // number-based templates treat $Time$ as an alias of $Number$
            template.insert(Template::TIME, number.to_string());
            let mut segment = Segment::new(Url::parse(&template.resolve(&media))?);
            segment.duration = Some(segment_seconds);
            segment.number = Some(number);
            segment.presentation_time = Some(index as f64 * segment_seconds);
            segments.push(segment);
        }
    } else {
        return Err(NagisaError::NoSegmentStrategy(rid.to_string()));
    }

    if let Some(initialization) = initialization {
        let url = Url::parse(&template.resolve(&initialization))?;
        segments.insert(0, Segment::initialization(url));
    }

    Ok(segments)
}

fn from_list(node: &Element, rid: &str, base_url: Option<&Url>) -> NagisaResult<Vec<Segment>> {
    let timescale = node
        .attr("timescale")
        .and_then(|value| value.parse::<f64>().ok())
        .unwrap_or(1.0);
    let segment_seconds = node
        .attr("duration")
        .and_then(|value| value.parse::<f64>().ok())
        .map(|duration| duration / timescale);
    let start_number = node
        .attr("startNumber")
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1);

    let mut segments = Vec::new();
    for (index, segment_url) in node.find_all("SegmentURL").into_iter().enumerate() {
        let url = match segment_url.attr("media") {
            Some(media) => resolve_against(base_url, media)?,
            None => base_url
                .ok_or_else(|| NagisaError::NoSegmentStrategy(rid.to_string()))?
                .clone(),
        };
        let mut segment = Segment::new(url);
        segment.range = segment_url.attr("mediaRange").map(str::to_string);
        segment.duration = segment_seconds;
        segment.number = Some(start_number + index as u64);
        segment.presentation_time = segment_seconds.map(|seconds| index as f64 * seconds);
        segments.push(segment);
    }

    if let Some(initialization) = node.find("Initialization") {
        let url = match initialization.attr("sourceURL") {
            Some(source) => resolve_against(base_url, source)?,
            None => base_url
                .ok_or_else(|| NagisaError::NoSegmentStrategy(rid.to_string()))?
                .clone(),
        };
        let mut segment = Segment::initialization(url);
        segment.range = initialization.attr("range").map(str::to_string);
        segments.insert(0, segment);
    }

    Ok(segments)
}

/// `SegmentBase` addresses the whole resource as one media segment. When the
/// initialization carries a byte range, the total size is probed with a
/// single range request so the media segment can carry the remaining range;
/// without a probe (or on probe failure) the media segment keeps an empty
/// range, which is a usable degraded result.
async fn from_base<C: RangeFetch>(
    node: &Element,
    rid: &str,
    base_url: Option<&Url>,
    probe: Option<&C>,
) -> NagisaResult<Vec<Segment>> {
    let base = base_url.ok_or_else(|| NagisaError::NoSegmentStrategy(rid.to_string()))?;
    let mut media = Segment::new(base.clone());
    let mut init = None;

    if let Some(initialization) = node.find("Initialization") {
        let url = match initialization.attr("sourceURL") {
            Some(source) => resolve_against(base_url, source)?,
            None => base.clone(),
        };
        let mut segment = Segment::initialization(url);
        if let Some(range) = initialization.attr("range") {
            segment.range = Some(range.to_string());
            media.range = probe_media_range(base, range, probe).await;
        }
        init = Some(segment);
    }

    let mut segments = vec![media];
    if let Some(init) = init {
        segments.insert(0, init);
    }
    Ok(segments)
}

async fn probe_media_range<C: RangeFetch>(
    url: &Url,
    init_range: &str,
    probe: Option<&C>,
) -> Option<String> {
    let probe = probe?;
    let init_end = init_range.split('-').nth(1)?.parse::<u64>().ok()?;
    match probe.fetch_range(url, Some(init_range)).await {
        Ok(response) => {
            let total = response
                .content_range
                .as_deref()
                .and_then(content_range_total)?;
            (total > init_end + 1).then(|| format!("{}-{}", init_end + 1, total - 1))
        }
        Err(error) => {
            tracing::warn!("byte-range probe failed for {url}: {error}");
            None
        }
    }
}
