use url::Url;

use crate::dash::Scope;
use crate::error::{NagisaError, NagisaResult};
use crate::xml::Element;

pub(crate) fn is_absolute_url(s: &str) -> bool {
    s.starts_with("http://")
        || s.starts_with("https://")
        || s.starts_with("file://")
        || s.starts_with("ftp://")
}

pub(crate) fn merge_baseurls(current: &Url, new: &str) -> NagisaResult<Url> {
    if is_absolute_url(new) {
        Ok(Url::parse(new)?)
    } else {
        // We are careful to merge the query portion of the current URL (which
        // is either the original manifest URL or the value of a BaseURL
        // element in the manifest) with the new URL. But if the new URL
        // already has a query string, it takes precedence.
        //
        // Examples
        //
        // merge_baseurls(https://example.com/manifest.mpd?auth=secret, /video42.mp4) =>
        //   https://example.com/video42.mp4?auth=secret
        //
        // merge_baseurls(https://example.com/manifest.mpd?auth=old, /video42.mp4?auth=new) =>
        //   https://example.com/video42.mp4?auth=new
        let mut merged = current.join(new)?;
        if merged.query().is_none() {
            merged.set_query(current.query());
        }
        Ok(merged)
    }
}

/// Walks the `BaseURL` chain from the MPD root down to the representation.
/// Each level resolves against its parent; an absent `BaseURL` keeps the
/// parent's value. The representation level goes through the scope, so an
/// adaptation-set `BaseURL` applies when the representation carries none.
pub(crate) fn resolve_base_url(
    manifest_url: Option<&Url>,
    mpd: &Element,
    period: &Element,
    scope: &Scope<'_>,
) -> NagisaResult<Url> {
    let mpd_base = mpd.find("BaseURL").map(|e| e.text()).filter(|t| !t.is_empty());
    let mut base = match (mpd_base, manifest_url) {
        (Some(value), Some(url)) => merge_baseurls(url, &value)?,
        (Some(value), None) if is_absolute_url(&value) => Url::parse(&value)?,
        (Some(value), None) => return Err(NagisaError::UnresolvableBaseUrl(value)),
        (None, Some(url)) => url.clone(),
        (None, None) => {
            return Err(NagisaError::UnresolvableBaseUrl(
                "manifest has no URL and no BaseURL".to_string(),
            ))
        }
    };

    if let Some(value) = period.find("BaseURL").map(|e| e.text()).filter(|t| !t.is_empty()) {
        base = merge_baseurls(&base, &value)?;
    }
    if let Some(value) = scope.child("BaseURL").map(|e| e.text()).filter(|t| !t.is_empty()) {
        base = merge_baseurls(&base, &value)?;
    }
    Ok(base)
}

/// Repairs query parameter names that kept an `amp;` prefix after the XML
/// layer expanded a doubly-escaped `&amp;amp;` separator.
pub(crate) fn repair_query(url: &mut Url) {
    let Some(query) = url.query() else { return };
    if !query.contains("amp;") {
        return;
    }
    let repaired = query
        .split('&')
        .map(|pair| pair.strip_prefix("amp;").unwrap_or(pair))
        .collect::<Vec<_>>()
        .join("&");
    url.set_query(Some(&repaired));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn test_merge_baseurls() {
        let current = Url::parse("https://example.com/vod/manifest.mpd?auth=secret").unwrap();
        assert_eq!(
            merge_baseurls(&current, "video/init.mp4").unwrap().as_str(),
            "https://example.com/vod/video/init.mp4?auth=secret"
        );
        assert_eq!(
            merge_baseurls(&current, "/video42.mp4?auth=new").unwrap().as_str(),
            "https://example.com/video42.mp4?auth=new"
        );
        assert_eq!(
            merge_baseurls(&current, "https://cdn.example.com/a.mp4")
                .unwrap()
                .as_str(),
            "https://cdn.example.com/a.mp4"
        );
    }

    #[test]
    fn test_resolve_base_url_chain() {
        let mpd = xml::parse(
            "<MPD><BaseURL>https://cdn.example.com/content/</BaseURL><Period/></MPD>",
        )
        .unwrap();
        let period =
            xml::parse("<Period><BaseURL>period1/</BaseURL></Period>").unwrap();
        let adaptation_set = xml::parse("<AdaptationSet/>").unwrap();
        let representation =
            xml::parse("<Representation><BaseURL>video/</BaseURL></Representation>").unwrap();
        let scope = Scope::new(&adaptation_set, &representation);

        let manifest_url = Url::parse("https://origin.example.com/live/manifest.mpd").unwrap();
        let base = resolve_base_url(Some(&manifest_url), &mpd, &period, &scope).unwrap();
        assert_eq!(
            base.as_str(),
            "https://cdn.example.com/content/period1/video/"
        );
    }

    #[test]
    fn test_resolve_base_url_defaults_to_manifest_url() {
        let mpd = xml::parse("<MPD/>").unwrap();
        let period = xml::parse("<Period/>").unwrap();
        let adaptation_set = xml::parse("<AdaptationSet/>").unwrap();
        let representation = xml::parse("<Representation/>").unwrap();
        let scope = Scope::new(&adaptation_set, &representation);

        let manifest_url = Url::parse("https://example.com/vod/manifest.mpd").unwrap();
        let base = resolve_base_url(Some(&manifest_url), &mpd, &period, &scope).unwrap();
        assert_eq!(base.as_str(), "https://example.com/vod/manifest.mpd");

        assert!(matches!(
            resolve_base_url(None, &mpd, &period, &scope),
            Err(NagisaError::UnresolvableBaseUrl(_))
        ));
    }

    #[test]
    fn test_adaptation_set_base_url_fallback() {
        let mpd = xml::parse("<MPD/>").unwrap();
        let period = xml::parse("<Period/>").unwrap();
        let adaptation_set =
            xml::parse("<AdaptationSet><BaseURL>audio/</BaseURL></AdaptationSet>").unwrap();
        let representation = xml::parse("<Representation/>").unwrap();
        let scope = Scope::new(&adaptation_set, &representation);

        let manifest_url = Url::parse("https://example.com/vod/manifest.mpd").unwrap();
        let base = resolve_base_url(Some(&manifest_url), &mpd, &period, &scope).unwrap();
        assert_eq!(base.as_str(), "https://example.com/vod/audio/");
    }

    #[test]
    fn test_repair_query() {
        let mut url =
            Url::parse("https://example.com/seg.m4s?token=abc&amp;expires=42").unwrap();
        repair_query(&mut url);
        assert_eq!(
            url.as_str(),
            "https://example.com/seg.m4s?token=abc&expires=42"
        );

        let mut untouched = Url::parse("https://example.com/seg.m4s?token=abc").unwrap();
        repair_query(&mut untouched);
        assert_eq!(untouched.as_str(), "https://example.com/seg.m4s?token=abc");
    }
}
